//! NaN-aware array operations.

use nalgebra::DMatrix;

/// Element-wise minimum that ignores NaN (numpy `fmin`).
///
/// The result is NaN only where both inputs are NaN.
pub fn fmin(a: f64, b: f64) -> f64 {
    match (a.is_nan(), b.is_nan()) {
        (true, _) => b,
        (_, true) => a,
        _ => a.min(b),
    }
}

/// Element-wise `fmin` of two matrices of equal shape.
pub fn fmin_matrix(a: &DMatrix<f64>, b: &DMatrix<f64>) -> DMatrix<f64> {
    assert_eq!(a.shape(), b.shape(), "Matrix shapes must match");
    a.zip_map(b, fmin)
}

/// Minimum of the non-NaN values (numpy `nanmin`), NaN if there are none.
pub fn nanmin<I: IntoIterator<Item = f64>>(values: I) -> f64 {
    values.into_iter().fold(f64::NAN, fmin)
}

/// Fill interior NaN runs of at most `limit` entries by linear interpolation
/// over position.
///
/// Leading and trailing NaNs are left alone, as are runs longer than
/// `limit`. Returns the indices that were filled.
pub fn fill_linear_bounded(values: &mut [f64], limit: usize) -> Vec<usize> {
    let mut filled = Vec::new();
    let mut last_valid: Option<usize> = None;

    for i in 0..values.len() {
        if values[i].is_nan() {
            continue;
        }
        if let Some(start) = last_valid {
            let run = i - start - 1;
            if run > 0 && run <= limit {
                let (v0, v1) = (values[start], values[i]);
                let span = (i - start) as f64;
                for k in (start + 1)..i {
                    let ratio = (k - start) as f64 / span;
                    values[k] = v0 + (v1 - v0) * ratio;
                    filled.push(k);
                }
            }
        }
        last_valid = Some(i);
    }

    filled
}
