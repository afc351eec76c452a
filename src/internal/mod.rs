//! Internal modules ported from external libraries.
//!
//! These modules contain code adapted from:
//! - scipy: Condensed and cross distance matrices
//! - numpy/pandas: NaN-aware reductions and bounded interpolation

pub mod scipy;
pub mod numpy;
