//! SciPy functions port.
//!
//! Ported from:
//! - scipy.spatial.distance

mod distance;

pub use distance::*;
