//! NumPy/pandas-like array operations.

mod array;

pub use array::*;
