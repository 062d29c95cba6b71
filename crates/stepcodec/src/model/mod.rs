//! Value types carried by serializers.
//!
//! - [`NDArray`]: strided n-dimensional arrays
//! - [`Date`], [`Time`], [`DateTime`]: temporal values
//! - [`Complex32`], [`Complex64`]: complex numbers

pub mod ndarray;
pub mod value;

pub use ndarray::NDArray;
pub use value::{Complex32, Complex64, Date, DateTime, Time};
