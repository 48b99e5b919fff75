//! Utility types shared across the crate.
//!
//! - [`Value`] - canonical decoded cell value
//! - [`Error`] / [`Result`] - Error handling

mod error;
mod value;

pub use error::*;
pub use value::*;
