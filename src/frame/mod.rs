//! Tables, indexes and column decoding.
//!
//! - [`Table`] - one `obs`/`var` style group
//! - [`Index`] - row labels of a table
//! - [`Column`] - decoded column values
//! - [`coerce`] - raw buffer to canonical value conversion

pub mod coerce;
mod column;
mod index;
mod table;

pub use column::{decode_node, Column, Encoding};
pub use index::Index;
pub use table::{Table, INDEX_ATTR};
