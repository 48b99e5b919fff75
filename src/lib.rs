//! # anndata-stage
//!
//! Loader for AnnData (`.h5ad`) documents with a staging cache for remote
//! sources.
//!
//! Loading reads only what is needed to describe a document: the row labels
//! and column names of `obs`/`var` and the member names of every other
//! top-level section. Columns are decoded on request and the main matrix is
//! never read.
//!
//! ## Modules
//!
//! - [`util`] - Basic types (values, errors)
//! - [`container`] - Raw container access (node tree, typed buffers)
//! - [`frame`] - Tables, indexes and column decoding
//! - [`anndata`] - The document model
//! - [`staging`] - Remote file staging
//!
//! ## Example
//!
//! ```ignore
//! use anndata_stage::AnnData;
//!
//! let adata = AnnData::open("pbmc3k.h5ad")?;
//! println!("{adata}");
//!
//! let batch = adata.obs().get("batch")?;
//! println!("{} distinct batches", batch.count_unique());
//! adata.close();
//! ```

pub mod util;
pub mod container;
pub mod frame;
pub mod anndata;
pub mod staging;

// Re-export commonly used types
pub use anndata::AnnData;
pub use frame::{Column, Index, Table};
pub use staging::{StagingCache, StagingConfig};
pub use util::{Error, Result, Value};

/// Prelude module for convenient imports
pub mod prelude {
    pub use std::sync::Arc;

    pub use crate::anndata::AnnData;
    pub use crate::container::{ContainerReader, Node, RawBuffer};
    pub use crate::frame::{Column, Index, Table};
    pub use crate::staging::{LocalSession, Session, StagingCache, StagingConfig};
    pub use crate::util::{Error, Result, Value};
}
