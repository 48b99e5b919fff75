//! AnnData document model.
//!
//! An AnnData container has this top-level layout:
//!
//! ```text
//! /X        main matrix (optional, never decoded)
//! /obs      per-observation table
//! /var      per-variable table
//! /layers   alternative matrices
//! /obsm     observation embeddings
//! /varm     variable embeddings
//! /obsp     pairwise observation matrices
//! /varp     pairwise variable matrices
//! /uns      unstructured metadata
//! ```
//!
//! Loading reads the two tables' row labels and column names plus the member
//! names of every other section. Nothing else is decoded until a column is
//! requested.
//!
//! ## Example
//!
//! ```ignore
//! use anndata_stage::prelude::*;
//!
//! let session = LocalSession::new(std::env::temp_dir());
//! let cache = StagingCache::new(StagingConfig::from_env()?, Arc::new(session))?;
//! let adata = AnnData::load("https://data.example.org/pbmc3k.h5ad", &cache)?;
//! println!("{adata}");
//! let cell_types = adata.obs().get("cell_type")?;
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::container::{self, ContainerReader, NodeKind, SharedContainer};
use crate::frame::Table;
use crate::staging::StagingCache;
use crate::util::{Error, Result};

/// Top-level sections every document must have.
pub const REQUIRED_FIELDS: [&str; 8] = ["obs", "var", "layers", "obsm", "varm", "obsp", "varp", "uns"];

/// A loaded AnnData document.
///
/// Owns the container handle. The handle is released by [`AnnData::close`]
/// or, failing that, when the document is dropped. Everything read at load
/// time stays available after closing; decoding a column does not.
pub struct AnnData {
    path: PathBuf,
    obs: Table,
    var: Table,
    layers: BTreeSet<String>,
    obsm: BTreeSet<String>,
    varm: BTreeSet<String>,
    obsp: BTreeSet<String>,
    varp: BTreeSet<String>,
    uns: BTreeSet<String>,
    handle: SharedContainer,
}

impl AnnData {
    /// Open a local container file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::info!(path = %path.display(), "opening AnnData file");
        Self::from_reader(container::open_container(path)?)
    }

    /// Stage `source` through `cache`, then open the local copy.
    pub fn load(source: &str, cache: &StagingCache) -> Result<Self> {
        let local = cache.stage(source)?;
        Self::open(local)
    }

    /// Open `path`, run `f`, and close the document on every exit path.
    pub fn with_open<R>(path: impl AsRef<Path>, f: impl FnOnce(&AnnData) -> Result<R>) -> Result<R> {
        let path = path.as_ref();
        tracing::info!(path = %path.display(), "opening AnnData file");
        Self::with_reader(container::open_container(path)?, f)
    }

    /// Load from `reader`, run `f`, and close the document whether `f`
    /// succeeds or fails.
    ///
    /// Tables cloned inside `f` fail with [`Error::Closed`] afterwards.
    pub fn with_reader<R>(
        reader: Box<dyn ContainerReader>,
        f: impl FnOnce(&AnnData) -> Result<R>,
    ) -> Result<R> {
        let adata = Self::from_reader(reader)?;
        let result = f(&adata);
        adata.close();
        result
    }

    /// Build a document from an already opened reader.
    pub fn from_reader(reader: Box<dyn ContainerReader>) -> Result<Self> {
        let path = reader.path().to_path_buf();
        check_fields(reader.as_ref())?;

        let handle = SharedContainer::new(reader);
        let obs = Table::open(handle.clone(), "obs")?;
        let var = Table::open(handle.clone(), "var")?;

        let adata = Self {
            path,
            obs,
            var,
            layers: field_names(&handle, "layers")?,
            obsm: field_names(&handle, "obsm")?,
            varm: field_names(&handle, "varm")?,
            obsp: field_names(&handle, "obsp")?,
            varp: field_names(&handle, "varp")?,
            uns: field_names(&handle, "uns")?,
            handle,
        };
        tracing::debug!(
            path = %adata.path.display(),
            n_obs = adata.n_obs(),
            n_vars = adata.n_vars(),
            "AnnData loaded"
        );
        Ok(adata)
    }

    /// Path of the local container file.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of observations (rows of `obs`).
    #[inline]
    pub fn n_obs(&self) -> usize {
        self.obs.row_count()
    }

    /// Number of variables (rows of `var`).
    #[inline]
    pub fn n_vars(&self) -> usize {
        self.var.row_count()
    }

    /// Observation table.
    #[inline]
    pub fn obs(&self) -> &Table {
        &self.obs
    }

    /// Variable table.
    #[inline]
    pub fn var(&self) -> &Table {
        &self.var
    }

    /// Observation labels.
    #[inline]
    pub fn obs_names(&self) -> &[String] {
        self.obs.row_labels()
    }

    /// Variable labels.
    #[inline]
    pub fn var_names(&self) -> &[String] {
        self.var.row_labels()
    }

    #[inline]
    pub fn layers(&self) -> &BTreeSet<String> {
        &self.layers
    }

    #[inline]
    pub fn obsm(&self) -> &BTreeSet<String> {
        &self.obsm
    }

    #[inline]
    pub fn varm(&self) -> &BTreeSet<String> {
        &self.varm
    }

    #[inline]
    pub fn obsp(&self) -> &BTreeSet<String> {
        &self.obsp
    }

    #[inline]
    pub fn varp(&self) -> &BTreeSet<String> {
        &self.varp
    }

    /// Member names of the unstructured metadata section.
    #[inline]
    pub fn uns(&self) -> &BTreeSet<String> {
        &self.uns
    }

    /// Release the container handle. Calling it again does nothing.
    pub fn close(&self) {
        if self.handle.close() {
            tracing::debug!(path = %self.path.display(), "AnnData closed");
        }
    }

    /// Check if the handle was released.
    pub fn is_closed(&self) -> bool {
        self.handle.is_closed()
    }

    /// Non-empty collections in display order.
    fn summary_fields(&self) -> Vec<(&'static str, Vec<&str>)> {
        let sets = [
            ("obs", self.obs.column_names().iter().map(String::as_str).collect::<Vec<_>>()),
            ("var", self.var.column_names().iter().map(String::as_str).collect()),
            ("uns", self.uns.iter().map(String::as_str).collect()),
            ("obsm", self.obsm.iter().map(String::as_str).collect()),
            ("varm", self.varm.iter().map(String::as_str).collect()),
            ("layers", self.layers.iter().map(String::as_str).collect()),
            ("obsp", self.obsp.iter().map(String::as_str).collect()),
            ("varp", self.varp.iter().map(String::as_str).collect()),
        ];
        sets.into_iter().filter(|(_, names)| !names.is_empty()).collect()
    }
}

impl Drop for AnnData {
    fn drop(&mut self) {
        if self.handle.close() {
            tracing::debug!(path = %self.path.display(), "AnnData closed on drop");
        }
    }
}

impl fmt::Display for AnnData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AnnData object with n_obs × n_vars = {} × {}",
            self.n_obs(),
            self.n_vars()
        )?;
        for (field, names) in self.summary_fields() {
            let quoted: Vec<String> = names.iter().map(|n| format!("'{n}'")).collect();
            write!(f, "\n\t{field}: {}", quoted.join(", "))?;
        }
        Ok(())
    }
}

impl fmt::Debug for AnnData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnnData")
            .field("path", &self.path)
            .field("n_obs", &self.n_obs())
            .field("n_vars", &self.n_vars())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Fail with every missing required section, sorted.
fn check_fields(reader: &dyn ContainerReader) -> Result<()> {
    let root = reader.root()?;
    let present: BTreeSet<String> = root.child_names()?.into_iter().collect();
    let mut missing: Vec<String> = REQUIRED_FIELDS
        .iter()
        .filter(|field| !present.contains(**field))
        .map(|field| field.to_string())
        .collect();
    if !missing.is_empty() {
        missing.sort();
        tracing::debug!(path = %reader.path().display(), ?missing, "schema check failed");
        return Err(Error::Schema { missing });
    }
    Ok(())
}

fn field_names(handle: &SharedContainer, field: &str) -> Result<BTreeSet<String>> {
    handle.with(|reader| {
        let node = reader
            .node(field)?
            .ok_or_else(|| Error::not_found(field, "/"))?;
        if node.kind() != NodeKind::Group {
            return Err(Error::unsupported(format!("'{field}' is not a group")));
        }
        Ok(node.child_names()?.into_iter().collect())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{MemoryContainer, MemoryNode, RawBuffer};

    fn table(name: &str, labels: &[&str]) -> MemoryNode {
        MemoryNode::group(name).with_child(MemoryNode::strings("_index", labels.iter().copied()))
    }

    fn root() -> MemoryNode {
        MemoryNode::group("/")
            .with_child(MemoryNode::leaf("X", RawBuffer::Float32(vec![0.0; 6])))
            .with_child(
                table("obs", &["c1", "c2"])
                    .with_child(MemoryNode::strings("batch", ["a", "b"])),
            )
            .with_child(table("var", &["g1", "g2", "g3"]))
            .with_child(MemoryNode::group("layers").with_child(MemoryNode::leaf("counts", RawBuffer::Int32(vec![]))))
            .with_child(MemoryNode::group("obsm").with_child(MemoryNode::leaf("X_umap", RawBuffer::Float64(vec![]))))
            .with_child(MemoryNode::group("varm"))
            .with_child(MemoryNode::group("obsp"))
            .with_child(MemoryNode::group("varp"))
            .with_child(
                MemoryNode::group("uns")
                    .with_child(MemoryNode::group("neighbors"))
                    .with_child(MemoryNode::strings("title", ["pbmc"])),
            )
    }

    fn load(root: MemoryNode) -> Result<AnnData> {
        AnnData::from_reader(Box::new(MemoryContainer::new("mem.h5ad", root)))
    }

    #[test]
    fn test_load_counts_and_fields() {
        let adata = load(root()).unwrap();
        assert_eq!(adata.n_obs(), 2);
        assert_eq!(adata.n_vars(), 3);
        assert_eq!(adata.obs_names(), ["c1", "c2"]);
        assert!(adata.layers().contains("counts"));
        assert!(adata.obsm().contains("X_umap"));
        assert!(adata.varm().is_empty());
        assert_eq!(adata.uns().iter().collect::<Vec<_>>(), ["neighbors", "title"]);
    }

    #[test]
    fn test_x_is_optional() {
        let root = MemoryNode::group("/")
            .with_child(table("obs", &[]))
            .with_child(table("var", &[]))
            .with_child(MemoryNode::group("layers"))
            .with_child(MemoryNode::group("obsm"))
            .with_child(MemoryNode::group("varm"))
            .with_child(MemoryNode::group("obsp"))
            .with_child(MemoryNode::group("varp"))
            .with_child(MemoryNode::group("uns"));
        assert!(load(root).is_ok());
    }

    #[test]
    fn test_schema_lists_all_missing() {
        let root = MemoryNode::group("/").with_child(table("obs", &["a"]));
        let err = load(root).unwrap_err();
        match err {
            Error::Schema { missing } => {
                assert_eq!(missing, ["layers", "obsm", "obsp", "uns", "var", "varm", "varp"]);
            }
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn test_display_summary() {
        let adata = load(root()).unwrap();
        let text = adata.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "AnnData object with n_obs × n_vars = 2 × 3");
        assert!(lines.contains(&"\tobs: 'batch'"));
        assert!(lines.contains(&"\tuns: 'neighbors', 'title'"));
        assert!(lines.contains(&"\tlayers: 'counts'"));
        assert!(!text.contains("varm"));
        assert!(!text.contains("\tvar:"));
    }

    #[test]
    fn test_close_idempotent() {
        let adata = load(root()).unwrap();
        assert!(!adata.is_closed());
        adata.close();
        adata.close();
        assert!(adata.is_closed());
        assert_eq!(adata.n_obs(), 2);
        assert_eq!(adata.obs().column_names(), ["batch"]);
        assert!(matches!(adata.obs().get("batch"), Err(Error::Closed)));
    }

    #[test]
    fn test_drop_closes_shared_tables() {
        let adata = load(root()).unwrap();
        let obs = adata.obs().clone();
        drop(adata);
        assert!(matches!(obs.get("batch"), Err(Error::Closed)));
    }

    #[test]
    fn test_open_without_backend_or_file() {
        let result = AnnData::open("/nonexistent/file.h5ad");
        assert!(matches!(result, Err(Error::Open { .. })));
    }
}
