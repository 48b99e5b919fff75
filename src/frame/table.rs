//! Table (data frame) model over a container group.

use super::coerce;
use super::{Column, Index};
use crate::container::{Node, NodeKind, SharedContainer};
use crate::util::{Error, Result};

/// Attribute naming the index column, and its default value.
pub const INDEX_ATTR: &str = "_index";

/// A row/column labeled table stored as a container group.
///
/// Row labels and column names are read once at construction. Columns are
/// decoded from the container on every [`Table::get`] call and never cached.
#[derive(Clone, Debug)]
pub struct Table {
    path: String,
    column_names: Vec<String>,
    index: Index,
    handle: SharedContainer,
}

impl Table {
    /// Build a table from the group at `path`.
    pub fn open(handle: SharedContainer, path: &str) -> Result<Self> {
        let (column_names, index) = handle.with(|reader| {
            let group = reader
                .node(path)?
                .ok_or_else(|| Error::not_found(path, "/"))?;
            if group.kind() != NodeKind::Group {
                return Err(Error::unsupported(format!("'{path}' is not a group")));
            }
            let index_name = index_name(group.as_ref())?;
            let column_names: Vec<String> = group
                .child_names()?
                .into_iter()
                .filter(|name| *name != index_name)
                .collect();
            let labels = row_labels(group.as_ref(), &index_name)?;
            Ok((column_names, Index::new(index_name, labels)))
        })?;

        tracing::debug!(
            table = path,
            rows = index.size(),
            columns = column_names.len(),
            "table opened"
        );

        Ok(Self {
            path: path.to_string(),
            column_names,
            index,
            handle,
        })
    }

    /// Group path inside the container.
    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Column names in storage order, without the index column.
    #[inline]
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Check if a column exists.
    pub fn has_column(&self, name: &str) -> bool {
        self.column_names.iter().any(|c| c == name)
    }

    /// Row labels.
    #[inline]
    pub fn row_labels(&self) -> &[String] {
        self.index.values()
    }

    /// Number of rows.
    #[inline]
    pub fn row_count(&self) -> usize {
        self.index.size()
    }

    /// Name of the index column.
    #[inline]
    pub fn index_name(&self) -> &str {
        self.index.name()
    }

    /// Index view over the row labels.
    #[inline]
    pub fn index(&self) -> &Index {
        &self.index
    }

    /// Decode a column.
    ///
    /// Every call reads and decodes the column again.
    pub fn get(&self, name: &str) -> Result<Column> {
        let column = self.handle.with(|reader| {
            let group = reader
                .node(&self.path)?
                .ok_or_else(|| Error::not_found(&self.path, "/"))?;
            Column::decode(group.as_ref(), name)
        })?;
        if column.len() != self.row_count() {
            return Err(Error::corrupt(format!(
                "column '{name}' of '{}' has {} values for {} rows",
                self.path,
                column.len(),
                self.row_count()
            )));
        }
        Ok(column)
    }
}

/// Name of the index column: string attribute `_index`, else `_index`.
fn index_name(group: &dyn Node) -> Result<String> {
    Ok(group
        .attribute(INDEX_ATTR)?
        .and_then(|attr| attr.as_str().map(str::to_string))
        .unwrap_or_else(|| INDEX_ATTR.to_string()))
}

fn row_labels(group: &dyn Node, index_name: &str) -> Result<Vec<String>> {
    let index = group
        .child(index_name)?
        .ok_or_else(|| Error::not_found(index_name, group.name()))?;
    if index.kind() != NodeKind::Leaf {
        return Err(Error::unsupported(format!(
            "index '{index_name}' of '{}' is not an array",
            group.name()
        )));
    }
    if index.num_rows()? == 0 {
        return Ok(Vec::new());
    }
    coerce::to_labels(index.raw_buffer()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{AttrValue, MemoryContainer, MemoryNode, RawBuffer};
    use crate::util::Value;

    fn handle(obs: MemoryNode) -> SharedContainer {
        let root = MemoryNode::group("/").with_child(obs);
        SharedContainer::new(Box::new(MemoryContainer::new("t.h5ad", root)))
    }

    #[test]
    fn test_default_index_name() {
        let obs = MemoryNode::group("obs")
            .with_child(MemoryNode::strings("_index", ["c1", "c2"]))
            .with_child(MemoryNode::leaf("n_genes", RawBuffer::Int32(vec![5, 6])));
        let table = Table::open(handle(obs), "obs").unwrap();
        assert_eq!(table.index_name(), "_index");
        assert_eq!(table.column_names(), ["n_genes"]);
        assert_eq!(table.row_labels(), ["c1", "c2"]);
        assert_eq!(table.row_count(), 2);
    }

    #[test]
    fn test_index_attr_override() {
        let obs = MemoryNode::group("obs")
            .with_attr("_index", AttrValue::Str("barcode".into()))
            .with_child(MemoryNode::strings("barcode", ["AAAC", "AAAG"]))
            .with_child(MemoryNode::strings("batch", ["x", "y"]));
        let table = Table::open(handle(obs), "obs").unwrap();
        assert_eq!(table.index_name(), "barcode");
        assert_eq!(table.column_names(), ["batch"]);
        assert!(table.index().contains("AAAG"));
    }

    #[test]
    fn test_non_string_index_attr_falls_back() {
        let obs = MemoryNode::group("obs")
            .with_attr("_index", AttrValue::Int(3))
            .with_child(MemoryNode::strings("_index", ["a"]));
        let table = Table::open(handle(obs), "obs").unwrap();
        assert_eq!(table.index_name(), "_index");
    }

    #[test]
    fn test_integer_index_labels() {
        let var = MemoryNode::group("var")
            .with_child(MemoryNode::leaf("_index", RawBuffer::Int64(vec![10, 11, 12])));
        let table = Table::open(handle(var), "var").unwrap();
        assert_eq!(table.row_labels(), ["10", "11", "12"]);
    }

    #[test]
    fn test_missing_index() {
        let obs = MemoryNode::group("obs").with_child(MemoryNode::strings("batch", ["x"]));
        assert!(matches!(Table::open(handle(obs), "obs"), Err(Error::NotFound { .. })));
    }

    #[test]
    fn test_get_decodes_every_call() {
        let obs = MemoryNode::group("obs")
            .with_child(MemoryNode::strings("_index", ["a", "b"]))
            .with_child(MemoryNode::leaf("score", RawBuffer::Float32(vec![0.5, 1.5])));
        let table = Table::open(handle(obs), "obs").unwrap();
        let first = table.get("score").unwrap();
        let second = table.get("score").unwrap();
        assert_eq!(first, second);
        assert_eq!(first.values(), [Value::Float(0.5), Value::Float(1.5)]);
        assert!(matches!(table.get("missing"), Err(Error::NotFound { .. })));
    }

    #[test]
    fn test_get_rejects_length_mismatch() {
        let obs = MemoryNode::group("obs")
            .with_child(MemoryNode::strings("_index", ["a", "b"]))
            .with_child(MemoryNode::leaf("short", RawBuffer::Int8(vec![1])));
        let table = Table::open(handle(obs), "obs").unwrap();
        assert!(matches!(table.get("short"), Err(Error::CorruptData(_))));
    }

    #[test]
    fn test_get_after_close() {
        let obs = MemoryNode::group("obs")
            .with_child(MemoryNode::strings("_index", ["a"]))
            .with_child(MemoryNode::strings("batch", ["x"]));
        let shared = handle(obs);
        let table = Table::open(shared.clone(), "obs").unwrap();
        shared.close();
        assert_eq!(table.row_labels(), ["a"]);
        assert!(matches!(table.get("batch"), Err(Error::Closed)));
    }
}
