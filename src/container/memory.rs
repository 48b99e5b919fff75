//! In-memory container backend.
//!
//! Holds a complete node tree in memory. Used to build documents without a
//! storage library and as the fixture backend in tests.

use std::path::{Path, PathBuf};

use super::{AttrValue, ContainerReader, Node, NodeKind, RawBuffer};
use crate::util::{Error, Result};

/// A group or leaf held in memory.
#[derive(Clone, Debug)]
pub struct MemoryNode {
    name: String,
    attrs: Vec<(String, AttrValue)>,
    body: Body,
}

#[derive(Clone, Debug)]
enum Body {
    Group(Vec<MemoryNode>),
    Leaf(RawBuffer),
}

impl MemoryNode {
    /// Create an empty group.
    pub fn group(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            body: Body::Group(Vec::new()),
        }
    }

    /// Create a leaf holding `buffer`.
    pub fn leaf(name: impl Into<String>, buffer: RawBuffer) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            body: Body::Leaf(buffer),
        }
    }

    /// Create a string leaf.
    pub fn strings<S: Into<String>>(name: impl Into<String>, values: impl IntoIterator<Item = S>) -> Self {
        Self::leaf(name, RawBuffer::Str(values.into_iter().map(Into::into).collect()))
    }

    /// Add a child, replacing any existing child with the same name.
    /// Has no effect on leaves.
    pub fn with_child(mut self, child: MemoryNode) -> Self {
        self.insert(child);
        self
    }

    /// Add an attribute, replacing any existing value.
    pub fn with_attr(mut self, key: impl Into<String>, value: AttrValue) -> Self {
        let key = key.into();
        if let Some(slot) = self.attrs.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.attrs.push((key, value));
        }
        self
    }

    /// Insert a child in place.
    pub fn insert(&mut self, child: MemoryNode) {
        if let Body::Group(children) = &mut self.body {
            if let Some(existing) = children.iter_mut().find(|c| c.name == child.name) {
                *existing = child;
            } else {
                children.push(child);
            }
        }
    }

    fn find(&self, name: &str) -> Option<&MemoryNode> {
        match &self.body {
            Body::Group(children) => children.iter().find(|c| c.name == name),
            Body::Leaf(_) => None,
        }
    }
}

impl Node for MemoryNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> NodeKind {
        match self.body {
            Body::Group(_) => NodeKind::Group,
            Body::Leaf(_) => NodeKind::Leaf,
        }
    }

    fn child_names(&self) -> Result<Vec<String>> {
        Ok(match &self.body {
            Body::Group(children) => children.iter().map(|c| c.name.clone()).collect(),
            Body::Leaf(_) => Vec::new(),
        })
    }

    fn child(&self, name: &str) -> Result<Option<Box<dyn Node + '_>>> {
        Ok(self.find(name).map(|c| Box::new(c) as Box<dyn Node + '_>))
    }

    fn has_child(&self, name: &str) -> Result<bool> {
        Ok(self.find(name).is_some())
    }

    fn attribute(&self, name: &str) -> Result<Option<AttrValue>> {
        Ok(self
            .attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.clone()))
    }

    fn num_rows(&self) -> Result<usize> {
        Ok(match &self.body {
            Body::Group(_) => 0,
            Body::Leaf(buffer) => buffer.len(),
        })
    }

    fn raw_buffer(&self) -> Result<RawBuffer> {
        match &self.body {
            Body::Leaf(buffer) => Ok(buffer.clone()),
            Body::Group(_) => Err(Error::unsupported(format!(
                "'{}' is a group, not an array",
                self.name
            ))),
        }
    }
}

/// Container whose whole tree lives in memory.
#[derive(Clone, Debug)]
pub struct MemoryContainer {
    path: PathBuf,
    root: MemoryNode,
}

impl MemoryContainer {
    /// Wrap a root group. `path` is only reported, never read.
    pub fn new(path: impl Into<PathBuf>, root: MemoryNode) -> Self {
        Self {
            path: path.into(),
            root,
        }
    }

    /// Get the root node.
    pub fn root_node(&self) -> &MemoryNode {
        &self.root
    }
}

impl ContainerReader for MemoryContainer {
    fn path(&self) -> &Path {
        &self.path
    }

    fn root(&self) -> Result<Box<dyn Node + '_>> {
        Ok(Box::new(&self.root))
    }

    fn node(&self, path: &str) -> Result<Option<Box<dyn Node + '_>>> {
        let mut current = &self.root;
        for part in path.split('/').filter(|p| !p.is_empty()) {
            match current.find(part) {
                Some(next) => current = next,
                None => return Ok(None),
            }
        }
        Ok(Some(Box::new(current)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MemoryContainer {
        let obs = MemoryNode::group("obs")
            .with_attr("_index", AttrValue::Str("cell".into()))
            .with_child(MemoryNode::strings("cell", ["a", "b"]))
            .with_child(MemoryNode::leaf("n_genes", RawBuffer::Int32(vec![3, 4])));
        MemoryContainer::new("mem.h5ad", MemoryNode::group("/").with_child(obs))
    }

    #[test]
    fn test_lookup_by_path() {
        let c = sample();
        let obs = c.node("/obs").unwrap().expect("obs");
        assert_eq!(obs.kind(), NodeKind::Group);
        assert_eq!(obs.child_names().unwrap(), vec!["cell", "n_genes"]);

        let leaf = c.node("obs/n_genes").unwrap().expect("leaf");
        assert!(leaf.is_leaf());
        assert_eq!(leaf.num_rows().unwrap(), 2);
        assert!(c.node("obs/missing").unwrap().is_none());
    }

    #[test]
    fn test_attributes() {
        let c = sample();
        let obs = c.node("obs").unwrap().unwrap();
        let attr = obs.attribute("_index").unwrap();
        assert_eq!(attr.as_ref().and_then(AttrValue::as_str), Some("cell"));
        assert!(obs.attribute("missing").unwrap().is_none());
    }

    #[test]
    fn test_insert_replaces() {
        let g = MemoryNode::group("g")
            .with_child(MemoryNode::strings("x", ["1"]))
            .with_child(MemoryNode::strings("x", ["1", "2"]));
        assert_eq!(g.child_names().unwrap(), vec!["x"]);
        assert_eq!(g.child("x").unwrap().unwrap().num_rows().unwrap(), 2);
    }

    #[test]
    fn test_group_has_no_buffer() {
        let g = MemoryNode::group("g");
        assert!(matches!(g.raw_buffer(), Err(Error::UnsupportedType(_))));
    }
}
