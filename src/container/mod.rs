//! Raw container access.
//!
//! The loader never talks to a storage library directly. It walks a tree of
//! [`Node`]s handed out by a [`ContainerReader`]: groups list their children,
//! leaves hand back a [`RawBuffer`] tagged with its element type.
//!
//! Backends:
//! - [`memory`] - in-memory tree, always available
//! - `h5` - `.h5ad` files through the `hdf5` crate (feature `hdf5`)

use std::path::Path;

use crate::util::{Error, Result};

mod handle;
pub mod memory;
#[cfg(feature = "hdf5")]
pub mod h5;

pub use handle::SharedContainer;
pub use memory::{MemoryContainer, MemoryNode};

/// Structural kind of a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// Node with named children
    Group,
    /// Node holding an array
    Leaf,
}

/// Attribute value attached to a node.
#[derive(Clone, Debug, PartialEq)]
pub enum AttrValue {
    Str(String),
    Int(i64),
    Float(f64),
    /// Anything the loader has no use for, described by its type name
    Other(String),
}

impl AttrValue {
    /// Get as string slice, if this is a string attribute.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// Typed contents of a leaf node.
#[derive(Clone, Debug, PartialEq)]
pub enum RawBuffer {
    Bool(Vec<bool>),
    Int8(Vec<i8>),
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Uint8(Vec<u8>),
    Uint16(Vec<u16>),
    Uint32(Vec<u32>),
    Uint64(Vec<u64>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    Str(Vec<String>),
    /// Element type the backend could not map, described by name
    Unsupported(String),
}

impl RawBuffer {
    /// Element type name of this buffer.
    pub fn type_name(&self) -> &str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int8(_) => "int8",
            Self::Int16(_) => "int16",
            Self::Int32(_) => "int32",
            Self::Int64(_) => "int64",
            Self::Uint8(_) => "uint8",
            Self::Uint16(_) => "uint16",
            Self::Uint32(_) => "uint32",
            Self::Uint64(_) => "uint64",
            Self::Float32(_) => "float32",
            Self::Float64(_) => "float64",
            Self::Str(_) => "string",
            Self::Unsupported(name) => name,
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        match self {
            Self::Bool(v) => v.len(),
            Self::Int8(v) => v.len(),
            Self::Int16(v) => v.len(),
            Self::Int32(v) => v.len(),
            Self::Int64(v) => v.len(),
            Self::Uint8(v) => v.len(),
            Self::Uint16(v) => v.len(),
            Self::Uint32(v) => v.len(),
            Self::Uint64(v) => v.len(),
            Self::Float32(v) => v.len(),
            Self::Float64(v) => v.len(),
            Self::Str(v) => v.len(),
            Self::Unsupported(_) => 0,
        }
    }

    /// Check if the buffer holds no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A node in the container hierarchy.
pub trait Node {
    /// Node name (last path component).
    fn name(&self) -> &str;

    /// Group or leaf.
    fn kind(&self) -> NodeKind;

    /// Check if this node is a leaf array.
    fn is_leaf(&self) -> bool {
        self.kind() == NodeKind::Leaf
    }

    /// Names of the immediate children, in storage order.
    /// Leaves have no children.
    fn child_names(&self) -> Result<Vec<String>>;

    /// Get a child by name.
    fn child(&self, name: &str) -> Result<Option<Box<dyn Node + '_>>>;

    /// Check if a child exists.
    fn has_child(&self, name: &str) -> Result<bool> {
        Ok(self.child_names()?.iter().any(|n| n == name))
    }

    /// Read an attribute by name.
    fn attribute(&self, name: &str) -> Result<Option<AttrValue>>;

    /// Leading dimension of a leaf (0 for groups and scalars).
    fn num_rows(&self) -> Result<usize>;

    /// Read the full contents of a leaf.
    fn raw_buffer(&self) -> Result<RawBuffer>;
}

/// An open container file.
pub trait ContainerReader: Send + Sync {
    /// Path the container was opened from.
    fn path(&self) -> &Path;

    /// Get the root group.
    fn root(&self) -> Result<Box<dyn Node + '_>>;

    /// Look up a node by `/`-separated path from the root.
    /// Empty components are ignored, so `"obs"` and `"/obs"` are equal.
    fn node(&self, path: &str) -> Result<Option<Box<dyn Node + '_>>>;
}

impl<N: Node + ?Sized> Node for &N {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn kind(&self) -> NodeKind {
        (**self).kind()
    }

    fn child_names(&self) -> Result<Vec<String>> {
        (**self).child_names()
    }

    fn child(&self, name: &str) -> Result<Option<Box<dyn Node + '_>>> {
        (**self).child(name)
    }

    fn has_child(&self, name: &str) -> Result<bool> {
        (**self).has_child(name)
    }

    fn attribute(&self, name: &str) -> Result<Option<AttrValue>> {
        (**self).attribute(name)
    }

    fn num_rows(&self) -> Result<usize> {
        (**self).num_rows()
    }

    fn raw_buffer(&self) -> Result<RawBuffer> {
        (**self).raw_buffer()
    }
}

/// Open a container file with the compiled-in backend.
pub fn open_container(path: &Path) -> Result<Box<dyn ContainerReader>> {
    #[cfg(feature = "hdf5")]
    {
        let reader = h5::Hdf5Container::open(path)?;
        Ok(Box::new(reader))
    }
    #[cfg(not(feature = "hdf5"))]
    {
        Err(Error::open(
            path,
            "no container backend compiled in (enable the `hdf5` feature)",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_type_names() {
        assert_eq!(RawBuffer::Int8(vec![1, 2]).type_name(), "int8");
        assert_eq!(RawBuffer::Str(vec![]).type_name(), "string");
        assert_eq!(RawBuffer::Unsupported("compound".into()).type_name(), "compound");
        assert_eq!(RawBuffer::Float32(vec![0.5; 3]).len(), 3);
        assert!(RawBuffer::Unsupported("opaque".into()).is_empty());
    }
}
