//! HDF5 container backend for `.h5ad` files.
//!
//! Requires the `hdf5` feature flag and a system HDF5 library installation
//! (`brew install hdf5` on macOS, `apt install libhdf5-dev` on Linux).

use std::path::{Path, PathBuf};

use hdf5::types::{
    FixedAscii, FixedUnicode, FloatSize, IntSize, TypeDescriptor, VarLenAscii, VarLenUnicode,
};
use hdf5::{Container, Dataset, File, Group};

use super::{AttrValue, ContainerReader, Node, NodeKind, RawBuffer};
use crate::util::{Error, Result};

fn h5err(e: hdf5::Error) -> Error {
    Error::unsupported(format!("HDF5 error: {e}"))
}

/// An open `.h5ad` file.
pub struct Hdf5Container {
    path: PathBuf,
    file: File,
}

impl Hdf5Container {
    /// Open a file read-only.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::open(path, "file does not exist"));
        }
        let file = File::open(path).map_err(|e| Error::open(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }
}

impl ContainerReader for Hdf5Container {
    fn path(&self) -> &Path {
        &self.path
    }

    fn root(&self) -> Result<Box<dyn Node + '_>> {
        let root = self.file.group("/").map_err(h5err)?;
        Ok(Box::new(Hdf5Node::Group {
            name: "/".to_string(),
            group: root,
        }))
    }

    fn node(&self, path: &str) -> Result<Option<Box<dyn Node + '_>>> {
        let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
        let Some((last, parents)) = parts.split_last() else {
            return self.root().map(Some);
        };
        let mut group = self.file.group("/").map_err(h5err)?;
        for part in parents {
            if !group.link_exists(part) {
                return Ok(None);
            }
            group = match group.group(part) {
                Ok(g) => g,
                Err(_) => return Ok(None),
            };
        }
        Ok(Hdf5Node::lookup(&group, last).map(|n| Box::new(n) as Box<dyn Node + '_>))
    }
}

/// Group or dataset handle.
enum Hdf5Node {
    Group { name: String, group: Group },
    Dataset { name: String, dataset: Dataset },
}

impl Hdf5Node {
    fn lookup(parent: &Group, name: &str) -> Option<Self> {
        if !parent.link_exists(name) {
            return None;
        }
        if let Ok(dataset) = parent.dataset(name) {
            return Some(Self::Dataset {
                name: name.to_string(),
                dataset,
            });
        }
        parent.group(name).ok().map(|group| Self::Group {
            name: name.to_string(),
            group,
        })
    }
}

impl Node for Hdf5Node {
    fn name(&self) -> &str {
        match self {
            Self::Group { name, .. } | Self::Dataset { name, .. } => name,
        }
    }

    fn kind(&self) -> NodeKind {
        match self {
            Self::Group { .. } => NodeKind::Group,
            Self::Dataset { .. } => NodeKind::Leaf,
        }
    }

    fn child_names(&self) -> Result<Vec<String>> {
        match self {
            Self::Group { group, .. } => group.member_names().map_err(h5err),
            Self::Dataset { .. } => Ok(Vec::new()),
        }
    }

    fn child(&self, name: &str) -> Result<Option<Box<dyn Node + '_>>> {
        match self {
            Self::Group { group, .. } => {
                Ok(Self::lookup(group, name).map(|n| Box::new(n) as Box<dyn Node + '_>))
            }
            Self::Dataset { .. } => Ok(None),
        }
    }

    fn has_child(&self, name: &str) -> Result<bool> {
        match self {
            Self::Group { group, .. } => Ok(group.link_exists(name)),
            Self::Dataset { .. } => Ok(false),
        }
    }

    fn attribute(&self, name: &str) -> Result<Option<AttrValue>> {
        let found = match self {
            Self::Group { group, .. } => group.attr(name),
            Self::Dataset { dataset, .. } => dataset.attr(name),
        };
        let Ok(attr) = found else {
            return Ok(None);
        };
        let descriptor = attr
            .dtype()
            .and_then(|t| t.to_descriptor())
            .map_err(h5err)?;
        let value = match descriptor {
            TypeDescriptor::VarLenUnicode => {
                AttrValue::Str(attr.read_scalar::<VarLenUnicode>().map_err(h5err)?.as_str().to_string())
            }
            TypeDescriptor::VarLenAscii => {
                AttrValue::Str(attr.read_scalar::<VarLenAscii>().map_err(h5err)?.as_str().to_string())
            }
            TypeDescriptor::FixedAscii(len) if attr.is_scalar() => {
                AttrValue::Str(read_fixed_strings(&attr, len, false)?.concat())
            }
            TypeDescriptor::FixedUnicode(len) if attr.is_scalar() => {
                AttrValue::Str(read_fixed_strings(&attr, len, true)?.concat())
            }
            TypeDescriptor::Integer(_) | TypeDescriptor::Unsigned(_) if attr.is_scalar() => {
                AttrValue::Int(attr.read_scalar::<i64>().map_err(h5err)?)
            }
            TypeDescriptor::Float(_) if attr.is_scalar() => {
                AttrValue::Float(attr.read_scalar::<f64>().map_err(h5err)?)
            }
            other => AttrValue::Other(other.to_string()),
        };
        Ok(Some(value))
    }

    fn num_rows(&self) -> Result<usize> {
        match self {
            Self::Group { .. } => Ok(0),
            Self::Dataset { dataset, .. } => Ok(dataset.shape().first().copied().unwrap_or(0)),
        }
    }

    fn raw_buffer(&self) -> Result<RawBuffer> {
        let Self::Dataset { dataset, name } = self else {
            return Err(Error::unsupported(format!("'{}' is a group, not an array", self.name())));
        };
        let descriptor = dataset
            .dtype()
            .and_then(|t| t.to_descriptor())
            .map_err(h5err)?;
        read_dataset(dataset, &descriptor).map_err(|e| match e {
            Error::UnsupportedType(msg) => Error::unsupported(format!("{name}: {msg}")),
            other => other,
        })
    }
}

fn read_dataset(ds: &Dataset, descriptor: &TypeDescriptor) -> Result<RawBuffer> {
    let buffer = match descriptor {
        TypeDescriptor::Integer(size) => read_signed(ds, *size)?,
        TypeDescriptor::Unsigned(size) => read_unsigned(ds, *size)?,
        TypeDescriptor::Float(FloatSize::U4) => RawBuffer::Float32(ds.read_raw().map_err(h5err)?),
        TypeDescriptor::Float(FloatSize::U8) => RawBuffer::Float64(ds.read_raw().map_err(h5err)?),
        TypeDescriptor::Boolean => RawBuffer::Bool(ds.read_raw().map_err(h5err)?),
        // Non-boolean enums are read through their base integer type.
        TypeDescriptor::Enum(enum_type) if enum_type.signed => read_signed(ds, enum_type.size)?,
        TypeDescriptor::Enum(enum_type) => read_unsigned(ds, enum_type.size)?,
        TypeDescriptor::VarLenUnicode => RawBuffer::Str(
            ds.read_raw::<VarLenUnicode>()
                .map_err(h5err)?
                .iter()
                .map(|s| s.as_str().to_string())
                .collect(),
        ),
        TypeDescriptor::VarLenAscii => RawBuffer::Str(
            ds.read_raw::<VarLenAscii>()
                .map_err(h5err)?
                .iter()
                .map(|s| s.as_str().to_string())
                .collect(),
        ),
        TypeDescriptor::FixedAscii(len) => RawBuffer::Str(read_fixed_strings(ds, *len, false)?),
        TypeDescriptor::FixedUnicode(len) => RawBuffer::Str(read_fixed_strings(ds, *len, true)?),
        other => RawBuffer::Unsupported(other.to_string()),
    };
    Ok(buffer)
}

/// Read fixed-length strings into the smallest bucket that holds `$len`
/// bytes; HDF5 pads on the way.
macro_rules! read_fixed {
    ($container:expr, $ty:ident, $len:expr, $($cap:literal)+) => {
        match $len {
            $(n if n <= $cap => $container
                .read_raw::<$ty<$cap>>()
                .map_err(h5err)?
                .iter()
                .map(|s| s.as_str().to_string())
                .collect::<Vec<String>>(),)+
            n => return Err(Error::unsupported(format!("fixed-length string of {n} bytes"))),
        }
    };
}

fn read_fixed_strings(container: &Container, len: usize, unicode: bool) -> Result<Vec<String>> {
    Ok(if unicode {
        read_fixed!(container, FixedUnicode, len, 16 64 256 1024 4096)
    } else {
        read_fixed!(container, FixedAscii, len, 16 64 256 1024 4096)
    })
}

fn read_signed(ds: &Dataset, size: IntSize) -> Result<RawBuffer> {
    Ok(match size {
        IntSize::U1 => RawBuffer::Int8(ds.read_raw().map_err(h5err)?),
        IntSize::U2 => RawBuffer::Int16(ds.read_raw().map_err(h5err)?),
        IntSize::U4 => RawBuffer::Int32(ds.read_raw().map_err(h5err)?),
        IntSize::U8 => RawBuffer::Int64(ds.read_raw().map_err(h5err)?),
    })
}

fn read_unsigned(ds: &Dataset, size: IntSize) -> Result<RawBuffer> {
    Ok(match size {
        IntSize::U1 => RawBuffer::Uint8(ds.read_raw().map_err(h5err)?),
        IntSize::U2 => RawBuffer::Uint16(ds.read_raw().map_err(h5err)?),
        IntSize::U4 => RawBuffer::Uint32(ds.read_raw().map_err(h5err)?),
        IntSize::U8 => RawBuffer::Uint64(ds.read_raw().map_err(h5err)?),
    })
}
