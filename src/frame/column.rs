//! Column decoding.
//!
//! A table column is stored in one of three shapes:
//!
//! ```text
//! leaf array              -> values as stored
//! group {categories,codes} -> categorical, code -1 = missing
//! group {values,mask}      -> nullable, mask true = missing
//! ```

use std::collections::HashSet;

use super::coerce;
use crate::container::{Node, NodeKind};
use crate::util::{Error, Result, Value};

/// Storage shape of a column, inspected once before decoding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Encoding {
    /// Plain leaf array
    Array,
    /// `categories` + `codes`
    Categorical,
    /// `values` + `mask`
    Nullable,
    /// Group with any other layout; carries its child names
    Unknown(Vec<String>),
}

impl Encoding {
    /// Inspect a column node.
    pub fn of(node: &dyn Node) -> Result<Self> {
        if node.kind() == NodeKind::Leaf {
            return Ok(Self::Array);
        }
        if node.has_child("categories")? && node.has_child("codes")? {
            return Ok(Self::Categorical);
        }
        if node.has_child("values")? && node.has_child("mask")? {
            return Ok(Self::Nullable);
        }
        Ok(Self::Unknown(node.child_names()?))
    }
}

/// A decoded column: one value per row.
#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    name: String,
    values: Vec<Value>,
}

impl Column {
    /// Create a column from already decoded values.
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Decode child `name` of a table group.
    pub fn decode(group: &dyn Node, name: &str) -> Result<Self> {
        let node = group
            .child(name)?
            .ok_or_else(|| Error::not_found(name, group.name()))?;
        let values = decode_node(node.as_ref())?;
        Ok(Self::new(name, values))
    }

    /// Column name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All values in row order.
    #[inline]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Consume into the value vector.
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Number of rows.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at row `index`.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Number of null rows.
    pub fn null_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_null()).count()
    }

    /// Distinct values; null counts as one member when present.
    pub fn unique(&self) -> HashSet<&Value> {
        self.values.iter().collect()
    }

    /// Number of distinct values.
    pub fn count_unique(&self) -> usize {
        self.unique().len()
    }

    /// Iterate over values.
    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.values.iter()
    }
}

impl<'a> IntoIterator for &'a Column {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

/// Decode any column node.
pub fn decode_node(node: &dyn Node) -> Result<Vec<Value>> {
    match Encoding::of(node)? {
        Encoding::Array => coerce::to_values(node.raw_buffer()?),
        Encoding::Categorical => decode_categorical(node),
        Encoding::Nullable => decode_nullable(node),
        Encoding::Unknown(keys) => Err(Error::unsupported(format!(
            "unknown group structure for '{}' with keys [{}]",
            node.name(),
            keys.join(", ")
        ))),
    }
}

fn required_leaf<'a>(group: &'a dyn Node, name: &str) -> Result<Box<dyn Node + 'a>> {
    let child = group
        .child(name)?
        .ok_or_else(|| Error::not_found(name, group.name()))?;
    if child.kind() != NodeKind::Leaf {
        return Err(Error::unsupported(format!(
            "'{}/{}' must be an array",
            group.name(),
            name
        )));
    }
    Ok(child)
}

fn decode_categorical(group: &dyn Node) -> Result<Vec<Value>> {
    let categories = coerce::to_values(required_leaf(group, "categories")?.raw_buffer()?)?;
    let codes = coerce::to_codes(required_leaf(group, "codes")?.raw_buffer()?)?;

    codes
        .into_iter()
        .enumerate()
        .map(|(row, code)| {
            if code < 0 {
                return Ok(Value::Null);
            }
            match usize::try_from(code).ok().and_then(|i| categories.get(i)) {
                Some(value) => Ok(value.clone()),
                None => Err(Error::corrupt(format!(
                    "invalid category code {code} at row {row} of '{}' ({} categories); \
                     file is corrupt or unsupported",
                    group.name(),
                    categories.len()
                ))),
            }
        })
        .collect()
}

fn decode_nullable(group: &dyn Node) -> Result<Vec<Value>> {
    let values = coerce::to_values(required_leaf(group, "values")?.raw_buffer()?)?;
    let mask = coerce::to_mask(required_leaf(group, "mask")?.raw_buffer()?)?;

    if mask.len() != values.len() {
        return Err(Error::corrupt(format!(
            "mask of '{}' has {} entries for {} values",
            group.name(),
            mask.len(),
            values.len()
        )));
    }

    Ok(values
        .into_iter()
        .zip(mask)
        .map(|(value, missing)| if missing { Value::Null } else { value })
        .collect())
}
