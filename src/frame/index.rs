//! Row index of a table.

use std::collections::HashSet;

/// Row labels of a table together with the name of the index column.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Index {
    name: String,
    values: Vec<String>,
}

impl Index {
    pub fn new(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// All labels in row order.
    #[inline]
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Name of the index column.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of labels.
    #[inline]
    pub fn size(&self) -> usize {
        self.values.len()
    }

    /// Check if `value` is one of the labels.
    pub fn contains(&self, value: &str) -> bool {
        self.values.iter().any(|v| v == value)
    }

    /// Distinct labels.
    pub fn unique(&self) -> HashSet<&str> {
        self.values.iter().map(String::as_str).collect()
    }

    /// Number of distinct labels.
    pub fn count_unique(&self) -> usize {
        self.unique().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_view() {
        let index = Index::new("_index", vec!["a".into(), "b".into(), "a".into()]);
        assert_eq!(index.name(), "_index");
        assert_eq!(index.size(), 3);
        assert!(index.contains("b"));
        assert!(!index.contains("c"));
        assert_eq!(index.count_unique(), 2);
        assert_eq!(index.count_unique(), index.unique().len());
    }

    #[test]
    fn test_empty_index() {
        let index = Index::new("_index", Vec::new());
        assert_eq!(index.size(), 0);
        assert!(index.unique().is_empty());
        assert_eq!(index.count_unique(), 0);
    }
}
