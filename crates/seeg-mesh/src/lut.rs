//! Region lookup tables.
//!
//! A [`RegionLut`] associates the contiguous index range
//! `[start, start + len)` with distinct region names, in both directions.

use std::collections::{BTreeMap, HashMap};

use seeg_core::LutError;

/// Ordered bidirectional index/name table.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegionLut {
    start: usize,
    names: Vec<String>,
    indices: HashMap<String, usize>,
}

impl RegionLut {
    /// Create an empty table whose first index will be `start`.
    #[must_use]
    pub fn with_start(start: usize) -> Self {
        Self {
            start,
            names: Vec::new(),
            indices: HashMap::new(),
        }
    }

    /// Build a table from `(index, name)` pairs in any order.
    ///
    /// The smallest index becomes the start of the range.
    ///
    /// # Errors
    ///
    /// `IndexCollision`, `IndexGap` or `NameCollision`.
    pub fn from_entries<I, S>(entries: I) -> Result<Self, LutError>
    where
        I: IntoIterator<Item = (usize, S)>,
        S: Into<String>,
    {
        let mut ordered: BTreeMap<usize, String> = BTreeMap::new();
        for (index, name) in entries {
            let name = name.into();
            if let Some(existing) = ordered.get(&index) {
                return Err(LutError::IndexCollision {
                    index,
                    existing: existing.clone(),
                    name,
                });
            }
            ordered.insert(index, name);
        }

        let start = ordered.keys().next().copied().unwrap_or(0);
        let mut lut = Self::with_start(start);
        for (index, name) in ordered {
            if index != lut.end() {
                return Err(LutError::IndexGap {
                    expected: lut.end(),
                    found: index,
                });
            }
            lut.push(name)?;
        }
        Ok(lut)
    }

    /// Append a name at the next index and return that index.
    ///
    /// # Errors
    ///
    /// `NameCollision` if the name is already present.
    pub fn push(&mut self, name: impl Into<String>) -> Result<usize, LutError> {
        let name = name.into();
        let index = self.end();
        if let Some(&existing) = self.indices.get(&name) {
            return Err(LutError::NameCollision {
                name,
                existing,
                index,
            });
        }
        self.indices.insert(name.clone(), index);
        self.names.push(name);
        Ok(index)
    }

    /// First index of the range.
    #[must_use]
    pub fn start(&self) -> usize {
        self.start
    }

    /// One past the last index of the range.
    #[must_use]
    pub fn end(&self) -> usize {
        self.start + self.names.len()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Check if the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Name stored at `index`.
    #[must_use]
    pub fn name(&self, index: usize) -> Option<&str> {
        index
            .checked_sub(self.start)
            .and_then(|i| self.names.get(i))
            .map(String::as_str)
    }

    /// Index of `name`.
    #[must_use]
    pub fn index(&self, name: &str) -> Option<usize> {
        self.indices.get(name).copied()
    }

    /// `(index, name)` pairs in index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> + '_ {
        self.names
            .iter()
            .enumerate()
            .map(move |(i, name)| (self.start + i, name.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_assigns_contiguous_indices() {
        let mut lut = RegionLut::with_start(5);
        assert_eq!(lut.push("a").unwrap(), 5);
        assert_eq!(lut.push("b").unwrap(), 6);
        assert_eq!(lut.end(), 7);
        assert_eq!(lut.name(6), Some("b"));
        assert_eq!(lut.name(4), None);
        assert_eq!(lut.index("a"), Some(5));
    }

    #[test]
    fn test_push_rejects_duplicate_name() {
        let mut lut = RegionLut::with_start(0);
        lut.push("a").unwrap();
        assert_eq!(
            lut.push("a"),
            Err(LutError::NameCollision { name: "a".into(), existing: 0, index: 1 })
        );
    }

    #[test]
    fn test_from_entries_any_order() {
        let lut = RegionLut::from_entries([(3, "c"), (1, "a"), (2, "b")]).unwrap();
        assert_eq!(lut.start(), 1);
        let entries: Vec<_> = lut.iter().collect();
        assert_eq!(entries, vec![(1, "a"), (2, "b"), (3, "c")]);
    }

    #[test]
    fn test_from_entries_rejects_gap_and_collision() {
        assert_eq!(
            RegionLut::from_entries([(0, "a"), (2, "b")]),
            Err(LutError::IndexGap { expected: 1, found: 2 })
        );
        assert!(matches!(
            RegionLut::from_entries([(0, "a"), (0, "b")]),
            Err(LutError::IndexCollision { index: 0, .. })
        ));
    }
}
