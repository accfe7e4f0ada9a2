//! Rank table: the ordered tile values a merge walks through
//!
//! A rank is an index into the table. Merging two tiles of rank `i` produces a
//! tile of rank `i + 1`; the last rank has no successor.

use serde::{Deserialize, Serialize};

/// Index into a [`RankTable`]
pub type Rank = usize;

/// Ordered tile values and their physical sizes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankTable {
    values: Vec<u32>,
    radii: Vec<f32>,
}

impl RankTable {
    pub fn new(values: Vec<u32>, radii: Vec<f32>) -> Self {
        Self { values, radii }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Tile value for a rank (e.g. 2, 4, 8, ...)
    #[inline]
    pub fn value(&self, rank: Rank) -> Option<u32> {
        self.values.get(rank).copied()
    }

    #[inline]
    pub fn radius(&self, rank: Rank) -> Option<f32> {
        self.radii.get(rank).copied()
    }

    /// Rank produced by merging two tiles of `rank`, None at the top (or out of range)
    pub fn next(&self, rank: Rank) -> Option<Rank> {
        let next = rank + 1;
        (next < self.values.len()).then_some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GameConfig;

    #[test]
    fn test_next_rank() {
        let table = GameConfig::default().rank_table();
        assert_eq!(table.next(0), Some(1));
        assert_eq!(table.value(1), Some(4));
        assert_eq!(table.next(9), Some(10));
        assert_eq!(table.next(10), None);
        assert_eq!(table.next(42), None);
    }

    #[test]
    fn test_top_rank() {
        let table = GameConfig::default().rank_table();
        assert_eq!(table.len(), 11);
        assert_eq!(table.value(10), Some(2048));
        assert_eq!(table.value(11), None);
    }

    #[test]
    fn test_empty_table() {
        let table = RankTable::new(Vec::new(), Vec::new());
        assert!(table.is_empty());
        assert_eq!(table.value(0), None);
        assert_eq!(table.next(0), None);
    }
}
