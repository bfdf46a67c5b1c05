//! Symbol frequency tables
//!
//! Frequency tables feed the prefix-code builder and the size estimators.
//! They iterate in symbol order so that code construction, and therefore
//! every reported size, is reproducible from run to run.

use std::collections::btree_map::{self, BTreeMap};

/// Frequency histogram over an ordered symbol alphabet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencyTable<S: Ord> {
    counts: BTreeMap<S, u64>,
    total: u64,
}

impl<S: Ord> Default for FrequencyTable<S> {
    fn default() -> Self {
        Self {
            counts: BTreeMap::new(),
            total: 0,
        }
    }
}

impl<S: Ord> FrequencyTable<S> {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one occurrence of `symbol`
    #[inline]
    pub fn record(&mut self, symbol: S) {
        self.add(symbol, 1);
    }

    /// Count `count` occurrences of `symbol`
    pub fn add(&mut self, symbol: S, count: u64) {
        *self.counts.entry(symbol).or_insert(0) += count;
        self.total += count;
    }

    /// Occurrences of `symbol` (0 if never seen)
    pub fn get(&self, symbol: &S) -> u64 {
        self.counts.get(symbol).copied().unwrap_or(0)
    }

    /// Sum of all counts
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Number of distinct symbols
    pub fn distinct(&self) -> usize {
        self.counts.len()
    }

    /// True if nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// `(symbol, count)` pairs in symbol order
    pub fn iter(&self) -> btree_map::Iter<'_, S, u64> {
        self.counts.iter()
    }

    /// `(symbol, count)` pairs, most frequent first, ties in symbol order
    pub fn by_frequency(&self) -> Vec<(&S, u64)> {
        let mut entries: Vec<(&S, u64)> = self.counts.iter().map(|(s, &c)| (s, c)).collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        entries
    }

    /// Fold another table into this one
    pub fn merge(&mut self, other: &FrequencyTable<S>)
    where
        S: Clone,
    {
        for (symbol, &count) in &other.counts {
            self.add(symbol.clone(), count);
        }
    }
}

impl<S: Ord> FromIterator<S> for FrequencyTable<S> {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut table = Self::new();
        for symbol in iter {
            table.record(symbol);
        }
        table
    }
}

impl<'a, S: Ord> IntoIterator for &'a FrequencyTable<S> {
    type Item = (&'a S, &'a u64);
    type IntoIter = btree_map::Iter<'a, S, u64>;

    fn into_iter(self) -> Self::IntoIter {
        self.counts.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_totals() {
        let table: FrequencyTable<u64> = [4, 4, 0, 8, 4].into_iter().collect();
        assert_eq!(table.get(&4), 3);
        assert_eq!(table.get(&99), 0);
        assert_eq!(table.total(), 5);
        assert_eq!(table.distinct(), 3);
    }

    #[test]
    fn test_by_frequency_is_stable() {
        let mut table = FrequencyTable::new();
        table.add("b", 2);
        table.add("a", 2);
        table.add("c", 5);
        let order: Vec<&str> = table.by_frequency().into_iter().map(|(s, _)| *s).collect();
        assert_eq!(order, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_merge() {
        let mut a: FrequencyTable<i64> = [-1, 0, 0].into_iter().collect();
        let b: FrequencyTable<i64> = [0, 1].into_iter().collect();
        a.merge(&b);
        assert_eq!(a.get(&0), 3);
        assert_eq!(a.get(&-1), 1);
        assert_eq!(a.total(), 5);
        assert!(!a.is_empty());
    }
}
