//! Closed intervals and interval lookup.
//!
//! [`Range`] is used for level-of-detail ranges (provider selection, bulk
//! store imports) and [`RangeTree`] for bucketing a continuous value, such as
//! observer distance, into a level of detail.

use std::fmt;
use std::str::FromStr;

/// Closed interval `[min, max]`.
///
/// Validity (`min <= max`) is checked with [`Range::is_valid`], not enforced
/// at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range<T> {
    pub min: T,
    pub max: T,
}

impl<T: PartialOrd + Copy> Range<T> {
    pub const fn new(min: T, max: T) -> Self {
        Self { min, max }
    }

    pub fn is_valid(&self) -> bool {
        self.min <= self.max
    }

    pub fn contains(&self, value: &T) -> bool {
        *value >= self.min && *value <= self.max
    }

    pub fn overlaps(&self, other: &Range<T>) -> bool {
        self.min <= other.max && other.min <= self.max
    }
}

impl<T: fmt::Display> fmt::Display for Range<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

/// Error parsing a `min-max` range string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRangeError(pub String);

impl fmt::Display for ParseRangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid range '{}': expected 'min-max'", self.0)
    }
}

impl std::error::Error for ParseRangeError {}

impl<T: FromStr + PartialOrd + Copy> FromStr for Range<T> {
    type Err = ParseRangeError;

    /// Parses `"min-max"`; a single value `"n"` is the degenerate range `n-n`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseRangeError(s.to_string());
        let s = s.trim();
        let (min, max) = match s.split_once('-') {
            Some((min, max)) => (min.trim(), max.trim()),
            None => (s, s),
        };
        let min = min.parse().map_err(|_| err())?;
        let max = max.parse().map_err(|_| err())?;
        Ok(Range::new(min, max))
    }
}

/// Set of (possibly overlapping) closed intervals with an attached value.
///
/// Lookups return every value whose interval contains the key, ordered by
/// `min`; intervals sharing a `min` keep insertion order. The sorted order
/// lets scans stop early.
#[derive(Debug, Clone)]
pub struct RangeTree<K, V> {
    entries: Vec<(Range<K>, V)>,
}

impl<K: PartialOrd + Copy, V> Default for RangeTree<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: PartialOrd + Copy, V> RangeTree<K, V> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Adds `value` for the interval `[min, max]`.
    pub fn insert(&mut self, min: K, max: K, value: V) {
        let at = self.entries.partition_point(|(range, _)| range.min <= min);
        self.entries.insert(at, (Range::new(min, max), value));
    }

    /// Every value whose interval contains `key`.
    pub fn get<'a>(&'a self, key: &K) -> impl Iterator<Item = &'a V> + 'a {
        let key = *key;
        self.entries
            .iter()
            .take_while(move |(range, _)| range.min <= key)
            .filter(move |(range, _)| range.contains(&key))
            .map(|(_, value)| value)
    }

    /// First value (lowest `min`) whose interval contains `key`.
    pub fn first(&self, key: &K) -> Option<&V> {
        self.get(key).next()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Range<K>, &V)> {
        self.entries.iter().map(|(range, value)| (range, value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_contains_is_inclusive() {
        let range = Range::new(1, 15);
        assert!(range.contains(&1));
        assert!(range.contains(&15));
        assert!(!range.contains(&0));
        assert!(!range.contains(&16));
    }

    #[test]
    fn test_range_validity_is_checked_not_enforced() {
        let range = Range::new(5.0, 1.0);
        assert!(!range.is_valid());
        assert!(!range.contains(&3.0));
        assert!(Range::new(1.0, 1.0).is_valid());
    }

    #[test]
    fn test_range_overlaps() {
        let a = Range::new(1u8, 10);
        assert!(a.overlaps(&Range::new(10, 20)));
        assert!(a.overlaps(&Range::new(3, 4)));
        assert!(!a.overlaps(&Range::new(11, 20)));
    }

    #[test]
    fn test_range_parse() {
        assert_eq!("16-23".parse::<Range<u8>>().unwrap(), Range::new(16, 23));
        assert_eq!(" 1 - 15 ".parse::<Range<u8>>().unwrap(), Range::new(1, 15));
        assert_eq!("9".parse::<Range<u8>>().unwrap(), Range::new(9, 9));
        assert!("a-b".parse::<Range<u8>>().is_err());
        assert_eq!(Range::new(1u8, 15).to_string(), "1-15");
    }

    #[test]
    fn test_range_tree_lookup() {
        let mut tree = RangeTree::new();
        tree.insert(0.0, 500.0, 16u8);
        tree.insert(500.0, 2000.0, 14);
        tree.insert(2000.0, 10000.0, 12);

        assert_eq!(tree.first(&100.0), Some(&16));
        assert_eq!(tree.first(&1500.0), Some(&14));
        assert_eq!(tree.first(&20000.0), None);

        // Shared boundaries match both buckets, lowest first
        let at_boundary: Vec<_> = tree.get(&500.0).copied().collect();
        assert_eq!(at_boundary, vec![16, 14]);
    }

    #[test]
    fn test_range_tree_keeps_min_order() {
        let mut tree = RangeTree::new();
        tree.insert(10, 20, "b");
        tree.insert(0, 30, "a");
        tree.insert(15, 16, "c");

        let mins: Vec<_> = tree.iter().map(|(range, _)| range.min).collect();
        assert_eq!(mins, vec![0, 10, 15]);

        let hits: Vec<_> = tree.get(&15).copied().collect();
        assert_eq!(hits, vec!["a", "b", "c"]);
        assert_eq!(tree.len(), 3);
    }
}
