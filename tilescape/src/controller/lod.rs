//! Level of detail from observer altitude.

use tracing::trace;

use crate::coord::{check_level_of_detail, CoordError};
use crate::range::RangeTree;

/// Altitude buckets in world units and the level of detail each selects.
pub const DEFAULT_ALTITUDE_BUCKETS: [(f64, f64, u8); 4] = [
    (0.0, 500.0, 16),
    (500.0, 2000.0, 14),
    (2000.0, 10000.0, 12),
    (10000.0, 50000.0, 9),
];

/// Maps a continuous altitude onto a level of detail.
///
/// Buckets may share boundaries; the bucket with the lowest lower bound
/// wins. Altitudes outside every bucket get the fallback.
#[derive(Debug, Clone)]
pub struct LodSelector {
    buckets: RangeTree<f64, u8>,
    fallback: u8,
}

impl LodSelector {
    pub fn new(fallback: u8) -> Result<Self, CoordError> {
        Ok(Self {
            buckets: RangeTree::new(),
            fallback: check_level_of_detail(fallback)?,
        })
    }

    /// [`DEFAULT_ALTITUDE_BUCKETS`] with `fallback` beyond them.
    pub fn with_defaults(fallback: u8) -> Result<Self, CoordError> {
        DEFAULT_ALTITUDE_BUCKETS
            .iter()
            .try_fold(Self::new(fallback)?, |selector, &(min, max, lod)| {
                selector.with_bucket(min, max, lod)
            })
    }

    pub fn with_bucket(mut self, min: f64, max: f64, lod: u8) -> Result<Self, CoordError> {
        self.buckets.insert(min, max, check_level_of_detail(lod)?);
        Ok(self)
    }

    pub fn select(&self, altitude: f64) -> u8 {
        match self.buckets.first(&altitude) {
            Some(&lod) => lod,
            None => {
                trace!(altitude, fallback = self.fallback, "Altitude outside LOD buckets");
                self.fallback
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_buckets() {
        let selector = LodSelector::with_defaults(16).unwrap();
        assert_eq!(selector.select(0.0), 16);
        assert_eq!(selector.select(499.0), 16);
        assert_eq!(selector.select(500.0), 16);
        assert_eq!(selector.select(501.0), 14);
        assert_eq!(selector.select(5000.0), 12);
        assert_eq!(selector.select(20000.0), 9);
    }

    #[test]
    fn test_fallback_outside_buckets() {
        let selector = LodSelector::with_defaults(3).unwrap();
        assert_eq!(selector.select(-10.0), 3);
        assert_eq!(selector.select(1e9), 3);
        assert_eq!(selector.select(f64::NAN), 3);
    }

    #[test]
    fn test_invalid_levels_rejected() {
        assert_eq!(
            LodSelector::new(24).unwrap_err(),
            CoordError::InvalidLevelOfDetail(24)
        );
        let selector = LodSelector::new(10).unwrap();
        assert!(selector.with_bucket(0.0, 1.0, 64).is_err());
    }
}
