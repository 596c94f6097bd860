//! Distance-based acceptance of nearest-postcode matches.

use crate::config::DEFAULT_MAX_MATCH_DISTANCE_M;
use crate::index::{Neighbor, EARTH_RADIUS_M};

/// A nearest-postcode match after the distance check. `postcode` is `Some`
/// iff `distance_m <= max_match_distance_m`; the distance is kept either way.
#[derive(Debug, Clone, PartialEq)]
pub struct GatedMatch {
    pub postcode: Option<String>,
    pub distance_m: f64,
}

impl GatedMatch {
    pub fn is_accepted(&self) -> bool {
        self.postcode.is_some()
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DistanceGate {
    pub max_match_distance_m: f64,
}

impl Default for DistanceGate {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_MATCH_DISTANCE_M)
    }
}

impl DistanceGate {
    pub fn new(max_match_distance_m: f64) -> Self {
        Self {
            max_match_distance_m,
        }
    }

    /// Inclusive: a match exactly at the threshold is kept.
    pub fn accepts(&self, distance_m: f64) -> bool {
        distance_m <= self.max_match_distance_m
    }

    pub fn apply(&self, neighbor: &Neighbor<'_>) -> GatedMatch {
        let distance_m = neighbor.angular_distance * EARTH_RADIUS_M;
        GatedMatch {
            postcode: self
                .accepts(distance_m)
                .then(|| neighbor.postcode.postcode.clone()),
            distance_m,
        }
    }

    pub fn apply_all(&self, neighbors: &[Neighbor<'_>]) -> Vec<GatedMatch> {
        neighbors.iter().map(|n| self.apply(n)).collect()
    }
}
