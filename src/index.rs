//! Spatial index over the postcode gazetteer.
//!
//! Postcodes are embedded on the unit sphere and stored in an R-tree. The
//! straight-line (chord) distance between two unit vectors grows
//! monotonically with the great-circle angle between them, so the tree's
//! Euclidean nearest neighbour is also the haversine nearest neighbour. The
//! reported distance is always the haversine angle, never the chord.

use crate::error::{MatchError, Result};
use crate::normalize::{Located, PostcodePoint};
use log::info;
use nalgebra::Vector3;
use rstar::{primitives::GeomWithData, RTree};

/// Earth's mean radius in metres.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle angle in radians between two (lat, lon) pairs given in radians.
pub fn haversine_angle(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let sin_dlat = (0.5 * (lat1 - lat2)).sin();
    let sin_dlon = (0.5 * (lon1 - lon2)).sin();
    let a = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    2.0 * a.sqrt().min(1.0).asin()
}

/// Position of a (lat, lon) pair, in radians, on the unit sphere.
pub fn unit_vector(lat: f64, lon: f64) -> Vector3<f64> {
    let (sin_lat, cos_lat) = lat.sin_cos();
    let (sin_lon, cos_lon) = lon.sin_cos();
    Vector3::new(cos_lat * cos_lon, cos_lat * sin_lon, sin_lat)
}

type IndexedPostcode = GeomWithData<[f64; 3], usize>;

/// The nearest postcode to a query point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor<'a> {
    pub postcode: &'a PostcodePoint,
    /// Great-circle angle in radians.
    pub angular_distance: f64,
}

/// Read-only nearest-neighbour index, built once per run.
pub struct SpatialIndex {
    tree: RTree<IndexedPostcode>,
    postcodes: Vec<PostcodePoint>,
    radians: Vec<(f64, f64)>,
}

impl SpatialIndex {
    /// Bulk-loads the index. An empty input gives an empty index whose
    /// queries all fail with [`MatchError::EmptyReferenceSet`].
    pub fn build(postcodes: Vec<PostcodePoint>) -> Self {
        let radians: Vec<(f64, f64)> = postcodes.iter().map(|p| p.radians()).collect();
        let entries: Vec<IndexedPostcode> = radians
            .iter()
            .enumerate()
            .map(|(i, &(lat, lon))| {
                let v = unit_vector(lat, lon);
                GeomWithData::new([v.x, v.y, v.z], i)
            })
            .collect();

        let tree = RTree::bulk_load(entries);
        info!("Built spatial index over {} postcodes", postcodes.len());

        Self {
            tree,
            postcodes,
            radians,
        }
    }

    pub fn len(&self) -> usize {
        self.postcodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.postcodes.is_empty()
    }

    pub fn postcodes(&self) -> &[PostcodePoint] {
        &self.postcodes
    }

    /// Nearest postcode to (lat, lon) given in radians.
    pub fn nearest(&self, lat: f64, lon: f64) -> Result<Neighbor<'_>> {
        let q = unit_vector(lat, lon);
        let hit = self
            .tree
            .nearest_neighbor(&[q.x, q.y, q.z])
            .ok_or(MatchError::EmptyReferenceSet)?;

        let i = hit.data;
        let (pc_lat, pc_lon) = self.radians[i];
        Ok(Neighbor {
            postcode: &self.postcodes[i],
            angular_distance: haversine_angle(lat, lon, pc_lat, pc_lon),
        })
    }

    /// Nearest postcode to a located record.
    pub fn nearest_to<T: Located>(&self, point: &T) -> Result<Neighbor<'_>> {
        let (lat, lon) = point.radians();
        self.nearest(lat, lon)
    }
}
