//! Nearest-postcode matching for property records.
//!
//! Properties and a postcode gazetteer are read from CSV, the gazetteer is
//! indexed on the sphere, and every property is assigned its nearest
//! postcode together with the haversine distance to it. Matches further than
//! `max_match_distance_m` keep their distance but lose the postcode.

pub mod assemble;
pub mod config;
pub mod error;
pub mod gate;
pub mod index;
pub mod logging;
pub mod matcher;
pub mod normalize;
pub mod pipeline;
pub mod trim;

pub use assemble::MatchResult;
pub use config::MatchConfig;
pub use error::{MatchError, Result};
pub use gate::DistanceGate;
pub use index::{SpatialIndex, EARTH_RADIUS_M};
pub use normalize::{PostcodePoint, PropertyPoint};
pub use pipeline::{match_points, run, RunSummary};
