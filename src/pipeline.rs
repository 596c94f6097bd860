//! End-to-end property -> postcode run.

use crate::assemble::{assemble, write_results, MatchResult};
use crate::config::MatchConfig;
use crate::error::{MatchError, Result};
use crate::gate::DistanceGate;
use crate::index::SpatialIndex;
use crate::matcher::match_nearest;
use crate::normalize::{load_points, PostcodePoint, PropertyPoint};
use itertools::Itertools;
use log::{info, warn};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub properties: usize,
    pub postcodes: usize,
    pub dropped_properties: usize,
    pub dropped_postcodes: usize,
    pub matched: usize,
    pub rejected: usize,
}

/// Matches already-normalised properties against an index.
pub fn match_properties(
    properties: &[PropertyPoint],
    index: &SpatialIndex,
    gate: &DistanceGate,
    parallel: bool,
) -> Result<Vec<MatchResult>> {
    if index.is_empty() {
        return Err(MatchError::EmptyReferenceSet);
    }
    let neighbors = match_nearest(properties, index, parallel)?;
    let gated = gate.apply_all(&neighbors);
    assemble(properties, gated)
}

/// In-memory form of a full run: index `postcodes`, match `properties`.
pub fn match_points(
    properties: &[PropertyPoint],
    postcodes: Vec<PostcodePoint>,
    gate: &DistanceGate,
    parallel: bool,
) -> Result<Vec<MatchResult>> {
    if postcodes.is_empty() {
        return Err(MatchError::EmptyReferenceSet);
    }
    let index = SpatialIndex::build(postcodes);
    match_properties(properties, &index, gate, parallel)
}

/// Reads both tables, matches, and writes the output table. Nothing is
/// written unless every step succeeds.
pub fn run(config: &MatchConfig) -> Result<RunSummary> {
    config.validate()?;

    let postcodes = load_points::<PostcodePoint>(&config.postcodes_path)?;
    if postcodes.points.is_empty() {
        return Err(MatchError::EmptyReferenceSet);
    }
    let dropped_postcodes = postcodes.dropped.total();
    let index = SpatialIndex::build(postcodes.points);

    let properties = load_points::<PropertyPoint>(&config.properties_path)?;
    let duplicates = properties
        .points
        .iter()
        .map(|p| p.property_id.as_str())
        .duplicates()
        .count();
    if duplicates > 0 {
        warn!("{} property ids appear more than once", duplicates);
    }

    let gate = DistanceGate::new(config.max_match_distance_m);
    let results = match_properties(&properties.points, &index, &gate, config.parallel)?;

    let matched = results.iter().filter(|r| r.postcode.is_some()).count();
    let summary = RunSummary {
        properties: results.len(),
        postcodes: index.len(),
        dropped_properties: properties.dropped.total(),
        dropped_postcodes,
        matched,
        rejected: results.len() - matched,
    };
    info!(
        "Matched {} of {} properties within {} m ({} rejected)",
        summary.matched, summary.properties, config.max_match_distance_m, summary.rejected
    );

    write_results(&config.output_path, &results)?;
    Ok(summary)
}
