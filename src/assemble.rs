//! Joins property ids with gated matches and writes the output table.

use crate::error::{MatchError, Result};
use crate::gate::GatedMatch;
use crate::normalize::PropertyPoint;
use csv::WriterBuilder;
use log::info;
use serde::{Deserialize, Serialize};
use std::{fs::File, path::Path};
use tempfile::NamedTempFile;

pub const OUTPUT_HEADERS: [&str; 3] = ["property_id", "postcode", "distance_m"];

/// One output row. `postcode` is empty when the nearest postcode was too far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub property_id: String,
    pub postcode: Option<String>,
    pub distance_m: f64,
}

/// Pairs each property with its gated match, in property order.
pub fn assemble(properties: &[PropertyPoint], gated: Vec<GatedMatch>) -> Result<Vec<MatchResult>> {
    if properties.len() != gated.len() {
        return Err(MatchError::CardinalityMismatch {
            properties: properties.len(),
            matches: gated.len(),
        });
    }

    Ok(properties
        .iter()
        .zip(gated)
        .map(|(p, g)| MatchResult {
            property_id: p.property_id.clone(),
            postcode: g.postcode,
            distance_m: g.distance_m,
        })
        .collect())
}

/// Runs `write` against a CSV writer on a temporary file next to `path` and
/// renames it over `path` only if `write` succeeds. On error the temporary
/// file is removed and whatever was at `path` is left untouched.
pub fn write_atomically<T, F>(path: &Path, write: F) -> Result<T>
where
    F: FnOnce(&mut csv::Writer<&mut File>) -> Result<T>,
{
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| MatchError::io(path, e))?;

    let value = {
        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .from_writer(tmp.as_file_mut());
        let value = write(&mut writer)?;
        writer.flush().map_err(|e| MatchError::io(path, e))?;
        value
    };

    tmp.persist(path).map_err(|e| MatchError::io(path, e.error))?;
    Ok(value)
}

/// Writes `results` to `path` in one go, header first.
pub fn write_results(path: &Path, results: &[MatchResult]) -> Result<()> {
    write_atomically(path, |writer| {
        writer
            .write_record(OUTPUT_HEADERS)
            .map_err(|e| MatchError::csv(path, e))?;
        for row in results {
            writer.serialize(row).map_err(|e| MatchError::csv(path, e))?;
        }
        Ok(())
    })?;
    info!("Wrote {} rows to {}", results.len(), path.display());
    Ok(())
}
