//! Coordinate normalisation for property and postcode tables.
//!
//! Source tables name their columns inconsistently (`lat`, `Latitude`,
//! `LONGITUDE`, `lng`, ...). Columns are located by alias, coordinates are
//! parsed as degrees and rows without a usable coordinate pair are dropped
//! and counted rather than failing the run. Row order is preserved.

use crate::error::{MatchError, Result};
use csv::{ReaderBuilder, StringRecord};
use itertools::Itertools;
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::{fs::File, io::Read, path::Path};

/// A named column together with the header spellings that select it.
pub struct ColumnAlias {
    name: &'static str,
    pattern: Regex,
}

impl ColumnAlias {
    fn new(name: &'static str, alternatives: &str) -> Self {
        let pattern = Regex::new(&format!(r"(?i)^\s*(?:{alternatives})\s*$"))
            .expect("column alias pattern is a valid regex");
        Self { name, pattern }
    }

    /// Position of the first header (left to right) matching this alias.
    pub fn find(&self, headers: &StringRecord) -> Option<usize> {
        headers.iter().position(|h| self.pattern.is_match(h))
    }

    fn resolve(&self, headers: &StringRecord, source: &Path) -> Result<usize> {
        self.find(headers).ok_or_else(|| MatchError::MissingColumn {
            path: source.to_path_buf(),
            column: self.name,
            headers: headers.iter().join(", "),
        })
    }
}

pub static PROPERTY_ID: Lazy<ColumnAlias> =
    Lazy::new(|| ColumnAlias::new("id", "id|property_id|uprn"));
pub static POSTCODE: Lazy<ColumnAlias> =
    Lazy::new(|| ColumnAlias::new("postcode", "postcode|pcd|pcode"));
pub static LATITUDE: Lazy<ColumnAlias> = Lazy::new(|| ColumnAlias::new("latitude", "lat|latitude"));
pub static LONGITUDE: Lazy<ColumnAlias> =
    Lazy::new(|| ColumnAlias::new("longitude", "lon|lng|long|longitude"));

/// Why a row was left out of the normalised output.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Exclusion {
    MissingCoordinate,
    MissingKey,
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct DropCounts {
    pub missing_coordinate: usize,
    pub missing_key: usize,
}

impl DropCounts {
    pub fn record(&mut self, reason: Exclusion) {
        match reason {
            Exclusion::MissingCoordinate => self.missing_coordinate += 1,
            Exclusion::MissingKey => self.missing_key += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.missing_coordinate + self.missing_key
    }
}

/// Points that survived normalisation plus the tally of those that did not.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized<T> {
    pub points: Vec<T>,
    pub dropped: DropCounts,
}

/// A record keyed by some identifier with a latitude/longitude in degrees.
pub trait Located: Sized {
    /// Label used in log lines.
    const KIND: &'static str;

    fn key_column() -> &'static ColumnAlias;

    fn from_parts(key: &str, lat: f64, lon: f64) -> std::result::Result<Self, Exclusion>;

    fn lat(&self) -> f64;

    fn lon(&self) -> f64;

    /// (latitude, longitude) in radians.
    fn radians(&self) -> (f64, f64) {
        (self.lat().to_radians(), self.lon().to_radians())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyPoint {
    pub property_id: String,
    pub lat: f64,
    pub lon: f64,
}

impl PropertyPoint {
    pub fn new(property_id: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            property_id: property_id.into(),
            lat,
            lon,
        }
    }
}

impl Located for PropertyPoint {
    const KIND: &'static str = "property";

    fn key_column() -> &'static ColumnAlias {
        &PROPERTY_ID
    }

    fn from_parts(key: &str, lat: f64, lon: f64) -> std::result::Result<Self, Exclusion> {
        Ok(Self::new(key.trim(), lat, lon))
    }

    fn lat(&self) -> f64 {
        self.lat
    }

    fn lon(&self) -> f64 {
        self.lon
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PostcodePoint {
    pub postcode: String,
    pub lat: f64,
    pub lon: f64,
}

impl PostcodePoint {
    pub fn new(postcode: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            postcode: postcode.into(),
            lat,
            lon,
        }
    }
}

impl Located for PostcodePoint {
    const KIND: &'static str = "postcode";

    fn key_column() -> &'static ColumnAlias {
        &POSTCODE
    }

    // A blank postcode would be indistinguishable from a rejected match.
    fn from_parts(key: &str, lat: f64, lon: f64) -> std::result::Result<Self, Exclusion> {
        let code = key.trim();
        if code.is_empty() {
            Err(Exclusion::MissingKey)
        } else {
            Ok(Self::new(code, lat, lon))
        }
    }

    fn lat(&self) -> f64 {
        self.lat
    }

    fn lon(&self) -> f64 {
        self.lon
    }
}

fn parse_degrees(field: Option<&str>, limit: f64) -> Option<f64> {
    field?
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && v.abs() <= limit)
}

/// Parses a latitude/longitude pair, `None` unless both are usable.
pub fn parse_coordinates(lat: Option<&str>, lon: Option<&str>) -> Option<(f64, f64)> {
    Some((parse_degrees(lat, 90.0)?, parse_degrees(lon, 180.0)?))
}

fn normalize_row<T: Located>(
    record: &StringRecord,
    key_idx: usize,
    lat_idx: usize,
    lon_idx: usize,
) -> std::result::Result<T, Exclusion> {
    let (lat, lon) = parse_coordinates(record.get(lat_idx), record.get(lon_idx))
        .ok_or(Exclusion::MissingCoordinate)?;
    T::from_parts(record.get(key_idx).unwrap_or(""), lat, lon)
}

/// Normalises every row of `rdr`. `source` is only used for diagnostics.
pub fn read_points<T: Located, R: Read>(
    rdr: &mut csv::Reader<R>,
    source: &Path,
) -> Result<Normalized<T>> {
    let headers = rdr
        .headers()
        .map_err(|e| MatchError::csv(source, e))?
        .clone();

    let key_idx = T::key_column().resolve(&headers, source)?;
    let lat_idx = LATITUDE.resolve(&headers, source)?;
    let lon_idx = LONGITUDE.resolve(&headers, source)?;
    debug!(
        "{}: using columns {:?} (key), {:?} (lat), {:?} (lon)",
        source.display(),
        &headers[key_idx],
        &headers[lat_idx],
        &headers[lon_idx]
    );

    let mut points = Vec::new();
    let mut dropped = DropCounts::default();
    let mut record = StringRecord::new();

    while rdr
        .read_record(&mut record)
        .map_err(|e| MatchError::csv(source, e))?
    {
        match normalize_row::<T>(&record, key_idx, lat_idx, lon_idx) {
            Ok(point) => points.push(point),
            Err(reason) => dropped.record(reason),
        }
    }

    info!(
        "Loaded {} {} rows from {}",
        points.len(),
        T::KIND,
        source.display()
    );
    if dropped.total() > 0 {
        warn!(
            "Dropped {} {} rows from {} ({} missing coordinate, {} missing key)",
            dropped.total(),
            T::KIND,
            source.display(),
            dropped.missing_coordinate,
            dropped.missing_key
        );
    }

    Ok(Normalized { points, dropped })
}

/// Opens `path` as CSV and normalises it.
pub fn load_points<T: Located>(path: &Path) -> Result<Normalized<T>> {
    let file = File::open(path).map_err(|e| MatchError::io(path, e))?;
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(file);
    read_points(&mut rdr, path)
}
