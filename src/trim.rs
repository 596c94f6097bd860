//! Column trimming and bounding-box filtering of large reference tables.
//!
//! Used to cut national extracts (EPC certificates, OS Open UPRN) down to the
//! columns and region a run actually needs. Rows are streamed, so the input
//! never has to fit in memory.

use crate::assemble::write_atomically;
use crate::error::{MatchError, Result};
use crate::normalize::parse_coordinates;
use csv::{ReaderBuilder, StringRecord};
use geo::{coord, Intersects, Rect};
use log::{debug, info};
use std::{
    fs::File,
    io::{Read, Write},
    path::Path,
    str::FromStr,
};

/// Inclusive latitude/longitude box in degrees.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BoundingBox {
    rect: Rect<f64>,
}

impl BoundingBox {
    pub fn new(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> Self {
        Self {
            rect: Rect::new(
                coord! { x: min_lon, y: min_lat },
                coord! { x: max_lon, y: max_lat },
            ),
        }
    }

    /// Edges count as inside.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        self.rect.intersects(&coord! { x: lon, y: lat })
    }
}

impl FromStr for BoundingBox {
    type Err = String;

    /// Parses `min_lat,max_lat,min_lon,max_lon`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let parts = s
            .split(',')
            .map(|p| p.trim().parse::<f64>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| format!("invalid bounding box `{s}`: {e}"))?;
        match parts[..] {
            [min_lat, max_lat, min_lon, max_lon]
                if parts.iter().all(|v| v.is_finite()) && min_lat <= max_lat && min_lon <= max_lon =>
            {
                Ok(Self::new(min_lat, max_lat, min_lon, max_lon))
            }
            _ => Err(format!(
                "invalid bounding box `{s}`: expected min_lat,max_lat,min_lon,max_lon"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrimOptions {
    /// Columns to keep, in output order.
    pub keep: Vec<String>,
    pub bbox: Option<BoundingBox>,
    pub lat_column: String,
    pub lon_column: String,
}

impl TrimOptions {
    pub fn new(keep: Vec<String>) -> Self {
        Self {
            keep,
            bbox: None,
            lat_column: "LATITUDE".to_owned(),
            lon_column: "LONGITUDE".to_owned(),
        }
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct TrimSummary {
    pub read: usize,
    pub written: usize,
}

fn locate(headers: &StringRecord, names: &[&str], source: &Path) -> Result<Vec<usize>> {
    let mut missing = Vec::new();
    let mut found = Vec::new();
    for name in names {
        match headers.iter().position(|h| h == *name) {
            Some(i) => found.push(i),
            None => missing.push((*name).to_owned()),
        }
    }
    if missing.is_empty() {
        Ok(found)
    } else {
        Err(MatchError::MissingColumns {
            path: source.to_path_buf(),
            columns: missing,
        })
    }
}

/// Streams `rdr` into `wtr`, keeping only the requested columns and, when a
/// bounding box is given, only rows inside it. Rows whose coordinates do not
/// parse fall outside every box.
pub fn trim_table<R: Read, W: Write>(
    rdr: &mut csv::Reader<R>,
    wtr: &mut csv::Writer<W>,
    options: &TrimOptions,
    source: &Path,
    dest: &Path,
) -> Result<TrimSummary> {
    let headers = rdr
        .headers()
        .map_err(|e| MatchError::csv(source, e))?
        .clone();
    debug!("Columns in {}: {:?}", source.display(), headers);

    let keep: Vec<&str> = options.keep.iter().map(String::as_str).collect();
    let keep_idx = locate(&headers, &keep, source)?;
    let coord_idx = match options.bbox {
        Some(_) => {
            let idx = locate(
                &headers,
                &[options.lat_column.as_str(), options.lon_column.as_str()],
                source,
            )?;
            Some((idx[0], idx[1]))
        }
        None => None,
    };

    wtr.write_record(&keep).map_err(|e| MatchError::csv(dest, e))?;

    let mut summary = TrimSummary::default();
    let mut record = StringRecord::new();
    while rdr
        .read_record(&mut record)
        .map_err(|e| MatchError::csv(source, e))?
    {
        summary.read += 1;

        if let (Some(bbox), Some((lat_i, lon_i))) = (&options.bbox, coord_idx) {
            let inside = parse_coordinates(record.get(lat_i), record.get(lon_i))
                .map_or(false, |(lat, lon)| bbox.contains(lat, lon));
            if !inside {
                continue;
            }
        }

        wtr.write_record(keep_idx.iter().map(|&i| record.get(i).unwrap_or("")))
            .map_err(|e| MatchError::csv(dest, e))?;
        summary.written += 1;
    }

    wtr.flush().map_err(|e| MatchError::io(dest, e))?;
    Ok(summary)
}

/// File-to-file form of [`trim_table`]. `output` is only replaced once the
/// whole table has been written, so it may name the input itself.
pub fn trim_file(input: &Path, output: &Path, options: &TrimOptions) -> Result<TrimSummary> {
    let file = File::open(input).map_err(|e| MatchError::io(input, e))?;
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(file);

    let summary = write_atomically(output, |wtr| {
        trim_table(&mut rdr, wtr, options, input, output)
    })?;
    info!(
        "Kept {} of {} rows from {} into {}",
        summary.written,
        summary.read,
        input.display(),
        output.display()
    );
    Ok(summary)
}
