//! Nearest-postcode lookup for every property.

use crate::error::Result;
use crate::index::{Neighbor, SpatialIndex};
use crate::normalize::PropertyPoint;
use log::info;
use rayon::prelude::*;
use std::time::Instant;

/// Queries `index` once per property. The output is parallel to
/// `properties`: element `i` is the nearest postcode to `properties[i]`.
///
/// With `parallel` set the queries run on the rayon pool; the result is
/// identical since each query only reads the index.
pub fn match_nearest<'a>(
    properties: &[PropertyPoint],
    index: &'a SpatialIndex,
    parallel: bool,
) -> Result<Vec<Neighbor<'a>>> {
    let start = Instant::now();

    let neighbors = if parallel {
        properties
            .par_iter()
            .map(|p| index.nearest_to(p))
            .collect::<Result<Vec<_>>>()?
    } else {
        properties
            .iter()
            .map(|p| index.nearest_to(p))
            .collect::<Result<Vec<_>>>()?
    };

    info!(
        "Queried nearest postcode for {} properties in {} ms",
        neighbors.len(),
        start.elapsed().as_millis()
    );
    Ok(neighbors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MatchError;
    use crate::normalize::PostcodePoint;

    fn index() -> SpatialIndex {
        SpatialIndex::build(vec![
            PostcodePoint::new("NE1 1AA", 54.97, -1.61),
            PostcodePoint::new("NE2 2BB", 55.50, -1.40),
            PostcodePoint::new("DH1 1AA", 54.78, -1.57),
        ])
    }

    fn properties() -> Vec<PropertyPoint> {
        vec![
            PropertyPoint::new("1", 54.971, -1.611),
            PropertyPoint::new("2", 55.49, -1.41),
            PropertyPoint::new("3", 54.77, -1.58),
            PropertyPoint::new("4", 54.97, -1.61),
        ]
    }

    #[test]
    fn preserves_property_order() {
        let index = index();
        let hits = match_nearest(&properties(), &index, false).unwrap();
        let codes: Vec<&str> = hits.iter().map(|n| n.postcode.postcode.as_str()).collect();
        assert_eq!(codes, vec!["NE1 1AA", "NE2 2BB", "DH1 1AA", "NE1 1AA"]);
        assert_eq!(hits[3].angular_distance, 0.0);
    }

    #[test]
    fn parallel_query_is_identical() {
        let index = index();
        let props: Vec<PropertyPoint> = (0..500)
            .map(|i| {
                let lat = 54.7 + i as f64 * 0.0017;
                let lon = -1.7 + i as f64 * 0.0007;
                PropertyPoint::new(i.to_string(), lat, lon)
            })
            .collect();
        let seq = match_nearest(&props, &index, false).unwrap();
        let par = match_nearest(&props, &index, true).unwrap();
        assert_eq!(seq, par);
    }

    #[test]
    fn empty_property_set_gives_empty_output() {
        let index = index();
        assert!(match_nearest(&[], &index, false).unwrap().is_empty());
    }

    #[test]
    fn empty_index_is_an_error() {
        let index = SpatialIndex::build(Vec::new());
        let err = match_nearest(&properties(), &index, true).unwrap_err();
        assert!(matches!(err, MatchError::EmptyReferenceSet));
    }
}
