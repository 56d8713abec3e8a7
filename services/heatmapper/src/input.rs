//! GeoJSON occurrence input.
//!
//! Occurrences arrive as a FeatureCollection of Point features whose
//! coordinates are already in the output CRS. The taxon identifier is read
//! from a feature property, either a flat key (`"unit.linkings.taxon.id"`)
//! or a dotted path into nested objects.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use diversity_heatmap::Occurrence;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{info, warn};

pub const DEFAULT_TAXON_PROPERTY: &str = "unit.linkings.taxon.id";

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    geometry: Option<Geometry>,
    #[serde(default)]
    properties: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    #[serde(rename = "type")]
    geometry_type: String,
    #[serde(default)]
    coordinates: Value,
}

/// Features that could not be turned into occurrences.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SkippedFeatures {
    pub missing_point: usize,
    pub missing_taxon: usize,
}

impl SkippedFeatures {
    pub fn total(&self) -> usize {
        self.missing_point + self.missing_taxon
    }
}

/// Read occurrences from a GeoJSON file.
pub fn read_occurrences<P: AsRef<Path>>(path: P, taxon_property: &str) -> Result<Vec<Occurrence>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("Failed to open occurrences {:?}", path))?;
    let collection: FeatureCollection = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse GeoJSON FeatureCollection from {:?}", path))?;

    let (occurrences, skipped) = collect_occurrences(collection, taxon_property);

    if skipped.total() > 0 {
        warn!(
            missing_point = skipped.missing_point,
            missing_taxon = skipped.missing_taxon,
            taxon_property,
            "Skipped features that are not usable occurrences"
        );
    }
    info!(path = %path.display(), occurrences = occurrences.len(), "Loaded occurrences");

    Ok(occurrences)
}

/// Parse occurrences from GeoJSON text.
pub fn parse_occurrences(json: &str, taxon_property: &str) -> Result<(Vec<Occurrence>, SkippedFeatures)> {
    let collection: FeatureCollection =
        serde_json::from_str(json).context("Failed to parse GeoJSON FeatureCollection")?;
    Ok(collect_occurrences(collection, taxon_property))
}

fn collect_occurrences(collection: FeatureCollection, taxon_property: &str) -> (Vec<Occurrence>, SkippedFeatures) {
    let mut occurrences = Vec::with_capacity(collection.features.len());
    let mut skipped = SkippedFeatures::default();

    for feature in collection.features {
        let Some((x, y)) = feature.geometry.as_ref().and_then(point_coordinates) else {
            skipped.missing_point += 1;
            continue;
        };
        let Some(taxon) = feature
            .properties
            .as_ref()
            .and_then(|p| lookup_property(p, taxon_property))
            .and_then(taxon_string)
        else {
            skipped.missing_taxon += 1;
            continue;
        };
        occurrences.push(Occurrence::new(x, y, taxon));
    }

    (occurrences, skipped)
}

fn point_coordinates(geometry: &Geometry) -> Option<(f64, f64)> {
    if geometry.geometry_type != "Point" {
        return None;
    }
    let coords = geometry.coordinates.as_array()?;
    let x = coords.first()?.as_f64()?;
    let y = coords.get(1)?.as_f64()?;
    Some((x, y))
}

/// Flat key first, then a dotted path through nested objects.
fn lookup_property<'a>(properties: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    if let Some(value) = properties.get(name) {
        return Some(value);
    }
    let mut parts = name.split('.');
    let mut current = properties.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

fn taxon_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_and_nested_taxon_properties() {
        let json = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature",
                 "geometry": {"type": "Point", "coordinates": [385000.0, 6672000.0]},
                 "properties": {"unit.linkings.taxon.id": "http://tun.fi/MX.46549"}},
                {"type": "Feature",
                 "geometry": {"type": "Point", "coordinates": [385100, 6672100]},
                 "properties": {"unit": {"linkings": {"taxon": {"id": "http://tun.fi/MX.47169"}}}}}
            ]
        }"#;
        let (occurrences, skipped) = parse_occurrences(json, DEFAULT_TAXON_PROPERTY).unwrap();
        assert_eq!(skipped.total(), 0);
        assert_eq!(occurrences.len(), 2);
        assert_eq!(occurrences[0].taxon_id, "http://tun.fi/MX.46549");
        assert_eq!(occurrences[1].x, 385100.0);
        assert_eq!(occurrences[1].taxon_id, "http://tun.fi/MX.47169");
    }

    #[test]
    fn test_unusable_features_are_counted() {
        let json = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "geometry": null, "properties": {"taxon": "a"}},
                {"type": "Feature",
                 "geometry": {"type": "LineString", "coordinates": [[0, 0], [1, 1]]},
                 "properties": {"taxon": "a"}},
                {"type": "Feature",
                 "geometry": {"type": "Point", "coordinates": [1.0]},
                 "properties": {"taxon": "a"}},
                {"type": "Feature",
                 "geometry": {"type": "Point", "coordinates": [1.0, 2.0]},
                 "properties": {"taxon": ""}},
                {"type": "Feature",
                 "geometry": {"type": "Point", "coordinates": [1.0, 2.0]},
                 "properties": null},
                {"type": "Feature",
                 "geometry": {"type": "Point", "coordinates": [3.0, 4.0]},
                 "properties": {"taxon": 42}}
            ]
        }"#;
        let (occurrences, skipped) = parse_occurrences(json, "taxon").unwrap();
        assert_eq!(
            skipped,
            SkippedFeatures {
                missing_point: 3,
                missing_taxon: 2
            }
        );
        assert_eq!(occurrences.len(), 1);
        assert_eq!(occurrences[0].taxon_id, "42");
    }

    #[test]
    fn test_not_a_feature_collection() {
        assert!(parse_occurrences(r#"{"type": "Feature"}"#, "taxon").is_err());
    }
}
