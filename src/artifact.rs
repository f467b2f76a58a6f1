//! File-based GeoJSON artifacts.
//!
//! All engine state lives in GeoJSON files: the parish source directory read
//! by the prepare pipeline, and the per-level artifacts it writes. Artifacts
//! are written once per data-refresh cycle and read-only afterwards.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use geojson::{FeatureCollection, GeoJson};
use hashbrown::HashMap;
use tracing::info;
use walkdir::WalkDir;

use crate::models::{AdminLevel, BoundaryFeature};

/// Read a GeoJSON file into a FeatureCollection. A file holding a single
/// Feature is accepted and wrapped.
pub fn read_feature_collection<P: AsRef<Path>>(path: P) -> Result<FeatureCollection> {
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open GeoJSON file: {}", path.display()))?;
    let geojson = GeoJson::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse GeoJSON: {}", path.display()))?;

    match geojson {
        GeoJson::FeatureCollection(fc) => Ok(fc),
        GeoJson::Feature(feature) => Ok(FeatureCollection {
            bbox: None,
            features: vec![feature],
            foreign_members: None,
        }),
        GeoJson::Geometry(_) => Err(anyhow!(
            "{}: expected a Feature or FeatureCollection, got a bare geometry",
            path.display()
        )),
    }
}

/// Write a per-level artifact, stamped with its generation time.
pub fn write_artifact<P: AsRef<Path>>(path: P, features: Vec<geojson::Feature>) -> Result<()> {
    let path = path.as_ref();

    let mut foreign_members = geojson::JsonObject::new();
    foreign_members.insert(
        "generated_at".to_string(),
        Utc::now().to_rfc3339().into(),
    );

    let collection = FeatureCollection {
        bbox: None,
        features,
        foreign_members: Some(foreign_members),
    };

    let file = File::create(path)
        .with_context(|| format!("Failed to create artifact: {}", path.display()))?;
    serde_json::to_writer(BufWriter::new(file), &GeoJson::FeatureCollection(collection))
        .with_context(|| format!("Failed to write artifact: {}", path.display()))?;

    info!("Wrote artifact {}", path.display());
    Ok(())
}

/// Load every unit feature from a directory of GeoJSON files, recursively.
///
/// Features are keyed by normalized name scoped to their parent unit, so
/// same-named parishes in different municipalities coexist while a duplicate
/// key within one sibling set fails the load.
pub fn load_units_dir<P: AsRef<Path>>(dir: P, level: AdminLevel) -> Result<Vec<BoundaryFeature>> {
    let dir = dir.as_ref();
    info!("Loading {} features from {}", level, dir.display());

    let mut entries: Vec<_> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("Failed to walk directory: {}", dir.display()))?;
    // Deterministic load order regardless of directory iteration order.
    entries.sort_by(|a, b| a.path().cmp(b.path()));

    let mut seen: HashMap<String, String> = HashMap::new();
    let mut features = Vec::new();

    for entry in entries {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        match path.extension().and_then(|e| e.to_str()) {
            Some("geojson") | Some("json") => {}
            _ => continue,
        }

        let collection = read_feature_collection(path)?;
        for feature in &collection.features {
            let parsed = BoundaryFeature::from_geojson(feature, level)
                .with_context(|| format!("Malformed feature in {}", path.display()))?;

            let key = sibling_key(&parsed);
            if let Some(previous) = seen.insert(key.clone(), parsed.name.clone()) {
                bail!(
                    "duplicate {} key '{}': '{}' and '{}' normalize to the same sibling",
                    level,
                    key,
                    previous,
                    parsed.name
                );
            }
            features.push(parsed);
        }
    }

    info!("Loaded {} {} features", features.len(), level);
    Ok(features)
}

/// Identity key of a unit within its sibling set.
fn sibling_key(feature: &BoundaryFeature) -> String {
    let parent = feature
        .municipality
        .as_deref()
        .or(feature.district.as_deref())
        .map(crate::normalize::normalize)
        .unwrap_or_default();
    format!("{}/{}", parent, feature.norm)
}
