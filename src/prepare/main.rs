//! Offline artifact preparation pipeline.
//!
//! Loads the parish GeoJSON directory, aggregates parishes into municipality
//! and district boundaries, and writes one artifact per hierarchy level.
//! Optionally runs the density-based outlier filter over a raw point dataset.

mod config;

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use geopt::aggregate::{aggregate, group_children, ChildGroup};
use geopt::artifact;
use geopt::cluster::{FilterRequest, FilterResponse};
use geopt::models::{AdminLevel, BoundaryFeature};
use geopt::normalize::normalize;
use geopt::worker;

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(name = "prepare")]
#[command(about = "Build per-level boundary artifacts from parish GeoJSON data")]
struct Args {
    /// Pipeline configuration file
    #[arg(short, long, default_value = "prepare.toml")]
    config: PathBuf,

    /// Override the parish input directory from the config
    #[arg(long)]
    parishes_dir: Option<PathBuf>,

    /// Override the artifact output directory from the config
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if args.verbose {
            Level::DEBUG
        } else {
            Level::INFO
        })
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = Config::load_from_file(&args.config)
        .with_context(|| format!("Failed to load config: {}", args.config.display()))?;
    if let Some(dir) = args.parishes_dir {
        config.input.parishes_dir = dir;
    }
    if let Some(dir) = args.out_dir {
        config.output.dir = dir;
    }

    std::fs::create_dir_all(&config.output.dir).with_context(|| {
        format!(
            "Failed to create output directory: {}",
            config.output.dir.display()
        )
    })?;

    info!("GeoPT Prepare Pipeline");
    info!("Parish input: {}", config.input.parishes_dir.display());

    // Level 0: parishes straight from the source directory.
    let parishes = artifact::load_units_dir(&config.input.parishes_dir, AdminLevel::Parish)?;
    let parish_features = parishes
        .iter()
        .map(|p| p.to_geojson(AdminLevel::Parish))
        .collect();
    artifact::write_artifact(
        config.output.dir.join(AdminLevel::Parish.artifact_file()),
        parish_features,
    )?;

    // Level 1: parishes -> municipalities.
    let municipality_groups = group_children(parishes, |f| f.municipality.as_deref())?;
    let municipalities = aggregate_level(
        municipality_groups.into_values().collect(),
        AdminLevel::Municipality,
        &config,
    )?;

    // Level 2: municipalities -> districts.
    let district_groups = group_children(municipalities, |f| f.district.as_deref())?;
    aggregate_level(
        district_groups.into_values().collect(),
        AdminLevel::District,
        &config,
    )?;

    if let Some(points_path) = &config.input.points {
        filter_points(points_path, &config).await?;
    }

    info!("Prepare pipeline complete");
    Ok(())
}

/// Aggregate each group into one parent boundary, write the level artifact,
/// and hand back the parent features for the next level up.
fn aggregate_level(
    groups: Vec<ChildGroup>,
    level: AdminLevel,
    config: &Config,
) -> Result<Vec<BoundaryFeature>> {
    info!("Aggregating {} {} groups...", groups.len(), level);

    let pb = ProgressBar::new(groups.len() as u64);
    pb.set_style(
        ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}")
            .expect("static progress template"),
    );

    // Groups are independent; the fold inside each group stays sequential.
    let mut aggregated: Vec<(geojson::Feature, BoundaryFeature)> = groups
        .par_iter()
        .map(|group| {
            let merged = aggregate(&group.members)
                .with_context(|| format!("Aggregation failed for {} '{}'", level, group.name))?;
            pb.inc(1);

            // At district level the group name is the district itself; only
            // municipality features carry a separate parent district.
            let district = if level == AdminLevel::Municipality {
                group.district.clone()
            } else {
                None
            };

            let feature = merged.to_geojson(level.name_key(), &group.name, district.as_deref());
            let parent = BoundaryFeature {
                name: group.name.clone(),
                norm: normalize(&group.name),
                municipality: None,
                district,
                area_ha: merged.area_ha,
                area_ea_ha: merged.area_ea_ha,
                geometry: merged.geometry,
            };
            Ok((feature, parent))
        })
        .collect::<Result<Vec<_>>>()?;
    pb.finish_and_clear();

    // Par-iter preserves input order, but sort by key anyway so artifact
    // ordering never depends on the grouping implementation.
    aggregated.sort_by(|a, b| a.1.norm.cmp(&b.1.norm));

    let (features, parents): (Vec<_>, Vec<_>) = aggregated.into_iter().unzip();
    artifact::write_artifact(config.output.dir.join(level.artifact_file()), features)?;

    Ok(parents)
}

/// Run the outlier filter over a raw point dataset on an isolated worker.
async fn filter_points(points_path: &PathBuf, config: &Config) -> Result<()> {
    let filter_config = config.filter.as_ref().context(
        "A [filter] section (radius, min_neighbours, min_cluster_size) is required \
         when input.points is set",
    )?;
    let params = filter_config.to_params();

    let file = File::open(points_path)
        .with_context(|| format!("Failed to open points file: {}", points_path.display()))?;
    let request: FilterRequest = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse points file: {}", points_path.display()))?;

    info!(
        "Filtering {} points (radius={}, min_neighbours={}, min_cluster_size={})",
        request.points.len(),
        params.radius,
        params.min_neighbours,
        params.min_cluster_size
    );

    let rx = worker::dispatch(move || geopt::cluster::filter(&request.points, &params));
    let split = rx.await.context("Filter worker dropped")??;

    let response = FilterResponse::from(split);
    info!(
        "{} points accepted, {} outliers removed",
        response.filtered_points.len(),
        response.outliers.len()
    );

    let out_path = config.output.dir.join("points_filtered.json");
    let out = File::create(&out_path)
        .with_context(|| format!("Failed to create {}", out_path.display()))?;
    serde_json::to_writer(BufWriter::new(out), &response)?;
    info!("Wrote filtered points to {}", out_path.display());

    Ok(())
}
