//! Point-location query tool.
//!
//! Builds a subsection index from a GeoJSON artifact and resolves one
//! lon/lat coordinate to the feature containing it.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use geopt::pip::LocateService;
use geopt::worker;

#[derive(Parser, Debug)]
#[command(name = "locate")]
#[command(about = "Resolve a GPS coordinate to its administrative subsection")]
struct Args {
    /// Subsection FeatureCollection artifact
    #[arg(short, long)]
    artifact: PathBuf,

    /// Longitude of the query point
    #[arg(long, allow_hyphen_values = true)]
    lon: f64,

    /// Latitude of the query point
    #[arg(long, allow_hyphen_values = true)]
    lat: f64,

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
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut service = LocateService::new(&args.artifact);
    service.ensure_loaded()?;

    // The lookup itself is CPU-bound; run it on an isolated worker.
    let (lon, lat) = (args.lon, args.lat);
    let rx = worker::dispatch(move || service.locate(lon, lat).map(|hit| hit.map(|s| (*s).clone())));
    let hit = rx.await.context("Locate worker dropped")??;

    match hit {
        Some(subsection) => {
            let feature = subsection.to_geojson();
            println!("{}", serde_json::to_string_pretty(&feature)?);
        }
        None => {
            info!("No subsection contains ({}, {})", lon, lat);
        }
    }

    Ok(())
}
