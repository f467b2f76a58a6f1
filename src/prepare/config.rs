use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use geopt::cluster::ClusterParams;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub input: InputConfig,
    pub output: OutputConfig,
    pub filter: Option<FilterConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    /// Directory of per-parish GeoJSON files.
    pub parishes_dir: PathBuf,
    /// Optional raw point dataset to outlier-filter ({"points": [[lon, lat], ...]}).
    pub points: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FilterConfig {
    pub radius: f64,
    pub min_neighbours: usize,
    pub min_cluster_size: usize,
}

impl FilterConfig {
    pub fn to_params(&self) -> ClusterParams {
        ClusterParams {
            radius: self.radius,
            min_neighbours: self.min_neighbours,
            min_cluster_size: self.min_cluster_size,
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }
}
