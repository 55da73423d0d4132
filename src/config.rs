use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Path to the static schedule tables (stations, routes, travel times).
    pub schedule_path: String,
    /// Path to the offline-prepared track geometry file.
    pub track_geometry_path: String,
    /// Simulation tick period in milliseconds.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Allowed CORS origins. Required unless cors_permissive is true.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Explicitly allow all origins (development only). Defaults to false.
    #[serde(default)]
    pub cors_permissive: bool,
    /// Service area of the line. Track features entirely outside are dropped.
    pub bounding_box: Option<BoundingBox>,
    /// Track features excluded from geometry mapping at startup.
    #[serde(default)]
    pub exclusions: ExclusionConfig,
}

fn default_tick_interval_ms() -> u64 {
    1000
}

fn default_listen_addr() -> String {
    "0.0.0.0:3000".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExclusionConfig {
    #[serde(default)]
    pub ids: Vec<i64>,
    #[serde(default)]
    pub names: Vec<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct BoundingBox {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl BoundingBox {
    /// Whether a [lon, lat] coordinate falls inside the box.
    pub fn contains(&self, coordinate: [f64; 2]) -> bool {
        let [lon, lat] = coordinate;
        lat >= self.south && lat <= self.north && lon >= self.west && lon <= self.east
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::ReadError(e.to_string()))?;

        serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),
    #[error("Failed to parse config: {0}")]
    ParseError(String),
}
