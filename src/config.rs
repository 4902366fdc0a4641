use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// The five Beijing PRSA stations shown by default.
pub const PRSA_STATIONS: [&str; 5] = [
    "Aotizhongxin",
    "Changping",
    "Dingling",
    "Dongsi",
    "Guanyuan",
];

/// File name of a PRSA station export covering 2013-03-01..2017-02-28.
pub fn prsa_file_name(station: &str) -> String {
    format!("PRSA_Data_{station}_20130301-20170228.csv")
}

// ---------------------------------------------------------------------------
// Station manifest
// ---------------------------------------------------------------------------

/// One configured station: identifier plus where its source lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationSource {
    pub id: String,
    pub path: PathBuf,
}

/// The set of stations to load, in display order.
///
/// ```json
/// {
///   "data_dir": "/srv/prsa",
///   "stations": [
///     { "id": "Dongsi", "path": "PRSA_Data_Dongsi_20130301-20170228.csv" }
///   ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Base for relative station paths.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    pub stations: Vec<StationSource>,
}

impl DashboardConfig {
    /// The PRSA stations, with their files expected under `data_dir`.
    pub fn prsa_default(data_dir: impl Into<PathBuf>) -> Self {
        DashboardConfig {
            data_dir: Some(data_dir.into()),
            stations: PRSA_STATIONS
                .iter()
                .map(|id| StationSource {
                    id: id.to_string(),
                    path: PathBuf::from(prsa_file_name(id)),
                })
                .collect(),
        }
    }

    /// Parse and validate a manifest. Without an explicit `data_dir`,
    /// relative paths resolve against the manifest's own directory.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let mut config = Self::from_json(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        if config.data_dir.is_none() {
            config.data_dir = path.parent().map(Path::to_path_buf);
        }
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: DashboardConfig = serde_json::from_str(text).context("invalid JSON")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.stations.is_empty() {
            bail!("no stations configured");
        }
        let mut seen = HashSet::new();
        for station in &self.stations {
            if station.id.trim().is_empty() {
                bail!("station with empty id ({})", station.path.display());
            }
            if !seen.insert(station.id.as_str()) {
                bail!("duplicate station id '{}'", station.id);
            }
        }
        Ok(())
    }

    /// Station sources with paths resolved against `data_dir`.
    pub fn sources(&self) -> Vec<StationSource> {
        self.stations
            .iter()
            .map(|s| StationSource {
                id: s.id.clone(),
                path: match &self.data_dir {
                    Some(dir) if s.path.is_relative() => dir.join(&s.path),
                    _ => s.path.clone(),
                },
            })
            .collect()
    }
}
