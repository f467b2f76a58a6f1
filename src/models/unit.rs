//! Administrative hierarchy levels.

use serde::{Deserialize, Serialize};

/// The three nested levels of Portuguese administrative division,
/// largest first: District ⊇ Municipality ⊇ Parish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminLevel {
    District,
    Municipality,
    Parish,
}

impl AdminLevel {
    /// All levels in hierarchical order (district first).
    pub fn all() -> &'static [AdminLevel] {
        &[
            AdminLevel::District,
            AdminLevel::Municipality,
            AdminLevel::Parish,
        ]
    }

    /// The level one step up the hierarchy, if any.
    pub fn parent(&self) -> Option<AdminLevel> {
        match self {
            AdminLevel::District => None,
            AdminLevel::Municipality => Some(AdminLevel::District),
            AdminLevel::Parish => Some(AdminLevel::Municipality),
        }
    }

    /// The GeoJSON property key carrying the unit name at this level.
    pub fn name_key(&self) -> &'static str {
        match self {
            AdminLevel::District => "Distrito",
            AdminLevel::Municipality => "Concelho",
            AdminLevel::Parish => "Freguesia",
        }
    }

    /// File name of the per-level artifact written by the prepare pipeline.
    pub fn artifact_file(&self) -> &'static str {
        match self {
            AdminLevel::District => "distritos.geojson",
            AdminLevel::Municipality => "concelhos.geojson",
            AdminLevel::Parish => "freguesias.geojson",
        }
    }
}

impl std::fmt::Display for AdminLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdminLevel::District => write!(f, "district"),
            AdminLevel::Municipality => write!(f, "municipality"),
            AdminLevel::Parish => write!(f, "parish"),
        }
    }
}
