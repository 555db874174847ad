//! Registry configuration.

use crate::carrier::{Carrier, MatchStrategy, S10Acceptance};
use crate::error::{Result, TrackingError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Settings for building a [`CarrierRegistry`](crate::CarrierRegistry).
///
/// Every field is optional; an empty configuration gives the built-in
/// catalog and carriers with checksum validation where available.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Directory of courier `*.json` records replacing the embedded catalog.
    pub catalog_dir: Option<PathBuf>,
    /// Matching strategy for carriers that offer both. Default: checksum.
    pub strategy: Option<MatchStrategy>,
    /// S10 international numbers claimed by the checksum USPS carrier.
    /// Default: only those attributed to USPS.
    pub usps_s10: S10Acceptance,
    /// Per-carrier overrides keyed by carrier ID ("UPS", "China Post", ...).
    pub carriers: BTreeMap<String, CarrierOverride>,
}

/// Overrides applied to one built-in carrier
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CarrierOverride {
    pub enabled: Option<bool>,
    pub detection_priority: Option<i32>,
    pub strategy: Option<MatchStrategy>,
}

impl RegistryConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| TrackingError::Config(e.to_string()))
    }

    /// Read a JSON configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| TrackingError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|e| TrackingError::Json {
            source_name: path.display().to_string(),
            details: e.to_string(),
        })
    }

    /// Strategy for a carrier: its override, else the global one, else checksum.
    #[must_use]
    pub fn effective_strategy(&self, carrier_id: &str) -> MatchStrategy {
        self.carriers
            .get(carrier_id)
            .and_then(|o| o.strategy)
            .or(self.strategy)
            .unwrap_or_default()
    }
}

impl CarrierOverride {
    /// Apply the enablement and priority overrides. The strategy is chosen
    /// when the carrier is built.
    #[must_use]
    pub fn apply(&self, mut carrier: Carrier) -> Carrier {
        if let Some(enabled) = self.enabled {
            carrier = carrier.with_enabled(enabled);
        }
        if let Some(priority) = self.detection_priority {
            carrier = carrier.with_detection_priority(priority);
        }
        carrier
    }
}
