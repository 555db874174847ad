//! Carrier registry: priority-ordered detection and text extraction

use crate::carrier::{Carrier, MatchStrategy, S10Acceptance};
use crate::carriers;
use crate::catalog::Catalog;
use crate::config::RegistryConfig;
use crate::detector::Detector;
use crate::error::Result;
use crate::text::{collapse_whitespace, decode_html_entities, normalize_tracking_number};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// A tracking number found in text, attributed to one carrier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExtractedTrackingNumber {
    pub carrier_id: String,
    /// Uppercase, whitespace-free
    pub number: String,
}

/// Value/label pair for carrier pickers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarrierOption {
    pub value: String,
    pub label: String,
}

/// Owns the carrier set and resolves which carrier claims a number.
///
/// Build it once and share it by reference: nothing in detection or
/// extraction mutates the registry.
#[derive(Debug, Clone, Default)]
pub struct CarrierRegistry {
    carriers: Vec<Carrier>,
    /// Indices into `carriers`, highest priority first, ties in registration order
    by_priority: Vec<usize>,
}

impl CarrierRegistry {
    #[must_use]
    pub fn new(carriers: impl IntoIterator<Item = Carrier>) -> Self {
        let mut registry = Self::default();
        for carrier in carriers {
            registry.register(carrier);
        }
        registry
    }

    /// Built-in carriers over the embedded catalog, checksum variants
    pub fn builtin() -> Result<Self> {
        Self::with_detector(&Arc::new(Detector::builtin()))
    }

    /// Built-in carriers, checksum variants sharing `detector`
    pub fn with_detector(detector: &Arc<Detector>) -> Result<Self> {
        Ok(Self::new(carriers::builtin(
            detector,
            |_| MatchStrategy::Checksum,
            S10Acceptance::default(),
        )?))
    }

    pub fn from_config(config: &RegistryConfig) -> Result<Self> {
        let catalog = match &config.catalog_dir {
            Some(dir) => Catalog::load_dir(dir)?,
            None => Catalog::builtin(),
        };
        let detector = Arc::new(Detector::new(catalog));

        let built: Vec<Carrier> = carriers::builtin(
            &detector,
            |id| config.effective_strategy(id),
            config.usps_s10,
        )?
        .into_iter()
        .map(|carrier| match config.carriers.get(carrier.id()) {
            Some(overrides) => overrides.apply(carrier),
            None => carrier,
        })
        .collect();

        for id in config.carriers.keys() {
            if !built.iter().any(|c| c.id() == id.as_str()) {
                warn!(carrier = %id, "Ignoring override for unknown carrier");
            }
        }

        Ok(Self::new(built))
    }

    /// Add a carrier. One with the same ID replaces the earlier entry in place.
    pub fn register(&mut self, carrier: Carrier) {
        if let Some(existing) = self.carriers.iter_mut().find(|c| c.id() == carrier.id()) {
            *existing = carrier;
        } else {
            self.carriers.push(carrier);
        }
        self.sort_by_priority();
    }

    fn sort_by_priority(&mut self) {
        let mut order: Vec<usize> = (0..self.carriers.len()).collect();
        order.sort_by_key(|&i| Reverse(self.carriers[i].detection_priority()));
        self.by_priority = order;
    }

    /// Lookup by ID, disabled carriers included
    #[must_use]
    pub fn carrier(&self, id: &str) -> Option<&Carrier> {
        self.carriers.iter().find(|c| c.id() == id)
    }

    /// All carriers in registration order
    #[must_use]
    pub fn carriers(&self) -> &[Carrier] {
        &self.carriers
    }

    #[must_use]
    pub fn enabled_carriers(&self) -> Vec<&Carrier> {
        self.carriers.iter().filter(|c| c.is_enabled()).collect()
    }

    /// Enabled carriers, highest detection priority first
    pub fn detection_order(&self) -> impl Iterator<Item = &Carrier> {
        self.by_priority
            .iter()
            .map(|&i| &self.carriers[i])
            .filter(|c| c.is_enabled())
    }

    /// Options for a carrier picker, optionally led by an auto-detect entry
    #[must_use]
    pub fn carrier_options(&self, include_auto_detect: bool) -> Vec<CarrierOption> {
        let auto = include_auto_detect.then(|| CarrierOption {
            value: String::new(),
            label: "Auto-detect".to_string(),
        });

        auto.into_iter()
            .chain(self.enabled_carriers().into_iter().map(|c| CarrierOption {
                value: c.id().to_string(),
                label: c.name().to_string(),
            }))
            .collect()
    }

    /// First enabled carrier, by priority, that accepts the number
    #[must_use]
    pub fn detect_carrier(&self, tracking_number: &str) -> Option<&Carrier> {
        let normalized = normalize_tracking_number(tracking_number);
        if normalized.is_empty() {
            return None;
        }

        let detected = self
            .detection_order()
            .find(|carrier| carrier.matches_tracking_number(&normalized));

        match detected {
            Some(carrier) => debug!(tracking_number = %normalized, carrier = carrier.id(), "Detected carrier"),
            None => debug!(tracking_number = %normalized, "No carrier detected"),
        }
        detected
    }

    #[must_use]
    pub fn detect_carrier_id(&self, tracking_number: &str) -> Option<&str> {
        self.detect_carrier(tracking_number).map(Carrier::id)
    }

    /// Every tracking number in `text`, each attributed to the highest
    /// priority carrier that claims it.
    ///
    /// HTML entities are decoded and whitespace runs collapsed; markup is
    /// kept since numbers often sit inside tags. Results come in carrier
    /// priority order, not text order.
    #[must_use]
    pub fn extract_tracking_numbers(&self, text: &str) -> Vec<ExtractedTrackingNumber> {
        let text = collapse_whitespace(&decode_html_entities(text));

        let mut seen = HashSet::new();
        let mut results = Vec::new();

        for carrier in self.detection_order() {
            for number in carrier.extract_tracking_numbers(&text) {
                if !seen.insert(number.clone()) {
                    continue;
                }
                results.push(ExtractedTrackingNumber {
                    carrier_id: carrier.id().to_string(),
                    number,
                });
            }
        }

        debug!(found = results.len(), "Extracted tracking numbers");
        results
    }

    /// External tracking-service code, 0 for an unknown carrier
    #[must_use]
    pub fn external_service_code(&self, carrier_id: &str) -> u32 {
        self.carrier(carrier_id)
            .map_or(0, Carrier::external_service_code)
    }

    /// Logo path, empty for an unknown carrier
    #[must_use]
    pub fn carrier_logo(&self, carrier_id: &str) -> &str {
        self.carrier(carrier_id).map_or("", Carrier::logo_path)
    }

    /// Tracking page URL, empty for an unknown carrier
    #[must_use]
    pub fn tracking_url(&self, tracking_number: &str, carrier_id: &str) -> String {
        self.carrier(carrier_id)
            .map(|c| c.tracking_url(tracking_number))
            .unwrap_or_default()
    }
}
