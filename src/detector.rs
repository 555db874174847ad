//! Checksum-validating detection against the courier catalog

use crate::catalog::{Catalog, Courier, PartnerAttribution, TrackingDefinition};
use crate::text::strip_whitespace;
use arc_swap::ArcSwap;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, trace};

const SERIAL_NUMBER: &str = "SerialNumber";
const CHECK_DIGIT: &str = "CheckDigit";

/// Values captured by the named groups of a definition's regex.
///
/// Only groups that took part in the match are present; unnamed groups are
/// never recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamedGroups(BTreeMap<String, String>);

impl NamedGroups {
    fn from_captures(regex: &Regex, caps: &Captures<'_>) -> Self {
        let groups = regex
            .capture_names()
            .flatten()
            .filter_map(|name| caps.name(name).map(|m| (name.to_string(), m.as_str().to_string())))
            .collect();
        Self(groups)
    }

    /// Raw captured value
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Captured value with whitespace removed
    #[must_use]
    pub fn stripped(&self, name: &str) -> Option<String> {
        self.get(name).map(strip_whitespace)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A courier format that accepted a tracking number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub courier_code: String,
    pub courier_name: String,
    pub tracking_number_id: Option<String>,
    pub tracking_number_name: String,
    /// Tracking page for the whitespace-stripped number
    pub tracking_url: Option<String>,
    pub partners: Vec<PartnerAttribution>,
}

impl MatchResult {
    #[must_use]
    pub fn has_partner(&self, partner_id: &str) -> bool {
        self.partners.iter().any(|p| p.partner_id == partner_id)
    }
}

/// Runs tracking numbers against every catalog definition.
///
/// The catalog sits behind an atomic pointer: [`Detector::reload`] swaps in
/// a whole new table while calls already in flight keep the snapshot they
/// started with.
#[derive(Debug)]
pub struct Detector {
    catalog: ArcSwap<Catalog>,
}

impl Detector {
    #[must_use]
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog: ArcSwap::from_pointee(catalog),
        }
    }

    /// Detector over the embedded catalog
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(Catalog::builtin())
    }

    /// Current catalog snapshot
    #[must_use]
    pub fn catalog(&self) -> Arc<Catalog> {
        self.catalog.load_full()
    }

    /// Replace the whole catalog
    pub fn reload(&self, catalog: Catalog) {
        info!(
            couriers = catalog.len(),
            definitions = catalog.definition_count(),
            "Reloading courier catalog"
        );
        self.catalog.store(Arc::new(catalog));
    }

    /// Every courier format that accepts `tracking_number`, in catalog order.
    ///
    /// The input is trimmed but internal whitespace is kept: definitions
    /// allow formatted numbers such as `1Z 999 AA1 01 2345 6784`. A number
    /// may legitimately match several couriers.
    #[must_use]
    pub fn detect(&self, tracking_number: &str) -> Vec<MatchResult> {
        let input = tracking_number.trim();
        let cleaned = strip_whitespace(input);
        let catalog = self.catalog.load();

        let results: Vec<MatchResult> = catalog
            .couriers()
            .iter()
            .flat_map(|courier| {
                courier
                    .definitions()
                    .iter()
                    .filter_map(|def| evaluate(courier, def, input, &cleaned))
                    .collect::<Vec<_>>()
            })
            .collect();

        debug!(
            tracking_number = input,
            matches = results.len(),
            "Detected couriers"
        );
        results
    }
}

fn evaluate(
    courier: &Courier,
    def: &TrackingDefinition,
    input: &str,
    cleaned: &str,
) -> Option<MatchResult> {
    let caps = def.regex.captures(input)?;
    let groups = NamedGroups::from_captures(&def.regex, &caps);

    if !validates_checksum(def, &groups) {
        trace!(courier = courier.code(), definition = %def.name, "Checksum mismatch");
        return None;
    }

    if !satisfies_requirements(def, &groups) {
        trace!(courier = courier.code(), definition = %def.name, "Additional field not found");
        return None;
    }

    Some(MatchResult {
        courier_code: courier.code().to_string(),
        courier_name: courier.name().to_string(),
        tracking_number_id: def.id.clone(),
        tracking_number_name: def.name.clone(),
        tracking_url: def
            .tracking_url
            .as_ref()
            .map(|template| template.replacen("%s", cleaned, 1)),
        partners: matching_partners(def, &groups),
    })
}

/// A definition without both `SerialNumber` and `CheckDigit` groups cannot
/// be checksummed and passes.
fn validates_checksum(def: &TrackingDefinition, groups: &NamedGroups) -> bool {
    let Some(checksum) = &def.checksum else {
        return true;
    };
    let (Some(serial), Some(check_digit)) =
        (groups.stripped(SERIAL_NUMBER), groups.stripped(CHECK_DIGIT))
    else {
        return true;
    };

    let serial = match &def.serial_prefix {
        Some(prefix) if prefix.when.is_match(&serial) => format!("{}{serial}", prefix.content),
        _ => serial,
    };

    checksum.validates(&serial, &check_digit)
}

/// Same-named fields are tried in order. The first one whose group did not
/// take part in the match fails the requirement.
fn satisfies_requirements(def: &TrackingDefinition, groups: &NamedGroups) -> bool {
    def.required_fields.iter().all(|required| {
        for field in def.additional.iter().filter(|field| &field.name == required) {
            let Some(value) = groups.stripped(&field.group) else {
                return false;
            };
            if field.lookup.iter().any(|entry| entry.accepts_any(&value)) {
                return true;
            }
        }
        false
    })
}

/// Partners without conditions always apply
fn matching_partners(def: &TrackingDefinition, groups: &NamedGroups) -> Vec<PartnerAttribution> {
    def.partners
        .iter()
        .filter(|partner| {
            partner.conditions.iter().all(|(group, condition)| {
                groups
                    .stripped(group)
                    .is_some_and(|value| condition.accepts_all(&value))
            })
        })
        .map(|partner| partner.attribution.clone())
        .collect()
}
