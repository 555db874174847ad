//! Courier tracking number definitions loaded from JSON records
//!
//! Each record describes one courier and the tracking number formats it
//! issues. Records are compiled once into immutable [`Courier`] tables.
//! A record or definition that fails to compile is skipped with a warning.

use crate::checksum::ChecksumSpec;
use crate::error::{Result, TrackingError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, warn};

const BUILTIN_SOURCES: &[(&str, &str)] = &[
    ("ups.json", include_str!("../data/couriers/ups.json")),
    ("usps.json", include_str!("../data/couriers/usps.json")),
    ("fedex.json", include_str!("../data/couriers/fedex.json")),
    ("s10.json", include_str!("../data/couriers/s10.json")),
    ("dhl.json", include_str!("../data/couriers/dhl.json")),
    ("dpd.json", include_str!("../data/couriers/dpd.json")),
    ("old_dominion.json", include_str!("../data/couriers/old_dominion.json")),
];

// --- Record schema ---

/// One courier as stored on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourierRecord {
    pub name: String,
    pub courier_code: String,
    #[serde(default)]
    pub tracking_numbers: Vec<DefinitionRecord>,
}

/// A regex stored either whole or as fragments to be concatenated
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RegexSource {
    Single(String),
    Fragments(Vec<String>),
}

impl RegexSource {
    /// The full pattern
    #[must_use]
    pub fn joined(&self) -> String {
        match self {
            Self::Single(pattern) => pattern.clone(),
            Self::Fragments(parts) => parts.concat(),
        }
    }
}

/// One tracking number format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefinitionRecord {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub regex: RegexSource,
    #[serde(default)]
    pub validation: ValidationRecord,
    #[serde(default)]
    pub tracking_url: Option<String>,
    #[serde(default)]
    pub additional: Vec<AdditionalFieldRecord>,
    #[serde(default)]
    pub partners: Vec<PartnerRecord>,
    #[serde(default)]
    pub test_numbers: TestNumbers,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationRecord {
    #[serde(default)]
    pub checksum: Option<ChecksumSpec>,
    #[serde(default)]
    pub serial_number_format: Option<SerialNumberFormat>,
    #[serde(default)]
    pub additional: Option<AdditionalRequirements>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SerialNumberFormat {
    #[serde(default)]
    pub prepend_if: Option<PrependIf>,
}

/// Prepend `content` to the serial number when it matches `matches_regex`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrependIf {
    pub matches_regex: String,
    pub content: String,
}

/// Names of additional fields whose captured value must be found in their lookup
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdditionalRequirements {
    #[serde(default)]
    pub exists: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdditionalFieldRecord {
    pub name: String,
    pub regex_group_name: String,
    #[serde(default)]
    pub lookup: Vec<ValueConditionRecord>,
}

/// Exact and/or anchored regex condition on a captured value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValueConditionRecord {
    #[serde(default)]
    pub matches: Option<String>,
    #[serde(default)]
    pub matches_regex: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartnerRecord {
    pub partner_id: String,
    #[serde(default)]
    pub partner_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub validation: PartnerValidation,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PartnerValidation {
    #[serde(default)]
    pub matches_all: Vec<GroupConditionRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupConditionRecord {
    pub regex_group_name: String,
    #[serde(flatten)]
    pub condition: ValueConditionRecord,
}

/// Sample numbers shipped with a definition
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TestNumbers {
    #[serde(default)]
    pub valid: Vec<String>,
    #[serde(default)]
    pub invalid: Vec<String>,
}

// --- Compiled tables ---

/// Secondary courier identity attached to a match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartnerAttribution {
    pub partner_id: String,
    pub partner_type: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct ValueCondition {
    pub(crate) exact: Option<String>,
    pub(crate) pattern: Option<Regex>,
}

impl ValueCondition {
    fn compile(record: &ValueConditionRecord) -> Result<Self> {
        let pattern = record
            .matches_regex
            .as_deref()
            .map(compile_anchored)
            .transpose()?;

        Ok(Self {
            exact: record.matches.clone(),
            pattern,
        })
    }

    /// Lookup semantics: either form of the condition is enough
    pub(crate) fn accepts_any(&self, value: &str) -> bool {
        self.exact.as_deref() == Some(value) || self.pattern.as_ref().is_some_and(|re| re.is_match(value))
    }

    /// Partner semantics: every declared form must hold
    pub(crate) fn accepts_all(&self, value: &str) -> bool {
        self.exact.as_deref().is_none_or(|exact| exact == value)
            && self.pattern.as_ref().is_none_or(|re| re.is_match(value))
    }
}

#[derive(Debug, Clone)]
pub(crate) struct AdditionalField {
    pub(crate) name: String,
    pub(crate) group: String,
    pub(crate) lookup: Vec<ValueCondition>,
}

#[derive(Debug, Clone)]
pub(crate) struct Partner {
    pub(crate) attribution: PartnerAttribution,
    pub(crate) conditions: Vec<(String, ValueCondition)>,
}

#[derive(Debug, Clone)]
pub(crate) struct SerialPrefix {
    pub(crate) when: Regex,
    pub(crate) content: String,
}

/// A compiled tracking number format
#[derive(Debug, Clone)]
pub struct TrackingDefinition {
    pub(crate) id: Option<String>,
    pub(crate) name: String,
    pub(crate) pattern: String,
    pub(crate) regex: Regex,
    pub(crate) checksum: Option<ChecksumSpec>,
    pub(crate) serial_prefix: Option<SerialPrefix>,
    pub(crate) required_fields: Vec<String>,
    pub(crate) additional: Vec<AdditionalField>,
    pub(crate) partners: Vec<Partner>,
    pub(crate) tracking_url: Option<String>,
    pub(crate) test_numbers: TestNumbers,
}

impl TrackingDefinition {
    /// Compile a definition, checking every group it references against
    /// the groups its regex declares.
    pub fn compile(record: &DefinitionRecord) -> Result<Self> {
        let pattern = record.regex.joined();
        let regex = compile_anchored(&pattern)?;
        let label = record.id.clone().unwrap_or_else(|| record.name.clone());

        if let Some(checksum) = &record.validation.checksum {
            checksum
                .check_parameters()
                .map_err(|e| TrackingError::Definition(format!("{label}: {e}")))?;
        }

        let declared: HashSet<&str> = regex.capture_names().flatten().collect();
        let check_group = |group: &str| {
            if declared.contains(group) {
                Ok(())
            } else {
                Err(TrackingError::UnknownGroup {
                    definition: label.clone(),
                    group: group.to_string(),
                })
            }
        };

        let mut additional = Vec::with_capacity(record.additional.len());
        for field in &record.additional {
            check_group(&field.regex_group_name)?;
            let lookup = field
                .lookup
                .iter()
                .map(ValueCondition::compile)
                .collect::<Result<Vec<_>>>()?;
            additional.push(AdditionalField {
                name: field.name.clone(),
                group: field.regex_group_name.clone(),
                lookup,
            });
        }

        let required_fields = record
            .validation
            .additional
            .as_ref()
            .map(|req| req.exists.clone())
            .unwrap_or_default();
        for required in &required_fields {
            if !additional.iter().any(|field| &field.name == required) {
                return Err(TrackingError::Definition(format!(
                    "{label} requires additional field `{required}` but does not define it"
                )));
            }
        }

        let mut partners = Vec::with_capacity(record.partners.len());
        for partner in &record.partners {
            let mut conditions = Vec::with_capacity(partner.validation.matches_all.len());
            for condition in &partner.validation.matches_all {
                check_group(&condition.regex_group_name)?;
                conditions.push((
                    condition.regex_group_name.clone(),
                    ValueCondition::compile(&condition.condition)?,
                ));
            }
            partners.push(Partner {
                attribution: PartnerAttribution {
                    partner_id: partner.partner_id.clone(),
                    partner_type: partner.partner_type.clone(),
                    description: partner.description.clone(),
                },
                conditions,
            });
        }

        let serial_prefix = record
            .validation
            .serial_number_format
            .as_ref()
            .and_then(|format| format.prepend_if.as_ref())
            .map(|prepend| {
                Regex::new(&prepend.matches_regex)
                    .map(|when| SerialPrefix {
                        when,
                        content: prepend.content.clone(),
                    })
                    .map_err(|e| TrackingError::pattern(&prepend.matches_regex, e))
            })
            .transpose()?;

        Ok(Self {
            id: record.id.clone(),
            name: record.name.clone(),
            pattern,
            regex,
            checksum: record.validation.checksum.clone(),
            serial_prefix,
            required_fields,
            additional,
            partners,
            tracking_url: record.tracking_url.clone(),
            test_numbers: record.test_numbers.clone(),
        })
    }

    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The unanchored pattern as declared
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    #[must_use]
    pub const fn checksum(&self) -> Option<&ChecksumSpec> {
        self.checksum.as_ref()
    }

    /// Named capture groups declared by the regex
    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.regex.capture_names().flatten()
    }

    #[must_use]
    pub const fn test_numbers(&self) -> &TestNumbers {
        &self.test_numbers
    }
}

/// A courier and its compiled tracking number formats
#[derive(Debug, Clone)]
pub struct Courier {
    code: String,
    name: String,
    definitions: Vec<TrackingDefinition>,
}

impl Courier {
    /// Compile a record. Definitions that fail to compile are skipped.
    #[must_use]
    pub fn from_record(record: &CourierRecord) -> Self {
        let definitions = record
            .tracking_numbers
            .iter()
            .filter_map(|def| match TrackingDefinition::compile(def) {
                Ok(compiled) => Some(compiled),
                Err(e) => {
                    warn!(
                        courier = %record.courier_code,
                        definition = %def.name,
                        "Skipping tracking number definition: {e}"
                    );
                    None
                }
            })
            .collect();

        Self {
            code: record.courier_code.clone(),
            name: record.name.clone(),
            definitions,
        }
    }

    /// Parse and compile one JSON record
    pub fn from_json(source_name: &str, json: &str) -> Result<Self> {
        let record: CourierRecord =
            serde_json::from_str(json).map_err(|e| TrackingError::Json {
                source_name: source_name.to_string(),
                details: e.to_string(),
            })?;
        Ok(Self::from_record(&record))
    }

    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn definitions(&self) -> &[TrackingDefinition] {
        &self.definitions
    }
}

/// Immutable set of couriers consulted by the detector
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    couriers: Vec<Courier>,
}

impl Catalog {
    #[must_use]
    pub const fn new(couriers: Vec<Courier>) -> Self {
        Self { couriers }
    }

    /// The catalog embedded in the crate
    #[must_use]
    pub fn builtin() -> Self {
        Self::from_sources(BUILTIN_SOURCES.iter().copied())
    }

    /// Build from `(source name, JSON)` pairs, skipping records that fail to parse
    pub fn from_sources<'a, I>(sources: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let couriers = sources
            .into_iter()
            .filter_map(|(name, json)| match Courier::from_json(name, json) {
                Ok(courier) => Some(courier),
                Err(e) => {
                    warn!("Skipping courier record: {e}");
                    None
                }
            })
            .collect();

        let catalog = Self { couriers };
        info!(
            couriers = catalog.len(),
            definitions = catalog.definition_count(),
            "Loaded courier catalog"
        );
        catalog
    }

    /// Load every `*.json` file in a directory, in file name order.
    ///
    /// Only an unreadable directory is an error; unreadable or malformed
    /// files are skipped.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let io_err = |source| TrackingError::Io {
            path: dir.to_path_buf(),
            source,
        };

        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut sources = Vec::with_capacity(paths.len());
        for path in paths {
            match std::fs::read_to_string(&path) {
                Ok(json) => sources.push((path.display().to_string(), json)),
                Err(e) => warn!(path = %path.display(), "Skipping unreadable courier file: {e}"),
            }
        }

        Ok(Self::from_sources(
            sources.iter().map(|(name, json)| (name.as_str(), json.as_str())),
        ))
    }

    #[must_use]
    pub fn couriers(&self) -> &[Courier] {
        &self.couriers
    }

    /// First courier with the given code
    #[must_use]
    pub fn courier(&self, code: &str) -> Option<&Courier> {
        self.couriers.iter().find(|c| c.code == code)
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.couriers.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.couriers.is_empty()
    }

    /// Total number of compiled definitions across all couriers
    #[must_use]
    pub fn definition_count(&self) -> usize {
        self.couriers.iter().map(|c| c.definitions.len()).sum()
    }
}

fn compile_anchored(pattern: &str) -> Result<Regex> {
    Regex::new(&format!("^(?:{pattern})$")).map_err(|e| TrackingError::pattern(pattern, e))
}
