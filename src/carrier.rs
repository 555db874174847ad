//! Carrier definitions and their matching strategies

use crate::detector::{Detector, MatchResult};
use crate::error::{Result, TrackingError};
use crate::text::normalize_tracking_number;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// How a carrier recognizes its tracking numbers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStrategy {
    /// Catalog definitions with checksum validation, where the carrier has them
    #[default]
    Checksum,
    /// Plain regex shapes
    Pattern,
}

/// Which S10 international numbers the checksum USPS carrier claims
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum S10Acceptance {
    /// Only numbers attributed to USPS (country code `US`). China Post's
    /// `CN` numbers and other posts' numbers fall through to lower
    /// priority carriers.
    #[default]
    UspsPartner,
    /// Every checksum-valid S10 number
    Any,
}

/// One regex fragment, without anchors or delimiters.
///
/// Matching is case-insensitive. Hits starting with an excluded prefix are
/// rejected, which keeps a generic shape from claiming numbers that belong
/// to a more specific carrier.
#[derive(Debug, Clone)]
pub struct TrackingPattern {
    fragment: String,
    exact: Regex,
    scan: Regex,
    excluded_prefixes: Vec<String>,
}

impl TrackingPattern {
    pub fn new(fragment: &str) -> Result<Self> {
        let compile = |pattern: String| {
            Regex::new(&pattern).map_err(|e| TrackingError::pattern(fragment, e))
        };

        Ok(Self {
            fragment: fragment.to_string(),
            exact: compile(format!(r"(?i)^(?:{fragment})$"))?,
            scan: compile(format!(r"(?i)\b(?:{fragment})\b"))?,
            excluded_prefixes: Vec::new(),
        })
    }

    /// Reject hits starting with any of `prefixes`
    #[must_use]
    pub fn excluding_prefixes(mut self, prefixes: &[&str]) -> Self {
        self.excluded_prefixes = prefixes.iter().map(|p| p.to_uppercase()).collect();
        self
    }

    #[must_use]
    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    fn is_excluded(&self, candidate: &str) -> bool {
        self.excluded_prefixes
            .iter()
            .any(|prefix| candidate.starts_with(prefix.as_str()))
    }

    /// Whole-string match against an already normalized number
    #[must_use]
    pub fn is_match(&self, normalized: &str) -> bool {
        self.exact.is_match(normalized) && !self.is_excluded(normalized)
    }

    /// Uppercased hits in free text, in order of appearance
    pub fn find_iter<'a>(&'a self, text: &'a str) -> impl Iterator<Item = String> + 'a {
        self.scan
            .find_iter(text)
            .map(|m| m.as_str().to_uppercase())
            .filter(|hit| !self.is_excluded(hit))
    }
}

/// Compile a list of fragments
pub fn patterns(fragments: &[&str]) -> Result<Vec<TrackingPattern>> {
    fragments.iter().map(|f| TrackingPattern::new(f)).collect()
}

/// A courier code, other than the carrier's own, whose detector results the
/// carrier also claims. With `via_partner` set, only results attributing
/// that partner are claimed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedCode {
    pub courier_code: String,
    pub via_partner: Option<String>,
}

/// Delegation to the shared [`Detector`]
#[derive(Debug, Clone)]
pub struct CatalogMatcher {
    courier_code: String,
    also_accepts: Vec<AcceptedCode>,
    candidates: Vec<TrackingPattern>,
    detector: Arc<Detector>,
}

impl CatalogMatcher {
    /// `candidates` are the shapes scanned for in free text; every hit is
    /// then confirmed by the detector.
    #[must_use]
    pub fn new(
        courier_code: impl Into<String>,
        candidates: Vec<TrackingPattern>,
        detector: Arc<Detector>,
    ) -> Self {
        Self {
            courier_code: courier_code.into(),
            also_accepts: Vec::new(),
            candidates,
            detector,
        }
    }

    #[must_use]
    pub fn also_accepting(mut self, courier_code: &str, via_partner: Option<&str>) -> Self {
        self.also_accepts.push(AcceptedCode {
            courier_code: courier_code.to_string(),
            via_partner: via_partner.map(str::to_string),
        });
        self
    }

    #[must_use]
    pub fn courier_code(&self) -> &str {
        &self.courier_code
    }

    #[must_use]
    pub fn detector(&self) -> &Arc<Detector> {
        &self.detector
    }

    fn claims(&self, result: &MatchResult) -> bool {
        result.courier_code == self.courier_code
            || self.also_accepts.iter().any(|accepted| {
                accepted.courier_code == result.courier_code
                    && accepted
                        .via_partner
                        .as_deref()
                        .is_none_or(|partner| result.has_partner(partner))
            })
    }

    fn accepts(&self, normalized: &str) -> bool {
        self.detector
            .detect(normalized)
            .iter()
            .any(|result| self.claims(result))
    }
}

/// Matching strategy of a carrier
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Anchored regex fragments, no validation beyond shape
    Pattern(Vec<TrackingPattern>),
    /// Catalog definitions with checksum and field validation
    Catalog(CatalogMatcher),
}

impl Matcher {
    #[must_use]
    pub const fn strategy(&self) -> MatchStrategy {
        match self {
            Self::Pattern(_) => MatchStrategy::Pattern,
            Self::Catalog(_) => MatchStrategy::Checksum,
        }
    }
}

/// Static facts about a carrier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarrierInfo {
    /// Unique key, also what callers persist
    pub id: String,

    /// Display name
    pub name: String,

    /// Carrier code of the external tracking-status service; 0 when the
    /// service cannot track this carrier
    pub external_service_code: u32,

    /// Higher is tried first
    pub detection_priority: i32,

    /// Disabled carriers are skipped by detection and extraction
    pub enabled: bool,

    pub logo_path: String,

    /// Tracking page URL with a `%s` placeholder for the number
    pub tracking_url_template: String,
}

/// A supported carrier
#[derive(Debug, Clone)]
pub struct Carrier {
    info: CarrierInfo,
    matcher: Matcher,
}

impl Carrier {
    #[must_use]
    pub const fn new(info: CarrierInfo, matcher: Matcher) -> Self {
        Self { info, matcher }
    }

    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.info.enabled = enabled;
        self
    }

    #[must_use]
    pub fn with_detection_priority(mut self, priority: i32) -> Self {
        self.info.detection_priority = priority;
        self
    }

    #[must_use]
    pub const fn info(&self) -> &CarrierInfo {
        &self.info
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.info.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.info.name
    }

    #[must_use]
    pub const fn external_service_code(&self) -> u32 {
        self.info.external_service_code
    }

    #[must_use]
    pub const fn detection_priority(&self) -> i32 {
        self.info.detection_priority
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.info.enabled
    }

    #[must_use]
    pub fn logo_path(&self) -> &str {
        &self.info.logo_path
    }

    #[must_use]
    pub const fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    /// Regex fragments this carrier scans for
    #[must_use]
    pub fn patterns(&self) -> Vec<&str> {
        let patterns = match &self.matcher {
            Matcher::Pattern(patterns) => patterns,
            Matcher::Catalog(catalog) => &catalog.candidates,
        };
        patterns.iter().map(TrackingPattern::fragment).collect()
    }

    /// Tracking page for a number, URL-encoded into the template
    #[must_use]
    pub fn tracking_url(&self, tracking_number: &str) -> String {
        let encoded: String =
            url::form_urlencoded::byte_serialize(tracking_number.as_bytes()).collect();
        self.info.tracking_url_template.replacen("%s", &encoded, 1)
    }

    /// Whether a single tracking number belongs to this carrier.
    /// Whitespace is removed and letters uppercased first.
    #[must_use]
    pub fn matches_tracking_number(&self, tracking_number: &str) -> bool {
        let normalized = normalize_tracking_number(tracking_number);
        match &self.matcher {
            Matcher::Pattern(patterns) => patterns.iter().any(|p| p.is_match(&normalized)),
            Matcher::Catalog(catalog) => catalog.accepts(&normalized),
        }
    }

    /// Distinct uppercased tracking numbers of this carrier found in `text`
    #[must_use]
    pub fn extract_tracking_numbers(&self, text: &str) -> Vec<String> {
        let patterns = match &self.matcher {
            Matcher::Pattern(patterns) => patterns,
            Matcher::Catalog(catalog) => &catalog.candidates,
        };

        let mut found: Vec<String> = Vec::new();
        for hit in patterns.iter().flat_map(|p| p.find_iter(text)) {
            if !found.contains(&hit) {
                found.push(hit);
            }
        }

        if let Matcher::Catalog(catalog) = &self.matcher {
            let candidates = found.len();
            found.retain(|hit| catalog.accepts(hit));
            debug!(
                carrier = self.id(),
                candidates,
                confirmed = found.len(),
                "Validated extracted candidates"
            );
        }

        found
    }
}
