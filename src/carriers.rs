//! Built-in carriers
//!
//! UPS, USPS and FedEx come in two variants: checksum-validated through the
//! catalog, or plain regex shapes. Only one variant per carrier is meant to
//! be registered. Priorities put structurally specific formats ahead of
//! generic digit runs.

use crate::carrier::{
    Carrier, CarrierInfo, CatalogMatcher, MatchStrategy, Matcher, S10Acceptance, TrackingPattern,
    patterns,
};
use crate::detector::Detector;
use crate::error::Result;
use std::sync::Arc;

const SEVENTEEN_TRACK_URL: &str = "https://www.17track.net/?nums=%s";

/// Leading digits of USPS domestic numbers
pub const USPS_PREFIXES: &[&str] = &["70", "14", "23", "03", "94", "93", "92", "95"];

fn info(
    id: &str,
    external_service_code: u32,
    detection_priority: i32,
    logo_path: &str,
    tracking_url_template: &str,
) -> CarrierInfo {
    CarrierInfo {
        id: id.to_string(),
        name: id.to_string(),
        external_service_code,
        detection_priority,
        enabled: true,
        logo_path: logo_path.to_string(),
        tracking_url_template: tracking_url_template.to_string(),
    }
}

// --- UPS ---

const UPS_URL: &str = "https://www.ups.com/track?tracknum=%s";

pub fn ups(detector: &Arc<Detector>) -> Result<Carrier> {
    let candidates = patterns(&["1Z[A-Z0-9]{16}", "MI[0-9]{6}[A-Z0-9]{1,22}"])?;
    Ok(Carrier::new(
        info("UPS", 100_002, 100, "images/ups.png", UPS_URL),
        Matcher::Catalog(CatalogMatcher::new("ups", candidates, Arc::clone(detector))),
    ))
}

pub fn ups_pattern() -> Result<Carrier> {
    Ok(Carrier::new(
        info("UPS", 100_002, 80, "images/ups.png", UPS_URL),
        Matcher::Pattern(patterns(&["1Z[A-Z0-9]{16}"])?),
    ))
}

// --- USPS ---

const USPS_URL: &str = "https://tools.usps.com/go/TrackConfirmAction?tLabels=%s";

/// Also claims S10 international numbers, either only those attributed to
/// USPS or all of them
pub fn usps(detector: &Arc<Detector>, s10: S10Acceptance) -> Result<Carrier> {
    let (international, via_partner) = match s10 {
        S10Acceptance::UspsPartner => ("[A-Z]{2}[0-9]{9}US", Some("usps")),
        S10Acceptance::Any => ("[A-Z]{2}[0-9]{9}[A-Z]{2}", None),
    };
    let candidates = patterns(&[
        "(?:420[0-9]{5})?9[1-5][0-9]{20}",
        "[0-9]{20}",
        international,
    ])?;
    let matcher = CatalogMatcher::new("usps", candidates, Arc::clone(detector))
        .also_accepting("s10", via_partner);

    Ok(Carrier::new(
        info("USPS", 21051, 99, "images/usps.png", USPS_URL),
        Matcher::Catalog(matcher),
    ))
}

pub fn usps_pattern() -> Result<Carrier> {
    Ok(Carrier::new(
        info("USPS", 21051, 60, "images/usps.png", USPS_URL),
        Matcher::Pattern(patterns(&[
            "(?:94|93|92|95)[0-9]{20}",
            "(?:70|14|23|03)[0-9]{14}",
            "(?:M0|82)[0-9]{8}",
            // international, except the CN suffix China Post owns
            "[A-Z]{2}[0-9]{9}(?:[A-BD-Z][A-Z]|C[A-MO-Z])",
        ])?),
    ))
}

// --- FedEx ---

const FEDEX_URL: &str = "https://www.fedex.com/fedextrack/?trknbr=%s";

pub fn fedex(detector: &Arc<Detector>) -> Result<Carrier> {
    let candidates = patterns(&[
        "[0-9]{34}",
        "96[0-9]{20}",
        "92[0-9]{20}",
        "[0-9]{20}",
        "[0-9]{15}",
        "[0-9]{12}",
    ])?;
    Ok(Carrier::new(
        info("FedEx", 100_003, 98, "images/fedex.png", FEDEX_URL),
        Matcher::Catalog(CatalogMatcher::new("fedex", candidates, Arc::clone(detector))),
    ))
}

/// The 12-digit shape is generic enough to swallow USPS numbers, so it
/// skips anything starting with a USPS prefix.
pub fn fedex_pattern() -> Result<Carrier> {
    Ok(Carrier::new(
        info("FedEx", 100_003, 20, "images/fedex.png", FEDEX_URL),
        Matcher::Pattern(vec![
            TrackingPattern::new("96[0-9]{20}")?,
            TrackingPattern::new("[0-9]{15}")?,
            TrackingPattern::new("[0-9]{12}")?.excluding_prefixes(USPS_PREFIXES),
        ]),
    ))
}

// --- Regex-only carriers ---

/// Amazon order IDs; not trackable by the external service
pub fn amazon() -> Result<Carrier> {
    Ok(Carrier::new(
        info(
            "Amazon",
            0,
            95,
            "images/amazon.png",
            "https://www.amazon.com/gp/your-account/order-details?orderID=%s",
        ),
        Matcher::Pattern(patterns(&["[0-9]{3}-[0-9]{7}-[0-9]{7}"])?),
    ))
}

pub fn yun_express() -> Result<Carrier> {
    Ok(Carrier::new(
        info(
            "YunExpress",
            190_008,
            90,
            "images/yunexpress.png",
            "https://www.yunexpress.com/track/?number=%s",
        ),
        Matcher::Pattern(patterns(&["YT[0-9]{16}"])?),
    ))
}

pub fn uni_uni() -> Result<Carrier> {
    Ok(Carrier::new(
        info("UniUni", 100_134, 85, "images/uniuni.png", SEVENTEEN_TRACK_URL),
        Matcher::Pattern(patterns(&["UU[A-Z0-9]{17}"])?),
    ))
}

pub fn sf_express() -> Result<Carrier> {
    Ok(Carrier::new(
        info("SF Express", 100_012, 75, "images/sfexpress.png", SEVENTEEN_TRACK_URL),
        Matcher::Pattern(patterns(&[
            "SF[0-9]{12,15}",
            "(?:268|118|518|688|888|588|388|689)[0-9]{9}",
        ])?),
    ))
}

pub fn yanwen() -> Result<Carrier> {
    Ok(Carrier::new(
        info("YANWEN", 190_012, 75, "images/yanwen.png", SEVENTEEN_TRACK_URL),
        Matcher::Pattern(patterns(&["[A-Z]{2}[0-9]{9}YP"])?),
    ))
}

pub fn china_post() -> Result<Carrier> {
    Ok(Carrier::new(
        info("China Post", 3011, 70, "images/chinapost.png", SEVENTEEN_TRACK_URL),
        Matcher::Pattern(patterns(&["[A-Z]{2}[0-9]{9}CN", "ZC[0-9]{11}"])?),
    ))
}

/// All built-in carriers in registration order. `strategy_for` picks the
/// variant of carriers that have both.
pub fn builtin(
    detector: &Arc<Detector>,
    strategy_for: impl Fn(&str) -> MatchStrategy,
    usps_s10: S10Acceptance,
) -> Result<Vec<Carrier>> {
    let ups_carrier = match strategy_for("UPS") {
        MatchStrategy::Checksum => ups(detector)?,
        MatchStrategy::Pattern => ups_pattern()?,
    };
    let usps_carrier = match strategy_for("USPS") {
        MatchStrategy::Checksum => usps(detector, usps_s10)?,
        MatchStrategy::Pattern => usps_pattern()?,
    };
    let fedex_carrier = match strategy_for("FedEx") {
        MatchStrategy::Checksum => fedex(detector)?,
        MatchStrategy::Pattern => fedex_pattern()?,
    };

    Ok(vec![
        ups_carrier,
        usps_carrier,
        fedex_carrier,
        yun_express()?,
        china_post()?,
        sf_express()?,
        amazon()?,
        uni_uni()?,
        yanwen()?,
    ])
}
