use parcel_extract::*;

fn codes(results: &[MatchResult]) -> Vec<&str> {
    results.iter().map(|r| r.courier_code.as_str()).collect()
}

#[test]
fn test_detect_ups() {
    let detector = Detector::builtin();
    let results = detector.detect("1Z999AA10123456784");

    assert_eq!(results.len(), 1);
    let result = &results[0];
    assert_eq!(result.courier_code, "ups");
    assert_eq!(result.courier_name, "UPS");
    assert_eq!(result.tracking_number_id.as_deref(), Some("ups_1z"));
    assert_eq!(
        result.tracking_url.as_deref(),
        Some("https://www.ups.com/track?tracknum=1Z999AA10123456784")
    );
}

#[test]
fn test_detect_formatted_number() {
    let detector = Detector::builtin();
    let results = detector.detect("  1Z 999 AA1 01 2345 6784 ");

    assert_eq!(codes(&results), vec!["ups"]);
    assert!(
        results[0]
            .tracking_url
            .as_deref()
            .is_some_and(|url| url.ends_with("1Z999AA10123456784"))
    );
}

#[test]
fn test_wrong_check_digit_rejected() {
    let detector = Detector::builtin();
    assert!(detector.detect("1Z999AA10123456785").is_empty());
    assert!(detector.detect("986578788856").is_empty());
}

#[test]
fn test_unmatched_input() {
    let detector = Detector::builtin();
    assert!(detector.detect("").is_empty());
    assert!(detector.detect("hello world").is_empty());
}

#[test]
fn test_s10_partner_attribution() {
    let detector = Detector::builtin();

    let us = detector.detect("RB123456785US");
    assert_eq!(codes(&us), vec!["s10"]);
    assert!(us[0].has_partner("usps"));
    assert!(!us[0].has_partner("china_post"));

    let cn = detector.detect("RA123456785CN");
    assert!(cn[0].has_partner("china_post"));
    assert!(!cn[0].has_partner("usps"));
}

#[test]
fn test_s10_requires_known_country() {
    let detector = Detector::builtin();
    assert!(detector.detect("RB123456785XX").is_empty());
}

#[test]
fn test_s10_check_digit_edge_cases() {
    let detector = Detector::builtin();
    assert_eq!(codes(&detector.detect("EE000000005GB")), vec!["s10"]);
    assert_eq!(codes(&detector.detect("CP000316760DE")), vec!["s10"]);
    assert!(detector.detect("CP000316761DE").is_empty());
}

#[test]
fn test_smartpost_prepends_routing_prefix() {
    let detector = Detector::builtin();

    let short = detector.detect("61299998820821171811");
    assert_eq!(codes(&short), vec!["fedex"]);
    assert_eq!(
        short[0].tracking_number_id.as_deref(),
        Some("fedex_smartpost")
    );
    assert!(short[0].has_partner("usps"));

    assert!(detector.detect("61299998820821171812").is_empty());
}

#[test]
fn test_number_matching_several_couriers() {
    let detector = Detector::builtin();
    let results = detector.detect("9205590164917312751089");

    let found = codes(&results);
    assert!(found.contains(&"usps"));
    assert!(found.contains(&"fedex"));
}

#[test]
fn test_other_algorithms() {
    let detector = Detector::builtin();
    assert_eq!(codes(&detector.detect("3318810025")), vec!["dhl"]);
    assert_eq!(codes(&detector.detect("00081827099809V")), vec!["dpd"]);
    assert_eq!(codes(&detector.detect("07271048519")), vec!["old_dominion"]);
}

#[test]
fn test_detection_is_idempotent() {
    let detector = Detector::builtin();
    for number in ["1Z999AA10123456784", "RB123456785US", "9205590164917312751089"] {
        assert_eq!(detector.detect(number), detector.detect(number));
    }
}

#[test]
fn test_reload_replaces_catalog() {
    let detector = Detector::builtin();
    let before = detector.catalog();
    assert!(!detector.detect("1Z999AA10123456784").is_empty());

    let acme = r#"{
        "name": "Acme",
        "courier_code": "acme",
        "tracking_numbers": [{ "id": "acme", "name": "Acme", "regex": "AC[0-9]{6}" }]
    }"#;
    detector.reload(Catalog::from_sources([("acme.json", acme)]));

    assert!(detector.detect("1Z999AA10123456784").is_empty());
    assert_eq!(codes(&detector.detect("AC123456")), vec!["acme"]);
    assert!(detector.detect("AC123456").iter().all(|r| r.tracking_url.is_none()));

    // a snapshot taken earlier is unaffected
    assert!(before.courier("ups").is_some());
}

#[test]
fn test_named_groups_from_lookup_requirement() {
    let json = r#"{
        "name": "Zoned",
        "courier_code": "zoned",
        "tracking_numbers": [{
            "name": "Zoned",
            "regex": "Z(?<Zone>[A-Z]{2})(?<Body>[0-9]{4})",
            "validation": { "additional": { "exists": ["Zone"] } },
            "additional": [{
                "name": "Zone",
                "regex_group_name": "Zone",
                "lookup": [{ "matches": "NE" }, { "matches_regex": "S[A-Z]" }]
            }]
        }]
    }"#;
    let detector = Detector::new(Catalog::from_sources([("zoned.json", json)]));

    assert_eq!(detector.detect("ZNE1234").len(), 1);
    assert_eq!(detector.detect("ZSW1234").len(), 1);
    assert!(detector.detect("ZNW1234").is_empty());
}

#[test]
fn test_same_named_fields_stop_at_missing_group() {
    let json = r#"{
        "name": "Split",
        "courier_code": "split",
        "tracking_numbers": [{
            "name": "Split",
            "regex": "Z(?:(?<Letters>[A-Z]{2})|(?<Digits>[0-9]{2}))X",
            "validation": { "additional": { "exists": ["Zone"] } },
            "additional": [
                { "name": "Zone", "regex_group_name": "Letters", "lookup": [{ "matches": "NE" }] },
                { "name": "Zone", "regex_group_name": "Digits", "lookup": [{ "matches": "12" }] }
            ]
        }]
    }"#;
    let detector = Detector::new(Catalog::from_sources([("split.json", json)]));

    assert_eq!(detector.detect("ZNEX").len(), 1);
    assert!(detector.detect("ZSWX").is_empty());
    // the first Zone field's group did not take part
    assert!(detector.detect("Z12X").is_empty());
}
