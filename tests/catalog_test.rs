use parcel_extract::*;
use std::fs;

const ACME: &str = r#"{
    "name": "Acme Freight",
    "courier_code": "acme",
    "tracking_numbers": [
        {
            "id": "acme_10",
            "name": "Acme 10",
            "regex": "\\s*AC(?<SerialNumber>[0-9]{9})(?<CheckDigit>[0-9])\\s*",
            "validation": { "checksum": { "name": "mod7" } },
            "tracking_url": "https://acme.example/track/%s"
        }
    ]
}"#;

#[test]
fn test_builtin_catalog_loads_every_courier() {
    let catalog = Catalog::builtin();

    for code in ["ups", "usps", "fedex", "s10", "dhl", "dpd", "old_dominion"] {
        assert!(catalog.courier(code).is_some(), "missing courier {code}");
    }
    assert_eq!(catalog.len(), 7);
    assert!(catalog.definition_count() >= 12);
}

#[test]
fn test_builtin_test_numbers() {
    let catalog = Catalog::builtin();
    let detector = Detector::new(catalog.clone());

    for courier in catalog.couriers() {
        for def in courier.definitions() {
            let id = def.id();
            for number in &def.test_numbers().valid {
                let results = detector.detect(number);
                assert!(
                    results
                        .iter()
                        .any(|r| r.tracking_number_id.as_deref() == id),
                    "{number} should match {}",
                    def.name()
                );
            }
            for number in &def.test_numbers().invalid {
                let results = detector.detect(number);
                assert!(
                    !results
                        .iter()
                        .any(|r| r.tracking_number_id.as_deref() == id),
                    "{number} should not match {}",
                    def.name()
                );
            }
        }
    }
}

#[test]
fn test_regex_fragments_are_joined() {
    let catalog = Catalog::builtin();
    let s10 = catalog.courier("s10").unwrap();
    let def = &s10.definitions()[0];

    assert!(def.pattern().contains("ServiceType"));
    assert!(def.pattern().contains("CountryCode"));
    let groups: Vec<&str> = def.group_names().collect();
    assert!(groups.contains(&"SerialNumber"));
    assert!(groups.contains(&"CheckDigit"));
    assert_eq!(def.checksum().map(ChecksumSpec::name), Some("s10"));
}

#[test]
fn test_courier_from_json() {
    let courier = Courier::from_json("acme.json", ACME).unwrap();

    assert_eq!(courier.code(), "acme");
    assert_eq!(courier.name(), "Acme Freight");
    assert_eq!(courier.definitions().len(), 1);
    assert_eq!(courier.definitions()[0].id(), Some("acme_10"));
}

#[test]
fn test_malformed_json_is_error() {
    let err = Courier::from_json("broken.json", "{ not json").unwrap_err();
    assert!(matches!(err, TrackingError::Json { .. }));
}

#[test]
fn test_unknown_group_rejected() {
    let record: DefinitionRecord = serde_json::from_str(
        r#"{
            "name": "Bad",
            "regex": "(?<SerialNumber>[0-9]{9})(?<CheckDigit>[0-9])",
            "partners": [{
                "partner_id": "nobody",
                "validation": { "matches_all": [
                    { "regex_group_name": "CountryCode", "matches": "US" }
                ]}
            }]
        }"#,
    )
    .unwrap();

    let err = TrackingDefinition::compile(&record).unwrap_err();
    assert!(matches!(
        err,
        TrackingError::UnknownGroup { ref group, .. } if group == "CountryCode"
    ));
}

#[test]
fn test_required_field_must_be_defined() {
    let record: DefinitionRecord = serde_json::from_str(
        r#"{
            "name": "Bad",
            "regex": "(?<SerialNumber>[0-9]{9})",
            "validation": { "additional": { "exists": ["Country Code"] } }
        }"#,
    )
    .unwrap();

    assert!(matches!(
        TrackingDefinition::compile(&record),
        Err(TrackingError::Definition(_))
    ));
}

#[test]
fn test_invalid_regex_rejected() {
    let record: DefinitionRecord =
        serde_json::from_str(r#"{ "name": "Bad", "regex": "([0-9" }"#).unwrap();

    assert!(matches!(
        TrackingDefinition::compile(&record),
        Err(TrackingError::Pattern { .. })
    ));
}

#[test]
fn test_bad_definition_skipped_others_kept() {
    let json = r#"{
        "name": "Mixed",
        "courier_code": "mixed",
        "tracking_numbers": [
            { "name": "Broken", "regex": "([0-9" },
            { "id": "ok", "name": "Fine", "regex": "MX[0-9]{8}" }
        ]
    }"#;

    let courier = Courier::from_json("mixed.json", json).unwrap();
    assert_eq!(courier.definitions().len(), 1);
    assert_eq!(courier.definitions()[0].name(), "Fine");
}

#[test]
fn test_from_sources_skips_unparsable_records() {
    let catalog = Catalog::from_sources([("acme.json", ACME), ("broken.json", "[1, 2")]);

    assert_eq!(catalog.len(), 1);
    assert_eq!(catalog.couriers()[0].code(), "acme");
}

#[test]
fn test_load_dir() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("acme.json"), ACME).unwrap();
    fs::write(dir.path().join("broken.json"), "{").unwrap();
    fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

    let catalog = Catalog::load_dir(dir.path()).unwrap();

    assert_eq!(catalog.len(), 1);
    assert!(catalog.courier("acme").is_some());
}

#[test]
fn test_load_missing_dir_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope");

    assert!(matches!(
        Catalog::load_dir(&missing),
        Err(TrackingError::Io { .. })
    ));
}

#[test]
fn test_oversized_checksum_weight_skips_definition() {
    let json = r#"{
        "name": "Heavy",
        "courier_code": "heavy",
        "tracking_numbers": [
            {
                "id": "heavy",
                "name": "Heavy",
                "regex": "BG(?<SerialNumber>[0-9]{4})(?<CheckDigit>[0-9])",
                "validation": {
                    "checksum": { "name": "mod10", "odds_multiplier": 4000000000 }
                }
            },
            { "id": "light", "name": "Light", "regex": "LT[0-9]{4}" }
        ]
    }"#;

    let courier = Courier::from_json("heavy.json", json).unwrap();
    assert_eq!(courier.definitions().len(), 1);
    assert_eq!(courier.definitions()[0].id(), Some("light"));

    let detector = Detector::new(Catalog::new(vec![courier]));
    assert!(detector.detect("BG99990").is_empty());
    assert_eq!(detector.detect("LT1234").len(), 1);
}

#[test]
fn test_zero_modulus_rejected_at_compile() {
    let record: DefinitionRecord = serde_json::from_str(
        r#"{
            "name": "Zero",
            "regex": "(?<SerialNumber>[0-9]{3})(?<CheckDigit>[0-9])",
            "validation": { "checksum": {
                "name": "sum_product_with_weightings_and_modulo",
                "weightings": [1, 2, 3], "modulo1": 0, "modulo2": 10
            } }
        }"#,
    )
    .unwrap();

    assert!(matches!(
        TrackingDefinition::compile(&record),
        Err(TrackingError::Definition(_))
    ));
}
