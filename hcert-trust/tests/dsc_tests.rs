// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! DSC list manager tests: atomic replacement, refresh-failure
//! semantics, and staleness reporting.

use hcert_trust::{DscEntry, DscListManager, StaleTrustDataError, TrustStore};
use time::macros::datetime;
use time::Duration;

fn generated_entry(country: &str, kid: &[u8]) -> DscEntry {
    let cert = rcgen::generate_simple_self_signed(vec!["signer.test".to_string()]).unwrap();
    DscEntry {
        country: country.to_string(),
        key_id: kid.to_vec(),
        certificate_der: cert.cert.der().to_vec(),
        signature: vec![0xAA; 8],
        timestamp: datetime!(2021-06-30 12:00 UTC),
    }
}

#[test]
fn replace_swaps_the_whole_snapshot() {
    let manager = DscListManager::new(TrustStore::default());
    assert_eq!(manager.current().len(), 0);
    assert_eq!(manager.last_update(), None);

    let now = datetime!(2021-07-01 00:00 UTC);
    manager
        .replace(vec![generated_entry("DE", b"k1"), generated_entry("FR", b"k2")], now)
        .expect("replace");

    let snapshot = manager.current();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(manager.last_update(), Some(now));
}

#[test]
fn earlier_snapshots_survive_replacement() {
    let manager = DscListManager::new(TrustStore::default());
    let now = datetime!(2021-07-01 00:00 UTC);
    manager
        .replace(vec![generated_entry("DE", b"k1")], now)
        .unwrap();

    // A validation in flight holds the old snapshot while a refresh lands.
    let held = manager.current();
    manager
        .replace(vec![generated_entry("FR", b"k2"), generated_entry("IT", b"k3")], now)
        .unwrap();

    assert_eq!(held.len(), 1);
    assert_eq!(held.keys()[0].country, "DE");
    assert_eq!(manager.current().len(), 2);
}

#[test]
fn failed_refresh_keeps_the_previous_snapshot() {
    let manager = DscListManager::new(TrustStore::default());
    let now = datetime!(2021-07-01 00:00 UTC);
    manager
        .replace(vec![generated_entry("DE", b"k1")], now)
        .unwrap();

    let bad = DscEntry {
        country: "XX".to_string(),
        key_id: b"bad".to_vec(),
        certificate_der: vec![0xFF, 0xFE],
        signature: Vec::new(),
        timestamp: now,
    };
    let later = datetime!(2021-07-02 00:00 UTC);
    assert!(manager
        .replace(vec![generated_entry("FR", b"k2"), bad], later)
        .is_err());

    // Stale but consistent beats fresh but partial.
    assert_eq!(manager.current().len(), 1);
    assert_eq!(manager.current().keys()[0].country, "DE");
    assert_eq!(manager.last_update(), Some(now));
}

#[test]
fn staleness_reports_age_against_threshold() {
    let manager = DscListManager::new(TrustStore::default());
    assert_eq!(
        manager
            .staleness(datetime!(2021-07-01 00:00 UTC), Duration::hours(24))
            .unwrap_err(),
        StaleTrustDataError::NeverRefreshed
    );

    let updated = datetime!(2021-07-01 00:00 UTC);
    manager.replace(vec![generated_entry("DE", b"k1")], updated).unwrap();

    assert!(manager
        .staleness(datetime!(2021-07-01 12:00 UTC), Duration::hours(24))
        .is_ok());

    let err = manager
        .staleness(datetime!(2021-07-03 00:00 UTC), Duration::hours(24))
        .unwrap_err();
    assert!(matches!(err, StaleTrustDataError::Stale { age, .. } if age == Duration::hours(48)));
}

#[test]
fn thumbprint_is_recomputed_sha256_hex() {
    let entry = generated_entry("DE", b"k1");
    let thumbprint = entry.thumbprint();
    assert_eq!(thumbprint.len(), 64);
    assert!(thumbprint.chars().all(|c| c.is_ascii_hexdigit()));

    let mut tampered = entry.clone();
    tampered.certificate_der[10] ^= 0x01;
    assert_ne!(tampered.thumbprint(), thumbprint);
}
