// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Path validation tests over generated certificate chains.

use hcert_trust::{PathValidationError, TrustStore, TrustedKey};
use rcgen::{
    BasicConstraints, Certificate, CertificateParams, DnType, IsCa, KeyPair,
    PKCS_ECDSA_P256_SHA256,
};
use time::macros::datetime;

struct Authority {
    cert: Certificate,
    key: KeyPair,
}

fn make_root(common_name: &str) -> Authority {
    let key = KeyPair::generate_for(&PKCS_ECDSA_P256_SHA256).unwrap();
    let mut params = CertificateParams::new(Vec::<String>::new()).unwrap();
    params.distinguished_name.push(DnType::CommonName, common_name);
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    let cert = params.self_signed(&key).unwrap();
    Authority { cert, key }
}

fn make_intermediate(common_name: &str, issuer: &Authority) -> Authority {
    let key = KeyPair::generate_for(&PKCS_ECDSA_P256_SHA256).unwrap();
    let mut params = CertificateParams::new(Vec::<String>::new()).unwrap();
    params.distinguished_name.push(DnType::CommonName, common_name);
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    let cert = params.signed_by(&key, &issuer.cert, &issuer.key).unwrap();
    Authority { cert, key }
}

fn make_leaf(common_name: &str, issuer: &Authority) -> Certificate {
    let key = KeyPair::generate_for(&PKCS_ECDSA_P256_SHA256).unwrap();
    let mut params = CertificateParams::new(Vec::<String>::new()).unwrap();
    params.distinguished_name.push(DnType::CommonName, common_name);
    params.signed_by(&key, &issuer.cert, &issuer.key).unwrap()
}

fn trusted(label: &[u8], cert: &Certificate) -> TrustedKey {
    TrustedKey::from_certificate_der("DE", label.to_vec(), cert.der().to_vec()).unwrap()
}

const CLOCK: time::OffsetDateTime = datetime!(2021-07-01 00:00 UTC);

#[test]
fn three_certificate_chain_validates_to_the_root() {
    let root = make_root("Health Root CA");
    let intermediate = make_intermediate("Health Intermediate CA", &root);
    let leaf = make_leaf("Document Signer 1", &intermediate);

    let store = TrustStore::new(vec![
        trusted(b"int", &intermediate.cert),
        trusted(b"root", &root.cert),
    ]);

    let path = store.validate_chain(leaf.der(), CLOCK).expect("chain");
    assert_eq!(path.len(), 3);
    assert!(path[0].subject.contains("Document Signer 1"));
    assert!(path[1].subject.contains("Health Intermediate CA"));
    assert!(path[2].subject.contains("Health Root CA"));
    assert!(path[2].is_root);
    assert!(!path[0].is_root);
}

#[test]
fn removing_the_root_breaks_the_path() {
    let root = make_root("Health Root CA");
    let intermediate = make_intermediate("Health Intermediate CA", &root);
    let leaf = make_leaf("Document Signer 1", &intermediate);

    let store = TrustStore::new(vec![trusted(b"int", &intermediate.cert)]);

    assert!(matches!(
        store.validate_chain(leaf.der(), CLOCK).unwrap_err(),
        PathValidationError::InvalidPath { .. }
    ));
}

#[test]
fn self_signed_leaf_is_a_single_link_path() {
    let root = make_root("Standalone Signer");
    let store = TrustStore::new(vec![trusted(b"root", &root.cert)]);

    let path = store.validate_chain(root.cert.der(), CLOCK).expect("chain");
    assert_eq!(path.len(), 1);
    assert!(path[0].is_root);
}

#[test]
fn expired_intermediate_fails_the_hop_check() {
    let root = make_root("Health Root CA");

    let key = KeyPair::generate_for(&PKCS_ECDSA_P256_SHA256).unwrap();
    let mut params = CertificateParams::new(Vec::<String>::new()).unwrap();
    params
        .distinguished_name
        .push(DnType::CommonName, "Expired Intermediate CA");
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params.not_before = datetime!(2019-01-01 00:00 UTC);
    params.not_after = datetime!(2020-01-01 00:00 UTC);
    let cert = params.signed_by(&key, &root.cert, &root.key).unwrap();
    let expired_intermediate = Authority { cert, key };

    let leaf = make_leaf("Document Signer 1", &expired_intermediate);

    let store = TrustStore::new(vec![
        trusted(b"int", &expired_intermediate.cert),
        trusted(b"root", &root.cert),
    ]);

    assert!(matches!(
        store.validate_chain(leaf.der(), CLOCK).unwrap_err(),
        PathValidationError::CertificateExpired { subject } if subject.contains("Expired Intermediate")
    ));
}

#[test]
fn expired_leaf_fails_before_any_walk() {
    let root = make_root("Health Root CA");

    let key = KeyPair::generate_for(&PKCS_ECDSA_P256_SHA256).unwrap();
    let mut params = CertificateParams::new(Vec::<String>::new()).unwrap();
    params
        .distinguished_name
        .push(DnType::CommonName, "Expired Signer");
    params.not_before = datetime!(2019-01-01 00:00 UTC);
    params.not_after = datetime!(2020-01-01 00:00 UTC);
    let leaf = params.signed_by(&key, &root.cert, &root.key).unwrap();

    let store = TrustStore::new(vec![trusted(b"root", &root.cert)]);

    assert!(matches!(
        store.validate_chain(leaf.der(), CLOCK).unwrap_err(),
        PathValidationError::CertificateExpired { .. }
    ));
}

#[test]
fn garbage_leaf_der_is_malformed() {
    let store = TrustStore::new(Vec::new());
    assert!(matches!(
        store.validate_chain(&[0x30, 0x01, 0x00], CLOCK).unwrap_err(),
        PathValidationError::Malformed(_)
    ));
}
