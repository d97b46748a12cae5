// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Certificate model tests: birth-date precision, the single-group
//! invariant, and the JSON view rule logic evaluates against.

use hcert_cwt::{BirthDate, CertificateData, WebToken};
use minicbor::Encoder;
use serde_json::json;
use time::macros::{date, datetime};

mod fixtures;
use fixtures::{encode_token, vaccination_cert_map, TokenParams};

fn decode_fixture() -> WebToken {
    let params = TokenParams {
        issuer: "DE",
        issued_at: None,
        expires_at: 1_925_000_000,
        certificate: Some(vaccination_cert_map(2, 2)),
    };
    WebToken::decode(&encode_token(&params), datetime!(2021-07-01 00:00 UTC)).expect("decode")
}

#[test]
fn birth_date_precision_levels_parse() {
    assert_eq!(BirthDate::parse("").unwrap(), BirthDate::Empty);
    assert_eq!(BirthDate::parse("1979").unwrap(), BirthDate::Year(1979));
    assert_eq!(
        BirthDate::parse("1979-04").unwrap(),
        BirthDate::YearMonth(1979, 4)
    );
    assert_eq!(
        BirthDate::parse("1979-04-14").unwrap(),
        BirthDate::Full(date!(1979 - 04 - 14))
    );
}

#[test]
fn birth_date_rejects_garbage() {
    assert!(BirthDate::parse("79").is_err());
    assert!(BirthDate::parse("1979-13").is_err());
    assert!(BirthDate::parse("1979-02-30").is_err());
    assert!(BirthDate::parse("1979-04-14-00").is_err());
}

#[test]
fn birth_date_renders_its_precision() {
    assert_eq!(BirthDate::Empty.to_string(), "");
    assert_eq!(BirthDate::Year(1979).to_string(), "1979");
    assert_eq!(BirthDate::YearMonth(1979, 4).to_string(), "1979-04");
    assert_eq!(
        BirthDate::Full(date!(1979 - 04 - 14)).to_string(),
        "1979-04-14"
    );
}

#[test]
fn decoded_person_carries_standardized_names() {
    let token = decode_fixture();
    let person = &token.certificate.person;
    assert_eq!(person.standardized_family_name, "MUSTERFRAU");
    assert_eq!(person.family_name.as_deref(), Some("Musterfrau"));
    assert_eq!(person.standardized_given_name.as_deref(), Some("ERIKA"));
}

#[test]
fn serializes_to_wire_short_keys() {
    let token = decode_fixture();
    let value = serde_json::to_value(&token.certificate).unwrap();

    assert_eq!(value["ver"], json!("1.3.0"));
    assert_eq!(value["nam"]["fnt"], json!("MUSTERFRAU"));
    assert_eq!(value["dob"], json!("1979-04-14"));
    assert_eq!(value["v"][0]["dn"], json!(2));
    assert_eq!(value["v"][0]["sd"], json!(2));
    assert_eq!(value["v"][0]["dt"], json!("2021-06-01"));
    assert_eq!(value["v"][0]["ci"], json!("URN:UVCI:01:DE:TEST#X"));
    assert!(value.get("t").is_none());
    assert!(value.get("r").is_none());
}

#[test]
fn identifiers_and_issuing_country_come_from_entries() {
    let token = decode_fixture();
    assert_eq!(
        token.certificate.data.identifiers(),
        vec!["URN:UVCI:01:DE:TEST#X"]
    );
    assert_eq!(token.certificate.data.issuing_country(), Some("DE"));
    assert_eq!(token.certificate.data.wire_key(), "v");
}

#[test]
fn empty_group_array_is_ignored_and_recovery_decodes() {
    let mut out = Vec::new();
    let mut enc = Encoder::new(&mut out);
    enc.map(3).unwrap();
    enc.i64(1).unwrap();
    enc.str("DE").unwrap();
    enc.i64(4).unwrap();
    enc.i64(1_925_000_000).unwrap();
    enc.i64(-260).unwrap();
    enc.map(1).unwrap();
    enc.i64(1).unwrap();

    // Certificate with both a "v" and an "r" group.
    enc.map(5).unwrap();
    enc.str("ver").unwrap();
    enc.str("1.3.0").unwrap();
    enc.str("nam").unwrap();
    enc.map(1).unwrap();
    enc.str("fnt").unwrap();
    enc.str("MUSTERFRAU").unwrap();
    enc.str("dob").unwrap();
    enc.str("1979-04-14").unwrap();
    enc.str("v").unwrap();
    enc.array(0).unwrap();
    enc.str("r").unwrap();
    enc.array(1).unwrap();
    enc.map(7).unwrap();
    enc.str("tg").unwrap();
    enc.str("840539006").unwrap();
    enc.str("fr").unwrap();
    enc.str("2021-01-10").unwrap();
    enc.str("df").unwrap();
    enc.str("2021-01-24").unwrap();
    enc.str("du").unwrap();
    enc.str("2021-07-10").unwrap();
    enc.str("co").unwrap();
    enc.str("DE").unwrap();
    enc.str("is").unwrap();
    enc.str("Robert Koch-Institut").unwrap();
    enc.str("ci").unwrap();
    enc.str("URN:UVCI:01:DE:RECOVERY#Y").unwrap();

    // An empty "v" array does not count as a group, so this decodes as
    // a recovery certificate.
    let token = WebToken::decode(&out, datetime!(2021-07-01 00:00 UTC)).expect("decode");
    match &token.certificate.data {
        CertificateData::Recovery(entries) => {
            assert_eq!(entries[0].valid_until, date!(2021 - 07 - 10));
        }
        other => panic!("expected recovery data, got {other:?}"),
    }
}

#[test]
fn rejects_certificate_without_any_group() {
    let mut out = Vec::new();
    let mut enc = Encoder::new(&mut out);
    enc.map(3).unwrap();
    enc.i64(1).unwrap();
    enc.str("DE").unwrap();
    enc.i64(4).unwrap();
    enc.i64(1_925_000_000).unwrap();
    enc.i64(-260).unwrap();
    enc.map(1).unwrap();
    enc.i64(1).unwrap();
    enc.map(3).unwrap();
    enc.str("ver").unwrap();
    enc.str("1.3.0").unwrap();
    enc.str("nam").unwrap();
    enc.map(1).unwrap();
    enc.str("fnt").unwrap();
    enc.str("MUSTERFRAU").unwrap();
    enc.str("dob").unwrap();
    enc.str("").unwrap();

    assert!(WebToken::decode(&out, datetime!(2021-07-01 00:00 UTC)).is_err());
}
