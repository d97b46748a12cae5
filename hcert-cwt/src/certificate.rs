// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The health-certificate data model.
//!
//! One certificate names one person and carries exactly one group of
//! event entries: vaccination doses, test results, or recovery periods.
//! The model serializes to the wire's short JSON keys so business-rule
//! logic can address fields the way published rules do
//! (`payload.v.0.dn`, `payload.nam.fnt`, ...).

use std::collections::BTreeMap;

use hcert_common::cbor::{CborKey, CborValue};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use time::format_description::well_known::Rfc3339;
use time::{Date, Month, OffsetDateTime};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Person {
    /// Display family name.
    #[serde(rename = "fn", skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    /// ICAO 9303 transliterated family name. The only mandatory name field.
    #[serde(rename = "fnt")]
    pub standardized_family_name: String,
    #[serde(rename = "gn", skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(rename = "gnt", skip_serializing_if = "Option::is_none")]
    pub standardized_given_name: Option<String>,
}

/// Birth date as issued. Source data may be partially redacted, so the
/// precision is part of the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BirthDate {
    Empty,
    Year(i32),
    YearMonth(i32, u8),
    Full(Date),
}

impl BirthDate {
    pub fn parse(s: &str) -> Result<Self, String> {
        if s.is_empty() {
            return Ok(Self::Empty);
        }

        let parts: Vec<&str> = s.split('-').collect();
        match parts.as_slice() {
            [y] => {
                let year = parse_year(y)?;
                Ok(Self::Year(year))
            }
            [y, m] => {
                let year = parse_year(y)?;
                let month: u8 = m
                    .parse()
                    .ok()
                    .filter(|m| (1..=12).contains(m))
                    .ok_or_else(|| format!("invalid birth date month: {s:?}"))?;
                Ok(Self::YearMonth(year, month))
            }
            [y, m, d] => {
                let year = parse_year(y)?;
                let month: u8 = m
                    .parse()
                    .map_err(|_| format!("invalid birth date month: {s:?}"))?;
                let day: u8 = d
                    .parse()
                    .map_err(|_| format!("invalid birth date day: {s:?}"))?;
                let month =
                    Month::try_from(month).map_err(|_| format!("invalid birth date month: {s:?}"))?;
                let date = Date::from_calendar_date(year, month, day)
                    .map_err(|_| format!("invalid birth date: {s:?}"))?;
                Ok(Self::Full(date))
            }
            _ => Err(format!("invalid birth date: {s:?}")),
        }
    }
}

fn parse_year(y: &str) -> Result<i32, String> {
    if y.len() != 4 {
        return Err(format!("invalid birth date year: {y:?}"));
    }
    y.parse().map_err(|_| format!("invalid birth date year: {y:?}"))
}

impl std::fmt::Display for BirthDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Year(y) => write!(f, "{y:04}"),
            Self::YearMonth(y, m) => write!(f, "{y:04}-{m:02}"),
            Self::Full(d) => write!(f, "{:04}-{:02}-{:02}", d.year(), u8::from(d.month()), d.day()),
        }
    }
}

impl Serialize for BirthDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

fn ser_date<S: Serializer>(date: &Date, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&format_args!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    ))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VaccinationEntry {
    #[serde(rename = "tg")]
    pub disease_target: String,
    #[serde(rename = "vp")]
    pub prophylaxis: String,
    #[serde(rename = "mp")]
    pub product: String,
    #[serde(rename = "ma")]
    pub manufacturer: String,
    #[serde(rename = "dn")]
    pub dose_number: u32,
    #[serde(rename = "sd")]
    pub total_series_doses: u32,
    #[serde(rename = "dt", serialize_with = "ser_date")]
    pub vaccination_date: Date,
    #[serde(rename = "co")]
    pub country: String,
    #[serde(rename = "is")]
    pub issuer: String,
    /// Stable certificate identifier used for deduplication.
    #[serde(rename = "ci")]
    pub identifier: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestEntry {
    #[serde(rename = "tg")]
    pub disease_target: String,
    #[serde(rename = "tt")]
    pub test_type: String,
    #[serde(rename = "nm", skip_serializing_if = "Option::is_none")]
    pub test_name: Option<String>,
    #[serde(rename = "ma", skip_serializing_if = "Option::is_none")]
    pub device_identifier: Option<String>,
    #[serde(rename = "sc", with = "time::serde::rfc3339")]
    pub sample_collected_at: OffsetDateTime,
    #[serde(rename = "tr")]
    pub result: String,
    #[serde(rename = "tc", skip_serializing_if = "Option::is_none")]
    pub testing_centre: Option<String>,
    #[serde(rename = "co")]
    pub country: String,
    #[serde(rename = "is")]
    pub issuer: String,
    #[serde(rename = "ci")]
    pub identifier: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecoveryEntry {
    #[serde(rename = "tg")]
    pub disease_target: String,
    #[serde(rename = "fr", serialize_with = "ser_date")]
    pub first_positive_result: Date,
    #[serde(rename = "df", serialize_with = "ser_date")]
    pub valid_from: Date,
    #[serde(rename = "du", serialize_with = "ser_date")]
    pub valid_until: Date,
    #[serde(rename = "co")]
    pub country: String,
    #[serde(rename = "is")]
    pub issuer: String,
    #[serde(rename = "ci")]
    pub identifier: String,
}

/// The event group. Exactly one variant is present per certificate.
#[derive(Debug, Clone, PartialEq)]
pub enum CertificateData {
    Vaccination(Vec<VaccinationEntry>),
    Test(Vec<TestEntry>),
    Recovery(Vec<RecoveryEntry>),
}

impl CertificateData {
    /// The wire key this group serializes under.
    pub fn wire_key(&self) -> &'static str {
        match self {
            Self::Vaccination(_) => "v",
            Self::Test(_) => "t",
            Self::Recovery(_) => "r",
        }
    }

    /// Stable identifiers of every entry, for deduplication.
    pub fn identifiers(&self) -> Vec<&str> {
        match self {
            Self::Vaccination(v) => v.iter().map(|e| e.identifier.as_str()).collect(),
            Self::Test(t) => t.iter().map(|e| e.identifier.as_str()).collect(),
            Self::Recovery(r) => r.iter().map(|e| e.identifier.as_str()).collect(),
        }
    }

    /// Issuing country of the first entry, when present.
    pub fn issuing_country(&self) -> Option<&str> {
        match self {
            Self::Vaccination(v) => v.first().map(|e| e.country.as_str()),
            Self::Test(t) => t.first().map(|e| e.country.as_str()),
            Self::Recovery(r) => r.first().map(|e| e.country.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HealthCertificate {
    pub version: String,
    pub person: Person,
    pub date_of_birth: BirthDate,
    pub data: CertificateData,
}

impl Serialize for HealthCertificate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(4))?;
        map.serialize_entry("ver", &self.version)?;
        map.serialize_entry("nam", &self.person)?;
        map.serialize_entry("dob", &self.date_of_birth)?;
        match &self.data {
            CertificateData::Vaccination(v) => map.serialize_entry("v", v)?,
            CertificateData::Test(t) => map.serialize_entry("t", t)?,
            CertificateData::Recovery(r) => map.serialize_entry("r", r)?,
        }
        map.end()
    }
}

type CborMap = BTreeMap<CborKey, CborValue>;

impl HealthCertificate {
    /// Decode the certificate map carried under the CWT certificate claim.
    pub fn from_cbor_map(map: &CborMap) -> Result<Self, String> {
        let version = required_text(map, "ver")?;
        let person = Person::from_cbor_map(required_map(map, "nam")?)?;
        let date_of_birth = BirthDate::parse(&required_text(map, "dob")?)?;

        let vaccinations = entry_array(map, "v")?;
        let tests = entry_array(map, "t")?;
        let recoveries = entry_array(map, "r")?;

        let data = match (vaccinations, tests, recoveries) {
            (Some(v), None, None) => {
                CertificateData::Vaccination(decode_entries(v, VaccinationEntry::from_cbor_map)?)
            }
            (None, Some(t), None) => {
                CertificateData::Test(decode_entries(t, TestEntry::from_cbor_map)?)
            }
            (None, None, Some(r)) => {
                CertificateData::Recovery(decode_entries(r, RecoveryEntry::from_cbor_map)?)
            }
            (None, None, None) => {
                return Err("certificate carries no vaccination, test, or recovery group".into())
            }
            _ => return Err("certificate carries more than one event group".into()),
        };

        Ok(Self {
            version,
            person,
            date_of_birth,
            data,
        })
    }
}

impl Person {
    fn from_cbor_map(map: &CborMap) -> Result<Self, String> {
        Ok(Self {
            family_name: optional_text(map, "fn")?,
            standardized_family_name: required_text(map, "fnt")?,
            given_name: optional_text(map, "gn")?,
            standardized_given_name: optional_text(map, "gnt")?,
        })
    }
}

impl VaccinationEntry {
    fn from_cbor_map(map: &CborMap) -> Result<Self, String> {
        Ok(Self {
            disease_target: required_text(map, "tg")?,
            prophylaxis: required_text(map, "vp")?,
            product: required_text(map, "mp")?,
            manufacturer: required_text(map, "ma")?,
            dose_number: required_u32(map, "dn")?,
            total_series_doses: required_u32(map, "sd")?,
            vaccination_date: parse_date(&required_text(map, "dt")?, "dt")?,
            country: required_text(map, "co")?,
            issuer: required_text(map, "is")?,
            identifier: required_text(map, "ci")?,
        })
    }
}

impl TestEntry {
    fn from_cbor_map(map: &CborMap) -> Result<Self, String> {
        Ok(Self {
            disease_target: required_text(map, "tg")?,
            test_type: required_text(map, "tt")?,
            test_name: optional_text(map, "nm")?,
            device_identifier: optional_text(map, "ma")?,
            sample_collected_at: parse_datetime(&required_text(map, "sc")?, "sc")?,
            result: required_text(map, "tr")?,
            testing_centre: optional_text(map, "tc")?,
            country: required_text(map, "co")?,
            issuer: required_text(map, "is")?,
            identifier: required_text(map, "ci")?,
        })
    }
}

impl RecoveryEntry {
    fn from_cbor_map(map: &CborMap) -> Result<Self, String> {
        Ok(Self {
            disease_target: required_text(map, "tg")?,
            first_positive_result: parse_date(&required_text(map, "fr")?, "fr")?,
            valid_from: parse_date(&required_text(map, "df")?, "df")?,
            valid_until: parse_date(&required_text(map, "du")?, "du")?,
            country: required_text(map, "co")?,
            issuer: required_text(map, "is")?,
            identifier: required_text(map, "ci")?,
        })
    }
}

fn get<'a>(map: &'a CborMap, key: &str) -> Option<&'a CborValue> {
    map.get(&CborKey::Text(key.to_string()))
}

fn required_text(map: &CborMap, key: &str) -> Result<String, String> {
    match get(map, key) {
        Some(CborValue::Text(s)) => Ok(s.clone()),
        Some(_) => Err(format!("field {key:?} is not a text string")),
        None => Err(format!("missing field {key:?}")),
    }
}

fn optional_text(map: &CborMap, key: &str) -> Result<Option<String>, String> {
    match get(map, key) {
        Some(CborValue::Text(s)) => Ok(Some(s.clone())),
        Some(CborValue::Null) | None => Ok(None),
        Some(_) => Err(format!("field {key:?} is not a text string")),
    }
}

fn required_u32(map: &CborMap, key: &str) -> Result<u32, String> {
    match get(map, key) {
        Some(CborValue::Int(i)) => {
            u32::try_from(*i).map_err(|_| format!("field {key:?} is out of range"))
        }
        Some(_) => Err(format!("field {key:?} is not an integer")),
        None => Err(format!("missing field {key:?}")),
    }
}

fn required_map<'a>(map: &'a CborMap, key: &str) -> Result<&'a CborMap, String> {
    match get(map, key) {
        Some(CborValue::Map(m)) => Ok(m),
        Some(_) => Err(format!("field {key:?} is not a map")),
        None => Err(format!("missing field {key:?}")),
    }
}

fn entry_array<'a>(map: &'a CborMap, key: &str) -> Result<Option<&'a [CborValue]>, String> {
    match get(map, key) {
        Some(CborValue::Array(a)) if a.is_empty() => Ok(None),
        Some(CborValue::Array(a)) => Ok(Some(a)),
        Some(_) => Err(format!("field {key:?} is not an array")),
        None => Ok(None),
    }
}

fn decode_entries<T>(
    values: &[CborValue],
    decode: impl Fn(&CborMap) -> Result<T, String>,
) -> Result<Vec<T>, String> {
    values
        .iter()
        .map(|v| match v {
            CborValue::Map(m) => decode(m),
            _ => Err("event entry is not a map".to_string()),
        })
        .collect()
}

fn parse_date(s: &str, field: &str) -> Result<Date, String> {
    let parts: Vec<&str> = s.split('-').collect();
    let [y, m, d] = parts.as_slice() else {
        return Err(format!("field {field:?} is not a calendar date: {s:?}"));
    };
    let year: i32 = y
        .parse()
        .map_err(|_| format!("field {field:?} is not a calendar date: {s:?}"))?;
    let month: u8 = m
        .parse()
        .map_err(|_| format!("field {field:?} is not a calendar date: {s:?}"))?;
    let day: u8 = d
        .parse()
        .map_err(|_| format!("field {field:?} is not a calendar date: {s:?}"))?;
    let month = Month::try_from(month)
        .map_err(|_| format!("field {field:?} is not a calendar date: {s:?}"))?;
    Date::from_calendar_date(year, month, day)
        .map_err(|_| format!("field {field:?} is not a calendar date: {s:?}"))
}

fn parse_datetime(s: &str, field: &str) -> Result<OffsetDateTime, String> {
    OffsetDateTime::parse(s, &Rfc3339)
        .map_err(|_| format!("field {field:?} is not an RFC 3339 timestamp: {s:?}"))
}
