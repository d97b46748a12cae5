// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use serde::Deserialize;
use time::OffsetDateTime;

use crate::logic::Expr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum RuleType {
    Acceptance,
    Invalidation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum CertificateType {
    General,
    Vaccination,
    Test,
    Recovery,
}

impl CertificateType {
    /// Whether a rule declared for `self` applies to a certificate of
    /// `certificate`. `General` rules apply to every certificate.
    pub fn applies_to(self, certificate: CertificateType) -> bool {
        self == CertificateType::General || self == certificate
    }
}

/// Localized rule description, carried for the caller's UI layer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RuleDescription {
    pub lang: String,
    pub desc: String,
}

/// One published business rule, as fetched from the rule distribution
/// service.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Rule {
    pub identifier: String,
    #[serde(rename = "Type")]
    pub rule_type: RuleType,
    pub country: String,
    #[serde(default)]
    pub region: Option<String>,
    pub version: String,
    #[serde(default)]
    pub schema_version: Option<String>,
    #[serde(default)]
    pub engine: Option<String>,
    #[serde(default)]
    pub engine_version: Option<String>,
    pub certificate_type: CertificateType,
    #[serde(default)]
    pub description: Vec<RuleDescription>,
    #[serde(with = "time::serde::rfc3339")]
    pub valid_from: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub valid_to: OffsetDateTime,
    #[serde(default)]
    pub affected_fields: Vec<String>,
    pub logic: Expr,
}

impl Rule {
    /// Whether the rule's `[valid_from, valid_to)` window contains `clock`.
    pub fn in_window(&self, clock: OffsetDateTime) -> bool {
        self.valid_from <= clock && clock < self.valid_to
    }
}
