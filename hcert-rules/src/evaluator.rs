// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Rule evaluation and verdict aggregation.

use serde_json::{json, Value};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::logic::{is_truthy, EvalError};
use crate::model::{Rule, RuleType};
use crate::value_sets::ValueSets;

/// The external-parameter bundle rule logic evaluates against, alongside
/// the certificate payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalParameters {
    pub validation_clock: OffsetDateTime,
    pub value_sets: ValueSets,
    /// The verifying/acceptance country.
    pub country_code: String,
    /// The certificate's issuance country, when known.
    pub issuer_country_code: Option<String>,
    pub expires_at: Option<OffsetDateTime>,
    pub issued_at: Option<OffsetDateTime>,
}

/// Outcome of one rule against one certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    Passed,
    Failed,
    /// Indeterminate: input the rule needs is absent from the
    /// certificate. Distinct from `Failed`; the caller owns the policy
    /// for open results.
    Open { missing: String },
    /// The rule itself misbehaved (type error while evaluating).
    Error { reason: String },
}

/// Created fresh per validation call; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleEvaluationResult {
    pub identifier: String,
    pub rule_type: RuleType,
    pub version: String,
    pub country: String,
    pub outcome: RuleOutcome,
}

/// At least one acceptance rule failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("certificate violates rules: {}", failed.join(", "))]
pub struct RuleViolationError {
    pub failed: Vec<String>,
}

fn rfc3339(t: OffsetDateTime) -> Value {
    t.format(&Rfc3339).map(Value::String).unwrap_or(Value::Null)
}

/// Assemble the JSON document rule logic addresses: the certificate
/// under `payload`, everything else under `external`.
fn evaluation_document(certificate: &Value, external: &ExternalParameters) -> Value {
    json!({
        "payload": certificate,
        "external": {
            "validationClock": rfc3339(external.validation_clock),
            "valueSets": &external.value_sets,
            "countryCode": &external.country_code,
            "issuerCountryCode": &external.issuer_country_code,
            "exp": external.expires_at.map(rfc3339).unwrap_or(Value::Null),
            "iat": external.issued_at.map(rfc3339).unwrap_or(Value::Null),
        },
    })
}

/// Evaluate one rule.
pub fn evaluate_rule(
    rule: &Rule,
    certificate: &Value,
    external: &ExternalParameters,
) -> RuleEvaluationResult {
    let document = evaluation_document(certificate, external);
    let outcome = match rule.logic.evaluate(&document) {
        Ok(value) if is_truthy(&value) => RuleOutcome::Passed,
        Ok(_) => RuleOutcome::Failed,
        Err(EvalError::MissingValue { path }) => RuleOutcome::Open { missing: path },
        Err(EvalError::Type(reason)) => RuleOutcome::Error { reason },
    };

    RuleEvaluationResult {
        identifier: rule.identifier.clone(),
        rule_type: rule.rule_type,
        version: rule.version.clone(),
        country: rule.country.clone(),
        outcome,
    }
}

/// Evaluate a selected rule list against one certificate.
pub fn evaluate_rules<'a>(
    rules: impl IntoIterator<Item = &'a Rule>,
    certificate: &Value,
    external: &ExternalParameters,
) -> Vec<RuleEvaluationResult> {
    rules
        .into_iter()
        .map(|rule| evaluate_rule(rule, certificate, external))
        .collect()
}

/// Aggregate per-rule results into the overall verdict.
///
/// Any `Failed` result aborts acceptance. `Open` and `Error` results do
/// not block here; they stay visible in the result list for the caller
/// to act on.
pub fn check_verdict(results: &[RuleEvaluationResult]) -> Result<(), RuleViolationError> {
    let failed: Vec<String> = results
        .iter()
        .filter(|r| r.outcome == RuleOutcome::Failed)
        .map(|r| r.identifier.clone())
        .collect();

    if failed.is_empty() {
        Ok(())
    } else {
        Err(RuleViolationError { failed })
    }
}
