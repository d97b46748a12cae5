// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::Arc;

use hcert_common::{base45, deflate, Envelope};
use hcert_cwt::{CertificateData, WebToken};
use hcert_rules::{
    check_verdict, evaluate_rules, CertificateType, ExternalParameters, RuleEvaluationResult,
    RuleRepository, RuleSet, ValueSets,
};
use hcert_trust::{DscListManager, KeyResolution, StaleTrustDataError, TrustStore};
use time::{Duration, OffsetDateTime};

use crate::error::{DecodeError, VerificationError};

/// Scheme marker prefixing scanned payloads.
pub const SCHEME_PREFIX: &str = "HC1:";

/// A decoded (but not yet verified) credential.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedCredential {
    pub envelope: Envelope,
    pub token: WebToken,
}

/// Decode a scanned payload without verifying trust or rules.
///
/// Useful for inspection flows; `now` still gates on the token expiry.
pub fn decode(scan_text: &str, now: OffsetDateTime) -> Result<DecodedCredential, DecodeError> {
    let envelope = decode_envelope(scan_text)?;
    let token = WebToken::decode(&envelope.payload, now)?;
    Ok(DecodedCredential { envelope, token })
}

fn decode_envelope(scan_text: &str) -> Result<Envelope, DecodeError> {
    let stripped = scan_text.strip_prefix(SCHEME_PREFIX).unwrap_or(scan_text);
    let compressed = base45::decode(stripped)?;
    let cose = deflate::decompress(&compressed)?;
    Ok(Envelope::parse(&cose)?)
}

/// What one full verification produced besides the certificate itself.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationOutcome {
    pub signature_valid: bool,
    /// Whether a certificate path to a trusted root was validated. False
    /// when the matching trusted key is a bare public key, which carries
    /// no chain.
    pub chain_validated: bool,
    /// How the signer key was resolved; an exhaustive fallback here
    /// means the issuer did not propagate a usable key identifier.
    pub key_resolution: KeyResolution,
    pub rule_results: Vec<RuleEvaluationResult>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedCredential {
    pub token: WebToken,
    pub outcome: VerificationOutcome,
}

/// Everything one verification call needs, snapshotted up front.
///
/// Refreshes swap the underlying snapshots; a context keeps using the
/// ones it was built with, so a batch of validations sees a consistent
/// trust and rule state throughout.
#[derive(Clone)]
pub struct VerificationContext {
    pub trust: Arc<TrustStore>,
    pub rules: Arc<RuleRepository>,
    pub value_sets: ValueSets,
    /// The verifying/acceptance country.
    pub acceptance_country: String,
    pub acceptance_region: Option<String>,
    /// The validation clock. Injected rather than read from the system
    /// so verification stays pure and testable.
    pub clock: OffsetDateTime,
}

impl VerificationContext {
    /// Snapshot the current trust and rule state from their managers.
    pub fn snapshot(
        dsc: &DscListManager,
        rules: &RuleSet,
        value_sets: ValueSets,
        acceptance_country: impl Into<String>,
        acceptance_region: Option<String>,
        clock: OffsetDateTime,
    ) -> Self {
        Self {
            trust: dsc.current(),
            rules: rules.current(),
            value_sets,
            acceptance_country: acceptance_country.into(),
            acceptance_region,
            clock,
        }
    }

    /// Run the full decode-and-validate chain on a scanned payload.
    pub fn verify(&self, scan_text: &str) -> Result<VerifiedCredential, VerificationError> {
        let envelope = decode_envelope(scan_text)?;

        // Trust before interpretation: the payload is only decoded after
        // a trusted key validated its signature.
        let signer = self.trust.verify_envelope(&envelope)?;
        let key_resolution = signer.resolution;

        let chain_validated = match signer.key.certificate_der() {
            Some(der) => {
                self.trust.validate_chain(der, self.clock)?;
                true
            }
            None => false,
        };

        let token = WebToken::decode(&envelope.payload, self.clock).map_err(DecodeError::from)?;

        let certificate_type = match &token.certificate.data {
            CertificateData::Vaccination(_) => CertificateType::Vaccination,
            CertificateData::Test(_) => CertificateType::Test,
            CertificateData::Recovery(_) => CertificateType::Recovery,
        };

        // The CWT issuer names the issuance country; entry-level country
        // codes are the fallback for issuers that leave it blank.
        let issuance_country = if token.issuer.trim().is_empty() {
            token.certificate.data.issuing_country()
        } else {
            Some(token.issuer.as_str())
        };

        let selected = self.rules.select_for_validation(
            &self.acceptance_country,
            issuance_country,
            self.acceptance_region.as_deref(),
            self.clock,
            certificate_type,
        );

        let external = ExternalParameters {
            validation_clock: self.clock,
            value_sets: self.value_sets.clone(),
            country_code: self.acceptance_country.clone(),
            issuer_country_code: issuance_country.map(str::to_string),
            expires_at: Some(token.expires_at),
            issued_at: token.issued_at,
        };

        let certificate_view = serde_json::to_value(&token.certificate)
            .map_err(|e| VerificationError::CertificateView(e.to_string()))?;

        let rule_results = evaluate_rules(selected, &certificate_view, &external);
        check_verdict(&rule_results)?;

        Ok(VerifiedCredential {
            token,
            outcome: VerificationOutcome {
                signature_valid: true,
                chain_validated,
                key_resolution,
                rule_results,
            },
        })
    }
}

/// Check both long-lived snapshots against a freshness threshold.
///
/// Non-fatal by design: staleness is a warning the caller may act on,
/// not a reason to refuse validation.
pub fn check_freshness(
    dsc: &DscListManager,
    rules: &RuleSet,
    now: OffsetDateTime,
    max_age: Duration,
) -> Result<(), StaleTrustDataError> {
    dsc.staleness(now, max_age)?;
    match rules.last_update() {
        None => Err(StaleTrustDataError::NeverRefreshed),
        Some(at) => {
            let age = now - at;
            if age > max_age {
                Err(StaleTrustDataError::Stale { age, max_age })
            } else {
                Ok(())
            }
        }
    }
}
