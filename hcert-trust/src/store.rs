// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use hcert_common::Envelope;
use hcert_validation::{verify_envelope, CoseAlgorithm, SignatureValidationError};
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyMaterial {
    /// DER X.509 certificate. Enables path validation.
    Certificate(Vec<u8>),
    /// Bare DER SubjectPublicKeyInfo. Trusted directly, no path.
    PublicKey(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrustStoreError {
    #[error("invalid trusted certificate for kid {}: {}", hex::encode(.key_id), .message)]
    BadCertificate { key_id: Vec<u8>, message: String },
}

/// One trusted signer key, owned collectively by the [`TrustStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustedKey {
    pub country: String,
    pub key_id: Vec<u8>,
    material: KeyMaterial,
    spki_der: Vec<u8>,
    subject: Option<String>,
    issuer: Option<String>,
    not_before: Option<OffsetDateTime>,
    not_after: Option<OffsetDateTime>,
    is_ca: bool,
}

impl TrustedKey {
    /// Build a trusted key from a DER certificate, extracting the
    /// metadata path validation needs.
    pub fn from_certificate_der(
        country: impl Into<String>,
        key_id: Vec<u8>,
        der: Vec<u8>,
    ) -> Result<Self, TrustStoreError> {
        let (_, cert) =
            x509_parser::parse_x509_certificate(&der).map_err(|e| TrustStoreError::BadCertificate {
                key_id: key_id.clone(),
                message: e.to_string(),
            })?;

        let is_ca = cert
            .tbs_certificate
            .basic_constraints()
            .ok()
            .flatten()
            .map(|ext| ext.value.ca)
            .unwrap_or(false);

        let spki_der = cert.tbs_certificate.subject_pki.raw.to_vec();
        let subject = Some(cert.subject().to_string());
        let issuer = Some(cert.issuer().to_string());
        let not_before = Some(cert.validity().not_before.to_datetime());
        let not_after = Some(cert.validity().not_after.to_datetime());
        drop(cert);

        Ok(Self {
            country: country.into(),
            key_id,
            material: KeyMaterial::Certificate(der),
            spki_der,
            subject,
            issuer,
            not_before,
            not_after,
            is_ca,
        })
    }

    /// Build a trusted key from a bare DER SubjectPublicKeyInfo.
    pub fn from_public_key_der(
        country: impl Into<String>,
        key_id: Vec<u8>,
        spki_der: Vec<u8>,
    ) -> Self {
        Self {
            country: country.into(),
            key_id,
            material: KeyMaterial::PublicKey(spki_der.clone()),
            spki_der,
            subject: None,
            issuer: None,
            not_before: None,
            not_after: None,
            is_ca: false,
        }
    }

    pub fn material(&self) -> &KeyMaterial {
        &self.material
    }

    pub fn certificate_der(&self) -> Option<&[u8]> {
        match &self.material {
            KeyMaterial::Certificate(der) => Some(der),
            KeyMaterial::PublicKey(_) => None,
        }
    }

    pub fn spki_der(&self) -> &[u8] {
        &self.spki_der
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    pub fn issuer(&self) -> Option<&str> {
        self.issuer.as_deref()
    }

    /// CA/intermediate certificates never sign credentials directly, so
    /// the exhaustive fallback skips them.
    pub fn is_ca(&self) -> bool {
        self.is_ca
    }

    /// Whether the backing certificate's validity window contains `clock`.
    /// Bare public keys carry no window and are always considered valid.
    pub fn valid_at(&self, clock: OffsetDateTime) -> bool {
        match (self.not_before, self.not_after) {
            (Some(nb), Some(na)) => nb <= clock && clock <= na,
            _ => true,
        }
    }
}

/// How the signer key was found. Surfaced to callers so stale or
/// ambiguous issuer metadata is observable without log scraping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyResolution {
    /// The envelope kid matched one or more stored keys.
    KeyIdMatch { matches: usize },
    /// No usable kid; every non-CA key was tried. Workaround for issuers
    /// that do not propagate key identifiers.
    ExhaustiveFallback { keys_tried: usize },
}

/// The key that produced a verified signature, plus how it was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerMatch<'a> {
    pub key: &'a TrustedKey,
    pub resolution: KeyResolution,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrustError {
    #[error("no trusted key validates the signature ({keys_tried} tried)")]
    NoTrustedKeyMatches { keys_tried: usize },

    #[error(transparent)]
    Signature(SignatureValidationError),
}

/// Immutable snapshot of the trusted signer key set.
///
/// Long-lived and shared read-only between validations; refresh builds a
/// whole new store and swaps the reference (see `DscListManager`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrustStore {
    keys: Vec<TrustedKey>,
}

impl TrustStore {
    pub fn new(keys: Vec<TrustedKey>) -> Self {
        Self { keys }
    }

    pub fn keys(&self) -> &[TrustedKey] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Candidate keys for a signature, in trial order.
    ///
    /// Exact key-identifier matches come first. When the hint is absent
    /// or matches nothing, every key not flagged CA is returned and the
    /// resolution records the fallback.
    pub fn candidate_keys(
        &self,
        kid_hint: Option<&[u8]>,
    ) -> (Vec<&TrustedKey>, KeyResolution) {
        if let Some(kid) = kid_hint {
            let matches: Vec<&TrustedKey> = self
                .keys
                .iter()
                .filter(|k| k.key_id == kid)
                .collect();
            if !matches.is_empty() {
                let resolution = KeyResolution::KeyIdMatch {
                    matches: matches.len(),
                };
                return (matches, resolution);
            }
        }

        let fallback: Vec<&TrustedKey> = self.keys.iter().filter(|k| !k.is_ca()).collect();
        let resolution = KeyResolution::ExhaustiveFallback {
            keys_tried: fallback.len(),
        };
        (fallback, resolution)
    }

    /// Try every candidate key until one validates the envelope signature.
    pub fn verify_envelope<'a>(
        &'a self,
        envelope: &Envelope,
    ) -> Result<SignerMatch<'a>, TrustError> {
        // An unusable alg header fails the same way for every key; reject
        // it once instead of reporting a misleading no-key-matches.
        match envelope.algorithm() {
            None => {
                return Err(TrustError::Signature(
                    SignatureValidationError::MissingAlgorithm,
                ))
            }
            Some(label) if CoseAlgorithm::from_label(label).is_none() => {
                return Err(TrustError::Signature(
                    SignatureValidationError::UnsupportedAlgorithm(label),
                ))
            }
            Some(_) => {}
        }

        let (candidates, resolution) = self.candidate_keys(envelope.key_id());
        let keys_tried = candidates.len();

        for key in candidates {
            if verify_envelope(envelope, key.spki_der()).is_ok() {
                return Ok(SignerMatch { key, resolution });
            }
        }

        Err(TrustError::NoTrustedKeyMatches { keys_tried })
    }

    pub(crate) fn certificates_by_subject<'a>(
        &'a self,
        subject: &'a str,
    ) -> impl Iterator<Item = &'a TrustedKey> + 'a {
        self.keys
            .iter()
            .filter(move |k| k.certificate_der().is_some() && k.subject() == Some(subject))
    }
}
