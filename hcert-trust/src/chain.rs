// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Certificate path validation.
//!
//! The path is built by resolving each certificate's issuer via
//! subject-DN lookup among the trusted certificates, verifying every
//! hop's signature and validity window, until a self-signed root
//! terminates the walk.

use signature::Verifier as _;
use time::OffsetDateTime;

use p256::elliptic_curve::sec1::ToEncodedPoint as _;
use p256::pkcs8::DecodePublicKey as _;

use crate::store::TrustStore;

const MAX_PATH_DEPTH: usize = 16;

/// One certificate in a validated path, leaf first, root last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainLink {
    pub subject: String,
    pub issuer: String,
    pub certificate_der: Vec<u8>,
    pub is_root: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathValidationError {
    #[error("undecodable certificate in path: {0}")]
    Malformed(String),

    #[error("certificate {subject:?} is outside its validity window")]
    CertificateExpired { subject: String },

    #[error("no path to a trusted self-signed root (walked {depth} hops)")]
    InvalidPath { depth: usize },
}

struct PathCert {
    der: Vec<u8>,
    subject: String,
    issuer: String,
    spki_der: Vec<u8>,
    tbs_der: Vec<u8>,
    signature_oid: String,
    signature: Vec<u8>,
    not_before: OffsetDateTime,
    not_after: OffsetDateTime,
}

fn parse_path_cert(der: &[u8]) -> Result<PathCert, PathValidationError> {
    let (_, cert) = x509_parser::parse_x509_certificate(der)
        .map_err(|e| PathValidationError::Malformed(e.to_string()))?;

    Ok(PathCert {
        der: der.to_vec(),
        subject: cert.subject().to_string(),
        issuer: cert.issuer().to_string(),
        spki_der: cert.tbs_certificate.subject_pki.raw.to_vec(),
        tbs_der: cert.tbs_certificate.as_ref().to_vec(),
        signature_oid: cert.signature_algorithm.algorithm.to_string(),
        signature: cert.signature_value.data.to_vec(),
        not_before: cert.validity().not_before.to_datetime(),
        not_after: cert.validity().not_after.to_datetime(),
    })
}

impl PathCert {
    fn check_window(&self, clock: OffsetDateTime) -> Result<(), PathValidationError> {
        if self.not_before <= clock && clock <= self.not_after {
            Ok(())
        } else {
            Err(PathValidationError::CertificateExpired {
                subject: self.subject.clone(),
            })
        }
    }

    fn link(&self, is_root: bool) -> ChainLink {
        ChainLink {
            subject: self.subject.clone(),
            issuer: self.issuer.clone(),
            certificate_der: self.der.clone(),
            is_root,
        }
    }
}

impl TrustStore {
    /// Walk from `leaf_der` to a self-signed root among the trusted
    /// certificates, verifying each hop. Returns the ordered path,
    /// leaf first, root last.
    pub fn validate_chain(
        &self,
        leaf_der: &[u8],
        clock: OffsetDateTime,
    ) -> Result<Vec<ChainLink>, PathValidationError> {
        let mut current = parse_path_cert(leaf_der)?;
        current.check_window(clock)?;

        let mut path = Vec::new();
        let mut depth = 0usize;

        loop {
            if current.subject == current.issuer {
                // Self-signed: the root must verify its own signature.
                verify_cert_signature(&current.spki_der, &current)
                    .map_err(|_| PathValidationError::InvalidPath { depth })?;
                path.push(current.link(true));
                return Ok(path);
            }

            depth += 1;
            if depth > MAX_PATH_DEPTH {
                return Err(PathValidationError::InvalidPath { depth });
            }

            let mut parent: Option<PathCert> = None;
            for candidate in self.certificates_by_subject(&current.issuer) {
                let Some(der) = candidate.certificate_der() else {
                    continue;
                };
                let Ok(cand) = parse_path_cert(der) else {
                    continue;
                };
                if verify_cert_signature(&cand.spki_der, &current).is_ok() {
                    parent = Some(cand);
                    break;
                }
            }

            let Some(parent) = parent else {
                return Err(PathValidationError::InvalidPath { depth });
            };
            parent.check_window(clock)?;

            path.push(current.link(false));
            current = parent;
        }
    }
}

/// Verify `cert`'s DER signature with the issuer's SPKI, dispatching on
/// the signature algorithm OID. X.509 ECDSA signatures are ASN.1 DER,
/// unlike the fixed-width form COSE uses.
fn verify_cert_signature(issuer_spki_der: &[u8], cert: &PathCert) -> Result<(), String> {
    match cert.signature_oid.as_str() {
        // ecdsa-with-SHA256
        "1.2.840.10045.4.3.2" => {
            let pk = p256::PublicKey::from_public_key_der(issuer_spki_der)
                .map_err(|e| format!("bad P-256 issuer public key: {e}"))?;
            let ep = pk.to_encoded_point(false);
            let vk = p256::ecdsa::VerifyingKey::from_sec1_bytes(ep.as_bytes())
                .map_err(|e| format!("bad P-256 issuer public key: {e}"))?;
            let sig = p256::ecdsa::Signature::from_der(&cert.signature)
                .map_err(|e| format!("bad ECDSA signature bytes: {e}"))?;
            vk.verify(&cert.tbs_der, &sig)
                .map_err(|_| "certificate signature verification failed".to_string())
        }
        // ecdsa-with-SHA384
        "1.2.840.10045.4.3.3" => {
            let pk = p384::PublicKey::from_public_key_der(issuer_spki_der)
                .map_err(|e| format!("bad P-384 issuer public key: {e}"))?;
            let ep = pk.to_encoded_point(false);
            let vk = p384::ecdsa::VerifyingKey::from_sec1_bytes(ep.as_bytes())
                .map_err(|e| format!("bad P-384 issuer public key: {e}"))?;
            let sig = p384::ecdsa::Signature::from_der(&cert.signature)
                .map_err(|e| format!("bad ECDSA signature bytes: {e}"))?;
            vk.verify(&cert.tbs_der, &sig)
                .map_err(|_| "certificate signature verification failed".to_string())
        }
        // ecdsa-with-SHA512
        "1.2.840.10045.4.3.4" => {
            let pk = p521::PublicKey::from_public_key_der(issuer_spki_der)
                .map_err(|e| format!("bad P-521 issuer public key: {e}"))?;
            let ep = pk.to_encoded_point(false);
            let vk = p521::ecdsa::VerifyingKey::from_sec1_bytes(ep.as_bytes())
                .map_err(|e| format!("bad P-521 issuer public key: {e}"))?;
            let sig = p521::ecdsa::Signature::from_der(&cert.signature)
                .map_err(|e| format!("bad ECDSA signature bytes: {e}"))?;
            vk.verify(&cert.tbs_der, &sig)
                .map_err(|_| "certificate signature verification failed".to_string())
        }

        other => Err(format!("unsupported certificate signature algorithm OID: {other}")),
    }
}
