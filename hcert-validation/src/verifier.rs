// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use hcert_common::Envelope;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::pkcs8::DecodePublicKey as _;
use signature::Verifier;

use crate::algorithms::CoseAlgorithm;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureValidationError {
    #[error("missing alg header")]
    MissingAlgorithm,

    #[error("unsupported alg: {0}")]
    UnsupportedAlgorithm(i64),

    #[error("bad public key: {0}")]
    BadPublicKey(String),

    #[error("bad signature encoding for {algorithm:?}")]
    BadSignatureEncoding { algorithm: CoseAlgorithm },

    #[error("signature verification failed")]
    Mismatch,

    #[error("malformed envelope: {0}")]
    Envelope(String),
}

/// Verify an envelope's signature against one candidate public key.
///
/// `key_der` may be a DER SubjectPublicKeyInfo or a DER X.509 certificate
/// (the SPKI is extracted). The algorithm comes from the envelope's `alg`
/// header; a payload whose signature fails is never partially trusted.
pub fn verify_envelope(
    envelope: &Envelope,
    key_der: &[u8],
) -> Result<(), SignatureValidationError> {
    let label = envelope
        .algorithm()
        .ok_or(SignatureValidationError::MissingAlgorithm)?;
    let alg = CoseAlgorithm::from_label(label)
        .ok_or(SignatureValidationError::UnsupportedAlgorithm(label))?;

    let sig_structure = envelope
        .sig_structure()
        .map_err(|e| SignatureValidationError::Envelope(e.to_string()))?;

    verify_signature(alg, key_der, &sig_structure, &envelope.signature)
}

/// Verify a raw COSE signature (`r || s`) over `message` for `alg`.
pub fn verify_signature(
    alg: CoseAlgorithm,
    key_der: &[u8],
    message: &[u8],
    cose_signature: &[u8],
) -> Result<(), SignatureValidationError> {
    let spki = extract_spki_der(key_der);
    match alg {
        CoseAlgorithm::ES256 => verify_p256(&spki, message, cose_signature),
        CoseAlgorithm::ES384 => verify_p384(&spki, message, cose_signature),
        CoseAlgorithm::ES512 => verify_p521(&spki, message, cose_signature),
    }
}

/// Normalize key input: a DER certificate yields its SPKI, anything else
/// is assumed to already be SPKI DER.
fn extract_spki_der(der: &[u8]) -> Vec<u8> {
    if let Ok((_, cert)) = x509_parser::parse_x509_certificate(der) {
        return cert.tbs_certificate.subject_pki.raw.to_vec();
    }
    der.to_vec()
}

fn verify_p256(
    spki: &[u8],
    message: &[u8],
    sig: &[u8],
) -> Result<(), SignatureValidationError> {
    let pk = p256::PublicKey::from_public_key_der(spki)
        .map_err(|e| SignatureValidationError::BadPublicKey(format!("P-256: {e}")))?;
    let ep = pk.to_encoded_point(false);
    let vk = p256::ecdsa::VerifyingKey::from_sec1_bytes(ep.as_bytes())
        .map_err(|e| SignatureValidationError::BadPublicKey(format!("P-256: {e}")))?;
    let signature = p256::ecdsa::Signature::from_slice(sig).map_err(|_| {
        SignatureValidationError::BadSignatureEncoding {
            algorithm: CoseAlgorithm::ES256,
        }
    })?;
    vk.verify(message, &signature)
        .map_err(|_| SignatureValidationError::Mismatch)
}

fn verify_p384(
    spki: &[u8],
    message: &[u8],
    sig: &[u8],
) -> Result<(), SignatureValidationError> {
    let pk = p384::PublicKey::from_public_key_der(spki)
        .map_err(|e| SignatureValidationError::BadPublicKey(format!("P-384: {e}")))?;
    let ep = pk.to_encoded_point(false);
    let vk = p384::ecdsa::VerifyingKey::from_sec1_bytes(ep.as_bytes())
        .map_err(|e| SignatureValidationError::BadPublicKey(format!("P-384: {e}")))?;
    let signature = p384::ecdsa::Signature::from_slice(sig).map_err(|_| {
        SignatureValidationError::BadSignatureEncoding {
            algorithm: CoseAlgorithm::ES384,
        }
    })?;
    vk.verify(message, &signature)
        .map_err(|_| SignatureValidationError::Mismatch)
}

fn verify_p521(
    spki: &[u8],
    message: &[u8],
    sig: &[u8],
) -> Result<(), SignatureValidationError> {
    let pk = p521::PublicKey::from_public_key_der(spki)
        .map_err(|e| SignatureValidationError::BadPublicKey(format!("P-521: {e}")))?;
    let ep = pk.to_encoded_point(false);
    let vk = p521::ecdsa::VerifyingKey::from_sec1_bytes(ep.as_bytes())
        .map_err(|e| SignatureValidationError::BadPublicKey(format!("P-521: {e}")))?;
    let signature = p521::ecdsa::Signature::from_slice(sig).map_err(|_| {
        SignatureValidationError::BadSignatureEncoding {
            algorithm: CoseAlgorithm::ES512,
        }
    })?;
    vk.verify(message, &signature)
        .map_err(|_| SignatureValidationError::Mismatch)
}
