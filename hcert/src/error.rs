// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use hcert_common::{Base45DecodeError, CompressionError, EnvelopeFormatError};
use hcert_cwt::{ClaimDecodeError, ExpiredCredentialError, WebTokenError};
use hcert_rules::RuleViolationError;
use hcert_trust::{PathValidationError, TrustError};
use hcert_validation::SignatureValidationError;

/// A scanned payload could not be decoded into a certificate.
///
/// Format variants mean malformed input; `Expired` is a semantic
/// validity failure, surfaced distinctly so callers can show a
/// different message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error(transparent)]
    Base45(#[from] Base45DecodeError),

    #[error(transparent)]
    Compression(#[from] CompressionError),

    #[error(transparent)]
    Envelope(#[from] EnvelopeFormatError),

    #[error(transparent)]
    Claims(ClaimDecodeError),

    #[error(transparent)]
    Expired(ExpiredCredentialError),
}

impl From<WebTokenError> for DecodeError {
    fn from(e: WebTokenError) -> Self {
        match e {
            WebTokenError::Claims(e) => Self::Claims(e),
            WebTokenError::Expired(e) => Self::Expired(e),
        }
    }
}

/// A certificate failed verification.
///
/// Decode failures mean malformed or expired input; signature, trust
/// and path failures imply tampering or missing trust data; a rule
/// violation means a well-formed, authentic certificate that the
/// acceptance country's rules reject.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerificationError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Signature(SignatureValidationError),

    #[error("no trusted key validates the signature ({keys_tried} tried)")]
    NoTrustedKeyMatches { keys_tried: usize },

    #[error(transparent)]
    Path(#[from] PathValidationError),

    #[error(transparent)]
    Rules(#[from] RuleViolationError),

    #[error("certificate could not be rendered for rule evaluation: {0}")]
    CertificateView(String),
}

impl From<TrustError> for VerificationError {
    fn from(e: TrustError) -> Self {
        match e {
            TrustError::NoTrustedKeyMatches { keys_tried } => {
                Self::NoTrustedKeyMatches { keys_tried }
            }
            TrustError::Signature(e) => Self::Signature(e),
        }
    }
}

impl From<WebTokenError> for VerificationError {
    fn from(e: WebTokenError) -> Self {
        Self::Decode(e.into())
    }
}
