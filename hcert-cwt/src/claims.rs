// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::BTreeMap;

use hcert_common::cbor::{self, CborKey, CborValue};
use time::OffsetDateTime;

use crate::certificate::HealthCertificate;

/// CWT claim key: issuer country.
pub const CLAIM_ISSUER: i64 = 1;
/// CWT claim key: expiration time (mandatory).
pub const CLAIM_EXPIRY: i64 = 4;
/// CWT claim key: issued-at time (optional).
pub const CLAIM_ISSUED_AT: i64 = 6;
/// Private claim key holding the health-certificate container.
pub const CLAIM_CERTIFICATE: i64 = -260;

/// Container key selecting the certificate schema inside claim -260.
const CERTIFICATE_CONTAINER_KEY: i64 = 1;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClaimDecodeError {
    #[error("claim set is not a CBOR map: {0}")]
    NotAMap(String),

    #[error("missing issuer claim (1)")]
    MissingIssuer,

    #[error("issuer claim is not a text string")]
    BadIssuer,

    #[error("missing expiration claim (4)")]
    MissingExpiry,

    #[error("claim {claim} is not a valid timestamp")]
    BadTimestamp { claim: i64 },

    #[error("missing certificate claim (-260)")]
    MissingCertificate,

    #[error("certificate claim has the wrong shape: {0}")]
    WrongCertificateShape(String),

    #[error("certificate field error: {0}")]
    Certificate(String),
}

/// The credential expired before validation began.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("credential expired at {expired_at} (checked at {checked_at})")]
pub struct ExpiredCredentialError {
    pub expired_at: OffsetDateTime,
    pub checked_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WebTokenError {
    #[error(transparent)]
    Claims(#[from] ClaimDecodeError),

    #[error(transparent)]
    Expired(#[from] ExpiredCredentialError),
}

/// Decoded CWT claims plus the certificate they carry.
#[derive(Debug, Clone, PartialEq)]
pub struct WebToken {
    pub issuer: String,
    pub issued_at: Option<OffsetDateTime>,
    pub expires_at: OffsetDateTime,
    pub certificate: HealthCertificate,
}

impl WebToken {
    /// Decode the claims from verified envelope payload bytes.
    ///
    /// The expiration claim is checked against `now` immediately: an
    /// expired token fails here, before the certificate structure is
    /// interpreted and before any business rule runs.
    pub fn decode(payload: &[u8], now: OffsetDateTime) -> Result<Self, WebTokenError> {
        let claims = cbor::decode_map(payload)
            .map_err(|e| ClaimDecodeError::NotAMap(e.to_string()))?;

        let issuer = match claims.get(&CborKey::Int(CLAIM_ISSUER)) {
            Some(CborValue::Text(s)) => s.clone(),
            Some(_) => return Err(ClaimDecodeError::BadIssuer.into()),
            None => return Err(ClaimDecodeError::MissingIssuer.into()),
        };

        let expires_at = match claims.get(&CborKey::Int(CLAIM_EXPIRY)) {
            Some(v) => timestamp(v, CLAIM_EXPIRY)?,
            None => return Err(ClaimDecodeError::MissingExpiry.into()),
        };

        let issued_at = match claims.get(&CborKey::Int(CLAIM_ISSUED_AT)) {
            Some(v) => Some(timestamp(v, CLAIM_ISSUED_AT)?),
            None => None,
        };

        if expires_at <= now {
            return Err(ExpiredCredentialError {
                expired_at: expires_at,
                checked_at: now,
            }
            .into());
        }

        let certificate = extract_certificate(&claims)?;

        Ok(Self {
            issuer,
            issued_at,
            expires_at,
            certificate,
        })
    }
}

fn timestamp(value: &CborValue, claim: i64) -> Result<OffsetDateTime, ClaimDecodeError> {
    let seconds = value
        .as_int()
        .ok_or(ClaimDecodeError::BadTimestamp { claim })?;
    OffsetDateTime::from_unix_timestamp(seconds)
        .map_err(|_| ClaimDecodeError::BadTimestamp { claim })
}

/// Claim -260 is a one-entry container map; entry 1 holds the
/// certificate map itself.
fn extract_certificate(
    claims: &BTreeMap<CborKey, CborValue>,
) -> Result<HealthCertificate, ClaimDecodeError> {
    let container = match claims.get(&CborKey::Int(CLAIM_CERTIFICATE)) {
        Some(CborValue::Map(m)) => m,
        Some(_) => {
            return Err(ClaimDecodeError::WrongCertificateShape(
                "claim -260 is not a map".to_string(),
            ))
        }
        None => return Err(ClaimDecodeError::MissingCertificate),
    };

    let entry = match container.get(&CborKey::Int(CERTIFICATE_CONTAINER_KEY)) {
        Some(CborValue::Map(m)) => m,
        Some(_) => {
            return Err(ClaimDecodeError::WrongCertificateShape(
                "container entry 1 is not a map".to_string(),
            ))
        }
        None => {
            return Err(ClaimDecodeError::WrongCertificateShape(
                "container entry 1 is missing".to_string(),
            ))
        }
    };

    HealthCertificate::from_cbor_map(entry).map_err(ClaimDecodeError::Certificate)
}
