// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! COSE_Sign1 envelope parsing and Sig_structure encoding.
//!
//! The envelope is a CBOR array of exactly four elements: protected
//! header bytes, unprotected header map, payload bytes, signature bytes.
//! Anything else is rejected before any semantic interpretation.

use std::collections::BTreeMap;

use minicbor::data::{Tag, Type};
use minicbor::{Decoder, Encoder};

use crate::cbor::{self, CborError, CborKey, CborValue};

pub const COSE_SIGN1_TAG: u64 = 18;
const SIG_STRUCTURE_CONTEXT: &str = "Signature1";

/// COSE header label for the signature algorithm.
pub const HEADER_ALG: i64 = 1;
/// COSE header label for the key identifier.
pub const HEADER_KID: i64 = 4;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnvelopeFormatError {
    #[error("empty input")]
    Empty,

    #[error("unexpected CBOR tag {0} (expected COSE_Sign1 tag 18 or no tag)")]
    UnexpectedTag(u64),

    #[error("COSE_Sign1 must be a definite-length array of 4 elements")]
    NotSign1,

    #[error("protected header is not a byte string")]
    BadProtectedHeader,

    #[error("unprotected header is not a map")]
    BadUnprotectedHeader,

    #[error("payload is not an embedded byte string")]
    BadPayload,

    #[error("signature is not a byte string")]
    BadSignature,

    #[error("trailing bytes after COSE_Sign1")]
    TrailingBytes,

    #[error("malformed header map: {0}")]
    Header(#[from] CborError),
}

/// A decoded COSE header map plus its original encoding.
///
/// The protected header bytes are preserved verbatim because the
/// Sig_structure signs the encoded form, not the decoded map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderMap {
    encoded: Vec<u8>,
    map: BTreeMap<CborKey, CborValue>,
}

impl HeaderMap {
    pub fn encoded(&self) -> &[u8] {
        &self.encoded
    }

    pub fn get(&self, label: i64) -> Option<&CborValue> {
        self.map.get(&CborKey::Int(label))
    }

    pub fn get_i64(&self, label: i64) -> Option<i64> {
        self.get(label).and_then(CborValue::as_int)
    }

    pub fn get_bytes(&self, label: i64) -> Option<&[u8]> {
        self.get(label).and_then(CborValue::as_bytes)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub protected: HeaderMap,
    pub unprotected: HeaderMap,
    pub payload: Vec<u8>,
    pub signature: Vec<u8>,
}

impl Envelope {
    /// Parse a COSE_Sign1 envelope, accepting an optional leading tag 18.
    pub fn parse(input: &[u8]) -> Result<Self, EnvelopeFormatError> {
        if input.is_empty() {
            return Err(EnvelopeFormatError::Empty);
        }

        let mut dec = Decoder::new(input);

        if matches!(
            dec.datatype().map_err(|_| EnvelopeFormatError::NotSign1)?,
            Type::Tag
        ) {
            let tag = dec.tag().map_err(|_| EnvelopeFormatError::NotSign1)?;
            if tag != Tag::new(COSE_SIGN1_TAG) {
                return Err(EnvelopeFormatError::UnexpectedTag(tag.as_u64()));
            }
        }

        let len = dec
            .array()
            .map_err(|_| EnvelopeFormatError::NotSign1)?
            .ok_or(EnvelopeFormatError::NotSign1)?;
        if len != 4 {
            return Err(EnvelopeFormatError::NotSign1);
        }

        let protected_bytes = dec
            .bytes()
            .map_err(|_| EnvelopeFormatError::BadProtectedHeader)?
            .to_vec();
        let protected_map = if protected_bytes.is_empty() {
            BTreeMap::new()
        } else {
            cbor::decode_map(&protected_bytes)?
        };

        if !matches!(
            dec.datatype()
                .map_err(|_| EnvelopeFormatError::BadUnprotectedHeader)?,
            Type::Map
        ) {
            return Err(EnvelopeFormatError::BadUnprotectedHeader);
        }
        let unprotected_map = cbor::decode_map_from_decoder(&mut dec)?;

        let payload = match dec.datatype().map_err(|_| EnvelopeFormatError::BadPayload)? {
            Type::Bytes => dec
                .bytes()
                .map_err(|_| EnvelopeFormatError::BadPayload)?
                .to_vec(),
            // Detached payloads never occur in this transport.
            _ => return Err(EnvelopeFormatError::BadPayload),
        };

        let signature = dec
            .bytes()
            .map_err(|_| EnvelopeFormatError::BadSignature)?
            .to_vec();

        if dec.position() != input.len() {
            return Err(EnvelopeFormatError::TrailingBytes);
        }

        Ok(Self {
            protected: HeaderMap {
                encoded: protected_bytes,
                map: protected_map,
            },
            unprotected: HeaderMap {
                encoded: Vec::new(),
                map: unprotected_map,
            },
            payload,
            signature,
        })
    }

    /// The signature algorithm label, protected header first.
    pub fn algorithm(&self) -> Option<i64> {
        self.protected
            .get_i64(HEADER_ALG)
            .or_else(|| self.unprotected.get_i64(HEADER_ALG))
    }

    /// The key identifier, protected header first.
    ///
    /// Some issuers put the kid in the unprotected header, so both maps
    /// are consulted. The kid is a lookup hint only; it is never trusted.
    pub fn key_id(&self) -> Option<&[u8]> {
        self.protected
            .get_bytes(HEADER_KID)
            .or_else(|| self.unprotected.get_bytes(HEADER_KID))
    }

    /// Encode the Sig_structure that the signature covers.
    ///
    /// `Sig_structure = ["Signature1", protected bstr, external_aad bstr, payload bstr]`
    pub fn sig_structure(&self) -> Result<Vec<u8>, EnvelopeFormatError> {
        let mut out =
            Vec::with_capacity(32 + self.protected.encoded().len() + self.payload.len());
        let mut enc = Encoder::new(&mut out);
        enc.array(4)
            .and_then(|e| e.str(SIG_STRUCTURE_CONTEXT))
            .and_then(|e| e.bytes(self.protected.encoded()))
            .and_then(|e| e.bytes(&[]))
            .and_then(|e| e.bytes(&self.payload))
            .map_err(|e| EnvelopeFormatError::Header(CborError::Malformed(e.to_string())))?;
        Ok(out)
    }
}
