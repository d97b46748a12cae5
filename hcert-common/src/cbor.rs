// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Generic CBOR value decoding.
//!
//! COSE headers and CWT claims both decode into the same small value
//! model: integer or text keys, scalar / bytes / array / nested-map
//! values. Only definite-length encodings are accepted.

use std::collections::BTreeMap;

use minicbor::data::Type;
use minicbor::Decoder;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum CborKey {
    Int(i64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CborValue {
    Int(i64),
    Bytes(Vec<u8>),
    Text(String),
    Array(Vec<CborValue>),
    Map(BTreeMap<CborKey, CborValue>),
    Bool(bool),
    Null,
}

impl CborValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[CborValue]> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<CborKey, CborValue>> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CborError {
    #[error("CBOR decode failed: {0}")]
    Malformed(String),

    #[error("indefinite-length items are not supported")]
    IndefiniteLength,

    #[error("unsupported CBOR item type: {0}")]
    UnsupportedType(String),

    #[error("trailing bytes after CBOR item")]
    TrailingBytes,
}

impl CborError {
    fn malformed<E: std::fmt::Display>(e: E) -> Self {
        Self::Malformed(e.to_string())
    }
}

/// Decode a complete CBOR map, rejecting trailing bytes.
pub fn decode_map(bytes: &[u8]) -> Result<BTreeMap<CborKey, CborValue>, CborError> {
    let mut dec = Decoder::new(bytes);
    let map = decode_map_from_decoder(&mut dec)?;
    if dec.position() != bytes.len() {
        return Err(CborError::TrailingBytes);
    }
    Ok(map)
}

pub fn decode_map_from_decoder(
    dec: &mut Decoder<'_>,
) -> Result<BTreeMap<CborKey, CborValue>, CborError> {
    let len = dec
        .map()
        .map_err(CborError::malformed)?
        .ok_or(CborError::IndefiniteLength)?;

    let mut map = BTreeMap::new();
    for _ in 0..len {
        let key = decode_key(dec)?;
        let value = decode_value(dec)?;
        map.insert(key, value);
    }
    Ok(map)
}

pub fn decode_key(dec: &mut Decoder<'_>) -> Result<CborKey, CborError> {
    match dec.datatype().map_err(CborError::malformed)? {
        Type::I8
        | Type::I16
        | Type::I32
        | Type::I64
        | Type::Int
        | Type::U8
        | Type::U16
        | Type::U32
        | Type::U64 => {
            let i = dec.i64().map_err(CborError::malformed)?;
            Ok(CborKey::Int(i))
        }
        Type::String => {
            let s = dec.str().map_err(CborError::malformed)?;
            Ok(CborKey::Text(s.to_string()))
        }
        other => Err(CborError::UnsupportedType(format!("{other:?} as map key"))),
    }
}

pub fn decode_value(dec: &mut Decoder<'_>) -> Result<CborValue, CborError> {
    match dec.datatype().map_err(CborError::malformed)? {
        Type::Null => {
            dec.null().map_err(CborError::malformed)?;
            Ok(CborValue::Null)
        }
        Type::Bool => {
            let b = dec.bool().map_err(CborError::malformed)?;
            Ok(CborValue::Bool(b))
        }
        Type::Bytes => {
            let b = dec.bytes().map_err(CborError::malformed)?;
            Ok(CborValue::Bytes(b.to_vec()))
        }
        Type::String => {
            let s = dec.str().map_err(CborError::malformed)?;
            Ok(CborValue::Text(s.to_string()))
        }
        Type::I8
        | Type::I16
        | Type::I32
        | Type::I64
        | Type::Int
        | Type::U8
        | Type::U16
        | Type::U32
        | Type::U64 => {
            let i = dec.i64().map_err(CborError::malformed)?;
            Ok(CborValue::Int(i))
        }
        Type::Array => {
            let len = dec
                .array()
                .map_err(CborError::malformed)?
                .ok_or(CborError::IndefiniteLength)?;
            let mut out = Vec::with_capacity(len as usize);
            for _ in 0..len {
                out.push(decode_value(dec)?);
            }
            Ok(CborValue::Array(out))
        }
        Type::Map => Ok(CborValue::Map(decode_map_from_decoder(dec)?)),
        other => Err(CborError::UnsupportedType(format!("{other:?}"))),
    }
}
