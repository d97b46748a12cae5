// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Transport-level building blocks for health-certificate payloads:
//! Base45 transcoding, the zlib compression adapter, CBOR value decoding,
//! and COSE_Sign1 envelope parsing.

pub mod base45;
pub mod cbor;
pub mod cose;
pub mod deflate;

pub use base45::Base45DecodeError;
pub use cbor::{CborKey, CborValue};
pub use cose::{Envelope, EnvelopeFormatError, HeaderMap};
pub use deflate::CompressionError;
