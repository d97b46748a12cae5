// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Health-certificate verification facade.
//!
//! One call runs the full chain: scheme-prefix strip, Base45 decode,
//! decompression, COSE_Sign1 parsing, signature trial against the trust
//! store, optional certificate path validation, CBOR Web Token decoding
//! with its expiry gate, and business-rule evaluation.
//!
//! The pipeline is synchronous and CPU-bound; batch callers validate
//! many certificates in parallel against shared snapshots.

mod error;
mod pipeline;

pub use error::{DecodeError, VerificationError};
pub use pipeline::{
    check_freshness, decode, DecodedCredential, VerificationContext, VerificationOutcome,
    VerifiedCredential, SCHEME_PREFIX,
};
