// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Signature verification for COSE_Sign1 health-certificate envelopes.
//!
//! The supported algorithm set is the ECDSA family the issuing
//! infrastructure actually uses: ES256, ES384, ES512. COSE carries ECDSA
//! signatures as the fixed-width `r || s` concatenation, which the curve
//! signature types consume directly.

mod algorithms;
mod verifier;

pub use algorithms::CoseAlgorithm;
pub use verifier::{verify_envelope, verify_signature, SignatureValidationError};
