// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

/// COSE algorithm identifiers accepted for envelope signatures.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(i64)]
pub enum CoseAlgorithm {
    /// ECDSA w/ SHA-256 over P-256.
    ES256 = -7,
    /// ECDSA w/ SHA-384 over P-384.
    ES384 = -35,
    /// ECDSA w/ SHA-512 over P-521.
    ES512 = -36,
}

impl CoseAlgorithm {
    /// Resolve a COSE `alg` header label.
    pub fn from_label(label: i64) -> Option<Self> {
        match label {
            -7 => Some(Self::ES256),
            -35 => Some(Self::ES384),
            -36 => Some(Self::ES512),
            _ => None,
        }
    }

    pub fn label(self) -> i64 {
        self as i64
    }
}
