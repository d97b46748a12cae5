// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! CBOR Web Token decoding and the health-certificate data model.
//!
//! The verified envelope payload is a CWT whose claims carry the issuer,
//! the validity window, and (under a private negative claim key) the
//! certificate structure itself.

mod certificate;
mod claims;

pub use certificate::{
    BirthDate, CertificateData, HealthCertificate, Person, RecoveryEntry, TestEntry,
    VaccinationEntry,
};
pub use claims::{
    ClaimDecodeError, ExpiredCredentialError, WebToken, WebTokenError, CLAIM_CERTIFICATE,
    CLAIM_EXPIRY, CLAIM_ISSUED_AT, CLAIM_ISSUER,
};
