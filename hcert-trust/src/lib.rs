// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Trust decisions for health-certificate envelopes: the trusted signer
//! key set, candidate-key resolution, certificate path validation, and
//! the periodically refreshed document-signer list.

mod chain;
mod dsc;
mod store;

pub use chain::{ChainLink, PathValidationError};
pub use dsc::{DscEntry, DscListManager, StaleTrustDataError};
pub use store::{
    KeyMaterial, KeyResolution, SignerMatch, TrustError, TrustStore, TrustStoreError, TrustedKey,
};
