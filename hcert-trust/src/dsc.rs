// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Document-signer certificate list management.
//!
//! An external sync job periodically fetches the signed list and calls
//! [`DscListManager::replace`]. The whole key set is swapped atomically
//! so concurrent validations never observe a partially-updated trust
//! set; a failed refresh leaves the previous snapshot authoritative.

use std::sync::Arc;

use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use time::{Duration, OffsetDateTime};

use crate::store::{TrustStore, TrustStoreError, TrustedKey};

/// One entry of the fetched document-signer list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DscEntry {
    pub country: String,
    pub key_id: Vec<u8>,
    pub certificate_der: Vec<u8>,
    /// Upstream signature over the entry, kept for audit.
    pub signature: Vec<u8>,
    /// When the upstream list stamped this entry.
    pub timestamp: OffsetDateTime,
}

impl DscEntry {
    /// SHA-256 thumbprint of the certificate, recomputed locally rather
    /// than trusted from the list.
    pub fn thumbprint(&self) -> String {
        hex::encode(Sha256::digest(&self.certificate_der))
    }
}

/// Trust data is older than the caller's freshness threshold. Non-fatal:
/// the caller decides whether to proceed or force a refresh first.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StaleTrustDataError {
    #[error("trust data was never refreshed")]
    NeverRefreshed,

    #[error("trust data is {age} old (threshold {max_age})")]
    Stale { age: Duration, max_age: Duration },
}

/// Holder of the current trusted key snapshot.
pub struct DscListManager {
    store: RwLock<Arc<TrustStore>>,
    last_update: RwLock<Option<OffsetDateTime>>,
}

impl DscListManager {
    /// Start from an initial key set (the embedded fallback, or keys
    /// loaded from local persistence).
    pub fn new(initial: TrustStore) -> Self {
        Self {
            store: RwLock::new(Arc::new(initial)),
            last_update: RwLock::new(None),
        }
    }

    /// The current snapshot. Cheap; validations hold the `Arc` for their
    /// whole run and are unaffected by concurrent replacement.
    pub fn current(&self) -> Arc<TrustStore> {
        Arc::clone(&self.store.read())
    }

    pub fn last_update(&self) -> Option<OffsetDateTime> {
        *self.last_update.read()
    }

    /// Replace the whole key set from a freshly fetched list.
    ///
    /// All-or-nothing: if any entry fails to parse the previous snapshot
    /// stays in place and the error is returned to the sync job.
    pub fn replace(
        &self,
        entries: Vec<DscEntry>,
        now: OffsetDateTime,
    ) -> Result<(), TrustStoreError> {
        let mut keys = Vec::with_capacity(entries.len());
        for entry in entries {
            keys.push(TrustedKey::from_certificate_der(
                entry.country,
                entry.key_id,
                entry.certificate_der,
            )?);
        }

        let next = Arc::new(TrustStore::new(keys));
        *self.store.write() = next;
        *self.last_update.write() = Some(now);
        Ok(())
    }

    /// Check snapshot freshness against a caller-chosen threshold.
    pub fn staleness(
        &self,
        now: OffsetDateTime,
        max_age: Duration,
    ) -> Result<(), StaleTrustDataError> {
        match self.last_update() {
            None => Err(StaleTrustDataError::NeverRefreshed),
            Some(at) => {
                let age = now - at;
                if age > max_age {
                    Err(StaleTrustDataError::Stale { age, max_age })
                } else {
                    Ok(())
                }
            }
        }
    }
}
