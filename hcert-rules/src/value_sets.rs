// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// External enumerations referenced by rule logic, keyed by value-set
/// identifier (vaccine products, test types, ...).
///
/// Rule logic addresses them as `external.valueSets.<id>` and tests
/// membership with `in`, so each set serializes as a plain array of
/// codes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValueSets(BTreeMap<String, Vec<String>>);

impl ValueSets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, codes: Vec<String>) {
        self.0.insert(id.into(), codes);
    }

    pub fn get(&self, id: &str) -> Option<&[String]> {
        self.0.get(id).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
