// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use time::OffsetDateTime;

use crate::model::{CertificateType, Rule, RuleType};
use crate::version::RuleVersion;

/// Immutable snapshot of the published rule set.
///
/// Shared read-only between validations; `RuleSet` swaps whole
/// snapshots on refresh.
#[derive(Debug, Clone, Default)]
pub struct RuleRepository {
    rules: Vec<Rule>,
}

impl RuleRepository {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Select the applicable rules for one query.
    ///
    /// Rules are grouped by `(identifier, country, region)`; per group
    /// only the highest-version rule whose `[valid_from, valid_to)`
    /// window contains `clock` is returned. Region matching is exact but
    /// case-insensitive, with blank normalizing to no region. `General`
    /// rules match every certificate type.
    pub fn select_applicable(
        &self,
        country: &str,
        region: Option<&str>,
        clock: OffsetDateTime,
        certificate_type: CertificateType,
        rule_type: RuleType,
    ) -> Vec<&Rule> {
        let wanted_region = normalize_region(region);

        let mut best: HashMap<&str, (&Rule, RuleVersion)> = HashMap::new();
        for rule in &self.rules {
            if rule.rule_type != rule_type
                || !rule.country.eq_ignore_ascii_case(country)
                || normalize_region(rule.region.as_deref()) != wanted_region
                || !rule.certificate_type.applies_to(certificate_type)
                || !rule.in_window(clock)
            {
                continue;
            }

            let version = RuleVersion::parse_lossy(&rule.version);
            let supersedes = match best.get(rule.identifier.as_str()) {
                Some((_, current)) => version > *current,
                None => true,
            };
            if supersedes {
                best.insert(&rule.identifier, (rule, version));
            }
        }

        let mut selected: Vec<&Rule> = best.into_values().map(|(rule, _)| rule).collect();
        selected.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        selected
    }

    /// The full evaluation list for one certificate.
    ///
    /// Acceptance rules are queried against the acceptance country;
    /// invalidation rules against the issuance country when it is known
    /// and non-blank. The two lists are unioned.
    pub fn select_for_validation(
        &self,
        acceptance_country: &str,
        issuance_country: Option<&str>,
        region: Option<&str>,
        clock: OffsetDateTime,
        certificate_type: CertificateType,
    ) -> Vec<&Rule> {
        let mut selected = self.select_applicable(
            acceptance_country,
            region,
            clock,
            certificate_type,
            RuleType::Acceptance,
        );

        if let Some(issuer) = issuance_country.filter(|c| !c.trim().is_empty()) {
            selected.extend(self.select_applicable(
                issuer,
                region,
                clock,
                certificate_type,
                RuleType::Invalidation,
            ));
        }

        selected
    }
}

fn normalize_region(region: Option<&str>) -> Option<String> {
    match region {
        None => None,
        Some(r) => {
            let trimmed = r.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_ascii_lowercase())
            }
        }
    }
}

/// Long-lived holder of the current rule snapshot.
///
/// `replace` is the only mutation entry point, called by the external
/// sync job after a successful fetch.
pub struct RuleSet {
    inner: RwLock<Arc<RuleRepository>>,
    last_update: RwLock<Option<OffsetDateTime>>,
}

impl RuleSet {
    pub fn new(initial: RuleRepository) -> Self {
        Self {
            inner: RwLock::new(Arc::new(initial)),
            last_update: RwLock::new(None),
        }
    }

    pub fn current(&self) -> Arc<RuleRepository> {
        Arc::clone(&self.inner.read())
    }

    pub fn last_update(&self) -> Option<OffsetDateTime> {
        *self.last_update.read()
    }

    /// Swap in a freshly fetched rule set.
    pub fn replace(&self, rules: Vec<Rule>, now: OffsetDateTime) {
        *self.inner.write() = Arc::new(RuleRepository::new(rules));
        *self.last_update.write() = Some(now);
    }
}
