// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Versioned business rules for certificate acceptance.
//!
//! Rules are published as JSON per country/region/certificate-type,
//! selected by validity window and highest version, and evaluated by a
//! tree-walking interpreter over a closed expression language.

mod evaluator;
mod logic;
mod model;
mod repository;
mod value_sets;
mod version;

pub use evaluator::{
    check_verdict, evaluate_rule, evaluate_rules, ExternalParameters, RuleEvaluationResult,
    RuleOutcome, RuleViolationError,
};
pub use logic::{EvalError, Expr, LogicParseError};
pub use model::{CertificateType, Rule, RuleDescription, RuleType};
pub use repository::{RuleRepository, RuleSet};
pub use value_sets::ValueSets;
pub use version::RuleVersion;
