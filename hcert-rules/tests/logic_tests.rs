// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Expression-language tests: parsing strictness, operator semantics,
//! and the missing-input vs type-error distinction.

use hcert_rules::{EvalError, Expr, LogicParseError};
use serde_json::{json, Value};

fn eval(logic: Value, data: Value) -> Result<Value, EvalError> {
    Expr::parse(&logic).expect("parse").evaluate(&data)
}

#[test]
fn unknown_operator_is_a_parse_error() {
    let err = Expr::parse(&json!({"reduce": [1, 2, 3]})).unwrap_err();
    assert_eq!(err, LogicParseError::UnknownOperator("reduce".to_string()));
}

#[test]
fn multi_key_object_is_not_an_operation() {
    let err = Expr::parse(&json!({"var": "x", "if": []})).unwrap_err();
    assert_eq!(err, LogicParseError::NotAnOperation);
}

#[test]
fn nesting_depth_is_bounded() {
    let mut logic = json!(true);
    for _ in 0..100 {
        logic = json!({"!": [logic]});
    }
    assert!(matches!(
        Expr::parse(&logic).unwrap_err(),
        LogicParseError::TooDeep { .. }
    ));
}

#[test]
fn var_walks_objects_and_arrays() {
    let data = json!({"payload": {"v": [{"dn": 2, "sd": 2}]}});
    assert_eq!(eval(json!({"var": "payload.v.0.dn"}), data.clone()).unwrap(), json!(2));
    assert_eq!(
        eval(json!({"var": ""}), json!({"a": 1})).unwrap(),
        json!({"a": 1})
    );
}

#[test]
fn missing_var_is_missing_value_not_type_error() {
    let data = json!({"payload": {"v": [{"dn": 2}]}});
    let err = eval(json!({"var": "payload.r.0.du"}), data).unwrap_err();
    assert!(matches!(err, EvalError::MissingValue { path } if path == "payload.r.0.du"));
}

#[test]
fn present_null_is_a_value() {
    let data = json!({"payload": {"x": null}});
    assert_eq!(eval(json!({"var": "payload.x"}), data).unwrap(), Value::Null);
}

#[test]
fn strict_equality_compares_values() {
    assert_eq!(eval(json!({"===": [{"var": "a"}, 2]}), json!({"a": 2})).unwrap(), json!(true));
    assert_eq!(eval(json!({"===": [{"var": "a"}, "2"]}), json!({"a": 2})).unwrap(), json!(false));
    assert_eq!(eval(json!({"===": [2.0, 2]}), json!({})).unwrap(), json!(true));
}

#[test]
fn numeric_comparisons_support_two_and_three_operands() {
    assert_eq!(eval(json!({">=": [{"var": "dn"}, {"var": "sd"}]}), json!({"dn": 2, "sd": 2})).unwrap(), json!(true));
    assert_eq!(eval(json!({"<": [1, 2, 3]}), json!({})).unwrap(), json!(true));
    assert_eq!(eval(json!({"<": [1, 3, 2]}), json!({})).unwrap(), json!(false));
}

#[test]
fn comparing_non_numbers_is_a_type_error() {
    let err = eval(json!({">": [{"var": "a"}, 1]}), json!({"a": "two"})).unwrap_err();
    assert!(matches!(err, EvalError::Type(_)));
}

#[test]
fn and_short_circuits_on_falsy() {
    assert_eq!(eval(json!({"and": [true, false, {"var": "missing"}]}), json!({})).unwrap(), json!(false));
    assert_eq!(eval(json!({"and": [true, 1]}), json!({})).unwrap(), json!(1));
}

#[test]
fn if_selects_branch_by_truthiness() {
    assert_eq!(
        eval(json!({"if": [{"var": "x"}, "yes", "no"]}), json!({"x": 1})).unwrap(),
        json!("yes")
    );
    assert_eq!(
        eval(json!({"if": [{"var": "x"}, "yes", "no"]}), json!({"x": 0})).unwrap(),
        json!("no")
    );
}

#[test]
fn in_tests_array_membership() {
    let data = json!({"external": {"valueSets": {"vaccines": ["EU/1/20/1528", "EU/1/20/1507"]}},
                      "payload": {"v": [{"mp": "EU/1/20/1528"}]}});
    let logic = json!({"in": [{"var": "payload.v.0.mp"}, {"var": "external.valueSets.vaccines"}]});
    assert_eq!(eval(logic, data).unwrap(), json!(true));
}

#[test]
fn in_against_non_array_is_a_type_error() {
    let err = eval(json!({"in": [1, {"var": "x"}]}), json!({"x": "not an array"})).unwrap_err();
    assert!(matches!(err, EvalError::Type(_)));
}

#[test]
fn plus_time_shifts_days_and_hours() {
    assert_eq!(
        eval(json!({"plusTime": ["2021-06-01", 14, "day"]}), json!({})).unwrap(),
        json!("2021-06-15T00:00:00Z")
    );
    assert_eq!(
        eval(json!({"plusTime": ["2021-06-01T10:00:00Z", -4, "hour"]}), json!({})).unwrap(),
        json!("2021-06-01T06:00:00Z")
    );
}

#[test]
fn temporal_comparisons_parse_reduced_precision_dates() {
    // Full-dose validity: vaccination date + 14 days must not be after
    // the validation clock.
    let logic = json!({"not-after": [
        {"plusTime": [{"var": "payload.v.0.dt"}, 14, "day"]},
        {"var": "external.validationClock"}
    ]});
    let data = json!({"payload": {"v": [{"dt": "2021-06-01"}]},
                      "external": {"validationClock": "2021-07-01T00:00:00Z"}});
    assert_eq!(eval(logic.clone(), data).unwrap(), json!(true));

    let too_fresh = json!({"payload": {"v": [{"dt": "2021-06-25"}]},
                           "external": {"validationClock": "2021-07-01T00:00:00Z"}});
    assert_eq!(eval(logic, too_fresh).unwrap(), json!(false));

    // Year-only precision resolves to the first covered instant.
    assert_eq!(
        eval(json!({"before": ["2004", "2004-02"]}), json!({})).unwrap(),
        json!(true)
    );
}

#[test]
fn plus_time_rejects_bad_unit_at_parse_time() {
    let err = Expr::parse(&json!({"plusTime": ["2021-06-01", 1, "week"]})).unwrap_err();
    assert!(matches!(err, LogicParseError::BadOperands { .. }));
}

#[test]
fn not_negates_truthiness() {
    assert_eq!(eval(json!({"!": [0]}), json!({})).unwrap(), json!(true));
    assert_eq!(eval(json!({"!": [[1]]}), json!({})).unwrap(), json!(false));
}
