// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The rule-logic expression language.
//!
//! Published rules carry a JSON-logic-like expression tree. The engine
//! here is a closed AST with a tree-walking interpreter, not a scripting
//! host: every operator is parsed up front and unknown operators are a
//! parse error, never a runtime fallback.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::{Date, Duration, Month, OffsetDateTime};

/// Maximum supported nesting depth for rule logic.
const MAX_LOGIC_NESTING: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Gt,
    Lt,
    Ge,
    Le,
    After,
    Before,
    NotAfter,
    NotBefore,
}

impl CompareOp {
    fn is_temporal(self) -> bool {
        matches!(
            self,
            Self::After | Self::Before | Self::NotAfter | Self::NotBefore
        )
    }

    fn holds(self, ord: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::*;
        match self {
            Self::Gt | Self::After => ord == Greater,
            Self::Lt | Self::Before => ord == Less,
            Self::Ge | Self::NotBefore => matches!(ord, Greater | Equal),
            Self::Le | Self::NotAfter => matches!(ord, Less | Equal),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Day,
    Hour,
}

/// A parsed rule-logic expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    /// Dotted path into the evaluation document. Empty path selects the
    /// whole document.
    Var(String),
    If(Box<Expr>, Box<Expr>, Box<Expr>),
    And(Vec<Expr>),
    Not(Box<Expr>),
    StrictEq(Box<Expr>, Box<Expr>),
    /// 2 or 3 operands; 3 means `a op b op c` must hold pairwise.
    Compare(CompareOp, Vec<Expr>),
    In(Box<Expr>, Box<Expr>),
    /// Shift a date-time operand by a signed amount of days or hours.
    PlusTime(Box<Expr>, Box<Expr>, TimeUnit),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LogicParseError {
    #[error("unknown operator {0:?}")]
    UnknownOperator(String),

    #[error("operator {op:?}: {reason}")]
    BadOperands { op: String, reason: String },

    #[error("logic nesting exceeds {max} levels")]
    TooDeep { max: usize },

    #[error("an operation must be an object with exactly one key")]
    NotAnOperation,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvalError {
    /// The document has no value at the path a `var` dereferences.
    /// Distinct from a type error: it means the input needed by the rule
    /// is absent, so the rule is indeterminate rather than broken.
    #[error("no value at path {path:?}")]
    MissingValue { path: String },

    #[error("type error: {0}")]
    Type(String),
}

impl Expr {
    pub fn parse(value: &Value) -> Result<Self, LogicParseError> {
        parse_at(value, 0)
    }

    /// Evaluate against the evaluation document.
    pub fn evaluate(&self, data: &Value) -> Result<Value, EvalError> {
        match self {
            Self::Literal(v) => Ok(v.clone()),
            Self::Var(path) => lookup(data, path),
            Self::If(cond, then, otherwise) => {
                if is_truthy(&cond.evaluate(data)?) {
                    then.evaluate(data)
                } else {
                    otherwise.evaluate(data)
                }
            }
            Self::And(operands) => {
                let mut last = Value::Bool(true);
                for operand in operands {
                    last = operand.evaluate(data)?;
                    if !is_truthy(&last) {
                        return Ok(last);
                    }
                }
                Ok(last)
            }
            Self::Not(operand) => Ok(Value::Bool(!is_truthy(&operand.evaluate(data)?))),
            Self::StrictEq(a, b) => Ok(Value::Bool(values_equal(
                &a.evaluate(data)?,
                &b.evaluate(data)?,
            ))),
            Self::Compare(op, operands) => compare(*op, operands, data),
            Self::In(needle, haystack) => {
                let needle = needle.evaluate(data)?;
                match haystack.evaluate(data)? {
                    Value::Array(items) => {
                        Ok(Value::Bool(items.iter().any(|i| values_equal(i, &needle))))
                    }
                    other => Err(EvalError::Type(format!(
                        "\"in\" needs an array operand, got {other}"
                    ))),
                }
            }
            Self::PlusTime(base, amount, unit) => {
                let base = match base.evaluate(data)? {
                    Value::String(s) => parse_time(&s)?,
                    other => {
                        return Err(EvalError::Type(format!(
                            "\"plusTime\" needs a date-time string, got {other}"
                        )))
                    }
                };
                let amount = match amount.evaluate(data)? {
                    Value::Number(n) => n.as_i64().ok_or_else(|| {
                        EvalError::Type("\"plusTime\" amount must be an integer".to_string())
                    })?,
                    other => {
                        return Err(EvalError::Type(format!(
                            "\"plusTime\" amount must be a number, got {other}"
                        )))
                    }
                };
                let shifted = match unit {
                    TimeUnit::Day => base + Duration::days(amount),
                    TimeUnit::Hour => base + Duration::hours(amount),
                };
                let rendered = shifted
                    .format(&Rfc3339)
                    .map_err(|e| EvalError::Type(format!("unrepresentable date-time: {e}")))?;
                Ok(Value::String(rendered))
            }
        }
    }
}

impl<'de> Deserialize<'de> for Expr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Expr::parse(&value).map_err(serde::de::Error::custom)
    }
}

fn parse_at(value: &Value, depth: usize) -> Result<Expr, LogicParseError> {
    if depth > MAX_LOGIC_NESTING {
        return Err(LogicParseError::TooDeep {
            max: MAX_LOGIC_NESTING,
        });
    }

    let Value::Object(map) = value else {
        // Scalars and arrays are literals. Published rules use arrays
        // only as constant operands of "in".
        return Ok(Expr::Literal(value.clone()));
    };

    let mut entries = map.iter();
    let (Some((op, args)), None) = (entries.next(), entries.next()) else {
        return Err(LogicParseError::NotAnOperation);
    };

    let bad = |reason: &str| LogicParseError::BadOperands {
        op: op.clone(),
        reason: reason.to_string(),
    };
    let args_array = || -> Result<&[Value], LogicParseError> {
        match args {
            Value::Array(items) => Ok(items),
            _ => Err(bad("operands must be an array")),
        }
    };

    match op.as_str() {
        "var" => {
            let path = match args {
                Value::String(s) => s.clone(),
                Value::Array(items) => match items.as_slice() {
                    [Value::String(s)] => s.clone(),
                    _ => return Err(bad("\"var\" takes a single path string")),
                },
                _ => return Err(bad("\"var\" takes a path string")),
            };
            Ok(Expr::Var(path))
        }
        "if" => {
            let [cond, then, otherwise] = args_array()? else {
                return Err(bad("\"if\" takes [condition, then, else]"));
            };
            Ok(Expr::If(
                Box::new(parse_at(cond, depth + 1)?),
                Box::new(parse_at(then, depth + 1)?),
                Box::new(parse_at(otherwise, depth + 1)?),
            ))
        }
        "and" => {
            let items = args_array()?;
            if items.len() < 2 {
                return Err(bad("\"and\" needs at least two operands"));
            }
            let parsed = items
                .iter()
                .map(|i| parse_at(i, depth + 1))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Expr::And(parsed))
        }
        "!" => {
            let [operand] = args_array()? else {
                return Err(bad("\"!\" takes one operand"));
            };
            Ok(Expr::Not(Box::new(parse_at(operand, depth + 1)?)))
        }
        "===" => {
            let [a, b] = args_array()? else {
                return Err(bad("\"===\" takes two operands"));
            };
            Ok(Expr::StrictEq(
                Box::new(parse_at(a, depth + 1)?),
                Box::new(parse_at(b, depth + 1)?),
            ))
        }
        "in" => {
            let [needle, haystack] = args_array()? else {
                return Err(bad("\"in\" takes two operands"));
            };
            Ok(Expr::In(
                Box::new(parse_at(needle, depth + 1)?),
                Box::new(parse_at(haystack, depth + 1)?),
            ))
        }
        "plusTime" => {
            let [base, amount, unit] = args_array()? else {
                return Err(bad("\"plusTime\" takes [operand, amount, unit]"));
            };
            let unit = match unit.as_str() {
                Some("day") => TimeUnit::Day,
                Some("hour") => TimeUnit::Hour,
                _ => return Err(bad("\"plusTime\" unit must be \"day\" or \"hour\"")),
            };
            Ok(Expr::PlusTime(
                Box::new(parse_at(base, depth + 1)?),
                Box::new(parse_at(amount, depth + 1)?),
                unit,
            ))
        }
        ">" | "<" | ">=" | "<=" | "after" | "before" | "not-after" | "not-before" => {
            let cmp = match op.as_str() {
                ">" => CompareOp::Gt,
                "<" => CompareOp::Lt,
                ">=" => CompareOp::Ge,
                "<=" => CompareOp::Le,
                "after" => CompareOp::After,
                "before" => CompareOp::Before,
                "not-after" => CompareOp::NotAfter,
                _ => CompareOp::NotBefore,
            };
            let items = args_array()?;
            if !(2..=3).contains(&items.len()) {
                return Err(bad("comparison takes 2 or 3 operands"));
            }
            let parsed = items
                .iter()
                .map(|i| parse_at(i, depth + 1))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Expr::Compare(cmp, parsed))
        }
        other => Err(LogicParseError::UnknownOperator(other.to_string())),
    }
}

fn lookup(data: &Value, path: &str) -> Result<Value, EvalError> {
    if path.is_empty() {
        return Ok(data.clone());
    }

    let mut current = data;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment).ok_or_else(|| EvalError::MissingValue {
                path: path.to_string(),
            })?,
            Value::Array(items) => {
                let index: usize = segment.parse().map_err(|_| EvalError::MissingValue {
                    path: path.to_string(),
                })?;
                items.get(index).ok_or_else(|| EvalError::MissingValue {
                    path: path.to_string(),
                })?
            }
            _ => {
                return Err(EvalError::MissingValue {
                    path: path.to_string(),
                })
            }
        };
    }
    Ok(current.clone())
}

pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(_) => true,
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn compare(op: CompareOp, operands: &[Expr], data: &Value) -> Result<Value, EvalError> {
    let values = operands
        .iter()
        .map(|o| o.evaluate(data))
        .collect::<Result<Vec<_>, _>>()?;

    let holds = if op.is_temporal() {
        let times = values
            .iter()
            .map(|v| match v {
                Value::String(s) => parse_time(s),
                other => Err(EvalError::Type(format!(
                    "temporal comparison needs date-time strings, got {other}"
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?;
        times.windows(2).all(|w| op.holds(w[0].cmp(&w[1])))
    } else {
        let numbers = values
            .iter()
            .map(|v| match v {
                Value::Number(n) => n.as_f64().ok_or_else(|| {
                    EvalError::Type("comparison operand is not a finite number".to_string())
                }),
                other => Err(EvalError::Type(format!(
                    "numeric comparison needs numbers, got {other}"
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?;
        numbers.windows(2).all(|w| {
            op.holds(w[0].partial_cmp(&w[1]).unwrap_or(std::cmp::Ordering::Equal))
        })
    };

    Ok(Value::Bool(holds))
}

/// Parse the date-time forms rule data carries: RFC 3339, full dates,
/// and the reduced-precision `YYYY-MM` / `YYYY` forms partially redacted
/// fields use. Reduced forms resolve to the first instant they cover,
/// in UTC.
pub(crate) fn parse_time(s: &str) -> Result<OffsetDateTime, EvalError> {
    if let Ok(t) = OffsetDateTime::parse(s, &Rfc3339) {
        return Ok(t);
    }

    let bad = || EvalError::Type(format!("not a date-time: {s:?}"));

    let parts: Vec<&str> = s.split('-').collect();
    let (year, month, day) = match parts.as_slice() {
        [y] => (y.parse::<i32>().map_err(|_| bad())?, 1u8, 1u8),
        [y, m] => (
            y.parse::<i32>().map_err(|_| bad())?,
            m.parse::<u8>().map_err(|_| bad())?,
            1u8,
        ),
        [y, m, d] => (
            y.parse::<i32>().map_err(|_| bad())?,
            m.parse::<u8>().map_err(|_| bad())?,
            d.parse::<u8>().map_err(|_| bad())?,
        ),
        _ => return Err(bad()),
    };

    let month = Month::try_from(month).map_err(|_| bad())?;
    let date = Date::from_calendar_date(year, month, day).map_err(|_| bad())?;
    Ok(date.midnight().assume_utc())
}
