//! Filter specification: a closed, per-entity allow-list of queryable fields.
//!
//! Raw query-string values are turned into typed [`Predicate`]s. Numeric, decimal and
//! date values that fail to parse are skipped rather than rejected; boolean values
//! must be the literal `true` or `false`.

use crate::error::{AppError, AppResult};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    /// Exact match.
    Equals,
    /// Case-insensitive substring match.
    Contains,
    /// Inclusive bounds via `<param>_gte` / `<param>_lte`.
    Range,
    /// Comma-separated list matched with `= ANY(..)`.
    SetMembership,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Id,
    Text,
    Date,
    Decimal,
    Bool,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct FilterField {
    pub param: &'static str,
    pub column: &'static str,
    pub op: FilterOp,
    pub value_type: ValueType,
}

impl FilterField {
    pub const fn equals(column: &'static str, value_type: ValueType) -> Self {
        Self {
            param: column,
            column,
            op: FilterOp::Equals,
            value_type,
        }
    }

    pub const fn contains(column: &'static str) -> Self {
        Self {
            param: column,
            column,
            op: FilterOp::Contains,
            value_type: ValueType::Text,
        }
    }

    pub const fn range(column: &'static str, value_type: ValueType) -> Self {
        Self {
            param: column,
            column,
            op: FilterOp::Range,
            value_type,
        }
    }

    pub const fn one_of(column: &'static str, value_type: ValueType) -> Self {
        Self {
            param: column,
            column,
            op: FilterOp::SetMembership,
            value_type,
        }
    }

    /// Query-string keys this field answers to.
    pub fn accepted_params(&self) -> Vec<String> {
        match self.op {
            FilterOp::Range => vec![
                format!("{}_gte", self.param),
                format!("{}_lte", self.param),
            ],
            _ => vec![self.param.to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Int(i64),
    Text(String),
    Date(NaiveDate),
    Decimal(Decimal),
    Bool(bool),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterValues {
    Int(Vec<i64>),
    Text(Vec<String>),
    Date(Vec<NaiveDate>),
    Decimal(Vec<Decimal>),
    Bool(Vec<bool>),
}

impl FilterValues {
    pub fn is_empty(&self) -> bool {
        match self {
            FilterValues::Int(v) => v.is_empty(),
            FilterValues::Text(v) => v.is_empty(),
            FilterValues::Date(v) => v.is_empty(),
            FilterValues::Decimal(v) => v.is_empty(),
            FilterValues::Bool(v) => v.is_empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Equals {
        column: &'static str,
        value: FilterValue,
    },
    Contains {
        column: &'static str,
        pattern: String,
    },
    Gte {
        column: &'static str,
        value: FilterValue,
    },
    Lte {
        column: &'static str,
        value: FilterValue,
    },
    AnyOf {
        column: &'static str,
        values: FilterValues,
    },
}

fn parse_bool(param: &str, raw: &str) -> AppResult<bool> {
    match raw {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(AppError::validation(format!(
            "Invalid value for '{}': expected 'true' or 'false'",
            param
        ))),
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

/// Parses a single value. `Ok(None)` means "skip this filter".
fn parse_value(param: &str, value_type: ValueType, raw: &str) -> AppResult<Option<FilterValue>> {
    let trimmed = raw.trim();
    Ok(match value_type {
        ValueType::Id => trimmed.parse::<i64>().ok().map(FilterValue::Int),
        ValueType::Text => (!trimmed.is_empty()).then(|| FilterValue::Text(trimmed.to_string())),
        ValueType::Date => parse_date(trimmed).map(FilterValue::Date),
        ValueType::Decimal => Decimal::from_str(trimmed).ok().map(FilterValue::Decimal),
        ValueType::Bool => Some(FilterValue::Bool(parse_bool(param, trimmed)?)),
    })
}

fn parse_set(field: &FilterField, raw: &str) -> AppResult<FilterValues> {
    let items = raw.split(',').map(str::trim).filter(|s| !s.is_empty());
    Ok(match field.value_type {
        ValueType::Id => FilterValues::Int(items.filter_map(|s| s.parse().ok()).collect()),
        ValueType::Text => FilterValues::Text(items.map(str::to_string).collect()),
        ValueType::Date => FilterValues::Date(items.filter_map(parse_date).collect()),
        ValueType::Decimal => {
            FilterValues::Decimal(items.filter_map(|s| Decimal::from_str(s).ok()).collect())
        }
        ValueType::Bool => FilterValues::Bool(
            items
                .map(|s| parse_bool(field.param, s))
                .collect::<AppResult<Vec<_>>>()?,
        ),
    })
}

/// Escapes LIKE metacharacters and wraps the needle for a substring match.
pub fn contains_pattern(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len() + 2);
    out.push('%');
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

/// Builds predicates in allow-list order from the caller's parameters.
pub fn build_predicates(
    fields: &[FilterField],
    params: &HashMap<String, String>,
) -> AppResult<Vec<Predicate>> {
    let mut predicates = Vec::new();

    for field in fields {
        match field.op {
            FilterOp::Equals => {
                if let Some(raw) = params.get(field.param) {
                    if let Some(value) = parse_value(field.param, field.value_type, raw)? {
                        predicates.push(Predicate::Equals {
                            column: field.column,
                            value,
                        });
                    }
                }
            }
            FilterOp::Contains => {
                if let Some(raw) = params.get(field.param) {
                    let needle = raw.trim();
                    if !needle.is_empty() {
                        predicates.push(Predicate::Contains {
                            column: field.column,
                            pattern: contains_pattern(needle),
                        });
                    }
                }
            }
            FilterOp::Range => {
                let gte_key = format!("{}_gte", field.param);
                let lte_key = format!("{}_lte", field.param);
                if let Some(raw) = params.get(&gte_key) {
                    if let Some(value) = parse_value(&gte_key, field.value_type, raw)? {
                        predicates.push(Predicate::Gte {
                            column: field.column,
                            value,
                        });
                    }
                }
                if let Some(raw) = params.get(&lte_key) {
                    if let Some(value) = parse_value(&lte_key, field.value_type, raw)? {
                        predicates.push(Predicate::Lte {
                            column: field.column,
                            value,
                        });
                    }
                }
            }
            FilterOp::SetMembership => {
                if let Some(raw) = params.get(field.param) {
                    let values = parse_set(field, raw)?;
                    if !values.is_empty() {
                        predicates.push(Predicate::AnyOf {
                            column: field.column,
                            values,
                        });
                    }
                }
            }
        }
    }

    Ok(predicates)
}
