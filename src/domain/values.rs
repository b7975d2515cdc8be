//! JSON payload → typed SQL values.

use crate::crypto::password::hash_password;
use crate::domain::model::{Access, ColumnDef, ColumnType};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value as JsonValue;
use sqlx::{Postgres, QueryBuilder};
use std::str::FromStr;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FieldError {
    pub index: usize,
    pub field: String,
    pub expected: String,
    pub got: String,
    #[schema(value_type = Object)]
    pub value: JsonValue,
}

/// A value ready to be bound, carrying its column type even when null.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null(ColumnType),
    Text(String),
    Int(i32),
    BigInt(i64),
    Bool(bool),
    Date(NaiveDate),
    Timestamptz(DateTime<Utc>),
    Decimal(Decimal),
}

impl SqlValue {
    pub fn push_bind(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        match self {
            SqlValue::Null(t) => match t {
                ColumnType::Text => {
                    qb.push_bind(None::<String>);
                }
                ColumnType::Int => {
                    qb.push_bind(None::<i32>);
                }
                ColumnType::BigInt => {
                    qb.push_bind(None::<i64>);
                }
                ColumnType::Bool => {
                    qb.push_bind(None::<bool>);
                }
                ColumnType::Date => {
                    qb.push_bind(None::<NaiveDate>);
                }
                ColumnType::Timestamptz => {
                    qb.push_bind(None::<DateTime<Utc>>);
                }
                ColumnType::Decimal => {
                    qb.push_bind(None::<Decimal>);
                }
            },
            SqlValue::Text(v) => {
                qb.push_bind(v.clone());
            }
            SqlValue::Int(v) => {
                qb.push_bind(*v);
            }
            SqlValue::BigInt(v) => {
                qb.push_bind(*v);
            }
            SqlValue::Bool(v) => {
                qb.push_bind(*v);
            }
            SqlValue::Date(v) => {
                qb.push_bind(*v);
            }
            SqlValue::Timestamptz(v) => {
                qb.push_bind(*v);
            }
            SqlValue::Decimal(v) => {
                qb.push_bind(*v);
            }
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::BigInt(v) => Some(*v),
            SqlValue::Int(v) => Some(*v as i64),
            _ => None,
        }
    }
}

fn json_kind(v: &JsonValue) -> &'static str {
    match v {
        JsonValue::String(_) => "string",
        JsonValue::Number(_) => "number",
        JsonValue::Bool(_) => "bool",
        JsonValue::Null => "null",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

pub fn coerce_scalar_for_type(col_type: ColumnType, v: &JsonValue) -> Result<SqlValue, String> {
    if v.is_null() {
        return Ok(SqlValue::Null(col_type));
    }
    match col_type {
        ColumnType::Int => {
            let n = match (v.as_i64(), v.as_str()) {
                (Some(n), _) => n,
                (None, Some(s)) => s.trim().parse::<i64>().map_err(|_| "expected int".to_string())?,
                _ => return Err("expected int".to_string()),
            };
            i32::try_from(n)
                .map(SqlValue::Int)
                .map_err(|_| format!("out of range for int: {}", n))
        }
        ColumnType::BigInt => match (v.as_i64(), v.as_str()) {
            (Some(n), _) => Ok(SqlValue::BigInt(n)),
            (None, Some(s)) => s
                .trim()
                .parse::<i64>()
                .map(SqlValue::BigInt)
                .map_err(|_| "expected bigint".to_string()),
            _ => Err("expected bigint".to_string()),
        },
        ColumnType::Bool => {
            if let Some(b) = v.as_bool() {
                return Ok(SqlValue::Bool(b));
            }
            if let Some(s) = v.as_str() {
                return match s.trim().to_lowercase().as_str() {
                    "true" | "t" | "1" => Ok(SqlValue::Bool(true)),
                    "false" | "f" | "0" => Ok(SqlValue::Bool(false)),
                    _ => Err("expected bool".to_string()),
                };
            }
            Err("expected bool".to_string())
        }
        ColumnType::Date => {
            let s = v.as_str().ok_or_else(|| "expected date string".to_string())?;
            let s = s.trim();
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .or_else(|_| DateTime::parse_from_rfc3339(s).map(|dt| dt.date_naive()))
                .map(SqlValue::Date)
                .map_err(|_| "expected YYYY-MM-DD date".to_string())
        }
        ColumnType::Timestamptz => {
            let s = v.as_str().ok_or_else(|| "expected timestamp string".to_string())?;
            DateTime::parse_from_rfc3339(s.trim())
                .map(|dt| SqlValue::Timestamptz(dt.with_timezone(&Utc)))
                .map_err(|_| "expected RFC3339 timestamp".to_string())
        }
        ColumnType::Decimal => {
            let parsed = match v {
                JsonValue::Number(n) => parse_decimal(&n.to_string()),
                JsonValue::String(s) => parse_decimal(s.trim()),
                _ => None,
            };
            parsed
                .map(SqlValue::Decimal)
                .ok_or_else(|| "expected decimal".to_string())
        }
        ColumnType::Text => match v {
            JsonValue::String(s) => Ok(SqlValue::Text(s.clone())),
            // allow numbers/bools to stringify for text columns
            JsonValue::Number(_) | JsonValue::Bool(_) => Ok(SqlValue::Text(v.to_string())),
            _ => Err("expected text".to_string()),
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Create,
    Update,
}

/// Column assignments extracted from one request object, in column-definition order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreparedWrite {
    pub assignments: Vec<(&'static str, SqlValue)>,
}

impl PreparedWrite {
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.assignments
            .iter()
            .find(|(c, _)| *c == column)
            .map(|(_, v)| v)
    }

    /// Non-null foreign keys this write would store, as `(column, table, id)`.
    pub fn references(&self, columns: &[ColumnDef]) -> Vec<(&'static str, &'static str, i64)> {
        columns
            .iter()
            .filter_map(|col| {
                let table = col.references?;
                let id = self.get(col.name)?.as_i64()?;
                Some((col.name, table, id))
            })
            .collect()
    }
}

/// Validates and coerces one request object against a column list.
///
/// `prefix` names the enclosing array for child rows (e.g. `details`), so errors read
/// `details[2].item_id`. All problems are collected before returning.
pub fn prepare_write(
    columns: &[ColumnDef],
    payload: &JsonValue,
    mode: WriteMode,
    index: usize,
    prefix: Option<&str>,
) -> Result<PreparedWrite, Vec<FieldError>> {
    let field_name = |name: &str| match prefix {
        Some(p) => format!("{}[{}].{}", p, index, name),
        None => name.to_string(),
    };

    let obj = match payload.as_object() {
        Some(o) => o,
        None => {
            return Err(vec![FieldError {
                index,
                field: field_name("<record>"),
                expected: "object".to_string(),
                got: json_kind(payload).to_string(),
                value: payload.clone(),
            }])
        }
    };

    let mut errors: Vec<FieldError> = Vec::new();
    let mut assignments = Vec::new();

    let mut unknown: Vec<&String> = obj
        .keys()
        .filter(|k| !columns.iter().any(|c| c.input_name() == k.as_str()))
        .collect();
    unknown.sort();
    for key in unknown {
        errors.push(FieldError {
            index,
            field: field_name(key),
            expected: "known field".to_string(),
            got: "unknown field".to_string(),
            value: obj[key.as_str()].clone(),
        });
    }

    for col in columns.iter().filter(|c| c.is_writable()) {
        let input = col.input_name();
        let value = match obj.get(input) {
            Some(v) => v,
            None => {
                if mode == WriteMode::Create && col.required {
                    errors.push(FieldError {
                        index,
                        field: field_name(input),
                        expected: "present".to_string(),
                        got: "missing".to_string(),
                        value: JsonValue::Null,
                    });
                }
                continue;
            }
        };

        let blank = value.is_null() || value.as_str().map(|s| s.trim().is_empty()).unwrap_or(false);
        if col.required && blank {
            errors.push(FieldError {
                index,
                field: field_name(input),
                expected: "non-empty value".to_string(),
                got: json_kind(value).to_string(),
                value: value.clone(),
            });
            continue;
        }

        match col.access {
            Access::Secret { .. } => match value.as_str() {
                Some(s) if !s.is_empty() => match hash_password(s) {
                    Ok(hashed) => assignments.push((col.name, SqlValue::Text(hashed))),
                    Err(e) => errors.push(FieldError {
                        index,
                        field: field_name(input),
                        expected: format!("password accepted by the hasher ({})", e),
                        got: json_kind(value).to_string(),
                        value: JsonValue::Null,
                    }),
                },
                _ => errors.push(FieldError {
                    index,
                    field: field_name(input),
                    expected: "non-empty string".to_string(),
                    got: json_kind(value).to_string(),
                    value: JsonValue::Null,
                }),
            },
            _ => match coerce_scalar_for_type(col.col_type, value) {
                Ok(v) => assignments.push((col.name, v)),
                Err(msg) => errors.push(FieldError {
                    index,
                    field: field_name(input),
                    expected: msg,
                    got: json_kind(value).to_string(),
                    value: value.clone(),
                }),
            },
        }
    }

    if errors.is_empty() {
        Ok(PreparedWrite { assignments })
    } else {
        Err(errors)
    }
}
