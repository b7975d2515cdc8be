//! Row-level write primitives shared by every entity, plus the parent/child request shape.
//!
//! Everything here takes a `PgConnection` borrowed from an open transaction; committing or
//! rolling back is the caller's job.

use crate::domain::model::{ChildDef, ColumnDef, EntityModel};
use crate::domain::query::builder;
use crate::domain::values::{prepare_write, FieldError, PreparedWrite, SqlValue, WriteMode};
use crate::error::{AppError, AppResult};
use serde_json::Value as JsonValue;
use sqlx::{PgConnection, Postgres, QueryBuilder};

const HEADER_KEY: &str = "header";

/// A validated write for one parent row and, optionally, its complete child set.
///
/// `children` is `None` when the request did not mention the child collection at all; on
/// update that leaves existing children untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParentChildWriteRequest {
    pub header: PreparedWrite,
    pub children: Option<Vec<PreparedWrite>>,
}

impl ParentChildWriteRequest {
    /// Accepts either `{header: {...}, <child key>: [...]}` or the header fields inline next to
    /// the child array. Every header and child problem is reported together.
    pub fn from_payload(
        model: &dyn EntityModel,
        payload: &JsonValue,
        mode: WriteMode,
    ) -> AppResult<Self> {
        let obj = payload
            .as_object()
            .ok_or_else(|| AppError::validation("Request body must be a JSON object"))?;

        let Some(child) = model.children() else {
            let header = prepare_write(model.columns(), payload, mode, 0, None)
                .map_err(AppError::InvalidFields)?;
            return Ok(Self {
                header,
                children: None,
            });
        };

        let mut errors: Vec<FieldError> = Vec::new();

        let header_value = match obj.get(HEADER_KEY) {
            Some(h) => {
                for key in obj.keys().filter(|k| *k != HEADER_KEY && *k != child.key) {
                    errors.push(FieldError {
                        index: 0,
                        field: key.clone(),
                        expected: format!("'{}' or '{}'", HEADER_KEY, child.key),
                        got: "unknown field".to_string(),
                        value: obj[key.as_str()].clone(),
                    });
                }
                h.clone()
            }
            None => {
                let mut inline = obj.clone();
                inline.remove(child.key);
                JsonValue::Object(inline)
            }
        };

        let header = match prepare_write(model.columns(), &header_value, mode, 0, None) {
            Ok(h) => Some(h),
            Err(mut e) => {
                errors.append(&mut e);
                None
            }
        };

        let children = match obj.get(child.key) {
            None if mode == WriteMode::Create => Some(Vec::new()),
            None => None,
            Some(JsonValue::Array(items)) => {
                let mut rows = Vec::with_capacity(items.len());
                for (idx, item) in items.iter().enumerate() {
                    match prepare_write(child.columns, item, WriteMode::Create, idx, Some(child.key)) {
                        Ok(row) => rows.push(row),
                        Err(mut e) => errors.append(&mut e),
                    }
                }
                Some(rows)
            }
            Some(other) => {
                errors.push(FieldError {
                    index: 0,
                    field: child.key.to_string(),
                    expected: "array".to_string(),
                    got: "non-array".to_string(),
                    value: other.clone(),
                });
                None
            }
        };

        match header {
            Some(header) if errors.is_empty() => Ok(Self { header, children }),
            _ => Err(AppError::InvalidFields(errors)),
        }
    }
}

/// Confirms that every non-null foreign key in `write` points at an existing row.
///
/// `position` labels child rows in the error (`details[1].item_id`).
pub async fn verify_references(
    conn: &mut PgConnection,
    columns: &[ColumnDef],
    write: &PreparedWrite,
    position: Option<(&str, usize)>,
) -> AppResult<()> {
    for (column, table, id) in write.references(columns) {
        let exists: bool = sqlx::query_scalar(&format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE id = $1)",
            table
        ))
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;

        if !exists {
            let field = match position {
                Some((key, idx)) => format!("{}[{}].{}", key, idx, column),
                None => column.to_string(),
            };
            return Err(AppError::InvalidReference {
                field,
                table: table.to_string(),
                id,
            });
        }
    }
    Ok(())
}

fn push_insert(
    qb: &mut QueryBuilder<'static, Postgres>,
    table: &str,
    leading: &[(&'static str, SqlValue)],
    write: &PreparedWrite,
) {
    qb.push("INSERT INTO ").push(table);
    let all: Vec<&(&'static str, SqlValue)> =
        leading.iter().chain(write.assignments.iter()).collect();
    if all.is_empty() {
        qb.push(" DEFAULT VALUES");
        return;
    }
    qb.push(" (");
    for (i, (column, _)) in all.iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        qb.push(*column);
    }
    qb.push(") VALUES (");
    for (i, (_, value)) in all.iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        value.push_bind(qb);
    }
    qb.push(")");
}

/// Inserts one row and returns its generated id.
pub async fn insert_row(
    conn: &mut PgConnection,
    model: &dyn EntityModel,
    write: &PreparedWrite,
) -> AppResult<i64> {
    let mut qb = QueryBuilder::new("");
    push_insert(&mut qb, model.table_name(), &[], write);
    qb.push(" RETURNING ").push(model.primary_key_field());
    let id: i64 = qb.build_query_scalar().fetch_one(&mut *conn).await?;
    Ok(id)
}

/// Applies the assignments to one row. Returns `false` if no row has that id.
pub async fn update_row(
    conn: &mut PgConnection,
    model: &dyn EntityModel,
    id: i64,
    write: &PreparedWrite,
) -> AppResult<bool> {
    if write.is_empty() {
        return row_exists(conn, model.table_name(), model.primary_key_field(), id).await;
    }
    let mut qb = QueryBuilder::new("UPDATE ");
    qb.push(model.table_name()).push(" SET ");
    for (i, (column, value)) in write.assignments.iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        qb.push(*column).push(" = ");
        value.push_bind(&mut qb);
    }
    qb.push(" WHERE ")
        .push(model.primary_key_field())
        .push(" = ")
        .push_bind(id);
    let affected = qb.build().execute(&mut *conn).await?.rows_affected();
    Ok(affected > 0)
}

pub async fn row_exists(
    conn: &mut PgConnection,
    table: &str,
    pk: &str,
    id: i64,
) -> AppResult<bool> {
    let exists: bool = sqlx::query_scalar(&format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = $1)",
        table, pk
    ))
    .bind(id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(exists)
}

/// Inserts children in slice order with ordinals `1..=n`. Ordinals sent by the client never
/// reach this point (the column is read-only).
pub async fn insert_children(
    conn: &mut PgConnection,
    child: &ChildDef,
    parent_id: i64,
    rows: &[PreparedWrite],
) -> AppResult<()> {
    for (idx, row) in rows.iter().enumerate() {
        let line_nbr = i32::try_from(idx + 1)
            .map_err(|_| AppError::validation(format!("Too many '{}' rows", child.key)))?;
        let leading = [
            (child.parent_fk, SqlValue::BigInt(parent_id)),
            (child.ordinal_column, SqlValue::Int(line_nbr)),
        ];
        let mut qb = QueryBuilder::new("");
        push_insert(&mut qb, child.table_name, &leading, row);
        qb.build().execute(&mut *conn).await?;
    }
    Ok(())
}

/// Replaces the whole child set: delete, then renumbered insert.
pub async fn replace_children(
    conn: &mut PgConnection,
    child: &ChildDef,
    parent_id: i64,
    rows: &[PreparedWrite],
) -> AppResult<()> {
    sqlx::query(&format!(
        "DELETE FROM {} WHERE {} = $1",
        child.table_name, child.parent_fk
    ))
    .bind(parent_id)
    .execute(&mut *conn)
    .await?;
    insert_children(conn, child, parent_id, rows).await
}

pub async fn fetch_children(
    conn: &mut PgConnection,
    child: &ChildDef,
    parent_id: i64,
) -> AppResult<Vec<JsonValue>> {
    let rows: Vec<JsonValue> = builder::select_children(child, parent_id)
        .build_query_scalar()
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows)
}

pub async fn fetch_record(
    conn: &mut PgConnection,
    model: &dyn EntityModel,
    id: i64,
) -> AppResult<Option<JsonValue>> {
    let record: Option<JsonValue> = builder::select_by_id(model, id)
        .build_query_scalar()
        .fetch_optional(&mut *conn)
        .await?;
    Ok(record)
}
