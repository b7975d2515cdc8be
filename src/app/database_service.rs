//! The data service behind every `/api/{entity}` route.
//!
//! This module sits between the HTTP handlers and PostgreSQL. It is responsible for:
//! 1.  Applying each model's DDL at startup.
//! 2.  Paged, filtered reads where the count and the page come from one snapshot.
//! 3.  Parent + child writes in a single transaction, with foreign references checked first.
//! 4.  Recomputing derived status flags in the same transaction as the write that moved them.

use crate::app::derived::{self, DerivedStatus};
use crate::app::writer::{self, ParentChildWriteRequest};
use crate::domain::model::{DerivedLink, DerivedStatusDef, EntityModel, ModelRegistry};
use crate::domain::query::{builder, ListQuery, PagedResult, Pagination};
use crate::domain::values::WriteMode;
use crate::error::{AppError, AppResult};
use crate::infra::config::AppConfig;
use serde_json::Value as JsonValue;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgConnection, PgPool};

// Arbitrary constant lock ID (must be stable across instances).
const SCHEMA_LOCK_ID: i64 = 4_240_001;

/// Result of a create or update: the stored record (children embedded) and, for models that
/// feed a derived status, the recomputed status keyed by its response name.
#[derive(Debug, Clone)]
pub struct WriteOutcome {
    pub id: i64,
    pub record: JsonValue,
    pub derived: Option<(&'static str, JsonValue)>,
}

impl WriteOutcome {
    /// Record with the derived status attached under its response key.
    pub fn into_json(self) -> JsonValue {
        let mut record = self.record;
        if let (Some((key, status)), Some(obj)) = (self.derived, record.as_object_mut()) {
            obj.insert(key.to_string(), status);
        }
        record
    }
}

pub struct DatabaseService {
    pool: PgPool,
}

impl DatabaseService {
    /// Creates a new instance of the DatabaseService and connects to the database.
    pub async fn new(config: &AppConfig) -> Result<Self, anyhow::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .connect(&config.database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Applies every model's `CREATE TABLE IF NOT EXISTS` in dependency order.
    ///
    /// A transaction-scoped advisory lock keeps two instances starting together from racing
    /// on the catalog.
    pub async fn ensure_schema(&self, registry: &ModelRegistry) -> AppResult<usize> {
        let statements = registry.get_all_create_table_sql();
        let mut tx = self.pool.begin().await?;
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(SCHEMA_LOCK_ID)
            .execute(&mut *tx)
            .await?;
        for ddl in &statements {
            sqlx::query(ddl).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        tracing::info!(tables = statements.len(), "schema ensured");
        Ok(statements.len())
    }

    /// One page of records plus the unpaginated count, read from a single snapshot.
    pub async fn list(
        &self,
        model: &dyn EntityModel,
        query: &ListQuery,
    ) -> AppResult<PagedResult<JsonValue>> {
        tracing::debug!(
            entity = model.name(),
            predicates = ?query.predicates,
            sort = ?query.sort,
            page = query.page.page,
            limit = query.page.limit,
            "list query"
        );

        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;

        let total: i64 = builder::count_query(model, query)
            .build_query_scalar()
            .fetch_one(&mut *tx)
            .await?;
        let rows: Vec<JsonValue> = builder::rows_query(model, query)
            .build_query_scalar()
            .fetch_all(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(PagedResult {
            rows,
            pagination: Pagination::new(query.page, total),
        })
    }

    pub async fn get(&self, model: &dyn EntityModel, id: i64) -> AppResult<JsonValue> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;
        let record = load(&mut tx, model, id)
            .await?
            .ok_or_else(|| not_found(model, id))?;
        tx.commit().await?;
        Ok(record)
    }

    pub async fn create(&self, model: &dyn EntityModel, payload: &JsonValue) -> AppResult<WriteOutcome> {
        let request = ParentChildWriteRequest::from_payload(model, payload, WriteMode::Create)?;

        let mut tx = self.pool.begin().await?;
        check_references(&mut tx, model, &request).await?;

        let id = writer::insert_row(&mut tx, model, &request.header).await?;
        if let (Some(child), Some(rows)) = (model.children(), request.children.as_deref()) {
            writer::insert_children(&mut tx, child, id, rows).await?;
        }

        let derived = match model.derived_status() {
            Some(DerivedLink::Source(def)) => {
                let target = request
                    .header
                    .get(def.source_fk)
                    .and_then(|v| v.as_i64());
                match target {
                    Some(target) => derived::recompute(&mut tx, def, target)
                        .await?
                        .map(|status| attach(def, &status)),
                    None => None,
                }
            }
            Some(DerivedLink::Target(def)) => {
                derived::recompute(&mut tx, def, id).await?;
                None
            }
            None => None,
        };

        let record = load(&mut tx, model, id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("{} {} vanished after insert", model.name(), id)))?;
        tx.commit().await?;

        tracing::info!(entity = model.name(), id, "record created");
        Ok(WriteOutcome {
            id,
            record,
            derived,
        })
    }

    /// Updates the provided fields. A child array in the body replaces the whole child set.
    pub async fn update(
        &self,
        model: &dyn EntityModel,
        id: i64,
        payload: &JsonValue,
    ) -> AppResult<WriteOutcome> {
        let request = ParentChildWriteRequest::from_payload(model, payload, WriteMode::Update)?;
        if request.header.is_empty() && request.children.is_none() {
            return Err(AppError::validation("No updatable fields provided"));
        }

        let mut tx = self.pool.begin().await?;

        let previous_target = match model.derived_status() {
            Some(DerivedLink::Source(def)) => Some(
                lock_source_target(&mut tx, model, def, id)
                    .await?
                    .ok_or_else(|| not_found(model, id))?,
            ),
            _ => None,
        };

        check_references(&mut tx, model, &request).await?;

        if !writer::update_row(&mut tx, model, id, &request.header).await? {
            return Err(not_found(model, id));
        }
        if let (Some(child), Some(rows)) = (model.children(), request.children.as_deref()) {
            writer::replace_children(&mut tx, child, id, rows).await?;
        }

        let derived = match model.derived_status() {
            Some(DerivedLink::Source(def)) => {
                let current = request
                    .header
                    .get(def.source_fk)
                    .and_then(|v| v.as_i64())
                    .or(previous_target);
                if let Some(previous) = previous_target.filter(|p| Some(*p) != current) {
                    derived::recompute(&mut tx, def, previous).await?;
                }
                match current {
                    Some(target) => derived::recompute(&mut tx, def, target)
                        .await?
                        .map(|status| attach(def, &status)),
                    None => None,
                }
            }
            Some(DerivedLink::Target(def)) => {
                derived::recompute(&mut tx, def, id).await?;
                None
            }
            None => None,
        };

        let record = load(&mut tx, model, id)
            .await?
            .ok_or_else(|| not_found(model, id))?;
        tx.commit().await?;

        tracing::info!(entity = model.name(), id, "record updated");
        Ok(WriteOutcome {
            id,
            record,
            derived,
        })
    }

    /// Deletes one row (children cascade). Returns the recomputed status when the deleted row
    /// fed one.
    pub async fn delete(
        &self,
        model: &dyn EntityModel,
        id: i64,
    ) -> AppResult<Option<(&'static str, JsonValue)>> {
        let mut tx = self.pool.begin().await?;

        let source = match model.derived_status() {
            Some(DerivedLink::Source(def)) => Some((
                def,
                lock_source_target(&mut tx, model, def, id)
                    .await?
                    .ok_or_else(|| not_found(model, id))?,
            )),
            _ => None,
        };

        let affected = sqlx::query(&format!(
            "DELETE FROM {} WHERE {} = $1",
            model.table_name(),
            model.primary_key_field()
        ))
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        if affected == 0 {
            return Err(not_found(model, id));
        }

        let derived = match source {
            Some((def, target)) => derived::recompute(&mut tx, def, target)
                .await?
                .map(|status| attach(def, &status)),
            None => None,
        };

        tx.commit().await?;
        tracing::info!(entity = model.name(), id, "record deleted");
        Ok(derived)
    }
}

fn not_found(model: &dyn EntityModel, id: i64) -> AppError {
    AppError::not_found(format!("{} {} not found", model.name(), id))
}

fn attach(def: &'static DerivedStatusDef, status: &DerivedStatus) -> (&'static str, JsonValue) {
    (def.response_key, status.to_json(def))
}

/// Reads the record and embeds its children, ordered by ordinal.
async fn load(conn: &mut PgConnection, model: &dyn EntityModel, id: i64) -> AppResult<Option<JsonValue>> {
    let Some(mut record) = writer::fetch_record(&mut *conn, model, id).await? else {
        return Ok(None);
    };
    if let Some(child) = model.children() {
        let rows = writer::fetch_children(&mut *conn, child, id).await?;
        if let Some(obj) = record.as_object_mut() {
            obj.insert(child.key.to_string(), JsonValue::Array(rows));
        }
    }
    Ok(Some(record))
}

async fn check_references(
    conn: &mut PgConnection,
    model: &dyn EntityModel,
    request: &ParentChildWriteRequest,
) -> AppResult<()> {
    writer::verify_references(&mut *conn, model.columns(), &request.header, None).await?;
    if let (Some(child), Some(rows)) = (model.children(), request.children.as_deref()) {
        for (idx, row) in rows.iter().enumerate() {
            writer::verify_references(&mut *conn, child.columns, row, Some((child.key, idx))).await?;
        }
    }
    Ok(())
}

/// Locks a source row and returns the target it currently points at. `None` if the row is absent.
async fn lock_source_target(
    conn: &mut PgConnection,
    model: &dyn EntityModel,
    def: &DerivedStatusDef,
    id: i64,
) -> AppResult<Option<i64>> {
    let target: Option<i64> = sqlx::query_scalar(&format!(
        "SELECT {} FROM {} WHERE {} = $1 FOR UPDATE",
        def.source_fk,
        model.table_name(),
        model.primary_key_field()
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn derived_status_is_attached_under_its_key() {
        let outcome = WriteOutcome {
            id: 5,
            record: json!({ "id": 5, "amount": "60.00" }),
            derived: Some(("fee_status", json!({ "fee_id": 1, "paid": false }))),
        };
        assert_eq!(
            outcome.into_json(),
            json!({ "id": 5, "amount": "60.00", "fee_status": { "fee_id": 1, "paid": false } })
        );
    }

    #[test]
    fn plain_records_pass_through() {
        let outcome = WriteOutcome {
            id: 1,
            record: json!({ "id": 1 }),
            derived: None,
        };
        assert_eq!(outcome.into_json(), json!({ "id": 1 }));
    }
}
