//! Keeps a stored status flag consistent with the sum of the rows that feed it.
//!
//! For fees this means `fees.paid = sum(payments.amount) >= fees.amount`. The recompute runs
//! inside the caller's transaction, after the payment write, so the flag and the payments
//! it summarizes always commit together.

use crate::domain::model::DerivedStatusDef;
use crate::error::AppResult;
use rust_decimal::Decimal;
use serde_json::{Map, Value as JsonValue};
use sqlx::PgConnection;

#[derive(Debug, Clone, PartialEq)]
pub struct DerivedStatus {
    pub target_id: i64,
    pub amount: Decimal,
    pub paid_total: Decimal,
    pub remaining_amount: Decimal,
    pub paid: bool,
}

impl DerivedStatus {
    /// Pure evaluation of the status for a target amount and the total applied against it.
    pub fn evaluate(target_id: i64, amount: Decimal, paid_total: Decimal) -> Self {
        let scale = amount.scale().max(paid_total.scale());
        let mut remaining = if paid_total >= amount {
            Decimal::ZERO
        } else {
            amount - paid_total
        };
        remaining.rescale(scale);
        Self {
            target_id,
            amount,
            paid_total,
            remaining_amount: remaining,
            paid: paid_total >= amount,
        }
    }

    /// Renders as `{<source fk>: id, amount, paid_total, remaining_amount, paid}`.
    pub fn to_json(&self, def: &DerivedStatusDef) -> JsonValue {
        let mut out = Map::new();
        out.insert(def.source_fk.to_string(), JsonValue::from(self.target_id));
        out.insert("amount".into(), JsonValue::from(self.amount.to_string()));
        out.insert("paid_total".into(), JsonValue::from(self.paid_total.to_string()));
        out.insert(
            "remaining_amount".into(),
            JsonValue::from(self.remaining_amount.to_string()),
        );
        out.insert(def.target_flag.to_string(), JsonValue::from(self.paid));
        JsonValue::Object(out)
    }
}

/// Recomputes and, if it changed, stores the flag for one target row.
///
/// The target row is locked `FOR NO KEY UPDATE` first so concurrent payments against the same
/// fee serialize here instead of both reading a stale total. Returns `None` if the target is gone.
pub async fn recompute(
    conn: &mut PgConnection,
    def: &DerivedStatusDef,
    target_id: i64,
) -> AppResult<Option<DerivedStatus>> {
    let amount: Option<Decimal> = sqlx::query_scalar(&format!(
        "SELECT {} FROM {} WHERE id = $1 FOR NO KEY UPDATE",
        def.target_amount, def.target_table
    ))
    .bind(target_id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(amount) = amount else {
        return Ok(None);
    };

    let paid_total: Decimal = sqlx::query_scalar(&format!(
        "SELECT COALESCE(SUM({}), 0)::numeric FROM {} WHERE {} = $1",
        def.source_amount, def.source_table, def.source_fk
    ))
    .bind(target_id)
    .fetch_one(&mut *conn)
    .await?;

    let status = DerivedStatus::evaluate(target_id, amount, paid_total);

    let changed = sqlx::query(&format!(
        "UPDATE {} SET {flag} = $1 WHERE id = $2 AND {flag} IS DISTINCT FROM $1",
        def.target_table,
        flag = def.target_flag
    ))
    .bind(status.paid)
    .bind(target_id)
    .execute(&mut *conn)
    .await?
    .rows_affected();

    tracing::debug!(
        table = def.target_table,
        id = target_id,
        paid = status.paid,
        changed = changed > 0,
        "derived status recomputed"
    );

    Ok(Some(status))
}
