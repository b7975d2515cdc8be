//! Parameterized SQL construction on top of `sqlx::QueryBuilder`.
//!
//! Identifiers pushed here always come from static model definitions; every caller-supplied
//! value goes through `push_bind`.

use crate::domain::model::{ChildDef, ColumnDef, ColumnType, EntityModel};
use crate::domain::query::{FilterValue, FilterValues, ListQuery, Predicate};
use sqlx::{Postgres, QueryBuilder};

/// Renders a row as a JSON object over the rendered (non-secret) columns.
///
/// NUMERIC columns go out as text so decimal scale survives (`100.00`, not `100.0`).
pub fn push_record_object(qb: &mut QueryBuilder<'_, Postgres>, columns: &[ColumnDef]) {
    qb.push("jsonb_build_object(");
    for (i, col) in columns.iter().filter(|c| c.is_rendered()).enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        qb.push("'").push(col.name).push("', ").push(col.name);
        if col.col_type == ColumnType::Decimal {
            qb.push("::text");
        }
    }
    qb.push(")");
}

fn push_filter_value(qb: &mut QueryBuilder<'_, Postgres>, value: &FilterValue) {
    match value {
        FilterValue::Int(v) => {
            qb.push_bind(*v);
        }
        FilterValue::Text(v) => {
            qb.push_bind(v.clone());
        }
        FilterValue::Date(v) => {
            qb.push_bind(*v);
        }
        FilterValue::Decimal(v) => {
            qb.push_bind(*v);
        }
        FilterValue::Bool(v) => {
            qb.push_bind(*v);
        }
    }
}

fn push_filter_values(qb: &mut QueryBuilder<'_, Postgres>, values: &FilterValues) {
    match values {
        FilterValues::Int(v) => {
            qb.push_bind(v.clone());
        }
        FilterValues::Text(v) => {
            qb.push_bind(v.clone());
        }
        FilterValues::Date(v) => {
            qb.push_bind(v.clone());
        }
        FilterValues::Decimal(v) => {
            qb.push_bind(v.clone());
        }
        FilterValues::Bool(v) => {
            qb.push_bind(v.clone());
        }
    }
}

pub fn push_where(qb: &mut QueryBuilder<'_, Postgres>, predicates: &[Predicate]) {
    for (i, predicate) in predicates.iter().enumerate() {
        qb.push(if i == 0 { " WHERE " } else { " AND " });
        match predicate {
            Predicate::Equals { column, value } => {
                qb.push(*column).push(" = ");
                push_filter_value(qb, value);
            }
            Predicate::Contains { column, pattern } => {
                qb.push(*column).push(" ILIKE ").push_bind(pattern.clone());
            }
            Predicate::Gte { column, value } => {
                qb.push(*column).push(" >= ");
                push_filter_value(qb, value);
            }
            Predicate::Lte { column, value } => {
                qb.push(*column).push(" <= ");
                push_filter_value(qb, value);
            }
            Predicate::AnyOf { column, values } => {
                qb.push(*column).push(" = ANY(");
                push_filter_values(qb, values);
                qb.push(")");
            }
        }
    }
}

/// `SELECT count(*)` over the filtered, unpaginated set.
pub fn count_query(model: &dyn EntityModel, query: &ListQuery) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT count(*) FROM ");
    qb.push(model.table_name());
    push_where(&mut qb, &query.predicates);
    qb
}

/// Sorted, sliced page of records. Ties on the sort column break on the primary key.
pub fn rows_query(model: &dyn EntityModel, query: &ListQuery) -> QueryBuilder<'static, Postgres> {
    let pk = model.primary_key_field();
    let mut qb = QueryBuilder::new("SELECT ");
    push_record_object(&mut qb, model.columns());
    qb.push(" AS record FROM ").push(model.table_name());
    push_where(&mut qb, &query.predicates);

    qb.push(" ORDER BY ")
        .push(query.sort.column)
        .push(" ")
        .push(query.sort.direction.as_sql());
    if query.sort.column != pk {
        qb.push(", ").push(pk).push(" ASC");
    }

    qb.push(" LIMIT ")
        .push_bind(query.page.limit as i64)
        .push(" OFFSET ")
        .push_bind(query.page.offset());
    qb
}

pub fn select_by_id(model: &dyn EntityModel, id: i64) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT ");
    push_record_object(&mut qb, model.columns());
    qb.push(" AS record FROM ")
        .push(model.table_name())
        .push(" WHERE ")
        .push(model.primary_key_field())
        .push(" = ")
        .push_bind(id);
    qb
}

pub fn select_children(child: &ChildDef, parent_id: i64) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT ");
    push_record_object(&mut qb, child.columns);
    qb.push(" AS record FROM ")
        .push(child.table_name)
        .push(" WHERE ")
        .push(child.parent_fk)
        .push(" = ")
        .push_bind(parent_id)
        .push(" ORDER BY ")
        .push(child.ordinal_column)
        .push(" ASC");
    qb
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::TableModel;
    use crate::domain::query::{FilterField, Page, SortDirection, SortSpec, ValueType};
    use rust_decimal::Decimal;

    const COLUMNS: &[ColumnDef] = &[
        ColumnDef::new("id", ColumnType::BigInt).read_only(),
        ColumnDef::new("name", ColumnType::Text).required(),
        ColumnDef::new("amount", ColumnType::Decimal),
        ColumnDef::new("secret_hash", ColumnType::Text).secret("secret"),
        ColumnDef::new("created_at", ColumnType::Timestamptz).read_only(),
    ];

    const THINGS: TableModel = TableModel {
        name: "things",
        table_name: "things",
        columns: COLUMNS,
        filters: &[
            FilterField::contains("name"),
            FilterField::range("amount", ValueType::Decimal),
        ],
        sortable: &["id", "created_at"],
        default_sort: SortSpec {
            column: "id",
            direction: SortDirection::Asc,
        },
        children: None,
        derived: None,
        create_table_sql: "",
    };

    fn query(predicates: Vec<Predicate>, sort: SortSpec) -> ListQuery {
        ListQuery {
            predicates,
            sort,
            page: Page { page: 2, limit: 5 },
        }
    }

    #[test]
    fn rows_query_binds_every_value_and_hides_secrets() {
        let q = query(
            vec![
                Predicate::Contains {
                    column: "name",
                    pattern: "%a%".into(),
                },
                Predicate::Gte {
                    column: "amount",
                    value: FilterValue::Decimal(Decimal::new(1000, 2)),
                },
            ],
            SortSpec {
                column: "created_at",
                direction: SortDirection::Desc,
            },
        );
        let qb = rows_query(&THINGS, &q);
        assert_eq!(
            qb.sql(),
            "SELECT jsonb_build_object('id', id, 'name', name, 'amount', amount::text, 'created_at', created_at) \
             AS record FROM things WHERE name ILIKE $1 AND amount >= $2 \
             ORDER BY created_at DESC, id ASC LIMIT $3 OFFSET $4"
        );
    }

    #[test]
    fn count_query_shares_the_predicate() {
        let q = query(
            vec![Predicate::AnyOf {
                column: "id",
                values: FilterValues::Int(vec![1, 2]),
            }],
            THINGS.default_sort,
        );
        assert_eq!(
            count_query(&THINGS, &q).sql(),
            "SELECT count(*) FROM things WHERE id = ANY($1)"
        );
    }

    #[test]
    fn no_tie_breaker_when_sorting_by_primary_key() {
        let q = query(Vec::new(), THINGS.default_sort);
        assert!(rows_query(&THINGS, &q)
            .sql()
            .ends_with("FROM things ORDER BY id ASC LIMIT $1 OFFSET $2"));
    }

    #[test]
    fn select_by_id_filters_on_primary_key() {
        assert!(select_by_id(&THINGS, 9)
            .sql()
            .ends_with("AS record FROM things WHERE id = $1"));
    }
}
