//! Entity model definitions: table layout, writable columns, filter/sort allow-lists.

use crate::domain::query::{FilterField, SortDirection, SortSpec};
use serde::Serialize;
use utoipa::ToSchema;

pub mod catalog;
pub mod registry;

pub use catalog::TableModel;
pub use registry::ModelRegistry;

/// Postgres column types the service knows how to coerce, bind and render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Text,
    Int,
    BigInt,
    Bool,
    Date,
    Timestamptz,
    Decimal,
}

impl ColumnType {
    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnType::Text => "TEXT",
            ColumnType::Int => "INTEGER",
            ColumnType::BigInt => "BIGINT",
            ColumnType::Bool => "BOOLEAN",
            ColumnType::Date => "DATE",
            ColumnType::Timestamptz => "TIMESTAMPTZ",
            ColumnType::Decimal => "NUMERIC",
        }
    }
}

/// How a column participates in reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    ReadWrite,
    /// Server-computed (ids, timestamps, derived flags, ordinals). Ignored on input.
    ReadOnly,
    /// Accepted on input under `input`, stored hashed, never rendered.
    Secret { input: &'static str },
}

#[derive(Debug, Clone, Copy)]
pub struct ColumnDef {
    pub name: &'static str,
    pub col_type: ColumnType,
    pub required: bool,
    /// Table whose `id` this column must point at.
    pub references: Option<&'static str>,
    pub access: Access,
}

impl ColumnDef {
    pub const fn new(name: &'static str, col_type: ColumnType) -> Self {
        Self {
            name,
            col_type,
            required: false,
            references: None,
            access: Access::ReadWrite,
        }
    }

    pub const fn required(self) -> Self {
        Self {
            required: true,
            ..self
        }
    }

    pub const fn references(self, table: &'static str) -> Self {
        Self {
            references: Some(table),
            ..self
        }
    }

    pub const fn read_only(self) -> Self {
        Self {
            access: Access::ReadOnly,
            ..self
        }
    }

    pub const fn secret(self, input: &'static str) -> Self {
        Self {
            access: Access::Secret { input },
            ..self
        }
    }

    /// Name the column is addressed by in request bodies.
    pub fn input_name(&self) -> &'static str {
        match self.access {
            Access::Secret { input } => input,
            _ => self.name,
        }
    }

    pub fn is_writable(&self) -> bool {
        !matches!(self.access, Access::ReadOnly)
    }

    pub fn is_rendered(&self) -> bool {
        !matches!(self.access, Access::Secret { .. })
    }
}

/// Ordered child rows owned by a parent record (order details, voucher lines).
#[derive(Debug, Clone, Copy)]
pub struct ChildDef {
    /// Key under which children travel in request and response bodies.
    pub key: &'static str,
    pub table_name: &'static str,
    pub parent_fk: &'static str,
    pub ordinal_column: &'static str,
    pub columns: &'static [ColumnDef],
    pub create_table_sql: &'static str,
}

/// A stored flag on `target_table` that must equal `sum(source.amount) >= target.amount`.
#[derive(Debug, Clone, Copy)]
pub struct DerivedStatusDef {
    pub source_table: &'static str,
    pub source_fk: &'static str,
    pub source_amount: &'static str,
    pub target_table: &'static str,
    pub target_amount: &'static str,
    pub target_flag: &'static str,
    /// Key under which the recomputed status is attached to write responses.
    pub response_key: &'static str,
}

/// Which side of a derived-status relationship a model sits on.
#[derive(Debug, Clone, Copy)]
pub enum DerivedLink {
    /// Writes to this model change the status of the row its `source_fk` points at.
    Source(&'static DerivedStatusDef),
    /// This model stores the flag; writes to its amount require a recompute of itself.
    Target(&'static DerivedStatusDef),
}

/// Trait that defines the contract for any entity served by the generic CRUD routes.
///
/// Each model provides:
/// - Table name and primary key information
/// - SQL schema definition
/// - Column, filter and sort allow-lists
pub trait EntityModel: Send + Sync {
    /// Route segment under `/api/`.
    fn name(&self) -> &str;

    fn table_name(&self) -> &str;

    fn primary_key_field(&self) -> &str {
        "id"
    }

    fn get_create_table_sql(&self) -> &str;

    fn columns(&self) -> &[ColumnDef];

    fn filters(&self) -> &[FilterField];

    fn sortable(&self) -> &[&'static str];

    fn default_sort(&self) -> SortSpec {
        SortSpec {
            column: "id",
            direction: SortDirection::Asc,
        }
    }

    fn children(&self) -> Option<&ChildDef> {
        None
    }

    fn derived_status(&self) -> Option<DerivedLink> {
        None
    }

    fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns().iter().find(|c| c.name == name)
    }
}
