//! Static definitions for every entity served under `/api/`.

use super::{ChildDef, ColumnDef, ColumnType, DerivedLink, DerivedStatusDef, EntityModel};
use crate::domain::query::{FilterField, SortDirection, SortSpec, ValueType};

use ColumnType::{BigInt, Bool, Date, Decimal, Int, Text, Timestamptz};

/// Table-backed model described entirely by static data.
#[derive(Debug, Clone, Copy)]
pub struct TableModel {
    pub name: &'static str,
    pub table_name: &'static str,
    pub columns: &'static [ColumnDef],
    pub filters: &'static [FilterField],
    pub sortable: &'static [&'static str],
    pub default_sort: SortSpec,
    pub children: Option<ChildDef>,
    pub derived: Option<DerivedLink>,
    pub create_table_sql: &'static str,
}

impl EntityModel for TableModel {
    fn name(&self) -> &str {
        self.name
    }

    fn table_name(&self) -> &str {
        self.table_name
    }

    fn get_create_table_sql(&self) -> &str {
        self.create_table_sql
    }

    fn columns(&self) -> &[ColumnDef] {
        self.columns
    }

    fn filters(&self) -> &[FilterField] {
        self.filters
    }

    fn sortable(&self) -> &[&'static str] {
        self.sortable
    }

    fn default_sort(&self) -> SortSpec {
        self.default_sort
    }

    fn children(&self) -> Option<&ChildDef> {
        self.children.as_ref()
    }

    fn derived_status(&self) -> Option<DerivedLink> {
        self.derived
    }
}

const ID: ColumnDef = ColumnDef::new("id", BigInt).read_only();
const CREATED_AT: ColumnDef = ColumnDef::new("created_at", Timestamptz).read_only();

const BY_ID: SortSpec = SortSpec {
    column: "id",
    direction: SortDirection::Asc,
};

/// `fees.paid` tracks whether the payments recorded against a fee cover its amount.
pub const FEE_STATUS: DerivedStatusDef = DerivedStatusDef {
    source_table: "payments",
    source_fk: "fee_id",
    source_amount: "amount",
    target_table: "fees",
    target_amount: "amount",
    target_flag: "paid",
    response_key: "fee_status",
};

pub static USERS: TableModel = TableModel {
    name: "users",
    table_name: "users",
    columns: &[
        ID,
        ColumnDef::new("username", Text).required(),
        ColumnDef::new("full_name", Text).required(),
        ColumnDef::new("email", Text),
        ColumnDef::new("role", Text),
        ColumnDef::new("active", Bool),
        ColumnDef::new("password_hash", Text).secret("password").required(),
        ColumnDef::new("is_break_glass", Bool).read_only(),
        CREATED_AT,
    ],
    filters: &[
        FilterField::equals("id", ValueType::Id),
        FilterField::contains("username"),
        FilterField::contains("full_name"),
        FilterField::one_of("role", ValueType::Text),
        FilterField::equals("active", ValueType::Bool),
    ],
    sortable: &["id", "username", "full_name", "created_at"],
    default_sort: BY_ID,
    children: None,
    derived: None,
    create_table_sql: "CREATE TABLE IF NOT EXISTS users (
        id BIGSERIAL PRIMARY KEY,
        username TEXT NOT NULL UNIQUE,
        full_name TEXT NOT NULL,
        email TEXT,
        role TEXT NOT NULL DEFAULT 'staff',
        active BOOLEAN NOT NULL DEFAULT TRUE,
        password_hash TEXT NOT NULL,
        is_break_glass BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
};

pub static LOCALES: TableModel = TableModel {
    name: "locales",
    table_name: "locales",
    columns: &[
        ID,
        ColumnDef::new("name", Text).required(),
        ColumnDef::new("address", Text),
        ColumnDef::new("phone", Text),
        ColumnDef::new("active", Bool),
        CREATED_AT,
    ],
    filters: &[
        FilterField::equals("id", ValueType::Id),
        FilterField::contains("name"),
        FilterField::equals("active", ValueType::Bool),
    ],
    sortable: &["id", "name", "created_at"],
    default_sort: BY_ID,
    children: None,
    derived: None,
    create_table_sql: "CREATE TABLE IF NOT EXISTS locales (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL,
        address TEXT,
        phone TEXT,
        active BOOLEAN NOT NULL DEFAULT TRUE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
};

pub static PARENTS: TableModel = TableModel {
    name: "parents",
    table_name: "parents",
    columns: &[
        ID,
        ColumnDef::new("first_name", Text).required(),
        ColumnDef::new("last_name", Text).required(),
        ColumnDef::new("document_number", Text),
        ColumnDef::new("phone", Text),
        ColumnDef::new("email", Text),
        CREATED_AT,
    ],
    filters: &[
        FilterField::equals("id", ValueType::Id),
        FilterField::contains("first_name"),
        FilterField::contains("last_name"),
        FilterField::equals("document_number", ValueType::Text),
    ],
    sortable: &["id", "last_name", "first_name", "created_at"],
    default_sort: BY_ID,
    children: None,
    derived: None,
    create_table_sql: "CREATE TABLE IF NOT EXISTS parents (
        id BIGSERIAL PRIMARY KEY,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        document_number TEXT UNIQUE,
        phone TEXT,
        email TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
};

pub static STUDENTS: TableModel = TableModel {
    name: "students",
    table_name: "students",
    columns: &[
        ID,
        ColumnDef::new("first_name", Text).required(),
        ColumnDef::new("last_name", Text).required(),
        ColumnDef::new("document_number", Text),
        ColumnDef::new("birth_date", Date),
        ColumnDef::new("locale_id", BigInt).required().references("locales"),
        ColumnDef::new("parent_id", BigInt).references("parents"),
        ColumnDef::new("active", Bool),
        CREATED_AT,
    ],
    filters: &[
        FilterField::equals("id", ValueType::Id),
        FilterField::equals("locale_id", ValueType::Id),
        FilterField::equals("parent_id", ValueType::Id),
        FilterField::contains("first_name"),
        FilterField::contains("last_name"),
        FilterField::equals("document_number", ValueType::Text),
        FilterField::range("birth_date", ValueType::Date),
        FilterField::equals("active", ValueType::Bool),
    ],
    sortable: &["id", "last_name", "first_name", "birth_date", "created_at"],
    default_sort: BY_ID,
    children: None,
    derived: None,
    create_table_sql: "CREATE TABLE IF NOT EXISTS students (
        id BIGSERIAL PRIMARY KEY,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        document_number TEXT UNIQUE,
        birth_date DATE,
        locale_id BIGINT NOT NULL REFERENCES locales(id),
        parent_id BIGINT REFERENCES parents(id),
        active BOOLEAN NOT NULL DEFAULT TRUE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
};

pub static EMPLOYEES: TableModel = TableModel {
    name: "employees",
    table_name: "employees",
    columns: &[
        ID,
        ColumnDef::new("first_name", Text).required(),
        ColumnDef::new("last_name", Text).required(),
        ColumnDef::new("position", Text),
        ColumnDef::new("locale_id", BigInt).required().references("locales"),
        ColumnDef::new("hire_date", Date),
        ColumnDef::new("salary", Decimal),
        ColumnDef::new("active", Bool),
        CREATED_AT,
    ],
    filters: &[
        FilterField::equals("id", ValueType::Id),
        FilterField::equals("locale_id", ValueType::Id),
        FilterField::contains("first_name"),
        FilterField::contains("last_name"),
        FilterField::one_of("position", ValueType::Text),
        FilterField::range("hire_date", ValueType::Date),
        FilterField::range("salary", ValueType::Decimal),
        FilterField::equals("active", ValueType::Bool),
    ],
    sortable: &["id", "last_name", "hire_date", "salary", "created_at"],
    default_sort: BY_ID,
    children: None,
    derived: None,
    create_table_sql: "CREATE TABLE IF NOT EXISTS employees (
        id BIGSERIAL PRIMARY KEY,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        position TEXT,
        locale_id BIGINT NOT NULL REFERENCES locales(id),
        hire_date DATE,
        salary NUMERIC(12, 2) CHECK (salary >= 0),
        active BOOLEAN NOT NULL DEFAULT TRUE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
};

pub static ENROLLMENTS: TableModel = TableModel {
    name: "enrollments",
    table_name: "enrollments",
    columns: &[
        ID,
        ColumnDef::new("student_id", BigInt).required().references("students"),
        ColumnDef::new("locale_id", BigInt).required().references("locales"),
        ColumnDef::new("period", Text).required(),
        ColumnDef::new("enrolled_on", Date).required(),
        ColumnDef::new("status", Text),
        CREATED_AT,
    ],
    filters: &[
        FilterField::equals("id", ValueType::Id),
        FilterField::equals("student_id", ValueType::Id),
        FilterField::equals("locale_id", ValueType::Id),
        FilterField::equals("period", ValueType::Text),
        FilterField::one_of("status", ValueType::Text),
        FilterField::range("enrolled_on", ValueType::Date),
    ],
    sortable: &["id", "enrolled_on", "period", "created_at"],
    default_sort: BY_ID,
    children: None,
    derived: None,
    create_table_sql: "CREATE TABLE IF NOT EXISTS enrollments (
        id BIGSERIAL PRIMARY KEY,
        student_id BIGINT NOT NULL REFERENCES students(id),
        locale_id BIGINT NOT NULL REFERENCES locales(id),
        period TEXT NOT NULL,
        enrolled_on DATE NOT NULL,
        status TEXT NOT NULL DEFAULT 'active',
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        UNIQUE (student_id, period)
    )",
};

pub static FEES: TableModel = TableModel {
    name: "fees",
    table_name: "fees",
    columns: &[
        ID,
        ColumnDef::new("student_id", BigInt).required().references("students"),
        ColumnDef::new("description", Text).required(),
        ColumnDef::new("amount", Decimal).required(),
        ColumnDef::new("due_date", Date),
        ColumnDef::new("paid", Bool).read_only(),
        CREATED_AT,
    ],
    filters: &[
        FilterField::equals("id", ValueType::Id),
        FilterField::equals("student_id", ValueType::Id),
        FilterField::contains("description"),
        FilterField::range("due_date", ValueType::Date),
        FilterField::range("amount", ValueType::Decimal),
        FilterField::equals("paid", ValueType::Bool),
    ],
    sortable: &["id", "due_date", "amount", "created_at"],
    default_sort: BY_ID,
    children: None,
    derived: Some(DerivedLink::Target(&FEE_STATUS)),
    create_table_sql: "CREATE TABLE IF NOT EXISTS fees (
        id BIGSERIAL PRIMARY KEY,
        student_id BIGINT NOT NULL REFERENCES students(id),
        description TEXT NOT NULL,
        amount NUMERIC(12, 2) NOT NULL CHECK (amount >= 0),
        due_date DATE,
        paid BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
};

pub static PAYMENTS: TableModel = TableModel {
    name: "payments",
    table_name: "payments",
    columns: &[
        ID,
        ColumnDef::new("fee_id", BigInt).required().references("fees"),
        ColumnDef::new("amount", Decimal).required(),
        ColumnDef::new("paid_on", Date).required(),
        ColumnDef::new("method", Text),
        ColumnDef::new("reference", Text),
        CREATED_AT,
    ],
    filters: &[
        FilterField::equals("id", ValueType::Id),
        FilterField::equals("fee_id", ValueType::Id),
        FilterField::one_of("method", ValueType::Text),
        FilterField::range("paid_on", ValueType::Date),
        FilterField::range("amount", ValueType::Decimal),
    ],
    sortable: &["id", "paid_on", "amount", "created_at"],
    default_sort: BY_ID,
    children: None,
    derived: Some(DerivedLink::Source(&FEE_STATUS)),
    create_table_sql: "CREATE TABLE IF NOT EXISTS payments (
        id BIGSERIAL PRIMARY KEY,
        fee_id BIGINT NOT NULL REFERENCES fees(id),
        amount NUMERIC(12, 2) NOT NULL CHECK (amount > 0),
        paid_on DATE NOT NULL,
        method TEXT,
        reference TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
};

pub static ATTENDANCE: TableModel = TableModel {
    name: "attendance",
    table_name: "attendance",
    columns: &[
        ID,
        ColumnDef::new("student_id", BigInt).required().references("students"),
        ColumnDef::new("locale_id", BigInt).required().references("locales"),
        ColumnDef::new("attended_on", Date).required(),
        ColumnDef::new("status", Text).required(),
        ColumnDef::new("checked_in_at", Timestamptz),
        CREATED_AT,
    ],
    filters: &[
        FilterField::equals("id", ValueType::Id),
        FilterField::equals("student_id", ValueType::Id),
        FilterField::equals("locale_id", ValueType::Id),
        FilterField::one_of("status", ValueType::Text),
        FilterField::range("attended_on", ValueType::Date),
    ],
    sortable: &["id", "attended_on", "created_at"],
    default_sort: SortSpec {
        column: "attended_on",
        direction: SortDirection::Desc,
    },
    children: None,
    derived: None,
    create_table_sql: "CREATE TABLE IF NOT EXISTS attendance (
        id BIGSERIAL PRIMARY KEY,
        student_id BIGINT NOT NULL REFERENCES students(id),
        locale_id BIGINT NOT NULL REFERENCES locales(id),
        attended_on DATE NOT NULL,
        status TEXT NOT NULL CHECK (status IN ('present', 'absent', 'late', 'excused')),
        checked_in_at TIMESTAMPTZ,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        UNIQUE (student_id, attended_on)
    )",
};

pub static ITEMS: TableModel = TableModel {
    name: "items",
    table_name: "items",
    columns: &[
        ID,
        ColumnDef::new("code", Text).required(),
        ColumnDef::new("name", Text).required(),
        ColumnDef::new("unit_price", Decimal).required(),
        ColumnDef::new("active", Bool),
        CREATED_AT,
    ],
    filters: &[
        FilterField::equals("id", ValueType::Id),
        FilterField::equals("code", ValueType::Text),
        FilterField::contains("name"),
        FilterField::range("unit_price", ValueType::Decimal),
        FilterField::equals("active", ValueType::Bool),
    ],
    sortable: &["id", "code", "name", "unit_price"],
    default_sort: BY_ID,
    children: None,
    derived: None,
    create_table_sql: "CREATE TABLE IF NOT EXISTS items (
        id BIGSERIAL PRIMARY KEY,
        code TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        unit_price NUMERIC(12, 2) NOT NULL CHECK (unit_price >= 0),
        active BOOLEAN NOT NULL DEFAULT TRUE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
};

pub static CONSIGNEES: TableModel = TableModel {
    name: "consignees",
    table_name: "consignees",
    columns: &[
        ID,
        ColumnDef::new("name", Text).required(),
        ColumnDef::new("document_number", Text),
        ColumnDef::new("address", Text),
        ColumnDef::new("phone", Text),
        CREATED_AT,
    ],
    filters: &[
        FilterField::equals("id", ValueType::Id),
        FilterField::contains("name"),
        FilterField::equals("document_number", ValueType::Text),
    ],
    sortable: &["id", "name", "created_at"],
    default_sort: BY_ID,
    children: None,
    derived: None,
    create_table_sql: "CREATE TABLE IF NOT EXISTS consignees (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL,
        document_number TEXT,
        address TEXT,
        phone TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
};

const ORDER_DETAIL_COLUMNS: &[ColumnDef] = &[
    ID,
    ColumnDef::new("order_id", BigInt).read_only(),
    ColumnDef::new("line_nbr", Int).read_only(),
    ColumnDef::new("item_id", BigInt).required().references("items"),
    ColumnDef::new("quantity", Decimal).required(),
    ColumnDef::new("unit_price", Decimal).required(),
];

pub static ORDERS: TableModel = TableModel {
    name: "orders",
    table_name: "orders",
    columns: &[
        ID,
        ColumnDef::new("consignee_id", BigInt).required().references("consignees"),
        ColumnDef::new("user_id", BigInt).required().references("users"),
        ColumnDef::new("locale_id", BigInt).required().references("locales"),
        ColumnDef::new("order_date", Date).required(),
        ColumnDef::new("status", Text),
        ColumnDef::new("notes", Text),
        CREATED_AT,
    ],
    filters: &[
        FilterField::equals("id", ValueType::Id),
        FilterField::equals("consignee_id", ValueType::Id),
        FilterField::equals("user_id", ValueType::Id),
        FilterField::equals("locale_id", ValueType::Id),
        FilterField::one_of("status", ValueType::Text),
        FilterField::range("order_date", ValueType::Date),
        FilterField::contains("notes"),
    ],
    sortable: &["id", "order_date", "status", "created_at"],
    default_sort: SortSpec {
        column: "order_date",
        direction: SortDirection::Desc,
    },
    children: Some(ChildDef {
        key: "details",
        table_name: "order_details",
        parent_fk: "order_id",
        ordinal_column: "line_nbr",
        columns: ORDER_DETAIL_COLUMNS,
        create_table_sql: "CREATE TABLE IF NOT EXISTS order_details (
            id BIGSERIAL PRIMARY KEY,
            order_id BIGINT NOT NULL REFERENCES orders(id) ON DELETE CASCADE,
            line_nbr INTEGER NOT NULL,
            item_id BIGINT NOT NULL REFERENCES items(id),
            quantity NUMERIC(12, 2) NOT NULL CHECK (quantity > 0),
            unit_price NUMERIC(12, 2) NOT NULL CHECK (unit_price >= 0),
            UNIQUE (order_id, line_nbr)
        )",
    }),
    derived: None,
    create_table_sql: "CREATE TABLE IF NOT EXISTS orders (
        id BIGSERIAL PRIMARY KEY,
        consignee_id BIGINT NOT NULL REFERENCES consignees(id),
        user_id BIGINT NOT NULL REFERENCES users(id),
        locale_id BIGINT NOT NULL REFERENCES locales(id),
        order_date DATE NOT NULL,
        status TEXT NOT NULL DEFAULT 'pending',
        notes TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
};

const VOUCHER_LINE_COLUMNS: &[ColumnDef] = &[
    ID,
    ColumnDef::new("voucher_id", BigInt).read_only(),
    ColumnDef::new("line_nbr", Int).read_only(),
    ColumnDef::new("description", Text).required(),
    ColumnDef::new("amount", Decimal).required(),
];

pub static VOUCHERS: TableModel = TableModel {
    name: "vouchers",
    table_name: "vouchers",
    columns: &[
        ID,
        ColumnDef::new("locale_id", BigInt).required().references("locales"),
        ColumnDef::new("user_id", BigInt).required().references("users"),
        ColumnDef::new("voucher_date", Date).required(),
        ColumnDef::new("description", Text),
        CREATED_AT,
    ],
    filters: &[
        FilterField::equals("id", ValueType::Id),
        FilterField::equals("locale_id", ValueType::Id),
        FilterField::equals("user_id", ValueType::Id),
        FilterField::contains("description"),
        FilterField::range("voucher_date", ValueType::Date),
    ],
    sortable: &["id", "voucher_date", "created_at"],
    default_sort: BY_ID,
    children: Some(ChildDef {
        key: "lines",
        table_name: "voucher_lines",
        parent_fk: "voucher_id",
        ordinal_column: "line_nbr",
        columns: VOUCHER_LINE_COLUMNS,
        create_table_sql: "CREATE TABLE IF NOT EXISTS voucher_lines (
            id BIGSERIAL PRIMARY KEY,
            voucher_id BIGINT NOT NULL REFERENCES vouchers(id) ON DELETE CASCADE,
            line_nbr INTEGER NOT NULL,
            description TEXT NOT NULL,
            amount NUMERIC(12, 2) NOT NULL,
            UNIQUE (voucher_id, line_nbr)
        )",
    }),
    derived: None,
    create_table_sql: "CREATE TABLE IF NOT EXISTS vouchers (
        id BIGSERIAL PRIMARY KEY,
        locale_id BIGINT NOT NULL REFERENCES locales(id),
        user_id BIGINT NOT NULL REFERENCES users(id),
        voucher_date DATE NOT NULL,
        description TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
};

/// Every entity, parents before the tables that reference them.
pub static CATALOG: &[&TableModel] = &[
    &USERS,
    &LOCALES,
    &PARENTS,
    &STUDENTS,
    &EMPLOYEES,
    &ENROLLMENTS,
    &FEES,
    &PAYMENTS,
    &ATTENDANCE,
    &ITEMS,
    &CONSIGNEES,
    &ORDERS,
    &VOUCHERS,
];
