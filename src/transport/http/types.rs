use crate::app::auth::CredentialVerifier;
use crate::app::database_service::DatabaseService;
use crate::domain::model::{Access, EntityModel, ModelRegistry};
use crate::domain::query::{FilterOp, PageDefaults};
use crate::infra::blob::BlobStore;
use crate::infra::config::AppConfig;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Clone)]
pub struct AppState {
    pub db_service: Arc<DatabaseService>,
    pub model_registry: Arc<ModelRegistry>,
    pub credentials: Arc<dyn CredentialVerifier>,
    pub blob_store: Arc<dyn BlobStore>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn page_defaults(&self) -> PageDefaults {
        PageDefaults {
            default_limit: self.config.default_page_size,
            max_limit: self.config.max_page_size,
        }
    }
}

#[derive(Serialize, Debug, ToSchema)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub data: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiResponse {
    pub fn ok(data: JsonValue) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct UploadRequest {
    /// Original file name; directories and unusual characters are stripped.
    pub filename: String,
    /// Base64 file contents. A `data:<mime>;base64,` prefix is accepted.
    pub file: String,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct ColumnDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub col_type: String,
    pub required: bool,
    pub writable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub references: Option<String>,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct FilterDescriptor {
    pub field: String,
    pub operator: String,
    pub value_type: String,
    /// Query-string keys accepted for this field.
    pub params: Vec<String>,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct ChildDescriptor {
    pub key: String,
    pub columns: Vec<ColumnDescriptor>,
}

/// Introspection entry served by `GET /api/entities`.
#[derive(Serialize, Debug, ToSchema)]
pub struct EntityDescriptor {
    pub name: String,
    pub columns: Vec<ColumnDescriptor>,
    pub filters: Vec<FilterDescriptor>,
    pub sortable: Vec<String>,
    pub default_sort: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<ChildDescriptor>,
}

fn describe_columns(columns: &[crate::domain::model::ColumnDef]) -> Vec<ColumnDescriptor> {
    columns
        .iter()
        .map(|c| ColumnDescriptor {
            name: c.input_name().to_string(),
            col_type: match c.access {
                Access::Secret { .. } => "write_only".to_string(),
                _ => c.col_type.sql_type().to_lowercase(),
            },
            required: c.required,
            writable: c.is_writable(),
            references: c.references.map(str::to_string),
        })
        .collect()
}

impl EntityDescriptor {
    pub fn from_model(model: &dyn EntityModel) -> Self {
        let sort = model.default_sort();
        Self {
            name: model.name().to_string(),
            columns: describe_columns(model.columns()),
            filters: model
                .filters()
                .iter()
                .map(|f| FilterDescriptor {
                    field: f.param.to_string(),
                    operator: match f.op {
                        FilterOp::Equals => "equals",
                        FilterOp::Contains => "contains",
                        FilterOp::Range => "range",
                        FilterOp::SetMembership => "set_membership",
                    }
                    .to_string(),
                    value_type: format!("{:?}", f.value_type).to_lowercase(),
                    params: f.accepted_params(),
                })
                .collect(),
            sortable: model.sortable().iter().map(|s| s.to_string()).collect(),
            default_sort: format!("{} {}", sort.column, sort.direction.as_sql().to_lowercase()),
            children: model.children().map(|c| ChildDescriptor {
                key: c.key.to_string(),
                columns: describe_columns(c.columns),
            }),
        }
    }
}

pub fn json_422(err: JsonRejection, expected: &str) -> (StatusCode, Json<ApiResponse>) {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(ApiResponse {
            success: false,
            data: None,
            error: Some(format!("Invalid JSON body: {} (expected: {})", err, expected)),
        }),
    )
}
