use crate::domain::model::EntityModel;
use crate::error::{AppError, AppResult};
use crate::transport::http::types::{ApiResponse, AppState};
use axum::http::{Method, StatusCode, Uri};
use axum::Json;
use serde_json::Value as JsonValue;
use std::sync::Arc;

pub fn resolve_model(state: &AppState, name: &str) -> AppResult<Arc<dyn EntityModel>> {
    state
        .model_registry
        .get(name)
        .ok_or_else(|| AppError::not_found(format!("Unknown entity '{}'", name.trim())))
}

/// Path ids are positive 64-bit integers.
pub fn parse_id(raw: &str) -> AppResult<i64> {
    match raw.trim().parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(AppError::validation("Invalid id format")),
    }
}

pub fn respond(status: StatusCode, data: JsonValue) -> (StatusCode, Json<ApiResponse>) {
    (status, Json(ApiResponse::ok(data)))
}

/// Router-level fallback so unmatched paths still answer with the JSON envelope.
pub async fn route_not_found(uri: Uri) -> AppError {
    AppError::not_found(format!("No route for '{}'", uri.path()))
}

/// Method fallback for known paths.
pub async fn method_not_allowed(method: Method) -> AppError {
    AppError::MethodNotAllowed(method.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_must_be_positive_integers() {
        assert_eq!(parse_id("42").unwrap(), 42);
        assert_eq!(parse_id(" 7 ").unwrap(), 7);
        for bad in ["0", "-3", "abc", "1.5", "", "99999999999999999999"] {
            assert!(matches!(parse_id(bad), Err(AppError::Validation(_))), "{bad}");
        }
    }
}
