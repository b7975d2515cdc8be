use crate::error::{AppError, AppResult};
use crate::transport::http::handlers::common::respond;
use crate::transport::http::types::{json_422, AppState, LoginRequest};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Credentials accepted; returns the user profile", body = ApiResponse),
        (status = 400, description = "Username or password missing", body = ApiResponse),
        (status = 401, description = "Invalid username or password", body = ApiResponse),
        (status = 422, description = "Unprocessable entity (invalid JSON body)", body = ApiResponse)
    )
)]
pub async fn login_handler(
    State(state): State<AppState>,
    request: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<Response> {
    let Json(request) = match request {
        Ok(v) => v,
        Err(e) => {
            return Ok(
                json_422(e, "{\"username\": \"...\", \"password\": \"...\"}").into_response(),
            )
        }
    };
    if request.username.trim().is_empty() || request.password.is_empty() {
        return Err(AppError::validation("username and password are required"));
    }

    let user = state
        .credentials
        .verify(&request.username, &request.password)
        .await?;
    tracing::info!(user_id = user.id, "login accepted");

    let data = serde_json::to_value(&user).map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(respond(StatusCode::OK, serde_json::json!({ "user": data })).into_response())
}
