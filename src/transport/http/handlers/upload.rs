use crate::error::{AppError, AppResult};
use crate::transport::http::handlers::common::respond;
use crate::transport::http::types::{json_422, AppState, UploadRequest};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Decodes the upload body, tolerating a `data:<mime>;base64,` prefix and embedded whitespace.
pub fn decode_payload(raw: &str) -> AppResult<Vec<u8>> {
    let encoded = match raw.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => raw,
    };
    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if compact.is_empty() {
        return Err(AppError::validation("file must not be empty"));
    }
    STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| AppError::validation(format!("file is not valid base64: {}", e)))
}

#[utoipa::path(
    post,
    path = "/api/upload",
    request_body = UploadRequest,
    responses(
        (status = 201, description = "File stored; returns its public URL", body = ApiResponse),
        (status = 400, description = "Missing filename or invalid base64", body = ApiResponse),
        (status = 422, description = "Unprocessable entity (invalid JSON body)", body = ApiResponse)
    )
)]
pub async fn upload_handler(
    State(state): State<AppState>,
    request: Result<Json<UploadRequest>, JsonRejection>,
) -> AppResult<Response> {
    let Json(request) = match request {
        Ok(v) => v,
        Err(e) => {
            return Ok(
                json_422(e, "{\"filename\": \"...\", \"file\": \"<base64>\"}").into_response(),
            )
        }
    };
    if request.filename.trim().is_empty() {
        return Err(AppError::validation("filename is required"));
    }
    let bytes = decode_payload(&request.file)?;
    let blob = state.blob_store.put(&request.filename, &bytes).await?;

    Ok(respond(
        StatusCode::CREATED,
        serde_json::json!({ "url": blob.url, "name": blob.name, "size": blob.size }),
    )
    .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_plain_and_data_url_payloads() {
        assert_eq!(decode_payload("aGVsbG8=").unwrap(), b"hello");
        assert_eq!(
            decode_payload("data:text/plain;base64,aGVs\nbG8=").unwrap(),
            b"hello"
        );
    }

    #[test]
    fn rejects_empty_and_invalid_payloads() {
        assert!(matches!(decode_payload("  "), Err(AppError::Validation(_))));
        assert!(matches!(decode_payload("not base64!"), Err(AppError::Validation(_))));
    }
}
