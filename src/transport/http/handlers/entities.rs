use crate::domain::query::ListQuery;
use crate::error::AppResult;
use crate::transport::http::handlers::common::{parse_id, resolve_model, respond};
use crate::transport::http::types::{json_422, AppState, EntityDescriptor};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value as JsonValue;
use std::collections::HashMap;

const RECORD_BODY: &str = "a JSON object with the entity's fields";

#[utoipa::path(
    get,
    path = "/api/entities",
    responses(
        (status = 200, description = "Registered entities with their filter and sort allow-lists", body = ApiResponse)
    )
)]
pub async fn list_entities_handler(State(state): State<AppState>) -> impl IntoResponse {
    let entities: Vec<EntityDescriptor> = state
        .model_registry
        .models()
        .map(|m| EntityDescriptor::from_model(m.as_ref()))
        .collect();
    respond(StatusCode::OK, serde_json::json!({ "entities": entities }))
}

#[utoipa::path(
    get,
    path = "/api/{entity}",
    params(
        ("entity" = String, Path, description = "Entity name (e.g. students)"),
        ("page" = Option<u32>, Query, description = "1-based page number (default 1)"),
        ("limit" = Option<u32>, Query, description = "Page size (default 10, max 100)"),
        ("sort_by" = Option<String>, Query, description = "Sort field from the entity's allow-list (alias: sortBy)"),
        ("sort_order" = Option<String>, Query, description = "asc or desc (alias: sortOrder)")
    ),
    responses(
        (status = 200, description = "Page of records with pagination metadata", body = ApiResponse),
        (status = 400, description = "Unknown parameter, bad sort or bad boolean filter", body = ApiResponse),
        (status = 404, description = "Unknown entity", body = ApiResponse)
    )
)]
pub async fn list_records_handler(
    State(state): State<AppState>,
    Path(entity): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> AppResult<impl IntoResponse> {
    let model = resolve_model(&state, &entity)?;
    let query = ListQuery::parse(model.as_ref(), &params, &state.page_defaults())?;
    let page = state.db_service.list(model.as_ref(), &query).await?;
    Ok(respond(
        StatusCode::OK,
        serde_json::json!({ "rows": page.rows, "pagination": page.pagination }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/{entity}/{id}",
    params(
        ("entity" = String, Path, description = "Entity name"),
        ("id" = i64, Path, description = "Record id")
    ),
    responses(
        (status = 200, description = "Record (parents embed their children)", body = ApiResponse),
        (status = 400, description = "Invalid id", body = ApiResponse),
        (status = 404, description = "Unknown entity or record", body = ApiResponse)
    )
)]
pub async fn get_record_handler(
    State(state): State<AppState>,
    Path((entity, id)): Path<(String, String)>,
) -> AppResult<impl IntoResponse> {
    let model = resolve_model(&state, &entity)?;
    let id = parse_id(&id)?;
    let record = state.db_service.get(model.as_ref(), id).await?;
    Ok(respond(StatusCode::OK, record))
}

#[utoipa::path(
    post,
    path = "/api/{entity}",
    params(
        ("entity" = String, Path, description = "Entity name")
    ),
    request_body(content = Object, description = "Record fields; parents also take a child array (`details` or `lines`)"),
    responses(
        (status = 201, description = "Record created", body = ApiResponse),
        (status = 400, description = "Missing/invalid fields or missing referenced record", body = ApiResponse),
        (status = 404, description = "Unknown entity", body = ApiResponse),
        (status = 409, description = "Unique constraint violated", body = ApiResponse),
        (status = 422, description = "Unprocessable entity (invalid JSON body)", body = ApiResponse)
    )
)]
pub async fn create_record_handler(
    State(state): State<AppState>,
    Path(entity): Path<String>,
    body: Result<Json<JsonValue>, JsonRejection>,
) -> AppResult<Response> {
    let model = resolve_model(&state, &entity)?;
    let Json(payload) = match body {
        Ok(v) => v,
        Err(e) => return Ok(json_422(e, RECORD_BODY).into_response()),
    };
    let outcome = state.db_service.create(model.as_ref(), &payload).await?;
    Ok(respond(StatusCode::CREATED, outcome.into_json()).into_response())
}

#[utoipa::path(
    put,
    path = "/api/{entity}/{id}",
    params(
        ("entity" = String, Path, description = "Entity name"),
        ("id" = i64, Path, description = "Record id")
    ),
    request_body(content = Object, description = "Fields to change; a child array replaces all children"),
    responses(
        (status = 200, description = "Record updated", body = ApiResponse),
        (status = 400, description = "Invalid fields or id", body = ApiResponse),
        (status = 404, description = "Unknown entity or record", body = ApiResponse),
        (status = 409, description = "Unique constraint violated", body = ApiResponse),
        (status = 422, description = "Unprocessable entity (invalid JSON body)", body = ApiResponse)
    )
)]
pub async fn update_record_handler(
    State(state): State<AppState>,
    Path((entity, id)): Path<(String, String)>,
    body: Result<Json<JsonValue>, JsonRejection>,
) -> AppResult<Response> {
    let model = resolve_model(&state, &entity)?;
    let id = parse_id(&id)?;
    let Json(payload) = match body {
        Ok(v) => v,
        Err(e) => return Ok(json_422(e, RECORD_BODY).into_response()),
    };
    let outcome = state.db_service.update(model.as_ref(), id, &payload).await?;
    Ok(respond(StatusCode::OK, outcome.into_json()).into_response())
}

#[utoipa::path(
    delete,
    path = "/api/{entity}/{id}",
    params(
        ("entity" = String, Path, description = "Entity name"),
        ("id" = i64, Path, description = "Record id")
    ),
    responses(
        (status = 200, description = "Record deleted", body = ApiResponse),
        (status = 400, description = "Invalid id", body = ApiResponse),
        (status = 404, description = "Unknown entity or record", body = ApiResponse),
        (status = 409, description = "Record is still referenced", body = ApiResponse)
    )
)]
pub async fn delete_record_handler(
    State(state): State<AppState>,
    Path((entity, id)): Path<(String, String)>,
) -> AppResult<impl IntoResponse> {
    let model = resolve_model(&state, &entity)?;
    let id = parse_id(&id)?;
    let derived = state.db_service.delete(model.as_ref(), id).await?;

    let mut data = serde_json::json!({
        "message": format!("{} {} deleted", model.name(), id)
    });
    if let (Some((key, status)), Some(obj)) = (derived, data.as_object_mut()) {
        obj.insert(key.to_string(), status);
    }
    Ok(respond(StatusCode::OK, data))
}
