use crate::app::auth::AuthenticatedUser;
use crate::domain::query::Pagination;
use crate::domain::values::FieldError;
use crate::transport::http::handlers::{auth, common, entities, health, upload};
use crate::transport::http::types::{
    ApiResponse, AppState, ChildDescriptor, ColumnDescriptor, EntityDescriptor, FilterDescriptor,
    LoginRequest, UploadRequest,
};
use axum::http::Method;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::healthcheck_handler,
        entities::list_entities_handler,
        entities::list_records_handler,
        entities::get_record_handler,
        entities::create_record_handler,
        entities::update_record_handler,
        entities::delete_record_handler,
        auth::login_handler,
        upload::upload_handler
    ),
    components(schemas(
        ApiResponse,
        Pagination,
        FieldError,
        EntityDescriptor,
        ColumnDescriptor,
        FilterDescriptor,
        ChildDescriptor,
        LoginRequest,
        UploadRequest,
        AuthenticatedUser
    ))
)]
pub struct ApiDoc;

/// Permissive CORS that echoes the caller's origin, so credentialed browser requests work.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

pub fn create_router(app_state: AppState) -> Router {
    let uploads = ServeDir::new(app_state.config.upload_dir.clone());

    Router::new()
        .route(
            "/health",
            get(health::healthcheck_handler).fallback(common::method_not_allowed),
        )
        .route(
            "/api/entities",
            get(entities::list_entities_handler).fallback(common::method_not_allowed),
        )
        .route(
            "/api/auth/login",
            post(auth::login_handler).fallback(common::method_not_allowed),
        )
        .route(
            "/api/upload",
            post(upload::upload_handler).fallback(common::method_not_allowed),
        )
        .route(
            "/api/:entity",
            get(entities::list_records_handler)
                .post(entities::create_record_handler)
                .fallback(common::method_not_allowed),
        )
        .route(
            "/api/:entity/:id",
            get(entities::get_record_handler)
                .put(entities::update_record_handler)
                .delete(entities::delete_record_handler)
                .fallback(common::method_not_allowed),
        )
        .nest_service("/uploads", uploads)
        .fallback(common::route_not_found)
        .with_state(app_state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
}
