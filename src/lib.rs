pub mod app;
pub mod crypto;
pub mod domain;
pub mod error;
pub mod infra;
pub mod transport;

// Convenience re-exports (keeps call-sites clean)
pub use app::auth::{CredentialVerifier, PgCredentialVerifier};
pub use app::database_service::DatabaseService;
pub use domain::model::ModelRegistry;
pub use error::{AppError, AppResult};
pub use infra::blob::{BlobStore, LocalBlobStore};
pub use infra::config::AppConfig;
