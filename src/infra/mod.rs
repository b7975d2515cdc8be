pub mod blob;
pub mod config;

pub use blob::{BlobStore, LocalBlobStore};
pub use config::AppConfig;
