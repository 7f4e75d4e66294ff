pub mod config;
pub mod errors;
pub mod media_source;
pub mod models;
pub mod notifications;
pub mod uploader;
pub mod validation;

pub use errors::{AppError, AppResult};
pub use uploader::UploadSession;
