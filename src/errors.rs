use crate::models::{MediaId, UploadStatus};
use thiserror::Error;

/// HTTP status codes whose response body is never shown to the user.
const GENERIC_MESSAGE_STATUSES: [u16; 5] = [405, 500, 502, 503, 504];

#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Payload decoding error: {0}")]
    PayloadDecode(#[from] base64::DecodeError),

    #[error("Unsupported media type: {mime_type}. Only images and videos are supported.")]
    UnsupportedMediaType { mime_type: String },

    #[error("File too large: {file_name} is {size_bytes} bytes, limit is {limit_bytes} bytes")]
    FileTooLarge {
        file_name: String,
        size_bytes: u64,
        limit_bytes: u64,
    },

    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    #[error("No network connection")]
    Offline,

    #[error("Server rejected upload with status {status}")]
    Server {
        status: u16,
        code: Option<String>,
        message: Option<String>,
    },

    #[error("Media selection cancelled")]
    PickerCancelled,

    #[error("Queue item {id} already exists")]
    DuplicateId { id: MediaId },

    #[error("Queue item {id} not found")]
    NotFound { id: MediaId },

    #[error("Invalid status transition for {id}: {from} -> {to}")]
    InvalidTransition {
        id: MediaId,
        from: &'static str,
        to: &'static str,
    },

    #[error("Queue item {id} is {status}, only failed uploads can be retried")]
    NotRetryable { id: MediaId, status: &'static str },

    #[error("Queue item {id} is uploading and cannot be removed")]
    ItemInFlight { id: MediaId },

    #[error("Upload worker is not running")]
    WorkerStopped,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Custom result type
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(field: &str, message: &str) -> Self {
        Self::Validation {
            field: field.to_string(),
            message: message.to_string(),
        }
    }

    pub fn unsupported_media_type(mime_type: &str) -> Self {
        Self::UnsupportedMediaType {
            mime_type: mime_type.to_string(),
        }
    }

    pub fn file_too_large(file_name: &str, size_bytes: u64, limit_bytes: u64) -> Self {
        Self::FileTooLarge {
            file_name: file_name.to_string(),
            size_bytes,
            limit_bytes,
        }
    }

    pub fn invalid_transition(id: MediaId, from: &UploadStatus, to: &UploadStatus) -> Self {
        Self::InvalidTransition {
            id,
            from: from.name(),
            to: to.name(),
        }
    }

    pub fn server(status: u16, code: Option<String>, message: Option<String>) -> Self {
        Self::Server {
            status,
            code,
            message,
        }
    }

    pub fn lock_poisoned(operation: &str) -> Self {
        log::error!("Queue lock poisoned during {}", operation);
        Self::Internal(format!("queue lock poisoned during {}", operation))
    }

    /// Rejections produced before an asset ever reaches the queue.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AppError::UnsupportedMediaType { .. }
                | AppError::FileTooLarge { .. }
                | AppError::Validation { .. }
        )
    }

    /// Failures that are not reported to the user: server failures carrying
    /// `silent_code`, picker cancellation, and transport failures while online.
    /// Transport failures while offline are reported as `Offline` instead.
    pub fn is_silent(&self, silent_code: Option<&str>) -> bool {
        match (self, silent_code) {
            (AppError::Server { code: Some(code), .. }, Some(silent)) => code == silent,
            (AppError::PickerCancelled | AppError::Network(_), _) => true,
            _ => false,
        }
    }

    /// Server-supplied message to show, if the response may be trusted for display.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            AppError::Server {
                status, message, ..
            } if !GENERIC_MESSAGE_STATUSES.contains(status) => message
                .as_deref()
                .map(str::trim)
                .filter(|m| !m.is_empty()),
            _ => None,
        }
    }
}
