use crate::errors::{AppError, AppResult};
use crate::models::{MediaId, UploadStatus};

use super::upload_queue::UploadQueue;
use super::worker::UploadWorker;

/// Retry a failed upload. Only `Failed` items qualify; the worker performs the
/// `Failed -> Uploading` move once a transfer slot is free.
pub fn retry_failed_upload(queue: &UploadQueue, worker: &UploadWorker, id: MediaId) -> AppResult<()> {
    let item = queue.get(id).ok_or(AppError::NotFound { id })?;

    if !matches!(item.status, UploadStatus::Failed { .. }) {
        return Err(AppError::NotRetryable {
            id,
            status: item.status.name(),
        });
    }

    log::info!(
        "Retry requested for {} (attempt {}, last error: {})",
        item.file_name,
        item.attempts + 1,
        item.error_reason().unwrap_or("unknown")
    );
    worker.request_retry(id)
}
