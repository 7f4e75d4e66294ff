use chrono::Utc;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;

use crate::errors::{AppError, AppResult};
use crate::models::{MediaId, MediaItem, UploadStatus};

/// Immutable point-in-time view of the queue, oldest item first.
#[derive(Debug, Clone, Default)]
pub struct QueueSnapshot(Arc<Vec<Arc<MediaItem>>>);

impl QueueSnapshot {
    pub fn items(&self) -> &[Arc<MediaItem>] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &MediaItem> {
        self.0.iter().map(Arc::as_ref)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, id: MediaId) -> Option<&MediaItem> {
        self.iter().find(|item| item.id == id)
    }

    fn get_shared(&self, id: MediaId) -> Option<Arc<MediaItem>> {
        self.0.iter().find(|item| item.id == id).cloned()
    }

    /// Items that have not reached a terminal state yet.
    pub fn count_in_progress(&self) -> usize {
        self.0.iter().filter(|item| item.status.is_in_progress()).count()
    }

    pub fn count_uploading(&self) -> usize {
        self.0
            .iter()
            .filter(|item| item.status == UploadStatus::Uploading)
            .count()
    }

    pub fn pending_ids(&self) -> impl Iterator<Item = MediaId> + '_ {
        self.0
            .iter()
            .filter(|item| item.status == UploadStatus::Pending)
            .map(|item| item.id)
    }
}

/// Single source of truth for queued media.
///
/// Every mutation copies the current sequence, edits the copy and swaps it in, then
/// publishes the new snapshot while still holding the lock. Readers therefore only
/// ever see whole sequences, in mutation order. The sequence holds shared items, so a
/// copy only duplicates the item being edited and never the payloads of the others.
pub struct UploadQueue {
    items: Mutex<Arc<Vec<Arc<MediaItem>>>>,
    publisher: watch::Sender<QueueSnapshot>,
}

impl Default for UploadQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl UploadQueue {
    pub fn new() -> Self {
        let (publisher, _) = watch::channel(QueueSnapshot::default());
        Self {
            items: Mutex::new(Arc::new(Vec::new())),
            publisher,
        }
    }

    fn mutate<R, F>(&self, operation: &str, f: F) -> AppResult<R>
    where
        F: FnOnce(&mut Vec<Arc<MediaItem>>) -> AppResult<R>,
    {
        let mut current = self
            .items
            .lock()
            .map_err(|_| AppError::lock_poisoned(operation))?;

        let mut next = current.as_ref().clone();
        let result = f(&mut next)?;

        *current = Arc::new(next);
        self.publisher.send_replace(QueueSnapshot(Arc::clone(&current)));
        Ok(result)
    }

    pub fn append(&self, item: MediaItem) -> AppResult<()> {
        self.mutate("append", |items| {
            if items.iter().any(|existing| existing.id == item.id) {
                return Err(AppError::DuplicateId { id: item.id });
            }

            log::info!(
                "Queued {} {} ({} bytes) as {}",
                item.mime_class,
                item.file_name,
                item.size_bytes,
                item.id
            );
            items.push(Arc::new(item));
            Ok(())
        })
    }

    /// Move item `id` to `new_status`, returning the updated item.
    pub fn replace_status(
        &self,
        id: MediaId,
        new_status: UploadStatus,
    ) -> AppResult<Arc<MediaItem>> {
        self.mutate("status update", |items| {
            let slot = items
                .iter_mut()
                .find(|item| item.id == id)
                .ok_or(AppError::NotFound { id })?;

            if !slot.status.can_transition_to(&new_status) {
                return Err(AppError::invalid_transition(id, &slot.status, &new_status));
            }

            let mut item = MediaItem::clone(slot);

            match &new_status {
                UploadStatus::Uploading => item.attempts += 1,
                UploadStatus::Succeeded => item.encoded_payload = None,
                _ => {}
            }

            log::info!(
                "{} ({}): {} -> {}",
                item.file_name,
                id,
                item.status.name(),
                new_status.name()
            );
            if let Some(reason) = new_status.error_reason() {
                log::warn!("Upload of {} failed: {}", item.file_name, reason);
            }

            item.status = new_status;
            item.updated_at = Utc::now();
            *slot = Arc::new(item);
            Ok(Arc::clone(slot))
        })
    }

    /// Explicit user removal. Items still uploading must finish first.
    pub fn remove(&self, id: MediaId) -> AppResult<Arc<MediaItem>> {
        self.mutate("remove", |items| {
            let index = items
                .iter()
                .position(|item| item.id == id)
                .ok_or(AppError::NotFound { id })?;

            if items[index].status == UploadStatus::Uploading {
                return Err(AppError::ItemInFlight { id });
            }

            let removed = items.remove(index);
            log::info!("Removed {} ({}) from queue", removed.file_name, id);
            Ok(removed)
        })
    }

    pub fn clear_succeeded(&self) -> AppResult<usize> {
        self.mutate("clear succeeded", |items| {
            let before = items.len();
            items.retain(|item| item.status != UploadStatus::Succeeded);
            let removed = before - items.len();
            if removed > 0 {
                log::info!("Cleared {} uploaded items from queue", removed);
            }
            Ok(removed)
        })
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        let current = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        QueueSnapshot(Arc::clone(&current))
    }

    pub fn get(&self, id: MediaId) -> Option<Arc<MediaItem>> {
        self.snapshot().get_shared(id)
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    pub fn count_in_progress(&self) -> usize {
        self.snapshot().count_in_progress()
    }

    /// Receiver that is notified with every snapshot published after this call.
    pub fn subscribe(&self) -> watch::Receiver<QueueSnapshot> {
        self.publisher.subscribe()
    }
}
