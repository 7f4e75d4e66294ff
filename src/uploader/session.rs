use std::sync::Arc;
use std::time::Duration;

use crate::config::{validate_config, Config};
use crate::errors::{AppError, AppResult};
use crate::models::{AssetDescriptor, MediaId};
use crate::notifications::{NotificationCenter, NotificationSurface};
use crate::validation::MediaValidator;

use super::intake::{selected_assets, AssetSource, IntakeReport, RejectedAsset};
use super::reachability::ReachabilityProbe;
use super::retry::retry_failed_upload;
use super::status_presenter::{present, StatusView};
use super::transfer::TransferChannel;
use super::upload_queue::{QueueSnapshot, UploadQueue};
use super::worker::UploadWorker;

/// Everything that lives for one application session: the queue, its worker and the
/// notification surface. Create it at startup and share it behind an `Arc`.
pub struct UploadSession {
    config: Config,
    queue: Arc<UploadQueue>,
    notifier: Arc<NotificationCenter>,
    validator: MediaValidator,
    worker: UploadWorker,
}

impl UploadSession {
    /// Must be called from within a tokio runtime.
    pub fn start(
        config: Config,
        transfer: Arc<dyn TransferChannel>,
        probe: Arc<dyn ReachabilityProbe>,
        surface: Arc<dyn NotificationSurface>,
    ) -> AppResult<Self> {
        validate_config(&config)?;

        let queue = Arc::new(UploadQueue::new());
        let notifier = Arc::new(NotificationCenter::new(surface, &config));
        let worker = UploadWorker::spawn(
            Arc::clone(&queue),
            transfer,
            probe,
            Arc::clone(&notifier),
            config.max_concurrent_uploads,
        );

        log::info!(
            "Upload session started (image limit {} bytes, video limit {} bytes)",
            config.image_size_limit_bytes,
            config.video_size_limit_bytes
        );

        Ok(Self {
            validator: MediaValidator::from_config(&config),
            config,
            queue,
            notifier,
            worker,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn queue(&self) -> &Arc<UploadQueue> {
        &self.queue
    }

    pub fn notifier(&self) -> &Arc<NotificationCenter> {
        &self.notifier
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        self.queue.snapshot()
    }

    pub fn status_view(&self, show_requested: bool) -> StatusView {
        present(&self.queue.snapshot(), show_requested)
    }

    /// Validate one asset and queue it. Rejections are shown to the user and returned.
    pub fn admit(&self, asset: &AssetDescriptor) -> AppResult<MediaId> {
        let item = match self.validator.validate(asset) {
            Ok(item) => item,
            Err(e) => {
                self.notifier.report_error(&e);
                return Err(e);
            }
        };

        let id = item.id;
        self.queue.append(item)?;
        Ok(id)
    }

    /// Run the picker and queue every acceptable asset it returns.
    pub async fn pick_and_enqueue(&self, source: &dyn AssetSource) -> AppResult<IntakeReport> {
        let response = source.pick(self.config.selection_limit).await?;
        let assets = selected_assets(response, self.config.selection_limit)?;

        let mut report = IntakeReport::default();
        for asset in &assets {
            match self.admit(asset) {
                Ok(id) => report.admitted.push(id),
                Err(e) if e.is_validation() => report.rejected.push(RejectedAsset {
                    file_name: asset.file_name.clone(),
                    reason: e.to_string(),
                }),
                Err(e) => return Err(e),
            }
        }

        log::info!(
            "Picker selection processed: {} queued, {} rejected",
            report.admitted.len(),
            report.rejected.len()
        );
        Ok(report)
    }

    pub fn retry(&self, id: MediaId) -> AppResult<()> {
        retry_failed_upload(&self.queue, &self.worker, id)
    }

    /// Retry every failed item, returning how many were requested.
    pub fn retry_all_failed(&self) -> AppResult<usize> {
        let failed: Vec<MediaId> = self
            .queue
            .snapshot()
            .iter()
            .filter(|item| item.status.error_reason().is_some())
            .map(|item| item.id)
            .collect();

        for id in &failed {
            self.retry(*id)?;
        }
        Ok(failed.len())
    }

    pub fn resume(&self) -> AppResult<()> {
        self.worker.resume()
    }

    pub fn remove(&self, id: MediaId) -> AppResult<()> {
        self.queue.remove(id).map(|_| ())
    }

    pub fn clear_succeeded(&self) -> AppResult<usize> {
        self.queue.clear_succeeded()
    }

    /// Wait until no item is pending or uploading, or `timeout` elapses.
    pub async fn wait_until_settled(&self, timeout: Duration) -> AppResult<QueueSnapshot> {
        let mut updates = self.queue.subscribe();
        let settle = async {
            loop {
                let snapshot = self.queue.snapshot();
                if snapshot.count_in_progress() == 0 {
                    return Ok(snapshot);
                }
                if updates.changed().await.is_err() {
                    return Err(AppError::Internal("queue publisher dropped".to_string()));
                }
            }
        };

        tokio::time::timeout(timeout, settle)
            .await
            .map_err(|_| AppError::Internal(format!("queue did not settle within {:?}", timeout)))?
    }

    /// End of session: lets in-flight uploads record their outcome, then stops the worker.
    pub async fn shutdown(self) {
        log::info!("Shutting down upload session");
        self.worker.shutdown().await;

        let view = present(&self.queue.snapshot(), false);
        log::info!("Upload session ended: {}", view.summary());
    }
}
