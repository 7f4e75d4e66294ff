//! Upload worker: drains `Pending` items and honours explicit retries.
//!
//! The worker loop is the only place the worker writes to the store. Transfers run as
//! separate tasks and report back through an mpsc channel, so completions are applied
//! one at a time on the same path that starts new transfers.

use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::errors::{AppError, AppResult};
use crate::models::{MediaId, UploadStatus};
use crate::notifications::NotificationCenter;

use super::reachability::ReachabilityProbe;
use super::transfer::TransferChannel;
use super::upload_queue::UploadQueue;

#[derive(Debug)]
enum WorkerCommand {
    Retry(MediaId),
    Resume,
    Shutdown,
}

struct TransferOutcome {
    id: MediaId,
    file_name: String,
    result: AppResult<()>,
}

pub struct UploadWorker {
    commands: mpsc::UnboundedSender<WorkerCommand>,
    handle: JoinHandle<()>,
}

impl UploadWorker {
    /// Start the worker loop on the current tokio runtime.
    pub fn spawn(
        queue: Arc<UploadQueue>,
        transfer: Arc<dyn TransferChannel>,
        probe: Arc<dyn ReachabilityProbe>,
        notifier: Arc<NotificationCenter>,
        max_concurrent: usize,
    ) -> Self {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();

        let worker = WorkerLoop {
            queue,
            transfer,
            probe,
            notifier,
            max_concurrent: max_concurrent.max(1),
            in_flight: 0,
            retry_requests: VecDeque::new(),
            outcome_tx,
        };
        let handle = tokio::spawn(worker.run(command_rx, outcome_rx));

        Self { commands, handle }
    }

    fn send(&self, command: WorkerCommand) -> AppResult<()> {
        self.commands
            .send(command)
            .map_err(|_| AppError::WorkerStopped)
    }

    /// Ask the worker to move a failed item back to `Uploading`.
    pub fn request_retry(&self, id: MediaId) -> AppResult<()> {
        self.send(WorkerCommand::Retry(id))
    }

    /// Re-check waiting items, e.g. once connectivity is back.
    pub fn resume(&self) -> AppResult<()> {
        self.send(WorkerCommand::Resume)
    }

    /// Stop starting transfers and wait for in-flight ones to record their outcome.
    pub async fn shutdown(self) {
        if self.send(WorkerCommand::Shutdown).is_err() {
            log::debug!("Upload worker already stopped");
        }
        if let Err(e) = self.handle.await {
            log::error!("Upload worker terminated abnormally: {}", e);
        }
    }
}

struct WorkerLoop {
    queue: Arc<UploadQueue>,
    transfer: Arc<dyn TransferChannel>,
    probe: Arc<dyn ReachabilityProbe>,
    notifier: Arc<NotificationCenter>,
    max_concurrent: usize,
    in_flight: usize,
    retry_requests: VecDeque<MediaId>,
    outcome_tx: mpsc::UnboundedSender<TransferOutcome>,
}

impl WorkerLoop {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<WorkerCommand>,
        mut outcomes: mpsc::UnboundedReceiver<TransferOutcome>,
    ) {
        let mut snapshots = self.queue.subscribe();
        log::info!(
            "Upload worker started (max {} concurrent uploads)",
            self.max_concurrent
        );

        loop {
            self.pump().await;

            tokio::select! {
                changed = snapshots.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                Some(outcome) = outcomes.recv() => self.complete(outcome).await,
                command = commands.recv() => match command {
                    Some(WorkerCommand::Retry(id)) => {
                        if !self.retry_requests.contains(&id) {
                            self.retry_requests.push_back(id);
                        }
                    }
                    Some(WorkerCommand::Resume) => log::debug!("Upload worker resumed"),
                    Some(WorkerCommand::Shutdown) | None => break,
                },
            }
        }

        if self.in_flight > 0 {
            log::info!(
                "Upload worker stopping, waiting for {} in-flight uploads",
                self.in_flight
            );
        }
        while self.in_flight > 0 {
            match outcomes.recv().await {
                Some(outcome) => self.complete(outcome).await,
                None => break,
            }
        }
        log::info!("Upload worker stopped");
    }

    /// Start as many transfers as free slots allow, retries first, then oldest pending.
    async fn pump(&mut self) {
        let slots = self.max_concurrent.saturating_sub(self.in_flight);
        if slots == 0 {
            return;
        }

        let snapshot = self.queue.snapshot();
        self.retry_requests.retain(|id| {
            matches!(
                snapshot.get(*id).map(|item| &item.status),
                Some(UploadStatus::Failed { .. })
            )
        });

        let candidates: Vec<MediaId> = self
            .retry_requests
            .iter()
            .copied()
            .chain(snapshot.pending_ids())
            .take(slots)
            .collect();

        if candidates.is_empty() {
            return;
        }

        if !self.probe.is_reachable().await {
            log::warn!(
                "Network unreachable, holding {} pending uploads",
                snapshot.pending_ids().count()
            );
            self.notifier.notify_offline();
            return;
        }

        for id in candidates {
            self.retry_requests.retain(|queued| *queued != id);
            self.begin(id);
        }
    }

    fn begin(&mut self, id: MediaId) {
        // Mark first so observers see the work before the network call returns
        let item = match self.queue.replace_status(id, UploadStatus::Uploading) {
            Ok(item) => item,
            Err(e) => {
                log::warn!("Skipping upload of {}: {}", id, e);
                return;
            }
        };

        self.in_flight += 1;
        let transfer = Arc::clone(&self.transfer);
        let outcome_tx = self.outcome_tx.clone();

        tokio::spawn(async move {
            let file_name = item.file_name.clone();
            let upload = tokio::spawn(async move { transfer.upload(&item).await });
            let result = match upload.await {
                Ok(result) => result,
                Err(e) => Err(AppError::Internal(format!("upload task failed: {}", e))),
            };

            if outcome_tx
                .send(TransferOutcome {
                    id,
                    file_name,
                    result,
                })
                .is_err()
            {
                log::error!("Upload worker gone before outcome of {} was recorded", id);
            }
        });
    }

    async fn complete(&mut self, outcome: TransferOutcome) {
        self.in_flight = self.in_flight.saturating_sub(1);

        let new_status = match outcome.result {
            Ok(()) => {
                log::info!("Uploaded {}", outcome.file_name);
                UploadStatus::Succeeded
            }
            Err(error) => {
                let error = self.classify(error).await;
                self.notifier.report_error(&error);
                UploadStatus::Failed {
                    reason: failure_reason(&error),
                }
            }
        };

        // The user may have removed the item meanwhile, which is fine
        if let Err(e) = self.queue.replace_status(outcome.id, new_status) {
            log::warn!(
                "Could not record outcome for {} ({}): {}",
                outcome.file_name,
                outcome.id,
                e
            );
        }
    }

    /// Transport failures while the device is offline count as connectivity errors.
    async fn classify(&self, error: AppError) -> AppError {
        if matches!(error, AppError::Network(_)) && !self.probe.is_reachable().await {
            log::warn!("Upload failed while offline: {}", error);
            return AppError::Offline;
        }
        error
    }
}

fn failure_reason(error: &AppError) -> String {
    match error {
        AppError::Server {
            status, message, ..
        } => match message.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
            Some(message) => format!("Server error {}: {}", status, message),
            None => format!("Server error {}", status),
        },
        other => other.to_string(),
    }
}
