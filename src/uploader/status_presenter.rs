use serde::Serialize;

use crate::models::{MediaId, MimeClass, UploadStatus};

use super::upload_queue::QueueSnapshot;

#[derive(Debug, Clone, Serialize)]
pub struct StatusRow {
    pub id: MediaId,
    pub file_name: String,
    pub mime_class: MimeClass,
    pub size: String,
    pub status: UploadStatus,
    pub label: String,
    pub retryable: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusView {
    pub visible: bool,
    pub in_progress: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Oldest first
    pub rows: Vec<StatusRow>,
}

impl StatusView {
    pub fn summary(&self) -> String {
        format!(
            "{} uploaded, {} failed, {} in progress",
            self.succeeded, self.failed, self.in_progress
        )
    }
}

/// Read-only projection of the queue for the upload status surface.
#[derive(Debug, Default)]
pub struct StatusPresenter {
    show_requested: bool,
}

impl StatusPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self) {
        self.show_requested = true;
    }

    /// Closing hides the surface; queue contents are untouched.
    pub fn close(&mut self) {
        self.show_requested = false;
    }

    pub fn is_show_requested(&self) -> bool {
        self.show_requested
    }

    pub fn present(&self, snapshot: &QueueSnapshot) -> StatusView {
        present(snapshot, self.show_requested)
    }
}

pub fn is_visible(snapshot: &QueueSnapshot, show_requested: bool) -> bool {
    show_requested && snapshot.count_in_progress() > 0
}

pub fn present(snapshot: &QueueSnapshot, show_requested: bool) -> StatusView {
    let rows: Vec<StatusRow> = snapshot
        .iter()
        .map(|item| StatusRow {
            id: item.id,
            file_name: item.file_name.clone(),
            mime_class: item.mime_class,
            size: format_size(item.size_bytes),
            status: item.status.clone(),
            label: status_label(&item.status),
            retryable: matches!(item.status, UploadStatus::Failed { .. }),
        })
        .collect();

    StatusView {
        visible: is_visible(snapshot, show_requested),
        in_progress: snapshot.count_in_progress(),
        succeeded: rows
            .iter()
            .filter(|row| row.status == UploadStatus::Succeeded)
            .count(),
        failed: rows.iter().filter(|row| row.retryable).count(),
        rows,
    }
}

pub fn status_label(status: &UploadStatus) -> String {
    match status {
        UploadStatus::Pending => "Waiting".to_string(),
        UploadStatus::Uploading => "Uploading".to_string(),
        UploadStatus::Succeeded => "Uploaded".to_string(),
        UploadStatus::Failed { reason } => format!("Failed: {}", reason),
    }
}

pub fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    let bytes_f = bytes as f64;
    if bytes_f >= GB {
        format!("{:.2} GB", bytes_f / GB)
    } else if bytes_f >= MB {
        format!("{:.2} MB", bytes_f / MB)
    } else if bytes_f >= KB {
        format!("{:.1} KB", bytes_f / KB)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AssetDescriptor;
    use crate::uploader::upload_queue::UploadQueue;
    use crate::validation::MediaValidator;

    fn queue_with(names: &[&str]) -> (UploadQueue, Vec<MediaId>) {
        let queue = UploadQueue::new();
        let validator = MediaValidator::new(u64::MAX, u64::MAX);
        let mut ids = Vec::new();
        for name in names {
            let item = validator
                .validate(&AssetDescriptor {
                    file_name: name.to_string(),
                    mime_type: "image/png".to_string(),
                    size_bytes: 2048,
                    source_uri: format!("file:///tmp/{}", name),
                    encoded_payload: None,
                })
                .unwrap();
            ids.push(item.id);
            queue.append(item).unwrap();
        }
        (queue, ids)
    }

    #[test]
    fn test_hidden_when_queue_empty() {
        let (queue, _) = queue_with(&[]);
        let mut presenter = StatusPresenter::new();
        presenter.open();

        let view = presenter.present(&queue.snapshot());
        assert!(!view.visible);
        assert!(view.rows.is_empty());
    }

    #[test]
    fn test_hidden_when_everything_terminal_or_removed() {
        let (queue, ids) = queue_with(&["a.png", "b.png"]);
        queue.replace_status(ids[0], UploadStatus::Uploading).unwrap();
        queue.replace_status(ids[0], UploadStatus::Succeeded).unwrap();
        queue.remove(ids[1]).unwrap();

        assert!(!is_visible(&queue.snapshot(), true));
        queue.clear_succeeded().unwrap();
        assert!(!is_visible(&queue.snapshot(), true));
    }

    #[test]
    fn test_visible_only_when_requested() {
        let (queue, _) = queue_with(&["a.png"]);
        let mut presenter = StatusPresenter::new();

        assert!(!presenter.present(&queue.snapshot()).visible);
        presenter.open();
        assert!(presenter.present(&queue.snapshot()).visible);
        presenter.close();
        assert!(!presenter.present(&queue.snapshot()).visible);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_rows_are_oldest_first_with_labels() {
        let (queue, ids) = queue_with(&["a.png", "b.png", "c.png"]);
        queue.replace_status(ids[1], UploadStatus::Uploading).unwrap();
        queue
            .replace_status(
                ids[1],
                UploadStatus::Failed {
                    reason: "Server error 500".to_string(),
                },
            )
            .unwrap();

        let view = present(&queue.snapshot(), true);
        let names: Vec<&str> = view.rows.iter().map(|r| r.file_name.as_str()).collect();
        assert_eq!(names, ["a.png", "b.png", "c.png"]);
        assert_eq!(view.rows[0].label, "Waiting");
        assert_eq!(view.rows[1].label, "Failed: Server error 500");
        assert!(view.rows[1].retryable);
        assert_eq!(view.rows[2].size, "2.0 KB");
        assert_eq!(view.failed, 1);
        assert_eq!(view.in_progress, 2);
        assert_eq!(view.summary(), "0 uploaded, 1 failed, 2 in progress");
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(750_000_000), "715.26 MB");
    }
}
