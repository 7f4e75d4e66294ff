use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Identifier assigned to a media item when it is admitted to the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaId(Uuid);

impl MediaId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MediaId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MimeClass {
    Image,
    Video,
}

impl MimeClass {
    /// Classify a picker-reported type such as `image/jpeg` or `video/mp4`.
    pub fn from_mime_type(mime_type: &str) -> Option<Self> {
        let lowered = mime_type.to_ascii_lowercase();
        if lowered.contains("video") {
            Some(MimeClass::Video)
        } else if lowered.contains("image") {
            Some(MimeClass::Image)
        } else {
            None
        }
    }
}

impl fmt::Display for MimeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MimeClass::Image => f.write_str("image"),
            MimeClass::Video => f.write_str("video"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UploadStatus {
    Pending,
    Uploading,
    Succeeded,
    Failed { reason: String },
}

impl UploadStatus {
    pub fn name(&self) -> &'static str {
        match self {
            UploadStatus::Pending => "pending",
            UploadStatus::Uploading => "uploading",
            UploadStatus::Succeeded => "succeeded",
            UploadStatus::Failed { .. } => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadStatus::Succeeded | UploadStatus::Failed { .. })
    }

    pub fn is_in_progress(&self) -> bool {
        !self.is_terminal()
    }

    pub fn error_reason(&self) -> Option<&str> {
        match self {
            UploadStatus::Failed { reason } => Some(reason),
            _ => None,
        }
    }

    /// Pending -> Uploading -> {Succeeded, Failed}, and Failed -> Uploading for retries.
    pub fn can_transition_to(&self, next: &UploadStatus) -> bool {
        matches!(
            (self, next),
            (UploadStatus::Pending, UploadStatus::Uploading)
                | (UploadStatus::Uploading, UploadStatus::Succeeded)
                | (UploadStatus::Uploading, UploadStatus::Failed { .. })
                | (UploadStatus::Failed { .. }, UploadStatus::Uploading)
        )
    }
}

/// One selected asset as reported by the media picker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetDescriptor {
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub source_uri: String,
    #[serde(default)]
    pub encoded_payload: Option<String>,
}

#[derive(Debug, Clone)]
pub enum PickerResponse {
    Cancelled,
    Selected(Vec<AssetDescriptor>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    pub id: MediaId,
    pub file_name: String,
    pub mime_type: String,
    pub mime_class: MimeClass,
    pub size_bytes: u64,
    pub source_uri: String,
    /// Inline payload from the picker, shared between snapshots.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoded_payload: Option<Arc<str>>,
    #[serde(flatten)]
    pub status: UploadStatus,
    pub attempts: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MediaItem {
    pub fn error_reason(&self) -> Option<&str> {
        self.status.error_reason()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed() -> UploadStatus {
        UploadStatus::Failed {
            reason: "boom".to_string(),
        }
    }

    #[test]
    fn test_mime_class_from_picker_types() {
        assert_eq!(MimeClass::from_mime_type("image/jpeg"), Some(MimeClass::Image));
        assert_eq!(MimeClass::from_mime_type("video/mp4"), Some(MimeClass::Video));
        assert_eq!(MimeClass::from_mime_type("VIDEO/quicktime"), Some(MimeClass::Video));
        assert_eq!(MimeClass::from_mime_type("application/pdf"), None);
    }

    #[test]
    fn test_transition_graph() {
        use UploadStatus::*;

        assert!(Pending.can_transition_to(&Uploading));
        assert!(Uploading.can_transition_to(&Succeeded));
        assert!(Uploading.can_transition_to(&failed()));
        assert!(failed().can_transition_to(&Uploading));

        assert!(!Pending.can_transition_to(&Succeeded));
        assert!(!Pending.can_transition_to(&failed()));
        assert!(!failed().can_transition_to(&Pending));
        assert!(!Uploading.can_transition_to(&Pending));
        for next in [Pending, Uploading, Succeeded, failed()] {
            assert!(!Succeeded.can_transition_to(&next));
        }
    }

    #[test]
    fn test_error_reason_only_when_failed() {
        assert_eq!(failed().error_reason(), Some("boom"));
        assert_eq!(UploadStatus::Uploading.error_reason(), None);
        assert!(failed().is_terminal());
        assert!(UploadStatus::Pending.is_in_progress());
    }

    #[test]
    fn test_status_serializes_flat() {
        let json = serde_json::to_value(failed()).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["reason"], "boom");
    }
}
