use chrono::Utc;
use regex::Regex;
use std::sync::{Arc, OnceLock};

use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::models::{AssetDescriptor, MediaId, MediaItem, MimeClass, UploadStatus};

const MAX_FILE_NAME_LEN: usize = 255;

fn unsafe_filename_chars() -> &'static Regex {
    static UNSAFE: OnceLock<Regex> = OnceLock::new();
    UNSAFE.get_or_init(|| Regex::new(r#"[<>:"/\\|?*\x00-\x1f]"#).expect("static pattern"))
}

/// Admission control for picked assets. Holds only the size limits, never the queue.
#[derive(Debug, Clone, Copy)]
pub struct MediaValidator {
    image_limit_bytes: u64,
    video_limit_bytes: u64,
}

impl MediaValidator {
    pub fn new(image_limit_bytes: u64, video_limit_bytes: u64) -> Self {
        Self {
            image_limit_bytes,
            video_limit_bytes,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.size_limit_for(MimeClass::Image),
            config.size_limit_for(MimeClass::Video),
        )
    }

    pub fn limit_for(&self, class: MimeClass) -> u64 {
        match class {
            MimeClass::Image => self.image_limit_bytes,
            MimeClass::Video => self.video_limit_bytes,
        }
    }

    /// Admit `asset` as a new `Pending` item, or explain why it was rejected.
    pub fn validate(&self, asset: &AssetDescriptor) -> AppResult<MediaItem> {
        let mime_class = MimeClass::from_mime_type(&asset.mime_type)
            .ok_or_else(|| AppError::unsupported_media_type(&asset.mime_type))?;

        if asset.size_bytes < 0 {
            return Err(AppError::validation("size_bytes", "Size cannot be negative"));
        }
        let size_bytes = asset.size_bytes as u64;

        if asset.source_uri.trim().is_empty() {
            return Err(AppError::validation("source_uri", "Source URI cannot be empty"));
        }

        let file_name = display_name(asset);
        let limit = self.limit_for(mime_class);
        if size_bytes >= limit {
            log::warn!(
                "Rejecting {} {}: {} bytes exceeds limit of {} bytes",
                mime_class,
                file_name,
                size_bytes,
                limit
            );
            return Err(AppError::file_too_large(&file_name, size_bytes, limit));
        }

        let now = Utc::now();
        Ok(MediaItem {
            id: MediaId::new(),
            file_name,
            mime_type: asset.mime_type.clone(),
            mime_class,
            size_bytes,
            source_uri: asset.source_uri.clone(),
            encoded_payload: asset.encoded_payload.as_deref().map(Arc::from),
            status: UploadStatus::Pending,
            attempts: 0,
            created_at: now,
            updated_at: now,
        })
    }
}

pub fn sanitize_filename(filename: &str) -> String {
    let sanitized = unsafe_filename_chars().replace_all(filename.trim(), "_");

    if sanitized.chars().count() > MAX_FILE_NAME_LEN {
        let truncated: String = sanitized.chars().take(MAX_FILE_NAME_LEN - 3).collect();
        format!("{}...", truncated)
    } else {
        sanitized.to_string()
    }
}

fn display_name(asset: &AssetDescriptor) -> String {
    let name = sanitize_filename(&asset.file_name);
    if !name.is_empty() {
        return name;
    }

    let from_uri = asset
        .source_uri
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .map(sanitize_filename)
        .unwrap_or_default();

    if from_uri.is_empty() {
        "media".to_string()
    } else {
        from_uri
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(mime_type: &str, size_bytes: i64) -> AssetDescriptor {
        AssetDescriptor {
            file_name: "IMG_0001.jpg".to_string(),
            mime_type: mime_type.to_string(),
            size_bytes,
            source_uri: "file:///sdcard/DCIM/IMG_0001.jpg".to_string(),
            encoded_payload: None,
        }
    }

    fn validator() -> MediaValidator {
        MediaValidator::new(750_000_000, 750_000_000)
    }

    #[test]
    fn test_small_image_is_admitted_as_pending() {
        let item = validator().validate(&asset("image/jpeg", 1000)).unwrap();

        assert_eq!(item.status, UploadStatus::Pending);
        assert_eq!(item.mime_class, MimeClass::Image);
        assert_eq!(item.size_bytes, 1000);
        assert_eq!(item.attempts, 0);
    }

    #[test]
    fn test_limits_come_from_config_per_class() {
        let config = Config {
            image_size_limit_bytes: 2_000,
            video_size_limit_bytes: 5_000,
            ..Config::default()
        };
        let validator = MediaValidator::from_config(&config);

        assert!(validator.validate(&asset("image/png", 3_000)).is_err());
        assert!(validator.validate(&asset("video/mp4", 3_000)).is_ok());
        assert_eq!(validator.limit_for(MimeClass::Video), 5_000);
    }

    #[test]
    fn test_oversized_video_is_rejected() {
        let result = validator().validate(&asset("video/mp4", 800_000_000));
        assert!(matches!(
            result,
            Err(AppError::FileTooLarge {
                size_bytes: 800_000_000,
                limit_bytes: 750_000_000,
                ..
            })
        ));
    }

    #[test]
    fn test_limit_is_exclusive() {
        let v = MediaValidator::new(100, 200);
        assert!(v.validate(&asset("image/png", 99)).is_ok());
        assert!(v.validate(&asset("image/png", 100)).is_err());
        assert!(v.validate(&asset("video/mp4", 199)).is_ok());
        assert!(v.validate(&asset("video/mp4", 200)).is_err());
    }

    #[test]
    fn test_unsupported_type_and_negative_size() {
        assert!(matches!(
            validator().validate(&asset("application/pdf", 10)),
            Err(AppError::UnsupportedMediaType { .. })
        ));
        assert!(matches!(
            validator().validate(&asset("image/png", -1)),
            Err(AppError::Validation { .. })
        ));
    }

    #[test]
    fn test_each_admission_gets_a_fresh_id() {
        let a = validator().validate(&asset("image/png", 1)).unwrap();
        let b = validator().validate(&asset("image/png", 1)).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_file_name_falls_back_to_uri() {
        let mut unnamed = asset("image/png", 1);
        unnamed.file_name = "  ".to_string();
        unnamed.source_uri = "content://media/external/images/4242".to_string();

        let item = validator().validate(&unnamed).unwrap();
        assert_eq!(item.file_name, "4242");
    }

    #[test]
    fn test_sanitize_filename() {
        let safe = sanitize_filename("../../etc/passwd<script>.png");
        assert!(!safe.contains('<'));
        assert!(!safe.contains('/'));

        let long = "a".repeat(400);
        assert_eq!(sanitize_filename(&long).chars().count(), MAX_FILE_NAME_LEN);
    }
}
