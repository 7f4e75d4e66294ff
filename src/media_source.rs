use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::errors::AppResult;
use crate::models::{AssetDescriptor, PickerResponse};
use crate::uploader::AssetSource;

/// Picks local files given up front, e.g. on the command line.
pub struct FileAssetSource {
    paths: Vec<PathBuf>,
}

impl FileAssetSource {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }
}

#[async_trait]
impl AssetSource for FileAssetSource {
    /// Nothing usable selected counts as a cancelled pick.
    async fn pick(&self, selection_limit: usize) -> AppResult<PickerResponse> {
        let mut assets = Vec::new();
        for path in self.paths.iter().take(selection_limit) {
            let metadata = match tokio::fs::metadata(path).await {
                Ok(metadata) if metadata.is_file() => metadata,
                Ok(_) => {
                    log::warn!("Skipping {}: not a file", path.display());
                    continue;
                }
                Err(e) => {
                    log::warn!("Skipping {}: {}", path.display(), e);
                    continue;
                }
            };

            assets.push(AssetDescriptor {
                file_name: path
                    .file_name()
                    .unwrap_or_default()
                    .to_string_lossy()
                    .to_string(),
                mime_type: mime_type_for(path).to_string(),
                size_bytes: i64::try_from(metadata.len()).unwrap_or(i64::MAX),
                source_uri: format!("file://{}", path.display()),
                encoded_payload: None,
            });
        }

        if assets.is_empty() {
            log::info!("No readable files among {} selected paths", self.paths.len());
            return Ok(PickerResponse::Cancelled);
        }
        Ok(PickerResponse::Selected(assets))
    }
}

/// Detect MIME type based on file extension
pub fn mime_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("heic") => "image/heic",
        Some("bmp") => "image/bmp",
        Some("mp4") | Some("m4v") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("webm") => "video/webm",
        Some("mkv") => "video/x-matroska",
        Some("3gp") => "video/3gpp",
        _ => "application/octet-stream",
    }
}
