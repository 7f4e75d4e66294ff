use async_trait::async_trait;

use crate::errors::{AppError, AppResult};
use crate::models::{AssetDescriptor, MediaId, PickerResponse};

/// Where selected media comes from, typically the device gallery picker.
#[async_trait]
pub trait AssetSource: Send + Sync {
    async fn pick(&self, selection_limit: usize) -> AppResult<PickerResponse>;
}

#[derive(Debug, Clone)]
pub struct RejectedAsset {
    pub file_name: String,
    pub reason: String,
}

/// Result of feeding one picker selection through validation.
#[derive(Debug, Default)]
pub struct IntakeReport {
    pub admitted: Vec<MediaId>,
    pub rejected: Vec<RejectedAsset>,
}

impl IntakeReport {
    pub fn is_empty(&self) -> bool {
        self.admitted.is_empty() && self.rejected.is_empty()
    }
}

/// Unwrap a picker response, enforcing the selection limit.
pub fn selected_assets(
    response: PickerResponse,
    selection_limit: usize,
) -> AppResult<Vec<AssetDescriptor>> {
    let mut assets = match response {
        PickerResponse::Cancelled => {
            log::info!("Media selection cancelled by user");
            return Err(AppError::PickerCancelled);
        }
        PickerResponse::Selected(assets) => assets,
    };

    if assets.len() > selection_limit {
        log::warn!(
            "Picker returned {} assets, keeping the first {}",
            assets.len(),
            selection_limit
        );
        assets.truncate(selection_limit);
    }

    Ok(assets)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(name: &str) -> AssetDescriptor {
        AssetDescriptor {
            file_name: name.to_string(),
            mime_type: "image/png".to_string(),
            size_bytes: 1,
            source_uri: format!("file:///tmp/{}", name),
            encoded_payload: None,
        }
    }

    #[test]
    fn test_cancelled_selection_is_signalled() {
        assert!(matches!(
            selected_assets(PickerResponse::Cancelled, 1),
            Err(AppError::PickerCancelled)
        ));
    }

    #[test]
    fn test_selection_limit_truncates() {
        let response = PickerResponse::Selected(vec![asset("a"), asset("b"), asset("c")]);
        let assets = selected_assets(response, 2).unwrap();
        let names: Vec<&str> = assets.iter().map(|a| a.file_name.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
    }
}
