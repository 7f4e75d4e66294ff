use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::{multipart, Client};
use serde::Deserialize;
use std::time::Duration;

use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::models::MediaItem;

/// Moves one item's bytes to the remote endpoint.
#[async_trait]
pub trait TransferChannel: Send + Sync {
    async fn upload(&self, item: &MediaItem) -> AppResult<()>;
}

/// Multipart HTTP upload of a single media item
pub struct HttpTransferChannel {
    client: Client,
    endpoint: String,
}

impl HttpTransferChannel {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            endpoint: endpoint.into(),
        })
    }

    pub fn from_config(config: &Config) -> AppResult<Self> {
        let endpoint = config
            .upload_endpoint
            .clone()
            .ok_or_else(|| AppError::Config("No upload endpoint configured".to_string()))?;
        Self::new(endpoint, config.request_timeout())
    }

    fn build_form(item: &MediaItem, body: Vec<u8>) -> AppResult<multipart::Form> {
        let part = multipart::Part::bytes(body)
            .file_name(item.file_name.clone())
            .mime_str(&item.mime_type)?;

        Ok(multipart::Form::new()
            .text("fileName", item.file_name.clone())
            .text("mimeType", item.mime_type.clone())
            .part("file", part))
    }
}

#[async_trait]
impl TransferChannel for HttpTransferChannel {
    async fn upload(&self, item: &MediaItem) -> AppResult<()> {
        let body = read_body(item).await?;
        log::debug!(
            "Posting {} ({} bytes) to {}",
            item.file_name,
            body.len(),
            self.endpoint
        );

        let form = Self::build_form(item, body)?;
        let response = self.client.post(&self.endpoint).multipart(form).send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(());
        }

        let error_text = response.text().await.unwrap_or_default();
        log::debug!(
            "Upload endpoint answered {} (first 300 chars): {}",
            status,
            error_text.chars().take(300).collect::<String>()
        );
        Err(parse_error_body(status.as_u16(), &error_text))
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<serde_json::Value>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
}

/// Turn a failed response into a server error, keeping the machine-readable code.
pub fn parse_error_body(status: u16, body: &str) -> AppError {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => {
            let code = parsed.code.and_then(|value| match value {
                serde_json::Value::String(s) => Some(s),
                serde_json::Value::Number(n) => Some(n.to_string()),
                _ => None,
            });
            AppError::server(status, code, parsed.message.or(parsed.error_message))
        }
        Err(_) => AppError::server(status, None, None),
    }
}

/// Bytes to send: the picker's inline payload when present, otherwise the source file.
pub async fn read_body(item: &MediaItem) -> AppResult<Vec<u8>> {
    match item.encoded_payload.as_deref() {
        Some(payload) => {
            // Pickers sometimes hand over a data URL rather than bare base64
            let encoded = payload
                .split_once(";base64,")
                .map(|(_, data)| data)
                .unwrap_or(payload);
            Ok(STANDARD.decode(encoded.trim())?)
        }
        None => Ok(tokio::fs::read(local_path(&item.source_uri)).await?),
    }
}

pub fn local_path(source_uri: &str) -> &str {
    source_uri.strip_prefix("file://").unwrap_or(source_uri)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AssetDescriptor;
    use crate::validation::MediaValidator;

    fn item_with(payload: Option<&str>, source_uri: &str) -> MediaItem {
        MediaValidator::new(u64::MAX, u64::MAX)
            .validate(&AssetDescriptor {
                file_name: "clip.mp4".to_string(),
                mime_type: "video/mp4".to_string(),
                size_bytes: 5,
                source_uri: source_uri.to_string(),
                encoded_payload: payload.map(str::to_string),
            })
            .unwrap()
    }

    #[test]
    fn test_parse_error_body_with_code_and_message() {
        let error = parse_error_body(404, r#"{"code":"DATA_NOT_FOUND","message":"No data"}"#);
        match error {
            AppError::Server {
                status,
                code,
                message,
            } => {
                assert_eq!(status, 404);
                assert_eq!(code.as_deref(), Some("DATA_NOT_FOUND"));
                assert_eq!(message.as_deref(), Some("No data"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_parse_error_body_numeric_code_and_garbage() {
        assert!(matches!(
            parse_error_body(400, r#"{"code":1002,"error_message":"Bad"}"#),
            AppError::Server { code: Some(ref c), message: Some(ref m), .. } if c == "1002" && m == "Bad"
        ));
        assert!(matches!(
            parse_error_body(502, "<html>Bad Gateway</html>"),
            AppError::Server { status: 502, code: None, message: None }
        ));
    }

    #[test]
    fn test_local_path() {
        assert_eq!(local_path("file:///tmp/a.png"), "/tmp/a.png");
        assert_eq!(local_path("/tmp/a.png"), "/tmp/a.png");
    }

    #[tokio::test]
    async fn test_read_body_decodes_inline_payload() {
        let plain = item_with(Some("aGVsbG8="), "file:///nowhere");
        assert_eq!(read_body(&plain).await.unwrap(), b"hello");

        let data_url = item_with(Some("data:video/mp4;base64,aGVsbG8="), "file:///nowhere");
        assert_eq!(read_body(&data_url).await.unwrap(), b"hello");

        let broken = item_with(Some("***"), "file:///nowhere");
        assert!(matches!(read_body(&broken).await, Err(AppError::PayloadDecode(_))));
    }

    #[tokio::test]
    async fn test_read_body_falls_back_to_file() {
        let path = std::env::temp_dir().join(format!("transfer_body_{}.mp4", uuid::Uuid::new_v4()));
        std::fs::write(&path, b"video").unwrap();

        let item = item_with(None, &format!("file://{}", path.display()));
        let body = read_body(&item).await;
        let _ = std::fs::remove_file(&path);

        assert_eq!(body.unwrap(), b"video");
    }
}
