//! In-process provider stub and state factory for router tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use studio_core::provider::{AiCallRequest, AiCallResult, ImageProvider, ProviderError};
use tempfile::TempDir;

use crate::config::Config;
use crate::state::AppState;

pub const TEN_BYTE_PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x01];

pub enum Reply {
    Image(&'static [u8]),
    Fail(ProviderError),
}

struct StubProvider(Reply);

#[async_trait]
impl ImageProvider for StubProvider {
    fn name(&self) -> &str {
        "stub"
    }

    async fn generate_image(&self, _request: AiCallRequest) -> Result<AiCallResult, ProviderError> {
        match &self.0 {
            Reply::Image(bytes) => Ok(AiCallResult {
                image: Bytes::from_static(bytes),
                mime_type: "image/png".into(),
                elapsed: Duration::from_millis(3),
            }),
            Reply::Fail(err) => Err(err.clone()),
        }
    }
}

/// Fresh state backed by a temporary storage directory.  Keep the returned
/// directory alive for the duration of the test.
pub async fn test_state(reply: Reply) -> (AppState, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let storage = dir.path().to_string_lossy().into_owned();
    let config = Config::from_lookup(|key| match key {
        "GEMINI_API_KEY" => Some("test-key".to_owned()),
        "STUDIO_STORAGE_PATH" => Some(storage.clone()),
        _ => None,
    })
    .unwrap();
    let state = AppState::new(config, Arc::new(StubProvider(reply)))
        .await
        .unwrap();
    (state, dir)
}
