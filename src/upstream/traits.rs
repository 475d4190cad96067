//! Seam between the generation workflow and the remote service

use async_trait::async_trait;

use crate::error::Result;
use crate::upstream::types::{GenerateContentRequest, GenerateContentResponse};

/// Anything that can turn a request payload into a remote response
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Send one request, returning the parsed body or a typed failure
    async fn generate(&self, request: &GenerateContentRequest) -> Result<GenerateContentResponse>;

    /// Number of credentials still in rotation
    fn live_credentials(&self) -> usize;
}
