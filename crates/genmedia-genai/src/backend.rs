//! Remote backend seam.
//!
//! The generative service is an external collaborator; this trait pins down
//! the four calls the gateway makes against it. Remote response shapes are
//! parsed into these canonical types once, at the client boundary, so no
//! shape-probing leaks into the gateway.

use async_trait::async_trait;
use bytes::Bytes;
use genmedia_core::models::{AspectRatio, PersonGeneration};
use serde::Serialize;

use crate::error::GatewayError;

/// One inline image returned by the synchronous image endpoint.
#[derive(Debug, Clone)]
pub struct InlineImage {
    pub bytes: Bytes,
    pub mime_type: String,
}

/// Canonical form of a long-running remote operation. Never mutated
/// locally; a new value is fetched on each poll and the handle is discarded
/// once terminal.
#[derive(Debug, Clone)]
pub struct Operation {
    pub name: String,
    pub done: bool,
    pub results: Vec<VideoResult>,
}

/// One result descriptor from a completed operation. A missing uri means
/// the descriptor has nothing fetchable and is skipped at fan-out.
#[derive(Debug, Clone)]
pub struct VideoResult {
    pub uri: Option<String>,
}

/// Sparse video request payload: unset fields are omitted from the wire so
/// the remote service applies its own defaults.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ImagePayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<AspectRatio>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub person_generation: Option<PersonGeneration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_videos: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enhance_prompt: Option<bool>,
}

/// Inline image payload for image-to-video requests.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePayload {
    pub bytes_base64_encoded: String,
    pub mime_type: String,
}

#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Synchronous image generation: prompt in, inline encoded images out.
    async fn generate_images(
        &self,
        prompt: &str,
        count: u32,
    ) -> Result<Vec<InlineImage>, GatewayError>;

    /// Kick off an asynchronous video generation job.
    async fn start_video_generation(
        &self,
        request: &VideoRequest,
    ) -> Result<Operation, GatewayError>;

    /// Re-fetch the state of an in-flight operation.
    async fn poll_operation(&self, name: &str) -> Result<Operation, GatewayError>;

    /// Fetch a generated artifact's bytes from its remote reference.
    async fn download(&self, uri: &str) -> Result<Bytes, GatewayError>;
}
