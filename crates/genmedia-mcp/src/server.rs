//! MCP server using rmcp SDK
//!
//! Exposes generation tools and stored-artifact resources over stdio.
//! Tool handlers convert every domain failure into a failure envelope
//! rather than a protocol error, so the transport layer never translates
//! domain errors itself.

use crate::templates;
use crate::tools::*;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use genmedia_core::models::ArtifactMetadata;
use genmedia_genai::gateway::Gateway;
use genmedia_genai::normalize::ImageNormalizer;
use genmedia_storage::{ArtifactStore, StoreError};
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::tool::Parameters;
use rmcp::model::*;
use rmcp::service::{RequestContext, RoleServer};
use rmcp::{tool, tool_handler, tool_router, ServerHandler};
use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

fn text_content(s: impl Into<String>) -> Content {
    Content {
        raw: RawContent::Text(RawTextContent { text: s.into() }),
        annotations: None,
    }
}

fn internal_error(e: impl std::fmt::Display) -> ErrorData {
    ErrorData {
        code: ErrorCode(-32603),
        message: Cow::from(e.to_string()),
        data: None,
    }
}

fn not_found_error(uri: &str) -> ErrorData {
    ErrorData {
        code: ErrorCode(-32002),
        message: Cow::from(format!("Resource not found: {}", uri)),
        data: None,
    }
}

/// Failure envelope: one descriptive message with the error flag set.
fn failure(message: impl Into<String>) -> CallToolResult {
    CallToolResult::error(vec![text_content(message)])
}

fn success_json(payload: &serde_json::Value) -> Result<CallToolResult, ErrorData> {
    let text = serde_json::to_string(payload).map_err(internal_error)?;
    Ok(CallToolResult::success(vec![text_content(text)]))
}

fn artifact_payload(scheme: &str, artifact: &ArtifactMetadata) -> serde_json::Value {
    serde_json::json!({
        "id": artifact.id,
        "uri": format!("{}://{}", scheme, artifact.id),
        "metadata": artifact,
    })
}

#[derive(Clone)]
pub struct GenMediaService {
    gateway: Arc<Gateway>,
    normalizer: Arc<ImageNormalizer>,
    video_store: ArtifactStore,
    image_store: ArtifactStore,
    tool_router: ToolRouter<GenMediaService>,
}

#[tool_router]
impl GenMediaService {
    pub fn new(gateway: Arc<Gateway>, video_store: ArtifactStore, image_store: ArtifactStore) -> Self {
        Self {
            gateway,
            normalizer: Arc::new(ImageNormalizer::new()),
            video_store,
            image_store,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(
        name = "generateVideoFromText",
        description = "Generate a video from a text prompt and store it locally"
    )]
    async fn generate_video_from_text(
        &self,
        Parameters(req): Parameters<GenerateVideoFromTextRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        let result = self
            .gateway
            .generate_video_from_text(&req.prompt, &req.video_config(), req.options())
            .await;

        match result {
            Ok(outcome) => {
                let mut payload = artifact_payload("videos", &outcome.artifact);
                if let Some(data) = outcome.data_base64 {
                    payload["data"] = serde_json::Value::String(data);
                    payload["dataMimeType"] =
                        serde_json::Value::String(outcome.artifact.mime_type.clone());
                }
                success_json(&payload)
            }
            Err(e) => Ok(failure(format!("Video generation failed: {}", e))),
        }
    }

    #[tool(
        name = "generateVideoFromImage",
        description = "Generate a video from an input image (base64 data, URL, or file path) and store it locally"
    )]
    async fn generate_video_from_image(
        &self,
        Parameters(req): Parameters<GenerateVideoFromImageRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        let resolved = match self
            .normalizer
            .resolve(&req.image, req.mime_type.as_deref())
            .await
        {
            Ok(resolved) => resolved,
            Err(e) => return Ok(failure(format!("Could not resolve input image: {}", e))),
        };

        let result = self
            .gateway
            .generate_video_from_image(
                &resolved.bytes,
                &resolved.mime_type,
                req.prompt.as_deref(),
                &req.video_config(),
                req.options(),
            )
            .await;

        match result {
            Ok(outcome) => {
                let mut payload = artifact_payload("videos", &outcome.artifact);
                if let Some(data) = outcome.data_base64 {
                    payload["data"] = serde_json::Value::String(data);
                    payload["dataMimeType"] =
                        serde_json::Value::String(outcome.artifact.mime_type.clone());
                }
                success_json(&payload)
            }
            Err(e) => Ok(failure(format!("Video generation failed: {}", e))),
        }
    }

    #[tool(
        name = "generateImage",
        description = "Generate one or more images from a text prompt and store them locally"
    )]
    async fn generate_image(
        &self,
        Parameters(req): Parameters<GenerateImageRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        match self.gateway.generate_image(&req.prompt, &req.image_config()).await {
            Ok(outcome) => {
                let mut payload = artifact_payload("images", &outcome.artifact);
                if flag_or(&req.include_full_data, false) {
                    payload["data"] =
                        serde_json::Value::String(BASE64.encode(&outcome.bytes));
                    payload["dataMimeType"] =
                        serde_json::Value::String(outcome.artifact.mime_type.clone());
                }
                success_json(&payload)
            }
            Err(e) => Ok(failure(format!("Image generation failed: {}", e))),
        }
    }

    #[tool(
        name = "generateVideoFromGeneratedImage",
        description = "Generate an image from a prompt, then animate that image into a video. Both artifacts are stored."
    )]
    async fn generate_video_from_generated_image(
        &self,
        Parameters(req): Parameters<GenerateVideoFromGeneratedImageRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        let image_outcome = match self
            .gateway
            .generate_image(&req.image_prompt, &Default::default())
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => return Ok(failure(format!("Image generation failed: {}", e))),
        };

        // The freshly generated bytes go straight into video generation;
        // the image itself is already persisted for later retrieval.
        let result = self
            .gateway
            .generate_video_from_image(
                &image_outcome.bytes,
                &image_outcome.artifact.mime_type,
                req.video_prompt.as_deref(),
                &req.video_config(),
                req.options(),
            )
            .await;

        match result {
            Ok(outcome) => {
                let mut payload = serde_json::json!({
                    "image": artifact_payload("images", &image_outcome.artifact),
                    "video": artifact_payload("videos", &outcome.artifact),
                });
                if let Some(data) = outcome.data_base64 {
                    payload["video"]["data"] = serde_json::Value::String(data);
                    payload["video"]["dataMimeType"] =
                        serde_json::Value::String(outcome.artifact.mime_type.clone());
                }
                success_json(&payload)
            }
            Err(e) => Ok(failure(format!(
                "Video generation failed (image {} was stored): {}",
                image_outcome.artifact.id, e
            ))),
        }
    }

    #[tool(name = "listGeneratedVideos", description = "List all locally stored generated videos")]
    async fn list_generated_videos(&self) -> Result<CallToolResult, ErrorData> {
        self.list_artifacts(&self.video_store, "videos").await
    }

    #[tool(name = "listGeneratedImages", description = "List all locally stored generated images")]
    async fn list_generated_images(&self) -> Result<CallToolResult, ErrorData> {
        self.list_artifacts(&self.image_store, "images").await
    }

    #[tool(
        name = "getImage",
        description = "Get a stored image's metadata, optionally with its full data"
    )]
    async fn get_image(
        &self,
        Parameters(req): Parameters<GetImageRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        let include_full_data = flag_or(&req.include_full_data, false);
        match self.image_store.get(&req.id, include_full_data).await {
            Ok((metadata, bytes)) => {
                let mut payload = artifact_payload("images", &metadata);
                if let Some(bytes) = bytes {
                    payload["data"] = serde_json::Value::String(BASE64.encode(&bytes));
                    payload["dataMimeType"] = serde_json::Value::String(metadata.mime_type.clone());
                }
                success_json(&payload)
            }
            Err(StoreError::NotFound(id)) => Ok(failure(format!("Image not found: {}", id))),
            Err(e) => Ok(failure(format!("Failed to read image: {}", e))),
        }
    }

    async fn list_artifacts(
        &self,
        store: &ArtifactStore,
        scheme: &str,
    ) -> Result<CallToolResult, ErrorData> {
        match store.list().await {
            Ok(mut artifacts) => {
                // storage order is filesystem enumeration order; present
                // newest first
                artifacts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                let items: Vec<serde_json::Value> = artifacts
                    .iter()
                    .map(|artifact| artifact_payload(scheme, artifact))
                    .collect();
                success_json(&serde_json::json!({
                    "count": items.len(),
                    "artifacts": items,
                }))
            }
            Err(e) => Ok(failure(format!("Failed to list artifacts: {}", e))),
        }
    }

    fn store_for_scheme(&self, scheme: &str) -> Option<&ArtifactStore> {
        match scheme {
            "videos" => Some(&self.video_store),
            "images" => Some(&self.image_store),
            _ => None,
        }
    }

    async fn read_artifact_resource(
        &self,
        uri: &str,
        scheme: &str,
        rest: &str,
    ) -> Result<ReadResourceResult, ErrorData> {
        let store = self
            .store_for_scheme(scheme)
            .ok_or_else(|| not_found_error(uri))?;

        // `?full=true` requests the binary instead of the metadata
        // projection
        let (id, full) = match rest.split_once('?') {
            Some((id, query)) => (id, query.split('&').any(|p| p == "full=true")),
            None => (rest, false),
        };

        match store.get(id, full).await {
            Ok((metadata, Some(bytes))) => Ok(ReadResourceResult {
                contents: vec![ResourceContents::BlobResourceContents {
                    uri: uri.to_string(),
                    mime_type: Some(metadata.mime_type.clone()),
                    blob: BASE64.encode(&bytes),
                }],
            }),
            Ok((metadata, None)) => {
                let text = serde_json::to_string_pretty(&metadata).map_err(internal_error)?;
                Ok(ReadResourceResult {
                    contents: vec![ResourceContents::TextResourceContents {
                        uri: uri.to_string(),
                        mime_type: Some("application/json".to_string()),
                        text,
                    }],
                })
            }
            Err(StoreError::NotFound(_)) => Err(not_found_error(uri)),
            Err(e) => Err(internal_error(e)),
        }
    }
}

fn static_resource(uri: &str, name: &str, description: &str) -> Resource {
    let mut raw = RawResource::new(uri, name);
    raw.description = Some(description.to_string());
    raw.mime_type = Some("application/json".to_string());
    raw.no_annotation()
}

fn artifact_resource(scheme: &str, artifact: &ArtifactMetadata) -> Resource {
    let name = artifact
        .prompt
        .as_deref()
        .unwrap_or("untitled")
        .chars()
        .take(60)
        .collect::<String>();
    let mut raw = RawResource::new(
        format!("{}://{}", scheme, artifact.id),
        format!("{} ({})", name, artifact.created_at.format("%Y-%m-%d %H:%M")),
    );
    raw.description = Some(format!("Stored {} artifact {}", artifact.mime_type, artifact.id));
    raw.mime_type = Some("application/json".to_string());
    raw.no_annotation()
}

#[tool_handler]
impl ServerHandler for GenMediaService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            server_info: Implementation {
                name: "genmedia-mcp".into(),
                version: env!("CARGO_PKG_VERSION").into(),
            },
            instructions: Some(
                "genmedia MCP: generate videos and images, list stored artifacts, and read them \
                 back via videos://{id} and images://{id} resources. Set GEMINI_API_KEY."
                    .to_string(),
            ),
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, ErrorData> {
        let mut resources = vec![
            static_resource(
                "videos://templates",
                "Video prompt templates",
                "Curated example video prompts and configurations",
            ),
            static_resource(
                "images://templates",
                "Image prompt templates",
                "Curated example image prompts and configurations",
            ),
        ];

        for (store, scheme) in [(&self.video_store, "videos"), (&self.image_store, "images")] {
            match store.list().await {
                Ok(mut artifacts) => {
                    artifacts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                    resources.extend(
                        artifacts
                            .iter()
                            .map(|artifact| artifact_resource(scheme, artifact)),
                    );
                }
                Err(e) => {
                    tracing::warn!(scheme, error = %e, "Failed to enumerate stored artifacts");
                }
            }
        }

        Ok(ListResourcesResult {
            resources,
            next_cursor: None,
        })
    }

    async fn list_resource_templates(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourceTemplatesResult, ErrorData> {
        let templates = vec![
            RawResourceTemplate {
                uri_template: "videos://{id}".to_string(),
                name: "Generated video".to_string(),
                description: Some(
                    "Metadata for a stored video; append ?full=true for the binary".to_string(),
                ),
                mime_type: Some("application/json".to_string()),
            }
            .no_annotation(),
            RawResourceTemplate {
                uri_template: "images://{id}".to_string(),
                name: "Generated image".to_string(),
                description: Some(
                    "Metadata for a stored image; append ?full=true for the binary".to_string(),
                ),
                mime_type: Some("application/json".to_string()),
            }
            .no_annotation(),
        ];

        Ok(ListResourceTemplatesResult {
            resource_templates: templates,
            next_cursor: None,
        })
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, ErrorData> {
        let uri = request.uri.as_str();
        tracing::debug!(uri, "Reading resource");

        let templates_json = |value: serde_json::Value| -> Result<ReadResourceResult, ErrorData> {
            let text = serde_json::to_string_pretty(&value).map_err(internal_error)?;
            Ok(ReadResourceResult {
                contents: vec![ResourceContents::TextResourceContents {
                    uri: uri.to_string(),
                    mime_type: Some("application/json".to_string()),
                    text,
                }],
            })
        };

        match uri {
            "videos://templates" => templates_json(templates::video_templates()),
            "images://templates" => templates_json(templates::image_templates()),
            _ => {
                if let Some(rest) = uri.strip_prefix("videos://") {
                    self.read_artifact_resource(uri, "videos", rest).await
                } else if let Some(rest) = uri.strip_prefix("images://") {
                    self.read_artifact_resource(uri, "images", rest).await
                } else {
                    Err(not_found_error(uri))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use genmedia_core::models::GenerationSettings;
    use genmedia_genai::{
        GatewayConfig, GatewayError, GenerationBackend, InlineImage, Operation, VideoRequest,
    };
    use tempfile::tempdir;

    struct NoopBackend;

    #[async_trait]
    impl GenerationBackend for NoopBackend {
        async fn generate_images(
            &self,
            _prompt: &str,
            _count: u32,
        ) -> Result<Vec<InlineImage>, GatewayError> {
            Ok(Vec::new())
        }

        async fn start_video_generation(
            &self,
            _request: &VideoRequest,
        ) -> Result<Operation, GatewayError> {
            Ok(Operation {
                name: "operations/none".to_string(),
                done: true,
                results: Vec::new(),
            })
        }

        async fn poll_operation(&self, name: &str) -> Result<Operation, GatewayError> {
            Ok(Operation {
                name: name.to_string(),
                done: true,
                results: Vec::new(),
            })
        }

        async fn download(&self, _uri: &str) -> Result<Bytes, GatewayError> {
            Err(GatewayError::DownloadFailed {
                status: 404,
                message: "no remote downloads in tests".to_string(),
            })
        }
    }

    async fn service() -> (GenMediaService, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let video_store = ArtifactStore::new(dir.path()).await.unwrap();
        let image_store = ArtifactStore::new(dir.path().join("images")).await.unwrap();
        let gateway = Arc::new(Gateway::new(
            Arc::new(NoopBackend),
            video_store.clone(),
            image_store.clone(),
            GatewayConfig::default(),
        ));
        (GenMediaService::new(gateway, video_store, image_store), dir)
    }

    #[test]
    fn advertised_tool_names_are_stable() {
        let router = GenMediaService::tool_router();
        let names: Vec<String> = router
            .list_all()
            .into_iter()
            .map(|tool| tool.name.to_string())
            .collect();

        for expected in [
            "generateVideoFromText",
            "generateVideoFromImage",
            "generateImage",
            "generateVideoFromGeneratedImage",
            "listGeneratedVideos",
            "listGeneratedImages",
            "getImage",
        ] {
            assert!(names.iter().any(|n| n == expected), "missing tool {}", expected);
        }
    }

    #[tokio::test]
    async fn resource_read_defaults_to_metadata_json() {
        let (service, _dir) = service().await;
        let saved = service
            .video_store
            .save(
                &ArtifactStore::new_id(),
                b"video-bytes",
                "video/mp4",
                Some("a cat"),
                &GenerationSettings::default(),
            )
            .await
            .unwrap();

        let uri = format!("videos://{}", saved.id);
        let result = service
            .read_artifact_resource(&uri, "videos", &saved.id)
            .await
            .unwrap();

        match &result.contents[0] {
            ResourceContents::TextResourceContents { mime_type, text, .. } => {
                assert_eq!(mime_type.as_deref(), Some("application/json"));
                let metadata: ArtifactMetadata = serde_json::from_str(text).unwrap();
                assert_eq!(metadata.id, saved.id);
                assert_eq!(metadata.prompt.as_deref(), Some("a cat"));
            }
            _ => panic!("expected metadata text contents"),
        }
    }

    #[tokio::test]
    async fn resource_read_with_full_flag_returns_blob() {
        let (service, _dir) = service().await;
        let saved = service
            .video_store
            .save(
                &ArtifactStore::new_id(),
                b"video-bytes",
                "video/mp4",
                None,
                &GenerationSettings::default(),
            )
            .await
            .unwrap();

        let rest = format!("{}?full=true", saved.id);
        let uri = format!("videos://{}", rest);
        let result = service
            .read_artifact_resource(&uri, "videos", &rest)
            .await
            .unwrap();

        match &result.contents[0] {
            ResourceContents::BlobResourceContents { mime_type, blob, .. } => {
                assert_eq!(mime_type.as_deref(), Some("video/mp4"));
                assert_eq!(BASE64.decode(blob).unwrap(), b"video-bytes");
            }
            _ => panic!("expected blob contents"),
        }
    }

    #[tokio::test]
    async fn unknown_artifact_is_not_found() {
        let (service, _dir) = service().await;
        let err = service
            .read_artifact_resource("videos://no-such-id", "videos", "no-such-id")
            .await
            .unwrap_err();
        assert_eq!(err.code.0, -32002);
    }

    #[tokio::test]
    async fn unknown_scheme_is_not_found() {
        let (service, _dir) = service().await;
        let err = service
            .read_artifact_resource("files://x", "files", "x")
            .await
            .unwrap_err();
        assert_eq!(err.code.0, -32002);
    }
}
