//! Generation orchestration.
//!
//! One gateway instance is constructed at startup and shared by the tool
//! and resource layers. Each generation call is a sequential flow: invoke
//! the remote capability, poll the operation to completion, fan out over
//! the returned artifacts concurrently, and persist each through the
//! artifact store. Per-artifact failures are absorbed; only total failure
//! is returned as an error.

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use bytes::Bytes;
use genmedia_core::models::{
    validate_prompt, ArtifactMetadata, GenerationSettings, ImageGenerationConfig,
    VideoGenerationConfig,
};
use genmedia_storage::ArtifactStore;
use tokio::time::Instant;

use crate::backend::{GenerationBackend, ImagePayload, VideoRequest, VideoResult};
use crate::error::GatewayError;

const VIDEO_MIME_TYPE: &str = "video/mp4";
const DEFAULT_IMAGE_TO_VIDEO_PROMPT: &str = "Animate this image with natural motion";

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Fixed wait between operation polls.
    pub poll_interval: Duration,
    /// Wall-clock budget for the whole poll loop; exceeding it fails the
    /// call with `TimeoutExceeded` instead of waiting forever.
    pub poll_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            poll_timeout: Duration::from_secs(600),
        }
    }
}

/// Per-call retrieval policy.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Download generated binaries immediately. When false, only metadata
    /// with the remote reference is persisted.
    pub auto_download: bool,
    /// Return the first artifact's bytes base64-encoded in the response.
    pub include_full_data: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            auto_download: true,
            include_full_data: false,
        }
    }
}

/// Primary result of a video generation call: the first persisted (or
/// deferred) artifact. Callers wanting every artifact use the listing path.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub artifact: ArtifactMetadata,
    pub data_base64: Option<String>,
}

/// Result of an image generation call. The raw bytes are kept in memory so
/// compound flows can feed them straight into video generation without a
/// disk round-trip.
#[derive(Debug, Clone)]
pub struct ImageOutcome {
    pub artifact: ArtifactMetadata,
    pub bytes: Bytes,
}

pub struct Gateway {
    backend: Arc<dyn GenerationBackend>,
    video_store: ArtifactStore,
    image_store: ArtifactStore,
    config: GatewayConfig,
}

impl Gateway {
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        video_store: ArtifactStore,
        image_store: ArtifactStore,
        config: GatewayConfig,
    ) -> Self {
        Self {
            backend,
            video_store,
            image_store,
            config,
        }
    }

    pub async fn generate_video_from_text(
        &self,
        prompt: &str,
        config: &VideoGenerationConfig,
        options: GenerateOptions,
    ) -> Result<GenerationOutcome, GatewayError> {
        validate_prompt(prompt)?;
        config.validate(false)?;

        let request = VideoRequest {
            prompt: Some(prompt.to_string()),
            image: None,
            ..sparse_request(config)
        };
        self.run_video(request, Some(prompt.to_string()), config.effective(), options)
            .await
    }

    pub async fn generate_video_from_image(
        &self,
        image: &[u8],
        mime_type: &str,
        prompt: Option<&str>,
        config: &VideoGenerationConfig,
        options: GenerateOptions,
    ) -> Result<GenerationOutcome, GatewayError> {
        if let Some(p) = prompt {
            validate_prompt(p)?;
        }
        config.validate(true)?;

        let prompt = prompt
            .map(str::to_string)
            .unwrap_or_else(|| DEFAULT_IMAGE_TO_VIDEO_PROMPT.to_string());

        let request = VideoRequest {
            prompt: Some(prompt.clone()),
            image: Some(ImagePayload {
                bytes_base64_encoded: BASE64.encode(image),
                mime_type: mime_type.to_string(),
            }),
            ..sparse_request(config)
        };
        self.run_video(request, Some(prompt), config.effective(), options)
            .await
    }

    /// Synchronous image generation: every returned image is persisted, the
    /// first one is returned with its bytes.
    pub async fn generate_image(
        &self,
        prompt: &str,
        config: &ImageGenerationConfig,
    ) -> Result<ImageOutcome, GatewayError> {
        validate_prompt(prompt)?;
        config.validate()?;

        let images = self
            .backend
            .generate_images(prompt, config.image_count())
            .await?;
        if images.is_empty() {
            return Err(GatewayError::NoArtifactsReturned);
        }

        let base_id = ArtifactStore::new_id();
        let tasks = images.into_iter().enumerate().map(|(index, image)| {
            let id = item_id(&base_id, index);
            let store = self.image_store.clone();
            async move {
                store
                    .save(
                        &id,
                        &image.bytes,
                        &image.mime_type,
                        Some(prompt),
                        &GenerationSettings::default(),
                    )
                    .await
                    .map(|metadata| (metadata, image.bytes))
            }
        });

        let mut persisted: Vec<(ArtifactMetadata, Bytes)> = Vec::new();
        let mut persist_error = None;
        for result in futures::future::join_all(tasks).await {
            match result {
                Ok(pair) => persisted.push(pair),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to persist generated image");
                    persist_error.get_or_insert(e);
                }
            }
        }

        match persisted.into_iter().next() {
            Some((artifact, bytes)) => Ok(ImageOutcome { artifact, bytes }),
            None => Err(persist_error
                .map(GatewayError::Persistence)
                .unwrap_or(GatewayError::NoArtifactsPersisted)),
        }
    }

    async fn run_video(
        &self,
        request: VideoRequest,
        prompt: Option<String>,
        settings: GenerationSettings,
        options: GenerateOptions,
    ) -> Result<GenerationOutcome, GatewayError> {
        let mut operation = self.backend.start_video_generation(&request).await?;
        tracing::info!(operation = %operation.name, "Started video generation");

        let deadline = Instant::now() + self.config.poll_timeout;
        while !operation.done {
            if Instant::now() >= deadline {
                return Err(GatewayError::TimeoutExceeded(self.config.poll_timeout));
            }
            tokio::time::sleep(self.config.poll_interval).await;
            operation = self.backend.poll_operation(&operation.name).await?;
        }

        if operation.results.is_empty() {
            return Err(GatewayError::NoArtifactsReturned);
        }

        let base_id = ArtifactStore::new_id();
        let prompt = prompt.as_deref();
        let tasks = operation.results.iter().enumerate().map(|(index, result)| {
            let id = item_id(&base_id, index);
            self.resolve_video_result(id, result, prompt, &settings, &options)
        });

        // All downloads run concurrently; a failure in one does not cancel
        // its siblings.
        let mut persisted: Vec<(ArtifactMetadata, Option<Bytes>)> = Vec::new();
        let mut persist_error = None;
        for result in futures::future::join_all(tasks).await {
            match result {
                Ok(Some(pair)) => persisted.push(pair),
                Ok(None) => {}
                Err(GatewayError::Persistence(e)) => {
                    tracing::error!(error = %e, "Failed to persist downloaded artifact");
                    persist_error.get_or_insert(e);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping artifact that failed to resolve");
                }
            }
        }

        let (artifact, bytes) = match persisted.into_iter().next() {
            Some(first) => first,
            None => {
                return Err(persist_error
                    .map(GatewayError::Persistence)
                    .unwrap_or(GatewayError::NoArtifactsPersisted))
            }
        };

        let data_base64 = if options.include_full_data {
            bytes.map(|b| BASE64.encode(&b))
        } else {
            None
        };

        Ok(GenerationOutcome {
            artifact,
            data_base64,
        })
    }

    /// Resolve one result descriptor: download-and-store or defer. `None`
    /// means the descriptor had nothing fetchable and was skipped.
    async fn resolve_video_result(
        &self,
        id: String,
        result: &VideoResult,
        prompt: Option<&str>,
        settings: &GenerationSettings,
        options: &GenerateOptions,
    ) -> Result<Option<(ArtifactMetadata, Option<Bytes>)>, GatewayError> {
        let Some(uri) = result.uri.as_deref() else {
            tracing::warn!(id = %id, "Result descriptor has no fetchable reference, skipping");
            return Ok(None);
        };

        if options.auto_download {
            let bytes = self.backend.download(uri).await?;
            let metadata = self
                .video_store
                .save(&id, &bytes, VIDEO_MIME_TYPE, prompt, settings)
                .await?;
            Ok(Some((metadata, Some(bytes))))
        } else {
            let metadata = self
                .video_store
                .save_deferred(&id, uri, VIDEO_MIME_TYPE, prompt, settings)
                .await?;
            Ok(Some((metadata, None)))
        }
    }
}

/// First item keeps the plain identifier; siblings get a suffixed variant
/// so related artifacts stay distinguishable.
fn item_id(base: &str, index: usize) -> String {
    if index == 0 {
        base.to_string()
    } else {
        format!("{}-{}", base, index)
    }
}

fn sparse_request(config: &VideoGenerationConfig) -> VideoRequest {
    VideoRequest {
        prompt: None,
        image: None,
        aspect_ratio: config.aspect_ratio,
        person_generation: config.person_generation,
        number_of_videos: config.number_of_videos,
        duration_seconds: config.duration_seconds,
        negative_prompt: config.negative_prompt.clone(),
        enhance_prompt: config.enhance_prompt,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{InlineImage, Operation};
    use async_trait::async_trait;
    use genmedia_core::models::AspectRatio;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tempfile::tempdir;

    struct MockBackend {
        results: Vec<VideoResult>,
        polls_until_done: Mutex<u32>,
        downloads: HashMap<String, Result<Vec<u8>, u16>>,
        images: Vec<InlineImage>,
    }

    impl MockBackend {
        fn done_with(results: Vec<VideoResult>) -> Self {
            Self {
                results,
                polls_until_done: Mutex::new(0),
                downloads: HashMap::new(),
                images: Vec::new(),
            }
        }

        fn with_download(mut self, uri: &str, result: Result<Vec<u8>, u16>) -> Self {
            self.downloads.insert(uri.to_string(), result);
            self
        }

        fn pending_forever() -> Self {
            Self {
                results: Vec::new(),
                polls_until_done: Mutex::new(u32::MAX),
                downloads: HashMap::new(),
                images: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl GenerationBackend for MockBackend {
        async fn generate_images(
            &self,
            _prompt: &str,
            _count: u32,
        ) -> Result<Vec<InlineImage>, GatewayError> {
            Ok(self.images.clone())
        }

        async fn start_video_generation(
            &self,
            _request: &VideoRequest,
        ) -> Result<Operation, GatewayError> {
            let pending = *self.polls_until_done.lock().unwrap();
            Ok(Operation {
                name: "operations/test".to_string(),
                done: pending == 0,
                results: if pending == 0 { self.results.clone() } else { Vec::new() },
            })
        }

        async fn poll_operation(&self, name: &str) -> Result<Operation, GatewayError> {
            let mut pending = self.polls_until_done.lock().unwrap();
            if *pending > 0 && *pending != u32::MAX {
                *pending -= 1;
            }
            Ok(Operation {
                name: name.to_string(),
                done: *pending == 0,
                results: if *pending == 0 { self.results.clone() } else { Vec::new() },
            })
        }

        async fn download(&self, uri: &str) -> Result<Bytes, GatewayError> {
            match self.downloads.get(uri) {
                Some(Ok(bytes)) => Ok(Bytes::from(bytes.clone())),
                Some(Err(status)) => Err(GatewayError::DownloadFailed {
                    status: *status,
                    message: "mock failure".to_string(),
                }),
                None => Err(GatewayError::DownloadFailed {
                    status: 404,
                    message: format!("no mock download for {}", uri),
                }),
            }
        }
    }

    fn uri_result(uri: &str) -> VideoResult {
        VideoResult {
            uri: Some(uri.to_string()),
        }
    }

    async fn gateway_with(backend: MockBackend) -> (Gateway, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let video_store = ArtifactStore::new(dir.path()).await.unwrap();
        let image_store = ArtifactStore::new(dir.path().join("images")).await.unwrap();
        let config = GatewayConfig {
            poll_interval: Duration::from_millis(1),
            poll_timeout: Duration::from_millis(50),
        };
        (
            Gateway::new(Arc::new(backend), video_store, image_store, config),
            dir,
        )
    }

    #[tokio::test]
    async fn text_generation_persists_and_defaults_config() {
        let backend = MockBackend::done_with(vec![uri_result("https://r/a.mp4")])
            .with_download("https://r/a.mp4", Ok(b"video-bytes".to_vec()));
        let (gateway, _dir) = gateway_with(backend).await;

        let outcome = gateway
            .generate_video_from_text(
                "a cat surfing",
                &VideoGenerationConfig::default(),
                GenerateOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(outcome.artifact.prompt.as_deref(), Some("a cat surfing"));
        assert_eq!(outcome.artifact.size, 11);
        assert_eq!(outcome.artifact.config.aspect_ratio, Some(AspectRatio::Wide));
        assert_eq!(outcome.artifact.config.duration_seconds, Some(5));
        assert!(outcome.data_base64.is_none());
    }

    #[tokio::test]
    async fn include_full_data_returns_encoded_bytes() {
        let backend = MockBackend::done_with(vec![uri_result("https://r/a.mp4")])
            .with_download("https://r/a.mp4", Ok(b"abc".to_vec()));
        let (gateway, _dir) = gateway_with(backend).await;

        let outcome = gateway
            .generate_video_from_text(
                "a dog",
                &VideoGenerationConfig::default(),
                GenerateOptions {
                    auto_download: true,
                    include_full_data: true,
                },
            )
            .await
            .unwrap();

        assert_eq!(outcome.data_base64.as_deref(), Some("YWJj"));
    }

    #[tokio::test]
    async fn partial_download_failure_still_succeeds() {
        let backend = MockBackend::done_with(vec![
            uri_result("https://r/good.mp4"),
            uri_result("https://r/bad.mp4"),
        ])
        .with_download("https://r/good.mp4", Ok(b"ok".to_vec()))
        .with_download("https://r/bad.mp4", Err(500));
        let (gateway, dir) = gateway_with(backend).await;

        let outcome = gateway
            .generate_video_from_text(
                "two videos",
                &VideoGenerationConfig {
                    number_of_videos: Some(2),
                    ..Default::default()
                },
                GenerateOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(outcome.artifact.size, 2);

        // exactly one binary + one sidecar on disk
        let store = ArtifactStore::new(dir.path()).await.unwrap();
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn total_failure_yields_no_artifacts_persisted() {
        let backend = MockBackend::done_with(vec![
            VideoResult { uri: None },
            VideoResult { uri: None },
        ]);
        let (gateway, dir) = gateway_with(backend).await;

        let result = gateway
            .generate_video_from_text(
                "nothing fetchable",
                &VideoGenerationConfig::default(),
                GenerateOptions::default(),
            )
            .await;

        assert!(matches!(result, Err(GatewayError::NoArtifactsPersisted)));

        let store = ArtifactStore::new(dir.path()).await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_result_list_yields_no_artifacts_returned() {
        let backend = MockBackend::done_with(Vec::new());
        let (gateway, _dir) = gateway_with(backend).await;

        let result = gateway
            .generate_video_from_text(
                "empty",
                &VideoGenerationConfig::default(),
                GenerateOptions::default(),
            )
            .await;

        assert!(matches!(result, Err(GatewayError::NoArtifactsReturned)));
    }

    #[tokio::test]
    async fn deferred_download_keeps_remote_reference() {
        let backend = MockBackend::done_with(vec![uri_result("https://r/a.mp4?sig=s")]);
        let (gateway, dir) = gateway_with(backend).await;

        let outcome = gateway
            .generate_video_from_text(
                "defer me",
                &VideoGenerationConfig::default(),
                GenerateOptions {
                    auto_download: false,
                    include_full_data: false,
                },
            )
            .await
            .unwrap();

        assert_eq!(outcome.artifact.filepath, "");
        assert_eq!(outcome.artifact.size, 0);
        assert_eq!(outcome.artifact.video_url.as_deref(), Some("https://r/a.mp4?sig=s"));

        // no binary written, just the sidecar
        let mut entries = tokio::fs::read_dir(dir.path()).await.unwrap();
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            if entry.file_type().await.unwrap().is_file() {
                files.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with(".json"));
    }

    #[tokio::test]
    async fn sibling_artifacts_get_suffixed_ids() {
        let backend = MockBackend::done_with(vec![
            uri_result("https://r/a.mp4"),
            uri_result("https://r/b.mp4"),
        ])
        .with_download("https://r/a.mp4", Ok(b"a".to_vec()))
        .with_download("https://r/b.mp4", Ok(b"b".to_vec()));
        let (gateway, dir) = gateway_with(backend).await;

        let outcome = gateway
            .generate_video_from_text(
                "two",
                &VideoGenerationConfig {
                    number_of_videos: Some(2),
                    ..Default::default()
                },
                GenerateOptions::default(),
            )
            .await
            .unwrap();

        let store = ArtifactStore::new(dir.path()).await.unwrap();
        let ids: Vec<String> = store.list().await.unwrap().into_iter().map(|m| m.id).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&outcome.artifact.id));
        assert!(ids.contains(&format!("{}-1", outcome.artifact.id)));
    }

    #[tokio::test]
    async fn poll_timeout_surfaces() {
        let backend = MockBackend::pending_forever();
        let (gateway, _dir) = gateway_with(backend).await;

        let result = gateway
            .generate_video_from_text(
                "stuck job",
                &VideoGenerationConfig::default(),
                GenerateOptions::default(),
            )
            .await;

        assert!(matches!(result, Err(GatewayError::TimeoutExceeded(_))));
    }

    #[tokio::test]
    async fn polling_reaches_completion() {
        let mut backend = MockBackend::done_with(vec![uri_result("https://r/a.mp4")]);
        backend = backend.with_download("https://r/a.mp4", Ok(b"late".to_vec()));
        *backend.polls_until_done.lock().unwrap() = 2;
        let (gateway, _dir) = gateway_with(backend).await;

        let outcome = gateway
            .generate_video_from_text(
                "slow job",
                &VideoGenerationConfig::default(),
                GenerateOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(outcome.artifact.size, 4);
    }

    #[tokio::test]
    async fn invalid_duration_rejected_before_remote_call() {
        let backend = MockBackend::done_with(Vec::new());
        let (gateway, _dir) = gateway_with(backend).await;

        let result = gateway
            .generate_video_from_text(
                "bad duration",
                &VideoGenerationConfig {
                    duration_seconds: Some(9),
                    ..Default::default()
                },
                GenerateOptions::default(),
            )
            .await;

        assert!(matches!(result, Err(GatewayError::Validation(_))));
    }

    #[tokio::test]
    async fn image_generation_persists_all_and_returns_first() {
        let mut backend = MockBackend::done_with(Vec::new());
        backend.images = vec![
            InlineImage {
                bytes: Bytes::from_static(b"first"),
                mime_type: "image/png".to_string(),
            },
            InlineImage {
                bytes: Bytes::from_static(b"second"),
                mime_type: "image/png".to_string(),
            },
        ];
        let (gateway, dir) = gateway_with(backend).await;

        let outcome = gateway
            .generate_image(
                "two images",
                &ImageGenerationConfig {
                    number_of_images: Some(2),
                },
            )
            .await
            .unwrap();

        assert_eq!(outcome.bytes.as_ref(), b"first");
        assert_eq!(outcome.artifact.mime_type, "image/png");

        let store = ArtifactStore::new(dir.path().join("images")).await.unwrap();
        assert_eq!(store.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn image_generation_with_no_results_fails() {
        let backend = MockBackend::done_with(Vec::new());
        let (gateway, _dir) = gateway_with(backend).await;

        let result = gateway
            .generate_image("empty", &ImageGenerationConfig::default())
            .await;

        assert!(matches!(result, Err(GatewayError::NoArtifactsReturned)));
    }
}
