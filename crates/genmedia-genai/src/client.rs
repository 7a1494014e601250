//! HTTP client for the remote generation API.
//!
//! Speaks the Google Generative Language REST surface: a synchronous
//! `:predict` call for images and a `:predictLongRunning` call plus
//! operation polling for video. All response shape variants are collapsed
//! into [`Operation`] here, in one parse step.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use bytes::Bytes;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::backend::{GenerationBackend, ImagePayload, InlineImage, Operation, VideoRequest, VideoResult};
use crate::error::GatewayError;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const VIDEO_MODEL: &str = "veo-2.0-generate-001";
const IMAGE_MODEL: &str = "imagen-3.0-generate-002";
const REQUEST_TIMEOUT_SECS: u64 = 120;

pub struct GenAiClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl GenAiClient {
    pub fn new(api_key: String) -> Result<Self, GatewayError> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn build_url(&self, path: &str) -> String {
        format!("{}/{}?key={}", self.base_url, path, self.api_key)
    }

    async fn post_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<T, GatewayError> {
        let response = self.client.post(self.build_url(path)).json(body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(GatewayError::RemoteCallFailed(format!(
                "status {}: {}",
                status, text
            )));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl GenerationBackend for GenAiClient {
    async fn generate_images(
        &self,
        prompt: &str,
        count: u32,
    ) -> Result<Vec<InlineImage>, GatewayError> {
        let body = PredictRequest {
            instances: vec![ImageInstanceWire { prompt }],
            parameters: ImageParametersWire {
                sample_count: count,
            },
        };

        let response: PredictResponseWire = self
            .post_json(&format!("models/{}:predict", IMAGE_MODEL), &body)
            .await?;

        let mut images = Vec::with_capacity(response.predictions.len());
        for prediction in response.predictions {
            let encoded = match prediction.bytes_base64_encoded {
                Some(encoded) => encoded,
                None => {
                    tracing::warn!("Image prediction without inline bytes, skipping");
                    continue;
                }
            };
            let bytes = BASE64.decode(encoded.as_bytes()).map_err(|e| {
                GatewayError::RemoteCallFailed(format!("undecodable image payload: {}", e))
            })?;
            images.push(InlineImage {
                bytes: Bytes::from(bytes),
                mime_type: prediction
                    .mime_type
                    .unwrap_or_else(|| "image/png".to_string()),
            });
        }

        Ok(images)
    }

    async fn start_video_generation(
        &self,
        request: &VideoRequest,
    ) -> Result<Operation, GatewayError> {
        let body = VideoPredictRequest::from(request);
        let wire: OperationWire = self
            .post_json(&format!("models/{}:predictLongRunning", VIDEO_MODEL), &body)
            .await?;
        wire.into_operation()
    }

    async fn poll_operation(&self, name: &str) -> Result<Operation, GatewayError> {
        let response = self.client.get(self.build_url(name)).send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(GatewayError::RemoteCallFailed(format!(
                "poll status {}: {}",
                status, text
            )));
        }

        let wire: OperationWire = response.json().await?;
        wire.into_operation()
    }

    async fn download(&self, uri: &str) -> Result<Bytes, GatewayError> {
        // Signed uris require the credential appended as a query parameter.
        let separator = if uri.contains('?') { '&' } else { '?' };
        let url = format!("{}{}key={}", uri, separator, self.api_key);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::DownloadFailed {
                status: status.as_u16(),
                message: response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string()),
            });
        }

        Ok(response.bytes().await?)
    }
}

// Wire types. The operation response has shipped in two shapes; both are
// handled by one untagged parse and converted to the canonical Operation.

#[derive(Serialize)]
struct PredictRequest<'a> {
    instances: Vec<ImageInstanceWire<'a>>,
    parameters: ImageParametersWire,
}

#[derive(Serialize)]
struct ImageInstanceWire<'a> {
    prompt: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageParametersWire {
    sample_count: u32,
}

#[derive(Deserialize)]
struct PredictResponseWire {
    #[serde(default)]
    predictions: Vec<ImagePredictionWire>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImagePredictionWire {
    bytes_base64_encoded: Option<String>,
    mime_type: Option<String>,
}

#[derive(Serialize)]
struct VideoPredictRequest {
    instances: Vec<VideoInstanceWire>,
    parameters: VideoParametersWire,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VideoInstanceWire {
    #[serde(skip_serializing_if = "Option::is_none")]
    prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<ImagePayload>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VideoParametersWire {
    #[serde(skip_serializing_if = "Option::is_none")]
    aspect_ratio: Option<genmedia_core::models::AspectRatio>,
    #[serde(skip_serializing_if = "Option::is_none")]
    person_generation: Option<genmedia_core::models::PersonGeneration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    number_of_videos: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_seconds: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    negative_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    enhance_prompt: Option<bool>,
}

impl From<&VideoRequest> for VideoPredictRequest {
    fn from(request: &VideoRequest) -> Self {
        Self {
            instances: vec![VideoInstanceWire {
                prompt: request.prompt.clone(),
                image: request.image.clone(),
            }],
            parameters: VideoParametersWire {
                aspect_ratio: request.aspect_ratio,
                person_generation: request.person_generation,
                number_of_videos: request.number_of_videos,
                duration_seconds: request.duration_seconds,
                negative_prompt: request.negative_prompt.clone(),
                enhance_prompt: request.enhance_prompt,
            },
        }
    }
}

#[derive(Deserialize)]
struct OperationWire {
    name: String,
    #[serde(default)]
    done: bool,
    error: Option<OperationErrorWire>,
    response: Option<OperationResponseWire>,
}

#[derive(Deserialize)]
struct OperationErrorWire {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OperationResponseWire {
    Nested {
        #[serde(rename = "generateVideoResponse")]
        generate_video_response: GenerateVideoResponseWire,
    },
    Flat {
        #[serde(rename = "generatedVideos", default)]
        generated_videos: Vec<GeneratedVideoWire>,
    },
}

#[derive(Deserialize)]
struct GenerateVideoResponseWire {
    #[serde(rename = "generatedSamples", default)]
    generated_samples: Vec<GeneratedVideoWire>,
}

#[derive(Deserialize)]
struct GeneratedVideoWire {
    video: Option<VideoRefWire>,
    uri: Option<String>,
}

#[derive(Deserialize)]
struct VideoRefWire {
    uri: Option<String>,
}

impl GeneratedVideoWire {
    fn into_result(self) -> VideoResult {
        VideoResult {
            uri: self.video.and_then(|v| v.uri).or(self.uri),
        }
    }
}

impl OperationWire {
    fn into_operation(self) -> Result<Operation, GatewayError> {
        if let Some(error) = self.error {
            return Err(GatewayError::RemoteCallFailed(format!(
                "operation error {}: {}",
                error.code, error.message
            )));
        }

        let results = match self.response {
            Some(OperationResponseWire::Nested {
                generate_video_response,
            }) => generate_video_response
                .generated_samples
                .into_iter()
                .map(GeneratedVideoWire::into_result)
                .collect(),
            Some(OperationResponseWire::Flat { generated_videos }) => generated_videos
                .into_iter()
                .map(GeneratedVideoWire::into_result)
                .collect(),
            None => Vec::new(),
        };

        Ok(Operation {
            name: self.name,
            done: self.done,
            results,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_operation_shape() {
        let json = serde_json::json!({
            "name": "operations/abc",
            "done": true,
            "response": {
                "generateVideoResponse": {
                    "generatedSamples": [
                        { "video": { "uri": "https://example.com/a.mp4" } },
                        { "video": {} }
                    ]
                }
            }
        });
        let wire: OperationWire = serde_json::from_value(json).unwrap();
        let op = wire.into_operation().unwrap();
        assert!(op.done);
        assert_eq!(op.results.len(), 2);
        assert_eq!(op.results[0].uri.as_deref(), Some("https://example.com/a.mp4"));
        assert!(op.results[1].uri.is_none());
    }

    #[test]
    fn parses_flat_operation_shape() {
        let json = serde_json::json!({
            "name": "operations/abc",
            "done": true,
            "response": {
                "generatedVideos": [
                    { "uri": "https://example.com/b.mp4" }
                ]
            }
        });
        let wire: OperationWire = serde_json::from_value(json).unwrap();
        let op = wire.into_operation().unwrap();
        assert_eq!(op.results[0].uri.as_deref(), Some("https://example.com/b.mp4"));
    }

    #[test]
    fn pending_operation_has_no_results() {
        let json = serde_json::json!({ "name": "operations/abc" });
        let wire: OperationWire = serde_json::from_value(json).unwrap();
        let op = wire.into_operation().unwrap();
        assert!(!op.done);
        assert!(op.results.is_empty());
    }

    #[test]
    fn operation_error_surfaces_as_remote_failure() {
        let json = serde_json::json!({
            "name": "operations/abc",
            "done": true,
            "error": { "code": 13, "message": "internal" }
        });
        let wire: OperationWire = serde_json::from_value(json).unwrap();
        assert!(matches!(
            wire.into_operation(),
            Err(GatewayError::RemoteCallFailed(_))
        ));
    }

    #[test]
    fn sparse_request_omits_unset_fields() {
        let request = VideoRequest {
            prompt: Some("a cat".to_string()),
            duration_seconds: Some(6),
            ..Default::default()
        };
        let json = serde_json::to_value(VideoPredictRequest::from(&request)).unwrap();
        assert_eq!(json["instances"][0]["prompt"], "a cat");
        assert_eq!(json["parameters"]["durationSeconds"], 6);
        assert!(json["parameters"].get("aspectRatio").is_none());
        assert!(json["parameters"].get("numberOfVideos").is_none());
    }
}
