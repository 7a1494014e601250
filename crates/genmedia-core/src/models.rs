//! Artifact metadata and generation configuration
//!
//! `ArtifactMetadata` is the sidecar record persisted next to each stored
//! binary. Field names serialize in camelCase to match the on-disk format
//! (`createdAt`, `mimeType`, `videoUrl`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub const MIN_DURATION_SECONDS: u32 = 5;
pub const MAX_DURATION_SECONDS: u32 = 8;
pub const DEFAULT_DURATION_SECONDS: u32 = 5;
pub const MAX_VIDEOS_PER_REQUEST: u32 = 2;
pub const MAX_IMAGES_PER_REQUEST: u32 = 4;
pub const MIN_PROMPT_CHARS: usize = 1;
pub const MAX_PROMPT_CHARS: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "16:9")]
    Wide,
    #[serde(rename = "9:16")]
    Tall,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonGeneration {
    #[default]
    DontAllow,
    AllowAdult,
}

/// Caller-facing video generation options. All fields are optional; unset
/// fields are defaulted by [`VideoGenerationConfig::effective`] before the
/// request leaves the gateway.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoGenerationConfig {
    pub aspect_ratio: Option<AspectRatio>,
    pub person_generation: Option<PersonGeneration>,
    pub number_of_videos: Option<u32>,
    pub duration_seconds: Option<u32>,
    pub negative_prompt: Option<String>,
    pub enhance_prompt: Option<bool>,
}

impl VideoGenerationConfig {
    /// Range checks applied defensively even though the tool schema layer
    /// validates first. `from_image` tightens the person-generation policy:
    /// `allow_adult` is only valid for text-originated generation.
    pub fn validate(&self, from_image: bool) -> Result<(), ValidationError> {
        if let Some(duration) = self.duration_seconds {
            if !(MIN_DURATION_SECONDS..=MAX_DURATION_SECONDS).contains(&duration) {
                return Err(ValidationError::new(format!(
                    "durationSeconds must be between {} and {}, got {}",
                    MIN_DURATION_SECONDS, MAX_DURATION_SECONDS, duration
                )));
            }
        }
        if let Some(count) = self.number_of_videos {
            if count == 0 || count > MAX_VIDEOS_PER_REQUEST {
                return Err(ValidationError::new(format!(
                    "numberOfVideos must be 1 or {}, got {}",
                    MAX_VIDEOS_PER_REQUEST, count
                )));
            }
        }
        if from_image && self.person_generation == Some(PersonGeneration::AllowAdult) {
            return Err(ValidationError::new(
                "allow_adult person generation is only valid for text-to-video requests",
            ));
        }
        Ok(())
    }

    /// Resolve defaults into the settings snapshot persisted with each
    /// artifact. This records what was actually requested, not raw caller
    /// input.
    pub fn effective(&self) -> GenerationSettings {
        GenerationSettings {
            aspect_ratio: Some(self.aspect_ratio.unwrap_or_default()),
            person_generation: Some(self.person_generation.unwrap_or_default()),
            duration_seconds: Some(self.duration_seconds.unwrap_or(DEFAULT_DURATION_SECONDS)),
        }
    }

    pub fn video_count(&self) -> u32 {
        self.number_of_videos.unwrap_or(1)
    }
}

/// Caller-facing image generation options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageGenerationConfig {
    pub number_of_images: Option<u32>,
}

impl ImageGenerationConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(count) = self.number_of_images {
            if count == 0 || count > MAX_IMAGES_PER_REQUEST {
                return Err(ValidationError::new(format!(
                    "numberOfImages must be between 1 and {}, got {}",
                    MAX_IMAGES_PER_REQUEST, count
                )));
            }
        }
        Ok(())
    }

    pub fn image_count(&self) -> u32 {
        self.number_of_images.unwrap_or(1)
    }
}

/// Snapshot of effective generation settings stored in artifact metadata.
/// Image artifacts leave all fields unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<AspectRatio>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub person_generation: Option<PersonGeneration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u32>,
}

/// One stored artifact's sidecar record.
///
/// `size == 0` with an empty `filepath` and a present `video_url` marks a
/// deferred artifact: no local copy, remote reference only. The sidecar and
/// the binary are not written atomically, so readers must tolerate a sidecar
/// whose binary is missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactMetadata {
    pub id: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default)]
    pub config: GenerationSettings,
    pub mime_type: String,
    pub size: u64,
    pub filepath: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
}

impl ArtifactMetadata {
    pub fn is_deferred(&self) -> bool {
        self.filepath.is_empty() && self.video_url.is_some()
    }
}

/// Prompt length check shared by all generation paths.
pub fn validate_prompt(prompt: &str) -> Result<(), ValidationError> {
    let len = prompt.chars().count();
    if !(MIN_PROMPT_CHARS..=MAX_PROMPT_CHARS).contains(&len) {
        return Err(ValidationError::new(format!(
            "prompt must be {} to {} characters, got {}",
            MIN_PROMPT_CHARS, MAX_PROMPT_CHARS, len
        )));
    }
    Ok(())
}
