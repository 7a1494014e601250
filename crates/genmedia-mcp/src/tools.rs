//! MCP tool request types with JSON Schema for AI parameter generation
//!
//! Boolean flags accept either real booleans or their string forms; the
//! coercion rule lives here, at the tool-input boundary, so truthy-string
//! handling never leaks into the gateway.

use genmedia_core::models::{
    AspectRatio, ImageGenerationConfig, PersonGeneration, VideoGenerationConfig,
};
use genmedia_genai::gateway::GenerateOptions;
use schemars::JsonSchema;
use serde::Deserialize;

/// A boolean that may arrive as a JSON bool or a string. "true" and "1"
/// (case-insensitive) are true; anything else is false.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum BoolOrString {
    Bool(bool),
    Text(String),
}

impl BoolOrString {
    pub fn as_bool(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Text(s) => {
                let s = s.trim();
                s.eq_ignore_ascii_case("true") || s == "1"
            }
        }
    }
}

/// Resolve an optional flag against its default. The default applies only
/// when the field is entirely absent, never when it is present-but-falsy.
pub fn flag_or(value: &Option<BoolOrString>, default: bool) -> bool {
    value.as_ref().map(BoolOrString::as_bool).unwrap_or(default)
}

#[derive(Debug, Clone, Copy, Deserialize, JsonSchema)]
pub enum AspectRatioParam {
    #[serde(rename = "16:9")]
    Wide,
    #[serde(rename = "9:16")]
    Tall,
}

impl From<AspectRatioParam> for AspectRatio {
    fn from(param: AspectRatioParam) -> Self {
        match param {
            AspectRatioParam::Wide => AspectRatio::Wide,
            AspectRatioParam::Tall => AspectRatio::Tall,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PersonGenerationParam {
    DontAllow,
    AllowAdult,
}

impl From<PersonGenerationParam> for PersonGeneration {
    fn from(param: PersonGenerationParam) -> Self {
        match param {
            PersonGenerationParam::DontAllow => PersonGeneration::DontAllow,
            PersonGenerationParam::AllowAdult => PersonGeneration::AllowAdult,
        }
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GenerateVideoFromTextRequest {
    #[schemars(description = "Text prompt describing the video (1-1000 characters)")]
    pub prompt: String,
    #[schemars(description = "Aspect ratio: \"16:9\" or \"9:16\"")]
    pub aspect_ratio: Option<AspectRatioParam>,
    #[schemars(description = "Person generation policy: dont_allow or allow_adult")]
    pub person_generation: Option<PersonGenerationParam>,
    #[schemars(description = "Number of videos to generate (1 or 2)")]
    pub number_of_videos: Option<u32>,
    #[schemars(description = "Video duration in seconds (5-8)")]
    pub duration_seconds: Option<u32>,
    #[schemars(description = "Things to avoid in the generated video")]
    pub negative_prompt: Option<String>,
    #[schemars(description = "Let the service rewrite the prompt for better results")]
    pub enhance_prompt: Option<BoolOrString>,
    #[schemars(description = "Download the video to local storage (default true)")]
    pub auto_download: Option<BoolOrString>,
    #[schemars(description = "Include the full video data base64-encoded in the response")]
    pub include_full_data: Option<BoolOrString>,
}

impl GenerateVideoFromTextRequest {
    pub fn video_config(&self) -> VideoGenerationConfig {
        VideoGenerationConfig {
            aspect_ratio: self.aspect_ratio.map(Into::into),
            person_generation: self.person_generation.map(Into::into),
            number_of_videos: self.number_of_videos,
            duration_seconds: self.duration_seconds,
            negative_prompt: self.negative_prompt.clone(),
            enhance_prompt: self.enhance_prompt.as_ref().map(BoolOrString::as_bool),
        }
    }

    pub fn options(&self) -> GenerateOptions {
        GenerateOptions {
            auto_download: flag_or(&self.auto_download, true),
            include_full_data: flag_or(&self.include_full_data, false),
        }
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GenerateVideoFromImageRequest {
    #[schemars(description = "Source image: base64 data, a data: URL, an http(s) URL, or an absolute file path")]
    pub image: String,
    #[schemars(description = "MIME type hint for the image when it cannot be inferred")]
    pub mime_type: Option<String>,
    #[schemars(description = "Optional prompt guiding the animation (1-1000 characters)")]
    pub prompt: Option<String>,
    #[schemars(description = "Aspect ratio: \"16:9\" or \"9:16\"")]
    pub aspect_ratio: Option<AspectRatioParam>,
    #[schemars(description = "Number of videos to generate (1 or 2)")]
    pub number_of_videos: Option<u32>,
    #[schemars(description = "Video duration in seconds (5-8)")]
    pub duration_seconds: Option<u32>,
    #[schemars(description = "Things to avoid in the generated video")]
    pub negative_prompt: Option<String>,
    #[schemars(description = "Download the video to local storage (default true)")]
    pub auto_download: Option<BoolOrString>,
    #[schemars(description = "Include the full video data base64-encoded in the response")]
    pub include_full_data: Option<BoolOrString>,
}

impl GenerateVideoFromImageRequest {
    pub fn video_config(&self) -> VideoGenerationConfig {
        VideoGenerationConfig {
            aspect_ratio: self.aspect_ratio.map(Into::into),
            person_generation: None,
            number_of_videos: self.number_of_videos,
            duration_seconds: self.duration_seconds,
            negative_prompt: self.negative_prompt.clone(),
            enhance_prompt: None,
        }
    }

    pub fn options(&self) -> GenerateOptions {
        GenerateOptions {
            auto_download: flag_or(&self.auto_download, true),
            include_full_data: flag_or(&self.include_full_data, false),
        }
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GenerateImageRequest {
    #[schemars(description = "Text prompt describing the image (1-1000 characters)")]
    pub prompt: String,
    #[schemars(description = "Number of images to generate (1-4)")]
    pub number_of_images: Option<u32>,
    #[schemars(description = "Include the full image data base64-encoded in the response")]
    pub include_full_data: Option<BoolOrString>,
}

impl GenerateImageRequest {
    pub fn image_config(&self) -> ImageGenerationConfig {
        ImageGenerationConfig {
            number_of_images: self.number_of_images,
        }
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GenerateVideoFromGeneratedImageRequest {
    #[schemars(description = "Prompt for the intermediate image (1-1000 characters)")]
    pub image_prompt: String,
    #[schemars(description = "Optional prompt guiding the video; defaults to animating the image")]
    pub video_prompt: Option<String>,
    #[schemars(description = "Aspect ratio: \"16:9\" or \"9:16\"")]
    pub aspect_ratio: Option<AspectRatioParam>,
    #[schemars(description = "Number of videos to generate (1 or 2)")]
    pub number_of_videos: Option<u32>,
    #[schemars(description = "Video duration in seconds (5-8)")]
    pub duration_seconds: Option<u32>,
    #[schemars(description = "Things to avoid in the generated video")]
    pub negative_prompt: Option<String>,
    #[schemars(description = "Download the video to local storage (default true)")]
    pub auto_download: Option<BoolOrString>,
    #[schemars(description = "Include the full video data base64-encoded in the response")]
    pub include_full_data: Option<BoolOrString>,
}

impl GenerateVideoFromGeneratedImageRequest {
    pub fn video_config(&self) -> VideoGenerationConfig {
        VideoGenerationConfig {
            aspect_ratio: self.aspect_ratio.map(Into::into),
            person_generation: None,
            number_of_videos: self.number_of_videos,
            duration_seconds: self.duration_seconds,
            negative_prompt: self.negative_prompt.clone(),
            enhance_prompt: None,
        }
    }

    pub fn options(&self) -> GenerateOptions {
        GenerateOptions {
            auto_download: flag_or(&self.auto_download, true),
            include_full_data: flag_or(&self.include_full_data, false),
        }
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetImageRequest {
    #[schemars(description = "Identifier of the stored image")]
    pub id: String,
    #[schemars(description = "Include the full image data base64-encoded in the response")]
    pub include_full_data: Option<BoolOrString>,
}
