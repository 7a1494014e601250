//! Image input normalizer.
//!
//! Callers may hand us an image as inline base64 data, a remote URL, or a
//! local file path. This resolves any of the three into canonical bytes
//! plus a MIME type. Classification is best-effort string inspection;
//! inline payloads that fail to base64-decode are rejected up front rather
//! than passed through to fail opaquely downstream, and every branch
//! rejects empty payloads.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use tokio::fs;

use crate::error::GatewayError;

const FALLBACK_MIME_TYPE: &str = "image/png";

/// How a caller-supplied image reference was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSource {
    Url,
    Path,
    Inline,
}

impl ImageSource {
    pub fn classify(input: &str) -> Self {
        if input.starts_with("http://") || input.starts_with("https://") {
            Self::Url
        } else if input.starts_with('/') || looks_like_drive_path(input) {
            Self::Path
        } else {
            Self::Inline
        }
    }
}

/// Windows-style `C:\` or `C:/` prefix.
fn looks_like_drive_path(input: &str) -> bool {
    let bytes = input.as_bytes();
    bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes[2] == b'\\' || bytes[2] == b'/')
}

#[derive(Debug, Clone)]
pub struct ResolvedImage {
    pub bytes: Bytes,
    pub mime_type: String,
}

pub struct ImageNormalizer {
    http: reqwest::Client,
}

impl Default for ImageNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageNormalizer {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    /// Resolve an image reference into bytes and a MIME type. The MIME type
    /// is never empty: it comes from the source where available, then the
    /// caller's hint, then a generic default.
    pub async fn resolve(
        &self,
        input: &str,
        mime_hint: Option<&str>,
    ) -> Result<ResolvedImage, GatewayError> {
        match ImageSource::classify(input) {
            ImageSource::Url => self.resolve_url(input, mime_hint).await,
            ImageSource::Path => resolve_path(input, mime_hint).await,
            ImageSource::Inline => resolve_inline(input, mime_hint),
        }
    }

    async fn resolve_url(
        &self,
        url: &str,
        mime_hint: Option<&str>,
    ) -> Result<ResolvedImage, GatewayError> {
        let response = self.http.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::FetchFailed {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let mime_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
            .filter(|v| !v.is_empty())
            .or_else(|| mime_hint.map(str::to_string))
            .unwrap_or_else(|| FALLBACK_MIME_TYPE.to_string());

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(GatewayError::Validation(format!(
                "image fetched from {} is empty",
                url
            )));
        }
        Ok(ResolvedImage { bytes, mime_type })
    }
}

async fn resolve_path(path: &str, mime_hint: Option<&str>) -> Result<ResolvedImage, GatewayError> {
    let bytes = fs::read(path).await?;
    if bytes.is_empty() {
        return Err(GatewayError::Validation(format!(
            "image file {} is empty",
            path
        )));
    }

    let mime_type = mime_for_extension(path)
        .map(str::to_string)
        .or_else(|| mime_hint.map(str::to_string))
        .unwrap_or_else(|| FALLBACK_MIME_TYPE.to_string());

    Ok(ResolvedImage {
        bytes: Bytes::from(bytes),
        mime_type,
    })
}

fn resolve_inline(input: &str, mime_hint: Option<&str>) -> Result<ResolvedImage, GatewayError> {
    // data-URL form carries its own mime type
    let (payload, data_url_mime) = match strip_data_url(input) {
        Some((mime, payload)) => (payload, Some(mime)),
        None => (input, None),
    };

    let bytes = BASE64.decode(payload.trim().as_bytes()).map_err(|e| {
        GatewayError::Validation(format!(
            "image input is neither a URL, an absolute path, nor valid base64 data: {}",
            e
        ))
    })?;

    if bytes.is_empty() {
        return Err(GatewayError::Validation("image data is empty".to_string()));
    }

    let mime_type = data_url_mime
        .map(str::to_string)
        .or_else(|| mime_hint.map(str::to_string))
        .unwrap_or_else(|| FALLBACK_MIME_TYPE.to_string());

    Ok(ResolvedImage {
        bytes: Bytes::from(bytes),
        mime_type,
    })
}

/// Split `data:image/png;base64,AAAA` into ("image/png", "AAAA").
fn strip_data_url(input: &str) -> Option<(&str, &str)> {
    let rest = input.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let mime = header.strip_suffix(";base64").unwrap_or(header);
    Some((mime, payload))
}

fn mime_for_extension(path: &str) -> Option<&'static str> {
    let ext = path.rsplit('.').next()?;
    match ext.to_ascii_lowercase().as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}
