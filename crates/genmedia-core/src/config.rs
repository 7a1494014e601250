//! Environment configuration
//!
//! Startup-time settings for the server binary. The remote API credential
//! is required; everything else has a default. A missing credential fails
//! process startup rather than degrading at request time.

use std::env;
use std::path::PathBuf;

use anyhow::Context;

/// Default root directory for stored artifacts.
pub const DEFAULT_STORAGE_DIR: &str = "./generated-media";

/// Subdirectory of the storage root holding image artifacts.
pub const IMAGES_SUBDIR: &str = "images";

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Credential forwarded to the remote generation service.
    pub api_key: String,
    /// Root storage directory. Videos live directly under it, images under
    /// `images/`.
    pub storage_dir: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let api_key = env::var("GEMINI_API_KEY")
            .context("Missing API key. Set the GEMINI_API_KEY environment variable")?;

        let storage_dir = env::var("GENMEDIA_STORAGE_DIR")
            .unwrap_or_else(|_| DEFAULT_STORAGE_DIR.to_string());

        Ok(Self {
            api_key,
            storage_dir: PathBuf::from(storage_dir),
        })
    }

    /// Directory for image artifacts and their sidecars.
    pub fn image_dir(&self) -> PathBuf {
        self.storage_dir.join(IMAGES_SUBDIR)
    }
}
