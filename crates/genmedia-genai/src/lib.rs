//! Remote generation gateway
//!
//! Turns normalized generation requests into stored (or deferred)
//! artifacts: invokes the remote generative API, polls long-running video
//! operations to completion, fans out over returned artifacts, and persists
//! them through the local artifact store. Also resolves heterogeneous image
//! inputs (inline data, URL, file path) into canonical bytes.

pub mod backend;
pub mod client;
pub mod error;
pub mod gateway;
pub mod normalize;

pub use backend::{GenerationBackend, InlineImage, Operation, VideoRequest, VideoResult};
pub use client::GenAiClient;
pub use error::GatewayError;
pub use gateway::{Gateway, GatewayConfig, GenerateOptions, GenerationOutcome, ImageOutcome};
pub use normalize::{ImageNormalizer, ImageSource, ResolvedImage};
