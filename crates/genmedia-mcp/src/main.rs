//! genmedia MCP Server
//!
//! Model Context Protocol server for generative video/image APIs
//! Run with: GEMINI_API_KEY=xxx genmedia-mcp

use std::sync::Arc;

use anyhow::Context;
use genmedia_core::AppConfig;
use genmedia_genai::{GatewayConfig, GenAiClient};
use genmedia_genai::gateway::Gateway;
use genmedia_mcp::GenMediaService;
use genmedia_storage::ArtifactStore;
use rmcp::service::ServiceExt;
use rmcp::transport::io::stdio;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries the MCP transport, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::from_env()
        .context("Failed to load configuration. Set the GEMINI_API_KEY environment variable")?;

    let video_store = ArtifactStore::new(&config.storage_dir)
        .await
        .context("Failed to create video storage directory")?;
    let image_store = ArtifactStore::new(config.image_dir())
        .await
        .context("Failed to create image storage directory")?;

    let client = GenAiClient::new(config.api_key).context("Failed to create API client")?;
    let gateway = Arc::new(Gateway::new(
        Arc::new(client),
        video_store.clone(),
        image_store.clone(),
        GatewayConfig::default(),
    ));

    let service = GenMediaService::new(gateway, video_store, image_store);
    let running = service.serve(stdio()).await.context("MCP transport failed")?;
    running.waiting().await.context("MCP server error")?;

    Ok(())
}
