//! genmedia MCP server
//!
//! Model Context Protocol server that exposes generative video/image
//! capabilities as tools and stored artifacts as addressable resources
//! (`videos://{id}`, `images://{id}`).

pub mod server;
pub mod templates;
pub mod tools;

pub use server::GenMediaService;
