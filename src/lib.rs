//! Library root for `llama-bot`.
//!
//! Llama-bot is a Discord bot that answers @-mentions with a locally hosted LLM:
//! - Keeps a bounded conversation history per channel
//! - Forwards that history to an Ollama-compatible chat endpoint
//! - Splits long answers into Discord-sized replies
//! - Lists help and configured resources through slash commands
//!
//! The architecture is built around traits for the chat platform and the
//! LLM server, so either side can be swapped or mocked.

pub mod base;
pub mod interaction;
pub mod prelude;
pub mod runtime;
pub mod service;

use base::{config::Config, types::Void};
use tracing::info;

/// Public async entry for the binary crate.
///
/// Creates the runtime context with the history store, LLM, and chat clients,
/// then runs the chat client until shutdown.
pub async fn start(config: Config) -> Void {
    info!("Starting llama-bot ...");

    // Initialize the runtime.
    let runtime = runtime::Runtime::new(config).await?;

    // Start the runtime.
    runtime.start().await?;

    Ok(())
}
