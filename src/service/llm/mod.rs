pub mod ollama;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;

use crate::base::types::{Res, Turn, Void};

// Traits.

/// Generic LLM client trait that clients must implement.
///
/// This trait defines the core functionality for interacting with large language models.
/// Implementing this trait allows different LLM servers to be used with the bot.
#[async_trait]
pub trait GenericLlmClient: Send + Sync + 'static {
    /// Generate a reply from the system prompt and the channel history (oldest first).
    ///
    /// Fails with [`crate::base::types::LlmError`] when the server is
    /// unreachable or reports an error.
    async fn generate_response(&self, system_prompt: &str, history: &[Turn]) -> Res<String>;

    /// Ask the server to download a model.
    async fn pull_model(&self, model: &str) -> Void;
}

// Structs.

/// LLM client for the application.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct LlmClient {
    inner: Arc<dyn GenericLlmClient>,
}

impl Deref for LlmClient {
    type Target = dyn GenericLlmClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl LlmClient {
    pub fn new(inner: Arc<dyn GenericLlmClient>) -> Self {
        Self { inner }
    }
}
