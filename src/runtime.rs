//! Runtime services and shared state for the bot.

use tracing::{info, instrument, warn};

use crate::{
    base::{
        config::Config,
        types::{Res, Void},
    },
    service::{chat::ChatClient, history::HistoryStore, llm::LlmClient},
};

/// Runtime service context that can be shared across the application.
///
/// This struct holds the history store, the LLM and chat clients, and configuration.
/// It is designed to be trivially cloneable, allowing it to be passed around
/// without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct Runtime {
    /// The configuration for the application.
    pub config: Config,
    /// Per-channel conversation history.
    pub history: HistoryStore,
    /// The LLM client instance.
    pub llm: LlmClient,
    /// The chat client instance.
    pub chat: ChatClient,
}

impl Runtime {
    /// Create a new runtime instance.
    #[instrument(skip_all)]
    pub async fn new(config: Config) -> Res<Self> {
        // Initialize the history store.
        let history = HistoryStore::new(config.history_length);

        // Initialize the LLM client.
        let llm = LlmClient::ollama(&config)?;

        // Initialize the discord client.
        let chat = ChatClient::discord(&config, history.clone(), llm.clone()).await?;

        Ok(Self { config, history, llm, chat })
    }

    /// Prepare the LLM server and run the chat client until shutdown.
    pub async fn start(&self) -> Void {
        info!("LLM server: {} (model `{}`)", self.config.llm_base_url(), self.config.llm_model);
        info!("Keeping up to {} turn(s) of history per channel.", self.history.history_length());

        if self.config.llm_enabled && self.config.auto_pull_model {
            if let Err(err) = self.llm.pull_model(&self.config.llm_model).await {
                warn!("Failed to pull model `{}`: {}", self.config.llm_model, err);
            }
        }

        self.chat.start().await
    }
}
