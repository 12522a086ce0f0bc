//! Ollama chat API client.
//!
//! Talks to `http://{host}:{port}/api/chat` with non-streaming requests.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use super::{GenericLlmClient, LlmClient};
use crate::base::{
    config::Config,
    types::{LlmError, Res, Turn, Void},
};

// Extra methods on `LlmClient` applied by the ollama implementation.

impl LlmClient {
    pub fn ollama(config: &Config) -> Res<Self> {
        let client = OllamaLlmClient::new(config)?;
        Ok(Self { inner: Arc::new(client) })
    }
}

// Wire types.

/// History turns are sent as they serialize; the system prompt is prepended.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ChatMessage<'a> {
    System { role: &'static str, content: &'a str },
    Turn(&'a Turn),
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct PullRequest<'a> {
    name: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ChatResponse {
    Error {
        error: String,
    },
    Message {
        message: ResponseMessage,
        #[serde(default)]
        total_duration: Option<u64>,
    },
}

#[derive(Debug, Deserialize)]
struct PullResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Interpret a `/api/chat` response body.
fn parse_chat_response(status: StatusCode, body: &str) -> Result<String, LlmError> {
    let parsed = serde_json::from_str::<ChatResponse>(body);

    match parsed {
        Ok(ChatResponse::Error { error }) => Err(LlmError::Upstream(error)),
        _ if !status.is_success() => Err(LlmError::Transport(format!("server answered with status {status}"))),
        Ok(ChatResponse::Message { message, total_duration }) => {
            if let Some(nanos) = total_duration {
                info!("Response took {:.3} seconds.", nanos as f64 / 1_000_000_000.0);
            }

            Ok(message.content)
        }
        Err(e) => Err(LlmError::from(e)),
    }
}

// Specific implementations.

/// Ollama LLM client implementation.
#[derive(Clone)]
pub struct OllamaLlmClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaLlmClient {
    /// Create a new Ollama LLM client.
    #[instrument(name = "OllamaLlmClient::new", skip_all)]
    pub fn new(config: &Config) -> Res<Self> {
        let client = reqwest::Client::builder().timeout(Duration::from_secs(config.llm_timeout_secs)).build()?;

        Ok(Self {
            client,
            base_url: config.llm_base_url(),
            model: config.llm_model.clone(),
        })
    }

    fn build_chat_request<'a>(&'a self, system_prompt: &'a str, history: &'a [Turn]) -> ChatRequest<'a> {
        let mut messages = Vec::with_capacity(history.len() + 1);

        messages.push(ChatMessage::System {
            role: "system",
            content: system_prompt,
        });
        messages.extend(history.iter().map(ChatMessage::Turn));

        ChatRequest {
            model: &self.model,
            messages,
            stream: false,
        }
    }

    async fn chat(&self, system_prompt: &str, history: &[Turn]) -> Result<String, LlmError> {
        let url = format!("{}/api/chat", self.base_url);
        debug!("Posting chat request to {} with {} history turn(s).", url, history.len());

        let response = self.client.post(&url).json(&self.build_chat_request(system_prompt, history)).send().await?;
        let status = response.status();
        let body = response.text().await?;

        parse_chat_response(status, &body)
    }
}

#[async_trait]
impl GenericLlmClient for OllamaLlmClient {
    #[instrument(skip_all, fields(model = %self.model))]
    async fn generate_response(&self, system_prompt: &str, history: &[Turn]) -> Res<String> {
        Ok(self.chat(system_prompt, history).await?)
    }

    #[instrument(skip(self))]
    async fn pull_model(&self, model: &str) -> Void {
        info!("Pulling model ...");

        let url = format!("{}/api/pull", self.base_url);
        let response: PullResponse = self
            .client
            .post(&url)
            .json(&PullRequest { name: model, stream: false })
            .send()
            .await
            .map_err(LlmError::from)?
            .json()
            .await
            .map_err(LlmError::from)?;

        if let Some(error) = response.error {
            return Err(LlmError::Upstream(error).into());
        }

        info!("Pull finished with status `{}`.", response.status.unwrap_or_default());

        Ok(())
    }
}

// Tests.
