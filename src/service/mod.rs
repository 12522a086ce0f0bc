//! Service integrations and the conversation core.
//!
//! This module contains:
//! - Chat services (e.g., Discord)
//! - LLM services (e.g., Ollama)
//! - The per-channel history store
//! - Reply splitting and delivery
//!
//! Each external service module defines both a generic trait and a concrete
//! implementation, allowing for extensibility and easy testing.

pub mod chat;
pub mod dispatch;
pub mod history;
pub mod llm;
