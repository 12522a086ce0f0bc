//! Event handling and user interactions for the bot.
//!
//! This module provides functionality for handling chat events:
//! - Processing incoming messages and @-mentions
//! - Answering slash commands

pub mod chat_event;
pub mod commands;
