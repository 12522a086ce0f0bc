//! Core components, types, and utilities for the bot.
//!
//! This module contains fundamental building blocks used throughout the application:
//! - Configuration handling and environment variables.
//! - System prompt assembly for LLM requests.
//! - Common types and result handling.

pub mod config;
pub mod prompts;
pub mod types;
