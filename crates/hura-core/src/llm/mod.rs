//! LLM API client and types
//!
//! Supports the Claude Messages API and OpenAI-compatible chat completions
//! (OpenAI, Gemini).

mod client;
mod types;

pub use client::LlmClient;
pub use types::*;
