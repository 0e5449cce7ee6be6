//! Chat completion client and message types

pub mod client;
pub mod messages;

pub use client::{Answerer, OllamaClient};
pub use messages::{ChatMessage, MessageRole, build_prompt};
