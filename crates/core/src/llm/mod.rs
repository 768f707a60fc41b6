//! Language model abstraction and the Gemini implementation.

mod client;
mod gemini;

pub use client::{GenerationRequest, LanguageModel, ModelError};
pub use gemini::GeminiClient;
