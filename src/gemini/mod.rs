//! Vertex AI Gemini client.

pub mod client;
mod response;
mod types;

pub use client::{LanguageModel, VertexClient};
