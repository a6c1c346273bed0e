//! Gemini generation stack.
//!
//! - `transport`: wire types and the HTTP transport
//! - `resolver`: picks the model from the capability catalog
//! - `client`: the retry/fallback state machine around `generateContent`

pub mod client;
pub mod resolver;
pub mod transport;

pub use client::{GenerationClient, GenerationPolicy};
pub use resolver::ModelResolver;
pub use transport::{
    GeminiTransport, GenerateContentRequest, HttpGeminiTransport, ModelInfo, RawReply,
    ResponseClass,
};
