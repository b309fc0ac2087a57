//! Remote service clients.
//!
//! The bundled [`OpenAiCompatClient`] speaks the OpenAI wire format and
//! implements both [`GenerationBackend`](crate::GenerationBackend) and
//! [`Embedder`](crate::Embedder).

pub mod openai;

pub use openai::OpenAiCompatClient;
