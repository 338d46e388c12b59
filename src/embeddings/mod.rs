// Embedding generation module
// Text chunking and the Ollama embedding client

pub mod chunking;
pub mod ollama;
