use thiserror::Error;

pub type Result<T> = std::result::Result<T, BankRagError>;

#[derive(Error, Debug)]
pub enum BankRagError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Data error: {0}")]
    Data(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod chain;
pub mod commands;
pub mod config;
pub mod database;
pub mod embeddings;
pub mod generator;
pub mod ingest;
pub mod llm;
pub mod statement;
