// LanceDB vector database module
// Handles vector storage and similarity search for statement chunks


pub mod vector_store;

use serde::{Deserialize, Serialize};

pub use vector_store::{SearchResult, VectorStore};

/// Embedding record stored in LanceDB
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    /// Unique identifier for this embedding
    pub id: String,
    /// The vector embedding (768 dimensions for nomic-embed-text)
    pub vector: Vec<f32>,
    /// Metadata about the chunk this embedding represents
    pub metadata: ChunkMetadata,
}

/// Metadata for a statement chunk stored alongside its embedding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Identifier of the chunk
    pub chunk_id: String,
    /// Path of the statement file the chunk came from
    pub source: String,
    /// Zero-based row of the source statement file
    pub row_index: u32,
    /// Index of this chunk within the row document
    pub chunk_index: u32,
    /// The actual text content of the chunk
    pub content: String,
    /// Token estimate of the chunk
    pub token_count: u32,
    /// Timestamp when this embedding was created
    pub created_at: String,
}
