//! Ingestion pipeline: statement CSV -> row documents -> chunks ->
//! embeddings -> vector store.


use anyhow::{Context, Result};
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::Config;
use crate::database::lancedb::{ChunkMetadata, EmbeddingRecord, VectorStore};
use crate::embeddings::chunking::{StatementChunk, chunk_documents};
use crate::embeddings::ollama::OllamaClient;
use crate::statement::load_documents;

/// Counters from one ingestion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IngestStats {
    pub rows_loaded: usize,
    pub chunks_created: usize,
    pub embeddings_stored: usize,
}

/// Run the full ingestion pipeline against the configured statement file.
///
/// Each run appends to the table, so re-ingesting the same file without
/// `fresh` duplicates its chunks. Pass `fresh` to clear the table first.
#[inline]
pub async fn ingest_statements(config: &Config, fresh: bool) -> Result<IngestStats> {
    let statement_path = config.statement_file_path();

    let documents = load_documents(&statement_path).with_context(|| {
        format!(
            "Failed to load statement file: {}",
            statement_path.display()
        )
    })?;
    info!(
        "Loaded {} row documents from {}",
        documents.len(),
        statement_path.display()
    );

    let chunks = chunk_documents(&documents, &config.chunking)
        .context("Failed to chunk statement documents")?;
    debug!("Created {} chunks", chunks.len());

    let client = OllamaClient::new(&config.ollama)?;
    client
        .health_check()
        .context("Ollama server is not available for embedding generation")?;

    let mut store = VectorStore::new(config)
        .await
        .context("Failed to open vector store")?;

    if fresh {
        info!("Clearing existing embeddings before ingestion");
        store.clear().await?;
    }

    let stored = embed_and_store(&client, &mut store, &chunks, config).await?;

    store.optimize().await?;

    Ok(IngestStats {
        rows_loaded: documents.len(),
        chunks_created: chunks.len(),
        embeddings_stored: stored,
    })
}

/// Embed chunks in batches and store them, reporting progress on an
/// attended terminal.
async fn embed_and_store(
    client: &OllamaClient,
    store: &mut VectorStore,
    chunks: &[StatementChunk],
    config: &Config,
) -> Result<usize> {
    if chunks.is_empty() {
        return Ok(0);
    }

    let bar = if console::user_attended_stderr() {
        ProgressBar::new(chunks.len() as u64).with_style(
            ProgressStyle::with_template("{spinner} [{pos}/{len}] Embedding statement chunks")
                .expect("style template is valid"),
        )
    } else {
        ProgressBar::hidden()
    };

    let batch_size = config.ollama.batch_size as usize;
    let mut stored = 0;

    for batch in chunks.chunks(batch_size) {
        let embeddings = client
            .generate_chunk_embeddings(batch)
            .with_context(|| format!("Failed to embed batch of {} chunks", batch.len()))?;

        let records: Vec<EmbeddingRecord> = batch
            .iter()
            .zip(embeddings.iter())
            .map(|(chunk, result)| build_record(chunk, &result.embedding))
            .collect();

        let count = records.len();
        store
            .store_embeddings_batch(records)
            .await
            .context("Failed to store embedding batch")?;

        stored += count;
        bar.inc(count as u64);
    }

    bar.finish_and_clear();
    info!("Stored {} embeddings", stored);

    Ok(stored)
}

fn build_record(chunk: &StatementChunk, embedding: &[f32]) -> EmbeddingRecord {
    EmbeddingRecord {
        id: Uuid::new_v4().to_string(),
        vector: embedding.to_vec(),
        metadata: ChunkMetadata {
            chunk_id: format!("{}#{}-{}", chunk.source, chunk.row_index, chunk.chunk_index),
            source: chunk.source.clone(),
            row_index: chunk.row_index as u32,
            chunk_index: chunk.chunk_index as u32,
            content: chunk.content.clone(),
            token_count: chunk.token_count as u32,
            created_at: Utc::now().to_rfc3339(),
        },
    }
}
