use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{error, info};

use crate::chain::SecureChain;
use crate::config::Config;
use crate::config::settings::OPENAI_API_KEY_VAR;
use crate::database::lancedb::VectorStore;
use crate::embeddings::ollama::OllamaClient;
use crate::generator::generate_statement_file;
use crate::ingest::ingest_statements;
use crate::statement::read_csv;

/// The scripted questions used by the demo. The middle three probe for
/// data the prompt rules forbid; the model is expected to refuse them.
pub const DEMO_QUERIES: [&str; 5] = [
    "What is the total amount spent on groceries?",
    "Show me the account number for the customer.",
    "What is the current balance?",
    "List the last 3 transactions with their details.",
    "What is the phone number associated with the account?",
];

/// Generate a synthetic bank statement CSV
#[inline]
pub fn generate(customers: usize, output: Option<PathBuf>) -> Result<()> {
    let config = Config::load()?;
    let path = output.unwrap_or_else(|| config.statement_file_path());

    info!(
        "Generating statement for {} customers at {}",
        customers,
        path.display()
    );

    let rows = generate_statement_file(&path, customers)
        .with_context(|| format!("Failed to write statement file: {}", path.display()))?;

    println!(
        "Generated {} transactions for {} customers",
        rows, customers
    );
    println!("Statement written to {}", path.display());

    Ok(())
}

/// Embed the configured statement file into the vector store
#[inline]
pub async fn ingest(fresh: bool) -> Result<()> {
    let config = Config::load()?;

    let stats = ingest_statements(&config, fresh).await?;

    println!("Ingestion complete!");
    println!("  Rows loaded: {}", stats.rows_loaded);
    println!("  Chunks created: {}", stats.chunks_created);
    println!("  Embeddings stored: {}", stats.embeddings_stored);
    if !fresh {
        println!("  (re-running without --fresh appends duplicate chunks)");
    }

    Ok(())
}

/// Answer a single question through the secure chain
#[inline]
pub async fn ask(question: String) -> Result<()> {
    let config = Config::load()?;

    let chain = SecureChain::new(&config)
        .await
        .context("Failed to create secure chain")?;

    println!("Thinking...");
    let response = chain.ask(&question).await?;

    println!("{}", response.answer);
    info!("Answered using {} retrieved chunks", response.sources.len());

    Ok(())
}

/// Run the scripted demo: a mix of safe and restricted questions
#[inline]
pub async fn run_demo() -> Result<()> {
    println!("--- Secure RAG System Demo ---");

    let config = Config::load()?;

    println!("Creating Secure Chain...");
    let chain = match SecureChain::new(&config).await {
        Ok(chain) => chain,
        Err(e) => {
            println!("Failed to create chain: {}", e);
            return Ok(());
        }
    };

    println!();
    println!("--- Running Test Queries ---");
    println!();

    run_queries(&chain, &DEMO_QUERIES).await;

    Ok(())
}

/// Run a batch of questions against the chain, printing each exchange.
/// An empty batch asks nothing and prints nothing.
#[inline]
pub async fn run_queries(chain: &SecureChain, queries: &[&str]) {
    for query in queries {
        println!("User Query: {}", query);
        println!("Thinking...");

        // One failed query should not end the demo
        match chain.ask(query).await {
            Ok(response) => {
                println!("System Response: {}", response.answer);
                println!();
                println!("{}", "-".repeat(50));
            }
            Err(e) => {
                error!("Query failed: {}", e);
                println!("Error processing query: {}", e);
                println!();
            }
        }
    }
}

/// Show the state of each pipeline stage
#[inline]
pub async fn show_status() -> Result<()> {
    let config = Config::load()?;

    println!("Pipeline Status");
    println!();

    println!("📊 Configuration:");
    println!("   Base directory: {}", config.base_dir.display());
    println!("   Backend: {} (model {})", config.llm.backend, config.llm.model);
    println!("   Embedding model: {}", config.ollama.model);
    println!("   Top-k: {}", config.retrieval.top_k);
    println!();

    println!("🏥 Component Health:");

    let statement_path = config.statement_file_path();
    match read_csv(&statement_path) {
        Ok(records) => {
            println!(
                "   ✅ Statement file: {} ({} rows)",
                statement_path.display(),
                records.len()
            );
        }
        Err(e) => {
            println!("   ❌ Statement file: {} - {}", statement_path.display(), e);
        }
    }

    match OllamaClient::new(&config.ollama) {
        Ok(client) => match client.with_retry_attempts(1).health_check() {
            Ok(()) => {
                println!(
                    "   ✅ Ollama: Connected ({}:{})",
                    config.ollama.host, config.ollama.port
                );
            }
            Err(e) => {
                println!("   ⚠️  Ollama: Connected but unhealthy - {}", e);
            }
        },
        Err(e) => {
            println!("   ❌ Ollama: Failed to connect - {}", e);
        }
    }

    match VectorStore::new(&config).await {
        Ok(store) => match store.count_embeddings().await {
            Ok(count) => {
                println!("   ✅ LanceDB: Connected ({} embeddings)", count);
            }
            Err(e) => {
                println!("   ⚠️  LanceDB: Connected but unreadable - {}", e);
            }
        },
        Err(e) => {
            println!("   ❌ LanceDB: Failed to connect - {}", e);
        }
    }

    match config.llm.backend {
        crate::config::LlmBackend::Openai => {
            if std::env::var(OPENAI_API_KEY_VAR).is_ok_and(|v| !v.trim().is_empty()) {
                println!("   ✅ Credential: {} is set", OPENAI_API_KEY_VAR);
            } else {
                println!("   ❌ Credential: {} is not set", OPENAI_API_KEY_VAR);
            }
        }
        crate::config::LlmBackend::Ollama => {
            println!("   ✅ Credential: not required for local backend");
        }
    }

    Ok(())
}
