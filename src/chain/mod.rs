//! Retrieval chain that embeds a question, pulls the nearest statement
//! chunks, and asks the answering model under a privacy-rule prompt.
//!
//! The protection here is prompt-level only: retrieved chunks still
//! contain raw account numbers and balances, and the rules ask the model
//! not to repeat them. Nothing redacts the context before it is sent.

#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use itertools::Itertools;
use tracing::{debug, info};

use crate::config::{Config, LlmBackend};
use crate::database::lancedb::{SearchResult, VectorStore};
use crate::embeddings::ollama::OllamaClient;
use crate::llm::LlmClient;

/// Prompt for the hosted chat backend. The model sees the full rule
/// list, the retrieved context, and the question in one message.
const HOSTED_PROMPT_TEMPLATE: &str = r#"You are a Secure Banking Assistant. Your primary responsibility is to assist users with their banking queries while STRICTLY protecting sensitive data.

You have access to the user's bank statement data through the retrieved context.

### SECURITY PROTOCOLS (MUST FOLLOW):
1. **NEVER REVEAL ACCOUNT NUMBERS**: If asked, refuse and explain that it is restricted.
2. **NEVER REVEAL PHONE NUMBERS**: If asked, refuse and explain that it is restricted.
3. **NEVER REVEAL EXACT BALANCES**: If asked for a current or specific balance, provide a range (e.g., "between $1000 and $2000") or refuse if exact precision is demanded.
4. **NEVER REVEAL CREDIT SCORES** (if present).
5. **NEVER REVEAL FULL NAMES** in association with sensitive financial data unless necessary for context, but prefer using "the customer".

### ALLOWED ACTIONS:
1. **Summaries**: You can provide summaries of spending (e.g., "Total spent on groceries").
2. **Transaction Details**: You can list transactions (Date, Description, Amount) but MUST MASK any sensitive info if it appears in the description.
3. **Aggregated Insights**: You can analyze trends.

### RESPONSE FORMAT:
- If a user asks for restricted info: "I cannot provide [Specific Data] due to privacy protocols. However, I can tell you [Safe Alternative]."
- If the query is safe: Provide the answer clearly and concisely.

Context:
{context}

Question:
{question}
"#;

/// Prompt for the local instruction model. Smaller instruct models do
/// better with a compact rule list and an explicit answer cue.
const LOCAL_PROMPT_TEMPLATE: &str = r#"You are a Secure Banking Assistant. Use the context below to answer the question.

Context:
{context}

SECURITY RULES:
1. Mask Account IDs (e.g., 100XXXXX).
2. Mask Phone Numbers (e.g., 555-XXXX).
3. Do NOT reveal exact balances. Give ranges or summaries.
4. Do NOT reveal credit scores. Say "Good" or "Excellent".
5. If asked for sensitive info, refuse politely.

Question: {question}

Answer:"#;

/// One answered question, with the chunks that were shown to the model.
#[derive(Debug, Clone)]
pub struct ChainResponse {
    pub answer: String,
    pub sources: Vec<SearchResult>,
}

/// The assembled question-answering chain.
pub struct SecureChain {
    embedder: OllamaClient,
    store: VectorStore,
    llm: LlmClient,
    backend: LlmBackend,
    top_k: usize,
}

impl SecureChain {
    /// Build the full chain from configuration. Fails before any network
    /// call when the hosted backend is selected and no credential is set.
    #[inline]
    pub async fn new(config: &Config) -> Result<Self> {
        let llm = LlmClient::new(config).context("Failed to initialize answering model")?;
        let embedder =
            OllamaClient::new(&config.ollama).context("Failed to initialize embedding client")?;
        let store = VectorStore::new(config)
            .await
            .context("Failed to open vector store")?;

        info!(
            "Chain ready: backend {} (model {}), top_k {}",
            config.llm.backend, config.llm.model, config.retrieval.top_k
        );

        Ok(Self {
            embedder,
            store,
            llm,
            backend: config.llm.backend,
            top_k: config.retrieval.top_k,
        })
    }

    /// Assemble a chain from already-built components.
    #[inline]
    pub fn from_parts(
        embedder: OllamaClient,
        store: VectorStore,
        llm: LlmClient,
        backend: LlmBackend,
        top_k: usize,
    ) -> Self {
        Self {
            embedder,
            store,
            llm,
            backend,
            top_k,
        }
    }

    /// Answer one question: embed, retrieve, prompt, invoke.
    #[inline]
    pub async fn ask(&self, question: &str) -> Result<ChainResponse> {
        let sources = self.retrieve(question).await?;

        let context = format_context(&sources);
        let prompt = render_prompt(self.backend, &context, question);

        debug!(
            "Prompting {} backend with {} context chars",
            self.backend,
            context.len()
        );

        let answer = self
            .llm
            .complete(&prompt)
            .context("Answering model invocation failed")?;

        Ok(ChainResponse { answer, sources })
    }

    /// Retrieve the nearest chunks for a question without invoking the
    /// answering model.
    #[inline]
    pub async fn retrieve(&self, question: &str) -> Result<Vec<SearchResult>> {
        let query = self
            .embedder
            .generate_embedding(question)
            .context("Failed to embed question")?;

        let sources = self
            .store
            .search_similar(&query.embedding, self.top_k)
            .await
            .context("Vector search failed")?;

        debug!("Retrieved {} chunks for question", sources.len());
        Ok(sources)
    }
}

/// Join retrieved chunk contents in retriever order. An empty result set
/// yields an empty context rather than an error; the rules still apply.
#[inline]
pub fn format_context(results: &[SearchResult]) -> String {
    results
        .iter()
        .map(|r| r.chunk_metadata.content.as_str())
        .join("\n\n")
}

/// Substitute context and question into the backend's prompt template.
#[inline]
pub fn render_prompt(backend: LlmBackend, context: &str, question: &str) -> String {
    let template = match backend {
        LlmBackend::Openai => HOSTED_PROMPT_TEMPLATE,
        LlmBackend::Ollama => LOCAL_PROMPT_TEMPLATE,
    };

    template
        .replace("{context}", context)
        .replace("{question}", question)
}
