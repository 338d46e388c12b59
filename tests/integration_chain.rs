#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// Chain tests against mocked Ollama and chat-completion endpoints.
// The vector store is real (temp-dir LanceDB); only HTTP is mocked.

use bank_rag::chain::SecureChain;
use bank_rag::commands::run_queries;
use bank_rag::config::{Config, LlmBackend, LlmConfig, OllamaConfig};
use bank_rag::database::lancedb::{ChunkMetadata, EmbeddingRecord, VectorStore};
use bank_rag::embeddings::ollama::OllamaClient;
use bank_rag::llm::LlmClient;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DIMENSION: usize = 64;

fn test_config(server: &MockServer, backend: LlmBackend, temp_dir: &TempDir) -> Config {
    Config {
        base_dir: temp_dir.path().to_path_buf(),
        ollama: OllamaConfig {
            host: "127.0.0.1".to_string(),
            port: server.address().port(),
            embedding_dimension: DIMENSION as u32,
            ..OllamaConfig::default()
        },
        llm: LlmConfig {
            backend,
            api_base: format!("{}/v1", server.uri()),
            ..LlmConfig::default()
        },
        ..Config::default()
    }
}

fn unit_vector(hot: usize) -> Vec<f32> {
    let mut v = vec![0.0_f32; DIMENSION];
    v[hot] = 1.0;
    v
}

fn statement_record(row_index: u32, content: &str, hot: usize) -> EmbeddingRecord {
    EmbeddingRecord {
        id: format!("embedding_{}", row_index),
        vector: unit_vector(hot),
        metadata: ChunkMetadata {
            chunk_id: format!("bank_statement.csv#{}-0", row_index),
            source: "bank_statement.csv".to_string(),
            row_index,
            chunk_index: 0,
            content: content.to_string(),
            token_count: 15,
            created_at: "2026-01-01T00:00:00Z".to_string(),
        },
    }
}

async fn seeded_store(config: &Config) -> VectorStore {
    let mut store = VectorStore::new(config)
        .await
        .expect("should create vector store");

    store
        .store_embeddings_batch(vec![
            statement_record(
                0,
                "Description: Grocery Store\nAmount: -84.12\nAccount Number: ACCT12345678901234",
                0,
            ),
            statement_record(1, "Description: Salary Deposit\nAmount: 1850.00", 1),
            statement_record(2, "Description: ATM Withdrawal\nAmount: -200.00", 2),
        ])
        .await
        .expect("should seed store");

    store
}

async fn mock_embedding(server: &MockServer, hot: usize) {
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "embedding": unit_vector(hot),
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn hosted_chain_answers_with_retrieved_context() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = test_config(&server, LlmBackend::Openai, &temp_dir);

    let store = seeded_store(&config).await;
    mock_embedding(&server, 0).await;

    // The request must carry the bearer credential, the rule list, the
    // nearest chunk, and the user's question
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("Authorization", "Bearer sk-test"))
        .and(body_string_contains("SECURITY PROTOCOLS"))
        .and(body_string_contains("Grocery Store"))
        .and(body_string_contains("What is the account number?"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": "I cannot provide the account number due to privacy protocols."
                }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let embedder = OllamaClient::new(&config.ollama).expect("should create embedder");
    let llm = LlmClient::with_credential(&config, Some("sk-test".to_string()))
        .expect("should create llm client");

    let chain = SecureChain::from_parts(embedder, store, llm, LlmBackend::Openai, 2);

    let response = chain
        .ask("What is the account number?")
        .await
        .expect("ask should succeed");

    assert_eq!(
        response.answer,
        "I cannot provide the account number due to privacy protocols."
    );
    assert_eq!(response.sources.len(), 2);
    assert!(
        response.sources[0]
            .chunk_metadata
            .content
            .contains("Grocery Store"),
        "nearest chunk should come back first"
    );
}

#[tokio::test]
async fn local_chain_uses_generate_endpoint() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = test_config(&server, LlmBackend::Ollama, &temp_dir);

    let store = seeded_store(&config).await;
    mock_embedding(&server, 1).await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_string_contains("SECURITY RULES"))
        .and(body_string_contains("Salary Deposit"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": "Your salary deposit was in the 1000-2000 range."
        })))
        .expect(1)
        .mount(&server)
        .await;

    let embedder = OllamaClient::new(&config.ollama).expect("should create embedder");
    let llm = LlmClient::with_credential(&config, None).expect("local backend needs no key");

    let chain = SecureChain::from_parts(embedder, store, llm, LlmBackend::Ollama, 1);

    let response = chain
        .ask("How big was my last deposit?")
        .await
        .expect("ask should succeed");

    assert_eq!(
        response.answer,
        "Your salary deposit was in the 1000-2000 range."
    );
    assert_eq!(response.sources.len(), 1);
}

#[tokio::test]
async fn missing_credential_fails_before_any_request() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = test_config(&server, LlmBackend::Openai, &temp_dir);

    // No mocks mounted: construction must fail without touching HTTP
    let result = LlmClient::with_credential(&config, None);
    let error = result.err().expect("construction should fail");
    assert!(error.to_string().contains("OPENAI_API_KEY"));

    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn empty_demo_batch_makes_no_requests() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = test_config(&server, LlmBackend::Openai, &temp_dir);

    let store = seeded_store(&config).await;
    let requests_after_seeding = server
        .received_requests()
        .await
        .unwrap_or_default()
        .len();

    let embedder = OllamaClient::new(&config.ollama).expect("should create embedder");
    let llm = LlmClient::with_credential(&config, Some("sk-test".to_string()))
        .expect("should create llm client");
    let chain = SecureChain::from_parts(embedder, store, llm, LlmBackend::Openai, 2);

    run_queries(&chain, &[]).await;

    let requests = server.received_requests().await.unwrap_or_default();
    assert_eq!(requests.len(), requests_after_seeding);
}

#[tokio::test]
async fn model_error_surfaces_to_the_caller() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = test_config(&server, LlmBackend::Openai, &temp_dir);

    let store = seeded_store(&config).await;
    mock_embedding(&server, 2).await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let embedder = OllamaClient::new(&config.ollama).expect("should create embedder");
    let llm = LlmClient::with_credential(&config, Some("sk-bad".to_string()))
        .expect("should create llm client");

    let chain = SecureChain::from_parts(embedder, store, llm, LlmBackend::Openai, 2);

    let result = chain.ask("List my transactions").await;
    assert!(result.is_err(), "client errors should not be swallowed");
}
