use super::*;
use crate::database::lancedb::ChunkMetadata;

fn search_result(content: &str, distance: f32) -> SearchResult {
    SearchResult {
        chunk_metadata: ChunkMetadata {
            chunk_id: "chunk".to_string(),
            source: "bank_statement.csv".to_string(),
            row_index: 0,
            chunk_index: 0,
            content: content.to_string(),
            token_count: 10,
            created_at: "2026-01-01T00:00:00Z".to_string(),
        },
        similarity_score: 1.0 - distance,
        distance,
    }
}

#[test]
fn context_joins_chunks_in_retriever_order() {
    let results = vec![
        search_result("Description: Grocery Store", 0.1),
        search_result("Description: Salary Deposit", 0.2),
        search_result("Description: ATM Withdrawal", 0.3),
    ];

    let context = format_context(&results);
    assert_eq!(
        context,
        "Description: Grocery Store\n\nDescription: Salary Deposit\n\nDescription: ATM Withdrawal"
    );
}

#[test]
fn empty_results_yield_empty_context() {
    assert_eq!(format_context(&[]), "");
}

#[test]
fn hosted_prompt_contains_rules_context_and_question() {
    let prompt = render_prompt(
        LlmBackend::Openai,
        "Date: 2026-03-01\nAmount: -42.17",
        "How much did I spend?",
    );

    assert!(prompt.contains("NEVER REVEAL ACCOUNT NUMBERS"));
    assert!(prompt.contains("Date: 2026-03-01\nAmount: -42.17"));
    assert!(prompt.contains("Question:\nHow much did I spend?"));
    assert!(!prompt.contains("{context}"));
    assert!(!prompt.contains("{question}"));
}

#[test]
fn local_prompt_uses_compact_rules() {
    let prompt = render_prompt(LlmBackend::Ollama, "some context", "what is my balance?");

    assert!(prompt.contains("SECURITY RULES:"));
    assert!(prompt.contains("Mask Account IDs"));
    assert!(prompt.contains("Question: what is my balance?"));
    assert!(prompt.ends_with("Answer:"));
}

#[test]
fn prompt_rules_survive_empty_context() {
    let prompt = render_prompt(LlmBackend::Openai, "", "What is my account number?");

    assert!(prompt.contains("SECURITY PROTOCOLS"));
    assert!(prompt.contains("Context:\n\n"));
}
