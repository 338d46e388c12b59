use super::*;

#[test]
fn connection_test_fails_fast_for_unreachable_host() {
    let ollama = OllamaConfig {
        host: "nonexistent-host.invalid".to_string(),
        ..OllamaConfig::default()
    };

    assert!(!test_ollama_connection(&ollama));
}

#[test]
fn backend_defaults_track_selection() {
    let llm = LlmConfig::default();
    assert_eq!(llm.backend, LlmBackend::Openai);
    assert_eq!(llm.model, "gpt-3.5-turbo");
}
