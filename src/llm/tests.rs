use super::*;
use crate::config::LlmConfig;

fn openai_config() -> Config {
    Config {
        llm: LlmConfig {
            backend: LlmBackend::Openai,
            ..LlmConfig::default()
        },
        ..Config::default()
    }
}

fn ollama_config() -> Config {
    Config {
        llm: LlmConfig {
            backend: LlmBackend::Ollama,
            model: "flan-t5-base".to_string(),
            ..LlmConfig::default()
        },
        ..Config::default()
    }
}

#[test]
fn hosted_backend_requires_credential() {
    let result = LlmClient::with_credential(&openai_config(), None);

    let error = result.err().expect("construction should fail");
    assert!(error.to_string().contains(OPENAI_API_KEY_VAR));
    assert!(matches!(
        error.downcast_ref::<BankRagError>(),
        Some(BankRagError::Llm(_))
    ));
}

#[test]
fn blank_credential_is_rejected() {
    let result = LlmClient::with_credential(&openai_config(), Some("   ".to_string()));
    assert!(result.is_err());
}

#[test]
fn hosted_backend_with_credential() {
    let client = LlmClient::with_credential(&openai_config(), Some("sk-test".to_string()))
        .expect("should create client");

    assert_eq!(client.backend(), LlmBackend::Openai);
    assert_eq!(client.model(), "gpt-3.5-turbo");
    assert_eq!(client.base_url.as_str(), "https://api.openai.com/v1");
}

#[test]
fn local_backend_needs_no_credential() {
    let client =
        LlmClient::with_credential(&ollama_config(), None).expect("should create client");

    assert_eq!(client.backend(), LlmBackend::Ollama);
    assert_eq!(client.model(), "flan-t5-base");
    assert_eq!(client.base_url.host_str(), Some("localhost"));
    assert_eq!(client.base_url.port(), Some(11434));
}

#[test]
fn chat_url_preserves_base_path() {
    let base = Url::parse("https://api.openai.com/v1").expect("valid url");
    let url = join_api_path(&base, "chat/completions").expect("should join");
    assert_eq!(url.as_str(), "https://api.openai.com/v1/chat/completions");

    let base = Url::parse("http://localhost:9000/v1/").expect("valid url");
    let url = join_api_path(&base, "chat/completions").expect("should join");
    assert_eq!(url.as_str(), "http://localhost:9000/v1/chat/completions");
}
