#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, warn};
use url::Url;

use crate::BankRagError;
use crate::config::settings::OPENAI_API_KEY_VAR;
use crate::config::{Config, LlmBackend};

const DEFAULT_TIMEOUT_SECONDS: u64 = 60;
const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
const EXPONENTIAL_BACKOFF_BASE: u64 = 2;

/// Client for the answering model, unifying the hosted chat backend and
/// the local Ollama backend behind one invocation surface.
#[derive(Debug, Clone)]
pub struct LlmClient {
    backend: LlmBackend,
    base_url: Url,
    model: String,
    temperature: f32,
    max_tokens: u32,
    api_key: Option<String>,
    agent: ureq::Agent,
    retry_attempts: u32,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

impl LlmClient {
    /// Build a client from configuration, reading the hosted-backend
    /// credential from the environment. Fails before any network call
    /// when the credential is required but absent.
    #[inline]
    pub fn new(config: &Config) -> Result<Self> {
        let credential = std::env::var(OPENAI_API_KEY_VAR).ok();
        Self::with_credential(config, credential)
    }

    /// Build a client with an explicit credential (or none).
    #[inline]
    pub fn with_credential(config: &Config, credential: Option<String>) -> Result<Self> {
        let backend = config.llm.backend;

        let api_key = match backend {
            LlmBackend::Openai => {
                let Some(key) = credential.filter(|k| !k.trim().is_empty()) else {
                    return Err(BankRagError::Llm(format!(
                        "{} not found in environment variables",
                        OPENAI_API_KEY_VAR
                    ))
                    .into());
                };
                Some(key)
            }
            LlmBackend::Ollama => None,
        };

        let base_url = match backend {
            LlmBackend::Openai => Url::parse(&config.llm.api_base)
                .with_context(|| format!("Invalid API base URL: {}", config.llm.api_base))?,
            LlmBackend::Ollama => config
                .ollama
                .ollama_url()
                .context("Failed to generate Ollama URL from config")?,
        };

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)))
            .build()
            .into();

        Ok(Self {
            backend,
            base_url,
            model: config.llm.model.clone(),
            temperature: config.llm.temperature,
            max_tokens: config.llm.max_tokens,
            api_key,
            agent,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
        })
    }

    #[inline]
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts;
        self
    }

    #[inline]
    pub fn backend(&self) -> LlmBackend {
        self.backend
    }

    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send the rendered prompt to the configured backend and return the
    /// generated text verbatim.
    #[inline]
    pub fn complete(&self, prompt: &str) -> Result<String> {
        match self.backend {
            LlmBackend::Openai => self.complete_chat(prompt),
            LlmBackend::Ollama => self.complete_generate(prompt),
        }
    }

    fn complete_chat(&self, prompt: &str) -> Result<String> {
        debug!("Invoking hosted chat model {}", self.model);

        let url = join_api_path(&self.base_url, "chat/completions")?;

        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        let request_json =
            serde_json::to_string(&request).context("Failed to serialize chat request")?;

        let api_key = self
            .api_key
            .as_deref()
            .with_context(|| format!("{} not available", OPENAI_API_KEY_VAR))?;

        let response_text = self
            .make_request_with_retry(|| {
                self.agent
                    .post(url.as_str())
                    .header("Content-Type", "application/json")
                    .header("Authorization", &format!("Bearer {}", api_key))
                    .send(&request_json)
                    .and_then(|mut resp| resp.body_mut().read_to_string())
            })
            .context("Chat completion request failed")?;

        let response: ChatCompletionResponse = serde_json::from_str(&response_text)
            .context("Failed to parse chat completion response")?;

        let answer = response
            .choices
            .into_iter()
            .next()
            .context("Chat completion response contained no choices")?
            .message
            .content;

        Ok(answer)
    }

    fn complete_generate(&self, prompt: &str) -> Result<String> {
        debug!("Invoking local model {} via Ollama", self.model);

        let url = self
            .base_url
            .join("/api/generate")
            .context("Failed to build generate URL")?;

        let request = GenerateRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
                num_predict: self.max_tokens,
            },
        };
        let request_json =
            serde_json::to_string(&request).context("Failed to serialize generate request")?;

        let response_text = self
            .make_request_with_retry(|| {
                self.agent
                    .post(url.as_str())
                    .header("Content-Type", "application/json")
                    .send(&request_json)
                    .and_then(|mut resp| resp.body_mut().read_to_string())
            })
            .context("Generate request failed")?;

        let response: GenerateResponse =
            serde_json::from_str(&response_text).context("Failed to parse generate response")?;

        Ok(response.response)
    }

    fn make_request_with_retry<F>(&self, mut request_fn: F) -> Result<String>
    where
        F: FnMut() -> Result<String, ureq::Error>,
    {
        let mut last_error = None;

        for attempt in 1..=self.retry_attempts {
            match request_fn() {
                Ok(response_text) => return Ok(response_text),
                Err(error) => {
                    let should_retry = match &error {
                        ureq::Error::StatusCode(status) => {
                            if *status >= 500 {
                                warn!(
                                    "Server error (status {}), attempt {}/{}",
                                    status, attempt, self.retry_attempts
                                );
                                true
                            } else {
                                warn!("Client error (status {}), not retrying", status);
                                return Err(BankRagError::Network(format!(
                                    "Client error: HTTP {}",
                                    status
                                ))
                                .into());
                            }
                        }
                        ureq::Error::ConnectionFailed
                        | ureq::Error::HostNotFound
                        | ureq::Error::Timeout(_)
                        | ureq::Error::Io(_) => {
                            warn!(
                                "Transport error: {}, attempt {}/{}",
                                error, attempt, self.retry_attempts
                            );
                            true
                        }
                        _ => {
                            warn!("Non-retryable error: {}", error);
                            false
                        }
                    };

                    if !should_retry {
                        return Err(
                            BankRagError::Network(format!("Non-retryable error: {}", error)).into()
                        );
                    }

                    last_error =
                        Some(BankRagError::Network(format!("Request error: {}", error)).into());

                    if attempt < self.retry_attempts {
                        let delay_ms = EXPONENTIAL_BACKOFF_BASE.pow(attempt - 1) * 1000;
                        std::thread::sleep(Duration::from_millis(delay_ms));
                    }
                }
            }
        }

        error!("All retry attempts failed for request to {}", self.base_url);

        Err(last_error.unwrap_or_else(|| {
            BankRagError::Network("Request failed after retries".to_string()).into()
        }))
    }
}

/// Join a path onto an API base that may itself carry a path segment
/// (e.g. `https://api.openai.com/v1`).
fn join_api_path(base: &Url, path: &str) -> Result<Url> {
    let mut base_str = base.as_str().to_string();
    if !base_str.ends_with('/') {
        base_str.push('/');
    }
    Url::parse(&base_str)
        .and_then(|b| b.join(path))
        .with_context(|| format!("Failed to build URL from {} and {}", base, path))
}
