use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;

use super::{GenerationError, Generator};
use crate::config::GenerationConfig;

/// Chat-completions client for OpenAI and compatible servers (Ollama, LM Studio)
#[derive(Clone)]
pub struct OpenAiGenerator {
    base_url: String,
    model: String,
    api_key: Option<String>,
    timeout_secs: u64,
    client: Client,
}

impl OpenAiGenerator {
    pub fn new(
        base_url: &str,
        model: impl Into<String>,
        api_key: Option<String>,
        timeout_secs: u64,
    ) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| GenerationError::Request(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
            timeout_secs,
            client,
        })
    }

    /// Build a client from configuration, using `model` instead of the
    /// configured generation model (the judge reuses this with its own model).
    ///
    /// The hosted `openai` provider requires the API key; local providers
    /// accept requests without one.
    pub fn from_config_with_model(
        config: &GenerationConfig,
        model: &str,
    ) -> Result<Self, GenerationError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.is_empty());

        if api_key.is_none() && config.provider == "openai" {
            return Err(GenerationError::MissingApiKey(config.api_key_env.clone()));
        }

        Self::new(&config.base_url, model, api_key, config.timeout_secs)
    }

    pub fn from_config(config: &GenerationConfig) -> Result<Self, GenerationError> {
        Self::from_config_with_model(config, &config.model)
    }

    fn classify_status(status: StatusCode, body: String) -> GenerationError {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GenerationError::Unauthorized {
                status: status.as_u16(),
                body,
            },
            StatusCode::TOO_MANY_REQUESTS => GenerationError::RateLimited(body),
            _ => GenerationError::Http {
                status: status.as_u16(),
                body,
            },
        }
    }
}

/// Pull the assistant message out of a chat-completions payload
fn extract_content(payload: &Value) -> Result<String, GenerationError> {
    payload["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| {
            GenerationError::MalformedResponse(format!(
                "missing choices[0].message.content in {}",
                truncate(&payload.to_string(), 200)
            ))
        })
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let head: String = text.chars().take(max_chars).collect();
        format!("{head}...")
    }
}

#[async_trait]
impl Generator for OpenAiGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String, GenerationError> {
        let url = format!("{}/chat/completions", self.base_url);

        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": temperature,
            "stream": false,
        });

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        tracing::debug!("POST {} (model {}, {} prompt chars)", url, self.model, prompt.len());

        let res = request.send().await.map_err(|e| {
            if e.is_timeout() {
                GenerationError::Timeout(self.timeout_secs)
            } else {
                GenerationError::Request(e.to_string())
            }
        })?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(Self::classify_status(status, truncate(&text, 500)));
        }

        let payload: Value = res
            .json()
            .await
            .map_err(|e| GenerationError::MalformedResponse(e.to_string()))?;

        extract_content(&payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_content() {
        let payload = json!({
            "choices": [{ "message": { "role": "assistant", "content": "Paris." } }]
        });
        assert_eq!(extract_content(&payload).unwrap(), "Paris.");
    }

    #[test]
    fn test_extract_content_missing() {
        let payload = json!({ "error": { "message": "bad request" } });
        assert!(matches!(
            extract_content(&payload),
            Err(GenerationError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            OpenAiGenerator::classify_status(StatusCode::UNAUTHORIZED, String::new()),
            GenerationError::Unauthorized { status: 401, .. }
        ));
        assert!(matches!(
            OpenAiGenerator::classify_status(StatusCode::TOO_MANY_REQUESTS, String::new()),
            GenerationError::RateLimited(_)
        ));
        assert!(matches!(
            OpenAiGenerator::classify_status(StatusCode::BAD_GATEWAY, String::new()),
            GenerationError::Http { status: 502, .. }
        ));
    }

    #[test]
    fn test_missing_key_for_hosted_provider() {
        let config = GenerationConfig {
            provider: "openai".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            api_key_env: "RAGOPS_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            temperature: 0.0,
            timeout_secs: 5,
        };
        assert!(matches!(
            OpenAiGenerator::from_config(&config),
            Err(GenerationError::MissingApiKey(_))
        ));

        let local = GenerationConfig {
            provider: "ollama".to_string(),
            base_url: "http://localhost:11434/v1/".to_string(),
            ..config
        };
        let generator = OpenAiGenerator::from_config(&local).unwrap();
        assert_eq!(generator.base_url, "http://localhost:11434/v1");
        assert_eq!(generator.model_name(), "gpt-3.5-turbo");
    }
}
