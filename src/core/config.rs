use std::env;

use crate::chat::persona::BOOK_OUTLINE_PERSONA;

/// Sampling temperature sent with every completion request.
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub openai_model: String,
    pub openai_api_hostname: String,
    pub openai_api_key: String,
    pub kv_rest_api_url: Option<String>,
    pub kv_rest_api_token: Option<String>,
    pub persona: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        let openai_api_hostname = env::var("OUTLINE_LLM_HOST")
            .unwrap_or_else(|_| "https://api.openai.com".to_string());
        let openai_api_key =
            env::var("OPENAI_API_KEY").unwrap_or_else(|_| "thiswontworkforopenai".to_string());
        let openai_model =
            env::var("OUTLINE_LLM_MODEL").unwrap_or_else(|_| "gpt-3.5-turbo".to_string());
        let kv_rest_api_url = env::var("KV_REST_API_URL").ok();
        let kv_rest_api_token = env::var("KV_REST_API_TOKEN").ok();
        let persona =
            env::var("OUTLINE_PERSONA").unwrap_or_else(|_| BOOK_OUTLINE_PERSONA.to_string());

        Self {
            openai_model,
            openai_api_hostname,
            openai_api_key,
            kv_rest_api_url,
            kv_rest_api_token,
            persona,
        }
    }
}

impl AppConfig {
    /// Completion settings shared by every request unless a request
    /// brings its own credential.
    pub fn completion_settings(&self) -> CompletionSettings {
        CompletionSettings {
            api_hostname: self.openai_api_hostname.clone(),
            api_key: self.openai_api_key.clone(),
            model: self.openai_model.clone(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

/// Immutable settings for a single completion request.
#[derive(Clone, Debug, PartialEq)]
pub struct CompletionSettings {
    pub api_hostname: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f64,
}

impl CompletionSettings {
    /// Returns the settings to use for one request. A preview token
    /// replaces the credential on the returned copy only.
    pub fn for_request(&self, preview_token: Option<&str>) -> Self {
        match preview_token {
            Some(token) if !token.is_empty() => Self {
                api_key: token.to_string(),
                ..self.clone()
            },
            _ => self.clone(),
        }
    }
}
