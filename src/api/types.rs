use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// Request body for `POST /ask`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionRequest {
    pub prompt: String,
    pub model: String,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Canonical response
// ---------------------------------------------------------------------------

/// The canonical completion response. Every field is always populated; the
/// normalizer fills defaults for anything the backend left out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionResponse {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<Choice>,
    pub usage: UsageStats,
    pub system_fingerprint: String,
    pub service_tier: String,
}

impl CompletionResponse {
    /// Content of the first choice, or `""` when there are no choices.
    pub fn answer(&self) -> &str {
        self.choices
            .first()
            .map(|c| c.message.content.as_str())
            .unwrap_or("")
    }

    pub fn finish_reason(&self) -> &str {
        self.choices
            .first()
            .map(|c| c.finish_reason.as_str())
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Choice {
    pub index: u32,
    pub message: ChatMessage,
    pub finish_reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logprobs: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageStats {
    pub queue_time: f64,
    pub prompt_tokens: u64,
    pub prompt_time: f64,
    pub completion_tokens: u64,
    pub completion_time: f64,
    pub total_tokens: u64,
    pub total_time: f64,
}

impl UsageStats {
    /// One-line token summary used by the answer panel.
    pub fn summary(&self) -> String {
        format!(
            "Prompt: {}, Completion: {}, Total: {}",
            self.prompt_tokens, self.completion_tokens, self.total_tokens
        )
    }
}

// ---------------------------------------------------------------------------
// Model catalog
// ---------------------------------------------------------------------------

/// A model returned by `GET /models`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub provider: String,
}

impl ModelInfo {
    fn new(id: &str, name: &str, provider: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            provider: provider.to_string(),
        }
    }
}

/// Response from `GET /models`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelsResponse {
    #[serde(default)]
    pub models: Vec<ModelInfo>,
}

impl ModelsResponse {
    /// Static catalog used when the backend catalog cannot be fetched.
    pub fn fallback() -> Self {
        Self {
            models: vec![
                ModelInfo::new("google/gemma-2-9b-it", "Google Gemma 2 9B", "Hugging Face"),
                ModelInfo::new(
                    "deepset/roberta-base-squad2",
                    "RoBERTa SQuAD2",
                    "Hugging Face",
                ),
                ModelInfo::new("gpt2", "GPT-2", "Hugging Face"),
            ],
        }
    }

    /// Display name for a model id, falling back to the id itself.
    pub fn display_name<'a>(&'a self, model_id: &'a str) -> &'a str {
        self.models
            .iter()
            .find(|m| m.id == model_id && !m.name.is_empty())
            .map_or(model_id, |m| m.name.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
