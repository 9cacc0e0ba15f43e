//! Conversion of raw backend payloads into the canonical [`CompletionResponse`].
//!
//! Backends disagree on field naming (`finishReason` vs `finish_reason`,
//! `promptTokens` vs `prompt_tokens`), on timestamp encoding, and sometimes
//! wrap the whole payload in a JSON string. Every fallback chain below is an
//! ordered key table: the first key holding a usable value wins.

use serde_json::{Map, Value};
use thiserror::Error;

use super::types::{ChatMessage, Choice, CompletionResponse, UsageStats};

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("malformed payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Key tables
// ---------------------------------------------------------------------------

const ID_KEYS: &[&str] = &["id"];
const OBJECT_KEYS: &[&str] = &["object"];
const MODEL_KEYS: &[&str] = &["model"];
const CREATED_KEYS: &[&str] = &["created"];
const SYSTEM_FINGERPRINT_KEYS: &[&str] = &["systemFingerprint", "system_fingerprint"];
const SERVICE_TIER_KEYS: &[&str] = &["serviceTier", "service_tier"];

const CHOICES_KEYS: &[&str] = &["choices"];
const USAGE_KEYS: &[&str] = &["usage"];

const FINISH_REASON_KEYS: &[&str] = &["finishReason", "finish_reason"];
const ROLE_KEYS: &[&str] = &["role"];
const MESSAGE_CONTENT_KEYS: &[&str] = &["content"];
const TEXT_KEYS: &[&str] = &["text"];

const QUEUE_TIME_KEYS: &[&str] = &["queueTime", "queue_time", "queue_time_count"];
const PROMPT_TOKENS_KEYS: &[&str] = &["promptTokens", "prompt_tokens", "prompt_tokens_count"];
const PROMPT_TIME_KEYS: &[&str] = &["promptTime", "prompt_time", "prompt_time_count"];
const COMPLETION_TOKENS_KEYS: &[&str] = &[
    "completionTokens",
    "completion_tokens",
    "completion_tokens_count",
];
const COMPLETION_TIME_KEYS: &[&str] = &[
    "completionTime",
    "completion_time",
    "completion_time_count",
];
const TOTAL_TOKENS_KEYS: &[&str] = &["totalTokens", "total_tokens", "total_tokens_count"];
const TOTAL_TIME_KEYS: &[&str] = &["totalTime", "total_time", "total_time_count"];

pub const DEFAULT_FINISH_REASON: &str = "stop";
pub const DEFAULT_ROLE: &str = "assistant";

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Normalize an HTTP response body.
pub fn normalize_body(body: &str) -> Result<CompletionResponse, NormalizeError> {
    let raw: Value = serde_json::from_str(body)?;
    normalize(raw)
}

/// Normalize a raw payload, using the current time for a missing `created`.
pub fn normalize(raw: Value) -> Result<CompletionResponse, NormalizeError> {
    normalize_at(raw, chrono::Utc::now().timestamp())
}

/// Normalize a raw payload with an explicit fallback timestamp.
///
/// A JSON string is decoded once more before normalization; a decoded value
/// that is not an object yields an all-default response.
pub fn normalize_at(raw: Value, now: i64) -> Result<CompletionResponse, NormalizeError> {
    let raw = match raw {
        Value::String(encoded) => serde_json::from_str(&encoded)?,
        other => other,
    };

    let empty = Map::new();
    let obj = raw.as_object().unwrap_or(&empty);

    let choices = lookup(obj, CHOICES_KEYS)
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .enumerate()
                .map(|(position, entry)| normalize_choice(entry, position))
                .collect()
        })
        .unwrap_or_default();

    let usage = lookup(obj, USAGE_KEYS)
        .and_then(Value::as_object)
        .map(normalize_usage)
        .unwrap_or_default();

    Ok(CompletionResponse {
        id: string_or_default(obj, ID_KEYS, ""),
        object: string_or_default(obj, OBJECT_KEYS, ""),
        created: resolve_created(lookup(obj, CREATED_KEYS), now),
        model: string_or_default(obj, MODEL_KEYS, ""),
        choices,
        usage,
        system_fingerprint: string_or_default(obj, SYSTEM_FINGERPRINT_KEYS, ""),
        service_tier: string_or_default(obj, SERVICE_TIER_KEYS, ""),
    })
}

// ---------------------------------------------------------------------------
// Field resolution
// ---------------------------------------------------------------------------

/// First non-null value under any of `keys`, in table order.
fn lookup<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| obj.get(*key))
        .find(|value| !value.is_null())
}

/// First string value under any of `keys`. Non-string values are skipped so a
/// later key can still supply the field.
fn lookup_str<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| obj.get(*key))
        .find_map(Value::as_str)
}

fn string_or_default(obj: &Map<String, Value>, keys: &[&str], default: &str) -> String {
    lookup_str(obj, keys).unwrap_or(default).to_string()
}

/// First numeric value under any of `keys`; numeric strings are accepted.
fn lookup_number(obj: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .filter_map(|key| obj.get(*key))
        .find_map(as_number)
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

fn resolve_created(value: Option<&Value>, now: i64) -> i64 {
    match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .unwrap_or(now),
        Some(Value::String(s)) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| {
                    s.parse::<f64>()
                        .ok()
                        .filter(|f| f.is_finite())
                        .map(|f| f.trunc() as i64)
                })
                .unwrap_or(now)
        }
        _ => now,
    }
}

fn normalize_choice(entry: &Value, position: usize) -> Choice {
    let empty = Map::new();
    let obj = entry.as_object().unwrap_or(&empty);
    let message = obj.get("message").and_then(Value::as_object);

    let content = message
        .and_then(|m| lookup_str(m, MESSAGE_CONTENT_KEYS))
        .or_else(|| lookup_str(obj, TEXT_KEYS))
        .unwrap_or("");
    let role = message
        .and_then(|m| lookup_str(m, ROLE_KEYS))
        .unwrap_or(DEFAULT_ROLE);

    let index = obj
        .get("index")
        .and_then(Value::as_u64)
        .and_then(|i| u32::try_from(i).ok())
        .unwrap_or(position as u32);

    Choice {
        index,
        message: ChatMessage {
            role: role.to_string(),
            content: content.to_string(),
        },
        finish_reason: string_or_default(obj, FINISH_REASON_KEYS, DEFAULT_FINISH_REASON),
        logprobs: lookup(obj, &["logprobs"]).cloned(),
    }
}

fn normalize_usage(obj: &Map<String, Value>) -> UsageStats {
    let time = |keys: &[&str]| lookup_number(obj, keys).unwrap_or(0.0);
    let tokens = |keys: &[&str]| {
        lookup_number(obj, keys)
            .filter(|n| *n >= 0.0)
            .map_or(0, |n| n as u64)
    };

    UsageStats {
        queue_time: time(QUEUE_TIME_KEYS),
        prompt_tokens: tokens(PROMPT_TOKENS_KEYS),
        prompt_time: time(PROMPT_TIME_KEYS),
        completion_tokens: tokens(COMPLETION_TOKENS_KEYS),
        completion_time: time(COMPLETION_TIME_KEYS),
        total_tokens: tokens(TOTAL_TOKENS_KEYS),
        total_time: time(TOTAL_TIME_KEYS),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const NOW: i64 = 1_700_000_000;

    #[test]
    fn lookup_respects_table_order() {
        let obj = json!({"finish_reason": "length", "finishReason": "stop"});
        let obj = obj.as_object().unwrap();
        assert_eq!(lookup_str(obj, FINISH_REASON_KEYS), Some("stop"));

        let obj = json!({"finishReason": null, "finish_reason": "length"});
        let obj = obj.as_object().unwrap();
        assert_eq!(lookup_str(obj, FINISH_REASON_KEYS), Some("length"));
    }

    #[test]
    fn camel_and_snake_usage_are_identical() {
        let camel = json!({"usage": {
            "queueTime": 0.5, "promptTokens": 10, "promptTime": 0.1,
            "completionTokens": 20, "completionTime": 0.2,
            "totalTokens": 30, "totalTime": 0.3
        }});
        let snake = json!({"usage": {
            "queue_time": 0.5, "prompt_tokens": 10, "prompt_time": 0.1,
            "completion_tokens": 20, "completion_time": 0.2,
            "total_tokens": 30, "total_time": 0.3
        }});

        let camel = normalize_at(camel, NOW).unwrap().usage;
        let snake = normalize_at(snake, NOW).unwrap().usage;
        assert_eq!(camel, snake);
        assert_eq!(camel.total_tokens, 30);
        assert_eq!(camel.queue_time, 0.5);
    }

    #[test]
    fn count_suffixed_usage_fields() {
        let raw = json!({"usage": {"prompt_tokens_count": 7, "total_tokens_count": "9"}});
        let usage = normalize_at(raw, NOW).unwrap().usage;
        assert_eq!(usage.prompt_tokens, 7);
        assert_eq!(usage.total_tokens, 9);
        assert_eq!(usage.completion_tokens, 0);
    }

    #[test]
    fn missing_sections_default() {
        let resp = normalize_at(json!({"id": "r1"}), NOW).unwrap();
        assert_eq!(resp.id, "r1");
        assert!(resp.choices.is_empty());
        assert_eq!(resp.usage, UsageStats::default());
        assert_eq!(resp.object, "");
        assert_eq!(resp.system_fingerprint, "");
        assert_eq!(resp.service_tier, "");
        assert_eq!(resp.created, NOW);
    }

    #[test]
    fn non_object_payload_is_all_defaults() {
        let resp = normalize_at(json!([1, 2, 3]), NOW).unwrap();
        assert_eq!(resp.id, "");
        assert!(resp.choices.is_empty());
    }

    #[test]
    fn non_string_fields_default_to_empty() {
        let resp = normalize_at(json!({"id": 42, "model": ["m"]}), NOW).unwrap();
        assert_eq!(resp.id, "");
        assert_eq!(resp.model, "");
    }

    #[test]
    fn encoded_string_matches_parsed_object() {
        let payload = json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1_710_000_000,
            "model": "gpt2",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "hi"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 1, "completion_tokens": 1, "total_tokens": 2},
            "system_fingerprint": "fp_1",
            "service_tier": "on_demand"
        });
        let encoded = Value::String(payload.to_string());

        let from_object = normalize_at(payload, NOW).unwrap();
        let from_string = normalize_at(encoded, NOW).unwrap();
        assert_eq!(from_object, from_string);
        assert_eq!(from_string.system_fingerprint, "fp_1");
        assert_eq!(from_string.service_tier, "on_demand");
    }

    #[test]
    fn unparsable_string_is_malformed() {
        let err = normalize_at(Value::String("not json {".into()), NOW).unwrap_err();
        assert!(matches!(err, NormalizeError::MalformedPayload(_)));
        assert!(normalize_body("<html>").is_err());
    }

    #[test]
    fn chat_and_completion_style_choices() {
        let raw = json!({"choices": [
            {"message": {"content": "chat answer"}, "finishReason": "length"},
            {"text": "completion answer", "index": 5},
            {"message": {"role": "tool", "content": null}, "text": "flat"},
            {}
        ]});
        let choices = normalize_at(raw, NOW).unwrap().choices;

        assert_eq!(choices[0].message.content, "chat answer");
        assert_eq!(choices[0].message.role, DEFAULT_ROLE);
        assert_eq!(choices[0].finish_reason, "length");
        assert_eq!(choices[0].index, 0);

        assert_eq!(choices[1].message.content, "completion answer");
        assert_eq!(choices[1].finish_reason, DEFAULT_FINISH_REASON);
        assert_eq!(choices[1].index, 5);

        assert_eq!(choices[2].message.content, "flat");
        assert_eq!(choices[2].message.role, "tool");

        assert_eq!(choices[3].message.content, "");
        assert_eq!(choices[3].index, 3);
        assert!(choices[3].logprobs.is_none());
    }

    #[test]
    fn logprobs_kept_verbatim() {
        let raw = json!({"choices": [{"text": "x", "logprobs": {"tokens": ["x"]}}]});
        let choice = &normalize_at(raw, NOW).unwrap().choices[0];
        assert_eq!(choice.logprobs, Some(json!({"tokens": ["x"]})));
    }

    #[test]
    fn created_policy() {
        let created = |v: Value| normalize_at(json!({"created": v}), NOW).unwrap().created;
        assert_eq!(created(json!(1_710_000_000)), 1_710_000_000);
        assert_eq!(created(json!(1_710_000_000.9)), 1_710_000_000);
        assert_eq!(created(json!("1710000000")), 1_710_000_000);
        assert_eq!(created(json!(" 1710000000.5 ")), 1_710_000_000);
        assert_eq!(created(json!("yesterday")), NOW);
        assert_eq!(created(json!(true)), NOW);
        assert_eq!(created(Value::Null), NOW);
    }
}
