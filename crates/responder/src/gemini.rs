//! Google Gemini adapter.
//!
//! Calls the Gemini `generateContent` API. Auth is via an API key passed as
//! a query parameter (`key={api_key}`); the key is read from the configured
//! env var at construction. Without a key the adapter still constructs and
//! every call returns the fallback reply.

use std::time::Duration;

use serde_json::Value;

use sb_domain::config::ResponderConfig;
use sb_domain::error::{Error, Result};
use sb_domain::types::{MessageRecord, SenderKind};

use crate::prompt::SYSTEM_PROMPT;
use crate::{Responder, FALLBACK_REPLY};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Adapter struct
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Automated responder backed by the Google Gemini API.
pub struct GeminiResponder {
    base_url: String,
    api_key: Option<String>,
    model: String,
    temperature: f64,
    top_p: f64,
    top_k: u32,
    max_output_tokens: u32,
    client: reqwest::Client,
}

impl GeminiResponder {
    /// Create a new responder from the deserialized config section.
    pub fn from_config(cfg: &ResponderConfig) -> Result<Self> {
        let api_key = std::env::var(&cfg.api_key_env)
            .ok()
            .filter(|k| !k.is_empty());
        if api_key.is_none() {
            tracing::warn!(
                env = %cfg.api_key_env,
                "responder api key env not set; every automated reply will be the fallback"
            );
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        Ok(Self {
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: cfg.model.clone(),
            temperature: cfg.temperature,
            top_p: cfg.top_p,
            top_k: cfg.top_k,
            max_output_tokens: cfg.max_output_tokens,
            client,
        })
    }

    // ── Internal helpers ───────────────────────────────────────────

    fn generate_url(&self, api_key: &str) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, self.model, api_key
        )
    }

    fn build_body(
        &self,
        message: &str,
        history: &[MessageRecord],
        knowledge: Option<&str>,
    ) -> Value {
        let mut contents: Vec<Value> = history
            .iter()
            .map(|m| {
                let role = match m.sender {
                    SenderKind::Client => "user",
                    _ => "model",
                };
                serde_json::json!({
                    "role": role,
                    "parts": [{"text": m.content}],
                })
            })
            .collect();
        contents.push(serde_json::json!({
            "role": "user",
            "parts": [{"text": message}],
        }));

        let mut instruction = SYSTEM_PROMPT.to_string();
        if let Some(knowledge) = knowledge {
            instruction.push_str("\n\n");
            instruction.push_str(knowledge);
        }

        serde_json::json!({
            "contents": contents,
            "systemInstruction": {
                "parts": [{"text": instruction}],
            },
            "generationConfig": {
                "temperature": self.temperature,
                "topP": self.top_p,
                "topK": self.top_k,
                "maxOutputTokens": self.max_output_tokens,
            },
        })
    }

    async fn request_reply(
        &self,
        message: &str,
        history: &[MessageRecord],
        knowledge: Option<&str>,
    ) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| Error::Responder("api key not configured".into()))?;
        let url = self.generate_url(api_key);
        let body = self.build_body(message, history, knowledge);

        tracing::debug!(url = %redact_url_key(&url), "gemini generate request");

        let resp = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = resp.status();
        let resp_text = resp.text().await.map_err(|e| Error::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(Error::Responder(format!(
                "HTTP {} - {}",
                status.as_u16(),
                resp_text
            )));
        }

        let resp_json: Value = serde_json::from_str(&resp_text)?;
        parse_reply(&resp_json)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Response deserialization
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn parse_reply(body: &Value) -> Result<String> {
    let parts = body
        .get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|a| a.first())
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array())
        .ok_or_else(|| Error::Responder("no candidates in response".into()))?;

    let mut text = String::new();
    for part in parts {
        if let Some(t) = part.get("text").and_then(|v| v.as_str()) {
            text.push_str(t);
        }
    }

    let text = text.trim().to_string();
    if text.is_empty() {
        return Err(Error::Responder("empty reply text".into()));
    }
    Ok(text)
}

/// Redact API key from URL for safe logging.
fn redact_url_key(url: &str) -> String {
    if let Some(idx) = url.find("key=") {
        let prefix = &url[..idx + 4];
        let rest = &url[idx + 4..];
        let end = rest.find('&').unwrap_or(rest.len());
        format!("{prefix}[REDACTED]{}", &rest[end..])
    } else {
        url.to_string()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait::async_trait]
impl Responder for GeminiResponder {
    async fn generate(
        &self,
        message: &str,
        history: &[MessageRecord],
        knowledge: Option<&str>,
    ) -> String {
        match self.request_reply(message, history, knowledge).await {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(error = %e, "automated reply failed, using fallback");
                FALLBACK_REPLY.to_string()
            }
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    fn responder() -> GeminiResponder {
        GeminiResponder {
            base_url: "https://generativelanguage.googleapis.com".into(),
            api_key: Some("k".into()),
            model: "gemini-1.5-flash".into(),
            temperature: 0.7,
            top_p: 0.9,
            top_k: 40,
            max_output_tokens: 1024,
            client: reqwest::Client::new(),
        }
    }

    #[test]
    fn body_maps_history_roles() {
        let r = responder();
        let history = vec![
            MessageRecord::new(SenderKind::Client, "hi"),
            MessageRecord::new(SenderKind::Assistant, "hello"),
            MessageRecord::new(SenderKind::Agent, "agent here"),
        ];
        let body = r.build_body("next question", &history, None);

        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 4);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[2]["role"], "model");
        assert_eq!(contents[3]["role"], "user");
        assert_eq!(contents[3]["parts"][0]["text"], "next question");
    }

    #[test]
    fn body_appends_knowledge_to_system_prompt() {
        let r = responder();
        let body = r.build_body("q", &[], Some("Opening hours: 9-17"));
        let instruction = body["systemInstruction"]["parts"][0]["text"]
            .as_str()
            .unwrap();
        assert!(instruction.starts_with("You are a helpful customer service assistant"));
        assert!(instruction.ends_with("Opening hours: 9-17"));
    }

    #[test]
    fn parse_reply_concatenates_parts() {
        let body: Value = serde_json::json!({
            "candidates": [{
                "content": {"parts": [{"text": "Hello "}, {"text": "there"}]}
            }]
        });
        assert_eq!(parse_reply(&body).unwrap(), "Hello there");
    }

    #[test]
    fn parse_reply_without_candidates_fails() {
        let body: Value = serde_json::json!({"promptFeedback": {}});
        assert!(parse_reply(&body).is_err());
    }

    #[test]
    fn url_key_is_redacted() {
        let r = responder();
        let url = r.generate_url("secret");
        assert!(url.contains("key=secret"));
        assert!(!redact_url_key(&url).contains("secret"));
    }
}
