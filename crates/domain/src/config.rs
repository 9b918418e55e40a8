use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub responder: ResponderConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub handoff: HandoffConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Server
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "d_8000")]
    pub port: u16,
    #[serde(default = "d_host")]
    pub host: String,
    #[serde(default)]
    pub cors: CorsConfig,
    /// Per-IP token-bucket rate limiting configuration.
    /// When `None` (the default), rate limiting is disabled — suitable for
    /// local development.  Set `requests_per_second` and `burst_size` in
    /// production.
    #[serde(default)]
    pub rate_limit: Option<RateLimitConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            host: "127.0.0.1".into(),
            cors: CorsConfig::default(),
            rate_limit: None,
        }
    }
}

/// Per-IP token-bucket rate limiting configuration.
///
/// `requests_per_second` controls the replenishment rate, while `burst_size`
/// sets the maximum number of requests a single IP can send in a quick burst
/// before being throttled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Quota replenishment rate — one token is added every `1 / requests_per_second` seconds.
    pub requests_per_second: u64,
    /// Maximum tokens in the bucket.  A client can send this many requests
    /// in a burst before the limiter kicks in.
    pub burst_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Origins allowed for CORS. Use `["*"]` for permissive (NOT recommended).
    /// Defaults to localhost-only.
    #[serde(default = "d_cors_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: d_cors_origins(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path of the JSON state file holding all sessions and transcripts.
    /// Parent directories are created on startup.
    #[serde(default = "d_state_path")]
    pub state_path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            state_path: d_state_path(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Automated responder
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponderConfig {
    #[serde(default = "d_responder_url")]
    pub base_url: String,
    /// Env var containing the API key. If the env var is unset the server
    /// still starts; every generation then falls back to the canned reply.
    #[serde(default = "d_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "d_model")]
    pub model: String,
    #[serde(default = "d_07")]
    pub temperature: f64,
    #[serde(default = "d_09")]
    pub top_p: f64,
    #[serde(default = "d_40")]
    pub top_k: u32,
    #[serde(default = "d_1024")]
    pub max_output_tokens: u32,
    /// How many recent transcript messages accompany each generation request.
    #[serde(default = "d_10")]
    pub history_limit: usize,
    /// Request timeout in milliseconds.
    #[serde(default = "d_30000")]
    pub timeout_ms: u64,
    /// Extra context appended to the built-in system prompt (product facts,
    /// FAQ text, opening hours).
    #[serde(default)]
    pub knowledge: Option<String>,
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            base_url: d_responder_url(),
            api_key_env: d_api_key_env(),
            model: d_model(),
            temperature: 0.7,
            top_p: 0.9,
            top_k: 40,
            max_output_tokens: 1024,
            history_limit: 10,
            timeout_ms: 30_000,
            knowledge: None,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Admin auth
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Environment variable holding per-admin tokens, formatted
    /// `"alice:tokenA,bob:tokenB"`. Takes precedence over the shared token.
    #[serde(default = "d_admin_tokens_env")]
    pub admin_tokens_env: String,
    /// Environment variable holding a single token shared by all admins.
    /// If neither env var is set, admin connections are **disabled**.
    #[serde(default = "d_admin_token_env")]
    pub admin_token_env: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            admin_tokens_env: d_admin_tokens_env(),
            admin_token_env: d_admin_token_env(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Handoff detection
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HandoffConfig {
    /// Extra phrases that trigger escalation to a human, on top of the
    /// built-in set. Matching is case-insensitive substring containment.
    #[serde(default)]
    pub extra_phrases: Vec<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        // Server port must be non-zero.
        if self.server.port == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "server.port".into(),
                message: "port must be greater than 0".into(),
            });
        }

        // Server host must not be empty.
        if self.server.host.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "server.host".into(),
                message: "host must not be empty".into(),
            });
        }

        // CORS: warn if wildcard is used.
        if self.server.cors.allowed_origins.len() == 1
            && self.server.cors.allowed_origins[0] == "*"
        {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "server.cors.allowed_origins".into(),
                message: "wildcard \"*\" allows all origins (not recommended for production)".into(),
            });
        }

        if self.store.state_path.as_os_str().is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "store.state_path".into(),
                message: "state_path must not be empty".into(),
            });
        }

        if self.responder.base_url.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "responder.base_url".into(),
                message: "base_url must not be empty".into(),
            });
        }

        if self.responder.model.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "responder.model".into(),
                message: "model must not be empty".into(),
            });
        }

        if !(0.0..=2.0).contains(&self.responder.temperature) {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "responder.temperature".into(),
                message: "temperature outside 0.0..=2.0".into(),
            });
        }

        // A zero history limit means the responder sees each message with
        // no transcript context.
        if self.responder.history_limit == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "responder.history_limit".into(),
                message: "history_limit is 0; the responder will see no conversation context".into(),
            });
        }

        for (i, phrase) in self.handoff.extra_phrases.iter().enumerate() {
            if phrase.trim().is_empty() {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: format!("handoff.extra_phrases[{i}]"),
                    message: "phrase must not be empty".into(),
                });
            }
        }

        errors
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Default value helpers (serde)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn d_8000() -> u16 {
    8000
}
fn d_host() -> String {
    "127.0.0.1".into()
}
fn d_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:*".into(),
        "http://127.0.0.1:*".into(),
    ]
}
fn d_state_path() -> PathBuf {
    PathBuf::from("./data/sessions.json")
}
fn d_responder_url() -> String {
    "https://generativelanguage.googleapis.com".into()
}
fn d_api_key_env() -> String {
    "GEMINI_API_KEY".into()
}
fn d_model() -> String {
    "gemini-1.5-flash".into()
}
fn d_07() -> f64 {
    0.7
}
fn d_09() -> f64 {
    0.9
}
fn d_40() -> u32 {
    40
}
fn d_1024() -> u32 {
    1024
}
fn d_10() -> usize {
    10
}
fn d_30000() -> u64 {
    30_000
}
fn d_admin_tokens_env() -> String {
    "SB_ADMIN_TOKENS".into()
}
fn d_admin_token_env() -> String {
    "SB_ADMIN_TOKEN".into()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates_clean() {
        let cfg = Config::default();
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn zero_port_is_an_error() {
        let mut cfg = Config::default();
        cfg.server.port = 0;
        let issues = cfg.validate();
        assert!(issues
            .iter()
            .any(|e| e.field == "server.port" && e.severity == ConfigSeverity::Error));
    }

    #[test]
    fn cors_wildcard_is_a_warning() {
        let mut cfg = Config::default();
        cfg.server.cors.allowed_origins = vec!["*".into()];
        let issues = cfg.validate();
        assert!(issues
            .iter()
            .any(|e| e.field == "server.cors.allowed_origins"
                && e.severity == ConfigSeverity::Warning));
    }

    #[test]
    fn empty_handoff_phrase_is_an_error() {
        let mut cfg = Config::default();
        cfg.handoff.extra_phrases = vec!["billing dispute".into(), "  ".into()];
        let issues = cfg.validate();
        assert!(issues
            .iter()
            .any(|e| e.field == "handoff.extra_phrases[1]"));
    }

    #[test]
    fn config_error_display_includes_severity_tag() {
        let err = ConfigError {
            severity: ConfigSeverity::Warning,
            field: "responder.temperature".into(),
            message: "temperature outside 0.0..=2.0".into(),
        };
        assert_eq!(
            err.to_string(),
            "[WARN] responder.temperature: temperature outside 0.0..=2.0"
        );
    }
}
