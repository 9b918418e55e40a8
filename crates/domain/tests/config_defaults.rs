use sb_domain::config::Config;

#[test]
fn default_host_is_localhost() {
    let config = Config::default();
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 8000);
}

#[test]
fn explicit_zero_host_parses() {
    let toml_str = r#"
[server]
host = "0.0.0.0"
port = 8000
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.server.host, "0.0.0.0");
}

#[test]
fn default_cors_allows_only_localhost() {
    let config = Config::default();
    assert!(!config.server.cors.allowed_origins.is_empty());
    assert!(config.server.cors.allowed_origins.contains(&"http://localhost:*".to_string()));
    assert!(config.server.cors.allowed_origins.contains(&"http://127.0.0.1:*".to_string()));
}

#[test]
fn empty_toml_uses_all_defaults() {
    let config: Config = toml::from_str("").unwrap();
    assert_eq!(config.responder.model, "gemini-1.5-flash");
    assert_eq!(config.responder.history_limit, 10);
    assert_eq!(config.responder.max_output_tokens, 1024);
    assert!(config.server.rate_limit.is_none());
    assert!(config.handoff.extra_phrases.is_empty());
}

#[test]
fn rate_limit_section_parses() {
    let toml_str = r#"
[server.rate_limit]
requests_per_second = 50
burst_size = 100
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    let rl = config.server.rate_limit.expect("rate_limit should be Some");
    assert_eq!(rl.requests_per_second, 50);
    assert_eq!(rl.burst_size, 100);
}

#[test]
fn admin_token_env_defaults() {
    let config = Config::default();
    assert_eq!(config.auth.admin_tokens_env, "SB_ADMIN_TOKENS");
    assert_eq!(config.auth.admin_token_env, "SB_ADMIN_TOKEN");
}

#[test]
fn handoff_extra_phrases_parse() {
    let toml_str = r#"
[handoff]
extra_phrases = ["cancel my subscription", "refund"]
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.handoff.extra_phrases.len(), 2);
}

#[test]
fn store_path_overrides() {
    let toml_str = r#"
[store]
state_path = "/var/lib/switchboard/sessions.json"
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(
        config.store.state_path.to_string_lossy(),
        "/var/lib/switchboard/sessions.json"
    );
}
