use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use handbook_core::prompt::{DEFAULT_REGULATIONS_LIMIT, MAX_CONTEXT_PASSAGES};
use handbook_core::search::DEFAULT_MIN_SCORE;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub conversation: ConversationConfig,
    #[serde(default)]
    pub handbook: HandbookConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:5200".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Passages retrieved per chat message and injected into the prompt.
    #[serde(default = "default_context_limit")]
    pub context_limit: usize,
    /// Default result count for `/api/search` and `handbook search`.
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
    #[serde(default = "default_min_score")]
    pub min_score: f64,
    #[serde(default = "default_regulations_limit")]
    pub regulations_limit: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            context_limit: default_context_limit(),
            search_limit: default_search_limit(),
            min_score: default_min_score(),
            regulations_limit: default_regulations_limit(),
        }
    }
}

fn default_context_limit() -> usize {
    MAX_CONTEXT_PASSAGES
}
fn default_search_limit() -> usize {
    10
}
fn default_min_score() -> f64 {
    DEFAULT_MIN_SCORE
}
fn default_regulations_limit() -> usize {
    DEFAULT_REGULATIONS_LIMIT
}

#[derive(Debug, Deserialize, Clone)]
pub struct AiConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_top_p")]
    pub top_p: f64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub max_retries: u32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            base_url: default_base_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            timeout_secs: default_timeout_secs(),
            max_retries: 0,
        }
    }
}

fn default_provider() -> String {
    "openai".to_string()
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_model() -> String {
    "gpt-4o".to_string()
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}
fn default_max_tokens() -> u32 {
    1500
}
fn default_temperature() -> f64 {
    0.1
}
fn default_top_p() -> f64 {
    0.9
}
fn default_timeout_secs() -> u64 {
    30
}

impl AiConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ConversationConfig {
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: u64,
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            max_age_secs: default_max_age_secs(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
        }
    }
}

/// One year.
pub const MAX_CONVERSATION_AGE_SECS: u64 = 365 * 24 * 3600;
/// One day.
pub const MAX_CLEANUP_INTERVAL_SECS: u64 = 24 * 3600;

impl ConversationConfig {
    /// Conversation lifetime as a `chrono` duration.
    ///
    /// # Errors
    ///
    /// Fails when `max_age_secs` is outside the range `chrono` can represent.
    pub fn max_age(&self) -> Result<chrono::Duration> {
        i64::try_from(self.max_age_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "conversation.max_age_secs out of range: {}",
                    self.max_age_secs
                )
            })
    }
}

fn default_max_age_secs() -> u64 {
    3600
}
fn default_cleanup_interval_secs() -> u64 {
    300
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct HandbookConfig {
    /// Optional TOML corpus replacing the built-in handbook.
    pub path: Option<PathBuf>,
}

impl Config {
    /// Defaults with the language model disabled. Used by offline commands
    /// when no config file exists.
    pub fn minimal() -> Self {
        let mut config = Self::default();
        config.ai.provider = "disabled".to_string();
        config
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config = parse_config(&content)?;

    // Relative handbook paths resolve against the config file's directory.
    config.handbook.path = config.handbook.path.map(|p| match path.parent() {
        Some(dir) if p.is_relative() => dir.join(p),
        _ => p,
    });

    Ok(config)
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    // Validate retrieval
    if config.retrieval.context_limit == 0 {
        bail!("retrieval.context_limit must be >= 1");
    }
    if config.retrieval.search_limit == 0 {
        bail!("retrieval.search_limit must be >= 1");
    }
    if config.retrieval.regulations_limit == 0 {
        bail!("retrieval.regulations_limit must be >= 1");
    }
    if config.retrieval.min_score.is_nan() || config.retrieval.min_score < 0.0 {
        bail!("retrieval.min_score must be >= 0.0");
    }

    // Validate ai
    match config.ai.provider.as_str() {
        "disabled" | "openai" => {}
        other => bail!(
            "Unknown ai provider: '{}'. Must be disabled or openai.",
            other
        ),
    }
    if !(0.0..=2.0).contains(&config.ai.temperature) {
        bail!("ai.temperature must be in [0.0, 2.0]");
    }
    if !(config.ai.top_p > 0.0 && config.ai.top_p <= 1.0) {
        bail!("ai.top_p must be in (0.0, 1.0]");
    }
    if config.ai.timeout_secs == 0 {
        bail!("ai.timeout_secs must be > 0");
    }
    if config.ai.max_tokens == 0 {
        bail!("ai.max_tokens must be > 0");
    }

    // Validate conversation
    if !(1..=MAX_CONVERSATION_AGE_SECS).contains(&config.conversation.max_age_secs) {
        bail!(
            "conversation.max_age_secs must be in [1, {}]",
            MAX_CONVERSATION_AGE_SECS
        );
    }
    if !(1..=MAX_CLEANUP_INTERVAL_SECS).contains(&config.conversation.cleanup_interval_secs) {
        bail!(
            "conversation.cleanup_interval_secs must be in [1, {}]",
            MAX_CLEANUP_INTERVAL_SECS
        );
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let cfg = parse_config("").unwrap();
        assert_eq!(cfg.server.bind, "127.0.0.1:5200");
        assert_eq!(cfg.retrieval.context_limit, 5);
        assert_eq!(cfg.retrieval.min_score, 0.1);
        assert_eq!(cfg.retrieval.regulations_limit, 3);
        assert_eq!(cfg.ai.provider, "openai");
        assert_eq!(cfg.ai.model, "gpt-4o");
        assert_eq!(cfg.ai.max_tokens, 1500);
        assert_eq!(cfg.ai.max_retries, 0);
        assert_eq!(cfg.conversation.max_age_secs, 3600);
        assert!(cfg.handbook.path.is_none());
    }

    #[test]
    fn test_overrides() {
        let cfg = parse_config(
            r#"
[server]
bind = "0.0.0.0:8080"

[retrieval]
context_limit = 3
min_score = 0.2

[ai]
provider = "disabled"
"#,
        )
        .unwrap();
        assert_eq!(cfg.server.bind, "0.0.0.0:8080");
        assert_eq!(cfg.retrieval.context_limit, 3);
        assert_eq!(cfg.retrieval.min_score, 0.2);
        assert!(!cfg.ai.is_enabled());
    }

    #[test]
    fn test_rejects_unknown_provider() {
        let err = parse_config("[ai]\nprovider = \"llama\"").unwrap_err();
        assert!(err.to_string().contains("Unknown ai provider"));
    }

    #[test]
    fn test_rejects_zero_limit() {
        assert!(parse_config("[retrieval]\ncontext_limit = 0").is_err());
        assert!(parse_config("[retrieval]\nsearch_limit = 0").is_err());
    }

    #[test]
    fn test_rejects_bad_sampling() {
        assert!(parse_config("[ai]\ntemperature = 3.0").is_err());
        assert!(parse_config("[ai]\ntop_p = 0.0").is_err());
        assert!(parse_config("[retrieval]\nmin_score = -1.0").is_err());
    }

    #[test]
    fn test_rejects_unbounded_conversation_timing() {
        let err = parse_config("[conversation]\nmax_age_secs = 1000000000000000").unwrap_err();
        assert!(err.to_string().contains("conversation.max_age_secs"));
        assert!(parse_config("[conversation]\nmax_age_secs = 0").is_err());
        assert!(parse_config("[conversation]\ncleanup_interval_secs = 0").is_err());
        assert!(parse_config("[conversation]\ncleanup_interval_secs = 100000000").is_err());

        let cfg = parse_config(&format!(
            "[conversation]\nmax_age_secs = {}",
            MAX_CONVERSATION_AGE_SECS
        ))
        .unwrap();
        assert_eq!(
            cfg.conversation.max_age().unwrap(),
            chrono::Duration::days(365)
        );
    }

    #[test]
    fn test_max_age_out_of_chrono_range() {
        let conv = ConversationConfig {
            max_age_secs: u64::MAX,
            cleanup_interval_secs: 300,
        };
        assert!(conv.max_age().is_err());
        assert_eq!(
            ConversationConfig::default().max_age().unwrap(),
            chrono::Duration::hours(1)
        );
    }

    #[test]
    fn test_minimal_disables_ai() {
        assert!(!Config::minimal().ai.is_enabled());
    }

    #[test]
    fn test_load_config_resolves_handbook_path() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("handbook.toml");
        std::fs::write(&path, "[handbook]\npath = \"corpus.toml\"\n").unwrap();
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.handbook.path.unwrap(), tmp.path().join("corpus.toml"));
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config(Path::new("/nonexistent/handbook.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
