use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;

use crate::{NewsdeskError, SecretValue, require_env};

const DEFAULT_CONFIG_PATH: &str = "newsdesk.toml";
const CONFIG_PATH_ENV: &str = "NEWSDESK_CONFIG";
/// Upper bound accepted for `workflow.max_steps`.
pub const MAX_STEPS_CEILING: usize = 1000;

/// Top-level configuration structure. Every section is optional in the file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub search: SearchConfig,
    pub workflow: WorkflowConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Resolve the language model key (from environment only).
    pub fn llm_api_key(&self) -> Result<SecretValue, NewsdeskError> {
        require_env(&self.llm.api_key_env)
    }

    /// Resolve the search provider key (from environment only).
    pub fn search_api_key(&self) -> Result<SecretValue, NewsdeskError> {
        require_env(&self.search.api_key_env)
    }
}

/// Helper to load configuration with guard rails.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a provided path or discoverable defaults.
    ///
    /// Resolution order:
    /// 1. Explicit `path` argument (must exist).
    /// 2. `NEWSDESK_CONFIG` environment variable (must exist).
    /// 3. `newsdesk.toml` in the current working directory, if present.
    /// 4. Built-in defaults.
    pub fn load(path: Option<PathBuf>) -> Result<Config, NewsdeskError> {
        match resolve_path(path) {
            Some(candidate) => Self::from_file(&candidate),
            None => Ok(Config::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Config, NewsdeskError> {
        let raw = fs::read_to_string(path)
            .map_err(|err| NewsdeskError::config_io(path.to_path_buf(), err))?;
        Self::from_toml(&raw)
    }

    /// Parse and validate; every file-based entry point ends here.
    pub fn from_toml(raw: &str) -> Result<Config, NewsdeskError> {
        let config: Config = toml::from_str(raw)
            .map_err(|err| NewsdeskError::InvalidConfiguration(err.to_string()))?;
        Self::validate(&config)?;
        Ok(config)
    }

    fn validate(config: &Config) -> Result<(), NewsdeskError> {
        if config.llm.api_key_env.trim().is_empty() {
            return Err(NewsdeskError::InvalidConfiguration(
                "llm.api_key_env must reference an environment variable".into(),
            ));
        }
        if config.search.api_key_env.trim().is_empty() {
            return Err(NewsdeskError::InvalidConfiguration(
                "search.api_key_env must reference an environment variable".into(),
            ));
        }
        if !(1..=MAX_STEPS_CEILING).contains(&config.workflow.max_steps) {
            return Err(NewsdeskError::InvalidConfiguration(format!(
                "workflow.max_steps must be between 1 and {MAX_STEPS_CEILING}"
            )));
        }
        if config.workflow.call_timeout_secs == 0 {
            return Err(NewsdeskError::InvalidConfiguration(
                "workflow.call_timeout_secs must be at least 1".into(),
            ));
        }
        if config.workflow.max_articles == 0 {
            return Err(NewsdeskError::InvalidConfiguration(
                "workflow.max_articles must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

fn resolve_path(path: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(path) = path {
        return Some(path);
    }

    if let Ok(from_env) = env::var(CONFIG_PATH_ENV) {
        if !from_env.trim().is_empty() {
            return Some(PathBuf::from(from_env));
        }
    }

    let fallback = Path::new(DEFAULT_CONFIG_PATH);
    fallback.exists().then(|| fallback.to_path_buf())
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: String,
    pub model: String,
    pub base_url: String,
    pub api_key_env: String,
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "groq".into(),
            model: "gemma2-9b-it".into(),
            base_url: "https://api.groq.com/openai/v1".into(),
            api_key_env: "GROQ_API_KEY".into(),
            temperature: 0.1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub base_url: String,
    pub api_key_env: String,
    pub max_results: usize,
    pub include_domains: Vec<String>,
    /// Download each hit and replace the search snippet with the page body.
    pub fetch_full_text: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.tavily.com".into(),
            api_key_env: "TAVILY_API_KEY".into(),
            max_results: 3,
            include_domains: ["bbc.com", "reuters.com", "cnn.com", "npr.org"]
                .into_iter()
                .map(String::from)
                .collect(),
            fetch_full_text: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Upper bound on agent executions per run.
    pub max_steps: usize,
    pub call_timeout_secs: u64,
    /// Let the language model propose the next agent.
    pub llm_routing: bool,
    /// Insert a fact-check stage between analysis and report.
    pub fact_check: bool,
    pub max_articles: usize,
}

impl WorkflowConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_steps: 12,
            call_timeout_secs: 10,
            llm_routing: true,
            fact_check: false,
            max_articles: 6,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}
