//! Configuration file loading and grader factory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use examprep_core::grading::GradingConfig;
use examprep_core::session::TransitionTiming;
use examprep_core::traits::Grader;

use crate::anthropic::AnthropicGrader;
use crate::gemini::GeminiGrader;
use crate::mock::MockGrader;
use crate::openai::OpenAiGrader;

/// Configuration for a single grading provider.
///
/// `Debug` masks API keys.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    Gemini {
        #[serde(default)]
        api_key: String,
        #[serde(default)]
        model: Option<String>,
        #[serde(default)]
        base_url: Option<String>,
    },
    OpenAI {
        #[serde(default)]
        api_key: String,
        #[serde(default)]
        model: Option<String>,
        #[serde(default)]
        base_url: Option<String>,
    },
    Anthropic {
        #[serde(default)]
        api_key: String,
        #[serde(default)]
        model: Option<String>,
        #[serde(default)]
        base_url: Option<String>,
    },
    /// Offline grader that gives every answer the same score.
    Mock {
        #[serde(default = "default_mock_score")]
        score: f64,
    },
}

fn default_mock_score() -> f64 {
    75.0
}

fn masked(key: &str) -> &'static str {
    if key.is_empty() {
        "<unset>"
    } else {
        "***"
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (name, api_key, model, base_url) = match self {
            ProviderConfig::Gemini {
                api_key,
                model,
                base_url,
            } => ("Gemini", api_key, model, base_url),
            ProviderConfig::OpenAI {
                api_key,
                model,
                base_url,
            } => ("OpenAI", api_key, model, base_url),
            ProviderConfig::Anthropic {
                api_key,
                model,
                base_url,
            } => ("Anthropic", api_key, model, base_url),
            ProviderConfig::Mock { score } => {
                return f.debug_struct("Mock").field("score", score).finish();
            }
        };
        f.debug_struct(name)
            .field("api_key", &masked(api_key))
            .field("model", model)
            .field("base_url", base_url)
            .finish()
    }
}

impl ProviderConfig {
    /// Config for a well-known provider name with no key set.
    fn unconfigured(name: &str) -> Option<Self> {
        match name {
            "gemini" => Some(ProviderConfig::Gemini {
                api_key: String::new(),
                model: None,
                base_url: None,
            }),
            "openai" => Some(ProviderConfig::OpenAI {
                api_key: String::new(),
                model: None,
                base_url: None,
            }),
            "anthropic" => Some(ProviderConfig::Anthropic {
                api_key: String::new(),
                model: None,
                base_url: None,
            }),
            _ => None,
        }
    }

    fn api_key_mut(&mut self) -> Option<&mut String> {
        match self {
            ProviderConfig::Gemini { api_key, .. }
            | ProviderConfig::OpenAI { api_key, .. }
            | ProviderConfig::Anthropic { api_key, .. } => Some(api_key),
            ProviderConfig::Mock { .. } => None,
        }
    }

    fn resolved(&self) -> Self {
        let opt = |v: &Option<String>| v.as_deref().map(resolve_env_vars);
        match self {
            ProviderConfig::Gemini {
                api_key,
                model,
                base_url,
            } => ProviderConfig::Gemini {
                api_key: resolve_env_vars(api_key),
                model: opt(model),
                base_url: opt(base_url),
            },
            ProviderConfig::OpenAI {
                api_key,
                model,
                base_url,
            } => ProviderConfig::OpenAI {
                api_key: resolve_env_vars(api_key),
                model: opt(model),
                base_url: opt(base_url),
            },
            ProviderConfig::Anthropic {
                api_key,
                model,
                base_url,
            } => ProviderConfig::Anthropic {
                api_key: resolve_env_vars(api_key),
                model: opt(model),
                base_url: opt(base_url),
            },
            ProviderConfig::Mock { score } => ProviderConfig::Mock { score: *score },
        }
    }
}

/// Top-level examprep configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamprepConfig {
    /// Provider configurations keyed by name.
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    /// Provider used when none is named on the command line.
    #[serde(default = "default_provider")]
    pub default_provider: String,
    /// File holding the exam history.
    #[serde(default = "default_history_path")]
    pub history_path: PathBuf,
    /// Directory of `<subject>.json` question banks.
    #[serde(default = "default_bank_dir")]
    pub bank_dir: PathBuf,
    /// Upper bound on one grading call, in seconds.
    #[serde(default = "default_grading_timeout")]
    pub grading_timeout_secs: u64,
    #[serde(default = "default_transition_ms")]
    pub transition_exit_ms: u64,
    #[serde(default = "default_transition_ms")]
    pub transition_enter_ms: u64,
}

fn default_provider() -> String {
    "gemini".to_string()
}
fn default_history_path() -> PathBuf {
    PathBuf::from("examprep-history.json")
}
fn default_bank_dir() -> PathBuf {
    PathBuf::from("banks")
}
fn default_grading_timeout() -> u64 {
    60
}
fn default_transition_ms() -> u64 {
    150
}

impl Default for ExamprepConfig {
    fn default() -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider(),
            history_path: default_history_path(),
            bank_dir: default_bank_dir(),
            grading_timeout_secs: default_grading_timeout(),
            transition_exit_ms: default_transition_ms(),
            transition_enter_ms: default_transition_ms(),
        }
    }
}

impl ExamprepConfig {
    pub fn grading_config(&self) -> GradingConfig {
        GradingConfig {
            call_timeout: Duration::from_secs(self.grading_timeout_secs),
        }
    }

    pub fn transition_timing(&self) -> TransitionTiming {
        TransitionTiming {
            exit: Duration::from_millis(self.transition_exit_ms),
            enter: Duration::from_millis(self.transition_enter_ms),
        }
    }

    /// Build the grader named `name`, or the default provider.
    ///
    /// A well-known provider that is not configured still yields a grader;
    /// its missing key is reported when it is first used.
    pub fn grader(&self, name: Option<&str>) -> Result<Arc<dyn Grader>> {
        let name = name.unwrap_or(self.default_provider.as_str());
        let config = match self.providers.get(name) {
            Some(config) => config.clone(),
            None => ProviderConfig::unconfigured(name)
                .with_context(|| format!("no grading provider named '{name}' is configured"))?,
        };
        create_grader(&config)
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        let Some(len) = result[start..].find('}') else {
            break;
        };
        let var_name = &result[start + 2..start + len];
        let value = std::env::var(var_name).unwrap_or_default();
        result = format!("{}{}{}", &result[..start], value, &result[start + len + 1..]);
    }
    result
}

/// Load configuration from the default locations.
///
/// Search order:
/// 1. `examprep.toml` in the current directory
/// 2. `~/.config/examprep/config.toml`
///
/// Environment variable overrides: `EXAMPREP_GEMINI_KEY`,
/// `EXAMPREP_OPENAI_KEY`, `EXAMPREP_ANTHROPIC_KEY`.
pub fn load_config() -> Result<ExamprepConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<ExamprepConfig> {
    let config_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => anyhow::bail!("config file not found: {}", p.display()),
        None => {
            let local = PathBuf::from("examprep.toml");
            if local.exists() {
                Some(local)
            } else {
                config_dir()
                    .map(|dir| dir.join("config.toml"))
                    .filter(|global| global.exists())
            }
        }
    };

    let mut config = match &config_path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<ExamprepConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => ExamprepConfig::default(),
    };
    if let Some(path) = &config_path {
        tracing::debug!("loaded config from {}", path.display());
    }

    for (name, var) in [
        ("gemini", "EXAMPREP_GEMINI_KEY"),
        ("openai", "EXAMPREP_OPENAI_KEY"),
        ("anthropic", "EXAMPREP_ANTHROPIC_KEY"),
    ] {
        if let Ok(key) = std::env::var(var) {
            apply_key_override(&mut config.providers, name, key);
        }
    }

    config.providers = config
        .providers
        .iter()
        .map(|(k, v)| (k.clone(), v.resolved()))
        .collect();

    Ok(config)
}

fn apply_key_override(providers: &mut HashMap<String, ProviderConfig>, name: &str, key: String) {
    if !providers.contains_key(name) {
        if let Some(config) = ProviderConfig::unconfigured(name) {
            providers.insert(name.to_string(), config);
        }
    }
    if let Some(api_key) = providers.get_mut(name).and_then(ProviderConfig::api_key_mut) {
        *api_key = key;
    }
}

fn config_dir() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("examprep"))
}

/// Create a grader from its configuration.
pub fn create_grader(config: &ProviderConfig) -> Result<Arc<dyn Grader>> {
    let grader: Arc<dyn Grader> = match config {
        ProviderConfig::Gemini {
            api_key,
            model,
            base_url,
        } => Arc::new(GeminiGrader::new(api_key, model.clone(), base_url.clone())?),
        ProviderConfig::OpenAI {
            api_key,
            model,
            base_url,
        } => Arc::new(OpenAiGrader::new(api_key, model.clone(), base_url.clone())?),
        ProviderConfig::Anthropic {
            api_key,
            model,
            base_url,
        } => Arc::new(AnthropicGrader::new(api_key, model.clone(), base_url.clone())?),
        ProviderConfig::Mock { score } => Arc::new(MockGrader::with_fixed_score(*score)),
    };
    Ok(grader)
}

/// Commented starter configuration written by `examprep init`.
pub const SAMPLE_CONFIG: &str = r#"# examprep configuration

default_provider = "gemini"
history_path = "examprep-history.json"
bank_dir = "banks"

# Upper bound on a single grading call
grading_timeout_secs = 60

# Pause between questions during an exam
transition_exit_ms = 150
transition_enter_ms = 150

[providers.gemini]
type = "gemini"
api_key = "${GEMINI_API_KEY}"
model = "gemini-2.5-flash"

# [providers.openai]
# type = "openai"
# api_key = "${OPENAI_API_KEY}"
# model = "gpt-4.1-mini"

# [providers.anthropic]
# type = "anthropic"
# api_key = "${ANTHROPIC_API_KEY}"

# Offline grading, useful for trying things out
# [providers.mock]
# type = "mock"
# score = 75
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_EXAMPREP_TEST_VAR", "hello");
        assert_eq!(resolve_env_vars("${_EXAMPREP_TEST_VAR}"), "hello");
        assert_eq!(
            resolve_env_vars("prefix_${_EXAMPREP_TEST_VAR}_suffix"),
            "prefix_hello_suffix"
        );
        assert_eq!(resolve_env_vars("${_EXAMPREP_UNSET_VAR}"), "");
        assert_eq!(resolve_env_vars("broken ${oops"), "broken ${oops");
        std::env::remove_var("_EXAMPREP_TEST_VAR");
    }

    #[test]
    fn default_config() {
        let config = ExamprepConfig::default();
        assert_eq!(config.default_provider, "gemini");
        assert_eq!(config.grading_timeout_secs, 60);
        assert_eq!(config.grading_config().call_timeout, Duration::from_secs(60));
        assert_eq!(config.transition_timing().exit, Duration::from_millis(150));
    }

    #[test]
    fn sample_config_parses() {
        let config: ExamprepConfig = toml::from_str(SAMPLE_CONFIG).unwrap();
        assert_eq!(config.providers.len(), 1);
        assert_eq!(config.bank_dir, PathBuf::from("banks"));
    }

    #[test]
    fn parse_provider_config() {
        let toml_str = r#"
default_provider = "anthropic"
grading_timeout_secs = 15

[providers.gemini]
type = "gemini"
api_key = "g-key"

[providers.openai]
type = "openai"
api_key = "sk-openai"
base_url = "http://localhost:8080"

[providers.anthropic]
type = "anthropic"
api_key = "sk-ant"
model = "claude-haiku"

[providers.offline]
type = "mock"
"#;
        let config: ExamprepConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.providers.len(), 4);
        assert_eq!(config.grading_timeout_secs, 15);
        assert!(matches!(
            config.providers.get("offline"),
            Some(ProviderConfig::Mock { score }) if *score == 75.0
        ));
        assert_eq!(config.grader(None).unwrap().model(), "claude-haiku");
        assert_eq!(config.grader(Some("offline")).unwrap().name(), "mock");
    }

    #[test]
    fn debug_masks_keys() {
        let config = ProviderConfig::OpenAI {
            api_key: "sk-very-secret".into(),
            model: None,
            base_url: None,
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-very-secret"));
        assert!(debug.contains("***"));
    }

    #[test]
    fn unconfigured_known_provider_still_builds() {
        let config = ExamprepConfig::default();
        let grader = config.grader(None).unwrap();
        assert_eq!(grader.name(), "gemini");
        assert!(config.grader(Some("nonexistent")).is_err());
    }

    #[test]
    fn key_override_creates_provider() {
        let mut providers = HashMap::new();
        apply_key_override(&mut providers, "openai", "from-env".into());
        assert!(matches!(
            providers.get("openai"),
            Some(ProviderConfig::OpenAI { api_key, .. }) if api_key == "from-env"
        ));
    }

    #[test]
    fn missing_explicit_path_is_an_error() {
        assert!(load_config_from(Some(Path::new("/no/such/examprep.toml"))).is_err());
    }

    #[test]
    fn load_from_file_resolves_env() {
        std::env::set_var("_EXAMPREP_FILE_KEY", "resolved-key");
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("examprep.toml");
        std::fs::write(
            &path,
            "[providers.custom]\ntype = \"anthropic\"\napi_key = \"${_EXAMPREP_FILE_KEY}\"\n",
        )
        .unwrap();

        let config = load_config_from(Some(&path)).unwrap();
        assert!(matches!(
            config.providers.get("custom"),
            Some(ProviderConfig::Anthropic { api_key, .. }) if api_key == "resolved-key"
        ));
        std::env::remove_var("_EXAMPREP_FILE_KEY");
    }
}
