use crate::error::{Result, SubtransError};
use crate::translate::openai::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::translate::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    /// Concurrent group requests; 0 and 1 both mean sequential.
    pub concurrency: usize,
    pub temperature: f32,
    /// Groups of context on each side of the group being translated.
    pub context_window: usize,
    pub target_language: String,
    pub request_timeout_secs: u64,
    pub max_attempts: u32,
    pub timeout_retry_delay_secs: u64,
    pub error_retry_delay_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            concurrency: 5,
            temperature: 0.7,
            context_window: 5,
            target_language: "zh".to_string(),
            request_timeout_secs: 60,
            max_attempts: 3,
            timeout_retry_delay_secs: 10,
            error_retry_delay_secs: 60,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut config = match Self::config_file_path() {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Self::default(),
        };

        // Override with environment variables
        if let Ok(key) = std::env::var("SUBTRANS_API_KEY").or_else(|_| std::env::var("OPENAI_API_KEY")) {
            config.api_key = Some(key);
        }
        if let Ok(url) = std::env::var("SUBTRANS_BASE_URL") {
            config.base_url = url;
        }
        if let Ok(model) = std::env::var("SUBTRANS_MODEL") {
            config.model = model;
        }
        if let Ok(concurrency) = std::env::var("SUBTRANS_CONCURRENCY") {
            if let Ok(c) = concurrency.parse() {
                config.concurrency = c;
            }
        }
        if let Ok(temperature) = std::env::var("SUBTRANS_TEMPERATURE") {
            if let Ok(t) = temperature.parse() {
                config.temperature = t;
            }
        }
        if let Ok(language) = std::env::var("SUBTRANS_TARGET_LANGUAGE") {
            config.target_language = language;
        }

        Ok(config)
    }

    /// Read a TOML config file; missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading config from {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
            return Err(SubtransError::Config(
                "API key not set. Export it with: export SUBTRANS_API_KEY=sk-... (or OPENAI_API_KEY)"
                    .to_string(),
            ));
        }

        if self.max_attempts == 0 {
            return Err(SubtransError::Config(
                "max_attempts must be at least 1".to_string(),
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(SubtransError::Config(
                "request_timeout_secs must be at least 1".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(SubtransError::Config(format!(
                "Temperature must be between 0.0 and 2.0, got {}",
                self.temperature
            )));
        }

        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            timeout: Duration::from_secs(self.request_timeout_secs),
            timeout_delay: Duration::from_secs(self.timeout_retry_delay_secs),
            error_delay: Duration::from_secs(self.error_retry_delay_secs),
        }
    }

    pub fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("subtrans").join("config.toml"))
    }
}

/// Read a custom vocabulary file: one entry per line, blank lines and `#`
/// comments skipped.
pub fn load_vocabulary(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        return Err(SubtransError::FileNotFound(path.display().to_string()));
    }

    let contents = std::fs::read_to_string(path)?;
    let entries: Vec<String> = contents
        .trim_start_matches('\u{feff}')
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect();

    debug!("Loaded {} vocabulary entries", entries.len());
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.concurrency, 5);
        assert_eq!(config.context_window, 5);
        assert_eq!(config.target_language, "zh");
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.base_url, "https://api.openai.com/v1");
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_validate_missing_api_key() {
        let config = Config::default();
        assert!(matches!(config.validate(), Err(SubtransError::Config(_))));

        let blank = Config {
            api_key: Some("  ".to_string()),
            ..Config::default()
        };
        assert!(blank.validate().is_err());
    }

    #[test]
    fn test_validate_with_api_key() {
        let config = Config {
            api_key: Some("sk-test".to_string()),
            ..Config::default()
        };
        assert!(config.validate().is_ok());

        let sequential = Config {
            concurrency: 0,
            ..config.clone()
        };
        assert!(sequential.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let base = Config {
            api_key: Some("sk-test".to_string()),
            ..Config::default()
        };

        let no_attempts = Config {
            max_attempts: 0,
            ..base.clone()
        };
        assert!(no_attempts.validate().is_err());

        let no_timeout = Config {
            request_timeout_secs: 0,
            ..base.clone()
        };
        assert!(matches!(no_timeout.validate(), Err(SubtransError::Config(_))));

        let hot = Config {
            temperature: 2.5,
            ..base
        };
        assert!(hot.validate().is_err());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "model = \"deepseek-chat\"\nconcurrency = 2").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.model, "deepseek-chat");
        assert_eq!(config.concurrency, 2);
        assert_eq!(config.context_window, 5);
        assert_eq!(config.max_attempts, 3);
    }

    #[test]
    fn test_invalid_file_is_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "concurrency = \"many\"").unwrap();
        assert!(matches!(
            Config::from_file(file.path()),
            Err(SubtransError::Toml(_))
        ));
    }

    #[test]
    fn test_retry_policy_from_config() {
        let policy = Config::default().retry_policy();
        assert_eq!(policy, RetryPolicy::default());
    }

    #[test]
    fn test_load_vocabulary() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "# characters\n奥利安 Orion\n\n   马特 Matt  \n# places\n灰颅堡 Grayskull Keep"
        )
        .unwrap();

        let vocab = load_vocabulary(file.path()).unwrap();
        assert_eq!(vocab, vec!["奥利安 Orion", "马特 Matt", "灰颅堡 Grayskull Keep"]);
    }

    #[test]
    fn test_load_vocabulary_missing_file() {
        let result = load_vocabulary(Path::new("/nonexistent/vocab.txt"));
        assert!(matches!(result, Err(SubtransError::FileNotFound(_))));
    }
}
