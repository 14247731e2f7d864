use crate::error::{ChatError, ChatResult};
use crate::params::GenerationParams;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub const TOKEN_ENV_VAR: &str = "REPLICATE_API_TOKEN";
pub const DEFAULT_MODEL: &str = "snowflake/snowflake-arctic-instruct";
pub const DEFAULT_BASE_URL: &str = "https://api.replicate.com";

const TOKEN_PREFIX: &str = "r8_";
const TOKEN_LEN: usize = 40;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Replicate API token
    pub replicate_api_token: Option<String>,

    /// Model to run, as `owner/name`
    pub model: String,

    /// Replicate API root
    pub base_url: String,

    /// Timeout for creating a prediction, in seconds
    pub request_timeout_secs: u64,

    /// Default sampling parameters for new sessions
    pub generation: GenerationParams,

    /// UI preferences
    pub ui: UiConfig,
}

/// UI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub show_timestamps: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self { show_timestamps: true }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            replicate_api_token: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: 120,
            generation: GenerationParams::default(),
            ui: UiConfig::default(),
        }
    }
}

impl Config {
    /// Directory holding the config file and logs
    pub fn home_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not find home directory")?;
        Ok(home.join(".arctic-chat"))
    }

    pub fn default_path() -> Result<PathBuf> {
        Ok(Self::home_dir()?.join("config.toml"))
    }

    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path()?)
    }

    /// Load configuration from `path`, falling back to defaults if it doesn't exist
    pub fn load_from(path: &Path) -> Result<Self> {
        let config: Config = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            toml::from_str(&content).context("Failed to parse config file")?
        } else {
            Config::default()
        };

        config
            .generation
            .validate()
            .context("Invalid generation parameters in config file")?;

        Ok(config)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::default_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// Token from the environment, falling back to the config file
    pub fn token_candidate(&self) -> Option<String> {
        std::env::var(TOKEN_ENV_VAR)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .or_else(|| self.replicate_api_token.clone())
    }

    /// Split `owner/name` into its parts
    pub fn model_parts(&self) -> ChatResult<(&str, &str)> {
        match self.model.split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
                Ok((owner, name))
            }
            _ => Err(ChatError::Config(format!(
                "model must look like owner/name, got '{}'",
                self.model
            ))),
        }
    }
}

/// A Replicate API token that passed the shape check
#[derive(Clone, PartialEq, Eq)]
pub struct ApiToken(String);

impl ApiToken {
    /// Accept a token that is non-empty, starts with `r8_` and is 40 characters long
    pub fn parse(raw: &str) -> ChatResult<Self> {
        let token = raw.trim();
        if token.is_empty() {
            return Err(ChatError::MissingCredential);
        }
        if !token.starts_with(TOKEN_PREFIX) {
            return Err(ChatError::InvalidCredential(format!(
                "expected it to start with '{}'",
                TOKEN_PREFIX
            )));
        }
        if token.chars().count() != TOKEN_LEN {
            return Err(ChatError::InvalidCredential(format!(
                "expected {} characters, got {}",
                TOKEN_LEN,
                token.chars().count()
            )));
        }
        Ok(Self(token.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiToken(r8_***)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const VALID_TOKEN: &str = "r8_0123456789abcdefghijklmnopqrstuvwxyzA";

    #[test]
    fn token_shape_check() {
        assert_eq!(VALID_TOKEN.len(), 40);
        assert_eq!(ApiToken::parse(VALID_TOKEN).unwrap().expose(), VALID_TOKEN);
        assert_eq!(
            ApiToken::parse(&format!("  {}\n", VALID_TOKEN)).unwrap().expose(),
            VALID_TOKEN
        );

        assert!(matches!(ApiToken::parse(""), Err(ChatError::MissingCredential)));
        assert!(matches!(ApiToken::parse("   "), Err(ChatError::MissingCredential)));
        assert!(matches!(
            ApiToken::parse("r9_0123456789abcdefghijklmnopqrstuvwxyzA"),
            Err(ChatError::InvalidCredential(_))
        ));
        assert!(matches!(ApiToken::parse("r8_short"), Err(ChatError::InvalidCredential(_))));
    }

    #[test]
    fn token_debug_is_redacted() {
        let token = ApiToken::parse(VALID_TOKEN).unwrap();
        assert!(!format!("{:?}", token).contains("abcdef"));
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.generation, GenerationParams::default());
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.model = "snowflake/other-model".to_string();
        config.generation = GenerationParams::new(1.25, 0.5).unwrap();
        config.ui.show_timestamps = false;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.model, "snowflake/other-model");
        assert_eq!(loaded.generation, config.generation);
        assert!(!loaded.ui.show_timestamps);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[generation]\ntemperature = 1.5\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.generation.temperature, 1.5);
        assert_eq!(config.generation.top_p, 0.9);
        assert_eq!(config.model, DEFAULT_MODEL);
    }

    #[test]
    fn out_of_range_params_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[generation]\ntop_p = 3.0\n").unwrap();

        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn model_parts_split_owner_and_name() {
        let config = Config::default();
        assert_eq!(
            config.model_parts().unwrap(),
            ("snowflake", "snowflake-arctic-instruct")
        );

        let bad = Config {
            model: "no-slash".to_string(),
            ..Config::default()
        };
        assert!(matches!(bad.model_parts(), Err(ChatError::Config(_))));
    }
}
