//! Configuration types.

use std::path::Path;

use secrecy::SecretString;

use crate::error::{ConfigError, Result};

/// Default config file, in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "botConfig.txt";

/// Bot configuration.
#[derive(Debug)]
pub struct BotConfig {
    /// Telegram Bot API token. Without one only the CLI channel runs.
    pub telegram_token: Option<SecretString>,
    /// Bot username, informational only.
    pub bot_username: Option<String>,
    /// Telegram usernames or numeric ids allowed to talk to the bot. `*` = everyone.
    pub allowed_users: Vec<String>,
    /// Whether to run the stdin/stdout channel.
    pub enable_cli: bool,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            telegram_token: None,
            bot_username: None,
            allowed_users: vec!["*".to_string()],
            enable_cli: true,
        }
    }
}

impl BotConfig {
    /// Read configuration from the environment.
    pub fn from_env() -> Self {
        let telegram_token = std::env::var("TELEGRAM_BOT_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty())
            .map(SecretString::from);

        let bot_username = std::env::var("TELEGRAM_BOT_USERNAME").ok();

        let allowed_users = parse_allowed_users(
            &std::env::var("TELEGRAM_ALLOWED_USERS").unwrap_or_else(|_| "*".to_string()),
        );

        let enable_cli = std::env::var("MATCHBOT_CLI")
            .map(|v| !matches!(v.trim().to_lowercase().as_str(), "0" | "false" | "off" | "no"))
            .unwrap_or(true);

        Self {
            telegram_token,
            bot_username,
            allowed_users,
            enable_cli,
        }
    }

    /// Read a `key=value` config file.
    ///
    /// Recognized keys are `botToken` and `botUserName`; other keys are
    /// ignored. Blank lines and lines starting with `#` are skipped.
    pub fn from_file(path: &Path) -> std::result::Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::default();

        for (lineno, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (key, value) = line.split_once('=').ok_or_else(|| {
                ConfigError::ParseError(format!(
                    "{}:{}: expected key=value",
                    path.display(),
                    lineno + 1
                ))
            })?;
            let value = value.trim();
            match key.trim() {
                "botToken" if !value.is_empty() => {
                    config.telegram_token = Some(SecretString::from(value.to_string()));
                }
                "botUserName" if !value.is_empty() => {
                    config.bot_username = Some(value.to_string());
                }
                _ => {}
            }
        }

        Ok(config)
    }

    /// Environment first; a missing token or username is filled from the
    /// config file named by `MATCHBOT_CONFIG` (default `botConfig.txt`) if it exists.
    pub fn load() -> Result<Self> {
        let mut config = Self::from_env();

        let path = std::env::var("MATCHBOT_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        let path = Path::new(&path);
        if path.exists() {
            let file = Self::from_file(path)?;
            if config.telegram_token.is_none() {
                config.telegram_token = file.telegram_token;
            }
            if config.bot_username.is_none() {
                config.bot_username = file.bot_username;
            }
        }

        if config.telegram_token.is_none() && !config.enable_cli {
            return Err(ConfigError::MissingRequired {
                key: "TELEGRAM_BOT_TOKEN".into(),
                hint: "Set a bot token or enable the CLI channel with MATCHBOT_CLI=1".into(),
            }
            .into());
        }

        Ok(config)
    }
}

/// Split a comma-separated allowlist, dropping empty entries.
pub fn parse_allowed_users(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
