use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{FixedOffset, Offset, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

use crate::schedule::{DEFAULT_BROADCAST_HOUR, DEFAULT_UTC_OFFSET_HOURS};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub telegram: TelegramConfig,
    pub broadcast: BroadcastConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct TelegramConfig {
    /// Bot authentication token issued by @BotFather.
    pub bot_token: SecretString,
    /// Destination of the broadcast poll: a numeric chat id or an
    /// `@channelname`.
    pub channel_id: String,
}

#[derive(Clone, Debug)]
pub struct BroadcastConfig {
    /// Wall-clock hour (in the fixed reference offset) the daily broadcast
    /// fires at.
    pub hour: u32,
    /// Fixed reference offset, in whole hours east of UTC.
    pub utc_offset_hours: i32,
}

impl BroadcastConfig {
    pub fn fixed_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_hours * 3_600).unwrap_or_else(|| Utc.fix())
    }
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub bot_token: Option<String>,
    pub channel_id: Option<String>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            telegram: TelegramConfig {
                bot_token: String::new().into(),
                channel_id: String::new(),
            },
            broadcast: BroadcastConfig {
                hour: DEFAULT_BROADCAST_HOUR,
                utc_offset_hours: DEFAULT_UTC_OFFSET_HOURS,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    /// Layered load: defaults, then an optional `dreampoll.toml`, then
    /// `DREAMPOLL_*` environment variables, then programmatic overrides,
    /// then validation. A missing or malformed secret fails here, before
    /// any network connection is attempted.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("dreampoll.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(telegram) = patch.telegram {
            if let Some(bot_token_value) = telegram.bot_token {
                self.telegram.bot_token = bot_token_value.into();
            }
            if let Some(channel_id) = telegram.channel_id {
                self.telegram.channel_id = channel_id;
            }
        }

        if let Some(broadcast) = patch.broadcast {
            if let Some(hour) = broadcast.hour {
                self.broadcast.hour = hour;
            }
            if let Some(utc_offset_hours) = broadcast.utc_offset_hours {
                self.broadcast.utc_offset_hours = utc_offset_hours;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        // The unprefixed aliases match the variable names the bot has
        // historically been deployed with.
        let bot_token = read_env("DREAMPOLL_BOT_TOKEN").or_else(|| read_env("BOT_TOKEN"));
        if let Some(value) = bot_token {
            self.telegram.bot_token = value.into();
        }
        let channel_id = read_env("DREAMPOLL_CHANNEL_ID").or_else(|| read_env("CHANNEL_ID"));
        if let Some(value) = channel_id {
            self.telegram.channel_id = value;
        }

        if let Some(value) = read_env("DREAMPOLL_BROADCAST_HOUR") {
            self.broadcast.hour = parse_u32("DREAMPOLL_BROADCAST_HOUR", &value)?;
        }
        if let Some(value) = read_env("DREAMPOLL_BROADCAST_UTC_OFFSET_HOURS") {
            self.broadcast.utc_offset_hours =
                parse_i32("DREAMPOLL_BROADCAST_UTC_OFFSET_HOURS", &value)?;
        }

        let log_level =
            read_env("DREAMPOLL_LOGGING_LEVEL").or_else(|| read_env("DREAMPOLL_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("DREAMPOLL_LOGGING_FORMAT").or_else(|| read_env("DREAMPOLL_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(bot_token) = overrides.bot_token {
            self.telegram.bot_token = bot_token.into();
        }
        if let Some(channel_id) = overrides.channel_id {
            self.telegram.channel_id = channel_id;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_telegram(&self.telegram)?;
        validate_broadcast(&self.broadcast)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("dreampoll.toml"), PathBuf::from("config/dreampoll.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    toml::from_str::<ConfigPatch>(&raw)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn validate_telegram(telegram: &TelegramConfig) -> Result<(), ConfigError> {
    let bot_token = telegram.bot_token.expose_secret();
    if bot_token.trim().is_empty() {
        return Err(ConfigError::Validation(
            "telegram.bot_token is required. Get one from @BotFather and set DREAMPOLL_BOT_TOKEN"
                .to_string(),
        ));
    }
    if !bot_token.contains(':') {
        return Err(ConfigError::Validation(
            "telegram.bot_token does not look like a bot token (expected `<bot id>:<secret>`)"
                .to_string(),
        ));
    }

    let channel_id = telegram.channel_id.trim();
    if channel_id.is_empty() {
        return Err(ConfigError::Validation(
            "telegram.channel_id is required. Use the channel's numeric id or `@channelname` and set DREAMPOLL_CHANNEL_ID"
                .to_string(),
        ));
    }
    if !channel_id.starts_with('@') && channel_id.parse::<i64>().is_err() {
        return Err(ConfigError::Validation(
            "telegram.channel_id must be a numeric chat id or start with `@`".to_string(),
        ));
    }

    Ok(())
}

fn validate_broadcast(broadcast: &BroadcastConfig) -> Result<(), ConfigError> {
    if broadcast.hour > 23 {
        return Err(ConfigError::Validation(
            "broadcast.hour must be in range 0..=23".to_string(),
        ));
    }

    if !(-12..=14).contains(&broadcast.utc_offset_hours) {
        return Err(ConfigError::Validation(
            "broadcast.utc_offset_hours must be in range -12..=14".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_i32(key: &str, value: &str) -> Result<i32, ConfigError> {
    value.parse::<i32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    telegram: Option<TelegramPatch>,
    broadcast: Option<BroadcastPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct TelegramPatch {
    bot_token: Option<String>,
    channel_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct BroadcastPatch {
    hour: Option<u32>,
    utc_offset_hours: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    const ALL_VARS: &[&str] = &[
        "DREAMPOLL_BOT_TOKEN",
        "BOT_TOKEN",
        "DREAMPOLL_CHANNEL_ID",
        "CHANNEL_ID",
        "DREAMPOLL_BROADCAST_HOUR",
        "DREAMPOLL_BROADCAST_UTC_OFFSET_HOURS",
        "DREAMPOLL_LOGGING_LEVEL",
        "DREAMPOLL_LOG_LEVEL",
        "DREAMPOLL_LOGGING_FORMAT",
        "DREAMPOLL_LOG_FORMAT",
    ];

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    fn valid_token_overrides() -> ConfigOverrides {
        ConfigOverrides {
            bot_token: Some("12345:test-secret".to_string()),
            channel_id: Some("@dreamlog".to_string()),
            ..ConfigOverrides::default()
        }
    }

    #[test]
    fn file_values_load_and_env_wins_over_file() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(ALL_VARS);

        env::set_var("DREAMPOLL_CHANNEL_ID", "@from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("dreampoll.toml");
            fs::write(
                &path,
                r#"
[telegram]
bot_token = "12345:from-file"
channel_id = "@from-file"

[broadcast]
hour = 9

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.telegram.bot_token.expose_secret() == "12345:from-file",
                "file bot token should apply",
            )?;
            ensure(config.telegram.channel_id == "@from-env", "env channel id should win")?;
            ensure(config.broadcast.hour == 9, "file broadcast hour should apply")?;
            ensure(config.logging.level == "warn", "file log level should apply")?;
            Ok(())
        })();

        clear_vars(ALL_VARS);
        result
    }

    #[test]
    fn unprefixed_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(ALL_VARS);

        env::set_var("BOT_TOKEN", "777:alias-secret");
        env::set_var("CHANNEL_ID", "-1001234567890");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.telegram.bot_token.expose_secret() == "777:alias-secret",
                "unprefixed BOT_TOKEN should be honored",
            )?;
            ensure(
                config.telegram.channel_id == "-1001234567890",
                "unprefixed CHANNEL_ID should be honored",
            )?;
            Ok(())
        })();

        clear_vars(ALL_VARS);
        result
    }

    #[test]
    fn missing_bot_token_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(ALL_VARS);

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions {
                overrides: ConfigOverrides {
                    channel_id: Some("@dreamlog".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            }) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("telegram.bot_token")
            );
            ensure(has_message, "validation failure should mention telegram.bot_token")
        })();

        clear_vars(ALL_VARS);
        result
    }

    #[test]
    fn missing_channel_id_fails_fast() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(ALL_VARS);

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions {
                overrides: ConfigOverrides {
                    bot_token: Some("12345:test-secret".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            }) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("telegram.channel_id")
            );
            ensure(has_message, "validation failure should mention telegram.channel_id")
        })();

        clear_vars(ALL_VARS);
        result
    }

    #[test]
    fn malformed_token_and_out_of_range_hour_are_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(ALL_VARS);

        let result = (|| -> Result<(), String> {
            let error = AppConfig::load(LoadOptions {
                overrides: ConfigOverrides {
                    bot_token: Some("token-without-separator".to_string()),
                    channel_id: Some("@dreamlog".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            });
            ensure(error.is_err(), "token without `:` should be rejected")?;

            env::set_var("DREAMPOLL_BROADCAST_HOUR", "24");
            let error = AppConfig::load(LoadOptions {
                overrides: valid_token_overrides(),
                ..LoadOptions::default()
            });
            ensure(error.is_err(), "hour 24 should be rejected")
        })();

        clear_vars(ALL_VARS);
        result
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(ALL_VARS);

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions {
                overrides: ConfigOverrides {
                    bot_token: Some("12345:secret-value".to_string()),
                    channel_id: Some("@dreamlog".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(!debug.contains("secret-value"), "debug output should not contain the token")?;
            ensure(
                matches!(config.logging.format, LogFormat::Compact),
                "default logging format should be compact",
            )?;
            Ok(())
        })();

        clear_vars(ALL_VARS);
        result
    }
}
