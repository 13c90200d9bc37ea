use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const DEFAULT_ENV_PREFIX: &str = "SORTS";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            timeout: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_user_agent() -> String {
    format!("sorts-tui/{}", crate::VERSION)
}

fn default_timeout() -> Duration {
    Duration::from_secs(20)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedConfig {
    #[serde(default = "default_scroll_debounce", with = "humantime_serde")]
    pub scroll_debounce: Duration,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            scroll_debounce: default_scroll_debounce(),
        }
    }
}

fn default_scroll_debounce() -> Duration {
    crate::debounce::DEFAULT_WINDOW
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerConfig {
    #[serde(default = "default_player_command")]
    pub command: Vec<String>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            command: default_player_command(),
        }
    }
}

fn default_player_command() -> Vec<String> {
    vec!["mpv".into()]
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_file")]
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_file() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("sorts-tui").join("sorts-tui.log"))
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_file: Option<PathBuf>,
    pub env_prefix: Option<String>,
}

pub fn load(options: LoadOptions) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(path) = options.config_file.as_ref() {
        let from_file = read_config_file(path)?;
        cfg = merge_config(cfg, from_file);
    } else if let Some(default_path) = default_config_path() {
        if default_path.exists() {
            let from_file = read_config_file(&default_path)?;
            cfg = merge_config(cfg, from_file);
        }
    }

    let prefix = options.env_prefix.as_deref().unwrap_or(DEFAULT_ENV_PREFIX);
    apply_env(&mut cfg, prefix);

    Ok(cfg)
}

fn read_config_file(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&data)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
    Ok(config)
}

fn merge_config(mut base: Config, other: Config) -> Config {
    if !other.api.base_url.trim().is_empty() {
        base.api.base_url = other.api.base_url;
    }
    if !other.api.user_agent.trim().is_empty() {
        base.api.user_agent = other.api.user_agent;
    }
    if !other.api.timeout.is_zero() {
        base.api.timeout = other.api.timeout;
    }

    if !other.feed.scroll_debounce.is_zero() {
        base.feed.scroll_debounce = other.feed.scroll_debounce;
    }

    if !other.player.command.is_empty() {
        base.player.command = other.player.command;
    }

    if !other.log.level.trim().is_empty() {
        base.log.level = other.log.level;
    }
    if other.log.file.is_some() {
        base.log.file = other.log.file;
    }

    base
}

fn apply_env(cfg: &mut Config, prefix: &str) {
    let mut map: HashMap<String, String> = HashMap::new();
    let upper_prefix = format!("{}_", prefix.to_uppercase());

    for (key, value) in env::vars() {
        if let Some(stripped) = key.strip_prefix(&upper_prefix) {
            let normalized = stripped.to_ascii_lowercase().replace("__", ".");
            map.insert(normalized, value);
        }
    }

    for (key, value) in map {
        apply_env_value(cfg, &key, value);
    }
}

fn apply_env_value(cfg: &mut Config, key: &str, value: String) {
    match key {
        "api.base_url" => cfg.api.base_url = value,
        "api.user_agent" => cfg.api.user_agent = value,
        "api.timeout" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.api.timeout = duration;
            }
        }
        "feed.scroll_debounce" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.feed.scroll_debounce = duration;
            }
        }
        "player.command" => {
            cfg.player.command = value
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        "log.level" => cfg.log.level = value,
        "log.file" => cfg.log.file = Some(PathBuf::from(value)),
        _ => {}
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("sorts-tui").join("config.yaml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn isolated() -> LoadOptions {
        LoadOptions {
            config_file: None,
            env_prefix: Some("SORTS_TEST_UNSET".into()),
        }
    }

    #[test]
    fn defaults_without_overrides() {
        let cfg = Config::default();
        assert_eq!(cfg.api.base_url, "http://127.0.0.1:8080");
        assert_eq!(cfg.feed.scroll_debounce, Duration::from_millis(200));
        assert_eq!(cfg.player.command, vec!["mpv".to_string()]);
        assert!(cfg.api.user_agent.starts_with("sorts-tui/"));
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            "api:\n  base_url: https://challenges.test\n  timeout: 5s\nfeed:\n  scroll_debounce: 350ms\n",
        )
        .unwrap();
        let cfg = load(LoadOptions {
            config_file: Some(path),
            ..isolated()
        })
        .unwrap();
        assert_eq!(cfg.api.base_url, "https://challenges.test");
        assert_eq!(cfg.api.timeout, Duration::from_secs(5));
        assert_eq!(cfg.feed.scroll_debounce, Duration::from_millis(350));
        assert_eq!(cfg.log.level, "info");
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempdir().unwrap();
        let result = load(LoadOptions {
            config_file: Some(dir.path().join("absent.yaml")),
            ..isolated()
        });
        assert!(result.is_err());
    }

    #[test]
    fn env_overrides() {
        env::set_var("SORTS_ENVTEST_API__BASE_URL", "http://env.test");
        env::set_var("SORTS_ENVTEST_PLAYER__COMMAND", "mpv, --mute=yes");
        env::set_var("SORTS_ENVTEST_FEED__SCROLL_DEBOUNCE", "not a duration");
        let cfg = load(LoadOptions {
            config_file: None,
            env_prefix: Some("SORTS_ENVTEST".into()),
        })
        .unwrap();
        assert_eq!(cfg.api.base_url, "http://env.test");
        assert_eq!(cfg.player.command, vec!["mpv", "--mute=yes"]);
        assert_eq!(cfg.feed.scroll_debounce, Duration::from_millis(200));
        env::remove_var("SORTS_ENVTEST_API__BASE_URL");
        env::remove_var("SORTS_ENVTEST_PLAYER__COMMAND");
        env::remove_var("SORTS_ENVTEST_FEED__SCROLL_DEBOUNCE");
    }
}
