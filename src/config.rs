use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::bsky;

const DEFAULT_ENV_PREFIX: &str = "SKYSEARCH";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub bsky: BskyConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub ui: UIConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BskyConfig {
    #[serde(default = "default_app_view_url")]
    pub app_view_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for BskyConfig {
    fn default() -> Self {
        Self {
            app_view_url: default_app_view_url(),
            user_agent: default_user_agent(),
            timeout: default_timeout(),
        }
    }
}

fn default_app_view_url() -> String {
    bsky::DEFAULT_APP_VIEW_URL.to_string()
}

fn default_user_agent() -> String {
    format!("skysearch/{} (+https://github.com/skysearch/skysearch)", crate::VERSION)
}

fn default_timeout() -> Duration {
    Duration::from_secs(20)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchConfig {
    #[serde(default = "default_limit")]
    pub default_limit: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
        }
    }
}

fn default_limit() -> u32 {
    bsky::DEFAULT_LIMIT
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UIConfig {
    #[serde(default = "default_theme")]
    pub theme: String,
}

impl Default for UIConfig {
    fn default() -> Self {
        Self {
            theme: default_theme(),
        }
    }
}

fn default_theme() -> String {
    "default".into()
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub path: Option<PathBuf>,
    pub env_prefix: Option<String>,
}

pub fn load(options: LoadOptions) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(path) = &options.path {
        if path.exists() {
            let from_file = read_config_file(path)?;
            cfg = merge_config(cfg, from_file);
        }
    } else if let Some(default_path) = default_config_path() {
        if default_path.exists() {
            let from_file = read_config_file(&default_path)?;
            cfg = merge_config(cfg, from_file);
        }
    }

    let prefix = options.env_prefix.as_deref().unwrap_or(DEFAULT_ENV_PREFIX);
    cfg = merge_config(cfg, load_env(prefix)?);

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
    if !other.bsky.app_view_url.is_empty() {
        base.bsky.app_view_url = other.bsky.app_view_url;
    }
    if !other.bsky.user_agent.is_empty() {
        base.bsky.user_agent = other.bsky.user_agent;
    }
    if !other.bsky.timeout.is_zero() {
        base.bsky.timeout = other.bsky.timeout;
    }

    if other.search.default_limit != 0 {
        base.search.default_limit = other.search.default_limit;
    }

    if !other.ui.theme.is_empty() {
        base.ui.theme = other.ui.theme;
    }

    base
}

fn load_env(prefix: &str) -> Result<Config> {
    let mut map: HashMap<String, String> = HashMap::new();
    let upper_prefix = format!("{}_", prefix.to_uppercase());

    for (key, value) in env::vars() {
        if let Some(stripped) = key.strip_prefix(&upper_prefix) {
            let normalized = stripped.to_ascii_lowercase().replace("__", ".");
            map.insert(normalized, value);
        }
    }

    // Sparse overlay: fields not named by an env var stay empty or zero
    // so the merge leaves lower-precedence values alone.
    let mut cfg = Config {
        bsky: BskyConfig {
            app_view_url: String::new(),
            user_agent: String::new(),
            timeout: Duration::ZERO,
        },
        search: SearchConfig { default_limit: 0 },
        ui: UIConfig {
            theme: String::new(),
        },
    };

    for (key, value) in map {
        apply_env_value(&mut cfg, &key, value);
    }

    Ok(cfg)
}

fn apply_env_value(cfg: &mut Config, key: &str, value: String) {
    match key {
        "bsky.app_view_url" => cfg.bsky.app_view_url = value,
        "bsky.user_agent" => cfg.bsky.user_agent = value,
        "bsky.timeout" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.bsky.timeout = duration;
            }
        }
        "search.default_limit" => {
            if let Ok(parsed) = value.parse::<u32>() {
                cfg.search.default_limit = parsed;
            }
        }
        "ui.theme" => cfg.ui.theme = value,
        _ => {}
    }
}

pub fn default_path() -> Option<PathBuf> {
    default_config_path()
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("skysearch").join("config.yaml"))
}
