use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

const DEFAULT_ENV_PREFIX: &str = "RVIEW";

#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub ui: UIConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct FeedConfig {
    #[serde(default = "default_source")]
    pub default_source: String,
    #[serde(default = "default_posts_per_page")]
    pub posts_per_page: i64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            default_source: default_source(),
            posts_per_page: default_posts_per_page(),
        }
    }
}

fn default_source() -> String {
    "sysadmin".into()
}

fn default_posts_per_page() -> i64 {
    50
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct UIConfig {
    /// Most posts the list shows while a post is open beside it.
    #[serde(default = "default_list_height")]
    pub list_height: i64,
    #[serde(default = "default_max_title_length")]
    pub max_title_length: i64,
    #[serde(default = "default_detail_page_step")]
    pub detail_page_step: i64,
    #[serde(default = "default_comment_page_step")]
    pub comment_page_step: i64,
}

impl Default for UIConfig {
    fn default() -> Self {
        Self {
            list_height: default_list_height(),
            max_title_length: default_max_title_length(),
            detail_page_step: default_detail_page_step(),
            comment_page_step: default_comment_page_step(),
        }
    }
}

fn default_list_height() -> i64 {
    10
}

fn default_max_title_length() -> i64 {
    80
}

fn default_detail_page_step() -> i64 {
    10
}

fn default_comment_page_step() -> i64 {
    5
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: i64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout_seconds(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_base_url() -> String {
    crate::reddit::DEFAULT_BASE_URL.into()
}

fn default_timeout_seconds() -> i64 {
    10
}

fn default_user_agent() -> String {
    format!("rview/{}", crate::VERSION)
}

impl Config {
    /// Replaces blank strings and non-positive numbers with defaults so that
    /// nothing downstream sees a zero page size or row count.
    pub fn sanitized(mut self) -> Self {
        fn positive(value: &mut i64, fallback: i64) {
            if *value <= 0 {
                *value = fallback;
            }
        }
        fn filled(value: &mut String, fallback: String) {
            if value.trim().is_empty() {
                *value = fallback;
            }
        }

        self.feed.default_source = normalize_source(&self.feed.default_source);
        filled(&mut self.feed.default_source, default_source());
        positive(&mut self.feed.posts_per_page, default_posts_per_page());

        positive(&mut self.ui.list_height, default_list_height());
        positive(&mut self.ui.max_title_length, default_max_title_length());
        positive(&mut self.ui.detail_page_step, default_detail_page_step());
        positive(&mut self.ui.comment_page_step, default_comment_page_step());

        filled(&mut self.api.base_url, default_base_url());
        positive(&mut self.api.timeout_seconds, default_timeout_seconds());
        filled(&mut self.api.user_agent, default_user_agent());
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_seconds.max(1).unsigned_abs())
    }
}

/// Trims a subreddit name and drops a leading `r/` or `/r/`.
pub fn normalize_source(raw: &str) -> String {
    let trimmed = raw.trim();
    let name = trimmed.strip_prefix('/').unwrap_or(trimmed);
    let name = name
        .strip_prefix("r/")
        .or_else(|| name.strip_prefix("R/"))
        .unwrap_or(name);
    name.trim().trim_end_matches('/').to_string()
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_file: Option<PathBuf>,
    pub env_prefix: Option<String>,
}

pub fn load(options: LoadOptions) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(path) = options.config_file.as_ref() {
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
    apply_env(&mut cfg, prefix);

    Ok(cfg.sanitized())
}

fn read_config_file(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&data)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
    Ok(config)
}

fn merge_config(mut base: Config, other: Config) -> Config {
    if !other.feed.default_source.trim().is_empty() {
        base.feed.default_source = other.feed.default_source;
    }
    if other.feed.posts_per_page > 0 {
        base.feed.posts_per_page = other.feed.posts_per_page;
    }

    if other.ui.list_height > 0 {
        base.ui.list_height = other.ui.list_height;
    }
    if other.ui.max_title_length > 0 {
        base.ui.max_title_length = other.ui.max_title_length;
    }
    if other.ui.detail_page_step > 0 {
        base.ui.detail_page_step = other.ui.detail_page_step;
    }
    if other.ui.comment_page_step > 0 {
        base.ui.comment_page_step = other.ui.comment_page_step;
    }

    if !other.api.base_url.trim().is_empty() {
        base.api.base_url = other.api.base_url;
    }
    if other.api.timeout_seconds > 0 {
        base.api.timeout_seconds = other.api.timeout_seconds;
    }
    if !other.api.user_agent.trim().is_empty() {
        base.api.user_agent = other.api.user_agent;
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
    fn number(value: &str, target: &mut i64) {
        if let Ok(parsed) = value.trim().parse::<i64>() {
            if parsed > 0 {
                *target = parsed;
            }
        }
    }

    match key {
        "feed.default_source" => {
            if !value.trim().is_empty() {
                cfg.feed.default_source = value;
            }
        }
        "feed.posts_per_page" => number(&value, &mut cfg.feed.posts_per_page),
        "ui.list_height" => number(&value, &mut cfg.ui.list_height),
        "ui.max_title_length" => number(&value, &mut cfg.ui.max_title_length),
        "ui.detail_page_step" => number(&value, &mut cfg.ui.detail_page_step),
        "ui.comment_page_step" => number(&value, &mut cfg.ui.comment_page_step),
        "api.base_url" => {
            if !value.trim().is_empty() {
                cfg.api.base_url = value;
            }
        }
        "api.timeout_seconds" => number(&value, &mut cfg.api.timeout_seconds),
        "api.user_agent" => {
            if !value.trim().is_empty() {
                cfg.api.user_agent = value;
            }
        }
        _ => {}
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("rview").join("config.yaml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::tempdir;

    fn isolated(path: PathBuf) -> LoadOptions {
        LoadOptions {
            config_file: Some(path),
            env_prefix: Some("RVIEW_TEST_UNSET".into()),
        }
    }

    #[test]
    fn load_defaults_without_files() {
        let dir = tempdir().unwrap();
        let cfg = load(isolated(dir.path().join("missing.yaml"))).unwrap();
        assert_eq!(cfg.feed.default_source, "sysadmin");
        assert_eq!(cfg.feed.posts_per_page, 50);
        assert_eq!(cfg.ui.list_height, 10);
        assert_eq!(cfg.ui.max_title_length, 80);
        assert_eq!(cfg.api.timeout_seconds, 10);
        assert_eq!(cfg.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            "feed:\n  default_source: r/golang\nui:\n  list_height: 4\n  max_title_length: 0\napi:\n  timeout_seconds: -3\n",
        )
        .unwrap();
        let cfg = load(isolated(path)).unwrap();
        assert_eq!(cfg.feed.default_source, "golang");
        assert_eq!(cfg.ui.list_height, 4);
        assert_eq!(cfg.ui.max_title_length, 80);
        assert_eq!(cfg.api.timeout_seconds, 10);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "feed: [not, a, map").unwrap();
        let err = load(isolated(path)).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn env_overrides() {
        let dir = tempdir().unwrap();
        env::set_var("RVIEW_ENVTEST_FEED__DEFAULT_SOURCE", "rust");
        env::set_var("RVIEW_ENVTEST_UI__COMMENT_PAGE_STEP", "7");
        env::set_var("RVIEW_ENVTEST_API__TIMEOUT_SECONDS", "soon");
        let cfg = load(LoadOptions {
            config_file: Some(dir.path().join("missing.yaml")),
            env_prefix: Some("RVIEW_ENVTEST".into()),
        })
        .unwrap();
        env::remove_var("RVIEW_ENVTEST_FEED__DEFAULT_SOURCE");
        env::remove_var("RVIEW_ENVTEST_UI__COMMENT_PAGE_STEP");
        env::remove_var("RVIEW_ENVTEST_API__TIMEOUT_SECONDS");
        assert_eq!(cfg.feed.default_source, "rust");
        assert_eq!(cfg.ui.comment_page_step, 7);
        assert_eq!(cfg.api.timeout_seconds, 10);
    }

    #[test]
    fn sanitized_replaces_blank_and_non_positive() {
        let mut cfg = Config::default();
        cfg.feed.default_source = "   ".into();
        cfg.ui.detail_page_step = -1;
        cfg.api.user_agent = String::new();
        let cfg = cfg.sanitized();
        assert_eq!(cfg.feed.default_source, "sysadmin");
        assert_eq!(cfg.ui.detail_page_step, 10);
        assert!(cfg.api.user_agent.starts_with("rview/"));
    }

    #[test]
    fn normalize_source_strips_prefixes() {
        assert_eq!(normalize_source("r/rust"), "rust");
        assert_eq!(normalize_source(" /r/golang/ "), "golang");
        assert_eq!(normalize_source("sysadmin"), "sysadmin");
        assert_eq!(normalize_source("  "), "");
    }
}
