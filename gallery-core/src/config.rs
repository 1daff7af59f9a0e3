//! YAML configuration.
//!
//! # Storage layout
//!
//! ```text
//! ~/.gallery/
//!   config.yaml
//! ```
//!
//! # Example
//!
//! ```yaml
//! feed:
//!   token_env: TELEGRAM_TOKEN
//!   chat_id: -1001234567890
//! store:
//!   backend: github
//!   repo: someone/infinite-gallery
//!   branch: main
//! prune_orphans: false
//! ```
//!
//! Secrets never live in the file; the config names the environment variables
//! that hold them.
//!
//! As with every path-based loader here, `load_at(home)` takes an explicit
//! home and `load()` derives it from `dirs::home_dir()`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_TELEGRAM_API: &str = "https://api.telegram.org";
pub const DEFAULT_GITHUB_API: &str = "https://api.github.com";

// ---------------------------------------------------------------------------
// Config types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub feed: FeedConfig,
    pub store: StoreConfig,
    #[serde(default)]
    pub layout: Layout,
    /// Delete stored images whose content is no longer known upstream.
    /// Irreversible, so off unless asked for.
    #[serde(default)]
    pub prune_orphans: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub api_base: String,
    /// Environment variable holding the bot token.
    pub token_env: String,
    /// Only take attachments from this chat; other chats are skipped.
    pub chat_id: Option<i64>,
    pub timeout_secs: u64,
    pub download_timeout_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_TELEGRAM_API.to_string(),
            token_env: "TELEGRAM_TOKEN".to_string(),
            chat_id: None,
            timeout_secs: 30,
            download_timeout_secs: 60,
        }
    }
}

impl FeedConfig {
    pub fn token(&self) -> Result<String, ConfigError> {
        secret(&self.token_env, "the feed bot token")
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StoreConfig {
    Github(GitHubConfig),
    Local(LocalConfig),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// `owner/name`.
    pub repo: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(default = "default_github_token_env")]
    pub token_env: String,
    #[serde(default = "default_github_api")]
    pub api_base: String,
    #[serde(default = "default_store_timeout")]
    pub timeout_secs: u64,
}

impl GitHubConfig {
    pub fn token(&self) -> Result<String, ConfigError> {
        secret(&self.token_env, "the GitHub access token")
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalConfig {
    pub root: PathBuf,
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_github_token_env() -> String {
    "GH_PAT".to_string()
}

fn default_github_api() -> String {
    DEFAULT_GITHUB_API.to_string()
}

fn default_store_timeout() -> u64 {
    30
}

/// Extension given to attachments without a usable filename. Telegram photos
/// are always JPEG, so every layout must accept it.
pub const PHOTO_EXTENSION: &str = "jpg";

/// Where things live inside the store, and which files count as images.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Layout {
    pub image_dir: String,
    pub state_dir: String,
    pub manifest_path: String,
    /// Stored images are named `<prefix><5-digit index>.<ext>`.
    pub name_prefix: String,
    /// Accepted extensions, without the dot, compared case-insensitively.
    pub extensions: Vec<String>,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            image_dir: "images".to_string(),
            state_dir: ".state".to_string(),
            manifest_path: "manifest.js".to_string(),
            name_prefix: "image".to_string(),
            extensions: ["jpg", "jpeg", "png", "webp"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Layout {
    pub fn cursor_path(&self) -> String {
        crate::types::join_path(&self.state_dir, "cursor")
    }

    pub fn registry_path(&self) -> String {
        crate::types::join_path(&self.state_dir, "image_hashes.json")
    }

    /// Whether `ext` (no dot) is an accepted image extension.
    pub fn accepts_extension(&self, ext: &str) -> bool {
        self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
    }

    /// Whether `name` ends in an accepted image extension.
    pub fn accepts(&self, name: &str) -> bool {
        match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => self.accepts_extension(ext),
            _ => false,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.extensions.is_empty() {
            return Err(ConfigError::Invalid(
                "layout.extensions must list at least one extension".into(),
            ));
        }
        if !self.accepts_extension(PHOTO_EXTENSION) {
            return Err(ConfigError::Invalid(format!(
                "layout.extensions must include '{PHOTO_EXTENSION}' (photos are stored as JPEG)"
            )));
        }
        if self.name_prefix.is_empty() || self.name_prefix.chars().any(|c| c.is_ascii_digit()) {
            return Err(ConfigError::Invalid(format!(
                "layout.name_prefix '{}' must be non-empty and contain no digits",
                self.name_prefix
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// `<home>/.gallery/config.yaml`: pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    home.join(".gallery").join("config.yaml")
}

/// Parse and validate a config document.
pub fn parse(contents: &str, path: &Path) -> Result<Config, ConfigError> {
    let config: Config = serde_yaml::from_str(contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;
    config.validate()?;
    Ok(config)
}

/// Load the config from an explicit file.
pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse(&contents, path)
}

/// Load `<home>/.gallery/config.yaml`.
pub fn load_at(home: &Path) -> Result<Config, ConfigError> {
    load_from(&config_path_at(home))
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<Config, ConfigError> {
    load_at(&dirs::home_dir().ok_or(ConfigError::HomeNotFound)?)
}

impl Config {
    fn validate(&self) -> Result<(), ConfigError> {
        if let StoreConfig::Github(gh) = &self.store {
            let valid = gh
                .repo
                .split_once('/')
                .map(|(owner, name)| !owner.is_empty() && !name.is_empty() && !name.contains('/'))
                .unwrap_or(false);
            if !valid {
                return Err(ConfigError::Invalid(format!(
                    "store.repo '{}' must have the form owner/name",
                    gh.repo
                )));
            }
        }
        self.layout.validate()
    }
}

fn secret(var: &str, purpose: &'static str) -> Result<String, ConfigError> {
    match std::env::var(var) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::MissingSecret {
            var: var.to_string(),
            purpose,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_github_config_fills_defaults() {
        let cfg = parse(
            "store:\n  backend: github\n  repo: someone/gallery\n",
            Path::new("config.yaml"),
        )
        .unwrap();
        assert_eq!(cfg.feed, FeedConfig::default());
        assert_eq!(cfg.layout, Layout::default());
        assert!(!cfg.prune_orphans);
        match cfg.store {
            StoreConfig::Github(gh) => {
                assert_eq!(gh.branch, "main");
                assert_eq!(gh.token_env, "GH_PAT");
                assert_eq!(gh.api_base, DEFAULT_GITHUB_API);
            }
            other => panic!("expected github store, got {other:?}"),
        }
    }

    #[test]
    fn local_store_and_layout_overrides() {
        let cfg = parse(
            "store:\n  backend: local\n  root: /srv/gallery\nlayout:\n  image_dir: photos\n  extensions: [jpg]\nprune_orphans: true\n",
            Path::new("config.yaml"),
        )
        .unwrap();
        assert!(cfg.prune_orphans);
        assert_eq!(cfg.layout.image_dir, "photos");
        assert_eq!(cfg.layout.state_dir, ".state");
        assert_eq!(
            cfg.store,
            StoreConfig::Local(LocalConfig {
                root: PathBuf::from("/srv/gallery")
            })
        );
    }

    #[test]
    fn rejects_malformed_repo() {
        let err = parse(
            "store:\n  backend: github\n  repo: just-a-name\n",
            Path::new("config.yaml"),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)), "got: {err}");
    }

    #[test]
    fn rejects_prefix_with_digits() {
        let err = parse(
            "store:\n  backend: local\n  root: /tmp\nlayout:\n  name_prefix: img2\n",
            Path::new("config.yaml"),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)), "got: {err}");
    }

    #[test]
    fn rejects_extensions_without_jpg() {
        let err = parse(
            "store:\n  backend: local\n  root: /tmp\nlayout:\n  extensions: [png, webp]\n",
            Path::new("config.yaml"),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)), "got: {err}");
        assert!(err.to_string().contains("jpg"), "got: {err}");

        parse(
            "store:\n  backend: local\n  root: /tmp\nlayout:\n  extensions: [PNG, JPG]\n",
            Path::new("config.yaml"),
        )
        .unwrap();
    }

    #[test]
    fn layout_accepts_case_insensitively() {
        let layout = Layout::default();
        assert!(layout.accepts("image00001.JPG"));
        assert!(layout.accepts("a.webp"));
        assert!(!layout.accepts(".gitkeep"));
        assert!(!layout.accepts("notes.txt"));
        assert!(!layout.accepts("jpg"));
        assert_eq!(layout.cursor_path(), ".state/cursor");
        assert_eq!(layout.registry_path(), ".state/image_hashes.json");
    }

    #[test]
    fn missing_secret_names_the_variable() {
        let feed = FeedConfig {
            token_env: "GALLERY_TEST_SURELY_UNSET_VAR".into(),
            ..FeedConfig::default()
        };
        let err = feed.token().unwrap_err();
        assert!(err.to_string().contains("GALLERY_TEST_SURELY_UNSET_VAR"));
    }
}
