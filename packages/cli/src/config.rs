use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_CONFIG_NAME: &str = "quire.config.json";

/// Quire configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Directory holding exported story files
    #[serde(default = "default_stories_dir")]
    pub stories_dir: String,

    /// Author id used when `apply` is given no `--user`
    #[serde(default = "default_user")]
    pub default_user: String,

    /// Log filter used when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_stories_dir() -> String {
    "stories".to_string()
}

fn default_user() -> String {
    "cli".to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &str) -> anyhow::Result<Self> {
        let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Get absolute path to the stories directory
    pub fn get_stories_dir(&self, cwd: &str) -> PathBuf {
        PathBuf::from(cwd).join(&self.stories_dir)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            stories_dir: default_stories_dir(),
            default_user: default_user(),
            log_level: default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "storiesDir": "drafts",
            "defaultUser": "ada",
            "logLevel": "quire_editor=debug"
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.stories_dir, "drafts");
        assert_eq!(config.default_user, "ada");
        assert_eq!(config.log_level, "quire_editor=debug");
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{ "defaultUser": "ada" }"#).unwrap();
        assert_eq!(config.stories_dir, "stories");
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().display().to_string()).unwrap();
        assert_eq!(config, Config::default());
    }
}
