//! Configuration management for the CLI
//!
//! Settings are layered: built-in defaults, then the optional file
//! `~/.config/pvcusage/config.json`, then `PVCUSAGE_*` environment
//! variables. Command-line flags are applied on top by the caller.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable prefix, e.g. `PVCUSAGE_NAMESPACE`
const ENV_PREFIX: &str = "PVCUSAGE";

/// CLI settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Namespace used when `--namespace` is not given
    pub namespace: Option<String>,
    /// Watch mode refresh interval in seconds
    pub watch_interval: u64,
    /// Filter expression used when `--filter` is not given
    pub filter: String,
    /// Result cap used when `--top` is not given
    pub top: i64,
    /// Diagnostic pod image
    pub image: Option<String>,
    /// Monitor collection interval in seconds
    pub collection_interval: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            namespace: None,
            watch_interval: 5,
            filter: String::new(),
            top: 0,
            image: None,
            collection_interval: 1,
        }
    }
}

impl Settings {
    /// Load settings from the default file location and the environment
    pub fn load() -> Result<Self> {
        let path = Self::config_path().ok();
        Self::load_from(path.as_deref())
    }

    /// Load settings from `path` (if present) and the environment
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(
                config::File::new(&path.to_string_lossy(), config::FileFormat::Json)
                    .required(false),
            );
        }

        let settings = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()
            .context("Failed to read configuration")?;

        settings
            .try_deserialize()
            .context("Failed to parse configuration")
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs_next::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".config").join("pvcusage").join("config.json"))
    }
}

/// Kubeconfig explicitly requested by the `--kubeconfig` flag. `None` leaves
/// the choice to client inference (`KUBECONFIG`, in-cluster, then
/// `~/.kube/config`).
pub fn kubeconfig_path(override_path: Option<&str>) -> Option<PathBuf> {
    override_path
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_without_file() {
        let settings = Settings::load_from(Some(Path::new("/nonexistent/pvcusage.json"))).unwrap();
        assert_eq!(settings.watch_interval, 5);
        assert_eq!(settings.top, 0);
        assert!(settings.filter.is_empty());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{"namespace": "kafka", "top": 3, "filter": ">80"}}"#
        )
        .unwrap();

        let settings = Settings::load_from(Some(file.path())).unwrap();
        assert_eq!(settings.namespace.as_deref(), Some("kafka"));
        assert_eq!(settings.top, 3);
        assert_eq!(settings.filter, ">80");
        assert_eq!(settings.collection_interval, 1);
    }

    #[test]
    fn test_kubeconfig_path() {
        assert_eq!(kubeconfig_path(None), None);
        assert_eq!(kubeconfig_path(Some("")), None);
        assert_eq!(
            kubeconfig_path(Some("/tmp/kc")),
            Some(PathBuf::from("/tmp/kc"))
        );
    }
}
