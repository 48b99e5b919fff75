//! Staging cache settings.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::util::{Error, Result};

/// Environment variable overriding [`StagingConfig::temp_root`].
pub const ENV_ROOT: &str = "ANNDATA_STAGE_ROOT";
/// Environment variable overriding [`StagingConfig::namespace`].
pub const ENV_NAMESPACE: &str = "ANNDATA_STAGE_NAMESPACE";

/// Where and how remote files are staged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StagingConfig {
    /// Base directory, the system temp directory by default
    pub temp_root: PathBuf,
    /// Directory below `temp_root` owned by the cache
    pub namespace: String,
    /// Overall timeout for one HTTP transfer; unbounded when unset
    pub http_timeout_secs: Option<u64>,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            temp_root: std::env::temp_dir(),
            namespace: "anndata-stage".to_string(),
            http_timeout_secs: None,
        }
    }
}

impl StagingConfig {
    /// Defaults with environment overrides applied.
    ///
    /// Fails if the namespace from the environment is not a plain directory
    /// name.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Some(root) = std::env::var_os(ENV_ROOT).filter(|v| !v.is_empty()) {
            config.temp_root = PathBuf::from(root);
        }
        if let Ok(namespace) = std::env::var(ENV_NAMESPACE) {
            if !namespace.is_empty() {
                config.namespace = namespace;
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// Read settings from a JSON file. Missing keys keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the namespace is a single plain path component.
    pub fn validate(&self) -> Result<()> {
        let ns = self.namespace.as_str();
        if ns.is_empty() || ns == "." || ns == ".." || ns.contains(|c: char| c == '/' || c == '\\') {
            return Err(Error::Config(format!(
                "namespace must be a single directory name, got '{ns}'"
            )));
        }
        Ok(())
    }

    /// Root directory of all cache entries.
    pub fn cache_root(&self) -> PathBuf {
        self.temp_root.join(&self.namespace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StagingConfig::default();
        assert_eq!(config.namespace, "anndata-stage");
        assert_eq!(config.cache_root(), std::env::temp_dir().join("anndata-stage"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_json_partial() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stage.json");
        std::fs::write(&path, r#"{ "namespace": "pipeline-cache", "http_timeout_secs": 30 }"#).unwrap();

        let config = StagingConfig::from_json_file(&path).unwrap();
        assert_eq!(config.namespace, "pipeline-cache");
        assert_eq!(config.http_timeout_secs, Some(30));
        assert_eq!(config.temp_root, std::env::temp_dir());
    }

    #[test]
    fn test_json_rejects_bad_namespace() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stage.json");
        std::fs::write(&path, r#"{ "namespace": "../escape" }"#).unwrap();
        assert!(matches!(StagingConfig::from_json_file(&path), Err(Error::Config(_))));

        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(StagingConfig::from_json_file(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_env_namespace_is_validated() {
        std::env::set_var(ENV_NAMESPACE, "../outside");
        let result = StagingConfig::from_env();
        std::env::remove_var(ENV_NAMESPACE);
        assert!(matches!(result, Err(Error::Config(msg)) if msg.contains("../outside")));
    }
}
