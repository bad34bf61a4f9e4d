use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use llcas_action::DEFAULT_SHARDS;
use llcas_exec::ExecutorConfig;
use llcas_log::SyncMode;
use llcas_store::StoreLimits;
use llcas_types::HashAlgorithm;

use crate::error::{ConfigError, ConfigResult};

/// Configuration for opening a [`crate::Cas`].
///
/// ```toml
/// path = "/var/cache/llcas"
/// algorithm = "blake3"
/// sync = "os-default"
/// verify_on_read = true
///
/// [limits]
/// max_bytes = 10737418240
///
/// [action_cache]
/// allow_overwrite = false
/// shards = 16
///
/// [runtime]
/// worker_threads = 2
/// max_blocking_threads = 8
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CasConfig {
    /// Store directory. `None` keeps everything in memory.
    pub path: Option<PathBuf>,
    pub algorithm: HashAlgorithm,
    pub limits: StoreLimits,
    pub action_cache: ActionCacheConfig,
    pub runtime: ExecutorConfig,
    pub sync: SyncMode,
    /// Recompute the digest of every object read from disk.
    pub verify_on_read: bool,
}

impl Default for CasConfig {
    fn default() -> Self {
        Self {
            path: None,
            algorithm: HashAlgorithm::default(),
            limits: StoreLimits::default(),
            action_cache: ActionCacheConfig::default(),
            runtime: ExecutorConfig::default(),
            sync: SyncMode::default(),
            verify_on_read: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionCacheConfig {
    /// Default overwrite policy for action puts that do not pass one.
    pub allow_overwrite: bool,
    pub shards: usize,
}

impl Default for ActionCacheConfig {
    fn default() -> Self {
        Self {
            allow_overwrite: false,
            shards: DEFAULT_SHARDS,
        }
    }
}

impl CasConfig {
    /// In-memory configuration with defaults.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// File-backed configuration rooted at `path`, otherwise default.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> ConfigResult<Self> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.action_cache.shards == 0 {
            return Err(ConfigError::Invalid("action_cache.shards must be at least 1".into()));
        }
        self.runtime
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use llcas_types::ErrorKind;

    #[test]
    fn defaults() {
        let c = CasConfig::default();
        assert!(c.path.is_none());
        assert_eq!(c.algorithm, HashAlgorithm::Blake3);
        assert!(!c.action_cache.allow_overwrite);
        assert_eq!(c.action_cache.shards, 16);
        assert_eq!(c.runtime.worker_threads, 2);
        assert_eq!(c.runtime.max_blocking_threads, 8);
        assert_eq!(c.sync, SyncMode::OsDefault);
        assert!(c.verify_on_read);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(CasConfig::from_toml_str("").unwrap(), CasConfig::default());
    }

    #[test]
    fn full_toml() {
        let c = CasConfig::from_toml_str(
            r#"
            path = "/tmp/llcas"
            algorithm = "sha256"
            sync = "every-write"
            verify_on_read = false

            [limits]
            max_objects = 1000

            [action_cache]
            allow_overwrite = true
            shards = 4

            [runtime]
            worker_threads = 1
            "#,
        )
        .unwrap();

        assert_eq!(c.path, Some(PathBuf::from("/tmp/llcas")));
        assert_eq!(c.algorithm, HashAlgorithm::Sha256);
        assert_eq!(c.sync, SyncMode::EveryWrite);
        assert!(!c.verify_on_read);
        assert_eq!(c.limits.max_objects, Some(1000));
        assert_eq!(c.limits.max_bytes, None);
        assert!(c.action_cache.allow_overwrite);
        assert_eq!(c.action_cache.shards, 4);
        assert_eq!(c.runtime.worker_threads, 1);
        assert_eq!(c.runtime.max_blocking_threads, 8);
    }

    #[test]
    fn unknown_algorithm_rejected() {
        let err = CasConfig::from_toml_str(r#"algorithm = "md5""#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert_eq!(llcas_types::CasError::from(err).kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn zero_shards_rejected() {
        let err = CasConfig::from_toml_str("[action_cache]\nshards = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn zero_workers_rejected() {
        let err = CasConfig::from_toml_str("[runtime]\nworker_threads = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("llcas.toml");
        fs::write(&path, "algorithm = \"sha256\"\n").unwrap();
        assert_eq!(CasConfig::load(&path).unwrap().algorithm, HashAlgorithm::Sha256);

        let missing = dir.path().join("missing.toml");
        assert!(matches!(CasConfig::load(&missing), Err(ConfigError::Read { .. })));
    }

    #[test]
    fn at_sets_path() {
        let c = CasConfig::at("/data/cas");
        assert_eq!(c.path.as_deref(), Some(Path::new("/data/cas")));
    }
}
