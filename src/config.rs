//! Configuration
//!
//! Connection settings and secret values for the surrounding service.
//! Loaded from a YAML file (default `config.yaml`).
//!
//! ## Priority Order (highest to lowest)
//!
//! 1. Environment variables (`FLOWDEF_DB_DSN`, then `DB_DSN`)
//! 2. Config file
//! 3. Defaults
//!
//! There is no process-wide instance. Callers own a [`ConfigStore`], pass
//! it where it is needed, and call [`ConfigStore::reload`] when the file
//! changes; subscribers are notified through a watch channel.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::ast::Definition;
use crate::error::{FlowError, Result};

pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

const DSN_ENV_VARS: [&str; 2] = ["FLOWDEF_DB_DSN", "DB_DSN"];

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FlowConfig {
    #[serde(default)]
    pub db: DbConfig,

    /// Secret name -> value, used to fill definition secrets
    #[serde(default)]
    pub secrets: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DbConfig {
    #[serde(default)]
    pub dsn: String,
}

impl FlowConfig {
    /// Load configuration from file
    ///
    /// Returns default config if the file doesn't exist.
    /// Returns error if the file exists but is malformed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| FlowError::ConfigError {
            reason: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|e| FlowError::ConfigError {
            reason: format!("Failed to parse config file: {}", e),
        })
    }

    /// Merge with environment variables
    ///
    /// Environment variables take precedence over config file values.
    pub fn with_env(self) -> Self {
        self.with_env_from(|name| std::env::var(name).ok())
    }

    fn with_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(dsn) = DSN_ENV_VARS
            .iter()
            .filter_map(|name| lookup(name))
            .find(|value| !value.is_empty())
        {
            self.db.dsn = dsn;
        }
        self
    }

    pub fn secret(&self, name: &str) -> Option<&str> {
        self.secrets
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

/// Owned, refreshable configuration with change notification
pub struct ConfigStore {
    path: PathBuf,
    tx: watch::Sender<Arc<FlowConfig>>,
}

impl ConfigStore {
    /// Load `path` (plus env overrides) into a new store
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let config = FlowConfig::load(&path)?.with_env();
        Ok(Self::with_config(path, config))
    }

    pub fn with_config(path: impl Into<PathBuf>, config: FlowConfig) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(config));
        Self {
            path: path.into(),
            tx,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of the current configuration
    pub fn current(&self) -> Arc<FlowConfig> {
        Arc::clone(&self.tx.borrow())
    }

    /// Receiver notified on every successful reload
    pub fn subscribe(&self) -> watch::Receiver<Arc<FlowConfig>> {
        self.tx.subscribe()
    }

    /// Re-read the file and publish the result.
    ///
    /// On failure the previous configuration stays in place and the error
    /// is returned.
    pub fn reload(&self) -> Result<Arc<FlowConfig>> {
        match FlowConfig::load(&self.path) {
            Ok(config) => {
                let config = Arc::new(config.with_env());
                self.tx.send_replace(Arc::clone(&config));
                tracing::debug!(path = %self.path.display(), "configuration reloaded");
                Ok(config)
            }
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "configuration reload failed, keeping previous values"
                );
                Err(e)
            }
        }
    }

    /// Replace the configuration directly and notify subscribers
    pub fn publish(&self, config: FlowConfig) {
        self.tx.send_replace(Arc::new(config));
    }
}

impl Definition {
    /// Fill every declared secret whose value is empty, first from
    /// `config.secrets`, then from the environment variable of the same
    /// name. Values already present are kept.
    pub fn with_resolved_secrets(self, config: &FlowConfig) -> Self {
        self.with_secrets_from(config, |name| std::env::var(name).ok())
    }

    fn with_secrets_from(
        mut self,
        config: &FlowConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        for (name, value) in self.secrets.iter_mut() {
            if !value.is_empty() {
                continue;
            }
            let resolved = config
                .secret(name)
                .map(str::to_string)
                .or_else(|| env(name).filter(|v| !v.is_empty()));

            match resolved {
                Some(secret) => *value = secret,
                None => tracing::debug!(secret = %name, "secret left unresolved"),
            }
        }
        self
    }
}
