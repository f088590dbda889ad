//! Executor Configuration
//!
//! Chooses the executor from a small YAML document instead of code, so a
//! driver script can switch between local and parallel runs without
//! touching its task functions.
//!
//! # Example YAML Format
//!
//! ```yaml
//! executor:
//!   kind: threads
//!   max_parallel: 8
//! ```
//!
//! `kind` is one of `sequential`, `threads` or `tokio`. Omitted worker
//! counts default to the number of CPUs.

use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::execution::{set_default_executor, DistributedExecutor, Executor, Sequential};

/// Errors loading or applying a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("failed to start executor: {0}")]
    Startup(#[source] io::Error),
}

/// Which executor to build.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutorConfig {
    /// In-process, one call at a time.
    #[default]
    Sequential,

    /// Local worker threads.
    Threads {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_parallel: Option<usize>,
    },

    /// Blocking pool of a tokio runtime.
    Tokio {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        worker_threads: Option<usize>,
    },
}

impl ExecutorConfig {
    /// Builds the configured executor.
    pub fn build(&self) -> Result<Arc<dyn Executor>, ConfigError> {
        let executor: Arc<dyn Executor> = match self {
            Self::Sequential => Arc::new(Sequential::new()),
            Self::Threads { max_parallel } => {
                let workers = worker_count(*max_parallel)?;
                Arc::new(DistributedExecutor::threads(workers).map_err(ConfigError::Startup)?)
            }
            Self::Tokio { worker_threads } => {
                let workers = worker_count(*worker_threads)?;
                Arc::new(DistributedExecutor::tokio(workers).map_err(ConfigError::Startup)?)
            }
        };
        info!("Built '{}' executor", executor.name());
        Ok(executor)
    }

    /// Builds the executor and makes it the process-wide default.
    pub fn install(&self) -> Result<Arc<dyn Executor>, ConfigError> {
        let executor = self.build()?;
        set_default_executor(Arc::clone(&executor));
        Ok(executor)
    }
}

fn worker_count(requested: Option<usize>) -> Result<usize, ConfigError> {
    match requested {
        Some(0) => Err(ConfigError::Invalid(
            "worker count must be at least 1".to_string(),
        )),
        Some(count) => Ok(count),
        None => Ok(num_cpus::get()),
    }
}

/// Top-level configuration document.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowConfig {
    #[serde(default)]
    pub executor: ExecutorConfig,
}

impl FlowConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Loads a configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let yaml = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        info!("Loaded config from {}", path.display());
        Self::from_yaml_str(&yaml)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }
}
