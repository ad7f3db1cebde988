/*!
 * Dispatch Configuration
 *
 * Worker naming, stack sizing and batch limits
 */

use crate::core::errors::{SyncError, SyncResult};
use serde::{Deserialize, Serialize};

/// Environment variable overriding the worker stack size (bytes)
pub const ENV_STACK_SIZE: &str = "KERNEL_SYNC_STACK_SIZE";
/// Environment variable capping the number of workers per dispatch
pub const ENV_MAX_WORKERS: &str = "KERNEL_SYNC_MAX_WORKERS";

/// Stack size used by [`DispatchConfig::small_stacks`]
const SMALL_STACK_SIZE: usize = 256 * 1024;

/// Dispatcher configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DispatchConfig {
    /// Prefix for worker thread names (`<prefix>-<index>` or `<prefix>-<label>`)
    pub thread_name_prefix: String,
    /// Stack size per worker; platform default when `None`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_size: Option<usize>,
    /// Largest batch accepted by a single dispatch; unbounded when `None`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_workers: Option<usize>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            thread_name_prefix: "worker".to_string(),
            stack_size: None,
            max_workers: None,
        }
    }
}

impl DispatchConfig {
    /// Configuration for many short-lived workers with shallow call stacks
    pub fn small_stacks() -> Self {
        Self {
            stack_size: Some(SMALL_STACK_SIZE),
            ..Self::default()
        }
    }

    /// Load overrides from the environment on top of the defaults
    ///
    /// Environment variables:
    /// - KERNEL_SYNC_STACK_SIZE: worker stack size in bytes
    /// - KERNEL_SYNC_MAX_WORKERS: largest batch a dispatch accepts
    pub fn from_env() -> SyncResult<Self> {
        Ok(Self {
            stack_size: env_usize(ENV_STACK_SIZE)?,
            max_workers: env_usize(ENV_MAX_WORKERS)?,
            ..Self::default()
        })
    }

    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    pub fn with_stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }

    pub fn with_max_workers(mut self, limit: usize) -> Self {
        self.max_workers = Some(limit);
        self
    }
}

fn env_usize(name: &str) -> SyncResult<Option<usize>> {
    match std::env::var(name) {
        Ok(raw) => parse_usize(name, &raw).map(Some),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(SyncError::Configuration(format!("{}: {}", name, e))),
    }
}

fn parse_usize(name: &str, raw: &str) -> SyncResult<usize> {
    raw.trim().parse().map_err(|e| {
        SyncError::Configuration(format!("{}={:?} is not a valid count: {}", name, raw, e))
    })
}
