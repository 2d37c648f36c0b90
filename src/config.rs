//! # Configuration
//!
//! Settings for a local compute resource environment. Values are layered with the
//! `config` crate: built-in defaults, then an optional configuration file, then
//! `CRE_`-prefixed environment variables.
//!
//! ```rust,no_run
//! use cre_core::config::CreConfig;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CreConfig::load(Some(Path::new("config/cre.toml")))?;
//! println!("dispatching on {} threads", config.effective_thread_count());
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use ::config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::{DEFAULT_MAILBOX_CAPACITY, DEFAULT_SHUTDOWN_GRACE_PERIOD_MS, ENV_PREFIX};
use crate::error::{CreError, CreResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreConfig {
    /// Directory holding the central repository and per-ticket scratch directories
    pub build_dir: PathBuf,
    /// Directory relative inputs are resolved against
    pub work_dir: PathBuf,
    /// Worker pool size; `None` means available hardware parallelism
    #[serde(default)]
    pub thread_count: Option<usize>,
    /// How long running tasks may take to honor a shutdown before being abandoned
    #[serde(default = "default_shutdown_grace_period_ms")]
    pub shutdown_grace_period_ms: u64,
    /// Per-ticket execution timeout; `None` disables it
    #[serde(default)]
    pub task_timeout_ms: Option<u64>,
    /// Capacity of the actor's mailbox channel
    #[serde(default = "default_mailbox_capacity")]
    pub mailbox_capacity: usize,
}

fn default_shutdown_grace_period_ms() -> u64 {
    DEFAULT_SHUTDOWN_GRACE_PERIOD_MS
}

fn default_mailbox_capacity() -> usize {
    DEFAULT_MAILBOX_CAPACITY
}

impl CreConfig {
    pub fn new(build_dir: impl Into<PathBuf>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            build_dir: build_dir.into(),
            work_dir: work_dir.into(),
            thread_count: None,
            shutdown_grace_period_ms: DEFAULT_SHUTDOWN_GRACE_PERIOD_MS,
            task_timeout_ms: None,
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
        }
    }

    pub fn with_thread_count(mut self, thread_count: usize) -> Self {
        self.thread_count = Some(thread_count);
        self
    }

    pub fn with_shutdown_grace_period(mut self, grace: Duration) -> Self {
        self.shutdown_grace_period_ms = grace.as_millis() as u64;
        self
    }

    pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    /// Load configuration from an optional file plus `CRE_*` environment overrides
    pub fn load(path: Option<&Path>) -> CreResult<Self> {
        let mut builder = Config::builder()
            .set_default(
                "shutdown_grace_period_ms",
                DEFAULT_SHUTDOWN_GRACE_PERIOD_MS as i64,
            )?
            .set_default("mailbox_capacity", DEFAULT_MAILBOX_CAPACITY as i64)?;

        if let Some(path) = path {
            debug!(path = %path.display(), "Loading CRE configuration file");
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true));

        let config: CreConfig = builder.build()?.try_deserialize()?;
        config.validate()?;

        debug!(
            build_dir = %config.build_dir.display(),
            work_dir = %config.work_dir.display(),
            thread_count = ?config.thread_count,
            "CRE configuration loaded"
        );

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> CreResult<Self> {
        Self::load(None)
    }

    /// Reject values that can never produce a working actor
    ///
    /// Directory existence is checked by the actor itself at construction.
    pub fn validate(&self) -> CreResult<()> {
        if self.thread_count == Some(0) {
            return Err(CreError::InvalidThreadCount(0));
        }
        if self.mailbox_capacity == 0 {
            return Err(CreError::ConfigurationError(
                "mailbox_capacity must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn effective_thread_count(&self) -> usize {
        self.thread_count.unwrap_or_else(default_thread_count)
    }

    pub fn shutdown_grace_period(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_period_ms)
    }

    pub fn task_timeout(&self) -> Option<Duration> {
        self.task_timeout_ms.map(Duration::from_millis)
    }
}

/// Available hardware parallelism, never less than one
pub fn default_thread_count() -> usize {
    std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const ENV_KEYS: [&str; 3] = ["CRE_BUILD_DIR", "CRE_WORK_DIR", "CRE_THREAD_COUNT"];

    fn clear_env() {
        for key in ENV_KEYS {
            std::env::remove_var(key);
        }
    }

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("temp config file");
        file.write_all(contents.as_bytes()).expect("write config");
        file
    }

    #[test]
    #[serial]
    fn test_load_from_file_with_defaults() {
        let file = write_config(
            r#"
build_dir = "/tmp/b"
work_dir = "/tmp/w"
"#,
        );

        let config = CreConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.build_dir, PathBuf::from("/tmp/b"));
        assert_eq!(config.work_dir, PathBuf::from("/tmp/w"));
        assert_eq!(config.thread_count, None);
        assert_eq!(
            config.shutdown_grace_period(),
            Duration::from_millis(DEFAULT_SHUTDOWN_GRACE_PERIOD_MS)
        );
        assert_eq!(config.mailbox_capacity, DEFAULT_MAILBOX_CAPACITY);
        assert_eq!(config.task_timeout(), None);
    }

    #[test]
    #[serial]
    fn test_load_from_file_with_overrides() {
        let file = write_config(
            r#"
build_dir = "/tmp/b"
work_dir = "/tmp/w"
thread_count = 2
shutdown_grace_period_ms = 250
task_timeout_ms = 60000
mailbox_capacity = 16
"#,
        );

        let config = CreConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.thread_count, Some(2));
        assert_eq!(config.effective_thread_count(), 2);
        assert_eq!(config.shutdown_grace_period(), Duration::from_millis(250));
        assert_eq!(config.task_timeout(), Some(Duration::from_secs(60)));
        assert_eq!(config.mailbox_capacity, 16);
    }

    #[test]
    #[serial]
    fn test_zero_thread_count_rejected() {
        let file = write_config(
            r#"
build_dir = "/tmp/b"
work_dir = "/tmp/w"
thread_count = 0
"#,
        );

        let err = CreConfig::load(Some(file.path())).unwrap_err();
        assert_eq!(err, CreError::InvalidThreadCount(0));
    }

    #[test]
    #[serial]
    fn test_missing_directories_is_configuration_error() {
        let file = write_config("thread_count = 4\n");
        let err = CreConfig::load(Some(file.path())).unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    #[serial]
    fn test_missing_file_is_configuration_error() {
        let err = CreConfig::load(Some(Path::new("/definitely/not/here/cre.toml"))).unwrap_err();
        assert!(matches!(err, CreError::ConfigurationError(_)));
    }

    #[test]
    #[serial]
    fn test_environment_overrides_file_values() {
        clear_env();
        let file = write_config(
            r#"
build_dir = "/tmp/file-build"
work_dir = "/tmp/file-work"
thread_count = 2
"#,
        );

        std::env::set_var("CRE_BUILD_DIR", "/tmp/env-build");
        std::env::set_var("CRE_THREAD_COUNT", "6");

        let config = CreConfig::load(Some(file.path()));
        clear_env();

        let config = config.unwrap();
        assert_eq!(config.build_dir, PathBuf::from("/tmp/env-build"));
        assert_eq!(config.work_dir, PathBuf::from("/tmp/file-work"));
        assert_eq!(config.thread_count, Some(6));
    }

    #[test]
    #[serial]
    fn test_from_env_reads_prefixed_variables() {
        clear_env();
        std::env::set_var("CRE_BUILD_DIR", "/tmp/env-build");
        std::env::set_var("CRE_WORK_DIR", "/tmp/env-work");
        std::env::set_var("CRE_THREAD_COUNT", "3");

        let config = CreConfig::from_env();
        clear_env();

        let config = config.unwrap();
        assert_eq!(config.build_dir, PathBuf::from("/tmp/env-build"));
        assert_eq!(config.work_dir, PathBuf::from("/tmp/env-work"));
        assert_eq!(config.effective_thread_count(), 3);
        assert_eq!(config.mailbox_capacity, DEFAULT_MAILBOX_CAPACITY);
    }

    #[test]
    #[serial]
    fn test_zero_thread_count_from_env_rejected() {
        clear_env();
        std::env::set_var("CRE_BUILD_DIR", "/tmp/env-build");
        std::env::set_var("CRE_WORK_DIR", "/tmp/env-work");
        std::env::set_var("CRE_THREAD_COUNT", "0");

        let result = CreConfig::from_env();
        clear_env();

        assert_eq!(result.unwrap_err(), CreError::InvalidThreadCount(0));
    }

    #[test]
    fn test_default_thread_count_is_positive() {
        assert!(default_thread_count() >= 1);
        let config = CreConfig::new("/tmp/b", "/tmp/w");
        assert_eq!(config.effective_thread_count(), default_thread_count());
    }

    #[test]
    fn test_builder_helpers() {
        let config = CreConfig::new("/tmp/b", "/tmp/w")
            .with_thread_count(3)
            .with_shutdown_grace_period(Duration::from_millis(10))
            .with_task_timeout(Duration::from_secs(2));
        assert!(config.validate().is_ok());
        assert_eq!(config.thread_count, Some(3));
        assert_eq!(config.shutdown_grace_period_ms, 10);
        assert_eq!(config.task_timeout_ms, Some(2000));
    }
}
