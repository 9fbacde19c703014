//! Runtime configuration.
//!
//! A [`Config`] fixes the worker pool before any thread starts. Values can be
//! set in code or read from the environment:
//!
//! | Variable | Field | Default |
//! |----------|-------|---------|
//! | `THREADMPI_WORKERS` | `workers` | available parallelism |
//! | `THREADMPI_STACK_SIZE` | `stack_size` | platform default |
//!
//! Missing or unparsable variables fall back to the default.

use std::env;

use crate::error::{Error, Result};

/// Environment variable holding the worker count.
pub const WORKERS_ENV: &str = "THREADMPI_WORKERS";

/// Environment variable holding the worker stack size in bytes.
pub const STACK_SIZE_ENV: &str = "THREADMPI_STACK_SIZE";

/// Worker pool configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Number of workers (ranks `0..workers`).
    pub workers: usize,
    /// Thread name prefix; worker `r` is named `"{thread_name}-{r}"`.
    pub thread_name: String,
    /// Stack size for worker threads, if overriding the platform default.
    pub stack_size: Option<usize>,
}

impl Config {
    /// Configuration for a fixed number of workers.
    pub fn new(workers: usize) -> Self {
        Config {
            workers,
            ..Self::default()
        }
    }

    /// Configuration read from `THREADMPI_*` environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(workers) = parse_env(WORKERS_ENV) {
            config.workers = workers;
        }
        config.stack_size = parse_env(STACK_SIZE_ENV);
        config
    }

    /// Set the thread name prefix.
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Set the worker stack size in bytes.
    pub fn with_stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::Configuration("worker count must be positive".into()));
        }
        if i32::try_from(self.workers).is_err() {
            return Err(Error::Configuration(format!(
                "worker count {} exceeds rank range",
                self.workers
            )));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            workers: std::thread::available_parallelism().map_or(1, |n| n.get()),
            thread_name: "worker".into(),
            stack_size: None,
        }
    }
}

fn parse_env(name: &str) -> Option<usize> {
    env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_has_at_least_one_worker() {
        let config = Config::default();
        assert!(config.workers >= 1);
        assert_eq!(config.thread_name, "worker");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builder_sets_fields() {
        let config = Config::new(6).with_thread_name("rank").with_stack_size(1 << 20);
        assert_eq!(config.workers, 6);
        assert_eq!(config.thread_name, "rank");
        assert_eq!(config.stack_size, Some(1 << 20));
    }

    #[test]
    fn zero_workers_rejected() {
        assert!(matches!(
            Config::new(0).validate(),
            Err(Error::Configuration(_))
        ));
    }

    /// Environment mutation stays in one test so parallel tests do not race
    /// on the same variables.
    #[test]
    fn env_var_parsing() {
        env::set_var(WORKERS_ENV, "12");
        env::set_var(STACK_SIZE_ENV, "65536");
        let config = Config::from_env();
        assert_eq!(config.workers, 12);
        assert_eq!(config.stack_size, Some(65536));

        env::set_var(WORKERS_ENV, "many");
        env::remove_var(STACK_SIZE_ENV);
        let config = Config::from_env();
        assert_eq!(config.workers, Config::default().workers);
        assert_eq!(config.stack_size, None);

        env::remove_var(WORKERS_ENV);
    }
}
