//! Server configuration
//!
//! Every setting comes from an environment variable and falls back to a
//! default when unset or unparsable.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tasktrack_core::pipeline::DEFAULT_PROCESSING_DELAY;

pub const DEFAULT_DB_PATH: &str = "./db.sqlite3";
pub const DEFAULT_PORT: u16 = 8081;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub db_path: PathBuf,
    pub port: u16,
    pub processing_delay: Duration,
    /// `None` keeps the dispatch channel unbounded
    pub queue_capacity: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            port: DEFAULT_PORT,
            processing_delay: DEFAULT_PROCESSING_DELAY,
            queue_capacity: None,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let db_path = lookup("TASKTRACK_DB_PATH")
            .map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.db_path);

        let port = parse_var(&lookup, "TASKTRACK_PORT").unwrap_or(defaults.port);

        let processing_delay = parse_var::<u64>(&lookup, "TASKTRACK_PROCESSING_DELAY_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.processing_delay);

        let queue_capacity = parse_var::<usize>(&lookup, "TASKTRACK_QUEUE_CAPACITY")
            .filter(|capacity| *capacity > 0);

        Self {
            db_path,
            port,
            processing_delay,
            queue_capacity,
        }
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    let raw = lookup(name)?;
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring invalid value {:?} for {}", raw, name);
            None
        }
    }
}
