use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path, time::Duration};

use crate::{Error, InternalResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Timeout applied to requests sent without an explicit one.
    #[serde(default = "default_request_timeout", with = "duration_ms")]
    pub default_request_timeout: Duration,

    /// Outbound messages held while the remote runtime is not ready yet.
    #[serde(default = "default_ready_backlog_limit")]
    pub ready_backlog_limit: usize,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is not set.
    #[serde(default = "default_log_filter")]
    pub filter: String,

    #[serde(default)]
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            with_target: false,
        }
    }
}

pub fn from_file<T: for<'de> Deserialize<'de>, P: AsRef<Path>>(path: P) -> InternalResult<T> {
    let file = File::open(path)
        .map_err(|e| Error::Internal(format!("Failed to open config file: {}", e)))?;
    let reader = BufReader::new(file);
    let config = serde_json::from_reader(reader)
        .map_err(|e| Error::Internal(format!("Failed to parse config file: {}", e)))?;
    Ok(config)
}

pub fn from_str<T: for<'de> Deserialize<'de>>(s: &str) -> InternalResult<T> {
    let config = serde_json::from_str(s)
        .map_err(|e| Error::Internal(format!("Failed to parse config: {}", e)))?;
    Ok(config)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_ready_backlog_limit() -> usize {
    256
}

fn default_log_filter() -> String {
    "info".to_string()
}

// Duration <-> milliseconds
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            default_request_timeout: default_request_timeout(),
            ready_backlog_limit: default_ready_backlog_limit(),
            logging: LoggingConfig::default(),
        }
    }
}

impl BridgeConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> InternalResult<Self> {
        from_file(path)
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.default_request_timeout = timeout;
        self
    }

    pub fn with_ready_backlog_limit(mut self, limit: usize) -> Self {
        self.ready_backlog_limit = limit;
        self
    }
}
