//! Application configuration, extracted via figment from defaults, an
//! optional `watchtime.toml` and the environment.
//!
//! Durations accept either a plain number of seconds or a human string
//! parsed by `fundu` (`500ms`, `10s`, `1m`).

use crate::store::StoreConfig;
use crate::store::snapshot::{DEFAULT_FLUSH_INTERVAL, DEFAULT_SNAPSHOT_PATH};
use crate::video::service::DEFAULT_LIMIT_TIME_MS;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILE: &str = "watchtime.toml";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Base level for this crate's logs; `RUST_LOG` overrides it entirely.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Snapshot file location.
    #[serde(default = "default_db_file")]
    pub db_file: PathBuf,
    /// How often the snapshot is flushed when dirty.
    #[serde(
        default = "default_db_save_duration",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub db_save_duration: Duration,
    /// Daily limit for users without a stored record, in milliseconds.
    #[serde(default = "default_limit_time")]
    pub default_limit_time: i64,
    /// Upper bound on graceful shutdown, including the final flush.
    #[serde(
        default = "default_shutdown_timeout",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub shutdown_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            port: default_port(),
            db_file: default_db_file(),
            db_save_duration: default_db_save_duration(),
            default_limit_time: default_limit_time(),
            shutdown_timeout: default_shutdown_timeout(),
        }
    }
}

impl Config {
    /// Defaults, then `watchtime.toml` if present, then environment variables.
    pub fn load() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }

    pub fn figment() -> Figment {
        Self::layered(Path::new(CONFIG_FILE))
    }

    fn layered(config_file: &Path) -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_file))
            .merge(Env::raw().only(&[
                "LOG_LEVEL",
                "PORT",
                "DB_FILE",
                "DB_SAVE_DURATION",
                "DEFAULT_LIMIT_TIME",
                "SHUTDOWN_TIMEOUT",
            ]))
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            path: self.db_file.clone(),
            flush_interval: self.db_save_duration,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_db_file() -> PathBuf {
    PathBuf::from(DEFAULT_SNAPSHOT_PATH)
}

fn default_db_save_duration() -> Duration {
    DEFAULT_FLUSH_INTERVAL
}

fn default_limit_time() -> i64 {
    DEFAULT_LIMIT_TIME_MS
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(8)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DurationRepr {
    Seconds(u64),
    Text(String),
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let duration = match DurationRepr::deserialize(deserializer)? {
        DurationRepr::Seconds(secs) => Duration::from_secs(secs),
        DurationRepr::Text(text) => fundu::parse_duration(text.trim())
            .map_err(|e| serde::de::Error::custom(format!("invalid duration {text:?}: {e}")))?,
    };
    if duration.is_zero() {
        return Err(serde::de::Error::custom("duration must be greater than zero"));
    }
    Ok(duration)
}

fn serialize_duration<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&format!("{}ms", duration.as_millis()))
}
