use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}', expected pretty or json", other)),
        }
    }
}

/// Process-wide settings loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub upload_dir: PathBuf,
    pub download_dir: PathBuf,
    /// Upload size cap in bytes.
    pub max_file_size: u64,
    pub log_level: String,
    pub log_format: LogFormat,
    pub allowed_origins: Vec<String>,
    /// Jobs created longer ago than this are swept.
    pub job_max_age_secs: u64,
    pub sweep_interval_secs: u64,
    /// `0` means unbounded.
    pub max_concurrent_jobs: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            upload_dir: PathBuf::from("./uploads"),
            download_dir: PathBuf::from("./downloads"),
            max_file_size: 10 * 1024 * 1024,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            allowed_origins: vec!["*".to_string()],
            job_max_age_secs: 24 * 60 * 60,
            sweep_interval_secs: 60 * 60,
            max_concurrent_jobs: 0,
        }
    }
}

impl Settings {
    /// Load settings from the process environment, reading `.env` first when
    /// present.
    ///
    /// | Env Var               | Default        |
    /// |-----------------------|----------------|
    /// | `HOST`                | `0.0.0.0`      |
    /// | `PORT`                | `8080`         |
    /// | `UPLOAD_DIR`          | `./uploads`    |
    /// | `DOWNLOAD_DIR`        | `./downloads`  |
    /// | `MAX_FILE_SIZE`       | `10485760`     |
    /// | `LOG_LEVEL`           | `info`         |
    /// | `LOG_FORMAT`          | `pretty`       |
    /// | `ALLOWED_ORIGINS`     | `*`            |
    /// | `JOB_MAX_AGE_SECS`    | `86400`        |
    /// | `SWEEP_INTERVAL_SECS` | `3600`         |
    /// | `MAX_CONCURRENT_JOBS` | `0`            |
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup. Missing or blank keys
    /// keep their default; values that fail to parse are an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let allowed_origins = match get("ALLOWED_ORIGINS") {
            Some(raw) => {
                let origins: Vec<String> = raw
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
                if origins.is_empty() {
                    defaults.allowed_origins
                } else {
                    origins
                }
            }
            None => defaults.allowed_origins,
        };

        let settings = Self {
            host: get("HOST").unwrap_or(defaults.host),
            port: parse_or("PORT", get("PORT"), defaults.port)?,
            upload_dir: get("UPLOAD_DIR").map(PathBuf::from).unwrap_or(defaults.upload_dir),
            download_dir: get("DOWNLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.download_dir),
            max_file_size: parse_or("MAX_FILE_SIZE", get("MAX_FILE_SIZE"), defaults.max_file_size)?,
            log_level: get("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_format: parse_or("LOG_FORMAT", get("LOG_FORMAT"), defaults.log_format)?,
            allowed_origins,
            job_max_age_secs: parse_or(
                "JOB_MAX_AGE_SECS",
                get("JOB_MAX_AGE_SECS"),
                defaults.job_max_age_secs,
            )?,
            sweep_interval_secs: parse_or(
                "SWEEP_INTERVAL_SECS",
                get("SWEEP_INTERVAL_SECS"),
                defaults.sweep_interval_secs,
            )?,
            max_concurrent_jobs: parse_or(
                "MAX_CONCURRENT_JOBS",
                get("MAX_CONCURRENT_JOBS"),
                defaults.max_concurrent_jobs,
            )?,
        };

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_file_size == 0 {
            return Err(invalid("MAX_FILE_SIZE", "0", "must be greater than zero"));
        }
        if self.sweep_interval_secs == 0 {
            return Err(invalid("SWEEP_INTERVAL_SECS", "0", "must be greater than zero"));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn job_max_age(&self) -> chrono::Duration {
        // chrono caps durations at i64::MAX milliseconds.
        let secs = i64::try_from(self.job_max_age_secs)
            .unwrap_or(i64::MAX)
            .min(i64::MAX / 1_000);
        chrono::Duration::seconds(secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// True when any origin may call the API.
    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.iter().any(|o| o == "*")
    }
}

fn invalid(key: &str, value: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value
            .parse()
            .map_err(|e: T::Err| invalid(key, &value, e.to_string())),
    }
}
