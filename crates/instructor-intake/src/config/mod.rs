use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::workflows::verification::persistence::{
    DEFAULT_SNAPSHOT_LIMIT_BYTES, DEFAULT_STORAGE_KEY,
};
use crate::workflows::verification::ui::DEFAULT_NOTIFICATION_CAP;
use crate::workflows::verification::validation::GatePolicy;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub engine: EngineConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            engine: EngineConfig::from_env()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Behavior of the application state engine.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub revalidation_delay: Duration,
    pub auto_save_enabled: bool,
    pub auto_save_interval: Duration,
    pub storage_key: String,
    pub storage_dir: Option<PathBuf>,
    pub storage_quota_bytes: Option<usize>,
    pub snapshot_limit_bytes: usize,
    pub notification_cap: usize,
    pub inline_preview_limit_bytes: u64,
    /// Largest request body accepted by the document upload route. Files arrive base64
    /// encoded, so this is about 4/3 of the largest accepted file.
    pub upload_limit_bytes: usize,
    pub step_gate: GatePolicy,
}

pub const DEFAULT_UPLOAD_LIMIT_BYTES: usize = 72 * 1024 * 1024;

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            revalidation_delay: Duration::from_millis(100),
            auto_save_enabled: true,
            auto_save_interval: Duration::from_secs(30),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            storage_dir: None,
            storage_quota_bytes: None,
            snapshot_limit_bytes: DEFAULT_SNAPSHOT_LIMIT_BYTES,
            notification_cap: DEFAULT_NOTIFICATION_CAP,
            inline_preview_limit_bytes: 1024 * 1024,
            upload_limit_bytes: DEFAULT_UPLOAD_LIMIT_BYTES,
            step_gate: GatePolicy::default(),
        }
    }
}

fn parse_var<T: std::str::FromStr>(
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue { name, value: raw }),
        _ => Ok(default),
    }
}

fn parse_flag(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(name) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "" => Ok(default),
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidValue { name, value: raw }),
        },
        Err(_) => Ok(default),
    }
}

impl EngineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let step_gate = match env::var("INTAKE_STEP_GATE") {
            Ok(raw) if !raw.trim().is_empty() => {
                GatePolicy::parse(&raw).ok_or(ConfigError::InvalidValue {
                    name: "INTAKE_STEP_GATE",
                    value: raw,
                })?
            }
            _ => defaults.step_gate,
        };

        let storage_quota_bytes = match env::var("INTAKE_STORAGE_QUOTA_BYTES") {
            Ok(raw) if !raw.trim().is_empty() => {
                Some(raw.trim().parse::<usize>().map_err(|_| ConfigError::InvalidValue {
                    name: "INTAKE_STORAGE_QUOTA_BYTES",
                    value: raw,
                })?)
            }
            _ => None,
        };

        Ok(Self {
            revalidation_delay: Duration::from_millis(parse_var(
                "INTAKE_REVALIDATION_DELAY_MS",
                100u64,
            )?),
            auto_save_enabled: parse_flag("INTAKE_AUTO_SAVE", defaults.auto_save_enabled)?,
            auto_save_interval: Duration::from_secs(parse_var(
                "INTAKE_AUTO_SAVE_INTERVAL_SECS",
                30u64,
            )?),
            storage_key: env::var("INTAKE_STORAGE_KEY")
                .ok()
                .filter(|value| !value.trim().is_empty())
                .unwrap_or(defaults.storage_key),
            storage_dir: env::var("INTAKE_STORAGE_DIR")
                .ok()
                .filter(|value| !value.trim().is_empty())
                .map(PathBuf::from),
            storage_quota_bytes,
            snapshot_limit_bytes: parse_var(
                "INTAKE_SNAPSHOT_LIMIT_BYTES",
                defaults.snapshot_limit_bytes,
            )?,
            notification_cap: parse_var("INTAKE_NOTIFICATION_CAP", defaults.notification_cap)?,
            inline_preview_limit_bytes: defaults.inline_preview_limit_bytes,
            upload_limit_bytes: parse_var(
                "INTAKE_UPLOAD_LIMIT_BYTES",
                defaults.upload_limit_bytes,
            )?,
            step_gate,
        })
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidValue { name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidValue { name, value } => {
                write!(f, "{name} has an invalid value '{value}'")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidValue { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
