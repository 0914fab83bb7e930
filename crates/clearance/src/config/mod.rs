use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

const DEFAULT_CLEARANCE_PREFIX: &str = "NYSC";
const DEFAULT_PHOTO_MAX_BYTES: u64 = 5 * 1024 * 1024;
const DEFAULT_FORM_MAX_BYTES: u64 = 10 * 1024 * 1024;

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
    pub workflow: WorkflowConfig,
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
            workflow: WorkflowConfig::from_env()?,
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

/// Knobs for clearance identifiers and upload intake limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowConfig {
    pub clearance_prefix: String,
    pub photo_max_bytes: u64,
    pub form_max_bytes: u64,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            clearance_prefix: DEFAULT_CLEARANCE_PREFIX.to_string(),
            photo_max_bytes: DEFAULT_PHOTO_MAX_BYTES,
            form_max_bytes: DEFAULT_FORM_MAX_BYTES,
        }
    }
}

impl WorkflowConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let clearance_prefix = env::var("CLEARANCE_ID_PREFIX")
            .unwrap_or_else(|_| DEFAULT_CLEARANCE_PREFIX.to_string())
            .trim()
            .to_ascii_uppercase();
        if clearance_prefix.is_empty() {
            return Err(ConfigError::EmptyClearancePrefix);
        }

        Ok(Self {
            clearance_prefix,
            photo_max_bytes: byte_limit("PHOTO_MAX_BYTES", DEFAULT_PHOTO_MAX_BYTES)?,
            form_max_bytes: byte_limit("FORM_MAX_BYTES", DEFAULT_FORM_MAX_BYTES)?,
        })
    }
}

fn byte_limit(variable: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env::var(variable) {
        Ok(raw) => match raw.trim().parse::<u64>() {
            Ok(limit) if limit > 0 => Ok(limit),
            _ => Err(ConfigError::InvalidLimit { variable }),
        },
        Err(_) => Ok(default),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidLimit { variable: &'static str },
    EmptyClearancePrefix,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidLimit { variable } => {
                write!(f, "{variable} must be a positive byte count")
            }
            ConfigError::EmptyClearancePrefix => {
                write!(f, "CLEARANCE_ID_PREFIX must not be empty")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidLimit { .. }
            | ConfigError::EmptyClearancePrefix => None,
        }
    }
}
