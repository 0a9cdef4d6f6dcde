use crate::ledger::compliance::{ComplianceScanner, DEFAULT_WINDOW_DAYS};
use crate::ledger::currency::{CurrencyError, RateTable};
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::num::NonZeroU32;

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
    pub ledger: LedgerConfig,
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
            telemetry: TelemetryConfig {
                log_level,
                ledger_debug: environment == AppEnvironment::Development,
            },
            ledger: LedgerConfig::from_env()?,
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
    /// Emit debug events from the ledger crate regardless of the base level.
    pub ledger_debug: bool,
}

/// Engine settings: base currency, static fallback rates and the compliance window.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub base_currency: String,
    pub compliance_window_days: NonZeroU32,
    pub fallback_rates: RateTable,
}

impl LedgerConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let base_currency = env::var("LEDGER_BASE_CURRENCY")
            .map(|value| value.trim().to_ascii_uppercase())
            .ok()
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| "USD".to_string());

        let compliance_window_days = match env::var("LEDGER_COMPLIANCE_WINDOW_DAYS") {
            Ok(raw) => match raw.trim().parse::<NonZeroU32>() {
                Ok(days) => days,
                Err(_) => return Err(ConfigError::InvalidComplianceWindow { value: raw }),
            },
            Err(_) => DEFAULT_WINDOW_DAYS,
        };

        let raw_rates = env::var("LEDGER_FALLBACK_RATES").unwrap_or_default();
        let fallback_rates = RateTable::parse(&base_currency, &raw_rates)
            .map_err(|source| ConfigError::InvalidRates { source })?;

        Ok(Self {
            base_currency,
            compliance_window_days,
            fallback_rates,
        })
    }

    pub fn scanner(&self) -> ComplianceScanner {
        ComplianceScanner::new(self.compliance_window_days)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidComplianceWindow { value: String },
    InvalidRates { source: CurrencyError },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidComplianceWindow { value } => write!(
                f,
                "LEDGER_COMPLIANCE_WINDOW_DAYS must be a positive whole number, got '{}'",
                value
            ),
            ConfigError::InvalidRates { source } => {
                write!(f, "LEDGER_FALLBACK_RATES is malformed: {}", source)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidComplianceWindow { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidRates { source } => Some(source),
        }
    }
}
