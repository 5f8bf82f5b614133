use crate::scoring::{RiskTierThresholds, ThresholdError};
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

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
    pub scoring: ScoringConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let artifact_dir = env::var("CREDITPATH_ARTIFACT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("models"));

        let tier_thresholds = match env::var("CREDITPATH_TIER_THRESHOLDS") {
            Ok(raw) if !raw.trim().is_empty() => Some(parse_tier_thresholds(&raw)?),
            _ => None,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            scoring: ScoringConfig {
                artifact_dir,
                tier_thresholds,
            },
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

/// Where the trained artifacts live and any operator override of the risk tiers.
#[derive(Debug, Clone)]
pub struct ScoringConfig {
    pub artifact_dir: PathBuf,
    /// Takes precedence over thresholds pinned in the artifact manifest.
    pub tier_thresholds: Option<RiskTierThresholds>,
}

/// Parses `"very_low,low,moderate,high"` upper bounds, e.g. `"0.10,0.20,0.40,0.60"`.
pub fn parse_tier_thresholds(raw: &str) -> Result<RiskTierThresholds, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidTierThresholds {
        value: raw.to_string(),
        reason,
    };

    let bounds = raw
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<f64>()
                .map_err(|_| invalid(format!("'{}' is not a number", part.trim())))
        })
        .collect::<Result<Vec<_>, _>>()?;

    match bounds.as_slice() {
        [very_low, low, moderate, high] => {
            RiskTierThresholds::new(*very_low, *low, *moderate, *high)
                .map_err(|err: ThresholdError| invalid(err.to_string()))
        }
        other => Err(invalid(format!("expected 4 cut points, found {}", other.len()))),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidTierThresholds { value: String, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidTierThresholds { value, reason } => write!(
                f,
                "CREDITPATH_TIER_THRESHOLDS '{}' is invalid: {}",
                value, reason
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort | ConfigError::InvalidTierThresholds { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        env::remove_var("APP_ENV");
        env::remove_var("APP_HOST");
        env::remove_var("APP_PORT");
        env::remove_var("APP_LOG_LEVEL");
        env::remove_var("CREDITPATH_ARTIFACT_DIR");
        env::remove_var("CREDITPATH_TIER_THRESHOLDS");
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.scoring.artifact_dir, PathBuf::from("models"));
        assert!(config.scoring.tier_thresholds.is_none());
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 8000));
        reset_env();
    }

    #[test]
    fn reads_tier_threshold_override() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("CREDITPATH_TIER_THRESHOLDS", "0.15, 0.30, 0.45, 0.60");
        env::set_var("CREDITPATH_ARTIFACT_DIR", "/srv/artifacts/v3");
        let config = AppConfig::load().expect("config loads");
        let thresholds = config.scoring.tier_thresholds.expect("override parsed");
        assert_eq!(thresholds.very_low(), 0.15);
        assert_eq!(thresholds.high(), 0.60);
        assert_eq!(
            config.scoring.artifact_dir,
            PathBuf::from("/srv/artifacts/v3")
        );
        reset_env();
    }

    #[test]
    fn rejects_unordered_tier_thresholds() {
        let err = parse_tier_thresholds("0.2,0.1,0.4,0.6").expect_err("must be ascending");
        assert!(matches!(err, ConfigError::InvalidTierThresholds { .. }));
    }

    #[test]
    fn rejects_wrong_number_of_cut_points() {
        let err = parse_tier_thresholds("0.2,0.4").expect_err("needs four cut points");
        assert!(err.to_string().contains("expected 4 cut points"));
    }
}
