//! Configuration module
//!
//! [`AppraiserConfig`] is loaded once at process start (environment variables, with an
//! optional `.env` file) and is immutable afterwards. Components receive it through
//! their constructors, usually as `Arc<AppraiserConfig>`.

use std::env;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use std::time::Duration;

// Common constants
const MAX_CONNECTIONS: u32 = 5;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const LOCATION_TIMEOUT_SECS: u64 = 15;
const CLIENT_STEP_STATUS: &str = "Step4";

/// Output format of the tracing subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(anyhow::anyhow!("Invalid log format: {}", s)),
        }
    }
}

impl Display for LogFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            LogFormat::Text => write!(f, "text"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppraiserConfig {
    /// Only commands that open the database need it; dry runs work without one
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    /// Upper bound for one location acquisition (cached lookup plus fresh request)
    pub location_timeout_secs: u64,
    /// Workflow stage marker selecting clients ready for appraisal
    pub client_step_status: String,
    pub environment: String,
    pub log_format: LogFormat,
}

impl AppraiserConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").filter(|s| !s.trim().is_empty());

        let environment = lookup("ENVIRONMENT")
            .or_else(|| lookup("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let log_format = match lookup("LOG_FORMAT") {
            Some(raw) => raw.parse()?,
            None => LogFormat::default(),
        };

        let config = AppraiserConfig {
            database_url,
            db_max_connections: lookup("DB_MAX_CONNECTIONS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: lookup("DB_TIMEOUT_SECONDS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            location_timeout_secs: lookup("LOCATION_TIMEOUT_SECS")
                .map(|s| {
                    s.parse().map_err(|_| {
                        anyhow::anyhow!("LOCATION_TIMEOUT_SECS must be a valid number")
                    })
                })
                .transpose()?
                .unwrap_or(LOCATION_TIMEOUT_SECS),
            client_step_status: lookup("CLIENT_STEP_STATUS")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| CLIENT_STEP_STATUS.to_string()),
            environment,
            log_format,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if let Some(url) = &self.database_url {
            if !(url.starts_with("postgresql://") || url.starts_with("postgres://")) {
                return Err(anyhow::anyhow!(
                    "DATABASE_URL must be a valid PostgreSQL connection string"
                ));
            }
        }

        if self.db_max_connections == 0 {
            return Err(anyhow::anyhow!("DB_MAX_CONNECTIONS must be greater than 0"));
        }

        if self.location_timeout_secs == 0 {
            return Err(anyhow::anyhow!(
                "LOCATION_TIMEOUT_SECS must be greater than 0"
            ));
        }

        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn require_database_url(&self) -> Result<&str, anyhow::Error> {
        self.database_url
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set"))
    }

    pub fn location_timeout(&self) -> Duration {
        Duration::from_secs(self.location_timeout_secs)
    }

    pub fn db_timeout(&self) -> Duration {
        Duration::from_secs(self.db_timeout_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_database_url_is_set() {
        let config = AppraiserConfig::from_lookup(lookup_from(&[(
            "DATABASE_URL",
            "postgresql://appraiser@localhost/appraisal",
        )]))
        .unwrap();

        assert_eq!(config.db_max_connections, 5);
        assert_eq!(config.location_timeout(), Duration::from_secs(15));
        assert_eq!(config.client_step_status, "Step4");
        assert_eq!(config.log_format, LogFormat::Text);
        assert!(!config.is_production());
    }

    #[test]
    fn missing_database_url_only_fails_when_required() {
        let config = AppraiserConfig::from_lookup(lookup_from(&[])).unwrap();
        assert!(config.database_url.is_none());

        let err = config.require_database_url().unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL must be set"));
    }

    #[test]
    fn configured_database_url_is_returned() {
        let config = AppraiserConfig::from_lookup(lookup_from(&[(
            "DATABASE_URL",
            "postgres://localhost/appraisal",
        )]))
        .unwrap();
        assert_eq!(
            config.require_database_url().unwrap(),
            "postgres://localhost/appraisal"
        );
    }

    #[test]
    fn non_postgres_url_is_rejected() {
        let err = AppraiserConfig::from_lookup(lookup_from(&[(
            "DATABASE_URL",
            "mysql://localhost/appraisal",
        )]))
        .unwrap_err();
        assert!(err.to_string().contains("PostgreSQL"));
    }

    #[test]
    fn zero_location_timeout_is_rejected() {
        let err = AppraiserConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/appraisal"),
            ("LOCATION_TIMEOUT_SECS", "0"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("LOCATION_TIMEOUT_SECS"));
    }

    #[test]
    fn overrides_are_read() {
        let config = AppraiserConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/appraisal"),
            ("LOCATION_TIMEOUT_SECS", "4"),
            ("CLIENT_STEP_STATUS", "Step5"),
            ("LOG_FORMAT", "json"),
            ("ENVIRONMENT", "Production"),
        ]))
        .unwrap();

        assert_eq!(config.location_timeout_secs, 4);
        assert_eq!(config.client_step_status, "Step5");
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(config.is_production());
    }
}
