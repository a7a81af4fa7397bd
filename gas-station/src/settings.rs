//! Process configuration read from the environment.

use crate::consumer::ConsumerConfig;
use crate::telemetry::LogFormat;
use std::net::{IpAddr, SocketAddr};
use thiserror::Error;

/// Default JSON body limit (1 MB).
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// Configuration errors. Each names the offending variable.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    /// A required variable is not set.
    #[error("{0} is required")]
    Missing(&'static str),

    /// A variable is set to an unusable value.
    #[error("Invalid {name}: {reason}")]
    Invalid {
        /// Variable name.
        name: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

/// Application settings.
#[derive(Clone, Debug)]
pub struct Settings {
    /// Address the HTTP server listens on.
    pub bind_addr: SocketAddr,
    /// Message consumer configuration.
    pub consumer: ConsumerConfig,
    /// Maximum accepted request body size in bytes.
    pub body_limit: usize,
    /// Fallback log filter when `RUST_LOG` is unset.
    pub log_filter: String,
    /// Log output format.
    pub log_format: LogFormat,
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings through `lookup`, which returns a variable's value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let host = var("APP_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let host = host
            .trim()
            .parse::<IpAddr>()
            .map_err(|e| SettingsError::Invalid {
                name: "APP_HOST",
                reason: e.to_string(),
            })?;

        let port = match var("APP_PORT") {
            Some(port) => port.trim().parse::<u16>().map_err(|e| SettingsError::Invalid {
                name: "APP_PORT",
                reason: e.to_string(),
            })?,
            None => 3000,
        };

        let brokers: Vec<String> = var("KAFKA_BROKER")
            .ok_or(SettingsError::Missing("KAFKA_BROKER"))?
            .split(',')
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .map(String::from)
            .collect();
        if brokers.is_empty() {
            return Err(SettingsError::Invalid {
                name: "KAFKA_BROKER",
                reason: "no broker address given".to_string(),
            });
        }

        let consumer = ConsumerConfig {
            client_id: var("KAFKA_CLIENT_ID").unwrap_or_else(|| "gas-station".to_string()),
            brokers,
            group_id: var("KAFKA_GROUP_ID").unwrap_or_else(|| "gas-station".to_string()),
        };

        let body_limit = match var("HTTP_BODY_LIMIT_BYTES") {
            Some(limit) => limit
                .trim()
                .parse::<usize>()
                .map_err(|e| SettingsError::Invalid {
                    name: "HTTP_BODY_LIMIT_BYTES",
                    reason: e.to_string(),
                })?,
            None => DEFAULT_BODY_LIMIT,
        };

        let log_filter = var("GAS_STATION_LOG").unwrap_or_else(|| "info".to_string());
        let log_format = match var("GAS_STATION_LOG_FORMAT") {
            Some(format) => format
                .parse::<LogFormat>()
                .map_err(|reason| SettingsError::Invalid {
                    name: "GAS_STATION_LOG_FORMAT",
                    reason,
                })?,
            None => LogFormat::Text,
        };

        Ok(Self {
            bind_addr: SocketAddr::new(host, port),
            consumer,
            body_limit,
            log_filter,
            log_format,
        })
    }
}
