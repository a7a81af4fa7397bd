//! # gas-station
//!
//! Process bootstrap for the gas station backend.
//!
//! ## Components
//!
//! - **[`settings`]**: environment configuration
//! - **[`telemetry`]**: tracing subscriber
//! - **[`consumer`]**: message consumer started before the HTTP listener
//! - **[`app`]**: router with CORS, body limit, security headers, tracing
//!   and error translation
//! - **[`docs`]**: OpenAPI document served at `/docs-json` with Swagger UI
//!   at `/docs`
//! - **[`server`]** and **[`shutdown`]**: listener with graceful shutdown
//!
//! Outbound calls go through [`gas_station_retries`] and documents through
//! [`gas_station_store`], both reachable from [`AppState`].

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod app;
pub mod consumer;
pub mod docs;
pub mod error_filter;
pub mod health;
pub mod security;
pub mod server;
pub mod settings;
pub mod shutdown;
pub mod telemetry;

// Re-exports
pub use app::{build_router, AppState};
pub use consumer::{
    Consumer, ConsumerConfig, ConsumerError, ConsumerHandle, InMemorySource, LoggingHandler,
    Message, MessageHandler, MessageSource,
};
pub use docs::ApiDoc;
pub use error_filter::{translate_errors, ApiError};
pub use server::ServerError;
pub use settings::{Settings, SettingsError};
pub use telemetry::LogFormat;
