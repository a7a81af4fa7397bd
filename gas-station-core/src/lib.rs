//! # gas-station-core
//!
//! Core error types for the gas-station backend.
//!
//! Every crate in the workspace funnels its terminal failures into
//! [`HttpError`], which the server renders as an [`ErrorBody`]:
//!
//! ```rust
//! use gas_station_core::{ErrorBody, HttpError};
//!
//! let error = HttpError::not_found("Station not found");
//! let body = ErrorBody::new(&error, "/stations/42");
//!
//! assert_eq!(body.status, 404);
//! assert_eq!(body.path, "/stations/42");
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod errors;

// Re-exports for convenience
pub use errors::{ErrorBody, HttpError, Result, INTERNAL_SERVER_ERROR};
