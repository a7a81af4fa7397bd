//! # gas-station-store
//!
//! Generic document repository.
//!
//! Documents are JSON objects keyed by `_id`. The [`Repository`] trait
//! covers the usual operations of a document store (find, update, delete,
//! count, aggregate) and [`InMemoryRepository`] implements it over a
//! `tokio` lock.
//!
//! ## Example
//!
//! ```ignore
//! use gas_station_store::prelude::*;
//! use serde_json::json;
//!
//! let stations = InMemoryRepository::new("stations");
//! stations.create(json!({"name": "Central", "price": 5.49})).await?;
//!
//! let cheap = stations
//!     .find(
//!         &json!({"price": {"$lt": 6}}),
//!         FindOptions::new().sort("price", SortOrder::Ascending).limit(10),
//!     )
//!     .await?;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod aggregate;
pub mod document;
pub mod error;
pub mod filter;
pub mod memory;
pub mod query;
pub mod repository;

// Re-exports
pub use aggregate::run_pipeline;
pub use document::{Document, ID_KEY, VERSION_KEY};
pub use error::StoreError;
pub use filter::matches;
pub use memory::InMemoryRepository;
pub use query::{FindOneOptions, FindOptions, SortOrder, UpdateOptions, UpdateResult};
pub use repository::Repository;

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        Document, FindOneOptions, FindOptions, InMemoryRepository, Repository, SortOrder,
        StoreError, UpdateOptions, UpdateResult,
    };
}
