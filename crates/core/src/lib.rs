//! Core types and shared functionality for rptrbook.
//!
//! This crate provides:
//! - Structured export queries and endpoint routing
//! - The repeater record and band definitions
//! - A file cache of raw upstream responses
//! - The SQLite-backed local store with predicate queries
//! - Great-circle distance and radius search
//! - Unified error types and configuration

pub mod cache;
pub mod config;
pub mod error;
pub mod geo;
pub mod model;
pub mod query;
pub mod store;

pub use cache::{CacheStore, fingerprint};
pub use config::{AppConfig, ConfigError, InvalidRecordPolicy, PartialFailurePolicy};
pub use error::{Error, ValidationError};
pub use geo::{BoundingBox, DistanceUnit, LatLon, Radius};
pub use model::{Band, Repeater, Status, Use};
pub use query::{Country, Emergency, Endpoint, EndpointSet, ExportQuery, Mode, ServiceType};
pub use store::{Column, PopulateStats, Predicate, RepeaterDb, Value};
