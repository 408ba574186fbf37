//! SQLite-backed local store of normalized repeaters.
//!
//! Records are keyed by the upstream repeater id and merged on every
//! populate. Reads go through [`Predicate`] filters; radius search combines a
//! bounding-box prefilter in SQL with exact great-circle distances.

pub mod connection;
pub mod migrations;
pub mod predicate;
pub mod repeaters;

pub use connection::RepeaterDb;
pub use predicate::{Column, Predicate, Value};
pub use repeaters::PopulateStats;
