//! Client code for rptrbook.
//!
//! This crate talks to the RepeaterBook export API: the HTTP transport,
//! response envelope parsing, raw record normalization, and the fetcher that
//! ties routing, caching and merging together.

#![recursion_limit = "256"]

pub mod api;
pub mod fetcher;
pub mod normalize;

pub use api::{HttpTransport, RawRecord, Transport, TransportError};
pub use fetcher::{Fetcher, LogProgress, NoopProgress, Progress};
pub use normalize::{normalize, parse_bool};
