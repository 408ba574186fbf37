//! Content-addressed, TTL-bounded cache of raw upstream responses.
//!
//! Entries live as individual files under the cache directory, named by the
//! SHA-256 fingerprint of the request shape. The directory is safe to share
//! between processes without locks.

pub mod hash;
pub mod store;

pub use hash::fingerprint;
pub use store::CacheStore;
