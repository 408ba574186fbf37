//! Content-addressed cache key generation.

use sha2::{Digest, Sha256};
use url::form_urlencoded;

use crate::query::Endpoint;

/// Compute the cache key for a request to `endpoint` with `params`.
///
/// Parameters are sorted before hashing, so the key depends only on the
/// request shape and not on the order the caller produced them in. Pairs are
/// form-encoded, so separators inside a value cannot alias another request.
pub fn fingerprint<K: AsRef<str>, V: AsRef<str>>(endpoint: Endpoint, params: &[(K, V)]) -> String {
    let mut pairs: Vec<(&str, &str)> = params.iter().map(|(k, v)| (k.as_ref(), v.as_ref())).collect();
    pairs.sort_unstable();

    let query = form_urlencoded::Serializer::new(String::new()).extend_pairs(pairs).finish();

    let mut hasher = Sha256::new();
    hasher.update(endpoint.path().as_bytes());
    hasher.update(b"\n");
    hasher.update(query.as_bytes());
    hex::encode(hasher.finalize())
}
