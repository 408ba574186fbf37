//! Download orchestration: route, cache, fetch, merge, normalize.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use url::Url;

use rptrbook_core::query::{endpoint_params, route};
use rptrbook_core::{
    AppConfig, CacheStore, Endpoint, Error, ExportQuery, InvalidRecordPolicy, PartialFailurePolicy, PopulateStats,
    Repeater, RepeaterDb, ValidationError, fingerprint,
};

use crate::api::{ExportPage, RawRecord, Transport, build_url, parse_envelope};
use crate::normalize::{normalize, record_id};

/// Receives download progress.
pub trait Progress: Send + Sync {
    /// An endpoint returned `received` records out of roughly `expected`.
    fn on_endpoint(&self, endpoint: Endpoint, received: u64, expected: u64);

    /// All endpoints finished and `total` records survived merging and normalization.
    fn on_complete(&self, total: u64);
}

/// Discards progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl Progress for NoopProgress {
    fn on_endpoint(&self, _endpoint: Endpoint, _received: u64, _expected: u64) {}

    fn on_complete(&self, _total: u64) {}
}

/// Reports progress as `info` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgress;

impl Progress for LogProgress {
    fn on_endpoint(&self, endpoint: Endpoint, received: u64, expected: u64) {
        tracing::info!(%endpoint, received, expected, "endpoint downloaded");
    }

    fn on_complete(&self, total: u64) {
        tracing::info!(total, "download complete");
    }
}

/// Fetches repeaters for a query through the response cache.
#[derive(Clone)]
pub struct Fetcher {
    transport: Arc<dyn Transport>,
    cache: CacheStore,
    base_url: Url,
    max_cache_age: Duration,
    expected_count: u64,
    partial_failure: PartialFailurePolicy,
    invalid_records: InvalidRecordPolicy,
    progress: Arc<dyn Progress>,
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher")
            .field("cache", &self.cache)
            .field("base_url", &self.base_url.as_str())
            .field("max_cache_age", &self.max_cache_age)
            .field("partial_failure", &self.partial_failure)
            .field("invalid_records", &self.invalid_records)
            .finish_non_exhaustive()
    }
}

impl Fetcher {
    /// Create a fetcher using `config` for base URL, cache age and policies.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidQuery` if the configured base URL does not parse.
    pub fn new(transport: Arc<dyn Transport>, cache: CacheStore, config: &AppConfig) -> Result<Self, Error> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| Error::InvalidQuery(format!("invalid base URL {:?}: {e}", config.base_url)))?;

        Ok(Self {
            transport,
            cache,
            base_url,
            max_cache_age: config.max_cache_age(),
            expected_count: config.expected_count,
            partial_failure: config.partial_failure,
            invalid_records: config.invalid_records,
            progress: Arc::new(NoopProgress),
        })
    }

    pub fn with_progress(mut self, progress: Arc<dyn Progress>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_partial_failure(mut self, policy: PartialFailurePolicy) -> Self {
        self.partial_failure = policy;
        self
    }

    pub fn with_invalid_records(mut self, policy: InvalidRecordPolicy) -> Self {
        self.invalid_records = policy;
        self
    }

    /// Download every repeater matching `query`.
    ///
    /// Endpoints picked by the router are fetched concurrently. Records are
    /// merged by id, first occurrence winning, North America before rest of
    /// world.
    pub async fn download(&self, query: &ExportQuery) -> Result<Vec<Repeater>, Error> {
        let endpoints = route(query);
        tracing::debug!(endpoints = endpoints.len(), "routed query");

        let north_america =
            endpoints.contains(Endpoint::NorthAmerica).then(|| self.fetch(query, Endpoint::NorthAmerica));
        let rest_of_world =
            endpoints.contains(Endpoint::RestOfWorld).then(|| self.fetch(query, Endpoint::RestOfWorld));
        let (north_america, rest_of_world) = tokio::join!(maybe(north_america), maybe(rest_of_world));

        let outcomes = [(Endpoint::NorthAmerica, north_america), (Endpoint::RestOfWorld, rest_of_world)]
            .into_iter()
            .filter_map(|(endpoint, outcome)| outcome.map(|o| (endpoint, o)));

        let mut pages = Vec::with_capacity(2);
        let mut first_error = None;
        for (endpoint, outcome) in outcomes {
            match outcome {
                Ok(page) => pages.push((endpoint, page)),
                Err(e) if self.partial_failure == PartialFailurePolicy::FailFast => return Err(e),
                Err(e) => {
                    tracing::warn!(%endpoint, error = %e, "endpoint failed, continuing with the rest");
                    first_error.get_or_insert(e);
                }
            }
        }
        if pages.is_empty()
            && let Some(e) = first_error
        {
            return Err(e);
        }

        let records = self.merge(pages)?;
        self.progress.on_complete(records.len() as u64);
        Ok(records)
    }

    /// Download `query` and merge the result into `store`.
    pub async fn sync(&self, query: &ExportQuery, store: &RepeaterDb) -> Result<PopulateStats, Error> {
        let records = self.download(query).await?;
        store.populate(records).await
    }

    async fn fetch(&self, query: &ExportQuery, endpoint: Endpoint) -> Result<ExportPage, Error> {
        let params = endpoint_params(query, endpoint);
        let key = fingerprint(endpoint, &params);
        let url = build_url(&self.base_url, endpoint, &params)?;

        let body = self
            .cache
            .get_or_fetch(&key, self.max_cache_age, move || async move {
                let body = self.transport.get(&url).await.map_err(|e| e.into_api(endpoint))?;
                // Only well-formed exports are cached.
                parse_envelope(endpoint, &body)?;
                Ok(body.to_vec())
            })
            .await?;

        let page = parse_envelope(endpoint, &body)?;
        if page.is_truncated() {
            tracing::warn!(%endpoint, count = page.count, "export reached the upstream result cap");
        }
        if page.count_mismatch() {
            tracing::warn!(
                %endpoint,
                count = page.count,
                received = page.results.len(),
                "export count does not match results"
            );
        }

        self.progress.on_endpoint(endpoint, page.results.len() as u64, self.expected_count);
        Ok(page)
    }

    fn merge(&self, pages: Vec<(Endpoint, ExportPage)>) -> Result<Vec<Repeater>, Error> {
        let mut seen = HashSet::new();
        let mut records = Vec::new();
        let mut skipped = 0u64;

        for (endpoint, page) in pages {
            for value in page.results {
                match self.convert(endpoint, value, &mut seen) {
                    Ok(Some(record)) => records.push(record),
                    Ok(None) => {}
                    Err(e) if self.invalid_records == InvalidRecordPolicy::Abort => return Err(e.into()),
                    Err(e) => {
                        tracing::warn!(%endpoint, error = %e, "skipping invalid record");
                        skipped += 1;
                    }
                }
            }
        }

        if skipped > 0 {
            tracing::warn!(skipped, kept = records.len(), "dropped invalid records");
        }
        Ok(records)
    }

    /// Decode and normalize one result, or `None` if its id was already seen.
    fn convert(
        &self, endpoint: Endpoint, value: Value, seen: &mut HashSet<i64>,
    ) -> Result<Option<Repeater>, ValidationError> {
        let raw = RawRecord::from_value(endpoint, value)?;
        let id = record_id(raw.common())?;
        if !seen.insert(id) {
            tracing::debug!(%endpoint, id, "duplicate record");
            return Ok(None);
        }
        normalize(&raw).map(Some)
    }
}

async fn maybe<F: Future>(fut: Option<F>) -> Option<F::Output> {
    match fut {
        Some(fut) => Some(fut.await),
        None => None,
    }
}
