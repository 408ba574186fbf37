//! File-per-entry response cache.

use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use tokio::io::AsyncWriteExt;

use crate::Error;

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Temp files younger than this may belong to a write still in flight.
const TEMP_GRACE: Duration = Duration::from_secs(300);

/// Raw response bodies keyed by fingerprint, one `<key>.json` file each.
///
/// An entry's age is the age of its file. Writes go to a sibling temp file
/// that is renamed into place, so readers see either the previous body or
/// the new one in full.
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the entry for `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn temp_path_for(&self, key: &str) -> PathBuf {
        let nanos = SystemTime::now().duration_since(SystemTime::UNIX_EPOCH).map(|d| d.as_nanos()).unwrap_or_default();
        let seq = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        self.dir.join(format!(".{key}.{}-{nanos}-{seq}.tmp", std::process::id()))
    }

    /// Read the entry for `key` with its age, or `None` if there is none.
    pub async fn read(&self, key: &str) -> Result<Option<(Vec<u8>, Duration)>, Error> {
        let path = self.path_for(key);
        let meta = match tokio::fs::metadata(&path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::cache(path, e)),
        };
        let modified = meta.modified().map_err(|e| Error::cache(&path, e))?;
        let age = SystemTime::now().duration_since(modified).unwrap_or(Duration::ZERO);

        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some((bytes, age))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::cache(path, e)),
        }
    }

    /// Atomically replace the entry for `key` with `bytes`.
    pub async fn write(&self, key: &str, bytes: &[u8]) -> Result<(), Error> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| Error::cache(&self.dir, e))?;

        let temp = self.temp_path_for(key);
        let path = self.path_for(key);
        if let Err(e) = Self::write_temp(&temp, bytes).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(Error::cache(temp, e));
        }
        if let Err(e) = tokio::fs::rename(&temp, &path).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(Error::cache(path, e));
        }
        Ok(())
    }

    async fn write_temp(temp: &Path, bytes: &[u8]) -> std::io::Result<()> {
        let mut file = tokio::fs::File::create(temp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        file.sync_all().await
    }

    /// Return the cached body for `key` if it is at most `max_age` old,
    /// otherwise run `fetch` and store its result.
    ///
    /// Cache failures never fail the call: an unreadable entry counts as a
    /// miss and a failed write is logged.
    pub async fn get_or_fetch<F, Fut>(&self, key: &str, max_age: Duration, fetch: F) -> Result<Vec<u8>, Error>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<u8>, Error>>,
    {
        match self.read(key).await {
            Ok(Some((bytes, age))) if age <= max_age => {
                tracing::debug!(key, age_secs = age.as_secs(), "cache hit");
                return Ok(bytes);
            }
            Ok(Some((_, age))) => tracing::debug!(key, age_secs = age.as_secs(), "cache stale"),
            Ok(None) => tracing::debug!(key, "cache miss"),
            Err(e) => tracing::warn!(key, error = %e, "cache read failed, fetching"),
        }

        let bytes = fetch().await?;
        if let Err(e) = self.write(key, &bytes).await {
            tracing::warn!(key, error = %e, "failed to cache response");
        }
        Ok(bytes)
    }

    /// Remove entries older than `max_age` and temp files left behind by
    /// writes that never finished.
    ///
    /// Returns the number of files removed.
    pub async fn purge_stale(&self, max_age: Duration) -> Result<usize, Error> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(Error::cache(&self.dir, e)),
        };

        let now = SystemTime::now();
        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await.map_err(|e| Error::cache(&self.dir, e))? {
            let path = entry.path();
            let name = entry.file_name();
            let name = name.to_string_lossy();
            let is_temp = name.starts_with('.') && name.ends_with(".tmp");
            let is_entry = !name.starts_with('.') && name.ends_with(".json");
            if !is_temp && !is_entry {
                continue;
            }

            let Ok(meta) = entry.metadata().await else { continue };
            let age = meta.modified().ok().and_then(|m| now.duration_since(m).ok()).unwrap_or(Duration::ZERO);
            let limit = if is_temp { TEMP_GRACE } else { max_age };
            if age > limit {
                match tokio::fs::remove_file(&path).await {
                    Ok(()) => removed += 1,
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => return Err(Error::cache(path, e)),
                }
            }
        }

        tracing::info!(dir = %self.dir.display(), removed, "purged stale cache entries");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use tempfile::TempDir;

    fn store() -> (TempDir, CacheStore) {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path().join("cache"));
        (dir, store)
    }

    fn backdate(path: &Path, by: Duration) {
        let file = std::fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - by).unwrap();
    }

    fn temp_files(dir: &Path) -> Vec<PathBuf> {
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "tmp"))
            .collect()
    }

    #[tokio::test]
    async fn test_read_missing() {
        let (_dir, store) = store();
        assert!(store.read("abc").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let (_dir, store) = store();
        store.write("abc", b"{\"count\":0,\"results\":[]}").await.unwrap();

        let (bytes, age) = store.read("abc").await.unwrap().unwrap();
        assert_eq!(bytes, b"{\"count\":0,\"results\":[]}");
        assert!(age < Duration::from_secs(60));
        assert!(temp_files(store.dir()).is_empty());
    }

    #[tokio::test]
    async fn test_write_replaces_existing() {
        let (_dir, store) = store();
        store.write("abc", b"old").await.unwrap();
        store.write("abc", b"new").await.unwrap();
        assert_eq!(store.read("abc").await.unwrap().unwrap().0, b"new");
    }

    #[tokio::test]
    async fn test_leftover_temp_file_does_not_corrupt_entry() {
        let (_dir, store) = store();
        store.write("abc", b"complete body").await.unwrap();

        // A crash between create and rename leaves a partial temp file behind.
        let orphan = store.temp_path_for("abc");
        std::fs::write(&orphan, b"partial").unwrap();

        assert_eq!(store.read("abc").await.unwrap().unwrap().0, b"complete body");

        store.write("abc", b"next body").await.unwrap();
        assert_eq!(store.read("abc").await.unwrap().unwrap().0, b"next body");
        assert_eq!(std::fs::read(&orphan).unwrap(), b"partial");
    }

    #[tokio::test]
    async fn test_get_or_fetch_caches() {
        let (_dir, store) = store();
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let fetch = move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(b"body".to_vec())
        };

        let first = store.get_or_fetch("k", Duration::from_secs(3600), fetch).await.unwrap();
        let second = store.get_or_fetch("k", Duration::from_secs(3600), fetch).await.unwrap();
        assert_eq!(first, b"body");
        assert_eq!(second, b"body");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_get_or_fetch_refetches_stale() {
        let (_dir, store) = store();
        store.write("k", b"old").await.unwrap();
        backdate(&store.path_for("k"), Duration::from_secs(120));

        let body = store.get_or_fetch("k", Duration::from_secs(60), || async { Ok(b"fresh".to_vec()) }).await.unwrap();
        assert_eq!(body, b"fresh");
        assert_eq!(store.read("k").await.unwrap().unwrap().0, b"fresh");
    }

    #[tokio::test]
    async fn test_get_or_fetch_propagates_fetch_error() {
        let (_dir, store) = store();
        let err = store
            .get_or_fetch("k", Duration::from_secs(60), || async { Err(Error::InvalidQuery("boom".into())) })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidQuery(_)));
        assert!(store.read("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_or_fetch_unreadable_entry_is_miss() {
        let (_dir, store) = store();
        std::fs::create_dir_all(store.path_for("k")).unwrap();
        assert!(store.read("k").await.is_err());

        let body = store.get_or_fetch("k", Duration::from_secs(60), || async { Ok(b"fetched".to_vec()) }).await.unwrap();
        assert_eq!(body, b"fetched");
    }

    #[tokio::test]
    async fn test_get_or_fetch_survives_unwritable_dir() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"").unwrap();
        let store = CacheStore::new(&blocker);

        let body = store.get_or_fetch("k", Duration::from_secs(60), || async { Ok(b"body".to_vec()) }).await.unwrap();
        assert_eq!(body, b"body");
    }

    #[tokio::test]
    async fn test_purge_stale() {
        let (_dir, store) = store();
        store.write("a", b"1").await.unwrap();
        store.write("b", b"2").await.unwrap();
        let orphan = store.temp_path_for("c");
        std::fs::write(&orphan, b"partial").unwrap();

        assert_eq!(store.purge_stale(Duration::from_secs(3600)).await.unwrap(), 0);
        assert!(store.read("a").await.unwrap().is_some());

        backdate(&orphan, TEMP_GRACE + Duration::from_secs(60));
        assert_eq!(store.purge_stale(Duration::from_secs(3600)).await.unwrap(), 1);
        assert!(!orphan.exists());

        backdate(&store.path_for("a"), Duration::from_secs(7200));
        assert_eq!(store.purge_stale(Duration::from_secs(3600)).await.unwrap(), 1);
        assert!(store.read("b").await.unwrap().is_some());
        assert!(store.read("a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_purge_keeps_in_flight_temp_file() {
        let (_dir, store) = store();
        store.write("a", b"1").await.unwrap();
        let in_flight = store.temp_path_for("a");
        std::fs::write(&in_flight, b"partial").unwrap();
        backdate(&store.path_for("a"), Duration::from_secs(10));

        assert_eq!(store.purge_stale(Duration::from_secs(1)).await.unwrap(), 1);
        assert!(in_flight.exists());
    }

    #[tokio::test]
    async fn test_purge_missing_dir() {
        let (_dir, store) = store();
        assert_eq!(store.purge_stale(Duration::ZERO).await.unwrap(), 0);
    }
}
