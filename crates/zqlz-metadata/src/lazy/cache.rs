//! Lazy loading cache for child metadata objects
//!
//! Each cache instance holds one ordered child collection of one parent
//! (the partitions of a table, its indexes, ...). The collection is fetched
//! on first access, shared by every later reader, and dropped on explicit
//! invalidation.

use futures::StreamExt;
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use zqlz_core::{Connection, MonitorTask, ProgressMonitor};

use crate::error::{MetadataError, MetadataResult};
use crate::fetch::{LookupParent, LookupStatement, MetadataObject, ObjectFetcher};

/// Ordered child map, in fetch order
pub type ObjectMap<T> = IndexMap<String, Arc<T>>;

/// Load state of a cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CacheState {
    /// Nothing loaded; the next read fetches
    Unloaded = 0,
    /// A fetch is in flight; readers wait for it
    Loading = 1,
    /// The collection is published and immutable until invalidation
    Loaded = 2,
}

impl CacheState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => CacheState::Loading,
            2 => CacheState::Loaded,
            _ => CacheState::Unloaded,
        }
    }
}

/// Counters for monitoring a cache
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LookupCacheStats {
    /// Reads answered from the published collection
    pub hits: u64,
    /// Reads that found nothing published and ran the full fetch
    pub misses: u64,
    /// Fetches started, full or single-object
    pub fetches: u64,
    /// Fetches that ended in an error or cancellation
    pub failed_fetches: u64,
}

/// Single-flight, read-mostly cache of one parent's child objects.
///
/// Readers of a loaded cache only touch the published map. Loading and
/// invalidation are serialised by a per-instance async lock, so concurrent
/// first readers wait for one fetch instead of starting their own, and
/// [`clear_cache`](Self::clear_cache) never interleaves with a fetch.
///
/// Callers queued behind a full fetch share its outcome: if it fails they
/// all get a copy of its error instead of each running the query again.
/// Only a call made after the failure starts a new fetch.
pub struct ObjectLookupCache<F: ObjectFetcher> {
    fetcher: F,
    state: AtomicU8,
    objects: RwLock<Option<Arc<ObjectMap<F::Object>>>>,
    fetch_lock: tokio::sync::Mutex<()>,
    /// Number of finished full fetches; bumped under the fetch lock
    completed_loads: AtomicU64,
    /// Error of the last full fetch, tagged with its `completed_loads` value
    last_failure: RwLock<Option<(u64, MetadataError)>>,
    hits: AtomicU64,
    misses: AtomicU64,
    fetches: AtomicU64,
    failed_fetches: AtomicU64,
}

/// Puts the state back to `Unloaded` unless disarmed, so a failed or
/// dropped fetch never leaves the cache stuck in `Loading`.
struct LoadingGuard<'a> {
    state: &'a AtomicU8,
    armed: bool,
}

impl<'a> LoadingGuard<'a> {
    fn enter(state: &'a AtomicU8) -> Self {
        state.store(CacheState::Loading as u8, Ordering::Release);
        Self { state, armed: true }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.state
                .store(CacheState::Unloaded as u8, Ordering::Release);
        }
    }
}

impl<F: ObjectFetcher> ObjectLookupCache<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            state: AtomicU8::new(CacheState::Unloaded as u8),
            objects: RwLock::new(None),
            fetch_lock: tokio::sync::Mutex::new(()),
            completed_loads: AtomicU64::new(0),
            last_failure: RwLock::new(None),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            fetches: AtomicU64::new(0),
            failed_fetches: AtomicU64::new(0),
        }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn state(&self) -> CacheState {
        CacheState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_loaded(&self) -> bool {
        self.state() == CacheState::Loaded
    }

    pub fn stats(&self) -> LookupCacheStats {
        LookupCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            fetches: self.fetches.load(Ordering::Relaxed),
            failed_fetches: self.failed_fetches.load(Ordering::Relaxed),
        }
    }

    /// Snapshot of the loaded collection without any I/O; `None` unless loaded
    pub fn cached_objects(&self) -> Option<Vec<Arc<F::Object>>> {
        self.published()
            .map(|objects| objects.values().cloned().collect())
    }

    /// All children of `parent`, in fetch order.
    ///
    /// Fetches on first use. A monitor that is already cancelled yields an
    /// empty list and leaves the cache untouched.
    pub async fn get_objects(
        &self,
        conn: &dyn Connection,
        monitor: &dyn ProgressMonitor,
        parent: &Arc<F::Parent>,
    ) -> MetadataResult<Vec<Arc<F::Object>>> {
        let objects = self.load(conn, monitor, parent).await?;
        Ok(objects
            .map(|objects| objects.values().cloned().collect())
            .unwrap_or_default())
    }

    /// The child named exactly `name`, loading the collection first if needed
    pub async fn get_object(
        &self,
        conn: &dyn Connection,
        monitor: &dyn ProgressMonitor,
        parent: &Arc<F::Parent>,
        name: &str,
    ) -> MetadataResult<Option<Arc<F::Object>>> {
        let objects = self.load(conn, monitor, parent).await?;
        Ok(objects.and_then(|objects| objects.get(name).cloned()))
    }

    /// Re-read a single child with the name-filtered statement.
    ///
    /// On a loaded cache the entry is replaced in place (or removed when the
    /// object no longer exists; appended when it is new) and a new snapshot is
    /// published. Snapshots handed out earlier are unaffected. On an unloaded
    /// cache this loads the whole collection instead. A failed refresh keeps
    /// the previous collection. An empty name matches nothing and runs no
    /// query.
    pub async fn refresh_object(
        &self,
        conn: &dyn Connection,
        monitor: &dyn ProgressMonitor,
        parent: &Arc<F::Parent>,
        name: &str,
    ) -> MetadataResult<Option<Arc<F::Object>>> {
        if name.is_empty() || monitor.is_cancelled() {
            return Ok(None);
        }

        let guard = self.fetch_lock.lock().await;
        let Some(current) = self.published() else {
            drop(guard);
            return self.get_object(conn, monitor, parent, name).await;
        };

        let mut fetched = match self.fetch(conn, monitor, parent, Some(name)).await {
            Ok(fetched) => fetched,
            Err(err) => {
                self.failed_fetches.fetch_add(1, Ordering::Relaxed);
                return Err(err);
            }
        };

        let mut next: ObjectMap<F::Object> = (*current).clone();
        let refreshed = fetched.shift_remove(name);
        match &refreshed {
            Some(object) => {
                next.insert(name.to_string(), Arc::clone(object));
            }
            None => {
                next.shift_remove(name);
            }
        }
        tracing::debug!(
            kind = self.fetcher.kind(),
            parent = %parent.qualified_name(),
            object = %name,
            found = refreshed.is_some(),
            "refreshed cached object"
        );

        *self.objects.write() = Some(Arc::new(next));
        Ok(refreshed)
    }

    /// Drop the collection; the next read fetches again.
    ///
    /// Waits for an in-flight fetch to finish first, so a result fetched
    /// before the invalidation is never published after it.
    pub async fn clear_cache(&self) {
        let _guard = self.fetch_lock.lock().await;
        self.state
            .store(CacheState::Unloaded as u8, Ordering::Release);
        *self.last_failure.write() = None;
        let previous = self.objects.write().take();
        tracing::debug!(
            kind = self.fetcher.kind(),
            dropped = previous.map(|objects| objects.len()).unwrap_or(0),
            "cleared object cache"
        );
    }

    /// Error of a full fetch that finished after `seen` was read
    fn failure_since(&self, seen: u64) -> Option<MetadataError> {
        match &*self.last_failure.read() {
            Some((completed, err)) if *completed > seen => Some(err.clone()),
            _ => None,
        }
    }

    fn published(&self) -> Option<Arc<ObjectMap<F::Object>>> {
        if self.state() != CacheState::Loaded {
            return None;
        }
        self.objects.read().clone()
    }

    /// Published map, fetching it first when needed. `None` means the
    /// monitor was cancelled before a fetch started.
    async fn load(
        &self,
        conn: &dyn Connection,
        monitor: &dyn ProgressMonitor,
        parent: &Arc<F::Parent>,
    ) -> MetadataResult<Option<Arc<ObjectMap<F::Object>>>> {
        if let Some(objects) = self.published() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Some(objects));
        }

        if monitor.is_cancelled() {
            tracing::debug!(kind = self.fetcher.kind(), "load skipped, monitor cancelled");
            return Ok(None);
        }

        let seen = self.completed_loads.load(Ordering::Acquire);
        let _guard = self.fetch_lock.lock().await;

        // Another task may have finished the fetch while we waited.
        if let Some(objects) = self.published() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Some(objects));
        }
        if let Some(err) = self.failure_since(seen) {
            tracing::debug!(
                kind = self.fetcher.kind(),
                error = %err,
                "sharing error of the fetch this call waited on"
            );
            return Err(err);
        }
        if monitor.is_cancelled() {
            return Ok(None);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let loading = LoadingGuard::enter(&self.state);
        let result = self.fetch(conn, monitor, parent, None).await;
        let completed = self.completed_loads.load(Ordering::Relaxed) + 1;
        match result {
            Ok(objects) => {
                let objects = Arc::new(objects);
                *self.objects.write() = Some(Arc::clone(&objects));
                *self.last_failure.write() = None;
                self.state.store(CacheState::Loaded as u8, Ordering::Release);
                self.completed_loads.store(completed, Ordering::Release);
                loading.disarm();
                Ok(Some(objects))
            }
            Err(err) => {
                // Cancellation belongs to this caller's monitor, not to the
                // callers waiting behind it.
                if !matches!(err, MetadataError::Cancelled) {
                    *self.last_failure.write() = Some((completed, err.clone()));
                    self.completed_loads.store(completed, Ordering::Release);
                }
                self.failed_fetches.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    kind = self.fetcher.kind(),
                    parent = %parent.qualified_name(),
                    error = %err,
                    "failed to load objects"
                );
                Err(err)
            }
        }
    }

    /// Run the fetch protocol once. Caller holds the fetch lock.
    #[tracing::instrument(
        skip_all,
        fields(kind = self.fetcher.kind(), parent = %parent.qualified_name(), filter = ?object_name)
    )]
    async fn fetch(
        &self,
        conn: &dyn Connection,
        monitor: &dyn ProgressMonitor,
        parent: &Arc<F::Parent>,
        object_name: Option<&str>,
    ) -> MetadataResult<ObjectMap<F::Object>> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        let statement = self.fetcher.prepare_lookup(parent, object_name);

        let _task = MonitorTask::begin(monitor, &format!("Load {}", self.fetcher.kind()));
        match monitor.cancellation_token() {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        if let Some(handle) = conn.cancel_handle() {
                            handle.cancel();
                        }
                        tracing::debug!("fetch cancelled");
                        Err(MetadataError::Cancelled)
                    }
                    result = self.read_objects(conn, parent, &statement) => result,
                }
            }
            None => self.read_objects(conn, parent, &statement).await,
        }
    }

    async fn read_objects(
        &self,
        conn: &dyn Connection,
        parent: &Arc<F::Parent>,
        statement: &LookupStatement,
    ) -> MetadataResult<ObjectMap<F::Object>> {
        let kind = self.fetcher.kind();
        let executor_error =
            |err| MetadataError::from_executor(kind, parent.qualified_name(), err);

        let mut rows = conn
            .query_stream(&statement.sql, &statement.params)
            .await
            .map_err(executor_error)?;

        let mut objects = ObjectMap::new();
        let mut skipped = 0usize;
        while let Some(row) = rows.next().await {
            let row = row.map_err(executor_error)?;
            let Some(object) = self.fetcher.fetch_object(parent, &row)? else {
                skipped += 1;
                tracing::trace!("skipped row without object name");
                continue;
            };
            let name = object.name().to_string();
            if objects.insert(name.clone(), Arc::new(object)).is_some() {
                tracing::debug!(object = %name, "duplicate object name, keeping last row");
            }
        }

        tracing::debug!(count = objects.len(), skipped, "loaded objects");
        Ok(objects)
    }
}

impl<F: ObjectFetcher> std::fmt::Debug for ObjectLookupCache<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectLookupCache")
            .field("kind", &self.fetcher.kind())
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
