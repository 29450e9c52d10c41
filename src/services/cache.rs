// src/services/cache.rs
// DOCUMENTATION: In-memory cache for nearby-places payloads
// PURPOSE: Avoid repeated upstream lookups and collapse concurrent identical ones into one

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use serde::{Serialize, Deserialize};
use tokio::sync::{watch, Mutex, RwLock};

use crate::errors::LocateError;
use crate::models::QueryKey;

/// Result published by the caller that ran a lookup
type Outcome = Option<Result<String, LocateError>>;

type InFlight = Arc<Mutex<HashMap<QueryKey, watch::Receiver<Outcome>>>>;

/// Role a caller gets for a missing key
enum Flight {
    /// Entry appeared while waiting for the in-flight table
    Done(String),
    /// Caller runs the computation and publishes the outcome
    Leader(FlightGuard),
    /// Caller waits for the running computation
    Follower(watch::Receiver<Outcome>),
}

/// Leader's claim on a key
/// DOCUMENTATION: If the leader is dropped or panics before `finish`, the drop
/// closes the channel (waking waiters) and clears the in-flight marker
struct FlightGuard {
    key: QueryKey,
    in_flight: InFlight,
    publisher: Option<watch::Sender<Outcome>>,
}

impl FlightGuard {
    async fn finish(mut self, result: &Result<String, LocateError>) {
        self.in_flight.lock().await.remove(&self.key);
        if let Some(publisher) = self.publisher.take() {
            publisher.send_replace(Some(result.clone()));
        }
    }
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        let Some(publisher) = self.publisher.take() else {
            return;
        };
        drop(publisher);

        // Only a closed marker is ours; a newer leader's marker stays
        let key = self.key.clone();
        let clear = move |markers: &mut HashMap<QueryKey, watch::Receiver<Outcome>>| {
            if markers.get(&key).is_some_and(|m| m.has_changed().is_err()) {
                markers.remove(&key);
                log::debug!("Cleared abandoned lookup for key: {}", key);
            }
        };

        match self.in_flight.try_lock() {
            Ok(mut markers) => clear(&mut *markers),
            Err(_) => {
                let in_flight = self.in_flight.clone();
                if let Ok(handle) = tokio::runtime::Handle::try_current() {
                    handle.spawn(async move {
                        clear(&mut *in_flight.lock().await);
                    });
                }
            }
        }
    }
}

/// Counts a caller for as long as it waits on another caller's lookup
struct Waiting<'a>(&'a AtomicUsize);

impl<'a> Waiting<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for Waiting<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Process-lifetime cache keyed by query shape
/// DOCUMENTATION: Thread-safe, first write wins, no expiry and no eviction
/// Constructed once in main.rs and shared through Arc
pub struct QueryCache {
    store: Arc<RwLock<HashMap<QueryKey, String>>>,
    in_flight: InFlight,
    waiting: AtomicUsize,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryCache {
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(HashMap::new())),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            waiting: AtomicUsize::new(0),
        }
    }

    /// Get cached value
    pub async fn get(&self, key: &QueryKey) -> Option<String> {
        let store = self.store.read().await;

        match store.get(key) {
            Some(data) => {
                log::debug!("Cache HIT for key: {}", key);
                Some(data.clone())
            }
            None => {
                log::debug!("Cache MISS for key: {}", key);
                None
            }
        }
    }

    /// Insert a value unless the key is already present
    /// Returns false when an earlier value was kept
    pub async fn put(&self, key: QueryKey, value: String) -> bool {
        let mut store = self.store.write().await;
        if store.contains_key(&key) {
            log::debug!("Cache SET ignored, key already present: {}", key);
            return false;
        }
        log::debug!("Cache SET for key: {}", key);
        store.insert(key, value);
        true
    }

    /// Return the cached value or run `compute` to produce it
    /// DOCUMENTATION: At most one `compute` runs per key at a time. Concurrent callers
    /// for the same key wait for it and share its payload or its error. Errors are
    /// never stored. If the running caller is dropped or panics before finishing,
    /// one waiter takes over the computation.
    pub async fn get_or_compute<F, Fut>(
        &self,
        key: &QueryKey,
        compute: F,
    ) -> Result<String, LocateError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, LocateError>>,
    {
        loop {
            if let Some(hit) = self.get(key).await {
                return Ok(hit);
            }

            match self.join_or_lead(key).await {
                Flight::Done(data) => return Ok(data),
                Flight::Leader(guard) => return self.lead(key, guard, compute).await,
                Flight::Follower(mut waiter) => {
                    let outcome = {
                        let _waiting = Waiting::enter(&self.waiting);
                        waiter
                            .wait_for(Option::is_some)
                            .await
                            .map(|published| published.clone())
                            .ok()
                            .flatten()
                    };
                    match outcome {
                        Some(result) => return result,
                        None => {
                            log::warn!("Lookup for {} was abandoned, retrying", key);
                        }
                    }
                }
            }
        }
    }

    async fn join_or_lead(&self, key: &QueryKey) -> Flight {
        let mut in_flight = self.in_flight.lock().await;

        // Re-check under the in-flight lock: a leader stores before it deregisters
        if let Some(data) = self.store.read().await.get(key) {
            // Marker left behind by a leader dropped between storing and deregistering
            in_flight.remove(key);
            return Flight::Done(data.clone());
        }

        if let Some(waiter) = in_flight.get(key) {
            if waiter.has_changed().is_ok() {
                log::debug!("Joining in-flight lookup for key: {}", key);
                return Flight::Follower(waiter.clone());
            }
            // Leader went away without publishing
            in_flight.remove(key);
        }

        let (publisher, waiter) = watch::channel(None);
        in_flight.insert(key.clone(), waiter);
        Flight::Leader(FlightGuard {
            key: key.clone(),
            in_flight: self.in_flight.clone(),
            publisher: Some(publisher),
        })
    }

    async fn lead<F, Fut>(
        &self,
        key: &QueryKey,
        guard: FlightGuard,
        compute: F,
    ) -> Result<String, LocateError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, LocateError>>,
    {
        let result = match compute().await {
            Ok(data) => {
                let size = data.len();
                if self.put(key.clone(), data).await {
                    log::info!("Cached {} bytes for {}", size, key);
                }
                // Hand out whatever is resident so every caller sees the same payload
                match self.store.read().await.get(key) {
                    Some(resident) => Ok(resident.clone()),
                    None => Err(LocateError::Fetch(format!("entry for {} vanished", key))),
                }
            }
            Err(e) => {
                log::debug!("Lookup for {} failed, nothing cached: {}", key, e);
                Err(e)
            }
        };

        guard.finish(&result).await;
        result
    }

    /// Get cache statistics
    pub async fn stats(&self) -> CacheStats {
        let total_entries = self.store.read().await.len();
        let in_flight = self.in_flight.lock().await.len();

        CacheStats {
            total_entries,
            in_flight,
            waiting: self.waiting.load(Ordering::SeqCst),
        }
    }
}

/// Cache statistics
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct CacheStats {
    pub total_entries: usize,
    /// Lookups currently running upstream
    pub in_flight: usize,
    /// Callers waiting on one of those lookups
    pub waiting: usize,
}
