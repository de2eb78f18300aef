//! Per-instance memoization of computed properties with a time-to-live.
//!
//! A host type owns a [`PropertyCache`] and exposes it through [`Cacheable`]. Each memoized
//! property is described by a [`CachedProperty`] holding the property name, its TTL and the
//! function computing it. Staleness is checked lazily on access; nothing runs in the background.
use std::{
    any::Any,
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use chrono::{DateTime, Utc};

use crate::Result;

/// A TTL that never expires.
pub const INFINITE: Duration = Duration::ZERO;
/// One minute.
pub const MINUTE: Duration = Duration::from_secs(60);
/// One hour.
pub const HOUR: Duration = Duration::from_secs(60 * 60);

/// TTL of `n` minutes.
pub const fn minutes(n: u64) -> Duration {
    Duration::from_secs(n * 60)
}

/// TTL of `n` hours.
pub const fn hours(n: u64) -> Duration {
    Duration::from_secs(n * 60 * 60)
}

/// One memoized value and the time it was computed (or received).
#[derive(Clone)]
pub struct CacheEntry {
    value: Arc<dyn Any + Send + Sync>,
    computed_at: DateTime<Utc>,
}

impl CacheEntry {
    /// When the value was computed or stored.
    pub fn computed_at(&self) -> DateTime<Utc> {
        self.computed_at
    }

    /// A value is fresh while its age doesn't exceed `ttl`. [`INFINITE`] is always fresh.
    pub fn is_fresh_at(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        if ttl == INFINITE {
            return true;
        }
        // An entry stamped in the future counts as age zero.
        let age = (now - self.computed_at).to_std().unwrap_or(Duration::ZERO);
        age <= ttl
    }
}

impl std::fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheEntry")
            .field("computed_at", &self.computed_at)
            .finish_non_exhaustive()
    }
}

/// Cache storage owned by one host instance.
///
/// Access is serialized by an internal lock, which is never held while a property is being
/// computed. Two threads missing the same entry at once will both compute it; the last write wins.
#[derive(Default)]
pub struct PropertyCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl PropertyCache {
    /// Empty cache.
    pub fn new() -> Self {
        PropertyCache::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        // A poisoned lock only means a writer panicked between two map operations, which leaves
        // the map itself consistent.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Entry under `name`, fresh or not.
    pub fn entry(&self, name: &str) -> Option<CacheEntry> {
        self.entries().get(name).cloned()
    }

    /// Whether anything is cached under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.entries().contains_key(name)
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Whether nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Write `value` under `name`, stamped with `at`.
    pub fn insert<T: Send + Sync + 'static>(&self, name: &str, value: T, at: DateTime<Utc>) {
        self.entries().insert(
            name.to_owned(),
            CacheEntry {
                value: Arc::new(value),
                computed_at: at,
            },
        );
    }

    /// Remove the entry under `name`, returning whether there was one.
    pub fn remove(&self, name: &str) -> bool {
        self.entries().remove(name).is_some()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries().clear();
    }
}

impl std::fmt::Debug for PropertyCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.entries();
        f.debug_map()
            .entries(entries.iter().map(|(k, v)| (k, v.computed_at)))
            .finish()
    }
}

/// A type that carries a [`PropertyCache`].
pub trait Cacheable {
    /// The cache of this instance.
    fn property_cache(&self) -> &PropertyCache;
}

/// A memoized, zero-argument property of `H` producing `T`.
///
/// ```
/// use steamapi::cache::{CachedProperty, Cacheable, PropertyCache, MINUTE};
///
/// struct Counter {
///     cache: PropertyCache,
/// }
///
/// impl Cacheable for Counter {
///     fn property_cache(&self) -> &PropertyCache {
///         &self.cache
///     }
/// }
///
/// static ANSWER: CachedProperty<Counter, u32> = CachedProperty::new("answer", MINUTE, |_| Ok(42));
///
/// let counter = Counter { cache: PropertyCache::new() };
/// assert_eq!(ANSWER.get(&counter).unwrap(), 42);
/// ```
pub struct CachedProperty<H, T> {
    name: &'static str,
    ttl: Duration,
    compute: fn(&H) -> Result<T>,
}

impl<H, T> CachedProperty<H, T> {
    /// Property `name` with time-to-live `ttl`, computed by `compute`.
    pub const fn new(name: &'static str, ttl: Duration, compute: fn(&H) -> Result<T>) -> Self {
        CachedProperty { name, ttl, compute }
    }

    /// Name of the cache entry.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Time-to-live. [`INFINITE`] never expires.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl<H, T> CachedProperty<H, T>
where
    H: Cacheable,
    T: Clone + Send + Sync + 'static,
{
    /// Return the cached value if it is fresh, otherwise compute, cache and return it.
    ///
    /// Errors from the computation are returned as-is and nothing is cached.
    pub fn get(&self, host: &H) -> Result<T> {
        let now = Utc::now();
        let cache = host.property_cache();

        if let Some(entry) = cache.entry(self.name) {
            if entry.is_fresh_at(now, self.ttl) {
                match (*entry.value).downcast_ref::<T>() {
                    Some(value) => {
                        log::trace!(target: "steamapi", property = self.name; "cache hit");
                        return Ok(value.clone());
                    }
                    None => {
                        log::warn!(target: "steamapi", property = self.name;
                                   "cached value has an unexpected type, recomputing");
                    }
                }
            } else {
                log::trace!(target: "steamapi", property = self.name; "cache entry expired");
            }
        } else {
            log::trace!(target: "steamapi", property = self.name; "cache miss");
        }

        let value = (self.compute)(host)?;
        cache.insert(self.name, value.clone(), now);
        Ok(value)
    }

    /// The cached value if it is fresh. Never computes.
    pub fn peek(&self, host: &H) -> Option<T> {
        let entry = host.property_cache().entry(self.name)?;
        if !entry.is_fresh_at(Utc::now(), self.ttl) {
            return None;
        }
        (*entry.value).downcast_ref::<T>().cloned()
    }

    /// Seed the cache with a value without computing it.
    pub fn store(&self, host: &H, value: T, at: Option<DateTime<Utc>>) {
        store(host, self.name, value, at);
    }

    /// Drop the cached value, forcing the next [`CachedProperty::get`] to compute it.
    pub fn expire(&self, host: &H) -> bool {
        expire(host, self.name)
    }
}

/// Write `value` into `host`'s cache under `property`, stamped with `at` or the current time.
///
/// Used to fill caches of many objects from a single bulk response.
pub fn store<H, T>(host: &H, property: &str, value: T, at: Option<DateTime<Utc>>)
where
    H: Cacheable + ?Sized,
    T: Send + Sync + 'static,
{
    host.property_cache()
        .insert(property, value, at.unwrap_or_else(Utc::now));
}

/// Remove `property` from `host`'s cache, returning whether it was cached.
pub fn expire<H: Cacheable + ?Sized>(host: &H, property: &str) -> bool {
    host.property_cache().remove(property)
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use chrono::Utc;

    use super::{expire, hours, minutes, store, CachedProperty, Cacheable, PropertyCache, INFINITE};
    use crate::Error;

    #[derive(Default)]
    struct Host {
        cache: PropertyCache,
        calls: AtomicUsize,
    }

    impl Cacheable for Host {
        fn property_cache(&self) -> &PropertyCache {
            &self.cache
        }
    }

    fn count(host: &Host) -> crate::Result<usize> {
        Ok(host.calls.fetch_add(1, Ordering::SeqCst) + 1)
    }

    static SHORT: CachedProperty<Host, usize> = CachedProperty::new("short", minutes(10), count);
    static FOREVER: CachedProperty<Host, usize> = CachedProperty::new("forever", INFINITE, count);
    static FAILING: CachedProperty<Host, usize> =
        CachedProperty::new("failing", INFINITE, |_| Err(Error::NotFound));

    fn ago(d: Duration) -> chrono::DateTime<Utc> {
        Utc::now() - chrono::Duration::from_std(d).unwrap()
    }

    #[test]
    fn computes_once_within_ttl() {
        let host = Host::default();
        assert_eq!(SHORT.get(&host).unwrap(), 1);
        assert_eq!(SHORT.get(&host).unwrap(), 1);
        assert_eq!(host.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn entry_just_inside_ttl_is_reused() {
        let host = Host::default();
        SHORT.store(&host, 100, Some(ago(minutes(10) - Duration::from_secs(5))));
        assert_eq!(SHORT.get(&host).unwrap(), 100);
        assert_eq!(host.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn entry_past_ttl_is_recomputed_once() {
        let host = Host::default();
        SHORT.store(&host, 100, Some(ago(minutes(10) + Duration::from_secs(5))));
        assert_eq!(SHORT.get(&host).unwrap(), 1);
        assert_eq!(SHORT.get(&host).unwrap(), 1);
        assert_eq!(host.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn infinite_ttl_never_expires() {
        let host = Host::default();
        FOREVER.store(&host, 7, Some(ago(hours(24 * 365))));
        assert_eq!(FOREVER.get(&host).unwrap(), 7);
        assert_eq!(host.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn store_then_get_returns_stored_value() {
        let host = Host::default();
        store(&host, "short", 55usize, None);
        assert_eq!(SHORT.get(&host).unwrap(), 55);
        assert_eq!(host.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn expire_forces_one_recomputation() {
        let host = Host::default();
        assert_eq!(FOREVER.get(&host).unwrap(), 1);
        assert!(expire(&host, "forever"));
        assert_eq!(FOREVER.get(&host).unwrap(), 2);
        assert_eq!(FOREVER.get(&host).unwrap(), 2);
        assert!(!expire(&host, "not-cached"));
    }

    #[test]
    fn peek_never_computes() {
        let host = Host::default();
        assert_eq!(SHORT.peek(&host), None);
        SHORT.store(&host, 9, Some(ago(minutes(11))));
        assert_eq!(SHORT.peek(&host), None);
        SHORT.store(&host, 9, None);
        assert_eq!(SHORT.peek(&host), Some(9));
        assert_eq!(host.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn errors_are_not_cached() {
        let host = Host::default();
        assert!(FAILING.get(&host).is_err());
        assert!(!host.cache.contains("failing"));
    }

    #[test]
    fn mistyped_entry_is_recomputed() {
        let host = Host::default();
        store(&host, "forever", "not a number".to_owned(), None);
        assert_eq!(FOREVER.get(&host).unwrap(), 1);
    }

    #[test]
    fn freshness_predicate() {
        let host = Host::default();
        let stamp = ago(Duration::from_secs(30));
        host.cache.insert("x", 1u8, stamp);
        let entry = host.cache.entry("x").unwrap();
        let now = Utc::now();
        assert!(entry.is_fresh_at(now, Duration::from_secs(60)));
        assert!(!entry.is_fresh_at(now, Duration::from_secs(10)));
        assert!(entry.is_fresh_at(now, INFINITE));
        assert_eq!(entry.computed_at(), stamp);
    }
}
