//! Thread-Safe Storage Engine with Lazy Expiry
//!
//! This module implements the keyspace: a map from key to a tagged value
//! (string or list) plus an optional absolute expiry timestamp.
//!
//! ## Design Decisions
//!
//! 1. **Sharded Locks**: Keys hash onto a fixed set of shards, each behind its
//!    own `RwLock`. Every operation on a given key runs under that key's shard
//!    lock, so operations on the same key never interleave.
//! 2. **One Map per Shard**: Strings and lists live in the same map as a
//!    [`StoredValue`], so a type check and the mutation that follows it happen
//!    under one lock acquisition.
//! 3. **Lazy Expiry**: Expiry is only checked when a key is read or written.
//!    A key found expired on a read is removed before the read returns.
//!    There is no background sweep.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     StorageEngine                           │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │ Shard N │           │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ RwLock  │           │
//! │  │ HashMap │ │ HashMap │ │ HashMap │ │ HashMap │           │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Lock hold time is bounded by one map lookup plus, for list operations,
//! work linear in the list length. No I/O happens under a lock.

use crate::storage::list::List;
use bytes::Bytes;
use std::collections::hash_map::{self, HashMap};
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::trace;

/// Number of shards for the storage engine.
const NUM_SHARDS: usize = 64;

/// Errors returned by storage operations.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// The key holds a value of a different type than the operation needs.
    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongType,
}

/// The value half of a key-value pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredValue {
    String(Bytes),
    List(List),
}

/// A stored value together with its expiry.
#[derive(Debug, Clone)]
struct Entry {
    value: StoredValue,
    /// Absolute expiry in Unix milliseconds (None = never expires)
    expires_at: Option<u64>,
}

impl Entry {
    fn string(value: Bytes, expires_at: Option<u64>) -> Self {
        Self {
            value: StoredValue::String(value),
            expires_at,
        }
    }

    fn list() -> Self {
        Self {
            value: StoredValue::List(List::new()),
            expires_at: None,
        }
    }

    /// Checks whether this entry has expired as of `now` (Unix milliseconds).
    #[inline]
    fn is_expired_at(&self, now: u64) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }
}

/// Current wall-clock time in Unix milliseconds.
fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// A single shard containing a portion of the keyspace.
#[derive(Debug, Default)]
struct Shard {
    entries: RwLock<HashMap<Bytes, Entry>>,
}

impl Shard {
    // A panic while holding the lock cannot leave a half-applied mutation
    // behind (every write is a single insert/remove/push), so a poisoned
    // lock is still safe to use.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<Bytes, Entry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<Bytes, Entry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Which end of a list a push targets.
#[derive(Debug, Clone, Copy)]
enum End {
    Front,
    Back,
}

/// The keyspace shared by every client connection.
///
/// Designed to be wrapped in an `Arc` and handed to each connection task.
/// The underlying maps are never exposed; all access goes through methods.
///
/// # Example
///
/// ```
/// use tidekv::storage::StorageEngine;
/// use bytes::Bytes;
/// use std::time::Duration;
///
/// let engine = StorageEngine::new();
///
/// engine.set(Bytes::from("name"), Bytes::from("tide"), None);
/// assert_eq!(engine.get(b"name"), Ok(Some(Bytes::from("tide"))));
///
/// engine.set(Bytes::from("session"), Bytes::from("abc"), Some(Duration::from_secs(60)));
///
/// engine.push_back(Bytes::from("jobs"), vec![Bytes::from("a"), Bytes::from("b")]).unwrap();
/// assert_eq!(engine.length(b"jobs"), 2);
/// ```
pub struct StorageEngine {
    shards: Vec<Shard>,
    get_count: AtomicU64,
    set_count: AtomicU64,
    list_op_count: AtomicU64,
    expired_count: AtomicU64,
}

impl std::fmt::Debug for StorageEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageEngine")
            .field("shards", &self.shards.len())
            .field("keys", &self.len())
            .finish()
    }
}

impl Default for StorageEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageEngine {
    pub fn new() -> Self {
        let shards = (0..NUM_SHARDS).map(|_| Shard::default()).collect();

        Self {
            shards,
            get_count: AtomicU64::new(0),
            set_count: AtomicU64::new(0),
            list_op_count: AtomicU64::new(0),
            expired_count: AtomicU64::new(0),
        }
    }

    #[inline]
    fn get_shard(&self, key: &[u8]) -> &Shard {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) % NUM_SHARDS]
    }

    /// Runs `f` against the live entry for `key`, evicting it first if it
    /// has expired.
    ///
    /// The common case only takes the shard's read lock. The write lock is
    /// taken only to remove an expired entry.
    fn read_live<T>(&self, key: &[u8], f: impl FnOnce(Option<&Entry>) -> T) -> T {
        let shard = self.get_shard(key);
        let now = now_ms();

        {
            let entries = shard.read();
            match entries.get(key) {
                Some(entry) if entry.is_expired_at(now) => {}
                other => return f(other),
            }
        }

        let mut entries = shard.write();
        // Another writer may have replaced the key between the two locks.
        if entries.get(key).is_some_and(|e| e.is_expired_at(now)) {
            entries.remove(key);
            self.expired_count.fetch_add(1, Ordering::Relaxed);
            trace!(key = ?String::from_utf8_lossy(key), "Evicted expired key");
        }
        f(entries.get(key))
    }

    /// Stores a string value, replacing whatever the key held before.
    ///
    /// A `ttl` of `None` or zero means the key never expires; otherwise the
    /// key expires `ttl` from now.
    pub fn set(&self, key: Bytes, value: Bytes, ttl: Option<Duration>) {
        self.set_count.fetch_add(1, Ordering::Relaxed);

        // TTLs past the u64 millisecond range pin the deadline at u64::MAX.
        let expires_at = ttl.filter(|ttl| !ttl.is_zero()).map(|ttl| {
            let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
            now_ms().saturating_add(millis)
        });

        let shard = self.get_shard(&key);
        shard.write().insert(key, Entry::string(value, expires_at));
    }

    /// Returns the string stored at `key`.
    ///
    /// Missing and expired keys read as `Ok(None)`; an expired key is removed
    /// as a side effect. A list-typed key is a [`StoreError::WrongType`].
    pub fn get(&self, key: &[u8]) -> Result<Option<Bytes>, StoreError> {
        self.get_count.fetch_add(1, Ordering::Relaxed);

        self.read_live(key, |entry| match entry.map(|e| &e.value) {
            None => Ok(None),
            Some(StoredValue::String(value)) => Ok(Some(value.clone())),
            Some(StoredValue::List(_)) => Err(StoreError::WrongType),
        })
    }

    /// Appends `values`, in order, to the tail of the list at `key`.
    ///
    /// Creates the list if the key is absent. Returns the new length.
    pub fn push_back(&self, key: Bytes, values: Vec<Bytes>) -> Result<usize, StoreError> {
        self.push(key, values, End::Back)
    }

    /// Pushes `values` onto the head of the list at `key`, one at a time.
    ///
    /// Each value becomes the new head, so `push_front(k, [y, z])` on
    /// `[a, b]` yields `[z, y, a, b]`. Returns the new length.
    pub fn push_front(&self, key: Bytes, values: Vec<Bytes>) -> Result<usize, StoreError> {
        self.push(key, values, End::Front)
    }

    fn push(&self, key: Bytes, values: Vec<Bytes>, end: End) -> Result<usize, StoreError> {
        self.list_op_count.fetch_add(1, Ordering::Relaxed);

        if values.is_empty() {
            return self.read_live(&key, |entry| match entry.map(|e| &e.value) {
                None => Ok(0),
                Some(StoredValue::List(list)) => Ok(list.len()),
                Some(StoredValue::String(_)) => Err(StoreError::WrongType),
            });
        }

        let now = now_ms();
        let shard = self.get_shard(&key);
        let mut entries = shard.write();

        let entry = match entries.entry(key) {
            hash_map::Entry::Occupied(occupied) => {
                let entry = occupied.into_mut();
                if entry.is_expired_at(now) {
                    self.expired_count.fetch_add(1, Ordering::Relaxed);
                    *entry = Entry::list();
                }
                entry
            }
            hash_map::Entry::Vacant(vacant) => vacant.insert(Entry::list()),
        };

        let list = match &mut entry.value {
            StoredValue::List(list) => list,
            StoredValue::String(_) => return Err(StoreError::WrongType),
        };

        let mut len = list.len();
        for value in values {
            len = match end {
                End::Front => list.push_front(value),
                End::Back => list.push_back(value),
            };
        }

        Ok(len)
    }

    /// Returns the inclusive range `[start, end]` of the list at `key`.
    ///
    /// See [`List::range`] for index normalization. A missing key yields an
    /// empty vector; a string-typed key is a [`StoreError::WrongType`].
    pub fn range(&self, key: &[u8], start: i64, end: i64) -> Result<Vec<Bytes>, StoreError> {
        self.list_op_count.fetch_add(1, Ordering::Relaxed);

        self.read_live(key, |entry| match entry.map(|e| &e.value) {
            None => Ok(Vec::new()),
            Some(StoredValue::List(list)) => Ok(list.range(start, end)),
            Some(StoredValue::String(_)) => Err(StoreError::WrongType),
        })
    }

    /// Returns the number of elements in the list at `key`.
    ///
    /// Missing, expired and string-typed keys all report 0.
    pub fn length(&self, key: &[u8]) -> usize {
        self.list_op_count.fetch_add(1, Ordering::Relaxed);

        self.read_live(key, |entry| match entry.map(|e| &e.value) {
            Some(StoredValue::List(list)) => list.len(),
            _ => 0,
        })
    }

    /// Returns the number of entries held, including expired entries that
    /// have not been touched since they expired.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.read().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns operation counters.
    pub fn stats(&self) -> StorageStats {
        StorageStats {
            keys: self.len() as u64,
            get_ops: self.get_count.load(Ordering::Relaxed),
            set_ops: self.set_count.load(Ordering::Relaxed),
            list_ops: self.list_op_count.load(Ordering::Relaxed),
            expired: self.expired_count.load(Ordering::Relaxed),
        }
    }
}

/// Database statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageStats {
    /// Number of entries currently held
    pub keys: u64,
    /// Total GET operations
    pub get_ops: u64,
    /// Total SET operations
    pub set_ops: u64,
    /// Total list operations (push, range, length)
    pub list_ops: u64,
    /// Keys removed because they were found expired
    pub expired: u64,
}
