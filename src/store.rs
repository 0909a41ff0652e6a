use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use bytes::Bytes;
use parking_lot::RwLock;
use thiserror::Error as ThisError;
use tokio::task::JoinHandle;
use tracing::debug;

/// How often the background reaper scans for expired entries.
pub const REAP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum StoreError {
    /// The key holds a different variant than the operation expects. The
    /// store is left untouched.
    #[error("value is not a {0}")]
    WrongType(&'static str),
    #[error("value is not an integer")]
    NotAnInteger,
    #[error("increment or decrement would overflow")]
    Overflow,
}

/// The value held by a key: exactly one of four variants.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Str(Bytes),
    Hash(HashMap<String, Bytes>),
    List(VecDeque<Bytes>),
    Set(HashSet<Bytes>),
}

#[derive(Clone, Debug)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn new(value: Value, ttl: Option<Duration>) -> Self {
        Self {
            value,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        }
    }

    fn is_expired(&self) -> bool {
        self.expires_at
            .map_or(false, |expires_at| Instant::now() > expires_at)
    }
}

/// Remaining lifetime of a key as reported by [`Store::ttl`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    Remaining(Duration),
    /// The key exists but carries no expiration.
    NoExpiry,
    /// The key does not exist (or has expired).
    Missing,
}

impl Ttl {
    /// The wire representation: remaining seconds, -1 for no expiration,
    /// -2 for a missing key.
    pub fn as_secs(self) -> i64 {
        match self {
            Ttl::Remaining(remaining) => remaining.as_secs() as i64,
            Ttl::NoExpiry => -1,
            Ttl::Missing => -2,
        }
    }

    /// The inverse of [`Ttl::as_secs`]; any negative value other than -1 is
    /// treated as missing.
    pub fn from_secs(secs: i64) -> Self {
        match secs {
            -1 => Ttl::NoExpiry,
            secs if secs < 0 => Ttl::Missing,
            secs => Ttl::Remaining(Duration::from_secs(secs as u64)),
        }
    }
}

/// Per-variant key counts, plus the number of expired-but-unreclaimed
/// entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub keys: usize,
    pub strings: usize,
    pub hashes: usize,
    pub lists: usize,
    pub sets: usize,
    pub expired: usize,
}

/// Thread-safe typed key-value store with per-key expiration.
///
/// A single reader-writer lock protects the whole table: read-only
/// operations take it in shared mode, mutators and the reaper take it
/// exclusively. Every operation acquires the lock exactly once, so each is
/// atomic with respect to all others.
///
/// Expiration is honored lazily: every operation first checks the stored
/// deadline and treats an expired entry as absent. The background reaper
/// (see [`Store::spawn_reaper`]) reclaims the memory.
#[derive(Clone, Default)]
pub struct Store {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts the background reaper on the current tokio runtime. The task
    /// holds only a weak reference and exits on the first tick after the
    /// store has been dropped.
    pub fn spawn_reaper(&self) -> JoinHandle<()> {
        let entries = Arc::downgrade(&self.entries);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(REAP_INTERVAL);
            interval.tick().await;
            loop {
                interval.tick().await;
                match Weak::upgrade(&entries) {
                    Some(entries) => {
                        let removed = purge_expired(&entries);
                        if removed > 0 {
                            debug!(removed, "reaper removed expired entries");
                        }
                    }
                    None => break,
                }
            }
        })
    }

    /// Removes every expired entry under a single exclusive lock
    /// acquisition. Returns the number of entries removed.
    pub fn purge_expired(&self) -> usize {
        purge_expired(&self.entries)
    }

    pub fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError> {
        let entries = self.entries.read();
        match live(&entries, key) {
            Some(Value::Str(value)) => Ok(Some(value.clone())),
            Some(_) => Err(StoreError::WrongType("string")),
            None => Ok(None),
        }
    }

    /// Stores a string value, overwriting any prior value regardless of its
    /// variant. A `ttl` of `None` means the key never expires.
    pub fn set(&self, key: String, value: Bytes, ttl: Option<Duration>) {
        let mut entries = self.entries.write();
        entries.insert(key, Entry::new(Value::Str(value), ttl));
    }

    pub fn del(&self, key: &str) -> bool {
        let mut entries = self.entries.write();
        match entries.remove(key) {
            Some(entry) => !entry.is_expired(),
            None => false,
        }
    }

    pub fn exists(&self, key: &str) -> bool {
        let entries = self.entries.read();
        live(&entries, key).is_some()
    }

    /// Adds `delta` to the integer stored at `key`, creating the key with
    /// value `delta` when absent. The stored string must parse as a decimal
    /// i64; sums that would overflow are rejected rather than wrapped.
    pub fn incr_by(&self, key: &str, delta: i64) -> Result<i64, StoreError> {
        let mut entries = self.entries.write();
        drop_if_expired(&mut entries, key);

        let Some(entry) = entries.get_mut(key) else {
            entries.insert(
                key.to_string(),
                Entry::new(Value::Str(Bytes::from(delta.to_string())), None),
            );
            return Ok(delta);
        };

        let Value::Str(current) = &entry.value else {
            return Err(StoreError::WrongType("string"));
        };

        let current: i64 = std::str::from_utf8(current)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or(StoreError::NotAnInteger)?;
        let sum = current.checked_add(delta).ok_or(StoreError::Overflow)?;

        entry.value = Value::Str(Bytes::from(sum.to_string()));
        Ok(sum)
    }

    pub fn incr(&self, key: &str) -> Result<i64, StoreError> {
        self.incr_by(key, 1)
    }

    pub fn decr(&self, key: &str) -> Result<i64, StoreError> {
        self.incr_by(key, -1)
    }

    pub fn decr_by(&self, key: &str, delta: i64) -> Result<i64, StoreError> {
        let delta = delta.checked_neg().ok_or(StoreError::Overflow)?;
        self.incr_by(key, delta)
    }

    /// Sets the expiration of an existing, live key to `now + ttl`. Returns
    /// false when the key is absent or expired.
    pub fn expire(&self, key: &str, ttl: Duration) -> bool {
        let mut entries = self.entries.write();
        drop_if_expired(&mut entries, key);
        match entries.get_mut(key) {
            Some(entry) => {
                entry.expires_at = Some(Instant::now() + ttl);
                true
            }
            None => false,
        }
    }

    pub fn ttl(&self, key: &str) -> Ttl {
        let entries = self.entries.read();
        let Some(entry) = entries.get(key) else {
            return Ttl::Missing;
        };
        match entry.expires_at {
            None => Ttl::NoExpiry,
            Some(expires_at) => {
                let now = Instant::now();
                if now > expires_at {
                    Ttl::Missing
                } else {
                    Ttl::Remaining(expires_at - now)
                }
            }
        }
    }

    /// Clears the expiration of a live key, making it permanent. Returns
    /// false when the key is absent or expired.
    pub fn persist(&self, key: &str) -> bool {
        let mut entries = self.entries.write();
        drop_if_expired(&mut entries, key);
        match entries.get_mut(key) {
            Some(entry) => {
                entry.expires_at = None;
                true
            }
            None => false,
        }
    }

    pub fn hget(&self, key: &str, field: &str) -> Result<Option<Bytes>, StoreError> {
        let entries = self.entries.read();
        match live(&entries, key) {
            Some(Value::Hash(hash)) => Ok(hash.get(field).cloned()),
            Some(_) => Err(StoreError::WrongType("hash")),
            None => Ok(None),
        }
    }

    /// Sets a hash field, creating the hash when the key is absent. A key
    /// holding another variant is a type error and is left untouched.
    pub fn hset(&self, key: &str, field: String, value: Bytes) -> Result<(), StoreError> {
        let mut entries = self.entries.write();
        drop_if_expired(&mut entries, key);

        let entry = entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::new(Value::Hash(HashMap::new()), None));

        match &mut entry.value {
            Value::Hash(hash) => {
                hash.insert(field, value);
                Ok(())
            }
            _ => Err(StoreError::WrongType("hash")),
        }
    }

    pub fn hdel(&self, key: &str, field: &str) -> Result<bool, StoreError> {
        let mut entries = self.entries.write();
        drop_if_expired(&mut entries, key);
        match entries.get_mut(key) {
            Some(entry) => match &mut entry.value {
                Value::Hash(hash) => Ok(hash.remove(field).is_some()),
                _ => Err(StoreError::WrongType("hash")),
            },
            None => Ok(false),
        }
    }

    pub fn hexists(&self, key: &str, field: &str) -> Result<bool, StoreError> {
        let entries = self.entries.read();
        match live(&entries, key) {
            Some(Value::Hash(hash)) => Ok(hash.contains_key(field)),
            Some(_) => Err(StoreError::WrongType("hash")),
            None => Ok(false),
        }
    }

    /// All field-value pairs of a hash, in no particular order. An absent
    /// key yields an empty vector.
    pub fn hget_all(&self, key: &str) -> Result<Vec<(String, Bytes)>, StoreError> {
        let entries = self.entries.read();
        match live(&entries, key) {
            Some(Value::Hash(hash)) => Ok(hash
                .iter()
                .map(|(field, value)| (field.clone(), value.clone()))
                .collect()),
            Some(_) => Err(StoreError::WrongType("hash")),
            None => Ok(Vec::new()),
        }
    }

    /// Pushes values at the head of the list, one by one: the last value
    /// ends up first. Creates the list when the key is absent. Returns the
    /// new length.
    pub fn lpush(&self, key: &str, values: Vec<Bytes>) -> Result<i64, StoreError> {
        self.push(key, values, |list, value| list.push_front(value))
    }

    /// Appends values at the tail of the list, in order. Creates the list
    /// when the key is absent. Returns the new length.
    pub fn rpush(&self, key: &str, values: Vec<Bytes>) -> Result<i64, StoreError> {
        self.push(key, values, |list, value| list.push_back(value))
    }

    fn push(
        &self,
        key: &str,
        values: Vec<Bytes>,
        insert: impl Fn(&mut VecDeque<Bytes>, Bytes),
    ) -> Result<i64, StoreError> {
        let mut entries = self.entries.write();
        drop_if_expired(&mut entries, key);

        let entry = entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::new(Value::List(VecDeque::new()), None));

        match &mut entry.value {
            Value::List(list) => {
                for value in values {
                    insert(list, value);
                }
                Ok(list.len() as i64)
            }
            _ => Err(StoreError::WrongType("list")),
        }
    }

    pub fn lpop(&self, key: &str) -> Result<Option<Bytes>, StoreError> {
        self.pop(key, VecDeque::pop_front)
    }

    pub fn rpop(&self, key: &str) -> Result<Option<Bytes>, StoreError> {
        self.pop(key, VecDeque::pop_back)
    }

    fn pop(
        &self,
        key: &str,
        remove: impl Fn(&mut VecDeque<Bytes>) -> Option<Bytes>,
    ) -> Result<Option<Bytes>, StoreError> {
        let mut entries = self.entries.write();
        drop_if_expired(&mut entries, key);
        match entries.get_mut(key) {
            Some(entry) => match &mut entry.value {
                Value::List(list) => Ok(remove(list)),
                _ => Err(StoreError::WrongType("list")),
            },
            None => Ok(None),
        }
    }

    pub fn llen(&self, key: &str) -> Result<i64, StoreError> {
        let entries = self.entries.read();
        match live(&entries, key) {
            Some(Value::List(list)) => Ok(list.len() as i64),
            Some(_) => Err(StoreError::WrongType("list")),
            None => Ok(0),
        }
    }

    /// Adds members to a set, creating it when the key is absent. Returns
    /// the number of members actually added; duplicates are ignored.
    pub fn sadd(&self, key: &str, members: Vec<Bytes>) -> Result<i64, StoreError> {
        let mut entries = self.entries.write();
        drop_if_expired(&mut entries, key);

        let entry = entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::new(Value::Set(HashSet::new()), None));

        match &mut entry.value {
            Value::Set(set) => {
                let mut added = 0;
                for member in members {
                    if set.insert(member) {
                        added += 1;
                    }
                }
                Ok(added)
            }
            _ => Err(StoreError::WrongType("set")),
        }
    }

    /// Removes members from a set. Returns the number actually removed.
    pub fn srem(&self, key: &str, members: Vec<Bytes>) -> Result<i64, StoreError> {
        let mut entries = self.entries.write();
        drop_if_expired(&mut entries, key);
        match entries.get_mut(key) {
            Some(entry) => match &mut entry.value {
                Value::Set(set) => {
                    let mut removed = 0;
                    for member in members {
                        if set.remove(&member) {
                            removed += 1;
                        }
                    }
                    Ok(removed)
                }
                _ => Err(StoreError::WrongType("set")),
            },
            None => Ok(0),
        }
    }

    pub fn sismember(&self, key: &str, member: &[u8]) -> Result<bool, StoreError> {
        let entries = self.entries.read();
        match live(&entries, key) {
            Some(Value::Set(set)) => Ok(set.contains(member)),
            Some(_) => Err(StoreError::WrongType("set")),
            None => Ok(false),
        }
    }

    /// All members of a set, in no particular order. An absent key yields
    /// an empty vector.
    pub fn smembers(&self, key: &str) -> Result<Vec<Bytes>, StoreError> {
        let entries = self.entries.read();
        match live(&entries, key) {
            Some(Value::Set(set)) => Ok(set.iter().cloned().collect()),
            Some(_) => Err(StoreError::WrongType("set")),
            None => Ok(Vec::new()),
        }
    }

    pub fn stats(&self) -> StoreStats {
        let entries = self.entries.read();
        let mut stats = StoreStats {
            keys: entries.len(),
            ..StoreStats::default()
        };

        for entry in entries.values() {
            if entry.is_expired() {
                stats.expired += 1;
                continue;
            }
            match entry.value {
                Value::Str(_) => stats.strings += 1,
                Value::Hash(_) => stats.hashes += 1,
                Value::List(_) => stats.lists += 1,
                Value::Set(_) => stats.sets += 1,
            }
        }

        stats
    }
}

fn live<'a>(entries: &'a HashMap<String, Entry>, key: &str) -> Option<&'a Value> {
    entries
        .get(key)
        .filter(|entry| !entry.is_expired())
        .map(|entry| &entry.value)
}

fn drop_if_expired(entries: &mut HashMap<String, Entry>, key: &str) {
    if entries.get(key).is_some_and(Entry::is_expired) {
        entries.remove(key);
    }
}

fn purge_expired(entries: &RwLock<HashMap<String, Entry>>) -> usize {
    let mut entries = entries.write();
    let before = entries.len();
    entries.retain(|_, entry| !entry.is_expired());
    before - entries.len()
}
