//! Main storage engine implementation
//!
//! Provides the keyspace with lazy expiration and sorted sets. Keys are
//! spread over a fixed number of partitions by hash; each partition is a
//! single reader-writer lock guarding both its value map and its expiry
//! map, so every per-key operation sees and updates the two together.
//!
//! Expired keys are removed only when touched. A reader that finds an
//! expired key trades its shared lock for the exclusive one, checks the
//! key again, and deletes and answers inside that one exclusive section.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use parking_lot::RwLock;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use super::pattern::Pattern;
use super::sorted_set::{AddOutcome, RangeSpec, SortedSet, ZMember};
use super::value::{Value, ValueType};
use super::Key;
use crate::error::{Result, StorageError};
use crate::options::{ExpireOptions, Expiry, SetOptions, ZAddOptions, ZRangeOptions};

/// Number of partitions used by [`StorageEngine::new`]
pub const DEFAULT_PARTITIONS: usize = 16;

/// Main storage engine
pub struct StorageEngine {
    partitions: Vec<RwLock<Keyspace>>,
}

/// One lock's worth of keys
#[derive(Debug)]
struct Keyspace {
    /// Key-value storage
    values: HashMap<Key, Value>,

    /// Absolute deadlines of keys that expire
    expires: HashMap<Key, Instant>,

    /// Seeds the skip list of every sorted set created here
    seeder: StdRng,
}

/// Reply of a ZADD
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ZAddReply {
    /// Member count: changed members with CH, otherwise every member given
    Count(usize),
    /// New score of the member incremented with INCR
    Score(f64),
}

impl Keyspace {
    fn new(seeder: StdRng) -> Self {
        Keyspace {
            values: HashMap::new(),
            expires: HashMap::new(),
            seeder,
        }
    }

    fn is_expired(&self, key: &[u8], now: Instant) -> bool {
        self.expires.get(key).map_or(false, |&at| at <= now)
    }

    /// Drop the key if its deadline has passed
    fn purge_if_expired(&mut self, key: &[u8], now: Instant) -> bool {
        if self.is_expired(key, now) {
            self.remove(key);
            true
        } else {
            false
        }
    }

    /// Remove value and expiry together
    fn remove(&mut self, key: &[u8]) -> Option<Value> {
        self.expires.remove(key);
        self.values.remove(key)
    }

    fn remaining(&self, key: &[u8], now: Instant) -> Option<Duration> {
        self.expires.get(key).map(|at| at.saturating_duration_since(now))
    }
}

impl StorageEngine {
    /// Create a new storage engine with default settings
    pub fn new() -> Arc<Self> {
        Self::with_partitions(DEFAULT_PARTITIONS)
    }

    /// Create a storage engine with `partitions` independently locked
    /// keyspaces; `1` puts every key behind one lock
    pub fn with_partitions(partitions: usize) -> Arc<Self> {
        Self::build(partitions, |_| StdRng::from_entropy())
    }

    /// Like [`with_partitions`](Self::with_partitions) but with every
    /// sorted set's level selection derived from `seed`
    pub fn with_seed(partitions: usize, seed: u64) -> Arc<Self> {
        Self::build(partitions, |idx| {
            StdRng::seed_from_u64(seed.wrapping_add(idx as u64))
        })
    }

    fn build(partitions: usize, mut seeder: impl FnMut(usize) -> StdRng) -> Arc<Self> {
        let count = partitions.max(1);
        let partitions = (0..count)
            .map(|idx| RwLock::new(Keyspace::new(seeder(idx))))
            .collect();
        Arc::new(StorageEngine { partitions })
    }

    /// Number of partitions
    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    /// Get a value
    ///
    /// Returns a copy of the live value, or `None` for absent and expired
    /// keys. Never fails.
    pub fn get(&self, key: &[u8]) -> Option<Value> {
        self.read(key, |ks, _| ks.values.get(key).cloned())
    }

    /// Get a string value, failing with `WrongType` on a sorted set
    pub fn get_string(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.read(key, |ks, _| match ks.values.get(key) {
            Some(Value::String(bytes)) => Ok(Some(bytes.clone())),
            Some(_) => Err(StorageError::WrongType.into()),
            None => Ok(None),
        })
    }

    /// Store a string value
    ///
    /// `NX` requires the key to be absent and `XX` requires it to exist;
    /// an unmet guard fails with `PreconditionFailed` and writes nothing.
    /// With `GET` the previous string is returned whether or not the write
    /// happened, and an unmet guard is not an error. `KEEPTTL` keeps the
    /// current expiry, a timed option installs a new one, and otherwise
    /// any expiry is cleared.
    pub fn set(&self, key: Key, value: Vec<u8>, opts: &SetOptions) -> Result<Option<Vec<u8>>> {
        let mut guard = self.partition(&key).write();
        let ks = &mut *guard;
        let now = Instant::now();
        ks.purge_if_expired(&key, now);

        let previous = match ks.values.get(&key) {
            Some(Value::String(bytes)) if opts.is_get() => Some(bytes.clone()),
            Some(Value::SortedSet(_)) if opts.is_get() => {
                return Err(StorageError::WrongType.into())
            }
            _ => None,
        };

        let exists = ks.values.contains_key(&key);
        if (opts.is_nx() && exists) || (opts.is_xx() && !exists) {
            return if opts.is_get() {
                Ok(previous)
            } else {
                Err(StorageError::PreconditionFailed.into())
            };
        }

        let expires_at = match opts.expiry() {
            None => None,
            Some(Expiry::Keep) => ks.expires.get(&key).copied(),
            Some(Expiry::After(ttl)) => Some(deadline_after(now, ttl, "set")?),
            Some(Expiry::At(when)) => Some(deadline_at(now, when)?),
        };

        match expires_at {
            Some(at) => {
                ks.expires.insert(key.clone(), at);
            }
            None => {
                ks.expires.remove(&key);
            }
        }
        ks.values.insert(key, Value::String(value));

        Ok(previous)
    }

    /// Delete keys, returning how many were live
    pub fn del<K: AsRef<[u8]>>(&self, keys: &[K]) -> usize {
        let now = Instant::now();
        keys.iter()
            .filter(|key| {
                let key: &[u8] = key.as_ref();
                let mut ks = self.partition(key).write();
                !ks.purge_if_expired(key, now) && ks.remove(key).is_some()
            })
            .count()
    }

    /// Count how many of the keys are live; repeats count repeatedly
    pub fn exists<K: AsRef<[u8]>>(&self, keys: &[K]) -> usize {
        keys.iter()
            .filter(|key| {
                let key: &[u8] = key.as_ref();
                self.read(key, |ks, _| ks.values.contains_key(key))
            })
            .count()
    }

    /// Kind of value stored at `key`
    pub fn key_type(&self, key: &[u8]) -> Option<ValueType> {
        self.read(key, |ks, _| ks.values.get(key).map(Value::value_type))
    }

    /// Set a time to live in seconds
    ///
    /// Fails with `NotFound` for absent keys and `PreconditionFailed`
    /// when an NX/XX/GT/LT guard is not met. GT and LT pass for keys
    /// without an expiry. A non-positive ttl deletes the key.
    pub fn expire(&self, key: &[u8], seconds: i64, opts: &ExpireOptions) -> Result<()> {
        self.pexpire(key, seconds.saturating_mul(1000), opts)
    }

    /// Set a time to live in milliseconds; see [`expire`](Self::expire)
    pub fn pexpire(&self, key: &[u8], millis: i64, opts: &ExpireOptions) -> Result<()> {
        let mut ks = self.partition(key).write();
        let now = Instant::now();
        ks.purge_if_expired(key, now);

        if !ks.values.contains_key(key) {
            return Err(StorageError::NotFound.into());
        }

        let current = ks
            .remaining(key, now)
            .map(|left| i64::try_from(left.as_millis()).unwrap_or(i64::MAX));

        let allowed = match current {
            _ if opts.is_nx() => current.is_none(),
            _ if opts.is_xx() => current.is_some(),
            Some(left) if opts.is_gt() => millis > left,
            Some(left) if opts.is_lt() => millis < left,
            _ => true,
        };
        if !allowed {
            return Err(StorageError::PreconditionFailed.into());
        }

        if millis <= 0 {
            ks.remove(key);
            return Ok(());
        }

        let at = deadline_after(now, Duration::from_millis(millis as u64), "expire")?;
        ks.expires.insert(key.to_vec(), at);
        Ok(())
    }

    /// Remove the expiry of a key; true if it had one
    pub fn persist(&self, key: &[u8]) -> bool {
        let mut ks = self.partition(key).write();
        ks.purge_if_expired(key, Instant::now());
        ks.expires.remove(key).is_some()
    }

    /// Remaining time to live in seconds, rounded to the nearest second
    ///
    /// `-1` if the key has no expiry, `-2` if it does not exist.
    pub fn ttl(&self, key: &[u8]) -> i64 {
        match self.pttl(key) {
            millis if millis < 0 => millis,
            millis => (millis + 500) / 1000,
        }
    }

    /// Remaining time to live in milliseconds, with the sentinels of
    /// [`ttl`](Self::ttl)
    pub fn pttl(&self, key: &[u8]) -> i64 {
        self.read(key, |ks, now| {
            if !ks.values.contains_key(key) {
                return -2;
            }
            match ks.remaining(key, now) {
                Some(left) => i64::try_from(left.as_millis()).unwrap_or(i64::MAX),
                None => -1,
            }
        })
    }

    /// Every live key matching a glob pattern
    pub fn keys(&self, pattern: &[u8]) -> Vec<Key> {
        let pattern = Pattern::compile(pattern);
        let everything = pattern.matches_everything();
        let now = Instant::now();

        let mut keys = Vec::new();
        for partition in &self.partitions {
            let ks = partition.read();
            keys.extend(
                ks.values
                    .keys()
                    .filter(|key| !ks.is_expired(key, now))
                    .filter(|key| everything || pattern.matches(key))
                    .cloned(),
            );
        }
        keys
    }

    /// Number of live keys
    pub fn dbsize(&self) -> usize {
        let now = Instant::now();
        self.partitions
            .iter()
            .map(|partition| {
                let ks = partition.read();
                ks.values.keys().filter(|key| !ks.is_expired(key, now)).count()
            })
            .sum()
    }

    /// Add members to a sorted set, creating it if needed
    ///
    /// With INCR exactly one (delta, member) pair is allowed and the member
    /// must already exist; the reply carries its new score. Otherwise the
    /// reply counts changed members with CH and every supplied member
    /// without it. An absent key gets an empty set before any member is
    /// applied, so the key exists afterwards even if nothing was added.
    pub fn zadd(&self, key: Key, members: Vec<(f64, Vec<u8>)>, opts: &ZAddOptions) -> Result<ZAddReply> {
        let mut guard = self.partition(&key).write();
        let ks = &mut *guard;
        ks.purge_if_expired(&key, Instant::now());

        let seeder = &mut ks.seeder;
        let value = ks
            .values
            .entry(key)
            .or_insert_with(|| Value::SortedSet(SortedSet::with_seed(seeder.next_u64())));

        match value {
            Value::SortedSet(set) => apply_zadd(set, members, opts),
            _ => Err(StorageError::WrongType.into()),
        }
    }

    /// Query a sorted set by rank, score or lex range
    ///
    /// A missing key is an empty set. LIMIT applies to score and lex
    /// ranges only.
    pub fn zrange(&self, key: &[u8], spec: &RangeSpec, opts: &ZRangeOptions) -> Result<Vec<ZMember>> {
        self.read(key, |ks, _| match ks.values.get(key) {
            Some(Value::SortedSet(set)) => set.range(spec, opts).map_err(Into::into),
            Some(_) => Err(StorageError::WrongType.into()),
            None => Ok(Vec::new()),
        })
    }

    /// Score of a member
    pub fn zscore(&self, key: &[u8], member: &[u8]) -> Result<Option<f64>> {
        self.with_sorted_set(key, |set| set.and_then(|set| set.score(member)))
    }

    /// Number of members in a sorted set
    pub fn zcard(&self, key: &[u8]) -> Result<usize> {
        self.with_sorted_set(key, |set| set.map_or(0, SortedSet::len))
    }

    /// 0-based rank of a member in ascending order
    pub fn zrank(&self, key: &[u8], member: &[u8]) -> Result<Option<usize>> {
        self.with_sorted_set(key, |set| set.and_then(|set| set.rank(member)))
    }

    /// Remove members, deleting the key once the set is empty
    pub fn zrem<M: AsRef<[u8]>>(&self, key: &[u8], members: &[M]) -> Result<usize> {
        let mut ks = self.partition(key).write();
        ks.purge_if_expired(key, Instant::now());

        let (removed, now_empty) = match ks.values.get_mut(key) {
            Some(Value::SortedSet(set)) => {
                let removed = members.iter().filter(|m| set.remove(m.as_ref())).count();
                (removed, set.is_empty())
            }
            Some(_) => return Err(StorageError::WrongType.into()),
            None => return Ok(0),
        };

        if now_empty {
            ks.remove(key);
        }
        Ok(removed)
    }

    // Helper methods

    fn partition(&self, key: &[u8]) -> &RwLock<Keyspace> {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        let idx = (hasher.finish() % self.partitions.len() as u64) as usize;
        &self.partitions[idx]
    }

    /// Run a read against the key's partition with lazy expiry applied
    ///
    /// The common case holds only the shared lock. If the key has expired
    /// the closure runs under the exclusive lock instead, after the key is
    /// checked again and removed.
    fn read<T>(&self, key: &[u8], f: impl FnOnce(&Keyspace, Instant) -> T) -> T {
        let partition = self.partition(key);

        {
            let ks = partition.read();
            let now = Instant::now();
            if !ks.is_expired(key, now) {
                return f(&ks, now);
            }
        }

        let mut ks = partition.write();
        let now = Instant::now();
        ks.purge_if_expired(key, now);
        f(&ks, now)
    }

    fn with_sorted_set<T>(&self, key: &[u8], f: impl FnOnce(Option<&SortedSet>) -> T) -> Result<T> {
        self.read(key, |ks, _| match ks.values.get(key) {
            Some(Value::SortedSet(set)) => Ok(f(Some(set))),
            Some(_) => Err(StorageError::WrongType.into()),
            None => Ok(f(None)),
        })
    }
}

fn apply_zadd(set: &mut SortedSet, members: Vec<(f64, Vec<u8>)>, opts: &ZAddOptions) -> Result<ZAddReply> {
    if opts.is_incr() {
        let mut pairs = members.into_iter();
        let (delta, member) = match (pairs.next(), pairs.next()) {
            (Some(pair), None) => pair,
            _ => {
                return Err(StorageError::InvalidArgument(
                    "INCR option supports a single increment-element pair".into(),
                )
                .into())
            }
        };

        let current = set.score(&member).ok_or(StorageError::NotFound)?;
        let score = current + delta;
        if score.is_nan() {
            return Err(StorageError::InvalidArgument("resulting score is not a number (NaN)".into()).into());
        }
        set.add(member, score);
        return Ok(ZAddReply::Score(score));
    }

    let requested = members.len();
    let changed = members
        .into_iter()
        .map(|(score, member)| set.add_with(member, score, opts))
        .filter(|outcome| *outcome != AddOutcome::Unchanged)
        .count();

    Ok(ZAddReply::Count(if opts.is_ch() { changed } else { requested }))
}

fn deadline_after(now: Instant, ttl: Duration, command: &str) -> Result<Instant> {
    now.checked_add(ttl).ok_or_else(|| {
        StorageError::InvalidArgument(format!("invalid expire time in '{}' command", command)).into()
    })
}

/// Convert a wall-clock deadline; deadlines in the past expire at once
fn deadline_at(now: Instant, when: SystemTime) -> Result<Instant> {
    match when.duration_since(SystemTime::now()) {
        Ok(ttl) => deadline_after(now, ttl, "set"),
        Err(_) => Ok(now),
    }
}
