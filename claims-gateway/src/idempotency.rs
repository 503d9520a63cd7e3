use async_trait::async_trait;
use dashmap::{DashMap, mapref::entry::Entry};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);
pub const DEFAULT_CAPACITY: usize = 10_000;

/// Response recorded for an idempotency key, replayed on repeats
#[derive(Debug, Clone, PartialEq)]
pub struct StoredResponse {
    pub status: u16,
    pub body: Value,
}

/// Hex SHA-256 of a request payload. Object keys serialize in sorted order,
/// so the same claim always hashes the same way.
pub fn fingerprint(payload: &Value) -> String {
    hex::encode(Sha256::digest(payload.to_string().as_bytes()))
}

/// What a request gets when it presents an idempotency key
#[derive(Debug, Clone, PartialEq)]
pub enum Reservation {
    /// The key is now held by the caller, who must `complete` or `release` it
    Acquired,
    /// The key already finished with this response
    Replay(StoredResponse),
    /// Another request holding the key is still with the provider
    InFlight,
    /// The key was first used with a different payload
    Mismatch,
}

/// Trait for remembering the outcome of keyed submissions
#[async_trait]
pub trait IdempotencyStore: Send + Sync {
    async fn reserve(&self, key: &str, fingerprint: &str) -> Reservation;
    async fn complete(&self, key: &str, response: StoredResponse);
    /// Drop an unfinished reservation so the key can be tried again
    async fn release(&self, key: &str);
}

#[derive(Debug, Clone)]
enum SlotState {
    InFlight,
    Done(StoredResponse),
}

#[derive(Debug, Clone)]
struct Slot {
    fingerprint: String,
    state: SlotState,
    stamped: Instant,
}

impl Slot {
    fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.stamped) >= ttl
    }

    fn answer(&self, fingerprint: &str) -> Reservation {
        if self.fingerprint != fingerprint {
            return Reservation::Mismatch;
        }
        match &self.state {
            SlotState::InFlight => Reservation::InFlight,
            SlotState::Done(response) => Reservation::Replay(response.clone()),
        }
    }
}

/// In-memory implementation of IdempotencyStore.
///
/// Entries live for `ttl` after they were reserved or completed. Once
/// `capacity` keys are held, expired entries are purged and then the oldest
/// finished entries are evicted before in-flight ones.
pub struct InMemoryIdempotencyStore {
    slots: Arc<DashMap<String, Slot>>,
    ttl: Duration,
    capacity: usize,
}

impl Default for InMemoryIdempotencyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryIdempotencyStore {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_TTL, DEFAULT_CAPACITY)
    }

    pub fn with_limits(ttl: Duration, capacity: usize) -> Self {
        Self {
            slots: Arc::new(DashMap::new()),
            ttl,
            capacity: capacity.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn make_room(&self, now: Instant) {
        if self.slots.len() < self.capacity {
            return;
        }
        self.slots.retain(|_, slot| !slot.is_expired(now, self.ttl));

        while self.slots.len() >= self.capacity {
            let oldest = self
                .slots
                .iter()
                .min_by_key(|entry| {
                    let slot = entry.value();
                    (matches!(slot.state, SlotState::InFlight), slot.stamped)
                })
                .map(|entry| entry.key().clone());

            match oldest {
                Some(key) => {
                    self.slots.remove(&key);
                }
                None => break,
            }
        }
    }
}

#[async_trait]
impl IdempotencyStore for InMemoryIdempotencyStore {
    async fn reserve(&self, key: &str, fingerprint: &str) -> Reservation {
        let now = Instant::now();
        if !self.slots.contains_key(key) {
            self.make_room(now);
        }

        let fresh = Slot {
            fingerprint: fingerprint.to_string(),
            state: SlotState::InFlight,
            stamped: now,
        };

        match self.slots.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_expired(now, self.ttl) {
                    occupied.insert(fresh);
                    Reservation::Acquired
                } else {
                    occupied.get().answer(fingerprint)
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(fresh);
                Reservation::Acquired
            }
        }
    }

    async fn complete(&self, key: &str, response: StoredResponse) {
        if let Some(mut slot) = self.slots.get_mut(key) {
            slot.state = SlotState::Done(response);
            slot.stamped = Instant::now();
        }
    }

    async fn release(&self, key: &str) {
        self.slots
            .remove_if(key, |_, slot| matches!(slot.state, SlotState::InFlight));
    }
}
