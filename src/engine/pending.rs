use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use super::handler::ResultCallback;

/// Acquire a mutex guard, ignoring poisoning.
///
/// A panic inside a handler cannot leave the map half-updated: every
/// operation is a single insert or remove performed before any callback runs.
fn lock_ignore_poison<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    // ---
    match m.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

struct PendingEntry {
    callback: Box<dyn ResultCallback>,
    registered_at: Instant,
}

/// Bounded table of requests that were sent and are awaiting a reply.
///
/// Maps a correlation id to the callback that will receive the reply. The
/// capacity check and the insert happen under one lock, so concurrent
/// registrations cannot push the table past its cap. Removal via [`take`]
/// hands the callback to exactly one caller.
///
/// Entries for requests that are never answered stay until they are
/// removed explicitly with [`remove`] or [`remove_older_than`].
///
/// [`take`]: PendingRequests::take
/// [`remove`]: PendingRequests::remove
/// [`remove_older_than`]: PendingRequests::remove_older_than
pub struct PendingRequests {
    // ---
    capacity: usize,
    requests: Mutex<HashMap<String, PendingEntry>>,
}

impl PendingRequests {
    /// Create an empty table holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            requests: Mutex::new(HashMap::new()),
        }
    }

    /// Register a callback for `correlation_id`.
    ///
    /// Returns `false` without inserting when the table is full or the id
    /// is already pending; the existing entry is left untouched.
    pub fn try_register(&self, correlation_id: &str, callback: Box<dyn ResultCallback>) -> bool {
        // ---
        let mut requests = lock_ignore_poison(&self.requests);

        if requests.len() >= self.capacity {
            return false;
        }

        match requests.entry(correlation_id.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(PendingEntry {
                    callback,
                    registered_at: Instant::now(),
                });
                true
            }
        }
    }

    /// Remove and return the callback for `correlation_id`, if any.
    pub fn take(&self, correlation_id: &str) -> Option<Box<dyn ResultCallback>> {
        // ---
        lock_ignore_poison(&self.requests)
            .remove(correlation_id)
            .map(|entry| entry.callback)
    }

    /// Drop a pending entry without invoking its callback.
    ///
    /// Returns `true` if an entry was removed.
    pub fn remove(&self, correlation_id: &str) -> bool {
        self.take(correlation_id).is_some()
    }

    /// Drop every entry registered more than `max_age` ago.
    ///
    /// Returns the number of entries removed. Their callbacks are not invoked.
    pub fn remove_older_than(&self, max_age: Duration) -> usize {
        // ---
        let now = Instant::now();
        let mut requests = lock_ignore_poison(&self.requests);
        let before = requests.len();

        requests.retain(|_, entry| now.duration_since(entry.registered_at) <= max_age);

        before - requests.len()
    }

    /// Whether `correlation_id` is currently pending.
    pub fn contains(&self, correlation_id: &str) -> bool {
        lock_ignore_poison(&self.requests).contains_key(correlation_id)
    }

    /// Number of outstanding entries.
    pub fn len(&self) -> usize {
        lock_ignore_poison(&self.requests).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of entries the table admits.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
