use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

struct Entry<T> {
    records: Arc<Vec<T>>,
    /// `None` once the entry was expired by hand.
    stored_at: Option<Instant>,
}

struct State<T> {
    entry: Option<Entry<T>>,
    generation: u64,
}

/// Snapshot cache for one collection with a freshness window.
///
/// Every write-through or invalidation bumps a generation counter. A read
/// captures the generation before touching disk and may only fill the cache
/// if nothing moved in the meantime, so a slow read never overwrites a newer
/// commit.
pub struct TtlCache<T> {
    ttl: Duration,
    state: Mutex<State<T>>,
}

impl<T> TtlCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            state: Mutex::new(State {
                entry: None,
                generation: 0,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The cached snapshot if it is younger than the TTL.
    pub fn fresh(&self) -> Option<Arc<Vec<T>>> {
        let state = self.lock();
        let entry = state.entry.as_ref()?;
        match entry.stored_at {
            Some(at) if at.elapsed() < self.ttl => Some(entry.records.clone()),
            _ => None,
        }
    }

    /// The last snapshot seen, regardless of age.
    pub fn last_known(&self) -> Option<Arc<Vec<T>>> {
        self.lock().entry.as_ref().map(|e| e.records.clone())
    }

    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Stores a freshly read snapshot unless the cache moved past
    /// `generation`. Returns whether the snapshot was stored.
    pub fn fill(&self, generation: u64, records: Arc<Vec<T>>) -> bool {
        let mut state = self.lock();
        if state.generation != generation {
            return false;
        }
        state.entry = Some(Entry {
            records,
            stored_at: Some(Instant::now()),
        });
        true
    }

    /// Write-through after a successful commit.
    pub fn replace(&self, records: Arc<Vec<T>>) {
        let mut state = self.lock();
        state.generation += 1;
        state.entry = Some(Entry {
            records,
            stored_at: Some(Instant::now()),
        });
    }

    /// Forces the next lookup to miss. The last snapshot is kept as a
    /// fallback for failed reads.
    pub fn invalidate(&self) {
        let mut state = self.lock();
        state.generation += 1;
        if let Some(entry) = state.entry.as_mut() {
            entry.stored_at = None;
        }
    }
}
