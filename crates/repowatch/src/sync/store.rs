use std::sync::{Arc, Mutex};

use super::types::SnapshotMap;

/// Holds the current snapshot map.
///
/// Readers get a shared immutable map; writers swap in a whole new map, so
/// no reader ever sees a partially updated cycle.
#[derive(Debug, Default)]
pub struct SyncStore {
    current: Mutex<Arc<SnapshotMap>>,
}

impl SyncStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current map.
    pub fn snapshot(&self) -> Arc<SnapshotMap> {
        Arc::clone(&self.current.lock().unwrap_or_else(|e| e.into_inner()))
    }

    /// Replace the whole map, returning the previous one.
    pub fn replace(&self, next: SnapshotMap) -> Arc<SnapshotMap> {
        let mut guard = self.current.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::replace(&mut *guard, Arc::new(next))
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }
}
