use std::{
    collections::HashMap,
    sync::{Mutex, RwLock},
};

use time::OffsetDateTime;

/// Per-identity counting window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitWindow {
    pub window_start: OffsetDateTime,
    pub count: u32,
}

/// Backing storage for rate-limit windows.
///
/// `update` must run `apply` atomically for the given identity: concurrent
/// calls for the same identity are serialized, calls for different
/// identities are not.
pub trait WindowStore: Send + Sync {
    fn update(
        &self,
        identity: &str,
        apply: &mut dyn FnMut(Option<RateLimitWindow>) -> RateLimitWindow,
    ) -> RateLimitWindow;

    /// Drop every window that started at or before `cutoff`.
    fn purge(&self, cutoff: OffsetDateTime);

    fn tracked(&self) -> usize;
}

type Slot = Mutex<Option<RateLimitWindow>>;

/// Process-local store. An update keeps the map's read guard while it holds
/// the identity's slot lock, so `purge` cannot drop a slot mid-update. The
/// map is write-locked only to insert a new identity or to purge.
#[derive(Debug, Default)]
pub struct InMemoryWindowStore {
    slots: RwLock<HashMap<String, Slot>>,
}

impl InMemoryWindowStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn apply_to(
    slot: &Slot,
    apply: &mut dyn FnMut(Option<RateLimitWindow>) -> RateLimitWindow,
) -> RateLimitWindow {
    let mut current = slot.lock().unwrap_or_else(|e| e.into_inner());
    let next = apply(*current);
    *current = Some(next);
    next
}

impl WindowStore for InMemoryWindowStore {
    fn update(
        &self,
        identity: &str,
        apply: &mut dyn FnMut(Option<RateLimitWindow>) -> RateLimitWindow,
    ) -> RateLimitWindow {
        {
            let slots = self.slots.read().unwrap_or_else(|e| e.into_inner());
            if let Some(slot) = slots.get(identity) {
                return apply_to(slot, apply);
            }
        }
        let mut slots = self.slots.write().unwrap_or_else(|e| e.into_inner());
        apply_to(slots.entry(identity.to_owned()).or_default(), apply)
    }

    fn purge(&self, cutoff: OffsetDateTime) {
        let mut slots = self.slots.write().unwrap_or_else(|e| e.into_inner());
        slots.retain(|_, slot| {
            let window = slot.get_mut().unwrap_or_else(|e| e.into_inner());
            matches!(*window, Some(w) if w.window_start > cutoff)
        });
    }

    fn tracked(&self) -> usize {
        self.slots.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}
