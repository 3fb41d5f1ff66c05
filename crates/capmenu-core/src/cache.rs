//! Memoizing wrapper around `MenuEngine`.
//!
//! Resolution is cheap but linear in catalog size, and UI surfaces tend to
//! ask for the same subject repeatedly. `CachedEngine` memoizes menus and
//! assignable sets keyed by `MenuEngine::fingerprint`. Since the engine is
//! deterministic, a cache hit is always identical to a recomputation.
//!
//! Each map holds at most `capacity` entries. When a map is full it is
//! flushed before the next insert.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use tracing::debug;

use capmenu_contracts::{access::AssignableSet, context::SubjectContext, menu::MenuNode};

use crate::engine::MenuEngine;

/// Entries per map when no capacity is given.
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

pub struct CachedEngine {
    engine: MenuEngine,
    capacity: usize,
    menus: Mutex<HashMap<String, Vec<MenuNode>>>,
    assignables: Mutex<HashMap<String, AssignableSet>>,
}

impl CachedEngine {
    pub fn new(engine: MenuEngine) -> Self {
        Self::with_capacity(engine, DEFAULT_CACHE_CAPACITY)
    }

    /// A capacity of zero is treated as one.
    pub fn with_capacity(engine: MenuEngine, capacity: usize) -> Self {
        Self {
            engine,
            capacity: capacity.max(1),
            menus: Mutex::new(HashMap::new()),
            assignables: Mutex::new(HashMap::new()),
        }
    }

    pub fn engine(&self) -> &MenuEngine {
        &self.engine
    }

    pub fn resolve_menu(&self, ctx: &SubjectContext) -> Vec<MenuNode> {
        let key = self.engine.fingerprint(ctx);
        let mut menus = self.menus.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(hit) = menus.get(&key) {
            debug!(fingerprint = %key, "menu cache hit");
            return hit.clone();
        }
        let menu = self.engine.resolve_menu(ctx);
        make_room(&mut menus, self.capacity, "menu");
        menus.insert(key, menu.clone());
        menu
    }

    pub fn resolve_assignable(&self, actor: &SubjectContext) -> AssignableSet {
        let key = self.engine.fingerprint(actor);
        let mut sets = self.assignables.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(hit) = sets.get(&key) {
            debug!(fingerprint = %key, "assignable cache hit");
            return hit.clone();
        }
        let set = self.engine.resolve_assignable(actor);
        make_room(&mut sets, self.capacity, "assignable");
        sets.insert(key, set.clone());
        set
    }

    /// Number of memoized menus and assignable sets.
    pub fn cached_counts(&self) -> (usize, usize) {
        let menus = self.menus.lock().unwrap_or_else(PoisonError::into_inner).len();
        let sets = self.assignables.lock().unwrap_or_else(PoisonError::into_inner).len();
        (menus, sets)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&self) {
        self.menus.lock().unwrap_or_else(PoisonError::into_inner).clear();
        self.assignables.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

fn make_room<V>(map: &mut HashMap<String, V>, capacity: usize, kind: &str) {
    if map.len() >= capacity {
        debug!(kind = %kind, flushed = map.len(), "cache full, flushing");
        map.clear();
    }
}
