use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Advisory per-key action locks serializing reconciliation passes.
///
/// A key is the (entity type, entity id) pair; each key holds a set of
/// in-progress action names. Acquisition is a nonblocking test-and-set: a
/// caller that fails to acquire abandons its pass immediately, and a caller
/// that finds an ancestor's key held also abandons (the ancestor's pass
/// covers the child). There is no ordering between failed acquirers because
/// nobody waits.
///
/// One instance per engine, living as long as the engine.
#[derive(Debug, Default)]
pub struct LockTable {
    held: Mutex<HashMap<String, HashSet<String>>>,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(entity_type: &str, id: &str) -> String {
        format!("{entity_type}:{id}")
    }

    /// True iff this caller now holds (type, id, action).
    pub fn try_acquire(&self, entity_type: &str, id: &str, action: &str) -> bool {
        let mut held = self.held.lock().unwrap_or_else(|e| e.into_inner());
        held.entry(Self::key(entity_type, id))
            .or_default()
            .insert(action.to_string())
    }

    /// True iff the action was held and is now released.
    pub fn release(&self, entity_type: &str, id: &str, action: &str) -> bool {
        let mut held = self.held.lock().unwrap_or_else(|e| e.into_inner());
        match held.get_mut(&Self::key(entity_type, id)) {
            Some(actions) => actions.remove(action),
            None => false,
        }
    }

    pub fn is_held(&self, entity_type: &str, id: &str, action: &str) -> bool {
        let held = self.held.lock().unwrap_or_else(|e| e.into_inner());
        held.get(&Self::key(entity_type, id))
            .map(|actions| actions.contains(action))
            .unwrap_or(false)
    }

    /// Acquire with guaranteed release: the returned guard releases the key
    /// on every exit path, including unwinding.
    pub fn guard<'a>(&'a self, entity_type: &str, id: &str, action: &str) -> Option<LockGuard<'a>> {
        if self.try_acquire(entity_type, id, action) {
            Some(LockGuard {
                table: self,
                entity_type: entity_type.to_string(),
                id: id.to_string(),
                action: action.to_string(),
            })
        } else {
            None
        }
    }
}

/// Scoped holder of one (type, id, action) key.
#[derive(Debug)]
pub struct LockGuard<'a> {
    table: &'a LockTable,
    entity_type: String,
    id: String,
    action: String,
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        self.table.release(&self.entity_type, &self.id, &self.action);
    }
}
