//! Assignable sets and access assignments.
//!
//! An [`AssignableSet`] is what a granting actor may hand to a subordinate.
//! An [`AccessAssignment`] is the persisted `{capabilityId: bool}` map, always
//! restricted to an assignable set by the codec in `capmenu-core`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::capability::{CapabilityId, Scope};

/// One toggle the actor may assign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignableEntry {
    pub id: CapabilityId,
    /// Registry label used by the form and by the label codec.
    pub label: String,
    /// The catalog scope the id was first reached through.
    pub scope: Scope,
}

/// Ordered, id-deduplicated set of assignable capabilities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssignableSet {
    entries: Vec<AssignableEntry>,
}

impl AssignableSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `entry` unless its id is already present. Returns whether it was added.
    pub fn insert(&mut self, entry: AssignableEntry) -> bool {
        if self.contains(&entry.id) {
            return false;
        }
        self.entries.push(entry);
        true
    }

    pub fn contains(&self, id: &CapabilityId) -> bool {
        self.entries.iter().any(|e| &e.id == id)
    }

    pub fn get(&self, id: &CapabilityId) -> Option<&AssignableEntry> {
        self.entries.iter().find(|e| &e.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AssignableEntry> {
        self.entries.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &CapabilityId> {
        self.entries.iter().map(|e| &e.id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Partition the entries by scope, preserving order inside each group.
    pub fn grouped(&self) -> BTreeMap<Scope, Vec<&AssignableEntry>> {
        let mut groups: BTreeMap<Scope, Vec<&AssignableEntry>> = BTreeMap::new();
        for entry in &self.entries {
            groups.entry(entry.scope).or_default().push(entry);
        }
        groups
    }

    /// Case-insensitive label substring filter. A blank query returns everything.
    pub fn search(&self, query: &str) -> Vec<&AssignableEntry> {
        let query = query.trim().to_lowercase();
        self.entries
            .iter()
            .filter(|e| query.is_empty() || e.label.to_lowercase().contains(&query))
            .collect()
    }
}

/// The persisted per-employee access map.
///
/// Serializes as the flat `{capabilityId: bool}` object used as the PATCH
/// request body, one key per assignable capability.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessAssignment {
    flags: BTreeMap<CapabilityId, bool>,
}

impl AccessAssignment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: CapabilityId, flag: bool) {
        self.flags.insert(id, flag);
    }

    /// `None` when the id is not part of this assignment.
    pub fn get(&self, id: &CapabilityId) -> Option<bool> {
        self.flags.get(id).copied()
    }

    /// Flip one toggle. Ids outside the assignment are left alone and yield `None`.
    pub fn toggle(&mut self, id: &CapabilityId) -> Option<bool> {
        let flag = self.flags.get_mut(id)?;
        *flag = !*flag;
        Some(*flag)
    }

    /// Set every listed id that is part of this assignment to `flag`.
    pub fn set_all<'a, I>(&mut self, ids: I, flag: bool)
    where
        I: IntoIterator<Item = &'a CapabilityId>,
    {
        for id in ids {
            if let Some(slot) = self.flags.get_mut(id) {
                *slot = flag;
            }
        }
    }

    pub fn granted_ids(&self) -> impl Iterator<Item = &CapabilityId> {
        self.flags.iter().filter(|(_, flag)| **flag).map(|(id, _)| id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CapabilityId, bool)> {
        self.flags.iter().map(|(id, flag)| (id, *flag))
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Render the flat JSON body sent to the persistence collaborator.
    pub fn to_patch_body(&self) -> Value {
        Value::Object(
            self.flags
                .iter()
                .map(|(id, flag)| (id.0.clone(), Value::Bool(*flag)))
                .collect(),
        )
    }
}
