//! Access assignment codec.
//!
//! Converts between the label list shown in the access form and the
//! persisted `{capabilityId: bool}` map. Both directions iterate the
//! assignable set only: labels and ids outside it are dropped on the way in
//! and never produced on the way out, so persisted state cannot encode a
//! capability the actor no longer exposes.

use serde_json::Value;
use tracing::debug;

use capmenu_contracts::access::{AccessAssignment, AssignableSet};

/// Labels of every capability set to `true` in `map`, in assignable order.
///
/// Labels shared by several assignable ids are emitted once.
pub fn to_labels(map: &AccessAssignment, assignable: &AssignableSet) -> Vec<String> {
    let mut labels: Vec<String> = Vec::new();
    for entry in assignable.iter() {
        if map.get(&entry.id) == Some(true) && !labels.contains(&entry.label) {
            labels.push(entry.label.clone());
        }
    }
    labels
}

/// Build the persisted map from a label list: one key per assignable id,
/// `true` iff its label appears in `labels`.
pub fn to_map<S: AsRef<str>>(labels: &[S], assignable: &AssignableSet) -> AccessAssignment {
    let mut map = AccessAssignment::new();
    for entry in assignable.iter() {
        let selected = labels.iter().any(|l| l.as_ref() == entry.label);
        map.insert(entry.id.clone(), selected);
    }

    let dropped = labels
        .iter()
        .filter(|l| !assignable.iter().any(|e| e.label == l.as_ref()))
        .count();
    if dropped > 0 {
        debug!(dropped, "labels outside the assignable set were ignored");
    }
    map
}

/// Restrict a persisted map (for example a profile's current flags) to the
/// assignable set. Ids missing from `persisted` come back as `false`.
pub fn restrict(persisted: &AccessAssignment, assignable: &AssignableSet) -> AccessAssignment {
    let mut map = AccessAssignment::new();
    for entry in assignable.iter() {
        map.insert(entry.id.clone(), persisted.get(&entry.id).unwrap_or(false));
    }
    map
}

/// Read a flat JSON object of flags (a PATCH body or profile record) and
/// restrict it to the assignable set. Non-boolean values count as `false`.
pub fn from_patch_body(body: &Value, assignable: &AssignableSet) -> AccessAssignment {
    let mut map = AccessAssignment::new();
    for entry in assignable.iter() {
        let flag = body
            .get(entry.id.as_str())
            .and_then(Value::as_bool)
            .unwrap_or(false);
        map.insert(entry.id.clone(), flag);
    }
    map
}
