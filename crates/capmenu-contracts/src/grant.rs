//! Tri-state grant values and grant maps.
//!
//! Organization records distinguish "no policy" (key absent) from an explicit
//! `false`. That distinction decides whether a user-level grant may take
//! effect, so it is modelled as [`Grant::Unset`] instead of collapsing to a
//! boolean.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::capability::CapabilityId;

/// The state of a single boolean flag in a user or organization record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grant {
    /// The flag is present and `true`.
    Granted,
    /// The flag is present and `false`.
    Denied,
    /// The flag is absent from the record.
    #[default]
    Unset,
}

impl Grant {
    pub fn is_granted(self) -> bool {
        self == Grant::Granted
    }

    pub fn is_denied(self) -> bool {
        self == Grant::Denied
    }

    pub fn is_unset(self) -> bool {
        self == Grant::Unset
    }
}

impl From<bool> for Grant {
    fn from(flag: bool) -> Self {
        if flag {
            Grant::Granted
        } else {
            Grant::Denied
        }
    }
}

impl From<Option<bool>> for Grant {
    fn from(flag: Option<bool>) -> Self {
        flag.map(Grant::from).unwrap_or(Grant::Unset)
    }
}

/// A finite map from capability id to [`Grant`].
///
/// Lookups for ids that were never set return [`Grant::Unset`]. Backed by a
/// `BTreeMap` so iteration and serialization order are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GrantMap {
    inner: BTreeMap<CapabilityId, Grant>,
}

impl GrantMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a map from a flat JSON record such as an organization or profile
    /// payload. Boolean values become `Granted`/`Denied`; keys holding any
    /// other JSON type carry no policy and are skipped.
    pub fn from_record(record: &Map<String, Value>) -> Self {
        let inner = record
            .iter()
            .filter_map(|(key, value)| {
                value
                    .as_bool()
                    .map(|flag| (CapabilityId::new(key.as_str()), Grant::from(flag)))
            })
            .collect();
        Self { inner }
    }

    pub fn set(&mut self, id: CapabilityId, grant: Grant) {
        if grant.is_unset() {
            self.inner.remove(&id);
        } else {
            self.inner.insert(id, grant);
        }
    }

    pub fn get(&self, id: &CapabilityId) -> Grant {
        self.inner.get(id).copied().unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CapabilityId, Grant)> {
        self.inner.iter().map(|(id, grant)| (id, *grant))
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl FromIterator<(CapabilityId, bool)> for GrantMap {
    fn from_iter<I: IntoIterator<Item = (CapabilityId, bool)>>(iter: I) -> Self {
        let mut map = GrantMap::new();
        for (id, flag) in iter {
            map.set(id, Grant::from(flag));
        }
        map
    }
}
