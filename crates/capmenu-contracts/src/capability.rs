//! Capability identifiers and registry records.
//!
//! A capability is an atomic, backend-recognized permission id that controls
//! the visibility of one feature. Labels are for display only and are not
//! unique: several sectors reuse the same label for different ids, and several
//! menu entries may require the same id.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable backend key for a capability, e.g. `CapabilityId("can_view_cashbox")`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilityId(pub String);

impl CapabilityId {
    /// Construct an id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CapabilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CapabilityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Where in the catalog a capability (or the entry that reached it) lives.
///
/// The declaration order is the display order used when grouping an
/// assignable set for the access-assignment form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Available to every sector.
    Baseline,
    /// Listed under one canonical sector key.
    Sector,
    /// Offered through the "additional services" group.
    Additional,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Scope::Baseline => "baseline",
            Scope::Sector => "sector",
            Scope::Additional => "additional",
        };
        f.write_str(name)
    }
}

/// One record of the capability registry.
///
/// The registry is the single list of ids the engine recognizes. Every
/// `capability` reference in the catalog must resolve to a registry record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capability {
    pub id: CapabilityId,
    /// Human-facing toggle label shown in the access-assignment form.
    pub label: String,
    pub scope: Scope,
}
