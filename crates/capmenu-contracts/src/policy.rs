//! Grant policy classes and suppression sets.
//!
//! The grant resolver consults a single table mapping capability id to a
//! [`CapabilityPolicy`]. The hide-rule evaluator produces a
//! [`SuppressionSet`] for a `(sector, tier)` pair.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::menu::RoutePath;

/// How user-level and organization-level flags combine for one capability.
///
/// Expressed in TOML as kebab-case strings:
/// ```toml
/// policy = "either-grants"
/// policy = "company-only"
/// policy = "profile-only"
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyClass {
    /// Explicit organization denial wins; otherwise either flag grants.
    #[default]
    EitherGrants,
    /// Only the organization flag counts. The user flag is ignored.
    CompanyOnly,
    /// Only the user flag counts. The organization flag is ignored.
    ProfileOnly,
}

impl PolicyClass {
    /// Classes whose visibility may never be inferred from an umbrella grant.
    pub fn is_explicit_only(self) -> bool {
        matches!(self, PolicyClass::CompanyOnly | PolicyClass::ProfileOnly)
    }
}

/// The full grant policy for one capability id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityPolicy {
    pub class: PolicyClass,
    /// When set, the organization flag must be explicitly `true` on top of
    /// whatever `class` decides.
    #[serde(default)]
    pub hard_gated: bool,
}

impl CapabilityPolicy {
    pub fn new(class: PolicyClass) -> Self {
        Self { class, hard_gated: false }
    }

    pub fn gated(mut self) -> Self {
        self.hard_gated = true;
        self
    }
}

/// The union of every matching hide rule for one `(sector, tier)` pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuppressionSet {
    /// Entry labels to hide, deduplicated.
    pub labels: BTreeSet<String>,
    /// Route patterns to hide, in rule order. Duplicates are harmless.
    pub path_patterns: Vec<RoutePath>,
}

impl SuppressionSet {
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty() && self.path_patterns.is_empty()
    }

    /// Return true if an entry with this label and path must be hidden.
    pub fn hides(&self, label: &str, path: &RoutePath) -> bool {
        self.labels.contains(label) || self.path_patterns.iter().any(|p| path.contains(p))
    }

    /// Union one rule's labels and route patterns into this set.
    pub fn absorb(&mut self, labels: &[String], path_patterns: &[RoutePath]) {
        self.labels.extend(labels.iter().cloned());
        self.path_patterns.extend(path_patterns.iter().cloned());
    }
}
