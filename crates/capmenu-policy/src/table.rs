//! The capability id → policy class table.
//!
//! Special-cased capabilities are listed once, by class, in a TOML document:
//!
//! ```toml
//! company_only = ["can_view_whatsapp", "can_view_documents"]
//! profile_only = ["can_view_market_scales"]
//! hard_gated   = ["can_view_branch"]
//! ```
//!
//! Ids not listed fall back to the engine's default either-grants class.
//! `hard_gated` is orthogonal to the class lists: a gated id keeps its class
//! (either-grants when it appears in no class list).

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use capmenu_contracts::{
    capability::CapabilityId,
    error::{CapMenuError, CapMenuResult},
    policy::{CapabilityPolicy, PolicyClass},
};
use capmenu_core::traits::GrantPolicy;

/// The policy class table as written in TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyTableConfig {
    #[serde(default)]
    pub company_only: Vec<CapabilityId>,
    #[serde(default)]
    pub profile_only: Vec<CapabilityId>,
    #[serde(default)]
    pub hard_gated: Vec<CapabilityId>,
}

/// A `GrantPolicy` backed by a validated class table.
#[derive(Debug, Clone, Default)]
pub struct PolicyTable {
    entries: BTreeMap<CapabilityId, CapabilityPolicy>,
}

impl PolicyTable {
    /// Build the table.
    ///
    /// # Errors
    ///
    /// - `DuplicateEntry` when an id is repeated inside one list
    /// - `PolicyConflict` when an id is both company-only and profile-only
    pub fn load(config: PolicyTableConfig) -> CapMenuResult<Self> {
        let company = unique("company_only", &config.company_only)?;
        let profile = unique("profile_only", &config.profile_only)?;
        let gated = unique("hard_gated", &config.hard_gated)?;

        if let Some(both) = company.intersection(&profile).next() {
            return Err(CapMenuError::PolicyConflict {
                capability: both.0.clone(),
                reason: "listed as both company-only and profile-only".to_string(),
            });
        }

        let mut entries = BTreeMap::new();
        for id in &company {
            entries.insert((*id).clone(), CapabilityPolicy::new(PolicyClass::CompanyOnly));
        }
        for id in &profile {
            entries.insert((*id).clone(), CapabilityPolicy::new(PolicyClass::ProfileOnly));
        }
        for id in &gated {
            let policy = entries
                .entry((*id).clone())
                .or_insert_with(|| CapabilityPolicy::new(PolicyClass::EitherGrants));
            policy.hard_gated = true;
        }

        info!(
            company_only = company.len(),
            profile_only = profile.len(),
            hard_gated = gated.len(),
            "policy table loaded"
        );
        Ok(Self { entries })
    }

    pub fn from_toml_str(s: &str) -> CapMenuResult<Self> {
        let config: PolicyTableConfig = toml::from_str(s).map_err(|e| CapMenuError::ConfigError {
            reason: format!("failed to parse policy table TOML: {}", e),
        })?;
        Self::load(config)
    }

    pub fn from_file(path: &Path) -> CapMenuResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| CapMenuError::ConfigError {
            reason: format!("failed to read policy table file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn gated_ids(&self) -> Vec<&CapabilityId> {
        self.entries
            .iter()
            .filter(|(_, p)| p.hard_gated)
            .map(|(id, _)| id)
            .collect()
    }
}

impl GrantPolicy for PolicyTable {
    fn policy_for(&self, id: &CapabilityId) -> Option<CapabilityPolicy> {
        self.entries.get(id).copied()
    }

    fn classified_ids(&self) -> Vec<CapabilityId> {
        self.entries.keys().cloned().collect()
    }
}

fn unique<'a>(list: &str, ids: &'a [CapabilityId]) -> CapMenuResult<BTreeSet<&'a CapabilityId>> {
    let mut set = BTreeSet::new();
    for id in ids {
        if !set.insert(id) {
            return Err(CapMenuError::DuplicateEntry {
                scope: format!("policy table {list}"),
                path: id.0.clone(),
            });
        }
    }
    Ok(set)
}
