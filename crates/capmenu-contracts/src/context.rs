//! The per-call subject context.
//!
//! A `SubjectContext` is built fresh for every resolution call from upstream
//! records (organization, user profile, selected sector and tier) and is never
//! mutated by the engine.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    capability::CapabilityId,
    grant::{Grant, GrantMap},
};

/// Role value that marks the organization owner in a profile record.
pub const OWNER_ROLE: &str = "owner";

/// A subscription tier, identified by its display name.
///
/// Tiers are compared by exact name. The only tier with built-in behavior is
/// the degraded [`Tier::START`] offering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tier(pub String);

impl Tier {
    /// Display name of the degraded entry-level tier.
    pub const START: &'static str = "Старт";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn start() -> Self {
        Self(Self::START.to_string())
    }

    pub fn is_start(&self) -> bool {
        self.0 == Self::START
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A missing subscription plan falls back to the Start tier.
impl Default for Tier {
    fn default() -> Self {
        Self::start()
    }
}

/// Everything the engine needs to resolve a menu or an assignable set for one
/// subject.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectContext {
    /// Sector display name or canonical key; the engine normalizes it.
    pub sector: String,
    pub tier: Tier,
    /// Per-user flags from the profile record.
    pub user_grants: GrantMap,
    /// Tenant-wide flags from the organization record.
    pub org_grants: GrantMap,
    /// Profile role, e.g. `"owner"`.
    pub role: Option<String>,
    /// Branch memberships of the profile.
    pub branches: Vec<String>,
}

impl SubjectContext {
    pub fn new(sector: impl Into<String>, tier: Tier) -> Self {
        Self {
            sector: sector.into(),
            tier,
            ..Self::default()
        }
    }

    /// Build a context from raw upstream records.
    ///
    /// `org` and `profile` are flat JSON objects of boolean flags keyed by
    /// capability id. An absent record yields an empty grant map, so every
    /// organization check resolves through the "no policy" branch. The
    /// profile's `role` (string) and `branches` (array of ids) keys are read
    /// as well. A missing tier defaults to Start.
    pub fn from_records(
        org: Option<&Map<String, Value>>,
        profile: Option<&Map<String, Value>>,
        sector: &str,
        tier: Option<&str>,
    ) -> Self {
        let org_grants = org.map(GrantMap::from_record).unwrap_or_default();
        let user_grants = profile.map(GrantMap::from_record).unwrap_or_default();

        let role = profile
            .and_then(|p| p.get("role"))
            .and_then(Value::as_str)
            .map(str::to_string);

        let branches = profile
            .and_then(|p| p.get("branches"))
            .and_then(Value::as_array)
            .map(|list| {
                list.iter()
                    .filter_map(|b| match b {
                        Value::String(s) => Some(s.clone()),
                        Value::Number(n) => Some(n.to_string()),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            sector: sector.to_string(),
            tier: tier
                .filter(|t| !t.trim().is_empty())
                .map(Tier::new)
                .unwrap_or_default(),
            user_grants,
            org_grants,
            role,
            branches,
        }
    }

    pub fn with_user_grant(mut self, id: impl Into<String>, flag: bool) -> Self {
        self.user_grants.set(CapabilityId::new(id), Grant::from(flag));
        self
    }

    pub fn with_org_grant(mut self, id: impl Into<String>, flag: bool) -> Self {
        self.org_grants.set(CapabilityId::new(id), Grant::from(flag));
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_branches<I, S>(mut self, branches: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.branches = branches.into_iter().map(Into::into).collect();
        self
    }

    pub fn user_grant(&self, id: &CapabilityId) -> Grant {
        self.user_grants.get(id)
    }

    pub fn org_grant(&self, id: &CapabilityId) -> Grant {
        self.org_grants.get(id)
    }

    pub fn is_owner(&self) -> bool {
        self.role
            .as_deref()
            .is_some_and(|r| r.eq_ignore_ascii_case(OWNER_ROLE))
    }

    /// True for a non-owner attached to at least one branch. Such subjects
    /// never see branch management.
    pub fn is_branch_bound(&self) -> bool {
        !self.is_owner() && !self.branches.is_empty()
    }
}
