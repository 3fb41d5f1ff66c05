//! Hide rule types and configuration schema.
//!
//! A `HideRuleConfig` is deserialized from TOML and holds a list of
//! `HideRule`s. Unlike a first-match table, every matching rule contributes:
//! the evaluator unions the `hide` blocks of all rules whose `when` holds.

use serde::{Deserialize, Serialize};

use capmenu_contracts::{context::Tier, menu::RoutePath};

/// Conditions under which a rule fires.
///
/// Every field is optional and an absent field places no constraint, so a
/// rule with an empty `when` always fires. Present fields are combined with
/// AND.
///
/// Example in TOML:
/// ```toml
/// when = { sector = "Кафе" }
/// when = { tier = "Старт" }
/// when = { tier_not_in = ["Премиум"] }
/// when = {}
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleCondition {
    /// Sector display name or key. Normalized when the rules are loaded.
    #[serde(default)]
    pub sector: Option<String>,

    /// Exact tier name.
    #[serde(default)]
    pub tier: Option<Tier>,

    /// The tier must be one of these.
    #[serde(default)]
    pub tier_in: Option<Vec<Tier>>,

    /// The tier must be none of these.
    #[serde(default)]
    pub tier_not_in: Option<Vec<Tier>>,
}

impl RuleCondition {
    /// Return true if every present field is satisfied.
    ///
    /// `sector_key` is compared against the rule's (already normalized)
    /// sector; tiers compare by exact name.
    pub fn matches(&self, sector_key: &str, tier: &Tier) -> bool {
        let sector_ok = self.sector.as_deref().map_or(true, |s| s == sector_key);
        let tier_ok = self.tier.as_ref().map_or(true, |t| t == tier);
        let tier_in_ok = self.tier_in.as_ref().map_or(true, |set| set.contains(tier));
        let tier_not_in_ok = self
            .tier_not_in
            .as_ref()
            .map_or(true, |set| !set.contains(tier));
        sector_ok && tier_ok && tier_in_ok && tier_not_in_ok
    }

    pub fn is_unconditional(&self) -> bool {
        self == &Self::default()
    }
}

/// What a matching rule suppresses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HideSpec {
    /// Entry labels to hide, compared exactly.
    #[serde(default)]
    pub labels: Vec<String>,

    /// Route patterns. An entry is hidden when its route contains one of
    /// these as a contiguous run of segments.
    #[serde(default)]
    pub path_contains: Vec<RoutePath>,
}

/// A single hide rule loaded from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HideRule {
    /// Stable identifier used in logs and error messages.
    pub id: String,

    /// Human-readable explanation of what this rule hides and why.
    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub when: RuleCondition,

    #[serde(default)]
    pub hide: HideSpec,
}

impl HideRule {
    /// Return true if this rule fires for `sector_key` and `tier`.
    pub fn matches(&self, sector_key: &str, tier: &Tier) -> bool {
        self.when.matches(sector_key, tier)
    }
}

/// The top-level structure deserialized from a TOML hide-rule file.
///
/// Example:
/// ```toml
/// [[rules]]
/// id = "global-departments"
/// description = "Departments are never shown in the sidebar"
/// when = {}
/// hide = { labels = ["Отделы"] }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HideRuleConfig {
    #[serde(default)]
    pub rules: Vec<HideRule>,
}
