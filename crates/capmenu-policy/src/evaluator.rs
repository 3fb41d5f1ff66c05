//! TOML-driven hide-rule evaluator.
//!
//! `TomlHideRules` loads a `HideRuleConfig` from a TOML string or file and
//! implements the `SuppressionPolicy` trait from capmenu-core.
//!
//! Evaluation algorithm:
//!
//! 1. Iterate rules in declaration order.
//! 2. Every rule whose `when` holds for `(sector_key, tier)` contributes its
//!    labels (deduplicated) and route patterns (in order) to the result.
//! 3. Rules with an empty `when` always contribute.
//!
//! Sector names in `when.sector` are normalized once at load time with the
//! same `SectorNormalizer` the engine uses, so rules may be written with
//! display names ("Строительная компания") or canonical keys ("building").

use std::collections::HashSet;
use std::path::Path;

use tracing::{debug, info};

use capmenu_contracts::{
    context::Tier,
    error::{CapMenuError, CapMenuResult},
    policy::SuppressionSet,
};
use capmenu_core::{sector::SectorNormalizer, traits::SuppressionPolicy};

use crate::rule::{HideRule, HideRuleConfig};

/// A `SuppressionPolicy` implementation that reads hide rules from TOML.
///
/// ```rust,ignore
/// use capmenu_policy::TomlHideRules;
///
/// let rules = TomlHideRules::from_file(Path::new("config/hide_rules.toml"), &normalizer)?;
/// ```
#[derive(Debug, Clone)]
pub struct TomlHideRules {
    rules: Vec<HideRule>,
}

impl TomlHideRules {
    /// Validate `config` and normalize its sector conditions.
    ///
    /// Returns `CapMenuError::DuplicateEntry` if two rules share an id.
    pub fn load(config: HideRuleConfig, normalizer: &SectorNormalizer) -> CapMenuResult<Self> {
        let mut ids = HashSet::new();
        let mut rules = Vec::with_capacity(config.rules.len());
        for mut rule in config.rules {
            if !ids.insert(rule.id.clone()) {
                return Err(CapMenuError::DuplicateEntry {
                    scope: "hide rules".to_string(),
                    path: rule.id,
                });
            }
            rule.when.sector = rule.when.sector.map(|s| normalizer.normalize(&s));
            rules.push(rule);
        }

        info!(
            rules = rules.len(),
            global = rules.iter().filter(|r| r.when.is_unconditional()).count(),
            "hide rules loaded"
        );
        Ok(Self { rules })
    }

    /// Parse `s` as TOML and build a `TomlHideRules`.
    ///
    /// Returns `CapMenuError::ConfigError` if the TOML is malformed or does
    /// not match the expected `HideRuleConfig` schema.
    pub fn from_toml_str(s: &str, normalizer: &SectorNormalizer) -> CapMenuResult<Self> {
        let config: HideRuleConfig = toml::from_str(s).map_err(|e| CapMenuError::ConfigError {
            reason: format!("failed to parse hide rule TOML: {}", e),
        })?;
        Self::load(config, normalizer)
    }

    /// Read the file at `path` and parse it as hide-rule configuration.
    pub fn from_file(path: &Path, normalizer: &SectorNormalizer) -> CapMenuResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| CapMenuError::ConfigError {
            reason: format!("failed to read hide rule file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents, normalizer)
    }

    pub fn rules(&self) -> &[HideRule] {
        &self.rules
    }

    /// Union of the `hide` blocks of every rule matching `sector_key` and
    /// `tier`.
    pub fn evaluate(&self, sector_key: &str, tier: &Tier) -> SuppressionSet {
        let mut set = SuppressionSet::default();
        for rule in &self.rules {
            if !rule.matches(sector_key, tier) {
                continue;
            }
            debug!(
                rule_id = %rule.id,
                sector_key = %sector_key,
                tier = %tier.as_str(),
                labels = rule.hide.labels.len(),
                routes = rule.hide.path_contains.len(),
                "hide rule matched"
            );
            set.absorb(&rule.hide.labels, &rule.hide.path_contains);
        }
        set
    }
}

impl SuppressionPolicy for TomlHideRules {
    fn suppressions(&self, sector_key: &str, tier: &Tier) -> SuppressionSet {
        self.evaluate(sector_key, tier)
    }
}
