//! # capmenu-policy
//!
//! TOML-driven rule tables for the capability menu engine.
//!
//! ## Overview
//!
//! This crate provides the two implementations the engine is normally built
//! with:
//!
//! - [`TomlHideRules`] implements
//!   [`SuppressionPolicy`](capmenu_core::traits::SuppressionPolicy). Every
//!   rule whose `when` holds contributes to the suppression set; there is no
//!   first-match short circuit.
//! - [`PolicyTable`] implements
//!   [`GrantPolicy`](capmenu_core::traits::GrantPolicy) from a short list of
//!   company-only, profile-only and hard-gated capability ids.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::path::Path;
//! use capmenu_policy::{PolicyTable, TomlHideRules};
//!
//! let rules = TomlHideRules::from_file(Path::new("config/hide_rules.toml"), &normalizer)?;
//! let table = PolicyTable::from_file(Path::new("config/policy.toml"))?;
//! // Pass both to `capmenu_core::MenuEngine::new(...)`.
//! ```

pub mod evaluator;
pub mod rule;
pub mod table;

pub use evaluator::TomlHideRules;
pub use rule::{HideRule, HideRuleConfig, HideSpec, RuleCondition};
pub use table::{PolicyTable, PolicyTableConfig};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use capmenu_contracts::{
        capability::CapabilityId,
        context::Tier,
        error::CapMenuError,
        menu::RoutePath,
        policy::PolicyClass,
    };
    use capmenu_core::{
        sector::{AliasConfig, SectorNormalizer},
        traits::{GrantPolicy, SuppressionPolicy},
    };

    use crate::{PolicyTable, TomlHideRules};

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn normalizer() -> SectorNormalizer {
        let mut aliases = BTreeMap::new();
        aliases.insert("Кафе".to_string(), "cafe".to_string());
        aliases.insert("Строительная компания".to_string(), "building".to_string());
        aliases.insert("Архитектура и дизайн".to_string(), "building".to_string());
        SectorNormalizer::new(AliasConfig { aliases }).unwrap()
    }

    fn rules(toml: &str) -> TomlHideRules {
        TomlHideRules::from_toml_str(toml, &normalizer()).unwrap()
    }

    fn tier(name: &str) -> Tier {
        Tier::new(name)
    }

    const RULES: &str = r#"
        [[rules]]
        id = "global"
        description = "Departments are never listed"
        when = {}
        hide = { labels = ["Отделы", "Обзор"] }

        [[rules]]
        id = "start"
        when = { tier = "Старт" }
        hide = { labels = ["Закупки", "Филиалы", "Обзор"] }

        [[rules]]
        id = "standard"
        when = { tier = "Стандарт" }
        hide = { labels = ["Филиалы"], path_contains = ["/crm/debts"] }

        [[rules]]
        id = "cafe"
        when = { sector = "Кафе" }
        hide = { path_contains = ["/crm/zakaz", "/crm/kassa"] }

        [[rules]]
        id = "building"
        when = { sector = "Строительная компания" }
        hide = { path_contains = ["/crm/branch"] }

        [[rules]]
        id = "not-premium"
        when = { tier_not_in = ["Премиум"] }
        hide = { path_contains = ["/crm/debts"] }

        [[rules]]
        id = "paid-cafe"
        when = { sector = "cafe", tier_in = ["Прайм", "Премиум"] }
        hide = { labels = ["Касса"] }
    "#;

    // ── 1. global rules ───────────────────────────────────────────────────────

    /// An empty `when` fires for any sector and tier.
    #[test]
    fn test_global_rule_always_fires() {
        let engine = rules(RULES);
        for (sector, t) in [("market", "Премиум"), ("", "Старт"), ("unknown", "anything")] {
            let set = engine.evaluate(sector, &tier(t));
            assert!(set.labels.contains("Отделы"), "{sector}/{t}");
        }
    }

    // ── 2. union semantics ────────────────────────────────────────────────────

    /// Every matching rule contributes; labels are deduplicated.
    #[test]
    fn test_matching_rules_are_unioned() {
        let engine = rules(RULES);
        let set = engine.evaluate("market", &tier("Старт"));

        let labels: Vec<&str> = set.labels.iter().map(String::as_str).collect();
        assert_eq!(labels.iter().filter(|l| **l == "Обзор").count(), 1);
        assert!(labels.contains(&"Закупки"));
        assert!(labels.contains(&"Филиалы"));
        // From the tier_not_in rule.
        assert_eq!(set.path_patterns, vec![RoutePath::parse("/crm/debts")]);
    }

    /// Route patterns keep rule order; duplicates are kept and harmless.
    #[test]
    fn test_route_patterns_in_rule_order() {
        let engine = rules(RULES);
        let set = engine.evaluate("cafe", &tier("Стандарт"));
        let patterns: Vec<&str> = set.path_patterns.iter().map(RoutePath::as_str).collect();
        assert_eq!(
            patterns,
            vec!["/crm/debts", "/crm/zakaz", "/crm/kassa", "/crm/debts"]
        );
    }

    // ── 3. condition fields ───────────────────────────────────────────────────

    /// `when.sector` is normalized at load, so display names and keys agree.
    #[test]
    fn test_sector_condition_uses_normalized_key() {
        let engine = rules(RULES);
        let set = engine.evaluate("building", &tier("Премиум"));
        assert!(set.hides("Филиалы", &RoutePath::parse("/crm/branch")));

        let other = engine.evaluate("market", &tier("Премиум"));
        assert!(!other.hides("Филиалы", &RoutePath::parse("/crm/branch")));
    }

    #[test]
    fn test_tier_in_and_tier_not_in() {
        let engine = rules(RULES);

        let prime = engine.evaluate("cafe", &tier("Прайм"));
        assert!(prime.labels.contains("Касса"));

        let standard = engine.evaluate("cafe", &tier("Стандарт"));
        assert!(!standard.labels.contains("Касса"));

        let premium = engine.evaluate("market", &tier("Премиум"));
        assert!(premium.path_patterns.is_empty());
    }

    /// The trait method and the inherent evaluator agree.
    #[test]
    fn test_suppression_policy_delegates() {
        let engine = rules(RULES);
        let t = tier("Прайм");
        assert_eq!(engine.suppressions("cafe", &t), engine.evaluate("cafe", &t));
    }

    // ── 4. segment matching ───────────────────────────────────────────────────

    /// Patterns match whole segments, never partial words.
    #[test]
    fn test_route_pattern_is_segment_based() {
        let engine = rules(
            r#"
            [[rules]]
            id = "stock"
            hide = { path_contains = ["/crm/sklad", "crm/clients"] }
        "#,
        );
        let set = engine.evaluate("market", &tier("Прайм"));

        assert!(set.hides("x", &RoutePath::parse("/crm/sklad")));
        assert!(set.hides("x", &RoutePath::parse("/crm/sklad/history")));
        assert!(!set.hides("x", &RoutePath::parse("/crm/sklad-accounting")));
        assert!(set.hides("x", &RoutePath::parse("/crm/clients")));
        assert!(!set.hides("x", &RoutePath::parse("/crm/barber/clients")));
    }

    // ── 5. load errors ────────────────────────────────────────────────────────

    #[test]
    fn test_duplicate_rule_id_rejected() {
        let toml = r#"
            [[rules]]
            id = "same"

            [[rules]]
            id = "same"
        "#;
        let result = TomlHideRules::from_toml_str(toml, &normalizer());
        assert!(matches!(result, Err(CapMenuError::DuplicateEntry { .. })));
    }

    #[test]
    fn test_malformed_rules_are_config_errors() {
        let result = TomlHideRules::from_toml_str("rules = 5", &normalizer());
        match result {
            Err(CapMenuError::ConfigError { reason }) => {
                assert!(reason.contains("failed to parse hide rule TOML"), "got: {reason}");
            }
            other => panic!("expected ConfigError, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_empty_document_has_no_rules() {
        let engine = rules("");
        assert!(engine.rules().is_empty());
        assert!(engine.evaluate("market", &tier("Старт")).is_empty());
    }

    // ── 6. policy table ───────────────────────────────────────────────────────

    const TABLE: &str = r#"
        company_only = ["can_view_whatsapp", "can_view_documents"]
        profile_only = ["can_view_market_scales"]
        hard_gated = ["can_view_branch", "can_view_documents"]
    "#;

    #[test]
    fn test_policy_table_classes() {
        let table = PolicyTable::from_toml_str(TABLE).unwrap();

        let wa = table.policy_for(&CapabilityId::new("can_view_whatsapp")).unwrap();
        assert_eq!(wa.class, PolicyClass::CompanyOnly);
        assert!(!wa.hard_gated);

        let scales = table.policy_for(&CapabilityId::new("can_view_market_scales")).unwrap();
        assert_eq!(scales.class, PolicyClass::ProfileOnly);

        assert!(table.policy_for(&CapabilityId::new("can_view_cashbox")).is_none());
    }

    /// The gate layers on top of the class instead of replacing it.
    #[test]
    fn test_hard_gate_keeps_class() {
        let table = PolicyTable::from_toml_str(TABLE).unwrap();

        let branch = table.policy_for(&CapabilityId::new("can_view_branch")).unwrap();
        assert_eq!(branch.class, PolicyClass::EitherGrants);
        assert!(branch.hard_gated);

        let docs = table.policy_for(&CapabilityId::new("can_view_documents")).unwrap();
        assert_eq!(docs.class, PolicyClass::CompanyOnly);
        assert!(docs.hard_gated);

        assert_eq!(table.gated_ids().len(), 2);
        assert_eq!(table.classified_ids().len(), 4);
    }

    #[test]
    fn test_conflicting_classes_rejected() {
        let toml = r#"
            company_only = ["can_view_telegram"]
            profile_only = ["can_view_telegram"]
        "#;
        match PolicyTable::from_toml_str(toml) {
            Err(CapMenuError::PolicyConflict { capability, .. }) => {
                assert_eq!(capability, "can_view_telegram");
            }
            other => panic!("expected PolicyConflict, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_repeated_id_in_list_rejected() {
        let toml = r#"profile_only = ["can_view_market_label", "can_view_market_label"]"#;
        let result = PolicyTable::from_toml_str(toml);
        assert!(matches!(result, Err(CapMenuError::DuplicateEntry { .. })));
    }
}
