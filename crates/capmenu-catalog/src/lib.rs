//! # capmenu-catalog
//!
//! The shipped reference configuration for the capability menu engine:
//! the capability catalog, the sidebar hide rules, the policy class table and
//! the sector alias table, embedded as TOML documents.
//!
//! ```rust,ignore
//! let engine = capmenu_catalog::default_engine()?;
//! let menu = engine.resolve_menu(&ctx);
//! ```
//!
//! Every piece can be swapped for a file on disk with [`engine_from_files`],
//! which the demo CLI uses for `validate`.

use std::path::Path;

use tracing::info;

use capmenu_contracts::{
    capability::CapabilityId,
    context::SubjectContext,
    error::CapMenuResult,
    policy::PolicyClass,
};
use capmenu_core::{grant, CachedEngine, Catalog, MenuEngine, PredicateRegistry, SectorNormalizer};
use capmenu_policy::{PolicyTable, TomlHideRules};

pub const CATALOG_TOML: &str = include_str!("../data/catalog.toml");
pub const HIDE_RULES_TOML: &str = include_str!("../data/hide_rules.toml");
pub const POLICY_TOML: &str = include_str!("../data/policy.toml");
pub const SECTORS_TOML: &str = include_str!("../data/sectors.toml");

/// Custom predicate: the subject may see the products module.
pub const HOLDS_PRODUCTS: &str = "holds-products";

/// The named predicates the shipped catalog refers to.
pub fn predicates() -> PredicateRegistry {
    let mut registry = PredicateRegistry::new();
    registry.register(HOLDS_PRODUCTS, |ctx: &SubjectContext| {
        grant::class_allows(
            PolicyClass::EitherGrants,
            &CapabilityId::new("can_view_products"),
            ctx,
        )
    });
    registry
}

pub fn normalizer() -> CapMenuResult<SectorNormalizer> {
    SectorNormalizer::from_toml_str(SECTORS_TOML)
}

pub fn catalog(normalizer: &SectorNormalizer) -> CapMenuResult<Catalog> {
    Catalog::from_toml_str(CATALOG_TOML, normalizer, &predicates())
}

pub fn hide_rules(normalizer: &SectorNormalizer) -> CapMenuResult<TomlHideRules> {
    TomlHideRules::from_toml_str(HIDE_RULES_TOML, normalizer)
}

pub fn policy_table() -> CapMenuResult<PolicyTable> {
    PolicyTable::from_toml_str(POLICY_TOML)
}

/// Build an engine from the embedded documents.
pub fn default_engine() -> CapMenuResult<MenuEngine> {
    engine_from_files(None, None, None)
}

pub fn default_cached_engine() -> CapMenuResult<CachedEngine> {
    default_engine().map(CachedEngine::new)
}

/// Build an engine, reading each document from disk when a path is given
/// and falling back to the embedded copy otherwise.
pub fn engine_from_files(
    catalog_path: Option<&Path>,
    rules_path: Option<&Path>,
    policy_path: Option<&Path>,
) -> CapMenuResult<MenuEngine> {
    let normalizer = normalizer()?;

    let catalog = match catalog_path {
        Some(path) => Catalog::from_file(path, &normalizer, &predicates())?,
        None => catalog(&normalizer)?,
    };
    let rules = match rules_path {
        Some(path) => TomlHideRules::from_file(path, &normalizer)?,
        None => hide_rules(&normalizer)?,
    };
    let table = match policy_path {
        Some(path) => PolicyTable::from_file(path)?,
        None => policy_table()?,
    };

    let engine = MenuEngine::new(catalog, normalizer, Box::new(rules), Box::new(table))?;
    info!(
        version = %engine.catalog().version(),
        sectors = engine.catalog().sector_keys().count(),
        "menu engine ready"
    );
    Ok(engine)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use serde_json::json;

    use capmenu_contracts::{
        capability::{CapabilityId, Scope},
        context::{SubjectContext, Tier},
        menu::{reachable_capabilities, MenuNode},
    };
    use capmenu_core::{codec, MenuEngine};

    use crate::default_engine;

    // ── Helpers ───────────────────────────────────────────────────────────────

    const TIERS: [&str; 5] = ["Старт", "Стандарт", "Прайм", "Премиум", "Корпоративный"];

    const SECTORS: [&str; 16] = [
        "Барбершоп",
        "Гостиница",
        "Школа",
        "Магазин",
        "Цветочный магазин",
        "Кафе",
        "Строительная компания",
        "Ремонтные и отделочные работы",
        "Архитектура и дизайн",
        "Производство",
        "Консалтинг",
        "Склад",
        "Пилорама",
        "Логистика",
        "Космодром",
        "",
    ];

    fn engine() -> MenuEngine {
        default_engine().unwrap()
    }

    /// A user holding every capability in the registry.
    fn everything(engine: &MenuEngine, sector: &str, tier: &str) -> SubjectContext {
        engine
            .catalog()
            .capabilities()
            .fold(SubjectContext::new(sector, Tier::new(tier)), |ctx, c| {
                ctx.with_user_grant(c.id.as_str(), true)
            })
    }

    fn all_labels(menu: &[MenuNode]) -> Vec<&str> {
        menu.iter()
            .flat_map(MenuNode::walk)
            .map(|n| n.label.as_str())
            .collect()
    }

    fn id(s: &str) -> CapabilityId {
        CapabilityId::new(s)
    }

    // ── Shipped data ──────────────────────────────────────────────────────────

    #[test]
    fn shipped_configuration_loads() {
        let engine = engine();
        let catalog = engine.catalog();
        assert!(!catalog.version().is_empty());
        assert!(catalog.sector("barber").len() >= 4);
        assert_eq!(catalog.additional().len(), 8);
        assert!(catalog.contains(catalog.umbrella()));
    }

    #[test]
    fn display_names_select_sector_catalogs() {
        let engine = engine();
        assert_eq!(engine.normalize_sector("Барбершоп"), "barber");
        assert_eq!(engine.normalize_sector("Цветочный  магазин"), "market");
        assert_eq!(engine.normalize_sector("Ремонтные и отделочные работы"), "building");
        assert_eq!(engine.normalize_sector("market"), "market");
        assert_eq!(engine.normalize_sector("Пилорама"), "pilorama");
    }

    // ── Scenarios ─────────────────────────────────────────────────────────────

    /// Barbershop typed with a Latin "p", premium tier, organization
    /// explicitly without branches.
    #[test]
    fn barbershop_premium_without_branches() {
        let engine = engine();
        let org = json!({ "can_view_branch": false });
        let profile = json!({ "can_view_barber_clients": true });
        let ctx = SubjectContext::from_records(
            org.as_object(),
            profile.as_object(),
            "Барбершоp",
            Some("Премиум"),
        );

        let menu = engine.resolve_menu(&ctx);
        let clients = menu
            .iter()
            .find(|n| n.path.as_str() == "/crm/barber/clients")
            .expect("barbershop clients entry");
        assert_eq!(clients.required_capability, Some(id("can_view_barber_clients")));

        let caps = reachable_capabilities(&menu);
        assert!(!caps.contains(&&id("can_view_branch")));
        assert!(!all_labels(&menu).contains(&"Филиалы"));

        let assignable = engine.resolve_assignable(&ctx);
        assert!(assignable.contains(&id("can_view_barber_clients")));
        assert!(!assignable.contains(&id("can_view_branch")));
        assert_eq!(
            assignable.get(&id("can_view_barber_clients")).map(|e| e.label.as_str()),
            Some("Клиенты Барбершопа")
        );
    }

    /// The Start tier only ever offers the allow-listed sector routes.
    #[test]
    fn store_on_start_tier_gets_only_analytics() {
        let engine = engine();
        let ctx = everything(&engine, "Магазин", "Старт");
        let menu = engine.resolve_menu(&ctx);

        let sector_paths: HashSet<&str> = engine
            .catalog()
            .sector("market")
            .iter()
            .map(|e| e.path.as_str())
            .collect();
        let offered: Vec<&str> = menu
            .iter()
            .map(|n| n.path.as_str())
            .filter(|p| sector_paths.contains(p))
            .collect();
        assert_eq!(offered, vec!["/crm/market/analytics"]);
    }

    #[test]
    fn start_tier_allow_list_holds_for_every_sector() {
        let engine = engine();
        let allowed: Vec<&str> = engine
            .catalog()
            .start_paths()
            .iter()
            .map(|p| p.as_str())
            .collect();

        for sector in SECTORS {
            let key = engine.normalize_sector(sector);
            let sector_paths: HashSet<&str> = engine
                .catalog()
                .sector(&key)
                .iter()
                .map(|e| e.path.as_str())
                .collect();
            let menu = engine.resolve_menu(&everything(&engine, sector, "Старт"));
            for node in &menu {
                if sector_paths.contains(node.path.as_str()) {
                    assert!(allowed.contains(&node.path.as_str()), "{sector}: {}", node.path);
                }
            }
        }
    }

    /// The global rule hides "Отделы" for every sector and tier.
    #[test]
    fn departments_never_listed() {
        let engine = engine();
        for sector in SECTORS {
            for tier in TIERS {
                let ctx = everything(&engine, sector, tier).with_org_grant("can_view_departments", true);
                let menu = engine.resolve_menu(&ctx);
                assert!(!all_labels(&menu).contains(&"Отделы"), "{sector}/{tier}");
            }
        }
    }

    #[test]
    fn branch_requires_explicit_org_grant_everywhere() {
        let engine = engine();
        for sector in SECTORS {
            for tier in TIERS {
                let ctx = everything(&engine, sector, tier);
                let menu = engine.resolve_menu(&ctx);
                let caps = reachable_capabilities(&menu);
                assert!(!caps.contains(&&id("can_view_branch")), "{sector}/{tier}");
                assert!(!engine.resolve_assignable(&ctx).contains(&id("can_view_branch")));
            }
        }
    }

    /// On the Standard tier branches move into the additional services.
    #[test]
    fn standard_tier_offers_branches_as_additional_service() {
        let engine = engine();
        let ctx = SubjectContext::new("Магазин", Tier::new("Стандарт"))
            .with_org_grant("can_view_branch", true);

        let menu = engine.resolve_menu(&ctx);
        let group = menu
            .iter()
            .find(|n| n.path.as_str() == "/crm/additional-services")
            .expect("additional services group");
        assert_eq!(group.children.len(), 1);
        assert_eq!(group.children[0].label, "Филиалы");

        let cards = engine.resolve_service_cards(&ctx);
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].id, "branch");

        // A branch-bound employee never gets it.
        let employee = ctx.with_role("cashier").with_branches(["7"]);
        assert!(engine.resolve_additional(&employee).is_none());
    }

    #[test]
    fn consulting_stock_comes_through_additional_services() {
        let engine = engine();
        let ctx = SubjectContext::new("Консалтинг", Tier::new("Прайм"))
            .with_user_grant("can_view_products", true);

        let menu = engine.resolve_menu(&ctx);
        // The baseline stock page is hidden for consulting.
        assert!(!menu.iter().any(|n| n.path.as_str() == "/crm/sklad"));

        let group = engine.resolve_additional(&ctx).expect("additional services");
        assert_eq!(group.children.len(), 1);
        assert_eq!(group.children[0].path.as_str(), "/crm/sklad");

        let assignable = engine.resolve_assignable(&ctx);
        assert_eq!(
            assignable.get(&id("can_view_products")).map(|e| e.scope),
            Some(Scope::Additional)
        );

        let elsewhere = SubjectContext::new("Магазин", Tier::new("Прайм"))
            .with_user_grant("can_view_products", true);
        assert!(engine.resolve_additional(&elsewhere).is_none());
    }

    #[test]
    fn messaging_integrations_follow_the_organization() {
        let engine = engine();
        let by_user = SubjectContext::new("Кафе", Tier::new("Премиум"))
            .with_user_grant("can_view_whatsapp", true)
            .with_user_grant("can_view_telegram", true);
        assert!(engine.resolve_additional(&by_user).is_none());

        let by_org = SubjectContext::new("Кафе", Tier::new("Премиум"))
            .with_org_grant("can_view_whatsapp", true);
        let group = engine.resolve_additional(&by_org).unwrap();
        let labels: Vec<&str> = group.children.iter().map(|n| n.label.as_str()).collect();
        assert_eq!(labels, vec!["WhatsApp"]);
    }

    #[test]
    fn scales_follow_the_profile_in_stores_only() {
        let engine = engine();
        let shop = SubjectContext::new("Цветочный магазин", Tier::new("Прайм"))
            .with_user_grant("can_view_market_scales", true)
            .with_org_grant("can_view_market_scales", false);
        let group = engine.resolve_additional(&shop).unwrap();
        assert_eq!(group.children[0].label, "Интеграция с весами");

        let cafe = SubjectContext::new("Кафе", Tier::new("Прайм"))
            .with_user_grant("can_view_market_scales", true);
        assert!(engine.resolve_additional(&cafe).is_none());
    }

    #[test]
    fn umbrella_grant_alone_never_infers_explicit_services() {
        let engine = engine();
        for sector in SECTORS {
            let ctx = SubjectContext::new(sector, Tier::new("Прайм"))
                .with_user_grant("can_view_additional_services", true);
            let group = engine.resolve_additional(&ctx).expect("umbrella keeps the group");
            for child in &group.children {
                let policy = engine
                    .policy_of(child.required_capability.as_ref().unwrap())
                    .unwrap();
                assert!(!policy.class.is_explicit_only(), "{sector}: {}", child.label);
            }
        }
    }

    // ── Properties ────────────────────────────────────────────────────────────

    #[test]
    fn resolution_is_deterministic_everywhere() {
        let engine = engine();
        for sector in SECTORS {
            for tier in TIERS {
                let ctx = everything(&engine, sector, tier).with_org_grant("can_view_branch", true);
                assert_eq!(engine.resolve_menu(&ctx), engine.resolve_menu(&ctx.clone()));
                assert_eq!(engine.resolve_assignable(&ctx), engine.resolve_assignable(&ctx));
            }
        }
    }

    #[test]
    fn assignable_is_reachable_in_menu_everywhere() {
        let engine = engine();
        for sector in SECTORS {
            for tier in TIERS {
                let ctx = everything(&engine, sector, tier)
                    .with_org_grant("can_view_branch", true)
                    .with_org_grant("can_view_whatsapp", true);
                let menu = engine.resolve_menu(&ctx);
                let reachable = reachable_capabilities(&menu);
                for cap in engine.resolve_assignable(&ctx).ids() {
                    assert!(reachable.contains(&cap), "{sector}/{tier}: {cap}");
                }
            }
        }
    }

    #[test]
    fn assignable_labels_are_unique_per_subject() {
        let engine = engine();
        for sector in SECTORS {
            for tier in TIERS {
                let ctx = everything(&engine, sector, tier)
                    .with_org_grant("can_view_branch", true)
                    .with_org_grant("can_view_whatsapp", true)
                    .with_org_grant("can_view_documents", true);
                let assignable = engine.resolve_assignable(&ctx);
                let mut seen = HashSet::new();
                for entry in assignable.iter() {
                    assert!(seen.insert(entry.label.as_str()), "{sector}/{tier}: {}", entry.label);
                }
            }
        }
    }

    #[test]
    fn warehouse_documents_and_document_service_are_granted_apart() {
        let engine = engine();
        let actor = everything(&engine, "Склад", "Премиум").with_org_grant("can_view_documents", true);
        let assignable = engine.resolve_assignable(&actor);
        assert!(assignable.contains(&CapabilityId::new("can_view_document")));
        assert!(assignable.contains(&CapabilityId::new("can_view_documents")));

        let map = codec::to_map(&["Документы"], &assignable);
        assert_eq!(map.get(&CapabilityId::new("can_view_document")), Some(true));
        assert_eq!(map.get(&CapabilityId::new("can_view_documents")), Some(false));
    }

    #[test]
    fn label_round_trip_on_shipped_catalog() {
        let engine = engine();
        let actor = everything(&engine, "Склад", "Премиум").with_org_grant("can_view_documents", true);
        let assignable = engine.resolve_assignable(&actor);
        assert!(assignable.len() > 3);

        let mut chosen: Vec<String> = Vec::new();
        for entry in assignable.iter().step_by(2) {
            if !chosen.contains(&entry.label) {
                chosen.push(entry.label.clone());
            }
        }

        let map = codec::to_map(chosen.as_slice(), &assignable);
        let mut back = codec::to_labels(&map, &assignable);
        back.sort();
        chosen.sort();
        assert_eq!(back, chosen);

        // The persisted body carries exactly one key per assignable id.
        let body = map.to_patch_body();
        assert_eq!(body.as_object().map(|o| o.len()), Some(assignable.len()));
    }

    #[test]
    fn cached_engine_agrees_with_engine() {
        let cached = crate::default_cached_engine().unwrap();
        for tier in TIERS {
            let ctx = everything(cached.engine(), "Гостиница", tier);
            assert_eq!(cached.resolve_menu(&ctx), cached.engine().resolve_menu(&ctx));
            assert_eq!(cached.resolve_menu(&ctx), cached.engine().resolve_menu(&ctx));
        }
        assert_eq!(cached.cached_counts().0, TIERS.len());
    }
}
