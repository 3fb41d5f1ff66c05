//! The static capability catalog.
//!
//! A `Catalog` is deserialized from a TOML `CatalogConfig`, validated once at
//! startup and then treated as immutable. It holds:
//!
//! - the capability registry (every id the engine recognizes, with its label)
//! - the baseline entry list shared by every sector
//! - per-sector entry lists keyed by canonical sector key
//! - the additional-service descriptors with their visibility conditions
//! - the anchors and the Start-tier allow-list used by the Menu Assembler
//!
//! Validation fails fast on dangling capability references, duplicate routes
//! inside one list and unregistered custom predicates.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use capmenu_contracts::{
    capability::{Capability, CapabilityId},
    context::{SubjectContext, Tier},
    error::{CapMenuError, CapMenuResult},
    menu::{MenuNode, RoutePath},
    policy::PolicyClass,
};

use crate::sector::SectorNormalizer;

/// A custom visibility predicate over the full subject context.
pub type ConditionFn = Arc<dyn Fn(&SubjectContext) -> bool + Send + Sync>;

/// Named predicates that descriptors may reference from TOML via
/// `condition.custom = "<name>"`. Populated by the hosting application before
/// the catalog is loaded.
#[derive(Clone, Default)]
pub struct PredicateRegistry {
    inner: HashMap<String, ConditionFn>,
}

impl PredicateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `check` under `name`. Registering the same name twice
    /// replaces the earlier predicate.
    pub fn register<F>(&mut self, name: impl Into<String>, check: F)
    where
        F: Fn(&SubjectContext) -> bool + Send + Sync + 'static,
    {
        self.inner.insert(name.into(), Arc::new(check));
    }

    pub fn get(&self, name: &str) -> Option<ConditionFn> {
        self.inner.get(name).cloned()
    }
}

impl fmt::Debug for PredicateRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.inner.keys().collect();
        names.sort();
        f.debug_struct("PredicateRegistry").field("names", &names).finish()
    }
}

// ── TOML schema ───────────────────────────────────────────────────────────────

fn default_true() -> bool {
    true
}

/// One baseline or sector entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub label: String,
    pub path: RoutePath,
    /// Capability gating the entry. Entries without one are always kept.
    #[serde(default)]
    pub capability: Option<CapabilityId>,
    /// Entries for screens that do not exist yet are never shown.
    #[serde(default = "default_true")]
    pub implemented: bool,
    /// Submenu entries (documents-style dropdowns). One level only.
    #[serde(default)]
    pub children: Vec<CatalogEntry>,
}

/// Metadata for the additional-services overview page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDisplay {
    pub name: String,
    pub description: String,
}

/// Conjunction of conditions as written in TOML. Empty lists are unconstrained.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConditionConfig {
    #[serde(default)]
    pub sectors: Vec<String>,
    #[serde(default)]
    pub tiers: Vec<String>,
    pub custom: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DescriptorConfig {
    pub id: String,
    pub label: String,
    pub path: RoutePath,
    pub capability: CapabilityId,
    #[serde(default)]
    pub policy: PolicyClass,
    #[serde(default)]
    pub condition: ConditionConfig,
    pub display: Option<ServiceDisplay>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnchorConfig {
    /// Sector entries are inserted right after the entry with this label.
    pub overview: Option<String>,
    /// The additional-services group goes right before the entry with this label.
    pub settings: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupConfig {
    pub label: String,
    pub path: RoutePath,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StartConfig {
    /// The only sector routes offered on the Start tier.
    #[serde(default)]
    pub sector_paths: Vec<RoutePath>,
}

/// The top-level structure deserialized from a catalog TOML document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub version: String,
    /// Capability granting the additional-services group as a whole.
    pub umbrella: CapabilityId,
    #[serde(default)]
    pub anchors: AnchorConfig,
    pub additional_group: GroupConfig,
    #[serde(default)]
    pub start: StartConfig,
    pub capabilities: Vec<Capability>,
    #[serde(default)]
    pub baseline: Vec<CatalogEntry>,
    #[serde(default)]
    pub sectors: BTreeMap<String, Vec<CatalogEntry>>,
    #[serde(default)]
    pub additional: Vec<DescriptorConfig>,
}

// ── Validated catalog ─────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct NamedPredicate {
    pub name: String,
    check: ConditionFn,
}

impl NamedPredicate {
    pub fn holds(&self, ctx: &SubjectContext) -> bool {
        (self.check)(ctx)
    }
}

impl fmt::Debug for NamedPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NamedPredicate").field(&self.name).finish()
    }
}

/// A descriptor's visibility condition with sector keys already normalized.
#[derive(Debug, Clone, Default)]
pub struct ConditionSpec {
    pub sectors: Vec<String>,
    pub tiers: Vec<Tier>,
    pub custom: Option<NamedPredicate>,
}

impl ConditionSpec {
    /// True when every present constraint holds for `ctx`.
    pub fn is_satisfied(&self, sector_key: &str, ctx: &SubjectContext) -> bool {
        let sector_ok = self.sectors.is_empty() || self.sectors.iter().any(|s| s == sector_key);
        let tier_ok = self.tiers.is_empty() || self.tiers.contains(&ctx.tier);
        let custom_ok = self.custom.as_ref().map_or(true, |p| p.holds(ctx));
        sector_ok && tier_ok && custom_ok
    }
}

/// A conditionally offered entry of the additional-services group.
#[derive(Debug, Clone)]
pub struct AdditionalServiceDescriptor {
    pub id: String,
    pub label: String,
    pub path: RoutePath,
    pub capability: CapabilityId,
    pub policy: PolicyClass,
    pub condition: ConditionSpec,
    pub display: Option<ServiceDisplay>,
}

impl AdditionalServiceDescriptor {
    pub fn to_node(&self) -> MenuNode {
        MenuNode::leaf(self.label.clone(), self.path.clone(), Some(self.capability.clone()))
    }
}

/// The immutable, validated capability catalog.
#[derive(Debug, Clone)]
pub struct Catalog {
    version: String,
    umbrella: CapabilityId,
    anchors: AnchorConfig,
    additional_group: GroupConfig,
    start_paths: Vec<RoutePath>,
    registry: BTreeMap<CapabilityId, Capability>,
    baseline: Vec<CatalogEntry>,
    sectors: BTreeMap<String, Vec<CatalogEntry>>,
    additional: Vec<AdditionalServiceDescriptor>,
}

impl Catalog {
    /// Validate `config` and build the catalog.
    ///
    /// Sector keys (of the sector map and of descriptor conditions) are passed
    /// through `normalizer`; custom predicate names are resolved against
    /// `predicates`.
    ///
    /// # Errors
    ///
    /// - `DuplicateEntry` for a repeated registry id, or two entries with the
    ///   same route inside one list
    /// - `DanglingCapability` for any reference missing from the registry
    /// - `UnknownPredicate` for an unregistered custom predicate name
    pub fn load(
        config: CatalogConfig,
        normalizer: &SectorNormalizer,
        predicates: &PredicateRegistry,
    ) -> CapMenuResult<Self> {
        let mut registry = BTreeMap::new();
        let mut labels_seen: BTreeMap<String, CapabilityId> = BTreeMap::new();
        for capability in config.capabilities {
            if registry.contains_key(&capability.id) {
                return Err(CapMenuError::DuplicateEntry {
                    scope: "registry".to_string(),
                    path: capability.id.0.clone(),
                });
            }
            if let Some(other) = labels_seen.get(&capability.label) {
                warn!(
                    label = %capability.label,
                    first = %other,
                    second = %capability.id,
                    "capability label is shared by two registry ids"
                );
            } else {
                labels_seen.insert(capability.label.clone(), capability.id.clone());
            }
            registry.insert(capability.id.clone(), capability);
        }

        let require = |id: &CapabilityId, referenced_by: String| -> CapMenuResult<()> {
            if registry.contains_key(id) {
                Ok(())
            } else {
                Err(CapMenuError::DanglingCapability {
                    capability: id.0.clone(),
                    referenced_by,
                })
            }
        };

        require(&config.umbrella, "the additional-services umbrella".to_string())?;

        check_entries("baseline", &config.baseline, &require)?;

        let mut sectors: BTreeMap<String, Vec<CatalogEntry>> = BTreeMap::new();
        for (raw_key, entries) in config.sectors {
            let key = normalizer.normalize(&raw_key);
            check_entries(&format!("sector '{key}'"), &entries, &require)?;
            if sectors.insert(key.clone(), entries).is_some() {
                return Err(CapMenuError::DuplicateEntry {
                    scope: "sector".to_string(),
                    path: key,
                });
            }
        }

        let mut additional = Vec::with_capacity(config.additional.len());
        let mut descriptor_paths = HashSet::new();
        for descriptor in config.additional {
            require(
                &descriptor.capability,
                format!("additional service '{}'", descriptor.id),
            )?;
            if !descriptor_paths.insert(descriptor.path.clone()) {
                return Err(CapMenuError::DuplicateEntry {
                    scope: "additional".to_string(),
                    path: descriptor.path.to_string(),
                });
            }

            let custom = match descriptor.condition.custom {
                Some(name) => {
                    let check = predicates
                        .get(&name)
                        .ok_or_else(|| CapMenuError::UnknownPredicate { name: name.clone() })?;
                    Some(NamedPredicate { name, check })
                }
                None => None,
            };

            let condition = ConditionSpec {
                sectors: descriptor
                    .condition
                    .sectors
                    .iter()
                    .map(|s| normalizer.normalize(s))
                    .collect(),
                tiers: descriptor.condition.tiers.into_iter().map(Tier::new).collect(),
                custom,
            };

            additional.push(AdditionalServiceDescriptor {
                id: descriptor.id,
                label: descriptor.label,
                path: descriptor.path,
                capability: descriptor.capability,
                policy: descriptor.policy,
                condition,
                display: descriptor.display,
            });
        }

        for allowed in &config.start.sector_paths {
            let listed = sectors.values().flatten().any(|e| &e.path == allowed);
            if !listed {
                warn!(path = %allowed, "start-tier allow-list names a route no sector lists");
            }
        }

        info!(
            version = %config.version,
            capabilities = registry.len(),
            baseline = config.baseline.len(),
            sectors = sectors.len(),
            additional = additional.len(),
            "catalog loaded"
        );

        Ok(Self {
            version: config.version,
            umbrella: config.umbrella,
            anchors: config.anchors,
            additional_group: config.additional_group,
            start_paths: config.start.sector_paths,
            registry,
            baseline: config.baseline,
            sectors,
            additional,
        })
    }

    /// Parse `s` as TOML and build a validated catalog.
    pub fn from_toml_str(
        s: &str,
        normalizer: &SectorNormalizer,
        predicates: &PredicateRegistry,
    ) -> CapMenuResult<Self> {
        let config: CatalogConfig = toml::from_str(s).map_err(|e| CapMenuError::ConfigError {
            reason: format!("failed to parse catalog TOML: {}", e),
        })?;
        Self::load(config, normalizer, predicates)
    }

    /// Read the file at `path` and build a validated catalog from it.
    pub fn from_file(
        path: &Path,
        normalizer: &SectorNormalizer,
        predicates: &PredicateRegistry,
    ) -> CapMenuResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| CapMenuError::ConfigError {
            reason: format!("failed to read catalog file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents, normalizer, predicates)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn umbrella(&self) -> &CapabilityId {
        &self.umbrella
    }

    pub fn overview_anchor(&self) -> Option<&str> {
        self.anchors.overview.as_deref()
    }

    pub fn settings_anchor(&self) -> Option<&str> {
        self.anchors.settings.as_deref()
    }

    pub fn additional_group(&self) -> &GroupConfig {
        &self.additional_group
    }

    pub fn start_paths(&self) -> &[RoutePath] {
        &self.start_paths
    }

    pub fn baseline(&self) -> &[CatalogEntry] {
        &self.baseline
    }

    /// Entries for a canonical sector key. Unknown keys yield an empty slice.
    pub fn sector(&self, sector_key: &str) -> &[CatalogEntry] {
        self.sectors.get(sector_key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn sector_keys(&self) -> impl Iterator<Item = &str> {
        self.sectors.keys().map(String::as_str)
    }

    pub fn additional(&self) -> &[AdditionalServiceDescriptor] {
        &self.additional
    }

    pub fn capability(&self, id: &CapabilityId) -> Option<&Capability> {
        self.registry.get(id)
    }

    pub fn contains(&self, id: &CapabilityId) -> bool {
        self.registry.contains_key(id)
    }

    pub fn capabilities(&self) -> impl Iterator<Item = &Capability> {
        self.registry.values()
    }
}

/// Reject dangling references and duplicate routes inside one entry list.
fn check_entries<F>(scope: &str, entries: &[CatalogEntry], require: &F) -> CapMenuResult<()>
where
    F: Fn(&CapabilityId, String) -> CapMenuResult<()>,
{
    let mut paths = HashSet::new();
    for entry in entries {
        if !paths.insert(entry.path.clone()) {
            return Err(CapMenuError::DuplicateEntry {
                scope: scope.to_string(),
                path: entry.path.to_string(),
            });
        }
        if let Some(id) = &entry.capability {
            require(id, format!("{scope} entry '{}'", entry.path))?;
        }
        if entry.children.iter().any(|c| !c.children.is_empty()) {
            return Err(CapMenuError::ConfigError {
                reason: format!("{scope} entry '{}' nests submenus deeper than one level", entry.path),
            });
        }
        check_entries(&format!("{scope} submenu '{}'", entry.path), &entry.children, require)?;
    }
    Ok(())
}
