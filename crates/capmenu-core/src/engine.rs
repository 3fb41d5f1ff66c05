//! The capability and menu resolution engine.
//!
//! `MenuEngine` wires the catalog, the sector normalizer and the two rule
//! tables together. Every public operation is a pure function of the engine's
//! immutable state and the per-call `SubjectContext`:
//!
//!   normalize sector → suppressions → filter baseline → filter sector
//!     → synthesize additional services → insert at anchors
//!
//! `resolve_assignable` re-runs the same filters for the granting actor and
//! extracts the capabilities of whatever survived, so an assignable set can
//! never contain an id the actor does not reach in their own menu.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use capmenu_contracts::{
    access::{AssignableEntry, AssignableSet},
    capability::{CapabilityId, Scope},
    context::SubjectContext,
    error::{CapMenuError, CapMenuResult},
    grant::{Grant, GrantMap},
    menu::MenuNode,
    policy::{CapabilityPolicy, PolicyClass, SuppressionSet},
};

use crate::{
    catalog::{AdditionalServiceDescriptor, Catalog, CatalogEntry},
    grant,
    sector::SectorNormalizer,
    traits::{GrantPolicy, SuppressionPolicy},
};

/// A card on the additional-services overview page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceCard {
    pub id: String,
    pub name: String,
    pub description: String,
    pub capability: CapabilityId,
}

/// The resolution engine. Construct once at startup and share freely.
pub struct MenuEngine {
    catalog: Catalog,
    normalizer: SectorNormalizer,
    suppression: Box<dyn SuppressionPolicy>,
    grants: Box<dyn GrantPolicy>,
}

impl MenuEngine {
    /// Build an engine and cross-check the policy table against the catalog.
    ///
    /// # Errors
    ///
    /// - `DanglingCapability` if the policy table classifies an id the
    ///   catalog registry does not contain
    /// - `PolicyConflict` if a descriptor declares a class that differs from
    ///   the one in the policy table
    pub fn new(
        catalog: Catalog,
        normalizer: SectorNormalizer,
        suppression: Box<dyn SuppressionPolicy>,
        grants: Box<dyn GrantPolicy>,
    ) -> CapMenuResult<Self> {
        for id in grants.classified_ids() {
            if !catalog.contains(&id) {
                return Err(CapMenuError::DanglingCapability {
                    capability: id.0,
                    referenced_by: "the policy class table".to_string(),
                });
            }
        }

        for descriptor in catalog.additional() {
            if let Some(policy) = grants.policy_for(&descriptor.capability) {
                if policy.class != descriptor.policy {
                    return Err(CapMenuError::PolicyConflict {
                        capability: descriptor.capability.0.clone(),
                        reason: format!(
                            "descriptor '{}' declares {:?} but the policy table says {:?}",
                            descriptor.id, descriptor.policy, policy.class
                        ),
                    });
                }
            }
        }

        Ok(Self {
            catalog,
            normalizer,
            suppression,
            grants,
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn normalize_sector(&self, display_name: &str) -> String {
        self.normalizer.normalize(display_name)
    }

    /// The policy the resolver applies to `id`: the table entry if any, the
    /// default either-grants class for other registry ids, `None` for ids the
    /// engine does not know.
    pub fn policy_of(&self, id: &CapabilityId) -> Option<CapabilityPolicy> {
        self.grants
            .policy_for(id)
            .or_else(|| self.catalog.contains(id).then(CapabilityPolicy::default))
    }

    /// Decide whether `id` is effectively granted to the subject.
    ///
    /// Unknown ids fail closed and are reported as a configuration warning.
    pub fn is_granted(&self, id: &CapabilityId, ctx: &SubjectContext) -> bool {
        match self.policy_of(id) {
            Some(policy) => grant::decide(policy, id, ctx),
            None => {
                warn!(capability = %id, "unknown capability id; treating as not granted");
                false
            }
        }
    }

    /// Decide `id` under an explicitly declared class, keeping the table's
    /// hard gate.
    pub fn is_granted_under(
        &self,
        id: &CapabilityId,
        class: PolicyClass,
        ctx: &SubjectContext,
    ) -> bool {
        match self.policy_of(id) {
            Some(policy) => grant::decide(CapabilityPolicy { class, ..policy }, id, ctx),
            None => {
                warn!(capability = %id, "unknown capability id; treating as not granted");
                false
            }
        }
    }

    /// The suppression set for the subject's normalized sector and tier.
    pub fn suppressions(&self, ctx: &SubjectContext) -> SuppressionSet {
        let sector_key = self.normalizer.normalize(&ctx.sector);
        self.suppression.suppressions(&sector_key, &ctx.tier)
    }

    // ── Menu resolution ──────────────────────────────────────────────────────

    /// Resolve the ordered menu tree for one subject.
    ///
    /// Sector entries land right after the overview anchor and the
    /// additional-services group right before the settings anchor. Anchors
    /// are located by their catalog position, so a suppressed anchor still
    /// fixes the insertion point. An anchor missing from the catalog means
    /// "prepend" for sector entries and "append" for the group.
    pub fn resolve_menu(&self, ctx: &SubjectContext) -> Vec<MenuNode> {
        let sector_key = self.normalizer.normalize(&ctx.sector);
        let suppressed = self.suppression.suppressions(&sector_key, &ctx.tier);

        debug!(
            sector_key = %sector_key,
            tier = %ctx.tier.as_str(),
            hidden_labels = suppressed.labels.len(),
            hidden_routes = suppressed.path_patterns.len(),
            "resolving menu"
        );

        let baseline = self.filter_baseline(&suppressed, ctx);
        let sector_nodes = self.filter_sector(&sector_key, &suppressed, ctx);
        let group = self.additional_for(&sector_key, &suppressed, ctx);

        let baseline_list = self.catalog.baseline();
        let anchor_index =
            |label: Option<&str>| label.and_then(|l| baseline_list.iter().position(|e| e.label == l));

        let sector_at = anchor_index(self.catalog.overview_anchor())
            .map(|a| baseline.iter().filter(|(i, _)| *i <= a).count())
            .unwrap_or(0);
        let group_at = anchor_index(self.catalog.settings_anchor())
            .map(|s| baseline.iter().filter(|(i, _)| *i < s).count())
            .unwrap_or(baseline.len());

        let mut sector_nodes = Some(sector_nodes);
        let mut group = group;
        let mut menu = Vec::with_capacity(baseline.len() + 8);
        for position in 0..=baseline.len() {
            if position == sector_at {
                menu.extend(sector_nodes.take().unwrap_or_default());
            }
            if position == group_at {
                if let Some(node) = group.take() {
                    menu.push(node);
                }
            }
            if let Some((_, node)) = baseline.get(position) {
                menu.push(node.clone());
            }
        }

        debug!(sector_key = %sector_key, entries = menu.len(), "menu resolved");
        menu
    }

    /// Resolve the additional-services group node, or `None` when the subject
    /// gets neither a child entry nor the umbrella capability, or a hide rule
    /// names the group itself.
    pub fn resolve_additional(&self, ctx: &SubjectContext) -> Option<MenuNode> {
        let sector_key = self.normalizer.normalize(&ctx.sector);
        let suppressed = self.suppression.suppressions(&sector_key, &ctx.tier);
        self.additional_for(&sector_key, &suppressed, ctx)
    }

    /// Cards for the additional-services overview page, in catalog order.
    pub fn resolve_service_cards(&self, ctx: &SubjectContext) -> Vec<ServiceCard> {
        let sector_key = self.normalizer.normalize(&ctx.sector);
        self.catalog
            .additional()
            .iter()
            .filter(|d| self.descriptor_granted(d, &sector_key, ctx))
            .filter_map(|d| {
                d.display.as_ref().map(|display| ServiceCard {
                    id: d.id.clone(),
                    name: display.name.clone(),
                    description: display.description.clone(),
                    capability: d.capability.clone(),
                })
            })
            .collect()
    }

    // ── Assignable access ────────────────────────────────────────────────────

    /// Derive what the granting actor may assign to a subordinate.
    ///
    /// Runs the same baseline, sector and additional-services filters as
    /// `resolve_menu` against the actor's context, then collects the
    /// capability of every surviving entry (children included), deduplicated
    /// in baseline → sector → additional order.
    pub fn resolve_assignable(&self, actor: &SubjectContext) -> AssignableSet {
        let sector_key = self.normalizer.normalize(&actor.sector);
        let suppressed = self.suppression.suppressions(&sector_key, &actor.tier);

        let baseline: Vec<MenuNode> = self
            .filter_baseline(&suppressed, actor)
            .into_iter()
            .map(|(_, node)| node)
            .collect();
        let sector = self.filter_sector(&sector_key, &suppressed, actor);
        let additional: Vec<MenuNode> = self
            .additional_for(&sector_key, &suppressed, actor)
            .map(|group| group.children)
            .unwrap_or_default();

        let mut set = AssignableSet::new();
        for (scope, nodes) in [
            (Scope::Baseline, &baseline),
            (Scope::Sector, &sector),
            (Scope::Additional, &additional),
        ] {
            for node in nodes.iter().flat_map(MenuNode::walk) {
                let Some(id) = &node.required_capability else {
                    continue;
                };
                let label = self
                    .catalog
                    .capability(id)
                    .map(|c| c.label.clone())
                    .unwrap_or_else(|| node.label.clone());
                set.insert(AssignableEntry {
                    id: id.clone(),
                    label,
                    scope,
                });
            }
        }

        debug!(sector_key = %sector_key, assignable = set.len(), "assignable set resolved");
        set
    }

    // ── Fingerprint ──────────────────────────────────────────────────────────

    /// Deterministic SHA-256 key over the catalog version and every input the
    /// resolution depends on. Two contexts with the same fingerprint always
    /// resolve to the same menu and assignable set.
    ///
    /// Hash input layout, each field length-prefixed (8-byte little-endian):
    ///   catalog version, sector display name, normalized sector key, tier,
    ///   user grants (id, state)*, org grants (id, state)*, role, branches*
    pub fn fingerprint(&self, ctx: &SubjectContext) -> String {
        fn feed(hasher: &mut Sha256, bytes: &[u8]) {
            hasher.update((bytes.len() as u64).to_le_bytes());
            hasher.update(bytes);
        }
        fn feed_grants(hasher: &mut Sha256, grants: &GrantMap) {
            hasher.update((grants.len() as u64).to_le_bytes());
            for (id, state) in grants.iter() {
                feed(hasher, id.as_str().as_bytes());
                let tag: &[u8] = match state {
                    Grant::Granted => b"+",
                    Grant::Denied => b"-",
                    Grant::Unset => b"?",
                };
                feed(hasher, tag);
            }
        }

        let mut hasher = Sha256::new();
        feed(&mut hasher, self.catalog.version().as_bytes());
        feed(&mut hasher, ctx.sector.as_bytes());
        feed(&mut hasher, self.normalizer.normalize(&ctx.sector).as_bytes());
        feed(&mut hasher, ctx.tier.as_str().as_bytes());
        feed_grants(&mut hasher, &ctx.user_grants);
        feed_grants(&mut hasher, &ctx.org_grants);
        feed(&mut hasher, ctx.role.as_deref().unwrap_or("").as_bytes());
        hasher.update((ctx.branches.len() as u64).to_le_bytes());
        for branch in &ctx.branches {
            feed(&mut hasher, branch.as_bytes());
        }
        hex::encode(hasher.finalize())
    }

    // ── Filters ──────────────────────────────────────────────────────────────

    /// Baseline survivors tagged with their catalog index.
    fn filter_baseline(
        &self,
        suppressed: &SuppressionSet,
        ctx: &SubjectContext,
    ) -> Vec<(usize, MenuNode)> {
        self.catalog
            .baseline()
            .iter()
            .enumerate()
            .filter_map(|(i, entry)| self.keep_entry(entry, suppressed, ctx).map(|node| (i, node)))
            .collect()
    }

    /// Sector survivors. On the Start tier only allow-listed routes are
    /// candidates at all.
    fn filter_sector(
        &self,
        sector_key: &str,
        suppressed: &SuppressionSet,
        ctx: &SubjectContext,
    ) -> Vec<MenuNode> {
        let start_paths = self.catalog.start_paths();
        let restricted = ctx.tier.is_start();

        self.catalog
            .sector(sector_key)
            .iter()
            .filter(|entry| !restricted || start_paths.contains(&entry.path))
            .filter_map(|entry| self.keep_entry(entry, suppressed, ctx))
            .collect()
    }

    /// Apply the implemented/suppression/grant filter to one entry and, for
    /// dropdown entries, to each child. A dropdown whose children all drop
    /// out is dropped as well.
    fn keep_entry(
        &self,
        entry: &CatalogEntry,
        suppressed: &SuppressionSet,
        ctx: &SubjectContext,
    ) -> Option<MenuNode> {
        if !self.entry_visible(entry, suppressed, ctx) {
            return None;
        }

        let mut node = MenuNode::leaf(entry.label.clone(), entry.path.clone(), entry.capability.clone());
        if !entry.children.is_empty() {
            node.children = entry
                .children
                .iter()
                .filter(|child| self.entry_visible(child, suppressed, ctx))
                .map(|child| MenuNode::leaf(child.label.clone(), child.path.clone(), child.capability.clone()))
                .collect();
            if node.children.is_empty() {
                return None;
            }
        }
        Some(node)
    }

    fn entry_visible(
        &self,
        entry: &CatalogEntry,
        suppressed: &SuppressionSet,
        ctx: &SubjectContext,
    ) -> bool {
        if !entry.implemented || suppressed.hides(&entry.label, &entry.path) {
            return false;
        }
        entry
            .capability
            .as_ref()
            .map_or(true, |id| self.is_granted(id, ctx))
    }

    fn descriptor_granted(
        &self,
        descriptor: &AdditionalServiceDescriptor,
        sector_key: &str,
        ctx: &SubjectContext,
    ) -> bool {
        descriptor.condition.is_satisfied(sector_key, ctx)
            && self.is_granted_under(&descriptor.capability, descriptor.policy, ctx)
    }

    /// Umbrella fallback eligibility: condition holds, the class may be
    /// inferred, the organization has not said no and any hard gate passes.
    fn descriptor_inferable(
        &self,
        descriptor: &AdditionalServiceDescriptor,
        sector_key: &str,
        ctx: &SubjectContext,
    ) -> bool {
        let id = &descriptor.capability;
        let gated = self.policy_of(id).is_some_and(|p| p.hard_gated);
        descriptor.condition.is_satisfied(sector_key, ctx)
            && !descriptor.policy.is_explicit_only()
            && !ctx.org_grant(id).is_denied()
            && (!gated || grant::hard_gate_allows(id, ctx))
    }

    /// Children are exempt from hide rules; the group node is not.
    fn additional_for(
        &self,
        sector_key: &str,
        suppressed: &SuppressionSet,
        ctx: &SubjectContext,
    ) -> Option<MenuNode> {
        let group = self.catalog.additional_group();
        if suppressed.hides(&group.label, &group.path) {
            debug!(sector_key = %sector_key, "additional services group suppressed");
            return None;
        }

        let descriptors = self.catalog.additional();
        let umbrella = self.is_granted(self.catalog.umbrella(), ctx);

        let mut children: Vec<MenuNode> = descriptors
            .iter()
            .filter(|d| self.descriptor_granted(d, sector_key, ctx))
            .map(AdditionalServiceDescriptor::to_node)
            .collect();

        if children.is_empty() && umbrella {
            children = descriptors
                .iter()
                .filter(|d| self.descriptor_inferable(d, sector_key, ctx))
                .map(AdditionalServiceDescriptor::to_node)
                .collect();
            debug!(fallback = children.len(), "additional services resolved via umbrella grant");
        }

        if children.is_empty() && !umbrella {
            return None;
        }

        Some(MenuNode::group(group.label.clone(), group.path.clone(), children))
    }
}
