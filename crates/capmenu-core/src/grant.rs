//! Capability grant decisions.
//!
//! The decision for one capability id is split in two layers:
//!
//! 1. The policy class decides how user and organization flags combine.
//! 2. A hard gate, when the policy table marks the id as gated, additionally
//!    requires an explicit organization grant and a subject that is not bound
//!    to a branch.
//!
//! Both functions are pure over the context; the engine looks up the policy.

use capmenu_contracts::{
    capability::CapabilityId,
    context::SubjectContext,
    policy::{CapabilityPolicy, PolicyClass},
};

/// Apply the class rule for `id`.
///
/// - `EitherGrants`: an explicit organization `false` denies unconditionally;
///   otherwise either flag being `true` grants.
/// - `CompanyOnly`: granted iff the organization flag is `true`.
/// - `ProfileOnly`: granted iff the user flag is `true`.
pub fn class_allows(class: PolicyClass, id: &CapabilityId, ctx: &SubjectContext) -> bool {
    let user = ctx.user_grant(id);
    let org = ctx.org_grant(id);
    match class {
        PolicyClass::EitherGrants => !org.is_denied() && (user.is_granted() || org.is_granted()),
        PolicyClass::CompanyOnly => org.is_granted(),
        PolicyClass::ProfileOnly => user.is_granted(),
    }
}

/// The hard gate layered on top of any class.
pub fn hard_gate_allows(id: &CapabilityId, ctx: &SubjectContext) -> bool {
    ctx.org_grant(id).is_granted() && !ctx.is_branch_bound()
}

/// Full decision for a known policy.
pub fn decide(policy: CapabilityPolicy, id: &CapabilityId, ctx: &SubjectContext) -> bool {
    class_allows(policy.class, id, ctx) && (!policy.hard_gated || hard_gate_allows(id, ctx))
}
