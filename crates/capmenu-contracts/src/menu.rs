//! Menu tree and route path types.
//!
//! The engine produces an ordered `Vec<MenuNode>` of depth at most two: a
//! top level plus one grouping level used by the additional-services node.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::capability::CapabilityId;

/// A navigation route split into `/`-separated segments.
///
/// Hide rules match routes with [`RoutePath::contains`], which compares whole
/// segments rather than raw substrings, so `/crm/sklad` never matches
/// `/crm/sklad-accounting`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct RoutePath {
    raw: String,
    segments: Vec<String>,
}

impl RoutePath {
    pub fn parse(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let segments = raw
            .split('/')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        Self { raw, segments }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Return true if `pattern`'s segments occur as a contiguous run inside
    /// this path's segments. An empty pattern matches nothing.
    pub fn contains(&self, pattern: &RoutePath) -> bool {
        let needle = pattern.segments();
        if needle.is_empty() || needle.len() > self.segments.len() {
            return false;
        }
        self.segments.windows(needle.len()).any(|w| w == needle)
    }
}

impl From<String> for RoutePath {
    fn from(raw: String) -> Self {
        Self::parse(raw)
    }
}

impl From<&str> for RoutePath {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl From<RoutePath> for String {
    fn from(path: RoutePath) -> Self {
        path.raw
    }
}

impl fmt::Display for RoutePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// One navigable entry of the resolved menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuNode {
    pub label: String,
    pub path: RoutePath,
    /// The capability gating this entry. Group nodes carry none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_capability: Option<CapabilityId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<MenuNode>,
}

impl MenuNode {
    pub fn leaf(label: impl Into<String>, path: RoutePath, capability: Option<CapabilityId>) -> Self {
        Self {
            label: label.into(),
            path,
            required_capability: capability,
            children: Vec::new(),
        }
    }

    pub fn group(label: impl Into<String>, path: RoutePath, children: Vec<MenuNode>) -> Self {
        Self {
            label: label.into(),
            path,
            required_capability: None,
            children,
        }
    }

    /// Depth-first walk of this node followed by its children.
    pub fn walk(&self) -> impl Iterator<Item = &MenuNode> {
        std::iter::once(self).chain(self.children.iter())
    }
}

/// Collect every `required_capability` reachable in `menu`, in walk order,
/// duplicates included.
pub fn reachable_capabilities(menu: &[MenuNode]) -> Vec<&CapabilityId> {
    menu.iter()
        .flat_map(MenuNode::walk)
        .filter_map(|n| n.required_capability.as_ref())
        .collect()
}
