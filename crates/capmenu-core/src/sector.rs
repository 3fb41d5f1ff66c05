//! Sector name normalization.
//!
//! Maps a free-form sector display name to the canonical key that selects a
//! sector catalog: lower-case, whitespace runs collapsed to `_`, then an alias
//! lookup for legacy or renamed sectors. Unknown names fall through unchanged,
//! so normalization is total.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use capmenu_contracts::error::{CapMenuError, CapMenuResult};

/// Alias table as written in TOML:
///
/// ```toml
/// [aliases]
/// "строительная_компания" = "building"
/// "барбершоп" = "barber"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AliasConfig {
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
}

/// Canonicalizes sector display names.
#[derive(Debug, Clone, Default)]
pub struct SectorNormalizer {
    aliases: BTreeMap<String, String>,
}

impl SectorNormalizer {
    /// Build a normalizer from an alias table.
    ///
    /// Alias keys go through the same transform as inputs, so a key written
    /// as `"Цветочный магазин"` still matches. A target that is itself an
    /// alias for a different key is rejected, which keeps `normalize`
    /// idempotent on canonical keys. Two keys that only differ in `р`/`п`
    /// must agree on their target.
    pub fn new(config: AliasConfig) -> CapMenuResult<Self> {
        let mut aliases: BTreeMap<String, String> = BTreeMap::new();
        for (from, to) in config.aliases {
            let key = lookup_form(&canonical_form(&from));
            let target = canonical_form(&to);
            if let Some(existing) = aliases.get(&key) {
                if existing != &target {
                    return Err(CapMenuError::ConfigError {
                        reason: format!(
                            "sector alias '{from}' maps to '{target}' but a look-alike key maps to '{existing}'"
                        ),
                    });
                }
            }
            aliases.insert(key, target);
        }

        for target in aliases.values() {
            if let Some(next) = aliases.get(&lookup_form(target)) {
                if next != target {
                    return Err(CapMenuError::ConfigError {
                        reason: format!(
                            "sector alias target '{target}' is itself aliased to '{next}'"
                        ),
                    });
                }
            }
        }

        Ok(Self { aliases })
    }

    pub fn from_toml_str(s: &str) -> CapMenuResult<Self> {
        let config: AliasConfig = toml::from_str(s).map_err(|e| CapMenuError::ConfigError {
            reason: format!("failed to parse sector alias TOML: {}", e),
        })?;
        Self::new(config)
    }

    pub fn from_file(path: &Path) -> CapMenuResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| CapMenuError::ConfigError {
            reason: format!("failed to read sector alias file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Map a display name to its canonical sector key. Never fails.
    pub fn normalize(&self, display_name: &str) -> String {
        let key = canonical_form(display_name);
        let resolved = self
            .aliases
            .get(&lookup_form(&key))
            .cloned()
            .unwrap_or(key);
        debug!(input = %display_name, sector_key = %resolved, "normalized sector");
        resolved
    }
}

/// Lower-case, fold mixed-script look-alikes, join whitespace runs with `_`.
fn canonical_form(name: &str) -> String {
    name.split_whitespace()
        .map(|word| fold_homoglyphs(&word.to_lowercase()))
        .collect::<Vec<_>>()
        .join("_")
}

/// Replace Latin letters that look like Cyrillic ones inside a word that is
/// otherwise Cyrillic. Words without any Cyrillic letter are returned
/// untouched. A Latin `p` becomes `р` here; [`lookup_form`] takes care of it
/// standing in for `п`.
fn fold_homoglyphs(word: &str) -> String {
    let has_cyrillic = word.chars().any(|c| ('\u{0400}'..='\u{04FF}').contains(&c));
    if !has_cyrillic {
        return word.to_string();
    }
    word.chars()
        .map(|c| match c {
            'a' => 'а',
            'c' => 'с',
            'e' => 'е',
            'k' => 'к',
            'o' => 'о',
            'p' => 'р',
            'x' => 'х',
            'y' => 'у',
            other => other,
        })
        .collect()
}

/// Alias comparison key. A Latin `p` typed into a Cyrillic word may stand for
/// either `р` or `п` ("барбершоp"), so both compare equal.
fn lookup_form(key: &str) -> String {
    key.chars()
        .map(|c| match c {
            'р' => 'п',
            other => other,
        })
        .collect()
}
