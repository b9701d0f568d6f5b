//! Compile-time registry of Overpass mirrors and the round-robin pool.
//!
//! Each mirror is defined in a TOML file under `mirrors/`. The registry
//! embeds these at compile time and exposes them via [`all_mirrors`] and
//! [`enabled_mirrors`].

use serde::Deserialize;

use crate::OverpassError;

/// An Overpass mirror definition loaded from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct MirrorDefinition {
    /// Unique identifier (e.g., `"kumi"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Interpreter endpoint URL.
    pub url: String,
    /// Whether this mirror is part of the default pool.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Pool order; lower values are tried first.
    pub priority: u32,
}

const fn default_true() -> bool {
    true
}

const MIRROR_TOMLS: &[(&str, &str)] = &[
    ("overpass_de", include_str!("../mirrors/overpass_de.toml")),
    ("kumi", include_str!("../mirrors/kumi.toml")),
    (
        "overpass_de_lz4",
        include_str!("../mirrors/overpass_de_lz4.toml"),
    ),
];

#[cfg(test)]
const EXPECTED_MIRROR_COUNT: usize = 3;

/// Returns all mirror definitions (enabled and disabled).
///
/// # Panics
///
/// Panics if any TOML definition is malformed (the definitions are
/// embedded, so this is a development error caught by tests).
#[must_use]
pub fn all_mirrors() -> Vec<MirrorDefinition> {
    MIRROR_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            toml::de::from_str(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse Overpass mirror '{name}': {e}"))
        })
        .collect()
}

/// Returns only enabled mirrors, sorted by priority (ascending).
#[must_use]
pub fn enabled_mirrors() -> Vec<MirrorDefinition> {
    let mut mirrors: Vec<MirrorDefinition> =
        all_mirrors().into_iter().filter(|m| m.enabled).collect();
    mirrors.sort_by_key(|m| m.priority);
    mirrors
}

/// Ordered set of equivalent endpoints with a "current" cursor.
///
/// The cursor only moves on [`advance`](Self::advance) and is kept across
/// searches, so later queries start at the last mirror that was not
/// overloaded. The pool is never empty, so `current_index() < len()`
/// always holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorPool {
    mirrors: Vec<String>,
    current: usize,
}

impl MirrorPool {
    /// Creates a pool starting at the first mirror.
    ///
    /// # Errors
    ///
    /// Returns [`OverpassError::Config`] if `mirrors` is empty.
    pub fn new(mirrors: Vec<String>) -> Result<Self, OverpassError> {
        if mirrors.is_empty() {
            return Err(OverpassError::Config {
                message: "mirror pool needs at least one endpoint".to_string(),
            });
        }
        Ok(Self {
            mirrors,
            current: 0,
        })
    }

    /// Creates a pool from the enabled registry mirrors.
    ///
    /// # Errors
    ///
    /// Returns [`OverpassError::Config`] if every mirror is disabled.
    pub fn from_registry() -> Result<Self, OverpassError> {
        Self::new(enabled_mirrors().into_iter().map(|m| m.url).collect())
    }

    /// The endpoint queries should currently go to.
    #[must_use]
    pub fn current(&self) -> &str {
        &self.mirrors[self.current]
    }

    /// Index of [`current`](Self::current) within the pool.
    #[must_use]
    pub const fn current_index(&self) -> usize {
        self.current
    }

    /// Moves to the next mirror, wrapping around, and returns the new
    /// index.
    pub fn advance(&mut self) -> usize {
        self.current = (self.current + 1) % self.mirrors.len();
        self.current
    }

    /// Number of mirrors in the pool.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mirrors.len()
    }

    /// Always `false`; present for API symmetry with [`len`](Self::len).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mirrors.is_empty()
    }

    /// All endpoints in pool order.
    #[must_use]
    pub fn mirrors(&self) -> &[String] {
        &self.mirrors
    }
}
