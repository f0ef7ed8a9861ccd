//! Kind-wide permission aggregates
//!
//! Some callers need "every post with any override at this level",
//! not one post's state. An aggregate is that index: instance id to
//! settings map, built by scanning the store for every persisted
//! blob of a kind plus policy statements addressing the kind.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::level::AccessLevel;
use crate::resource::ResourceKind;
use crate::setting::SettingsMap;

/// Wildcard instance key used by kind-wide policy statements.
pub const WILDCARD: &str = "*";

/// A kind-wide index of instance id to settings.
///
/// Explicit settings win over policy-derived ones per key; wildcard
/// policy settings appear under [`WILDCARD`] and additionally seed
/// every concrete instance entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    level: AccessLevel,
    kind: ResourceKind,
    entries: IndexMap<String, SettingsMap>,
}

impl Aggregate {
    /// Build an aggregate from its scanned parts.
    ///
    /// `explicit` carries the per-instance persisted settings;
    /// `policy` the per-instance policy-derived settings (including
    /// a possible [`WILDCARD`] entry).
    pub fn build(
        level: AccessLevel,
        kind: ResourceKind,
        explicit: IndexMap<String, SettingsMap>,
        policy: IndexMap<String, SettingsMap>,
    ) -> Self {
        let wildcard = policy.get(WILDCARD).cloned();
        let mut entries: IndexMap<String, SettingsMap> = IndexMap::new();

        for (instance, settings) in &policy {
            entries.insert(instance.clone(), settings.clone());
        }
        for (instance, settings) in &explicit {
            let mut merged = match (&wildcard, entries.get(instance)) {
                (_, Some(existing)) => existing.clone(),
                (Some(wildcard), None) => wildcard.clone(),
                (None, None) => SettingsMap::new(),
            };
            for (key, value) in settings {
                merged.insert(key.clone(), value.clone());
            }
            entries.insert(instance.clone(), merged);
        }

        Self { level, kind, entries }
    }

    /// The access level this aggregate was built for.
    pub fn level(&self) -> &AccessLevel {
        &self.level
    }

    /// The resource kind this aggregate covers.
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Settings for one instance, if any override exists.
    pub fn get(&self, instance: &str) -> Option<&SettingsMap> {
        self.entries.get(instance)
    }

    /// All entries, in scan order.
    pub fn entries(&self) -> &IndexMap<String, SettingsMap> {
        &self.entries
    }

    /// Instance ids with any override.
    pub fn instances(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of instances with overrides.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when nothing overrides this kind at this level.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
