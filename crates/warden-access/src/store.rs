//! Settings persistence abstraction
//!
//! One settings blob is persisted per `(access level, resource kind,
//! instance)` scope. Durable backends are supplied by the surrounding
//! system; the in-memory implementation here backs tests and
//! embedders that manage persistence elsewhere.
//!
//! Writes report success as a boolean rather than an error: repeated
//! identical writes are expected to no-op successfully, and a `false`
//! from a backend is propagated, never retried.

use std::collections::BTreeMap;
use std::sync::Mutex;
use tracing::{debug, warn};

use crate::level::AccessLevel;
use crate::resource::ResourceKind;
use crate::setting::SettingsMap;

/// Identity of one persisted settings blob.
///
/// # Examples
///
/// ```
/// use warden_access::{AccessLevel, ResourceKind, SettingsScope};
///
/// let scope = SettingsScope::instance(AccessLevel::Role("editor".into()), ResourceKind::Post, "42");
/// assert_eq!(scope.storage_key(), "role:editor/post:42");
///
/// let singleton = SettingsScope::singleton(AccessLevel::Visitor, ResourceKind::Url);
/// assert_eq!(singleton.storage_key(), "visitor/url");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SettingsScope {
    /// Access level the blob belongs to.
    pub level: AccessLevel,
    /// Resource kind the blob configures.
    pub kind: ResourceKind,
    /// Instance id for instance-scoped kinds, `None` for singletons.
    pub instance: Option<String>,
}

impl SettingsScope {
    /// Scope for a singleton resource kind.
    pub fn singleton(level: AccessLevel, kind: ResourceKind) -> Self {
        Self { level, kind, instance: None }
    }

    /// Scope for an instance of a resource kind.
    pub fn instance(level: AccessLevel, kind: ResourceKind, id: impl Into<String>) -> Self {
        Self { level, kind, instance: Some(id.into()) }
    }

    /// The stable key a backend persists this blob under.
    pub fn storage_key(&self) -> String {
        match &self.instance {
            Some(id) => format!("{}/{}:{}", self.level.storage_key(), self.kind.as_str(), id),
            None => format!("{}/{}", self.level.storage_key(), self.kind.as_str()),
        }
    }
}

/// Durable key-value access scoped by access level identity.
///
/// All operations are synchronous point operations; failures surface
/// as `false` (writes/deletes) or `None` (reads) and are never
/// retried by the core.
pub trait SettingsStore: Send + Sync {
    /// Read the blob persisted for a scope, if any.
    fn get(&self, scope: &SettingsScope) -> Option<SettingsMap>;

    /// Persist a blob for a scope, replacing any previous content.
    ///
    /// Must be idempotent: writing a blob identical to the persisted
    /// one returns `true` without touching storage.
    fn set(&self, scope: &SettingsScope, settings: &SettingsMap) -> bool;

    /// Delete the blob persisted for a scope.
    fn delete(&self, scope: &SettingsScope) -> bool;

    /// Instance ids with persisted settings for a `(level, kind)`
    /// pair, in a stable backend-defined order. Used to build
    /// aggregates.
    fn instances(&self, level: &AccessLevel, kind: ResourceKind) -> Vec<String>;
}

/// In-memory settings store.
///
/// Backs tests and request-scoped embedding. Entries are kept in
/// storage-key order, which makes aggregate scans deterministic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, (SettingsScope, SettingsMap)>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of persisted blobs.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    /// `true` when nothing is persisted.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SettingsStore for MemoryStore {
    fn get(&self, scope: &SettingsScope) -> Option<SettingsMap> {
        let entries = self.entries.lock().ok()?;
        entries.get(&scope.storage_key()).map(|(_, settings)| settings.clone())
    }

    fn set(&self, scope: &SettingsScope, settings: &SettingsMap) -> bool {
        let Ok(mut entries) = self.entries.lock() else {
            warn!(scope = %scope.storage_key(), "settings store poisoned");
            return false;
        };
        let key = scope.storage_key();
        if let Some((_, existing)) = entries.get(&key) {
            if existing == settings {
                debug!(scope = %key, "settings unchanged, skipping write");
                return true;
            }
        }
        debug!(scope = %key, keys = settings.len(), "persisting settings");
        entries.insert(key, (scope.clone(), settings.clone()));
        true
    }

    fn delete(&self, scope: &SettingsScope) -> bool {
        let Ok(mut entries) = self.entries.lock() else {
            return false;
        };
        entries.remove(&scope.storage_key());
        true
    }

    fn instances(&self, level: &AccessLevel, kind: ResourceKind) -> Vec<String> {
        let Ok(entries) = self.entries.lock() else {
            return Vec::new();
        };
        entries
            .values()
            .filter(|(scope, _)| &scope.level == level && scope.kind == kind)
            .filter_map(|(scope, _)| scope.instance.clone())
            .collect()
    }
}
