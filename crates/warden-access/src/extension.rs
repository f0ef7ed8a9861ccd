//! Typed extension registry
//!
//! Embedders can attach named computations to a resource kind
//! (derived flags, capability shims) without the core knowing about
//! them. Registration is explicit and duplicate names are rejected;
//! there is no dynamic method injection.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{AccessError, AccessResult};
use crate::resource::{Resource, ResourceKind};

/// A named computation bound to a resource kind.
pub type ExtensionFn = Arc<dyn Fn(&Resource) -> Value + Send + Sync>;

/// Registry of per-kind extensions.
///
/// # Examples
///
/// ```
/// use warden_access::extension::ExtensionRegistry;
/// use warden_access::ResourceKind;
/// use serde_json::json;
///
/// let mut registry = ExtensionRegistry::new();
/// registry
///     .register(ResourceKind::Post, "is_locked", |resource| {
///         json!(resource.setting("read").is_some())
///     })
///     .unwrap();
/// assert!(registry.is_registered(ResourceKind::Post, "is_locked"));
/// ```
#[derive(Default, Clone)]
pub struct ExtensionRegistry {
    extensions: HashMap<(ResourceKind, String), ExtensionFn>,
}

impl std::fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionRegistry").field("count", &self.extensions.len()).finish()
    }
}

impl ExtensionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a named extension for a kind.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an empty name; `LogicConflict` when the
    /// name is already registered for the kind.
    pub fn register<F>(&mut self, kind: ResourceKind, name: impl Into<String>, f: F) -> AccessResult<()>
    where
        F: Fn(&Resource) -> Value + Send + Sync + 'static,
    {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(AccessError::InvalidArgument("empty extension name".to_string()));
        }
        let key = (kind, name);
        if self.extensions.contains_key(&key) {
            return Err(AccessError::LogicConflict(format!(
                "extension {} already registered for {}",
                key.1,
                kind.as_str()
            )));
        }
        self.extensions.insert(key, Arc::new(f));
        Ok(())
    }

    /// `true` when the kind has an extension under this name.
    pub fn is_registered(&self, kind: ResourceKind, name: &str) -> bool {
        self.extensions.contains_key(&(kind, name.to_string()))
    }

    /// Invoke an extension against a resource.
    ///
    /// `None` when nothing is registered under the name.
    pub fn invoke(&self, name: &str, resource: &Resource) -> Option<Value> {
        self.extensions
            .get(&(resource.kind(), name.to_string()))
            .map(|extension| extension(resource))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::AccessLevel;
    use crate::merge::MergePreference;
    use crate::setting::{SettingValue, SettingsMap};
    use crate::store::{MemoryStore, SettingsScope};
    use serde_json::json;

    fn resource() -> Resource {
        let mut explicit = SettingsMap::new();
        explicit.insert("read".into(), SettingValue::Flag(true));
        Resource::assemble(
            SettingsScope::instance(AccessLevel::Visitor, ResourceKind::Post, "1"),
            explicit,
            SettingsMap::new(),
            MergePreference::Deny,
            Arc::new(MemoryStore::new()),
        )
    }

    #[test]
    fn test_register_and_invoke() {
        let mut registry = ExtensionRegistry::new();
        registry
            .register(ResourceKind::Post, "read_effect", |resource| {
                json!(resource.setting("read").and_then(|value| value.effect()))
            })
            .unwrap();

        assert_eq!(registry.invoke("read_effect", &resource()), Some(json!(true)));
        assert_eq!(registry.invoke("unknown", &resource()), None);
    }

    #[test]
    fn test_duplicate_registration_conflicts() {
        let mut registry = ExtensionRegistry::new();
        registry.register(ResourceKind::Post, "x", |_| json!(null)).unwrap();
        let err = registry.register(ResourceKind::Post, "x", |_| json!(null)).unwrap_err();
        assert_eq!(err.error_code(), "CONFLICT");

        // Same name on a different kind is fine.
        registry.register(ResourceKind::Term, "x", |_| json!(null)).unwrap();
    }

    #[test]
    fn test_empty_name_rejected() {
        let mut registry = ExtensionRegistry::new();
        let err = registry.register(ResourceKind::Post, "  ", |_| json!(null)).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_ARGUMENT");
    }
}
