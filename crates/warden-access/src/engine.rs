//! The access resolution engine
//!
//! The engine is the request-scoped context object that wires the
//! collaborators together: settings store, configuration, role
//! membership, entity directory, policy source, extension registry,
//! and the object cache. It constructs resources, resolves effective
//! settings through the inheritance chain, builds aggregates, and
//! answers URL and redirect queries.
//!
//! Construct one engine per request or operation. The cache inside
//! it is a performance aid only; nothing is shared across engines.

use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::aggregate::Aggregate;
use crate::cache::ObjectCache;
use crate::config::{keys, ConfigProvider};
use crate::error::{AccessError, AccessResult};
use crate::extension::ExtensionRegistry;
use crate::level::{AccessLevel, NoMembership, RoleMembership};
use crate::merge::{merge_prefer_base, merge_settings_with};
use crate::policy::PolicySource;
use crate::redirect::Redirect;
use crate::resource::{MergeStrategy, Resource, ResourceKind};
use crate::setting::{SettingValue, SettingsMap};
use crate::store::{SettingsScope, SettingsStore};
use crate::url;

const DEFAULT_CACHE_CAPACITY: i64 = 256;
const DEFAULT_CACHE_TTL: i64 = 3600;

/// Existence checks for entity-backed resource kinds.
///
/// Supplied by the surrounding system. Instance-scoped resources
/// whose underlying entity is gone must fail construction instead of
/// becoming partially usable.
pub trait EntityDirectory: Send + Sync {
    /// `true` when the underlying entity exists.
    fn exists(&self, kind: ResourceKind, instance: &str) -> bool;
}

/// Directory that treats every entity as existing.
///
/// The engine's fallback for embedders that validate elsewhere.
#[derive(Debug, Default, Clone)]
pub struct AllEntities;

impl EntityDirectory for AllEntities {
    fn exists(&self, _kind: ResourceKind, _instance: &str) -> bool {
        true
    }
}

/// In-memory entity directory for tests and fixtures.
#[derive(Debug, Default, Clone)]
pub struct MemoryDirectory {
    known: std::collections::HashSet<(ResourceKind, String)>,
}

impl MemoryDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an existing entity.
    pub fn add(&mut self, kind: ResourceKind, instance: impl Into<String>) {
        self.known.insert((kind, instance.into()));
    }
}

impl EntityDirectory for MemoryDirectory {
    fn exists(&self, kind: ResourceKind, instance: &str) -> bool {
        self.known.contains(&(kind, instance.to_string()))
    }
}

/// Request-scoped access resolution context.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use warden_access::{AccessLevel, Engine, MapConfig, MemoryStore, ResourceKind, SettingValue};
///
/// let engine = Engine::new(Arc::new(MemoryStore::new()), Arc::new(MapConfig::new()));
/// let mut resource = engine
///     .resource(&AccessLevel::Default, ResourceKind::Capability, Some("edit_posts"))
///     .unwrap();
/// resource.set_setting("edit_posts", SettingValue::Flag(true));
///
/// let effective = engine
///     .effective_settings(&AccessLevel::Visitor, ResourceKind::Capability, Some("edit_posts"))
///     .unwrap();
/// assert_eq!(effective["edit_posts"], SettingValue::Flag(true));
/// ```
pub struct Engine {
    store: Arc<dyn SettingsStore>,
    config: Arc<dyn ConfigProvider>,
    membership: Arc<dyn RoleMembership>,
    directory: Arc<dyn EntityDirectory>,
    policies: Option<Arc<dyn PolicySource>>,
    extensions: ExtensionRegistry,
    cache: Mutex<ObjectCache>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine").field("extensions", &self.extensions).finish()
    }
}

impl Engine {
    /// Create an engine over a store and configuration.
    ///
    /// Role membership defaults to "no roles", the entity directory
    /// to "everything exists", and no policy source is attached.
    pub fn new(store: Arc<dyn SettingsStore>, config: Arc<dyn ConfigProvider>) -> Self {
        let capacity = config.get_i64(keys::CACHE_CAPACITY, DEFAULT_CACHE_CAPACITY).max(1) as usize;
        Self {
            store,
            config,
            membership: Arc::new(NoMembership),
            directory: Arc::new(AllEntities),
            policies: None,
            extensions: ExtensionRegistry::new(),
            cache: Mutex::new(ObjectCache::new(capacity)),
        }
    }

    /// Attach a role membership source.
    pub fn with_membership(mut self, membership: Arc<dyn RoleMembership>) -> Self {
        self.membership = membership;
        self
    }

    /// Attach an entity directory.
    pub fn with_directory(mut self, directory: Arc<dyn EntityDirectory>) -> Self {
        self.directory = directory;
        self
    }

    /// Attach a policy source.
    pub fn with_policies(mut self, policies: Arc<dyn PolicySource>) -> Self {
        self.policies = Some(policies);
        self
    }

    /// Register a named extension for a resource kind.
    ///
    /// # Errors
    ///
    /// `LogicConflict` when the name is already taken for the kind.
    pub fn register_extension<F>(
        &mut self,
        kind: ResourceKind,
        name: impl Into<String>,
        f: F,
    ) -> AccessResult<()>
    where
        F: Fn(&Resource) -> serde_json::Value + Send + Sync + 'static,
    {
        self.extensions.register(kind, name, f)
    }

    /// Invoke a registered extension against a resource.
    pub fn extension(&self, name: &str, resource: &Resource) -> Option<serde_json::Value> {
        self.extensions.invoke(name, resource)
    }

    /// Construct a resource for one access level.
    ///
    /// Loads the level's explicit settings, overlays policy-derived
    /// settings underneath them, and resolves the merge preference
    /// for the kind.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when instance scoping does not match the
    /// kind; `NotFound` when an entity-backed instance does not
    /// exist.
    pub fn resource(
        &self,
        level: &AccessLevel,
        kind: ResourceKind,
        instance: Option<&str>,
    ) -> AccessResult<Resource> {
        let scope = self.scope(level, kind, instance)?;
        let explicit = self.store.get(&scope).unwrap_or_default();
        let policy = self
            .policies
            .as_ref()
            .and_then(|policies| policies.resource_settings(level, kind, instance))
            .unwrap_or_default();

        Ok(Resource::assemble(
            scope,
            explicit,
            policy,
            self.config.merge_preference(kind),
            self.store.clone(),
        ))
    }

    /// Resolve the effective settings for a level, inheritance
    /// included.
    ///
    /// Walks the chain bottom-up: the level's own resource settings
    /// are merged with whatever its parents resolve to, combining
    /// multiple role branches for users before the final merge.
    pub fn effective_settings(
        &self,
        level: &AccessLevel,
        kind: ResourceKind,
        instance: Option<&str>,
    ) -> AccessResult<SettingsMap> {
        let resource = self.resource(level, kind, instance)?;
        let parents = level.parents(&*self.membership);
        if parents.is_empty() {
            return Ok(resource.settings().clone());
        }

        let mut inherited: Option<SettingsMap> = None;
        for parent in &parents {
            let parent_settings = self.effective_settings(parent, kind, instance)?;
            inherited = Some(match inherited {
                None => parent_settings,
                Some(combined) => self.combine_branches(kind, &parent_settings, &combined),
            });
        }

        let inherited = inherited.unwrap_or_default();
        debug!(
            level = %level,
            kind = kind.as_str(),
            inherited_keys = inherited.len(),
            "resolving effective settings"
        );
        Ok(resource.merge_settings(&inherited))
    }

    /// Build (or fetch from cache) the kind-wide aggregate for a
    /// level.
    pub fn aggregate(&self, level: &AccessLevel, kind: ResourceKind) -> AccessResult<Aggregate> {
        let cache_key = format!("aggregate/{}/{}", level.storage_key(), kind.as_str());
        if let Ok(mut cache) = self.cache.lock() {
            if let Some(cached) = cache.get(&cache_key) {
                if let Ok(aggregate) = serde_json::from_value(cached) {
                    return Ok(aggregate);
                }
            }
        }

        let mut explicit = indexmap::IndexMap::new();
        for instance in self.store.instances(level, kind) {
            let scope = SettingsScope::instance(level.clone(), kind, instance.clone());
            if let Some(settings) = self.store.get(&scope) {
                explicit.insert(instance, settings);
            }
        }
        let policy = self
            .policies
            .as_ref()
            .map(|policies| policies.aggregate_settings(level, kind))
            .unwrap_or_default();

        let aggregate = Aggregate::build(level.clone(), kind, explicit, policy);
        if let Ok(mut cache) = self.cache.lock() {
            if let Ok(value) = serde_json::to_value(&aggregate) {
                cache.set(cache_key, value, DEFAULT_CACHE_TTL);
            }
        }
        Ok(aggregate)
    }

    /// `true` when the level's effective URL rules restrict the URL.
    pub fn is_url_restricted(&self, level: &AccessLevel, target: &str) -> AccessResult<bool> {
        let rules = self.effective_settings(level, ResourceKind::Url, None)?;
        Ok(url::is_restricted(&rules, target))
    }

    /// The redirect the level's effective URL rules attach to a URL.
    pub fn url_redirect(&self, level: &AccessLevel, target: &str) -> AccessResult<Option<Redirect>> {
        let rules = self.effective_settings(level, ResourceKind::Url, None)?;
        url::redirect_for(&rules, target)
    }

    /// Resolve a redirect-kind resource to its redirect instruction.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when the kind is not one of the redirect
    /// kinds.
    pub fn resolve_redirect(&self, level: &AccessLevel, kind: ResourceKind) -> AccessResult<Redirect> {
        if kind.merge_strategy() != MergeStrategy::PreferClosest {
            return Err(AccessError::InvalidArgument(format!(
                "{} is not a redirect kind",
                kind.as_str()
            )));
        }
        let settings = self.effective_settings(level, kind, None)?;
        match settings.get("redirect") {
            Some(SettingValue::Rule(rule)) => {
                Redirect::from_value(&serde_json::Value::Object(rule.clone()))
            }
            Some(_) | None => Ok(Redirect::Default),
        }
    }

    /// Delete the persisted settings for a scope.
    pub fn reset(
        &self,
        level: &AccessLevel,
        kind: ResourceKind,
        instance: Option<&str>,
    ) -> AccessResult<bool> {
        let scope = self.scope(level, kind, instance)?;
        if let Ok(mut cache) = self.cache.lock() {
            cache.remove(&format!("aggregate/{}/{}", level.storage_key(), kind.as_str()));
        }
        Ok(self.store.delete(&scope))
    }

    /// Drop every cached value.
    pub fn flush_cache(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
    }

    /// Record an issued token in the user's token registry.
    pub fn register_token(&self, user_id: u64, jti: &str) -> AccessResult<bool> {
        let mut registry = self.resource(&AccessLevel::User(user_id), ResourceKind::Jwt, None)?;
        Ok(registry.set_setting(
            jti,
            SettingValue::rule([("revoked", serde_json::json!(false))]),
        ))
    }

    /// Mark a registered token as revoked.
    ///
    /// # Errors
    ///
    /// `NotFound` when the token was never registered.
    pub fn revoke_token(&self, user_id: u64, jti: &str) -> AccessResult<bool> {
        let mut registry = self.resource(&AccessLevel::User(user_id), ResourceKind::Jwt, None)?;
        let mut rule = match registry.setting(jti).and_then(|value| value.as_rule()) {
            Some(rule) => rule.clone(),
            None => return Err(AccessError::NotFound(format!("token {} not registered", jti))),
        };
        rule.insert("revoked".to_string(), serde_json::json!(true));
        Ok(registry.set_setting(jti, SettingValue::Rule(rule)))
    }

    /// `true` when a token is registered and revoked.
    pub fn is_token_revoked(&self, user_id: u64, jti: &str) -> AccessResult<bool> {
        let registry = self.resource(&AccessLevel::User(user_id), ResourceKind::Jwt, None)?;
        Ok(registry
            .setting(jti)
            .and_then(|value| value.attribute("revoked"))
            .map(crate::setting::truthy)
            .unwrap_or(false))
    }

    fn scope(
        &self,
        level: &AccessLevel,
        kind: ResourceKind,
        instance: Option<&str>,
    ) -> AccessResult<SettingsScope> {
        match (kind.is_instance_scoped(), instance) {
            (true, None) => Err(AccessError::InvalidArgument(format!(
                "{} requires an instance id",
                kind.as_str()
            ))),
            (false, Some(_)) => Err(AccessError::InvalidArgument(format!(
                "{} is a singleton resource",
                kind.as_str()
            ))),
            (true, Some(id)) => {
                if id.trim().is_empty() {
                    return Err(AccessError::InvalidArgument("empty instance id".to_string()));
                }
                if kind.requires_entity() && !self.directory.exists(kind, id) {
                    return Err(AccessError::NotFound(format!("{} {}", kind.as_str(), id)));
                }
                Ok(SettingsScope::instance(level.clone(), kind, id))
            }
            (false, None) => Ok(SettingsScope::singleton(level.clone(), kind)),
        }
    }

    fn combine_branches(
        &self,
        kind: ResourceKind,
        branch: &SettingsMap,
        combined: &SettingsMap,
    ) -> SettingsMap {
        match kind.merge_strategy() {
            MergeStrategy::Binary => {
                merge_settings_with(branch, combined, self.config.merge_preference(kind))
            }
            MergeStrategy::PreferClosest => merge_prefer_base(branch, combined),
            MergeStrategy::UrlRules => {
                url::merge_url_settings(branch, combined, self.config.merge_preference(kind))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MapConfig;
    use crate::level::MemoryMembership;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn engine() -> Engine {
        Engine::new(Arc::new(MemoryStore::new()), Arc::new(MapConfig::new()))
    }

    #[test]
    fn test_instance_scoping_is_validated() {
        let engine = engine();
        let err = engine.resource(&AccessLevel::Default, ResourceKind::Post, None).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_ARGUMENT");

        let err = engine.resource(&AccessLevel::Default, ResourceKind::Url, Some("1")).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_ARGUMENT");
    }

    #[test]
    fn test_missing_entity_is_not_found() {
        let mut directory = MemoryDirectory::new();
        directory.add(ResourceKind::Post, "1");
        let engine = engine().with_directory(Arc::new(directory));

        assert!(engine.resource(&AccessLevel::Default, ResourceKind::Post, Some("1")).is_ok());
        let err = engine.resource(&AccessLevel::Default, ResourceKind::Post, Some("2")).unwrap_err();
        assert_eq!(err.error_code(), "NOT_FOUND");
    }

    #[test]
    fn test_effective_settings_inherit_through_roles() {
        let store = Arc::new(MemoryStore::new());
        let mut membership = MemoryMembership::new();
        membership.assign(9, "editor");
        let engine = Engine::new(store, Arc::new(MapConfig::new()))
            .with_membership(Arc::new(membership));

        let mut default = engine
            .resource(&AccessLevel::Default, ResourceKind::Capability, Some("edit_posts"))
            .unwrap();
        default.set_setting("edit_posts", SettingValue::Flag(true));

        let effective = engine
            .effective_settings(&AccessLevel::User(9), ResourceKind::Capability, Some("edit_posts"))
            .unwrap();
        assert_eq!(effective["edit_posts"], SettingValue::Flag(true));
    }

    #[test]
    fn test_multi_role_branches_combine_with_preference() {
        let store = Arc::new(MemoryStore::new());
        let mut membership = MemoryMembership::new();
        membership.assign(5, "editor");
        membership.assign(5, "author");
        let engine = Engine::new(store, Arc::new(MapConfig::new()))
            .with_membership(Arc::new(membership));

        let mut editor = engine
            .resource(&AccessLevel::Role("editor".into()), ResourceKind::Capability, Some("publish"))
            .unwrap();
        editor.set_setting("publish", SettingValue::Flag(false));
        let mut author = engine
            .resource(&AccessLevel::Role("author".into()), ResourceKind::Capability, Some("publish"))
            .unwrap();
        author.set_setting("publish", SettingValue::Flag(true));

        // Deny preference: the restricting role branch wins.
        let effective = engine
            .effective_settings(&AccessLevel::User(5), ResourceKind::Capability, Some("publish"))
            .unwrap();
        assert_eq!(effective["publish"], SettingValue::Flag(true));
    }

    #[test]
    fn test_aggregate_scans_store_and_caches() {
        let engine = engine();
        let mut first = engine
            .resource(&AccessLevel::Visitor, ResourceKind::Post, Some("10"))
            .unwrap();
        first.set_setting("read", SettingValue::Flag(true));

        let aggregate = engine.aggregate(&AccessLevel::Visitor, ResourceKind::Post).unwrap();
        assert_eq!(aggregate.len(), 1);
        assert!(aggregate.get("10").is_some());

        // Served from cache until reset.
        let again = engine.aggregate(&AccessLevel::Visitor, ResourceKind::Post).unwrap();
        assert_eq!(again, aggregate);
    }

    #[test]
    fn test_reset_deletes_and_invalidates() {
        let engine = engine();
        let mut resource = engine
            .resource(&AccessLevel::Visitor, ResourceKind::Post, Some("10"))
            .unwrap();
        resource.set_setting("read", SettingValue::Flag(true));
        engine.aggregate(&AccessLevel::Visitor, ResourceKind::Post).unwrap();

        assert!(engine.reset(&AccessLevel::Visitor, ResourceKind::Post, Some("10")).unwrap());
        let aggregate = engine.aggregate(&AccessLevel::Visitor, ResourceKind::Post).unwrap();
        assert!(aggregate.is_empty());
    }

    #[test]
    fn test_url_queries() {
        let engine = engine();
        let mut urls = engine.resource(&AccessLevel::Visitor, ResourceKind::Url, None).unwrap();
        let mut rules = SettingsMap::new();
        rules.insert(
            url::normalize("/members"),
            SettingValue::rule([
                ("effect", json!("deny")),
                ("redirect", json!({"type": "login_redirect"})),
            ]),
        );
        urls.set_settings(rules);

        assert!(engine.is_url_restricted(&AccessLevel::Visitor, "/Members/").unwrap());
        assert_eq!(
            engine.url_redirect(&AccessLevel::Visitor, "/members?x=1").unwrap(),
            Some(Redirect::LoginRedirect)
        );
        assert!(!engine.is_url_restricted(&AccessLevel::Visitor, "/open").unwrap());
    }

    #[test]
    fn test_resolve_redirect_defaults() {
        let engine = engine();
        let redirect = engine
            .resolve_redirect(&AccessLevel::Visitor, ResourceKind::AccessDeniedRedirect)
            .unwrap();
        assert_eq!(redirect, Redirect::Default);

        let err = engine.resolve_redirect(&AccessLevel::Visitor, ResourceKind::Post).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_ARGUMENT");
    }

    #[test]
    fn test_redirect_kind_prefers_closest_level() {
        let engine = engine();
        let mut default = engine
            .resource(&AccessLevel::Default, ResourceKind::LoginRedirect, None)
            .unwrap();
        default.set_setting(
            "redirect",
            SettingValue::rule([("type", json!("page_redirect")), ("page_id", json!(2))]),
        );
        let mut visitor = engine
            .resource(&AccessLevel::Visitor, ResourceKind::LoginRedirect, None)
            .unwrap();
        visitor.set_setting(
            "redirect",
            SettingValue::rule([("type", json!("url_redirect")), ("url", json!("/welcome"))]),
        );

        let redirect = engine.resolve_redirect(&AccessLevel::Visitor, ResourceKind::LoginRedirect);
        // Closer level wins wholesale for redirect preferences.
        assert_eq!(
            redirect.unwrap(),
            Redirect::UrlRedirect { url: "/welcome".into(), status_code: None }
        );
    }

    #[test]
    fn test_token_registry_lifecycle() {
        let engine = engine();
        assert!(engine.register_token(3, "jti-1").unwrap());
        assert!(!engine.is_token_revoked(3, "jti-1").unwrap());

        assert!(engine.revoke_token(3, "jti-1").unwrap());
        assert!(engine.is_token_revoked(3, "jti-1").unwrap());

        let err = engine.revoke_token(3, "jti-9").unwrap_err();
        assert_eq!(err.error_code(), "NOT_FOUND");
    }
}
