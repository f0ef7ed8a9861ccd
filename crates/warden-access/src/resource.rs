//! Typed resources and their permission containers
//!
//! A resource is the *what* of a permission: a typed, optionally
//! instance-scoped container of settings for one access level. It
//! reads its explicit settings once at construction, overlays
//! policy-derived settings underneath them, and exposes the merge
//! operation used when folding in inherited settings.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use crate::merge::{merge_prefer_base, merge_settings_with, MergePreference};
use crate::setting::{SettingValue, SettingsMap};
use crate::store::{SettingsScope, SettingsStore};
use crate::url;

/// All resource kinds access can be controlled for.
///
/// The kind decides instance scoping, whether construction requires
/// an existing underlying entity, and which merge strategy applies.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// A single post or page.
    Post,
    /// A taxonomy term.
    Term,
    /// A post type as a whole.
    PostType,
    /// A taxonomy as a whole.
    Taxonomy,
    /// One admin menu item.
    AdminMenu,
    /// One admin toolbar item.
    Toolbar,
    /// One metabox or dashboard widget slot.
    Metabox,
    /// One frontend widget.
    Widget,
    /// One API route.
    ApiRoute,
    /// The URL rule set (one blob of rules per level).
    Url,
    /// One capability grant.
    Capability,
    /// Issued-token registry for a user level.
    Jwt,
    /// Login redirect configuration.
    LoginRedirect,
    /// Logout redirect configuration.
    LogoutRedirect,
    /// Not-found (404) redirect configuration.
    NotFoundRedirect,
    /// Access-denied redirect configuration.
    AccessDeniedRedirect,
}

/// How a resource kind reconciles inherited settings with its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStrategy {
    /// Generic binary merge driven by the configured preference.
    Binary,
    /// Deep merge where the closer level simply wins per key.
    PreferClosest,
    /// Rules flattened to booleans, merged, then mapped back.
    UrlRules,
}

impl ResourceKind {
    /// Get the string representation of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Term => "term",
            Self::PostType => "post_type",
            Self::Taxonomy => "taxonomy",
            Self::AdminMenu => "admin_menu",
            Self::Toolbar => "toolbar",
            Self::Metabox => "metabox",
            Self::Widget => "widget",
            Self::ApiRoute => "api_route",
            Self::Url => "url",
            Self::Capability => "capability",
            Self::Jwt => "jwt",
            Self::LoginRedirect => "login_redirect",
            Self::LogoutRedirect => "logout_redirect",
            Self::NotFoundRedirect => "not_found_redirect",
            Self::AccessDeniedRedirect => "access_denied_redirect",
        }
    }

    /// Parse a kind from string representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "post" => Some(Self::Post),
            "term" => Some(Self::Term),
            "post_type" => Some(Self::PostType),
            "taxonomy" => Some(Self::Taxonomy),
            "admin_menu" => Some(Self::AdminMenu),
            "toolbar" => Some(Self::Toolbar),
            "metabox" => Some(Self::Metabox),
            "widget" => Some(Self::Widget),
            "api_route" => Some(Self::ApiRoute),
            "url" => Some(Self::Url),
            "capability" => Some(Self::Capability),
            "jwt" => Some(Self::Jwt),
            "login_redirect" => Some(Self::LoginRedirect),
            "logout_redirect" => Some(Self::LogoutRedirect),
            "not_found_redirect" => Some(Self::NotFoundRedirect),
            "access_denied_redirect" => Some(Self::AccessDeniedRedirect),
            _ => None,
        }
    }

    /// `true` when settings are stored per instance id.
    pub fn is_instance_scoped(&self) -> bool {
        matches!(
            self,
            Self::Post
                | Self::Term
                | Self::PostType
                | Self::Taxonomy
                | Self::AdminMenu
                | Self::Toolbar
                | Self::Metabox
                | Self::Widget
                | Self::ApiRoute
                | Self::Capability
        )
    }

    /// `true` when construction must verify the underlying entity.
    pub fn requires_entity(&self) -> bool {
        matches!(self, Self::Post | Self::Term | Self::PostType | Self::Taxonomy)
    }

    /// The merge strategy this kind uses.
    pub fn merge_strategy(&self) -> MergeStrategy {
        match self {
            Self::Url => MergeStrategy::UrlRules,
            Self::LoginRedirect
            | Self::LogoutRedirect
            | Self::NotFoundRedirect
            | Self::AccessDeniedRedirect => MergeStrategy::PreferClosest,
            _ => MergeStrategy::Binary,
        }
    }

    /// All kinds, for registries and exhaustive scans.
    pub fn all() -> [ResourceKind; 16] {
        [
            Self::Post,
            Self::Term,
            Self::PostType,
            Self::Taxonomy,
            Self::AdminMenu,
            Self::Toolbar,
            Self::Metabox,
            Self::Widget,
            Self::ApiRoute,
            Self::Url,
            Self::Capability,
            Self::Jwt,
            Self::LoginRedirect,
            Self::LogoutRedirect,
            Self::NotFoundRedirect,
            Self::AccessDeniedRedirect,
        ]
    }
}

/// A permission container for one access level and one resource.
///
/// `explicit` holds exactly what is persisted for this level;
/// `effective` is explicit over policy-derived settings, and is
/// further merged with inherited settings by the engine during
/// consumption. Explicit always means "present in this level's own
/// unmerged store", never the merged result.
#[derive(Clone)]
pub struct Resource {
    scope: SettingsScope,
    explicit: SettingsMap,
    policy: SettingsMap,
    effective: SettingsMap,
    preference: MergePreference,
    store: Arc<dyn SettingsStore>,
}

impl std::fmt::Debug for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resource")
            .field("scope", &self.scope)
            .field("explicit", &self.explicit)
            .field("policy", &self.policy)
            .field("preference", &self.preference)
            .finish()
    }
}

impl Resource {
    /// Assemble a resource from its already-loaded parts.
    ///
    /// `explicit` is this level's persisted settings; `policy` is the
    /// policy-derived overlay, which explicit settings win over per
    /// key. Engines construct resources; this is the seam they use.
    pub fn assemble(
        scope: SettingsScope,
        explicit: SettingsMap,
        policy: SettingsMap,
        preference: MergePreference,
        store: Arc<dyn SettingsStore>,
    ) -> Self {
        let effective = overlay(&policy, &explicit);
        Self { scope, explicit, policy, effective, preference, store }
    }

    /// The scope this resource reads and writes.
    pub fn scope(&self) -> &SettingsScope {
        &self.scope
    }

    /// The kind of this resource.
    pub fn kind(&self) -> ResourceKind {
        self.scope.kind
    }

    /// Effective settings (explicit over policy).
    pub fn settings(&self) -> &SettingsMap {
        &self.effective
    }

    /// Settings persisted for this exact level, nothing inherited.
    pub fn explicit_settings(&self) -> &SettingsMap {
        &self.explicit
    }

    /// One effective setting, if present.
    pub fn setting(&self, key: &str) -> Option<&SettingValue> {
        self.effective.get(key)
    }

    /// Replace the explicit settings verbatim and persist them.
    ///
    /// On success the effective set is recomputed as explicit over
    /// the previous effective set (explicit wins per key). Returns
    /// persistence success.
    pub fn set_settings(&mut self, settings: SettingsMap) -> bool {
        if !self.store.set(&self.scope, &settings) {
            warn!(scope = %self.scope.storage_key(), "settings write failed");
            return false;
        }
        self.effective = overlay(&self.effective, &settings);
        self.explicit = settings;
        true
    }

    /// Write one explicit setting, keeping sibling keys.
    pub fn set_setting(&mut self, key: impl Into<String>, value: SettingValue) -> bool {
        let mut settings = self.explicit.clone();
        settings.insert(key.into(), value);
        self.set_settings(settings)
    }

    /// `true` iff the key (or any key, when `None`) exists in the
    /// explicit settings.
    pub fn is_overwritten(&self, key: Option<&str>) -> bool {
        match key {
            Some(key) => self.explicit.contains_key(key),
            None => !self.explicit.is_empty(),
        }
    }

    /// Merge inherited settings into this resource's effective set.
    ///
    /// Pure: does not mutate the resource. Dispatches on the kind's
    /// merge strategy.
    pub fn merge_settings(&self, incoming: &SettingsMap) -> SettingsMap {
        match self.kind().merge_strategy() {
            MergeStrategy::Binary => merge_settings_with(incoming, &self.effective, self.preference),
            MergeStrategy::PreferClosest => merge_prefer_base(incoming, &self.effective),
            MergeStrategy::UrlRules => url::merge_url_settings(incoming, &self.effective, self.preference),
        }
    }

    /// Clear explicit settings and delete the persisted blob.
    ///
    /// Effective settings fall back to the policy overlay alone.
    /// Returns persistence success.
    pub fn reset(&mut self) -> bool {
        if !self.store.delete(&self.scope) {
            warn!(scope = %self.scope.storage_key(), "settings delete failed");
            return false;
        }
        self.explicit = SettingsMap::new();
        self.effective = self.policy.clone();
        true
    }
}

/// `upper` over `lower`, per key.
fn overlay(lower: &SettingsMap, upper: &SettingsMap) -> SettingsMap {
    let mut result = lower.clone();
    for (key, value) in upper {
        result.insert(key.clone(), value.clone());
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::AccessLevel;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn resource_with(explicit: SettingsMap, policy: SettingsMap) -> Resource {
        let store = Arc::new(MemoryStore::new());
        let scope = SettingsScope::instance(AccessLevel::Role("editor".into()), ResourceKind::Post, "42");
        store.set(&scope, &explicit);
        Resource::assemble(scope, explicit, policy, MergePreference::Deny, store)
    }

    fn map(entries: &[(&str, SettingValue)]) -> SettingsMap {
        entries.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_kind_string_round_trip() {
        for kind in ResourceKind::all() {
            assert_eq!(ResourceKind::parse(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn test_kind_classification() {
        assert!(ResourceKind::Post.is_instance_scoped());
        assert!(ResourceKind::Post.requires_entity());
        assert!(ResourceKind::Capability.is_instance_scoped());
        assert!(!ResourceKind::Capability.requires_entity());
        assert!(!ResourceKind::Url.is_instance_scoped());
        assert_eq!(ResourceKind::Url.merge_strategy(), MergeStrategy::UrlRules);
        assert_eq!(ResourceKind::LoginRedirect.merge_strategy(), MergeStrategy::PreferClosest);
        assert_eq!(ResourceKind::Post.merge_strategy(), MergeStrategy::Binary);
    }

    #[test]
    fn test_explicit_wins_over_policy() {
        let explicit = map(&[("read", SettingValue::Flag(false))]);
        let policy = map(&[("read", SettingValue::Flag(true)), ("edit", SettingValue::Flag(true))]);
        let resource = resource_with(explicit, policy);

        assert_eq!(resource.setting("read"), Some(&SettingValue::Flag(false)));
        assert_eq!(resource.setting("edit"), Some(&SettingValue::Flag(true)));
        // Policy-derived keys are not explicit.
        assert!(resource.is_overwritten(Some("read")));
        assert!(!resource.is_overwritten(Some("edit")));
    }

    #[test]
    fn test_set_setting_keeps_siblings() {
        let mut resource = resource_with(map(&[("read", SettingValue::Flag(true))]), SettingsMap::new());
        assert!(resource.set_setting("edit", SettingValue::Flag(false)));

        assert_eq!(resource.explicit_settings().len(), 2);
        assert!(resource.is_overwritten(Some("read")));
        assert!(resource.is_overwritten(Some("edit")));
    }

    #[test]
    fn test_set_settings_replaces_explicit_keeps_effective_rest() {
        let mut resource = resource_with(
            map(&[("read", SettingValue::Flag(true))]),
            map(&[("comment", SettingValue::Flag(true))]),
        );
        assert!(resource.set_settings(map(&[("edit", SettingValue::rule([("enabled", json!(true))]))])));

        // Explicit was replaced verbatim.
        assert!(!resource.is_overwritten(Some("read")));
        assert!(resource.is_overwritten(Some("edit")));
        // Previous effective entries survive underneath.
        assert_eq!(resource.setting("read"), Some(&SettingValue::Flag(true)));
        assert_eq!(resource.setting("comment"), Some(&SettingValue::Flag(true)));
    }

    #[test]
    fn test_reset_clears_explicit_and_store() {
        let store = Arc::new(MemoryStore::new());
        let scope = SettingsScope::instance(AccessLevel::User(7), ResourceKind::Post, "42");
        let explicit = map(&[("read", SettingValue::Flag(true))]);
        store.set(&scope, &explicit);
        let mut resource = Resource::assemble(
            scope.clone(),
            explicit,
            map(&[("comment", SettingValue::Flag(true))]),
            MergePreference::Deny,
            store.clone(),
        );

        assert!(resource.reset());
        assert!(resource.explicit_settings().is_empty());
        assert!(store.get(&scope).is_none());
        // Effective falls back to the policy overlay.
        assert_eq!(resource.setting("comment"), Some(&SettingValue::Flag(true)));
        assert_eq!(resource.setting("read"), None);
    }

    #[test]
    fn test_merge_settings_is_pure() {
        let resource = resource_with(map(&[("read", SettingValue::Flag(false))]), SettingsMap::new());
        let incoming = map(&[("read", SettingValue::Flag(true))]);

        let merged = resource.merge_settings(&incoming);
        assert_eq!(merged["read"], SettingValue::Flag(true));
        assert_eq!(resource.setting("read"), Some(&SettingValue::Flag(false)));
    }
}
