//! Configuration access
//!
//! The engine reads its tunables (merge preference, cache sizing)
//! and the JWT subsystem reads its algorithm/key material through
//! one flat, dotted-key configuration surface supplied by the
//! embedder.

use indexmap::IndexMap;
use serde_json::Value;

use crate::merge::MergePreference;
use crate::resource::ResourceKind;

/// Well-known configuration keys.
pub mod keys {
    /// Global merge preference (`deny` or `allow`).
    pub const MERGE_PREFERENCE: &str = "core.settings.merge.preference";
    /// Per-kind merge preference prefix; the kind string is appended.
    pub const MERGE_PREFERENCE_PREFIX: &str = "core.settings.merge.preference.";
    /// Object cache capacity.
    pub const CACHE_CAPACITY: &str = "core.cache.capacity";
    /// JWT signing algorithm.
    pub const JWT_ALGORITHM: &str = "service.jwt.signing_algorithm";
    /// JWT HMAC secret.
    pub const JWT_SECRET: &str = "service.jwt.signing_secret";
    /// Path to the JWT private key file (RSA/EC/EdDSA).
    pub const JWT_PRIVATE_KEY_PATH: &str = "service.jwt.private_key_path";
    /// Path to the JWT public key file (RSA/EC/EdDSA).
    pub const JWT_PUBLIC_KEY_PATH: &str = "service.jwt.public_key_path";
    /// JWT issuer string.
    pub const JWT_ISSUER: &str = "service.jwt.issuer";
    /// Validation leeway in seconds.
    pub const JWT_LEEWAY: &str = "service.jwt.leeway";
    /// Default token lifetime expression.
    pub const JWT_TTL: &str = "service.jwt.ttl";
}

/// Flat dotted-key configuration lookup.
pub trait ConfigProvider: Send + Sync {
    /// Raw value for a key, if configured.
    fn get(&self, key: &str) -> Option<Value>;

    /// String value with a default.
    fn get_str(&self, key: &str, default: &str) -> String {
        self.get(key)
            .and_then(|value| value.as_str().map(str::to_string))
            .unwrap_or_else(|| default.to_string())
    }

    /// Integer value with a default.
    fn get_i64(&self, key: &str, default: i64) -> i64 {
        self.get(key).and_then(|value| value.as_i64()).unwrap_or(default)
    }

    /// Boolean value with a default.
    fn get_bool(&self, key: &str, default: bool) -> bool {
        self.get(key).and_then(|value| value.as_bool()).unwrap_or(default)
    }

    /// The merge preference for a resource kind: the per-kind
    /// override when present, else the global preference, else deny.
    fn merge_preference(&self, kind: ResourceKind) -> MergePreference {
        let per_kind = format!("{}{}", keys::MERGE_PREFERENCE_PREFIX, kind.as_str());
        let global = self.get_str(keys::MERGE_PREFERENCE, MergePreference::Deny.as_str());
        let raw = self.get_str(&per_kind, &global);
        MergePreference::parse(&raw).unwrap_or_default()
    }
}

/// In-memory configuration map.
///
/// # Examples
///
/// ```
/// use warden_access::config::{keys, ConfigProvider, MapConfig};
/// use warden_access::{MergePreference, ResourceKind};
/// use serde_json::json;
///
/// let mut config = MapConfig::new();
/// config.set(keys::MERGE_PREFERENCE, json!("allow"));
/// assert_eq!(config.merge_preference(ResourceKind::Post), MergePreference::Allow);
/// ```
#[derive(Debug, Default, Clone)]
pub struct MapConfig {
    values: IndexMap<String, Value>,
}

impl MapConfig {
    /// Create an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set one key.
    pub fn set(&mut self, key: impl Into<String>, value: Value) -> &mut Self {
        self.values.insert(key.into(), value);
        self
    }

    /// Build from key/value pairs.
    pub fn from_entries<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, Value)>,
    {
        let mut config = Self::new();
        for (key, value) in entries {
            config.set(key, value);
        }
        config
    }
}

impl ConfigProvider for MapConfig {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_typed_accessors_with_defaults() {
        let config = MapConfig::from_entries([
            ("core.cache.capacity", json!(128)),
            ("service.jwt.issuer", json!("https://example.test")),
        ]);

        assert_eq!(config.get_i64(keys::CACHE_CAPACITY, 64), 128);
        assert_eq!(config.get_str(keys::JWT_ISSUER, ""), "https://example.test");
        assert_eq!(config.get_i64("missing", 7), 7);
        assert!(config.get_bool("missing", true));
    }

    #[test]
    fn test_merge_preference_defaults_to_deny() {
        let config = MapConfig::new();
        assert_eq!(config.merge_preference(ResourceKind::Post), MergePreference::Deny);
    }

    #[test]
    fn test_per_kind_preference_overrides_global() {
        let config = MapConfig::from_entries([
            (keys::MERGE_PREFERENCE, json!("deny")),
            ("core.settings.merge.preference.url", json!("allow")),
        ]);

        assert_eq!(config.merge_preference(ResourceKind::Post), MergePreference::Deny);
        assert_eq!(config.merge_preference(ResourceKind::Url), MergePreference::Allow);
    }

    #[test]
    fn test_garbage_preference_falls_back() {
        let config = MapConfig::from_entries([(keys::MERGE_PREFERENCE, json!("maybe"))]);
        assert_eq!(config.merge_preference(ResourceKind::Post), MergePreference::Deny);
    }
}
