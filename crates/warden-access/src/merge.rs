//! The settings-merge engine
//!
//! Reconciles a lower access level's explicit settings with the
//! permission set inherited from a higher level. The configured
//! preference decides which effect wins ties and asymmetric
//! comparisons: `deny` gives "most restrictive wins", `allow` gives
//! "least restrictive wins", with no per-resource special casing.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::setting::{SettingValue, SettingsMap};

/// The configured tie-breaking rule for merging permissions.
///
/// # Examples
///
/// ```
/// use warden_access::MergePreference;
///
/// assert_eq!(MergePreference::parse("deny"), Some(MergePreference::Deny));
/// assert_eq!(MergePreference::default(), MergePreference::Deny);
/// assert_eq!(MergePreference::Allow.as_str(), "allow");
/// ```
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MergePreference {
    /// Most restrictive wins.
    #[default]
    Deny,
    /// Least restrictive wins.
    Allow,
}

impl MergePreference {
    /// Parse a preference from its configuration value.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "deny" => Some(Self::Deny),
            "allow" => Some(Self::Allow),
            _ => None,
        }
    }

    /// Get the string representation of the preference.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deny => "deny",
            Self::Allow => "allow",
        }
    }
}

/// Merge an inherited settings map into the current level's own.
///
/// For every key present on either side:
///
/// 1. Equal effects keep the current level's literal value (ties
///    favor the more specific level).
/// 2. Whichever side's effect equals the preferred effect (`true`
///    for deny preference, `false` for allow) wins outright,
///    `incoming` checked first.
/// 3. Otherwise one side is absent or null while the other does not
///    match the preferred effect: under allow preference the defined
///    side is written with its effect forced off (a placeholder is
///    written even when both effects are null); under deny
///    preference the side with a non-null effect passes through
///    as-is, and the key is dropped entirely when both are null.
///
/// The null/null asymmetry between the two preferences mirrors the
/// persisted data this engine has to stay compatible with; see the
/// dedicated tests before changing it.
///
/// # Example
///
/// ```
/// use warden_access::{merge_settings_with, MergePreference};
/// use warden_access::setting::{SettingValue, SettingsMap};
///
/// let mut inherited = SettingsMap::new();
/// inherited.insert("edit".into(), SettingValue::Flag(true));
/// let mut own = SettingsMap::new();
/// own.insert("edit".into(), SettingValue::Flag(false));
///
/// let merged = merge_settings_with(&inherited, &own, MergePreference::Deny);
/// assert_eq!(merged["edit"], SettingValue::Flag(true));
/// ```
pub fn merge_settings_with(
    incoming: &SettingsMap,
    base: &SettingsMap,
    preference: MergePreference,
) -> SettingsMap {
    let target = preference == MergePreference::Deny;
    let mut result = SettingsMap::new();

    for key in unique_keys(incoming, base) {
        let incoming_effect = incoming.get(key).and_then(SettingValue::effect);
        let base_effect = base.get(key).and_then(SettingValue::effect);

        let merged = if incoming_effect == base_effect {
            match base_effect {
                Some(_) => base.get(key).cloned(),
                // Both null: allow preference writes a forced-off
                // placeholder, deny preference drops the key.
                None => match preference {
                    MergePreference::Allow => defined_value(base, incoming, key).map(|v| v.forced_off()),
                    MergePreference::Deny => None,
                },
            }
        } else if incoming_effect == Some(target) {
            incoming.get(key).cloned()
        } else if base_effect == Some(target) {
            base.get(key).cloned()
        } else {
            // One side absent/null, the other not matching the
            // preferred effect.
            match preference {
                MergePreference::Allow => defined_value(base, incoming, key).map(|v| v.forced_off()),
                MergePreference::Deny => {
                    if base_effect.is_some() {
                        base.get(key).cloned()
                    } else {
                        incoming.get(key).cloned()
                    }
                }
            }
        };

        if let Some(value) = merged {
            result.insert(key.to_string(), value);
        } else {
            trace!(key, preference = preference.as_str(), "merge dropped key");
        }
    }

    result
}

/// Deep merge with the current level's settings taking priority.
///
/// Used by preference-typed resources (redirect configuration and
/// similar), where the closest level simply wins per key and nested
/// rule attributes are merged recursively.
pub fn merge_prefer_base(incoming: &SettingsMap, base: &SettingsMap) -> SettingsMap {
    let mut result = incoming.clone();
    for (key, value) in base {
        match (result.get(key), value) {
            (Some(SettingValue::Rule(lower)), SettingValue::Rule(upper)) => {
                let mut merged = lower.clone();
                for (attr, attr_value) in upper {
                    merged.insert(attr.clone(), attr_value.clone());
                }
                result.insert(key.clone(), SettingValue::Rule(merged));
            }
            _ => {
                result.insert(key.clone(), value.clone());
            }
        }
    }
    result
}

/// Keys of both maps, incoming first, without duplicates.
fn unique_keys<'a>(incoming: &'a SettingsMap, base: &'a SettingsMap) -> Vec<&'a str> {
    let mut keys: Vec<&str> = incoming.keys().map(String::as_str).collect();
    for key in base.keys() {
        if !incoming.contains_key(key) {
            keys.push(key);
        }
    }
    keys
}

fn defined_value<'a>(
    base: &'a SettingsMap,
    incoming: &'a SettingsMap,
    key: &str,
) -> Option<&'a SettingValue> {
    base.get(key).or_else(|| incoming.get(key))
}
