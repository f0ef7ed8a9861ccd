//! URL rule matching and redirect resolution
//!
//! URL rules live in one settings blob per access level, keyed by
//! normalized URL, valued by `{effect, redirect?}` payloads. Allow
//! rules are evaluated after every deny rule regardless of storage
//! order, so a narrower allow rule carves an exception out of a
//! broader deny no matter where it was registered.

use std::collections::BTreeMap;
use tracing::debug;

use crate::error::AccessResult;
use crate::merge::{merge_settings_with, MergePreference};
use crate::redirect::Redirect;
use crate::setting::{SettingValue, SettingsMap};

/// A URL split into its comparable parts.
///
/// The path is Unicode-lowercased with one trailing slash stripped
/// (never the bare `/`); query parameters are held sorted by key so
/// comparison and canonical formatting are order-independent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedUrl {
    /// Normalized path component.
    pub path: String,
    /// Query parameters, sorted by key.
    pub query: BTreeMap<String, String>,
}

impl ParsedUrl {
    /// Parse and normalize a URL or URI.
    ///
    /// Absolute URLs are reduced to their path; fragments are
    /// discarded.
    ///
    /// # Examples
    ///
    /// ```
    /// use warden_access::url::ParsedUrl;
    ///
    /// let url = ParsedUrl::parse("/Members/Area/?b=2&a=1");
    /// assert_eq!(url.path, "/members/area");
    /// assert_eq!(url.canonical(), "/members/area?a=1&b=2");
    /// ```
    pub fn parse(raw: &str) -> Self {
        let raw = raw.split('#').next().unwrap_or("");
        let without_host = match raw.split_once("://") {
            Some((_, rest)) => match rest.find('/') {
                Some(slash) => &rest[slash..],
                None => "/",
            },
            None => raw,
        };
        let (path, query_string) = match without_host.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (without_host, None),
        };

        let mut path = path.to_lowercase();
        if path.len() > 1 && path.ends_with('/') {
            path.pop();
        }
        if path.is_empty() {
            path.push('/');
        }

        let mut query = BTreeMap::new();
        if let Some(query_string) = query_string {
            for pair in query_string.split('&').filter(|p| !p.is_empty()) {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                query.insert(key.to_string(), value.to_string());
            }
        }

        Self { path, query }
    }

    /// Canonical string form: path plus alphabetically sorted query.
    pub fn canonical(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let query: Vec<String> =
            self.query.iter().map(|(key, value)| format!("{}={}", key, value)).collect();
        format!("{}?{}", self.path, query.join("&"))
    }

    /// `true` when this rule URL applies to `target`.
    ///
    /// Paths must be equal; every query parameter on the rule side
    /// must be present with an equal value on the target (subset
    /// match, not full equality).
    pub fn applies_to(&self, target: &ParsedUrl) -> bool {
        if self.path != target.path {
            return false;
        }
        self.query
            .iter()
            .all(|(key, value)| target.query.get(key).map(String::as_str) == Some(value.as_str()))
    }
}

/// Normalize a URL to its canonical rule key.
pub fn normalize(raw: &str) -> String {
    ParsedUrl::parse(raw).canonical()
}

/// `true` when a rule value restricts access (anything not
/// explicitly `allow`).
pub fn rule_restricts(value: &SettingValue) -> bool {
    match value {
        SettingValue::Flag(flag) => *flag,
        SettingValue::Text(text) => text != "allow",
        SettingValue::Rule(rule) => {
            rule.get("effect").and_then(|effect| effect.as_str()).unwrap_or("deny") != "allow"
        }
        SettingValue::Null => true,
    }
}

/// Resolve the authoritative rule for a URL, if any.
///
/// Deny rules are evaluated first, then allow rules, each group in
/// insertion order; the last rule that matches wins. `None` means no
/// rule applies and the caller defaults to "allowed".
pub fn match_rule<'a>(
    rules: &'a SettingsMap,
    target: &str,
) -> Option<(&'a str, &'a SettingValue)> {
    let target = ParsedUrl::parse(target);
    let mut result = None;

    let denies = rules.iter().filter(|(_, value)| rule_restricts(value));
    let allows = rules.iter().filter(|(_, value)| !rule_restricts(value));

    for (rule_url, value) in denies.chain(allows) {
        if ParsedUrl::parse(rule_url).applies_to(&target) {
            result = Some((rule_url.as_str(), value));
        }
    }

    if let Some((rule_url, _)) = result {
        debug!(target = %target.canonical(), rule = rule_url, "url rule matched");
    }
    result
}

/// `true` when the authoritative rule for `target` restricts it.
pub fn is_restricted(rules: &SettingsMap, target: &str) -> bool {
    match_rule(rules, target).map(|(_, value)| rule_restricts(value)).unwrap_or(false)
}

/// The redirect attached to the authoritative rule for `target`.
///
/// `None` when no rule matches, the rule allows access, or the rule
/// carries no redirect payload.
pub fn redirect_for(rules: &SettingsMap, target: &str) -> AccessResult<Option<Redirect>> {
    match match_rule(rules, target) {
        Some((_, value)) if rule_restricts(value) => match value.as_rule() {
            Some(rule) => Redirect::from_rule(rule),
            None => Ok(None),
        },
        _ => Ok(None),
    }
}

/// Merge inherited URL rules into the current level's own.
///
/// Rule values carry directional `effect` strings rather than plain
/// booleans, so each side is first flattened to booleans ("not
/// allow" is `true`), run through the generic binary merge, then
/// mapped back to the original payload of whichever side supplied
/// the winning effect. Rules the merge did not alter round-trip
/// losslessly.
pub fn merge_url_settings(
    incoming: &SettingsMap,
    base: &SettingsMap,
    preference: MergePreference,
) -> SettingsMap {
    let flatten = |rules: &SettingsMap| -> SettingsMap {
        rules
            .iter()
            .map(|(url, value)| (url.clone(), SettingValue::Flag(rule_restricts(value))))
            .collect()
    };

    let merged = merge_settings_with(&flatten(incoming), &flatten(base), preference);

    merged
        .iter()
        .map(|(url, flag)| {
            let restricted = flag.effect().unwrap_or(false);
            let original = base
                .get(url)
                .filter(|value| rule_restricts(value) == restricted)
                .or_else(|| incoming.get(url).filter(|value| rule_restricts(value) == restricted));
            let value = match original {
                Some(value) => value.clone(),
                // The merge downgraded both sides; synthesize a
                // plain allow rule.
                None => SettingValue::rule([("effect", serde_json::json!("allow"))]),
            };
            (url.clone(), value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn deny(redirect: Option<serde_json::Value>) -> SettingValue {
        let mut pairs = vec![("effect", json!("deny"))];
        if let Some(redirect) = redirect {
            pairs.push(("redirect", redirect));
        }
        SettingValue::rule(pairs)
    }

    fn allow() -> SettingValue {
        SettingValue::rule([("effect", json!("allow"))])
    }

    fn rules(entries: &[(&str, SettingValue)]) -> SettingsMap {
        entries.iter().map(|(k, v)| (normalize(k), v.clone())).collect()
    }

    #[test]
    fn test_normalization() {
        assert_eq!(normalize("/Admin/"), "/admin");
        assert_eq!(normalize("/"), "/");
        assert_eq!(normalize("https://example.com/Area?b=2&a=1"), "/area?a=1&b=2");
        assert_eq!(normalize("/page#section"), "/page");
        assert_eq!(normalize("/Ünïcode"), "/ünïcode");
    }

    #[test]
    fn test_allow_override_wins_regardless_of_order() {
        // Allow registered before the broader deny still wins,
        // because allow rules are evaluated last.
        let rules = rules(&[("/admin/public", allow()), ("/admin", deny(None))]);

        assert!(is_restricted(&rules, "/admin"));
        assert!(!is_restricted(&rules, "/admin/public?x=1"));
    }

    #[test]
    fn test_query_params_are_subset_matched() {
        let rules = rules(&[("/reports?team=ops", deny(None))]);

        assert!(is_restricted(&rules, "/reports?team=ops&page=2"));
        assert!(!is_restricted(&rules, "/reports?team=eng"));
        assert!(!is_restricted(&rules, "/reports"));
    }

    #[test]
    fn test_no_match_defaults_to_allowed() {
        let rules = rules(&[("/private", deny(None))]);
        assert!(!is_restricted(&rules, "/public"));
        assert!(match_rule(&rules, "/public").is_none());
    }

    #[test]
    fn test_redirect_resolution() {
        let rules = rules(&[(
            "/members",
            deny(Some(json!({"type": "login_redirect"}))),
        )]);

        let redirect = redirect_for(&rules, "/Members/").unwrap();
        assert_eq!(redirect, Some(Redirect::LoginRedirect));
        assert_eq!(redirect_for(&rules, "/open").unwrap(), None);
    }

    #[test]
    fn test_merge_keeps_unaltered_rules_lossless() {
        let incoming = rules(&[("/inherited", deny(Some(json!({"type": "default"}))))]);
        let base = rules(&[("/own", deny(None))]);

        let merged = merge_url_settings(&incoming, &base, MergePreference::Deny);
        assert_eq!(merged[&normalize("/inherited")], incoming[&normalize("/inherited")]);
        assert_eq!(merged[&normalize("/own")], base[&normalize("/own")]);
    }

    #[test]
    fn test_merge_deny_preference_keeps_restriction() {
        let incoming = rules(&[("/area", deny(Some(json!({"type": "login_redirect"}))))]);
        let base = rules(&[("/area", allow())]);

        let merged = merge_url_settings(&incoming, &base, MergePreference::Deny);
        assert!(rule_restricts(&merged[&normalize("/area")]));
        // The winning payload is the restricting side's, redirect intact.
        assert_eq!(merged[&normalize("/area")], incoming[&normalize("/area")]);
    }

    #[test]
    fn test_merge_allow_preference_relaxes() {
        let incoming = rules(&[("/area", deny(None))]);
        let base = rules(&[("/area", allow())]);

        let merged = merge_url_settings(&incoming, &base, MergePreference::Allow);
        assert!(!rule_restricts(&merged[&normalize("/area")]));
        assert_eq!(merged[&normalize("/area")], base[&normalize("/area")]);
    }
}
