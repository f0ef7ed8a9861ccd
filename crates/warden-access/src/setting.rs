//! Setting values and settings maps
//!
//! A settings map is the unit of persistence and merging: permission
//! key to permission value, where a value is a plain flag, a string,
//! or a structured rule carrying at least `effect` or `enabled` plus
//! resource-specific attributes (`redirect`, `message`, `on`, ...).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Structured rule payload (arbitrary JSON attributes).
pub type RuleMap = serde_json::Map<String, Value>;

/// A settings map: permission key to permission value.
///
/// Insertion order is preserved; URL rule evaluation and merge output
/// ordering depend on it.
pub type SettingsMap = IndexMap<String, SettingValue>;

/// A single permission value.
///
/// Absence of a key in a [`SettingsMap`] means "not explicitly set at
/// this level", which is distinct from an explicit allow. A `Null`
/// value is kept distinct from absence because the merge algorithm
/// treats a present-but-null value specially.
///
/// # Example
///
/// ```
/// use warden_access::setting::SettingValue;
///
/// let flag = SettingValue::Flag(true);
/// assert_eq!(flag.effect(), Some(true));
///
/// let rule: SettingValue = serde_json::from_str(r#"{"enabled": false, "on": ["frontend"]}"#).unwrap();
/// assert_eq!(rule.effect(), Some(false));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    /// Explicit JSON null (present but effect-less).
    Null,
    /// Plain boolean flag (`true` = enforced/restricted).
    Flag(bool),
    /// Bare string value (effect strings, capability grants).
    Text(String),
    /// Structured rule with arbitrary attributes.
    Rule(RuleMap),
}

impl SettingValue {
    /// Build a rule value from JSON pairs.
    ///
    /// # Example
    ///
    /// ```
    /// use warden_access::setting::SettingValue;
    /// use serde_json::json;
    ///
    /// let rule = SettingValue::rule([("effect", json!("deny"))]);
    /// assert!(rule.as_rule().is_some());
    /// ```
    pub fn rule<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, Value)>,
    {
        let mut map = RuleMap::new();
        for (key, value) in pairs {
            map.insert(key.to_string(), value);
        }
        SettingValue::Rule(map)
    }

    /// The boolean effect of this value, `None` for null.
    ///
    /// Structured rules carrying an `enabled` flag evaluate to that
    /// flag's truthiness; everything else evaluates to the truthiness
    /// of the raw value (non-empty map, non-empty/non-"0" string,
    /// plain bool). `true` means enforced/restricted.
    pub fn effect(&self) -> Option<bool> {
        match self {
            SettingValue::Null => None,
            SettingValue::Flag(flag) => Some(*flag),
            SettingValue::Text(text) => Some(truthy_str(text)),
            SettingValue::Rule(rule) => match rule.get("enabled") {
                Some(enabled) => Some(truthy(enabled)),
                None => Some(!rule.is_empty()),
            },
        }
    }

    /// Return a copy with the effect forced off.
    ///
    /// Rules get `enabled: false`; every other shape collapses to
    /// `Flag(false)`.
    pub fn forced_off(&self) -> SettingValue {
        match self {
            SettingValue::Rule(rule) => {
                let mut rule = rule.clone();
                rule.insert("enabled".to_string(), Value::Bool(false));
                SettingValue::Rule(rule)
            }
            _ => SettingValue::Flag(false),
        }
    }

    /// The structured rule payload, if this value is one.
    pub fn as_rule(&self) -> Option<&RuleMap> {
        match self {
            SettingValue::Rule(rule) => Some(rule),
            _ => None,
        }
    }

    /// String attribute lookup on a structured rule.
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.as_rule().and_then(|rule| rule.get(key))
    }
}

impl From<bool> for SettingValue {
    fn from(flag: bool) -> Self {
        SettingValue::Flag(flag)
    }
}

impl From<&str> for SettingValue {
    fn from(text: &str) -> Self {
        SettingValue::Text(text.to_string())
    }
}

/// Truthiness of an arbitrary JSON value.
///
/// Empty strings, "0", zero numbers, empty arrays/objects, null and
/// false are falsy; everything else is truthy.
pub(crate) fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().map(|n| n != 0.0).unwrap_or(false),
        Value::String(text) => truthy_str(text),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn truthy_str(text: &str) -> bool {
    !text.is_empty() && text != "0"
}

/// Convert a settings map to a JSON object value.
pub fn to_json(settings: &SettingsMap) -> Value {
    serde_json::to_value(settings).unwrap_or(Value::Null)
}

/// Parse a settings map from a JSON object value.
///
/// Returns an empty map for anything that is not an object.
pub fn from_json(value: &Value) -> SettingsMap {
    serde_json::from_value(value.clone()).unwrap_or_default()
}
