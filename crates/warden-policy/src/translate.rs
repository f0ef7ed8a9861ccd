//! Statement-to-permission translation
//!
//! Converts a statement's actions into the settings-map entries the
//! resource layer consumes. Builders are registered per action name
//! in one explicit table; unknown actions are rejected instead of
//! silently producing nothing.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use warden_access::setting::SettingValue;
use warden_access::SettingsMap;

use crate::error::{PolicyError, PolicyResult};
use crate::statement::Statement;

/// Action name used when a statement carries no `Action` block.
pub const GENERAL_ACCESS: &str = "access";

/// Builds one settings entry from a statement for one action.
pub type PermissionBuilder = Arc<dyn Fn(&Statement) -> (String, SettingValue) + Send + Sync>;

/// The action-to-builder translation table.
///
/// # Examples
///
/// ```
/// use warden_policy::{Statement, TranslationTable};
/// use serde_json::json;
///
/// let table = TranslationTable::standard();
/// let statement = Statement::from_json(&json!({
///     "Effect": "deny",
///     "Resource": "Post:42",
///     "Action": "read"
/// })).unwrap();
///
/// let settings = table.translate(&statement).unwrap();
/// assert!(settings.contains_key("read"));
/// ```
#[derive(Clone)]
pub struct TranslationTable {
    builders: HashMap<String, PermissionBuilder>,
}

impl std::fmt::Debug for TranslationTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut actions: Vec<&str> = self.builders.keys().map(String::as_str).collect();
        actions.sort_unstable();
        f.debug_struct("TranslationTable").field("actions", &actions).finish()
    }
}

impl TranslationTable {
    /// An empty table with no registered actions.
    pub fn empty() -> Self {
        Self { builders: HashMap::new() }
    }

    /// The standard table covering the built-in actions.
    ///
    /// Each standard action maps to a settings key of the same name
    /// with an `{effect}` rule payload.
    pub fn standard() -> Self {
        let mut table = Self::empty();
        for action in ["read", "edit", "delete", "publish", "comment", "list", GENERAL_ACCESS] {
            table
                .register(action, move |statement: &Statement| {
                    (
                        action.to_string(),
                        SettingValue::rule([(
                            "effect",
                            serde_json::Value::String(statement.effect.as_str().to_string()),
                        )]),
                    )
                })
                .expect("standard actions are distinct");
        }
        table
    }

    /// Register a builder for an action name.
    ///
    /// # Errors
    ///
    /// `DuplicateAction` when the action already has a builder.
    pub fn register<F>(&mut self, action: impl Into<String>, builder: F) -> PolicyResult<()>
    where
        F: Fn(&Statement) -> (String, SettingValue) + Send + Sync + 'static,
    {
        let action = action.into().to_lowercase();
        if self.builders.contains_key(&action) {
            return Err(PolicyError::DuplicateAction(action));
        }
        self.builders.insert(action, Arc::new(builder));
        Ok(())
    }

    /// `true` when the action has a registered builder.
    pub fn supports(&self, action: &str) -> bool {
        self.builders.contains_key(&action.to_lowercase())
    }

    /// Translate one statement into settings entries.
    ///
    /// Statements without an `Action` block translate through the
    /// [`GENERAL_ACCESS`] builder.
    ///
    /// # Errors
    ///
    /// `UnknownAction` for any action without a builder; nothing is
    /// translated partially.
    pub fn translate(&self, statement: &Statement) -> PolicyResult<SettingsMap> {
        let actions: Vec<String> = match &statement.action {
            Some(actions) => actions.as_slice().iter().map(|a| a.to_lowercase()).collect(),
            None => vec![GENERAL_ACCESS.to_string()],
        };

        for action in &actions {
            if !self.builders.contains_key(action) {
                return Err(PolicyError::UnknownAction(action.clone()));
            }
        }

        let mut settings = SettingsMap::new();
        for action in &actions {
            let (key, value) = self.builders[action](statement);
            debug!(action, key = %key, "translated policy action");
            settings.insert(key, value);
        }
        Ok(settings)
    }
}

impl Default for TranslationTable {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn statement(value: serde_json::Value) -> Statement {
        Statement::from_json(&value).unwrap()
    }

    #[test]
    fn test_standard_actions_translate() {
        let table = TranslationTable::standard();
        let settings = table
            .translate(&statement(json!({
                "Effect": "deny",
                "Resource": "Post:1",
                "Action": ["read", "edit"]
            })))
            .unwrap();

        assert_eq!(settings.len(), 2);
        assert_eq!(settings["read"].attribute("effect"), Some(&json!("deny")));
        assert_eq!(settings["edit"].attribute("effect"), Some(&json!("deny")));
    }

    #[test]
    fn test_missing_action_uses_general_access() {
        let table = TranslationTable::standard();
        let settings = table
            .translate(&statement(json!({"Effect": "allow", "Resource": "Post:1"})))
            .unwrap();

        assert_eq!(settings[GENERAL_ACCESS].attribute("effect"), Some(&json!("allow")));
    }

    #[test]
    fn test_unknown_action_rejected_without_partial_output() {
        let table = TranslationTable::standard();
        let err = table
            .translate(&statement(json!({
                "Effect": "deny",
                "Resource": "Post:1",
                "Action": ["read", "teleport"]
            })))
            .unwrap_err();

        assert_eq!(err.error_code(), "UNKNOWN_ACTION");
    }

    #[test]
    fn test_custom_builder_registration() {
        let mut table = TranslationTable::standard();
        table
            .register("restrict_comments", |statement: &Statement| {
                (
                    "comment".to_string(),
                    SettingValue::rule([
                        ("enabled", json!(statement.effect == crate::Effect::Deny)),
                        ("on", json!(["frontend"])),
                    ]),
                )
            })
            .unwrap();

        let settings = table
            .translate(&statement(json!({
                "Effect": "deny",
                "Resource": "Post:1",
                "Action": "restrict_comments"
            })))
            .unwrap();
        assert_eq!(settings["comment"].effect(), Some(true));

        let err = table.register("read", |_| ("read".to_string(), SettingValue::Flag(true)));
        assert_eq!(err.unwrap_err().error_code(), "DUPLICATE_ACTION");
    }
}
