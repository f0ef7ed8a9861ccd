//! Policy source backed by attached statements
//!
//! Statements are attached per access level (the surrounding system
//! decides which policies apply to whom, and evaluates conditions
//! before attaching). The source translates matching statements into
//! the settings maps the resource layer overlays UNDER explicit
//! settings.

use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::warn;

use warden_access::aggregate::WILDCARD;
use warden_access::setting::SettingValue;
use warden_access::url;
use warden_access::{AccessLevel, PolicySource, ResourceKind, SettingsMap};

use crate::error::PolicyResult;
use crate::statement::{ResourcePattern, Statement};
use crate::translate::TranslationTable;

/// A [`PolicySource`] that serves attached statements.
///
/// # Examples
///
/// ```
/// use warden_access::{AccessLevel, PolicySource, ResourceKind};
/// use warden_policy::{Statement, StatementSource};
/// use serde_json::json;
///
/// let source = StatementSource::new();
/// source
///     .attach(
///         AccessLevel::Visitor,
///         Statement::from_json(&json!({
///             "Effect": "deny",
///             "Resource": "Post:42",
///             "Action": "read"
///         })).unwrap(),
///     )
///     .unwrap();
///
/// let settings = source
///     .resource_settings(&AccessLevel::Visitor, ResourceKind::Post, Some("42"))
///     .unwrap();
/// assert!(settings.contains_key("read"));
/// ```
pub struct StatementSource {
    table: TranslationTable,
    statements: RwLock<HashMap<String, Vec<Statement>>>,
}

impl std::fmt::Debug for StatementSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.statements.read().map(|map| map.values().map(Vec::len).sum()).unwrap_or(0usize);
        f.debug_struct("StatementSource")
            .field("table", &self.table)
            .field("statements", &count)
            .finish()
    }
}

impl StatementSource {
    /// Create an empty source with the standard translation table.
    pub fn new() -> Self {
        Self::with_table(TranslationTable::standard())
    }

    /// Create an empty source with a custom translation table.
    pub fn with_table(table: TranslationTable) -> Self {
        Self { table, statements: RwLock::new(HashMap::new()) }
    }

    /// Attach a statement to an access level.
    ///
    /// The statement is validated eagerly: resource patterns must
    /// parse and every action must have a registered builder.
    ///
    /// # Errors
    ///
    /// `InvalidResource` or `UnknownAction` when validation fails;
    /// nothing is attached in that case.
    pub fn attach(&self, level: AccessLevel, statement: Statement) -> PolicyResult<()> {
        let patterns = statement.patterns()?;
        if patterns.iter().all(|pattern| pattern.kind != ResourceKind::Url) {
            self.table.translate(&statement)?;
        }
        let Ok(mut statements) = self.statements.write() else {
            warn!("statement store poisoned, dropping attachment");
            return Ok(());
        };
        statements.entry(level.storage_key()).or_default().push(statement);
        Ok(())
    }

    fn for_level<R>(&self, level: &AccessLevel, f: impl FnOnce(&[Statement]) -> R) -> R {
        let statements = self.statements.read().ok();
        let slice = statements
            .as_ref()
            .and_then(|map| map.get(&level.storage_key()))
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        f(slice)
    }

    /// Translate a URL statement into one rule entry per pattern.
    fn url_rules(&self, statement: &Statement, patterns: &[ResourcePattern]) -> SettingsMap {
        let mut rules = SettingsMap::new();
        for pattern in patterns {
            let Some(target) = &pattern.instance else { continue };
            let mut pairs = vec![(
                "effect",
                serde_json::Value::String(statement.effect.as_str().to_string()),
            )];
            if let Some(redirect) = &statement.redirect {
                pairs.push(("redirect", redirect.clone()));
            }
            rules.insert(url::normalize(target), SettingValue::rule(pairs));
        }
        rules
    }
}

impl Default for StatementSource {
    fn default() -> Self {
        Self::new()
    }
}

impl PolicySource for StatementSource {
    fn resource_settings(
        &self,
        level: &AccessLevel,
        kind: ResourceKind,
        instance: Option<&str>,
    ) -> Option<SettingsMap> {
        self.for_level(level, |statements| {
            let mut settings = SettingsMap::new();
            for statement in statements {
                let Ok(patterns) = statement.patterns() else { continue };

                if kind == ResourceKind::Url {
                    let url_patterns: Vec<ResourcePattern> = patterns
                        .into_iter()
                        .filter(|pattern| pattern.kind == ResourceKind::Url)
                        .collect();
                    for (rule_url, rule) in self.url_rules(statement, &url_patterns) {
                        settings.insert(rule_url, rule);
                    }
                    continue;
                }

                if !patterns.iter().any(|pattern| pattern.matches(kind, instance)) {
                    continue;
                }
                match self.table.translate(statement) {
                    Ok(translated) => {
                        for (key, value) in translated {
                            settings.insert(key, value);
                        }
                    }
                    Err(error) => {
                        warn!(error = %error, "skipping untranslatable statement");
                    }
                }
            }
            if settings.is_empty() {
                None
            } else {
                Some(settings)
            }
        })
    }

    fn aggregate_settings(
        &self,
        level: &AccessLevel,
        kind: ResourceKind,
    ) -> IndexMap<String, SettingsMap> {
        self.for_level(level, |statements| {
            let mut entries: IndexMap<String, SettingsMap> = IndexMap::new();
            for statement in statements {
                let Ok(patterns) = statement.patterns() else { continue };
                for pattern in patterns.iter().filter(|pattern| pattern.kind == kind) {
                    let instance = if pattern.wildcard {
                        WILDCARD.to_string()
                    } else {
                        match &pattern.instance {
                            Some(instance) => instance.clone(),
                            None => continue,
                        }
                    };
                    let Ok(translated) = self.table.translate(statement) else { continue };
                    let entry = entries.entry(instance).or_default();
                    for (key, value) in translated {
                        entry.insert(key, value);
                    }
                }
            }
            entries
        })
    }
}
