//! Policy source interface
//!
//! Declarative access policies are authored and evaluated outside
//! this crate; the engine only consumes their output as settings
//! maps layered UNDER each resource's explicit settings. The
//! `warden-policy` crate provides the statement model and the
//! canonical implementation of this trait.

use indexmap::IndexMap;

use crate::level::AccessLevel;
use crate::resource::ResourceKind;
use crate::setting::SettingsMap;

/// Supplier of policy-derived settings.
pub trait PolicySource: Send + Sync {
    /// Settings derived from statements addressing one resource
    /// (both `Kind:id` and `Kind:*` statements apply).
    ///
    /// `None` when no statement addresses the resource.
    fn resource_settings(
        &self,
        level: &AccessLevel,
        kind: ResourceKind,
        instance: Option<&str>,
    ) -> Option<SettingsMap>;

    /// Instance-id to settings for every statement addressing the
    /// kind at this level. Wildcard statements appear under `"*"`.
    fn aggregate_settings(
        &self,
        level: &AccessLevel,
        kind: ResourceKind,
    ) -> IndexMap<String, SettingsMap>;
}

/// A policy source with no statements.
#[derive(Debug, Default, Clone)]
pub struct NoPolicies;

impl PolicySource for NoPolicies {
    fn resource_settings(
        &self,
        _level: &AccessLevel,
        _kind: ResourceKind,
        _instance: Option<&str>,
    ) -> Option<SettingsMap> {
        None
    }

    fn aggregate_settings(
        &self,
        _level: &AccessLevel,
        _kind: ResourceKind,
    ) -> IndexMap<String, SettingsMap> {
        IndexMap::new()
    }
}
