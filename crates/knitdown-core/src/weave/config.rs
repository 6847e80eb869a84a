/*
 * weave/config.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Scoped weaving-engine configuration.
 */

//! Weaving-engine configuration and its scope guard.
//!
//! The options a weaving engine sees (knit options, chunk defaults, hooks)
//! live in a [`WeaveConfig`] owned by the caller. The orchestrator changes it
//! only through a [`WeaveScope`], which snapshots the configuration on entry
//! and puts the snapshot back when dropped, including during unwinding.

use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};

use serde::Serialize;
use serde_json::Value;

/// Options and hooks handed to the weaving engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeaveConfig {
    /// Package-level options (`opts_knit`)
    pub opts_knit: BTreeMap<String, Value>,
    /// Default chunk options (`opts_chunk`)
    pub opts_chunk: BTreeMap<String, Value>,
    /// Output hooks, by hook name, naming the hook implementation to install
    pub knit_hooks: BTreeMap<String, String>,
}

impl WeaveConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.opts_knit.is_empty() && self.opts_chunk.is_empty() && self.knit_hooks.is_empty()
    }

    /// Set a knit option.
    pub fn set_knit(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.opts_knit.insert(key.into(), value.into());
    }

    /// Set a chunk option default.
    pub fn set_chunk(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.opts_chunk.insert(key.into(), value.into());
    }

    /// Layer `other` on top of this configuration. Keys in `other` win.
    pub fn merge(&mut self, other: &WeaveConfig) {
        self.opts_knit
            .extend(other.opts_knit.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.opts_chunk
            .extend(other.opts_chunk.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.knit_hooks
            .extend(other.knit_hooks.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
}

/// Guard giving temporary write access to a [`WeaveConfig`].
///
/// ```ignore
/// let mut config = WeaveConfig::new();
/// {
///     let mut scope = WeaveScope::enter(&mut config);
///     scope.set_knit("rmarkdown.pandoc.to", "html");
///     engine.weave(&request_using(&scope))?;
/// } // config is back to its previous state here, even on error
/// ```
pub struct WeaveScope<'a> {
    config: &'a mut WeaveConfig,
    saved: Option<WeaveConfig>,
}

impl<'a> WeaveScope<'a> {
    /// Snapshot `config` and return a guard for mutating it.
    pub fn enter(config: &'a mut WeaveConfig) -> Self {
        let saved = Some(config.clone());
        Self { config, saved }
    }
}

impl Deref for WeaveScope<'_> {
    type Target = WeaveConfig;

    fn deref(&self) -> &WeaveConfig {
        self.config
    }
}

impl DerefMut for WeaveScope<'_> {
    fn deref_mut(&mut self) -> &mut WeaveConfig {
        self.config
    }
}

impl Drop for WeaveScope<'_> {
    fn drop(&mut self) {
        if let Some(saved) = self.saved.take() {
            *self.config = saved;
        }
    }
}
