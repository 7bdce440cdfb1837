//! Registry collaborator: the external source of truth for identities.
//!
//! The core only ever reads the registry, once per pipeline run (a
//! snapshot). The store is injected rather than held as ambient state, so
//! tests swap in fixtures and the resolver stays a pure function.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::resolve::RegistryEntry;

pub trait RegistryStore {
    /// Every known identity. Called once per pipeline run.
    fn list_identities(&self) -> Result<Vec<RegistryEntry>>;

    /// Display name for an identity group, if the registry knows one.
    fn group_display_name(&self, group_id: &str) -> Result<Option<String>>;
}

/// JSON-file registry used by the binary and by tests.
///
/// ```json
/// {
///   "identities": [
///     {"canonical_name": "NightOwl", "identity_id": "7", "identity_group_id": "g1"}
///   ],
///   "groups": {"g1": "Night Watch"}
/// }
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct JsonRegistry {
    identities: Vec<RegistryEntry>,
    #[serde(default)]
    groups: HashMap<String, String>,
}

impl JsonRegistry {
    pub fn new(identities: Vec<RegistryEntry>, groups: HashMap<String, String>) -> Self {
        Self { identities, groups }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read registry {}", path.display()))?;
        let registry: JsonRegistry = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse registry {}", path.display()))?;
        log::info!(
            "registry loaded: {} identities, {} groups",
            registry.identities.len(),
            registry.groups.len()
        );
        Ok(registry)
    }
}

impl RegistryStore for JsonRegistry {
    fn list_identities(&self) -> Result<Vec<RegistryEntry>> {
        Ok(self.identities.clone())
    }

    fn group_display_name(&self, group_id: &str) -> Result<Option<String>> {
        Ok(self.groups.get(group_id).cloned())
    }
}
