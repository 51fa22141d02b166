//! Reconciliation of the remote registry against the models already loaded
//! on the backend. Everything here is pure: same inputs, same outputs.

use super::types::{LoadedModel, RegistryEntry};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Groups loaded models by name into the set of versions present.
pub fn loaded_versions_by_name(loaded: &[LoadedModel]) -> HashMap<String, BTreeSet<u32>> {
    let mut by_name: HashMap<String, BTreeSet<u32>> = HashMap::new();
    for model in loaded {
        by_name
            .entry(model.name.clone())
            .or_default()
            .insert(model.version);
    }
    by_name
}

/// Names offered for download, in registry order.
///
/// A name is hidden only when its registry entry has a single published
/// version and that version is already loaded. Models with more versions
/// stay listed even if every one of them is loaded.
pub fn selectable_names(registry: &[RegistryEntry], loaded: &[LoadedModel]) -> Vec<String> {
    names_from_grouped(registry, &loaded_versions_by_name(loaded))
}

/// Versions of `name` that can still be downloaded, ascending.
pub fn selectable_versions(
    registry: &[RegistryEntry],
    loaded: &[LoadedModel],
    name: &str,
) -> Vec<u32> {
    versions_from_grouped(registry, &loaded_versions_by_name(loaded), name)
}

fn names_from_grouped(
    registry: &[RegistryEntry],
    by_name: &HashMap<String, BTreeSet<u32>>,
) -> Vec<String> {
    let mut seen = HashSet::new();
    registry
        .iter()
        .filter(|entry| seen.insert(entry.name.as_str()))
        .filter(|entry| {
            let single_version_loaded = entry.latest_version == 1
                && by_name
                    .get(&entry.name)
                    .is_some_and(|versions| versions.contains(&1));
            !single_version_loaded
        })
        .map(|entry| entry.name.clone())
        .collect()
}

fn versions_from_grouped(
    registry: &[RegistryEntry],
    by_name: &HashMap<String, BTreeSet<u32>>,
    name: &str,
) -> Vec<u32> {
    if name.is_empty() {
        return Vec::new();
    }
    let Some(entry) = registry.iter().find(|entry| entry.name == name) else {
        return Vec::new();
    };

    let loaded = by_name.get(name);
    (1..=entry.latest_version)
        .filter(|v| !loaded.is_some_and(|set| set.contains(v)))
        .collect()
}

/// Snapshot of one reconciliation pass over a registry and a loaded list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Reconciliation {
    registry: Vec<RegistryEntry>,
    loaded_by_name: HashMap<String, BTreeSet<u32>>,
    names: Vec<String>,
}

impl Reconciliation {
    pub fn compute(registry: &[RegistryEntry], loaded: &[LoadedModel]) -> Self {
        let loaded_by_name = loaded_versions_by_name(loaded);
        let names = names_from_grouped(registry, &loaded_by_name);
        Self {
            registry: registry.to_vec(),
            loaded_by_name,
            names,
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn versions_for(&self, name: &str) -> Vec<u32> {
        versions_from_grouped(&self.registry, &self.loaded_by_name, name)
    }

    pub fn loaded_versions(&self, name: &str) -> Option<&BTreeSet<u32>> {
        self.loaded_by_name.get(name)
    }
}
