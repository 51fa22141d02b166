//! Cascading name/version selection for the download form.

use crate::models::types::DownloadRequest;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectionState {
    NoName,
    NameNoVersion,
    NameAndVersion,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("Select a model and a version before downloading.")]
    Incomplete,

    #[error("Model {0:?} is not available for download.")]
    UnknownName(String),

    #[error("Version {0} is not available for the selected model.")]
    UnavailableVersion(u32),
}

/// Submit is allowed only with a name and a version picked from an enabled
/// version control.
pub fn submit_gate(name: &str, version_enabled: bool, version: Option<u32>) -> bool {
    !name.is_empty() && version_enabled && version.is_some()
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DownloadForm {
    names: Vec<String>,
    name: String,
    versions: Vec<u32>,
    version: Option<u32>,
    version_enabled: bool,
    set_default: bool,
}

impl DownloadForm {
    pub fn new(names: Vec<String>) -> Self {
        Self {
            names,
            ..Self::default()
        }
    }

    /// Back to the initial state with a fresh list of names.
    pub fn reset(&mut self, names: Vec<String>) {
        *self = Self::new(names);
    }

    pub fn state(&self) -> SelectionState {
        match (self.name.is_empty(), self.version) {
            (true, _) => SelectionState::NoName,
            (false, Some(_)) if self.version_enabled => SelectionState::NameAndVersion,
            (false, _) => SelectionState::NameNoVersion,
        }
    }

    /// Selecting a name always rebuilds the version options. An empty name
    /// clears the selection.
    pub fn select_name(&mut self, name: &str, versions: Vec<u32>) -> Result<SelectionState, SelectionError> {
        if !name.is_empty() && !self.names.iter().any(|n| n == name) {
            return Err(SelectionError::UnknownName(name.to_string()));
        }

        self.name = name.to_string();
        self.version = None;
        if name.is_empty() {
            self.versions.clear();
            self.version_enabled = false;
        } else {
            self.version_enabled = !versions.is_empty();
            self.versions = versions;
        }
        Ok(self.state())
    }

    pub fn select_version(&mut self, version: Option<u32>) -> Result<SelectionState, SelectionError> {
        match version {
            None => self.version = None,
            Some(v) => {
                if !self.version_enabled || !self.versions.contains(&v) {
                    return Err(SelectionError::UnavailableVersion(v));
                }
                self.version = Some(v);
            }
        }
        Ok(self.state())
    }

    pub fn set_default(&mut self, set_default: bool) {
        self.set_default = set_default;
    }

    pub fn can_submit(&self) -> bool {
        submit_gate(&self.name, self.version_enabled, self.version)
    }

    pub fn submission(&self) -> Result<DownloadRequest, SelectionError> {
        match self.version {
            Some(version) if self.can_submit() => Ok(DownloadRequest {
                model_name: self.name.clone(),
                model_version: version,
                set_default: self.set_default,
            }),
            _ => Err(SelectionError::Incomplete),
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn versions(&self) -> &[u32] {
        &self.versions
    }

    pub fn version(&self) -> Option<u32> {
        self.version
    }

    pub fn version_enabled(&self) -> bool {
        self.version_enabled
    }

    pub fn is_set_default(&self) -> bool {
        self.set_default
    }
}
