//! Admin panel: registry and loaded-model listings, the download form, and
//! the download / set-active / delete commands. Every successful command
//! reloads both listings from the backend.

use crate::busy::{Busy, BusyFlag};
use crate::client::ApiClient;
use crate::models::registry::{selectable_versions, Reconciliation};
use crate::models::types::{LoadedModel, ModelId, RegistryEntry};
use crate::models::{ActionOutcome, ModelDownloader};
use crate::selection::{DownloadForm, SelectionError, SelectionState};
use crate::store::{KeyValueStore, AVAILABLE_MODELS_KEY, LOADED_MODELS_KEY};
use crate::view::AdminView;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum PanelError {
    #[error(transparent)]
    Busy(#[from] Busy),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error("{0}")]
    NotActionable(String),
}

/// Which listings came from the backend on the last load. A `false` means
/// the cached copy (or nothing) was used.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded_fresh: bool,
    pub registry_fresh: bool,
}

#[derive(Default)]
struct PanelState {
    registry: Vec<RegistryEntry>,
    loaded: Vec<LoadedModel>,
    /// `None` until the first `load()`.
    reconciliation: Option<Reconciliation>,
    form: DownloadForm,
}

pub struct AdminPanel<S> {
    client: ApiClient,
    downloader: ModelDownloader,
    store: Arc<S>,
    state: Mutex<PanelState>,
    busy: BusyFlag,
}

impl<S: KeyValueStore> AdminPanel<S> {
    pub fn new(client: ApiClient, store: Arc<S>) -> Self {
        Self {
            downloader: ModelDownloader::new(client.clone()),
            client,
            store,
            state: Mutex::new(PanelState::default()),
            busy: BusyFlag::new(),
        }
    }

    fn state(&self) -> MutexGuard<'_, PanelState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Fetches the loaded models, then the registry, caching each on
    /// success. The form is reset from the reconciled lists.
    pub async fn load(&self) -> LoadReport {
        let (loaded, loaded_fresh) = self
            .fetch_cached(LOADED_MODELS_KEY, "loaded models", self.client.list_loaded())
            .await;
        let (registry, registry_fresh): (Vec<RegistryEntry>, bool) = self
            .fetch_cached(AVAILABLE_MODELS_KEY, "available models", self.client.list_registry())
            .await;

        let reconciliation = Reconciliation::compute(&registry, &loaded);
        info!(
            "Loaded {} registry entries, {} loaded models, {} downloadable",
            registry.len(),
            loaded.len(),
            reconciliation.names().len()
        );

        let mut state = self.state();
        state.form.reset(reconciliation.names().to_vec());
        state.registry = registry;
        state.loaded = loaded;
        state.reconciliation = Some(reconciliation);

        LoadReport {
            loaded_fresh,
            registry_fresh,
        }
    }

    async fn fetch_cached<T, F, E>(&self, key: &str, what: &str, fetch: F) -> (Vec<T>, bool)
    where
        T: Serialize + DeserializeOwned,
        F: Future<Output = Result<Vec<T>, E>>,
        E: std::fmt::Display,
    {
        match fetch.await {
            Ok(items) => {
                if let Err(e) = self.store.set(key, &items) {
                    warn!("Failed to cache {}: {}", what, e);
                }
                (items, true)
            }
            Err(e) => {
                error!("Failed to load {}: {}", what, e);
                (self.store.get(key).unwrap_or_default(), false)
            }
        }
    }

    /// Picks a model name and rebuilds its version options from the lists
    /// reconciled by the last `load()`, or from the cache before any load.
    pub fn select_name(&self, name: &str) -> Result<SelectionState, PanelError> {
        let mut state = self.state();
        let versions = match &state.reconciliation {
            Some(reconciliation) => reconciliation.versions_for(name),
            None => {
                let registry: Vec<RegistryEntry> =
                    self.store.get(AVAILABLE_MODELS_KEY).unwrap_or_default();
                let loaded: Vec<LoadedModel> = self.store.get(LOADED_MODELS_KEY).unwrap_or_default();
                selectable_versions(&registry, &loaded, name)
            }
        };

        Ok(state.form.select_name(name, versions)?)
    }

    pub fn select_version(&self, version: Option<u32>) -> Result<SelectionState, PanelError> {
        Ok(self.state().form.select_version(version)?)
    }

    pub fn set_default(&self, set_default: bool) {
        self.state().form.set_default(set_default);
    }

    pub fn can_submit(&self) -> bool {
        self.state().form.can_submit()
    }

    /// Submits the download form. Refused while a previous submission is
    /// still in flight.
    pub async fn submit_download(&self) -> Result<ActionOutcome, PanelError> {
        let request = self.state().form.submission()?;
        let outcome = {
            let _guard = self.busy.try_acquire()?;
            self.downloader.download_model(&request).await
        };

        if outcome.is_success() {
            self.load().await;
        }
        Ok(outcome)
    }

    pub async fn set_active(&self, name: &str, version: u32) -> Result<ActionOutcome, PanelError> {
        let row = self.actionable_row(|m| m.name == name && m.version == version, || {
            format!("{name} v{version}")
        })?;

        let outcome = self.downloader.set_active(&row).await;
        if outcome.is_success() {
            self.load().await;
        }
        Ok(outcome)
    }

    pub async fn delete(&self, model_id: &ModelId) -> Result<ActionOutcome, PanelError> {
        let row = self.actionable_row(|m| &m.model_id == model_id, || model_id.to_string())?;

        let outcome = self.downloader.delete_model(&row.model_id).await;
        if outcome.is_success() {
            self.load().await;
        }
        Ok(outcome)
    }

    /// Only non-default rows carry set-active and delete actions.
    fn actionable_row(
        &self,
        pred: impl Fn(&LoadedModel) -> bool,
        describe: impl Fn() -> String,
    ) -> Result<LoadedModel, PanelError> {
        let state = self.state();
        let row = state
            .loaded
            .iter()
            .find(|m| pred(*m))
            .ok_or_else(|| PanelError::NotActionable(format!("Model {} is not loaded.", describe())))?;
        if row.is_default {
            return Err(PanelError::NotActionable(format!(
                "Model {} is the active model.",
                describe()
            )));
        }
        Ok(row.clone())
    }

    pub fn view(&self) -> AdminView {
        let state = self.state();
        let form = &state.form;
        AdminView {
            registry: state.registry.clone(),
            loaded: state.loaded.clone(),
            names: form.names().to_vec(),
            selected_name: form.name().to_string(),
            versions: form.versions().to_vec(),
            selected_version: form.version(),
            version_enabled: form.version_enabled(),
            set_default: form.is_set_default(),
            can_submit: form.can_submit(),
            busy: self.busy.is_busy(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::types::Timestamp;
    use crate::store::MemoryStore;

    fn unreachable_panel(store: Arc<MemoryStore>) -> AdminPanel<MemoryStore> {
        // Port 9 (discard) is not expected to accept HTTP connections.
        AdminPanel::new(ApiClient::new("http://127.0.0.1:9").unwrap(), store)
    }

    #[tokio::test]
    async fn failed_fetches_fall_back_to_cache() {
        let store = Arc::new(MemoryStore::new());
        store
            .set(
                AVAILABLE_MODELS_KEY,
                &vec![RegistryEntry {
                    name: "bert".into(),
                    latest_version: 2,
                    latest_version_creation: Timestamp::parse("2024-01-01 00:00:00").unwrap(),
                }],
            )
            .unwrap();

        let panel = unreachable_panel(store);
        let report = panel.load().await;
        assert_eq!(report, LoadReport::default());

        let view = panel.view();
        assert_eq!(view.names, vec!["bert"]);
        assert!(view.loaded.is_empty());
        assert!(!view.can_submit);
    }

    #[tokio::test]
    async fn incomplete_form_is_refused_before_any_request() {
        let panel = unreachable_panel(Arc::new(MemoryStore::new()));
        let err = panel.submit_download().await.unwrap_err();
        assert!(matches!(err, PanelError::Selection(SelectionError::Incomplete)));
        assert_eq!(
            err.to_string(),
            "Select a model and a version before downloading."
        );
    }

    #[tokio::test]
    async fn actions_on_unknown_rows_are_refused() {
        let panel = unreachable_panel(Arc::new(MemoryStore::new()));
        assert!(matches!(
            panel.delete(&ModelId::from("nope")).await,
            Err(PanelError::NotActionable(_))
        ));
        assert!(matches!(
            panel.set_active("bert", 1).await,
            Err(PanelError::NotActionable(_))
        ));
    }
}
