//! Client for the OpinionLens sentiment API: an inference console and a
//! model admin panel sharing one HTTP client and a local key-value cache.

pub mod admin;
pub mod busy;
pub mod client;
pub mod config;
pub mod inference;
pub mod models;
pub mod preferences;
pub mod selection;
pub mod store;
pub mod view;

pub use admin::{AdminPanel, LoadReport, PanelError};
pub use client::{ApiClient, ClientError};
pub use config::ConsoleConfig;
pub use inference::{InferenceConsole, InferenceView};
pub use models::{ActionOutcome, LoadedModel, ModelId, RegistryEntry, Sentiment};
pub use preferences::{PreferencesManager, Theme};
pub use store::{JsonFileStore, KeyValueStore, MemoryStore};
