pub mod downloader;
pub mod registry;
pub mod types;

pub use downloader::{ActionOutcome, ModelDownloader};
pub use registry::{loaded_versions_by_name, selectable_names, selectable_versions, Reconciliation};
pub use types::{DownloadRequest, LoadedModel, ModelId, RegistryEntry, Sentiment, Timestamp};
