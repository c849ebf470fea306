//! facesort-host — Host collaborator for the photo-sorting workflow.
//!
//! Serves the bridge the orchestration layer talks to: settings and cache
//! persistence, the per-item sorting pipeline, and the request loop that
//! enforces one run at a time. Face detection and embedding extraction stay
//! behind the [`engine::FaceEngine`] seam.

pub mod config;
pub mod engine;
pub mod matcher;
pub mod pipeline;
pub mod service;
pub mod store;

pub use config::HostConfig;
pub use engine::{EngineError, Face, FaceEngine, UnavailableEngine};
pub use matcher::{Embedding, PersonGallery};
pub use service::{spawn_host, FolderChooser, HostHandle};
pub use store::{GalleryStore, SettingsStore, StoreError};
