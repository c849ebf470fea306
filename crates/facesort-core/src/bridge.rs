//! The sole channel to the host collaborator.
//!
//! Every cross-boundary call resolves to exactly one `Result`; a call that
//! fails never leaves the caller with a partially applied transition. The
//! client also keeps the surface usable when no host is reachable: settings
//! loads degrade to built-in defaults instead of propagating.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::settings::SortSettings;

#[derive(Debug, Error)]
pub enum BridgeError {
    /// The host channel is absent or has shut down.
    #[error("host bridge unavailable: {0}")]
    Unavailable(String),
    /// The host explicitly refused the call.
    #[error("host rejected {call}: {message}")]
    Rejected {
        call: &'static str,
        message: String,
    },
}

impl BridgeError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        BridgeError::Unavailable(message.into())
    }

    pub fn rejected(call: &'static str, message: impl Into<String>) -> Self {
        BridgeError::Rejected {
            call,
            message: message.into(),
        }
    }
}

/// The host collaborator behind the bridge.
///
/// Implementations perform the actual computation (folder dialogs, settings
/// persistence, face sorting) out of this layer's sight; the orchestration
/// layer only sees these seven calls plus the inbound event stream.
#[async_trait]
pub trait SortHost: Send + Sync {
    /// Ask the host to present a folder choice. `None` means dismissed.
    async fn choose_folder(&self) -> Result<Option<PathBuf>, BridgeError>;

    async fn load_settings(&self) -> Result<SortSettings, BridgeError>;

    async fn save_settings(&self, settings: &SortSettings) -> Result<(), BridgeError>;

    /// Begin a sorting run. Acknowledges acceptance; results stream back as
    /// events.
    async fn start_processing(
        &self,
        folder: &Path,
        settings: &SortSettings,
    ) -> Result<(), BridgeError>;

    async fn cancel_processing(&self) -> Result<(), BridgeError>;

    async fn clear_cache(&self) -> Result<(), BridgeError>;

    async fn reveal_output(&self) -> Result<(), BridgeError>;
}

/// Placeholder host used when no bridge is wired. Every call fails with
/// `Unavailable`, so callers degrade to defaults and disabled actions
/// instead of crashing.
pub struct UnavailableHost;

const NO_HOST: &str = "no host connected";

#[async_trait]
impl SortHost for UnavailableHost {
    async fn choose_folder(&self) -> Result<Option<PathBuf>, BridgeError> {
        Err(BridgeError::unavailable(NO_HOST))
    }

    async fn load_settings(&self) -> Result<SortSettings, BridgeError> {
        Err(BridgeError::unavailable(NO_HOST))
    }

    async fn save_settings(&self, _settings: &SortSettings) -> Result<(), BridgeError> {
        Err(BridgeError::unavailable(NO_HOST))
    }

    async fn start_processing(
        &self,
        _folder: &Path,
        _settings: &SortSettings,
    ) -> Result<(), BridgeError> {
        Err(BridgeError::unavailable(NO_HOST))
    }

    async fn cancel_processing(&self) -> Result<(), BridgeError> {
        Err(BridgeError::unavailable(NO_HOST))
    }

    async fn clear_cache(&self) -> Result<(), BridgeError> {
        Err(BridgeError::unavailable(NO_HOST))
    }

    async fn reveal_output(&self) -> Result<(), BridgeError> {
        Err(BridgeError::unavailable(NO_HOST))
    }
}

/// Normalizing wrapper around the host.
///
/// Clone-safe; all clones talk to the same host.
#[derive(Clone)]
pub struct BridgeClient {
    host: Arc<dyn SortHost>,
}

impl BridgeClient {
    pub fn new(host: Arc<dyn SortHost>) -> Self {
        Self { host }
    }

    /// A client with no host behind it; every action degrades.
    pub fn unavailable() -> Self {
        Self::new(Arc::new(UnavailableHost))
    }

    pub async fn choose_folder(&self) -> Result<Option<PathBuf>, BridgeError> {
        tracing::debug!(call = "choose_folder", "bridge call");
        self.host.choose_folder().await
    }

    /// Never fails: a load failure degrades to sanitized built-in defaults
    /// so the surface stays usable through transient host trouble.
    pub async fn load_settings(&self) -> SortSettings {
        match self.host.load_settings().await {
            Ok(settings) => settings.sanitized(),
            Err(err) => {
                tracing::warn!(error = %err, "settings load failed; using defaults");
                SortSettings::default()
            }
        }
    }

    pub async fn save_settings(&self, settings: &SortSettings) -> Result<(), BridgeError> {
        tracing::debug!(call = "save_settings", "bridge call");
        self.host.save_settings(settings).await
    }

    pub async fn start_processing(
        &self,
        folder: &Path,
        settings: &SortSettings,
    ) -> Result<(), BridgeError> {
        tracing::debug!(call = "start_processing", folder = %folder.display(), "bridge call");
        self.host.start_processing(folder, settings).await
    }

    pub async fn cancel_processing(&self) -> Result<(), BridgeError> {
        tracing::debug!(call = "cancel_processing", "bridge call");
        self.host.cancel_processing().await
    }

    pub async fn clear_cache(&self) -> Result<(), BridgeError> {
        tracing::debug!(call = "clear_cache", "bridge call");
        self.host.clear_cache().await
    }

    pub async fn reveal_output(&self) -> Result<(), BridgeError> {
        tracing::debug!(call = "reveal_output", "bridge call");
        self.host.reveal_output().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingSettingsHost;

    #[async_trait]
    impl SortHost for FailingSettingsHost {
        async fn choose_folder(&self) -> Result<Option<PathBuf>, BridgeError> {
            Ok(None)
        }
        async fn load_settings(&self) -> Result<SortSettings, BridgeError> {
            Err(BridgeError::rejected("load_settings", "disk on fire"))
        }
        async fn save_settings(&self, _settings: &SortSettings) -> Result<(), BridgeError> {
            Ok(())
        }
        async fn start_processing(
            &self,
            _folder: &Path,
            _settings: &SortSettings,
        ) -> Result<(), BridgeError> {
            Ok(())
        }
        async fn cancel_processing(&self) -> Result<(), BridgeError> {
            Ok(())
        }
        async fn clear_cache(&self) -> Result<(), BridgeError> {
            Ok(())
        }
        async fn reveal_output(&self) -> Result<(), BridgeError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_unavailable_host_fails_every_call() {
        let client = BridgeClient::unavailable();
        assert!(matches!(
            client.choose_folder().await,
            Err(BridgeError::Unavailable(_))
        ));
        assert!(matches!(
            client.start_processing(Path::new("/photos"), &SortSettings::default()).await,
            Err(BridgeError::Unavailable(_))
        ));
        assert!(matches!(
            client.clear_cache().await,
            Err(BridgeError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_load_settings_degrades_to_defaults() {
        let client = BridgeClient::unavailable();
        assert_eq!(client.load_settings().await, SortSettings::default());

        let client = BridgeClient::new(Arc::new(FailingSettingsHost));
        assert_eq!(client.load_settings().await, SortSettings::default());
    }

    struct WildSettingsHost;

    #[async_trait]
    impl SortHost for WildSettingsHost {
        async fn choose_folder(&self) -> Result<Option<PathBuf>, BridgeError> {
            Ok(None)
        }
        async fn load_settings(&self) -> Result<SortSettings, BridgeError> {
            Ok(SortSettings {
                similarity_threshold: 7.0,
                resize_scale: 0.4,
                min_cluster_size: 3,
            })
        }
        async fn save_settings(&self, _settings: &SortSettings) -> Result<(), BridgeError> {
            Ok(())
        }
        async fn start_processing(
            &self,
            _folder: &Path,
            _settings: &SortSettings,
        ) -> Result<(), BridgeError> {
            Ok(())
        }
        async fn cancel_processing(&self) -> Result<(), BridgeError> {
            Ok(())
        }
        async fn clear_cache(&self) -> Result<(), BridgeError> {
            Ok(())
        }
        async fn reveal_output(&self) -> Result<(), BridgeError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_load_settings_sanitizes_host_values() {
        let client = BridgeClient::new(Arc::new(WildSettingsHost));
        let settings = client.load_settings().await;
        assert_eq!(settings.similarity_threshold, 0.62);
        assert_eq!(settings.resize_scale, 0.4);
        assert_eq!(settings.min_cluster_size, 3);
    }
}
