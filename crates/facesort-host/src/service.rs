//! Host service: the request loop behind the bridge.
//!
//! Requests arrive on an mpsc queue with a oneshot reply each; sorting runs
//! execute on a blocking task that streams events back to the session side.
//! The service enforces one run at a time.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use facesort_core::bridge::{BridgeError, SortHost};
use facesort_core::log::HostEvent;
use facesort_core::settings::SortSettings;

use crate::config::HostConfig;
use crate::engine::FaceEngine;
use crate::pipeline;
use crate::store::{GalleryStore, SettingsStore};

type Reply<T> = oneshot::Sender<Result<T, BridgeError>>;

enum HostRequest {
    ChooseFolder {
        reply: Reply<Option<PathBuf>>,
    },
    LoadSettings {
        reply: Reply<SortSettings>,
    },
    SaveSettings {
        settings: SortSettings,
        reply: Reply<()>,
    },
    Start {
        folder: PathBuf,
        settings: SortSettings,
        reply: Reply<()>,
    },
    Cancel {
        reply: Reply<()>,
    },
    ClearCache {
        reply: Reply<()>,
    },
    RevealOutput {
        reply: Reply<()>,
    },
}

/// Folder chooser callback; the actual dialog belongs to the embedding
/// surface.
pub type FolderChooser = Box<dyn FnMut() -> Option<PathBuf> + Send>;

/// Clone-safe bridge handle to the host task.
#[derive(Clone)]
pub struct HostHandle {
    tx: mpsc::Sender<HostRequest>,
}

impl HostHandle {
    async fn request<T>(
        &self,
        make: impl FnOnce(Reply<T>) -> HostRequest + Send,
    ) -> Result<T, BridgeError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(make(reply_tx))
            .await
            .map_err(|_| BridgeError::unavailable("host task exited"))?;
        reply_rx
            .await
            .map_err(|_| BridgeError::unavailable("host dropped the reply"))?
    }
}

#[async_trait]
impl SortHost for HostHandle {
    async fn choose_folder(&self) -> Result<Option<PathBuf>, BridgeError> {
        self.request(|reply| HostRequest::ChooseFolder { reply }).await
    }

    async fn load_settings(&self) -> Result<SortSettings, BridgeError> {
        self.request(|reply| HostRequest::LoadSettings { reply }).await
    }

    async fn save_settings(&self, settings: &SortSettings) -> Result<(), BridgeError> {
        let settings = *settings;
        self.request(move |reply| HostRequest::SaveSettings { settings, reply })
            .await
    }

    async fn start_processing(
        &self,
        folder: &Path,
        settings: &SortSettings,
    ) -> Result<(), BridgeError> {
        let folder = folder.to_path_buf();
        let settings = *settings;
        self.request(move |reply| HostRequest::Start {
            folder,
            settings,
            reply,
        })
        .await
    }

    async fn cancel_processing(&self) -> Result<(), BridgeError> {
        self.request(|reply| HostRequest::Cancel { reply }).await
    }

    async fn clear_cache(&self) -> Result<(), BridgeError> {
        self.request(|reply| HostRequest::ClearCache { reply }).await
    }

    async fn reveal_output(&self) -> Result<(), BridgeError> {
        self.request(|reply| HostRequest::RevealOutput { reply }).await
    }
}

/// Spawn the host service on the current runtime.
///
/// Stream events for every run go out through `events`; the caller stamps
/// them with the generation returned by its session's start.
pub fn spawn_host(
    config: HostConfig,
    engine: Box<dyn FaceEngine>,
    chooser: FolderChooser,
    events: mpsc::UnboundedSender<HostEvent>,
) -> HostHandle {
    let (tx, rx) = mpsc::channel(16);
    tokio::spawn(serve(config, engine, chooser, events, rx));
    HostHandle { tx }
}

async fn serve(
    config: HostConfig,
    engine: Box<dyn FaceEngine>,
    mut chooser: FolderChooser,
    events: mpsc::UnboundedSender<HostEvent>,
    mut rx: mpsc::Receiver<HostRequest>,
) {
    let settings_store = SettingsStore::new(config.settings_path.clone());
    let gallery_store = GalleryStore::new(config.cache_path.clone());
    let stop = Arc::new(AtomicBool::new(false));
    let mut engine = Some(engine);
    let mut worker: Option<JoinHandle<Box<dyn FaceEngine>>> = None;

    tracing::info!(output = %config.output_dir.display(), "host service started");

    while let Some(request) = rx.recv().await {
        match request {
            HostRequest::ChooseFolder { reply } => {
                let _ = reply.send(Ok(chooser()));
            }
            HostRequest::LoadSettings { reply } => {
                let result = settings_store
                    .load()
                    .map_err(|err| BridgeError::rejected("load_settings", err.to_string()));
                let _ = reply.send(result);
            }
            HostRequest::SaveSettings { settings, reply } => {
                let result = settings_store
                    .save(&settings)
                    .map_err(|err| BridgeError::rejected("save_settings", err.to_string()));
                let _ = reply.send(result);
            }
            HostRequest::Start {
                folder,
                settings,
                reply,
            } => {
                // Reclaim the engine from a finished worker. A cancelled
                // run still winding down is awaited; a live one rejects the
                // start.
                if let Some(handle) = worker.take() {
                    if handle.is_finished() || stop.load(Ordering::Relaxed) {
                        match handle.await {
                            Ok(returned) => engine = Some(returned),
                            Err(err) => tracing::error!(error = %err, "sort worker panicked"),
                        }
                    } else {
                        worker = Some(handle);
                        let _ = reply.send(Err(BridgeError::rejected(
                            "start_processing",
                            "a sorting run is already in progress",
                        )));
                        continue;
                    }
                }
                let Some(mut active) = engine.take() else {
                    let _ = reply.send(Err(BridgeError::rejected(
                        "start_processing",
                        "analysis engine unavailable",
                    )));
                    continue;
                };

                stop.store(false, Ordering::Relaxed);
                let stop_flag = stop.clone();
                let event_tx = events.clone();
                let run_config = config.clone();
                let run_store = gallery_store.clone();
                worker = Some(tokio::task::spawn_blocking(move || {
                    let mut gallery = run_store.load().unwrap_or_else(|err| {
                        tracing::warn!(error = %err, "gallery cache unreadable; starting fresh");
                        Default::default()
                    });
                    let emit = move |event: HostEvent| {
                        let _ = event_tx.send(event);
                    };
                    let outcome = pipeline::run_sort(
                        &folder,
                        &settings,
                        active.as_mut(),
                        &mut gallery,
                        &run_store,
                        &run_config,
                        &emit,
                        &stop_flag,
                    );
                    tracing::info!(
                        items = outcome.items,
                        cancelled = outcome.cancelled,
                        "sort worker finished"
                    );
                    active
                }));
                let _ = reply.send(Ok(()));
            }
            HostRequest::Cancel { reply } => {
                // Idempotent; the worker notices at its next per-item check.
                stop.store(true, Ordering::Relaxed);
                let _ = reply.send(Ok(()));
            }
            HostRequest::ClearCache { reply } => {
                let result = gallery_store
                    .clear(&config)
                    .map_err(|err| BridgeError::rejected("clear_cache", err.to_string()));
                let _ = reply.send(result);
            }
            HostRequest::RevealOutput { reply } => {
                let result = if config.output_dir.is_dir() {
                    tracing::info!(path = %config.output_dir.display(), "revealing output folder");
                    Ok(())
                } else {
                    Err(BridgeError::rejected(
                        "reveal_output",
                        format!(
                            "output folder does not exist: {}",
                            config.output_dir.display()
                        ),
                    ))
                };
                let _ = reply.send(result);
            }
        }
    }

    tracing::info!("host service exiting");
}
