//! Session lifecycle for one sorting workflow instance.
//!
//! Owns folder selection, the single-run guard, generation-stamped event
//! application, cancellation, and terminal cleanup. Suspension happens only
//! at bridge-call boundaries; event application is not reentrant, so the
//! hazards here are inter-callback races, which the per-run generation id
//! closes.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::bridge::{BridgeClient, BridgeError};
use crate::log::{HostEvent, LogEntry, RunLog};

/// Lifecycle phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No folder selected; a run cannot start.
    Idle,
    /// Folder selected, no run in flight.
    Ready,
    /// Start acknowledged; awaiting the terminal event.
    Processing,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no folder selected")]
    NoFolderSelected,
    #[error("a sorting run is already in flight")]
    AlreadyProcessing,
    #[error("folder selection is locked while processing")]
    SelectionLocked,
    #[error("no sorting run in flight")]
    NotProcessing,
    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

/// What the state machine did with one inbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// A row was appended to the log.
    Appended,
    /// The progress percent was updated.
    Progress,
    /// The terminal sentinel arrived; the run is over.
    Completed,
    /// Stale generation or no run in flight; the event was dropped.
    Ignored,
}

/// How an event pump finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEnd {
    /// The terminal sentinel arrived.
    Completed,
    /// The session moved on (cancel or reset) while events were in flight.
    Superseded,
    /// The host closed the event channel without a terminal sentinel.
    ChannelClosed,
}

/// Process-local state of one sorting workflow instance.
pub struct Session {
    id: Uuid,
    bridge: BridgeClient,
    phase: SessionPhase,
    selected_folder: Option<PathBuf>,
    generation: u64,
    log: RunLog,
}

impl Session {
    pub fn new(bridge: BridgeClient) -> Self {
        Self {
            id: Uuid::new_v4(),
            bridge,
            phase: SessionPhase::Idle,
            selected_folder: None,
            generation: 0,
            log: RunLog::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_processing(&self) -> bool {
        self.phase == SessionPhase::Processing
    }

    pub fn selected_folder(&self) -> Option<&Path> {
        self.selected_folder.as_deref()
    }

    /// Current run generation; events stamped with an older value are stale.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn log(&self) -> &RunLog {
        &self.log
    }

    /// Record an explicit folder choice. Contents are not validated here;
    /// the host decides what it can process.
    pub fn select_folder(&mut self, path: PathBuf) -> Result<(), SessionError> {
        if self.is_processing() {
            return Err(SessionError::SelectionLocked);
        }
        tracing::info!(session = %self.id, folder = %path.display(), "folder selected");
        self.selected_folder = Some(path);
        self.phase = SessionPhase::Ready;
        Ok(())
    }

    /// Ask the host to present its folder dialog. A dismissed dialog leaves
    /// the session untouched.
    pub async fn choose_folder(&mut self) -> Result<Option<PathBuf>, SessionError> {
        if self.is_processing() {
            return Err(SessionError::SelectionLocked);
        }
        match self.bridge.choose_folder().await? {
            Some(path) => {
                self.select_folder(path.clone())?;
                Ok(Some(path))
            }
            None => Ok(None),
        }
    }

    /// Begin a sorting run over the selected folder.
    ///
    /// The guard here is the mutual-exclusion point: at most one run is in
    /// flight per session. On success returns the run generation the caller
    /// must stamp inbound events with. A rejected acknowledgement reverts to
    /// `Ready` with nothing else changed.
    pub async fn start(&mut self) -> Result<u64, SessionError> {
        let folder = self
            .selected_folder
            .clone()
            .ok_or(SessionError::NoFolderSelected)?;
        if self.is_processing() {
            return Err(SessionError::AlreadyProcessing);
        }

        self.log.clear();
        self.generation += 1;
        // Enter Processing before the await so the guard holds across it.
        self.phase = SessionPhase::Processing;

        let settings = self.bridge.load_settings().await;
        if let Err(err) = self.bridge.start_processing(&folder, &settings).await {
            self.phase = SessionPhase::Ready;
            tracing::warn!(session = %self.id, error = %err, "start rejected");
            return Err(err.into());
        }

        tracing::info!(
            session = %self.id,
            generation = self.generation,
            folder = %folder.display(),
            "sorting run started"
        );
        Ok(self.generation)
    }

    /// Apply one host stream event stamped with its run generation.
    ///
    /// Events from a superseded run, or arriving outside `Processing`, are
    /// dropped: after a cancel or reset the host may still flush rows and
    /// those must not leak into the next run's view.
    pub async fn apply_event(&mut self, generation: u64, event: HostEvent) -> EventOutcome {
        if !self.is_processing() || generation != self.generation {
            tracing::debug!(
                session = %self.id,
                stamped = generation,
                current = self.generation,
                "stale host event dropped"
            );
            return EventOutcome::Ignored;
        }

        match event {
            HostEvent::Progress(percent) => {
                self.log.set_progress(percent);
                EventOutcome::Progress
            }
            HostEvent::Log { status, .. } if status.is_terminal() => {
                self.complete().await;
                EventOutcome::Completed
            }
            HostEvent::Log {
                label,
                status,
                person_id,
            } => {
                self.log.append(LogEntry {
                    label,
                    status,
                    person_id,
                });
                EventOutcome::Appended
            }
        }
    }

    /// Terminal cleanup: back to `Ready` with the folder retained, then the
    /// post-completion side effect. A reveal failure is a notice, never a
    /// state change.
    async fn complete(&mut self) {
        self.phase = SessionPhase::Ready;
        tracing::info!(session = %self.id, rows = self.log.len(), "sorting run complete");
        if let Err(err) = self.bridge.reveal_output().await {
            tracing::warn!(session = %self.id, error = %err, "could not reveal output folder");
        }
    }

    /// Cancel the in-flight run.
    ///
    /// The reset is optimistic: controls come back before the host confirms,
    /// and the generation bump makes any rows the host still flushes stale.
    /// A rejected cancel call is returned as a notice; the local reset holds.
    pub async fn cancel(&mut self) -> Result<(), SessionError> {
        if !self.is_processing() {
            return Err(SessionError::NotProcessing);
        }

        self.generation += 1;
        self.phase = SessionPhase::Ready;
        tracing::info!(session = %self.id, "cancelling sorting run");

        if let Err(err) = self.bridge.cancel_processing().await {
            tracing::warn!(session = %self.id, error = %err, "cancel call failed");
            return Err(err.into());
        }
        Ok(())
    }

    /// Clear the host cache and re-initialize the session.
    ///
    /// Valid in any phase. The local reset lands first so the session is
    /// always observably back at `Idle`, even when the host call fails; the
    /// failure is returned as a notice.
    pub async fn reset_cache(&mut self) -> Result<(), SessionError> {
        self.generation += 1;
        self.phase = SessionPhase::Idle;
        self.selected_folder = None;
        self.log.clear();
        tracing::info!(session = %self.id, "session reset");

        if let Err(err) = self.bridge.clear_cache().await {
            tracing::warn!(session = %self.id, error = %err, "cache clear failed");
            return Err(err.into());
        }
        Ok(())
    }
}

/// Pump stamped events from one run into the session until the run ends.
///
/// Events are applied in arrival order; there is no reordering buffer.
pub async fn drive_run(
    session: &mut Session,
    generation: u64,
    events: &mut mpsc::UnboundedReceiver<HostEvent>,
) -> RunEnd {
    while let Some(event) = events.recv().await {
        if session.apply_event(generation, event).await == EventOutcome::Completed {
            return RunEnd::Completed;
        }
        if session.generation() != generation {
            return RunEnd::Superseded;
        }
    }
    RunEnd::ChannelClosed
}
