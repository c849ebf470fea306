//! facesort-core — Session orchestration for the face-based photo sorter.
//!
//! Coordinates folder selection, settings, long-running host processing with
//! streamed status rows, cancellation, and terminal cleanup behind a narrow
//! asynchronous bridge. The host collaborator performing the actual
//! computation is only ever reached through [`bridge::SortHost`].

pub mod bridge;
pub mod log;
pub mod session;
pub mod settings;

pub use bridge::{BridgeClient, BridgeError, SortHost, UnavailableHost};
pub use log::{HostEvent, ItemStatus, LogEntry, RunLog};
pub use session::{drive_run, EventOutcome, RunEnd, Session, SessionError, SessionPhase};
pub use settings::{brackets, classify, Bracket, SettingKind, SettingsEditor, SettingsPatch, SortSettings};
