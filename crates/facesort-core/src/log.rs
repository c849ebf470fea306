//! Append-only run log and monotonic progress projection.
//!
//! The projector is a pure sink: the session feeds it host stream events and
//! a view renders from it. It never initiates bridge calls.

use serde::{Deserialize, Serialize};

/// Status of one processed item, or a synthetic stream marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Pending,
    Matched,
    NoFaceDetected,
    GroupPhotoDetected,
    ReadError,
    ProcessingError,
    Cancelled,
    /// Terminal sentinel: no further rows will arrive for the current run.
    /// Never rendered as a row.
    Done,
}

impl ItemStatus {
    /// Whether this status terminates the event stream for a run.
    pub fn is_terminal(self) -> bool {
        matches!(self, ItemStatus::Done)
    }
}

/// One row of the results view.
///
/// `label` is the item name (usually a file name); synthetic rows such as a
/// run-level cancellation carry no label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub label: Option<String>,
    pub status: ItemStatus,
    pub person_id: Option<String>,
}

impl LogEntry {
    pub fn item(label: impl Into<String>, status: ItemStatus) -> Self {
        Self {
            label: Some(label.into()),
            status,
            person_id: None,
        }
    }

    pub fn matched(label: impl Into<String>, person_id: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            status: ItemStatus::Matched,
            person_id: Some(person_id.into()),
        }
    }

    pub fn synthetic(status: ItemStatus) -> Self {
        Self {
            label: None,
            status,
            person_id: None,
        }
    }
}

/// Inbound host stream payloads, applied in arrival order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostEvent {
    Log {
        label: Option<String>,
        status: ItemStatus,
        person_id: Option<String>,
    },
    Progress(u32),
}

/// Derived view state for one run: ordered rows plus the latest percent.
#[derive(Debug, Clone, Default)]
pub struct RunLog {
    entries: Vec<LogEntry>,
    progress: Option<u8>,
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row in arrival order. The `Done` sentinel is never stored;
    /// returns whether a row was added.
    pub fn append(&mut self, entry: LogEntry) -> bool {
        if entry.status.is_terminal() {
            return false;
        }
        self.entries.push(entry);
        true
    }

    /// Record a progress signal. Values clamp to [0, 100]; regressions below
    /// the last recorded percent are dropped.
    pub fn set_progress(&mut self, percent: u32) {
        let clamped = percent.min(100) as u8;
        if let Some(current) = self.progress {
            if clamped < current {
                return;
            }
        }
        self.progress = Some(clamped);
    }

    /// Reset to the start-of-run state: no rows, no progress signal yet.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.progress = None;
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Visible row count (sentinels are never stored).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Latest percent, or `None` before the first signal of a run.
    pub fn progress(&self) -> Option<u8> {
        self.progress
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_preserves_arrival_order() {
        let mut log = RunLog::new();
        assert!(log.append(LogEntry::matched("a.jpg", "person_1")));
        assert!(log.append(LogEntry::item("b.jpg", ItemStatus::NoFaceDetected)));
        assert!(log.append(LogEntry::item("c.jpg", ItemStatus::ReadError)));

        let labels: Vec<_> = log
            .entries()
            .iter()
            .map(|e| e.label.as_deref().unwrap())
            .collect();
        assert_eq!(labels, vec!["a.jpg", "b.jpg", "c.jpg"]);
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn test_done_sentinel_never_becomes_a_row() {
        let mut log = RunLog::new();
        log.append(LogEntry::matched("a.jpg", "person_1"));
        assert!(!log.append(LogEntry::synthetic(ItemStatus::Done)));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_progress_is_monotonic() {
        let mut log = RunLog::new();
        assert_eq!(log.progress(), None);

        for pct in [10, 45, 45, 80, 100] {
            log.set_progress(pct);
        }
        assert_eq!(log.progress(), Some(100));

        // A late regression is dropped.
        log.set_progress(40);
        assert_eq!(log.progress(), Some(100));
    }

    #[test]
    fn test_progress_clamps_to_100() {
        let mut log = RunLog::new();
        log.set_progress(250);
        assert_eq!(log.progress(), Some(100));
    }

    #[test]
    fn test_clear_resets_rows_and_progress() {
        let mut log = RunLog::new();
        log.append(LogEntry::item("a.jpg", ItemStatus::GroupPhotoDetected));
        log.set_progress(60);

        log.clear();
        assert!(log.is_empty());
        assert_eq!(log.progress(), None);

        // A fresh run may start below the previous run's percent.
        log.set_progress(5);
        assert_eq!(log.progress(), Some(5));
    }

    #[test]
    fn test_status_wire_names() {
        let json = serde_json::to_string(&ItemStatus::NoFaceDetected).unwrap();
        assert_eq!(json, r#""no_face_detected""#);
        let status: ItemStatus = serde_json::from_str(r#""group_photo_detected""#).unwrap();
        assert_eq!(status, ItemStatus::GroupPhotoDetected);
    }
}
