//! Tunable sorting parameters: defaults, sanitization, and preset labels.

use serde::{Deserialize, Serialize};

pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.62;
pub const DEFAULT_RESIZE_SCALE: f64 = 0.5;
pub const DEFAULT_MIN_CLUSTER_SIZE: u32 = 2;

/// Tunable parameters for a sorting run.
///
/// Unknown keys are dropped on deserialize, so a settings document written
/// by a newer host round-trips without leaking fields this layer does not
/// recognize.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SortSettings {
    /// Clustering strictness in [0, 1]. Lower groups more loosely.
    pub similarity_threshold: f64,
    /// Working-resolution fraction in (0, 1]. Lower is faster at lower fidelity.
    pub resize_scale: f64,
    /// Minimum members for a cluster to be retained as a person (>= 1).
    pub min_cluster_size: u32,
}

impl Default for SortSettings {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            resize_scale: DEFAULT_RESIZE_SCALE,
            min_cluster_size: DEFAULT_MIN_CLUSTER_SIZE,
        }
    }
}

impl SortSettings {
    /// Replace out-of-range or non-finite fields with that field's default.
    ///
    /// In-range values pass through bit-identical.
    pub fn sanitized(self) -> Self {
        let similarity_threshold = if self.similarity_threshold.is_finite()
            && (0.0..=1.0).contains(&self.similarity_threshold)
        {
            self.similarity_threshold
        } else {
            DEFAULT_SIMILARITY_THRESHOLD
        };

        let resize_scale =
            if self.resize_scale.is_finite() && self.resize_scale > 0.0 && self.resize_scale <= 1.0 {
                self.resize_scale
            } else {
                DEFAULT_RESIZE_SCALE
            };

        let min_cluster_size = if self.min_cluster_size >= 1 {
            self.min_cluster_size
        } else {
            DEFAULT_MIN_CLUSTER_SIZE
        };

        Self {
            similarity_threshold,
            resize_scale,
            min_cluster_size,
        }
    }

    /// Overlay a patch onto these settings, then sanitize the result.
    pub fn merged(self, patch: SettingsPatch) -> Self {
        Self {
            similarity_threshold: patch
                .similarity_threshold
                .unwrap_or(self.similarity_threshold),
            resize_scale: patch.resize_scale.unwrap_or(self.resize_scale),
            min_cluster_size: patch.min_cluster_size.unwrap_or(self.min_cluster_size),
        }
        .sanitized()
    }
}

/// Per-field overlay for partial settings updates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsPatch {
    pub similarity_threshold: Option<f64>,
    pub resize_scale: Option<f64>,
    pub min_cluster_size: Option<u32>,
}

impl SettingsPatch {
    pub fn is_empty(&self) -> bool {
        self.similarity_threshold.is_none()
            && self.resize_scale.is_none()
            && self.min_cluster_size.is_none()
    }
}

/// Which tunable a preset label is being derived for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKind {
    SimilarityThreshold,
    ResizeScale,
    MinClusterSize,
}

/// One row of an ordered preset table: values up to `upper` carry `label`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bracket {
    pub upper: f64,
    pub label: &'static str,
}

const SIMILARITY_BRACKETS: &[Bracket] = &[
    Bracket { upper: 0.25, label: "Very Loose" },
    Bracket { upper: 0.55, label: "Loose" },
    Bracket { upper: 0.65, label: "Balanced" },
    Bracket { upper: 0.75, label: "Strict" },
    Bracket { upper: 1.0, label: "Very Strict" },
];

const RESIZE_BRACKETS: &[Bracket] = &[
    Bracket { upper: 0.25, label: "Fastest" },
    Bracket { upper: 0.45, label: "Fast" },
    Bracket { upper: 0.65, label: "Balanced" },
    Bracket { upper: 0.85, label: "High Quality" },
    Bracket { upper: 1.0, label: "Max Quality" },
];

const CLUSTER_BRACKETS: &[Bracket] = &[
    Bracket { upper: 2.0, label: "Include All" },
    Bracket { upper: 10.0, label: "Exclude Rare" },
    Bracket { upper: 20.0, label: "Frequent Only" },
];

/// The ordered preset table for a setting.
pub fn brackets(kind: SettingKind) -> &'static [Bracket] {
    match kind {
        SettingKind::SimilarityThreshold => SIMILARITY_BRACKETS,
        SettingKind::ResizeScale => RESIZE_BRACKETS,
        SettingKind::MinClusterSize => CLUSTER_BRACKETS,
    }
}

/// Qualitative label for a setting value: the first bracket whose upper
/// bound is >= the value wins. A value above every bound (or NaN) has no
/// label and callers leave any previously shown label untouched.
pub fn classify(kind: SettingKind, value: f64) -> Option<&'static str> {
    brackets(kind).iter().find(|b| value <= b.upper).map(|b| b.label)
}

/// Working copy behind a settings view.
///
/// Tracks whether edits have been made since the last load or save so the
/// surface can warn about unsaved changes.
#[derive(Debug, Clone)]
pub struct SettingsEditor {
    working: SortSettings,
    has_pending_changes: bool,
}

impl SettingsEditor {
    pub fn new(settings: SortSettings) -> Self {
        Self {
            working: settings.sanitized(),
            has_pending_changes: false,
        }
    }

    pub fn working(&self) -> SortSettings {
        self.working
    }

    pub fn has_pending_changes(&self) -> bool {
        self.has_pending_changes
    }

    /// Apply an edit. An empty patch changes nothing.
    pub fn set(&mut self, patch: SettingsPatch) {
        if patch.is_empty() {
            return;
        }
        self.working = self.working.merged(patch);
        self.has_pending_changes = true;
    }

    /// Restore the built-in defaults; still pending until saved.
    pub fn reset_to_defaults(&mut self) {
        self.working = SortSettings::default();
        self.has_pending_changes = true;
    }

    /// Replace the working copy with freshly loaded values.
    pub fn loaded(&mut self, settings: SortSettings) {
        self.working = settings.sanitized();
        self.has_pending_changes = false;
    }

    /// Mark the working copy as persisted.
    pub fn saved(&mut self) {
        self.has_pending_changes = false;
    }

    pub fn label_for(&self, kind: SettingKind) -> Option<&'static str> {
        let value = match kind {
            SettingKind::SimilarityThreshold => self.working.similarity_threshold,
            SettingKind::ResizeScale => self.working.resize_scale,
            SettingKind::MinClusterSize => f64::from(self.working.min_cluster_size),
        };
        classify(kind, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = SortSettings::default();
        assert_eq!(s.similarity_threshold, 0.62);
        assert_eq!(s.resize_scale, 0.5);
        assert_eq!(s.min_cluster_size, 2);
    }

    #[test]
    fn test_sanitize_keeps_in_range_values_exact() {
        let s = SortSettings {
            similarity_threshold: 0.73,
            resize_scale: 0.25,
            min_cluster_size: 7,
        };
        assert_eq!(s.sanitized(), s);
    }

    #[test]
    fn test_sanitize_replaces_out_of_range_with_defaults() {
        let s = SortSettings {
            similarity_threshold: 1.5,
            resize_scale: 0.0,
            min_cluster_size: 0,
        }
        .sanitized();
        assert_eq!(s, SortSettings::default());
    }

    #[test]
    fn test_sanitize_rejects_non_finite() {
        let s = SortSettings {
            similarity_threshold: f64::NAN,
            resize_scale: f64::INFINITY,
            min_cluster_size: 3,
        }
        .sanitized();
        assert_eq!(s.similarity_threshold, DEFAULT_SIMILARITY_THRESHOLD);
        assert_eq!(s.resize_scale, DEFAULT_RESIZE_SCALE);
        assert_eq!(s.min_cluster_size, 3);
    }

    #[test]
    fn test_merged_overlays_and_sanitizes() {
        let s = SortSettings::default().merged(SettingsPatch {
            similarity_threshold: Some(0.8),
            resize_scale: None,
            min_cluster_size: Some(0),
        });
        assert_eq!(s.similarity_threshold, 0.8);
        assert_eq!(s.resize_scale, 0.5);
        assert_eq!(s.min_cluster_size, DEFAULT_MIN_CLUSTER_SIZE);
    }

    #[test]
    fn test_unknown_keys_ignored_on_deserialize() {
        let s: SortSettings = serde_json::from_str(
            r#"{"similarity_threshold": 0.7, "legacy_flag": true, "min_cluster_size": 4}"#,
        )
        .unwrap();
        assert_eq!(s.similarity_threshold, 0.7);
        assert_eq!(s.resize_scale, DEFAULT_RESIZE_SCALE);
        assert_eq!(s.min_cluster_size, 4);
        // Re-serializing writes only recognized keys.
        let json = serde_json::to_string(&s).unwrap();
        assert!(!json.contains("legacy_flag"));
    }

    #[test]
    fn test_classify_similarity() {
        assert_eq!(
            classify(SettingKind::SimilarityThreshold, 0.2),
            Some("Very Loose")
        );
        assert_eq!(
            classify(SettingKind::SimilarityThreshold, 0.62),
            Some("Balanced")
        );
        assert_eq!(
            classify(SettingKind::SimilarityThreshold, 0.9),
            Some("Very Strict")
        );
    }

    #[test]
    fn test_classify_resize() {
        assert_eq!(classify(SettingKind::ResizeScale, 0.5), Some("Balanced"));
        assert_eq!(classify(SettingKind::ResizeScale, 0.1), Some("Fastest"));
        assert_eq!(classify(SettingKind::ResizeScale, 1.0), Some("Max Quality"));
    }

    #[test]
    fn test_classify_cluster_size() {
        assert_eq!(classify(SettingKind::MinClusterSize, 2.0), Some("Include All"));
        assert_eq!(classify(SettingKind::MinClusterSize, 10.0), Some("Exclude Rare"));
        assert_eq!(
            classify(SettingKind::MinClusterSize, 20.0),
            Some("Frequent Only")
        );
    }

    #[test]
    fn test_classify_fails_closed_above_all_bounds() {
        assert_eq!(classify(SettingKind::MinClusterSize, 50.0), None);
        assert_eq!(classify(SettingKind::SimilarityThreshold, 1.2), None);
        assert_eq!(classify(SettingKind::ResizeScale, f64::NAN), None);
    }

    #[test]
    fn test_editor_tracks_pending_changes() {
        let mut editor = SettingsEditor::new(SortSettings::default());
        assert!(!editor.has_pending_changes());

        editor.set(SettingsPatch::default());
        assert!(!editor.has_pending_changes());

        editor.set(SettingsPatch {
            similarity_threshold: Some(0.7),
            ..Default::default()
        });
        assert!(editor.has_pending_changes());
        assert_eq!(editor.working().similarity_threshold, 0.7);

        editor.saved();
        assert!(!editor.has_pending_changes());

        editor.reset_to_defaults();
        assert!(editor.has_pending_changes());
        assert_eq!(editor.working(), SortSettings::default());

        editor.loaded(SortSettings {
            similarity_threshold: 0.3,
            ..SortSettings::default()
        });
        assert!(!editor.has_pending_changes());
        assert_eq!(editor.label_for(SettingKind::SimilarityThreshold), Some("Loose"));
    }
}
