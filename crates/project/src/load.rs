//! Timeline deserialization — loading `TimelineFile` from JSON files.

use std::path::Path;

use tracing::{debug, info, warn};

use cutlist_common::RationalTime;

use crate::error::{ProjectError, ProjectResult};
use crate::types::{ElementData, TimelineFile, CURRENT_VERSION};

/// Deserialize a timeline from a JSON string.
///
/// The format version is checked before the typed parse so a file written
/// by a newer engine fails cleanly rather than with a field error.
pub fn from_json_string(json: &str) -> ProjectResult<TimelineFile> {
    // First parse as a generic Value to check the version
    let value: serde_json::Value = serde_json::from_str(json)?;

    let version = value
        .get("version")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| ProjectError::InvalidTimeline {
            reason: "missing or non-integer version field".into(),
        })?;
    if version > CURRENT_VERSION {
        return Err(ProjectError::UnsupportedVersion { version });
    }
    debug!(version, "Timeline file version accepted");

    let timeline: TimelineFile = serde_json::from_value(value)?;

    debug!(
        timeline_name = %timeline.name,
        "Deserialized timeline from JSON"
    );

    validate_timeline(&timeline)?;

    Ok(timeline)
}

/// Load a timeline from a file at the given path.
pub fn load_timeline(path: &Path) -> ProjectResult<TimelineFile> {
    if !path.exists() {
        return Err(ProjectError::NotFound {
            path: path.display().to_string(),
        });
    }

    let json = std::fs::read_to_string(path).map_err(|e| {
        tracing::error!(path = %path.display(), error = %e, "Failed to read timeline file");
        ProjectError::Io(e)
    })?;

    let timeline = from_json_string(&json)?;

    info!(
        timeline_name = %timeline.name,
        path = %path.display(),
        "Timeline loaded successfully"
    );

    Ok(timeline)
}

/// Validate basic structural requirements of a loaded timeline.
fn validate_timeline(timeline: &TimelineFile) -> ProjectResult<()> {
    if timeline.name.is_empty() {
        warn!("Timeline has empty name");
        return Err(ProjectError::InvalidTimeline {
            reason: "timeline name is empty".into(),
        });
    }

    if !matches!(timeline.root, ElementData::Composition { .. }) {
        return Err(ProjectError::InvalidTimeline {
            reason: format!("root element is a {}, not a composition", timeline.root.kind_label()),
        });
    }

    validate_element(&timeline.root)
}

fn validate_element(element: &ElementData) -> ProjectResult<()> {
    match element {
        ElementData::Clip { name, available_range, .. } => {
            if available_range.duration < RationalTime::ZERO {
                return Err(ProjectError::InvalidTimeline {
                    reason: format!("clip '{name}' has negative available duration"),
                });
            }
        }
        ElementData::Gap { name, duration } => {
            if *duration < RationalTime::ZERO {
                return Err(ProjectError::InvalidTimeline {
                    reason: format!("gap '{name}' has negative duration"),
                });
            }
        }
        ElementData::Transition { name, in_offset, out_offset } => {
            if *in_offset < RationalTime::ZERO || *out_offset < RationalTime::ZERO {
                return Err(ProjectError::InvalidTimeline {
                    reason: format!("transition '{name}' has a negative offset"),
                });
            }
        }
        ElementData::Composition { children, .. } => {
            for child in children {
                validate_element(child)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::save::{save_timeline, to_json_string};

    use cutlist_common::TimeRange;
    use cutlist_composition::{
        Clip, Composition, ElementHandle, Gap, Layout, Transition,
    };

    fn frames(n: i64) -> RationalTime {
        RationalTime::from_frames(n, 24)
    }

    fn range(start: i64, duration: i64) -> TimeRange {
        TimeRange::new(frames(start), frames(duration))
    }

    /// A nested timeline exercising every element kind:
    /// root(overlay) -> track(sequence) -> [clip][gap][transition][clip],
    /// with a trimmed nested sequence alongside.
    fn sample_tree() -> ElementHandle {
        let root = Composition::new("root", Layout::Overlay, None);

        let track = Composition::new("V1", Layout::Sequence, None);
        track
            .append_child(Clip::new("a", range(0, 48), Some(range(12, 24))).into())
            .unwrap();
        track.append_child(Gap::new("g", frames(10)).into()).unwrap();
        track
            .append_child(Transition::new("x", frames(4), frames(4)).into())
            .unwrap();
        track
            .append_child(Clip::new("b", range(0, 36), None).into())
            .unwrap();

        let nested = Composition::new("nested", Layout::Sequence, Some(range(2, 20)));
        nested
            .append_child(Clip::new("inner", range(0, 30), None).into())
            .unwrap();
        track.append_child(nested.into()).unwrap();

        root.append_child(track.into()).unwrap();
        root.into()
    }

    /// Name, placement, and trimmed placement of every element, in
    /// pre-order. Two trees answering identically are equivalent for every
    /// query this library offers.
    fn flatten(element: &ElementHandle, out: &mut Vec<(String, Option<TimeRange>)>) {
        let Some(comp) = element.as_composition() else {
            return;
        };
        for (i, child) in comp.children().iter().enumerate() {
            let trimmed = comp.trimmed_range_of_child_at_index(i).unwrap();
            out.push((child.name().to_string(), trimmed));
            flatten(child, out);
        }
    }

    #[test]
    fn from_json_string_roundtrip_preserves_queries() {
        let original = sample_tree();
        let file = crate::types::TimelineFile::new("Roundtrip", &original);
        let json = to_json_string(&file).expect("serialize");

        let loaded = from_json_string(&json).expect("deserialize");
        let rebuilt = loaded.build_root().expect("rebuild");

        let mut before = Vec::new();
        let mut after = Vec::new();
        flatten(&original, &mut before);
        flatten(&rebuilt, &mut after);
        assert_eq!(before, after);

        // spot-check a deep query on both trees
        let t = frames(20);
        let hit_before = original
            .as_composition()
            .unwrap()
            .child_at_time(t, false)
            .unwrap()
            .map(|c| c.name().to_string());
        let hit_after = rebuilt
            .as_composition()
            .unwrap()
            .child_at_time(t, false)
            .unwrap()
            .map(|c| c.name().to_string());
        assert_eq!(hit_before, hit_after);
    }

    #[test]
    fn rebuilt_children_map_matches_per_index_queries() {
        let file = crate::types::TimelineFile::new("Map Check", &sample_tree());
        let rebuilt = file.build_root().expect("rebuild");
        let root = rebuilt.as_composition().unwrap();
        let track = root.children()[0].as_composition().unwrap().clone();

        let all = track.range_of_all_children();
        for (i, child) in track.children().iter().enumerate() {
            assert_eq!(
                all.get(child).copied(),
                track.trimmed_range_of_child_at_index(i).unwrap()
            );
        }
    }

    #[test]
    fn load_timeline_file_roundtrip() {
        let dir = std::env::temp_dir().join("cutlist_load_test");
        let _ = std::fs::create_dir_all(&dir);
        let path = dir.join("load_test.ctl");

        let file = crate::types::TimelineFile::new("Load Test", &sample_tree());
        save_timeline(&file, &path).expect("save");

        let loaded = load_timeline(&path).expect("load");
        assert_eq!(loaded.name, "Load Test");
        let rebuilt = loaded.build_root().expect("rebuild");
        let root = rebuilt.as_composition().expect("composition root");
        assert_eq!(root.len(), 1);
        assert!(root.has_clips());

        // Clean up
        let _ = std::fs::remove_file(&path);
        let _ = std::fs::remove_dir(&dir);
    }

    #[test]
    fn load_timeline_nonexistent_file() {
        let path = std::path::PathBuf::from("/nonexistent/path/timeline.ctl");
        let err = load_timeline(&path).unwrap_err();
        assert!(matches!(err, ProjectError::NotFound { .. }));
    }

    #[test]
    fn from_json_string_invalid_json() {
        let result = from_json_string("this is not json");
        assert!(result.is_err());
    }

    #[test]
    fn future_version_is_rejected() {
        let json = serde_json::json!({
            "version": 99,
            "name": "From The Future",
            "root": { "kind": "composition", "name": "root", "layout": "sequence",
                      "source_range": null, "children": [] }
        });
        let err = from_json_string(&json.to_string()).unwrap_err();
        assert!(matches!(err, ProjectError::UnsupportedVersion { version: 99 }));
    }

    #[test]
    fn missing_version_is_rejected() {
        let json = serde_json::json!({
            "name": "No Version",
            "root": { "kind": "composition", "name": "root", "layout": "sequence",
                      "source_range": null, "children": [] }
        });
        let err = from_json_string(&json.to_string()).unwrap_err();
        assert!(matches!(err, ProjectError::InvalidTimeline { .. }));
    }

    #[test]
    fn validate_rejects_empty_name() {
        let json = serde_json::json!({
            "version": 1,
            "name": "",
            "root": { "kind": "composition", "name": "root", "layout": "sequence",
                      "source_range": null, "children": [] }
        });
        let err = from_json_string(&json.to_string()).unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn validate_rejects_non_composition_root() {
        let json = serde_json::json!({
            "version": 1,
            "name": "Bad Root",
            "root": { "kind": "gap", "name": "g",
                      "duration": { "value": 10, "rate": 24 } }
        });
        let err = from_json_string(&json.to_string()).unwrap_err();
        assert!(err.to_string().contains("not a composition"));
    }

    #[test]
    fn validate_rejects_negative_duration() {
        let json = serde_json::json!({
            "version": 1,
            "name": "Bad Gap",
            "root": {
                "kind": "composition", "name": "root", "layout": "sequence",
                "source_range": null,
                "children": [
                    { "kind": "gap", "name": "g",
                      "duration": { "value": -5, "rate": 24 } }
                ]
            }
        });
        let err = from_json_string(&json.to_string()).unwrap_err();
        assert!(err.to_string().contains("negative"));
    }

}
