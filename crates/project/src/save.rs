//! Timeline serialization — writing `TimelineFile` to JSON files.

use std::path::Path;

use tracing::{debug, info};

use crate::error::{ProjectError, ProjectResult};
use crate::types::TimelineFile;

/// Serialize a timeline to a pretty-printed JSON string.
pub fn to_json_string(timeline: &TimelineFile) -> ProjectResult<String> {
    let json = serde_json::to_string_pretty(timeline)?;
    debug!(
        timeline_name = %timeline.name,
        json_len = json.len(),
        "Serialized timeline to JSON"
    );
    Ok(json)
}

/// Serialize a timeline to a compact (non-pretty) JSON string.
pub fn to_json_string_compact(timeline: &TimelineFile) -> ProjectResult<String> {
    let json = serde_json::to_string(timeline)?;
    debug!(
        timeline_name = %timeline.name,
        json_len = json.len(),
        "Serialized timeline to compact JSON"
    );
    Ok(json)
}

/// Save a timeline to a file at the given path.
///
/// The file is written atomically: data goes to a temporary file in the
/// same directory first, then a rename to the target path. An interrupted
/// write never leaves a half-written timeline behind.
pub fn save_timeline(timeline: &TimelineFile, path: &Path) -> ProjectResult<()> {
    let json = to_json_string(timeline)?;

    let temp_path = path.with_extension("ctl.tmp");

    std::fs::write(&temp_path, json.as_bytes()).map_err(|e| {
        tracing::error!(path = %temp_path.display(), error = %e, "Failed to write temp file");
        ProjectError::Io(e)
    })?;

    std::fs::rename(&temp_path, path).map_err(|e| {
        // If rename fails, try to clean up the temp file (best effort).
        let _ = std::fs::remove_file(&temp_path);
        tracing::error!(
            from = %temp_path.display(),
            to = %path.display(),
            error = %e,
            "Failed to rename temp file to target"
        );
        ProjectError::Io(e)
    })?;

    info!(
        timeline_name = %timeline.name,
        path = %path.display(),
        "Timeline saved successfully"
    );
    Ok(())
}
