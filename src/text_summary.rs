//! Human-readable lines for CLI output.
//!
//! The engine returns structured outcomes; this module formats them for the
//! terminal. Printing itself stays in the CLI layer.

use crate::model::{RunOutcome, SessionMode, SessionRecord};

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

/// Describe a stored session for `status` and pre-resume display.
pub(crate) fn build_session_summary(record: &SessionRecord) -> TextSummary {
    let mut lines = Vec::new();
    match record.mode {
        SessionMode::SingleFile => {
            lines.push(format!("Last watched: {}", record.target_path.display()));
        }
        SessionMode::FolderPlaylist => {
            lines.push(format!("Last playlist: {}", record.target_path.display()));
            if let Some(file) = record.last_file.as_deref() {
                let entry = record
                    .playlist_index
                    .map(|i| format!(" (entry {i})"))
                    .unwrap_or_default();
                lines.push(format!("Playing file: {}{entry}", file.display()));
            }
        }
    }
    lines.push(format!(
        "Position: {}",
        format_offset(record.position_seconds)
    ));
    if !record.updated_at.is_empty() {
        lines.push(format!("Saved: {}", record.updated_at));
    }
    TextSummary { lines }
}

/// Describe the result of a finished run.
pub(crate) fn build_outcome_summary(outcome: &RunOutcome) -> TextSummary {
    let mut lines = Vec::new();
    if outcome.report_received {
        lines.push(format!(
            "Playback stopped at {} in {}",
            format_offset(outcome.session.position_seconds),
            outcome.session.playing_file().display()
        ));
    } else {
        lines.push("Playback finished; no exit position reported, keeping previous state.".into());
    }
    match outcome.exit_code {
        Some(0) => {}
        Some(code) => lines.push(format!("Player exit code: {code}")),
        None => lines.push("Player terminated by signal".into()),
    }
    TextSummary { lines }
}

/// Seconds as `H:MM:SS`, truncating sub-second precision.
pub(crate) fn format_offset(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_format_as_hms() {
        assert_eq!(format_offset(0.0), "0:00:00");
        assert_eq!(format_offset(127.5), "0:02:07");
        assert_eq!(format_offset(3_725.0), "1:02:05");
        assert_eq!(format_offset(-4.0), "0:00:00");
    }

    #[test]
    fn folder_summary_names_playing_file_and_entry() {
        let record = SessionRecord::folder_playlist(
            "/media/Show".into(),
            Some("/media/Show/e2.mkv".into()),
            Some(1),
            127.5,
        );
        let summary = build_session_summary(&record);
        assert!(summary.lines[0].contains("/media/Show"));
        assert!(summary.lines[1].contains("e2.mkv"));
        assert!(summary.lines[1].contains("entry 1"));
        assert!(summary.lines[2].contains("0:02:07"));
    }
}
