use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How a session was launched: a single media file, or a folder enumerated
/// into an ordered playlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    SingleFile,
    FolderPlaylist,
}

/// The single persisted unit of resume state. Exactly one record exists at a
/// time; every save replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub mode: SessionMode,
    /// File path (single file) or folder path (folder playlist).
    pub target_path: PathBuf,
    /// Absolute path of the file actually playing at exit. Folder mode only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_file: Option<PathBuf>,
    /// Playback offset within the playing file at exit, in seconds.
    pub position_seconds: f64,
    /// 0-based index of `last_file` within the enumerated playlist, used as a
    /// tie-break when the path alone is ambiguous (duplicate filenames in
    /// subfolders). Folder mode only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playlist_index: Option<usize>,
    /// Last write time (RFC3339), informational only.
    #[serde(default)]
    pub updated_at: String,
}

impl SessionRecord {
    pub fn single_file(target: PathBuf, position_seconds: f64) -> Self {
        Self {
            mode: SessionMode::SingleFile,
            target_path: target,
            last_file: None,
            position_seconds: position_seconds.max(0.0),
            playlist_index: None,
            updated_at: String::new(),
        }
    }

    pub fn folder_playlist(
        target: PathBuf,
        last_file: Option<PathBuf>,
        playlist_index: Option<usize>,
        position_seconds: f64,
    ) -> Self {
        Self {
            mode: SessionMode::FolderPlaylist,
            target_path: target,
            last_file,
            position_seconds: position_seconds.max(0.0),
            playlist_index,
            updated_at: String::new(),
        }
    }

    /// Re-establish field invariants after deserialization: offsets are
    /// clamped to zero and single-file records carry no playlist fields.
    pub fn normalized(mut self) -> Self {
        if !self.position_seconds.is_finite() || self.position_seconds < 0.0 {
            self.position_seconds = 0.0;
        }
        if self.mode == SessionMode::SingleFile {
            self.last_file = None;
            self.playlist_index = None;
        }
        self
    }

    /// The file whose position the record describes.
    pub fn playing_file(&self) -> &Path {
        self.last_file.as_deref().unwrap_or(&self.target_path)
    }
}

/// Current RFC3339 timestamp for `SessionRecord.updated_at`.
pub fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "now".into())
}

/// A user request handed to the launch planner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayIntent {
    /// Play a single file. Re-opening the file from the stored session
    /// resumes it; any other file starts fresh.
    NewFile(PathBuf),
    /// Play a folder as an ordered playlist.
    NewFolder(PathBuf),
    /// Reconstruct the stored session exactly.
    ResumeLast,
}

/// Fully resolved parameters for one player run. Ephemeral, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchPlan {
    /// Player executable, resolved from configuration.
    pub player: String,
    /// Arguments in final order, target path last. The `--script=` directive
    /// is appended by the supervisor once the control script exists.
    pub args: Vec<String>,
    pub mode: SessionMode,
    pub target_path: PathBuf,
    /// Enumerated playlist (folder mode), in playback order.
    pub playlist: Vec<PathBuf>,
    /// Offset the run starts at, in seconds.
    pub start_offset: f64,
    /// Playlist entry the run starts at (folder mode).
    pub start_entry: Option<usize>,
    /// Seek the control script performs on the first loaded file, instead of
    /// a `--start=` argument. Used for folder resume, where `--start=` would
    /// re-seek every subsequent playlist entry as well.
    pub script_seek: Option<f64>,
    /// Record to persist when the child exits without a usable report: the
    /// state the plan itself intended, offset unchanged.
    pub fallback: SessionRecord,
}

/// Raw contents of the report file the control script writes on player quit.
/// All fields optional; the supervisor decides whether the report is usable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportedState {
    #[serde(default)]
    pub file: Option<PathBuf>,
    /// Float-typed: the player's JSON writer may emit whole numbers with a
    /// fractional part.
    #[serde(default)]
    pub playlist_pos: Option<f64>,
    #[serde(default)]
    pub time_pos: Option<f64>,
}

/// Outcome of one supervised player run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Child exit code, informational only. `None` if killed by a signal.
    pub exit_code: Option<i32>,
    /// Tail of the child's combined stdout/stderr, for diagnostics.
    pub captured_output: String,
    /// The session state captured for the next launch.
    pub session: SessionRecord,
    /// Whether the exit report was present and usable. When false, `session`
    /// is the plan's fallback record.
    pub report_received: bool,
}

/// Extensions recognized as playable media unless overridden.
pub const DEFAULT_MEDIA_EXTENSIONS: &[&str] = &[
    "mkv", "mp4", "avi", "webm", "mov", "m4v", "mp3", "flac", "ogg", "opus", "m4a", "wav", "aac",
];

/// Process-wide engine configuration, resolved once at startup.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Player executable name or path.
    pub player: String,
    /// Location of the persisted session record.
    pub cache_file: PathBuf,
    /// Lowercase extensions that count as playable media.
    pub media_extensions: Vec<String>,
    /// Bytes of child output to retain for diagnostics (most recent wins).
    pub output_capture_bytes: usize,
}

impl EngineConfig {
    /// Default store location: `<cache_dir>/mpv-recall/last_session.json`.
    pub fn default_cache_file() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mpv-recall")
            .join("last_session.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_clamps_negative_position() {
        let rec = SessionRecord {
            mode: SessionMode::SingleFile,
            target_path: "/media/a.mkv".into(),
            last_file: None,
            position_seconds: -3.0,
            playlist_index: None,
            updated_at: String::new(),
        };
        assert_eq!(rec.normalized().position_seconds, 0.0);
    }

    #[test]
    fn normalized_strips_playlist_fields_in_single_file_mode() {
        let rec = SessionRecord {
            mode: SessionMode::SingleFile,
            target_path: "/media/a.mkv".into(),
            last_file: Some("/media/b.mkv".into()),
            position_seconds: 10.0,
            playlist_index: Some(3),
            updated_at: String::new(),
        };
        let rec = rec.normalized();
        assert_eq!(rec.last_file, None);
        assert_eq!(rec.playlist_index, None);
    }

    #[test]
    fn playing_file_prefers_last_file() {
        let rec =
            SessionRecord::folder_playlist("/media/show".into(), Some("/media/show/e2.mkv".into()), Some(1), 5.0);
        assert_eq!(rec.playing_file(), Path::new("/media/show/e2.mkv"));

        let rec = SessionRecord::single_file("/media/a.mkv".into(), 5.0);
        assert_eq!(rec.playing_file(), Path::new("/media/a.mkv"));
    }
}
