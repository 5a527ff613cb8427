//! Control script generation.
//!
//! mpv's only exit hook is its embedded Lua scripting, so every run gets a
//! small generated script that tracks the playing file, playlist position,
//! and time offset, and dumps them as JSON to a report file when the player
//! shuts down. Script and report paths are uniquely named per run; both are
//! removed once the supervisor has read the report.

use crate::error::{EngineError, Result};
use crate::model::ReportedState;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A generated control script and its report path, valid for exactly one run.
///
/// Dropping the handle removes both files; `cleanup` can be called earlier
/// for an explicit, logged removal. Either way removal is best-effort: a
/// leftover temp file is clutter, not a correctness problem.
#[derive(Debug)]
pub struct ControlScript {
    script_path: PathBuf,
    report_path: PathBuf,
    cleaned: bool,
}

impl ControlScript {
    /// Write a fresh control script to a uniquely-named temp file.
    ///
    /// `seek_on_load` makes the script perform a one-shot absolute seek on
    /// the first `file-loaded` event. Folder resume needs this instead of
    /// `--start=`, which would re-seek every later playlist entry too.
    pub fn generate(seek_on_load: Option<f64>) -> Result<Self> {
        let report = tempfile::Builder::new()
            .prefix("mpv-recall-report-")
            .suffix(".json")
            .tempfile()
            .map_err(|source| EngineError::ScriptError { source })?;
        // The script recreates the report on quit; only the unique name is
        // reserved here.
        let (_, report_path) = report
            .keep()
            .map_err(|e| EngineError::ScriptError { source: e.error })?;

        let mut script = tempfile::Builder::new()
            .prefix("mpv-recall-")
            .suffix(".lua")
            .tempfile()
            .map_err(|source| EngineError::ScriptError { source })?;
        script
            .write_all(lua_source(&report_path, seek_on_load).as_bytes())
            .and_then(|_| script.flush())
            .map_err(|source| EngineError::ScriptError { source })?;
        let (_, script_path) = script
            .keep()
            .map_err(|e| EngineError::ScriptError { source: e.error })?;

        debug!(script = %script_path.display(), report = %report_path.display(), "control script generated");
        Ok(Self {
            script_path,
            report_path,
            cleaned: false,
        })
    }

    pub fn script_path(&self) -> &Path {
        &self.script_path
    }

    pub fn report_path(&self) -> &Path {
        &self.report_path
    }

    /// Parse the report the script wrote on player quit.
    ///
    /// `None` when the file is absent or malformed; the caller falls back to
    /// its pre-run state. Playback having happened is not an error even when
    /// reporting failed.
    pub fn read_report(&self) -> Option<ReportedState> {
        let data = match std::fs::read_to_string(&self.report_path) {
            Ok(data) => data,
            Err(e) => {
                warn!(report = %self.report_path.display(), error = %e, "no exit report from player");
                return None;
            }
        };
        match serde_json::from_str(&data) {
            Ok(state) => Some(state),
            Err(e) => {
                warn!(report = %self.report_path.display(), error = %e, "exit report unparsable");
                None
            }
        }
    }

    /// Remove the script and report files. Best-effort; failures are logged.
    pub fn cleanup(mut self) {
        self.remove_files();
    }

    fn remove_files(&mut self) {
        if self.cleaned {
            return;
        }
        self.cleaned = true;
        for path in [&self.script_path, &self.report_path] {
            if let Err(e) = std::fs::remove_file(path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %path.display(), error = %e, "failed to remove temp file");
                }
            }
        }
    }
}

impl Drop for ControlScript {
    fn drop(&mut self) {
        self.remove_files();
    }
}

/// The Lua the player loads via `--script=`.
///
/// Property observers keep the last known file/position in locals because the
/// `shutdown` event fires after the playing file is torn down; reading the
/// properties at shutdown time would mostly yield nil.
fn lua_source(report_path: &Path, seek_on_load: Option<f64>) -> String {
    let mut src = String::new();
    src.push_str("local utils = require 'mp.utils'\n\n");
    src.push_str(&format!(
        "local report_path = {}\n",
        lua_quote(&report_path.to_string_lossy())
    ));
    src.push_str(
        r#"
local last = { file = nil, playlist_pos = nil, time_pos = nil }

mp.observe_property('path', 'string', function(_, value)
    if value ~= nil then
        local dir = mp.get_property('working-directory')
        if dir ~= nil and not value:match('^/') then
            last.file = utils.join_path(dir, value)
        else
            last.file = value
        end
    end
end)

mp.observe_property('playlist-pos', 'number', function(_, value)
    if value ~= nil and value >= 0 then
        last.playlist_pos = value
    end
end)

mp.observe_property('time-pos', 'number', function(_, value)
    if value ~= nil then
        last.time_pos = value
    end
end)

mp.register_event('shutdown', function()
    local f = io.open(report_path, 'w')
    if f == nil then
        return
    end
    f:write(utils.format_json({
        file = last.file,
        playlist_pos = last.playlist_pos,
        time_pos = last.time_pos,
    }))
    f:close()
end)
"#,
    );

    if let Some(offset) = seek_on_load {
        src.push_str(&format!(
            r#"
local sought = false
local target_time = {offset:.3}

mp.register_event('file-loaded', function()
    if not sought then
        sought = true
        mp.commandv('seek', target_time, 'absolute')
    end
end)
"#,
        ));
    }

    src
}

/// Quote a path as a Lua string literal.
fn lua_quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_creates_unique_script_and_report_paths() {
        let a = ControlScript::generate(None).unwrap();
        let b = ControlScript::generate(None).unwrap();
        assert_ne!(a.script_path(), b.script_path());
        assert_ne!(a.report_path(), b.report_path());
        assert!(a.script_path().exists());
        assert!(a.report_path().exists());
    }

    #[test]
    fn script_embeds_report_path_and_shutdown_hook() {
        let script = ControlScript::generate(None).unwrap();
        let src = std::fs::read_to_string(script.script_path()).unwrap();
        assert!(src.contains(&*script.report_path().to_string_lossy()));
        assert!(src.contains("shutdown"));
        assert!(!src.contains("file-loaded"));
    }

    #[test]
    fn seek_on_load_adds_one_shot_seek() {
        let script = ControlScript::generate(Some(127.5)).unwrap();
        let src = std::fs::read_to_string(script.script_path()).unwrap();
        assert!(src.contains("file-loaded"));
        assert!(src.contains("127.500"));
    }

    #[test]
    fn cleanup_removes_both_files() {
        let script = ControlScript::generate(None).unwrap();
        let (sp, rp) = (script.script_path().to_owned(), script.report_path().to_owned());
        script.cleanup();
        assert!(!sp.exists());
        assert!(!rp.exists());
    }

    #[test]
    fn drop_removes_files_on_error_paths() {
        let (sp, rp);
        {
            let script = ControlScript::generate(None).unwrap();
            sp = script.script_path().to_owned();
            rp = script.report_path().to_owned();
        }
        assert!(!sp.exists());
        assert!(!rp.exists());
    }

    #[test]
    fn read_report_parses_script_output_shape() {
        let script = ControlScript::generate(None).unwrap();
        std::fs::write(
            script.report_path(),
            r#"{"file":"/media/Show/e2.mkv","playlist_pos":1,"time_pos":127.5}"#,
        )
        .unwrap();
        let state = script.read_report().unwrap();
        assert_eq!(state.file.as_deref(), Some(Path::new("/media/Show/e2.mkv")));
        assert_eq!(state.playlist_pos, Some(1.0));
        assert_eq!(state.time_pos, Some(127.5));
    }

    #[test]
    fn read_report_tolerates_absent_and_garbage() {
        let script = ControlScript::generate(None).unwrap();
        std::fs::remove_file(script.report_path()).unwrap();
        assert!(script.read_report().is_none());

        let script = ControlScript::generate(None).unwrap();
        std::fs::write(script.report_path(), "not json").unwrap();
        assert!(script.read_report().is_none());
    }

    #[test]
    fn lua_quote_escapes_quotes() {
        assert_eq!(lua_quote(r#"a"b"#), r#""a\"b""#);
    }
}
