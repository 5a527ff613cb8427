//! Process supervision: execute a `LaunchPlan`, wait for the player to exit,
//! and reconcile the exit report into the next session record.
//!
//! This is the system's single blocking point. No timeout is imposed on the
//! child: playback is unbounded and the user ending it (window close, quit
//! key, kill) all look the same from here, a terminated process.

use crate::engine::playlist;
use crate::engine::script::ControlScript;
use crate::error::{EngineError, Result};
use crate::model::{LaunchPlan, ReportedState, RunOutcome, SessionMode, SessionRecord};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Run the plan to completion and capture the resulting session state.
///
/// The generated control script lives exactly as long as this call; cleanup
/// runs on every exit path. A non-zero child exit code is informational, not
/// a failure: a player quit by the user often exits non-zero.
pub async fn run(plan: &LaunchPlan, capture_bytes: usize) -> Result<RunOutcome> {
    let script = ControlScript::generate(plan.script_seek)?;

    let mut cmd = Command::new(&plan.player);
    cmd.args(&plan.args[..plan.args.len() - 1])
        .arg(format!("--script={}", script.script_path().display()))
        .arg(&plan.args[plan.args.len() - 1])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!(player = %plan.player, args = ?plan.args, "spawning player");

    let mut child = cmd.spawn().map_err(|source| EngineError::SpawnFailed {
        player: plan.player.clone(),
        source,
    })?;

    // Stream both pipes into one bounded tail buffer while waiting; the
    // child must not block on a full pipe during an hours-long session.
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<String>();
    if let Some(out) = stdout {
        let tx = tx.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(out).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let _ = tx.send(line);
            }
        });
    }
    if let Some(err) = stderr {
        let tx = tx.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(err).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let _ = tx.send(line);
            }
        });
    }
    drop(tx);

    // Both reader tasks end at pipe EOF, which closes the channel; only then
    // reap the exit status. Waiting is indefinite by design.
    let mut captured = OutputTail::new(capture_bytes);
    while let Some(line) = rx.recv().await {
        captured.push(&line);
    }
    let status = child
        .wait()
        .await
        .map_err(|source| EngineError::SpawnFailed {
            player: plan.player.clone(),
            source,
        })?;
    let exit_code = status.code();
    if !status.success() {
        info!(?exit_code, "player exited non-zero (informational)");
    }

    let report = script.read_report();
    let (session, report_received) = reconcile(plan, report);
    script.cleanup();

    Ok(RunOutcome {
        exit_code,
        captured_output: captured.into_string(),
        session,
        report_received,
    })
}

/// Turn the exit report into the session record to persist.
///
/// An absent or incomplete report (no time offset, or no file in folder
/// mode) falls back to the plan's intended state wholesale, offset
/// unchanged. Partial reports are not merged field by field.
fn reconcile(plan: &LaunchPlan, report: Option<ReportedState>) -> (SessionRecord, bool) {
    let Some(report) = report else {
        return (plan.fallback.clone(), false);
    };
    let Some(time_pos) = report.time_pos else {
        warn!("exit report has no time offset, keeping pre-run state");
        return (plan.fallback.clone(), false);
    };

    match plan.mode {
        SessionMode::SingleFile => (
            SessionRecord::single_file(plan.target_path.clone(), time_pos),
            true,
        ),
        SessionMode::FolderPlaylist => {
            let Some(file) = report.file else {
                warn!("exit report has no file path, keeping pre-run state");
                return (plan.fallback.clone(), false);
            };
            let hint = report
                .playlist_pos
                .filter(|p| p.is_finite() && *p >= 0.0)
                .map(|p| p as usize);
            let index = playlist::position_of(&plan.playlist, &file, hint);
            (
                SessionRecord::folder_playlist(
                    plan.target_path.clone(),
                    Some(file),
                    index,
                    time_pos,
                ),
                true,
            )
        }
    }
}

/// Bounded diagnostic buffer: retains the most recent lines up to a byte
/// budget, dropping from the front.
struct OutputTail {
    lines: std::collections::VecDeque<String>,
    bytes: usize,
    max_bytes: usize,
}

impl OutputTail {
    fn new(max_bytes: usize) -> Self {
        Self {
            lines: std::collections::VecDeque::new(),
            bytes: 0,
            max_bytes,
        }
    }

    fn push(&mut self, line: &str) {
        self.bytes += line.len() + 1;
        self.lines.push_back(line.to_owned());
        while self.bytes > self.max_bytes {
            match self.lines.pop_front() {
                Some(dropped) => self.bytes -= dropped.len() + 1,
                None => break,
            }
        }
    }

    fn into_string(self) -> String {
        let mut out = String::with_capacity(self.bytes);
        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EngineConfig, PlayIntent};
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn cfg() -> EngineConfig {
        EngineConfig {
            player: "mpv".into(),
            cache_file: "/nonexistent/last_session.json".into(),
            media_extensions: vec!["mkv".into()],
            output_capture_bytes: 64 * 1024,
        }
    }

    fn media_file(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, b"x").unwrap();
        path
    }

    /// A stand-in player: a shell script that prints a line and exits with
    /// the given code. Keeps supervisor tests independent of mpv.
    fn stub_player(dir: &Path, exit_code: i32) -> String {
        let path = dir.join("stub-player.sh");
        std::fs::write(
            &path,
            format!("#!/bin/sh\necho stub player ran\nexit {exit_code}\n"),
        )
        .unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path.display().to_string()
    }

    fn folder_plan(dir: &TempDir, player: String) -> LaunchPlan {
        media_file(dir.path(), "e1.mkv");
        media_file(dir.path(), "e2.mkv");
        let mut cfg = cfg();
        cfg.player = player;
        crate::engine::planner::plan(&cfg, &PlayIntent::NewFolder(dir.path().to_owned()), None)
            .unwrap()
    }

    #[tokio::test]
    async fn spawn_failure_is_a_hard_error() {
        let dir = TempDir::new().unwrap();
        let plan = folder_plan(&dir, "/no/such/player-binary".into());
        match run(&plan, 64 * 1024).await {
            Err(EngineError::SpawnFailed { .. }) => {}
            other => panic!("expected SpawnFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_report_falls_back_to_plan_state_and_captures_output() {
        let dir = TempDir::new().unwrap();
        let player = stub_player(dir.path(), 0);
        let plan = folder_plan(&dir, player);

        let outcome = run(&plan, 64 * 1024).await.unwrap();
        assert!(!outcome.report_received);
        assert_eq!(outcome.session, plan.fallback);
        assert_eq!(outcome.exit_code, Some(0));
        assert!(outcome.captured_output.contains("stub player ran"));
    }

    #[tokio::test]
    async fn non_zero_exit_is_informational_not_fatal() {
        let dir = TempDir::new().unwrap();
        let player = stub_player(dir.path(), 4);
        let plan = folder_plan(&dir, player);

        let outcome = run(&plan, 64 * 1024).await.unwrap();
        assert_eq!(outcome.exit_code, Some(4));
        assert_eq!(outcome.session, plan.fallback);
    }

    #[test]
    fn reconcile_folder_report_resolves_file_and_index() {
        let dir = TempDir::new().unwrap();
        let plan = folder_plan(&dir, "mpv".into());
        let e2 = dir.path().join("e2.mkv");

        let report = ReportedState {
            file: Some(e2.clone()),
            playlist_pos: Some(1.0),
            time_pos: Some(127.5),
        };
        let (session, received) = reconcile(&plan, Some(report));
        assert!(received);
        assert_eq!(session.mode, SessionMode::FolderPlaylist);
        assert_eq!(session.target_path, dir.path());
        assert_eq!(session.last_file, Some(e2));
        assert_eq!(session.playlist_index, Some(1));
        assert_eq!(session.position_seconds, 127.5);
    }

    #[test]
    fn reconcile_incomplete_report_is_full_fallback() {
        let dir = TempDir::new().unwrap();
        let plan = folder_plan(&dir, "mpv".into());

        // Offset but no file.
        let report = ReportedState {
            file: None,
            playlist_pos: Some(1.0),
            time_pos: Some(127.5),
        };
        let (session, received) = reconcile(&plan, Some(report));
        assert!(!received);
        assert_eq!(session, plan.fallback);

        // File but no offset.
        let report = ReportedState {
            file: Some(dir.path().join("e2.mkv")),
            playlist_pos: None,
            time_pos: None,
        };
        let (session, received) = reconcile(&plan, Some(report));
        assert!(!received);
        assert_eq!(session, plan.fallback);
    }

    #[test]
    fn reconcile_single_file_report_updates_offset() {
        let dir = TempDir::new().unwrap();
        let file = media_file(dir.path(), "a.mkv");
        let plan =
            crate::engine::planner::plan(&cfg(), &PlayIntent::NewFile(file.clone()), None).unwrap();

        let report = ReportedState {
            file: Some(file.clone()),
            playlist_pos: Some(0.0),
            time_pos: Some(42.25),
        };
        let (session, received) = reconcile(&plan, Some(report));
        assert!(received);
        assert_eq!(session.mode, SessionMode::SingleFile);
        assert_eq!(session.target_path, file);
        assert_eq!(session.last_file, None);
        assert_eq!(session.position_seconds, 42.25);
    }

    #[test]
    fn output_tail_keeps_most_recent_lines() {
        let mut tail = OutputTail::new(16);
        tail.push("first line that is long");
        tail.push("second");
        tail.push("third");
        let out = tail.into_string();
        assert!(!out.contains("first"));
        assert!(out.contains("second"));
        assert!(out.ends_with("third\n"));
    }
}
