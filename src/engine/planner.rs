//! Launch planning: user intent + stored session -> `LaunchPlan`.
//!
//! Planning is pure apart from filesystem inspection: it never mutates the
//! store and never spawns anything, so planning the same intent twice against
//! the same store state yields the same plan. Script generation happens later
//! in the supervisor, after the plan has been accepted.

use crate::engine::playlist;
use crate::error::{EngineError, Result};
use crate::model::{EngineConfig, LaunchPlan, PlayIntent, SessionMode, SessionRecord};
use std::path::{Path, PathBuf};

/// Build the launch plan for `intent` against the currently stored session.
pub fn plan(
    cfg: &EngineConfig,
    intent: &PlayIntent,
    stored: Option<&SessionRecord>,
) -> Result<LaunchPlan> {
    match intent {
        PlayIntent::NewFile(path) => plan_file(cfg, path, stored),
        PlayIntent::NewFolder(path) => plan_folder(cfg, path, stored),
        PlayIntent::ResumeLast => {
            let record = stored.ok_or(EngineError::NoPriorSession)?;
            let target = record.target_path.clone();
            match record.mode {
                SessionMode::SingleFile => plan_file(cfg, &target, stored),
                SessionMode::FolderPlaylist => plan_folder(cfg, &target, stored),
            }
        }
    }
}

fn plan_file(cfg: &EngineConfig, path: &Path, stored: Option<&SessionRecord>) -> Result<LaunchPlan> {
    if !path.is_file() {
        return Err(EngineError::TargetMissing(path.to_owned()));
    }

    // Re-opening the stored file resumes it; any other file starts fresh.
    let start_offset = stored
        .filter(|r| r.target_path == path)
        .map(|r| r.position_seconds)
        .unwrap_or(0.0);

    let mut args = base_args();
    if start_offset > 0.0 {
        args.push(format!("--start={start_offset}"));
    }
    args.push(path.display().to_string());

    Ok(LaunchPlan {
        player: cfg.player.clone(),
        args,
        mode: SessionMode::SingleFile,
        target_path: path.to_owned(),
        playlist: Vec::new(),
        start_offset,
        start_entry: None,
        script_seek: None,
        fallback: SessionRecord::single_file(path.to_owned(), start_offset),
    })
}

fn plan_folder(cfg: &EngineConfig, path: &Path, stored: Option<&SessionRecord>) -> Result<LaunchPlan> {
    if !path.is_dir() {
        return Err(EngineError::TargetMissing(path.to_owned()));
    }

    let playlist = playlist::enumerate(path, &cfg.media_extensions);
    if playlist.is_empty() {
        return Err(EngineError::EmptyPlaylist(path.to_owned()));
    }

    // Resume only applies when the stored session targets this same folder.
    let resume = stored.filter(|r| r.mode == SessionMode::FolderPlaylist && r.target_path == path);

    let start_entry: Option<usize> = resume.and_then(|r| match &r.last_file {
        Some(file) => playlist::position_of(&playlist, file, r.playlist_index),
        None => r.playlist_index.filter(|i| *i < playlist.len()),
    });
    let start_offset = resume.map(|r| r.position_seconds).unwrap_or(0.0);

    // The seek goes through the control script rather than `--start=`, which
    // would apply to every entry the playlist advances into.
    let script_seek = (start_offset > 0.0).then_some(start_offset);

    let mut args = base_args();
    args.push("--directory-mode=recursive".to_string());
    if let Some(entry) = start_entry {
        args.push(format!("--playlist-start={entry}"));
    }
    args.push(path.display().to_string());

    let last_file: Option<PathBuf> = start_entry.map(|i| playlist[i].clone());
    let fallback =
        SessionRecord::folder_playlist(path.to_owned(), last_file, start_entry, start_offset);

    Ok(LaunchPlan {
        player: cfg.player.clone(),
        args,
        mode: SessionMode::FolderPlaylist,
        target_path: path.to_owned(),
        playlist,
        start_offset,
        start_entry,
        script_seek,
        fallback,
    })
}

/// Arguments common to every invocation. The target path and the `--script=`
/// directive are appended elsewhere. `--force-window` keeps a window up even
/// for audio-only files so the user always has something to close.
fn base_args() -> Vec<String> {
    vec!["--force-window".to_string()]
}
