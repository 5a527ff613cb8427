//! Folder playlist enumeration.
//!
//! A folder session plays the files under the folder that match the media
//! extension allow-list, ordered lexicographically by full relative path.
//! The order must be deterministic: the stored playlist index only means
//! something if the same folder enumerates the same way on the next launch.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Enumerate playable files under `folder`, recursively, in stable order.
///
/// Unreadable entries are skipped rather than failing the whole enumeration;
/// a playlist is best-effort by nature (files move underneath us anyway).
pub fn enumerate(folder: &Path, media_extensions: &[String]) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(folder)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| is_media_file(path, media_extensions))
        .collect();

    // Lexicographic by full relative path; WalkDir's traversal order is not
    // guaranteed across platforms.
    files.sort_by(|a, b| {
        let ra = a.strip_prefix(folder).unwrap_or(a);
        let rb = b.strip_prefix(folder).unwrap_or(b);
        ra.cmp(rb)
    });
    files
}

/// Whether `path` has an extension in the allow-list (case-insensitive).
pub fn is_media_file(path: &Path, media_extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            media_extensions.iter().any(|allowed| *allowed == ext)
        })
        .unwrap_or(false)
}

/// Locate `file` in an enumerated playlist.
///
/// Matched by path first; `index_hint` breaks ties when the same path appears
/// ambiguous or, as a fallback, when the path is no longer present but the
/// hint still points at a valid entry.
pub fn position_of(playlist: &[PathBuf], file: &Path, index_hint: Option<usize>) -> Option<usize> {
    let matches: Vec<usize> = playlist
        .iter()
        .enumerate()
        .filter(|(_, p)| p.as_path() == file)
        .map(|(i, _)| i)
        .collect();

    match matches.as_slice() {
        [only] => Some(*only),
        [] => index_hint.filter(|i| *i < playlist.len()),
        many => {
            // Duplicate full paths cannot happen in a single walk, but keep
            // the hint-based disambiguation for symlinked trees.
            index_hint
                .filter(|i| many.contains(i))
                .or_else(|| many.first().copied())
        }
    }
}
