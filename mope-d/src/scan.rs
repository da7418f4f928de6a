//! Music root scanner
//!
//! Recursive discovery of every regular file below the music root. No format
//! check is made here: a file no decoder can play is skipped at playback
//! time.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::playlist::Song;
use crate::{Error, Result};

/// Collect every regular file below `root`, following symlinks
///
/// Unreadable entries are logged and skipped. Paths are returned sorted;
/// the playlist is shuffled before playback anyway.
pub fn scan_music_root(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root).follow_links(true) {
        match entry {
            Ok(entry) => {
                if entry.file_type().is_file() {
                    files.push(entry.into_path());
                }
            }
            Err(e) => {
                warn!("Error accessing entry: {}", e);
            }
        }
    }

    files.sort();
    debug!("Scan of {} found {} files", root.display(), files.len());
    files
}

/// Scan `root` into playlist songs, refusing an empty result
pub fn load_songs(root: &Path) -> Result<Vec<Song>> {
    let songs: Vec<Song> = scan_music_root(root).into_iter().map(Song::new).collect();
    if songs.is_empty() {
        return Err(Error::EmptyPlaylist(root.to_path_buf()));
    }
    Ok(songs)
}
