//! Circular playlist with a cursor
//!
//! The playlist is an ordered sequence of songs plus the index of the
//! "current" one. Whenever the cursor would run off either end, the whole
//! playlist is reshuffled and the cursor restarts at the new head, so the
//! list is conceptually circular and the cursor always names a song.

use std::ops::Range;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::{Error, Result};

/// Bytes stripped from a file name to form its display title
const EXTENSION_LEN: usize = 4;

/// A playable file, identified by its path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Song {
    path: PathBuf,
}

impl Song {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Last path segment with its trailing four-byte extension removed
    ///
    /// `"/music/Artist/Song.mp3"` becomes `"Song"`. Names that are too short
    /// come out empty. A cut that would split a UTF-8 sequence moves back to
    /// the start of that character.
    pub fn display_title(&self) -> String {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut keep = name.len().saturating_sub(EXTENSION_LEN);
        while !name.is_char_boundary(keep) {
            keep -= 1;
        }
        name[..keep].to_string()
    }

    /// Lowercased full path, used for matching
    pub fn lowered_path(&self) -> String {
        self.path.to_string_lossy().to_lowercase()
    }
}

impl From<&str> for Song {
    fn from(path: &str) -> Self {
        Song::new(path)
    }
}

/// Cursor movement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Ordered, mutable song collection with a cursor
///
/// Never empty: construction refuses an empty list and removal refuses to
/// take the last song.
#[derive(Debug)]
pub struct Playlist {
    songs: Vec<Song>,
    cursor: usize,
    rng: StdRng,
}

impl Playlist {
    /// Create a playlist in the given order, cursor at the first song
    pub fn new(songs: Vec<Song>) -> Result<Self> {
        Self::with_rng(songs, StdRng::from_entropy())
    }

    /// Create a playlist with a caller-supplied random source
    pub fn with_rng(songs: Vec<Song>, rng: StdRng) -> Result<Self> {
        if songs.is_empty() {
            return Err(Error::EmptyPlaylist(PathBuf::new()));
        }
        Ok(Self {
            songs,
            cursor: 0,
            rng,
        })
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    pub fn songs(&self) -> &[Song] {
        &self.songs
    }

    pub fn get(&self, index: usize) -> Option<&Song> {
        self.songs.get(index)
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Song under the cursor
    pub fn current(&self) -> &Song {
        &self.songs[self.cursor]
    }

    /// Move the cursor to `index`; out-of-range indexes are ignored
    pub fn set_cursor(&mut self, index: usize) -> bool {
        if index < self.songs.len() {
            self.cursor = index;
            true
        } else {
            false
        }
    }

    /// Replace the order with a uniformly random permutation and put the
    /// cursor on the new head
    pub fn shuffle(&mut self) {
        self.songs.shuffle(&mut self.rng);
        self.cursor = 0;
        debug!("Playlist reshuffled ({} songs)", self.songs.len());
    }

    /// Insert `song` before position `index` (clamped to the end)
    ///
    /// The cursor keeps pointing at the same song.
    pub fn insert(&mut self, index: usize, song: Song) -> usize {
        let index = index.min(self.songs.len());
        self.songs.insert(index, song);
        if index <= self.cursor {
            self.cursor += 1;
        }
        index
    }

    /// Insert `song` at a uniformly chosen index in `0..=len`
    pub fn insert_random(&mut self, song: Song) -> usize {
        let index = self.rng.gen_range(0..=self.songs.len());
        self.insert(index, song)
    }

    /// Remove the song at `index`
    ///
    /// Refuses to empty the playlist. Removing the current song moves the
    /// cursor to its successor, or to the head when it was the last one.
    pub fn remove(&mut self, index: usize) -> Option<Song> {
        if index >= self.songs.len() || self.songs.len() == 1 {
            return None;
        }
        let song = self.songs.remove(index);
        if index < self.cursor {
            self.cursor -= 1;
        } else if self.cursor >= self.songs.len() {
            self.cursor = 0;
        }
        Some(song)
    }

    /// Step the cursor one song in `direction`
    ///
    /// Stepping past either end reshuffles and restarts at the new head.
    pub fn advance(&mut self, direction: Direction) -> &Song {
        let next = match direction {
            Direction::Forward => self.cursor.checked_add(1).filter(|&i| i < self.songs.len()),
            Direction::Backward => self.cursor.checked_sub(1),
        };
        match next {
            Some(index) => self.cursor = index,
            None => self.shuffle(),
        }
        self.current()
    }

    /// Indexes of up to `radius` songs either side of the cursor, plus the
    /// cursor itself, clamped to the playlist bounds
    pub fn window(&self, radius: usize) -> Range<usize> {
        let start = self.cursor.saturating_sub(radius);
        let end = (self.cursor + radius + 1).min(self.songs.len());
        start..end
    }
}
