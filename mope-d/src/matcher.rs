//! Jump target resolution
//!
//! A query is split on whitespace and lowercased. A song matches when every
//! query word occurs somewhere in its lowercased full path.

use crate::playlist::Song;

/// Parsed jump query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    words: Vec<String>,
}

impl Query {
    /// Parse query text; `None` when it holds no words
    pub fn parse(text: &str) -> Option<Self> {
        let words: Vec<String> = text.split_whitespace().map(str::to_lowercase).collect();
        if words.is_empty() {
            None
        } else {
            Some(Self { words })
        }
    }

    pub fn matches(&self, song: &Song) -> bool {
        let path = song.lowered_path();
        self.words.iter().all(|word| path.contains(word.as_str()))
    }
}

/// Index of the song a jump query resolves to
///
/// Scans the songs after `cursor` first; if none matches, rescans the whole
/// list from the head, which may revisit the tail.
pub fn find(songs: &[Song], cursor: usize, text: &str) -> Option<usize> {
    let query = Query::parse(text)?;
    let after = cursor.saturating_add(1).min(songs.len());

    songs[after..]
        .iter()
        .position(|song| query.matches(song))
        .map(|offset| after + offset)
        .or_else(|| songs.iter().position(|song| query.matches(song)))
}
