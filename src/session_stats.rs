use std::cmp::Reverse;
use std::collections::HashMap;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::listen::ListenRecord;

/// Number of artists and genres kept in a session's ranking
pub const TOP_N: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedEntry {
    pub name: String,
    pub count: u32,
}

/// Per-session listening statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub top_artists: Vec<RankedEntry>,
    pub top_genres: Vec<RankedEntry>,
    /// Percentage of listens that reached the end of the track, 0..=100
    pub completion_rate: u8,
}

impl SessionStats {
    pub fn top_artist(&self) -> Option<&RankedEntry> {
        self.top_artists.first()
    }

    pub fn top_genre(&self) -> Option<&RankedEntry> {
        self.top_genres.first()
    }
}

/// Occurrence counts that remember the order in which keys were first seen
#[derive(Default)]
struct Tally<'a> {
    index: HashMap<&'a str, usize>,
    entries: Vec<(&'a str, u32)>,
}

impl<'a> Tally<'a> {
    fn bump(&mut self, key: &'a str) {
        match self.index.get(key) {
            Some(&slot) => self.entries[slot].1 += 1,
            None => {
                self.index.insert(key, self.entries.len());
                self.entries.push((key, 1));
            }
        }
    }

    /// Highest counts first; equal counts keep first-seen order (stable sort).
    fn top(self, n: usize) -> Vec<RankedEntry> {
        self.entries
            .into_iter()
            .sorted_by_key(|&(_, count)| Reverse(count))
            .take(n)
            .map(|(name, count)| RankedEntry {
                name: name.to_string(),
                count,
            })
            .collect()
    }
}

/// Aggregate the listens of one session into top artists, top genres and
/// completion rate.
///
/// Artists are grouped by their display name exactly as given. Every genre tag
/// of a record counts once, records without genres count for no genre. When
/// two keys have the same count the one that appears first in `records` ranks
/// higher.
pub fn compute_stats<R: ListenRecord>(records: &[R]) -> SessionStats {
    let mut artists = Tally::default();
    let mut genres = Tally::default();
    let mut completed = 0usize;

    for record in records {
        artists.bump(record.artist_name());
        for genre in record.genres() {
            genres.bump(genre);
        }
        if record.listened_completely() {
            completed += 1;
        }
    }

    SessionStats {
        top_artists: artists.top(TOP_N),
        top_genres: genres.top(TOP_N),
        completion_rate: completion_rate(completed, records.len()),
    }
}

/// `completed / total` as a percentage, rounded half up. Zero when `total` is zero.
pub fn completion_rate(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let completed = completed.min(total);
    ((completed * 200 + total) / (total * 2)) as u8
}
