//! CSV import of exported `listening_sessions` and `tracks_history` tables.
//!
//! Columns are matched by header name. Timestamps are RFC 3339, the `genres`
//! column holds `;`-separated tags and an empty cell means "no genres".

use log::info;
use serde::Deserialize;
use std::io::Read;

use crate::error::Result;
use crate::history::{parse_timestamp, HistoryDb};
use crate::listen::{ListeningSession, NewTrack};

const GENRE_SEPARATOR: char = ';';

#[derive(Debug, Deserialize)]
struct SessionRow {
    id: i64,
    start_time: String,
    end_time: Option<String>,
    duration_seconds: Option<i64>,
    is_active: bool,
}

#[derive(Debug, Deserialize)]
struct TrackRow {
    session_id: i64,
    track_id: String,
    track_name: String,
    artist_id: String,
    artist_name: String,
    album_id: String,
    album_name: String,
    start_time: String,
    duration_ms: i64,
    listening_duration_seconds: i64,
    listened_completely: bool,
    spotify_url: String,
    #[serde(default)]
    track_start_position: Option<i64>,
    cover_image_url: String,
    #[serde(default)]
    genres: Option<String>,
}

impl TryFrom<SessionRow> for ListeningSession {
    type Error = crate::error::Error;

    fn try_from(row: SessionRow) -> Result<Self> {
        let end_time = match row.end_time.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => Some(parse_timestamp(text)?),
            _ => None,
        };
        Ok(ListeningSession {
            id: row.id,
            start_time: parse_timestamp(row.start_time.trim())?,
            end_time,
            duration_seconds: row.duration_seconds,
            is_active: row.is_active,
        })
    }
}

impl TryFrom<TrackRow> for NewTrack {
    type Error = crate::error::Error;

    fn try_from(row: TrackRow) -> Result<Self> {
        Ok(NewTrack {
            session_id: row.session_id,
            track_id: row.track_id,
            track_name: row.track_name,
            artist_id: row.artist_id,
            artist_name: row.artist_name,
            album_id: row.album_id,
            album_name: row.album_name,
            start_time: parse_timestamp(row.start_time.trim())?,
            duration_ms: row.duration_ms,
            listening_duration_seconds: row.listening_duration_seconds,
            listened_completely: row.listened_completely,
            spotify_url: row.spotify_url,
            track_start_position: row.track_start_position.unwrap_or(0),
            cover_image_url: row.cover_image_url,
            genres: row.genres.as_deref().and_then(split_genres),
        })
    }
}

/// `"Pop; Rock"` → `["Pop", "Rock"]`; blank cells carry no genres
fn split_genres(cell: &str) -> Option<Vec<String>> {
    if cell.trim().is_empty() {
        return None;
    }
    Some(
        cell.split(GENRE_SEPARATOR)
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .map(str::to_string)
            .collect(),
    )
}

/// Import sessions in a single transaction, replacing any stored session with
/// the same id; nothing is stored if any row is invalid
pub fn import_sessions<R: Read>(db: &mut HistoryDb, reader: R) -> Result<usize> {
    let mut rdr = csv::Reader::from_reader(reader);
    let sessions = rdr
        .deserialize::<SessionRow>()
        .map(|row| ListeningSession::try_from(row?))
        .collect::<Result<Vec<_>>>()?;
    db.insert_sessions_batch(&sessions)?;
    info!("imported {} sessions", sessions.len());
    Ok(sessions.len())
}

/// Import track listens in a single transaction; nothing is stored if any row is invalid.
///
/// Listens already in the store are updated in place, so importing the same
/// export twice leaves the statistics unchanged.
pub fn import_tracks<R: Read>(db: &mut HistoryDb, reader: R) -> Result<usize> {
    let mut rdr = csv::Reader::from_reader(reader);
    let tracks = rdr
        .deserialize::<TrackRow>()
        .map(|row| NewTrack::try_from(row?))
        .collect::<Result<Vec<_>>>()?;
    db.record_tracks_batch(&tracks)?;
    info!("imported {} tracks", tracks.len());
    Ok(tracks.len())
}
