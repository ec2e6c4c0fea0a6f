use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Anything the session aggregator can count: one playback of one track.
pub trait ListenRecord {
    fn artist_name(&self) -> &str;
    /// Genre tags of the track, empty when the source had none.
    fn genres(&self) -> &[String];
    fn listened_completely(&self) -> bool;
}

/// Minimal projection of a track listen, as returned by
/// [`HistoryDb::session_listen_records`](crate::history::HistoryDb::session_listen_records).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackListenRecord {
    pub artist_name: String,
    #[serde(default)]
    pub genres: Option<Vec<String>>,
    pub listened_completely: bool,
}

impl TrackListenRecord {
    pub fn new(artist_name: impl Into<String>, listened_completely: bool) -> Self {
        Self {
            artist_name: artist_name.into(),
            genres: None,
            listened_completely,
        }
    }

    pub fn with_genres<I, S>(mut self, genres: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.genres = Some(genres.into_iter().map(Into::into).collect());
        self
    }
}

impl ListenRecord for TrackListenRecord {
    fn artist_name(&self) -> &str {
        &self.artist_name
    }

    fn genres(&self) -> &[String] {
        self.genres.as_deref().unwrap_or_default()
    }

    fn listened_completely(&self) -> bool {
        self.listened_completely
    }
}

/// A listening session as stored in `listening_sessions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListeningSession {
    pub id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    /// Unset while the session is still running.
    pub duration_seconds: Option<i64>,
    pub is_active: bool,
}

/// Track metadata for a listen that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTrack {
    pub session_id: i64,
    pub track_id: String,
    pub track_name: String,
    pub artist_id: String,
    pub artist_name: String,
    pub album_id: String,
    pub album_name: String,
    pub start_time: DateTime<Utc>,
    pub duration_ms: i64,
    pub listening_duration_seconds: i64,
    pub listened_completely: bool,
    pub spotify_url: String,
    pub track_start_position: i64,
    pub cover_image_url: String,
    pub genres: Option<Vec<String>>,
}

/// A stored row of `tracks_history`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackHistory {
    pub id: i64,
    #[serde(flatten)]
    pub track: NewTrack,
}

impl ListenRecord for TrackHistory {
    fn artist_name(&self) -> &str {
        &self.track.artist_name
    }

    fn genres(&self) -> &[String] {
        self.track.genres.as_deref().unwrap_or_default()
    }

    fn listened_completely(&self) -> bool {
        self.track.listened_completely
    }
}

impl From<&TrackHistory> for TrackListenRecord {
    fn from(t: &TrackHistory) -> Self {
        Self {
            artist_name: t.track.artist_name.clone(),
            genres: t.track.genres.clone(),
            listened_completely: t.track.listened_completely,
        }
    }
}
