use chrono::{DateTime, Utc};
use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};

use crate::app_dirs::AppDirs;
use crate::error::{Error, Result};
use crate::listen::{ListeningSession, NewTrack, TrackHistory, TrackListenRecord};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS listening_sessions (
    id INTEGER PRIMARY KEY,
    start_time TEXT NOT NULL,
    end_time TEXT,
    duration_seconds INTEGER,
    is_active BOOLEAN NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS tracks_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id INTEGER NOT NULL,
    track_id TEXT NOT NULL,
    track_name TEXT NOT NULL,
    artist_id TEXT NOT NULL,
    artist_name TEXT NOT NULL,
    album_id TEXT NOT NULL,
    album_name TEXT NOT NULL,
    start_time TEXT NOT NULL,
    duration_ms INTEGER NOT NULL,
    listening_duration_seconds INTEGER NOT NULL,
    listened_completely BOOLEAN NOT NULL,
    spotify_url TEXT NOT NULL,
    track_start_position INTEGER NOT NULL DEFAULT 0,
    cover_image_url TEXT NOT NULL,
    genres TEXT
);

CREATE INDEX IF NOT EXISTS idx_tracks_history_session ON tracks_history(session_id);
CREATE INDEX IF NOT EXISTS idx_tracks_history_start_time ON tracks_history(start_time);
CREATE UNIQUE INDEX IF NOT EXISTS idx_tracks_history_listen
    ON tracks_history(session_id, track_id, start_time);
"#;

const INSERT_TRACK: &str = r#"
INSERT INTO tracks_history
(session_id, track_id, track_name, artist_id, artist_name, album_id, album_name,
 start_time, duration_ms, listening_duration_seconds, listened_completely,
 spotify_url, track_start_position, cover_image_url, genres)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
ON CONFLICT (session_id, track_id, start_time) DO UPDATE SET
    track_name = excluded.track_name,
    artist_id = excluded.artist_id,
    artist_name = excluded.artist_name,
    album_id = excluded.album_id,
    album_name = excluded.album_name,
    duration_ms = excluded.duration_ms,
    listening_duration_seconds = excluded.listening_duration_seconds,
    listened_completely = excluded.listened_completely,
    spotify_url = excluded.spotify_url,
    track_start_position = excluded.track_start_position,
    cover_image_url = excluded.cover_image_url,
    genres = excluded.genres
RETURNING id
"#;

const UPSERT_SESSION: &str = r#"
INSERT OR REPLACE INTO listening_sessions
(id, start_time, end_time, duration_seconds, is_active)
VALUES (?1, ?2, ?3, ?4, ?5)
"#;

const TRACK_COLUMNS: &str = "id, session_id, track_id, track_name, artist_id, artist_name, \
     album_id, album_name, start_time, duration_ms, listening_duration_seconds, \
     listened_completely, spotify_url, track_start_position, cover_image_url, genres";

/// Local store for listening sessions and the tracks played in them.
///
/// The handle is created explicitly, passed by reference to whoever needs it
/// and closed with [`HistoryDb::close`].
#[derive(Debug)]
pub struct HistoryDb {
    conn: Connection,
}

impl HistoryDb {
    /// Open (or create) the database at `path` and make sure the schema exists
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        info!("opening listening history at {}", path.display());
        Self::with_connection(Connection::open(path)?)
    }

    /// Open the database at the default state location
    pub fn open_default() -> Result<Self> {
        let path = AppDirs::db_path().unwrap_or_else(|| PathBuf::from("rewind_history.db"));
        Self::open(path)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(HistoryDb { conn })
    }

    /// Close the underlying connection, reporting any error sqlite raises while doing so
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| Error::Db(e))
    }

    pub fn insert_session(&self, session: &ListeningSession) -> Result<()> {
        upsert_session(&self.conn, session)?;
        debug!("stored session {}", session.id);
        Ok(())
    }

    /// Store several sessions in a single transaction; none are kept if one fails
    pub fn insert_sessions_batch(&mut self, sessions: &[ListeningSession]) -> Result<()> {
        let tx = self.conn.transaction()?;
        for session in sessions {
            upsert_session(&tx, session)?;
        }
        tx.commit()?;
        debug!("stored {} sessions", sessions.len());
        Ok(())
    }

    /// Record a single track listen, returning its row id.
    ///
    /// A listen is identified by session, track and start time. Recording the
    /// same listen again updates the stored row instead of adding another.
    pub fn record_track(&self, track: &NewTrack) -> Result<i64> {
        insert_track(&self.conn, track)
    }

    /// Record multiple track listens in a single transaction
    pub fn record_tracks_batch(&mut self, tracks: &[NewTrack]) -> Result<()> {
        let tx = self.conn.transaction()?;
        for track in tracks {
            insert_track(&tx, track)?;
        }
        tx.commit()?;
        debug!("stored {} tracks", tracks.len());
        Ok(())
    }

    /// All sessions, most recent first
    pub fn sessions(&self) -> Result<Vec<ListeningSession>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, start_time, end_time, duration_seconds, is_active
            FROM listening_sessions
            ORDER BY start_time DESC
            "#,
        )?;
        let sessions = stmt
            .query_map([], session_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(sessions)
    }

    pub fn session(&self, id: i64) -> Result<Option<ListeningSession>> {
        let session = self
            .conn
            .query_row(
                r#"
                SELECT id, start_time, end_time, duration_seconds, is_active
                FROM listening_sessions
                WHERE id = ?1
                "#,
                [id],
                session_from_row,
            )
            .optional()?;
        Ok(session)
    }

    /// Every track of a session in the order it was played
    pub fn session_tracks(&self, session_id: i64) -> Result<Vec<TrackHistory>> {
        self.query_tracks(
            &format!(
                "SELECT {TRACK_COLUMNS} FROM tracks_history \
                 WHERE session_id = ?1 ORDER BY start_time ASC, id ASC"
            ),
            params![session_id],
        )
    }

    /// The first `limit` tracks of a session, used as a preview in session listings
    pub fn session_track_preview(&self, session_id: i64, limit: usize) -> Result<Vec<TrackHistory>> {
        self.query_tracks(
            &format!(
                "SELECT {TRACK_COLUMNS} FROM tracks_history \
                 WHERE session_id = ?1 ORDER BY start_time ASC, id ASC LIMIT ?2"
            ),
            params![session_id, limit as i64],
        )
    }

    /// Listens across all sessions, most recent first
    pub fn recent_tracks(&self, limit: usize) -> Result<Vec<TrackHistory>> {
        self.query_tracks(
            &format!(
                "SELECT {TRACK_COLUMNS} FROM tracks_history \
                 ORDER BY start_time DESC, id DESC LIMIT ?1"
            ),
            params![limit as i64],
        )
    }

    pub fn session_track_count(&self, session_id: i64) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM tracks_history WHERE session_id = ?1",
            [session_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Just the columns the session aggregator needs
    pub fn session_listen_records(&self, session_id: i64) -> Result<Vec<TrackListenRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT artist_name, genres, listened_completely
            FROM tracks_history
            WHERE session_id = ?1
            ORDER BY start_time ASC, id ASC
            "#,
        )?;
        let records = stmt
            .query_map([session_id], |row| {
                Ok(TrackListenRecord {
                    artist_name: row.get(0)?,
                    genres: genres_from_column(row, 1)?,
                    listened_completely: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    /// Clear all sessions and tracks
    pub fn clear_all(&self) -> Result<()> {
        self.conn
            .execute_batch("DELETE FROM tracks_history; DELETE FROM listening_sessions;")?;
        Ok(())
    }

    fn query_tracks(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<TrackHistory>> {
        let mut stmt = self.conn.prepare(sql)?;
        let tracks = stmt
            .query_map(params, track_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tracks)
    }
}

fn upsert_session(conn: &Connection, session: &ListeningSession) -> Result<()> {
    conn.execute(
        UPSERT_SESSION,
        params![
            session.id,
            session.start_time.to_rfc3339(),
            session.end_time.map(|t| t.to_rfc3339()),
            session.duration_seconds,
            session.is_active,
        ],
    )?;
    Ok(())
}

fn insert_track(conn: &Connection, track: &NewTrack) -> Result<i64> {
    let genres = track
        .genres
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;
    let id: i64 = conn.query_row(
        INSERT_TRACK,
        params![
            track.session_id,
            track.track_id,
            track.track_name,
            track.artist_id,
            track.artist_name,
            track.album_id,
            track.album_name,
            track.start_time.to_rfc3339(),
            track.duration_ms,
            track.listening_duration_seconds,
            track.listened_completely,
            track.spotify_url,
            track.track_start_position,
            track.cover_image_url,
            genres,
        ],
        |row| row.get(0),
    )?;
    Ok(id)
}

fn timestamp_from_column(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    parse_timestamp(&text).map_err(|_| {
        rusqlite::Error::InvalidColumnType(idx, "timestamp".to_string(), rusqlite::types::Type::Text)
    })
}

fn genres_from_column(row: &Row, idx: usize) -> rusqlite::Result<Option<Vec<String>>> {
    let text: Option<String> = row.get(idx)?;
    text.map(|t| {
        serde_json::from_str(&t).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
    })
    .transpose()
}

fn session_from_row(row: &Row) -> rusqlite::Result<ListeningSession> {
    let end_time = match row.get::<_, Option<String>>(2)? {
        Some(_) => Some(timestamp_from_column(row, 2)?),
        None => None,
    };
    Ok(ListeningSession {
        id: row.get(0)?,
        start_time: timestamp_from_column(row, 1)?,
        end_time,
        duration_seconds: row.get(3)?,
        is_active: row.get(4)?,
    })
}

fn track_from_row(row: &Row) -> rusqlite::Result<TrackHistory> {
    Ok(TrackHistory {
        id: row.get(0)?,
        track: NewTrack {
            session_id: row.get(1)?,
            track_id: row.get(2)?,
            track_name: row.get(3)?,
            artist_id: row.get(4)?,
            artist_name: row.get(5)?,
            album_id: row.get(6)?,
            album_name: row.get(7)?,
            start_time: timestamp_from_column(row, 8)?,
            duration_ms: row.get(9)?,
            listening_duration_seconds: row.get(10)?,
            listened_completely: row.get(11)?,
            spotify_url: row.get(12)?,
            track_start_position: row.get(13)?,
            cover_image_url: row.get(14)?,
            genres: genres_from_column(row, 15)?,
        },
    })
}

/// Parse an RFC 3339 timestamp into UTC
pub fn parse_timestamp(text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| Error::InvalidTimestamp(text.to_string()))
}
