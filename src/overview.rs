use log::{debug, warn};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::history::HistoryDb;
use crate::listen::{ListeningSession, TrackHistory};
use crate::session_stats::{compute_stats, SessionStats};

/// A session as shown in the session listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionOverview {
    #[serde(flatten)]
    pub session: ListeningSession,
    pub track_count: usize,
    /// First few tracks of the session
    pub tracks: Vec<TrackHistory>,
    pub stats: SessionStats,
}

/// A single session with every track it contains
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionDetail {
    #[serde(flatten)]
    pub session: ListeningSession,
    pub tracks: Vec<TrackHistory>,
    pub stats: SessionStats,
}

/// Build the listing of all sessions, newest first.
///
/// Per-session data that cannot be loaded (track count, preview or
/// statistics) is logged and reported as empty instead of failing the whole
/// listing. Only a failure to list the sessions themselves is an error.
pub fn session_overviews(db: &HistoryDb, preview: usize) -> Result<Vec<SessionOverview>> {
    let sessions = db.sessions()?;
    debug!("building overviews for {} sessions", sessions.len());

    let overviews = sessions
        .into_iter()
        .map(|session| {
            let id = session.id;
            let track_count = or_default(db.session_track_count(id), "track count", id);
            let tracks = or_default(db.session_track_preview(id, preview), "track preview", id);
            let stats = or_default(
                db.session_listen_records(id).map(|records| compute_stats(&records)),
                "listens",
                id,
            );

            SessionOverview {
                session,
                track_count,
                tracks,
                stats,
            }
        })
        .collect();
    Ok(overviews)
}

fn or_default<T: Default>(result: Result<T>, what: &str, session_id: i64) -> T {
    result.unwrap_or_else(|e| {
        warn!("could not load {what} of session {session_id}: {e}");
        T::default()
    })
}

pub fn session_detail(db: &HistoryDb, id: i64) -> Result<SessionDetail> {
    let session = db.session(id)?.ok_or(Error::SessionNotFound(id))?;
    let tracks = db.session_tracks(id)?;
    let stats = compute_stats(&tracks);

    Ok(SessionDetail {
        session,
        tracks,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::tests::{session, track};
    use crate::session_stats::RankedEntry;
    use assert_matches::assert_matches;

    fn seeded_db() -> HistoryDb {
        let mut db = HistoryDb::open_in_memory().unwrap();
        db.insert_session(&session(1, 0)).unwrap();
        db.insert_session(&session(2, 60)).unwrap();
        db.record_tracks_batch(&[
            track(1, 1, "Björk", Some(vec!["Pop", "Electronic"]), true),
            track(1, 2, "Björk", Some(vec!["Pop"]), true),
            track(1, 3, "Portishead", None, false),
            track(1, 4, "Massive Attack", Some(vec!["Trip Hop"]), true),
            track(2, 61, "Nujabes", Some(vec!["Jazz Hop"]), false),
        ])
        .unwrap();
        db
    }

    #[test]
    fn test_overviews_newest_first_with_preview() {
        let db = seeded_db();
        let overviews = session_overviews(&db, 3).unwrap();

        assert_eq!(overviews.len(), 2);
        assert_eq!(overviews[0].session.id, 2);
        assert_eq!(overviews[0].track_count, 1);
        assert_eq!(overviews[0].stats.completion_rate, 0);

        let first = &overviews[1];
        assert_eq!(first.track_count, 4);
        assert_eq!(first.tracks.len(), 3);
        assert_eq!(first.stats.completion_rate, 75);
        assert_eq!(
            first.stats.top_artists[0],
            RankedEntry {
                name: "Björk".to_string(),
                count: 2
            }
        );
        assert_eq!(first.stats.top_genres[0].name, "Pop");
        assert_eq!(first.stats.top_genres[0].count, 2);
    }

    #[test]
    fn test_overview_of_empty_session() {
        let db = HistoryDb::open_in_memory().unwrap();
        db.insert_session(&session(9, 0)).unwrap();

        let overviews = session_overviews(&db, 3).unwrap();
        assert_eq!(overviews[0].track_count, 0);
        assert!(overviews[0].tracks.is_empty());
        assert_eq!(overviews[0].stats, SessionStats::default());
    }

    #[test]
    fn test_unreadable_tracks_do_not_fail_listing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.db");
        let mut db = HistoryDb::open(&path).unwrap();
        db.insert_session(&session(1, 0)).unwrap();
        db.insert_session(&session(2, 60)).unwrap();
        db.record_tracks_batch(&[
            track(1, 1, "Björk", None, true),
            track(2, 61, "Nujabes", None, true),
        ])
        .unwrap();

        rusqlite::Connection::open(&path)
            .unwrap()
            .execute(
                "UPDATE tracks_history SET start_time = 'garbage', genres = '{' WHERE session_id = 2",
                [],
            )
            .unwrap();

        let overviews = session_overviews(&db, 3).unwrap();
        assert_eq!(overviews.len(), 2);

        let broken = &overviews[0];
        assert_eq!(broken.session.id, 2);
        assert_eq!(broken.track_count, 1);
        assert!(broken.tracks.is_empty());
        assert_eq!(broken.stats, SessionStats::default());

        assert_eq!(overviews[1].tracks.len(), 1);
        assert_eq!(overviews[1].stats.completion_rate, 100);
    }

    #[test]
    fn test_detail_matches_overview_stats() {
        let db = seeded_db();
        let detail = session_detail(&db, 1).unwrap();
        let overview = session_overviews(&db, 3).unwrap().remove(1);

        assert_eq!(detail.tracks.len(), 4);
        assert_eq!(detail.stats, overview.stats);
    }

    #[test]
    fn test_detail_unknown_session() {
        let db = seeded_db();
        assert_matches!(session_detail(&db, 42), Err(Error::SessionNotFound(42)));
    }

    #[test]
    fn test_overview_json_shape() {
        let db = seeded_db();
        let overviews = session_overviews(&db, 1).unwrap();
        let json = serde_json::to_value(&overviews[1]).unwrap();

        assert_eq!(json["id"], 1);
        assert_eq!(json["track_count"], 4);
        assert_eq!(json["stats"]["completionRate"], 75);
        assert_eq!(json["tracks"][0]["artist_name"], "Björk");
    }
}
