//! Non-interactive output of the `sessions`, `session` and `history` commands.

use serde::Serialize;
use std::io::{self, Write};

use crate::config::OutputFormat;
use crate::listen::TrackHistory;
use crate::overview::{SessionDetail, SessionOverview};
use crate::session_stats::{RankedEntry, SessionStats};
use crate::util::{format_local, format_session_duration, format_track_duration};

const DATE_TIME: &str = "%d %b %Y %H:%M";

fn write_json<W: Write, T: Serialize + ?Sized>(out: &mut W, value: &T) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)
}

fn ranking(entries: &[RankedEntry]) -> String {
    if entries.is_empty() {
        return "—".to_string();
    }
    entries
        .iter()
        .map(|e| format!("{} ({})", e.name, e.count))
        .collect::<Vec<_>>()
        .join(", ")
}

fn write_stats<W: Write>(out: &mut W, stats: &SessionStats) -> io::Result<()> {
    writeln!(out, "    top artists: {}", ranking(&stats.top_artists))?;
    writeln!(out, "    top genres:  {}", ranking(&stats.top_genres))?;
    writeln!(out, "    completed:   {}%", stats.completion_rate)
}

fn write_track<W: Write>(out: &mut W, position: usize, track: &TrackHistory) -> io::Result<()> {
    let t = &track.track;
    writeln!(
        out,
        "{:>4}  {}  {} — {} [{}]  {}{}",
        position,
        format_local(&t.start_time, "%H:%M:%S"),
        t.track_name,
        t.artist_name,
        t.album_name,
        format_track_duration(t.listening_duration_seconds),
        if t.listened_completely { "" } else { "  (skipped)" },
    )
}

pub fn write_sessions<W: Write>(
    out: &mut W,
    overviews: &[SessionOverview],
    format: OutputFormat,
) -> io::Result<()> {
    if format == OutputFormat::Json {
        return write_json(out, overviews);
    }
    if overviews.is_empty() {
        return writeln!(out, "no listening sessions");
    }

    for overview in overviews {
        let session = &overview.session;
        writeln!(
            out,
            "#{}  {}  {}  {} tracks{}",
            session.id,
            format_local(&session.start_time, DATE_TIME),
            format_session_duration(session.duration_seconds),
            overview.track_count,
            if session.is_active { "  ACTIVE" } else { "" },
        )?;
        for track in &overview.tracks {
            writeln!(out, "    · {} — {}", track.track.track_name, track.track.artist_name)?;
        }
        write_stats(out, &overview.stats)?;
    }
    Ok(())
}

pub fn write_session_detail<W: Write>(
    out: &mut W,
    detail: &SessionDetail,
    format: OutputFormat,
) -> io::Result<()> {
    if format == OutputFormat::Json {
        return write_json(out, detail);
    }

    let session = &detail.session;
    let end = session
        .end_time
        .map(|t| format!(" to {}", format_local(&t, "%H:%M")))
        .unwrap_or_default();
    writeln!(
        out,
        "Session #{}  {}{}  {}  {} tracks{}",
        session.id,
        format_local(&session.start_time, DATE_TIME),
        end,
        format_session_duration(session.duration_seconds),
        detail.tracks.len(),
        if session.is_active { "  ACTIVE" } else { "" },
    )?;
    for (idx, track) in detail.tracks.iter().enumerate() {
        write_track(out, idx + 1, track)?;
    }
    write_stats(out, &detail.stats)
}

pub fn write_history<W: Write>(
    out: &mut W,
    tracks: &[TrackHistory],
    format: OutputFormat,
) -> io::Result<()> {
    if format == OutputFormat::Json {
        return write_json(out, tracks);
    }
    if tracks.is_empty() {
        return writeln!(out, "no listening history");
    }
    for (idx, track) in tracks.iter().enumerate() {
        write_track(out, idx + 1, track)?;
    }
    Ok(())
}
