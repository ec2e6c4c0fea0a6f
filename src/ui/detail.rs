use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Cell, Gauge, Paragraph, Row, Table},
    Frame,
};

use crate::{
    app::App,
    listen::TrackHistory,
    overview::SessionDetail,
    session_stats::{RankedEntry, SessionStats},
    ui::{completion_color, footer, header_style, scroll_offset, selected_style, MARGIN},
    util::{format_local, format_session_duration, format_track_duration},
};

const KEYS: &str = "(↑/↓) select  (o) open in browser  (b/backspace) back  (q/esc) quit";

/// Pure presenter for one played track
pub fn present_track_row(position: usize, track: &TrackHistory) -> Row<'static> {
    let t = &track.track;
    let completed = if t.listened_completely {
        Cell::from("yes").style(Style::default().fg(Color::Green))
    } else {
        Cell::from("no").style(Style::default().add_modifier(Modifier::DIM))
    };

    Row::new(vec![
        Cell::from((position + 1).to_string()),
        Cell::from(t.track_name.clone()).style(Style::default().add_modifier(Modifier::BOLD)),
        Cell::from(t.artist_name.clone()),
        Cell::from(t.album_name.clone()),
        Cell::from(format_local(&t.start_time, "%H:%M:%S")),
        Cell::from(format_track_duration(t.listening_duration_seconds)),
        completed,
    ])
}

fn session_summary(detail: &SessionDetail) -> Line<'static> {
    let session = &detail.session;
    let mut text = format!(
        "{}  from {}",
        format_local(&session.start_time, "%d %B %Y"),
        format_local(&session.start_time, "%H:%M"),
    );
    if let Some(end) = &session.end_time {
        text.push_str(&format!(" to {}", format_local(end, "%H:%M")));
    }
    text.push_str(&format!(
        "  ·  {}  ·  {} tracks",
        format_session_duration(session.duration_seconds),
        detail.tracks.len()
    ));
    if session.is_active {
        text.push_str("  ·  ACTIVE");
    }
    Line::from(text)
}

fn ranking_lines(title: &str, entries: &[RankedEntry]) -> Vec<Line<'static>> {
    let mut lines = vec![Line::styled(title.to_string(), header_style())];
    if entries.is_empty() {
        lines.push(Line::from("  —"));
    }
    lines.extend(
        entries
            .iter()
            .enumerate()
            .map(|(i, e)| Line::from(format!("  {}. {} ({})", i + 1, e.name, e.count))),
    );
    lines
}

fn render_stats_panel(stats: &SessionStats, f: &mut Frame, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("Completion"))
        .gauge_style(Style::default().fg(completion_color(stats.completion_rate)))
        .percent(u16::from(stats.completion_rate))
        .label(format!("{}%", stats.completion_rate));
    f.render_widget(gauge, chunks[0]);

    let mut lines = ranking_lines("Top artists", &stats.top_artists);
    lines.push(Line::from(""));
    lines.extend(ranking_lines("Top genres", &stats.top_genres));

    let rankings =
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Statistics"));
    f.render_widget(rankings, chunks[1]);
}

/// Render the detail screen of the opened session
pub fn render_session_detail(app: &App, f: &mut Frame) {
    let Some(detail) = app.detail.as_ref() else {
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(MARGIN)
        .constraints([
            Constraint::Length(4), // Session header
            Constraint::Min(6),    // Tracks + stats
            Constraint::Length(2), // Instructions
        ])
        .split(f.area());

    let header = Paragraph::new(session_summary(detail))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Session #{}", detail.session.id)),
        )
        .style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center);
    f.render_widget(header, chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
        .split(chunks[1]);

    if detail.tracks.is_empty() {
        let no_data = Paragraph::new("No tracks were played in this session.")
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::Gray));
        f.render_widget(no_data, body[0]);
    } else {
        let table_height = body[0].height.saturating_sub(3) as usize; // borders + header
        let offset = scroll_offset(app.selected_track, table_height);

        let header = Row::new(vec![
            Cell::from("#"),
            Cell::from("Title"),
            Cell::from("Artist"),
            Cell::from("Album"),
            Cell::from("Played at"),
            Cell::from("Listened"),
            Cell::from("Full"),
        ])
        .style(header_style());

        let rows: Vec<Row> = detail
            .tracks
            .iter()
            .enumerate()
            .skip(offset)
            .take(table_height)
            .map(|(idx, track)| {
                let row = present_track_row(idx, track);
                if idx == app.selected_track {
                    row.style(selected_style())
                } else {
                    row
                }
            })
            .collect();

        let widths = [
            Constraint::Length(4),  // #
            Constraint::Min(14),    // Title
            Constraint::Min(12),    // Artist
            Constraint::Min(12),    // Album
            Constraint::Length(9),  // Played at
            Constraint::Length(8),  // Listened
            Constraint::Length(4),  // Full
        ];

        let table = Table::new(rows, widths)
            .header(header)
            .block(Block::default().borders(Borders::ALL).title("Tracks"))
            .column_spacing(1);
        f.render_widget(table, body[0]);
    }

    render_stats_panel(&detail.stats, f, body[1]);
    f.render_widget(footer(app, KEYS), chunks[2]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::{key, seeded_db};
    use crate::history::tests::session;
    use crate::history::HistoryDb;
    use crate::overview::{session_detail, session_overviews};
    use crate::ui::tests::render;
    use crossterm::event::KeyCode;

    fn detail_app(id: i64) -> App {
        let db = seeded_db();
        let mut app = App::new(session_overviews(&db, 3).unwrap());
        app.show_detail(session_detail(&db, id).unwrap());
        app
    }

    #[test]
    fn test_detail_screen_shows_tracks_and_stats() {
        let content = render(&detail_app(1), 140, 30);

        assert!(content.contains("Session #1"));
        assert!(content.contains("Song at 1"));
        assert!(content.contains("Song at 2"));
        assert!(content.contains("2 tracks"));
        assert!(content.contains("50%"));
        assert!(content.contains("1. Khruangbin (2)"));
        assert!(content.contains("1. Psych (2)"));
        assert!(content.contains("2. Funk (1)"));
    }

    #[test]
    fn test_listened_duration_column() {
        let content = render(&detail_app(2), 140, 30);
        assert!(content.contains("3:20"));
        assert!(content.contains("100%"));
    }

    #[test]
    fn test_empty_session_detail() {
        let db = HistoryDb::open_in_memory().unwrap();
        db.insert_session(&session(5, 0)).unwrap();
        let mut app = App::new(Vec::new());
        app.show_detail(session_detail(&db, 5).unwrap());

        let content = render(&app, 120, 24);
        assert!(content.contains("No tracks were played in this session."));
        assert!(content.contains("0%"));
    }

    #[test]
    fn test_missing_link_sets_status() {
        let mut app = detail_app(1);
        if let Some(detail) = app.detail.as_mut() {
            detail.tracks[0].track.spotify_url.clear();
        }
        app.on_key(key(KeyCode::Char('o')));

        let content = render(&app, 140, 30);
        assert!(content.contains("no link for this track"));
    }
}
