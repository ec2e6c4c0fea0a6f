use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};

use crate::{
    app::App,
    overview::SessionOverview,
    ui::{completion_color, footer, header_style, ranked_label, scroll_offset, selected_style, MARGIN},
    util::{format_local, format_session_duration},
};

const KEYS: &str = "(↑/↓) select  (enter) open  (r) reload  (q/esc) quit";

/// Pure presenter for one row of the session listing
pub fn present_session_row(overview: &SessionOverview) -> Row<'static> {
    let session = &overview.session;
    let stats = &overview.stats;

    let id_style = Style::default().add_modifier(Modifier::BOLD);
    let id_cell = if session.is_active {
        Cell::from(format!("#{} ●", session.id)).style(id_style.fg(Color::Green))
    } else {
        Cell::from(format!("#{}", session.id)).style(id_style)
    };

    Row::new(vec![
        id_cell,
        Cell::from(format_local(&session.start_time, "%d %b %Y %H:%M")),
        Cell::from(format_session_duration(session.duration_seconds)),
        Cell::from(overview.track_count.to_string()),
        Cell::from(ranked_label(stats.top_artist())),
        Cell::from(ranked_label(stats.top_genre())),
        Cell::from(format!("{}%", stats.completion_rate))
            .style(Style::default().fg(completion_color(stats.completion_rate))),
    ])
}

/// Preview lines for the selected session: its opening tracks and rankings
fn preview_lines(overview: &SessionOverview) -> Vec<Line<'static>> {
    let mut lines: Vec<Line> = overview
        .tracks
        .iter()
        .map(|t| {
            Line::from(vec![
                Span::styled(
                    t.track.track_name.clone(),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::raw(format!("  {} · {}", t.track.artist_name, t.track.album_name)),
            ])
        })
        .collect();

    let artists = overview
        .stats
        .top_artists
        .iter()
        .map(|e| format!("{} ({})", e.name, e.count))
        .collect::<Vec<_>>()
        .join(", ");
    let genres = overview
        .stats
        .top_genres
        .iter()
        .map(|e| format!("{} ({})", e.name, e.count))
        .collect::<Vec<_>>()
        .join(", ");

    lines.push(Line::from(format!("Top artists: {artists}")));
    lines.push(Line::from(format!("Top genres: {genres}")));
    lines
}

/// Render the session listing screen
pub fn render_sessions(app: &App, f: &mut Frame) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(MARGIN)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Min(5),    // Sessions table
            Constraint::Length(7), // Preview of selected session
            Constraint::Length(2), // Instructions
        ])
        .split(f.area());

    let title = Paragraph::new(format!("Listening sessions ({})", app.overviews.len()))
        .block(Block::default().borders(Borders::ALL).title("rewind"))
        .style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center);
    f.render_widget(title, chunks[0]);

    if app.overviews.is_empty() {
        let no_data = Paragraph::new("No listening sessions yet. Import some with `rewind import`.")
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::Gray));
        f.render_widget(no_data, chunks[1]);
    } else {
        let table_height = chunks[1].height.saturating_sub(3) as usize; // borders + header
        let offset = scroll_offset(app.selected, table_height);

        let header = Row::new(vec![
            Cell::from("Session"),
            Cell::from("Started"),
            Cell::from("Duration"),
            Cell::from("Tracks"),
            Cell::from("Top artist"),
            Cell::from("Top genre"),
            Cell::from("Completed"),
        ])
        .style(header_style());

        let rows: Vec<Row> = app
            .overviews
            .iter()
            .enumerate()
            .skip(offset)
            .take(table_height)
            .map(|(idx, overview)| {
                let row = present_session_row(overview);
                if idx == app.selected {
                    row.style(selected_style())
                } else {
                    row
                }
            })
            .collect();

        let widths = [
            Constraint::Length(9),  // Session
            Constraint::Length(18), // Started
            Constraint::Length(12), // Duration
            Constraint::Length(7),  // Tracks
            Constraint::Min(14),    // Top artist
            Constraint::Min(12),    // Top genre
            Constraint::Length(10), // Completed
        ];

        let table = Table::new(rows, widths)
            .header(header)
            .block(Block::default().borders(Borders::ALL).title("Sessions"))
            .column_spacing(1);
        f.render_widget(table, chunks[1]);
    }

    if let Some(overview) = app.selected_overview() {
        let preview = Paragraph::new(preview_lines(overview)).block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Session #{}", overview.session.id)),
        );
        f.render_widget(preview, chunks[2]);
    }

    f.render_widget(footer(app, KEYS), chunks[3]);
}
