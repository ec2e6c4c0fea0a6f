pub mod detail;
pub mod screen;
pub mod sessions;

use ratatui::{
    layout::Alignment,
    style::{Color, Modifier, Style},
    widgets::{Paragraph, Wrap},
    Frame,
};

use crate::app::App;
use crate::session_stats::RankedEntry;

const MARGIN: u16 = 1;

/// Draw whichever screen the app is on
pub fn ui(app: &App, f: &mut Frame) {
    screen::current_screen(&app.state).render(app, f);
}

/// Green for mostly finished sessions, red for mostly skipped ones
pub fn completion_color(rate: u8) -> Color {
    if rate >= 80 {
        Color::Green
    } else if rate >= 50 {
        Color::Yellow
    } else {
        Color::Red
    }
}

fn header_style() -> Style {
    Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD)
}

fn selected_style() -> Style {
    Style::default()
        .bg(Color::DarkGray)
        .add_modifier(Modifier::BOLD)
}

/// `name (count)`, or a dash when there is nothing to rank
fn ranked_label(entry: Option<&RankedEntry>) -> String {
    entry
        .map(|e| format!("{} ({})", e.name, e.count))
        .unwrap_or_else(|| "—".to_string())
}

/// First row to draw so that `selected` stays inside a window of `visible` rows
fn scroll_offset(selected: usize, visible: usize) -> usize {
    selected.saturating_sub(visible.saturating_sub(1))
}

fn footer(app: &App, keys: &str) -> Paragraph<'static> {
    let text = match &app.status {
        Some(status) => format!("{status}  ·  {keys}"),
        None => keys.to_string(),
    };
    Paragraph::new(text)
        .alignment(Alignment::Center)
        .style(Style::default().add_modifier(Modifier::DIM))
        .wrap(Wrap { trim: true })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use ratatui::{backend::TestBackend, Terminal};

    pub(crate) fn render(app: &App, width: u16, height: u16) -> String {
        let backend = TestBackend::new(width, height);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| ui(app, f)).unwrap();

        let buffer = terminal.backend().buffer();
        buffer.content.iter().map(|c| c.symbol()).collect()
    }

    #[test]
    fn test_completion_color_thresholds() {
        assert_eq!(completion_color(100), Color::Green);
        assert_eq!(completion_color(80), Color::Green);
        assert_eq!(completion_color(79), Color::Yellow);
        assert_eq!(completion_color(50), Color::Yellow);
        assert_eq!(completion_color(0), Color::Red);
    }

    #[test]
    fn test_ranked_label() {
        let entry = RankedEntry {
            name: "Sade".to_string(),
            count: 4,
        };
        assert_eq!(ranked_label(Some(&entry)), "Sade (4)");
        assert_eq!(ranked_label(None), "—");
    }

    #[test]
    fn test_scroll_offset_keeps_selection_visible() {
        assert_eq!(scroll_offset(0, 10), 0);
        assert_eq!(scroll_offset(9, 10), 0);
        assert_eq!(scroll_offset(10, 10), 1);
        assert_eq!(scroll_offset(5, 0), 5);
    }

    #[test]
    fn test_tiny_terminal_does_not_panic() {
        let app = App::new(Vec::new());
        let _ = render(&app, 10, 4);
    }
}
