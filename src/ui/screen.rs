use ratatui::Frame;

use crate::{
    app::{App, AppState},
    ui::{detail::render_session_detail, sessions::render_sessions},
};

/// A UI Screen boundary: responsible for rendering one app state
pub trait Screen {
    fn render(&self, app: &App, f: &mut Frame);
}

/// Listing of every session with its headline stats
pub struct SessionsScreen;

impl Screen for SessionsScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        render_sessions(app, f);
    }
}

/// Tracks and full stats of one session
pub struct DetailScreen;

impl Screen for DetailScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        render_session_detail(app, f);
    }
}

/// Helper to construct the appropriate screen for the current state
pub fn current_screen(state: &AppState) -> Box<dyn Screen> {
    match state {
        AppState::Sessions => Box::new(SessionsScreen),
        AppState::Detail => Box::new(DetailScreen),
    }
}
