use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::overview::{SessionDetail, SessionOverview};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Sessions,
    Detail,
}

/// What the event loop has to do after a key press
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    None,
    Quit,
    Reload,
    OpenSession(i64),
    OpenUrl(String),
}

/// State of the session browser. Data loading is left to the caller, which
/// reacts to the returned [`Action`].
#[derive(Debug)]
pub struct App {
    pub state: AppState,
    pub overviews: Vec<SessionOverview>,
    pub selected: usize,
    pub detail: Option<SessionDetail>,
    pub selected_track: usize,
    /// One-line message shown in the footer
    pub status: Option<String>,
}

impl App {
    pub fn new(overviews: Vec<SessionOverview>) -> Self {
        Self {
            state: AppState::Sessions,
            overviews,
            selected: 0,
            detail: None,
            selected_track: 0,
            status: None,
        }
    }

    pub fn selected_overview(&self) -> Option<&SessionOverview> {
        self.overviews.get(self.selected)
    }

    pub fn set_overviews(&mut self, overviews: Vec<SessionOverview>) {
        self.overviews = overviews;
        self.selected = self.selected.min(self.overviews.len().saturating_sub(1));
    }

    pub fn show_detail(&mut self, detail: SessionDetail) {
        self.detail = Some(detail);
        self.selected_track = 0;
        self.state = AppState::Detail;
    }

    pub fn back(&mut self) {
        self.state = AppState::Sessions;
        self.detail = None;
    }

    pub fn on_key(&mut self, key: KeyEvent) -> Action {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Action::Quit;
        }
        self.status = None;

        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => return Action::Quit,
            KeyCode::Up | KeyCode::Char('k') => self.move_selection(-1),
            KeyCode::Down | KeyCode::Char('j') => self.move_selection(1),
            KeyCode::PageUp => self.move_selection(-10),
            KeyCode::PageDown => self.move_selection(10),
            KeyCode::Home => self.move_selection(isize::MIN),
            KeyCode::End => self.move_selection(isize::MAX),
            _ => {}
        }

        match (self.state, key.code) {
            (AppState::Sessions, KeyCode::Enter) => self
                .selected_overview()
                .map(|o| Action::OpenSession(o.session.id))
                .unwrap_or(Action::None),
            (AppState::Sessions, KeyCode::Char('r')) => Action::Reload,
            (AppState::Detail, KeyCode::Char('b') | KeyCode::Backspace) => {
                self.back();
                Action::None
            }
            (AppState::Detail, KeyCode::Char('o')) => match self.selected_track_url() {
                Some(url) => Action::OpenUrl(url),
                None => {
                    self.status = Some("no link for this track".to_string());
                    Action::None
                }
            },
            _ => Action::None,
        }
    }

    fn selected_track_url(&self) -> Option<String> {
        self.detail
            .as_ref()
            .and_then(|d| d.tracks.get(self.selected_track))
            .map(|t| t.track.spotify_url.clone())
            .filter(|url| !url.is_empty())
    }

    fn move_selection(&mut self, delta: isize) {
        let (cursor, len) = match self.state {
            AppState::Sessions => (&mut self.selected, self.overviews.len()),
            AppState::Detail => (
                &mut self.selected_track,
                self.detail.as_ref().map_or(0, |d| d.tracks.len()),
            ),
        };
        if len == 0 {
            *cursor = 0;
            return;
        }
        let target = (*cursor as isize).saturating_add(delta);
        *cursor = target.clamp(0, len as isize - 1) as usize;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::history::tests::{session, track};
    use crate::history::HistoryDb;
    use crate::overview::{session_detail, session_overviews};

    pub(crate) fn seeded_db() -> HistoryDb {
        let mut db = HistoryDb::open_in_memory().unwrap();
        db.insert_session(&session(1, 0)).unwrap();
        db.insert_session(&session(2, 60)).unwrap();
        db.record_tracks_batch(&[
            track(1, 1, "Khruangbin", Some(vec!["Psych"]), true),
            track(1, 2, "Khruangbin", Some(vec!["Psych", "Funk"]), false),
            track(2, 61, "Bonobo", Some(vec!["Downtempo"]), true),
        ])
        .unwrap();
        db
    }

    pub(crate) fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn app() -> (HistoryDb, App) {
        let db = seeded_db();
        let app = App::new(session_overviews(&db, 3).unwrap());
        (db, app)
    }

    #[test]
    fn test_selection_is_clamped() {
        let (_db, mut app) = app();
        assert_eq!(app.on_key(key(KeyCode::Up)), Action::None);
        assert_eq!(app.selected, 0);

        app.on_key(key(KeyCode::Down));
        app.on_key(key(KeyCode::Down));
        assert_eq!(app.selected, 1);

        app.on_key(key(KeyCode::Home));
        assert_eq!(app.selected, 0);
        app.on_key(key(KeyCode::End));
        assert_eq!(app.selected, 1);
    }

    #[test]
    fn test_enter_opens_selected_session() {
        let (db, mut app) = app();
        app.on_key(key(KeyCode::Down));

        let action = app.on_key(key(KeyCode::Enter));
        assert_eq!(action, Action::OpenSession(1));

        app.show_detail(session_detail(&db, 1).unwrap());
        assert_eq!(app.state, AppState::Detail);
        assert_eq!(app.selected_track, 0);
    }

    #[test]
    fn test_detail_navigation_and_back() {
        let (db, mut app) = app();
        app.show_detail(session_detail(&db, 1).unwrap());

        app.on_key(key(KeyCode::Down));
        app.on_key(key(KeyCode::Down));
        assert_eq!(app.selected_track, 1);
        assert_eq!(app.selected, 0);

        match app.on_key(key(KeyCode::Char('o'))) {
            Action::OpenUrl(url) => assert!(url.starts_with("https://open.spotify.com/")),
            other => panic!("expected url, got {other:?}"),
        }

        app.on_key(key(KeyCode::Char('b')));
        assert_eq!(app.state, AppState::Sessions);
        assert!(app.detail.is_none());
    }

    #[test]
    fn test_quit_keys() {
        let (_db, mut app) = app();
        assert_eq!(app.on_key(key(KeyCode::Esc)), Action::Quit);
        assert_eq!(app.on_key(key(KeyCode::Char('q'))), Action::Quit);
        assert_eq!(
            app.on_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Action::Quit
        );
    }

    #[test]
    fn test_reload_only_on_sessions_screen() {
        let (db, mut app) = app();
        assert_eq!(app.on_key(key(KeyCode::Char('r'))), Action::Reload);

        app.show_detail(session_detail(&db, 2).unwrap());
        assert_eq!(app.on_key(key(KeyCode::Char('r'))), Action::None);
    }

    #[test]
    fn test_empty_listing() {
        let mut app = App::new(Vec::new());
        app.on_key(key(KeyCode::Down));
        assert_eq!(app.selected, 0);
        assert_eq!(app.on_key(key(KeyCode::Enter)), Action::None);
    }

    #[test]
    fn test_set_overviews_keeps_selection_in_range() {
        let (_db, mut app) = app();
        app.on_key(key(KeyCode::End));
        app.set_overviews(Vec::new());
        assert_eq!(app.selected, 0);
    }
}
