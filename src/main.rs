use clap::{error::ErrorKind, CommandFactory, Parser, Subcommand};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use log::{info, warn};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use rewind::{
    app::{Action, App},
    config::{Config, ConfigStore, FileConfigStore, OutputFormat},
    history::HistoryDb,
    import,
    overview::{session_detail, session_overviews},
    report,
    runtime::{AppEvent, CrosstermEventSource, EventSource, Runner},
    ui::ui,
};
use std::{
    error::Error,
    fs::File,
    io::{self, stdin, BufReader, Write},
    path::PathBuf,
    time::Duration,
};
use webbrowser::Browser;

const TICK_RATE_MS: u64 = 250;

/// listening session browser with per-session statistics
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Browse your listening sessions and see, per session, the artists and genres you played most and how many tracks you listened to the end."
)]
pub struct Cli {
    /// listening history database to use
    #[clap(long, global = true)]
    db: Option<PathBuf>,

    /// config file to read instead of the default location
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    /// output format of the non-interactive commands
    #[clap(short = 'o', long, value_enum, global = true)]
    output: Option<OutputFormat>,

    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// browse sessions interactively (default)
    Browse,
    /// list every session with its top artists, top genres and completion rate
    Sessions,
    /// show the tracks and statistics of one session
    Session { id: i64 },
    /// recently played tracks across all sessions
    History {
        #[clap(short = 'n', long, default_value_t = 50)]
        limit: usize,
    },
    /// import exported sessions and tracks from CSV files
    Import {
        #[clap(long)]
        sessions: Option<PathBuf>,
        #[clap(long)]
        tracks: Option<PathBuf>,
    },
}

impl Cli {
    /// Command line flags win over the stored config
    fn apply_to(&self, mut cfg: Config) -> Config {
        if let Some(db) = &self.db {
            cfg.database_path = Some(db.clone());
        }
        if let Some(output) = self.output {
            cfg.output = output;
        }
        cfg
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("rewind: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let store = match &cli.config {
        Some(path) => FileConfigStore::with_path(path),
        None => FileConfigStore::new(),
    };
    let cfg = cli.apply_to(store.load());

    let mut db = match &cfg.database_path {
        Some(path) => HistoryDb::open(path)?,
        None => HistoryDb::open_default()?,
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cli.command.clone().unwrap_or(Command::Browse) {
        Command::Browse => {
            if !stdin().is_tty() {
                let mut cmd = Cli::command();
                cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
            }
            drop(out);
            browse(&db, &cfg)?;
        }
        Command::Sessions => {
            let overviews = session_overviews(&db, cfg.preview_tracks)?;
            report::write_sessions(&mut out, &overviews, cfg.output)?;
        }
        Command::Session { id } => {
            let detail = session_detail(&db, id)?;
            report::write_session_detail(&mut out, &detail, cfg.output)?;
        }
        Command::History { limit } => {
            let tracks = db.recent_tracks(limit)?;
            report::write_history(&mut out, &tracks, cfg.output)?;
        }
        Command::Import { sessions, tracks } => {
            if sessions.is_none() && tracks.is_none() {
                let mut cmd = Cli::command();
                cmd.error(
                    ErrorKind::MissingRequiredArgument,
                    "import needs --sessions and/or --tracks",
                )
                .exit();
            }
            if let Some(path) = sessions {
                let n = import::import_sessions(&mut db, BufReader::new(File::open(&path)?))?;
                writeln!(out, "imported {n} sessions from {}", path.display())?;
            }
            if let Some(path) = tracks {
                let n = import::import_tracks(&mut db, BufReader::new(File::open(&path)?))?;
                writeln!(out, "imported {n} tracks from {}", path.display())?;
            }
        }
    }

    db.close()?;
    Ok(())
}

fn browse(db: &HistoryDb, cfg: &Config) -> Result<(), Box<dyn Error>> {
    let mut app = App::new(session_overviews(db, cfg.preview_tracks)?);

    enable_raw_mode()?;
    let result = run_in_alternate_screen(&mut app, db, cfg.preview_tracks);
    disable_raw_mode()?;

    result
}

fn run_in_alternate_screen(
    app: &mut App,
    db: &HistoryDb,
    preview: usize,
) -> Result<(), Box<dyn Error>> {
    execute!(io::stdout(), EnterAlternateScreen)?;

    let result = match Terminal::new(CrosstermBackend::new(io::stdout())) {
        Ok(mut terminal) => {
            let runner = Runner::new(
                CrosstermEventSource::new(),
                Duration::from_millis(TICK_RATE_MS),
            );
            let result = start_tui(&mut terminal, app, db, preview, &runner);
            result.and(terminal.show_cursor().map_err(Into::into))
        }
        Err(e) => Err(e.into()),
    };

    execute!(io::stdout(), LeaveAlternateScreen)?;
    result
}

fn start_tui<B: Backend, E: EventSource>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    db: &HistoryDb,
    preview: usize,
    runner: &Runner<E>,
) -> Result<(), Box<dyn Error>> {
    terminal.draw(|f| ui(app, f))?;

    loop {
        match runner.step() {
            AppEvent::Tick => continue,
            AppEvent::Closed => {
                warn!("terminal input closed, leaving the browser");
                break;
            }
            AppEvent::Resize => {}
            AppEvent::Key(key) => match app.on_key(key) {
                Action::Quit => break,
                Action::None => {}
                Action::Reload => match session_overviews(db, preview) {
                    Ok(overviews) => {
                        app.set_overviews(overviews);
                        app.status = Some("reloaded".to_string());
                    }
                    Err(e) => {
                        warn!("could not reload sessions: {e}");
                        app.status = Some(format!("reload failed: {e}"));
                    }
                },
                Action::OpenSession(id) => match session_detail(db, id) {
                    Ok(detail) => app.show_detail(detail),
                    Err(e) => {
                        warn!("could not open session {id}: {e}");
                        app.status = Some(e.to_string());
                    }
                },
                Action::OpenUrl(url) => {
                    if Browser::is_available() {
                        info!("opening {url}");
                        if let Err(e) = webbrowser::open(&url) {
                            app.status = Some(format!("could not open browser: {e}"));
                        }
                    } else {
                        app.status = Some(url);
                    }
                }
            },
        }
        terminal.draw(|f| ui(app, f))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use ratatui::backend::TestBackend;
    use rewind::runtime::TestEventSource;
    use std::sync::mpsc;

    fn key(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    /// Feeds `events` to the browser loop, then hangs up the event source
    fn drive(db: &HistoryDb, app: &mut App, events: Vec<AppEvent>) -> Result<(), Box<dyn Error>> {
        let (tx, rx) = mpsc::channel();
        for event in events {
            tx.send(event).unwrap();
        }
        drop(tx);
        let runner = Runner::new(TestEventSource::new(rx), Duration::from_secs(60));
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        start_tui(&mut terminal, app, db, 3, &runner)
    }

    #[test]
    fn test_browser_exits_when_input_closes() {
        let db = HistoryDb::open_in_memory().unwrap();
        let mut app = App::new(Vec::new());

        drive(&db, &mut app, vec![key(KeyCode::Down), key(KeyCode::Char('r'))]).unwrap();
        assert_eq!(app.status.as_deref(), Some("reloaded"));
    }

    #[test]
    fn test_failed_reload_keeps_browser_running() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.db");
        let db = HistoryDb::open(&path).unwrap();
        let mut app = App::new(session_overviews(&db, 3).unwrap());

        rusqlite::Connection::open(&path)
            .unwrap()
            .execute(
                "INSERT INTO listening_sessions (id, start_time, is_active) VALUES (1, 'garbage', 0)",
                [],
            )
            .unwrap();

        drive(&db, &mut app, vec![key(KeyCode::Char('r'))]).unwrap();
        let status = app.status.unwrap();
        assert!(status.starts_with("reload failed"), "{status}");
        assert!(app.overviews.is_empty());
    }

    #[test]
    fn test_cli_defaults_to_browse() {
        let cli = Cli::try_parse_from(["rewind"]).unwrap();
        assert_eq!(cli.command, None);
        assert_eq!(cli.db, None);
        assert_eq!(cli.output, None);
    }

    #[test]
    fn test_cli_session_subcommand() {
        let cli = Cli::try_parse_from(["rewind", "session", "12", "--output", "json"]).unwrap();
        assert_eq!(cli.command, Some(Command::Session { id: 12 }));
        assert_eq!(cli.output, Some(OutputFormat::Json));
    }

    #[test]
    fn test_cli_history_limit() {
        let cli = Cli::try_parse_from(["rewind", "history"]).unwrap();
        assert_eq!(cli.command, Some(Command::History { limit: 50 }));

        let cli = Cli::try_parse_from(["rewind", "history", "-n", "5"]).unwrap();
        assert_eq!(cli.command, Some(Command::History { limit: 5 }));
    }

    #[test]
    fn test_cli_global_db_flag_after_subcommand() {
        let cli = Cli::try_parse_from(["rewind", "sessions", "--db", "/tmp/h.db"]).unwrap();
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/h.db")));
    }

    #[test]
    fn test_cli_rejects_non_numeric_session() {
        assert!(Cli::try_parse_from(["rewind", "session", "latest"]).is_err());
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::try_parse_from(["rewind", "--db", "x.db", "-o", "json"]).unwrap();
        let cfg = cli.apply_to(Config::default());
        assert_eq!(cfg.database_path, Some(PathBuf::from("x.db")));
        assert_eq!(cfg.output, OutputFormat::Json);
        assert_eq!(cfg.preview_tracks, 3);

        let cli = Cli::try_parse_from(["rewind"]).unwrap();
        let stored = Config {
            output: OutputFormat::Json,
            ..Config::default()
        };
        assert_eq!(cli.apply_to(stored.clone()), stored);
    }

    #[test]
    fn test_cli_debug_assert() {
        Cli::command().debug_assert();
    }
}
