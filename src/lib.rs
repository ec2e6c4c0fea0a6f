// Library surface shared by the binary and the integration tests.
pub mod app;
pub mod app_dirs;
pub mod config;
pub mod error;
pub mod history;
pub mod import;
pub mod listen;
pub mod overview;
pub mod report;
pub mod runtime;
pub mod session_stats;
pub mod ui;
pub mod util;

pub use error::{Error, Result};
pub use session_stats::{compute_stats, SessionStats};
