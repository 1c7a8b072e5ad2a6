//! Session logger: a `log::Log` backend that writes to a single file in the
//! OS data directory.
//!
//! The file is **truncated (overwritten) at each GUI launch**, so it only ever
//! contains output from the most recent session.
//!
//! Log location:
//!   Windows:  `%APPDATA%\SpriteSlicer\spriteslicer.log`
//!   Linux:    `~/.local/share/SpriteSlicer/spriteslicer.log`
//!   macOS:    `~/Library/Application Support/SpriteSlicer/spriteslicer.log`
//!
//! Call sites use the ordinary `log::info!` / `log::warn!` / `log::error!`
//! macros.  The headless tools install the stderr sink instead (see
//! [`init_stderr`]), which only shows warnings unless asked to be verbose.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use log::{Level, LevelFilter, Log, Metadata, Record};

enum Sink {
    File(Mutex<File>),
    Stderr,
}

struct SessionLogger {
    sink: Sink,
    level: LevelFilter,
}

impl Log for SessionLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format_line(record.level(), &record.args().to_string());
        match &self.sink {
            Sink::File(file) => {
                if let Ok(mut f) = file.lock() {
                    let _ = writeln!(f, "{}", line);
                }
            }
            Sink::Stderr => eprintln!("{}", line),
        }
    }

    fn flush(&self) {
        if let Sink::File(file) = &self.sink
            && let Ok(mut f) = file.lock()
        {
            let _ = f.flush();
        }
    }
}

/// Initialise the GUI session logger.  Call once before any logging.
///
/// * Creates (or truncates) the log file.
/// * Installs a panic hook that writes the panic message to the log before
///   propagating to the default handler.
pub fn init() {
    let path = log_file_path();
    if let Err(e) = init_file(&path) {
        // Not fatal, the app runs without a log.
        eprintln!("[logger] Failed to open log file {:?}: {}", path, e);
        return;
    }

    log::info!("=== SpriteSlicer session started {} ===", human_timestamp());
    log::info!("Log file: {}", path.display());

    let prev = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        log::error!("PANIC: {}", info);
        log::logger().flush();
        prev(info);
    }));
}

/// Install the file sink at an explicit path.
pub fn init_file(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)?;
    install(Sink::File(Mutex::new(file)), LevelFilter::Info);
    Ok(())
}

/// Install the stderr sink used by the command-line tools.  Only warnings and
/// errors are shown unless `verbose` is set.
pub fn init_stderr(verbose: bool) {
    let level = if verbose { LevelFilter::Info } else { LevelFilter::Warn };
    install(Sink::Stderr, level);
}

fn install(sink: Sink, level: LevelFilter) {
    let logger = Box::new(SessionLogger { sink, level });
    if log::set_boxed_logger(logger).is_ok() {
        log::set_max_level(level);
    }
}

fn format_line(level: Level, msg: &str) -> String {
    format!("[{}] [{}] {}", timestamp(), level, msg)
}

fn log_file_path() -> PathBuf {
    data_dir().join("SpriteSlicer").join("spriteslicer.log")
}

/// Platform data directory (without the app sub-folder).
fn data_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata);
        }
    }
    #[cfg(target_os = "macos")]
    {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support");
        }
    }
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local").join("share");
    }
    PathBuf::from(".")
}

/// `HH:MM:SS` within the current UTC day.
fn timestamp() -> String {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(d) => clock(d.as_secs()),
        Err(_) => "??:??:??".to_string(),
    }
}

fn clock(secs: u64) -> String {
    let h = (secs % 86400) / 3600;
    let m = (secs % 3600) / 60;
    let s = secs % 60;
    format!("{:02}:{:02}:{:02}", h, m, s)
}

fn human_timestamp() -> String {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(d) => format!("(unix {})", d.as_secs()),
        Err(_) => "(unknown time)".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_wraps_at_midnight() {
        assert_eq!(clock(0), "00:00:00");
        assert_eq!(clock(3600 * 13 + 60 * 7 + 9), "13:07:09");
        assert_eq!(clock(86400 + 61), "00:01:01");
    }

    #[test]
    fn line_layout() {
        let line = format_line(Level::Warn, "disk full");
        assert!(line.ends_with("] [WARN] disk full"), "{line}");
        assert!(line.starts_with('['));
        assert_eq!(&line[9..11], "] ");
    }

    #[test]
    fn file_sink_filters_by_level() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.log");
        let file = File::create(&path).unwrap();
        let logger = SessionLogger {
            sink: Sink::File(Mutex::new(file)),
            level: LevelFilter::Info,
        };
        logger.log(
            &Record::builder()
                .level(Level::Info)
                .args(format_args!("kept"))
                .build(),
        );
        logger.log(
            &Record::builder()
                .level(Level::Debug)
                .args(format_args!("dropped"))
                .build(),
        );
        logger.flush();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("[INFO] kept"));
        assert!(!text.contains("dropped"));
    }
}
