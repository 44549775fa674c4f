//! Logging configuration for mp3-reencode
//!
//! Logs are written to both the terminal and a file at:
//! `~/Library/Logs/mp3-reencode/mp3-reencode.log` on macOS, or
//! `<data_local_dir>/mp3-reencode/logs/mp3-reencode.log` elsewhere.

use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

const LOG_FILE: &str = "mp3-reencode.log";
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Get the log directory path
pub fn get_log_directory() -> Option<PathBuf> {
    if cfg!(target_os = "macos") {
        dirs::home_dir().map(|h| h.join("Library").join("Logs").join("mp3-reencode"))
    } else {
        dirs::data_local_dir().map(|d| d.join("mp3-reencode").join("logs"))
    }
}

fn log_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_thread_level(LevelFilter::Off)
        .set_target_level(LevelFilter::Off)
        .build()
}

/// Move the log aside once it grows past 10MB
fn rotate_if_large(log_path: &Path) {
    if let Ok(metadata) = fs::metadata(log_path) {
        if metadata.len() > MAX_LOG_SIZE {
            let _ = fs::rename(log_path, log_path.with_extension("log.old"));
        }
    }
}

/// Initialize the logging system
///
/// Terminal gets info (debug when `verbose`), the file always gets debug.
/// Returns the path to the log file when file logging is active.
pub fn init_logging(verbose: bool, log_to_file: bool) -> Option<PathBuf> {
    let term_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    if !log_to_file {
        init_terminal_only(term_level);
        return None;
    }

    let Some(log_dir) = get_log_directory() else {
        eprintln!("Warning: Could not determine log directory");
        init_terminal_only(term_level);
        return None;
    };

    if let Err(e) = fs::create_dir_all(&log_dir) {
        eprintln!("Warning: Could not create log directory: {}", e);
        init_terminal_only(term_level);
        return None;
    }

    let log_path = log_dir.join(LOG_FILE);
    rotate_if_large(&log_path);

    let log_file = match OpenOptions::new().create(true).append(true).open(&log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not open log file: {}", e);
            init_terminal_only(term_level);
            return None;
        }
    };

    let config = log_config();
    let loggers: Vec<Box<dyn SharedLogger>> = vec![
        TermLogger::new(term_level, config.clone(), TerminalMode::Mixed, ColorChoice::Auto),
        WriteLogger::new(LevelFilter::Debug, config, log_file),
    ];

    if CombinedLogger::init(loggers).is_err() {
        eprintln!("Warning: Logger already initialized");
    }

    log::debug!("=== mp3-reencode session started ===");
    log::debug!("Log file: {}", log_path.display());

    Some(log_path)
}

/// Terminal-only logging (fallback if file logging is off or fails)
fn init_terminal_only(level: LevelFilter) {
    let term_logger = TermLogger::new(level, log_config(), TerminalMode::Mixed, ColorChoice::Auto);
    let _ = CombinedLogger::init(vec![term_logger]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_log_directory_returns_path() {
        let Some(dir) = get_log_directory() else {
            // No home/data dir in some sandboxes
            return;
        };
        assert!(
            dir.to_string_lossy().contains("mp3-reencode"),
            "Path should contain app name"
        );
    }

    #[test]
    fn test_rotate_moves_large_log() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let log_path = temp_dir.path().join(LOG_FILE);
        let file = fs::File::create(&log_path).unwrap();
        file.set_len(MAX_LOG_SIZE + 1).unwrap();

        rotate_if_large(&log_path);

        assert!(!log_path.exists());
        assert!(temp_dir.path().join("mp3-reencode.log.old").exists());
    }

    #[test]
    fn test_rotate_keeps_small_log() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let log_path = temp_dir.path().join(LOG_FILE);
        fs::write(&log_path, "small").unwrap();

        rotate_if_large(&log_path);

        assert!(log_path.exists());
    }
}
