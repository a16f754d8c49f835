//! Colored console output for pkg-fetch
//!
//! Uses owo-colors for terminal colors. Errors and warnings go to stderr,
//! everything else to stdout.

use owo_colors::OwoColorize;

/// Print an action header (blue, bold)
/// Example: "==> Fetching packagesite.pkg"
pub fn action(message: &str) {
    println!("{} {}", "==>".blue().bold(), message.bold());
}

/// Print a detail line (dimmed prefix)
/// Example: "     mirror pkg0.example.org:80"
pub fn detail(message: &str) {
    println!("     {}", message.dimmed());
}

/// Print a success message (green)
pub fn success(message: &str) {
    println!("{} {}", "==>".green().bold(), message.green());
}

/// Print an info message (cyan)
pub fn info(message: &str) {
    println!("{} {}", "::".cyan(), message);
}

/// Print a skip message (dimmed)
/// Example: "==> packagesite.pkg is up to date"
pub fn skip(message: &str) {
    println!("{} {}", "==>".dimmed(), message.dimmed());
}

/// Print a warning message (yellow)
pub fn warning(message: &str) {
    eprintln!("{} {}", "warning:".yellow().bold(), message.yellow());
}

/// Print an error message (red)
pub fn error(message: &str) {
    eprintln!("{} {}", "error:".red().bold(), message.red());
}

/// Print a debug message when `verbosity` is at least `level`.
///
/// Level 1 covers per-attempt transport chatter, level 2 and above is
/// reserved for request details.
pub fn debug(verbosity: u8, level: u8, message: &str) {
    if enabled(verbosity, level) {
        eprintln!("{} {}", format!("DBG({level})>").magenta(), message.dimmed());
    }
}

fn enabled(verbosity: u8, level: u8) -> bool {
    level > 0 && verbosity >= level
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_gated_by_verbosity() {
        assert!(!enabled(0, 1));
        assert!(enabled(1, 1));
        assert!(enabled(3, 2));
        assert!(!enabled(1, 2));
    }

    #[test]
    fn test_level_zero_never_prints() {
        assert!(!enabled(5, 0));
    }
}
