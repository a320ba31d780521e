//! Colored output for libstrap
//!
//! Uses owo-colors for terminal colors. Informational lines go to stdout,
//! warnings and errors to stderr.

use owo_colors::OwoColorize;

/// Print an action header (blue, bold)
/// Example: "==> Bootstrapping library 'zlib' to deps/zlib"
pub fn action(message: &str) {
    println!("{} {}", "==>".blue().bold(), message.bold());
}

/// Print an action with a library counter
/// Example: "(1/5) zlib"
pub fn action_numbered(current: usize, total: usize, message: &str) {
    println!(
        "{} {}",
        format!("({}/{})", current, total).cyan(),
        message.bold()
    );
}

/// Print a detail line (dimmed)
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

/// Print a warning message (yellow)
pub fn warning(message: &str) {
    eprintln!("{} {}", "warning:".yellow().bold(), message.yellow());
}

/// Print an error message (red)
pub fn error(message: &str) {
    eprintln!("{} {}", "error:".red().bold(), message.red());
}

/// Print one row of `libstrap list` / `libstrap snapshots`
pub fn list_item(name: &str, status: &str, highlighted: bool) {
    if highlighted {
        println!("  {} {}", name.green(), status.dimmed());
    } else {
        println!("  {} {}", name, status.dimmed());
    }
}
