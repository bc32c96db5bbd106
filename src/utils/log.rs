// src/utils/log.rs

//! Console helpers for human-facing run output.
//!
//! Output is gated on the `log` facade's level, so `--verbose` and
//! `RUST_LOG` apply here too.

use chrono::Local;

fn enabled() -> bool {
    ::log::log_enabled!(::log::Level::Info)
}

/// Format a console line with timestamp and tag
fn format_line(tag: &str, message: &str) -> String {
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
    format!("[{}] [{}] {}", timestamp, tag, message)
}

/// Log a success message (always shown)
pub fn success(message: &str) {
    println!("{}", format_line("INFO", message));
}

/// Log a header
pub fn header(title: &str) {
    if enabled() {
        let border = "═".repeat(60);
        println!("{}", format_line("INFO", &border));
        println!("{}", format_line("INFO", &format!("  {}", title)));
        println!("{}", format_line("INFO", &border));
    }
}

/// Log a sub-item (indented)
pub fn sub_item(message: &str) {
    if enabled() {
        println!("{}", format_line("INFO", &format!("    {}", message)));
    }
}

/// Log a summary section
pub fn summary(title: &str, items: &[(&str, String)]) {
    if enabled() {
        println!();
        println!("{}", format_line("INFO", &format!("[SUMMARY] {}", title)));
        for (key, value) in items {
            println!("{}", format_line("INFO", &format!("    {}: {}", key, value)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_line_shape() {
        let line = format_line("INFO", "hello");
        assert!(line.starts_with('['));
        assert!(line.ends_with("] [INFO] hello"));
    }
}
