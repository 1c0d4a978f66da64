//! Terminal colorization for validation output
//!
//! Applies ANSI escape codes using crossterm.

use crossterm::style::{Color, Stylize};
use std::path::PathBuf;

/// When to colorize output
#[derive(Copy, Clone, Debug, clap::ValueEnum, PartialEq, Eq, Default)]
pub enum ColorChoice {
    /// Use colors if output is a terminal and NO_COLOR is not set
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl ColorChoice {
    /// Resolve against the output destination
    pub fn enabled(self, output: Option<&PathBuf>) -> bool {
        match self {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => {
                if std::env::var("NO_COLOR").is_ok() {
                    return false;
                }
                match output {
                    None => crossterm::tty::IsTty::is_tty(&std::io::stdout()),
                    Some(p) if p.to_str() == Some("-") => {
                        crossterm::tty::IsTty::is_tty(&std::io::stdout())
                    }
                    Some(_) => false,
                }
            }
        }
    }
}

/// `✓` or `✗`, green or red when colored
pub fn status_mark(ok: bool, color: bool) -> String {
    let (mark, tint) = if ok { ("✓", Color::Green) } else { ("✗", Color::Red) };
    if color {
        format!("{}", mark.with(tint).bold())
    } else {
        mark.to_string()
    }
}

/// Number the lines of diagnostic text, dimming the gutter when colored
pub fn numbered_listing(text: &str, color: bool) -> String {
    let width = text.lines().count().max(1).to_string().len();
    text.lines()
        .enumerate()
        .map(|(i, line)| {
            let gutter = format!("{:>width$} │", i + 1, width = width);
            if color {
                format!("{} {}", gutter.with(Color::DarkGrey), line)
            } else {
                format!("{} {}", gutter, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_marks() {
        assert_eq!(status_mark(true, false), "✓");
        assert_eq!(status_mark(false, false), "✗");
    }

    #[test]
    fn test_colored_mark_has_escape_codes() {
        let mark = status_mark(true, true);
        assert!(mark.contains('\u{1b}'));
        assert!(mark.contains('✓'));
    }

    #[test]
    fn test_numbered_listing() {
        let listing = numbered_listing("graph TD\nA-->B", false);
        assert_eq!(listing, "1 │ graph TD\n2 │ A-->B");
    }

    #[test]
    fn test_listing_gutter_aligns() {
        let text = (0..10).map(|i| i.to_string()).collect::<Vec<_>>().join("\n");
        let listing = numbered_listing(&text, false);
        assert!(listing.starts_with(" 1 │ 0"));
        assert!(listing.ends_with("10 │ 9"));
    }

    #[test]
    fn test_explicit_choices() {
        assert!(ColorChoice::Always.enabled(None));
        assert!(!ColorChoice::Never.enabled(None));
        assert!(!ColorChoice::Auto.enabled(Some(&PathBuf::from("out.txt"))));
    }
}
