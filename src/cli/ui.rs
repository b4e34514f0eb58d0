use std::collections::BTreeSet;
use std::io::{self, stdout, IsTerminal, Write};
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    style::{Color as CtColor, Print, ResetColor, SetForegroundColor},
    terminal,
};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;

use crate::core::diff::LockDiff;
use crate::core::pattern::PatternSet;
use crate::core::snapshot::SnapshotHistory;
use crate::error::BlobmanError;

/// Colors are on unless `NO_COLOR` is set.
pub fn colors_enabled() -> bool {
    std::env::var_os("NO_COLOR").is_none()
}

fn print_colored(color: CtColor, marker: &str, message: &str) {
    if colors_enabled() {
        let _ = execute!(
            stdout(),
            SetForegroundColor(color),
            Print(marker),
            Print(message),
            Print("\n"),
            ResetColor
        );
    } else {
        println!("{}{}", marker, message);
    }
}

/// Print success message
pub fn print_success(message: &str) {
    print_colored(CtColor::Green, "✓ ", message);
}

/// Print warning message
pub fn print_warning(message: &str) {
    print_colored(CtColor::Yellow, "! ", message);
}

/// Print info message
pub fn print_info(message: &str) {
    print_colored(CtColor::Blue, "", message);
}

/// Print error message to stderr
pub fn print_error(error: &BlobmanError) {
    if colors_enabled() {
        eprintln!("{} {}", "Error:".red().bold(), error);
    } else {
        eprintln!("Error: {}", error);
    }
}

fn heading(title: &str) {
    if colors_enabled() {
        println!("\n{}\n", title.bold());
    } else {
        println!("\n{}\n", title);
    }
}

/// Print the registered patterns as `id - glob`.
pub fn print_patterns(patterns: &PatternSet) {
    heading("Patterns:");
    for pattern in patterns.iter() {
        if colors_enabled() {
            println!("{} - {}", pattern.id.bright_yellow(), pattern.glob);
        } else {
            println!("{} - {}", pattern.id, pattern.glob);
        }
    }
}

/// Print resolved blob paths, one per line.
pub fn print_files(title: &str, files: &BTreeSet<String>) {
    heading(title);
    for file in files {
        println!("{}", file);
    }
}

/// Print snapshot history as `tag - time (restic id)`.
pub fn print_history(history: &SnapshotHistory, current: Option<&str>) {
    heading("Snapshots:");
    for record in history.records() {
        let time = record.timestamp.format("%Y-%m-%d %H:%M:%S");
        let marker = if Some(record.tag.as_str()) == current { " <- locked" } else { "" };
        let short_id: String = record.id.chars().take(8).collect();
        if colors_enabled() {
            println!(
                "{} - {} ({}){}",
                record.tag.bright_yellow(),
                time.dimmed(),
                short_id,
                marker.green()
            );
        } else {
            println!("{} - {} ({}){}", record.tag, time, short_id, marker);
        }
    }
}

/// Print the four classes of a diff. Unchanged files are only counted.
pub fn print_diff(diff: &LockDiff) {
    let sections = [
        ("Added files:", "+", &diff.added, CtColor::Green),
        ("Removed files:", "-", &diff.removed, CtColor::Red),
        ("Modified files:", "~", &diff.modified, CtColor::Yellow),
    ];

    for (title, sign, paths, color) in sections {
        heading(title);
        for path in paths {
            print_colored(color, &format!("{} ", sign), path);
        }
    }

    println!("\n{} unchanged file(s)", diff.unchanged.len());
}

/// Create a spinner for long-running external commands
pub fn create_progress_bar(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.enable_steady_tick(Duration::from_millis(80));
    if let Ok(style) = ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {wide_msg}") {
        pb.set_style(style.tick_strings(&[
            "▰▱▱▱▱▱",
            "▰▰▱▱▱▱",
            "▰▰▰▱▱▱",
            "▰▰▰▰▱▱",
            "▰▰▰▰▰▱",
            "▰▰▰▰▰▰",
        ]));
    }
    pb.set_message(message.to_string());
    pb
}

/// Ask for a line of input on stdin
pub fn prompt_line(label: &str) -> Result<String, std::io::Error> {
    print!("{}: ", label);
    stdout().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim_end_matches(['\r', '\n']).to_string())
}

/// What a key press does to a secret being typed.
#[derive(Debug, PartialEq, Eq)]
enum SecretInput {
    Continue,
    Done,
    Cancelled,
}

fn apply_secret_key(buffer: &mut String, key: &KeyEvent) -> SecretInput {
    if key.kind == KeyEventKind::Release {
        return SecretInput::Continue;
    }
    match key.code {
        KeyCode::Enter => SecretInput::Done,
        KeyCode::Esc => SecretInput::Cancelled,
        KeyCode::Char('c') | KeyCode::Char('d')
            if key.modifiers.contains(KeyModifiers::CONTROL) =>
        {
            SecretInput::Cancelled
        }
        KeyCode::Backspace => {
            buffer.pop();
            SecretInput::Continue
        }
        KeyCode::Char(c) => {
            buffer.push(c);
            SecretInput::Continue
        }
        _ => SecretInput::Continue,
    }
}

/// Ask for a secret without echoing it. Piped stdin is read as a plain line.
pub fn prompt_secret(label: &str) -> Result<String, io::Error> {
    if !io::stdin().is_terminal() {
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        return Ok(input.trim_end_matches(['\r', '\n']).to_string());
    }

    print!("{}: ", label);
    stdout().flush()?;

    terminal::enable_raw_mode()?;
    let mut secret = String::new();
    let outcome = loop {
        match event::read() {
            Ok(Event::Key(key)) => match apply_secret_key(&mut secret, &key) {
                SecretInput::Continue => continue,
                other => break Ok(other),
            },
            Ok(_) => continue,
            Err(e) => break Err(e),
        }
    };
    terminal::disable_raw_mode()?;
    println!();

    match outcome? {
        SecretInput::Cancelled => Err(io::Error::new(
            io::ErrorKind::Interrupted,
            "password entry cancelled",
        )),
        _ => Ok(secret),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_secret_editing() {
        let mut secret = String::new();
        for c in "hunterx".chars() {
            assert_eq!(apply_secret_key(&mut secret, &press(KeyCode::Char(c))), SecretInput::Continue);
        }
        apply_secret_key(&mut secret, &press(KeyCode::Backspace));
        apply_secret_key(&mut secret, &press(KeyCode::Char('2')));
        assert_eq!(apply_secret_key(&mut secret, &press(KeyCode::Enter)), SecretInput::Done);
        assert_eq!(secret, "hunter2");
    }

    #[test]
    fn test_secret_cancel_and_release_events() {
        let mut secret = String::new();
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(apply_secret_key(&mut secret, &ctrl_c), SecretInput::Cancelled);

        let mut release = press(KeyCode::Char('x'));
        release.kind = KeyEventKind::Release;
        assert_eq!(apply_secret_key(&mut secret, &release), SecretInput::Continue);
        assert!(secret.is_empty());
    }
}
