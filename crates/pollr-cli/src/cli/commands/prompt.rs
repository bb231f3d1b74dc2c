//! Password prompts that do not echo what is typed.

use std::io::{self, Write};

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};

#[derive(Debug, PartialEq, Eq)]
enum KeyOutcome {
    Pending,
    Submit,
    Cancel,
}

fn apply_key(secret: &mut String, key: KeyEvent) -> KeyOutcome {
    if key.kind != KeyEventKind::Press {
        return KeyOutcome::Pending;
    }
    match key.code {
        KeyCode::Enter => KeyOutcome::Submit,
        KeyCode::Esc => KeyOutcome::Cancel,
        KeyCode::Char('c' | 'd') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            KeyOutcome::Cancel
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            secret.clear();
            KeyOutcome::Pending
        }
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            secret.push(c);
            KeyOutcome::Pending
        }
        KeyCode::Backspace => {
            secret.pop();
            KeyOutcome::Pending
        }
        _ => KeyOutcome::Pending,
    }
}

/// Prompts on stderr and reads one line from the terminal with echo off.
/// Returns `None` when the user cancels with Esc, Ctrl-C or Ctrl-D.
///
/// Blocks; callers on the runtime should go through `spawn_blocking`.
pub fn read_hidden(prompt: &str) -> Result<Option<String>> {
    eprint!("{prompt}");
    io::stderr().flush()?;

    enable_raw_mode().context("Failed to enable raw mode")?;
    let result = read_keys();
    disable_raw_mode().context("Failed to disable raw mode")?;
    eprintln!();
    result
}

fn read_keys() -> Result<Option<String>> {
    let mut secret = String::new();
    loop {
        let Event::Key(key) = event::read().context("Failed to read key")? else {
            continue;
        };
        match apply_key(&mut secret, key) {
            KeyOutcome::Pending => {}
            KeyOutcome::Submit => return Ok(Some(secret)),
            KeyOutcome::Cancel => return Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn type_keys(keys: impl IntoIterator<Item = KeyEvent>) -> (String, KeyOutcome) {
        let mut secret = String::new();
        let mut outcome = KeyOutcome::Pending;
        for key in keys {
            outcome = apply_key(&mut secret, key);
            if outcome != KeyOutcome::Pending {
                break;
            }
        }
        (secret, outcome)
    }

    #[test]
    fn test_typed_characters_submit_on_enter() {
        let keys = "hunter22"
            .chars()
            .map(|c| press(KeyCode::Char(c)))
            .chain([press(KeyCode::Enter)]);
        assert_eq!(type_keys(keys), ("hunter22".to_string(), KeyOutcome::Submit));
    }

    #[test]
    fn test_backspace_and_clear_line_edit_the_secret() {
        let keys = [
            press(KeyCode::Char('a')),
            press(KeyCode::Char('b')),
            ctrl('u'),
            press(KeyCode::Char('x')),
            press(KeyCode::Char('y')),
            press(KeyCode::Backspace),
            press(KeyCode::Enter),
        ];
        assert_eq!(type_keys(keys), ("x".to_string(), KeyOutcome::Submit));
    }

    #[test]
    fn test_escape_and_interrupt_cancel() {
        assert_eq!(type_keys([press(KeyCode::Esc)]).1, KeyOutcome::Cancel);
        assert_eq!(type_keys([ctrl('c')]).1, KeyOutcome::Cancel);
        assert_eq!(type_keys([ctrl('d')]).1, KeyOutcome::Cancel);
    }

    #[test]
    fn test_key_release_is_ignored() {
        let mut release = press(KeyCode::Char('z'));
        release.kind = KeyEventKind::Release;
        let mut secret = String::new();
        assert_eq!(apply_key(&mut secret, release), KeyOutcome::Pending);
        assert!(secret.is_empty());
    }
}
