//! Interactive terminal input

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use std::io::{self, IsTerminal, Write};

/// Read one line from stdin
pub fn read_user_input_sync() -> Result<String> {
    let mut buffer = String::new();
    io::stdin()
        .read_line(&mut buffer)
        .context("Failed to read from stdin")?;
    Ok(buffer)
}

/// Print `label` and read a line, returning `default` when the answer is empty
pub fn prompt_with_default(label: &str, default: &str) -> Result<String> {
    print!("{} [{}]: ", label, default);
    io::stdout().flush()?;
    let input = read_user_input_sync()?;
    let input = input.trim();
    Ok(if input.is_empty() {
        default.to_string()
    } else {
        input.to_string()
    })
}

/// Restores cooked mode when dropped
struct RawModeGuard;

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

/// Print `label` and read a password without echoing it. Falls back to a plain line read when
/// stdin is not a terminal.
pub fn prompt_password(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;

    if !io::stdin().is_terminal() {
        let line = read_user_input_sync()?;
        return Ok(line.trim_end_matches(['\r', '\n']).to_string());
    }

    terminal::enable_raw_mode().context("Failed to enable raw mode")?;
    let guard = RawModeGuard;

    let mut password = String::new();
    loop {
        let Event::Key(KeyEvent {
            code,
            modifiers,
            kind,
            ..
        }) = event::read().context("Failed to read key")?
        else {
            continue;
        };
        if kind == KeyEventKind::Release {
            continue;
        }

        match code {
            KeyCode::Enter => break,
            KeyCode::Backspace => {
                password.pop();
            }
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                drop(guard);
                println!();
                anyhow::bail!("Cancelled");
            }
            KeyCode::Char(c) => password.push(c),
            KeyCode::Esc => {
                drop(guard);
                println!();
                anyhow::bail!("Cancelled");
            }
            _ => {}
        }
    }

    drop(guard);
    println!();
    Ok(password)
}
