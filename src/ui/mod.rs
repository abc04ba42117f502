use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use crate::app::Prompter;
use crate::model::{Action, ConflictChoice};
use crate::ui::constants::{ACTION_DEFAULT_KEY, ACTION_KEYS, CONFLICT_DEFAULT_KEY, CONFLICT_KEYS};
use crate::ui::helpers::complete_path;
use crate::ui::modals::{
    draw_action_menu, draw_conflict_menu, draw_destination_prompt, draw_error,
};

pub(crate) mod constants;
mod helpers;
mod modals;

type Screen = Terminal<CrosstermBackend<io::Stdout>>;

/// State of the single-line destination input.
#[derive(Debug, Clone, Default)]
pub(crate) struct PathInput {
    pub(crate) value: String,
    pub(crate) completions: Vec<String>,
}

pub(crate) enum InputOutcome {
    Pending,
    Submit,
    Cancel,
}

impl PathInput {
    pub(crate) fn handle_key(&mut self, key: KeyEvent, cwd: &Path) -> InputOutcome {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return match key.code {
                KeyCode::Char('c') | KeyCode::Char('d') => InputOutcome::Cancel,
                KeyCode::Char('u') => {
                    self.value.clear();
                    self.completions.clear();
                    InputOutcome::Pending
                }
                _ => InputOutcome::Pending,
            };
        }
        match key.code {
            KeyCode::Enter => InputOutcome::Submit,
            KeyCode::Esc => InputOutcome::Cancel,
            KeyCode::Tab => {
                let (completed, matches) = complete_path(&self.value, cwd);
                self.value = completed;
                self.completions = if matches.len() > 1 { matches } else { Vec::new() };
                InputOutcome::Pending
            }
            KeyCode::Backspace => {
                self.value.pop();
                self.completions.clear();
                InputOutcome::Pending
            }
            KeyCode::Char(c) => {
                self.value.push(c);
                self.completions.clear();
                InputOutcome::Pending
            }
            _ => InputOutcome::Pending,
        }
    }
}

/// Prompter drawing each screen with ratatui on the alternate screen and
/// reading keys in raw mode. The normal screen is restored between
/// prompts so the editor and ssh can use the terminal.
#[derive(Debug, Default)]
pub(crate) struct TerminalPrompter;

impl TerminalPrompter {
    fn with_screen<T>(&self, body: impl FnOnce(&mut Screen) -> Result<T>) -> Result<T> {
        enable_raw_mode().context("enable raw mode")?;
        let mut stdout = io::stdout();
        if let Err(err) = execute!(stdout, EnterAlternateScreen) {
            disable_raw_mode().ok();
            return Err(err).context("enter alternate screen");
        }
        let result = Terminal::new(CrosstermBackend::new(stdout))
            .context("create terminal")
            .and_then(|mut terminal| {
                let result = body(&mut terminal);
                terminal.show_cursor().ok();
                result
            });
        disable_raw_mode().ok();
        execute!(io::stdout(), LeaveAlternateScreen).ok();
        result
    }
}

/// Wait for one of `allowed`. Esc and Ctrl-C pick `default`.
fn read_choice(allowed: &str, default: char) -> Result<char> {
    loop {
        let Event::Key(key) = event::read().context("read key")? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        if key.code == KeyCode::Esc
            || (key.modifiers.contains(KeyModifiers::CONTROL)
                && matches!(key.code, KeyCode::Char('c')))
        {
            return Ok(default);
        }
        if let KeyCode::Char(c) = key.code {
            let c = c.to_ascii_lowercase();
            if allowed.contains(c) {
                return Ok(c);
            }
        }
    }
}

fn wait_for_any_key() -> Result<()> {
    loop {
        if let Event::Key(key) = event::read().context("read key")? {
            if key.kind == KeyEventKind::Press {
                return Ok(());
            }
        }
    }
}

impl Prompter for TerminalPrompter {
    fn ask_action(&mut self, hostname: &str, remote_path: &str) -> Result<Action> {
        self.with_screen(|terminal| {
            terminal.hide_cursor().ok();
            terminal.draw(|frame| draw_action_menu(frame, hostname, remote_path))?;
            let key = read_choice(ACTION_KEYS, ACTION_DEFAULT_KEY)?;
            Ok(Action::from_key(key))
        })
    }

    fn ask_destination(&mut self, default: &Path, cwd: &Path) -> Result<Option<String>> {
        self.with_screen(|terminal| {
            let mut input = PathInput::default();
            loop {
                terminal.draw(|frame| draw_destination_prompt(frame, &input, default, cwd))?;
                let Event::Key(key) = event::read().context("read key")? else {
                    continue;
                };
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match input.handle_key(key, cwd) {
                    InputOutcome::Pending => {}
                    InputOutcome::Submit => return Ok(Some(input.value)),
                    InputOutcome::Cancel => return Ok(None),
                }
            }
        })
    }

    fn ask_conflict(&mut self, dest: &Path) -> Result<ConflictChoice> {
        self.with_screen(|terminal| {
            terminal.hide_cursor().ok();
            terminal.draw(|frame| draw_conflict_menu(frame, dest))?;
            let key = read_choice(CONFLICT_KEYS, CONFLICT_DEFAULT_KEY)?;
            Ok(ConflictChoice::from_key(key))
        })
    }

    fn show_error(&mut self, message: &str) -> Result<()> {
        self.with_screen(|terminal| {
            terminal.hide_cursor().ok();
            terminal.draw(|frame| draw_error(frame, message))?;
            wait_for_any_key()
        })
    }

    fn announce(&mut self, message: &str) {
        let mut stdout = io::stdout();
        writeln!(stdout, "{message}").ok();
        stdout.flush().ok();
    }
}
