//! Terminal rendering of launcher status.
//!
//! Download fractions drive an `indicatif` bar, and are mirrored to the terminal's
//! native progress indicator (OSC 9;4) where supported. Label changes that are not
//! downloads are printed as status lines.

use crate::launcher::{ActionState, Stage, StatusListener};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, IsTerminal, Write};
use std::sync::Mutex;

/// Native progress state for OSC 9;4
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalState {
    Off = 0,
    Normal = 1,
    Error = 2,
    Indeterminate = 3,
}

/// Whether the terminal is likely to understand OSC 9;4
pub fn supports_native_progress() -> bool {
    if !io::stderr().is_terminal() {
        return false;
    }
    matches!(
        std::env::var("TERM_PROGRAM").ok().as_deref(),
        Some("ghostty") | Some("WezTerm")
    ) || std::env::var_os("WT_SESSION").is_some()
        || std::env::var_os("ConEmuPID").is_some()
}

/// Escape sequence setting the native progress indicator
pub fn osc_progress(percent: u8, state: TerminalState) -> String {
    format!("\x1b]9;4;{};{}\x1b\\", state as u8, percent.min(100))
}

fn set_native_progress(percent: u8, state: TerminalState) {
    let mut err = io::stderr();
    let _ = write!(err, "{}", osc_progress(percent, state));
    let _ = err.flush();
}

struct BarState {
    bar: Option<(Stage, ProgressBar)>,
    last_text: String,
}

/// [`StatusListener`] drawing to stderr
pub struct TerminalReporter {
    state: Mutex<BarState>,
    interactive: bool,
    native: bool,
}

impl TerminalReporter {
    pub fn new() -> Self {
        let interactive = io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none();
        Self {
            state: Mutex::new(BarState {
                bar: None,
                last_text: String::new(),
            }),
            interactive,
            native: interactive && supports_native_progress(),
        }
    }

    fn new_bar(&self, stage: Stage) -> ProgressBar {
        if !self.interactive {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(100);
        let style = ProgressStyle::default_bar()
            .template("{msg:>18} [{bar:40.cyan/blue}] {pos:>3}%")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        bar.set_style(style);
        bar.set_message(match stage {
            Stage::Runtime => "Downloading JDK",
            Stage::Game => "Downloading Game",
        });
        bar
    }

    fn finish_bar(&self, state: &mut BarState) {
        if let Some((_, bar)) = state.bar.take() {
            bar.finish_and_clear();
            if self.native {
                set_native_progress(0, TerminalState::Off);
            }
        }
    }
}

impl Default for TerminalReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusListener for TerminalReporter {
    fn action_changed(&self, action: &ActionState) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if action.text.starts_with("Downloading") || action.text == state.last_text {
            return;
        }
        state.last_text = action.text.clone();
        self.finish_bar(&mut state);

        if action.text.starts_with("Failed") {
            if self.native {
                set_native_progress(100, TerminalState::Error);
            }
            eprintln!("{} {}", "✗".red(), action.text.red());
        } else if action.text == "Play" {
            eprintln!("{} Ready", "✓".green());
        } else {
            eprintln!("{} {}", "==>".bold().cyan(), action.text.bold());
        }
    }

    fn progress(&self, stage: Stage, fraction: f32) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let current = state.bar.as_ref().map(|(s, _)| *s);
        if current != Some(stage) {
            self.finish_bar(&mut state);
            state.bar = Some((stage, self.new_bar(stage)));
            state.last_text.clear();
        }

        let percent = (fraction.clamp(0.0, 1.0) * 100.0) as u64;
        if let Some((_, bar)) = &state.bar {
            bar.set_position(percent);
        }
        if self.native {
            if fraction == 0.0 {
                set_native_progress(0, TerminalState::Indeterminate);
            } else {
                set_native_progress(percent as u8, TerminalState::Normal);
            }
        }
    }
}

impl Drop for TerminalReporter {
    fn drop(&mut self) {
        if self.native {
            set_native_progress(0, TerminalState::Off);
        }
    }
}
