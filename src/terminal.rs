use anyhow::Context;
use crossterm::{
    ExecutableCommand, cursor,
    terminal::{self, ClearType},
};
use log::LevelFilter;
use std::io::{Stdout, Write, stdout};

/// Mutes the `log` facade until dropped, then restores the previous level.
/// Stderr shares the screen with the renderer, so records would land inside
/// the frame.
pub struct LogPause {
    previous: LevelFilter,
}

impl LogPause {
    pub fn new() -> Self {
        let previous = log::max_level();
        log::set_max_level(LevelFilter::Off);
        Self { previous }
    }

    pub fn previous(&self) -> LevelFilter {
        self.previous
    }
}

impl Default for LogPause {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for LogPause {
    fn drop(&mut self) {
        log::set_max_level(self.previous);
    }
}

/// Raw mode plus alternate screen for the guard's lifetime.
pub struct TerminalGuard {
    _private: (),
}

impl TerminalGuard {
    pub fn new() -> anyhow::Result<Self> {
        terminal::enable_raw_mode().context("enable raw mode")?;
        // Build the guard first so a failing step below still restores the terminal.
        let guard = Self { _private: () };

        let mut out = stdout();
        out.execute(terminal::EnterAlternateScreen)
            .context("enter alternate screen")?;
        out.execute(terminal::Clear(ClearType::All))
            .context("clear screen")?;
        out.execute(cursor::Hide).context("hide cursor")?;

        Ok(guard)
    }

    pub fn stdout() -> Stdout {
        stdout()
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
        let mut out = stdout();
        // Undo sync output, autowrap off, and colours left by the renderers.
        let _ = out.write_all(b"\x1b[?2026l\x1b[?7h\x1b[0m");
        let _ = out.flush();
        let _ = out.execute(cursor::Show);
        let _ = out.execute(terminal::LeaveAlternateScreen);
    }
}
