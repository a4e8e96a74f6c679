//! Full-screen terminal session
//!
//! Enters the alternate screen with a hidden cursor and puts everything back
//! exactly once, either through `restore` or on drop.

use crossterm::{
    cursor, queue,
    style::{Attribute, Print, SetAttribute},
    terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use std::io::{self, Write};
use tracing::debug;

/// Used when the terminal size cannot be queried (pipes, CI)
pub const FALLBACK_SIZE: (u16, u16) = (120, 50);

#[derive(Debug, Clone, Copy)]
enum SizeSource {
    Terminal,
    Fixed(u16, u16),
}

pub struct Screen<W: Write> {
    out: W,
    size: SizeSource,
    active: bool,
}

impl Screen<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> Screen<W> {
    /// Screen sized from the controlling terminal.
    pub fn new(out: W) -> Self {
        Self {
            out,
            size: SizeSource::Terminal,
            active: false,
        }
    }

    /// Screen with a fixed size, independent of any real terminal.
    pub fn with_size(out: W, columns: u16, rows: u16) -> Self {
        Self {
            out,
            size: SizeSource::Fixed(columns, rows),
            active: false,
        }
    }

    /// `(columns, rows)`
    pub fn size(&self) -> (u16, u16) {
        match self.size {
            SizeSource::Fixed(columns, rows) => (columns, rows),
            SizeSource::Terminal => terminal::size().unwrap_or(FALLBACK_SIZE),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn enter(&mut self) -> io::Result<()> {
        if self.active {
            return Ok(());
        }
        queue!(
            self.out,
            EnterAlternateScreen,
            cursor::Hide,
            Clear(ClearType::All),
            cursor::MoveTo(0, 0)
        )?;
        self.out.flush()?;
        self.active = true;
        debug!("entered full-screen mode");
        Ok(())
    }

    /// Clear the screen and draw `lines` from the top-left corner. Lines past
    /// the last row are dropped so the frame never scrolls.
    pub fn draw(&mut self, lines: &[String]) -> io::Result<()> {
        let (_, rows) = self.size();
        queue!(self.out, cursor::MoveTo(0, 0), Clear(ClearType::All))?;
        for (row, line) in lines.iter().take(rows as usize).enumerate() {
            queue!(self.out, cursor::MoveTo(0, row as u16), Print(line))?;
        }
        self.out.flush()
    }

    /// Leave the alternate screen and show the cursor. Only the first call
    /// after `enter` writes anything.
    pub fn restore(&mut self) -> io::Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        queue!(
            self.out,
            SetAttribute(Attribute::Reset),
            cursor::Show,
            LeaveAlternateScreen
        )?;
        self.out.flush()?;
        debug!("terminal restored");
        Ok(())
    }
}

impl<W: Write> Drop for Screen<W> {
    fn drop(&mut self) {
        let _ = self.restore();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devmon_devkit::test_utils::SharedBuffer;

    const ENTER_ALT: &str = "\x1b[?1049h";
    const LEAVE_ALT: &str = "\x1b[?1049l";
    const SHOW_CURSOR: &str = "\x1b[?25h";

    #[test]
    fn test_restore_happens_once() {
        let buffer = SharedBuffer::new();
        let mut screen = Screen::with_size(buffer.clone(), 80, 24);

        screen.restore().unwrap();
        assert!(buffer.contents().is_empty());

        screen.enter().unwrap();
        assert!(screen.is_active());
        assert!(buffer.contents().contains(ENTER_ALT));

        screen.restore().unwrap();
        screen.restore().unwrap();
        drop(screen);

        let output = buffer.contents();
        assert_eq!(output.matches(LEAVE_ALT).count(), 1);
        assert_eq!(output.matches(SHOW_CURSOR).count(), 1);
    }

    #[test]
    fn test_drop_restores_terminal() {
        let buffer = SharedBuffer::new();
        {
            let mut screen = Screen::with_size(buffer.clone(), 80, 24);
            screen.enter().unwrap();
        }
        assert!(buffer.contents().ends_with(LEAVE_ALT));
    }

    #[test]
    fn test_draw_clips_to_rows() {
        let buffer = SharedBuffer::new();
        let mut screen = Screen::with_size(buffer.clone(), 20, 2);
        let lines = vec!["first".to_string(), "second".to_string(), "third".to_string()];
        screen.draw(&lines).unwrap();

        let output = buffer.contents();
        assert!(output.contains("first"));
        assert!(output.contains("second"));
        assert!(!output.contains("third"));
        assert_eq!(screen.size(), (20, 2));
    }
}
