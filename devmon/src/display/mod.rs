//! Full-screen dashboard
//!
//! Handles:
//! - Entering and restoring the terminal (alternate screen, cursor)
//! - Redrawing the whole frame on every fetch result
//! - Keeping the last good inventory on screen under an error banner

pub mod ansi;
pub mod banner;
pub mod layout;
pub mod terminal;

pub use banner::summarize_error;
pub use layout::{column_widths, extract_host, render_frame, FrameBody, FrameOptions};
pub use terminal::Screen;

use crate::error::MonitorError;
use crate::grouping::GroupedView;
use chrono::{DateTime, Local};
use std::io::{self, Write};
use tracing::debug;

/// Last successfully rendered inventory
#[derive(Debug, Clone, PartialEq)]
pub struct DisplaySnapshot {
    pub view: GroupedView,
    pub taken_at: DateTime<Local>,
}

pub struct Dashboard<W: Write> {
    screen: Screen<W>,
    options: FrameOptions,
    snapshot: Option<DisplaySnapshot>,
    last_error: Option<String>,
}

impl<W: Write> Dashboard<W> {
    pub fn new(screen: Screen<W>, options: FrameOptions) -> Self {
        Self {
            screen,
            options,
            snapshot: None,
            last_error: None,
        }
    }

    /// Enter full-screen mode. Nothing is drawn until the first result.
    pub fn start(&mut self) -> io::Result<()> {
        self.screen.enter()
    }

    pub fn render_success(&mut self, view: GroupedView) -> io::Result<()> {
        let lines = render_frame(&self.options, self.width(), Local::now(), FrameBody::Data(&view));
        self.screen.draw(&lines)?;
        self.snapshot = Some(DisplaySnapshot {
            taken_at: view.fetched_at,
            view,
        });
        self.last_error = None;
        Ok(())
    }

    pub fn render_failure(&mut self, err: &MonitorError) -> io::Result<()> {
        let label = summarize_error(&err.to_string());
        debug!("rendering failure banner: {}", label);

        let lines = render_frame(
            &self.options,
            self.width(),
            Local::now(),
            FrameBody::Failed {
                label: &label,
                last: self.snapshot.as_ref(),
            },
        );
        self.screen.draw(&lines)?;
        self.last_error = Some(label);
        Ok(())
    }

    pub fn restore(&mut self) -> io::Result<()> {
        self.screen.restore()
    }

    pub fn snapshot(&self) -> Option<&DisplaySnapshot> {
        self.snapshot.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn screen(&self) -> &Screen<W> {
        &self.screen
    }

    /// Width is re-read before every frame so resizes apply on the next redraw.
    fn width(&self) -> usize {
        self.screen.size().0 as usize
    }
}
