//! The state a board tracks and how requests change it.
//!
//! Two boards share one contract: validate the identifier from the request against a
//! closed set, ignore the request if it is unknown, otherwise apply the transition and
//! keep the result in range. Unknown identifiers still get the current page back.

mod history;
pub mod occupancy;
pub mod presence;

use core::fmt;

pub use history::{History, HISTORY_CAPACITY, HISTORY_ENTRY_LEN};
pub use occupancy::OccupancyBoard;
pub use presence::PresenceBoard;

use crate::query;
use crate::ssd1306::Framebuffer;

/// Result of applying a request to a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Unchanged,
    Changed,
}

impl Outcome {
    pub fn is_changed(self) -> bool {
        self == Outcome::Changed
    }
}

/// Time of an event, as whole seconds since boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Timestamp {
    secs: u64,
}

impl Timestamp {
    pub const fn from_secs(secs: u64) -> Self {
        Timestamp { secs }
    }

    pub fn as_secs(self) -> u64 {
        self.secs
    }
}

/// Formats as `HH:MM:SS`, hours wrap at a day.
impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hours = self.secs / 3600 % 24;
        let minutes = self.secs / 60 % 60;
        let seconds = self.secs % 60;
        write!(f, "{hours:02}:{minutes:02}:{seconds:02}")
    }
}

pub trait Board {
    /// Query fragments that make a request line actionable, e.g. `"user="`.
    const KEYS: &'static [&'static str];

    /// Extra response header lines, each terminated by CRLF.
    const EXTRA_HEADERS: &'static str = "";

    /// Whether `line` carries any of [`Board::KEYS`].
    fn recognizes(line: &str) -> bool {
        Self::KEYS.iter().any(|key| query::contains(line, key))
    }

    /// Apply the parameters found in a request line.
    fn apply(&mut self, line: &str, now: Timestamp) -> Outcome;

    /// Whether anybody is present, drives the indicator color.
    fn occupied(&self) -> bool;

    /// Write the HTML page describing the current state.
    fn render_page<W: fmt::Write>(&self, out: &mut W) -> fmt::Result;

    /// Draw the status lines. The framebuffer has already been cleared.
    fn draw(&self, fb: &mut Framebuffer);
}
