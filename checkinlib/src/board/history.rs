use core::fmt;
use core::fmt::Write;

use ringbuffer::{ConstGenericRingBuffer, RingBuffer};

pub const HISTORY_CAPACITY: usize = 20;
pub const HISTORY_ENTRY_LEN: usize = 64;

pub type Entry = heapless::String<HISTORY_ENTRY_LEN>;

/// Bounded log of text records. Once full, each new record replaces the oldest one.
///
/// Replay order comes from the ring alone. The write counter is informational, for
/// callers and tests that want to know how many records were dropped.
pub struct History {
    entries: ConstGenericRingBuffer<Entry, HISTORY_CAPACITY>,
    total: u32,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    pub fn new() -> Self {
        History {
            entries: ConstGenericRingBuffer::new(),
            total: 0,
        }
    }

    /// Append a record. Text past [`HISTORY_ENTRY_LEN`] bytes is cut off.
    pub fn push(&mut self, args: fmt::Arguments<'_>) {
        let mut entry = Truncating(Entry::new());
        let _ = entry.write_fmt(args);
        self.entries.extend(core::iter::once(entry.0));
        self.total = self.total.wrapping_add(1);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.total = 0;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Records written since the last clear, including overwritten ones.
    /// Informational only, [`History::recent`] does not consult it.
    pub fn total(&self) -> u32 {
        self.total
    }

    /// Whether older records have been overwritten.
    pub fn has_wrapped(&self) -> bool {
        self.total as usize > HISTORY_CAPACITY
    }

    /// The `count` most recent records, oldest first.
    pub fn recent(&self, count: usize) -> impl Iterator<Item = &str> {
        let skip = self.entries.len().saturating_sub(count);
        self.entries.iter().skip(skip).map(|entry| entry.as_str())
    }
}

/// Keeps whatever fits and drops the rest.
struct Truncating(Entry);

impl Write for Truncating {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for ch in s.chars() {
            if self.0.push(ch).is_err() {
                break;
            }
        }
        Ok(())
    }
}
