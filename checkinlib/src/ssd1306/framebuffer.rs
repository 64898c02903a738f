use core::fmt;

use super::font::{Glyph, GLYPH_WIDTH};
use super::{CONTROL_DATA, FRAMEBUFFER_CAPACITY, PAGE_HEIGHT};
use crate::config::geometry_fits;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayError {
    /// Width or height does not fit the framebuffer, or height is not a whole number of pages
    Geometry { width: u8, height: u8 },
}

impl fmt::Display for DisplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayError::Geometry { width, height } => {
                write!(f, "unsupported display geometry {width}x{height}")
            }
        }
    }
}

/// Column and page rectangle addressed by one transfer, bounds inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderArea {
    pub start_col: u8,
    pub end_col: u8,
    pub start_page: u8,
    pub end_page: u8,
}

impl RenderArea {
    pub const fn new(start_col: u8, end_col: u8, start_page: u8, end_page: u8) -> Self {
        RenderArea {
            start_col,
            end_col,
            start_page,
            end_page,
        }
    }

    /// Number of pixel bytes the area covers.
    pub fn buflen(&self) -> usize {
        let cols = (self.end_col as usize + 1).saturating_sub(self.start_col as usize);
        let pages = (self.end_page as usize + 1).saturating_sub(self.start_page as usize);
        cols * pages
    }
}

/// Page organised 1 bit per pixel buffer.
///
/// Byte 0 is the data control byte, so `as_bytes` can go over the bus as a single transfer.
/// Pixel `(x, page)` lives at `1 + page * width + x`.
pub struct Framebuffer {
    width: u8,
    height: u8,
    pages: u8,
    bufsize: usize,
    buffer: [u8; FRAMEBUFFER_CAPACITY],
}

impl Framebuffer {
    pub fn new(width: u8, height: u8) -> Result<Self, DisplayError> {
        if !geometry_fits(width, height) {
            return Err(DisplayError::Geometry { width, height });
        }
        let pages = height / PAGE_HEIGHT as u8;
        let mut buffer = [0; FRAMEBUFFER_CAPACITY];
        buffer[0] = CONTROL_DATA;
        Ok(Framebuffer {
            width,
            height,
            pages,
            bufsize: pages as usize * width as usize + 1,
            buffer,
        })
    }

    pub fn width(&self) -> u8 {
        self.width
    }

    pub fn height(&self) -> u8 {
        self.height
    }

    pub fn pages(&self) -> u8 {
        self.pages
    }

    /// Live length of the buffer, including the control byte.
    pub fn bufsize(&self) -> usize {
        self.bufsize
    }

    /// Control byte followed by all pixel bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer[..self.bufsize]
    }

    pub fn pixels(&self) -> &[u8] {
        &self.buffer[1..self.bufsize]
    }

    pub fn full_area(&self) -> RenderArea {
        RenderArea::new(0, self.width - 1, 0, self.pages - 1)
    }

    /// Whether `area` lies inside the panel.
    pub fn contains(&self, area: &RenderArea) -> bool {
        area.start_col <= area.end_col
            && area.end_col < self.width
            && area.start_page <= area.end_page
            && area.end_page < self.pages
    }

    /// Zero every pixel. Nothing is transmitted.
    pub fn clear(&mut self) {
        self.buffer[1..self.bufsize].fill(0);
    }

    /// Draw one glyph with its top left corner at `(x, y)`, `y` is rounded down to a page.
    /// Positions where the glyph would not fit are ignored.
    pub fn draw_char(&mut self, x: u32, y: u32, ch: char) {
        let fits = |pos: u32, extent: usize, limit: u8| {
            pos.checked_add(extent as u32).is_some_and(|end| end <= limit as u32)
        };
        if !fits(x, GLYPH_WIDTH, self.width) || !fits(y, PAGE_HEIGHT, self.height) {
            return;
        }
        let start = 1 + (y as usize / PAGE_HEIGHT) * self.width as usize + x as usize;
        self.buffer[start..start + GLYPH_WIDTH].copy_from_slice(Glyph::from_char(ch).columns());
    }

    /// Draw `text` left to right from `(x, y)`. Does not wrap, characters past the edge are dropped.
    pub fn draw_str(&mut self, x: u32, y: u32, text: &str) {
        let mut x = x;
        for ch in text.chars() {
            self.draw_char(x, y, ch);
            x = x.saturating_add(GLYPH_WIDTH as u32);
        }
    }

    /// Copy the pixel bytes of `area` row by row into `out`, returns the number of bytes written.
    pub(crate) fn copy_area(&self, area: &RenderArea, out: &mut [u8]) -> usize {
        let width = self.width as usize;
        let cols = area.start_col as usize..=area.end_col as usize;
        let mut written = 0;
        for page in area.start_page as usize..=area.end_page as usize {
            let row = 1 + page * width;
            let src = &self.buffer[row + *cols.start()..=row + *cols.end()];
            out[written..written + src.len()].copy_from_slice(src);
            written += src.len();
        }
        written
    }
}
