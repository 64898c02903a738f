//! Fixed 8x8 glyph table for uppercase letters and digits.
//!
//! Every glyph is 8 column bytes, least significant bit at the top of the page.

/// Width in pixels of every glyph, which is also the cursor advance.
pub const GLYPH_WIDTH: usize = 8;

/// Characters the table can draw. Anything else renders as [`Glyph::Blank`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Glyph {
    Blank,
    Letter(u8),
    Digit(u8),
}

impl Glyph {
    /// Case-insensitive lookup, `'a'` and `'A'` map to the same glyph.
    pub fn from_char(ch: char) -> Self {
        match ch.to_ascii_uppercase() {
            c @ 'A'..='Z' => Glyph::Letter(c as u8 - b'A'),
            c @ '0'..='9' => Glyph::Digit(c as u8 - b'0'),
            _ => Glyph::Blank,
        }
    }

    pub fn columns(self) -> &'static [u8; GLYPH_WIDTH] {
        let index = match self {
            Glyph::Blank => 0,
            Glyph::Letter(n) => 1 + n as usize,
            Glyph::Digit(n) => 27 + n as usize,
        };
        FONT.get(index).unwrap_or(&FONT[0])
    }
}

const FONT: [[u8; GLYPH_WIDTH]; 37] = [
    [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00], // blank
    [0x00, 0x7e, 0x09, 0x09, 0x09, 0x7e, 0x00, 0x00], // A
    [0x00, 0x7f, 0x49, 0x49, 0x49, 0x36, 0x00, 0x00], // B
    [0x00, 0x3e, 0x41, 0x41, 0x41, 0x22, 0x00, 0x00], // C
    [0x00, 0x7f, 0x41, 0x41, 0x22, 0x1c, 0x00, 0x00], // D
    [0x00, 0x7f, 0x49, 0x49, 0x49, 0x41, 0x00, 0x00], // E
    [0x00, 0x7f, 0x09, 0x09, 0x09, 0x01, 0x00, 0x00], // F
    [0x00, 0x3e, 0x41, 0x49, 0x49, 0x7a, 0x00, 0x00], // G
    [0x00, 0x7f, 0x08, 0x08, 0x08, 0x7f, 0x00, 0x00], // H
    [0x00, 0x00, 0x41, 0x7f, 0x41, 0x00, 0x00, 0x00], // I
    [0x00, 0x20, 0x40, 0x41, 0x3f, 0x01, 0x00, 0x00], // J
    [0x00, 0x7f, 0x08, 0x14, 0x22, 0x41, 0x00, 0x00], // K
    [0x00, 0x7f, 0x40, 0x40, 0x40, 0x40, 0x00, 0x00], // L
    [0x00, 0x7f, 0x02, 0x0c, 0x02, 0x7f, 0x00, 0x00], // M
    [0x00, 0x7f, 0x04, 0x08, 0x10, 0x7f, 0x00, 0x00], // N
    [0x00, 0x3e, 0x41, 0x41, 0x41, 0x3e, 0x00, 0x00], // O
    [0x00, 0x7f, 0x09, 0x09, 0x09, 0x06, 0x00, 0x00], // P
    [0x00, 0x3e, 0x41, 0x51, 0x21, 0x5e, 0x00, 0x00], // Q
    [0x00, 0x7f, 0x09, 0x19, 0x29, 0x46, 0x00, 0x00], // R
    [0x00, 0x46, 0x49, 0x49, 0x49, 0x31, 0x00, 0x00], // S
    [0x00, 0x01, 0x01, 0x7f, 0x01, 0x01, 0x00, 0x00], // T
    [0x00, 0x3f, 0x40, 0x40, 0x40, 0x3f, 0x00, 0x00], // U
    [0x00, 0x1f, 0x20, 0x40, 0x20, 0x1f, 0x00, 0x00], // V
    [0x00, 0x3f, 0x40, 0x38, 0x40, 0x3f, 0x00, 0x00], // W
    [0x00, 0x63, 0x14, 0x08, 0x14, 0x63, 0x00, 0x00], // X
    [0x00, 0x07, 0x08, 0x70, 0x08, 0x07, 0x00, 0x00], // Y
    [0x00, 0x61, 0x51, 0x49, 0x45, 0x43, 0x00, 0x00], // Z
    [0x00, 0x3e, 0x51, 0x49, 0x45, 0x3e, 0x00, 0x00], // 0
    [0x00, 0x00, 0x42, 0x7f, 0x40, 0x00, 0x00, 0x00], // 1
    [0x00, 0x42, 0x61, 0x51, 0x49, 0x46, 0x00, 0x00], // 2
    [0x00, 0x21, 0x41, 0x45, 0x4b, 0x31, 0x00, 0x00], // 3
    [0x00, 0x18, 0x14, 0x12, 0x7f, 0x10, 0x00, 0x00], // 4
    [0x00, 0x27, 0x45, 0x45, 0x45, 0x39, 0x00, 0x00], // 5
    [0x00, 0x3c, 0x4a, 0x49, 0x49, 0x30, 0x00, 0x00], // 6
    [0x00, 0x01, 0x71, 0x09, 0x05, 0x03, 0x00, 0x00], // 7
    [0x00, 0x36, 0x49, 0x49, 0x49, 0x36, 0x00, 0x00], // 8
    [0x00, 0x06, 0x49, 0x49, 0x29, 0x1e, 0x00, 0x00], // 9
];
