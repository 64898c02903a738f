//! Derived outputs: the RGB indicator and the panel contents.

use crate::board::Board;
use crate::ssd1306::Framebuffer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indicator {
    Occupied,
    Empty,
}

/// Pin levels for the RGB LED, `true` is lit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RgbLevels {
    pub red: bool,
    pub green: bool,
    pub blue: bool,
}

impl Indicator {
    pub fn levels(self) -> RgbLevels {
        match self {
            Indicator::Occupied => RgbLevels {
                red: false,
                green: true,
                blue: false,
            },
            Indicator::Empty => RgbLevels {
                red: true,
                green: false,
                blue: false,
            },
        }
    }
}

pub fn indicator<B: Board>(board: &B) -> Indicator {
    if board.occupied() {
        Indicator::Occupied
    } else {
        Indicator::Empty
    }
}

/// Redraw the whole panel from the board state.
pub fn compose<B: Board>(board: &B, fb: &mut Framebuffer) {
    fb.clear();
    board.draw(fb);
}
