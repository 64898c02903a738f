use core::fmt;
use core::fmt::Write;

use crate::board::Board;

/// Largest response the renderer produces.
pub const RESPONSE_CAPACITY: usize = 4096;

pub type Response = heapless::String<RESPONSE_CAPACITY>;

pub const NOT_FOUND: &str = "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";

const OK_HEADERS: &str = "HTTP/1.1 200 OK\r\n\
                          Content-Type: text/html; charset=UTF-8\r\n\
                          Connection: close\r\n";

/// The page did not fit in [`RESPONSE_CAPACITY`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderError;

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "response exceeds {RESPONSE_CAPACITY} bytes")
    }
}

/// Render the full `200 OK` response for the current state of `board`.
pub fn render_page<B: Board>(board: &B, out: &mut Response) -> Result<(), RenderError> {
    out.clear();
    write_page(board, out).map_err(|_| RenderError)
}

fn write_page<B: Board>(board: &B, out: &mut Response) -> fmt::Result {
    let mut body = ByteCounter(0);
    board.render_page(&mut body)?;

    out.write_str(OK_HEADERS)?;
    out.write_str(B::EXTRA_HEADERS)?;
    write!(out, "Content-Length: {}\r\n\r\n", body.0)?;
    board.render_page(out)
}

/// Measures rendered output without storing it.
struct ByteCounter(usize);

impl fmt::Write for ByteCounter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0 += s.len();
        Ok(())
    }
}
