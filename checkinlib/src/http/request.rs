use crate::board::Board;

/// Bytes of a request that are looked at, the rest is dropped.
pub const REQUEST_BUFFER_LEN: usize = 1024;
/// Longest request line that is considered.
pub const REQUEST_LINE_LEN: usize = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route<'a> {
    /// The bare index page, state is rendered unmodified
    Index,
    /// A request line carrying at least one parameter the board knows
    Query(&'a str),
    NotFound,
}

/// First line of a request, skipping leading line breaks.
/// Invalid UTF-8 ends the line early, a request without text has no line.
pub fn first_line(request: &[u8]) -> Option<&str> {
    let text = match core::str::from_utf8(request) {
        Ok(text) => text,
        Err(e) => core::str::from_utf8(&request[..e.valid_up_to()]).unwrap_or_default(),
    };
    let line = text.split(['\r', '\n']).find(|line| !line.is_empty())?;

    let mut end = line.len().min(REQUEST_LINE_LEN);
    while !line.is_char_boundary(end) {
        end -= 1;
    }
    Some(&line[..end])
}

pub fn is_get(line: &str) -> bool {
    line.starts_with("GET")
}

pub fn route<B: Board>(line: &str) -> Route<'_> {
    if B::recognizes(line) {
        Route::Query(line)
    } else if line == "GET / HTTP/1.1" || line == "GET /" {
        Route::Index
    } else {
        Route::NotFound
    }
}
