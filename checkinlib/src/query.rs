/// Characters that end a parameter value inside a request line.
const VALUE_TERMINATORS: [char; 4] = ['&', ' ', '\r', '\n'];

/// Whether `needle` occurs anywhere in `line`.
pub fn contains(line: &str, needle: &str) -> bool {
    line.contains(needle)
}

/// Extract the value of `key` from a request line such as `GET /?user=joao HTTP/1.1`.
///
/// The key is found with a leftmost substring search, so it is not checked to start at a
/// parameter boundary: `xuser=1` also yields a value for `user`. If the first occurrence of
/// `key` is not directly followed by `=` the key counts as absent.
///
/// The value stops at the next `&`, space or line end, and is at most `max_len` bytes long.
pub fn extract<'a>(line: &'a str, key: &str, max_len: usize) -> Option<&'a str> {
    let start = line.find(key)? + key.len();
    let rest = line[start..].strip_prefix('=')?;

    let end = rest.find(VALUE_TERMINATORS).unwrap_or(rest.len());
    let mut end = end.min(max_len);
    while !rest.is_char_boundary(end) {
        end -= 1;
    }
    Some(&rest[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_independent_parameters() {
        assert_eq!(extract("a=1&b=2", "a", 16), Some("1"));
        assert_eq!(extract("a=1&b=2", "b", 16), Some("2"));
        assert_eq!(extract("a=1", "c", 16), None);
    }

    #[test]
    fn stops_at_space_and_line_end() {
        let line = "GET /?floor=2&action=add HTTP/1.1";
        assert_eq!(extract(line, "floor", 8), Some("2"));
        assert_eq!(extract(line, "action", 8), Some("add"));
        assert_eq!(extract("GET /?user=maria\r\nHost: x", "user", 16), Some("maria"));
    }

    #[test]
    fn key_without_equals_is_absent() {
        assert_eq!(extract("GET /user HTTP/1.1", "user", 16), None);
        // Only the first occurrence is considered.
        assert_eq!(extract("GET /user?user=joao HTTP/1.1", "user", 16), None);
    }

    #[test]
    fn match_is_not_boundary_checked() {
        assert_eq!(extract("GET /?xuser=joao HTTP/1.1", "user", 16), Some("joao"));
    }

    #[test]
    fn value_is_limited_to_max_len() {
        assert_eq!(extract("user=visitante", "user", 4), Some("visi"));
        assert_eq!(extract("user=", "user", 4), Some(""));
        // Never cuts a multi-byte character in half.
        assert_eq!(extract("user=jo\u{e3}o", "user", 3), Some("jo"));
    }

    #[test]
    fn contains_is_plain_substring() {
        assert!(contains("GET /?clear=true HTTP/1.1", "clear=true"));
        assert!(!contains("GET / HTTP/1.1", "user="));
    }
}
