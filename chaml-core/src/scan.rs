//! Byte-level scanning helpers shared by the passes.
//!
//! All positions are byte offsets into `&[u8]` views of UTF-8 text. Every
//! delimiter the passes look for is ASCII, so offsets returned here always
//! fall on character boundaries.

pub(crate) fn is_blank(ch: u8) -> bool {
    matches!(ch, b' ' | b'\t' | b'\n' | b'\r')
}

/// Bytes that end a tag, class, id or filter name.
pub(crate) fn is_delimiter(ch: u8) -> bool {
    is_blank(ch)
        || matches!(
            ch,
            b'.' | b'#' | b'{' | b'}' | b'(' | b')' | b'=' | b'~' | b'<' | b'>' | b'/'
        )
}

/// First non-blank position at or after `from`.
pub(crate) fn first_valid(bytes: &[u8], from: usize) -> Option<usize> {
    (from..bytes.len()).find(|&index| !is_blank(bytes[index]))
}

/// First delimiter at or after `from`, or `bytes.len()`.
pub(crate) fn first_invalid(bytes: &[u8], from: usize) -> usize {
    (from..bytes.len())
        .find(|&index| is_delimiter(bytes[index]))
        .unwrap_or(bytes.len())
}

/// Name token starting at the first non-blank byte at or after `from`.
///
/// Returns `(start, end)`; both equal `bytes.len()` when nothing is left.
pub(crate) fn token(bytes: &[u8], from: usize) -> (usize, usize) {
    match first_valid(bytes, from) {
        Some(start) => (start, first_invalid(bytes, start + 1)),
        None => (bytes.len(), bytes.len()),
    }
}

/// Whitespace-delimited word starting at the first non-blank byte.
pub(crate) fn word(bytes: &[u8], from: usize) -> (usize, usize) {
    match first_valid(bytes, from) {
        Some(start) => {
            let end = (start..bytes.len())
                .find(|&index| is_blank(bytes[index]))
                .unwrap_or(bytes.len());
            (start, end)
        }
        None => (bytes.len(), bytes.len()),
    }
}

/// Start of the remaining text after skipping blanks.
pub(crate) fn rest_start(bytes: &[u8], from: usize) -> usize {
    first_valid(bytes, from).unwrap_or(bytes.len())
}

/// Position of the first `target` at or after `from` not preceded by `\`.
pub(crate) fn find_unescaped(bytes: &[u8], from: usize, target: u8) -> Option<usize> {
    let mut index = from;
    while index < bytes.len() {
        match bytes[index] {
            b'\\' => index += 2,
            ch if ch == target => return Some(index),
            _ => index += 1,
        }
    }
    None
}

/// Skips the `<>/=~` option bytes that may follow a tag.
///
/// Returns the position of the last `=` or `~`, which marks an evaluated rest.
pub(crate) fn skip_tag_options(bytes: &[u8], index: &mut usize) -> Option<usize> {
    let mut evaluated = None;
    while let Some(&ch) = bytes.get(*index) {
        match ch {
            b'=' | b'~' => evaluated = Some(*index),
            b'<' | b'>' | b'/' => {}
            _ => break,
        }
        *index += 1;
    }
    evaluated
}

/// Whether the text contains `\` or `#{` at or after `from`.
pub(crate) fn has_dynamic_part(bytes: &[u8], from: usize) -> bool {
    bytes
        .get(from..)
        .is_some_and(|tail| tail.iter().enumerate().any(|(index, &ch)| {
            ch == b'\\' || (ch == b'#' && tail.get(index + 1) == Some(&b'{'))
        }))
}

pub(crate) fn chomp(text: &str) -> &str {
    text.trim_end_matches(['\n', '\r'])
}

/// Bracket and quote tracker.
///
/// `(`, `{` and `[` open a level, their counterparts close one; quotes
/// suspend bracket counting until the matching quote, honouring `\` escapes.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct Nesting {
    depth: i32,
    quote: Option<u8>,
    escaped: bool,
}

impl Nesting {
    pub(crate) fn feed(&mut self, ch: u8) {
        if let Some(quote) = self.quote {
            if self.escaped {
                self.escaped = false;
            } else if ch == b'\\' {
                self.escaped = true;
            } else if ch == quote {
                self.quote = None;
            }
            return;
        }
        match ch {
            b'(' | b'{' | b'[' => self.depth += 1,
            b')' | b'}' | b']' => self.depth -= 1,
            b'\'' | b'"' => self.quote = Some(ch),
            _ => {}
        }
    }

    pub(crate) fn is_open(&self) -> bool {
        self.depth > 0 || self.quote.is_some()
    }
}

/// One past the bracket that closes the one at `open`, or `bytes.len()`.
pub(crate) fn balanced_end(bytes: &[u8], open: usize) -> usize {
    let mut nesting = Nesting::default();
    for (offset, &ch) in bytes.iter().enumerate().skip(open) {
        nesting.feed(ch);
        if !nesting.is_open() {
            return offset + 1;
        }
    }
    bytes.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_stops_at_delimiters() {
        let text = b"%div.box{a: 1}";
        assert_eq!(token(text, 0), (0, 4));
        assert_eq!(token(b"  :plain\n", 1), (2, 8));
        assert_eq!(token(b"   ", 0), (3, 3));
    }

    #[test]
    fn find_unescaped_skips_backslashed_targets() {
        assert_eq!(find_unescaped(br"a\}b}", 0, b'}'), Some(4));
        assert_eq!(find_unescaped(b"abc", 0, b'}'), None);
    }

    #[test]
    fn tag_options_report_the_evaluated_marker() {
        let text = b"%p<= value";
        let mut index = 2;
        assert_eq!(skip_tag_options(text, &mut index), Some(3));
        assert_eq!(index, 4);

        let mut index = 3;
        assert_eq!(skip_tag_options(b"%br/\n", &mut index), None);
        assert_eq!(index, 4);
    }

    #[test]
    fn dynamic_parts_are_backslash_or_interpolation() {
        assert!(has_dynamic_part(b"a #{b}", 0));
        assert!(has_dynamic_part(br"a \b", 0));
        assert!(!has_dynamic_part(b"a # {b}", 0));
        assert!(!has_dynamic_part(b"#{b}", 9));
    }

    #[test]
    fn balanced_end_honours_quotes() {
        let text = br#"{a: "}", b: [1]} rest"#;
        assert_eq!(balanced_end(text, 0), 16);
        assert_eq!(balanced_end(b"{open", 0), 5);
    }

    #[test]
    fn nesting_tracks_escaped_quotes() {
        let mut nesting = Nesting::default();
        for &ch in br#"('a\'b'"#.iter() {
            nesting.feed(ch);
        }
        assert!(nesting.is_open());
        nesting.feed(b')');
        assert!(!nesting.is_open());
    }
}
