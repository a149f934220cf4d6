//! HTML entity escaping.

use std::borrow::Cow;

use crate::arena::{Arena, Slice};
use crate::line::Chain;

fn entity(byte: u8) -> Option<&'static str> {
    match byte {
        b'&' => Some("&amp;"),
        b'>' => Some("&gt;"),
        b'<' => Some("&lt;"),
        b'"' => Some("&quot;"),
        _ => None,
    }
}

/// Escapes `&`, `>`, `<` and `"`; text without them is returned borrowed.
pub fn escape_html(text: &str) -> Cow<'_, str> {
    if !text.bytes().any(|byte| entity(byte).is_some()) {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len() + 8);
    for ch in text.chars() {
        match u8::try_from(ch).ok().and_then(entity) {
            Some(replacement) => out.push_str(replacement),
            None => out.push(ch),
        }
    }
    Cow::Owned(out)
}

/// Escapes a pooled slice into a chain without copying the plain runs.
///
/// The slice is split at every escapable byte; plain runs stay views into
/// the pool and each escapable byte becomes an interned entity.
pub fn escape_slice(arena: &mut Arena, slice: Slice) -> Chain {
    let positions: Vec<(usize, &'static str)> = arena
        .str(slice)
        .bytes()
        .enumerate()
        .filter_map(|(index, byte)| entity(byte).map(|replacement| (index, replacement)))
        .collect();

    let mut chain = Chain::new();
    let mut run_start = 0;
    for (index, replacement) in positions {
        chain.push(slice.sub(run_start, index));
        chain.push(arena.literal(replacement));
        run_start = index + 1;
    }
    chain.push(slice.sub(run_start, slice.len()));
    chain
}
