//! `#{}` interpolation and backslash escapes in template text.

use crate::error::ScriptError;
use crate::scan;
use crate::script::ScriptEvaluator;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Segment<'a> {
    /// Literal text with escapes already applied.
    Text(String),
    /// Code between `#{` and its closing `}`.
    Code(&'a str),
}

/// Splits text into literal and code segments.
///
/// `\x` yields `x`, except for the usual control escapes (`\n`, `\t`, ...).
/// An unterminated `#{` runs to the end of the text.
pub(crate) fn split(text: &str) -> Vec<Segment<'_>> {
    let bytes = text.as_bytes();
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut run_start = 0;
    let mut index = 0;

    while index < bytes.len() {
        match bytes[index] {
            b'\\' => {
                literal.push_str(&text[run_start..index]);
                index += 1;
                if let Some(ch) = text[index..].chars().next() {
                    literal.push(unescape(ch));
                    index += ch.len_utf8();
                }
                run_start = index;
            }
            b'#' if bytes.get(index + 1) == Some(&b'{') => {
                literal.push_str(&text[run_start..index]);
                if !literal.is_empty() {
                    segments.push(Segment::Text(std::mem::take(&mut literal)));
                }
                let end = scan::balanced_end(bytes, index + 1);
                let code_end = if end > index + 2 && bytes[end - 1] == b'}' {
                    end - 1
                } else {
                    end
                };
                segments.push(Segment::Code(&text[index + 2..code_end]));
                index = end;
                run_start = index;
            }
            _ => index += 1,
        }
    }

    literal.push_str(&text[run_start..]);
    if !literal.is_empty() {
        segments.push(Segment::Text(literal));
    }
    segments
}

fn unescape(ch: char) -> char {
    match ch {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        's' => ' ',
        '0' => '\0',
        'e' => '\u{1b}',
        other => other,
    }
}

/// Resolves every segment of `text`, evaluating code through `evaluator`.
pub(crate) fn interpolate(
    text: &str,
    evaluator: &mut dyn ScriptEvaluator,
) -> Result<String, ScriptError> {
    let mut out = String::with_capacity(text.len());
    for segment in split(text) {
        match segment {
            Segment::Text(literal) => out.push_str(&literal),
            Segment::Code(code) => out.push_str(&evaluator.evaluate(code)?.to_text()),
        }
    }
    Ok(out)
}
