//! Whitespace preservation for `pre`, `textarea` and `code`.

/// Elements whose contents keep their line breaks.
pub const PRESERVE_TAGS: [&str; 3] = ["textarea", "pre", "code"];

const NEWLINE_ENTITY: &str = "&#x000A;";

pub fn is_preserve_tag(name: &str) -> bool {
    PRESERVE_TAGS.contains(&name)
}

/// Encodes line breaks so a browser keeps them inside a single line.
///
/// `\n` becomes `&#x000A;` and `\r` is dropped.
pub fn encode_newlines(text: &str) -> String {
    text.replace('\r', "").replace('\n', NEWLINE_ENTITY)
}

/// Body of a `:preserve` filter: trailing newlines dropped, line breaks
/// encoded, one `\n` appended.
pub fn preserve_block(text: &str) -> String {
    let mut out = encode_newlines(text.trim_end_matches(['\n', '\r']));
    out.push('\n');
    out
}

/// Rewrites the contents of every preserve-tag element found in `html`.
///
/// Tag names match case-insensitively. Each element body loses one trailing
/// newline and has its line breaks encoded; everything else is copied as is.
pub fn preserve_elements(html: &str) -> String {
    let lower = html.to_ascii_lowercase();
    let mut out = String::with_capacity(html.len());
    let mut copied = 0;
    let mut search = 0;

    while let Some(offset) = lower[search..].find('<') {
        let open = search + offset;
        let Some(tag) = PRESERVE_TAGS
            .iter()
            .find(|tag| opens_element(&lower, open, tag))
        else {
            search = open + 1;
            continue;
        };
        let Some(gt) = lower[open..].find('>') else {
            break;
        };
        let body_start = open + gt + 1;
        let closing = format!("</{tag}>");
        let Some(length) = lower[body_start..].find(&closing) else {
            search = open + 1;
            continue;
        };
        let body_end = body_start + length;

        out.push_str(&html[copied..body_start]);
        let body = &html[body_start..body_end];
        let body = body
            .strip_suffix("\r\n")
            .or_else(|| body.strip_suffix('\n'))
            .unwrap_or(body);
        out.push_str(&encode_newlines(body));
        copied = body_end;
        search = body_end + closing.len();
    }

    out.push_str(&html[copied..]);
    out
}

fn opens_element(lower: &str, open: usize, tag: &str) -> bool {
    let name_start = open + 1;
    lower[name_start..].starts_with(tag)
        && matches!(
            lower.as_bytes().get(name_start + tag.len()),
            Some(b'>' | b' ' | b'\t' | b'\n' | b'\r' | b'/')
        )
}
