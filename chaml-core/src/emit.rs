//! Emission pass: rewrites structural markers into markup.
//!
//! Runs after resolution, so every line is either markup syntax (`%tag`,
//! `/`, `!!!`) or text carrying an optional `\`, `&` or `!` marker.
//! Children are converted before their parent and a chain's siblings
//! last-to-first, so a `>` flag is known before the line it trims.

use std::borrow::Cow;

use crate::arena::Arena;
use crate::doctype;
use crate::escape::{escape_html, escape_slice};
use crate::line::{Chain, Line};
use crate::options::Options;
use crate::preserve;
use crate::scan;
use crate::tree::{self, NodeId};

/// Elements without closing tags.
pub const VOID_TAGS: [&str; 13] = [
    "br", "hr", "img", "col", "meta", "link", "area", "base", "input", "param", "frame",
    "isindex", "basefont",
];

pub fn is_void_tag(name: &str) -> bool {
    VOID_TAGS.contains(&name)
}

/// Converts every node reachable from `first`.
pub fn emit(arena: &mut Arena, first: Option<NodeId>, options: &Options) {
    let mut emitter = Emitter { arena, options };
    emitter.chain(first);
}

struct Emitter<'a> {
    arena: &'a mut Arena,
    options: &'a Options,
}

impl Emitter<'_> {
    /// Converts a sibling chain; returns whether its first node trims the
    /// whitespace before it.
    fn chain(&mut self, first: Option<NodeId>) -> bool {
        let mut next_gt = false;
        for id in tree::siblings(self.arena, first).into_iter().rev() {
            next_gt = self.node(id, next_gt);
        }
        next_gt
    }

    fn node(&mut self, id: NodeId, next_gt: bool) -> bool {
        let original_next = self.arena.node(id).next;
        let child_gt = self.chain(self.arena.node(id).subtree);
        let gt = self.convert(id);

        if child_gt {
            self.arena.chomp_node(id);
            let children = self.arena.node(id).subtree;
            tree::dedent_by(self.arena, children, self.options.indent_width());
        }
        if next_gt && !self.chomp_last_line(id, original_next) {
            return true;
        }
        gt
    }

    /// Chomps the last non-empty line from `id` up to `end`. Returns false
    /// when every line in that span was cleared.
    fn chomp_last_line(&mut self, id: NodeId, end: Option<NodeId>) -> bool {
        let mut span = Vec::new();
        let mut cursor = Some(id);
        while let Some(node) = cursor.filter(|&node| Some(node) != end) {
            span.push(node);
            let children = self.arena.node(node).subtree;
            span.extend(tree::descendants(self.arena, children));
            cursor = self.arena.node(node).next;
        }
        let last = span
            .into_iter()
            .rev()
            .find(|&node| !self.arena.node(node).line.content.is_empty());
        match last {
            Some(last) => {
                self.arena.chomp_node(last);
                true
            }
            None => false,
        }
    }

    fn convert(&mut self, id: NodeId) -> bool {
        let slice = self.arena.connect_node(id);
        let text = self.arena.str(slice).to_string();
        let bytes = text.as_bytes();

        match bytes.first() {
            None => {}
            Some(b'!') if text.starts_with("!!!") => {
                let line = doctype::doctype_line(&text, self.options.format);
                self.set_text(id, &line);
            }
            Some(b'!') => self.set_chain(id, Chain::single(slice.skip(marker_end(bytes)))),
            Some(b'%') => return self.convert_tag(id, &text),
            Some(b'/') => self.convert_comment(id, &text),
            Some(b'\\') => self.set_chain(id, Chain::single(slice.skip(1))),
            Some(b'&') => {
                let chain = escape_slice(self.arena, slice.skip(marker_end(bytes)));
                self.set_chain(id, chain);
            }
            Some(_) if self.options.escape_html => {
                let chain = escape_slice(self.arena, slice);
                self.set_chain(id, chain);
            }
            Some(_) => {}
        }
        false
    }

    fn set_chain(&mut self, id: NodeId, chain: Chain) {
        self.arena.node_mut(id).line.content = chain;
    }

    fn set_text(&mut self, id: NodeId, text: &str) {
        let slice = self.arena.intern(text);
        self.set_chain(id, Chain::single(slice));
    }

    fn insert_close(&mut self, id: NodeId, indent: usize, text: &str) {
        let slice = self.arena.intern(text);
        tree::insert_after(self.arena, id, Line::new(indent, slice));
    }

    /// Chomps the last line emitted inside `id`.
    fn chomp_last_child(&mut self, id: NodeId) {
        let children = self.arena.node(id).subtree;
        if let Some(&last) = tree::descendants(self.arena, children).last() {
            self.arena.chomp_node(last);
        }
    }

    /// `%tag{attrs}opts rest`; returns whether the tag carries `>`.
    fn convert_tag(&mut self, id: NodeId, text: &str) -> bool {
        let bytes = text.as_bytes();
        let name_end = scan::first_invalid(bytes, 1);
        let name = &text[1..name_end];
        let mut index = name_end;

        let mut attributes = String::new();
        if bytes.get(index) == Some(&b'{') {
            let close = scan::find_unescaped(bytes, index + 1, b'}').unwrap_or(bytes.len());
            attributes = unescape_attributes(&text[index + 1..close]);
            index = (close + 1).min(bytes.len());
        }

        let (mut explicit_void, mut lt, mut gt) = (false, false, false);
        while let Some(&ch) = bytes.get(index) {
            match ch {
                b'/' => explicit_void = true,
                b'<' => lt = true,
                b'>' => gt = true,
                _ => break,
            }
            index += 1;
        }

        let rest = scan::chomp(&text[scan::rest_start(bytes, index)..]);
        let rest = if self.options.escape_html {
            escape_html(rest)
        } else {
            rest.into()
        };

        let void = explicit_void || is_void_tag(name);
        let preserve = preserve::is_preserve_tag(name);
        let newline = if gt { "" } else { "\n" };
        let mut open = format!("<{name}{attributes}");
        open.push_str(if void && self.options.is_xhtml() { " />" } else { ">" });
        open.push_str(&rest);

        let subtree = self.arena.node(id).subtree;
        if void {
            open.push_str(newline);
            self.set_text(id, &open);
        } else if subtree.is_some() {
            if !(lt || preserve) {
                open.push('\n');
            }
            self.set_text(id, &open);

            let width = self.options.indent_width();
            if lt {
                tree::dedent_by(self.arena, subtree, width);
                self.chomp_last_child(id);
                if let Some(child) = subtree {
                    self.arena.node_mut(child).line.indent = 0;
                }
            }
            if preserve {
                tree::clear_indents(self.arena, subtree);
                self.chomp_last_child(id);
            }

            let line = &mut self.arena.node_mut(id).line;
            let mut close_indent = if lt || preserve { 0 } else { line.indent };
            if gt {
                line.indent = line.indent.saturating_sub(width);
                close_indent = close_indent.saturating_sub(width);
            }
            self.insert_close(id, close_indent, &format!("</{name}>{newline}"));
        } else {
            open.push_str(&format!("</{name}>{newline}"));
            self.set_text(id, &open);
        }
        log::trace!("{id:?}: <{name}> void={void} lt={lt} gt={gt}");
        gt
    }

    fn convert_comment(&mut self, id: NodeId, text: &str) {
        let bytes = text.as_bytes();
        let indent = self.arena.node(id).line.indent;
        let has_children = self.arena.node(id).subtree.is_some();

        if bytes.get(1) == Some(&b'[') {
            let body = scan::chomp(text);
            let close = body.find(']').map_or(body.len(), |close| close + 1);
            let condition = &body[1..close];
            let rest = self.comment_text(body[close..].trim_start_matches([' ', '\t']));
            if has_children {
                self.set_text(id, &format!("<!--{condition}>\n"));
                self.insert_close(id, indent, "<![endif]-->\n");
            } else {
                self.set_text(id, &format!("<!--{condition}> {rest} <![endif]-->\n"));
            }
            return;
        }

        if has_children {
            self.set_text(id, "<!--\n");
            self.insert_close(id, indent, "-->\n");
        } else {
            let rest = self.comment_text(scan::chomp(&text[scan::rest_start(bytes, 1)..]));
            self.set_text(id, &format!("<!-- {rest} -->\n"));
        }
    }

    fn comment_text<'t>(&self, rest: &'t str) -> Cow<'t, str> {
        if self.options.escape_html {
            escape_html(rest)
        } else {
            rest.into()
        }
    }
}

/// End of a `&`/`!` marker and the spaces after it.
fn marker_end(bytes: &[u8]) -> usize {
    1 + bytes[1..]
        .iter()
        .take_while(|&&ch| ch == b' ' || ch == b'\t')
        .count()
}

fn unescape_attributes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => out.extend(chars.next()),
            other => out.push(other),
        }
    }
    out
}
