//! `:name` filter blocks.
//!
//! A filter rewrites its own node and subtree in place. Generated markup
//! and raw bodies are prefixed with `\` so emission passes them through
//! untouched.

use crate::arena::Arena;
use crate::error::CoreError;
use crate::flatten::flatten;
use crate::interpolate;
use crate::line::{Chain, Line};
use crate::options::Options;
use crate::preserve;
use crate::scan;
use crate::script::ScriptEvaluator;
use crate::tree::{self, Node, NodeId};

const RAW: &str = "\\";
const ESCAPED: &str = "&";

/// Wrapper lines of a raw-body filter.
struct Wrapper {
    open: &'static str,
    close: &'static str,
    /// XHTML open line and comment-guarded CDATA markers.
    xhtml: Option<(&'static str, &'static str, &'static str)>,
}

const CSS: Wrapper = Wrapper {
    open: "\\<style>\n",
    close: "\\</style>\n",
    xhtml: Some((
        "\\<style type='text/css'>\n",
        "\\/*<![CDATA[*/\n",
        "\\/*]]>*/\n",
    )),
};

const JAVASCRIPT: Wrapper = Wrapper {
    open: "\\<script>\n",
    close: "\\</script>\n",
    xhtml: Some((
        "\\<script type='text/javascript'>\n",
        "\\//<![CDATA[\n",
        "\\//]]>\n",
    )),
};

const CDATA: Wrapper = Wrapper {
    open: "\\<![CDATA[\n",
    close: "\\]]>\n",
    xhtml: None,
};

/// Applies the filter named on `id`'s line.
///
/// Returns the last node the filter produced; traversal continues with its
/// next sibling and never enters the filter's subtree.
pub(crate) fn apply(
    arena: &mut Arena,
    id: NodeId,
    options: &Options,
    evaluator: &mut dyn ScriptEvaluator,
) -> Result<NodeId, CoreError> {
    let text = arena.content(id);
    let (start, end) = scan::token(text.as_bytes(), 1);
    let name = &text[start..end];
    log::debug!("applying filter :{name} at {id:?}");

    match name {
        "css" => Ok(wrap(arena, id, &CSS, options)),
        "javascript" => Ok(wrap(arena, id, &JAVASCRIPT, options)),
        "cdata" => Ok(wrap(arena, id, &CDATA, options)),
        "plain" => {
            plain(arena, id, options, evaluator)?;
            Ok(id)
        }
        "escaped" => {
            escaped(arena, id, options);
            Ok(id)
        }
        "preserve" => {
            preserve(arena, id, evaluator)?;
            Ok(id)
        }
        _ => Err(CoreError::UnknownFilter(name.to_string())),
    }
}

fn set_content(arena: &mut Arena, id: NodeId, text: &'static str) {
    let slice = arena.literal(text);
    arena.node_mut(id).line.content = Chain::single(slice);
}

fn prefix_all(arena: &mut Arena, first: Option<NodeId>, marker: &'static str) {
    let slice = arena.literal(marker);
    for id in tree::descendants(arena, first) {
        let content = &mut arena.node_mut(id).line.content;
        if !content.is_empty() {
            content.prepend(slice);
        }
    }
}

fn wrap(arena: &mut Arena, id: NodeId, wrapper: &Wrapper, options: &Options) -> NodeId {
    let indent = arena.node(id).line.indent;
    let body = arena.node(id).subtree;
    prefix_all(arena, body, RAW);

    match wrapper.xhtml.filter(|_| options.is_xhtml()) {
        Some((open, guard_open, guard_close)) => {
            set_content(arena, id, open);
            let close_slice = arena.literal(guard_close);
            let close = arena.alloc_node(Node::new(Line::new(indent, close_slice)));
            let open_slice = arena.literal(guard_open);
            let guard = arena.alloc_node(Node {
                line: Line::new(indent, open_slice),
                subtree: body,
                next: Some(close),
            });
            arena.node_mut(id).subtree = Some(guard);
            tree::indent_by(arena, Some(guard), options.indent_width());
        }
        None => set_content(arena, id, wrapper.open),
    }

    let close = arena.literal(wrapper.close);
    tree::insert_after(arena, id, Line::new(indent, close))
}

fn clear(arena: &mut Arena, id: NodeId) {
    arena.node_mut(id).line.content = Chain::new();
}

fn plain(
    arena: &mut Arena,
    id: NodeId,
    options: &Options,
    evaluator: &mut dyn ScriptEvaluator,
) -> Result<(), CoreError> {
    clear(arena, id);
    let body = arena.node(id).subtree;
    tree::dedent_by(arena, body, options.indent_width());

    let raw = arena.literal(RAW);
    for child in tree::descendants(arena, body) {
        let text = arena.content(child);
        if text.is_empty() {
            continue;
        }
        if scan::has_dynamic_part(text.as_bytes(), 0) {
            let resolved = interpolate::interpolate(&text, evaluator)?;
            let slice = arena.intern(&format!("{RAW}{resolved}"));
            arena.node_mut(child).line.content = Chain::single(slice);
        } else {
            arena.node_mut(child).line.content.prepend(raw);
        }
    }
    Ok(())
}

fn escaped(arena: &mut Arena, id: NodeId, options: &Options) {
    clear(arena, id);
    let body = arena.node(id).subtree;
    tree::dedent_by(arena, body, options.indent_width());
    prefix_all(arena, body, ESCAPED);
}

fn preserve(
    arena: &mut Arena,
    id: NodeId,
    evaluator: &mut dyn ScriptEvaluator,
) -> Result<(), CoreError> {
    let Some(first) = arena.node(id).subtree else {
        clear(arena, id);
        return Ok(());
    };
    let depth = arena.node(first).line.indent;
    tree::dedent_by(arena, Some(first), depth);
    let body = interpolate::interpolate(&flatten(arena, Some(first)), evaluator)?;
    let slice = arena.intern(&format!("{RAW}{}", preserve::preserve_block(&body)));

    let node = arena.node_mut(id);
    node.line = Line::new(0, slice);
    node.subtree = None;
    Ok(())
}
