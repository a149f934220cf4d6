//! Indentation tree.
//!
//! Nodes form a first-child / next-sibling tree. Document order is
//! pre-order: node, then its subtree, then its next sibling.

use std::iter::Peekable;

use crate::arena::{Arena, Idx};
use crate::error::CoreError;
use crate::line::Line;

/// Deepest nesting the builder accepts.
pub const MAX_NESTING_DEPTH: usize = 512;

pub type NodeId = Idx<Node>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub line: Line,
    /// First child.
    pub subtree: Option<NodeId>,
    /// Next sibling.
    pub next: Option<NodeId>,
}

impl Node {
    pub fn new(line: Line) -> Self {
        Self {
            line,
            subtree: None,
            next: None,
        }
    }
}

/// Builds the tree for a sequence of logical lines.
///
/// A line indented deeper than the current node starts its child chain.
/// A line indented no deeper than the current node, but deeper than the
/// chain's parent, continues the chain as a sibling; a shallower one ends
/// the chain. The root level accepts every line, so no input is dropped.
pub fn build(arena: &mut Arena, lines: Vec<Line>) -> Result<Option<NodeId>, CoreError> {
    let mut builder = Builder {
        arena,
        lines: lines.into_iter().peekable(),
    };
    builder.chain(None, 0)
}

struct Builder<'a, I: Iterator<Item = Line>> {
    arena: &'a mut Arena,
    lines: Peekable<I>,
}

impl<I: Iterator<Item = Line>> Builder<'_, I> {
    fn chain(&mut self, floor: Option<usize>, depth: usize) -> Result<Option<NodeId>, CoreError> {
        if depth > MAX_NESTING_DEPTH {
            return Err(CoreError::NestingTooDeep {
                limit: MAX_NESTING_DEPTH,
            });
        }
        let Some(head) = self.take_above(floor) else {
            return Ok(None);
        };
        let first = self.arena.alloc_node(Node::new(head));
        let mut current = first;

        while let Some(indent) = self.lines.peek().map(|line| line.indent) {
            if floor.is_some_and(|floor| indent <= floor) {
                break;
            }
            let current_indent = self.arena.node(current).line.indent;
            if indent > current_indent {
                let children = self.chain(Some(current_indent), depth + 1)?;
                self.arena.node_mut(current).subtree = children;
            } else if let Some(line) = self.lines.next() {
                let sibling = self.arena.alloc_node(Node::new(line));
                self.arena.node_mut(current).next = Some(sibling);
                current = sibling;
            }
        }

        Ok(Some(first))
    }

    fn take_above(&mut self, floor: Option<usize>) -> Option<Line> {
        match (self.lines.peek(), floor) {
            (Some(line), Some(floor)) if line.indent <= floor => None,
            _ => self.lines.next(),
        }
    }
}

/// Removes every `-#` node together with its subtree; returns the new head.
pub fn remove_silent_comments(arena: &mut Arena, first: Option<NodeId>) -> Option<NodeId> {
    let mut head = None;
    let mut previous: Option<NodeId> = None;
    let mut cursor = first;

    while let Some(id) = cursor {
        let next = arena.node(id).next;
        if starts_with(arena, id, "-#") {
            log::trace!("dropping silent comment {id:?}");
            if let Some(previous) = previous {
                arena.node_mut(previous).next = next;
            }
        } else {
            head.get_or_insert(id);
            previous = Some(id);
            let children = arena.node(id).subtree;
            let children = remove_silent_comments(arena, children);
            arena.node_mut(id).subtree = children;
        }
        cursor = next;
    }

    head
}

/// Whether the node's content begins with `prefix`.
pub fn starts_with(arena: &Arena, id: NodeId, prefix: &str) -> bool {
    arena
        .node(id)
        .line
        .content
        .fragments()
        .first()
        .is_some_and(|slice| arena.str(*slice).starts_with(prefix))
}

/// The chain starting at `first`, in order.
pub fn siblings(arena: &Arena, first: Option<NodeId>) -> Vec<NodeId> {
    let mut ids = Vec::new();
    let mut cursor = first;
    while let Some(id) = cursor {
        ids.push(id);
        cursor = arena.node(id).next;
    }
    ids
}

/// Every node reachable from `first` (its siblings included), in document
/// order.
pub fn descendants(arena: &Arena, first: Option<NodeId>) -> Vec<NodeId> {
    let mut ids = Vec::new();
    let mut stack: Vec<NodeId> = first.into_iter().collect();
    while let Some(id) = stack.pop() {
        ids.push(id);
        let node = arena.node(id);
        stack.extend(node.next);
        stack.extend(node.subtree);
    }
    ids
}

pub fn indent_by(arena: &mut Arena, first: Option<NodeId>, width: usize) {
    for id in descendants(arena, first) {
        arena.node_mut(id).line.indent += width;
    }
}

pub fn dedent_by(arena: &mut Arena, first: Option<NodeId>, width: usize) {
    for id in descendants(arena, first) {
        let line = &mut arena.node_mut(id).line;
        line.indent = line.indent.saturating_sub(width);
    }
}

pub fn clear_indents(arena: &mut Arena, first: Option<NodeId>) {
    for id in descendants(arena, first) {
        arena.node_mut(id).line.indent = 0;
    }
}

/// Links a new node holding `line` right after `id`.
pub fn insert_after(arena: &mut Arena, id: NodeId, line: Line) -> NodeId {
    let next = arena.node(id).next;
    let inserted = arena.alloc_node(Node { line, subtree: None, next });
    arena.node_mut(id).next = Some(inserted);
    inserted
}
