use crate::arena::Arena;
use crate::tree::{self, NodeId};

/// Serializes the tree into text.
///
/// Each node with content contributes `indent` spaces and its chain, in
/// document order. Cleared nodes contribute nothing.
pub fn flatten(arena: &Arena, first: Option<NodeId>) -> String {
    let mut out = String::new();
    for id in tree::descendants(arena, first) {
        let line = &arena.node(id).line;
        if line.content.is_empty() {
            continue;
        }
        out.extend(std::iter::repeat_n(' ', line.indent));
        for slice in line.content.fragments() {
            out.push_str(arena.str(*slice));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line::Line;
    use crate::tree::Node;

    #[test]
    fn empty_nodes_emit_nothing() {
        let mut arena = Arena::new();
        let text = arena.intern("kept\n");
        let kept = arena.alloc_node(Node::new(Line::new(4, text)));
        let cleared = arena.alloc_node(Node::new(Line::empty()));
        arena.node_mut(cleared).next = Some(kept);
        assert_eq!(flatten(&arena, Some(cleared)), "    kept\n");
    }

    #[test]
    fn nothing_flattens_to_nothing() {
        let arena = Arena::new();
        assert_eq!(flatten(&arena, None), "");
    }
}
