use crate::arena::{Slice, StrPool};

/// Ordered list of string slices making up one piece of text.
///
/// Passes that rewrite a node build a fresh chain instead of aliasing
/// fragments of another node's chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Chain {
    fragments: Vec<Slice>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(slice: Slice) -> Self {
        Self {
            fragments: vec![slice],
        }
    }

    pub fn push(&mut self, slice: Slice) {
        if !slice.is_empty() {
            self.fragments.push(slice);
        }
    }

    pub fn prepend(&mut self, slice: Slice) {
        if !slice.is_empty() {
            self.fragments.insert(0, slice);
        }
    }

    pub fn extend(&mut self, other: Chain) {
        for slice in other.fragments {
            self.push(slice);
        }
    }

    pub fn fragments(&self) -> &[Slice] {
        &self.fragments
    }

    pub fn byte_len(&self) -> usize {
        self.fragments.iter().map(|slice| slice.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.iter().all(|slice| slice.is_empty())
    }

    /// Drops every trailing `\n`, even when it spans several fragments.
    pub fn chomp(&mut self, strings: &StrPool) {
        while let Some(last) = self.fragments.last().copied() {
            let text = strings.get(last);
            let kept = text.trim_end_matches('\n').len();
            if kept == 0 {
                self.fragments.pop();
                continue;
            }
            if let Some(slot) = self.fragments.last_mut() {
                *slot = last.truncate(kept);
            }
            break;
        }
    }
}

/// One logical template line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// Leading whitespace in columns, after tab expansion.
    pub indent: usize,
    pub content: Chain,
}

impl Line {
    pub fn new(indent: usize, content: Slice) -> Self {
        Self {
            indent,
            content: Chain::single(content),
        }
    }

    pub fn empty() -> Self {
        Self {
            indent: 0,
            content: Chain::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_skips_empty_fragments() {
        let mut pool = StrPool::default();
        let mut chain = Chain::new();
        chain.push(Slice::EMPTY);
        assert!(chain.fragments().is_empty());
        chain.push(pool.intern("x"));
        chain.prepend(pool.intern("<"));
        assert_eq!(chain.fragments().len(), 2);
        assert_eq!(chain.byte_len(), 2);
    }

    #[test]
    fn chomp_keeps_inner_newlines() {
        let mut pool = StrPool::default();
        let mut chain = Chain::single(pool.intern("a\nb\n\n"));
        chain.chomp(&pool);
        let text: String = chain.fragments().iter().map(|s| pool.get(*s)).collect();
        assert_eq!(text, "a\nb");
    }

    #[test]
    fn chomp_of_only_newlines_leaves_empty_chain() {
        let mut pool = StrPool::default();
        let mut chain = Chain::single(pool.intern("\n"));
        chain.chomp(&pool);
        assert!(chain.is_empty());
    }
}
