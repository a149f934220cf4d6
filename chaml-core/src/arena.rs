//! Per-compile arena.
//!
//! Every node and every string produced while compiling one template lives
//! here. Nodes sit in fixed-capacity chunks and are addressed by [`Idx`]
//! handles; text lives in one append-only byte pool and is addressed by
//! [`Slice`]s. Nothing is ever freed individually: the arena is dropped as a
//! whole once the compile finishes, whether it succeeded or not.

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

use crate::line::Chain;
use crate::tree::{Node, NodeId};

/// Number of slots in one pool chunk.
pub const CHUNK_CAPACITY: usize = 1024;

/// Typed handle into a [`Pool`].
pub struct Idx<T>(u32, PhantomData<fn() -> T>);

impl<T> Idx<T> {
    pub fn new(index: u32) -> Self {
        Self(index, PhantomData)
    }

    pub fn index(self) -> u32 {
        self.0
    }
}

impl<T> fmt::Debug for Idx<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Idx({})", self.0)
    }
}

impl<T> Clone for Idx<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Idx<T> {}

impl<T> PartialEq for Idx<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<T> Eq for Idx<T> {}

impl<T> std::hash::Hash for Idx<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

/// Growable list of fixed-capacity chunks.
///
/// Slots are handed out in order and never reused, so an [`Idx`] stays valid
/// for the lifetime of the pool.
#[derive(Debug)]
pub struct Pool<T> {
    chunks: Vec<Vec<T>>,
    len: usize,
}

impl<T> Default for Pool<T> {
    fn default() -> Self {
        Self { chunks: Vec::new(), len: 0 }
    }
}

impl<T> Pool<T> {
    pub fn alloc(&mut self, value: T) -> Idx<T> {
        let index = to_u32(self.len);
        match self.chunks.last_mut() {
            Some(chunk) if chunk.len() < CHUNK_CAPACITY => chunk.push(value),
            _ => {
                let mut chunk = Vec::with_capacity(CHUNK_CAPACITY);
                chunk.push(value);
                self.chunks.push(chunk);
            }
        }
        self.len += 1;
        Idx::new(index)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }
}

impl<T> Index<Idx<T>> for Pool<T> {
    type Output = T;

    fn index(&self, idx: Idx<T>) -> &T {
        let index = idx.index() as usize;
        &self.chunks[index / CHUNK_CAPACITY][index % CHUNK_CAPACITY]
    }
}

impl<T> IndexMut<Idx<T>> for Pool<T> {
    fn index_mut(&mut self, idx: Idx<T>) -> &mut T {
        let index = idx.index() as usize;
        &mut self.chunks[index / CHUNK_CAPACITY][index % CHUNK_CAPACITY]
    }
}

#[cold]
#[inline(never)]
fn capacity_exceeded(value: usize) -> ! {
    panic!("arena capacity exceeded: {value} entries, max is {}", u32::MAX)
}

fn to_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or_else(|_| capacity_exceeded(value))
}

/// Immutable view over bytes stored in a [`StrPool`].
///
/// Slices are plain offsets, so they can be copied freely between nodes and
/// sub-sliced without touching the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Slice {
    start: u32,
    len: u32,
}

impl Slice {
    /// The shared zero-length slice.
    pub const EMPTY: Slice = Slice { start: 0, len: 0 };

    pub fn len(self) -> usize {
        self.len as usize
    }

    pub fn is_empty(self) -> bool {
        self.len == 0
    }

    /// Returns the sub-slice covering bytes `from..to` of this slice.
    pub fn sub(self, from: usize, to: usize) -> Slice {
        debug_assert!(from <= to && to <= self.len(), "sub-slice out of range");
        if from == to {
            return Slice::EMPTY;
        }
        Slice {
            start: self.start + to_u32(from),
            len: to_u32(to - from),
        }
    }

    /// Returns this slice without its first `count` bytes.
    pub fn skip(self, count: usize) -> Slice {
        self.sub(count.min(self.len()), self.len())
    }

    /// Returns the first `len` bytes of this slice.
    pub fn truncate(self, len: usize) -> Slice {
        self.sub(0, len.min(self.len()))
    }
}

/// Append-only byte storage for every string of a compile.
#[derive(Debug, Default)]
pub struct StrPool {
    buf: String,
}

impl StrPool {
    pub fn intern(&mut self, text: &str) -> Slice {
        if text.is_empty() {
            return Slice::EMPTY;
        }
        let start = to_u32(self.buf.len());
        self.buf.push_str(text);
        Slice {
            start,
            len: to_u32(text.len()),
        }
    }

    pub fn get(&self, slice: Slice) -> &str {
        let start = slice.start as usize;
        &self.buf[start..start + slice.len()]
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

/// Storage for one compile: the node pool plus the string pool.
#[derive(Debug, Default)]
pub struct Arena {
    strings: StrPool,
    nodes: Pool<Node>,
    literals: HashMap<&'static str, Slice>,
}

impl Arena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, text: &str) -> Slice {
        self.strings.intern(text)
    }

    /// Interns a static literal once per arena.
    pub fn literal(&mut self, text: &'static str) -> Slice {
        if let Some(slice) = self.literals.get(text) {
            return *slice;
        }
        let slice = self.strings.intern(text);
        self.literals.insert(text, slice);
        slice
    }

    pub fn str(&self, slice: Slice) -> &str {
        self.strings.get(slice)
    }

    pub fn strings(&self) -> &StrPool {
        &self.strings
    }

    pub fn alloc_node(&mut self, node: Node) -> NodeId {
        self.nodes.alloc(node)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Concatenates a chain into an owned string.
    pub fn text(&self, chain: &Chain) -> String {
        let mut out = String::with_capacity(chain.byte_len());
        for slice in chain.fragments() {
            out.push_str(self.strings.get(*slice));
        }
        out
    }

    /// Returns a single slice holding the whole chain, copying only when the
    /// chain has more than one non-empty fragment.
    pub fn connect(&mut self, chain: &Chain) -> Slice {
        let mut fragments = chain.fragments().iter().filter(|slice| !slice.is_empty());
        match (fragments.next(), fragments.next()) {
            (None, _) => Slice::EMPTY,
            (Some(only), None) => *only,
            _ => {
                let joined = self.text(chain);
                self.strings.intern(&joined)
            }
        }
    }

    /// Collapses a node's content to one slice and returns it.
    pub fn connect_node(&mut self, id: NodeId) -> Slice {
        let chain = self.nodes[id].line.content.clone();
        let slice = self.connect(&chain);
        self.nodes[id].line.content = Chain::single(slice);
        slice
    }

    /// Returns the node's content as an owned string.
    pub fn content(&self, id: NodeId) -> String {
        self.text(&self.nodes[id].line.content)
    }

    /// Removes trailing newlines from a node's content.
    pub fn chomp_node(&mut self, id: NodeId) {
        let Arena { strings, nodes, .. } = self;
        nodes[id].line.content.chomp(strings);
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        log::trace!(
            "releasing arena: {} nodes in {} chunks, {} bytes of text",
            self.nodes.len(),
            self.nodes.chunk_count(),
            self.strings.len()
        );
    }
}
