//! Shared Packed Parse Forest node types, used by both C5 (top-down,
//! post-recognition) and C6 (bottom-up, online) so the two builders are
//! provably constructing the same kind of forest (spec §8, property 5).
//!
//! Node/packed-node identity is grounded on `original_source/sppf.py`:
//! `Sppf.add_node` dedupes by `(label, start, end)`, `Sppf.add_family`
//! creates one real packed node per distinct `(child1, child2)` pair and
//! wires `parent -> packed -> {child1, child2}`. Packed nodes are
//! themselves graph nodes, not an inline annotation on their parent.

use std::collections::HashMap;

use crate::arena::Arena;
use crate::arena_index;
use crate::gfg::NodeId as GfgNodeId;
use crate::grammar::{Symbol, TermId};

arena_index! {
    /// Dense index into an [`Sppf`]'s node table.
    pub struct SppfId;
}

/// The label identifying a non-packed SPPF node, paired with its input
/// span to form its identity key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SppfLabel {
    /// A terminal leaf `(a, i, i+1)`.
    Terminal(TermId),
    /// A symbol node `(X, i, j)`.
    Symbol(Symbol),
    /// An intermediate node `(item_id, i, j)`.
    Intermediate(GfgNodeId),
    /// The zero-width leaf a nullable alternative derives (span `(i, i)`).
    Epsilon,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct SppfKey {
    label: SppfLabel,
    start: usize,
    end: usize,
}

/// One SPPF node.
#[derive(Debug, Clone)]
pub enum SppfNode {
    /// A terminal or ε leaf. `children` is always empty.
    Leaf { label: SppfLabel, start: usize, end: usize },
    /// A Symbol or Intermediate node. Ambiguity shows up differently per
    /// spec §4.5: a Symbol node's `children` holds one entry per distinct
    /// full alternative directly (no packed wrapper needed, since a
    /// symbol's alternatives never share a partial prefix); an
    /// Intermediate node's `children` holds either a single direct child
    /// (unambiguous prefix) or ≥2 entries pointing at [`SppfNode::Packed`]
    /// nodes (one per distinct way to split the derivation in two).
    Branch { label: SppfLabel, start: usize, end: usize, children: Vec<SppfId> },
    /// An anonymous node grouping exactly one derivation's two halves.
    Packed { left: SppfId, right: SppfId },
}

impl SppfNode {
    pub fn span(&self) -> Option<(usize, usize)> {
        match self {
            SppfNode::Leaf { start, end, .. } | SppfNode::Branch { start, end, .. } => Some((*start, *end)),
            SppfNode::Packed { .. } => None,
        }
    }

    pub fn label(&self) -> Option<SppfLabel> {
        match self {
            SppfNode::Leaf { label, .. } | SppfNode::Branch { label, .. } => Some(*label),
            SppfNode::Packed { .. } => None,
        }
    }

    pub fn children(&self) -> &[SppfId] {
        match self {
            SppfNode::Branch { children, .. } => children,
            SppfNode::Leaf { .. } | SppfNode::Packed { .. } => &[],
        }
    }

    pub fn packed_halves(&self) -> Option<(SppfId, SppfId)> {
        match self {
            SppfNode::Packed { left, right } => Some((*left, *right)),
            _ => None,
        }
    }

    /// True if a Symbol/Intermediate node has more than one way to derive
    /// its span: more than one direct child, or more than one packed
    /// child.
    pub fn is_ambiguous(&self) -> bool {
        self.children().len() > 1
    }
}

/// The forest under construction (or completed). Owned by the caller
/// after a successful `parse_forest`/`parse_forest_online`.
#[derive(Debug, Clone, Default)]
pub struct Sppf {
    nodes: Arena<SppfNode, SppfId>,
    index: HashMap<SppfKey, SppfId>,
}

impl Sppf {
    pub fn new() -> Self {
        Sppf::default()
    }

    pub fn node(&self, id: SppfId) -> &SppfNode {
        self.nodes.get(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn iter_nodes(&self) -> impl Iterator<Item = (SppfId, &SppfNode)> {
        self.nodes.iter()
    }

    fn get_or_create_branch(&mut self, label: SppfLabel, start: usize, end: usize) -> SppfId {
        let key = SppfKey { label, start, end };
        if let Some(&id) = self.index.get(&key) {
            return id;
        }
        let id = self.nodes.push(SppfNode::Branch { label, start, end, children: Vec::new() });
        self.index.insert(key, id);
        id
    }

    pub fn symbol(&mut self, symbol: Symbol, start: usize, end: usize) -> SppfId {
        self.get_or_create_branch(SppfLabel::Symbol(symbol), start, end)
    }

    pub fn intermediate(&mut self, item: GfgNodeId, start: usize, end: usize) -> SppfId {
        self.get_or_create_branch(SppfLabel::Intermediate(item), start, end)
    }

    pub fn terminal(&mut self, term: TermId, start: usize, end: usize) -> SppfId {
        let key = SppfKey { label: SppfLabel::Terminal(term), start, end };
        if let Some(&id) = self.index.get(&key) {
            return id;
        }
        let id = self.nodes.push(SppfNode::Leaf { label: SppfLabel::Terminal(term), start, end });
        self.index.insert(key, id);
        id
    }

    pub fn epsilon(&mut self, at: usize) -> SppfId {
        let key = SppfKey { label: SppfLabel::Epsilon, start: at, end: at };
        if let Some(&id) = self.index.get(&key) {
            return id;
        }
        let id = self.nodes.push(SppfNode::Leaf { label: SppfLabel::Epsilon, start: at, end: at });
        self.index.insert(key, id);
        id
    }

    /// Add `child` directly to a Symbol node's children (one entry per
    /// distinct alternative; no packing), unless already present.
    pub fn add_symbol_child(&mut self, parent: SppfId, child: SppfId) {
        let children = match self.nodes.get_mut(parent) {
            SppfNode::Branch { children, .. } => children,
            other => panic!("add_symbol_child on non-branch node: {other:?}"),
        };
        if !children.contains(&child) {
            children.push(child);
        }
    }

    /// Set an Intermediate node's single unambiguous direct child.
    pub fn set_direct_child(&mut self, parent: SppfId, child: SppfId) {
        let children = match self.nodes.get_mut(parent) {
            SppfNode::Branch { children, .. } => children,
            other => panic!("set_direct_child on non-branch node: {other:?}"),
        };
        if children.is_empty() {
            children.push(child);
        }
    }

    /// Attach a packed child `(left, right)` to `parent`, creating the
    /// packed node if this exact pair hasn't been attached before.
    /// Returns `true` if this made `parent` newly ambiguous (its second
    /// distinct packed child).
    pub fn add_packed_child(&mut self, parent: SppfId, left: SppfId, right: SppfId) -> bool {
        let existing = match self.nodes.get(parent) {
            SppfNode::Branch { children, .. } => children.clone(),
            other => panic!("add_packed_child on non-branch node: {other:?}"),
        };
        for &child in &existing {
            if let SppfNode::Packed { left: l, right: r } = self.nodes.get(child) {
                if *l == left && *r == right {
                    return false;
                }
            }
        }
        let packed = self.nodes.push(SppfNode::Packed { left, right });
        match self.nodes.get_mut(parent) {
            SppfNode::Branch { children, .. } => children.push(packed),
            _ => unreachable!(),
        }
        existing.len() + 1 > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{NonTermId, TermId as Term};

    #[test]
    fn symbol_nodes_are_shared_by_label_and_span() {
        let mut sppf = Sppf::new();
        let a = Symbol::NonTerminal(NonTermId(0));
        let n1 = sppf.symbol(a, 0, 3);
        let n2 = sppf.symbol(a, 0, 3);
        assert_eq!(n1, n2);
    }

    #[test]
    fn second_distinct_packed_child_marks_ambiguous() {
        let mut sppf = Sppf::new();
        let a = Symbol::NonTerminal(NonTermId(0));
        let parent = sppf.intermediate(GfgNodeId(7), 0, 3);
        let t1 = sppf.terminal(Term(0), 0, 1);
        let t2 = sppf.terminal(Term(1), 1, 2);
        let t3 = sppf.terminal(Term(2), 2, 3);
        let _ = a;

        let first = sppf.add_packed_child(parent, t1, t2);
        assert!(!first);
        let second = sppf.add_packed_child(parent, t2, t3);
        assert!(second);
        assert!(sppf.node(parent).is_ambiguous());
    }

    #[test]
    fn repeated_identical_packed_child_is_not_double_counted() {
        let mut sppf = Sppf::new();
        let parent = sppf.intermediate(GfgNodeId(1), 0, 2);
        let t1 = sppf.terminal(Term(0), 0, 1);
        let t2 = sppf.terminal(Term(1), 1, 2);
        sppf.add_packed_child(parent, t1, t2);
        sppf.add_packed_child(parent, t1, t2);
        assert_eq!(sppf.node(parent).children().len(), 1);
    }
}
