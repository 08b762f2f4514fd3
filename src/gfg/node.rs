//! GFG node and edge types (C2's data model, spec §3.2).

use crate::arena_index;
use crate::grammar::{NonTermId, TermId};

arena_index! {
    /// Dense index into a [`super::Gfg`]'s node table. Node 0 is always the
    /// start production's Start vertex (`•S`), node 1 its End vertex (`S•`),
    /// matching `gfg.py::build_gfg`'s allocation order.
    pub struct NodeId;
}

/// What role a node plays in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// `•A`, the production's entry point; one ε-out-edge per alternative.
    Start,
    /// `A•`, the production's completion point.
    End,
    /// A dotted item `A → α•β` strictly inside an alternative (including
    /// positions that are also entry/exit, see `is_entry`/`is_exit`).
    Item,
}

/// The label an edge carries: either ε (no input consumed) or a terminal
/// the scan transition must match against `tokens[k].kind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeLabel {
    Epsilon,
    Scan(TermId),
}

/// One node of the Grammar Flow Graph. Its own [`NodeId`] is not stored
/// here; identity comes from its position in the owning [`super::Gfg`]'s
/// arena, the same convention the teacher's arena types use.
#[derive(Debug, Clone)]
pub struct GfgNode {
    pub kind: NodeKind,
    pub production: NonTermId,

    /// First item of an alternative (dot before every symbol).
    pub is_entry: bool,
    /// Past-dot position at the end of an alternative.
    pub is_exit: bool,
    /// `A → α•Bβ` with `B` a non-terminal: the item right before the dot
    /// crosses into a call.
    pub is_call: bool,
    /// `A → αB•β`: the item reached by completing the call above.
    pub is_return: bool,
    /// Dot immediately before a terminal.
    pub is_scan: bool,

    /// True iff the remaining suffix of this alternative (from this item
    /// to its Exit) derives only ε, i.e. every symbol still to be
    /// crossed, if any, is a nullable non-terminal. Computed post-build
    /// (see [`super::Gfg::compute_tail_nullable`]); used by C6 to prime
    /// return items without a full re-derivation.
    pub tail_nullable: bool,

    /// For a call item: the `•B` node this item's single outgoing ε-edge
    /// targets. `None` for every other node.
    pub call_target: Option<NodeId>,

    /// `neighbor -> label` for edges leaving this node.
    pub outgoing: Vec<(NodeId, EdgeLabel)>,
    /// `neighbor -> label` for edges entering this node.
    pub incoming: Vec<(NodeId, EdgeLabel)>,
}

impl GfgNode {
    pub(crate) fn new(kind: NodeKind, production: NonTermId) -> Self {
        GfgNode {
            kind,
            production,
            is_entry: false,
            is_exit: false,
            is_call: false,
            is_return: false,
            is_scan: false,
            tail_nullable: false,
            call_target: None,
            outgoing: Vec::new(),
            incoming: Vec::new(),
        }
    }

    pub(crate) fn add_outgoing(&mut self, to: NodeId, label: EdgeLabel) {
        self.outgoing.push((to, label));
    }

    pub(crate) fn add_incoming(&mut self, from: NodeId, label: EdgeLabel) {
        self.incoming.push((from, label));
    }

    /// The single outgoing scan label, if this is a scan item.
    pub fn scan_label(&self) -> Option<TermId> {
        self.outgoing.iter().find_map(|(_, label)| match label {
            EdgeLabel::Scan(t) => Some(*t),
            EdgeLabel::Epsilon => None,
        })
    }

    /// The single outgoing scan target, if this is a scan item.
    pub fn scan_target(&self) -> Option<NodeId> {
        self.outgoing.iter().find_map(|(to, label)| match label {
            EdgeLabel::Scan(_) => Some(*to),
            EdgeLabel::Epsilon => None,
        })
    }
}
