//! C2, compiles a [`Grammar`] into a Grammar Flow Graph.
//!
//! Allocation and wiring order follow `original_source/gfg.py`'s
//! `build_gfg` exactly: the start production's Start/End pair is
//! allocated first (nodes 0 and 1), then Start/End pairs for every other
//! non-terminal, then the item chain for every alternative of every
//! production in turn. The one subtlety worth stating plainly because it
//! is easy to get backwards: a **return** item's production-internal
//! incoming edge originates at the called production's **End** node, not
//! at the call item itself: the call item's only outgoing edge is the
//! ε-edge to `•B`.

pub mod node;

use std::collections::HashMap;

use crate::arena::Arena;
use crate::error::{GrammarError, GrammarResult};
use crate::grammar::{Grammar, NonTermId, Symbol, TermId};

pub use node::{EdgeLabel, GfgNode, NodeId, NodeKind};

/// The compiled Grammar Flow Graph. Immutable and `Send + Sync` once
/// built, so many parses may run concurrently against the same `Gfg`.
/// Carries its own copy of the terminal name table so `recognize`/
/// `parse_*` need only `(gfg, lexer)`, never the originating `Grammar`.
#[derive(Debug, Clone)]
pub struct Gfg {
    nodes: Arena<GfgNode, NodeId>,
    start_symbol: NonTermId,
    prod_start: Vec<NodeId>,
    prod_end: Vec<NodeId>,
    call_to_return: HashMap<NodeId, NodeId>,
    return_to_call: HashMap<NodeId, NodeId>,
    term_ids: HashMap<String, TermId>,
    term_names: Vec<String>,
    nonterm_names: Vec<String>,
}

impl Gfg {
    pub fn node(&self, id: NodeId) -> &GfgNode {
        self.nodes.get(id)
    }

    /// The [`TermId`] a lexer's token `kind` corresponds to, if any scan
    /// edge anywhere in the graph is labelled with it.
    pub fn term_id_for(&self, kind: &str) -> Option<TermId> {
        self.term_ids.get(kind).copied()
    }

    pub fn term_name(&self, id: TermId) -> &str {
        &self.term_names[id.0 as usize]
    }

    pub fn nonterm_name(&self, id: NonTermId) -> &str {
        &self.nonterm_names[id.0 as usize]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn iter_nodes(&self) -> impl Iterator<Item = (NodeId, &GfgNode)> {
        self.nodes.iter()
    }

    pub fn start_symbol(&self) -> NonTermId {
        self.start_symbol
    }

    /// `•A`, the Start node of non-terminal `A`.
    pub fn start_of(&self, prod: NonTermId) -> NodeId {
        self.prod_start[prod.0 as usize]
    }

    /// `A•`, the End node of non-terminal `A`.
    pub fn end_of(&self, prod: NonTermId) -> NodeId {
        self.prod_end[prod.0 as usize]
    }

    /// `•S`, the recognizer's initial node.
    pub fn start_node(&self) -> NodeId {
        self.start_of(self.start_symbol)
    }

    /// `S•`, the recognizer's accepting node.
    pub fn accept_node(&self) -> NodeId {
        self.end_of(self.start_symbol)
    }

    /// The return item completing the call `id`, if `id` is a call item.
    pub fn return_of(&self, id: NodeId) -> Option<NodeId> {
        self.call_to_return.get(&id).copied()
    }

    /// The call item completed by the return item `id`, if `id` is one.
    pub fn call_of(&self, id: NodeId) -> Option<NodeId> {
        self.return_to_call.get(&id).copied()
    }
}

/// Compile `grammar` into a [`Gfg`] rooted at `start`.
pub fn build_gfg(grammar: &Grammar, start: &str) -> GrammarResult<Gfg> {
    let start_id = grammar
        .nonterm_id(start)
        .ok_or_else(|| GrammarError::MissingStart(start.to_string()))?;
    if grammar.alternatives(start_id).is_empty() {
        return Err(GrammarError::MissingStart(start.to_string()));
    }
    grammar.check_reachable(start_id)?;

    let mut nodes: Arena<GfgNode, NodeId> = Arena::with_capacity(grammar.nonterm_count() * 4);
    let mut prod_start = vec![NodeId(0); grammar.nonterm_count()];
    let mut prod_end = vec![NodeId(0); grammar.nonterm_count()];
    let mut call_to_return = HashMap::new();
    let mut return_to_call = HashMap::new();

    // Node 0 = •S, node 1 = S•.
    let s0 = nodes.push(GfgNode::new(NodeKind::Start, start_id));
    let s1 = nodes.push(GfgNode::new(NodeKind::End, start_id));
    prod_start[start_id.0 as usize] = s0;
    prod_end[start_id.0 as usize] = s1;

    for prod in grammar.nonterm_ids() {
        if prod == start_id {
            continue;
        }
        let a = nodes.push(GfgNode::new(NodeKind::Start, prod));
        let b = nodes.push(GfgNode::new(NodeKind::End, prod));
        prod_start[prod.0 as usize] = a;
        prod_end[prod.0 as usize] = b;
    }

    for prod in grammar.nonterm_ids() {
        for alt in grammar.alternatives(prod) {
            build_alternative(
                &mut nodes,
                &prod_start,
                &prod_end,
                &mut call_to_return,
                &mut return_to_call,
                prod,
                alt,
            );
        }
    }

    let term_ids = grammar.terminals().map(|(id, name)| (name.to_string(), id)).collect();
    let mut term_names = vec![String::new(); grammar.terminals().count()];
    for (id, name) in grammar.terminals() {
        term_names[id.0 as usize] = name.to_string();
    }
    let nonterm_names = grammar.nonterm_ids().map(|id| grammar.nonterm_name(id).to_string()).collect();

    let mut gfg = Gfg {
        nodes,
        start_symbol: start_id,
        prod_start,
        prod_end,
        call_to_return,
        return_to_call,
        term_ids,
        term_names,
        nonterm_names,
    };
    compute_tail_nullable(&mut gfg, grammar);
    Ok(gfg)
}

/// Allocate and wire the item chain for one alternative, mirroring
/// `gfg.py::build_gfg`'s inner loop node-for-node.
fn build_alternative(
    nodes: &mut Arena<GfgNode, NodeId>,
    prod_start: &[NodeId],
    prod_end: &[NodeId],
    call_to_return: &mut HashMap<NodeId, NodeId>,
    return_to_call: &mut HashMap<NodeId, NodeId>,
    prod: NonTermId,
    alt: &[Symbol],
) {
    // Mirrors `gfg.py::build_gfg`'s inner loop state: `prev` is the
    // previous item (or the production's Start node, first iteration);
    // while `prev` is a call item, `call_end` holds the callee's End node
    // so the *next* link's source is redirected there instead of to the
    // call item itself; `edge_label` is the label the next link should
    // carry (ε, unless `prev` is a scan item, in which case its terminal).
    let mut prev = prod_start[prod.0 as usize];
    let mut prev_is_call = false;
    let mut call_end: Option<NodeId> = None;
    let mut edge_label = EdgeLabel::Epsilon;
    let mut is_entry = true;

    for &sym in alt {
        let item = nodes.push(GfgNode::new(NodeKind::Item, prod));
        nodes.get_mut(item).is_entry = is_entry;
        is_entry = false;

        if prev_is_call {
            nodes.get_mut(item).is_return = true;
            call_to_return.insert(prev, item);
            return_to_call.insert(item, prev);
        }

        let src = if prev_is_call { call_end.expect("call item always sets call_end") } else { prev };
        link(nodes, src, item, edge_label);

        match sym {
            Symbol::Terminal(t) => {
                nodes.get_mut(item).is_scan = true;
                edge_label = EdgeLabel::Scan(t);
                prev = item;
                prev_is_call = false;
                call_end = None;
            }
            Symbol::NonTerminal(b) => {
                nodes.get_mut(item).is_call = true;
                let b_start = prod_start[b.0 as usize];
                let b_end = prod_end[b.0 as usize];
                nodes.get_mut(item).call_target = Some(b_start);
                link(nodes, item, b_start, EdgeLabel::Epsilon);
                prev = item;
                prev_is_call = true;
                call_end = Some(b_end);
                edge_label = EdgeLabel::Epsilon;
            }
        }
    }

    let exit = nodes.push(GfgNode::new(NodeKind::Item, prod));
    nodes.get_mut(exit).is_entry = is_entry;
    nodes.get_mut(exit).is_exit = true;

    if prev_is_call {
        nodes.get_mut(exit).is_return = true;
        call_to_return.insert(prev, exit);
        return_to_call.insert(exit, prev);
    }
    let src = if prev_is_call { call_end.expect("call item always sets call_end") } else { prev };
    link(nodes, src, exit, edge_label);

    link(nodes, exit, prod_end[prod.0 as usize], EdgeLabel::Epsilon);
}

fn link(nodes: &mut Arena<GfgNode, NodeId>, from: NodeId, to: NodeId, label: EdgeLabel) {
    nodes.get_mut(from).add_outgoing(to, label);
    nodes.get_mut(to).add_incoming(from, label);
}

/// Standard nullable-non-terminal fixed point: `A` is nullable if some
/// alternative of `A` is empty, or every symbol in some alternative is
/// itself nullable (terminals are never nullable).
fn compute_nullable(grammar: &Grammar) -> Vec<bool> {
    let mut nullable = vec![false; grammar.nonterm_count()];
    let mut changed = true;
    while changed {
        changed = false;
        for prod in grammar.nonterm_ids() {
            if nullable[prod.0 as usize] {
                continue;
            }
            let is_nullable = grammar.alternatives(prod).iter().any(|alt| {
                alt.iter().all(|sym| match sym {
                    Symbol::Terminal(_) => false,
                    Symbol::NonTerminal(b) => nullable[b.0 as usize],
                })
            });
            if is_nullable {
                nullable[prod.0 as usize] = true;
                changed = true;
            }
        }
    }
    nullable
}

/// Fills in `tail_nullable` on every node: true at every Exit (the empty
/// remaining suffix trivially derives ε), propagated backwards through
/// call items whose callee is nullable, and false across any scan edge
/// (a terminal can never be skipped).
fn compute_tail_nullable(gfg: &mut Gfg, grammar: &Grammar) {
    let nullable = compute_nullable(grammar);

    // Process nodes in reverse allocation order: since every edge inside
    // a production goes from an earlier-allocated item to a later one
    // (Start/End pairs aside), a single backward pass sees each node's
    // successor already finalized before the node itself is computed.
    let count = gfg.nodes.len();
    for idx in (0..count).rev() {
        let id = NodeId(idx as u32);
        let node = gfg.nodes.get(id).clone();
        let value = match node.kind {
            NodeKind::End => true,
            NodeKind::Start => false,
            NodeKind::Item if node.is_exit => true,
            NodeKind::Item if node.is_call => {
                let b = node_production_of_call_target(gfg, &node);
                let return_id = gfg.return_of(id).expect("call item has a return");
                nullable[b.0 as usize] && gfg.nodes.get(return_id).tail_nullable
            }
            NodeKind::Item if node.is_scan => false,
            NodeKind::Item => {
                unreachable!("every non-exit item's dot precedes a terminal or a non-terminal")
            }
        };
        gfg.nodes.get_mut(id).tail_nullable = value;
    }
}

fn node_production_of_call_target(gfg: &Gfg, node: &GfgNode) -> NonTermId {
    let target = node.call_target.expect("call item records its call target");
    gfg.nodes.get(target).production
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arith_grammar() -> (Grammar, &'static str) {
        let mut g = Grammar::new();
        let number = g.terminal("number");
        let plus = g.terminal("plus");
        let e = g.nonterminal("E");
        g.add("S", vec![e]);
        g.add("E", vec![number]);
        g.add("E", vec![e, plus, e]);
        (g, "S")
    }

    #[test]
    fn node_0_and_1_are_start_accept_pair() {
        let (g, start) = arith_grammar();
        let gfg = build_gfg(&g, start).unwrap();
        assert_eq!(gfg.start_node(), NodeId(0));
        assert_eq!(gfg.accept_node(), NodeId(1));
    }

    #[test]
    fn missing_start_is_an_error() {
        let g = Grammar::new();
        assert!(build_gfg(&g, "S").is_err());
    }

    #[test]
    fn unreachable_nonterminal_without_alternatives_errors() {
        let mut g = Grammar::new();
        let unused = g.nonterminal("Unused");
        g.add("S", vec![unused]);
        assert!(build_gfg(&g, "S").is_err());
    }

    #[test]
    fn call_item_links_to_callee_start_and_has_a_return() {
        let (g, start) = arith_grammar();
        let gfg = build_gfg(&g, start).unwrap();
        let call = gfg
            .iter_nodes()
            .find(|(_, n)| n.is_call)
            .map(|(id, _)| id)
            .unwrap();
        assert!(gfg.return_of(call).is_some());
        let target = gfg.node(call).call_target.unwrap();
        assert_eq!(gfg.node(target).kind, NodeKind::Start);
    }

    #[test]
    fn nullable_alternative_is_entry_and_exit_at_once() {
        let mut g = Grammar::new();
        let b = g.terminal("b");
        g.add("S", vec![b]);
        g.add("S", vec![]);
        let gfg = build_gfg(&g, "S").unwrap();
        let epsilon_item = gfg
            .iter_nodes()
            .find(|(_, n)| n.kind == NodeKind::Item && n.is_entry && n.is_exit)
            .map(|(id, _)| id);
        assert!(epsilon_item.is_some());
        assert!(gfg.node(epsilon_item.unwrap()).tail_nullable);
    }
}
