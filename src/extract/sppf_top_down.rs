//! C5, the top-down SPPF builder. Also a backward construction, like C4, but
//! memoised by `(item, tag, k)` so shared sub-derivations collapse into
//! shared nodes instead of being rebuilt (spec §4.5).
//!
//! Node/packed-node identity is delegated entirely to [`crate::sppf::Sppf`]
//! (shared with C6, spec property 5). The five inference cases below are
//! dispatched the same way C4's `walk_chain` finds its single predecessor,
//! by the *incoming* edge on the item being resolved, grounded the same
//! way on `original_source/gfg.py`'s edge wiring, except here every viable
//! predecessor is visited, not just one.

use std::collections::HashMap;

use crate::error::ParseReject;
use crate::gfg::{EdgeLabel, Gfg, NodeId, NodeKind};
use crate::grammar::Symbol;
use crate::lexer::Lexer;
use crate::sigma::{self, ParseLimits, SigmaItem, SigmaRun, Tag};
use crate::sppf::{Sppf, SppfId};

/// A completed SPPF together with the node covering the whole input under
/// the grammar's start symbol.
pub struct Forest {
    pub sppf: Sppf,
    pub root: SppfId,
}

/// Recognize, then build the full ambiguity-preserving forest.
pub fn parse_forest(gfg: &Gfg, lexer: &mut dyn Lexer, limits: &ParseLimits) -> Result<Forest, ParseReject> {
    let run = sigma::run(gfg, lexer, limits).map_err(|_| ParseReject)?;
    if !run.accepts(gfg) {
        return Err(ParseReject);
    }
    let n = run.sets.len() - 1;
    let mut sppf = Sppf::new();
    let mut memo: HashMap<(NodeId, Tag, usize), SppfId> = HashMap::new();
    let root = get_sppf(gfg, &run, gfg.accept_node(), 0, n, &mut sppf, &mut memo);
    Ok(Forest { sppf, root })
}

/// `get_sppf(elem, k)` from spec §4.5, with the origin tag threaded
/// explicitly rather than folded into `elem` (the same item id is reused
/// across different tags for a recursive non-terminal).
///
/// Memoizes the node's id before filling in its children, not after. A
/// self-recursive production (`A -> A`) routes back through this exact
/// `(node, tag, k)` while its own children are still being attached (the
/// call's own completion is itself), and must see the id already on file
/// instead of recursing forever; the id is stable once allocated (`Sppf`'s
/// constructors are get-or-create by key) so handing it out early and
/// mutating its children in place afterwards is sound.
fn get_sppf(
    gfg: &Gfg,
    run: &SigmaRun,
    node: NodeId,
    tag: Tag,
    k: usize,
    sppf: &mut Sppf,
    memo: &mut HashMap<(NodeId, Tag, usize), SppfId>,
) -> SppfId {
    if let Some(&id) = memo.get(&(node, tag, k)) {
        return id;
    }
    let info = gfg.node(node);
    let id = if info.kind == NodeKind::End {
        sppf.symbol(Symbol::NonTerminal(info.production), tag as usize, k)
    } else if info.is_entry && info.is_exit {
        sppf.intermediate(node, k, k)
    } else {
        sppf.intermediate(node, tag as usize, k)
    };
    memo.insert((node, tag, k), id);
    fill_sppf(gfg, run, node, tag, k, id, sppf, memo);
    id
}

fn fill_sppf(
    gfg: &Gfg,
    run: &SigmaRun,
    node: NodeId,
    tag: Tag,
    k: usize,
    id: SppfId,
    sppf: &mut Sppf,
    memo: &mut HashMap<(NodeId, Tag, usize), SppfId>,
) {
    let info = gfg.node(node);

    // Case 1: End node. One direct child per eligible exit predecessor.
    if info.kind == NodeKind::End {
        let exits: Vec<NodeId> = gfg.node(node).incoming.iter().map(|&(exit, _)| exit).collect();
        for exit_item in exits {
            if run.sets[k].contains(SigmaItem::new(exit_item, tag)) {
                let child = get_sppf(gfg, run, exit_item, tag, k, sppf, memo);
                sppf.add_symbol_child(id, child);
            }
        }
        return;
    }

    // Case 2: nullable alternative. Entry and exit at once.
    if info.is_entry && info.is_exit {
        let leaf = sppf.epsilon(k);
        sppf.set_direct_child(id, leaf);
        return;
    }

    let (from, label) = info.incoming[0];
    match label {
        EdgeLabel::Epsilon => {
            // Case 3/4: return item `A -> alpha B . beta`. `from` is B's
            // End node (gfg.rs's wiring note). Whether there is a real
            // prefix before B depends on whether the call item itself was
            // the alternative's entry.
            let call_id = gfg.call_of(node).expect("return item has a matching call item");
            let b_end = from;

            if gfg.node(call_id).is_entry {
                // Case 3: `A -> B .` with nothing before B. The call always
                // fires while closing Sigma[tag], so B completed at tag
                // unambiguously from this node's perspective.
                let symbol_child = get_sppf(gfg, run, b_end, tag, k, sppf, memo);
                sppf.set_direct_child(id, symbol_child);
            } else {
                // Case 4: every distinct origin `t'` at which B completed
                // for this exact call becomes its own packed derivation.
                for origin in run.sets[k].iter().filter(|item| item.node == b_end) {
                    let t_prime = origin.tag;
                    if run.callers_of(b_end, t_prime).iter().any(|&(c, t)| c == call_id && t == tag) {
                        let prefix = get_sppf(gfg, run, call_id, tag, t_prime as usize, sppf, memo);
                        let right = get_sppf(gfg, run, b_end, t_prime, k, sppf, memo);
                        sppf.add_packed_child(id, prefix, right);
                    }
                }
            }
        }
        EdgeLabel::Scan(term) => {
            // Case 5: scan-reached item `A -> alpha a . beta`.
            let terminal = sppf.terminal(term, k - 1, k);
            if gfg.node(from).is_entry {
                sppf.set_direct_child(id, terminal);
            } else {
                let prefix = get_sppf(gfg, run, from, tag, k - 1, sppf, memo);
                sppf.add_packed_child(id, prefix, terminal);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfg::build_gfg;
    use crate::grammar::Grammar;
    use crate::lexer::{Token, VecLexer};
    use crate::sppf::{SppfLabel, SppfNode};

    fn find_descendant<'a>(sppf: &'a Sppf, root: SppfId, pred: impl Fn(&SppfNode) -> bool + Copy) -> Option<SppfId> {
        if pred(sppf.node(root)) {
            return Some(root);
        }
        for &child in sppf.node(root).children() {
            let node = sppf.node(child);
            if let SppfNode::Packed { left, right } = node {
                if let Some(found) = find_descendant(sppf, *left, pred) {
                    return Some(found);
                }
                if let Some(found) = find_descendant(sppf, *right, pred) {
                    return Some(found);
                }
            } else if let Some(found) = find_descendant(sppf, child, pred) {
                return Some(found);
            }
        }
        None
    }

    #[test]
    fn unambiguous_input_yields_a_single_chain_to_the_root() {
        let mut g = Grammar::new();
        let number = g.terminal("number");
        let e = g.nonterminal("E");
        g.add("S", vec![e]);
        g.add("E", vec![number]);
        let gfg = build_gfg(&g, "S").unwrap();
        let mut lexer = VecLexer::new(vec![Token::new("number", "7")], vec!["number".into()]);
        let forest = parse_forest(&gfg, &mut lexer, &ParseLimits::new()).unwrap();
        assert!(!forest.sppf.node(forest.root).is_ambiguous());
    }

    #[test]
    fn left_recursive_repetition_packs_multiple_splits() {
        // S -> L; L -> b | L L, over "bbb": ambiguous bracketing.
        let mut g = Grammar::new();
        let b = g.terminal("b");
        let l = g.nonterminal("L");
        g.add("S", vec![l]);
        g.add("L", vec![b]);
        g.add("L", vec![l, l]);
        let gfg = build_gfg(&g, "S").unwrap();
        let mut lexer = VecLexer::new(
            vec![Token::new("b", "b"), Token::new("b", "b"), Token::new("b", "b")],
            vec!["b".into()],
        );
        let forest = parse_forest(&gfg, &mut lexer, &ParseLimits::new()).unwrap();
        let ambiguous = find_descendant(&forest.sppf, forest.root, |n| n.is_ambiguous());
        assert!(ambiguous.is_some(), "expected an ambiguous node somewhere under the root");
    }

    #[test]
    fn two_alternatives_for_the_same_span_are_distinct_direct_children() {
        // S -> A b | b A; A -> b b, over "bbb": exactly two alternatives.
        let mut g = Grammar::new();
        let b = g.terminal("b");
        let a = g.nonterminal("A");
        g.add("S", vec![a, b]);
        g.add("S", vec![b, a]);
        g.add("A", vec![b, b]);
        let gfg = build_gfg(&g, "S").unwrap();
        let mut lexer = VecLexer::new(
            vec![Token::new("b", "b"), Token::new("b", "b"), Token::new("b", "b")],
            vec!["b".into()],
        );
        let forest = parse_forest(&gfg, &mut lexer, &ParseLimits::new()).unwrap();
        let root = forest.sppf.node(forest.root);
        assert_eq!(root.children().len(), 2);
    }

    #[test]
    fn nullable_alternative_surfaces_an_epsilon_leaf() {
        // S -> b | A b; A -> b | ε, over "b".
        let mut g = Grammar::new();
        let b = g.terminal("b");
        let a = g.nonterminal("A");
        g.add("S", vec![b]);
        g.add("S", vec![a, b]);
        g.add("A", vec![b]);
        g.add("A", vec![]);
        let gfg = build_gfg(&g, "S").unwrap();
        let mut lexer = VecLexer::new(vec![Token::new("b", "b")], vec!["b".into()]);
        let forest = parse_forest(&gfg, &mut lexer, &ParseLimits::new()).unwrap();
        let epsilon = find_descendant(&forest.sppf, forest.root, |n| n.label() == Some(SppfLabel::Epsilon));
        assert!(epsilon.is_some());
    }

    #[test]
    fn self_recursive_unit_production_does_not_recurse_forever() {
        // S -> S | b | A b; A -> b | ε, over "b". The S -> S alternative
        // routes straight back through End(S) while it is still being
        // filled in; this only terminates if get_sppf hands out a node's
        // id before recursing into its own children.
        let mut g = Grammar::new();
        let b = g.terminal("b");
        let s = g.nonterminal("S");
        let a = g.nonterminal("A");
        g.add("S", vec![s]);
        g.add("S", vec![b]);
        g.add("S", vec![a, b]);
        g.add("A", vec![b]);
        g.add("A", vec![]);
        let gfg = build_gfg(&g, "S").unwrap();
        let mut lexer = VecLexer::new(vec![Token::new("b", "b")], vec!["b".into()]);
        let forest = parse_forest(&gfg, &mut lexer, &ParseLimits::new()).unwrap();
        assert!(forest.sppf.node(forest.root).is_ambiguous());
    }
}
