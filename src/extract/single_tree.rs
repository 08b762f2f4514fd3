//! C4, single-tree extraction. Runs after a successful recognition,
//! walking Sigma sets backwards from `(S•, 0) ∈ Σₙ` (spec §4.4). No
//! direct analogue exists in `original_source/`; the nested-tree output
//! shape takes its cue from `sparkparser.py`'s AST-building actions, and
//! the output representation itself is the teacher's
//! [`crate::trees::BoxTree`].

use std::collections::{HashMap, VecDeque};

use crate::error::ParseReject;
use crate::gfg::{EdgeLabel, Gfg, NodeId};
use crate::lexer::Lexer;
use crate::sigma::{self, ParseLimits, SigmaItem, SigmaRun, Tag};
use crate::trees::{BoxTree, Tree};

/// Re-entry key for the cycle-breaking reshuffle described in spec §4.4 /
/// §9: "track a visited-set of `(item, tag, k)`; on re-visit, reshuffle
/// candidate order."
type VisitKey = (NodeId, Tag, usize);

/// Recognize, then extract any one concrete parse tree.
pub fn parse_one(gfg: &Gfg, lexer: &mut dyn Lexer, limits: &ParseLimits) -> Result<BoxTree<String, String>, ParseReject> {
    let run = sigma::run(gfg, lexer, limits).map_err(|_| ParseReject)?;
    if !run.accepts(gfg) {
        return Err(ParseReject);
    }
    let n = run.sets.len() - 1;
    let mut visited: HashMap<VisitKey, usize> = HashMap::new();
    Ok(build_symbol(gfg, &run, gfg.accept_node(), 0, n, &mut visited))
}

/// Build the subtree for the production whose End node is `end_node`,
/// given it was entered at `tag` and completes at Σₖ: pick an eligible
/// exit predecessor (spec's "End inference rule" inverse) and walk its
/// alternative's item chain backwards.
fn build_symbol(
    gfg: &Gfg,
    run: &SigmaRun,
    end_node: NodeId,
    tag: Tag,
    k: usize,
    visited: &mut HashMap<VisitKey, usize>,
) -> BoxTree<String, String> {
    let prod = gfg.node(end_node).production;

    let mut candidates: Vec<NodeId> = gfg
        .node(end_node)
        .incoming
        .iter()
        .map(|&(exit_item, _)| exit_item)
        .filter(|&exit_item| run.sets[k].contains(SigmaItem::new(exit_item, tag)))
        .collect();
    assert!(!candidates.is_empty(), "accepted parse always has at least one eligible exit item");

    let visits = visited.entry((end_node, tag, k)).or_insert(0);
    if candidates.len() > 1 && *visits > 0 {
        let shift = *visits % candidates.len();
        candidates.rotate_left(shift);
    }
    *visits += 1;

    let exit_item = candidates[0];
    let children = walk_chain(gfg, run, exit_item, tag, k, visited);
    BoxTree::new_branch(gfg.nonterm_name(prod).to_string(), children)
}

/// Walk backwards from `current` (an exit item) to its alternative's
/// entry item, collecting the children of the symbol this alternative
/// belongs to, in left-to-right order.
fn walk_chain(
    gfg: &Gfg,
    run: &SigmaRun,
    mut current: NodeId,
    mut tag: Tag,
    mut k: usize,
    visited: &mut HashMap<VisitKey, usize>,
) -> Vec<BoxTree<String, String>> {
    let mut children: VecDeque<BoxTree<String, String>> = VecDeque::new();

    loop {
        let node = gfg.node(current);
        if node.is_entry {
            break;
        }

        // Invariant (spec §3.3): every non-start, non-call node has at
        // most one incoming edge inside its production, and every
        // non-entry item has exactly one.
        let (from, label) = node.incoming[0];

        match label {
            EdgeLabel::Scan(_) => {
                let token = &run.tokens[k - 1];
                children.push_front(BoxTree::new_leaf(token.lexeme.clone()));
                current = from;
                k -= 1;
            }
            EdgeLabel::Epsilon => {
                // A return item: `from` is the called production's End
                // node (spec §4.2's "return item's incoming edge comes
                // from B•"). Find the tag at which that instance of B
                // completed by matching this call against the recorded
                // callers.
                let call_id = gfg.call_of(current).expect("return item has a matching call item");
                let b_end = from;
                let origin_tag = run
                    .sets[k]
                    .iter()
                    .filter(|item| item.node == b_end)
                    .find_map(|item| {
                        run.callers_of(b_end, item.tag)
                            .iter()
                            .any(|&(c, t)| c == call_id && t == tag)
                            .then_some(item.tag)
                    })
                    .expect("accepted parse always has a recorded caller for a completed return");

                let subtree = build_symbol(gfg, run, b_end, origin_tag, k, visited);
                children.push_front(subtree);
                current = call_id;
                k = origin_tag as usize;
            }
        }
    }

    children.into_iter().collect()
}
