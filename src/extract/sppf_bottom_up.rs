//! C6, the bottom-up (online) SPPF builder. Runs Scott's online construction
//! lifted onto GFG items (spec §4.6/§4.7): recognition and forest
//! construction happen in the same forward sweep, instead of C5's
//! backward pass over an already-finished [`crate::sigma::SigmaRun`].
//!
//! The worklist/closure shape is the forward twin of `src/sigma.rs`'s
//! `close` (same START/EXIT/CALL/END dispatch, grounded the same way on
//! `original_source/gfg.py::eclosuer`); what's added here is an SPPF ref
//! carried alongside every item and `make_node` (spec §4.6) merging two
//! half-derivations into a shared/packed node exactly like `src/sppf.rs`
//! does for C5. `H` (`nullable_at` below) is the one genuinely new piece:
//! it catches a caller that registers for a production *after* that
//! production already completed nullably at the same index, a case C3's
//! plain recognizer (knowingly, matching `gfg.py`) does not need to
//! handle because it only needs reachability, not a complete forest.

use std::collections::{HashMap, VecDeque};
use std::time::Instant;

use crate::extract::sppf_top_down::Forest;
use crate::error::ParseReject;
use crate::gfg::{EdgeLabel, Gfg, NodeId, NodeKind};
use crate::grammar::{NonTermId, Symbol};
use crate::lexer::Lexer;
use crate::sigma::{ParseLimits, SigmaItem, Tag};
use crate::sppf::{Sppf, SppfId};

type SppfRef = Option<SppfId>;

/// `(call_id, call_tag, prefix_ref)` recorded when the CALL rule fires,
/// mirroring `sigma.rs`'s `end_to_callers` but additionally carrying the
/// caller's own half-derivation so the END rule can merge it later.
type EndToCallers = Vec<HashMap<NodeId, Vec<(NodeId, Tag, SppfRef)>>>;

/// `H`: per index `i`, the SPPF ref a production completed with, the
/// moment it completes with `tag == i` (spec §4.6's nullable short-circuit).
type NullableCompletions = Vec<HashMap<NonTermId, SppfId>>;

/// One in-progress or finished `Σᵢ`, carrying an SPPF ref alongside every
/// item (`None` standing for the paper's `⊥`).
#[derive(Default)]
struct OnlineSet {
    refs: HashMap<SigmaItem, SppfRef>,
    order: Vec<SigmaItem>,
}

impl OnlineSet {
    fn contains(&self, item: SigmaItem) -> bool {
        self.refs.contains_key(&item)
    }

    fn get(&self, item: SigmaItem) -> SppfRef {
        self.refs.get(&item).copied().flatten()
    }

    fn iter(&self) -> impl Iterator<Item = SigmaItem> + '_ {
        self.order.iter().copied()
    }

    /// Seed an item before closure starts (no worklist to push onto yet).
    fn seed(&mut self, item: SigmaItem, sppf_ref: SppfRef) {
        if !self.refs.contains_key(&item) {
            self.order.push(item);
        }
        self.refs.insert(item, sppf_ref);
    }

    /// Insert `item` during closure if not already present. Once an
    /// item's ref is set it never needs updating in place: shared nodes
    /// accumulate their packed/direct children by mutating the same
    /// `SppfId` in the arena, regardless of how many times a caller
    /// reaches this item afterwards (spec §4.7: "no item is re-expanded
    /// in the same Σ").
    fn insert_or_enqueue(&mut self, queue: &mut VecDeque<SigmaItem>, item: SigmaItem, sppf_ref: SppfRef) {
        if !self.refs.contains_key(&item) {
            self.refs.insert(item, sppf_ref);
            self.order.push(item);
            queue.push_back(item);
        }
    }
}

/// `make_node(item, left, right)` (spec §4.6): drop a `⊥` side without
/// allocating; once both sides are present, merge into a shared node via
/// `node_for_pair` (idempotent, repeated calls for the same span return
/// the same id) and attach a packed child (idempotent, repeated
/// identical pairs are not double counted, see `Sppf::add_packed_child`).
fn make_node(sppf: &mut Sppf, node_for_pair: impl FnOnce(&mut Sppf) -> SppfId, left: SppfRef, right: SppfRef) -> SppfRef {
    match (left, right) {
        (None, None) => None,
        (Some(l), None) => Some(l),
        (None, Some(r)) => Some(r),
        (Some(l), Some(r)) => {
            let parent = node_for_pair(sppf);
            sppf.add_packed_child(parent, l, r);
            Some(parent)
        }
    }
}

/// Recognize and build the forest in one forward pass.
pub fn parse_forest_online(gfg: &Gfg, lexer: &mut dyn Lexer, limits: &ParseLimits) -> Result<Forest, ParseReject> {
    let mut sppf = Sppf::new();
    let mut sets: Vec<OnlineSet> = vec![OnlineSet::default()];
    let mut end_to_callers: EndToCallers = vec![HashMap::new()];
    let mut nullable_at: NullableCompletions = vec![HashMap::new()];

    sets[0].seed(SigmaItem::new(gfg.start_node(), 0), None);
    close(gfg, &mut sppf, &mut sets[0], &mut end_to_callers, &mut nullable_at, 0);

    let mut i = 0usize;
    loop {
        let Some(token) = lexer.next_token() else { break };
        let exceeded = limits.max_tokens.map_or(false, |max| i + 1 > max)
            || limits.deadline.map_or(false, |dl| Instant::now() >= dl);
        if exceeded {
            break;
        }

        let term_id = gfg.term_id_for(&token.kind);
        if term_id.is_none() && limits.strict {
            return Err(ParseReject);
        }

        let mut next = OnlineSet::default();
        if let Some(term_id) = term_id {
            for item in sets[i].iter() {
                let node = gfg.node(item.node);
                if !node.is_scan || node.scan_label() != Some(term_id) {
                    continue;
                }
                let Some(target) = node.scan_target() else { continue };
                let prefix_ref = sets[i].get(item);
                let terminal = sppf.terminal(term_id, i, i + 1);
                let merged = make_node(&mut sppf, |s| s.intermediate(target, item.tag as usize, i + 1), prefix_ref, Some(terminal));
                next.seed(SigmaItem::new(target, item.tag), merged);
            }
        }

        end_to_callers.push(HashMap::new());
        nullable_at.push(HashMap::new());
        close(gfg, &mut sppf, &mut next, &mut end_to_callers, &mut nullable_at, i + 1);
        sets.push(next);
        i += 1;
    }

    let n = sets.len() - 1;
    let accept = SigmaItem::new(gfg.accept_node(), 0);
    if !sets[n].contains(accept) {
        return Err(ParseReject);
    }
    let root = sets[n].get(accept).expect("an accepted run's End(S) item always carries its merged symbol ref");
    Ok(Forest { sppf, root })
}

/// ε-close `set` to a fixed point, building SPPF nodes as items are
/// discovered (spec §4.6's Call/Exit/Scan transitions, Exit folded into
/// the generic epsilon-follow loop below since `A•`'s only production-
/// internal predecessor is an Exit item, see `gfg/mod.rs`'s wiring note).
fn close(gfg: &Gfg, sppf: &mut Sppf, set: &mut OnlineSet, end_to_callers: &mut EndToCallers, nullable_at: &mut NullableCompletions, k: usize) {
    let mut queue: VecDeque<SigmaItem> = set.iter().collect();

    while let Some(item) = queue.pop_front() {
        let node = gfg.node(item.node);

        if node.kind == NodeKind::End {
            // END rule: merge this caller's prefix with the (by-now,
            // possibly still growing) completed symbol node.
            let completion_ref = set.get(item).expect("an End item always carries its merged symbol ref once dequeued");
            let callers = end_to_callers
                .get(item.tag as usize)
                .and_then(|by_end| by_end.get(&item.node))
                .cloned()
                .unwrap_or_default();
            for (call_id, call_tag, prefix_ref) in callers {
                let return_id = gfg.return_of(call_id).expect("call item has a return");
                let merged = make_node(sppf, |s| s.intermediate(return_id, call_tag as usize, k), prefix_ref, Some(completion_ref));
                set.insert_or_enqueue(&mut queue, SigmaItem::new(return_id, call_tag), merged);
            }
            continue;
        }

        if node.is_call {
            // CALL rule: seed the callee's Start with no content yet,
            // record this call site, then check H for a nullable
            // completion this production already produced at this same
            // index, the one case a registration can arrive "too late"
            // for the ordinary END-rule walkback above to ever see it.
            let target = node.call_target.expect("call item records its call target");
            let new_tag = k as Tag;
            let prefix_ref = set.get(item);
            set.insert_or_enqueue(&mut queue, SigmaItem::new(target, new_tag), None);

            let b_prod = gfg.node(target).production;
            let end_node = gfg.end_of(b_prod);
            end_to_callers[k].entry(end_node).or_default().push((item.node, item.tag, prefix_ref));

            if let Some(&completed) = nullable_at[k].get(&b_prod) {
                let return_id = gfg.return_of(item.node).expect("call item has a return");
                let merged = make_node(sppf, |s| s.intermediate(return_id, item.tag as usize, k), prefix_ref, Some(completed));
                set.insert_or_enqueue(&mut queue, SigmaItem::new(return_id, item.tag), merged);
            }
            continue;
        }

        // START rule (Start node) and EXIT rule (Exit item) both just
        // follow every outgoing ε-edge with the same tag; an edge landing
        // on an End node additionally merges a direct symbol child, and
        // an edge landing on a nullable (entry-and-exit) item seeds its
        // ε-leaf content.
        for &(to, label) in &node.outgoing {
            if !matches!(label, EdgeLabel::Epsilon) {
                continue;
            }
            let to_info = gfg.node(to);
            let to_item = SigmaItem::new(to, item.tag);

            if to_info.kind == NodeKind::End {
                let prod = to_info.production;
                let symbol_id = match set.get(to_item) {
                    Some(id) => id,
                    None => sppf.symbol(Symbol::NonTerminal(prod), item.tag as usize, k),
                };
                if let Some(exit_ref) = set.get(item) {
                    sppf.add_symbol_child(symbol_id, exit_ref);
                }
                if item.tag as usize == k {
                    nullable_at[k].insert(prod, symbol_id);
                }
                set.insert_or_enqueue(&mut queue, to_item, Some(symbol_id));
            } else if to_info.is_entry && to_info.is_exit {
                let leaf_ref = set.get(to_item).unwrap_or_else(|| sppf.epsilon(k));
                set.insert_or_enqueue(&mut queue, to_item, Some(leaf_ref));
            } else {
                set.insert_or_enqueue(&mut queue, to_item, None);
            }
        }
    }
}
