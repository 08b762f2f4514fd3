//! C3, the Sigma-set engine. Builds `Σ₀ … Σₙ` by ε-closing each set to a
//! fixed point (START/EXIT/CALL/END rules) and then scanning one token to
//! seed the next set.
//!
//! The worklist discipline (FIFO queue, hash-set membership guard before
//! enqueue) follows `original_source/gfg.py::eclosuer` and the teacher's
//! `parser::algorithm::State::run_cycle`/`check_queue`. Ambient tracing
//! (`log::trace!`) replaces `gfg.py`'s `print` statements, matching the
//! `log` dependency carried by the other example repos in the pack.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Instant;

use log::trace;

use crate::error::{ParseReject, TokenError};
use crate::gfg::{EdgeLabel, Gfg, NodeId, NodeKind};
use crate::lexer::Lexer;

/// The Sigma-set index at which an item's derivation began.
pub type Tag = u32;

/// An item active in some `Σₖ`: a GFG node paired with its origin tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SigmaItem {
    pub node: NodeId,
    pub tag: Tag,
}

impl SigmaItem {
    pub fn new(node: NodeId, tag: Tag) -> Self {
        SigmaItem { node, tag }
    }
}

/// One `Σₖ`: an insertion-ordered, duplicate-free set of items.
#[derive(Debug, Clone, Default)]
pub struct SigmaSet {
    items: Vec<SigmaItem>,
    member: HashSet<SigmaItem>,
}

impl SigmaSet {
    /// Insert `item`; returns `true` if it was new (and so must still be
    /// pushed onto the closure worklist).
    fn insert(&mut self, item: SigmaItem) -> bool {
        if self.member.insert(item) {
            self.items.push(item);
            true
        } else {
            false
        }
    }

    pub fn contains(&self, item: SigmaItem) -> bool {
        self.member.contains(&item)
    }

    pub fn iter(&self) -> impl Iterator<Item = SigmaItem> + '_ {
        self.items.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Caller-supplied bounds on one parse (spec §5: "the caller may bound
/// work by token count or a per-parse deadline checked between Σ
/// advances"). Also carries the strict/lenient choice for unrecognised
/// token kinds (spec §7).
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParseLimits {
    pub max_tokens: Option<usize>,
    /// Never serialized: an `Instant` is only meaningful within the
    /// process that created it.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub deadline: Option<Instant>,
    /// When true, the scan transition returns [`TokenError`] on a token
    /// kind that matches no scan edge in the graph. When false (default)
    /// such a token simply produces no successor items, which propagates
    /// to rejection through the ordinary fixed-point machinery.
    pub strict: bool,
}

impl ParseLimits {
    pub fn new() -> Self {
        ParseLimits::default()
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    fn exceeded(&self, tokens_consumed: usize) -> bool {
        if let Some(max) = self.max_tokens {
            if tokens_consumed > max {
                return true;
            }
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return true;
            }
        }
        false
    }
}

/// `end_to_callers[k]`: for the End node reached by a production entered
/// at tag `k`, the `(call_id, call_tag)` pairs recorded when the CALL
/// rule fired in Σₖ. The END rule looks this up by the *completing*
/// item's own tag (which is always some `k' ≤ k`), never by the Σ index
/// currently being closed (see `gfg.py::eclosuer`'s
/// `sigma_end_to_call[tag]`).
type EndToCallers = Vec<HashMap<NodeId, Vec<(NodeId, Tag)>>>;

/// The complete run of Sigma sets produced by one parse, plus the
/// auxiliary bookkeeping C4/C5/C6 need to walk backwards through it.
pub struct SigmaRun {
    pub sets: Vec<SigmaSet>,
    pub end_to_callers: EndToCallers,
    /// The tokens consumed to produce `sets[1..]`, in order. `tokens[k]`
    /// is the token whose scan produced `sets[k + 1]` from `sets[k]`.
    /// Kept here (rather than requiring callers to re-buffer the lexer)
    /// since C4/C5/C6 need consumed lexemes to build leaves.
    pub tokens: Vec<crate::lexer::Token>,
}

impl SigmaRun {
    /// `(S•, 0) ∈ Σₙ`.
    pub fn accepts(&self, gfg: &Gfg) -> bool {
        self.sets
            .last()
            .map(|last| last.contains(SigmaItem::new(gfg.accept_node(), 0)))
            .unwrap_or(false)
    }

    /// Callers recorded for an End-node item with origin tag `tag`.
    pub fn callers_of(&self, end_node: NodeId, tag: Tag) -> &[(NodeId, Tag)] {
        self.end_to_callers
            .get(tag as usize)
            .and_then(|by_end| by_end.get(&end_node))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Run the full Σ₀…Σₙ construction: ε-close `Σ₀`, then alternately scan
/// and close for every token the lexer produces.
pub fn run(gfg: &Gfg, lexer: &mut dyn Lexer, limits: &ParseLimits) -> Result<SigmaRun, TokenError> {
    let mut sets = vec![SigmaSet::default()];
    let mut end_to_callers: EndToCallers = vec![HashMap::new()];
    let mut tokens = Vec::new();

    sets[0].insert(SigmaItem::new(gfg.start_node(), 0));
    close(gfg, &mut sets[0], &mut end_to_callers, 0);
    trace!("sigma[0]: {} items after closure", sets[0].len());

    let mut k: usize = 0;
    loop {
        let Some(token) = lexer.next_token() else { break };
        if limits.exceeded(k + 1) {
            break;
        }

        let mut next = SigmaSet::default();
        let term_id = gfg.term_id_for(&token.kind);
        if term_id.is_none() && limits.strict {
            return Err(TokenError::UnrecognisedKind(token.kind.clone(), k));
        }

        if let Some(term_id) = term_id {
            for item in sets[k].iter() {
                let node = gfg.node(item.node);
                if node.is_scan && node.scan_label() == Some(term_id) {
                    if let Some(target) = node.scan_target() {
                        next.insert(SigmaItem::new(target, item.tag));
                    }
                }
            }
        }

        end_to_callers.push(HashMap::new());
        close(gfg, &mut next, &mut end_to_callers, k + 1);
        trace!("sigma[{}]: {} items after scan+closure", k + 1, next.len());

        tokens.push(token);
        sets.push(next);
        k += 1;
    }

    Ok(SigmaRun { sets, end_to_callers, tokens })
}

/// Whether `gfg` accepts the tokens `lexer` produces.
pub fn recognize(gfg: &Gfg, lexer: &mut dyn Lexer, limits: &ParseLimits) -> Result<bool, TokenError> {
    let run = run(gfg, lexer, limits)?;
    Ok(run.accepts(gfg))
}

/// `recognize`, mapping a non-accepting run onto the typed rejection
/// value rather than a bare `bool`, convenient when a caller wants the
/// same `Result<(), ParseReject>` shape as the tree/forest builders.
pub fn recognize_or_reject(gfg: &Gfg, lexer: &mut dyn Lexer, limits: &ParseLimits) -> Result<(), ParseReject> {
    match recognize(gfg, lexer, limits) {
        Ok(true) => Ok(()),
        _ => Err(ParseReject),
    }
}

/// ε-close `set` (already seeded) to a fixed point, applying the
/// START/EXIT/CALL/END inference rules via a FIFO worklist (spec §4.3,
/// §5: "implementers should use a FIFO queue to produce reproducible
/// traces"). `k` is this set's own index; `end_to_callers` holds entries
/// for every index up to and including `k` (index `k`'s entry starts
/// empty and is filled in by the CALL rule as this closure runs).
fn close(gfg: &Gfg, set: &mut SigmaSet, end_to_callers: &mut EndToCallers, k: usize) {
    let mut queue: VecDeque<SigmaItem> = set.iter().collect();

    while let Some(item) = queue.pop_front() {
        let node = gfg.node(item.node);

        if node.kind == NodeKind::End {
            // END rule: callers were recorded at the index equal to this
            // item's own tag, which may be an earlier, already-finalized
            // Σ set, or (for an instantly-completing nullable) this same
            // one still under construction.
            let callers = end_to_callers
                .get(item.tag as usize)
                .and_then(|by_end| by_end.get(&item.node))
                .cloned()
                .unwrap_or_default();
            for (call_id, call_tag) in callers {
                let return_id = gfg.return_of(call_id).expect("call item has a return");
                let added = SigmaItem::new(return_id, call_tag);
                if set.insert(added) {
                    queue.push_back(added);
                }
            }
            continue;
        }

        if node.is_call {
            // CALL rule: seed the callee's Start at the *current* index k
            // (that becomes the callee instance's own tag), and record
            // this call site so the END rule can find it later.
            let target = node.call_target.expect("call item records its call target");
            let new_tag = k as Tag;
            let added = SigmaItem::new(target, new_tag);
            if set.insert(added) {
                queue.push_back(added);
            }
            let end_node = gfg.end_of(gfg.node(target).production);
            end_to_callers[k].entry(end_node).or_default().push((item.node, item.tag));
            continue;
        }

        // START rule (Start node: one ε-edge per alternative) and EXIT
        // rule (Exit item: its one ε-edge to the production's End) are
        // both just "follow every outgoing ε-edge with the same tag".
        for &(to, label) in &node.outgoing {
            if matches!(label, EdgeLabel::Epsilon) {
                let added = SigmaItem::new(to, item.tag);
                if set.insert(added) {
                    queue.push_back(added);
                }
            }
        }
    }
}
