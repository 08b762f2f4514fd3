//! C1, the grammar model. A mapping from non-terminal to an ordered list
//! of alternatives, each alternative an ordered sequence of symbols.
//!
//! Symbols are tagged at construction time (`terminal`/`nonterminal`
//! intern calls), so unlike `original_source/gfg.py`'s plain string
//! productions map, there is no runtime ambiguity about whether a symbol
//! is a terminal or a non-terminal, matching the teacher's original
//! `Symbol::{Terminal,NonTerminal}` split.

use std::collections::HashMap;

use crate::error::{GrammarError, GrammarResult};

/// Indexes into [`Grammar`]'s terminal table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TermId(pub u32);

/// Indexes into [`Grammar`]'s non-terminal table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NonTermId(pub u32);

/// A grammar symbol: either a terminal (matched by lexer token kind) or a
/// non-terminal (matched by recursive production).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbol {
    Terminal(TermId),
    NonTerminal(NonTermId),
}

impl From<TermId> for Symbol {
    fn from(id: TermId) -> Self {
        Symbol::Terminal(id)
    }
}

impl From<NonTermId> for Symbol {
    fn from(id: NonTermId) -> Self {
        Symbol::NonTerminal(id)
    }
}

/// A context-free grammar: non-terminals, each with an ordered list of
/// alternatives (an alternative is an ordered `Vec<Symbol>`; an empty
/// `Vec` denotes the epsilon alternative `A -> ε`).
#[derive(Debug, Clone, Default)]
pub struct Grammar {
    term_names: Vec<String>,
    term_ids: HashMap<String, TermId>,
    nonterm_names: Vec<String>,
    nonterm_ids: HashMap<String, NonTermId>,
    alternatives: Vec<Vec<Vec<Symbol>>>,
}

impl Grammar {
    pub fn new() -> Self {
        Grammar::default()
    }

    /// Intern (or look up) a terminal symbol by name.
    pub fn terminal(&mut self, name: &str) -> Symbol {
        if let Some(id) = self.term_ids.get(name) {
            return Symbol::Terminal(*id);
        }
        let id = TermId(self.term_names.len() as u32);
        self.term_names.push(name.to_string());
        self.term_ids.insert(name.to_string(), id);
        Symbol::Terminal(id)
    }

    /// Intern (or look up) a non-terminal symbol by name. Does not add any
    /// alternatives for it. A non-terminal interned this way but never
    /// passed to [`Grammar::add`] has zero alternatives, which is only
    /// legal if it turns out to be unreachable from the start symbol
    /// (checked by `build_gfg`).
    pub fn nonterminal(&mut self, name: &str) -> Symbol {
        if let Some(id) = self.nonterm_ids.get(name) {
            return Symbol::NonTerminal(*id);
        }
        let id = NonTermId(self.nonterm_names.len() as u32);
        self.nonterm_names.push(name.to_string());
        self.nonterm_ids.insert(name.to_string(), id);
        self.alternatives.push(Vec::new());
        Symbol::NonTerminal(id)
    }

    /// Add one alternative for `nonterminal`. Call once per alternative;
    /// an empty `alternative` denotes `nonterminal -> ε`.
    pub fn add(&mut self, nonterminal: &str, alternative: Vec<Symbol>) -> NonTermId {
        let sym = self.nonterminal(nonterminal);
        let id = match sym {
            Symbol::NonTerminal(id) => id,
            Symbol::Terminal(_) => unreachable!("nonterminal() always returns NonTerminal"),
        };
        self.alternatives[id.0 as usize].push(alternative);
        id
    }

    pub fn alternatives(&self, id: NonTermId) -> &[Vec<Symbol>] {
        &self.alternatives[id.0 as usize]
    }

    pub fn nonterm_id(&self, name: &str) -> Option<NonTermId> {
        self.nonterm_ids.get(name).copied()
    }

    pub fn term_id(&self, name: &str) -> Option<TermId> {
        self.term_ids.get(name).copied()
    }

    pub fn nonterm_name(&self, id: NonTermId) -> &str {
        &self.nonterm_names[id.0 as usize]
    }

    pub fn term_name(&self, id: TermId) -> &str {
        &self.term_names[id.0 as usize]
    }

    pub fn nonterm_count(&self) -> usize {
        self.nonterm_names.len()
    }

    pub fn nonterm_ids(&self) -> impl Iterator<Item = NonTermId> {
        (0..self.nonterm_names.len() as u32).map(NonTermId)
    }

    pub fn terminals(&self) -> impl Iterator<Item = (TermId, &str)> {
        self.term_names.iter().enumerate().map(|(i, name)| (TermId(i as u32), name.as_str()))
    }

    pub fn is_terminal(&self, sym: Symbol) -> bool {
        matches!(sym, Symbol::Terminal(_))
    }

    pub fn is_nonterminal(&self, sym: Symbol) -> bool {
        matches!(sym, Symbol::NonTerminal(_))
    }

    pub fn symbol_name(&self, sym: Symbol) -> &str {
        match sym {
            Symbol::Terminal(id) => self.term_name(id),
            Symbol::NonTerminal(id) => self.nonterm_name(id),
        }
    }

    /// Verify that every non-terminal reachable from `start` has at least
    /// one alternative recorded. Called by `build_gfg`; kept on `Grammar`
    /// itself so the check can also be run standalone.
    pub fn check_reachable(&self, start: NonTermId) -> GrammarResult<()> {
        let mut seen = vec![false; self.nonterm_count()];
        let mut stack = vec![start];
        seen[start.0 as usize] = true;

        while let Some(id) = stack.pop() {
            let alts = self.alternatives(id);
            if alts.is_empty() {
                return Err(GrammarError::UnknownSymbol(self.nonterm_name(id).to_string()));
            }
            for alt in alts {
                for sym in alt {
                    if let Symbol::NonTerminal(next) = sym {
                        if !seen[next.0 as usize] {
                            seen[next.0 as usize] = true;
                            stack.push(*next);
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Build a grammar from a line-oriented textual form:
    /// `NonTerm -> Sym1 Sym2 | Sym3` with one production group per line and
    /// `|` separating alternatives. A bare `ε` or an alternative with no
    /// symbols denotes the empty alternative. Any symbol name not already
    /// used as a production's left-hand side anywhere in the text is
    /// treated as a terminal.
    ///
    /// This mirrors the shape of `original_source/gfg.py`'s in-memory
    /// `productions` map; it is a convenience, not the canonical grammar
    /// representation (spec §6: "a textual map form is acceptable but not
    /// mandated").
    pub fn parse_text(text: &str) -> Grammar {
        let mut lines: Vec<(&str, Vec<&str>)> = Vec::new();
        for raw_line in text.lines() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((lhs, rhs)) = line.split_once("->") else { continue };
            let lhs = lhs.trim();
            let alt_strs: Vec<&str> = rhs.split('|').collect();
            lines.push((lhs, alt_strs));
        }

        let mut lhs_names: std::collections::HashSet<&str> = std::collections::HashSet::new();
        for (lhs, _) in &lines {
            lhs_names.insert(lhs);
        }

        let mut grammar = Grammar::new();
        for (lhs, alt_strs) in lines {
            for alt_str in alt_strs {
                let symbols: Vec<&str> = alt_str.split_whitespace().collect();
                let alt = if symbols.len() == 1 && symbols[0] == "\u{3b5}" {
                    Vec::new()
                } else {
                    symbols
                        .into_iter()
                        .map(|name| {
                            if lhs_names.contains(name) {
                                grammar.nonterminal(name)
                            } else {
                                grammar.terminal(name)
                            }
                        })
                        .collect()
                };
                grammar.add(lhs, alt);
            }
        }
        grammar
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_read_back_alternatives() {
        let mut g = Grammar::new();
        let number = g.terminal("number");
        let plus = g.terminal("plus");
        let e = g.nonterminal("E");
        g.add("E", vec![number]);
        g.add("E", vec![e, plus, e]);

        let id = g.nonterm_id("E").unwrap();
        assert_eq!(g.alternatives(id).len(), 2);
        assert!(g.is_terminal(number));
        assert!(g.is_nonterminal(e));
    }

    #[test]
    fn reachability_flags_missing_alternatives() {
        let mut g = Grammar::new();
        let a = g.nonterminal("A");
        g.add("S", vec![a]);
        let start = g.nonterm_id("S").unwrap();

        assert!(g.check_reachable(start).is_err());
    }

    #[test]
    fn unreachable_nonterminal_without_alternatives_is_fine() {
        let mut g = Grammar::new();
        g.nonterminal("Unused");
        g.add("S", vec![]);
        let start = g.nonterm_id("S").unwrap();

        assert!(g.check_reachable(start).is_ok());
    }

    #[test]
    fn parse_text_classifies_terminals_by_absence_of_lhs() {
        let grammar = Grammar::parse_text(
            "S -> E\n\
             E -> number | E plus E",
        );
        let e = grammar.nonterm_id("E").unwrap();
        assert_eq!(grammar.alternatives(e).len(), 2);
        assert!(grammar.term_id("number").is_some());
        assert!(grammar.term_id("plus").is_some());
    }

    #[test]
    fn parse_text_supports_epsilon() {
        let grammar = Grammar::parse_text(
            "S -> L b | b A\n\
             A -> b | \u{3b5}",
        );
        let a = grammar.nonterm_id("A").unwrap();
        let alts = grammar.alternatives(a);
        assert!(alts.iter().any(|alt| alt.is_empty()));
    }
}
