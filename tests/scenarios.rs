//! Literal end-to-end scenarios (spec.md §8, S1–S6), run against the
//! crate's public surface rather than any module's internals.

use gfg_core::extract::single_tree::parse_one;
use gfg_core::extract::sppf_bottom_up::parse_forest_online;
use gfg_core::extract::sppf_top_down::parse_forest;
use gfg_core::gfg::build_gfg;
use gfg_core::grammar::Grammar;
use gfg_core::lexer::{Token, VecLexer};
use gfg_core::sigma::{recognize_or_reject, ParseLimits};
use gfg_core::trees::Tree;

/// Turns on the crate's `log::trace!` worklist tracing for whichever test
/// calls it, so a failing scenario can be re-run with `--nocapture` and
/// show the Sigma-set closure step by step. Safe to call from more than
/// one test; `try_init` just no-ops after the first success.
fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Splits on whitespace and single-character punctuation, classifying
/// each piece against a fixed set of kinds. A test fixture only, not a
/// shipped tokenizer (A2: lexing is an external collaborator).
fn tokenize(input: &str, kinds: &[&str]) -> VecLexer {
    let mut tokens = Vec::new();
    for piece in input.split_whitespace() {
        let mut rest = piece;
        while !rest.is_empty() {
            let (lexeme, tail) = if let Some(c) = rest.chars().next().filter(|c| "()+".contains(*c)) {
                (c.to_string(), &rest[c.len_utf8()..])
            } else {
                let end = rest.find(|c: char| "()+".contains(c)).unwrap_or(rest.len());
                (rest[..end].to_string(), &rest[end..])
            };
            let kind = match lexeme.as_str() {
                "(" => "lparen",
                ")" => "rparen",
                "+" => "plus",
                _ => "number",
            };
            tokens.push(Token::new(kind, &lexeme));
            rest = tail;
        }
    }
    VecLexer::new(tokens, kinds.iter().map(|s| s.to_string()).collect())
}

fn arith_grammar() -> Grammar {
    let mut g = Grammar::new();
    let number = g.terminal("number");
    let plus = g.terminal("plus");
    let lparen = g.terminal("lparen");
    let rparen = g.terminal("rparen");
    let e = g.nonterminal("E");
    g.add("S", vec![e]);
    g.add("E", vec![number]);
    g.add("E", vec![e, plus, e]);
    g.add("E", vec![lparen, e, plus, e, rparen]);
    g
}

#[test]
fn s1_accepts_and_the_tree_reads_back_the_input() {
    init_logging();
    let g = arith_grammar();
    let gfg = build_gfg(&g, "S").unwrap();
    let mut lexer = tokenize("7 + 8 + 9", &["number", "plus", "lparen", "rparen"]);
    let tree = parse_one(&gfg, &mut lexer, &ParseLimits::new()).unwrap();
    assert_eq!(tree.branch_val().unwrap(), "S");

    fn leaves(tree: &gfg_core::trees::BoxTree<String, String>, out: &mut Vec<String>) {
        match tree {
            gfg_core::trees::BoxTree::Leaf { val } => out.push(val.clone()),
            gfg_core::trees::BoxTree::Branch { children, .. } => children.iter().for_each(|c| leaves(c, out)),
        }
    }
    let mut out = Vec::new();
    leaves(&tree, &mut out);
    assert_eq!(out, vec!["7", "+", "8", "+", "9"]);
}

#[test]
fn s2_rejects_a_dangling_open_paren() {
    init_logging();
    let g = arith_grammar();
    let gfg = build_gfg(&g, "S").unwrap();
    let mut lexer = tokenize("(7+9", &["number", "plus", "lparen", "rparen"]);
    assert!(recognize_or_reject(&gfg, &mut lexer, &ParseLimits::new()).is_err());
}

#[test]
fn s3_ambiguous_repetition_packs_at_least_two_derivations() {
    init_logging();
    let mut g = Grammar::new();
    let b = g.terminal("b");
    let l = g.nonterminal("L");
    g.add("S", vec![l]);
    g.add("L", vec![b]);
    g.add("L", vec![l, l]);
    let gfg = build_gfg(&g, "S").unwrap();

    let mut lexer = VecLexer::new(vec![Token::new("b", "b"); 3], vec!["b".into()]);
    let forest = parse_forest(&gfg, &mut lexer, &ParseLimits::new()).unwrap();
    let root = forest.sppf.node(forest.root);
    assert_eq!(root.children().len(), 1, "S has a single alternative, so one direct child");
    let intermediate_or_l = root.children()[0];
    let packed_count = count_packed(&forest.sppf, intermediate_or_l);
    assert!(packed_count >= 2, "expected at least two packed derivations under L's node, found {packed_count}");
}

fn count_packed(sppf: &gfg_core::sppf::Sppf, id: gfg_core::sppf::SppfId) -> usize {
    use gfg_core::sppf::SppfNode;
    match sppf.node(id) {
        SppfNode::Packed { left, right } => 1 + count_packed(sppf, *left) + count_packed(sppf, *right),
        node => node.children().iter().map(|&c| count_packed(sppf, c)).sum(),
    }
}

#[test]
fn s4_two_alternatives_are_exposed_as_distinct_children() {
    init_logging();
    let mut g = Grammar::new();
    let b = g.terminal("b");
    let a = g.nonterminal("A");
    g.add("S", vec![a, b]);
    g.add("S", vec![b, a]);
    g.add("A", vec![b, b]);
    let gfg = build_gfg(&g, "S").unwrap();
    let mut lexer = VecLexer::new(vec![Token::new("b", "b"); 3], vec!["b".into()]);
    let forest = parse_forest_online(&gfg, &mut lexer, &ParseLimits::new()).unwrap();
    assert_eq!(forest.sppf.node(forest.root).children().len(), 2);
}

#[test]
fn s5_nullable_alternative_surfaces_an_epsilon_leaf() {
    use gfg_core::sppf::SppfLabel;

    init_logging();
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

    fn find_epsilon(sppf: &gfg_core::sppf::Sppf, id: gfg_core::sppf::SppfId, seen: &mut std::collections::HashSet<gfg_core::sppf::SppfId>) -> bool {
        if !seen.insert(id) {
            return false;
        }
        if sppf.node(id).label() == Some(SppfLabel::Epsilon) {
            return true;
        }
        sppf.node(id).children().iter().any(|&c| find_epsilon(sppf, c, seen))
    }
    let mut seen = std::collections::HashSet::new();
    assert!(find_epsilon(&forest.sppf, forest.root, &mut seen));

    // online builder agrees too (property 5)
    let mut lexer_online = VecLexer::new(vec![Token::new("b", "b")], vec!["b".into()]);
    let online = parse_forest_online(&gfg, &mut lexer_online, &ParseLimits::new()).unwrap();
    let mut seen_online = std::collections::HashSet::new();
    assert!(find_epsilon(&online.sppf, online.root, &mut seen_online));
}

#[test]
fn s6_non_nullable_start_rejects_empty_input() {
    init_logging();
    let mut g = Grammar::new();
    let number = g.terminal("number");
    g.add("S", vec![number]);
    let gfg = build_gfg(&g, "S").unwrap();
    let mut lexer = VecLexer::new(vec![], vec!["number".into()]);
    assert!(recognize_or_reject(&gfg, &mut lexer, &ParseLimits::new()).is_err());
}
