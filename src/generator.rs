//! Random sentence generation from a [`CompiledGrammar`].
//!
//! The generator walks expansion trees with an explicit work stack instead
//! of recursion, so deeply nested or recursive grammars only grow a heap
//! allocated stack. A grammar whose recursion has no way out (no alternative
//! and no zero-count repetition that avoids it) never terminates; bounding
//! that is left to whoever writes the grammar.
//!
//! All randomness comes from the `Rng` passed by the caller. Given the same
//! grammar and an identically seeded generator, the output is identical.

use rand::Rng;

use crate::error::CompileError;
use crate::grammar::{CompiledGrammar, GrammarConfig};
use crate::tree::{ExpansionNode, NodeId};

/// Produces sentences from a borrowed grammar.
///
/// The grammar is only read, so any number of generators may share it across
/// threads as long as each call gets its own random number generator.
#[derive(Debug, Clone)]
pub struct Generator<'g> {
    grammar: &'g CompiledGrammar,
    delimiter: String,
}

impl<'g> Generator<'g> {
    /// Create a generator that separates tokens with a single space
    pub fn new(grammar: &'g CompiledGrammar) -> Self {
        Generator {
            grammar,
            delimiter: " ".to_string(),
        }
    }

    /// Create a generator using the delimiter from `config`
    pub fn with_config(grammar: &'g CompiledGrammar, config: &GrammarConfig) -> Self {
        Generator::new(grammar).delimiter(&config.delimiter)
    }

    /// Set the separator placed between generated tokens
    pub fn delimiter(mut self, delimiter: &str) -> Self {
        self.delimiter = delimiter.to_string();
        self
    }

    /// Generate a sentence from the grammar's start rule
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        let root = self.expect_rule(self.grammar.start_rule());
        self.tokens(root, rng).join(&self.delimiter)
    }

    /// Generate a sentence starting from `start_rule`
    pub fn generate_from<R: Rng + ?Sized>(
        &self,
        start_rule: &str,
        rng: &mut R,
    ) -> Result<String, CompileError> {
        let root = self
            .grammar
            .root(start_rule)
            .ok_or_else(|| CompileError::MissingStartRule(start_rule.to_string()))?;
        Ok(self.tokens(root, rng).join(&self.delimiter))
    }

    /// Expand the tree under `root` into the non-empty terminal texts it emits,
    /// in output order.
    fn tokens<R: Rng + ?Sized>(&self, root: NodeId, rng: &mut R) -> Vec<&'g str> {
        let grammar = self.grammar;
        let mut output = Vec::new();
        // Nodes still to expand, next one on top.
        let mut pending = vec![root];

        while let Some(id) = pending.pop() {
            match grammar.expansion(id) {
                ExpansionNode::Terminal(text) => {
                    if !text.is_empty() {
                        output.push(text.as_str());
                    }
                }
                ExpansionNode::RuleRef(name) => pending.push(self.expect_rule(name)),
                ExpansionNode::Sequence(children) => {
                    pending.extend(children.iter().rev().copied());
                }
                ExpansionNode::Alternation(children) => {
                    pending.push(children[rng.gen_range(0..children.len())]);
                }
                ExpansionNode::Repetition { unit, min, max } => {
                    let count = rng.gen_range(*min..=*max);
                    for _ in 0..count {
                        pending.extend(unit.iter().rev().copied());
                    }
                }
            }
        }

        output
    }

    /// Root of a rule that compilation has already proven to exist
    fn expect_rule(&self, name: &str) -> NodeId {
        match self.grammar.root(name) {
            Some(root) => root,
            None => panic!(
                "rule {} is referenced but missing from a validated grammar",
                name
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashMap;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(0x5eed)
    }

    #[test]
    fn test_terminals_in_order() {
        let grammar = compile("<START> = a (b c) <D> ; <D> = d ;", 2).unwrap();
        assert_eq!(Generator::new(&grammar).generate(&mut rng()), "a b c d");
    }

    #[test]
    fn test_custom_delimiter() {
        let grammar = compile("<START> = a b c ;", 2).unwrap();
        let config = GrammarConfig {
            delimiter: ", ".to_string(),
            ..GrammarConfig::default()
        };
        let generator = Generator::with_config(&grammar, &config);
        assert_eq!(generator.generate(&mut rng()), "a, b, c");
    }

    #[test]
    fn test_empty_terminals_are_dropped() {
        let grammar = compile(r#"<START> = a "" b ;"#, 2).unwrap();
        assert_eq!(Generator::new(&grammar).generate(&mut rng()), "a b");
    }

    #[test]
    fn test_repetition_counts_stay_in_range() {
        let grammar = compile("<START> = x a* y b+ ;", 3).unwrap();
        let generator = Generator::new(&grammar);
        let mut rng = rng();
        let mut seen_a = [false; 4];
        let mut seen_b = [false; 4];

        for _ in 0..500 {
            let tokens = generator.tokens(grammar.root("<START>").unwrap(), &mut rng);
            let a = tokens.iter().filter(|t| **t == "a").count();
            let b = tokens.iter().filter(|t| **t == "b").count();
            assert!(a <= 3, "too many a: {:?}", tokens);
            assert!((1..=3).contains(&b), "bad b count: {:?}", tokens);
            seen_a[a] = true;
            seen_b[b] = true;
        }

        assert_eq!(seen_a, [true; 4]);
        assert_eq!(seen_b, [false, true, true, true]);
    }

    #[test]
    fn test_each_repetition_draws_independently() {
        let grammar = compile("<START> = (a | b)+ ;", 2).unwrap();
        let generator = Generator::new(&grammar);
        let mut rng = rng();
        let mut outputs = HashMap::new();

        for _ in 0..1000 {
            *outputs.entry(generator.generate(&mut rng)).or_insert(0) += 1;
        }

        let mut seen: Vec<&str> = outputs.keys().map(String::as_str).collect();
        seen.sort();
        assert_eq!(seen, vec!["a", "a a", "a b", "b", "b a", "b b"]);
    }

    #[test]
    fn test_same_seed_same_output() {
        let grammar = compile("<START> = <W>+ ; <W> = x | y | z | [w] ;", 4).unwrap();
        let generator = Generator::new(&grammar);

        let first: Vec<String> = {
            let mut rng = rng();
            (0..20).map(|_| generator.generate(&mut rng)).collect()
        };
        let second: Vec<String> = {
            let mut rng = rng();
            (0..20).map(|_| generator.generate(&mut rng)).collect()
        };
        assert_eq!(first, second);
    }

    #[test]
    fn test_generate_from_other_rule() {
        let grammar = compile("<START> = <A> ; <A> = a a ;", 2).unwrap();
        let generator = Generator::new(&grammar).delimiter("");
        assert_eq!(generator.generate_from("<A>", &mut rng()).unwrap(), "aa");
        assert!(generator.generate_from("<B>", &mut rng()).is_err());
    }

    #[test]
    fn test_terminating_recursion() {
        let grammar = compile("<START> = <L> ; <L> = x | y <L> ;", 2).unwrap();
        let generator = Generator::new(&grammar);
        let mut rng = rng();

        for _ in 0..100 {
            let sentence = generator.generate(&mut rng);
            let tokens: Vec<&str> = sentence.split(' ').collect();
            let (last, prefix) = tokens.split_last().unwrap();
            assert_eq!(*last, "x", "{}", sentence);
            assert!(prefix.iter().all(|t| *t == "y"), "{}", sentence);
        }
    }
}
