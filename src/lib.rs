//! BNF-Gen compiles BNF-style grammars and generates random sentences from them.
//!
//! A grammar is a list of rules `<name> = expansion ;`. Bare words are
//! terminals, `<name>` refers to another rule, whitespace concatenates,
//! `|` separates alternatives within the nearest enclosing group, `( ... )`
//! groups, `[ ... ]` is optional, and a trailing `*` or `+` repeats the unit
//! before it zero-or-more or one-or-more times, up to a configured bound.
//! Comments run from `//` to the end of the line. Generation starts at
//! `<START>`.
//!
//! # Example
//!
//! ```rust
//! use bnf_gen::{compile, generate};
//! use rand::SeedableRng;
//! use rand::rngs::StdRng;
//!
//! let grammar = compile(
//!     "<START> = the <NOUN> (runs | sleeps) ; // a tiny grammar
//!      <NOUN>  = cat | dog ;",
//!     2,
//! )
//! .unwrap();
//!
//! let mut rng = StdRng::seed_from_u64(42);
//! let sentence = generate(&grammar, "<START>", &mut rng, " ").unwrap();
//! assert!(sentence.starts_with("the "));
//! ```

pub mod compiler;
pub mod error;
pub mod generator;
pub mod grammar;
pub mod lexer;
pub mod tree;

pub use compiler::{GrammarBuilder, RawRuleSet, compile, compile_with_config};
pub use error::{CompileError, GrammarError, Result};
pub use generator::Generator;
pub use grammar::{CompiledGrammar, DEFAULT_REPEAT_MAX, GrammarConfig, START_RULE};
pub use tree::{ExpansionNode, NodeId, TreeDisplay};

use rand::Rng;

/// Generate one sentence from `grammar`, starting at `start_rule` and joining
/// the emitted terminals with `delimiter`.
///
/// Fails only if `start_rule` is not a rule of the grammar.
pub fn generate<R: Rng + ?Sized>(
    grammar: &CompiledGrammar,
    start_rule: &str,
    rng: &mut R,
    delimiter: &str,
) -> std::result::Result<String, CompileError> {
    Generator::new(grammar)
        .delimiter(delimiter)
        .generate_from(start_rule, rng)
}
