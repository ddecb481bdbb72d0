use rand::Rng;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::compiler::compile_with_config;
use crate::error::{CompileError, GrammarError, Result};
use crate::generator::Generator;
use crate::tree::{ExpansionNode, NodeId, TreeDisplay};

/// Name of the rule generation starts from unless configured otherwise
pub const START_RULE: &str = "<START>";

/// Default bound for `*` and `+`
pub const DEFAULT_REPEAT_MAX: u32 = 2;

/// Configuration options for compiling and generating
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrammarConfig {
    /// Upper bound of the repetition count drawn for `*` and `+`
    pub repeat_max: u32,
    /// The rule generation starts from
    pub start_rule: String,
    /// Separator placed between generated tokens
    pub delimiter: String,
}

impl Default for GrammarConfig {
    fn default() -> Self {
        GrammarConfig {
            repeat_max: DEFAULT_REPEAT_MAX,
            start_rule: START_RULE.to_string(),
            delimiter: " ".to_string(),
        }
    }
}

/// A grammar compiled into expansion trees, ready for generation.
///
/// All rules share one node arena. Rule references are kept by name and
/// looked up while generating, so rules may refer to themselves and to each
/// other in any order. Every referenced name and the start rule are known to
/// exist once a value of this type has been built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompiledGrammar {
    nodes: Vec<ExpansionNode>,
    rules: BTreeMap<String, NodeId>,
    start_rule: String,
}

impl CompiledGrammar {
    pub(crate) fn new(
        nodes: Vec<ExpansionNode>,
        rules: BTreeMap<String, NodeId>,
        start_rule: String,
    ) -> Self {
        CompiledGrammar {
            nodes,
            rules,
            start_rule,
        }
    }

    /// Compile a grammar from a file
    pub fn from_file<P: AsRef<Path>>(path: P, config: &GrammarConfig) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(GrammarError::Io)?;
        Ok(compile_with_config(&text, config)?)
    }

    /// Generate a sentence from the start rule, with tokens separated by a
    /// single space
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        Generator::new(self).generate(rng)
    }

    /// Generate a sentence from any rule with a custom delimiter
    pub fn generate_from<R: Rng + ?Sized>(
        &self,
        start_rule: &str,
        rng: &mut R,
        delimiter: &str,
    ) -> std::result::Result<String, CompileError> {
        Generator::new(self)
            .delimiter(delimiter)
            .generate_from(start_rule, rng)
    }

    /// Root node of a rule's expansion tree
    pub fn root(&self, name: &str) -> Option<NodeId> {
        self.rules.get(name).copied()
    }

    /// Look up a node. Ids are only meaningful for the grammar that produced
    /// them; an id this grammar never issued gives `None`.
    pub fn node(&self, id: NodeId) -> Option<&ExpansionNode> {
        self.nodes.get(id.0)
    }

    /// Node behind an id taken from this grammar's own rules or nodes
    pub(crate) fn expansion(&self, id: NodeId) -> &ExpansionNode {
        &self.nodes[id.0]
    }

    /// Check if the grammar defines a rule
    pub fn has_rule(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    /// Rule names in sorted order
    pub fn rule_names(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    /// Number of rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Get the start rule
    pub fn start_rule(&self) -> &str {
        &self.start_rule
    }

    /// Human-readable rendering of a rule's expansion tree
    pub fn display_rule<'a>(&'a self, name: &'a str) -> Option<TreeDisplay<'a>> {
        let root = self.root(name)?;
        Some(TreeDisplay {
            nodes: &self.nodes,
            name,
            root,
        })
    }
}

impl FromStr for CompiledGrammar {
    type Err = CompileError;

    fn from_str(text: &str) -> std::result::Result<Self, Self::Err> {
        compile_with_config(text, &GrammarConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_default_config() {
        let config = GrammarConfig::default();
        assert_eq!(config.repeat_max, 2);
        assert_eq!(config.start_rule, "<START>");
        assert_eq!(config.delimiter, " ");
    }

    #[test]
    fn test_from_str() {
        let grammar: CompiledGrammar = "<START> = hello <NAME> ; <NAME> = world ;".parse().unwrap();

        assert_eq!(grammar.len(), 2);
        assert_eq!(grammar.start_rule(), START_RULE);
        let names: Vec<&str> = grammar.rule_names().collect();
        assert_eq!(names, vec!["<NAME>", "<START>"]);

        let root = grammar.root("<START>").unwrap();
        assert!(matches!(grammar.node(root), Some(ExpansionNode::Sequence(children)) if children.len() == 2));
        assert_eq!(grammar.root("<MISSING>"), None);
        assert!(grammar.display_rule("<MISSING>").is_none());
    }

    #[test]
    fn test_node_from_other_grammar() {
        let small: CompiledGrammar = "<START> = a ;".parse().unwrap();
        let large: CompiledGrammar = "<START> = a (b | c)* [d] ;".parse().unwrap();

        let foreign = large.root("<START>").unwrap();
        assert!(foreign.index() >= small.nodes.len());
        assert_eq!(small.node(foreign), None);
        assert_eq!(small.node(NodeId(small.nodes.len())), None);
    }

    #[test]
    fn test_generate_shortcuts() {
        let grammar: CompiledGrammar = "<START> = a <B> ; <B> = b c ;".parse().unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        assert_eq!(grammar.generate(&mut rng), "a b c");
        assert_eq!(grammar.generate_from("<B>", &mut rng, "-").unwrap(), "b-c");
        assert_eq!(
            grammar.generate_from("<C>", &mut rng, " ").unwrap_err(),
            CompileError::MissingStartRule("<C>".to_string())
        );
    }

    #[test]
    fn test_serialize() {
        let grammar: CompiledGrammar = "<START> = a | b ;".parse().unwrap();
        let json = serde_json::to_value(&grammar).unwrap();

        assert_eq!(json["start_rule"], "<START>");
        assert_eq!(json["rules"]["<START>"], 3);
        assert_eq!(json["nodes"][0]["terminal"], "a");
        assert_eq!(json["nodes"][2]["alternation"], serde_json::json!([0, 1]));
    }
}
