use std::collections::BTreeMap;
use std::mem;

use crate::error::CompileError;
use crate::grammar::{CompiledGrammar, GrammarConfig};
use crate::lexer::{self, TokenKind};
use crate::tree::{ExpansionNode, NodeArena, NodeId};

/// Rule names mapped to their still unparsed expansions, in definition order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRuleSet {
    rules: Vec<(String, String)>,
}

impl RawRuleSet {
    /// Create an empty rule set
    pub fn new() -> Self {
        RawRuleSet { rules: Vec::new() }
    }

    /// Split grammar source text into its rules.
    ///
    /// Only the `name = expansion ;` framing is checked here; expansions are
    /// parsed by [`RawRuleSet::compile`].
    pub fn parse(text: &str) -> Result<Self, CompileError> {
        let normalized = lexer::normalize(text);
        let mut rule_set = RawRuleSet::new();

        for rule in lexer::split_rules(&normalized) {
            let (name, expansion) = lexer::split_assignment(rule).ok_or_else(|| {
                let name = rule.split_whitespace().next().unwrap_or(rule);
                CompileError::syntax(name, "missing '=' between rule name and expansion")
            })?;
            if name.is_empty() {
                return Err(CompileError::syntax(rule, "missing rule name"));
            }
            check_rule_name(name)?;
            rule_set.insert(name, expansion);
        }

        Ok(rule_set)
    }

    /// Add a rule. A later definition of the same name replaces the earlier one.
    pub fn insert(&mut self, name: &str, expansion: &str) -> &mut Self {
        let expansion = lexer::normalize(expansion);
        match self.rules.iter_mut().find(|(existing, _)| existing == name) {
            Some((_, slot)) => *slot = expansion,
            None => self.rules.push((name.to_string(), expansion)),
        }
        self
    }

    /// Get the normalized expansion of a rule
    pub fn get(&self, name: &str) -> Option<&str> {
        self.rules
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, expansion)| expansion.as_str())
    }

    /// Iterate over `(name, expansion)` pairs in definition order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.rules
            .iter()
            .map(|(name, expansion)| (name.as_str(), expansion.as_str()))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Compile every rule and validate the result as a whole.
    ///
    /// Either all rules compile, every rule reference resolves and the start
    /// rule exists, or the first problem found is returned.
    pub fn compile(&self, config: &GrammarConfig) -> Result<CompiledGrammar, CompileError> {
        if config.repeat_max == 0 {
            return Err(CompileError::InvalidRepeatBound(config.repeat_max));
        }

        let mut compiler = Compiler::new(config.repeat_max);
        let mut roots = BTreeMap::new();
        for (name, expansion) in self.iter() {
            check_rule_name(name)?;
            let root = compiler.compile_rule(name, expansion)?;
            roots.insert(name.to_string(), root);
        }

        for (rule, name) in &compiler.references {
            if !roots.contains_key(name) {
                return Err(CompileError::UndefinedRule {
                    rule: rule.clone(),
                    name: name.clone(),
                });
            }
        }

        if !roots.contains_key(&config.start_rule) {
            return Err(CompileError::MissingStartRule(config.start_rule.clone()));
        }

        Ok(CompiledGrammar::new(
            compiler.arena.into_nodes(),
            roots,
            config.start_rule.clone(),
        ))
    }
}

fn check_rule_name(name: &str) -> Result<(), CompileError> {
    if name.is_empty() {
        return Err(CompileError::syntax(name, "missing rule name"));
    }
    if name.contains(char::is_whitespace) {
        return Err(CompileError::syntax(
            name,
            "rule name must not contain whitespace",
        ));
    }
    Ok(())
}

/// Compile grammar source text with the default start rule and the given
/// bound for `*` and `+`
pub fn compile(text: &str, repeat_max: u32) -> Result<CompiledGrammar, CompileError> {
    let config = GrammarConfig {
        repeat_max,
        ..GrammarConfig::default()
    };
    compile_with_config(text, &config)
}

/// Compile grammar source text
pub fn compile_with_config(
    text: &str,
    config: &GrammarConfig,
) -> Result<CompiledGrammar, CompileError> {
    RawRuleSet::parse(text)?.compile(config)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GroupKind {
    /// The implicit group around a whole expansion
    Rule,
    /// `( ... )`
    Group,
    /// `[ ... ]`
    Optional,
}

impl GroupKind {
    fn opener(self) -> &'static str {
        match self {
            GroupKind::Rule => "rule",
            GroupKind::Group => "'('",
            GroupKind::Optional => "'['",
        }
    }
}

/// An open group on the parse stack
#[derive(Debug)]
struct Frame {
    kind: GroupKind,
    offset: usize,
    /// Finished alternatives, non-empty once a `|` was seen at this level
    alternatives: Vec<NodeId>,
    /// Units of the alternative currently being read
    items: Vec<NodeId>,
}

impl Frame {
    fn new(kind: GroupKind, offset: usize) -> Self {
        Frame {
            kind,
            offset,
            alternatives: Vec::new(),
            items: Vec::new(),
        }
    }

    /// Close the alternative being read; `None` if it has no units
    fn take_alternative(&mut self, arena: &mut NodeArena) -> Option<NodeId> {
        match self.items.len() {
            0 => None,
            1 => self.items.pop(),
            _ => Some(arena.push(ExpansionNode::Sequence(mem::take(&mut self.items)))),
        }
    }
}

/// Shift/reduce parser shared by all rules of one grammar
struct Compiler {
    arena: NodeArena,
    repeat_max: u32,
    /// `(referencing rule, referenced name)` for every rule reference seen
    references: Vec<(String, String)>,
}

impl Compiler {
    fn new(repeat_max: u32) -> Self {
        Compiler {
            arena: NodeArena::default(),
            repeat_max,
            references: Vec::new(),
        }
    }

    fn compile_rule(&mut self, name: &str, expansion: &str) -> Result<NodeId, CompileError> {
        let mut stack = vec![Frame::new(GroupKind::Rule, 0)];

        let tokens = lexer::tokenize(expansion).map_err(|quote| {
            CompileError::syntax(
                name,
                format!("unterminated quoted literal at offset {}", quote.offset),
            )
        })?;

        for token in tokens {
            let offset = token.offset;
            match token.kind {
                TokenKind::OpenGroup => stack.push(Frame::new(GroupKind::Group, offset)),
                TokenKind::OpenOptional => stack.push(Frame::new(GroupKind::Optional, offset)),
                TokenKind::CloseGroup | TokenKind::CloseOptional => {
                    let closes = if matches!(token.kind, TokenKind::CloseGroup) {
                        GroupKind::Group
                    } else {
                        GroupKind::Optional
                    };
                    let frame = match stack.pop() {
                        Some(frame) if frame.kind != GroupKind::Rule => frame,
                        _ => {
                            return Err(CompileError::syntax(
                                name,
                                format!("unmatched {} at offset {}", token.kind.describe(), offset),
                            ));
                        }
                    };
                    if frame.kind != closes {
                        return Err(CompileError::syntax(
                            name,
                            format!(
                                "{} at offset {} does not close {} opened at offset {}",
                                token.kind.describe(),
                                offset,
                                frame.kind.opener(),
                                frame.offset
                            ),
                        ));
                    }
                    let position = format!("before {} at offset {}", token.kind.describe(), offset);
                    let group = self.reduce(name, frame, &position)?;
                    innermost(&mut stack).items.push(group);
                }
                TokenKind::Alternative => {
                    let frame = innermost(&mut stack);
                    let alternative = frame.take_alternative(&mut self.arena).ok_or_else(|| {
                        CompileError::syntax(
                            name,
                            format!("empty alternative before '|' at offset {}", offset),
                        )
                    })?;
                    frame.alternatives.push(alternative);
                }
                TokenKind::Star | TokenKind::Plus => {
                    let min = if matches!(token.kind, TokenKind::Star) { 0 } else { 1 };
                    let frame = innermost(&mut stack);
                    let unit = frame.items.pop().ok_or_else(|| {
                        CompileError::syntax(
                            name,
                            format!(
                                "{} at offset {} has nothing to repeat",
                                token.kind.describe(),
                                offset
                            ),
                        )
                    })?;
                    let repetition = self.arena.push(ExpansionNode::Repetition {
                        unit: vec![unit],
                        min,
                        max: self.repeat_max,
                    });
                    frame.items.push(repetition);
                }
                // Adjacent units already form a sequence, whitespace only separates them.
                TokenKind::Concat => {}
                TokenKind::RuleRef(reference) => {
                    self.references
                        .push((name.to_string(), reference.to_string()));
                    let leaf = self.arena.push(ExpansionNode::RuleRef(reference.to_string()));
                    innermost(&mut stack).items.push(leaf);
                }
                TokenKind::Terminal(text) => {
                    let leaf = self.arena.push(ExpansionNode::Terminal(text.into_owned()));
                    innermost(&mut stack).items.push(leaf);
                }
            }
        }

        if let [_, .., open] = stack.as_slice() {
            return Err(CompileError::syntax(
                name,
                format!("unclosed {} opened at offset {}", open.kind.opener(), open.offset),
            ));
        }
        let frame = stack.remove(0);
        self.reduce(name, frame, "at end of rule")
    }

    /// Build the node for a closed group. `position` says where the group
    /// ended, for error messages.
    fn reduce(
        &mut self,
        name: &str,
        mut frame: Frame,
        position: &str,
    ) -> Result<NodeId, CompileError> {
        let node = if frame.alternatives.is_empty() {
            if frame.items.is_empty() {
                let reason = match frame.kind {
                    GroupKind::Rule => "empty rule".to_string(),
                    kind => format!("empty group {} at offset {}", kind.opener(), frame.offset),
                };
                return Err(CompileError::syntax(name, reason));
            }
            let items = mem::take(&mut frame.items);
            match frame.kind {
                GroupKind::Rule | GroupKind::Group => ExpansionNode::Sequence(items),
                GroupKind::Optional => ExpansionNode::Repetition {
                    unit: items,
                    min: 0,
                    max: 1,
                },
            }
        } else {
            let last = frame.take_alternative(&mut self.arena).ok_or_else(|| {
                CompileError::syntax(name, format!("empty alternative {}", position))
            })?;
            frame.alternatives.push(last);
            let alternation = ExpansionNode::Alternation(mem::take(&mut frame.alternatives));
            match frame.kind {
                GroupKind::Group => alternation,
                GroupKind::Rule => ExpansionNode::Sequence(vec![self.arena.push(alternation)]),
                GroupKind::Optional => ExpansionNode::Repetition {
                    unit: vec![self.arena.push(alternation)],
                    min: 0,
                    max: 1,
                },
            }
        };
        Ok(self.arena.push(node))
    }
}

/// The innermost open group. The rule frame only leaves the stack once all
/// tokens are consumed or an error is returned.
fn innermost(stack: &mut [Frame]) -> &mut Frame {
    let last = stack.len() - 1;
    &mut stack[last]
}

/// Builder for compiling a grammar from rules given one at a time
#[derive(Debug, Clone, Default)]
pub struct GrammarBuilder {
    config: GrammarConfig,
    rules: RawRuleSet,
}

impl GrammarBuilder {
    /// Create a new grammar builder with default config
    pub fn new() -> Self {
        GrammarBuilder::default()
    }

    /// Set the configuration
    pub fn config(mut self, config: GrammarConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the bound for `*` and `+`
    pub fn repeat_max(mut self, repeat_max: u32) -> Self {
        self.config.repeat_max = repeat_max;
        self
    }

    /// Set the rule generation starts from
    pub fn start_rule(mut self, name: &str) -> Self {
        self.config.start_rule = name.to_string();
        self
    }

    /// Add a rule, written the same way as the right-hand side in grammar text
    pub fn rule(mut self, name: &str, expansion: &str) -> Self {
        self.rules.insert(name, expansion);
        self
    }

    /// Compile the collected rules
    pub fn build(self) -> Result<CompiledGrammar, CompileError> {
        self.rules.compile(&self.config)
    }
}
