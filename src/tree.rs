//! The expansion tree model.
//!
//! Nodes live in a flat arena and refer to their children by [`NodeId`].
//! Children are always allocated before their parent, so every id stored in
//! a node is smaller than the id of the node itself.

use serde::Serialize;
use std::fmt;

/// Stable index of a node in the arena of a [`CompiledGrammar`](crate::CompiledGrammar)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One node of an expansion tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpansionNode {
    /// Literal text, emitted as is
    Terminal(String),
    /// Reference to another rule, resolved by name during generation
    RuleRef(String),
    /// All children expand, in order
    Sequence(Vec<NodeId>),
    /// Exactly one child expands
    Alternation(Vec<NodeId>),
    /// The unit expands a uniformly drawn number of times in `min..=max`
    Repetition {
        unit: Vec<NodeId>,
        min: u32,
        max: u32,
    },
}

impl ExpansionNode {
    /// Child ids in expansion order; empty for leaves
    pub fn children(&self) -> &[NodeId] {
        match self {
            ExpansionNode::Terminal(_) | ExpansionNode::RuleRef(_) => &[],
            ExpansionNode::Sequence(children) | ExpansionNode::Alternation(children) => children,
            ExpansionNode::Repetition { unit, .. } => unit,
        }
    }
}

/// Append-only node store used while compiling
#[derive(Debug, Default)]
pub(crate) struct NodeArena {
    nodes: Vec<ExpansionNode>,
}

impl NodeArena {
    pub(crate) fn push(&mut self, node: ExpansionNode) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    pub(crate) fn into_nodes(self) -> Vec<ExpansionNode> {
        self.nodes
    }
}

/// Indented, one-node-per-line rendering of an expansion tree
pub struct TreeDisplay<'a> {
    pub(crate) nodes: &'a [ExpansionNode],
    pub(crate) name: &'a str,
    pub(crate) root: NodeId,
}

impl fmt::Display for TreeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.name)?;

        // (node, depth) pairs still to print, next one on top
        let mut pending = vec![(self.root, 1)];
        while let Some((id, depth)) = pending.pop() {
            let node = &self.nodes[id.0];
            write!(f, "{:width$}", "", width = depth * 2)?;
            match node {
                ExpansionNode::Terminal(text) => writeln!(f, "terminal {:?}", text)?,
                ExpansionNode::RuleRef(name) => writeln!(f, "rule {}", name)?,
                ExpansionNode::Sequence(_) => writeln!(f, "all-of")?,
                ExpansionNode::Alternation(_) => writeln!(f, "one-of")?,
                ExpansionNode::Repetition { min, max, .. } => {
                    writeln!(f, "repeat {}..={}", min, max)?
                }
            }
            pending.extend(node.children().iter().rev().map(|child| (*child, depth + 1)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arena_ids_are_stable_indices() {
        let mut arena = NodeArena::default();
        let a = arena.push(ExpansionNode::Terminal("a".to_string()));
        let b = arena.push(ExpansionNode::RuleRef("<B>".to_string()));
        let seq = arena.push(ExpansionNode::Sequence(vec![a, b]));

        assert_eq!((a.index(), b.index(), seq.index()), (0, 1, 2));

        let nodes = arena.into_nodes();
        assert_eq!(nodes[2], ExpansionNode::Sequence(vec![a, b]));
    }

    #[test]
    fn test_children() {
        let leaf = ExpansionNode::Terminal("x".to_string());
        assert!(leaf.children().is_empty());

        let rep = ExpansionNode::Repetition {
            unit: vec![NodeId(0), NodeId(1)],
            min: 0,
            max: 1,
        };
        assert_eq!(rep.children(), &[NodeId(0), NodeId(1)]);
    }

    #[test]
    fn test_tree_display() {
        let nodes = vec![
            ExpansionNode::Terminal("a".to_string()),
            ExpansionNode::RuleRef("<B>".to_string()),
            ExpansionNode::Repetition {
                unit: vec![NodeId(1)],
                min: 0,
                max: 2,
            },
            ExpansionNode::Alternation(vec![NodeId(0), NodeId(2)]),
            ExpansionNode::Sequence(vec![NodeId(3)]),
        ];
        let display = TreeDisplay {
            nodes: &nodes,
            name: "<START>",
            root: NodeId(4),
        };

        let expected = "<START>\n  all-of\n    one-of\n      terminal \"a\"\n      repeat 0..=2\n        rule <B>\n";
        assert_eq!(display.to_string(), expected);
    }

    #[test]
    fn test_tree_display_deep_nesting() {
        let depth = 4000;
        let mut nodes = vec![ExpansionNode::Terminal("x".to_string())];
        for i in 0..depth {
            nodes.push(ExpansionNode::Sequence(vec![NodeId(i)]));
        }

        // A small stack makes any per-level recursion overflow.
        let rendered = std::thread::Builder::new()
            .stack_size(128 * 1024)
            .spawn(move || {
                TreeDisplay {
                    nodes: &nodes,
                    name: "<DEEP>",
                    root: NodeId(depth),
                }
                .to_string()
            })
            .unwrap()
            .join()
            .unwrap();

        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), depth + 2);
        assert_eq!(lines[1], "  all-of");
        let last = format!("{}terminal \"x\"", " ".repeat((depth + 1) * 2));
        assert_eq!(lines[depth + 1], last);
    }

    #[test]
    fn test_node_serialization() {
        let node = ExpansionNode::Repetition {
            unit: vec![NodeId(3)],
            min: 1,
            max: 2,
        };
        let json = serde_json::to_string(&node).unwrap();
        assert_eq!(json, r#"{"repetition":{"unit":[3],"min":1,"max":2}}"#);
    }
}
