//! Text preparation for the grammar compiler.
//!
//! Raw grammar text goes through three steps before it reaches the parser:
//!
//! 1. [`normalize`] strips `//` comments, collapses whitespace and removes
//!    the padding around structural operators,
//! 2. [`split_rules`] and [`split_assignment`] cut the text into `name = expansion`
//!    pairs,
//! 3. [`tokenize`] scans one expansion into operator and atom tokens.
//!
//! Double-quoted literals are opaque to all three steps: whitespace, operators,
//! `;`, `=` and `//` inside quotes are kept as written.

use regex::{Captures, Regex};
use std::borrow::Cow;
use std::sync::LazyLock;

/// A quoted literal (possibly unterminated) or a run of unquoted text.
static SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)"(?:[^"\\]|\\.)*"?|[^"]+"#).expect("segment pattern"));

static QUOTED_OR_COMMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)"(?:[^"\\]|\\.)*"?|//[^\n]*"#).expect("comment pattern")
});

static QUOTED_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)^"((?:[^"\\]|\\.)*)"$"#).expect("literal pattern"));

static ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\\(.)").expect("escape pattern"));

static RULE_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<.+>$").expect("rule reference pattern"));

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern"));

// Applied in order, to unquoted text only.
static OPERATOR_PADDING: LazyLock<[(Regex, &'static str); 3]> = LazyLock::new(|| {
    [
        (Regex::new(r"\s*\|\s*").expect("pipe pattern"), "|"),
        (Regex::new(r"([(\[])\s+").expect("open pattern"), "$1"),
        (Regex::new(r"\s+([)\]*+])").expect("close pattern"), "$1"),
    ]
});

/// Remove comments and redundant whitespace from raw grammar text.
///
/// Never fails; anything malformed is left for the compiler to reject.
pub fn normalize(text: &str) -> String {
    let without_comments = QUOTED_OR_COMMENT.replace_all(text, |caps: &Captures| {
        let matched = &caps[0];
        if matched.starts_with('"') {
            matched.to_string()
        } else {
            String::new()
        }
    });

    let mut normalized = String::with_capacity(without_comments.len());
    for segment in SEGMENT.find_iter(&without_comments) {
        let segment = segment.as_str();
        if segment.starts_with('"') {
            normalized.push_str(segment);
            continue;
        }
        let mut plain = WHITESPACE.replace_all(segment, " ").into_owned();
        for (pattern, replacement) in OPERATOR_PADDING.iter() {
            plain = pattern.replace_all(&plain, *replacement).into_owned();
        }
        normalized.push_str(&plain);
    }

    normalized.trim().to_string()
}

/// Byte offsets of `delimiter` occurrences that are not inside a quoted literal
fn unquoted_positions(text: &str, delimiter: char) -> impl Iterator<Item = usize> + '_ {
    SEGMENT
        .find_iter(text)
        .filter(|segment| !segment.as_str().starts_with('"'))
        .flat_map(move |segment| {
            segment
                .as_str()
                .match_indices(delimiter)
                .map(move |(index, _)| segment.start() + index)
        })
}

/// Split normalized text into rule definitions on the `;` terminator.
///
/// Empty definitions are dropped, and the last rule may omit its terminator.
pub fn split_rules(text: &str) -> Vec<&str> {
    let mut rules = Vec::new();
    let mut start = 0;
    for position in unquoted_positions(text, ';') {
        rules.push(text[start..position].trim());
        start = position + 1;
    }
    rules.push(text[start..].trim());
    rules.retain(|rule| !rule.is_empty());
    rules
}

/// Split a rule definition on its first `=` into name and expansion
pub fn split_assignment(rule: &str) -> Option<(&str, &str)> {
    let position = unquoted_positions(rule, '=').next()?;
    Some((rule[..position].trim(), rule[position + 1..].trim()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind<'a> {
    /// `(`
    OpenGroup,
    /// `)`
    CloseGroup,
    /// `[`
    OpenOptional,
    /// `]`
    CloseOptional,
    /// `|`
    Alternative,
    /// `*`
    Star,
    /// `+`
    Plus,
    /// Whitespace between two units
    Concat,
    /// `<name>`
    RuleRef(&'a str),
    /// Literal output text, with quotes and escapes already removed
    Terminal(Cow<'a, str>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind<'a>,
    /// Byte offset of the token within the expansion it was scanned from
    pub offset: usize,
}

impl TokenKind<'_> {
    /// How the token is written in grammar text, for diagnostics
    pub fn describe(&self) -> String {
        match self {
            TokenKind::OpenGroup => "'('".to_string(),
            TokenKind::CloseGroup => "')'".to_string(),
            TokenKind::OpenOptional => "'['".to_string(),
            TokenKind::CloseOptional => "']'".to_string(),
            TokenKind::Alternative => "'|'".to_string(),
            TokenKind::Star => "'*'".to_string(),
            TokenKind::Plus => "'+'".to_string(),
            TokenKind::Concat => "whitespace".to_string(),
            TokenKind::RuleRef(name) => format!("rule reference {}", name),
            TokenKind::Terminal(text) => format!("terminal {:?}", text),
        }
    }
}

/// A `"` that is never closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnterminatedQuote {
    /// Byte offset of the opening quote
    pub offset: usize,
}

/// Scan one rule's expansion into tokens in a single left-to-right pass.
pub fn tokenize(expansion: &str) -> Result<Vec<Token<'_>>, UnterminatedQuote> {
    let mut tokens = Vec::new();
    let mut atom_start: Option<usize> = None;
    let mut quote_start: Option<usize> = None;
    let mut escaped = false;

    for (offset, c) in expansion.char_indices() {
        if quote_start.is_some() {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                quote_start = None;
            }
            continue;
        }

        let kind = match c {
            '(' => TokenKind::OpenGroup,
            ')' => TokenKind::CloseGroup,
            '[' => TokenKind::OpenOptional,
            ']' => TokenKind::CloseOptional,
            '|' => TokenKind::Alternative,
            '*' => TokenKind::Star,
            '+' => TokenKind::Plus,
            c if c.is_whitespace() => TokenKind::Concat,
            c => {
                if c == '"' {
                    quote_start = Some(offset);
                }
                atom_start.get_or_insert(offset);
                continue;
            }
        };

        if let Some(start) = atom_start.take() {
            tokens.push(atom(&expansion[start..offset], start));
        }
        tokens.push(Token { kind, offset });
    }

    if let Some(offset) = quote_start {
        return Err(UnterminatedQuote { offset });
    }
    if let Some(start) = atom_start {
        tokens.push(atom(&expansion[start..], start));
    }

    Ok(tokens)
}

fn atom(text: &str, offset: usize) -> Token<'_> {
    let kind = if RULE_REF.is_match(text) {
        TokenKind::RuleRef(text)
    } else {
        TokenKind::Terminal(unquote(text))
    };
    Token { kind, offset }
}

/// Strip the quotes from a fully quoted literal and resolve its escapes.
/// Anything else is returned verbatim.
fn unquote(text: &str) -> Cow<'_, str> {
    match QUOTED_LITERAL.captures(text).and_then(|caps| caps.get(1)) {
        Some(inner) => ESCAPE.replace_all(inner.as_str(), "$1"),
        None => Cow::Borrowed(text),
    }
}
