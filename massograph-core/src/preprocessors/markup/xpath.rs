//! A small XPath 1.0 subset evaluated over [`MarkupNode`] trees.
//!
//! Supported:
//!
//! - location paths: `/a/b`, `//a`, `a/b`, `./a`, `.//a`, `.`, `/`
//! - node tests: names, `*`, `node()` (element children), and as the last
//!   step only, `text()`, `@name`, `@*`
//! - predicates: `[n]`, `[last()]`, `[@a]`, `[@a='v']`, `[@a!='v']`,
//!   `[name]`, `[name='v']`, `[text()='v']`, `[.='v']`,
//!   `[contains(x,'v')]`, `[starts-with(x,'v')]`, `not(...)`, `and`, `or`
//! - unions: `p1 | p2`
//!
//! Relative paths start at the root element; absolute paths at the
//! document node. Predicates filter each parent's child list separately,
//! so `//p[1]` is the first `p` of every parent. Results are in document
//! order without duplicates. Names are compared by local part.

use super::tree::{MarkupChild, MarkupNode};
use super::SelectorError;
use std::collections::{HashMap, HashSet};

/// One selector match: an element, or a string (attribute value / text node).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Selected<'a> {
    Node(&'a MarkupNode),
    Value(&'a str),
}

/// (node index, kind, child/attribute position)
type OrderKey = (usize, u8, usize);

#[derive(Debug, Clone, PartialEq)]
pub struct XPath {
    paths: Vec<LocationPath>,
}

#[derive(Debug, Clone, PartialEq)]
struct LocationPath {
    absolute: bool,
    steps: Vec<Step>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    /// `//x`: children of the context node or any of its descendants
    Descendant,
    SelfNode,
}

#[derive(Debug, Clone, PartialEq)]
enum NodeTest {
    Name(String),
    AnyElement,
    Text,
    Attribute(String),
    AnyAttribute,
}

#[derive(Debug, Clone, PartialEq)]
struct Step {
    axis: Axis,
    test: NodeTest,
    predicates: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Position(usize),
    Last,
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Exists(Operand),
    Equals {
        operand: Operand,
        literal: String,
        negate: bool,
    },
    Contains(Operand, String),
    StartsWith(Operand, String),
}

#[derive(Debug, Clone, PartialEq)]
enum Operand {
    Attribute(String),
    Text,
    Context,
    Child(String),
}

impl XPath {
    pub fn parse(expr: &str) -> Result<Self, SelectorError> {
        let invalid = |reason: String| SelectorError::InvalidXPath {
            selector: expr.to_string(),
            reason,
        };
        let tokens = tokenize(expr).map_err(invalid)?;
        if tokens.is_empty() {
            return Err(invalid("empty expression".to_string()));
        }

        let mut parser = Parser { tokens, pos: 0 };
        let mut paths = vec![parser.parse_path().map_err(invalid)?];
        while parser.eat(&Token::Pipe) {
            paths.push(parser.parse_path().map_err(invalid)?);
        }
        if let Some(token) = parser.peek() {
            return Err(invalid(format!("unexpected {:?}", token)));
        }
        Ok(Self { paths })
    }

    /// Evaluate against a document node (or any subtree root).
    pub fn select<'a>(&self, document: &'a MarkupNode) -> Vec<Selected<'a>> {
        let order = DocumentOrder::new(document);
        let mut hits = Vec::new();
        for path in &self.paths {
            hits.extend(evaluate_path(path, document, &order));
        }
        if self.paths.len() > 1 {
            hits.sort_by_key(|(key, _)| *key);
            hits.dedup_by_key(|(key, _)| *key);
        }
        hits.into_iter().map(|(_, selected)| selected).collect()
    }
}

struct DocumentOrder {
    index: HashMap<*const MarkupNode, usize>,
}

impl DocumentOrder {
    fn new(document: &MarkupNode) -> Self {
        let index = document
            .descendants_or_self()
            .into_iter()
            .enumerate()
            .map(|(i, node)| (node as *const MarkupNode, i))
            .collect();
        Self { index }
    }

    fn of(&self, node: &MarkupNode) -> usize {
        self.index
            .get(&(node as *const MarkupNode))
            .copied()
            .unwrap_or(usize::MAX)
    }
}

fn evaluate_path<'a>(
    path: &LocationPath,
    document: &'a MarkupNode,
    order: &DocumentOrder,
) -> Vec<(OrderKey, Selected<'a>)> {
    let start = if path.absolute {
        document
    } else {
        document.root_element().unwrap_or(document)
    };
    let mut context: Vec<&'a MarkupNode> = vec![start];

    for step in &path.steps {
        match &step.test {
            NodeTest::Text => return select_text(&context, step.axis, order),
            NodeTest::Attribute(_) | NodeTest::AnyAttribute => {
                return select_attributes(&context, step, order)
            }
            NodeTest::Name(_) | NodeTest::AnyElement => {}
        }

        let mut next: Vec<&'a MarkupNode> = Vec::new();
        for node in context.iter().copied() {
            match step.axis {
                Axis::SelfNode => next.extend(apply_predicates(vec![node], &step.predicates)),
                Axis::Child => next.extend(select_children(node, step)),
                Axis::Descendant => {
                    for descendant in node.descendants_or_self() {
                        next.extend(select_children(descendant, step));
                    }
                }
            }
        }
        next.sort_by_key(|node| order.of(node));
        next.dedup_by(|a, b| std::ptr::eq(*a, *b));
        context = next;
    }

    context
        .into_iter()
        .map(|node| ((order.of(node), 0, 0), Selected::Node(node)))
        .collect()
}

fn select_children<'a>(parent: &'a MarkupNode, step: &Step) -> Vec<&'a MarkupNode> {
    let candidates = parent
        .child_elements()
        .filter(|child| match &step.test {
            NodeTest::Name(name) => child.name == *name,
            _ => true,
        })
        .collect();
    apply_predicates(candidates, &step.predicates)
}

fn apply_predicates<'a>(mut nodes: Vec<&'a MarkupNode>, predicates: &[Expr]) -> Vec<&'a MarkupNode> {
    for predicate in predicates {
        let size = nodes.len();
        nodes = nodes
            .into_iter()
            .enumerate()
            .filter(|(i, node)| predicate.matches(node, i + 1, size))
            .map(|(_, node)| node)
            .collect();
    }
    nodes
}

fn select_text<'a>(
    context: &[&'a MarkupNode],
    axis: Axis,
    order: &DocumentOrder,
) -> Vec<(OrderKey, Selected<'a>)> {
    let mut hits = Vec::new();
    for node in context.iter().copied() {
        collect_text(node, axis == Axis::Descendant, order, &mut hits);
    }
    dedup_hits(hits)
}

fn collect_text<'a>(
    node: &'a MarkupNode,
    deep: bool,
    order: &DocumentOrder,
    hits: &mut Vec<(OrderKey, Selected<'a>)>,
) {
    let base = order.of(node);
    for (pos, child) in node.children.iter().enumerate() {
        match child {
            MarkupChild::Text(text) => hits.push(((base, 2, pos), Selected::Value(text))),
            MarkupChild::Element(element) if deep => collect_text(element, deep, order, hits),
            MarkupChild::Element(_) => {}
        }
    }
}

fn select_attributes<'a>(
    context: &[&'a MarkupNode],
    step: &Step,
    order: &DocumentOrder,
) -> Vec<(OrderKey, Selected<'a>)> {
    let mut hits = Vec::new();
    for node in context.iter().copied() {
        let owners = match step.axis {
            Axis::Descendant => node.descendants_or_self(),
            Axis::Child | Axis::SelfNode => vec![node],
        };
        for owner in owners {
            let base = order.of(owner);
            for (pos, (key, value)) in owner.attributes.iter().enumerate() {
                let wanted = match &step.test {
                    NodeTest::Attribute(name) => key == name,
                    _ => true,
                };
                if wanted {
                    hits.push(((base, 1, pos), Selected::Value(value.as_str())));
                }
            }
        }
    }
    dedup_hits(hits)
}

fn dedup_hits(hits: Vec<(OrderKey, Selected<'_>)>) -> Vec<(OrderKey, Selected<'_>)> {
    let mut seen = HashSet::new();
    hits.into_iter().filter(|(key, _)| seen.insert(*key)).collect()
}

impl Expr {
    fn matches(&self, node: &MarkupNode, position: usize, size: usize) -> bool {
        match self {
            Expr::Position(k) => position == *k,
            Expr::Last => position == size,
            Expr::Or(a, b) => a.matches(node, position, size) || b.matches(node, position, size),
            Expr::And(a, b) => a.matches(node, position, size) && b.matches(node, position, size),
            Expr::Not(inner) => !inner.matches(node, position, size),
            Expr::Exists(operand) => !operand.values(node).is_empty(),
            Expr::Equals {
                operand,
                literal,
                negate,
            } => operand
                .values(node)
                .iter()
                .any(|value| (value == literal) != *negate),
            Expr::Contains(operand, needle) => operand.string_value(node).contains(needle.as_str()),
            Expr::StartsWith(operand, prefix) => operand.string_value(node).starts_with(prefix.as_str()),
        }
    }
}

impl Operand {
    fn values(&self, node: &MarkupNode) -> Vec<String> {
        match self {
            Operand::Attribute(name) => node.attr(name).map(str::to_string).into_iter().collect(),
            Operand::Text => node.direct_text().into_iter().map(str::to_string).collect(),
            Operand::Context => vec![node.inner_text()],
            Operand::Child(name) => node
                .child_elements()
                .filter(|child| child.name == *name)
                .map(MarkupNode::inner_text)
                .collect(),
        }
    }

    /// XPath string-value of the first item (empty when there is none).
    fn string_value(&self, node: &MarkupNode) -> String {
        self.values(node).into_iter().next().unwrap_or_default()
    }
}

// ===== LEXER =====

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Slash,
    DoubleSlash,
    Pipe,
    LBracket,
    RBracket,
    LParen,
    RParen,
    At,
    Comma,
    Eq,
    NotEq,
    Star,
    Dot,
    Number(String),
    Literal(String),
    Name(String),
}

fn tokenize(expr: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = expr.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        match c {
            c if c.is_whitespace() => i += 1,
            '/' if next == Some('/') => {
                tokens.push(Token::DoubleSlash);
                i += 2;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '!' if next == Some('=') => {
                tokens.push(Token::NotEq);
                i += 2;
            }
            '.' if next == Some('.') => return Err("parent steps ('..') are not supported".to_string()),
            '.' => {
                tokens.push(Token::Dot);
                i += 1;
            }
            '|' | '[' | ']' | '(' | ')' | '@' | ',' | '=' | '*' => {
                tokens.push(match c {
                    '|' => Token::Pipe,
                    '[' => Token::LBracket,
                    ']' => Token::RBracket,
                    '(' => Token::LParen,
                    ')' => Token::RParen,
                    '@' => Token::At,
                    ',' => Token::Comma,
                    '=' => Token::Eq,
                    _ => Token::Star,
                });
                i += 1;
            }
            '\'' | '"' => {
                let end = chars[i + 1..]
                    .iter()
                    .position(|&ch| ch == c)
                    .ok_or_else(|| "unterminated string literal".to_string())?;
                tokens.push(Token::Literal(chars[i + 1..i + 1 + end].iter().collect()));
                i += end + 2;
            }
            c if c.is_ascii_digit() => {
                let start = i;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
                tokens.push(Token::Number(chars[start..i].iter().collect()));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_alphanumeric() || matches!(chars[i], '_' | '-' | '.' | ':'))
                {
                    i += 1;
                }
                let name: String = chars[start..i].iter().collect();
                if name.contains("::") {
                    return Err(format!("axis '{}' is not supported", name));
                }
                tokens.push(Token::Name(name));
            }
            other => return Err(format!("unexpected character '{}'", other)),
        }
    }
    Ok(tokens)
}

/// Drop a namespace prefix.
fn local(name: &str) -> String {
    name.rsplit(':').next().unwrap_or(name).to_string()
}

// ===== PARSER =====

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if matches!(self.peek(), Some(Token::Name(name)) if name == keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(), String> {
        match self.advance() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(format!("expected {:?}, found {:?}", expected, token)),
            None => Err(format!("expected {:?}, found end of expression", expected)),
        }
    }

    fn parse_path(&mut self) -> Result<LocationPath, String> {
        let mut absolute = false;
        let mut axis = Axis::Child;
        match self.peek() {
            Some(Token::Slash) => {
                self.pos += 1;
                absolute = true;
                if matches!(self.peek(), None | Some(Token::Pipe)) {
                    return Ok(LocationPath {
                        absolute,
                        steps: Vec::new(),
                    });
                }
            }
            Some(Token::DoubleSlash) => {
                self.pos += 1;
                absolute = true;
                axis = Axis::Descendant;
            }
            _ => {}
        }

        let mut steps = Vec::new();
        loop {
            steps.push(self.parse_step(axis)?);
            match self.peek() {
                Some(Token::Slash) => {
                    self.pos += 1;
                    axis = Axis::Child;
                }
                Some(Token::DoubleSlash) => {
                    self.pos += 1;
                    axis = Axis::Descendant;
                }
                _ => break,
            }
        }

        let last = steps.len() - 1;
        for (i, step) in steps.iter().enumerate() {
            let terminal_only = matches!(
                step.test,
                NodeTest::Text | NodeTest::Attribute(_) | NodeTest::AnyAttribute
            );
            if terminal_only && i != last {
                return Err("text() and @attribute must be the last step".to_string());
            }
            if terminal_only && !step.predicates.is_empty() {
                return Err("predicates on text() or @attribute are not supported".to_string());
            }
        }
        Ok(LocationPath { absolute, steps })
    }

    fn parse_step(&mut self, axis: Axis) -> Result<Step, String> {
        let (axis, test) = match self.advance() {
            Some(Token::Dot) if axis == Axis::Descendant => {
                return Err("'.' after '//' is not supported".to_string())
            }
            Some(Token::Dot) => (Axis::SelfNode, NodeTest::AnyElement),
            Some(Token::Star) => (axis, NodeTest::AnyElement),
            Some(Token::At) => match self.advance() {
                Some(Token::Name(name)) => (axis, NodeTest::Attribute(local(&name))),
                Some(Token::Star) => (axis, NodeTest::AnyAttribute),
                other => return Err(format!("expected attribute name, found {:?}", other)),
            },
            Some(Token::Name(name)) => {
                if self.eat(&Token::LParen) {
                    self.expect(Token::RParen)?;
                    match name.as_str() {
                        "text" => (axis, NodeTest::Text),
                        "node" => (axis, NodeTest::AnyElement),
                        other => return Err(format!("unsupported node test '{}()'", other)),
                    }
                } else {
                    (axis, NodeTest::Name(local(&name)))
                }
            }
            Some(token) => return Err(format!("expected a step, found {:?}", token)),
            None => return Err("expected a step, found end of expression".to_string()),
        };

        let mut predicates = Vec::new();
        while self.eat(&Token::LBracket) {
            predicates.push(self.parse_or()?);
            self.expect(Token::RBracket)?;
        }
        Ok(Step {
            axis,
            test,
            predicates,
        })
    }

    fn parse_or(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_and()?;
        while self.eat_keyword("or") {
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_unary()?;
        while self.eat_keyword("and") {
            let right = self.parse_unary()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, String> {
        match self.peek().cloned() {
            Some(Token::Number(n)) => {
                self.pos += 1;
                let position: usize = n.parse().map_err(|_| format!("bad position '{}'", n))?;
                if position == 0 {
                    return Err("positions start at 1".to_string());
                }
                Ok(Expr::Position(position))
            }
            Some(Token::LParen) => {
                self.pos += 1;
                let inner = self.parse_or()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Name(name)) if self.peek_at(1) == Some(&Token::LParen) && name != "text" => {
                self.pos += 2;
                match name.as_str() {
                    "not" => {
                        let inner = self.parse_or()?;
                        self.expect(Token::RParen)?;
                        Ok(Expr::Not(Box::new(inner)))
                    }
                    "last" => {
                        self.expect(Token::RParen)?;
                        Ok(Expr::Last)
                    }
                    "contains" | "starts-with" => {
                        let operand = self.parse_operand()?;
                        self.expect(Token::Comma)?;
                        let literal = self.parse_literal()?;
                        self.expect(Token::RParen)?;
                        Ok(if name == "contains" {
                            Expr::Contains(operand, literal)
                        } else {
                            Expr::StartsWith(operand, literal)
                        })
                    }
                    other => Err(format!("unsupported function '{}()'", other)),
                }
            }
            _ => {
                let operand = self.parse_operand()?;
                if self.eat(&Token::Eq) {
                    Ok(Expr::Equals {
                        operand,
                        literal: self.parse_literal()?,
                        negate: false,
                    })
                } else if self.eat(&Token::NotEq) {
                    Ok(Expr::Equals {
                        operand,
                        literal: self.parse_literal()?,
                        negate: true,
                    })
                } else {
                    Ok(Expr::Exists(operand))
                }
            }
        }
    }

    fn parse_operand(&mut self) -> Result<Operand, String> {
        match self.advance() {
            Some(Token::At) => match self.advance() {
                Some(Token::Name(name)) => Ok(Operand::Attribute(local(&name))),
                other => Err(format!("expected attribute name, found {:?}", other)),
            },
            Some(Token::Dot) => Ok(Operand::Context),
            Some(Token::Name(name)) if name == "text" => {
                self.expect(Token::LParen)?;
                self.expect(Token::RParen)?;
                Ok(Operand::Text)
            }
            Some(Token::Name(name)) => Ok(Operand::Child(local(&name))),
            Some(token) => Err(format!("unexpected {:?} in predicate", token)),
            None => Err("unterminated predicate".to_string()),
        }
    }

    fn parse_literal(&mut self) -> Result<String, String> {
        match self.advance() {
            Some(Token::Literal(value)) | Some(Token::Number(value)) => Ok(value),
            other => Err(format!("expected a string literal, found {:?}", other)),
        }
    }
}
