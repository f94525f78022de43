//! Syntax tree of a parsed format string.

use std::fmt::Write as _;

use crate::errors::Span;
use crate::params::ParamMap;

/// Names that select the entire parameter map instead of a single field.
pub const MAP_SELECTORS: [&str; 4] = ["m", "map", "parameters", "params"];

pub fn is_map_selector(name: &str) -> bool {
    MAP_SELECTORS.contains(&name)
}

/// A public identifier: a letter followed by letters, digits or `_`.
pub fn is_valid_field_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() => chars.all(|c| c.is_alphanumeric() || c == '_'),
        _ => false,
    }
}

/// Which parameter map a directive reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// `%`: the error's own parameters.
    Own,
    /// `$`: the parameters passed down by the error being displayed.
    Passed,
}

impl Scope {
    pub fn sigil(self) -> char {
        match self {
            Scope::Own => '%',
            Scope::Passed => '$',
        }
    }
}

/// Condition of a `%!COND{...}` directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    EmptyMap,
    NonEmptyMap,
}

impl Condition {
    /// Accepts `EmptyMap`, `NonEmptyMap`, and `SEL=0` / `SEL>0` for any
    /// whole-map selector `SEL`.
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "EmptyMap" => return Some(Condition::EmptyMap),
            "NonEmptyMap" => return Some(Condition::NonEmptyMap),
            _ => {}
        }
        if let Some(selector) = text.strip_suffix("=0") {
            return is_map_selector(selector).then_some(Condition::EmptyMap);
        }
        if let Some(selector) = text.strip_suffix(">0") {
            return is_map_selector(selector).then_some(Condition::NonEmptyMap);
        }
        None
    }

    pub fn holds(self, map: &ParamMap) -> bool {
        match self {
            Condition::EmptyMap => map.is_empty(),
            Condition::NonEmptyMap => !map.is_empty(),
        }
    }
}

/// `%verb{Name}` or `$verb{Name}`.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRef {
    pub scope: Scope,
    /// `None` when the directive was written without a verb.
    pub verb: Option<String>,
    pub name: String,
    pub span: Span,
}

impl FieldRef {
    /// The verb to format with; `v` when none was written.
    pub fn verb(&self) -> &str {
        match self.verb.as_deref() {
            Some("") | None => "v",
            Some(verb) => verb,
        }
    }
}

/// `%!COND{...}` or `$!COND{...}`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalNode {
    pub scope: Scope,
    /// Raw condition text; checked by syntax validation.
    pub condition: String,
    pub body: Box<Node>,
    /// Set when a parse error was latched inside the body, so the embedded
    /// diagnostic is always visible.
    pub always_show: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Literal(String),
    List(Vec<Node>),
    Field(FieldRef),
    Wrap { scope: Scope, span: Span },
    Conditional(ConditionalNode),
}

impl Node {
    /// Flattens nested lists, merges adjacent literals, drops empty literals
    /// and collapses single-child lists.
    pub fn simplify(self) -> Node {
        match self {
            Node::List(items) => {
                let mut out: Vec<Node> = Vec::with_capacity(items.len());
                for item in items {
                    match item.simplify() {
                        Node::List(inner) => {
                            for node in inner {
                                push_node(&mut out, node);
                            }
                        }
                        node => push_node(&mut out, node),
                    }
                }
                match out.len() {
                    0 => Node::Literal(String::new()),
                    1 => out.pop().unwrap_or_else(|| Node::Literal(String::new())),
                    _ => Node::List(out),
                }
            }
            Node::Conditional(mut cond) => {
                cond.body = Box::new(cond.body.simplify());
                Node::Conditional(cond)
            }
            other => other,
        }
    }

    /// Prints the node as an s-expression.
    pub fn pretty(&self) -> String {
        let mut out = String::new();
        self.write_pretty(&mut out);
        out
    }

    fn write_pretty(&self, out: &mut String) {
        match self {
            Node::Literal(text) => {
                let _ = write!(out, "{:?}", text);
            }
            Node::List(items) => {
                out.push_str("(list");
                for item in items {
                    out.push(' ');
                    item.write_pretty(out);
                }
                out.push(')');
            }
            Node::Field(field) => {
                let _ = write!(
                    out,
                    "(field {}{} {})",
                    field.scope.sigil(),
                    field.verb(),
                    field.name
                );
            }
            Node::Wrap { scope, .. } => {
                let _ = write!(out, "(wrap {})", scope.sigil());
            }
            Node::Conditional(cond) => {
                let head = if cond.always_show { "show" } else { "if" };
                let _ = write!(out, "({} {}!{} ", head, cond.scope.sigil(), cond.condition);
                cond.body.write_pretty(out);
                out.push(')');
            }
        }
    }
}

fn push_node(out: &mut Vec<Node>, node: Node) {
    match node {
        Node::Literal(text) if text.is_empty() => {}
        Node::Literal(text) => {
            if let Some(Node::Literal(prev)) = out.last_mut() {
                prev.push_str(&text);
            } else {
                out.push(Node::Literal(text));
            }
        }
        other => out.push(other),
    }
}

/// Root of a syntax tree. Always holds exactly one child.
#[derive(Debug, Clone, PartialEq)]
pub struct Ast {
    root: Node,
}

impl Ast {
    pub(crate) fn new(child: Node) -> Self {
        Self {
            root: child.simplify(),
        }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn pretty(&self) -> String {
        format!("(root {})", self.root.pretty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_names() {
        assert!(is_valid_field_name("Data1"));
        assert!(is_valid_field_name("bytes_read"));
        assert!(!is_valid_field_name("_hidden"));
        assert!(!is_valid_field_name("1abc"));
        assert!(!is_valid_field_name("a-b"));
        assert!(!is_valid_field_name(""));
    }

    #[test]
    fn conditions() {
        assert_eq!(Condition::parse("m=0"), Some(Condition::EmptyMap));
        assert_eq!(Condition::parse("params>0"), Some(Condition::NonEmptyMap));
        assert_eq!(Condition::parse("NonEmptyMap"), Some(Condition::NonEmptyMap));
        assert_eq!(Condition::parse("x=0"), None);
        assert_eq!(Condition::parse("m<0"), None);

        let empty = ParamMap::new();
        let full = ParamMap::new().with("A", 1i32);
        assert!(Condition::EmptyMap.holds(&empty));
        assert!(!Condition::EmptyMap.holds(&full));
        assert!(Condition::NonEmptyMap.holds(&full));
    }

    #[test]
    fn simplify_flattens_and_merges() {
        let node = Node::List(vec![
            Node::Literal("a".into()),
            Node::List(vec![Node::Literal("b".into()), Node::Literal(String::new())]),
            Node::List(vec![]),
            Node::Literal("c".into()),
        ]);
        assert_eq!(node.simplify(), Node::Literal("abc".into()));
        assert_eq!(Node::List(vec![]).simplify(), Node::Literal(String::new()));
    }

    #[test]
    fn empty_verb_defaults_to_v() {
        let field = FieldRef {
            scope: Scope::Own,
            verb: Some(String::new()),
            name: "A".into(),
            span: Span::default(),
        };
        assert_eq!(field.verb(), "v");
    }
}
