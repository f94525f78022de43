//! Interpolation of a syntax tree into message text.
//!
//! Rendering never fails. Problems that validation would have reported show
//! up as markers in the output instead.

use std::error::Error;

use crate::annotated::as_interpolate;
use crate::params::ParamMap;
use crate::template::ast::{is_map_selector, Condition, Node, Scope};
use crate::template::verb::format_value;
use crate::value::Value;

/// Text for a field the map does not contain.
pub const MISSING_VALUE: &str = "<missing value>";
/// Text for `%w` / `$w` when there is no cause.
pub const NIL_CAUSE: &str = "<nil>";

pub(crate) fn render_node(
    node: &Node,
    own: &ParamMap,
    passed: &ParamMap,
    cause: Option<&(dyn Error + 'static)>,
) -> String {
    let mut out = String::new();
    write_node(&mut out, node, own, passed, cause);
    out
}

fn write_node(
    out: &mut String,
    node: &Node,
    own: &ParamMap,
    passed: &ParamMap,
    cause: Option<&(dyn Error + 'static)>,
) {
    let scoped = |scope: Scope| match scope {
        Scope::Own => own,
        Scope::Passed => passed,
    };

    match node {
        Node::Literal(text) => out.push_str(text),
        Node::List(items) => {
            for item in items {
                write_node(out, item, own, passed, cause);
            }
        }
        Node::Field(field) => {
            let map = scoped(field.scope);
            if is_map_selector(&field.name) {
                out.push_str(&format_value(&Value::Map(map.clone()), field.verb()));
            } else {
                match map.get(&field.name) {
                    Some(value) => out.push_str(&format_value(value, field.verb())),
                    None => out.push_str(MISSING_VALUE),
                }
            }
        }
        Node::Wrap { scope, .. } => match (scope, cause) {
            (_, None) => out.push_str(NIL_CAUSE),
            (Scope::Own, Some(cause)) => out.push_str(&cause.to_string()),
            (Scope::Passed, Some(cause)) => match as_interpolate(cause) {
                Some(inner) => out.push_str(&inner.interpolate(passed)),
                None => out.push_str(&cause.to_string()),
            },
        },
        Node::Conditional(cond) => {
            // An unknown condition shows its body so nothing is hidden.
            let show = cond.always_show
                || Condition::parse(&cond.condition)
                    .map_or(true, |c| c.holds(scoped(cond.scope)));
            if show {
                write_node(out, &cond.body, own, passed, cause);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::parser::parse;
    use crate::template::token::tokenize;
    use std::io;

    fn render(format: &str, own: &ParamMap, passed: &ParamMap) -> String {
        let (ast, _) = parse(format, &tokenize(format));
        render_node(ast.root(), own, passed, None)
    }

    #[test]
    fn fields_read_their_own_scope() {
        let own = ParamMap::new().with("X", "own");
        let passed = ParamMap::new().with("Y", "passed");
        assert_eq!(render("%{X}/${Y}", &own, &passed), "own/passed");
        assert_eq!(render("%{Y}", &own, &passed), MISSING_VALUE);
        assert_eq!(render("${X}", &own, &passed), MISSING_VALUE);
    }

    #[test]
    fn map_selectors_render_the_whole_map() {
        let own = ParamMap::new().with("B", 2i32).with("A", 1i32);
        assert_eq!(render("%{m}", &own, &ParamMap::new()), "{A: 1, B: 2}");
        assert_eq!(render("${params}", &ParamMap::new(), &own), "{A: 1, B: 2}");
    }

    #[test]
    fn conditionals_are_exclusive() {
        let empty = ParamMap::new();
        let full = ParamMap::new().with("A", 1i32);
        assert_eq!(render("%!m=0{Foo}", &empty, &empty), "Foo");
        assert_eq!(render("%!m=0{Foo}", &full, &empty), "");
        assert_eq!(render("%!m>0{Foo}", &full, &empty), "Foo");
        assert_eq!(render("$!m>0{Foo}", &full, &empty), "");
    }

    #[test]
    fn wraps() {
        let empty = ParamMap::new();
        let (ast, _) = parse("read: %w", &tokenize("read: %w"));
        assert_eq!(render_node(ast.root(), &empty, &empty, None), "read: <nil>");

        let cause = io::Error::new(io::ErrorKind::UnexpectedEof, "eof");
        assert_eq!(
            render_node(ast.root(), &empty, &empty, Some(&cause)),
            "read: eof"
        );

        let (ast, _) = parse("$w", &tokenize("$w"));
        assert_eq!(render_node(ast.root(), &empty, &empty, Some(&cause)), "eof");
    }

    #[test]
    fn parse_errors_remain_visible() {
        let empty = ParamMap::new();
        let out = render("%!m>0{abc", &empty, &empty);
        assert!(out.starts_with("abc<!ERROR: missing closing"));
    }
}
