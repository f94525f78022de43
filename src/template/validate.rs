//! Validation of a parsed template at three escalating levels.
//!
//! * [`Level::Syntax`]: verbs, field names and conditions are well formed.
//! * [`Level::Own`]: additionally, `%` fields exist in the own map and `%w`
//!   has a cause. Own-scope conditionals are evaluated.
//! * [`Level::Passed`]: additionally, `$` fields exist in the passed map and
//!   `$w` has a cause that supports interpolation. Both scopes of
//!   conditional are evaluated.
//!
//! A conditional branch that is not taken, or whose scope cannot be
//! evaluated at the current level, is checked for syntax only.

use std::error::Error;

use crate::annotated::as_interpolate;
use crate::errors::{Span, TemplateError, TemplateErrorKind};
use crate::params::ParamMap;
use crate::template::ast::{is_map_selector, is_valid_field_name, Condition, Node, Scope};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Syntax,
    Own,
    Passed,
}

/// Inputs for one validation pass.
pub(crate) struct Check<'a> {
    pub level: Level,
    pub own: &'a ParamMap,
    pub passed: &'a ParamMap,
    pub cause: Option<&'a (dyn Error + 'static)>,
}

impl Check<'_> {
    fn map(&self, scope: Scope) -> &ParamMap {
        match scope {
            Scope::Own => self.own,
            Scope::Passed => self.passed,
        }
    }

    /// Whether references in `scope` are resolved at this level.
    fn resolves(&self, scope: Scope) -> bool {
        match scope {
            Scope::Own => self.level >= Level::Own,
            Scope::Passed => self.level >= Level::Passed,
        }
    }
}

/// Walks `node` and returns the first problem in source order.
pub(crate) fn check_node(node: &Node, format: &str, check: &Check<'_>) -> Result<(), TemplateError> {
    walk(node, format, check, true)
}

fn fail(kind: TemplateErrorKind, format: &str, span: Span) -> Result<(), TemplateError> {
    Err(TemplateError::new(kind, format, span))
}

fn walk(node: &Node, format: &str, check: &Check<'_>, active: bool) -> Result<(), TemplateError> {
    match node {
        Node::Literal(_) => Ok(()),
        Node::List(items) => items
            .iter()
            .try_for_each(|item| walk(item, format, check, active)),
        Node::Field(field) => {
            if let Some(verb) = field.verb.as_deref().filter(|v| v.contains('%')) {
                return fail(
                    TemplateErrorKind::VerbContainsPercent {
                        verb: verb.to_string(),
                    },
                    format,
                    field.span,
                );
            }
            let selector = is_map_selector(&field.name);
            if !selector && !is_valid_field_name(&field.name) {
                return fail(
                    TemplateErrorKind::InvalidFieldName {
                        name: field.name.clone(),
                    },
                    format,
                    field.span,
                );
            }
            if !active || selector || !check.resolves(field.scope) {
                return Ok(());
            }
            if check.map(field.scope).contains(&field.name) {
                return Ok(());
            }
            let name = field.name.clone();
            let kind = match field.scope {
                Scope::Own => TemplateErrorKind::MissingOwnField { name },
                Scope::Passed => TemplateErrorKind::MissingPassedField { name },
            };
            fail(kind, format, field.span)
        }
        Node::Wrap { scope, span } => {
            if !active || !check.resolves(*scope) {
                return Ok(());
            }
            match (scope, check.cause) {
                (Scope::Own, None) => fail(TemplateErrorKind::WrapWithoutCause, format, *span),
                (Scope::Passed, cause) if cause.and_then(as_interpolate).is_none() => {
                    fail(TemplateErrorKind::CauseNotInterpolatable, format, *span)
                }
                _ => Ok(()),
            }
        }
        Node::Conditional(cond) => {
            let Some(condition) = Condition::parse(&cond.condition) else {
                return fail(
                    TemplateErrorKind::UnknownCondition {
                        condition: cond.condition.clone(),
                    },
                    format,
                    cond.span,
                );
            };
            let taken = active
                && check.resolves(cond.scope)
                && (cond.always_show || condition.holds(check.map(cond.scope)));
            walk(&cond.body, format, check, taken)
        }
    }
}
