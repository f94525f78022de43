//! Format string templates.
//!
//! A [`Template`] is a format string that has been tokenized and parsed
//! once. Parsing never fails: a malformed format string still yields a
//! renderable tree, and the first problem is kept for
//! [`Template::parse_error`]. Templates are immutable and shared through
//! `Arc`; [`Template::cached`] keeps one instance per distinct format string.

pub mod ast;
pub mod parser;
pub mod render;
pub mod token;
pub mod validate;
pub mod verb;

use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;
use tracing::trace;

use crate::errors::TemplateError;
use crate::params::ParamMap;

use self::ast::Ast;
use self::token::Token;
use self::validate::{check_node, Check, Level};

/// Upper bound on the number of distinct templates kept by the cache.
const CACHE_LIMIT: usize = 1024;

static TEMPLATE_CACHE: Lazy<RwLock<HashMap<String, Arc<Template>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// A parsed format string.
#[derive(Clone, PartialEq)]
pub struct Template {
    format: String,
    tokens: Vec<Token>,
    ast: Ast,
    parse_error: Option<TemplateError>,
}

impl Template {
    pub fn parse(format: &str) -> Self {
        let tokens = token::tokenize(format);
        let (ast, parse_error) = parser::parse(format, &tokens);
        Self {
            format: format.to_string(),
            tokens,
            ast,
            parse_error,
        }
    }

    /// Returns the shared template for `format`, parsing it on first use.
    pub fn cached(format: &str) -> Arc<Template> {
        {
            let cache = TEMPLATE_CACHE.read().unwrap_or_else(|p| p.into_inner());
            if let Some(template) = cache.get(format) {
                trace!(template = format, "template cache hit");
                return Arc::clone(template);
            }
        }
        trace!(template = format, "template cache miss");
        let template = Arc::new(Template::parse(format));
        let mut cache = TEMPLATE_CACHE.write().unwrap_or_else(|p| p.into_inner());
        if cache.len() >= CACHE_LIMIT {
            cache.clear();
        }
        Arc::clone(
            cache
                .entry(format.to_string())
                .or_insert_with(|| Arc::clone(&template)),
        )
    }

    pub fn format_string(&self) -> &str {
        &self.format
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn ast(&self) -> &Ast {
        &self.ast
    }

    /// The first problem found while parsing, if any.
    pub fn parse_error(&self) -> Option<&TemplateError> {
        self.parse_error.as_ref()
    }

    fn verify(
        &self,
        level: Level,
        own: &ParamMap,
        passed: &ParamMap,
        cause: Option<&(dyn Error + 'static)>,
    ) -> Result<(), TemplateError> {
        if let Some(err) = &self.parse_error {
            return Err(err.clone());
        }
        let check = Check {
            level,
            own,
            passed,
            cause,
        };
        check_node(self.ast.root(), &self.format, &check)
    }

    /// Checks verbs, field names and conditions.
    pub fn verify_syntax(&self) -> Result<(), TemplateError> {
        let empty = ParamMap::new();
        self.verify(Level::Syntax, &empty, &empty, None)
    }

    /// Checks that every visible `%` directive can be resolved.
    pub fn verify_own(
        &self,
        own: &ParamMap,
        cause: Option<&(dyn Error + 'static)>,
    ) -> Result<(), TemplateError> {
        self.verify(Level::Own, own, &ParamMap::new(), cause)
    }

    /// Checks that every visible `%` and `$` directive can be resolved.
    pub fn verify_passed(
        &self,
        own: &ParamMap,
        passed: &ParamMap,
        cause: Option<&(dyn Error + 'static)>,
    ) -> Result<(), TemplateError> {
        self.verify(Level::Passed, own, passed, cause)
    }

    pub fn render(
        &self,
        own: &ParamMap,
        passed: &ParamMap,
        cause: Option<&(dyn Error + 'static)>,
    ) -> String {
        render::render_node(self.ast.root(), own, passed, cause)
    }
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template")
            .field("format", &self.format)
            .field("ast", &self.ast.pretty())
            .field("parse_error", &self.parse_error.as_ref().map(|e| e.to_string()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{Stage, TemplateErrorKind};

    #[test]
    fn cached_templates_are_shared() {
        let a = Template::cached("cache test %{A}");
        let b = Template::cached("cache test %{A}");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.format_string(), "cache test %{A}");
    }

    #[test]
    fn verification_reports_parse_errors_first() {
        let template = Template::parse("%{_bad} }");
        let err = template.verify_syntax().unwrap_err();
        assert_eq!(err.stage(), Stage::Parse);
        assert_eq!(err.kind(), &TemplateErrorKind::UnmatchedCloseBrace);
    }

    #[test]
    fn levels_escalate() {
        let template = Template::parse("%{A} ${B}");
        let own = ParamMap::new().with("A", 1i32);
        let passed = ParamMap::new().with("B", 2i32);
        assert!(template.verify_syntax().is_ok());
        assert!(template.verify_own(&own, None).is_ok());
        assert!(template.verify_passed(&own, &ParamMap::new(), None).is_err());
        assert!(template.verify_passed(&own, &passed, None).is_ok());
        assert_eq!(template.render(&own, &passed, None), "1 2");
    }

    #[test]
    fn tokens_are_kept_with_the_tree() {
        let template = Template::parse("a%w");
        let kinds: Vec<_> = template.tokens().iter().map(|t| t.kind.clone()).collect();
        assert_eq!(
            kinds,
            vec![
                token::TokenKind::Start,
                token::TokenKind::Text("a".into()),
                token::TokenKind::PercentW,
                token::TokenKind::End,
            ]
        );
    }

    #[test]
    fn binary_verb() {
        let template = Template::parse("0b%b{ValHundreds}");
        let own = ParamMap::new().with("ValHundreds", 128u32);
        assert_eq!(template.render(&own, &own, None), "0b10000000");
    }
}
