//! Format-string parser.
//!
//! An explicit state machine walks the token list once. Open conditionals
//! live on a stack of blocks; the directive header currently being read
//! (`%verb{Name}` or `%!COND{`) is held as a single pending directive.
//!
//! Malformed input never aborts the parse. The first error is latched, the
//! pending directive is replaced by its literal spelling followed by an
//! embedded `<!ERROR: ...>` marker, every open conditional is forced
//! visible, and the rest of the input is copied through as text.

use tracing::debug;

use crate::errors::{Span, TemplateError, TemplateErrorKind};
use crate::template::ast::{Ast, ConditionalNode, FieldRef, Node, Scope};
use crate::template::token::{Token, TokenKind};

/// Prefix of the diagnostic text embedded into the tree on a parse error.
pub const ERROR_MARKER_PREFIX: &str = "<!ERROR: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Sequence,
    ExpectFormatVerb,
    ExpectCondition,
    ExpectVariableName,
    ExpectOpenBraceAfterCondition,
    ExpectOpenBraceAfterVerb,
    ExpectCloseBraceAfterVariable,
    ErrorSink,
}

/// What the driver loop does with the current token after a step.
enum Step {
    Advance,
    /// Feed the same token again under the new state.
    Reprocess,
    Done,
}

struct OpenConditional {
    scope: Scope,
    condition: String,
    start: usize,
    always_show: bool,
}

struct Block {
    items: Vec<Node>,
    header: Option<OpenConditional>,
}

enum Directive {
    Field {
        scope: Scope,
        verb: Option<String>,
        name: Option<String>,
    },
    Conditional {
        scope: Scope,
        condition: Option<String>,
    },
}

struct Pending {
    directive: Directive,
    start: usize,
    /// Spelling of the tokens consumed so far, used if the directive is
    /// abandoned.
    raw: String,
}

struct Parser<'a> {
    format: &'a str,
    state: State,
    blocks: Vec<Block>,
    pending: Option<Pending>,
    error: Option<TemplateError>,
}

/// Parses a token list produced by [`tokenize`](super::token::tokenize).
///
/// Always returns a complete tree; the error is `Some` iff the input was
/// malformed, and then refers to the leftmost problem.
pub fn parse(format: &str, tokens: &[Token]) -> (Ast, Option<TemplateError>) {
    let mut parser = Parser::new(format);
    let mut index = 0;
    while let Some(token) = tokens.get(index) {
        match parser.step(token) {
            Step::Advance => index += 1,
            Step::Reprocess => {}
            Step::Done => break,
        }
    }
    parser.finish()
}

impl<'a> Parser<'a> {
    fn new(format: &'a str) -> Self {
        Self {
            format,
            state: State::Sequence,
            blocks: vec![Block {
                items: Vec::new(),
                header: None,
            }],
            pending: None,
            error: None,
        }
    }

    fn step(&mut self, token: &Token) -> Step {
        match self.state {
            State::Sequence => self.sequence(token),
            State::ErrorSink => match token.kind {
                TokenKind::End => Step::Done,
                _ => {
                    self.push(Node::Literal(token.kind.spelling().to_string()));
                    Step::Advance
                }
            },
            State::ExpectFormatVerb => match &token.kind {
                TokenKind::Text(verb) => {
                    self.set_field_part(Some(verb.clone()), None);
                    self.consume(token, State::ExpectOpenBraceAfterVerb)
                }
                TokenKind::OpenBrace => self.consume(token, State::ExpectVariableName),
                other => self.fail(
                    TemplateErrorKind::ExpectedVerb {
                        directive: self.pending_scope().sigil(),
                        found: other.describe(),
                    },
                    token.span,
                ),
            },
            State::ExpectOpenBraceAfterVerb => match &token.kind {
                TokenKind::OpenBrace => self.consume(token, State::ExpectVariableName),
                other => self.fail(
                    TemplateErrorKind::ExpectedOpenBrace {
                        after: "format verb",
                        found: other.describe(),
                    },
                    token.span,
                ),
            },
            State::ExpectVariableName => match &token.kind {
                TokenKind::Text(name) => {
                    self.set_field_part(None, Some(name.clone()));
                    self.consume(token, State::ExpectCloseBraceAfterVariable)
                }
                other => self.fail(
                    TemplateErrorKind::ExpectedFieldName {
                        found: other.describe(),
                    },
                    token.span,
                ),
            },
            State::ExpectCloseBraceAfterVariable => match &token.kind {
                TokenKind::CloseBrace => {
                    self.close_field(token.span.end);
                    Step::Advance
                }
                other => self.fail(
                    TemplateErrorKind::ExpectedCloseBrace {
                        found: other.describe(),
                    },
                    token.span,
                ),
            },
            State::ExpectCondition => match &token.kind {
                TokenKind::Text(condition) => {
                    if let Some(Pending {
                        directive: Directive::Conditional { condition: slot, .. },
                        ..
                    }) = &mut self.pending
                    {
                        *slot = Some(condition.clone());
                    }
                    self.consume(token, State::ExpectOpenBraceAfterCondition)
                }
                other => self.fail(
                    TemplateErrorKind::ExpectedCondition {
                        directive: self.pending_scope().sigil(),
                        found: other.describe(),
                    },
                    token.span,
                ),
            },
            State::ExpectOpenBraceAfterCondition => match &token.kind {
                TokenKind::OpenBrace => {
                    self.open_block();
                    Step::Advance
                }
                other => self.fail(
                    TemplateErrorKind::ExpectedOpenBrace {
                        after: "condition",
                        found: other.describe(),
                    },
                    token.span,
                ),
            },
        }
    }

    fn sequence(&mut self, token: &Token) -> Step {
        match &token.kind {
            TokenKind::Start => Step::Advance,
            TokenKind::Text(text) => {
                self.push(Node::Literal(text.clone()));
                Step::Advance
            }
            TokenKind::Percent | TokenKind::Dollar => {
                let scope = scope_of(&token.kind);
                self.begin(
                    Directive::Field {
                        scope,
                        verb: None,
                        name: None,
                    },
                    token,
                );
                self.state = State::ExpectFormatVerb;
                Step::Advance
            }
            TokenKind::PercentBang | TokenKind::DollarBang => {
                let scope = scope_of(&token.kind);
                self.begin(
                    Directive::Conditional {
                        scope,
                        condition: None,
                    },
                    token,
                );
                self.state = State::ExpectCondition;
                Step::Advance
            }
            TokenKind::PercentW | TokenKind::DollarW => {
                self.push(Node::Wrap {
                    scope: scope_of(&token.kind),
                    span: token.span,
                });
                Step::Advance
            }
            TokenKind::OpenBrace => self.fail(TemplateErrorKind::UnexpectedOpenBrace, token.span),
            TokenKind::CloseBrace => {
                if self.blocks.len() > 1 {
                    self.close_block(token.span.end);
                    Step::Advance
                } else {
                    self.fail(TemplateErrorKind::UnmatchedCloseBrace, token.span)
                }
            }
            TokenKind::End => match self.innermost_open_start() {
                Some(start) => self.fail(
                    TemplateErrorKind::MissingCloseBrace,
                    Span::new(start, token.span.end),
                ),
                None => Step::Done,
            },
        }
    }

    // ------------------------------------------------------------------------
    // Tree construction
    // ------------------------------------------------------------------------

    fn push(&mut self, node: Node) {
        if let Some(block) = self.blocks.last_mut() {
            block.items.push(node);
        }
    }

    fn begin(&mut self, directive: Directive, token: &Token) {
        self.pending = Some(Pending {
            directive,
            start: token.span.start,
            raw: token.kind.spelling().to_string(),
        });
    }

    fn consume(&mut self, token: &Token, next: State) -> Step {
        if let Some(pending) = &mut self.pending {
            pending.raw.push_str(token.kind.spelling());
        }
        self.state = next;
        Step::Advance
    }

    fn pending_scope(&self) -> Scope {
        match &self.pending {
            Some(Pending {
                directive: Directive::Field { scope, .. } | Directive::Conditional { scope, .. },
                ..
            }) => *scope,
            None => Scope::Own,
        }
    }

    fn set_field_part(&mut self, new_verb: Option<String>, new_name: Option<String>) {
        if let Some(Pending {
            directive: Directive::Field { verb, name, .. },
            ..
        }) = &mut self.pending
        {
            if new_verb.is_some() {
                *verb = new_verb;
            }
            if new_name.is_some() {
                *name = new_name;
            }
        }
    }

    fn close_field(&mut self, end: usize) {
        if let Some(Pending {
            directive: Directive::Field { scope, verb, name },
            start,
            ..
        }) = self.pending.take()
        {
            self.push(Node::Field(FieldRef {
                scope,
                verb,
                name: name.unwrap_or_default(),
                span: Span::new(start, end),
            }));
        }
        self.state = State::Sequence;
    }

    fn open_block(&mut self) {
        if let Some(Pending {
            directive: Directive::Conditional { scope, condition },
            start,
            ..
        }) = self.pending.take()
        {
            self.blocks.push(Block {
                items: Vec::new(),
                header: Some(OpenConditional {
                    scope,
                    condition: condition.unwrap_or_default(),
                    start,
                    always_show: false,
                }),
            });
        }
        self.state = State::Sequence;
    }

    fn close_block(&mut self, end: usize) {
        if self.blocks.len() < 2 {
            return;
        }
        let Some(block) = self.blocks.pop() else {
            return;
        };
        let node = match block.header {
            Some(header) => Node::Conditional(ConditionalNode {
                scope: header.scope,
                condition: header.condition,
                body: Box::new(Node::List(block.items)),
                always_show: header.always_show,
                span: Span::new(header.start, end),
            }),
            None => Node::List(block.items),
        };
        self.push(node);
    }

    fn innermost_open_start(&self) -> Option<usize> {
        self.blocks
            .iter()
            .rev()
            .find_map(|b| b.header.as_ref().map(|h| h.start))
    }

    // ------------------------------------------------------------------------
    // Error recovery
    // ------------------------------------------------------------------------

    fn fail(&mut self, kind: TemplateErrorKind, span: Span) -> Step {
        if let Some(pending) = self.pending.take() {
            self.push(Node::Literal(pending.raw));
        }
        self.push(Node::Literal(format!("{ERROR_MARKER_PREFIX}{kind}>")));
        if self.error.is_none() {
            debug!(error = %kind, start = span.start, "latched first format string error");
            self.error = Some(TemplateError::new(kind, self.format, span));
        }
        for block in &mut self.blocks {
            if let Some(header) = &mut block.header {
                header.always_show = true;
            }
        }
        self.state = State::ErrorSink;
        Step::Reprocess
    }

    fn finish(mut self) -> (Ast, Option<TemplateError>) {
        if let Some(pending) = self.pending.take() {
            self.push(Node::Literal(pending.raw));
        }
        while self.blocks.len() > 1 {
            self.close_block(self.format.len());
        }
        let root = self
            .blocks
            .pop()
            .map(|block| Node::List(block.items))
            .unwrap_or_else(|| Node::Literal(String::new()));
        (Ast::new(root), self.error)
    }
}

fn scope_of(kind: &TokenKind) -> Scope {
    match kind {
        TokenKind::Dollar | TokenKind::DollarBang | TokenKind::DollarW => Scope::Passed,
        _ => Scope::Own,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::token::tokenize;

    fn parse_str(format: &str) -> (Ast, Option<TemplateError>) {
        parse(format, &tokenize(format))
    }

    fn tree(format: &str) -> String {
        let (ast, err) = parse_str(format);
        assert!(err.is_none(), "unexpected error for {:?}: {:?}", format, err);
        ast.pretty()
    }

    #[test]
    fn plain_text() {
        assert_eq!(tree("hello"), r#"(root "hello")"#);
        assert_eq!(tree(""), r#"(root "")"#);
    }

    #[test]
    fn fields_and_wraps() {
        assert_eq!(
            tree("0b%b{ValHundreds}"),
            r#"(root (list "0b" (field %b ValHundreds)))"#
        );
        assert_eq!(tree("${Name}"), "(root (field $v Name))");
        assert_eq!(tree("%w: $w"), r#"(root (list (wrap %) ": " (wrap $)))"#);
    }

    #[test]
    fn conditionals_nest() {
        assert_eq!(tree("%!m=0{Foo}"), r#"(root (if %!m=0 "Foo"))"#);
        assert_eq!(
            tree("$!m>0{a%!m=0{b}c}"),
            r#"(root (if $!m>0 (list "a" (if %!m=0 "b") "c")))"#
        );
    }

    #[test]
    fn field_span_covers_directive() {
        let (ast, _) = parse_str("ab%x{Name}");
        let Node::List(items) = ast.root() else {
            panic!("expected a list");
        };
        let Node::Field(field) = &items[1] else {
            panic!("expected a field");
        };
        assert_eq!(field.span, Span::new(2, 10));
        assert_eq!(field.verb.as_deref(), Some("x"));
    }

    #[test]
    fn unmatched_close_brace_is_embedded() {
        let (ast, err) = parse_str("a}b");
        let err = err.expect("error expected");
        assert_eq!(err.kind(), &TemplateErrorKind::UnmatchedCloseBrace);
        assert_eq!(err.span(), Span::new(1, 2));
        assert_eq!(ast.pretty(), r#"(root "a<!ERROR: unmatched '}'>}b")"#);
    }

    #[test]
    fn only_the_first_error_is_reported() {
        let (ast, err) = parse_str("x{y}z}");
        let err = err.expect("error expected");
        assert_eq!(err.kind(), &TemplateErrorKind::UnexpectedOpenBrace);
        assert_eq!(err.span(), Span::new(1, 2));
        let Node::Literal(text) = ast.root() else {
            panic!("expected a literal");
        };
        assert_eq!(text.matches(ERROR_MARKER_PREFIX).count(), 1);
        assert!(text.ends_with("{y}z}"));
    }

    #[test]
    fn abandoned_directive_keeps_its_spelling() {
        let (ast, err) = parse_str("n=%d");
        assert!(matches!(
            err.map(|e| e.kind().clone()),
            Some(TemplateErrorKind::ExpectedOpenBrace { after: "format verb", .. })
        ));
        assert_eq!(
            ast.pretty(),
            r#"(root "n=%d<!ERROR: expected '{' after the format verb, found end of input>")"#
        );
    }

    #[test]
    fn offending_token_is_reprocessed_as_text() {
        let (ast, err) = parse_str("%{}rest");
        assert!(matches!(
            err.map(|e| e.kind().clone()),
            Some(TemplateErrorKind::ExpectedFieldName { .. })
        ));
        let Node::Literal(text) = ast.root() else {
            panic!("expected a literal");
        };
        assert!(text.starts_with("%{<!ERROR: "));
        assert!(text.ends_with(">}rest"));
    }

    #[test]
    fn missing_close_brace_forces_conditional_visible() {
        let (ast, err) = parse_str("%!m>0{abc");
        let err = err.expect("error expected");
        assert_eq!(err.kind(), &TemplateErrorKind::MissingCloseBrace);
        assert_eq!(err.span(), Span::new(0, 9));
        let Node::Conditional(cond) = ast.root() else {
            panic!("expected a conditional, got {}", ast.pretty());
        };
        assert!(cond.always_show);
    }

    #[test]
    fn error_inside_conditional_forces_all_ancestors_visible() {
        let (ast, err) = parse_str("%!m>0{$!m=0{%q}}}");
        assert!(err.is_some());
        let Node::Conditional(outer) = ast.root() else {
            panic!("expected a conditional, got {}", ast.pretty());
        };
        assert!(outer.always_show);
        let Node::Conditional(inner) = outer.body.as_ref() else {
            panic!("expected a nested conditional");
        };
        assert!(inner.always_show);
    }

    #[test]
    fn verb_position_rejects_control_tokens() {
        let (_, err) = parse_str("$%w");
        let err = err.expect("error expected");
        assert_eq!(
            err.kind(),
            &TemplateErrorKind::ExpectedVerb {
                directive: '$',
                found: "'%w'".into()
            }
        );
    }
}
