//! Tokenizer for format strings.
//!
//! A single regex pass splits the input into text runs and control
//! sequences. Escapes (`\%`, `\$`, `\{`, `\}`, `\\`) and `%%` become text.
//! Adjacent text is merged, and the list is framed by `Start` and `End`.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::Span;

/// Alternatives in priority order; the regex engine takes the first that
/// matches at each position.
static TOKEN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\\[%$\{\}\\]|%%|%!|\$!|%w|\$w|%|\$|\{|\}|[^%$\{\}\\]+|\\")
        .expect("token pattern is a valid regex")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Start,
    End,
    Text(String),
    /// `%`
    Percent,
    /// `$`
    Dollar,
    /// `%!`
    PercentBang,
    /// `$!`
    DollarBang,
    /// `{`
    OpenBrace,
    /// `}`
    CloseBrace,
    /// `%w`
    PercentW,
    /// `$w`
    DollarW,
}

impl TokenKind {
    /// The literal text this token stands for when it is not interpreted.
    pub fn spelling(&self) -> &str {
        match self {
            TokenKind::Start | TokenKind::End => "",
            TokenKind::Text(text) => text,
            TokenKind::Percent => "%",
            TokenKind::Dollar => "$",
            TokenKind::PercentBang => "%!",
            TokenKind::DollarBang => "$!",
            TokenKind::OpenBrace => "{",
            TokenKind::CloseBrace => "}",
            TokenKind::PercentW => "%w",
            TokenKind::DollarW => "$w",
        }
    }

    /// Short description for error messages.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Start => "start of input".to_string(),
            TokenKind::End => "end of input".to_string(),
            TokenKind::Text(text) => format!("text {:?}", text),
            other => format!("'{}'", other.spelling()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

/// Splits a format string into tokens. Never fails.
pub fn tokenize(input: &str) -> Vec<Token> {
    let mut tokens = vec![Token {
        kind: TokenKind::Start,
        span: Span::new(0, 0),
    }];

    for m in TOKEN_PATTERN.find_iter(input) {
        let span = Span::new(m.start(), m.end());
        let kind = match m.as_str() {
            "%%" => TokenKind::Text("%".to_string()),
            "%!" => TokenKind::PercentBang,
            "$!" => TokenKind::DollarBang,
            "%w" => TokenKind::PercentW,
            "$w" => TokenKind::DollarW,
            "%" => TokenKind::Percent,
            "$" => TokenKind::Dollar,
            "{" => TokenKind::OpenBrace,
            "}" => TokenKind::CloseBrace,
            escape if escape.len() == 2 && escape.starts_with('\\') => {
                TokenKind::Text(escape[1..].to_string())
            }
            text => TokenKind::Text(text.to_string()),
        };
        push_merged(&mut tokens, Token { kind, span });
    }

    tokens.push(Token {
        kind: TokenKind::End,
        span: Span::new(input.len(), input.len()),
    });
    tokens
}

fn push_merged(tokens: &mut Vec<Token>, token: Token) {
    if let TokenKind::Text(next) = &token.kind {
        if let Some(Token {
            kind: TokenKind::Text(prev),
            span,
        }) = tokens.last_mut()
        {
            prev.push_str(next);
            *span = span.join(token.span);
            return;
        }
    }
    tokens.push(token);
}
