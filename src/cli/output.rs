//! Handles all user-facing output for the CLI.
//!
//! Results go to stdout; diagnostics go to stderr as `miette` reports.

use std::io::Write;

use miette::Diagnostic;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::template::token::{Token, TokenKind};

// ============================================================================
// RESULTS
// ============================================================================

/// Prints one token per line: byte range, then the token.
pub fn print_tokens(tokens: &[Token]) {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    for token in tokens {
        let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Blue)));
        let _ = write!(stdout, "{:>4}..{:<4}", token.span.start, token.span.end);
        let _ = stdout.reset();
        match &token.kind {
            TokenKind::Text(text) => {
                let _ = writeln!(stdout, " text {:?}", text);
            }
            TokenKind::Start | TokenKind::End => {
                let _ = writeln!(stdout, " {:?}", token.kind);
            }
            other => {
                let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)).set_bold(true));
                let _ = writeln!(stdout, " {}", other.spelling());
                let _ = stdout.reset();
            }
        }
    }
}

pub fn print_line(text: &str) {
    println!("{}", text);
}

/// Prints a success note in green.
pub fn print_ok(text: &str) {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true));
    let _ = writeln!(stdout, "{}", text);
    let _ = stdout.reset();
}

// ============================================================================
// DIAGNOSTICS
// ============================================================================

/// Prints a rich report for `err` on stderr.
pub fn print_report<E>(err: E)
where
    E: Diagnostic + Send + Sync + 'static,
{
    let report = miette::Report::new(err);
    eprintln!("{report:?}");
}
