//! Best-effort parser for the Ruby fragments embedded in templates.
//!
//! This is not a full Ruby frontend. It covers the expression and
//! statement forms that appear inside `<% %>` regions, including
//! constructs split across regions, and reports a located error for
//! everything else so callers can skip the region.

use nom::combinator::all_consuming;
use nom::error::{VerboseError, VerboseErrorKind};
use nom::IResult;
use thiserror::Error;

mod ast;
mod expr;
mod lexical;

pub use ast::{CodeSpan, Expr, ExprKind, LogicalOp};

use ast::Span;

pub(crate) type PResult<'a, O> = IResult<Span<'a>, O, VerboseError<Span<'a>>>;

/// Syntax the fragment grammar could not digest.
#[derive(Debug, Error)]
#[error("ruby syntax error at line {line}, column {column}: {detail}")]
pub struct RubySyntaxError {
    pub line: usize,
    pub column: usize,
    pub detail: String,
}

/// Parses one embedded code fragment into a statement sequence.
///
/// Positions in the returned tree are relative to the fragment itself,
/// starting at line 1, column 1.
pub fn parse_fragment(code: &str) -> Result<Expr, RubySyntaxError> {
    match all_consuming(expr::program)(Span::new(code)) {
        Ok((_, stmts)) => Ok(Expr {
            kind: ExprKind::Seq(stmts),
            span: CodeSpan {
                start: 0,
                end: code.len(),
                line: 1,
                column: 1,
            },
        }),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(syntax_error(e)),
        Err(nom::Err::Incomplete(_)) => Err(RubySyntaxError {
            line: 1,
            column: 1,
            detail: "incomplete input".to_string(),
        }),
    }
}

/// Reports the deepest point the parser reached before giving up.
fn syntax_error(err: VerboseError<Span<'_>>) -> RubySyntaxError {
    match err.errors.last() {
        Some((span, kind)) => {
            let detail = match kind {
                VerboseErrorKind::Context(ctx) => format!("expected {ctx}"),
                VerboseErrorKind::Char(c) => format!("expected '{c}'"),
                VerboseErrorKind::Nom(k) => format!("unparsable input ({})", k.description()),
            };
            RubySyntaxError {
                line: span.location_line() as usize,
                column: span.get_utf8_column(),
                detail,
            }
        }
        None => RubySyntaxError {
            line: 1,
            column: 1,
            detail: "unparsable input".to_string(),
        },
    }
}
