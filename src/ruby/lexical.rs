//! Lexical helpers for the fragment parser.
//!
//! Horizontal trivia (spaces, comments, line continuations) is skipped
//! by the `tok` wrapper; newlines are statement separators, so they are
//! never trivia here.

use nom::{InputTake, Parser};
use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, one_of, satisfy},
    combinator::{not, opt, recognize, value},
    error::{ErrorKind, ParseError, VerboseError},
    multi::{many0, many1},
    sequence::{pair, preceded, terminated},
};

use super::ast::Span;
use super::PResult;

/// Words that can never be method or variable names.
pub(super) const RESERVED: &[&str] = &[
    "end", "do", "if", "unless", "else", "elsif", "while", "until", "for", "in", "then", "begin",
    "rescue", "ensure", "case", "when", "return", "yield", "break", "next", "and", "or", "not",
    "def", "class", "module", "nil", "true", "false", "self",
];

fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_ascii_alphabetic()
}

pub(super) fn is_ident_continue(c: char) -> bool {
    c == '_' || c.is_ascii_alphanumeric()
}

pub(super) fn is_constant_name(name: &str) -> bool {
    name.chars().next().map_or(false, char::is_uppercase)
}

/// Skips zero-or-more horizontal trivia items.
pub(super) fn hs0(input: Span<'_>) -> PResult<'_, ()> {
    value(
        (),
        many0(alt((
            value((), take_while1(|c| c == ' ' || c == '\t' || c == '\r')),
            value((), tag("\\\n")),
            comment,
        ))),
    )
    .parse(input)
}

/// Parses line comments (`# ...`).
fn comment(input: Span<'_>) -> PResult<'_, ()> {
    value((), pair(char('#'), take_while(|c| c != '\n'))).parse(input)
}

/// Wraps a parser with leading horizontal-trivia skipping.
pub(super) fn tok<'a, O, P>(mut parser: P) -> impl FnMut(Span<'a>) -> PResult<'a, O>
where
    P: FnMut(Span<'a>) -> PResult<'a, O>,
{
    move |input| preceded(hs0, &mut parser)(input)
}

/// Parses a specific punctuation character token.
pub(super) fn tok_char<'a>(c: char) -> impl FnMut(Span<'a>) -> PResult<'a, char> {
    tok(char(c))
}

/// Parses a specific punctuation token.
pub(super) fn tok_tag<'a>(t: &'static str) -> impl FnMut(Span<'a>) -> PResult<'a, Span<'a>> {
    tok(tag(t))
}

/// Operator token that must not run into a longer operator. Keeps `+`
/// from matching the start of `+=` and `|` the start of `||`.
pub(super) fn op<'a>(
    t: &'static str,
    excluded: &'static str,
) -> impl FnMut(Span<'a>) -> PResult<'a, Span<'a>> {
    tok(terminated(tag(t), not(one_of(excluded))))
}

/// Parses a reserved word with an identifier boundary after it.
pub(super) fn keyword<'a>(word: &'static str) -> impl FnMut(Span<'a>) -> PResult<'a, Span<'a>> {
    tok(terminated(tag(word), not(satisfy(is_ident_continue))))
}

/// One or more statement separators (newlines or semicolons).
pub(super) fn sep1(input: Span<'_>) -> PResult<'_, ()> {
    value((), many1(tok(one_of(";\n")))).parse(input)
}

/// Parses identifiers, including `?`/`!` method-name suffixes.
/// Reserved words are rejected.
pub(super) fn identifier(input: Span<'_>) -> PResult<'_, String> {
    let (rest, core) = recognize(pair(
        take_while1(is_ident_start),
        take_while(is_ident_continue),
    ))
    .parse(input)?;
    // `x != y` must lex as `x`, `!=`; the suffix only attaches when no
    // `=` follows
    let (rest, suffix) = opt(terminated(one_of("?!"), not(char('=')))).parse(rest)?;

    let mut name = core.fragment().to_string();
    if let Some(c) = suffix {
        name.push(c);
    }
    if RESERVED.contains(&name.as_str()) {
        return Err(nom::Err::Error(VerboseError::from_error_kind(
            input,
            ErrorKind::Verify,
        )));
    }
    Ok((rest, name))
}

/// Parses a digit run, allowing `_` separators after the first digit.
fn digits(input: Span<'_>) -> PResult<'_, Span<'_>> {
    recognize(pair(
        satisfy(|c: char| c.is_ascii_digit()),
        take_while(|c: char| c.is_ascii_digit() || c == '_'),
    ))
    .parse(input)
}

/// Parses an integer literal as raw text.
pub(super) fn int_literal(input: Span<'_>) -> PResult<'_, String> {
    let (rest, text) = digits(input)?;
    Ok((rest, text.fragment().to_string()))
}

/// Parses a float literal as raw text. The dot must be followed by a
/// digit so `1.upto` stays an integer plus a method call.
pub(super) fn float_literal(input: Span<'_>) -> PResult<'_, String> {
    let (rest, text) = recognize(pair(digits, pair(char('.'), digits))).parse(input)?;
    Ok((rest, text.fragment().to_string()))
}

/// Parses a double-quoted string body. Interpolations are consumed
/// with brace matching and kept as raw text.
pub(super) fn double_quoted(input: Span<'_>) -> PResult<'_, String> {
    let bytes = input.fragment().as_bytes();
    if bytes.first() != Some(&b'"') {
        return Err(nom::Err::Error(VerboseError::from_error_kind(
            input,
            ErrorKind::Char,
        )));
    }
    let mut i = 1;
    while i < bytes.len() {
        match bytes[i] {
            b'"' => {
                let content = input.fragment()[1..i].to_string();
                let (rest, _) = input.take_split(i + 1);
                return Ok((rest, content));
            }
            b'\\' => i += 2,
            b'#' if bytes.get(i + 1) == Some(&b'{') => {
                let mut depth = 1;
                i += 2;
                while i < bytes.len() && depth > 0 {
                    match bytes[i] {
                        b'{' => depth += 1,
                        b'}' => depth -= 1,
                        _ => {}
                    }
                    i += 1;
                }
            }
            _ => i += 1,
        }
    }
    Err(nom::Err::Error(VerboseError::from_error_kind(
        input,
        ErrorKind::Char,
    )))
}

/// Parses a single-quoted string body.
pub(super) fn single_quoted(input: Span<'_>) -> PResult<'_, String> {
    let bytes = input.fragment().as_bytes();
    if bytes.first() != Some(&b'\'') {
        return Err(nom::Err::Error(VerboseError::from_error_kind(
            input,
            ErrorKind::Char,
        )));
    }
    let mut i = 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' => {
                let content = input.fragment()[1..i].to_string();
                let (rest, _) = input.take_split(i + 1);
                return Ok((rest, content));
            }
            b'\\' => i += 2,
            _ => i += 1,
        }
    }
    Err(nom::Err::Error(VerboseError::from_error_kind(
        input,
        ErrorKind::Char,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all<'a, O>(
        mut parser: impl FnMut(Span<'a>) -> PResult<'a, O>,
        input: &'a str,
    ) -> Option<(String, O)> {
        parser(Span::new(input))
            .ok()
            .map(|(rest, out)| (rest.fragment().to_string(), out))
    }

    #[test]
    fn test_identifier_suffixes() {
        assert_eq!(all(identifier, "valid?"), Some((String::new(), "valid?".to_string())));
        assert_eq!(all(identifier, "save!"), Some((String::new(), "save!".to_string())));
        // suffix detaches when it would eat an operator
        assert_eq!(all(identifier, "x!=1"), Some(("!=1".to_string(), "x".to_string())));
    }

    #[test]
    fn test_identifier_rejects_reserved_words() {
        assert!(all(identifier, "end").is_none());
        assert!(all(identifier, "do").is_none());
        assert!(all(identifier, "nil").is_none());
        // prefix of a reserved word is fine
        assert!(all(identifier, "ending").is_some());
    }

    #[test]
    fn test_keyword_boundary() {
        assert!(all(keyword("in"), "in x").is_some());
        assert!(all(keyword("in"), "input").is_none());
    }

    #[test]
    fn test_comment_is_trivia() {
        let (rest, _) = hs0(Span::new("  # note\nx")).unwrap();
        assert_eq!(*rest.fragment(), "\nx");
    }

    #[test]
    fn test_number_literals() {
        assert_eq!(all(int_literal, "1_000"), Some((String::new(), "1_000".to_string())));
        assert_eq!(all(float_literal, "3.14"), Some((String::new(), "3.14".to_string())));
        // the dot belongs to a method call, not the number
        assert!(all(float_literal, "1.upto").is_none());
    }

    #[test]
    fn test_double_quoted_with_interpolation() {
        assert_eq!(
            all(double_quoted, "\"a #{h({})} b\" rest"),
            Some((" rest".to_string(), "a #{h({})} b".to_string()))
        );
    }

    #[test]
    fn test_single_quoted_with_escape() {
        assert_eq!(
            all(single_quoted, r"'it\'s' x"),
            Some((" x".to_string(), r"it\'s".to_string()))
        );
    }

    #[test]
    fn test_unterminated_string_fails() {
        assert!(all(double_quoted, "\"open").is_none());
    }
}
