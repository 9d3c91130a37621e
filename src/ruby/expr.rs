//! Statement and expression grammar for embedded fragments.
//!
//! Templates routinely split one Ruby construct across several regions,
//! so block and keyword openers parse without their `end` and closers
//! parse on their own. Operators become call nodes with the operator as
//! the method name; `&&`, `||`, `and` and `or` stay separate because a
//! call search has to look through them.

use nom::{InputTake, Parser};
use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{char, one_of, satisfy},
    combinator::{not, opt, peek, value},
    error::{ErrorKind, ParseError, VerboseError},
    multi::{separated_list0, separated_list1},
    sequence::{delimited, pair, preceded, terminated},
};

use super::ast::{CodeSpan, Expr, ExprKind, LogicalOp, Span};
use super::lexical::{
    double_quoted, float_literal, hs0, identifier, int_literal, is_constant_name, keyword, op,
    sep1, single_quoted, tok, tok_char, tok_tag,
};
use super::PResult;

fn node(kind: ExprKind, span: CodeSpan) -> Expr {
    Expr { kind, span }
}

/// Parses a whole fragment into its statement list.
pub(super) fn program(input: Span<'_>) -> PResult<'_, Vec<Expr>> {
    let (input, _) = opt(sep1).parse(input)?;
    let (input, stmts) = separated_list0(sep1, stmt_top).parse(input)?;
    let (input, _) = opt(sep1).parse(input)?;
    let (input, _) = hs0(input)?;
    Ok((input, stmts))
}

fn stmt_top(input: Span<'_>) -> PResult<'_, Expr> {
    alt((closer_stmt, stmt_inner)).parse(input)
}

fn stmt_inner(input: Span<'_>) -> PResult<'_, Expr> {
    alt((
        if_stmt, loop_stmt, for_stmt, case_stmt, begin_stmt, jump_stmt, expr_stmt,
    ))
    .parse(input)
}

/// Statement list between a keyword opener and its closing keyword.
fn inner_body(input: Span<'_>) -> PResult<'_, Vec<Expr>> {
    let (input, _) = opt(sep1).parse(input)?;
    let (input, stmts) = separated_list0(sep1, stmt_inner).parse(input)?;
    let (input, _) = opt(sep1).parse(input)?;
    Ok((input, stmts))
}

/// Clause keywords standing alone at the top of a fragment, left there
/// when the rest of the construct lives in other regions.
fn closer_stmt(input: Span<'_>) -> PResult<'_, Expr> {
    alt((bare_closer, elsif_closer, when_clause, rescue_clause)).parse(input)
}

fn bare_closer(input: Span<'_>) -> PResult<'_, Expr> {
    let (input, _) = hs0(input)?;
    let start = input;
    let (input, kw) = alt((keyword("end"), keyword("else"), keyword("ensure"))).parse(input)?;
    let span = CodeSpan::from_bounds(start, input);
    Ok((
        input,
        node(
            ExprKind::Control {
                keyword: kw.fragment().to_string(),
                condition: None,
                body: Vec::new(),
            },
            span,
        ),
    ))
}

fn elsif_closer(input: Span<'_>) -> PResult<'_, Expr> {
    let (input, _) = hs0(input)?;
    let start = input;
    let (input, _) = keyword("elsif")(input)?;
    let (input, condition) = expr(input)?;
    let (input, _) = opt(keyword("then")).parse(input)?;
    let (input, body) = inner_body(input)?;
    let span = CodeSpan::from_bounds(start, input);
    Ok((
        input,
        node(
            ExprKind::Control {
                keyword: "elsif".to_string(),
                condition: Some(Box::new(condition)),
                body,
            },
            span,
        ),
    ))
}

fn when_clause(input: Span<'_>) -> PResult<'_, Expr> {
    let (input, _) = hs0(input)?;
    let start = input;
    let (input, _) = keyword("when")(input)?;
    let (input, values) = separated_list1(arg_comma, expr).parse(input)?;
    let (input, _) = opt(keyword("then")).parse(input)?;
    let (input, body) = inner_body(input)?;
    let span = CodeSpan::from_bounds(start, input);
    Ok((
        input,
        node(
            ExprKind::Control {
                keyword: "when".to_string(),
                condition: group_values(values).map(Box::new),
                body,
            },
            span,
        ),
    ))
}

fn rescue_clause(input: Span<'_>) -> PResult<'_, Expr> {
    let (input, _) = hs0(input)?;
    let start = input;
    let (input, _) = keyword("rescue")(input)?;
    let (input, classes) = opt(separated_list1(arg_comma, expr)).parse(input)?;
    let (input, _) = opt(preceded(tok_tag("=>"), tok(identifier))).parse(input)?;
    let (input, _) = opt(keyword("then")).parse(input)?;
    let (input, body) = inner_body(input)?;
    let span = CodeSpan::from_bounds(start, input);
    Ok((
        input,
        node(
            ExprKind::Control {
                keyword: "rescue".to_string(),
                condition: classes.and_then(group_values).map(Box::new),
                body,
            },
            span,
        ),
    ))
}

/// Collapses a value list into one node, wrapping several in an array.
fn group_values(mut values: Vec<Expr>) -> Option<Expr> {
    match values.len() {
        0 => None,
        1 => values.pop(),
        _ => {
            let span = values[0].span.merge(&values[values.len() - 1].span);
            Some(node(ExprKind::Array(values), span))
        }
    }
}

fn if_stmt(input: Span<'_>) -> PResult<'_, Expr> {
    let (input, _) = hs0(input)?;
    let start = input;
    let (input, kw) = alt((keyword("if"), keyword("unless"))).parse(input)?;
    let (input, condition) = expr(input)?;
    let (input, _) = opt(keyword("then")).parse(input)?;
    let (mut input, mut body) = inner_body(input)?;
    loop {
        if let Ok((rest, clause)) = elsif_closer(input) {
            body.push(clause);
            input = rest;
            continue;
        }
        if let Ok((rest, _)) = keyword("else").parse(input) {
            let clause_start = input;
            let (rest, stmts) = inner_body(rest)?;
            let span = CodeSpan::from_bounds(clause_start, rest);
            body.push(node(
                ExprKind::Control {
                    keyword: "else".to_string(),
                    condition: None,
                    body: stmts,
                },
                span,
            ));
            input = rest;
            continue;
        }
        break;
    }
    let (input, _) = opt(keyword("end")).parse(input)?;
    let span = CodeSpan::from_bounds(start, input);
    Ok((
        input,
        node(
            ExprKind::Control {
                keyword: kw.fragment().to_string(),
                condition: Some(Box::new(condition)),
                body,
            },
            span,
        ),
    ))
}

fn loop_stmt(input: Span<'_>) -> PResult<'_, Expr> {
    let (input, _) = hs0(input)?;
    let start = input;
    let (input, kw) = alt((keyword("while"), keyword("until"))).parse(input)?;
    let (input, condition) = expr(input)?;
    let (input, _) = opt(keyword("do")).parse(input)?;
    let (input, body) = inner_body(input)?;
    let (input, _) = opt(keyword("end")).parse(input)?;
    let span = CodeSpan::from_bounds(start, input);
    Ok((
        input,
        node(
            ExprKind::Control {
                keyword: kw.fragment().to_string(),
                condition: Some(Box::new(condition)),
                body,
            },
            span,
        ),
    ))
}

fn for_stmt(input: Span<'_>) -> PResult<'_, Expr> {
    let (input, _) = hs0(input)?;
    let start = input;
    let (input, _) = keyword("for")(input)?;
    let (input, _) = separated_list1(tok_char(','), tok(identifier)).parse(input)?;
    let (input, _) = keyword("in")(input)?;
    let (input, iterable) = expr(input)?;
    let (input, _) = opt(keyword("do")).parse(input)?;
    let (input, body) = inner_body(input)?;
    let (input, _) = opt(keyword("end")).parse(input)?;
    let span = CodeSpan::from_bounds(start, input);
    Ok((
        input,
        node(
            ExprKind::Control {
                keyword: "for".to_string(),
                condition: Some(Box::new(iterable)),
                body,
            },
            span,
        ),
    ))
}

fn case_stmt(input: Span<'_>) -> PResult<'_, Expr> {
    let (input, _) = hs0(input)?;
    let start = input;
    let (input, _) = keyword("case")(input)?;
    let (input, subject) = opt(expr).parse(input)?;
    let (mut input, mut body) = inner_body(input)?;
    loop {
        if let Ok((rest, clause)) = when_clause(input) {
            body.push(clause);
            input = rest;
            continue;
        }
        if let Ok((rest, _)) = keyword("else").parse(input) {
            let clause_start = input;
            let (rest, stmts) = inner_body(rest)?;
            let span = CodeSpan::from_bounds(clause_start, rest);
            body.push(node(
                ExprKind::Control {
                    keyword: "else".to_string(),
                    condition: None,
                    body: stmts,
                },
                span,
            ));
            input = rest;
            continue;
        }
        break;
    }
    let (input, _) = opt(keyword("end")).parse(input)?;
    let span = CodeSpan::from_bounds(start, input);
    Ok((
        input,
        node(
            ExprKind::Control {
                keyword: "case".to_string(),
                condition: subject.map(Box::new),
                body,
            },
            span,
        ),
    ))
}

fn begin_stmt(input: Span<'_>) -> PResult<'_, Expr> {
    let (input, _) = hs0(input)?;
    let start = input;
    let (input, _) = keyword("begin")(input)?;
    let (mut input, mut body) = inner_body(input)?;
    loop {
        if let Ok((rest, clause)) = rescue_clause(input) {
            body.push(clause);
            input = rest;
            continue;
        }
        if let Ok((rest, kw)) = alt((keyword("else"), keyword("ensure"))).parse(input) {
            let clause_start = input;
            let (rest, stmts) = inner_body(rest)?;
            let span = CodeSpan::from_bounds(clause_start, rest);
            body.push(node(
                ExprKind::Control {
                    keyword: kw.fragment().to_string(),
                    condition: None,
                    body: stmts,
                },
                span,
            ));
            input = rest;
            continue;
        }
        break;
    }
    let (input, _) = opt(keyword("end")).parse(input)?;
    let span = CodeSpan::from_bounds(start, input);
    Ok((
        input,
        node(
            ExprKind::Control {
                keyword: "begin".to_string(),
                condition: None,
                body,
            },
            span,
        ),
    ))
}

fn jump_stmt(input: Span<'_>) -> PResult<'_, Expr> {
    let (input, _) = hs0(input)?;
    let start = input;
    let (input, kw) = alt((
        keyword("return"),
        keyword("yield"),
        keyword("break"),
        keyword("next"),
    ))
    .parse(input)?;
    let (input, value_expr) = opt(command_or_expr).parse(input)?;
    let span = CodeSpan::from_bounds(start, input);
    let result = node(
        ExprKind::Control {
            keyword: kw.fragment().to_string(),
            condition: value_expr.map(Box::new),
            body: Vec::new(),
        },
        span,
    );
    with_modifiers(start, input, result)
}

fn expr_stmt(input: Span<'_>) -> PResult<'_, Expr> {
    let (input, _) = hs0(input)?;
    let start = input;
    let (input, result) = assign_chain(input)?;
    with_modifiers(start, input, result)
}

/// Wraps a statement in trailing `if`/`unless`/`while`/`until` modifiers.
fn with_modifiers<'a>(start: Span<'a>, input: Span<'a>, result: Expr) -> PResult<'a, Expr> {
    let mut input = input;
    let mut result = result;
    loop {
        let (next, kw) = opt(alt((
            keyword("if"),
            keyword("unless"),
            keyword("while"),
            keyword("until"),
        )))
        .parse(input)?;
        let Some(kw) = kw else {
            break;
        };
        let (next, condition) = expr(next)?;
        let span = CodeSpan::from_bounds(start, next);
        result = node(
            ExprKind::Control {
                keyword: kw.fragment().to_string(),
                condition: Some(Box::new(condition)),
                body: vec![result],
            },
            span,
        );
        input = next;
    }
    Ok((input, result))
}

/// Right-associative assignment chain (`a = b = c`).
fn assign_chain(input: Span<'_>) -> PResult<'_, Expr> {
    let (input, _) = hs0(input)?;
    let start = input;
    let (input, first) = command_or_expr(input)?;
    match assign_op(input) {
        Ok((rest, _)) => {
            let (rest, value_expr) = assign_chain(rest)?;
            let span = CodeSpan::from_bounds(start, rest);
            Ok((
                rest,
                node(
                    ExprKind::Assign {
                        target: Box::new(demote_target(first)),
                        value: Box::new(value_expr),
                    },
                    span,
                ),
            ))
        }
        Err(_) => Ok((input, first)),
    }
}

fn assign_op(input: Span<'_>) -> PResult<'_, Span<'_>> {
    tok(alt((
        tag("**="),
        tag("<<="),
        tag(">>="),
        tag("||="),
        tag("&&="),
        tag("+="),
        tag("-="),
        tag("*="),
        tag("/="),
        tag("%="),
        tag("|="),
        tag("&="),
        tag("^="),
        terminated(tag("="), not(one_of("=~>"))),
    )))(input)
}

/// A bare name on the left of `=` is a variable, not a call.
fn demote_target(expr: Expr) -> Expr {
    match expr {
        Expr {
            kind:
                ExprKind::Send {
                    receiver: None,
                    method,
                    args,
                },
            span,
        } if args.is_empty() => Expr {
            kind: ExprKind::Lvar(method),
            span,
        },
        other => other,
    }
}

fn command_or_expr(input: Span<'_>) -> PResult<'_, Expr> {
    alt((command_expr, expr)).parse(input)
}

/// A call with unparenthesized arguments (`text_field_tag :name, value`)
/// and optionally a trailing `do` block.
fn command_expr(input: Span<'_>) -> PResult<'_, Expr> {
    let (input, _) = hs0(input)?;
    let start = input;
    let (input, chain) = postfix_expr(input)?;
    let (receiver, method) = match chain.kind {
        ExprKind::Send {
            receiver,
            method,
            ref args,
        } if args.is_empty() => (receiver, method),
        _ => {
            return Err(nom::Err::Error(VerboseError::from_error_kind(
                start,
                ErrorKind::Verify,
            )))
        }
    };
    let (input, _) = value((), take_while1(|c| c == ' ' || c == '\t')).parse(input)?;
    let (_, _) = peek(satisfy(is_command_arg_start)).parse(input)?;
    let (input, args) = call_args(input)?;
    let span = CodeSpan::from_bounds(start, input);
    let call = node(
        ExprKind::Send {
            receiver,
            method,
            args,
        },
        span,
    );
    if let Ok((rest, (params, body))) = do_block(input) {
        let span = CodeSpan::from_bounds(start, rest);
        return Ok((
            rest,
            node(
                ExprKind::Block {
                    call: Box::new(call),
                    params,
                    body,
                },
                span,
            ),
        ));
    }
    Ok((input, call))
}

fn is_command_arg_start(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '@' | '$' | ':' | '\'' | '"' | '[' | '(' | '!' | '*' | '&')
}

enum ArgItem {
    Positional(Expr),
    Pair(Expr, Expr),
}

/// Comma-separated argument list. Trailing `key: value` pairs collapse
/// into one hash argument.
fn call_args(input: Span<'_>) -> PResult<'_, Vec<Expr>> {
    let (input, items) = separated_list1(arg_comma, arg_item).parse(input)?;
    Ok((input, fold_args(items)))
}

/// Argument separator; a newline after the comma continues the list.
fn arg_comma(input: Span<'_>) -> PResult<'_, ()> {
    value((), pair(tok_char(','), opt(sep1))).parse(input)
}

fn arg_item(input: Span<'_>) -> PResult<'_, ArgItem> {
    if let Ok((rest, key)) = hash_label(input) {
        let (rest, value_expr) = expr(rest)?;
        return Ok((rest, ArgItem::Pair(key, value_expr)));
    }
    // splat and block-pass prefixes carry the inner expression
    if let Ok((rest, _)) = alt((tok_tag("**"), tok_tag("*"), tok_tag("&"))).parse(input) {
        let (rest, inner) = expr(rest)?;
        return Ok((rest, ArgItem::Positional(inner)));
    }
    let (rest, first) = expr(input)?;
    if let Ok((rest, _)) = tok_tag("=>")(rest) {
        let (rest, value_expr) = expr(rest)?;
        return Ok((rest, ArgItem::Pair(first, value_expr)));
    }
    Ok((rest, ArgItem::Positional(first)))
}

fn fold_args(items: Vec<ArgItem>) -> Vec<Expr> {
    let mut out = Vec::new();
    let mut pairs: Vec<(Expr, Expr)> = Vec::new();
    for item in items {
        match item {
            ArgItem::Positional(e) => {
                flush_pairs(&mut pairs, &mut out);
                out.push(e);
            }
            ArgItem::Pair(k, v) => pairs.push((k, v)),
        }
    }
    flush_pairs(&mut pairs, &mut out);
    out
}

fn flush_pairs(pairs: &mut Vec<(Expr, Expr)>, out: &mut Vec<Expr>) {
    if pairs.is_empty() {
        return;
    }
    let span = pairs[0].0.span.merge(&pairs[pairs.len() - 1].1.span);
    out.push(node(ExprKind::Hash(std::mem::take(pairs)), span));
}

/// `name: value` keyword-argument key. The colon must attach directly.
fn hash_label(input: Span<'_>) -> PResult<'_, Expr> {
    let (input, _) = hs0(input)?;
    let start = input;
    let (input, name) = identifier(input)?;
    let (input, _) = terminated(char(':'), not(char(':'))).parse(input)?;
    let span = CodeSpan::from_bounds(start, input);
    Ok((input, node(ExprKind::Sym(name), span)))
}

/// Top-level expression parser.
pub(super) fn expr(input: Span<'_>) -> PResult<'_, Expr> {
    kw_logic_expr(input)
}

/// Parses left-associative `and`/`or`.
fn kw_logic_expr(input: Span<'_>) -> PResult<'_, Expr> {
    let (mut input, mut left) = not_expr(input)?;
    loop {
        let (next, kw) = opt(alt((keyword("and"), keyword("or")))).parse(input)?;
        let Some(kw) = kw else {
            break;
        };
        let logical_op = if *kw.fragment() == "and" {
            LogicalOp::And
        } else {
            LogicalOp::Or
        };
        let (next, right) = not_expr(next)?;
        let span = left.span.merge(&right.span);
        left = node(
            ExprKind::Logical {
                op: logical_op,
                left: Box::new(left),
                right: Box::new(right),
            },
            span,
        );
        input = next;
    }
    Ok((input, left))
}

fn not_expr(input: Span<'_>) -> PResult<'_, Expr> {
    let (input, _) = hs0(input)?;
    let start = input;
    if let Ok((rest, _)) = keyword("not")(input) {
        let (rest, inner) = not_expr(rest)?;
        let span = CodeSpan::from_bounds(start, rest);
        return Ok((
            rest,
            node(
                ExprKind::Send {
                    receiver: Some(Box::new(inner)),
                    method: "!".to_string(),
                    args: Vec::new(),
                },
                span,
            ),
        ));
    }
    range_expr(input)
}

fn range_expr(input: Span<'_>) -> PResult<'_, Expr> {
    let (input, left) = or_expr(input)?;
    let (input, dots) = opt(alt((tok_tag("..."), tok_tag("..")))).parse(input)?;
    if dots.is_none() {
        return Ok((input, left));
    }
    let (input, right) = or_expr(input)?;
    let span = left.span.merge(&right.span);
    Ok((
        input,
        node(
            ExprKind::Range {
                from: Box::new(left),
                to: Box::new(right),
            },
            span,
        ),
    ))
}

/// Parses left-associative `||`.
fn or_expr(input: Span<'_>) -> PResult<'_, Expr> {
    let (mut input, mut left) = and_expr(input)?;
    loop {
        let (next, found) = opt(op("||", "=")).parse(input)?;
        if found.is_none() {
            break;
        }
        let (next, right) = and_expr(next)?;
        let span = left.span.merge(&right.span);
        left = node(
            ExprKind::Logical {
                op: LogicalOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            },
            span,
        );
        input = next;
    }
    Ok((input, left))
}

/// Parses left-associative `&&`.
fn and_expr(input: Span<'_>) -> PResult<'_, Expr> {
    let (mut input, mut left) = equality_expr(input)?;
    loop {
        let (next, found) = opt(op("&&", "=")).parse(input)?;
        if found.is_none() {
            break;
        }
        let (next, right) = equality_expr(next)?;
        let span = left.span.merge(&right.span);
        left = node(
            ExprKind::Logical {
                op: LogicalOp::And,
                left: Box::new(left),
                right: Box::new(right),
            },
            span,
        );
        input = next;
    }
    Ok((input, left))
}

/// Folds a left-associative run of binary operators into nested calls.
fn binop_chain<'a, F, P>(
    mut operand: F,
    mut operator: P,
) -> impl FnMut(Span<'a>) -> PResult<'a, Expr>
where
    F: FnMut(Span<'a>) -> PResult<'a, Expr>,
    P: FnMut(Span<'a>) -> PResult<'a, Span<'a>>,
{
    move |input| {
        let (mut input, mut left) = operand(input)?;
        loop {
            let (next, op_text) = opt(&mut operator).parse(input)?;
            let Some(op_text) = op_text else {
                break;
            };
            let (next, right) = operand(next)?;
            let span = left.span.merge(&right.span);
            left = node(
                ExprKind::Send {
                    receiver: Some(Box::new(left)),
                    method: op_text.fragment().to_string(),
                    args: vec![right],
                },
                span,
            );
            input = next;
        }
        Ok((input, left))
    }
}

fn equality_expr(input: Span<'_>) -> PResult<'_, Expr> {
    binop_chain(
        comparison_expr,
        tok(alt((
            tag("<=>"),
            tag("==="),
            tag("=="),
            tag("!="),
            tag("=~"),
            tag("!~"),
        ))),
    )(input)
}

fn comparison_expr(input: Span<'_>) -> PResult<'_, Expr> {
    binop_chain(
        bitor_expr,
        tok(alt((
            tag("<="),
            tag(">="),
            terminated(tag("<"), not(one_of("<="))),
            terminated(tag(">"), not(one_of(">="))),
        ))),
    )(input)
}

fn bitor_expr(input: Span<'_>) -> PResult<'_, Expr> {
    binop_chain(bitand_expr, alt((op("|", "|="), op("^", "="))))(input)
}

fn bitand_expr(input: Span<'_>) -> PResult<'_, Expr> {
    binop_chain(shift_expr, op("&", "&=."))(input)
}

fn shift_expr(input: Span<'_>) -> PResult<'_, Expr> {
    // `<<~` and `<<-` open heredocs, which this grammar does not cover
    binop_chain(
        additive_expr,
        tok(alt((
            terminated(tag("<<"), not(one_of("=~-"))),
            terminated(tag(">>"), not(char('='))),
        ))),
    )(input)
}

fn additive_expr(input: Span<'_>) -> PResult<'_, Expr> {
    binop_chain(multiplicative_expr, alt((op("+", "="), op("-", "="))))(input)
}

fn multiplicative_expr(input: Span<'_>) -> PResult<'_, Expr> {
    binop_chain(
        unary_expr,
        alt((op("*", "*="), op("/", "="), op("%", "="))),
    )(input)
}

fn unary_expr(input: Span<'_>) -> PResult<'_, Expr> {
    let (input, _) = hs0(input)?;
    let start = input;
    if let Ok((rest, op_char)) = one_of::<_, _, VerboseError<Span<'_>>>("-+!~")(input) {
        // `!=` is an operator, not `!` applied to `=...`
        if op_char != '!' || !rest.fragment().starts_with('=') {
            let (rest, inner) = unary_expr(rest)?;
            let method = match op_char {
                '-' => "-@",
                '+' => "+@",
                '!' => "!",
                _ => "~",
            };
            let span = CodeSpan::from_bounds(start, rest);
            return Ok((
                rest,
                node(
                    ExprKind::Send {
                        receiver: Some(Box::new(inner)),
                        method: method.to_string(),
                        args: Vec::new(),
                    },
                    span,
                ),
            ));
        }
    }
    power_expr(input)
}

fn power_expr(input: Span<'_>) -> PResult<'_, Expr> {
    let (input, base) = postfix_expr(input)?;
    match op("**", "=")(input) {
        Ok((rest, _)) => {
            let (rest, exp) = unary_expr(rest)?;
            let span = base.span.merge(&exp.span);
            Ok((
                rest,
                node(
                    ExprKind::Send {
                        receiver: Some(Box::new(base)),
                        method: "**".to_string(),
                        args: vec![exp],
                    },
                    span,
                ),
            ))
        }
        Err(_) => Ok((input, base)),
    }
}

/// Parses postfix chains: method calls, scope resolution, indexing, and
/// attached blocks.
fn postfix_expr(input: Span<'_>) -> PResult<'_, Expr> {
    let (input, _) = hs0(input)?;
    let start = input;
    let (mut input, mut acc) = primary(input)?;
    loop {
        // `.name` / `&.name`, optionally with parenthesized arguments
        if let Ok((rest, _)) = alt((
            tok_tag("&."),
            tok(terminated(tag("."), not(char('.')))),
        ))
        .parse(input)
        {
            let (rest, name) = tok(identifier)(rest)?;
            let (rest, args) = opt(paren_args).parse(rest)?;
            let span = CodeSpan::from_bounds(start, rest);
            acc = node(
                ExprKind::Send {
                    receiver: Some(Box::new(acc)),
                    method: name,
                    args: args.unwrap_or_default(),
                },
                span,
            );
            input = rest;
            continue;
        }
        // `::Const` scope or `::method` call
        if let Ok((rest, _)) = tok_tag("::")(input) {
            let (rest, name) = tok(identifier)(rest)?;
            let span = CodeSpan::from_bounds(start, rest);
            if is_constant_name(&name) {
                acc = node(
                    ExprKind::Const {
                        receiver: Some(Box::new(acc)),
                        name,
                    },
                    span,
                );
            } else {
                let (rest2, args) = opt(paren_args).parse(rest)?;
                let span = CodeSpan::from_bounds(start, rest2);
                acc = node(
                    ExprKind::Send {
                        receiver: Some(Box::new(acc)),
                        method: name,
                        args: args.unwrap_or_default(),
                    },
                    span,
                );
                input = rest2;
                continue;
            }
            input = rest;
            continue;
        }
        // `[index]` must attach directly; with a space it would be an
        // array argument to a command
        if input.fragment().starts_with('[') {
            let (rest, _) = input.take_split(1);
            let (rest, _) = opt(sep1).parse(rest)?;
            let (rest, items) = separated_list0(arg_comma, arg_item).parse(rest)?;
            let (rest, _) = opt(tok_char(',')).parse(rest)?;
            let (rest, _) = opt(sep1).parse(rest)?;
            let (rest, _) = tok_char(']')(rest)?;
            let span = CodeSpan::from_bounds(start, rest);
            acc = node(
                ExprKind::Send {
                    receiver: Some(Box::new(acc)),
                    method: "[]".to_string(),
                    args: fold_args(items),
                },
                span,
            );
            input = rest;
            continue;
        }
        // blocks attach to calls only
        if matches!(acc.kind, ExprKind::Send { .. }) {
            if let Ok((rest, (params, body))) = brace_block(input) {
                let span = CodeSpan::from_bounds(start, rest);
                acc = node(
                    ExprKind::Block {
                        call: Box::new(acc),
                        params,
                        body,
                    },
                    span,
                );
                input = rest;
                continue;
            }
            if let Ok((rest, (params, body))) = do_block(input) {
                let span = CodeSpan::from_bounds(start, rest);
                acc = node(
                    ExprKind::Block {
                        call: Box::new(acc),
                        params,
                        body,
                    },
                    span,
                );
                input = rest;
                continue;
            }
        }
        break;
    }
    Ok((input, acc))
}

/// `do |params| body end`. The `end` is optional because templates
/// close blocks in later regions.
fn do_block(input: Span<'_>) -> PResult<'_, (Vec<String>, Vec<Expr>)> {
    let (input, _) = keyword("do")(input)?;
    let (input, params) = opt(block_params).parse(input)?;
    let (input, body) = inner_body(input)?;
    let (input, _) = opt(keyword("end")).parse(input)?;
    Ok((input, (params.unwrap_or_default(), body)))
}

fn brace_block(input: Span<'_>) -> PResult<'_, (Vec<String>, Vec<Expr>)> {
    let (input, _) = tok_char('{')(input)?;
    let (input, params) = opt(block_params).parse(input)?;
    let (input, body) = inner_body(input)?;
    let (input, _) = tok_char('}')(input)?;
    Ok((input, (params.unwrap_or_default(), body)))
}

fn block_params(input: Span<'_>) -> PResult<'_, Vec<String>> {
    delimited(
        tok_char('|'),
        separated_list0(
            tok_char(','),
            preceded(
                opt(alt((tok_tag("**"), tok_tag("*"), tok_tag("&")))),
                tok(identifier),
            ),
        ),
        tok_char('|'),
    )
    .parse(input)
}

/// Parenthesized argument list, attached directly to a call name.
fn paren_args(input: Span<'_>) -> PResult<'_, Vec<Expr>> {
    let (input, _) = char('(')(input)?;
    let (input, _) = opt(sep1).parse(input)?;
    let (input, items) = separated_list0(arg_comma, arg_item).parse(input)?;
    let (input, _) = opt(tok_char(',')).parse(input)?;
    let (input, _) = opt(sep1).parse(input)?;
    let (input, _) = tok_char(')')(input)?;
    Ok((input, fold_args(items)))
}

fn primary(input: Span<'_>) -> PResult<'_, Expr> {
    alt((
        paren_group,
        float_primary,
        int_primary,
        string_primary,
        symbol_primary,
        array_literal,
        hash_literal,
        keyword_literal,
        variable_primary,
        ident_primary,
    ))
    .parse(input)
}

fn paren_group(input: Span<'_>) -> PResult<'_, Expr> {
    let (input, _) = hs0(input)?;
    let start = input;
    let (input, _) = char('(')(input)?;
    let (input, _) = opt(sep1).parse(input)?;
    let (input, mut inner) = stmt_inner(input)?;
    let (input, _) = opt(sep1).parse(input)?;
    let (input, _) = tok_char(')')(input)?;
    inner.span = CodeSpan::from_bounds(start, input);
    Ok((input, inner))
}

fn float_primary(input: Span<'_>) -> PResult<'_, Expr> {
    let (input, _) = hs0(input)?;
    let start = input;
    let (input, text) = float_literal(input)?;
    let span = CodeSpan::from_bounds(start, input);
    Ok((input, node(ExprKind::Float(text), span)))
}

fn int_primary(input: Span<'_>) -> PResult<'_, Expr> {
    let (input, _) = hs0(input)?;
    let start = input;
    let (input, text) = int_literal(input)?;
    let span = CodeSpan::from_bounds(start, input);
    Ok((input, node(ExprKind::Int(text), span)))
}

fn string_primary(input: Span<'_>) -> PResult<'_, Expr> {
    let (input, _) = hs0(input)?;
    let start = input;
    let (input, content) = alt((double_quoted, single_quoted)).parse(input)?;
    let span = CodeSpan::from_bounds(start, input);
    Ok((input, node(ExprKind::Str(content), span)))
}

fn symbol_primary(input: Span<'_>) -> PResult<'_, Expr> {
    let (input, _) = hs0(input)?;
    let start = input;
    let (input, _) = terminated(char(':'), not(char(':'))).parse(input)?;
    let (input, name) = alt((identifier, double_quoted, single_quoted)).parse(input)?;
    let span = CodeSpan::from_bounds(start, input);
    Ok((input, node(ExprKind::Sym(name), span)))
}

fn array_literal(input: Span<'_>) -> PResult<'_, Expr> {
    let (input, _) = hs0(input)?;
    let start = input;
    let (input, _) = char('[')(input)?;
    let (input, _) = opt(sep1).parse(input)?;
    let (input, items) = separated_list0(arg_comma, arg_item).parse(input)?;
    let (input, _) = opt(tok_char(',')).parse(input)?;
    let (input, _) = opt(sep1).parse(input)?;
    let (input, _) = tok_char(']')(input)?;
    let span = CodeSpan::from_bounds(start, input);
    Ok((input, node(ExprKind::Array(fold_args(items)), span)))
}

fn hash_literal(input: Span<'_>) -> PResult<'_, Expr> {
    let (input, _) = hs0(input)?;
    let start = input;
    let (input, _) = char('{')(input)?;
    let (input, _) = opt(sep1).parse(input)?;
    let (input, pairs) = separated_list0(arg_comma, pair_item).parse(input)?;
    let (input, _) = opt(tok_char(',')).parse(input)?;
    let (input, _) = opt(sep1).parse(input)?;
    let (input, _) = tok_char('}')(input)?;
    let span = CodeSpan::from_bounds(start, input);
    Ok((input, node(ExprKind::Hash(pairs), span)))
}

fn pair_item(input: Span<'_>) -> PResult<'_, (Expr, Expr)> {
    if let Ok((rest, key)) = hash_label(input) {
        let (rest, value_expr) = expr(rest)?;
        return Ok((rest, (key, value_expr)));
    }
    let (rest, key) = expr(input)?;
    let (rest, _) = tok_tag("=>")(rest)?;
    let (rest, value_expr) = expr(rest)?;
    Ok((rest, (key, value_expr)))
}

fn keyword_literal(input: Span<'_>) -> PResult<'_, Expr> {
    let (input, _) = hs0(input)?;
    let start = input;
    let (input, kind) = alt((
        value(ExprKind::Nil, keyword("nil")),
        value(ExprKind::True, keyword("true")),
        value(ExprKind::False, keyword("false")),
        value(ExprKind::SelfRef, keyword("self")),
    ))
    .parse(input)?;
    let span = CodeSpan::from_bounds(start, input);
    Ok((input, node(kind, span)))
}

fn variable_primary(input: Span<'_>) -> PResult<'_, Expr> {
    let (input, _) = hs0(input)?;
    let start = input;
    let (input, kind) = alt((
        preceded(tag("@@"), identifier).map(ExprKind::Cvar),
        preceded(char('@'), identifier).map(ExprKind::Ivar),
        preceded(char('$'), identifier).map(ExprKind::Gvar),
    ))
    .parse(input)?;
    let span = CodeSpan::from_bounds(start, input);
    Ok((input, node(kind, span)))
}

fn ident_primary(input: Span<'_>) -> PResult<'_, Expr> {
    let (input, _) = hs0(input)?;
    let start = input;
    let (input, name) = identifier(input)?;
    if is_constant_name(&name) {
        let span = CodeSpan::from_bounds(start, input);
        return Ok((
            input,
            node(
                ExprKind::Const {
                    receiver: None,
                    name,
                },
                span,
            ),
        ));
    }
    let (input, args) = opt(paren_args).parse(input)?;
    let span = CodeSpan::from_bounds(start, input);
    Ok((
        input,
        node(
            ExprKind::Send {
                receiver: None,
                method: name,
                args: args.unwrap_or_default(),
            },
            span,
        ),
    ))
}
