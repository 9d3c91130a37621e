//! AST for embedded Ruby fragments.
//!
//! The tree is deliberately small: linters only ever walk it to find
//! method calls, so literals keep their raw text and constructs that
//! carry no calls collapse into a few generic node kinds.

use nom_locate::LocatedSpan;

/// Parser input span type carrying byte offsets and line/column info.
pub type Span<'a> = LocatedSpan<&'a str>;

/// Source range and anchor position inside one code fragment.
///
/// Lines and columns are 1-based and relative to the fragment, not the
/// template that contains it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeSpan {
    /// Start byte offset (inclusive).
    pub start: usize,
    /// End byte offset (exclusive).
    pub end: usize,
    /// 1-based line number.
    pub line: usize,
    /// 1-based UTF-8 column.
    pub column: usize,
}

impl CodeSpan {
    /// Creates a span from parser start/end positions.
    pub fn from_bounds(start: Span<'_>, end: Span<'_>) -> Self {
        Self {
            start: start.location_offset(),
            end: end.location_offset(),
            line: start.location_line() as usize,
            column: start.get_utf8_column(),
        }
    }

    /// Returns span length in bytes.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Returns a span that starts at `self` and ends at `other`.
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            start: self.start,
            end: other.end,
            line: self.line,
            column: self.column,
        }
    }
}

/// Short-circuiting boolean operators.
///
/// These are kept apart from method-call nodes because Ruby does not
/// dispatch them, so a call search must descend through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

/// Expression node variants.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Nil,
    True,
    False,
    SelfRef,
    /// Integer literal, raw text preserved.
    Int(String),
    /// Float literal, raw text preserved.
    Float(String),
    /// String literal. Interpolation is kept as raw text.
    Str(String),
    /// Symbol literal (`:name`).
    Sym(String),
    /// Local variable reference. Only produced for assignment targets
    /// and block parameters; bare names in value position are calls.
    Lvar(String),
    /// Instance variable (`@name`).
    Ivar(String),
    /// Class variable (`@@name`).
    Cvar(String),
    /// Global variable (`$name`).
    Gvar(String),
    /// Constant reference, possibly scoped (`A::B`).
    Const {
        receiver: Option<Box<Expr>>,
        name: String,
    },
    /// Array literal.
    Array(Vec<Expr>),
    /// Hash literal or trailing keyword arguments.
    Hash(Vec<(Expr, Expr)>),
    /// Range literal (`a..b`, `a...b`).
    Range { from: Box<Expr>, to: Box<Expr> },
    /// `&&`, `||`, `and`, `or`.
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Method call. Binary and unary operators are calls too, with the
    /// operator as the method name.
    Send {
        receiver: Option<Box<Expr>>,
        method: String,
        args: Vec<Expr>,
    },
    /// A call with an attached `do ... end` or `{ ... }` block. The
    /// body may be empty when a template splits the block across
    /// regions and the `end` lives elsewhere.
    Block {
        call: Box<Expr>,
        params: Vec<String>,
        body: Vec<Expr>,
    },
    /// Keyword-introduced statement (`if`, `while`, `case`, `return`,
    /// a bare `end`, ...). The condition slot holds whatever single
    /// expression follows the keyword, when one does.
    Control {
        keyword: String,
        condition: Option<Box<Expr>>,
        body: Vec<Expr>,
    },
    /// Assignment, including operator-assignment forms.
    Assign { target: Box<Expr>, value: Box<Expr> },
    /// Statement sequence. Every parsed fragment is rooted in one.
    Seq(Vec<Expr>),
}

/// A spanned expression node.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: CodeSpan,
}

impl Expr {
    /// Returns the first method call in the tree, walking depth-first
    /// with each node visited before its children.
    pub fn first_call(&self) -> Option<&Expr> {
        if matches!(self.kind, ExprKind::Send { .. }) {
            return Some(self);
        }
        self.children().into_iter().find_map(Expr::first_call)
    }

    /// The method name, when this node is a call.
    pub fn method_name(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Send { method, .. } => Some(method),
            _ => None,
        }
    }

    /// Child nodes in source order.
    fn children(&self) -> Vec<&Expr> {
        match &self.kind {
            ExprKind::Nil
            | ExprKind::True
            | ExprKind::False
            | ExprKind::SelfRef
            | ExprKind::Int(_)
            | ExprKind::Float(_)
            | ExprKind::Str(_)
            | ExprKind::Sym(_)
            | ExprKind::Lvar(_)
            | ExprKind::Ivar(_)
            | ExprKind::Cvar(_)
            | ExprKind::Gvar(_) => Vec::new(),
            ExprKind::Const { receiver, .. } => receiver.iter().map(Box::as_ref).collect(),
            ExprKind::Array(items) => items.iter().collect(),
            ExprKind::Hash(pairs) => pairs.iter().flat_map(|(k, v)| [k, v]).collect(),
            ExprKind::Range { from, to } => vec![from, to],
            ExprKind::Logical { left, right, .. } => vec![left, right],
            ExprKind::Send { receiver, args, .. } => {
                receiver.iter().map(Box::as_ref).chain(args.iter()).collect()
            }
            ExprKind::Block { call, body, .. } => {
                std::iter::once(call.as_ref()).chain(body.iter()).collect()
            }
            ExprKind::Control {
                condition, body, ..
            } => condition.iter().map(Box::as_ref).chain(body.iter()).collect(),
            ExprKind::Assign { target, value } => vec![target, value],
            ExprKind::Seq(stmts) => stmts.iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span() -> CodeSpan {
        CodeSpan {
            start: 0,
            end: 0,
            line: 1,
            column: 1,
        }
    }

    fn send(method: &str, args: Vec<Expr>) -> Expr {
        Expr {
            kind: ExprKind::Send {
                receiver: None,
                method: method.to_string(),
                args,
            },
            span: span(),
        }
    }

    #[test]
    fn test_first_call_prefers_outermost() {
        let tree = send("outer", vec![send("inner", vec![])]);
        assert_eq!(tree.first_call().and_then(Expr::method_name), Some("outer"));
    }

    #[test]
    fn test_first_call_descends_through_assignment_target() {
        let tree = Expr {
            kind: ExprKind::Assign {
                target: Box::new(Expr {
                    kind: ExprKind::Lvar("x".to_string()),
                    span: span(),
                }),
                value: Box::new(send("text_field_tag", vec![])),
            },
            span: span(),
        };
        assert_eq!(
            tree.first_call().and_then(Expr::method_name),
            Some("text_field_tag")
        );
    }

    #[test]
    fn test_first_call_visits_condition_before_body() {
        let tree = Expr {
            kind: ExprKind::Control {
                keyword: "if".to_string(),
                condition: Some(Box::new(send("signed_in?", vec![]))),
                body: vec![send("text_field_tag", vec![])],
            },
            span: span(),
        };
        assert_eq!(
            tree.first_call().and_then(Expr::method_name),
            Some("signed_in?")
        );
    }

    #[test]
    fn test_first_call_none_for_literals() {
        let tree = Expr {
            kind: ExprKind::Seq(vec![Expr {
                kind: ExprKind::Str("plain".to_string()),
                span: span(),
            }]),
            span: span(),
        };
        assert!(tree.first_call().is_none());
    }

    #[test]
    fn test_span_merge() {
        let a = CodeSpan {
            start: 2,
            end: 5,
            line: 1,
            column: 3,
        };
        let b = CodeSpan {
            start: 8,
            end: 12,
            line: 2,
            column: 1,
        };
        let merged = a.merge(&b);
        assert_eq!(merged.start, 2);
        assert_eq!(merged.end, 12);
        assert_eq!(merged.line, 1);
        assert_eq!(merged.column, 3);
        assert_eq!(merged.len(), 10);
    }
}
