use std::fmt::{self, Display};

use crate::token::TokenKind;

/// Joins the rendered items with the given separator
fn join<T: Display>(items: &[T], sep: &str) -> String {
    items
        .iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(sep)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PrefixOp {
    Bang,
    Minus,
}

impl Display for PrefixOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Bang => "!",
            Self::Minus => "-",
        })
    }
}

impl PrefixOp {
    pub fn from_token(t: TokenKind) -> Option<Self> {
        let op = match t {
            TokenKind::BANG => Self::Bang,
            TokenKind::MINUS => Self::Minus,
            _ => return None,
        };
        Some(op)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InfixOp {
    Slash,
    Star,
    Plus,
    Minus,
    Greater,
    Less,
    BangEqual,
    EqualEqual,
}

impl Display for InfixOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Slash => "/",
            Self::Star => "*",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Greater => ">",
            Self::Less => "<",
            Self::BangEqual => "!=",
            Self::EqualEqual => "==",
        })
    }
}

impl InfixOp {
    pub fn from_token(t: TokenKind) -> Option<Self> {
        let op = match t {
            TokenKind::SLASH => Self::Slash,
            TokenKind::STAR => Self::Star,
            TokenKind::PLUS => Self::Plus,
            TokenKind::MINUS => Self::Minus,
            TokenKind::GREATER => Self::Greater,
            TokenKind::LESS => Self::Less,
            TokenKind::BANG_EQUAL => Self::BangEqual,
            TokenKind::EQUAL_EQUAL => Self::EqualEqual,
            _ => return None,
        };
        Some(op)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Literal {
    Integer(i64),
    Str(String),
    Boolean(bool),
}

impl Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(n) => write!(f, "{n}"),
            Self::Str(s) => write!(f, "\"{s}\""),
            Self::Boolean(b) => write!(f, "{b}"),
        }
    }
}

/// Expressions that can fail at runtime keep the 1-based line of
/// the token that introduced them, for error messages.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Expr {
    Ident {
        name: String,
        line: usize,
    },
    Literal(Literal),
    Prefix {
        op: PrefixOp,
        expr: Box<Expr>,
        line: usize,
    },
    Infix {
        lhs: Box<Expr>,
        op: InfixOp,
        rhs: Box<Expr>,
        line: usize,
    },
    If {
        condition: Box<Expr>,
        consequence: Block,
        alternative: Option<Block>,
    },
    Function {
        params: Vec<String>,
        body: Block,
    },
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
        line: usize,
    },
    Array(Vec<Expr>),
    Hash {
        pairs: Vec<(Expr, Expr)>,
        line: usize,
    },
    Index {
        expr: Box<Expr>,
        index: Box<Expr>,
        line: usize,
    },
}

impl Expr {
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::Ident { line, .. }
            | Self::Prefix { line, .. }
            | Self::Infix { line, .. }
            | Self::Call { line, .. }
            | Self::Hash { line, .. }
            | Self::Index { line, .. } => Some(*line),
            Self::Literal(_) | Self::If { .. } | Self::Function { .. } | Self::Array(_) => None,
        }
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ident { name, .. } => f.write_str(name),
            Self::Literal(lit) => write!(f, "{lit}"),
            Self::Prefix { op, expr, .. } => write!(f, "({op}{expr})"),
            Self::Infix { lhs, op, rhs, .. } => write!(f, "({lhs} {op} {rhs})"),
            Self::If {
                condition,
                consequence,
                alternative,
            } => {
                write!(f, "if ({condition}) {consequence}")?;
                if let Some(alt) = alternative {
                    write!(f, " else {alt}")?;
                }
                Ok(())
            }
            Self::Function { params, body } => write!(f, "fn({}) {body}", params.join(", ")),
            Self::Call { func, args, .. } => write!(f, "{func}({})", join(args, ", ")),
            Self::Array(elems) => write!(f, "[{}]", join(elems, ", ")),
            Self::Hash { pairs, .. } => {
                let pairs = pairs
                    .iter()
                    .map(|(k, v)| format!("{k}: {v}"))
                    .collect::<Vec<_>>();
                write!(f, "{{{}}}", pairs.join(", "))
            }
            Self::Index { expr, index, .. } => write!(f, "({expr}[{index}])"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
}

impl Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.stmts.is_empty() {
            f.write_str("{ }")
        } else {
            write!(f, "{{ {} }}", join(&self.stmts, " "))
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Stmt {
    Let { ident: String, value: Expr },
    Return(Option<Expr>),
    Expr(Expr),
}

impl Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Let { ident, value } => write!(f, "let {ident} = {value};"),
            Self::Return(Some(value)) => write!(f, "return {value};"),
            Self::Return(None) => f.write_str("return;"),
            Self::Expr(expr) => write!(f, "{expr};"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Program {
    pub stmts: Vec<Stmt>,
}

impl Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&join(&self.stmts, " "))
    }
}
