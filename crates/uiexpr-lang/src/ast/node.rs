use std::fmt::{self, Display, Formatter};

use itertools::Itertools;
use smallvec::SmallVec;

use crate::{Shared, range::Range};

use super::IdentName;

pub type Args = SmallVec<[Shared<Node>; 4]>;

#[derive(PartialEq, Debug, Clone)]
pub struct Node {
    pub range: Range,
    pub expr: Shared<Expr>,
}

impl Node {
    pub fn new(range: Range, expr: Expr) -> Shared<Node> {
        Shared::new(Node {
            range,
            expr: Shared::new(expr),
        })
    }

    /// Head identifier and segments of a plain dotted chain (`a.b.c`), with
    /// the type-argument count of every segment.
    pub fn dotted_path(&self) -> Option<Vec<(IdentName, usize)>> {
        match &*self.expr {
            Expr::Ident(ident, type_args) => Some(vec![(ident.name.clone(), type_args.len())]),
            Expr::Member(target, ident, type_args) => {
                let mut path = target.dotted_path()?;
                path.push((ident.name.clone(), type_args.len()));
                Some(path)
            }
            _ => None,
        }
    }
}

#[derive(PartialEq, Debug, Eq, Clone, Hash)]
pub struct Ident {
    pub name: IdentName,
    pub range: Range,
}

impl Ident {
    pub fn new(name: &str) -> Self {
        Self::new_with_range(name, Range::default())
    }

    pub fn new_with_range(name: &str, range: Range) -> Self {
        Self {
            name: IdentName::new(name),
            range,
        }
    }

    pub fn is_alias(&self) -> bool {
        self.name.starts_with('$')
    }
}

impl Display for Ident {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "{}", self.name)
    }
}

#[derive(PartialEq, Debug, Clone)]
pub enum Literal {
    Bool(bool),
    Int(i32),
    Float(f32),
    Double(f64),
    String(String),
    Null,
}

#[derive(PartialEq, Debug, Clone, Copy, Eq, Hash)]
pub enum UnaryOp {
    Not,
    Minus,
    BitwiseNot,
}

impl Display for UnaryOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            UnaryOp::Not => write!(f, "!"),
            UnaryOp::Minus => write!(f, "-"),
            UnaryOp::BitwiseNot => write!(f, "~"),
        }
    }
}

#[derive(PartialEq, Debug, Clone, Copy, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    ShiftLeft,
    ShiftRight,
    BitAnd,
    BitOr,
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    And,
    Or,
}

impl BinaryOp {
    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod
        )
    }

    pub fn is_comparison(&self) -> bool {
        matches!(self, BinaryOp::Lt | BinaryOp::Lte | BinaryOp::Gt | BinaryOp::Gte)
    }

    pub fn is_equality(&self) -> bool {
        matches!(self, BinaryOp::Eq | BinaryOp::Ne)
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }

    pub fn is_shift(&self) -> bool {
        matches!(self, BinaryOp::ShiftLeft | BinaryOp::ShiftRight)
    }

    pub fn is_bitwise(&self) -> bool {
        matches!(self, BinaryOp::BitAnd | BinaryOp::BitOr)
    }

    /// Name used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            BinaryOp::Add => "Add",
            BinaryOp::Sub => "Subtract",
            BinaryOp::Mul => "Multiply",
            BinaryOp::Div => "Divide",
            BinaryOp::Mod => "Modulo",
            BinaryOp::ShiftLeft => "ShiftLeft",
            BinaryOp::ShiftRight => "ShiftRight",
            BinaryOp::BitAnd => "BitwiseAnd",
            BinaryOp::BitOr => "BitwiseOr",
            BinaryOp::Eq => "Equals",
            BinaryOp::Ne => "NotEquals",
            BinaryOp::Lt => "LessThan",
            BinaryOp::Lte => "LessThanOrEqual",
            BinaryOp::Gt => "GreaterThan",
            BinaryOp::Gte => "GreaterThanOrEqual",
            BinaryOp::And => "AndAlso",
            BinaryOp::Or => "OrElse",
        }
    }
}

impl Display for BinaryOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        let symbol = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::ShiftLeft => "<<",
            BinaryOp::ShiftRight => ">>",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Lte => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Gte => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        };
        write!(f, "{}", symbol)
    }
}

#[derive(PartialEq, Debug, Clone, Copy, Eq, Hash)]
pub enum TypeCheckMode {
    Is,
    As,
}

#[derive(PartialEq, Debug, Clone, Eq, Hash)]
pub struct TypeSegment {
    pub ident: Ident,
    pub args: Vec<TypeRef>,
}

/// A type as written in source: a dotted, optionally generic path with any
/// number of `[]` suffixes.
#[derive(PartialEq, Debug, Clone, Eq, Hash)]
pub enum TypeRef {
    Named(Vec<TypeSegment>),
    Array(Box<TypeRef>),
}

impl TypeRef {
    pub fn named(name: &str) -> Self {
        TypeRef::Named(
            name.split('.')
                .map(|segment| TypeSegment {
                    ident: Ident::new(segment),
                    args: Vec::new(),
                })
                .collect(),
        )
    }

    pub fn generic(name: &str, args: Vec<TypeRef>) -> Self {
        match TypeRef::named(name) {
            TypeRef::Named(mut segments) => {
                if let Some(last) = segments.last_mut() {
                    last.args = args;
                }
                TypeRef::Named(segments)
            }
            array => array,
        }
    }

    pub fn array(element: TypeRef) -> Self {
        TypeRef::Array(Box::new(element))
    }

    pub fn range(&self) -> Range {
        match self {
            TypeRef::Named(segments) => match (segments.first(), segments.last()) {
                (Some(first), Some(last)) => first.ident.range.merge(&last.ident.range),
                _ => Range::default(),
            },
            TypeRef::Array(element) => element.range(),
        }
    }
}

impl Display for TypeRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            TypeRef::Named(segments) => write!(
                f,
                "{}",
                segments
                    .iter()
                    .map(|segment| {
                        if segment.args.is_empty() {
                            segment.ident.name.to_string()
                        } else {
                            format!("{}<{}>", segment.ident.name, segment.args.iter().join(", "))
                        }
                    })
                    .join(".")
            ),
            TypeRef::Array(element) => write!(f, "{}[]", element),
        }
    }
}

#[derive(PartialEq, Debug, Clone)]
pub enum Expr {
    Literal(Literal),
    Ident(Ident, Vec<TypeRef>),
    Member(Shared<Node>, Ident, Vec<TypeRef>),
    Index(Shared<Node>, Shared<Node>),
    Call(Shared<Node>, Args),
    Unary(UnaryOp, Shared<Node>),
    Binary(BinaryOp, Shared<Node>, Shared<Node>),
    Ternary(Shared<Node>, Shared<Node>, Shared<Node>),
    New(TypeRef, Args),
    Cast(TypeRef, Shared<Node>),
    TypeCheck(Shared<Node>, TypeRef, TypeCheckMode),
    TypeOf(TypeRef),
    Paren(Shared<Node>),
}
