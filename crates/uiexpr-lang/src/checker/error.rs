use itertools::Itertools;
use thiserror::Error;

use crate::ast::{BinaryOp, UnaryOp};
use crate::range::Range;

#[derive(Error, Debug, PartialEq, Clone)]
pub enum CompileError {
    #[error("Type `{name}` was not found")]
    TypeNotFound { name: String, range: Range },
    #[error("Type name `{name}` is ambiguous between {}", .candidates.iter().map(|c| format!("`{c}`")).join(", "))]
    AmbiguousType {
        name: String,
        candidates: Vec<String>,
        range: Range,
    },
    #[error("Member `{member}` was not found on type `{type_name}`")]
    MemberNotFound {
        type_name: String,
        member: String,
        range: Range,
    },
    #[error("Identifier `{name}` was not found")]
    IdentifierNotFound { name: String, range: Range },
    #[error("Type `{name}` cannot be used as a value")]
    TypeUsedAsValue { name: String, range: Range },
    #[error("Missing operator {} (`{op}`) between `{left}` and `{right}`", .op.name())]
    MissingOperator {
        op: BinaryOp,
        left: String,
        right: String,
        range: Range,
    },
    #[error("Missing unary operator `{op}` for `{operand}`")]
    MissingUnaryOperator {
        op: UnaryOp,
        operand: String,
        range: Range,
    },
    #[error("Call to `{name}` is ambiguous between {count} candidates")]
    AmbiguousOverload {
        name: String,
        count: usize,
        range: Range,
    },
    #[error("No constructor of `{type_name}` accepts ({})", .arguments.join(", "))]
    UnresolvedConstructor {
        type_name: String,
        arguments: Vec<String>,
        range: Range,
    },
    #[error("No overload of `{name}` accepts ({})", .arguments.join(", "))]
    UnresolvedMethod {
        name: String,
        arguments: Vec<String>,
        range: Range,
    },
    #[error("`{name}` is not callable")]
    NotCallable { name: String, range: Range },
    #[error("Type `{type_name}` cannot be indexed")]
    NotIndexable { type_name: String, range: Range },
    #[error("Index must be `{expected}` but was `{actual}`")]
    InvalidTargetType {
        expected: String,
        actual: String,
        range: Range,
    },
    #[error("Cannot implicitly convert `{from}` to `{to}`")]
    InvalidConversion {
        from: String,
        to: String,
        range: Range,
    },
    #[error("Cannot cast `{from}` to `{to}`")]
    InvalidCast {
        from: String,
        to: String,
        range: Range,
    },
    #[error("Expression is not constant")]
    NotConstant { range: Range },
}

impl CompileError {
    pub fn range(&self) -> Range {
        match self {
            CompileError::TypeNotFound { range, .. }
            | CompileError::AmbiguousType { range, .. }
            | CompileError::MemberNotFound { range, .. }
            | CompileError::IdentifierNotFound { range, .. }
            | CompileError::TypeUsedAsValue { range, .. }
            | CompileError::MissingOperator { range, .. }
            | CompileError::MissingUnaryOperator { range, .. }
            | CompileError::AmbiguousOverload { range, .. }
            | CompileError::UnresolvedConstructor { range, .. }
            | CompileError::UnresolvedMethod { range, .. }
            | CompileError::NotCallable { range, .. }
            | CompileError::NotIndexable { range, .. }
            | CompileError::InvalidTargetType { range, .. }
            | CompileError::InvalidConversion { range, .. }
            | CompileError::InvalidCast { range, .. }
            | CompileError::NotConstant { range } => *range,
        }
    }

    /// Variant name used as the diagnostic code.
    pub fn name(&self) -> &'static str {
        match self {
            CompileError::TypeNotFound { .. } => "TypeNotFound",
            CompileError::AmbiguousType { .. } => "AmbiguousType",
            CompileError::MemberNotFound { .. } => "MemberNotFound",
            CompileError::IdentifierNotFound { .. } => "IdentifierNotFound",
            CompileError::TypeUsedAsValue { .. } => "TypeUsedAsValue",
            CompileError::MissingOperator { .. } => "MissingOperator",
            CompileError::MissingUnaryOperator { .. } => "MissingUnaryOperator",
            CompileError::AmbiguousOverload { .. } => "AmbiguousOverload",
            CompileError::UnresolvedConstructor { .. } => "UnresolvedConstructor",
            CompileError::UnresolvedMethod { .. } => "UnresolvedMethod",
            CompileError::NotCallable { .. } => "NotCallable",
            CompileError::NotIndexable { .. } => "NotIndexable",
            CompileError::InvalidTargetType { .. } => "InvalidTargetType",
            CompileError::InvalidConversion { .. } => "InvalidConversion",
            CompileError::InvalidCast { .. } => "InvalidCast",
            CompileError::NotConstant { .. } => "NotConstant",
        }
    }
}
