//! Closure compiler for checked expressions.
//!
//! This module lowers a [`TypedNode`](crate::checker::typed::TypedNode) tree
//! into a single boxed closure. Compilation happens once per expression; the
//! resulting closure is evaluated on every binding update.
//!
//! ## Overview
//!
//! Each node kind maps to a closure that captures the closures of its
//! children:
//!
//! - member reads on reference-typed targets are null guarded and fall back
//!   to the default value of the member's type
//! - index reads are bounds checked and fall back the same way
//! - `&&` and `||` short-circuit and pick one of four shapes depending on
//!   which operands are reduced by truthiness
//! - subtrees flagged constant are evaluated once at compile time when
//!   constant folding is enabled
//!
//! ## Example
//!
//! ```rust,ignore
//! let compiler = Compiler::new(&catalog, true);
//! let compiled = compiler.compile(&typed);
//! let value = compiled(&context);
//! ```

mod compile;
mod compiled;
mod constant_fold;

pub use compile::Compiler;
pub use compiled::{CompiledExpr, CompiledExpression, Expression};

use crate::catalog::TypeCatalog;
use crate::checker::typed::TypedNode;
use crate::value::Value;

/// Evaluates a constant node without a context instance.
pub(crate) fn evaluate_constant(catalog: &TypeCatalog, node: &TypedNode) -> Value {
    Compiler::new(catalog, false).compile(node)(&Value::Null)
}
