//! Compiled expression types.
//!
//! This module defines `CompiledExpr`, the closure every typed node lowers to,
//! and `CompiledExpression`, the shareable artifact handed to binding sites.

use std::fmt;
use std::marker::PhantomData;

use smol_str::SmolStr;

use crate::Shared;
use crate::catalog::Type;
use crate::value::{FromValue, Value};

/// A compiled expression represented as a dynamically-dispatched closure.
///
/// The closure takes the context instance and returns the value of the
/// expression. It never fails: missing links, out-of-range indices, and
/// missing dictionary keys yield the default value of the node's type.
///
/// ## Example
///
/// ```rust,ignore
/// let compiled: CompiledExpr = Box::new(|_ctx| Value::Int(42));
/// assert_eq!(compiled(&Value::Null), Value::Int(42));
/// ```
pub type CompiledExpr = Box<dyn Fn(&Value) -> Value + Send + Sync>;

/// The result of compiling one expression against one context type.
///
/// Cloning is cheap and the evaluator holds no mutable state, so a single
/// compiled expression may be shared by many binding sites and evaluated
/// from several threads at once.
#[derive(Clone)]
pub struct CompiledExpression {
    evaluator: Shared<dyn Fn(&Value) -> Value + Send + Sync>,
    yielded_type: Type,
    constant: bool,
    source: SmolStr,
}

impl fmt::Debug for CompiledExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledExpression")
            .field("source", &self.source)
            .field("yielded_type", &self.yielded_type)
            .field("constant", &self.constant)
            .finish()
    }
}

impl CompiledExpression {
    pub(crate) fn new(evaluator: CompiledExpr, yielded_type: Type, constant: bool, source: &str) -> Self {
        Self {
            evaluator: Shared::from(evaluator),
            yielded_type,
            constant,
            source: SmolStr::new(source),
        }
    }

    /// Evaluates the expression against `context`.
    pub fn evaluate(&self, context: &Value) -> Value {
        (self.evaluator)(context)
    }

    /// Whether the result is independent of the context instance.
    pub fn is_constant(&self) -> bool {
        self.constant
    }

    pub fn yielded_type(&self) -> &Type {
        &self.yielded_type
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

/// A compiled expression whose result is read as `T`.
pub struct Expression<T> {
    inner: CompiledExpression,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Expression<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Expression<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner.fmt(f)
    }
}

impl<T: FromValue> Expression<T> {
    pub(crate) fn new(inner: CompiledExpression) -> Self {
        Self {
            inner,
            _marker: PhantomData,
        }
    }

    pub fn evaluate(&self, context: &Value) -> T {
        T::from_value(self.inner.evaluate(context))
    }

    pub fn is_constant(&self) -> bool {
        self.inner.is_constant()
    }

    pub fn as_compiled(&self) -> &CompiledExpression {
        &self.inner
    }
}
