//! Compile-time constant folding optimization.
//!
//! This module provides constant folding capabilities for the compiler,
//! allowing constant subtrees to be evaluated once at compile time rather
//! than on every evaluation.

use tracing::trace;

use super::compiled::CompiledExpr;
use crate::value::Value;

/// Constant folder for compile-time optimization.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstantFolder {
    enabled: bool,
}

impl ConstantFolder {
    /// Creates a new constant folder.
    ///
    /// # Arguments
    ///
    /// * `enabled` - Whether constant subtrees are evaluated at compile time
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Folds a literal value into an evaluator returning it.
    ///
    /// # Arguments
    ///
    /// * `value` - The literal value
    ///
    /// # Returns
    ///
    /// A compiled expression yielding a clone of `value`.
    pub fn fold_literal(&self, value: &Value) -> CompiledExpr {
        let value = value.clone();
        Box::new(move |_| value.clone())
    }

    /// Evaluates a context-independent expression once.
    ///
    /// # Arguments
    ///
    /// * `compiled` - The compiled form of a constant subtree
    ///
    /// # Returns
    ///
    /// A compiled expression yielding the cached result.
    pub fn fold(&self, compiled: CompiledExpr) -> CompiledExpr {
        let value = compiled(&Value::Null);
        trace!(%value, "Folded constant expression");
        self.fold_literal(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_fold_evaluates_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let compiled: CompiledExpr = Box::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Value::Int(7)
        });

        let folded = ConstantFolder::new(true).fold(compiled);

        assert_eq!(folded(&Value::Null), Value::Int(7));
        assert_eq!(folded(&Value::Bool(true)), Value::Int(7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
