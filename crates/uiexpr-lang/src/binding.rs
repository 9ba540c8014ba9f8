use crate::compiler::CompiledExpression;
use crate::value::Value;

/// Change detection for one binding site.
///
/// Each `update` evaluates the expression and reports the new value only
/// when it differs from the previous one. Constant expressions are evaluated
/// once.
#[derive(Debug, Clone)]
pub struct Binding {
    expression: CompiledExpression,
    last: Option<Value>,
}

impl Binding {
    pub fn new(expression: CompiledExpression) -> Self {
        Self {
            expression,
            last: None,
        }
    }

    /// Re-evaluates the binding against `context`.
    ///
    /// Returns the new value when it changed since the previous update, and
    /// `None` otherwise. The first update always reports a value.
    pub fn update(&mut self, context: &Value) -> Option<&Value> {
        if self.expression.is_constant() && self.last.is_some() {
            return None;
        }

        let value = self.expression.evaluate(context);

        if self.last.as_ref() == Some(&value) {
            return None;
        }

        self.last = Some(value);
        self.last.as_ref()
    }

    /// The value reported by the most recent change.
    pub fn last(&self) -> Option<&Value> {
        self.last.as_ref()
    }

    pub fn expression(&self) -> &CompiledExpression {
        &self.expression
    }

    /// Forgets the cached value so the next update reports again.
    pub fn reset(&mut self) {
        self.last = None;
    }
}
