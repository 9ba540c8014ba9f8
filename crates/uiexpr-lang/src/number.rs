use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Rem, Sub};

use crate::catalog::NumericKind;
use crate::value::Value;

/// A numeric operand after promotion. Integer arithmetic wraps and integer
/// division by zero yields zero, so evaluation never panics.
#[derive(Debug, Clone, PartialEq, Copy)]
pub enum Number {
    Int(i32),
    Float(f32),
    Double(f64),
}

impl Number {
    pub fn from_value(value: &Value) -> Option<Number> {
        match value {
            Value::Int(n) => Some(Number::Int(*n)),
            Value::Float(n) => Some(Number::Float(*n)),
            Value::Double(n) => Some(Number::Double(*n)),
            Value::Enum(_, n) => Some(Number::Int(*n as i32)),
            _ => None,
        }
    }

    pub fn kind(&self) -> NumericKind {
        match self {
            Number::Int(_) => NumericKind::Int,
            Number::Float(_) => NumericKind::Float,
            Number::Double(_) => NumericKind::Double,
        }
    }

    pub fn zero(kind: NumericKind) -> Number {
        match kind {
            NumericKind::Int => Number::Int(0),
            NumericKind::Float => Number::Float(0.0),
            NumericKind::Double => Number::Double(0.0),
        }
    }

    /// Converts to `kind`, truncating toward zero when narrowing to int.
    pub fn cast(self, kind: NumericKind) -> Number {
        match kind {
            NumericKind::Int => Number::Int(self.to_i32()),
            NumericKind::Float => Number::Float(self.to_f32()),
            NumericKind::Double => Number::Double(self.to_f64()),
        }
    }

    pub fn to_i32(self) -> i32 {
        match self {
            Number::Int(n) => n,
            Number::Float(n) => n as i32,
            Number::Double(n) => n as i32,
        }
    }

    pub fn to_f32(self) -> f32 {
        match self {
            Number::Int(n) => n as f32,
            Number::Float(n) => n,
            Number::Double(n) => n as f32,
        }
    }

    pub fn to_f64(self) -> f64 {
        match self {
            Number::Int(n) => n as f64,
            Number::Float(n) => n as f64,
            Number::Double(n) => n,
        }
    }

    /// Whether the value survives a round trip through `i32` unchanged.
    pub fn is_integral(&self) -> bool {
        match self {
            Number::Int(_) => true,
            Number::Float(n) => n.fract() == 0.0 && *n >= i32::MIN as f32 && *n <= i32::MAX as f32,
            Number::Double(n) => n.fract() == 0.0 && *n >= i32::MIN as f64 && *n <= i32::MAX as f64,
        }
    }

    pub fn shift_left(self, rhs: Number) -> Number {
        Number::Int(self.to_i32().wrapping_shl(rhs.to_i32() as u32))
    }

    pub fn shift_right(self, rhs: Number) -> Number {
        Number::Int(self.to_i32().wrapping_shr(rhs.to_i32() as u32))
    }

    pub fn bit_and(self, rhs: Number) -> Number {
        Number::Int(self.to_i32() & rhs.to_i32())
    }

    pub fn bit_or(self, rhs: Number) -> Number {
        Number::Int(self.to_i32() | rhs.to_i32())
    }

    pub fn bit_not(self) -> Number {
        Number::Int(!self.to_i32())
    }

    fn promoted(self, rhs: Number) -> (Number, Number) {
        let kind = self.kind().promote(rhs.kind());
        (self.cast(kind), rhs.cast(kind))
    }
}

impl Default for Number {
    fn default() -> Self {
        Number::Int(0)
    }
}

impl From<Number> for Value {
    fn from(number: Number) -> Self {
        match number {
            Number::Int(n) => Value::Int(n),
            Number::Float(n) => Value::Float(n),
            Number::Double(n) => Value::Double(n),
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(n) => write!(f, "{}", n),
            Number::Float(n) => write!(f, "{}", n),
            Number::Double(n) => write!(f, "{}", n),
        }
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match self.promoted(*other) {
            (Number::Int(a), Number::Int(b)) => a.partial_cmp(&b),
            (Number::Float(a), Number::Float(b)) => a.partial_cmp(&b),
            (a, b) => a.to_f64().partial_cmp(&b.to_f64()),
        }
    }
}

impl Neg for Number {
    type Output = Self;

    fn neg(self) -> Self::Output {
        match self {
            Number::Int(n) => Number::Int(n.wrapping_neg()),
            Number::Float(n) => Number::Float(-n),
            Number::Double(n) => Number::Double(-n),
        }
    }
}

macro_rules! impl_binary_op {
    ($trait:ident, $method:ident, $int_op:expr, $op:tt) => {
        impl $trait for Number {
            type Output = Self;

            fn $method(self, rhs: Self) -> Self::Output {
                match self.promoted(rhs) {
                    (Number::Int(a), Number::Int(b)) => Number::Int($int_op(a, b)),
                    (Number::Float(a), Number::Float(b)) => Number::Float(a $op b),
                    (a, b) => Number::Double(a.to_f64() $op b.to_f64()),
                }
            }
        }
    };
}

impl_binary_op!(Add, add, i32::wrapping_add, +);
impl_binary_op!(Sub, sub, i32::wrapping_sub, -);
impl_binary_op!(Mul, mul, i32::wrapping_mul, *);
impl_binary_op!(Div, div, |a: i32, b: i32| a.checked_div(b).unwrap_or(0), /);
impl_binary_op!(Rem, rem, |a: i32, b: i32| a.checked_rem(b).unwrap_or(0), %);
