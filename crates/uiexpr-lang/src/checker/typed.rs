use rustc_hash::FxHashSet;

use crate::Shared;
use crate::ast::{BinaryOp, TypeCheckMode};
use crate::catalog::{ConvertFn, Getter, NativeFn, NumericKind, StaticValue, Type, TypeId};
use crate::range::Range;
use crate::value::Value;

/// A checked expression: every node carries its static type and whether it
/// depends on the context instance.
#[derive(Clone)]
pub struct TypedNode {
    pub expr: TypedExpr,
    pub ty: Type,
    pub constant: bool,
    pub range: Range,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intrinsic {
    StringLength,
    ArrayLength,
    ListCount,
    DictCount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Array,
    List,
    Dict,
}

/// Which operands of `&&`/`||` are reduced by truthiness instead of read as
/// booleans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalStrategy {
    BoolBool,
    ObjectBool,
    BoolObject,
    ObjectObject,
}

impl LogicalStrategy {
    pub fn of(left_is_bool: bool, right_is_bool: bool) -> Self {
        match (left_is_bool, right_is_bool) {
            (true, true) => LogicalStrategy::BoolBool,
            (false, true) => LogicalStrategy::ObjectBool,
            (true, false) => LogicalStrategy::BoolObject,
            (false, false) => LogicalStrategy::ObjectObject,
        }
    }
}

#[derive(Clone)]
pub enum UnaryImpl {
    Not,
    /// `!s` on a string: null or empty.
    StringNot,
    /// `!o` on any other reference: null.
    ObjectNot,
    Negate(NumericKind),
    BitwiseNot,
    User(NativeFn),
}

#[derive(Clone)]
pub enum BinaryImpl {
    /// Arithmetic, shift, and bitwise operators on promoted numbers.
    Numeric(BinaryOp, NumericKind),
    /// Relational and equality comparison of promoted numbers.
    Compare(BinaryOp, NumericKind),
    Concat,
    ValueEquality { negate: bool },
    RefEquality { negate: bool },
    /// Non short-circuiting `&` and `|` on booleans.
    BoolBitwise(BinaryOp),
    User(NativeFn),
}

/// Runtime test behind `is`, `as`, and checked downcasts.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeTest {
    Bool,
    Int,
    Float,
    Double,
    String,
    Array,
    List,
    Dict,
    Type,
    Enum(TypeId),
    Records(Shared<FxHashSet<TypeId>>),
    /// Matches every non-null value.
    Any,
}

impl TypeTest {
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => false,
            (TypeTest::Bool, Value::Bool(_))
            | (TypeTest::Int, Value::Int(_))
            | (TypeTest::Float, Value::Float(_))
            | (TypeTest::Double, Value::Double(_))
            | (TypeTest::String, Value::String(_))
            | (TypeTest::Array, Value::Array(_))
            | (TypeTest::List, Value::List(_))
            | (TypeTest::Dict, Value::Dict(_))
            | (TypeTest::Type, Value::Type(_))
            | (TypeTest::Any, _) => true,
            (TypeTest::Enum(id), Value::Enum(value_id, _)) => id == value_id,
            (TypeTest::Records(ids), Value::Record(record)) => ids.contains(&record.type_id),
            _ => false,
        }
    }
}

#[derive(Clone)]
pub enum Conversion {
    Identity,
    Numeric(NumericKind),
    User(ConvertFn),
    EnumToInt,
    IntToEnum(TypeId),
    /// Keeps the value when it passes the test, otherwise yields the default.
    Checked(TypeTest),
    Chain(Box<Conversion>, Box<Conversion>),
}

impl Conversion {
    pub fn then(self, next: Conversion) -> Conversion {
        match (self, next) {
            (Conversion::Identity, next) => next,
            (first, Conversion::Identity) => first,
            (first, next) => Conversion::Chain(Box::new(first), Box::new(next)),
        }
    }

    pub fn is_identity(&self) -> bool {
        matches!(self, Conversion::Identity)
    }
}

#[derive(Clone)]
pub enum TypedExpr {
    Literal(Value),
    Context,
    Field {
        target: Box<TypedNode>,
        slot: usize,
    },
    Property {
        target: Box<TypedNode>,
        getter: Getter,
    },
    Intrinsic {
        target: Box<TypedNode>,
        intrinsic: Intrinsic,
    },
    Static(StaticValue),
    Index {
        target: Box<TypedNode>,
        index: Box<TypedNode>,
        container: ContainerKind,
    },
    Unary {
        op: UnaryImpl,
        operand: Box<TypedNode>,
    },
    Binary {
        op: BinaryImpl,
        left: Box<TypedNode>,
        right: Box<TypedNode>,
    },
    Logical {
        op: BinaryOp,
        strategy: LogicalStrategy,
        left: Box<TypedNode>,
        right: Box<TypedNode>,
    },
    Ternary {
        condition: Box<TypedNode>,
        when_true: Box<TypedNode>,
        when_false: Box<TypedNode>,
    },
    /// Constructor, alias method, or any other host call.
    Call {
        func: NativeFn,
        args: Vec<TypedNode>,
    },
    Convert {
        conversion: Conversion,
        operand: Box<TypedNode>,
    },
    TypeCheck {
        operand: Box<TypedNode>,
        test: TypeTest,
        mode: TypeCheckMode,
    },
}

impl TypedNode {
    pub fn literal(value: Value, ty: Type, range: Range) -> Self {
        Self {
            expr: TypedExpr::Literal(value),
            ty,
            constant: true,
            range,
        }
    }

    /// Wraps `self` in a conversion to `to`, keeping its constancy.
    pub fn convert(self, conversion: Conversion, to: Type) -> Self {
        if conversion.is_identity() {
            return Self { ty: to, ..self };
        }

        let range = self.range;
        let constant = self.constant;
        Self {
            expr: TypedExpr::Convert {
                conversion,
                operand: Box::new(self),
            },
            ty: to,
            constant,
            range,
        }
    }

    pub fn logical_strategy(&self) -> Option<LogicalStrategy> {
        match &self.expr {
            TypedExpr::Logical { strategy, .. } => Some(*strategy),
            _ => None,
        }
    }
}
