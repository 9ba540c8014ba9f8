use std::fmt::{self, Display, Formatter};

use itertools::Itertools;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use crate::Shared;
use crate::catalog::{Type, TypeId};

/// Runtime value produced and consumed by compiled expressions.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i32),
    Float(f32),
    Double(f64),
    String(SmolStr),
    Array(Shared<Vec<Value>>),
    List(Shared<Vec<Value>>),
    Dict(Shared<FxHashMap<DictKey, Value>>),
    Record(Shared<Record>),
    Enum(TypeId, i64),
    Type(Type),
}

/// Instance of a catalog class or struct. Fields are stored by slot, in the
/// order the catalog assigned them.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub type_id: TypeId,
    pub fields: Vec<Value>,
}

impl Record {
    pub fn field(&self, slot: usize) -> Option<&Value> {
        self.fields.get(slot)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DictKey {
    Bool(bool),
    Int(i32),
    String(SmolStr),
    Enum(TypeId, i64),
}

impl DictKey {
    pub fn from_value(value: &Value) -> Option<DictKey> {
        match value {
            Value::Bool(b) => Some(DictKey::Bool(*b)),
            Value::Int(n) => Some(DictKey::Int(*n)),
            Value::String(s) => Some(DictKey::String(s.clone())),
            Value::Enum(id, n) => Some(DictKey::Enum(*id, *n)),
            _ => None,
        }
    }
}

impl From<&str> for DictKey {
    fn from(s: &str) -> Self {
        DictKey::String(SmolStr::new(s))
    }
}

impl From<i32> for DictKey {
    fn from(n: i32) -> Self {
        DictKey::Int(n)
    }
}

impl Display for DictKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            DictKey::Bool(b) => write!(f, "{}", b),
            DictKey::Int(n) => write!(f, "{}", n),
            DictKey::String(s) => write!(f, "{}", s),
            DictKey::Enum(_, n) => write!(f, "{}", n),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n)
    }
}

impl From<f32> for Value {
    fn from(n: f32) -> Self {
        Value::Float(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Double(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(SmolStr::new(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(SmolStr::from(s))
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Record(Shared::new(record))
    }
}

impl Value {
    pub fn array(values: Vec<Value>) -> Value {
        Value::Array(Shared::new(values))
    }

    pub fn list(values: Vec<Value>) -> Value {
        Value::List(Shared::new(values))
    }

    pub fn dict(entries: impl IntoIterator<Item = (DictKey, Value)>) -> Value {
        Value::Dict(Shared::new(entries.into_iter().collect()))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Truthiness of a non-boolean operand: anything but null or a zero value.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(n) => *n != 0.0,
            Value::Double(n) => *n != 0.0,
            Value::Enum(_, n) => *n != 0,
            _ => true,
        }
    }

    /// Identity comparison for reference values; primitives compare by value.
    pub fn ref_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Record(a), Value::Record(b)) => Shared::ptr_eq(a, b),
            (Value::Array(a), Value::Array(b)) | (Value::List(a), Value::List(b)) => {
                Shared::ptr_eq(a, b)
            }
            (Value::Dict(a), Value::Dict(b)) => Shared::ptr_eq(a, b),
            (a, b) => a == b,
        }
    }

    pub fn as_bool(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            _ => false,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Enum(_, n) => Some(*n as i32),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Value::String(s) => s.chars().count(),
            Value::Array(values) | Value::List(values) => values.len(),
            Value::Dict(entries) => entries.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            Value::Null => write!(f, ""),
            Value::Bool(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", n),
            Value::Double(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::Array(values) | Value::List(values) => {
                write!(f, "[{}]", values.iter().join(", "))
            }
            Value::Dict(entries) => write!(
                f,
                "{{{}}}",
                entries
                    .iter()
                    .sorted_by_key(|(key, _)| key.to_string())
                    .map(|(key, value)| format!("{}: {}", key, value))
                    .join(", ")
            ),
            Value::Record(record) => write!(f, "({})", record.fields.iter().join(", ")),
            Value::Enum(_, n) => write!(f, "{}", n),
            Value::Type(ty) => write!(f, "{:?}", ty),
        }
    }
}

/// Conversion out of an evaluated `Value` for typed expressions.
pub trait FromValue: Sized {
    /// The static type an expression must yield to produce `Self`.
    fn static_type() -> Type;
    fn from_value(value: Value) -> Self;
}

impl FromValue for bool {
    fn static_type() -> Type {
        Type::Bool
    }

    fn from_value(value: Value) -> Self {
        value.as_bool()
    }
}

impl FromValue for i32 {
    fn static_type() -> Type {
        Type::Int
    }

    fn from_value(value: Value) -> Self {
        value.as_i32().unwrap_or_default()
    }
}

impl FromValue for f32 {
    fn static_type() -> Type {
        Type::Float
    }

    fn from_value(value: Value) -> Self {
        match value {
            Value::Float(n) => n,
            Value::Int(n) => n as f32,
            Value::Double(n) => n as f32,
            _ => 0.0,
        }
    }
}

impl FromValue for f64 {
    fn static_type() -> Type {
        Type::Double
    }

    fn from_value(value: Value) -> Self {
        match value {
            Value::Double(n) => n,
            Value::Float(n) => n as f64,
            Value::Int(n) => n as f64,
            _ => 0.0,
        }
    }
}

impl FromValue for SmolStr {
    fn static_type() -> Type {
        Type::String
    }

    fn from_value(value: Value) -> Self {
        match value {
            Value::String(s) => s,
            _ => SmolStr::default(),
        }
    }
}

impl FromValue for String {
    fn static_type() -> Type {
        Type::String
    }

    fn from_value(value: Value) -> Self {
        SmolStr::from_value(value).to_string()
    }
}

impl FromValue for Type {
    fn static_type() -> Type {
        Type::Type
    }

    fn from_value(value: Value) -> Self {
        match value {
            Value::Type(ty) => ty,
            _ => Type::Object,
        }
    }
}
