//! Declarative description of the host object model.
//!
//! A `TypeCatalog` is built once through `CatalogBuilder`, frozen, and then
//! shared by every compilation. It answers the questions the resolver and the
//! overload checker ask: which members a type has, where a field lives inside
//! a `Record`, which operators, conversions, and constructors apply.

pub mod builder;
pub mod types;

use std::fmt;

use itertools::Itertools;
use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;
use thiserror::Error;

use crate::Shared;
use crate::ast::{BinaryOp, UnaryOp};
use crate::value::{Record, Value};

pub use builder::{CatalogBuilder, RecordBuilder};
pub use types::{NumericKind, Type, TypeId, TypeKind};

/// Host function backing operators, constructors, and alias call forms.
pub type NativeFn = Shared<dyn Fn(&[Value]) -> Value + Send + Sync>;
/// Host accessor for a computed instance property.
pub type Getter = Shared<dyn Fn(&Value) -> Value + Send + Sync>;
/// Host conversion between two types.
pub type ConvertFn = Shared<dyn Fn(&Value) -> Value + Send + Sync>;

#[derive(Error, Debug, PartialEq)]
pub enum CatalogError {
    #[error("Type `{0}` is declared more than once")]
    DuplicateType(SmolStr),
    #[error("Type `{0}` inherits from itself")]
    CyclicInheritance(SmolStr),
    #[error("Member `{1}` is declared more than once on `{0}`")]
    DuplicateMember(SmolStr, SmolStr),
    #[error("Struct `{0}` contains itself by value")]
    RecursiveStruct(SmolStr),
}

#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: SmolStr,
    pub ty: Type,
    pub slot: usize,
}

#[derive(Clone)]
pub struct PropertyDef {
    pub name: SmolStr,
    pub ty: Type,
    pub getter: Getter,
}

#[derive(Clone)]
pub enum StaticValue {
    Const(Value),
    Computed(Shared<dyn Fn() -> Value + Send + Sync>),
}

impl StaticValue {
    pub fn get(&self) -> Value {
        match self {
            StaticValue::Const(value) => value.clone(),
            StaticValue::Computed(f) => f(),
        }
    }
}

#[derive(Clone)]
pub struct StaticDef {
    pub name: SmolStr,
    pub ty: Type,
    pub value: StaticValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorKind {
    Binary(BinaryOp),
    Unary(UnaryOp),
}

#[derive(Clone)]
pub struct OperatorDef {
    pub op: OperatorKind,
    pub params: Vec<Type>,
    pub ret: Type,
    pub func: NativeFn,
}

#[derive(Clone)]
pub struct ConversionDef {
    pub from: Type,
    pub to: Type,
    pub implicit: bool,
    pub func: ConvertFn,
}

#[derive(Debug, Clone)]
pub struct ParamDef {
    pub name: SmolStr,
    pub ty: Type,
    pub default: Option<Value>,
}

impl ParamDef {
    pub fn new(name: &str, ty: Type) -> Self {
        Self {
            name: SmolStr::new(name),
            ty,
            default: None,
        }
    }

    pub fn optional(name: &str, ty: Type, default: Value) -> Self {
        Self {
            name: SmolStr::new(name),
            ty,
            default: Some(default),
        }
    }
}

#[derive(Clone)]
pub struct ConstructorDef {
    pub params: Vec<ParamDef>,
    pub func: NativeFn,
}

impl ConstructorDef {
    /// Number of parameters without a default value.
    pub fn required_arity(&self) -> usize {
        self.params
            .iter()
            .take_while(|param| param.default.is_none())
            .count()
    }
}

#[derive(Clone)]
pub struct TypeDef {
    pub id: TypeId,
    pub name: SmolStr,
    pub namespace: SmolStr,
    pub parent: Option<TypeId>,
    pub generic_arity: usize,
    pub kind: TypeKind,
    pub base: Option<TypeId>,
    /// Full field layout, inherited fields first.
    pub fields: Vec<FieldDef>,
    pub properties: Vec<PropertyDef>,
    pub statics: Vec<StaticDef>,
    pub variants: Vec<(SmolStr, i64)>,
    pub nested: Vec<TypeId>,
    pub operators: Vec<OperatorDef>,
    pub conversions: Vec<ConversionDef>,
    pub constructors: Vec<ConstructorDef>,
}

impl TypeDef {
    pub fn variant(&self, name: &str) -> Option<i64> {
        self.variants
            .iter()
            .find(|(variant, _)| variant == name)
            .map(|(_, value)| *value)
    }
}

/// Immutable registry of every type an expression may reference.
#[derive(Clone, Default)]
pub struct TypeCatalog {
    types: Vec<TypeDef>,
    by_name: FxHashMap<(SmolStr, usize), TypeId>,
    namespaces: FxHashSet<SmolStr>,
}

impl fmt::Debug for TypeCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeCatalog")
            .field(
                "types",
                &self.types.iter().map(|def| self.full_name(def.id)).collect_vec(),
            )
            .finish()
    }
}

impl TypeCatalog {
    pub(crate) fn new(types: Vec<TypeDef>) -> Result<Self, CatalogError> {
        let mut catalog = TypeCatalog {
            types,
            by_name: FxHashMap::default(),
            namespaces: FxHashSet::default(),
        };

        for def in &catalog.types {
            let full_name = catalog.full_name(def.id);
            if catalog
                .by_name
                .insert((full_name.clone(), def.generic_arity), def.id)
                .is_some()
            {
                return Err(CatalogError::DuplicateType(full_name));
            }

            let mut prefix = String::new();
            for segment in def.namespace.split('.').filter(|s| !s.is_empty()) {
                if !prefix.is_empty() {
                    prefix.push('.');
                }
                prefix.push_str(segment);
                catalog.namespaces.insert(SmolStr::new(&prefix));
            }
        }

        Ok(catalog)
    }

    pub fn get(&self, id: TypeId) -> &TypeDef {
        &self.types[id.index()]
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn types(&self) -> impl Iterator<Item = &TypeDef> {
        self.types.iter()
    }

    /// Looks up a type by fully-qualified dotted name and generic arity.
    pub fn find(&self, full_name: &str, arity: usize) -> Option<TypeId> {
        self.by_name.get(&(SmolStr::new(full_name), arity)).copied()
    }

    pub fn is_namespace(&self, name: &str) -> bool {
        self.namespaces.contains(name)
    }

    pub fn full_name(&self, id: TypeId) -> SmolStr {
        let def = self.get(id);
        match def.parent {
            Some(parent) => SmolStr::new(format!("{}.{}", self.full_name(parent), def.name)),
            None if def.namespace.is_empty() => def.name.clone(),
            None => SmolStr::new(format!("{}.{}", def.namespace, def.name)),
        }
    }

    /// Human readable name used in diagnostics.
    pub fn type_name(&self, ty: &Type) -> String {
        match ty {
            Type::Bool => "bool".to_string(),
            Type::Int => "int".to_string(),
            Type::Float => "float".to_string(),
            Type::Double => "double".to_string(),
            Type::String => "string".to_string(),
            Type::Object => "object".to_string(),
            Type::Null => "null".to_string(),
            Type::Type => "Type".to_string(),
            Type::Array(element) => format!("{}[]", self.type_name(element)),
            Type::List(element) => format!("List<{}>", self.type_name(element)),
            Type::Dict(key, value) => format!(
                "Dictionary<{}, {}>",
                self.type_name(key),
                self.type_name(value)
            ),
            Type::Named(id, args) if args.is_empty() => self.get(*id).name.to_string(),
            Type::Named(id, args) => format!(
                "{}<{}>",
                self.get(*id).name,
                args.iter().map(|arg| self.type_name(arg)).join(", ")
            ),
            Type::Param(n) => format!("T{}", n),
        }
    }

    pub fn kind(&self, ty: &Type) -> Option<TypeKind> {
        ty.type_id().map(|id| self.get(id).kind)
    }

    /// Whether values of `ty` can be null and therefore need null guards.
    pub fn is_reference(&self, ty: &Type) -> bool {
        match ty {
            Type::String
            | Type::Object
            | Type::Null
            | Type::Type
            | Type::Array(_)
            | Type::List(_)
            | Type::Dict(_, _)
            | Type::Param(_) => true,
            Type::Named(id, _) => matches!(self.get(*id).kind, TypeKind::Class | TypeKind::Static),
            Type::Bool | Type::Int | Type::Float | Type::Double => false,
        }
    }

    pub fn is_enum(&self, ty: &Type) -> bool {
        matches!(self.kind(ty), Some(TypeKind::Enum))
    }

    pub fn is_struct(&self, ty: &Type) -> bool {
        matches!(self.kind(ty), Some(TypeKind::Struct))
    }

    pub fn is_class(&self, ty: &Type) -> bool {
        matches!(self.kind(ty), Some(TypeKind::Class))
    }

    /// Walks `id` and its base chain.
    pub fn ancestry(&self, id: TypeId) -> impl Iterator<Item = &TypeDef> {
        std::iter::successors(Some(self.get(id)), move |def| def.base.map(|base| self.get(base)))
    }

    pub fn is_subtype(&self, id: TypeId, ancestor: TypeId) -> bool {
        self.ancestry(id).any(|def| def.id == ancestor)
    }

    /// `ancestor` and every type deriving from it.
    pub fn subtypes_of(&self, ancestor: TypeId) -> FxHashSet<TypeId> {
        self.types
            .iter()
            .filter(|def| self.is_subtype(def.id, ancestor))
            .map(|def| def.id)
            .collect()
    }

    pub fn field(&self, id: TypeId, name: &str) -> Option<&FieldDef> {
        self.get(id).fields.iter().find(|field| field.name == name)
    }

    pub fn property(&self, id: TypeId, name: &str) -> Option<&PropertyDef> {
        self.ancestry(id)
            .find_map(|def| def.properties.iter().find(|property| property.name == name))
    }

    pub fn static_member(&self, id: TypeId, name: &str) -> Option<&StaticDef> {
        self.ancestry(id)
            .find_map(|def| def.statics.iter().find(|member| member.name == name))
    }

    pub fn nested_type(&self, id: TypeId, name: &str, arity: usize) -> Option<TypeId> {
        self.ancestry(id).find_map(|def| {
            def.nested.iter().copied().find(|nested| {
                let nested = self.get(*nested);
                nested.name == name && nested.generic_arity == arity
            })
        })
    }

    pub fn has_nested_type(&self, id: TypeId, name: &str) -> bool {
        self.ancestry(id).any(|def| {
            def.nested
                .iter()
                .any(|nested| self.get(*nested).name == name)
        })
    }

    /// Default value of `ty`: zero for primitives, a default record for
    /// structs, the zero variant for enums, and null for reference types.
    pub fn default_value(&self, ty: &Type) -> Value {
        match ty {
            Type::Bool => Value::Bool(false),
            Type::Int => Value::Int(0),
            Type::Float => Value::Float(0.0),
            Type::Double => Value::Double(0.0),
            Type::Named(id, args) => {
                let def = self.get(*id);
                match def.kind {
                    TypeKind::Struct => Value::from(Record {
                        type_id: *id,
                        fields: def
                            .fields
                            .iter()
                            .map(|field| self.default_value(&field.ty.substitute(args)))
                            .collect(),
                    }),
                    TypeKind::Enum => Value::Enum(*id, 0),
                    TypeKind::Class | TypeKind::Static => Value::Null,
                }
            }
            _ => Value::Null,
        }
    }

    /// Starts a record of type `id` with every field at its default.
    pub fn instance(&self, id: TypeId) -> RecordBuilder<'_> {
        RecordBuilder::new(self, id)
    }

    pub fn enum_value(&self, id: TypeId, variant: &str) -> Option<Value> {
        self.get(id).variant(variant).map(|n| Value::Enum(id, n))
    }
}
