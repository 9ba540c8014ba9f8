use rustc_hash::FxHashSet;
use smol_str::SmolStr;
use tracing::warn;

use crate::Shared;
use crate::ast::{BinaryOp, UnaryOp};
use crate::value::{Record, Value};

use super::{
    CatalogError, ConstructorDef, ConversionDef, FieldDef, OperatorDef, OperatorKind, ParamDef,
    PropertyDef, StaticDef, StaticValue, Type, TypeCatalog, TypeDef, TypeId, TypeKind,
};

/// Collects type declarations and their members, then freezes them into a
/// `TypeCatalog`.
///
/// Types are declared first so members may refer to any of them:
///
/// ```
/// use uiexpr_lang::{CatalogBuilder, Type, Value};
///
/// let mut builder = CatalogBuilder::new();
/// let vector3 = builder.declare_struct("UnityEngine", "Vector3");
/// builder
///     .def(vector3)
///     .field("x", Type::Float)
///     .field("y", Type::Float)
///     .field("z", Type::Float)
///     .static_value("zero", Type::named(vector3), Value::Null);
/// let catalog = builder.build().unwrap();
///
/// assert!(catalog.find("UnityEngine.Vector3", 0).is_some());
/// ```
#[derive(Default)]
pub struct CatalogBuilder {
    types: Vec<TypeDef>,
    own_fields: Vec<Vec<(SmolStr, Type)>>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn declare(
        &mut self,
        namespace: &str,
        name: &str,
        kind: TypeKind,
        generic_arity: usize,
        parent: Option<TypeId>,
    ) -> TypeId {
        let id = TypeId(self.types.len() as u32);

        self.types.push(TypeDef {
            id,
            name: SmolStr::new(name),
            namespace: SmolStr::new(namespace),
            parent,
            generic_arity,
            kind,
            base: None,
            fields: Vec::new(),
            properties: Vec::new(),
            statics: Vec::new(),
            variants: Vec::new(),
            nested: Vec::new(),
            operators: Vec::new(),
            conversions: Vec::new(),
            constructors: Vec::new(),
        });
        self.own_fields.push(Vec::new());

        if let Some(parent) = parent {
            self.types[parent.index()].nested.push(id);
        }

        id
    }

    pub fn declare_class(&mut self, namespace: &str, name: &str) -> TypeId {
        self.declare(namespace, name, TypeKind::Class, 0, None)
    }

    pub fn declare_struct(&mut self, namespace: &str, name: &str) -> TypeId {
        self.declare(namespace, name, TypeKind::Struct, 0, None)
    }

    pub fn declare_enum(&mut self, namespace: &str, name: &str) -> TypeId {
        self.declare(namespace, name, TypeKind::Enum, 0, None)
    }

    pub fn declare_static(&mut self, namespace: &str, name: &str) -> TypeId {
        self.declare(namespace, name, TypeKind::Static, 0, None)
    }

    /// A generic class or struct; members refer to its parameters with
    /// `Type::Param(n)`.
    pub fn declare_generic(
        &mut self,
        namespace: &str,
        name: &str,
        kind: TypeKind,
        arity: usize,
    ) -> TypeId {
        self.declare(namespace, name, kind, arity, None)
    }

    pub fn declare_nested(
        &mut self,
        parent: TypeId,
        name: &str,
        kind: TypeKind,
        arity: usize,
    ) -> TypeId {
        let namespace = self.types[parent.index()].namespace.clone();
        self.declare(&namespace, name, kind, arity, Some(parent))
    }

    /// Looks up an already declared type by fully-qualified name.
    pub fn find(&self, full_name: &str, arity: usize) -> Option<TypeId> {
        self.types
            .iter()
            .find(|def| def.generic_arity == arity && self.full_name(def.id) == full_name)
            .map(|def| def.id)
    }

    fn full_name(&self, id: TypeId) -> String {
        let def = &self.types[id.index()];
        match def.parent {
            Some(parent) => format!("{}.{}", self.full_name(parent), def.name),
            None if def.namespace.is_empty() => def.name.to_string(),
            None => format!("{}.{}", def.namespace, def.name),
        }
    }

    pub fn def(&mut self, id: TypeId) -> TypeDefBuilder<'_> {
        TypeDefBuilder { builder: self, id }
    }

    pub fn build(mut self) -> Result<TypeCatalog, CatalogError> {
        for def in &self.types {
            let mut seen = FxHashSet::default();
            let mut current = Some(def.id);
            while let Some(id) = current {
                if !seen.insert(id) {
                    return Err(CatalogError::CyclicInheritance(SmolStr::new(
                        self.full_name(def.id),
                    )));
                }
                current = self.types[id.index()].base;
            }
        }

        let layouts = (0..self.types.len())
            .map(|index| self.layout(TypeId(index as u32)))
            .collect::<Result<Vec<_>, _>>()?;

        for (def, fields) in self.types.iter_mut().zip(layouts) {
            def.fields = fields;
        }

        for def in &self.types {
            if def.kind == TypeKind::Struct {
                self.check_struct_layout(&Type::named(def.id), &mut Vec::new())?;
            }
        }

        TypeCatalog::new(self.types)
    }

    /// Structs are stored inline, so a struct may not contain itself through
    /// any chain of struct-typed fields.
    fn check_struct_layout(&self, ty: &Type, path: &mut Vec<TypeId>) -> Result<(), CatalogError> {
        let Type::Named(id, args) = ty else {
            return Ok(());
        };
        let def = &self.types[id.index()];
        if def.kind != TypeKind::Struct {
            return Ok(());
        }
        if path.contains(id) {
            return Err(CatalogError::RecursiveStruct(SmolStr::new(
                self.full_name(*id),
            )));
        }

        path.push(*id);
        for field in &def.fields {
            self.check_struct_layout(&field.ty.substitute(args), path)?;
        }
        path.pop();

        Ok(())
    }

    fn layout(&self, id: TypeId) -> Result<Vec<FieldDef>, CatalogError> {
        let def = &self.types[id.index()];
        let mut fields = match def.base {
            Some(base) => self.layout(base)?,
            None => Vec::new(),
        };

        for (name, ty) in &self.own_fields[id.index()] {
            if fields.iter().any(|field| &field.name == name) {
                return Err(CatalogError::DuplicateMember(
                    SmolStr::new(self.full_name(id)),
                    name.clone(),
                ));
            }

            fields.push(FieldDef {
                name: name.clone(),
                ty: ty.clone(),
                slot: fields.len(),
            });
        }

        Ok(fields)
    }
}

/// Adds members to one declared type.
pub struct TypeDefBuilder<'a> {
    builder: &'a mut CatalogBuilder,
    id: TypeId,
}

impl TypeDefBuilder<'_> {
    fn def_mut(&mut self) -> &mut TypeDef {
        &mut self.builder.types[self.id.index()]
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn base(mut self, base: TypeId) -> Self {
        self.def_mut().base = Some(base);
        self
    }

    /// Instance field stored in the record; slots follow declaration order
    /// after any inherited fields.
    pub fn field(self, name: &str, ty: Type) -> Self {
        self.builder.own_fields[self.id.index()].push((SmolStr::new(name), ty));
        self
    }

    pub fn property(
        mut self,
        name: &str,
        ty: Type,
        getter: impl Fn(&Value) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.def_mut().properties.push(PropertyDef {
            name: SmolStr::new(name),
            ty,
            getter: Shared::new(getter),
        });
        self
    }

    pub fn static_value(mut self, name: &str, ty: Type, value: Value) -> Self {
        self.def_mut().statics.push(StaticDef {
            name: SmolStr::new(name),
            ty,
            value: StaticValue::Const(value),
        });
        self
    }

    pub fn static_getter(
        mut self,
        name: &str,
        ty: Type,
        getter: impl Fn() -> Value + Send + Sync + 'static,
    ) -> Self {
        self.def_mut().statics.push(StaticDef {
            name: SmolStr::new(name),
            ty,
            value: StaticValue::Computed(Shared::new(getter)),
        });
        self
    }

    pub fn variant(mut self, name: &str, value: i64) -> Self {
        self.def_mut().variants.push((SmolStr::new(name), value));
        self
    }

    pub fn binary_operator(
        mut self,
        op: BinaryOp,
        left: Type,
        right: Type,
        ret: Type,
        func: impl Fn(&[Value]) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.def_mut().operators.push(OperatorDef {
            op: OperatorKind::Binary(op),
            params: vec![left, right],
            ret,
            func: Shared::new(func),
        });
        self
    }

    pub fn unary_operator(
        mut self,
        op: UnaryOp,
        operand: Type,
        ret: Type,
        func: impl Fn(&[Value]) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.def_mut().operators.push(OperatorDef {
            op: OperatorKind::Unary(op),
            params: vec![operand],
            ret,
            func: Shared::new(func),
        });
        self
    }

    pub fn implicit_conversion(
        self,
        from: Type,
        to: Type,
        func: impl Fn(&Value) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.conversion(from, to, true, func)
    }

    pub fn explicit_conversion(
        self,
        from: Type,
        to: Type,
        func: impl Fn(&Value) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.conversion(from, to, false, func)
    }

    fn conversion(
        mut self,
        from: Type,
        to: Type,
        implicit: bool,
        func: impl Fn(&Value) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.def_mut().conversions.push(ConversionDef {
            from,
            to,
            implicit,
            func: Shared::new(func),
        });
        self
    }

    pub fn constructor(
        mut self,
        params: Vec<ParamDef>,
        func: impl Fn(&[Value]) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.def_mut().constructors.push(ConstructorDef {
            params,
            func: Shared::new(func),
        });
        self
    }
}

/// Builds a `Record` value by field name.
pub struct RecordBuilder<'a> {
    catalog: &'a TypeCatalog,
    type_id: TypeId,
    fields: Vec<Value>,
}

impl<'a> RecordBuilder<'a> {
    pub(super) fn new(catalog: &'a TypeCatalog, type_id: TypeId) -> Self {
        let fields = catalog
            .get(type_id)
            .fields
            .iter()
            .map(|field| catalog.default_value(&field.ty))
            .collect();

        Self {
            catalog,
            type_id,
            fields,
        }
    }

    pub fn set(mut self, name: &str, value: impl Into<Value>) -> Self {
        match self.catalog.field(self.type_id, name) {
            Some(field) => self.fields[field.slot] = value.into(),
            None => warn!(
                type_name = %self.catalog.full_name(self.type_id),
                field = name,
                "Ignoring unknown field"
            ),
        }
        self
    }

    pub fn build(self) -> Value {
        Value::from(Record {
            type_id: self.type_id,
            fields: self.fields,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_builder() {
        let mut builder = CatalogBuilder::new();
        let vector3 = builder.declare_struct("", "Vector3");
        builder
            .def(vector3)
            .field("x", Type::Float)
            .field("y", Type::Float)
            .field("z", Type::Float);
        let catalog = builder.build().unwrap();

        let value = catalog
            .instance(vector3)
            .set("z", 42.0f32)
            .set("missing", 1)
            .build();

        assert_eq!(
            value.as_record().unwrap().fields,
            vec![Value::Float(0.0), Value::Float(0.0), Value::Float(42.0)]
        );
    }

    #[test]
    fn test_cyclic_inheritance() {
        let mut builder = CatalogBuilder::new();
        let a = builder.declare_class("", "A");
        let b = builder.declare_class("", "B");
        builder.def(a).base(b);
        builder.def(b).base(a);

        assert!(matches!(
            builder.build(),
            Err(CatalogError::CyclicInheritance(_))
        ));
    }

    #[test]
    fn test_recursive_struct() {
        let mut builder = CatalogBuilder::new();
        let node = builder.declare_struct("G", "Node");
        let context = builder.declare_class("G", "Ctx");
        builder
            .def(node)
            .field("next", Type::named(node))
            .field("v", Type::Int);
        builder.def(context).field("n", Type::named(node));

        assert_eq!(
            builder.build().err(),
            Some(CatalogError::RecursiveStruct("G.Node".into()))
        );
    }

    #[test]
    fn test_recursive_struct_through_generic_argument() {
        let mut builder = CatalogBuilder::new();
        let wrapper = builder.declare_generic("G", "Wrapper", TypeKind::Struct, 1);
        let outer = builder.declare_struct("G", "Outer");
        builder.def(wrapper).field("item", Type::Param(0));
        builder
            .def(outer)
            .field("inner", Type::Named(wrapper, vec![Type::named(outer)]));

        assert!(matches!(
            builder.build(),
            Err(CatalogError::RecursiveStruct(_))
        ));
    }

    #[test]
    fn test_struct_may_reference_itself_through_collections() {
        let mut builder = CatalogBuilder::new();
        let node = builder.declare_struct("G", "Node");
        let owner = builder.declare_class("G", "Owner");
        builder
            .def(node)
            .field("children", Type::list(Type::named(node)))
            .field("owner", Type::named(owner));
        builder.def(owner).field("root", Type::named(node));

        assert!(builder.build().is_ok());
    }

    #[test]
    fn test_duplicate_field() {
        let mut builder = CatalogBuilder::new();
        let a = builder.declare_class("", "A");
        builder.def(a).field("x", Type::Int).field("x", Type::Int);

        assert!(matches!(
            builder.build(),
            Err(CatalogError::DuplicateMember(_, _))
        ));
    }

    #[test]
    fn test_find_nested() {
        let mut builder = CatalogBuilder::new();
        let outer = builder.declare_generic("NS", "Outer", TypeKind::Class, 1);
        let inner = builder.declare_nested(outer, "Inner", TypeKind::Struct, 0);

        assert_eq!(builder.find("NS.Outer.Inner", 0), Some(inner));
        assert_eq!(builder.find("NS.Outer", 1), Some(outer));
        assert_eq!(builder.find("NS.Outer", 0), None);
    }
}
