use itertools::Itertools;
use smol_str::SmolStr;
use tracing::trace;

use crate::alias::CompileOptions;
use crate::ast::{IdentName, TypeHints, TypeRef};
use crate::catalog::{Getter, StaticValue, Type, TypeCatalog, TypeId};
use crate::checker::error::CompileError;
use crate::checker::typed::Intrinsic;
use crate::range::Range;
use crate::value::Value;

/// What an instance member name resolved to.
#[derive(Clone)]
pub enum Member {
    Field { slot: usize, ty: Type },
    Property { getter: Getter, ty: Type },
    NestedType(TypeId),
    Intrinsic { intrinsic: Intrinsic, ty: Type },
}

/// What a member name on a type (rather than an instance) resolved to.
#[derive(Clone)]
pub enum StaticMember {
    Value { value: StaticValue, ty: Type },
    NestedType(TypeId),
}

/// A partially resolved static chain.
#[derive(Debug, Clone, PartialEq)]
pub enum Path {
    Type(Type),
    Namespace(SmolStr),
}

/// Resolves identifiers and type references for one compilation: the shared
/// catalog, the context type, and the per-compile imports and aliases.
pub struct Resolver<'a> {
    catalog: &'a TypeCatalog,
    context: Option<&'a Type>,
    options: &'a CompileOptions,
}

impl<'a> Resolver<'a> {
    pub fn new(
        catalog: &'a TypeCatalog,
        context: Option<&'a Type>,
        options: &'a CompileOptions,
    ) -> Self {
        Self {
            catalog,
            context,
            options,
        }
    }

    pub fn catalog(&self) -> &'a TypeCatalog {
        self.catalog
    }

    pub fn context(&self) -> Option<&'a Type> {
        self.context
    }

    pub fn options(&self) -> &'a CompileOptions {
        self.options
    }

    pub fn resolve_member(
        &self,
        ty: &Type,
        name: &str,
        range: Range,
    ) -> Result<Member, CompileError> {
        self.find_member(ty, name)
            .ok_or_else(|| CompileError::MemberNotFound {
                type_name: self.catalog.type_name(ty),
                member: name.to_string(),
                range,
            })
    }

    /// Field, then property, then nested type, then built-in intrinsics.
    pub fn find_member(&self, ty: &Type, name: &str) -> Option<Member> {
        match ty {
            Type::Named(id, args) => {
                if let Some(field) = self.catalog.field(*id, name) {
                    return Some(Member::Field {
                        slot: field.slot,
                        ty: field.ty.substitute(args),
                    });
                }

                if let Some(property) = self.catalog.property(*id, name) {
                    return Some(Member::Property {
                        getter: property.getter.clone(),
                        ty: property.ty.substitute(args),
                    });
                }

                self.catalog.nested_type(*id, name, 0).map(Member::NestedType)
            }
            Type::String if name == "Length" => Some(Member::Intrinsic {
                intrinsic: Intrinsic::StringLength,
                ty: Type::Int,
            }),
            Type::Array(_) if name == "Length" => Some(Member::Intrinsic {
                intrinsic: Intrinsic::ArrayLength,
                ty: Type::Int,
            }),
            Type::List(_) if name == "Count" => Some(Member::Intrinsic {
                intrinsic: Intrinsic::ListCount,
                ty: Type::Int,
            }),
            Type::Dict(_, _) if name == "Count" => Some(Member::Intrinsic {
                intrinsic: Intrinsic::DictCount,
                ty: Type::Int,
            }),
            _ => None,
        }
    }

    /// Enum variant, static member, or generic-free nested type of `id`.
    pub fn find_static(&self, id: TypeId, name: &str) -> Option<StaticMember> {
        if let Some(value) = self.catalog.enum_value(id, name) {
            return Some(StaticMember::Value {
                value: StaticValue::Const(value),
                ty: Type::named(id),
            });
        }

        if let Some(member) = self.catalog.static_member(id, name) {
            return Some(StaticMember::Value {
                value: member.value.clone(),
                ty: member.ty.clone(),
            });
        }

        self.catalog
            .nested_type(id, name, 0)
            .map(StaticMember::NestedType)
    }

    /// Value of a bare enum variant name made visible by an enum alias.
    pub fn enum_alias(&self, name: &str) -> Option<(Type, Value)> {
        self.options.enum_types().find_map(|id| {
            self.catalog
                .enum_value(id, name)
                .map(|value| (Type::named(id), value))
        })
    }

    /// Looks a chain head up as a type or namespace: the fully-qualified name
    /// first, then each import in order.
    pub fn resolve_head(
        &self,
        name: &str,
        args: Vec<Type>,
        range: Range,
    ) -> Result<Option<Path>, CompileError> {
        let arity = args.len();

        if let Some(ty) = Self::builtin_type(name, &args) {
            return Ok(Some(Path::Type(ty)));
        }

        if let Some(id) = self.catalog.find(name, arity) {
            trace!(name, "Resolved type by full name");
            return Ok(Some(Path::Type(Type::Named(id, args))));
        }

        let imported = self
            .options
            .namespaces
            .iter()
            .filter_map(|namespace| self.catalog.find(&format!("{}.{}", namespace, name), arity))
            .unique()
            .collect_vec();

        match imported.as_slice() {
            [id] => {
                trace!(name, full_name = %self.catalog.full_name(*id), "Resolved type by import");
                return Ok(Some(Path::Type(Type::Named(*id, args))));
            }
            [] => {}
            candidates => {
                return Err(CompileError::AmbiguousType {
                    name: name.to_string(),
                    candidates: candidates
                        .iter()
                        .map(|id| self.catalog.full_name(*id).to_string())
                        .collect(),
                    range,
                });
            }
        }

        if arity > 0 {
            return Ok(None);
        }

        if self.catalog.is_namespace(name) {
            return Ok(Some(Path::Namespace(SmolStr::new(name))));
        }

        Ok(self
            .options
            .namespaces
            .iter()
            .map(|namespace| format!("{}.{}", namespace, name))
            .find(|full_name| self.catalog.is_namespace(full_name))
            .map(|full_name| {
                trace!(namespace = %full_name, "Resolved namespace by import");
                Path::Namespace(SmolStr::new(full_name))
            }))
    }

    /// Descends one segment into a namespace or to a nested type.
    pub fn resolve_segment(&self, path: &Path, name: &str, args: Vec<Type>) -> Option<Path> {
        match path {
            Path::Namespace(prefix) => {
                let full_name = format!("{}.{}", prefix, name);
                if let Some(id) = self.catalog.find(&full_name, args.len()) {
                    Some(Path::Type(Type::Named(id, args)))
                } else if args.is_empty() && self.catalog.is_namespace(&full_name) {
                    Some(Path::Namespace(SmolStr::new(full_name)))
                } else {
                    None
                }
            }
            Path::Type(Type::Named(id, _)) => self
                .catalog
                .nested_type(*id, name, args.len())
                .map(|nested| Path::Type(Type::Named(nested, args))),
            Path::Type(_) => None,
        }
    }

    pub fn resolve_type(&self, type_ref: &TypeRef) -> Result<Type, CompileError> {
        let segments = match type_ref {
            TypeRef::Array(element) => return Ok(Type::array(self.resolve_type(element)?)),
            TypeRef::Named(segments) => segments,
        };

        let not_found = || CompileError::TypeNotFound {
            name: type_ref.to_string(),
            range: type_ref.range(),
        };

        let Some((head, rest)) = segments.split_first() else {
            return Err(not_found());
        };

        if rest.is_empty() && head.args.is_empty() {
            if let Some(ty) = Self::primitive_type(&head.ident.name) {
                return Ok(ty);
            }
        }

        let args = self.resolve_type_args(&head.args)?;
        let mut path = match self.context_nested_type(&head.ident.name, args.len()) {
            Some(id) => Path::Type(Type::Named(id, args)),
            None => self
                .resolve_head(&head.ident.name, args, head.ident.range)?
                .ok_or_else(not_found)?,
        };

        for segment in rest {
            let args = self.resolve_type_args(&segment.args)?;
            path = self
                .resolve_segment(&path, &segment.ident.name, args)
                .ok_or_else(not_found)?;
        }

        match path {
            Path::Type(ty) => Ok(ty),
            Path::Namespace(_) => Err(not_found()),
        }
    }

    fn resolve_type_args(&self, args: &[TypeRef]) -> Result<Vec<Type>, CompileError> {
        args.iter().map(|arg| self.resolve_type(arg)).collect()
    }

    pub fn context_nested_type(&self, name: &str, arity: usize) -> Option<TypeId> {
        self.context
            .and_then(Type::type_id)
            .and_then(|id| self.catalog.nested_type(id, name, arity))
    }

    fn primitive_type(name: &str) -> Option<Type> {
        match name {
            "bool" => Some(Type::Bool),
            "int" => Some(Type::Int),
            "float" => Some(Type::Float),
            "double" => Some(Type::Double),
            "string" => Some(Type::String),
            "object" => Some(Type::Object),
            _ => None,
        }
    }

    fn builtin_type(name: &str, args: &[Type]) -> Option<Type> {
        match (name, args) {
            ("List", [element]) => Some(Type::list(element.clone())),
            ("Dictionary", [key, value]) => Some(Type::dict(key.clone(), value.clone())),
            _ => None,
        }
    }

    /// Classifies a dotted path the way the checker would, using `object` for
    /// every type argument.
    fn static_path(&self, path: &[(IdentName, usize)]) -> Option<Path> {
        let ((head, head_arity), rest) = path.split_first()?;
        let placeholder = |arity: usize| vec![Type::Object; arity];

        if *head_arity == 0 {
            let is_value = self
                .context
                .is_some_and(|ctx| matches!(self.find_member(ctx, head), Some(member) if !matches!(member, Member::NestedType(_))))
                || self.options.find_constant(head).is_some()
                || self.enum_alias(head).is_some();
            if is_value {
                return None;
            }
        }

        let mut current = match self.context_nested_type(head, *head_arity) {
            Some(id) => Path::Type(Type::Named(id, placeholder(*head_arity))),
            None => self
                .resolve_head(head, placeholder(*head_arity), Range::default())
                .ok()
                .flatten()?,
        };

        for (name, arity) in rest {
            current = self.resolve_segment(&current, name, placeholder(*arity))?;
        }

        Some(current)
    }
}

impl TypeHints for Resolver<'_> {
    fn is_type(&self, type_ref: &TypeRef) -> bool {
        self.resolve_type(type_ref).is_ok()
    }

    fn is_generic_type(&self, path: &[(IdentName, usize)]) -> bool {
        path.last().is_some_and(|(_, arity)| *arity > 0)
            && matches!(self.static_path(path), Some(Path::Type(_)))
    }
}
