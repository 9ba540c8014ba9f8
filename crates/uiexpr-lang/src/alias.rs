use smol_str::SmolStr;

use crate::Shared;
use crate::catalog::{NativeFn, Type, TypeId};
use crate::value::Value;

/// One call form of an alias method group.
#[derive(Clone)]
pub struct MethodForm {
    pub params: Vec<Type>,
    pub ret: Type,
    pub func: NativeFn,
}

impl MethodForm {
    pub fn new(
        params: Vec<Type>,
        ret: Type,
        func: impl Fn(&[Value]) -> Value + Send + Sync + 'static,
    ) -> Self {
        Self {
            params,
            ret,
            func: Shared::new(func),
        }
    }
}

/// A named provider injected into a single compilation.
#[derive(Clone)]
pub enum AliasSource {
    /// `$name` (or any identifier) standing for a constant value.
    Constant { name: SmolStr, ty: Type, value: Value },
    /// Helper call forms such as `rgb(1, 0, 0)`, selected by argument types.
    MethodGroup { name: SmolStr, overloads: Vec<MethodForm> },
    /// Makes the variants of an enum usable by their bare names.
    Enum { type_id: TypeId },
}

impl AliasSource {
    pub fn constant(name: &str, ty: Type, value: impl Into<Value>) -> Self {
        AliasSource::Constant {
            name: SmolStr::new(name),
            ty,
            value: value.into(),
        }
    }

    pub fn method_group(name: &str, overloads: Vec<MethodForm>) -> Self {
        AliasSource::MethodGroup {
            name: SmolStr::new(name),
            overloads,
        }
    }

    pub fn enum_values(type_id: TypeId) -> Self {
        AliasSource::Enum { type_id }
    }
}

/// Per-compilation scope: ordered namespace imports and the aliases visible
/// while compiling one binding. Nothing here outlives the compile call.
#[derive(Clone, Default)]
pub struct CompileOptions {
    pub namespaces: Vec<SmolStr>,
    pub aliases: Vec<AliasSource>,
}

impl CompileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn namespace(mut self, namespace: &str) -> Self {
        self.namespaces.push(SmolStr::new(namespace));
        self
    }

    pub fn alias(mut self, alias: AliasSource) -> Self {
        self.aliases.push(alias);
        self
    }

    pub fn find_constant(&self, name: &str) -> Option<(&Type, &Value)> {
        self.aliases.iter().find_map(|alias| match alias {
            AliasSource::Constant {
                name: alias_name,
                ty,
                value,
            } if alias_name == name => Some((ty, value)),
            _ => None,
        })
    }

    pub fn find_method_group(&self, name: &str) -> Option<&[MethodForm]> {
        self.aliases.iter().find_map(|alias| match alias {
            AliasSource::MethodGroup {
                name: alias_name,
                overloads,
            } if alias_name == name => Some(overloads.as_slice()),
            _ => None,
        })
    }

    /// Enum types whose variants are addressable by bare name.
    pub fn enum_types(&self) -> impl Iterator<Item = TypeId> + '_ {
        self.aliases.iter().filter_map(|alias| match alias {
            AliasSource::Enum { type_id } => Some(*type_id),
            _ => None,
        })
    }
}
