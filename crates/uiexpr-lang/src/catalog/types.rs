use std::fmt::{self, Display, Formatter};

/// Index of a declared type inside a `TypeCatalog`.
#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Clone, Copy, Hash)]
pub struct TypeId(pub(crate) u32);

impl TypeId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl Display for TypeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "#{}", self.0)
    }
}

/// Static type of an expression node.
#[derive(PartialEq, Eq, Debug, Clone, Hash)]
pub enum Type {
    Bool,
    Int,
    Float,
    Double,
    String,
    /// Any value; a reference type.
    Object,
    /// The type of the `null` literal.
    Null,
    /// A `typeof(...)` result.
    Type,
    Array(Box<Type>),
    List(Box<Type>),
    Dict(Box<Type>, Box<Type>),
    Named(TypeId, Vec<Type>),
    /// The n-th generic parameter of the enclosing declaration.
    Param(u8),
}

#[derive(PartialEq, Eq, Debug, Clone, Copy, Hash)]
pub enum TypeKind {
    Class,
    Struct,
    Enum,
    Static,
}

#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Clone, Copy, Hash)]
pub enum NumericKind {
    Int,
    Float,
    Double,
}

impl NumericKind {
    pub fn of(ty: &Type) -> Option<NumericKind> {
        match ty {
            Type::Int => Some(NumericKind::Int),
            Type::Float => Some(NumericKind::Float),
            Type::Double => Some(NumericKind::Double),
            _ => None,
        }
    }

    pub fn to_type(self) -> Type {
        match self {
            NumericKind::Int => Type::Int,
            NumericKind::Float => Type::Float,
            NumericKind::Double => Type::Double,
        }
    }

    /// The wider of two numeric kinds (`int → float → double`).
    pub fn promote(self, other: NumericKind) -> NumericKind {
        std::cmp::max(self, other)
    }
}

impl Type {
    pub fn named(id: TypeId) -> Type {
        Type::Named(id, Vec::new())
    }

    pub fn array(element: Type) -> Type {
        Type::Array(Box::new(element))
    }

    pub fn list(element: Type) -> Type {
        Type::List(Box::new(element))
    }

    pub fn dict(key: Type, value: Type) -> Type {
        Type::Dict(Box::new(key), Box::new(value))
    }

    pub fn is_numeric(&self) -> bool {
        NumericKind::of(self).is_some()
    }

    /// Replaces generic parameters with the given arguments.
    pub fn substitute(&self, args: &[Type]) -> Type {
        if args.is_empty() {
            return self.clone();
        }

        match self {
            Type::Param(n) => args.get(*n as usize).cloned().unwrap_or(Type::Object),
            Type::Array(element) => Type::array(element.substitute(args)),
            Type::List(element) => Type::list(element.substitute(args)),
            Type::Dict(key, value) => Type::dict(key.substitute(args), value.substitute(args)),
            Type::Named(id, type_args) => Type::Named(
                *id,
                type_args.iter().map(|arg| arg.substitute(args)).collect(),
            ),
            other => other.clone(),
        }
    }

    pub fn type_id(&self) -> Option<TypeId> {
        match self {
            Type::Named(id, _) => Some(*id),
            _ => None,
        }
    }

    pub fn type_args(&self) -> &[Type] {
        match self {
            Type::Named(_, args) => args,
            _ => &[],
        }
    }

    pub fn element_type(&self) -> Option<&Type> {
        match self {
            Type::Array(element) | Type::List(element) => Some(element),
            Type::Dict(_, value) => Some(value),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::int_float(NumericKind::Int, NumericKind::Float, NumericKind::Float)]
    #[case::float_int(NumericKind::Float, NumericKind::Int, NumericKind::Float)]
    #[case::int_int(NumericKind::Int, NumericKind::Int, NumericKind::Int)]
    #[case::float_double(NumericKind::Float, NumericKind::Double, NumericKind::Double)]
    fn test_promote(#[case] a: NumericKind, #[case] b: NumericKind, #[case] expected: NumericKind) {
        assert_eq!(a.promote(b), expected);
    }

    #[test]
    fn test_substitute() {
        let generic = Type::dict(Type::String, Type::list(Type::Param(0)));
        assert_eq!(
            generic.substitute(&[Type::Int]),
            Type::dict(Type::String, Type::list(Type::Int))
        );
        assert_eq!(Type::Param(1).substitute(&[Type::Int]), Type::Object);
    }
}
