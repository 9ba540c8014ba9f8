//! Operator, conversion, and constructor selection.
//!
//! Every candidate is scored by the sum of the conversion costs of its
//! arguments: `0` for an exact match, `1` for numeric widening, upcasts, and
//! user implicit conversions, `2` for widening followed by a user conversion,
//! and `3` for boxing into `object`. The cheapest candidate wins; two
//! candidates sharing the lowest cost make the call ambiguous.

use itertools::Itertools;
use tracing::trace;

use crate::alias::MethodForm;
use crate::ast::{BinaryOp, UnaryOp};
use crate::catalog::{
    ConstructorDef, ConvertFn, NativeFn, NumericKind, OperatorKind, Type, TypeCatalog, TypeKind,
};
use crate::Shared;

use super::typed::{BinaryImpl, Conversion, TypeTest, UnaryImpl};

/// Why no single candidate was selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverloadError {
    Missing,
    Ambiguous(usize),
}

/// A selected binary operator with the conversions its operands need.
#[derive(Clone)]
pub struct BinaryChoice {
    pub imp: BinaryImpl,
    pub left: (Conversion, Type),
    pub right: (Conversion, Type),
    pub ret: Type,
}

#[derive(Clone)]
pub struct UnaryChoice {
    pub imp: UnaryImpl,
    pub operand: (Conversion, Type),
    pub ret: Type,
}

/// A callable with the conversions of the supplied arguments.
#[derive(Clone)]
pub struct CallChoice<T> {
    pub target: T,
    pub conversions: Vec<(Conversion, Type)>,
}

/// Picks the cheapest candidate; several at the lowest cost are ambiguous.
fn select<T>(candidates: impl IntoIterator<Item = (u32, T)>) -> Result<T, OverloadError> {
    let candidates = candidates.into_iter().collect_vec();
    let Some(min) = candidates.iter().map(|(cost, _)| *cost).min() else {
        return Err(OverloadError::Missing);
    };

    let mut best = candidates
        .into_iter()
        .filter(|(cost, _)| *cost == min)
        .map(|(_, candidate)| candidate)
        .collect_vec();

    match best.len() {
        1 => best.pop().ok_or(OverloadError::Missing),
        count => Err(OverloadError::Ambiguous(count)),
    }
}

fn user_conversion(catalog: &TypeCatalog, from: &Type, to: &Type, explicit: bool) -> Option<ConvertFn> {
    [from.type_id(), to.type_id()]
        .into_iter()
        .flatten()
        .unique()
        .flat_map(|id| catalog.get(id).conversions.iter())
        .find(|conversion| {
            (conversion.implicit || explicit) && &conversion.from == from && &conversion.to == to
        })
        .map(|conversion| conversion.func.clone())
}

fn widening(from: &Type, to: &Type) -> Option<NumericKind> {
    match (NumericKind::of(from), NumericKind::of(to)) {
        (Some(from), Some(to)) if from < to => Some(to),
        _ => None,
    }
}

/// Cost and conversion of using a `from` value where `to` is expected.
pub fn implicit_conversion(catalog: &TypeCatalog, from: &Type, to: &Type) -> Option<(u32, Conversion)> {
    if from == to {
        return Some((0, Conversion::Identity));
    }

    if *from == Type::Null && catalog.is_reference(to) {
        return Some((0, Conversion::Identity));
    }

    if let Some(kind) = widening(from, to) {
        return Some((1, Conversion::Numeric(kind)));
    }

    if let (Type::Named(from_id, _), Type::Named(to_id, _)) = (from, to) {
        if catalog.is_class(from) && catalog.is_class(to) && catalog.is_subtype(*from_id, *to_id) {
            return Some((1, Conversion::Identity));
        }
    }

    if let Some(func) = user_conversion(catalog, from, to, false) {
        return Some((1, Conversion::User(func)));
    }

    if let Some(id) = to.type_id() {
        let widened = catalog.get(id).conversions.iter().find_map(|conversion| {
            (conversion.implicit && &conversion.to == to)
                .then(|| widening(from, &conversion.from))
                .flatten()
                .map(|kind| Conversion::Numeric(kind).then(Conversion::User(conversion.func.clone())))
        });
        if let Some(conversion) = widened {
            return Some((2, conversion));
        }
    }

    if *to == Type::Object && *from != Type::Null {
        return Some((3, Conversion::Identity));
    }

    None
}

/// Runtime test for values of `ty`, if one exists.
pub fn type_test(catalog: &TypeCatalog, ty: &Type) -> Option<TypeTest> {
    match ty {
        Type::Bool => Some(TypeTest::Bool),
        Type::Int => Some(TypeTest::Int),
        Type::Float => Some(TypeTest::Float),
        Type::Double => Some(TypeTest::Double),
        Type::String => Some(TypeTest::String),
        Type::Array(_) => Some(TypeTest::Array),
        Type::List(_) => Some(TypeTest::List),
        Type::Dict(_, _) => Some(TypeTest::Dict),
        Type::Type => Some(TypeTest::Type),
        Type::Object => Some(TypeTest::Any),
        Type::Named(id, _) => match catalog.get(*id).kind {
            TypeKind::Enum => Some(TypeTest::Enum(*id)),
            TypeKind::Class | TypeKind::Struct => {
                Some(TypeTest::Records(Shared::new(catalog.subtypes_of(*id))))
            }
            TypeKind::Static => None,
        },
        Type::Null | Type::Param(_) => None,
    }
}

/// Conversion for `(T)expr`: implicit conversions plus numeric narrowing,
/// enum/int conversions, user explicit conversions, and checked downcasts.
pub fn explicit_conversion(catalog: &TypeCatalog, from: &Type, to: &Type) -> Option<Conversion> {
    if let Some((_, conversion)) = implicit_conversion(catalog, from, to) {
        return Some(conversion);
    }

    if let Some(func) = user_conversion(catalog, from, to, true) {
        return Some(Conversion::User(func));
    }

    match (from, to) {
        (from, to) if from.is_numeric() && to.is_numeric() => {
            NumericKind::of(to).map(Conversion::Numeric)
        }
        (Type::Named(_, _), to) if catalog.is_enum(from) && to.is_numeric() => {
            let conversion = Conversion::EnumToInt;
            match NumericKind::of(to) {
                Some(NumericKind::Int) | None => Some(conversion),
                Some(kind) => Some(conversion.then(Conversion::Numeric(kind))),
            }
        }
        (from, Type::Named(id, _)) if from.is_numeric() && catalog.is_enum(to) => {
            Some(Conversion::Numeric(NumericKind::Int).then(Conversion::IntToEnum(*id)))
        }
        (Type::Named(from_id, _), Type::Named(to_id, _))
            if catalog.is_class(from) && catalog.is_class(to) && catalog.is_subtype(*to_id, *from_id) =>
        {
            type_test(catalog, to).map(Conversion::Checked)
        }
        (Type::Object, to) => type_test(catalog, to).map(Conversion::Checked),
        _ => None,
    }
}

fn applicable(catalog: &TypeCatalog, args: &[Type], params: &[Type]) -> Option<(u32, Vec<(Conversion, Type)>)> {
    if args.len() != params.len() {
        return None;
    }

    args.iter().zip(params).try_fold((0, Vec::with_capacity(args.len())), |(total, mut conversions), (arg, param)| {
        let (cost, conversion) = implicit_conversion(catalog, arg, param)?;
        conversions.push((conversion, param.clone()));
        Some((total + cost, conversions))
    })
}

pub fn resolve_binary(
    catalog: &TypeCatalog,
    op: BinaryOp,
    left: &Type,
    right: &Type,
) -> Result<BinaryChoice, OverloadError> {
    match user_binary(catalog, op, left, right) {
        Err(OverloadError::Missing) => {}
        result => return result,
    }

    builtin_binary(catalog, op, left, right).ok_or(OverloadError::Missing)
}

fn user_binary(
    catalog: &TypeCatalog,
    op: BinaryOp,
    left: &Type,
    right: &Type,
) -> Result<BinaryChoice, OverloadError> {
    let candidates = [left, right]
        .into_iter()
        .filter_map(|ty| ty.type_id().map(|id| (id, ty.type_args())))
        .unique_by(|(id, _)| *id)
        .flat_map(|(id, type_args)| {
            catalog
                .get(id)
                .operators
                .iter()
                .filter(|def| def.op == OperatorKind::Binary(op))
                .filter_map(move |def| {
                    let params = def.params.iter().map(|param| param.substitute(type_args)).collect_vec();
                    let (cost, mut conversions) = applicable(catalog, &[left.clone(), right.clone()], &params)?;
                    let right = conversions.pop()?;
                    let left = conversions.pop()?;
                    Some((
                        cost,
                        BinaryChoice {
                            imp: BinaryImpl::User(def.func.clone()),
                            left,
                            right,
                            ret: def.ret.substitute(type_args),
                        },
                    ))
                })
        })
        .collect_vec();

    let choice = select(candidates)?;
    trace!(op = op.name(), "Selected user-defined operator");
    Ok(choice)
}

fn builtin_binary(catalog: &TypeCatalog, op: BinaryOp, left: &Type, right: &Type) -> Option<BinaryChoice> {
    let same = |imp: BinaryImpl, ret: Type| BinaryChoice {
        imp,
        left: (Conversion::Identity, left.clone()),
        right: (Conversion::Identity, right.clone()),
        ret,
    };
    let numeric = NumericKind::of(left).zip(NumericKind::of(right)).map(|(l, r)| l.promote(r));

    match op {
        BinaryOp::Add if *left == Type::String || *right == Type::String => {
            Some(same(BinaryImpl::Concat, Type::String))
        }
        op if op.is_arithmetic() => {
            numeric.map(|kind| same(BinaryImpl::Numeric(op, kind), kind.to_type()))
        }
        op if op.is_shift() => (*left == Type::Int && *right == Type::Int)
            .then(|| same(BinaryImpl::Numeric(op, NumericKind::Int), Type::Int)),
        op if op.is_bitwise() => match (left, right) {
            (Type::Int, Type::Int) => Some(same(BinaryImpl::Numeric(op, NumericKind::Int), Type::Int)),
            (Type::Bool, Type::Bool) => Some(same(BinaryImpl::BoolBitwise(op), Type::Bool)),
            _ => None,
        },
        op if op.is_comparison() => match numeric {
            Some(kind) => Some(same(BinaryImpl::Compare(op, kind), Type::Bool)),
            None if left == right && catalog.is_enum(left) => {
                Some(same(BinaryImpl::Compare(op, NumericKind::Int), Type::Bool))
            }
            None => None,
        },
        op if op.is_equality() => match numeric {
            Some(kind) => Some(same(BinaryImpl::Compare(op, kind), Type::Bool)),
            None => equality(catalog, op == BinaryOp::Ne, left, right)
                .map(|imp| same(imp, Type::Bool)),
        },
        _ => None,
    }
}

fn equality(catalog: &TypeCatalog, negate: bool, left: &Type, right: &Type) -> Option<BinaryImpl> {
    let by_value = Some(BinaryImpl::ValueEquality { negate });
    let by_reference = Some(BinaryImpl::RefEquality { negate });

    match (left, right) {
        (Type::Null, Type::Null) => by_value,
        (Type::Null, other) | (other, Type::Null) if catalog.is_reference(other) => by_reference,
        (Type::Bool, Type::Bool) | (Type::String, Type::String) | (Type::Type, Type::Type) => by_value,
        (Type::Object, other) | (other, Type::Object) => {
            if catalog.is_reference(other) {
                by_reference
            } else {
                by_value
            }
        }
        (Type::Named(a, _), Type::Named(b, _)) if catalog.is_class(left) && catalog.is_class(right) => {
            (catalog.is_subtype(*a, *b) || catalog.is_subtype(*b, *a)).then_some(BinaryImpl::RefEquality { negate })
        }
        (left, right) if left == right && (catalog.is_enum(left) || catalog.is_struct(left)) => by_value,
        (Type::Array(_), Type::Array(_)) | (Type::List(_), Type::List(_)) | (Type::Dict(_, _), Type::Dict(_, _))
            if left == right =>
        {
            by_reference
        }
        _ => None,
    }
}

pub fn resolve_unary(catalog: &TypeCatalog, op: UnaryOp, operand: &Type) -> Result<UnaryChoice, OverloadError> {
    if let Some(id) = operand.type_id() {
        let type_args = operand.type_args();
        let candidates = catalog
            .get(id)
            .operators
            .iter()
            .filter(|def| def.op == OperatorKind::Unary(op))
            .filter_map(|def| {
                let params = def.params.iter().map(|param| param.substitute(type_args)).collect_vec();
                let (cost, mut conversions) = applicable(catalog, std::slice::from_ref(operand), &params)?;
                Some((
                    cost,
                    UnaryChoice {
                        imp: UnaryImpl::User(def.func.clone()),
                        operand: conversions.pop()?,
                        ret: def.ret.substitute(type_args),
                    },
                ))
            })
            .collect_vec();

        match select(candidates) {
            Err(OverloadError::Missing) => {}
            result => return result,
        }
    }

    let same = |imp: UnaryImpl, ret: Type| UnaryChoice {
        imp,
        operand: (Conversion::Identity, operand.clone()),
        ret,
    };

    match (op, operand) {
        (UnaryOp::Not, Type::Bool) => Ok(same(UnaryImpl::Not, Type::Bool)),
        (UnaryOp::Not, Type::String) => Ok(same(UnaryImpl::StringNot, Type::Bool)),
        (UnaryOp::Not, operand) if catalog.is_reference(operand) => {
            Ok(same(UnaryImpl::ObjectNot, Type::Bool))
        }
        (UnaryOp::Minus, operand) => NumericKind::of(operand)
            .map(|kind| same(UnaryImpl::Negate(kind), kind.to_type()))
            .ok_or(OverloadError::Missing),
        (UnaryOp::BitwiseNot, Type::Int) => Ok(same(UnaryImpl::BitwiseNot, Type::Int)),
        _ => Err(OverloadError::Missing),
    }
}

/// Picks a constructor after filling optional parameters. Each defaulted
/// parameter adds one to the cost so the closest arity wins.
pub fn resolve_constructor<'c>(
    catalog: &'c TypeCatalog,
    ty: &Type,
    args: &[Type],
) -> Result<CallChoice<&'c ConstructorDef>, OverloadError> {
    let Some(id) = ty.type_id() else {
        return Err(OverloadError::Missing);
    };
    let type_args = ty.type_args();

    let candidates = catalog
        .get(id)
        .constructors
        .iter()
        .filter(|def| (def.required_arity()..=def.params.len()).contains(&args.len()))
        .filter_map(|def| {
            let params = def.params[..args.len()]
                .iter()
                .map(|param| param.ty.substitute(type_args))
                .collect_vec();
            let (cost, conversions) = applicable(catalog, args, &params)?;
            let defaulted = (def.params.len() - args.len()) as u32;
            Some((
                cost + defaulted,
                CallChoice {
                    target: def,
                    conversions,
                },
            ))
        })
        .collect_vec();

    select(candidates)
}

pub fn resolve_method<'m>(
    catalog: &TypeCatalog,
    forms: &'m [MethodForm],
    args: &[Type],
) -> Result<CallChoice<(&'m NativeFn, &'m Type)>, OverloadError> {
    let candidates = forms
        .iter()
        .filter_map(|form| {
            let (cost, conversions) = applicable(catalog, args, &form.params)?;
            Some((
                cost,
                CallChoice {
                    target: (&form.func, &form.ret),
                    conversions,
                },
            ))
        })
        .collect_vec();

    select(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogBuilder, ParamDef};
    use crate::value::Value;
    use rstest::{fixture, rstest};

    struct Fixture {
        catalog: TypeCatalog,
        vector: Type,
        base: Type,
        derived: Type,
        color: Type,
    }

    #[fixture]
    fn fixture() -> Fixture {
        let mut builder = CatalogBuilder::new();
        let vector = builder.declare_struct("", "Vector");
        let base = builder.declare_class("", "Base");
        let derived = builder.declare_class("", "Derived");
        let color = builder.declare_enum("", "Color");
        let vector_ty = Type::named(vector);

        builder
            .def(vector)
            .field("x", Type::Float)
            .binary_operator(BinaryOp::Add, vector_ty.clone(), vector_ty.clone(), vector_ty.clone(), |_| Value::Null)
            .binary_operator(BinaryOp::Mul, vector_ty.clone(), Type::Float, vector_ty.clone(), |_| Value::Null)
            .binary_operator(BinaryOp::Mul, vector_ty.clone(), Type::Double, vector_ty.clone(), |_| Value::Null)
            .unary_operator(UnaryOp::Minus, vector_ty.clone(), vector_ty.clone(), |_| Value::Null)
            .implicit_conversion(Type::Float, vector_ty.clone(), |_| Value::Null)
            .constructor(vec![ParamDef::new("x", Type::Float)], |_| Value::Null)
            .constructor(
                vec![ParamDef::new("x", Type::Float), ParamDef::optional("y", Type::Float, Value::Float(1.0))],
                |_| Value::Null,
            );
        builder.def(derived).base(base);
        builder.def(color).variant("Red", 0);

        let catalog = builder.build().unwrap();
        Fixture {
            catalog,
            vector: vector_ty,
            base: Type::named(base),
            derived: Type::named(derived),
            color: Type::named(color),
        }
    }

    #[rstest]
    #[case::exact(Type::Int, Type::Int, Some(0))]
    #[case::widening(Type::Int, Type::Float, Some(1))]
    #[case::widening_double(Type::Float, Type::Double, Some(1))]
    #[case::narrowing(Type::Double, Type::Int, None)]
    #[case::null_to_string(Type::Null, Type::String, Some(0))]
    #[case::null_to_int(Type::Null, Type::Int, None)]
    #[case::boxing(Type::Int, Type::Object, Some(3))]
    fn test_implicit_conversion_cost(
        fixture: Fixture,
        #[case] from: Type,
        #[case] to: Type,
        #[case] expected: Option<u32>,
    ) {
        assert_eq!(
            implicit_conversion(&fixture.catalog, &from, &to).map(|(cost, _)| cost),
            expected
        );
    }

    #[rstest]
    fn test_user_implicit_conversion(fixture: Fixture) {
        assert!(matches!(
            implicit_conversion(&fixture.catalog, &Type::Float, &fixture.vector),
            Some((1, Conversion::User(_)))
        ));
        assert!(matches!(
            implicit_conversion(&fixture.catalog, &Type::Int, &fixture.vector),
            Some((2, Conversion::Chain(_, _)))
        ));
    }

    #[rstest]
    fn test_upcast_and_downcast(fixture: Fixture) {
        assert!(implicit_conversion(&fixture.catalog, &fixture.derived, &fixture.base).is_some());
        assert!(implicit_conversion(&fixture.catalog, &fixture.base, &fixture.derived).is_none());
        assert!(matches!(
            explicit_conversion(&fixture.catalog, &fixture.base, &fixture.derived),
            Some(Conversion::Checked(TypeTest::Records(_)))
        ));
        assert!(explicit_conversion(&fixture.catalog, &fixture.vector, &fixture.base).is_none());
    }

    #[rstest]
    fn test_enum_conversions(fixture: Fixture) {
        assert!(matches!(
            explicit_conversion(&fixture.catalog, &fixture.color, &Type::Int),
            Some(Conversion::EnumToInt)
        ));
        assert!(matches!(
            explicit_conversion(&fixture.catalog, &Type::Int, &fixture.color),
            Some(Conversion::IntToEnum(_))
        ));
        assert!(implicit_conversion(&fixture.catalog, &fixture.color, &Type::Int).is_none());
    }

    #[rstest]
    #[case::int(Type::Int, Type::Int, Type::Int)]
    #[case::float(Type::Float, Type::Int, Type::Float)]
    #[case::double(Type::Int, Type::Double, Type::Double)]
    fn test_numeric_promotion(fixture: Fixture, #[case] left: Type, #[case] right: Type, #[case] expected: Type) {
        let choice = resolve_binary(&fixture.catalog, BinaryOp::Add, &left, &right).unwrap();
        assert_eq!(choice.ret, expected);
    }

    #[rstest]
    fn test_user_operator_preferred(fixture: Fixture) {
        let choice = resolve_binary(&fixture.catalog, BinaryOp::Add, &fixture.vector, &fixture.vector).unwrap();
        assert!(matches!(choice.imp, BinaryImpl::User(_)));
        assert_eq!(choice.ret, fixture.vector);

        let choice = resolve_binary(&fixture.catalog, BinaryOp::Mul, &fixture.vector, &Type::Float).unwrap();
        assert!(matches!(choice.right.0, Conversion::Identity));
    }

    #[rstest]
    fn test_ambiguous_operator(fixture: Fixture) {
        assert_eq!(
            resolve_binary(&fixture.catalog, BinaryOp::Mul, &fixture.vector, &Type::Int).err(),
            Some(OverloadError::Ambiguous(2))
        );
    }

    #[rstest]
    fn test_missing_operator(fixture: Fixture) {
        assert_eq!(
            resolve_binary(&fixture.catalog, BinaryOp::Div, &fixture.vector, &Type::Float).err(),
            Some(OverloadError::Missing)
        );
        assert_eq!(
            resolve_binary(&fixture.catalog, BinaryOp::ShiftLeft, &Type::Float, &Type::Int).err(),
            Some(OverloadError::Missing)
        );
    }

    #[rstest]
    #[case::string_concat(BinaryOp::Add, Type::String, Type::Int, Type::String)]
    #[case::null_equality(BinaryOp::Eq, Type::Null, Type::String, Type::Bool)]
    #[case::bool_and(BinaryOp::BitAnd, Type::Bool, Type::Bool, Type::Bool)]
    #[case::shift(BinaryOp::ShiftRight, Type::Int, Type::Int, Type::Int)]
    fn test_builtin_operators(
        fixture: Fixture,
        #[case] op: BinaryOp,
        #[case] left: Type,
        #[case] right: Type,
        #[case] expected: Type,
    ) {
        assert_eq!(resolve_binary(&fixture.catalog, op, &left, &right).unwrap().ret, expected);
    }

    #[rstest]
    fn test_unary(fixture: Fixture) {
        assert!(matches!(
            resolve_unary(&fixture.catalog, UnaryOp::Minus, &fixture.vector).unwrap().imp,
            UnaryImpl::User(_)
        ));
        assert!(matches!(
            resolve_unary(&fixture.catalog, UnaryOp::Not, &Type::String).unwrap().imp,
            UnaryImpl::StringNot
        ));
        assert!(matches!(
            resolve_unary(&fixture.catalog, UnaryOp::Not, &fixture.base).unwrap().imp,
            UnaryImpl::ObjectNot
        ));
        assert!(resolve_unary(&fixture.catalog, UnaryOp::Not, &fixture.vector).is_err());
    }

    #[rstest]
    fn test_constructor_defaults(fixture: Fixture) {
        let one = resolve_constructor(&fixture.catalog, &fixture.vector, &[Type::Float]).unwrap();
        assert_eq!(one.target.params.len(), 1);

        let two = resolve_constructor(&fixture.catalog, &fixture.vector, &[Type::Int, Type::Float]).unwrap();
        assert_eq!(two.target.params.len(), 2);

        assert_eq!(
            resolve_constructor(&fixture.catalog, &fixture.vector, &[Type::String]).err(),
            Some(OverloadError::Missing)
        );
    }
}
