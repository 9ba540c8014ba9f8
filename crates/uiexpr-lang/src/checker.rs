//! Type checking of parsed expressions.
//!
//! The checker turns a syntactic [`Node`] into a [`TypedNode`] tree. Dotted
//! chains are classified left to right: the head is looked up as a context
//! member, then as an alias, then as a nested type of the context, then as a
//! type or namespace. Once a chain reaches a type, the remaining segments are
//! static members or nested types. Operators, constructors, and alias calls are
//! selected by [`overload`], and every node records its static type and whether
//! it is independent of the context instance.

pub mod error;
pub mod overload;
pub mod typed;

use itertools::Itertools;
use smol_str::SmolStr;
use tracing::trace;

use crate::ast::{Args, BinaryOp, Expr, Ident, Literal, Node, TypeCheckMode, TypeRef};
use crate::catalog::{NativeFn, NumericKind, Type, TypeCatalog, TypeKind};
use crate::compiler;
use crate::number::Number;
use crate::range::Range;
use crate::resolver::{Member, Path, Resolver, StaticMember};
use crate::value::Value;

use error::CompileError;
use overload::OverloadError;
use typed::{ContainerKind, Conversion, LogicalStrategy, TypedExpr, TypedNode};

/// Intermediate result of walking a dotted chain.
enum Classified {
    Value(TypedNode),
    Type(Type),
    Namespace(SmolStr),
}

pub struct Checker<'a> {
    resolver: &'a Resolver<'a>,
}

impl<'a> Checker<'a> {
    pub fn new(resolver: &'a Resolver<'a>) -> Self {
        Self { resolver }
    }

    fn catalog(&self) -> &'a TypeCatalog {
        self.resolver.catalog()
    }

    fn type_name(&self, ty: &Type) -> String {
        self.catalog().type_name(ty)
    }

    pub fn check(&self, node: &Node) -> Result<TypedNode, CompileError> {
        match self.classify(node)? {
            Classified::Value(typed) => Ok(typed),
            Classified::Type(ty) => Err(CompileError::TypeUsedAsValue {
                name: self.type_name(&ty),
                range: node.range,
            }),
            Classified::Namespace(namespace) => Err(CompileError::TypeUsedAsValue {
                name: namespace.to_string(),
                range: node.range,
            }),
        }
    }

    /// Converts `node` to `target` for use as a result or argument.
    pub fn convert_to(&self, node: TypedNode, target: &Type) -> Result<TypedNode, CompileError> {
        if let Some((_, conversion)) = overload::implicit_conversion(self.catalog(), &node.ty, target) {
            return Ok(node.convert(conversion, target.clone()));
        }

        let from = self.type_name(&node.ty);
        let range = node.range;
        let narrowed = NumericKind::of(target).and_then(|kind| self.narrow_constant(node, kind));

        narrowed.ok_or_else(|| CompileError::InvalidConversion {
            from,
            to: self.type_name(target),
            range,
        })
    }

    /// Narrows a constant numeric node when its value is exactly
    /// representable as `kind`.
    fn narrow_constant(&self, node: TypedNode, kind: NumericKind) -> Option<TypedNode> {
        if !node.constant || !node.ty.is_numeric() {
            return None;
        }

        let number = Number::from_value(&compiler::evaluate_constant(self.catalog(), &node))?;
        let narrowed = number.cast(kind);
        if narrowed.to_f64() != number.to_f64() || (kind == NumericKind::Int && !number.is_integral()) {
            return None;
        }

        trace!(value = %number, "Narrowed constant literal");
        Some(TypedNode::literal(narrowed.into(), kind.to_type(), node.range))
    }

    fn classify(&self, node: &Node) -> Result<Classified, CompileError> {
        match &*node.expr {
            Expr::Ident(ident, type_args) => self.classify_head(ident, type_args, node.range),
            Expr::Member(target, ident, type_args) => {
                let target = self.classify(target)?;
                self.classify_member(target, ident, type_args, node.range)
            }
            _ => self.check_value(node).map(Classified::Value),
        }
    }

    fn classify_head(
        &self,
        ident: &Ident,
        type_args: &[TypeRef],
        range: Range,
    ) -> Result<Classified, CompileError> {
        let name = ident.name.as_str();

        if type_args.is_empty() {
            if let Some(context) = self.resolver.context() {
                match self.resolver.find_member(context, name) {
                    Some(Member::NestedType(id)) => {
                        trace!(name, "Resolved head as nested type of the context");
                        return Ok(Classified::Type(Type::named(id)));
                    }
                    Some(member) => {
                        trace!(name, "Resolved head as context member");
                        let target = TypedNode {
                            expr: TypedExpr::Context,
                            ty: context.clone(),
                            constant: false,
                            range: ident.range,
                        };
                        return Ok(Classified::Value(Self::member_node(target, member, range)));
                    }
                    None => {}
                }
            }

            if let Some((ty, value)) = self.resolver.options().find_constant(name) {
                trace!(name, "Resolved head as constant alias");
                return Ok(Classified::Value(TypedNode::literal(value.clone(), ty.clone(), range)));
            }

            if let Some((ty, value)) = self.resolver.enum_alias(name) {
                trace!(name, "Resolved head as enum alias");
                return Ok(Classified::Value(TypedNode::literal(value, ty, range)));
            }
        }

        let args = self.resolve_type_args(type_args)?;
        if let Some(id) = self.resolver.context_nested_type(name, args.len()) {
            return Ok(Classified::Type(Type::Named(id, args)));
        }

        match self.resolver.resolve_head(name, args, ident.range)? {
            Some(Path::Type(ty)) => Ok(Classified::Type(ty)),
            Some(Path::Namespace(namespace)) => Ok(Classified::Namespace(namespace)),
            None => match self.resolver.context() {
                Some(context) if !ident.is_alias() => Err(CompileError::MemberNotFound {
                    type_name: self.type_name(context),
                    member: name.to_string(),
                    range: ident.range,
                }),
                _ => Err(CompileError::IdentifierNotFound {
                    name: name.to_string(),
                    range: ident.range,
                }),
            },
        }
    }

    fn classify_member(
        &self,
        target: Classified,
        ident: &Ident,
        type_args: &[TypeRef],
        range: Range,
    ) -> Result<Classified, CompileError> {
        let name = ident.name.as_str();

        match target {
            Classified::Value(target) => {
                if !type_args.is_empty() {
                    return Err(CompileError::MemberNotFound {
                        type_name: self.type_name(&target.ty),
                        member: name.to_string(),
                        range: ident.range,
                    });
                }

                match self.resolver.resolve_member(&target.ty, name, ident.range)? {
                    Member::NestedType(id) => Ok(Classified::Type(Type::named(id))),
                    member => Ok(Classified::Value(Self::member_node(target, member, range))),
                }
            }
            Classified::Type(ty) => {
                if let (Some(id), true) = (ty.type_id(), type_args.is_empty()) {
                    match self.resolver.find_static(id, name) {
                        Some(StaticMember::Value { value, ty: member_ty }) => {
                            return Ok(Classified::Value(TypedNode {
                                expr: TypedExpr::Static(value),
                                ty: member_ty.substitute(ty.type_args()),
                                constant: true,
                                range,
                            }));
                        }
                        Some(StaticMember::NestedType(nested)) => {
                            return Ok(Classified::Type(Type::named(nested)));
                        }
                        None => {}
                    }
                }

                let args = self.resolve_type_args(type_args)?;
                self.resolver
                    .resolve_segment(&Path::Type(ty.clone()), name, args)
                    .map(Self::from_path)
                    .ok_or_else(|| CompileError::MemberNotFound {
                        type_name: self.type_name(&ty),
                        member: name.to_string(),
                        range: ident.range,
                    })
            }
            Classified::Namespace(namespace) => {
                let args = self.resolve_type_args(type_args)?;
                self.resolver
                    .resolve_segment(&Path::Namespace(namespace.clone()), name, args)
                    .map(Self::from_path)
                    .ok_or_else(|| CompileError::TypeNotFound {
                        name: format!("{}.{}", namespace, name),
                        range: ident.range,
                    })
            }
        }
    }

    fn from_path(path: Path) -> Classified {
        match path {
            Path::Type(ty) => Classified::Type(ty),
            Path::Namespace(namespace) => Classified::Namespace(namespace),
        }
    }

    fn resolve_type_args(&self, type_args: &[TypeRef]) -> Result<Vec<Type>, CompileError> {
        type_args
            .iter()
            .map(|arg| self.resolver.resolve_type(arg))
            .collect()
    }

    fn member_node(target: TypedNode, member: Member, range: Range) -> TypedNode {
        let constant = target.constant;
        let target = Box::new(target);
        let (expr, ty) = match member {
            Member::Field { slot, ty } => (TypedExpr::Field { target, slot }, ty),
            Member::Property { getter, ty } => (TypedExpr::Property { target, getter }, ty),
            Member::Intrinsic { intrinsic, ty } => (TypedExpr::Intrinsic { target, intrinsic }, ty),
            Member::NestedType(_) => (TypedExpr::Literal(Value::Null), Type::Null),
        };

        TypedNode {
            expr,
            ty,
            constant,
            range,
        }
    }

    fn check_value(&self, node: &Node) -> Result<TypedNode, CompileError> {
        let range = node.range;

        match &*node.expr {
            Expr::Literal(literal) => Ok(Self::check_literal(literal, range)),
            Expr::Ident(_, _) | Expr::Member(_, _, _) => self.check(node),
            Expr::Paren(inner) => Ok(TypedNode {
                range,
                ..self.check(inner)?
            }),
            Expr::Index(target, index) => self.check_index(target, index, range),
            Expr::Call(callee, args) => self.check_call(callee, args, range),
            Expr::Unary(op, operand) => {
                let operand = self.check(operand)?;
                match overload::resolve_unary(self.catalog(), *op, &operand.ty) {
                    Ok(choice) => {
                        let constant = operand.constant;
                        Ok(TypedNode {
                            expr: TypedExpr::Unary {
                                op: choice.imp,
                                operand: Box::new(operand.convert(choice.operand.0, choice.operand.1)),
                            },
                            ty: choice.ret,
                            constant,
                            range,
                        })
                    }
                    Err(OverloadError::Missing) => Err(CompileError::MissingUnaryOperator {
                        op: *op,
                        operand: self.type_name(&operand.ty),
                        range,
                    }),
                    Err(OverloadError::Ambiguous(count)) => Err(CompileError::AmbiguousOverload {
                        name: format!("operator {}", op),
                        count,
                        range,
                    }),
                }
            }
            Expr::Binary(op, left, right) => {
                let left = self.check(left)?;
                let right = self.check(right)?;
                self.check_binary(*op, left, right, range)
            }
            Expr::Ternary(condition, when_true, when_false) => {
                let condition = self.check(condition)?;
                let (when_true, when_false, ty) =
                    self.unify(self.check(when_true)?, self.check(when_false)?)?;
                let constant = condition.constant && when_true.constant && when_false.constant;

                Ok(TypedNode {
                    expr: TypedExpr::Ternary {
                        condition: Box::new(condition),
                        when_true: Box::new(when_true),
                        when_false: Box::new(when_false),
                    },
                    ty,
                    constant,
                    range,
                })
            }
            Expr::New(type_ref, args) => self.check_new(type_ref, args, range),
            Expr::Cast(type_ref, operand) => {
                let to = self.resolver.resolve_type(type_ref)?;
                let operand = self.check(operand)?;

                match overload::explicit_conversion(self.catalog(), &operand.ty, &to) {
                    Some(conversion) => Ok(TypedNode {
                        range,
                        ..operand.convert(conversion, to)
                    }),
                    None => Err(CompileError::InvalidCast {
                        from: self.type_name(&operand.ty),
                        to: self.type_name(&to),
                        range,
                    }),
                }
            }
            Expr::TypeCheck(operand, type_ref, mode) => {
                let to = self.resolver.resolve_type(type_ref)?;
                let operand = self.check(operand)?;
                let invalid = || CompileError::InvalidCast {
                    from: self.type_name(&operand.ty),
                    to: self.type_name(&to),
                    range,
                };

                let test = overload::type_test(self.catalog(), &to).ok_or_else(invalid)?;
                let ty = match mode {
                    TypeCheckMode::Is => Type::Bool,
                    TypeCheckMode::As if self.catalog().is_reference(&to) => to.clone(),
                    TypeCheckMode::As => return Err(invalid()),
                };
                let constant = operand.constant;

                Ok(TypedNode {
                    expr: TypedExpr::TypeCheck {
                        operand: Box::new(operand),
                        test,
                        mode: *mode,
                    },
                    ty,
                    constant,
                    range,
                })
            }
            Expr::TypeOf(type_ref) => {
                let ty = self.resolver.resolve_type(type_ref)?;
                Ok(TypedNode::literal(Value::Type(ty), Type::Type, range))
            }
        }
    }

    fn check_literal(literal: &Literal, range: Range) -> TypedNode {
        let (value, ty) = match literal {
            Literal::Bool(b) => (Value::Bool(*b), Type::Bool),
            Literal::Int(n) => (Value::Int(*n), Type::Int),
            Literal::Float(n) => (Value::Float(*n), Type::Float),
            Literal::Double(n) => (Value::Double(*n), Type::Double),
            Literal::String(s) => (Value::from(s.as_str()), Type::String),
            Literal::Null => (Value::Null, Type::Null),
        };

        TypedNode::literal(value, ty, range)
    }

    fn check_binary(
        &self,
        op: BinaryOp,
        left: TypedNode,
        right: TypedNode,
        range: Range,
    ) -> Result<TypedNode, CompileError> {
        let constant = left.constant && right.constant;

        if op.is_logical() {
            let strategy = LogicalStrategy::of(left.ty == Type::Bool, right.ty == Type::Bool);
            trace!(op = op.name(), ?strategy, "Selected logical strategy");

            return Ok(TypedNode {
                expr: TypedExpr::Logical {
                    op,
                    strategy,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                ty: Type::Bool,
                constant,
                range,
            });
        }

        match overload::resolve_binary(self.catalog(), op, &left.ty, &right.ty) {
            Ok(choice) => Ok(TypedNode {
                expr: TypedExpr::Binary {
                    op: choice.imp,
                    left: Box::new(left.convert(choice.left.0, choice.left.1)),
                    right: Box::new(right.convert(choice.right.0, choice.right.1)),
                },
                ty: choice.ret,
                constant,
                range,
            }),
            Err(OverloadError::Missing) => Err(CompileError::MissingOperator {
                op,
                left: self.type_name(&left.ty),
                right: self.type_name(&right.ty),
                range,
            }),
            Err(OverloadError::Ambiguous(count)) => Err(CompileError::AmbiguousOverload {
                name: format!("operator {}", op),
                count,
                range,
            }),
        }
    }

    /// Brings both branches of a ternary to one type.
    fn unify(
        &self,
        when_true: TypedNode,
        when_false: TypedNode,
    ) -> Result<(TypedNode, TypedNode, Type), CompileError> {
        if when_true.ty == when_false.ty {
            let ty = when_true.ty.clone();
            return Ok((when_true, when_false, ty));
        }

        let to_true = overload::implicit_conversion(self.catalog(), &when_false.ty, &when_true.ty);
        let to_false = overload::implicit_conversion(self.catalog(), &when_true.ty, &when_false.ty);

        match (to_true, to_false) {
            (Some((true_cost, conversion)), to_false)
                if to_false.as_ref().is_none_or(|(false_cost, _)| true_cost <= *false_cost) =>
            {
                let ty = when_true.ty.clone();
                let when_false = when_false.convert(conversion, ty.clone());
                Ok((when_true, when_false, ty))
            }
            (_, Some((_, conversion))) => {
                let ty = when_false.ty.clone();
                let when_true = when_true.convert(conversion, ty.clone());
                Ok((when_true, when_false, ty))
            }
            _ => Err(CompileError::InvalidConversion {
                from: self.type_name(&when_false.ty),
                to: self.type_name(&when_true.ty),
                range: when_false.range,
            }),
        }
    }

    fn check_index(&self, target: &Node, index: &Node, range: Range) -> Result<TypedNode, CompileError> {
        let target = self.check(target)?;
        let index = self.check(index)?;
        let invalid_target = |expected: &Type, index: &TypedNode| CompileError::InvalidTargetType {
            expected: self.type_name(expected),
            actual: self.type_name(&index.ty),
            range: index.range,
        };

        let (container, index, ty) = match &target.ty {
            Type::Array(element) | Type::List(element) => {
                let container = match target.ty {
                    Type::Array(_) => ContainerKind::Array,
                    _ => ContainerKind::List,
                };
                let index = if index.ty == Type::Int {
                    index
                } else {
                    let error = invalid_target(&Type::Int, &index);
                    self.narrow_constant(index, NumericKind::Int).ok_or(error)?
                };
                (container, index, (**element).clone())
            }
            Type::Dict(key, value) => {
                match overload::implicit_conversion(self.catalog(), &index.ty, key) {
                    Some((_, conversion)) => (
                        ContainerKind::Dict,
                        index.convert(conversion, (**key).clone()),
                        (**value).clone(),
                    ),
                    None => return Err(invalid_target(&**key, &index)),
                }
            }
            other => {
                return Err(CompileError::NotIndexable {
                    type_name: self.type_name(other),
                    range: target.range,
                });
            }
        };

        let constant = target.constant && index.constant;
        Ok(TypedNode {
            expr: TypedExpr::Index {
                target: Box::new(target),
                index: Box::new(index),
                container,
            },
            ty,
            constant,
            range,
        })
    }

    fn check_args(&self, args: &Args) -> Result<Vec<TypedNode>, CompileError> {
        args.iter().map(|arg| self.check(arg)).collect()
    }

    fn check_call(&self, callee: &Node, args: &Args, range: Range) -> Result<TypedNode, CompileError> {
        let name = match &*callee.expr {
            Expr::Ident(ident, type_args) if type_args.is_empty() => ident.name.clone(),
            _ => {
                return Err(CompileError::NotCallable {
                    name: callee
                        .dotted_path()
                        .map(|path| path.iter().map(|(name, _)| name).join("."))
                        .unwrap_or_else(|| "expression".to_string()),
                    range: callee.range,
                });
            }
        };

        let Some(forms) = self.resolver.options().find_method_group(&name) else {
            return Err(match self.classify(callee) {
                Err(error) => error,
                Ok(_) => CompileError::NotCallable {
                    name: name.to_string(),
                    range: callee.range,
                },
            });
        };

        let args = self.check_args(args)?;
        let arg_types = args.iter().map(|arg| arg.ty.clone()).collect_vec();

        match overload::resolve_method(self.catalog(), forms, &arg_types) {
            Ok(choice) => {
                let (func, ret) = choice.target;
                trace!(name = %name, "Selected alias method form");
                Ok(Self::call_node(func.clone(), args, choice.conversions, ret.clone(), range))
            }
            Err(OverloadError::Missing) => Err(CompileError::UnresolvedMethod {
                name: name.to_string(),
                arguments: arg_types.iter().map(|ty| self.type_name(ty)).collect(),
                range,
            }),
            Err(OverloadError::Ambiguous(count)) => Err(CompileError::AmbiguousOverload {
                name: name.to_string(),
                count,
                range,
            }),
        }
    }

    fn call_node(
        func: NativeFn,
        args: Vec<TypedNode>,
        conversions: Vec<(Conversion, Type)>,
        ty: Type,
        range: Range,
    ) -> TypedNode {
        let args = args
            .into_iter()
            .zip(conversions)
            .map(|(arg, (conversion, param))| arg.convert(conversion, param))
            .collect_vec();
        let constant = args.iter().all(|arg| arg.constant);

        TypedNode {
            expr: TypedExpr::Call { func, args },
            ty,
            constant,
            range,
        }
    }

    fn check_new(&self, type_ref: &TypeRef, args: &Args, range: Range) -> Result<TypedNode, CompileError> {
        let ty = self.resolver.resolve_type(type_ref)?;
        let args = self.check_args(args)?;
        let arg_types = args.iter().map(|arg| arg.ty.clone()).collect_vec();
        let unresolved = || CompileError::UnresolvedConstructor {
            type_name: self.type_name(&ty),
            arguments: arg_types.iter().map(|ty| self.type_name(ty)).collect(),
            range,
        };

        match &ty {
            Type::List(_) if args.is_empty() => {
                Ok(TypedNode::literal(Value::list(Vec::new()), ty.clone(), range))
            }
            Type::Dict(_, _) if args.is_empty() => {
                Ok(TypedNode::literal(Value::dict(Vec::new()), ty.clone(), range))
            }
            Type::Named(id, type_args)
                if matches!(self.catalog().get(*id).kind, TypeKind::Class | TypeKind::Struct) =>
            {
                match overload::resolve_constructor(self.catalog(), &ty, &arg_types) {
                    Ok(choice) => {
                        let supplied = args.len();
                        let mut node =
                            Self::call_node(choice.target.func.clone(), args, choice.conversions, ty.clone(), range);
                        if let TypedExpr::Call { args, .. } = &mut node.expr {
                            args.extend(choice.target.params[supplied..].iter().map(|param| {
                                TypedNode::literal(
                                    param.default.clone().unwrap_or_default(),
                                    param.ty.substitute(type_args),
                                    range,
                                )
                            }));
                        }
                        Ok(node)
                    }
                    Err(OverloadError::Missing) if args.is_empty() && self.catalog().is_struct(&ty) => {
                        Ok(TypedNode::literal(self.catalog().default_value(&ty), ty.clone(), range))
                    }
                    Err(OverloadError::Missing) => Err(unresolved()),
                    Err(OverloadError::Ambiguous(count)) => Err(CompileError::AmbiguousOverload {
                        name: self.type_name(&ty),
                        count,
                        range,
                    }),
                }
            }
            _ => Err(unresolved()),
        }
    }
}
