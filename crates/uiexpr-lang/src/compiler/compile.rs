//! Main compilation logic for lowering typed nodes to compiled expressions.

use std::cmp::Ordering;
use std::ops::{Add, Div, Mul, Rem, Sub};

use smallvec::SmallVec;

use super::compiled::CompiledExpr;
use super::constant_fold::ConstantFolder;
use crate::ast::{BinaryOp, TypeCheckMode};
use crate::catalog::{NumericKind, Type, TypeCatalog};
use crate::checker::typed::{
    BinaryImpl, ContainerKind, Conversion, LogicalStrategy, TypedExpr, TypedNode, UnaryImpl,
};
use crate::number::Number;
use crate::value::{DictKey, Value};

type TruthTest = Box<dyn Fn(&Value) -> bool + Send + Sync>;

/// Compiler for transforming typed nodes into compiled closures.
///
/// Every closure is built once per compile; evaluation only walks the
/// closures, never the tree.
#[derive(Debug, Clone)]
pub struct Compiler<'a> {
    /// Catalog used for default values and reference-type checks
    catalog: &'a TypeCatalog,
    /// Constant folder for compile-time optimizations
    constant_folder: ConstantFolder,
}

impl<'a> Compiler<'a> {
    /// Creates a new compiler.
    ///
    /// # Arguments
    ///
    /// * `catalog` - The catalog the typed tree was checked against
    /// * `constant_folding` - Whether constant subtrees are evaluated at compile time
    pub fn new(catalog: &'a TypeCatalog, constant_folding: bool) -> Self {
        Self {
            catalog,
            constant_folder: ConstantFolder::new(constant_folding),
        }
    }

    /// Compiles a typed node into a compiled expression.
    ///
    /// # Arguments
    ///
    /// * `node` - The root of a checked expression
    ///
    /// # Returns
    ///
    /// A `CompiledExpr` that evaluates the node against a context instance.
    pub fn compile(&self, node: &TypedNode) -> CompiledExpr {
        self.compile_node(node)
    }

    fn compile_node(&self, node: &TypedNode) -> CompiledExpr {
        if let TypedExpr::Literal(value) = &node.expr {
            return self.constant_folder.fold_literal(value);
        }

        let compiled = self.compile_expr(node);

        if node.constant && self.constant_folder.is_enabled() {
            return self.constant_folder.fold(compiled);
        }

        compiled
    }

    fn compile_expr(&self, node: &TypedNode) -> CompiledExpr {
        let default = self.catalog.default_value(&node.ty);

        match &node.expr {
            TypedExpr::Literal(value) => self.constant_folder.fold_literal(value),
            TypedExpr::Context => Box::new(|ctx| ctx.clone()),
            TypedExpr::Field { target, slot } => {
                let slot = *slot;
                self.guarded_access(target, default, move |value| {
                    value.as_record().and_then(|record| record.field(slot)).cloned()
                })
            }
            TypedExpr::Property { target, getter } => {
                let getter = getter.clone();
                self.guarded_access(target, default, move |value| Some(getter(value)))
            }
            TypedExpr::Intrinsic { target, .. } => {
                self.guarded_access(target, default, |value| Some(Value::Int(value.len() as i32)))
            }
            TypedExpr::Static(value) => {
                let value = value.clone();
                Box::new(move |_| value.get())
            }
            TypedExpr::Index {
                target,
                index,
                container,
            } => self.compile_index(target, index, *container, default),
            TypedExpr::Unary { op, operand } => self.compile_unary(op, operand, default),
            TypedExpr::Binary { op, left, right } => self.compile_binary(op, left, right),
            TypedExpr::Logical {
                op,
                strategy,
                left,
                right,
            } => self.compile_logical(*op, *strategy, left, right),
            TypedExpr::Ternary {
                condition,
                when_true,
                when_false,
            } => {
                let truthy = self.truth_test(&condition.ty);
                let condition = self.compile_node(condition);
                let when_true = self.compile_node(when_true);
                let when_false = self.compile_node(when_false);

                Box::new(move |ctx| {
                    if truthy(&condition(ctx)) {
                        when_true(ctx)
                    } else {
                        when_false(ctx)
                    }
                })
            }
            TypedExpr::Call { func, args } => {
                let func = func.clone();
                let args = args.iter().map(|arg| self.compile_node(arg)).collect::<Vec<_>>();

                Box::new(move |ctx| {
                    let values = args.iter().map(|arg| arg(ctx)).collect::<SmallVec<[Value; 4]>>();
                    func(values.as_slice())
                })
            }
            TypedExpr::Convert {
                conversion,
                operand,
            } => {
                let conversion = conversion.clone();
                let operand = self.compile_node(operand);
                Box::new(move |ctx| convert(&conversion, operand(ctx), &default))
            }
            TypedExpr::TypeCheck {
                operand,
                test,
                mode,
            } => {
                let test = test.clone();
                let operand = self.compile_node(operand);

                match mode {
                    TypeCheckMode::Is => Box::new(move |ctx| Value::Bool(test.matches(&operand(ctx)))),
                    TypeCheckMode::As => Box::new(move |ctx| {
                        let value = operand(ctx);
                        if test.matches(&value) { value } else { Value::Null }
                    }),
                }
            }
        }
    }

    /// Reads a member of `target`. Reference-typed targets get an explicit
    /// null guard; any missing link yields `default`.
    fn guarded_access(
        &self,
        target: &TypedNode,
        default: Value,
        access: impl Fn(&Value) -> Option<Value> + Send + Sync + 'static,
    ) -> CompiledExpr {
        let target_expr = self.compile_node(target);

        if self.catalog.is_reference(&target.ty) {
            Box::new(move |ctx| {
                let value = target_expr(ctx);
                if value.is_null() {
                    return default.clone();
                }
                access(&value).unwrap_or_else(|| default.clone())
            })
        } else {
            Box::new(move |ctx| access(&target_expr(ctx)).unwrap_or_else(|| default.clone()))
        }
    }

    fn compile_index(
        &self,
        target: &TypedNode,
        index: &TypedNode,
        container: ContainerKind,
        default: Value,
    ) -> CompiledExpr {
        let target = self.compile_node(target);
        let index = self.compile_node(index);
        let lookup: fn(&Value, &Value) -> Option<Value> = match container {
            ContainerKind::Array | ContainerKind::List => list_lookup,
            ContainerKind::Dict => dict_lookup,
        };

        Box::new(move |ctx| {
            let container = target(ctx);
            if container.is_null() {
                return default.clone();
            }
            lookup(&container, &index(ctx)).unwrap_or_else(|| default.clone())
        })
    }

    fn compile_unary(&self, op: &UnaryImpl, operand: &TypedNode, default: Value) -> CompiledExpr {
        let operand = self.compile_node(operand);

        match op {
            UnaryImpl::Not => Box::new(move |ctx| Value::Bool(!operand(ctx).as_bool())),
            UnaryImpl::StringNot => Box::new(move |ctx| {
                Value::Bool(match operand(ctx) {
                    Value::String(s) => s.is_empty(),
                    value => value.is_null(),
                })
            }),
            UnaryImpl::ObjectNot => Box::new(move |ctx| Value::Bool(operand(ctx).is_null())),
            UnaryImpl::Negate(kind) => {
                let kind = *kind;
                Box::new(move |ctx| {
                    Number::from_value(&operand(ctx))
                        .map(|n| (-n.cast(kind)).into())
                        .unwrap_or_else(|| default.clone())
                })
            }
            UnaryImpl::BitwiseNot => Box::new(move |ctx| {
                Number::from_value(&operand(ctx))
                    .unwrap_or_default()
                    .bit_not()
                    .into()
            }),
            UnaryImpl::User(func) => {
                let func = func.clone();
                Box::new(move |ctx| func(&[operand(ctx)]))
            }
        }
    }

    fn compile_binary(&self, op: &BinaryImpl, left: &TypedNode, right: &TypedNode) -> CompiledExpr {
        let left = self.compile_node(left);
        let right = self.compile_node(right);

        match op {
            BinaryImpl::Numeric(op, kind) => {
                let apply = arithmetic(*op);
                let kind = *kind;
                Box::new(move |ctx| {
                    let a = operand_number(&left(ctx), kind);
                    let b = operand_number(&right(ctx), kind);
                    apply(a, b).cast(kind).into()
                })
            }
            BinaryImpl::Compare(op, kind) => {
                let op = *op;
                let kind = *kind;
                Box::new(move |ctx| {
                    let a = operand_number(&left(ctx), kind);
                    let b = operand_number(&right(ctx), kind);
                    Value::Bool(compare(op, a.partial_cmp(&b)))
                })
            }
            BinaryImpl::Concat => {
                Box::new(move |ctx| Value::from(format!("{}{}", left(ctx), right(ctx))))
            }
            BinaryImpl::ValueEquality { negate } => {
                let negate = *negate;
                Box::new(move |ctx| Value::Bool((left(ctx) == right(ctx)) != negate))
            }
            BinaryImpl::RefEquality { negate } => {
                let negate = *negate;
                Box::new(move |ctx| Value::Bool(left(ctx).ref_eq(&right(ctx)) != negate))
            }
            BinaryImpl::BoolBitwise(op) => {
                let is_and = *op == BinaryOp::BitAnd;
                Box::new(move |ctx| {
                    let a = left(ctx).as_bool();
                    let b = right(ctx).as_bool();
                    Value::Bool(if is_and { a & b } else { a | b })
                })
            }
            BinaryImpl::User(func) => {
                let func = func.clone();
                Box::new(move |ctx| func(&[left(ctx), right(ctx)]))
            }
        }
    }

    /// Truthiness of a non-boolean operand of static type `ty`. A struct is
    /// falsy when it equals its default value.
    fn truth_test(&self, ty: &Type) -> TruthTest {
        if self.catalog.is_struct(ty) {
            let default = self.catalog.default_value(ty);
            Box::new(move |value| !value.is_null() && *value != default)
        } else {
            Box::new(Value::is_truthy)
        }
    }

    /// `&&` and `||` with one closure shape per operand-type combination.
    /// The right operand is evaluated only when the left does not decide.
    fn compile_logical(
        &self,
        op: BinaryOp,
        strategy: LogicalStrategy,
        left: &TypedNode,
        right: &TypedNode,
    ) -> CompiledExpr {
        let left_truthy = self.truth_test(&left.ty);
        let right_truthy = self.truth_test(&right.ty);
        let left = self.compile_node(left);
        let right = self.compile_node(right);
        // `&&` stops on false, `||` stops on true.
        let stop_on = op == BinaryOp::Or;

        match strategy {
            LogicalStrategy::BoolBool => Box::new(move |ctx| {
                let l = left(ctx).as_bool();
                Value::Bool(if l == stop_on { l } else { right(ctx).as_bool() })
            }),
            LogicalStrategy::ObjectBool => Box::new(move |ctx| {
                let l = left_truthy(&left(ctx));
                Value::Bool(if l == stop_on { l } else { right(ctx).as_bool() })
            }),
            LogicalStrategy::BoolObject => Box::new(move |ctx| {
                let l = left(ctx).as_bool();
                Value::Bool(if l == stop_on { l } else { right_truthy(&right(ctx)) })
            }),
            LogicalStrategy::ObjectObject => Box::new(move |ctx| {
                let l = left_truthy(&left(ctx));
                let r = if l == stop_on { l } else { right_truthy(&right(ctx)) };
                Value::Bool(r)
            }),
        }
    }
}

fn list_lookup(container: &Value, index: &Value) -> Option<Value> {
    match (container, index.as_i32()) {
        (Value::Array(items) | Value::List(items), Some(index)) if index >= 0 => {
            items.get(index as usize).cloned()
        }
        _ => None,
    }
}

fn dict_lookup(container: &Value, key: &Value) -> Option<Value> {
    match container {
        Value::Dict(entries) => DictKey::from_value(key).and_then(|key| entries.get(&key).cloned()),
        _ => None,
    }
}

fn operand_number(value: &Value, kind: NumericKind) -> Number {
    Number::from_value(value)
        .unwrap_or(Number::zero(kind))
        .cast(kind)
}

fn arithmetic(op: BinaryOp) -> fn(Number, Number) -> Number {
    match op {
        BinaryOp::Add => Number::add,
        BinaryOp::Sub => Number::sub,
        BinaryOp::Mul => Number::mul,
        BinaryOp::Div => Number::div,
        BinaryOp::Mod => Number::rem,
        BinaryOp::ShiftLeft => Number::shift_left,
        BinaryOp::ShiftRight => Number::shift_right,
        BinaryOp::BitAnd => Number::bit_and,
        BinaryOp::BitOr => Number::bit_or,
        _ => |a, _| a,
    }
}

fn compare(op: BinaryOp, ordering: Option<Ordering>) -> bool {
    match op {
        BinaryOp::Eq => ordering == Some(Ordering::Equal),
        BinaryOp::Ne => ordering != Some(Ordering::Equal),
        BinaryOp::Lt => ordering == Some(Ordering::Less),
        BinaryOp::Lte => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
        BinaryOp::Gt => ordering == Some(Ordering::Greater),
        BinaryOp::Gte => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
        _ => false,
    }
}

fn convert(conversion: &Conversion, value: Value, default: &Value) -> Value {
    match conversion {
        Conversion::Identity => value,
        Conversion::Numeric(kind) => Number::from_value(&value)
            .unwrap_or(Number::zero(*kind))
            .cast(*kind)
            .into(),
        Conversion::User(func) => func(&value),
        Conversion::EnumToInt => Value::Int(value.as_i32().unwrap_or_default()),
        Conversion::IntToEnum(id) => Value::Enum(*id, value.as_i32().unwrap_or_default() as i64),
        Conversion::Checked(test) => {
            if test.matches(&value) {
                value
            } else {
                default.clone()
            }
        }
        Conversion::Chain(first, second) => convert(second, convert(first, value, default), default),
    }
}
