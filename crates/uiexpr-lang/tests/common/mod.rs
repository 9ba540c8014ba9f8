//! Shared catalog used by the integration tests.
#![allow(dead_code)]

use rstest::fixture;
use uiexpr_lang::{
    BinaryOp, CatalogBuilder, CompileOptions, CompiledExpression, Engine, Error, FromValue,
    ParamDef, Record, RecordBuilder, Type, TypeId, TypeKind, UnaryOp, Value,
};

pub struct Fixture {
    pub engine: Engine,
    pub context: Type,
    pub test_context: TypeId,
    pub vector3: TypeId,
    pub label: TypeId,
    pub test_enum: TypeId,
    pub base: TypeId,
    pub derived: TypeId,
}

impl Fixture {
    /// Imports used by most tests.
    pub fn imports(&self) -> CompileOptions {
        CompileOptions::new().namespace("Game").namespace("UnityEngine")
    }

    pub fn compile(&self, code: &str) -> Result<CompiledExpression, Error> {
        self.engine.compile(code, &self.context, &self.imports())
    }

    pub fn compile_with(
        &self,
        code: &str,
        options: &CompileOptions,
    ) -> Result<CompiledExpression, Error> {
        self.engine.compile(code, &self.context, options)
    }

    pub fn eval(&self, code: &str, context: &Value) -> Value {
        self.compile(code).unwrap().evaluate(context)
    }

    pub fn instance(&self) -> RecordBuilder<'_> {
        self.engine.catalog().instance(self.test_context)
    }

    pub fn vector(&self, x: f32, y: f32, z: f32) -> Value {
        vector(self.vector3, [x, y, z])
    }

    pub fn vector_list(&self, len: usize) -> Value {
        Value::list(
            (0..len)
                .map(|i| self.vector(i as f32, 0.0, if i == 3 { 42.0 } else { 0.0 }))
                .collect(),
        )
    }

    pub fn error_code(&self, code: &str) -> String {
        use miette::Diagnostic;

        self.compile(code)
            .err()
            .and_then(|e| e.code().map(|c| c.to_string()))
            .unwrap_or_default()
    }
}

pub fn vector(type_id: TypeId, [x, y, z]: [f32; 3]) -> Value {
    Value::from(Record {
        type_id,
        fields: vec![Value::Float(x), Value::Float(y), Value::Float(z)],
    })
}

pub fn components(value: &Value) -> [f32; 3] {
    let field = |slot| {
        value
            .as_record()
            .and_then(|record| record.field(slot))
            .cloned()
            .map(f32::from_value)
            .unwrap_or_default()
    };
    [field(0), field(1), field(2)]
}

pub fn magnitude(value: &Value) -> f32 {
    let [x, y, z] = components(value);
    (x * x + y * y + z * z).sqrt()
}

pub fn subtract_vectors(type_id: TypeId, args: &[Value]) -> Value {
    let [ax, ay, az] = components(&args[0]);
    let [bx, by, bz] = components(&args[1]);
    vector(type_id, [ax - bx, ay - by, az - bz])
}

/// Equal when the squared distance is below 1e-10.
pub fn vectors_equal(args: &[Value]) -> Value {
    let [ax, ay, az] = components(&args[0]);
    let [bx, by, bz] = components(&args[1]);
    let (dx, dy, dz) = (ax - bx, ay - by, az - bz);
    Value::Bool(dx * dx + dy * dy + dz * dz < 1e-10)
}

pub fn vectors_not_equal(args: &[Value]) -> Value {
    Value::Bool(vectors_equal(args) == Value::Bool(false))
}

pub fn longer_vector(args: &[Value]) -> Value {
    Value::Bool(magnitude(&args[0]) > magnitude(&args[1]))
}

pub fn shorter_vector(args: &[Value]) -> Value {
    Value::Bool(magnitude(&args[0]) < magnitude(&args[1]))
}

/// `!context` holds for a missing context or one whose `intValue` is zero.
pub fn context_is_empty(args: &[Value]) -> Value {
    let int_value = args[0].as_record().and_then(|record| record.field(0)).cloned();
    Value::Bool(matches!(int_value, None | Some(Value::Int(0))))
}

#[fixture]
pub fn fixture() -> Fixture {
    let mut builder = CatalogBuilder::new();

    let vector3 = builder.declare_struct("UnityEngine", "Vector3");
    let label = builder.declare_struct("Game", "Label");
    let test_context = builder.declare_class("Game", "TestContext");
    let test_enum = builder.declare_enum("Game", "TestEnum");
    let constants = builder.declare_static("Game", "Constants");
    let base = builder.declare_class("Game", "Base");
    let derived = builder.declare_class("Game", "Derived");
    let boxed = builder.declare_generic("Game", "Box", TypeKind::Class, 1);
    let inner = builder.declare_nested(boxed, "Inner", TypeKind::Struct, 1);
    let nested = builder.declare_nested(test_context, "Nested", TypeKind::Static, 0);
    builder.declare_class("Other", "TestEnum");

    let vector_ty = Type::named(vector3);
    let label_ty = Type::named(label);
    let context_ty = Type::named(test_context);

    builder
        .def(vector3)
        .field("x", Type::Float)
        .field("y", Type::Float)
        .field("z", Type::Float)
        .property("magnitude", Type::Float, |value| Value::Float(magnitude(value)))
        .static_value("one", vector_ty.clone(), vector(vector3, [1.0, 1.0, 1.0]))
        .constructor(
            vec![
                ParamDef::new("x", Type::Float),
                ParamDef::new("y", Type::Float),
                ParamDef::optional("z", Type::Float, Value::Float(0.0)),
            ],
            move |args| Value::from(Record {
                type_id: vector3,
                fields: args.to_vec(),
            }),
        )
        .binary_operator(
            BinaryOp::Add,
            vector_ty.clone(),
            vector_ty.clone(),
            vector_ty.clone(),
            move |args| {
                let [ax, ay, az] = components(&args[0]);
                let [bx, by, bz] = components(&args[1]);
                vector(vector3, [ax + bx, ay + by, az + bz])
            },
        )
        .binary_operator(
            BinaryOp::Mul,
            vector_ty.clone(),
            Type::Float,
            vector_ty.clone(),
            move |args| {
                let [x, y, z] = components(&args[0]);
                let k = f32::from_value(args[1].clone());
                vector(vector3, [x * k, y * k, z * k])
            },
        )
        .binary_operator(
            BinaryOp::Sub,
            vector_ty.clone(),
            vector_ty.clone(),
            vector_ty.clone(),
            move |args| subtract_vectors(vector3, args),
        )
        .binary_operator(BinaryOp::Eq, vector_ty.clone(), vector_ty.clone(), Type::Bool, vectors_equal)
        .binary_operator(BinaryOp::Ne, vector_ty.clone(), vector_ty.clone(), Type::Bool, vectors_not_equal)
        .binary_operator(BinaryOp::Gt, vector_ty.clone(), vector_ty.clone(), Type::Bool, longer_vector)
        .binary_operator(BinaryOp::Lt, vector_ty.clone(), vector_ty.clone(), Type::Bool, shorter_vector)
        .unary_operator(UnaryOp::Minus, vector_ty.clone(), vector_ty.clone(), move |args| {
            let [x, y, z] = components(&args[0]);
            vector(vector3, [-x, -y, -z])
        });

    builder
        .def(label)
        .field("text", Type::String)
        .implicit_conversion(Type::String, label_ty.clone(), move |value| {
            Value::from(Record {
                type_id: label,
                fields: vec![value.clone()],
            })
        })
        .explicit_conversion(label_ty.clone(), Type::Int, |value| {
            let text = value
                .as_record()
                .and_then(|record| record.field(0))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            Value::Int(text.chars().count() as i32)
        });

    builder
        .def(test_context)
        .field("intValue", Type::Int)
        .field("floatValue", Type::Float)
        .field("doubleValue", Type::Double)
        .field("stringValue", Type::String)
        .field("boolValue", Type::Bool)
        .field("position", vector_ty.clone())
        .field("child", context_ty.clone())
        .field("vec3List", Type::list(vector_ty.clone()))
        .field("intArray", Type::array(Type::Int))
        .field("lookup", Type::dict(Type::String, Type::Int))
        .field("enumValue", Type::named(test_enum))
        .field("label", label_ty.clone())
        .field("item", Type::Object)
        .unary_operator(UnaryOp::Not, context_ty.clone(), Type::Bool, context_is_empty)
        .property("title", Type::String, |value| {
            let name = value
                .as_record()
                .and_then(|record| record.field(3))
                .cloned()
                .unwrap_or_default();
            Value::from(format!("<{}>", name))
        });

    builder
        .def(test_enum)
        .variant("Zero", 0)
        .variant("One", 1)
        .variant("Two", 2);

    builder
        .def(constants)
        .static_value("Answer", Type::Int, Value::Int(42))
        .static_value("Greeting", Type::String, Value::from("hello"))
        .static_getter("Computed", Type::Double, || Value::Double(0.5));

    builder.def(base).field("id", Type::Int);
    builder.def(derived).base(base).field("extra", Type::String);

    builder.def(boxed).field("item", Type::Param(0));
    builder.def(inner).static_value("Answer", Type::Int, Value::Int(7));
    builder.def(nested).static_value("Depth", Type::Int, Value::Int(2));

    Fixture {
        engine: Engine::new(builder.build().unwrap()),
        context: context_ty,
        test_context,
        vector3,
        label,
        test_enum,
        base,
        derived,
    }
}
