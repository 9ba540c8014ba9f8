//! JSON description of a type catalog.
//!
//! ```json
//! {
//!   "types": [
//!     { "namespace": "Game", "name": "Team", "kind": "enum",
//!       "variants": [{ "name": "Red", "value": 0 }, { "name": "Blue", "value": 1 }] },
//!     { "namespace": "Game", "name": "Player", "kind": "class",
//!       "fields": [{ "name": "health", "type": "int" }, { "name": "team", "type": "Game.Team" }] }
//!   ]
//! }
//! ```
//!
//! Types are declared in the order they appear. A nested type names its
//! enclosing type in `parent`, which must appear earlier in the list.
use std::sync::{OnceLock, Weak};

use serde::Deserialize;
use smol_str::SmolStr;
use tracing::debug;
use uiexpr_lang::{CatalogBuilder, ParamDef, Shared, Type, TypeCatalog, TypeId, TypeKind, Value};

use crate::error::Error;

#[derive(Debug, Deserialize)]
pub struct CatalogSchema {
    #[serde(default)]
    pub types: Vec<TypeSchema>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KindSchema {
    Class,
    Struct,
    Enum,
    Static,
}

impl From<KindSchema> for TypeKind {
    fn from(kind: KindSchema) -> Self {
        match kind {
            KindSchema::Class => TypeKind::Class,
            KindSchema::Struct => TypeKind::Struct,
            KindSchema::Enum => TypeKind::Enum,
            KindSchema::Static => TypeKind::Static,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeSchema {
    #[serde(default)]
    pub namespace: String,
    pub name: String,
    pub kind: KindSchema,
    /// Names of generic parameters, usable as field types.
    #[serde(default)]
    pub type_params: Vec<String>,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub base: Option<String>,
    #[serde(default)]
    pub fields: Vec<MemberSchema>,
    #[serde(default)]
    pub statics: Vec<StaticSchema>,
    #[serde(default)]
    pub variants: Vec<VariantSchema>,
    /// Each entry is one constructor; parameters initialize the field of the
    /// same name.
    #[serde(default)]
    pub constructors: Vec<Vec<ParamSchema>>,
}

#[derive(Debug, Deserialize)]
pub struct MemberSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

#[derive(Debug, Deserialize)]
pub struct StaticSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    pub value: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct VariantSchema {
    pub name: String,
    pub value: i64,
}

#[derive(Debug, Deserialize)]
pub struct ParamSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub default: Option<serde_json::Value>,
}

impl CatalogSchema {
    pub fn from_json(src: &str) -> Result<Self, Error> {
        serde_json::from_str(src).map_err(|e| Error::from_json(src, e))
    }

    /// Declares every type, defines their members and freezes the catalog.
    pub fn build(&self) -> Result<Shared<TypeCatalog>, Error> {
        let mut builder = CatalogBuilder::new();
        let catalog_ref: Shared<OnceLock<Weak<TypeCatalog>>> = Shared::new(OnceLock::new());

        let ids = self
            .types
            .iter()
            .map(|schema| schema.declare(&mut builder))
            .collect::<Result<Vec<_>, _>>()?;

        for (schema, id) in self.types.iter().zip(ids) {
            schema.define(&mut builder, id, &catalog_ref)?;
        }

        let catalog = Shared::new(builder.build()?);
        let _ = catalog_ref.set(Shared::downgrade(&catalog));
        debug!(types = catalog.len(), "Loaded catalog");

        Ok(catalog)
    }
}

impl TypeSchema {
    fn declare(&self, builder: &mut CatalogBuilder) -> Result<TypeId, Error> {
        let arity = self.type_params.len();

        match &self.parent {
            Some(parent) => {
                let parent_id = find_declared(builder, parent)?;
                Ok(builder.declare_nested(parent_id, &self.name, self.kind.into(), arity))
            }
            None if arity > 0 => Ok(builder.declare_generic(
                &self.namespace,
                &self.name,
                self.kind.into(),
                arity,
            )),
            None => Ok(match self.kind {
                KindSchema::Class => builder.declare_class(&self.namespace, &self.name),
                KindSchema::Struct => builder.declare_struct(&self.namespace, &self.name),
                KindSchema::Enum => builder.declare_enum(&self.namespace, &self.name),
                KindSchema::Static => builder.declare_static(&self.namespace, &self.name),
            }),
        }
    }

    fn define(
        &self,
        builder: &mut CatalogBuilder,
        id: TypeId,
        catalog_ref: &Shared<OnceLock<Weak<TypeCatalog>>>,
    ) -> Result<(), Error> {
        let base = self
            .base
            .as_deref()
            .map(|base| find_declared(builder, base))
            .transpose()?;
        let fields = self
            .fields
            .iter()
            .map(|field| Ok((field.name.as_str(), self.parse_type(builder, &field.ty)?)))
            .collect::<Result<Vec<_>, Error>>()?;
        let statics = self
            .statics
            .iter()
            .map(|member| {
                let ty = self.parse_type(builder, &member.ty)?;
                let value = literal(&member.name, &ty, &member.value)?;
                Ok((member.name.as_str(), ty, value))
            })
            .collect::<Result<Vec<_>, Error>>()?;
        let constructors = self
            .constructors
            .iter()
            .map(|params| {
                params
                    .iter()
                    .map(|param| {
                        let ty = self.parse_type(builder, &param.ty)?;
                        Ok(match &param.default {
                            Some(default) => {
                                let value = literal(&param.name, &ty, default)?;
                                ParamDef::optional(&param.name, ty, value)
                            }
                            None => ParamDef::new(&param.name, ty),
                        })
                    })
                    .collect::<Result<Vec<_>, Error>>()
            })
            .collect::<Result<Vec<_>, Error>>()?;

        let mut def = builder.def(id);
        if let Some(base) = base {
            def = def.base(base);
        }
        for (name, ty) in fields {
            def = def.field(name, ty);
        }
        for (name, ty, value) in statics {
            def = def.static_value(name, ty, value);
        }
        for variant in &self.variants {
            def = def.variant(&variant.name, variant.value);
        }
        for params in constructors {
            let names = params.iter().map(|param| param.name.clone()).collect::<Vec<_>>();
            let catalog_ref = Shared::clone(catalog_ref);

            def = def.constructor(params, move |args| {
                let Some(catalog) = catalog_ref.get().and_then(Weak::upgrade) else {
                    return Value::Null;
                };
                names
                    .iter()
                    .zip(args)
                    .fold(catalog.instance(id), |record, (name, value)| {
                        record.set(name, value.clone())
                    })
                    .build()
            });
        }

        Ok(())
    }

    /// Parses a type reference such as `int`, `List<Game.Item>`, `float[]` or
    /// one of this type's generic parameters.
    fn parse_type(&self, builder: &CatalogBuilder, text: &str) -> Result<Type, Error> {
        let text = text.trim();
        if let Some(element) = text.strip_suffix("[]") {
            return Ok(Type::array(self.parse_type(builder, element)?));
        }

        let (name, args) = match text.find('<') {
            Some(start) if text.ends_with('>') => (
                text[..start].trim(),
                split_type_args(&text[start + 1..text.len() - 1])
                    .ok_or_else(|| Error::MalformedType(SmolStr::new(text)))?,
            ),
            Some(_) => return Err(Error::MalformedType(SmolStr::new(text))),
            None => (text, Vec::new()),
        };
        let args = args
            .into_iter()
            .map(|arg| self.parse_type(builder, arg))
            .collect::<Result<Vec<_>, _>>()?;

        match (name, args.as_slice()) {
            ("bool", []) => Ok(Type::Bool),
            ("int", []) => Ok(Type::Int),
            ("float", []) => Ok(Type::Float),
            ("double", []) => Ok(Type::Double),
            ("string", []) => Ok(Type::String),
            ("object", []) => Ok(Type::Object),
            ("List", [element]) => Ok(Type::list(element.clone())),
            ("Dictionary", [key, value]) => Ok(Type::dict(key.clone(), value.clone())),
            ("", _) => Err(Error::MalformedType(SmolStr::new(text))),
            (name, []) => match self.type_params.iter().position(|param| param == name) {
                Some(index) => Ok(Type::Param(index as u8)),
                None => builder
                    .find(name, 0)
                    .map(Type::named)
                    .ok_or_else(|| Error::UnknownType(SmolStr::new(name))),
            },
            (name, args) => builder
                .find(name, args.len())
                .map(|id| Type::Named(id, args.to_vec()))
                .ok_or_else(|| Error::UnknownType(SmolStr::new(text))),
        }
    }
}

fn find_declared(builder: &CatalogBuilder, full_name: &str) -> Result<TypeId, Error> {
    builder
        .find(full_name, 0)
        .ok_or_else(|| Error::UnknownType(SmolStr::new(full_name)))
}

/// Splits `A, B<C, D>` at the top-level commas.
fn split_type_args(text: &str) -> Option<Vec<&str>> {
    let mut depth = 0usize;
    let mut start = 0;
    let mut args = Vec::new();

    for (index, c) in text.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.checked_sub(1)?,
            ',' if depth == 0 => {
                args.push(text[start..index].trim());
                start = index + 1;
            }
            _ => {}
        }
    }

    if depth != 0 {
        return None;
    }
    args.push(text[start..].trim());
    Some(args)
}

/// Converts a JSON scalar used as a static value or parameter default.
fn literal(name: &str, ty: &Type, value: &serde_json::Value) -> Result<Value, Error> {
    let unsupported = || Error::UnsupportedDefault(SmolStr::new(name));

    match (ty, value) {
        (_, serde_json::Value::Null) => Ok(Value::Null),
        (Type::Bool, serde_json::Value::Bool(b)) => Ok(Value::Bool(*b)),
        (Type::Int, serde_json::Value::Number(n)) => n
            .as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .map(Value::Int)
            .ok_or_else(unsupported),
        (Type::Float, serde_json::Value::Number(n)) => {
            n.as_f64().map(|n| Value::Float(n as f32)).ok_or_else(unsupported)
        }
        (Type::Double, serde_json::Value::Number(n)) => {
            n.as_f64().map(Value::Double).ok_or_else(unsupported)
        }
        (Type::String, serde_json::Value::String(s)) => Ok(Value::from(s.as_str())),
        _ => Err(unsupported()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::single("int", Some(vec!["int"]))]
    #[case::pair("string, int", Some(vec!["string", "int"]))]
    #[case::nested("List<int>, Dictionary<string, int>", Some(vec!["List<int>", "Dictionary<string, int>"]))]
    #[case::unbalanced("List<int", None)]
    #[case::extra_close("int>", None)]
    fn test_split_type_args(#[case] text: &str, #[case] expected: Option<Vec<&str>>) {
        assert_eq!(split_type_args(text), expected);
    }

    #[rstest]
    #[case::int(Type::Int, serde_json::json!(3), Some(Value::Int(3)))]
    #[case::float(Type::Float, serde_json::json!(1.5), Some(Value::Float(1.5)))]
    #[case::string(Type::String, serde_json::json!("a"), Some(Value::from("a")))]
    #[case::null(Type::String, serde_json::Value::Null, Some(Value::Null))]
    #[case::overflow(Type::Int, serde_json::json!(5_000_000_000i64), None)]
    #[case::mismatch(Type::Bool, serde_json::json!("true"), None)]
    fn test_literal(#[case] ty: Type, #[case] json: serde_json::Value, #[case] expected: Option<Value>) {
        assert_eq!(literal("p", &ty, &json).ok(), expected);
    }

    #[test]
    fn test_parse_types() {
        let schema = CatalogSchema::from_json(
            r#"{"types": [
                {"namespace": "Game", "name": "Item", "kind": "class"},
                {"namespace": "Game", "name": "Box", "kind": "class", "typeParams": ["T"],
                 "fields": [{"name": "item", "type": "T"}]}
            ]}"#,
        )
        .unwrap();
        let mut builder = CatalogBuilder::new();
        let item = schema.types[0].declare(&mut builder).unwrap();
        let boxed = schema.types[1].declare(&mut builder).unwrap();
        let ty = &schema.types[1];

        assert_eq!(ty.parse_type(&builder, "T").unwrap(), Type::Param(0));
        assert_eq!(
            ty.parse_type(&builder, "List<Game.Item>").unwrap(),
            Type::list(Type::named(item))
        );
        assert_eq!(
            ty.parse_type(&builder, "Game.Box<int>[]").unwrap(),
            Type::array(Type::Named(boxed, vec![Type::Int]))
        );
        assert_eq!(
            ty.parse_type(&builder, "Dictionary<string, float>").unwrap(),
            Type::dict(Type::String, Type::Float)
        );
        assert!(matches!(
            ty.parse_type(&builder, "Game.Missing"),
            Err(Error::UnknownType(_))
        ));
        assert!(matches!(
            ty.parse_type(&builder, "List<int"),
            Err(Error::MalformedType(_))
        ));
    }

    #[test]
    fn test_invalid_json_span() {
        let err = CatalogSchema::from_json("{\n  \"types\": [\n    oops\n  ]\n}").unwrap_err();
        match err {
            Error::InvalidJson { src, span, .. } => {
                assert!(span.offset() > 0 && span.offset() <= src.len())
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
