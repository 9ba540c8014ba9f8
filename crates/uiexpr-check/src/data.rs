//! Conversion between JSON documents and runtime values.
use itertools::Itertools;
use serde_json::{Map, Number};
use tracing::warn;
use uiexpr_lang::{DictKey, Record, Type, TypeCatalog, TypeId, TypeKind, Value};

use crate::error::Error;

/// Converts `json` into a value of the static type `ty`. `path` is used in
/// error messages.
pub fn from_json(
    catalog: &TypeCatalog,
    ty: &Type,
    json: &serde_json::Value,
    path: &str,
) -> Result<Value, Error> {
    let mismatch = || Error::InvalidData {
        path: path.to_string(),
        expected: catalog.type_name(ty),
        found: json_kind(json),
    };

    match (ty, json) {
        (_, serde_json::Value::Null) => Ok(catalog.default_value(ty)),
        (Type::Bool, serde_json::Value::Bool(b)) => Ok(Value::Bool(*b)),
        (Type::Int, serde_json::Value::Number(n)) => n
            .as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .map(Value::Int)
            .ok_or_else(mismatch),
        (Type::Float, serde_json::Value::Number(n)) => {
            n.as_f64().map(|n| Value::Float(n as f32)).ok_or_else(mismatch)
        }
        (Type::Double, serde_json::Value::Number(n)) => {
            n.as_f64().map(Value::Double).ok_or_else(mismatch)
        }
        (Type::String, serde_json::Value::String(s)) => Ok(Value::from(s.as_str())),
        (Type::Object | Type::Param(_), json) => untyped(json).ok_or_else(mismatch),
        (Type::Array(element), serde_json::Value::Array(items)) => {
            Ok(Value::array(elements(catalog, element, items, path)?))
        }
        (Type::List(element), serde_json::Value::Array(items)) => {
            Ok(Value::list(elements(catalog, element, items, path)?))
        }
        (Type::Dict(key, value), serde_json::Value::Object(entries)) => {
            let entries = entries
                .iter()
                .map(|(name, item)| {
                    let key = dict_key(catalog, key, name).ok_or_else(mismatch)?;
                    let value = from_json(catalog, value, item, &format!("{}.{}", path, name))?;
                    Ok((key, value))
                })
                .collect::<Result<Vec<_>, Error>>()?;
            Ok(Value::dict(entries))
        }
        (Type::Named(id, args), json) => {
            let def = catalog.get(*id);
            match (def.kind, json) {
                (TypeKind::Enum, serde_json::Value::String(name)) => {
                    catalog.enum_value(*id, name).ok_or_else(mismatch)
                }
                (TypeKind::Enum, serde_json::Value::Number(n)) => {
                    n.as_i64().map(|n| Value::Enum(*id, n)).ok_or_else(mismatch)
                }
                (TypeKind::Class | TypeKind::Struct, serde_json::Value::Object(members)) => {
                    record(catalog, *id, args, members, path)
                }
                _ => Err(mismatch()),
            }
        }
        _ => Err(mismatch()),
    }
}

fn elements(
    catalog: &TypeCatalog,
    element: &Type,
    items: &[serde_json::Value],
    path: &str,
) -> Result<Vec<Value>, Error> {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| from_json(catalog, element, item, &format!("{}[{}]", path, index)))
        .collect()
}

fn record(
    catalog: &TypeCatalog,
    id: TypeId,
    args: &[Type],
    members: &Map<String, serde_json::Value>,
    path: &str,
) -> Result<Value, Error> {
    let def = catalog.get(id);

    for name in members.keys() {
        if catalog.field(id, name).is_none() {
            warn!(type_name = %catalog.full_name(id), field = %name, "Ignoring unknown field");
        }
    }

    let fields = def
        .fields
        .iter()
        .map(|field| {
            let ty = field.ty.substitute(args);
            match members.get(field.name.as_str()) {
                Some(json) => from_json(catalog, &ty, json, &format!("{}.{}", path, field.name)),
                None => Ok(catalog.default_value(&ty)),
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Value::from(Record {
        type_id: id,
        fields,
    }))
}

fn dict_key(catalog: &TypeCatalog, ty: &Type, name: &str) -> Option<DictKey> {
    match ty {
        Type::String | Type::Object => Some(DictKey::from(name)),
        Type::Int => name.parse::<i32>().ok().map(DictKey::Int),
        Type::Bool => name.parse::<bool>().ok().map(DictKey::Bool),
        Type::Named(id, _) => catalog
            .get(*id)
            .variant(name)
            .map(|value| DictKey::Enum(*id, value)),
        _ => None,
    }
}

/// Values stored in `object` slots keep the shape JSON gives them.
fn untyped(json: &serde_json::Value) -> Option<Value> {
    match json {
        serde_json::Value::Null => Some(Value::Null),
        serde_json::Value::Bool(b) => Some(Value::Bool(*b)),
        serde_json::Value::Number(n) => n
            .as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .map(Value::Int)
            .or_else(|| n.as_f64().map(Value::Double)),
        serde_json::Value::String(s) => Some(Value::from(s.as_str())),
        serde_json::Value::Array(items) => items
            .iter()
            .map(untyped)
            .collect::<Option<Vec<_>>>()
            .map(Value::list),
        serde_json::Value::Object(_) => None,
    }
}

fn json_kind(json: &serde_json::Value) -> &'static str {
    match json {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a bool",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

/// Renders an evaluated value as JSON. Records become objects keyed by field
/// name and enums become their variant name.
pub fn to_json(catalog: &TypeCatalog, value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(n) => serde_json::Value::from(*n),
        Value::Float(n) => float(f64::from(*n)),
        Value::Double(n) => float(*n),
        Value::String(s) => serde_json::Value::String(s.to_string()),
        Value::Array(items) | Value::List(items) => {
            serde_json::Value::Array(items.iter().map(|item| to_json(catalog, item)).collect())
        }
        Value::Dict(entries) => serde_json::Value::Object(
            entries
                .iter()
                .map(|(key, value)| (dict_key_name(catalog, key), to_json(catalog, value)))
                .sorted_by(|(a, _), (b, _)| a.cmp(b))
                .collect(),
        ),
        Value::Record(record) => serde_json::Value::Object(
            catalog
                .get(record.type_id)
                .fields
                .iter()
                .zip(&record.fields)
                .map(|(field, value)| (field.name.to_string(), to_json(catalog, value)))
                .collect(),
        ),
        Value::Enum(id, n) => variant_name(catalog, *id, *n)
            .map(serde_json::Value::String)
            .unwrap_or_else(|| serde_json::Value::from(*n)),
        Value::Type(ty) => serde_json::Value::String(catalog.type_name(ty)),
    }
}

fn float(n: f64) -> serde_json::Value {
    Number::from_f64(n)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

fn variant_name(catalog: &TypeCatalog, id: TypeId, value: i64) -> Option<String> {
    catalog
        .get(id)
        .variants
        .iter()
        .find(|(_, n)| *n == value)
        .map(|(name, _)| name.to_string())
}

fn dict_key_name(catalog: &TypeCatalog, key: &DictKey) -> String {
    match key {
        DictKey::Enum(id, n) => variant_name(catalog, *id, *n).unwrap_or_else(|| n.to_string()),
        key => key.to_string(),
    }
}
