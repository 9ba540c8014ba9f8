//! Checks binding expressions against a type catalog described in JSON and
//! optionally evaluates them against a JSON context instance.
mod data;
mod error;
mod schema;

use std::fmt::{self, Display, Formatter};

use smol_str::SmolStr;
use tracing::debug;
use uiexpr_lang::{CompileOptions, Engine, Options, Type, TypeKind, Value};

pub use data::{from_json, to_json};
pub use error::Error;
pub use schema::{CatalogSchema, KindSchema, MemberSchema, ParamSchema, TypeSchema};

/// A loaded catalog, the context type expressions are compiled against and
/// the namespace imports in effect.
#[derive(Clone)]
pub struct Session {
    engine: Engine,
    context: Type,
    imports: CompileOptions,
}

/// Result of checking one expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub source: String,
    pub yielded_type: String,
    pub constant: bool,
    /// Present when the expression is constant or a context instance was
    /// supplied.
    pub value: Option<serde_json::Value>,
}

impl Display for Outcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source, self.yielded_type)?;
        if self.constant {
            write!(f, " (constant)")?;
        }
        match &self.value {
            Some(value) => write!(f, " = {}", value),
            None => Ok(()),
        }
    }
}

impl Session {
    /// Loads `catalog_json` and resolves `context` either by full name or
    /// through `namespaces`, which also become the expression imports.
    pub fn load(
        catalog_json: &str,
        context: &str,
        namespaces: &[String],
        options: Options,
    ) -> Result<Self, Error> {
        let catalog = CatalogSchema::from_json(catalog_json)?.build()?;
        let id = std::iter::once(context.to_string())
            .chain(namespaces.iter().map(|ns| format!("{}.{}", ns, context)))
            .find_map(|name| catalog.find(&name, 0))
            .filter(|id| matches!(catalog.get(*id).kind, TypeKind::Class | TypeKind::Struct))
            .ok_or_else(|| Error::InvalidContext(SmolStr::new(context)))?;

        debug!(context = %catalog.full_name(id), ?namespaces, "Resolved context type");

        let imports = namespaces
            .iter()
            .fold(CompileOptions::new(), |options, ns| options.namespace(ns));

        Ok(Self {
            engine: Engine::new(catalog).with_options(options),
            context: Type::named(id),
            imports,
        })
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn context(&self) -> &Type {
        &self.context
    }

    /// Builds a context instance from a JSON document.
    pub fn instance(&self, data_json: &str) -> Result<Value, Error> {
        let json: serde_json::Value =
            serde_json::from_str(data_json).map_err(|e| Error::from_json(data_json, e))?;
        from_json(self.engine.catalog(), &self.context, &json, "$")
    }

    /// Compiles `code`. Constant expressions are always evaluated; others only
    /// when `instance` is given.
    #[allow(clippy::result_large_err)]
    pub fn check(
        &self,
        code: &str,
        instance: Option<&Value>,
    ) -> Result<Outcome, uiexpr_lang::Error> {
        let compiled = self.engine.compile(code, &self.context, &self.imports)?;
        let catalog = self.engine.catalog();

        let value = match instance {
            Some(instance) => Some(compiled.evaluate(instance)),
            None if compiled.is_constant() => Some(compiled.evaluate(&Value::Null)),
            None => None,
        };

        Ok(Outcome {
            source: code.to_string(),
            yielded_type: catalog.type_name(compiled.yielded_type()),
            constant: compiled.is_constant(),
            value: value.map(|value| to_json(catalog, &value)),
        })
    }
}
