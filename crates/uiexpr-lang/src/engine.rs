use tracing::debug;

use crate::{
    CompileOptions, Shared, Token,
    ast::{Node, Parser},
    catalog::{Type, TypeCatalog},
    checker::{Checker, error::CompileError, typed::TypedNode},
    compiler::{self, CompiledExpression, Compiler, Expression},
    error::Error,
    lexer,
    resolver::Resolver,
    tokenize,
    value::{FromValue, Value},
};

#[derive(Debug, Clone)]
pub struct Options {
    /// Evaluate constant subtrees once at compile time.
    pub constant_folding: bool,
    /// Convert the natural result type to the requested one when an
    /// implicit conversion exists.
    pub allow_implicit_result_conversion: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            constant_folding: true,
            allow_implicit_result_conversion: true,
        }
    }
}

/// Compiles binding expressions against a frozen type catalog.
///
/// An engine holds no per-compile state, so one engine may serve any number
/// of contexts and option sets.
#[derive(Debug, Clone)]
pub struct Engine {
    catalog: Shared<TypeCatalog>,
    options: Options,
}

impl Engine {
    pub fn new(catalog: impl Into<Shared<TypeCatalog>>) -> Self {
        Self {
            catalog: catalog.into(),
            options: Options::default(),
        }
    }

    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    pub fn set_constant_folding(&mut self, constant_folding: bool) {
        self.options.constant_folding = constant_folding;
    }

    pub fn set_allow_implicit_result_conversion(&mut self, allow: bool) {
        self.options.allow_implicit_result_conversion = allow;
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn catalog(&self) -> &Shared<TypeCatalog> {
        &self.catalog
    }

    /// Parses `code` using the types visible from `context` to disambiguate
    /// casts and generic arguments.
    #[allow(clippy::result_large_err)]
    pub fn parse(
        &self,
        code: &str,
        context: &Type,
        options: &CompileOptions,
    ) -> Result<Shared<Node>, Error> {
        let resolver = Resolver::new(&self.catalog, Some(context), options);
        parse_with(code, &resolver)
    }

    /// Parses and type checks `code`, returning the typed tree.
    #[allow(clippy::result_large_err)]
    pub fn check(
        &self,
        code: &str,
        context: &Type,
        options: &CompileOptions,
    ) -> Result<TypedNode, Error> {
        self.check_in(code, Some(context), options)
    }

    /// Compiles `code` against `context`, yielding its natural type.
    #[allow(clippy::result_large_err)]
    pub fn compile(
        &self,
        code: &str,
        context: &Type,
        options: &CompileOptions,
    ) -> Result<CompiledExpression, Error> {
        debug!(
            source = code,
            context = %self.catalog.type_name(context),
            "Compiling expression"
        );

        let typed = self.check_in(code, Some(context), options)?;
        Ok(self.finish(code, typed))
    }

    /// Compiles `code` against `context`, converting the result to `target`.
    #[allow(clippy::result_large_err)]
    pub fn compile_with_target(
        &self,
        code: &str,
        context: &Type,
        target: &Type,
        options: &CompileOptions,
    ) -> Result<CompiledExpression, Error> {
        debug!(
            source = code,
            context = %self.catalog.type_name(context),
            target = %self.catalog.type_name(target),
            "Compiling expression"
        );

        let resolver = Resolver::new(&self.catalog, Some(context), options);
        let typed = self.check_with(code, &resolver)?;

        let typed = if &typed.ty == target {
            typed
        } else if self.options.allow_implicit_result_conversion {
            Checker::new(&resolver)
                .convert_to(typed, target)
                .map_err(|e| Error::from_error(code, e))?
        } else {
            return Err(Error::from_error(
                code,
                CompileError::InvalidConversion {
                    from: self.catalog.type_name(&typed.ty),
                    to: self.catalog.type_name(target),
                    range: typed.range,
                },
            ));
        };

        Ok(self.finish(code, typed))
    }

    /// Compiles `code` to an expression read as `T`.
    #[allow(clippy::result_large_err)]
    pub fn compile_as<T: FromValue>(
        &self,
        code: &str,
        context: &Type,
        options: &CompileOptions,
    ) -> Result<Expression<T>, Error> {
        self.compile_with_target(code, context, &T::static_type(), options)
            .map(Expression::new)
    }

    /// Evaluates an expression that does not reference any context.
    #[allow(clippy::result_large_err)]
    pub fn eval_constant(&self, code: &str, options: &CompileOptions) -> Result<Value, Error> {
        let typed = self.check_in(code, None, options)?;

        if !typed.constant {
            return Err(Error::from_error(
                code,
                CompileError::NotConstant { range: typed.range },
            ));
        }

        Ok(compiler::evaluate_constant(&self.catalog, &typed))
    }

    pub const fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    #[allow(clippy::result_large_err)]
    fn check_in(
        &self,
        code: &str,
        context: Option<&Type>,
        options: &CompileOptions,
    ) -> Result<TypedNode, Error> {
        let resolver = Resolver::new(&self.catalog, context, options);
        self.check_with(code, &resolver)
    }

    #[allow(clippy::result_large_err)]
    fn check_with(&self, code: &str, resolver: &Resolver<'_>) -> Result<TypedNode, Error> {
        let node = parse_with(code, resolver)?;
        Checker::new(resolver)
            .check(&node)
            .map_err(|e| Error::from_error(code, e))
    }

    fn finish(&self, code: &str, typed: TypedNode) -> CompiledExpression {
        let evaluator = Compiler::new(&self.catalog, self.options.constant_folding).compile(&typed);

        debug!(
            source = code,
            yielded_type = %self.catalog.type_name(&typed.ty),
            constant = typed.constant,
            "Compiled expression"
        );

        CompiledExpression::new(evaluator, typed.ty, typed.constant, code)
    }
}

#[allow(clippy::result_large_err)]
fn parse_with(code: &str, resolver: &Resolver<'_>) -> Result<Shared<Node>, Error> {
    let tokens = tokenize(code, lexer::Options::default())?
        .into_iter()
        .map(Shared::new)
        .collect::<Vec<Shared<Token>>>();

    Parser::new(tokens.iter(), resolver)
        .parse()
        .map_err(|e| Error::from_error(code, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogBuilder, TypeId};
    use crate::error::InnerError;
    use rstest::{fixture, rstest};

    struct Fixture {
        engine: Engine,
        context: Type,
        player: TypeId,
    }

    #[fixture]
    fn fixture() -> Fixture {
        let mut builder = CatalogBuilder::new();
        let player = builder.declare_class("Game", "Player");
        builder
            .def(player)
            .field("health", Type::Int)
            .field("name", Type::String);

        Fixture {
            engine: Engine::new(builder.build().unwrap()),
            context: Type::named(player),
            player,
        }
    }

    #[test]
    fn test_options_default() {
        let options = Options::default();
        assert!(options.constant_folding);
        assert!(options.allow_implicit_result_conversion);
    }

    #[rstest]
    fn test_set_options(mut fixture: Fixture) {
        fixture.engine.set_constant_folding(false);
        fixture.engine.set_allow_implicit_result_conversion(false);
        assert!(!fixture.engine.options().constant_folding);
        assert!(!fixture.engine.options().allow_implicit_result_conversion);
    }

    #[rstest]
    fn test_compile(fixture: Fixture) {
        let compiled = fixture
            .engine
            .compile("health * 2", &fixture.context, &CompileOptions::default())
            .unwrap();
        let player = fixture
            .engine
            .catalog()
            .instance(fixture.player)
            .set("health", 21)
            .build();

        assert_eq!(compiled.yielded_type(), &Type::Int);
        assert!(!compiled.is_constant());
        assert_eq!(compiled.evaluate(&player), Value::Int(42));
        assert_eq!(compiled.source(), "health * 2");
    }

    #[rstest]
    fn test_compile_with_target(fixture: Fixture) {
        let compiled = fixture
            .engine
            .compile_with_target("health", &fixture.context, &Type::Float, &CompileOptions::default())
            .unwrap();

        assert_eq!(compiled.yielded_type(), &Type::Float);
        assert_eq!(compiled.evaluate(&Value::Null), Value::Float(0.0));
    }

    #[rstest]
    fn test_implicit_result_conversion_disabled(mut fixture: Fixture) {
        fixture.engine.set_allow_implicit_result_conversion(false);
        let err = fixture
            .engine
            .compile_with_target("health", &fixture.context, &Type::Float, &CompileOptions::default())
            .unwrap_err();

        assert!(matches!(
            err.cause,
            InnerError::Compile(CompileError::InvalidConversion { .. })
        ));
    }

    #[rstest]
    fn test_compile_as(fixture: Fixture) {
        let expression = fixture
            .engine
            .compile_as::<String>("'hp: ' + health", &fixture.context, &CompileOptions::default())
            .unwrap();
        let player = fixture
            .engine
            .catalog()
            .instance(fixture.player)
            .set("health", 7)
            .build();

        assert_eq!(expression.evaluate(&player), "hp: 7");
    }

    #[rstest]
    #[case::arithmetic("1 + 2 * 3", Ok(Value::Int(7)))]
    #[case::string("'a' + 1", Ok(Value::from("a1")))]
    #[case::not_constant("health", Err("CompileError::IdentifierNotFound"))]
    fn test_eval_constant(
        fixture: Fixture,
        #[case] code: &str,
        #[case] expected: Result<Value, &str>,
    ) {
        use miette::Diagnostic;

        let actual = fixture
            .engine
            .eval_constant(code, &CompileOptions::default())
            .map_err(|e| e.code().map(|c| c.to_string()).unwrap_or_default());

        assert_eq!(actual, expected.map_err(|e| e.to_string()));
    }

    #[rstest]
    fn test_compile_error_location(fixture: Fixture) {
        let err = fixture
            .engine
            .compile("health + missing", &fixture.context, &CompileOptions::default())
            .unwrap_err();

        assert_eq!(err.location, miette::SourceSpan::new(9.into(), 7));
    }

    #[test]
    fn test_version() {
        assert!(!Engine::version().is_empty());
    }
}
