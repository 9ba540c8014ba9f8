//! `uiexpr-lang` compiles the small C#-flavoured expression language used by
//! UI template and style bindings.
//!
//! An expression is tokenized, parsed, type checked against a host
//! [`TypeCatalog`] and a root context type, then lowered into a closure that
//! is evaluated against context instances on every binding update.
//!
//! ## Examples
//!
//! ```rust
//! use uiexpr_lang::{CatalogBuilder, CompileOptions, Engine, Type, Value};
//!
//! let mut builder = CatalogBuilder::new();
//! let player = builder.declare_class("Game", "Player");
//! builder.def(player).field("health", Type::Int);
//! let engine = Engine::new(builder.build().unwrap());
//!
//! let compiled = engine
//!     .compile("health > 50 ? 'fine' : 'hurt'", &Type::named(player), &CompileOptions::default())
//!     .unwrap();
//! let instance = engine.catalog().instance(player).set("health", 80).build();
//!
//! assert_eq!(compiled.evaluate(&instance), Value::from("fine"));
//! assert!(!compiled.is_constant());
//! ```
//!
//! Expressions that reference no context are folded into constants:
//!
//! ```rust
//! use uiexpr_lang::{CatalogBuilder, CompileOptions, Engine, Value};
//!
//! let engine = Engine::new(CatalogBuilder::new().build().unwrap());
//! let value = engine.eval_constant("(1 + 2) * 3", &CompileOptions::default()).unwrap();
//!
//! assert_eq!(value, Value::Int(9));
//! ```
mod alias;
mod ast;
mod binding;
mod catalog;
mod checker;
mod compiler;
mod engine;
mod error;
mod lexer;
mod number;
mod range;
mod resolver;
mod value;

use std::sync::Arc;

use error::InnerError;
use lexer::Lexer;

pub use alias::{AliasSource, CompileOptions, MethodForm};
pub use ast::error::ParseError;
pub use ast::node::{BinaryOp, UnaryOp};
pub use ast::node::Node as AstNode;
pub use ast::parser::{NoHints, Parser as AstParser, TypeHints};
pub use binding::Binding;
pub use catalog::{
    CatalogBuilder, CatalogError, NativeFn, ParamDef, RecordBuilder, Type, TypeCatalog, TypeId,
    TypeKind,
};
pub use checker::error::CompileError;
pub use checker::typed::{LogicalStrategy, TypedExpr, TypedNode};
pub use compiler::{CompiledExpr, CompiledExpression, Expression};
pub use engine::{Engine, Options};
pub use error::Error;
pub use error::InnerError as ErrorKind;
pub use lexer::Options as LexerOptions;
pub use lexer::error::LexerError;
pub use lexer::token::{Token, TokenKind};
pub use range::{Position, Range};
pub use value::{DictKey, FromValue, Record, Value};

pub type Shared<T> = Arc<T>;

/// Parses `code` without catalog knowledge. Casts and generic arguments are
/// only recognized for the primitive type keywords.
#[allow(clippy::result_large_err)]
pub fn parse(code: &str) -> Result<Shared<AstNode>, error::Error> {
    let tokens = tokenize(code, lexer::Options::default())?
        .into_iter()
        .map(Shared::new)
        .collect::<Vec<_>>();

    AstParser::new(tokens.iter(), &NoHints)
        .parse()
        .map_err(|e| error::Error::from_error(code, InnerError::Parse(e)))
}

#[allow(clippy::result_large_err)]
pub fn tokenize(
    code: &str,
    options: lexer::Options,
) -> Result<Vec<lexer::token::Token>, error::Error> {
    Lexer::new(options)
        .tokenize(code)
        .map_err(|e| error::Error::from_error(code, InnerError::Lexer(e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::simple("a.b + 1", true)]
    #[case::braced("{ a ? 1 : 2 }", true)]
    #[case::unclosed("(a + 1", false)]
    fn test_parse(#[case] code: &str, #[case] ok: bool) {
        assert_eq!(parse(code).is_ok(), ok);
    }

    #[test]
    fn test_tokenize_error() {
        let err = tokenize("'abc", LexerOptions::default()).unwrap_err();
        assert!(matches!(err.cause, ErrorKind::Lexer(_)));
    }
}
