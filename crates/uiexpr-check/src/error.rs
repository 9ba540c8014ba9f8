use miette::{Diagnostic, SourceSpan};
use smol_str::SmolStr;
use thiserror::Error;
use uiexpr_lang::CatalogError;

#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("Invalid JSON: {message}")]
    #[diagnostic(code(uiexpr_check::json))]
    InvalidJson {
        message: String,
        #[source_code]
        src: String,
        #[label("here")]
        span: SourceSpan,
    },

    #[error("Unknown type `{0}`")]
    #[diagnostic(
        code(uiexpr_check::unknown_type),
        help("Types must be declared in the catalog before they are referenced as a parent.")
    )]
    UnknownType(SmolStr),

    #[error("Malformed type name `{0}`")]
    #[diagnostic(code(uiexpr_check::malformed_type))]
    MalformedType(SmolStr),

    #[error("Default value for parameter `{0}` must be a bool, number, string or null")]
    #[diagnostic(code(uiexpr_check::unsupported_default))]
    UnsupportedDefault(SmolStr),

    #[error("Context type `{0}` is not a class or struct in the catalog")]
    #[diagnostic(
        code(uiexpr_check::context),
        help("Use a fully-qualified name, or pass the namespace with --namespace.")
    )]
    InvalidContext(SmolStr),

    #[error("Cannot convert {found} to `{expected}` at `{path}`")]
    #[diagnostic(code(uiexpr_check::data))]
    InvalidData {
        path: String,
        expected: String,
        found: &'static str,
    },

    #[error(transparent)]
    #[diagnostic(code(uiexpr_check::catalog))]
    Catalog(#[from] CatalogError),
}

impl Error {
    pub(crate) fn from_json(src: &str, err: serde_json::Error) -> Self {
        let offset = src
            .lines()
            .take(err.line().saturating_sub(1))
            .map(|line| line.len() + 1)
            .sum::<usize>()
            + err.column().saturating_sub(1);

        Error::InvalidJson {
            message: err.to_string(),
            src: src.to_string(),
            span: (offset.min(src.len()), 0).into(),
        }
    }
}
