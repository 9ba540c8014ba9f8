use miette::{Diagnostic, SourceOffset, SourceSpan};

use crate::{
    ast::error::ParseError, checker::error::CompileError, lexer::error::LexerError, range::Range,
};

#[allow(clippy::useless_conversion)]
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum InnerError {
    #[error(transparent)]
    Lexer(#[from] LexerError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Compile(#[from] CompileError),
}

impl InnerError {
    fn range(&self) -> Option<Range> {
        match self {
            InnerError::Lexer(LexerError::UnexpectedToken(token))
            | InnerError::Lexer(LexerError::UnterminatedString(token)) => Some(token.range),
            InnerError::Lexer(LexerError::UnexpectedEOFDetected) => None,
            InnerError::Parse(err) => err.token().filter(|token| !token.is_eof()).map(|token| token.range),
            InnerError::Compile(err) => Some(err.range()),
        }
    }
}

/// Represents a high-level error with diagnostic information for the user.
#[derive(PartialEq, Debug, thiserror::Error)]
#[error("{cause}")]
pub struct Error {
    /// The underlying cause of the error.
    pub cause: InnerError,
    /// The expression source the error refers to.
    pub source_code: String,
    /// The location in the source code for diagnostics.
    pub location: SourceSpan,
}

impl Error {
    pub fn from_error(source_code: impl Into<String>, cause: impl Into<InnerError>) -> Self {
        let source_code = source_code.into();
        let cause = cause.into();

        let location = match cause.range() {
            Some(range) => {
                let offset = range.start.offset.min(source_code.len());
                let length = if offset < source_code.len() {
                    range.len().max(1)
                } else {
                    0
                };
                SourceSpan::new(SourceOffset::from(offset), length)
            }
            // Errors without a token point at the end of the input.
            None => SourceSpan::new(SourceOffset::from(source_code.len()), 0),
        };

        Self {
            cause,
            source_code,
            location,
        }
    }

    /// Source range of the error, when one is known.
    pub fn range(&self) -> Option<Range> {
        self.cause.range()
    }
}

impl Diagnostic for Error {
    fn code<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        let c = match &self.cause {
            InnerError::Lexer(LexerError::UnexpectedToken(_)) => {
                "LexerError::UnexpectedToken".to_string()
            }
            InnerError::Lexer(LexerError::UnterminatedString(_)) => {
                "LexerError::UnterminatedString".to_string()
            }
            InnerError::Lexer(LexerError::UnexpectedEOFDetected) => {
                "LexerError::UnexpectedEOFDetected".to_string()
            }
            InnerError::Parse(ParseError::UnexpectedToken(_)) => {
                "ParseError::UnexpectedToken".to_string()
            }
            InnerError::Parse(ParseError::UnexpectedEOFDetected) => {
                "ParseError::UnexpectedEOFDetected".to_string()
            }
            InnerError::Parse(ParseError::ExpectedClosingParen(_)) => {
                "ParseError::ExpectedClosingParen".to_string()
            }
            InnerError::Parse(ParseError::ExpectedClosingBracket(_)) => {
                "ParseError::ExpectedClosingBracket".to_string()
            }
            InnerError::Parse(ParseError::ExpectedClosingBrace(_)) => {
                "ParseError::ExpectedClosingBrace".to_string()
            }
            InnerError::Parse(ParseError::ExpectedTypeName(_)) => {
                "ParseError::ExpectedTypeName".to_string()
            }
            InnerError::Compile(err) => format!("CompileError::{}", err.name()),
        };

        Some(Box::new(c))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        let msg = match &self.cause {
            InnerError::Lexer(LexerError::UnexpectedToken(_)) => {
                Some("Check for unexpected or misplaced characters in the expression.".to_string())
            }
            InnerError::Lexer(LexerError::UnterminatedString(_)) => {
                Some("Close the string literal with a matching quote.".to_string())
            }
            InnerError::Parse(ParseError::UnexpectedToken(_)) => {
                Some("Check for syntax errors or misplaced tokens.".to_string())
            }
            InnerError::Parse(ParseError::UnexpectedEOFDetected)
            | InnerError::Lexer(LexerError::UnexpectedEOFDetected) => Some(
                "Input ended unexpectedly. Check for missing closing brackets or incomplete expressions."
                    .to_string(),
            ),
            InnerError::Parse(ParseError::ExpectedTypeName(_)) => {
                Some("`new`, `is`, `as`, and `typeof` must be followed by a type name.".to_string())
            }
            InnerError::Compile(CompileError::TypeNotFound { name, .. }) => Some(format!(
                "'{name}' is not a known type. Did you forget to add its namespace?"
            )),
            InnerError::Compile(CompileError::AmbiguousType { name, .. }) => Some(format!(
                "Qualify '{name}' with its namespace to pick one of the candidates."
            )),
            InnerError::Compile(CompileError::IdentifierNotFound { name, .. }) => Some(format!(
                "'{name}' is neither a member of the context type nor a known alias or type."
            )),
            InnerError::Compile(CompileError::TypeUsedAsValue { .. }) => {
                Some("Access a static member or use `typeof(...)` to get a type value.".to_string())
            }
            InnerError::Compile(CompileError::MissingOperator { .. })
            | InnerError::Compile(CompileError::MissingUnaryOperator { .. }) => {
                Some("Type mismatch. Check the types of your operands.".to_string())
            }
            InnerError::Compile(CompileError::AmbiguousOverload { .. }) => {
                Some("Add an explicit cast to select a single overload.".to_string())
            }
            InnerError::Compile(CompileError::InvalidConversion { .. }) => {
                Some("Use an explicit cast such as `(int)value`.".to_string())
            }
            _ => None,
        };

        msg.map(|m| Box::new(m) as Box<dyn std::fmt::Display>)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = miette::LabeledSpan> + '_>> {
        Some(Box::new(std::iter::once(
            miette::LabeledSpan::new_with_span(Some(format!("{}", self.cause)), self.location),
        )))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&self.source_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::token::{Token, TokenKind};
    use crate::range::Position;
    use rstest::rstest;

    fn range(start: usize, end: usize) -> Range {
        Range::new(
            Position::new(1, start + 1, start),
            Position::new(1, end + 1, end),
        )
    }

    #[rstest]
    #[case::compile(
        InnerError::Compile(CompileError::IdentifierNotFound { name: "foo".to_string(), range: range(2, 5) }),
        SourceSpan::new(2.into(), 3),
        "CompileError::IdentifierNotFound"
    )]
    #[case::parse_eof(
        InnerError::Parse(ParseError::UnexpectedEOFDetected),
        SourceSpan::new(7.into(), 0),
        "ParseError::UnexpectedEOFDetected"
    )]
    #[case::parse_eof_token(
        InnerError::Parse(ParseError::ExpectedClosingParen(Token { range: range(7, 7), kind: TokenKind::Eof })),
        SourceSpan::new(7.into(), 0),
        "ParseError::ExpectedClosingParen"
    )]
    #[case::empty_range(
        InnerError::Compile(CompileError::NotConstant { range: range(0, 0) }),
        SourceSpan::new(0.into(), 1),
        "CompileError::NotConstant"
    )]
    fn test_from_error(#[case] cause: InnerError, #[case] location: SourceSpan, #[case] code: &str) {
        let error = Error::from_error("a + foo", cause);

        assert_eq!(error.location, location);
        assert_eq!(error.code().map(|c| c.to_string()), Some(code.to_string()));
        assert_eq!(error.source_code, "a + foo");
    }
}
