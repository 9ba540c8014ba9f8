use thiserror::Error;

use super::token::Token;

#[derive(Error, Debug, PartialEq)]
pub enum LexerError {
    #[error("Unexpected token `{0}`")]
    UnexpectedToken(Token),
    #[error("Unterminated string literal starting at `{0}`")]
    UnterminatedString(Token),
    #[error("Unexpected EOF detected")]
    UnexpectedEOFDetected,
}
