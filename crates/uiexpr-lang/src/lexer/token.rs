use std::fmt::{self, Display, Formatter};

use smol_str::SmolStr;

use crate::range::Range;

#[derive(PartialEq, Debug, Clone)]
pub struct Token {
    pub range: Range,
    pub kind: TokenKind,
}

impl Token {
    #[inline(always)]
    pub fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }
}

#[derive(PartialEq, Debug, Clone)]
pub enum TokenKind {
    Alias(SmolStr),
    Ampersand,
    And,
    As,
    Asterisk,
    BoolLiteral(bool),
    Colon,
    Comma,
    Dot,
    DoubleLiteral(f64),
    Eof,
    EqEq,
    FloatLiteral(f32),
    Gt,
    Gte,
    Ident(SmolStr),
    IntLiteral(i32),
    Invalid(SmolStr),
    Is,
    LBrace,
    LBracket,
    LParen,
    Lt,
    Lte,
    Minus,
    NeEq,
    New,
    Not,
    Null,
    Or,
    Percent,
    Pipe,
    Plus,
    Question,
    RBrace,
    RBracket,
    RParen,
    ShiftLeft,
    ShiftRight,
    Slash,
    StringLiteral(String),
    Tilde,
    TypeOf,
}

impl TokenKind {
    /// Whether a token of this kind can begin an operand.
    pub fn starts_operand(&self) -> bool {
        matches!(
            self,
            TokenKind::Alias(_)
                | TokenKind::BoolLiteral(_)
                | TokenKind::DoubleLiteral(_)
                | TokenKind::FloatLiteral(_)
                | TokenKind::Ident(_)
                | TokenKind::IntLiteral(_)
                | TokenKind::LParen
                | TokenKind::New
                | TokenKind::Not
                | TokenKind::Null
                | TokenKind::StringLiteral(_)
                | TokenKind::Tilde
                | TokenKind::TypeOf
        )
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "{}", self.kind)
    }
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match &self {
            TokenKind::Alias(name) => write!(f, "{}", name),
            TokenKind::Ampersand => write!(f, "&"),
            TokenKind::And => write!(f, "&&"),
            TokenKind::As => write!(f, "as"),
            TokenKind::Asterisk => write!(f, "*"),
            TokenKind::BoolLiteral(b) => write!(f, "{}", b),
            TokenKind::Colon => write!(f, ":"),
            TokenKind::Comma => write!(f, ","),
            TokenKind::Dot => write!(f, "."),
            TokenKind::DoubleLiteral(n) => write!(f, "{}d", n),
            TokenKind::Eof => write!(f, ""),
            TokenKind::EqEq => write!(f, "=="),
            TokenKind::FloatLiteral(n) => write!(f, "{}f", n),
            TokenKind::Gt => write!(f, ">"),
            TokenKind::Gte => write!(f, ">="),
            TokenKind::Ident(ident) => write!(f, "{}", ident),
            TokenKind::IntLiteral(n) => write!(f, "{}", n),
            TokenKind::Invalid(s) => write!(f, "{}", s),
            TokenKind::Is => write!(f, "is"),
            TokenKind::LBrace => write!(f, "{{"),
            TokenKind::LBracket => write!(f, "["),
            TokenKind::LParen => write!(f, "("),
            TokenKind::Lt => write!(f, "<"),
            TokenKind::Lte => write!(f, "<="),
            TokenKind::Minus => write!(f, "-"),
            TokenKind::NeEq => write!(f, "!="),
            TokenKind::New => write!(f, "new"),
            TokenKind::Not => write!(f, "!"),
            TokenKind::Null => write!(f, "null"),
            TokenKind::Or => write!(f, "||"),
            TokenKind::Percent => write!(f, "%"),
            TokenKind::Pipe => write!(f, "|"),
            TokenKind::Plus => write!(f, "+"),
            TokenKind::Question => write!(f, "?"),
            TokenKind::RBrace => write!(f, "}}"),
            TokenKind::RBracket => write!(f, "]"),
            TokenKind::RParen => write!(f, ")"),
            TokenKind::ShiftLeft => write!(f, "<<"),
            TokenKind::ShiftRight => write!(f, ">>"),
            TokenKind::Slash => write!(f, "/"),
            TokenKind::StringLiteral(s) => write!(f, "'{}'", s),
            TokenKind::Tilde => write!(f, "~"),
            TokenKind::TypeOf => write!(f, "typeof"),
        }
    }
}
