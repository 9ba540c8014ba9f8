pub mod error;
pub mod token;

use error::LexerError;
use nom::Parser;
use nom::bytes::complete::{is_not, take_until};
use nom::character::complete::{digit1, multispace1, one_of};
use nom::combinator::{not, opt};
use nom::multi::fold_many0;
use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag, take_while_m_n},
    character::complete::{alpha1, alphanumeric1, char, none_of},
    combinator::{map, map_opt, map_res, recognize, value},
    multi::many0,
    sequence::{delimited, pair, preceded, terminated},
};
use nom_locate::position;
use smol_str::SmolStr;
use token::{Token, TokenKind};

use crate::range::{Range, Span};

macro_rules! define_token_parser {
    ($name:ident, $tag:expr, $kind:expr) => {
        fn $name(input: Span) -> IResult<Span, Token> {
            map(tag($tag), |span: Span| Token {
                range: span.into(),
                kind: $kind,
            })
            .parse(input)
        }
    };
}

#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Stop at the first unrecognized character instead of failing.
    pub ignore_errors: bool,
}

pub struct Lexer {
    options: Options,
}

impl Lexer {
    pub fn new(options: Options) -> Self {
        Self { options }
    }

    pub fn tokenize(&self, input: &str) -> Result<Vec<Token>, LexerError> {
        match tokens(Span::new(input)) {
            Ok((span, mut tokens)) => {
                let rest: Range = span.into();

                if rest.is_empty() || self.options.ignore_errors {
                    tokens.push(Token {
                        range: Range::new(rest.start, rest.start),
                        kind: TokenKind::Eof,
                    });
                    Ok(tokens)
                } else {
                    Err(leftover_error(span))
                }
            }
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(leftover_error(e.input)),
            Err(nom::Err::Incomplete(_)) => Err(LexerError::UnexpectedEOFDetected),
        }
    }
}

fn leftover_error(span: Span) -> LexerError {
    let fragment = span.fragment();
    let head: SmolStr = fragment.chars().take(1).collect();
    let mut range: Range = span.into();
    range.end = range.start;
    range.end.column += 1;
    range.end.offset += head.len();

    if fragment.starts_with('\'') || fragment.starts_with('"') {
        let range: Range = span.into();
        LexerError::UnterminatedString(Token {
            range,
            kind: TokenKind::Invalid(SmolStr::new(fragment)),
        })
    } else if fragment.starts_with("/*") {
        LexerError::UnexpectedEOFDetected
    } else {
        LexerError::UnexpectedToken(Token {
            range,
            kind: TokenKind::Invalid(head),
        })
    }
}

fn line_comment(input: Span) -> IResult<Span, Span> {
    recognize(pair(tag("//"), opt(is_not("\r\n")))).parse(input)
}

fn block_comment(input: Span) -> IResult<Span, Span> {
    recognize((tag("/*"), take_until("*/"), tag("*/"))).parse(input)
}

fn trivia(input: Span) -> IResult<Span, ()> {
    value((), many0(alt((multispace1, line_comment, block_comment)))).parse(input)
}

define_token_parser!(shift_left, "<<", TokenKind::ShiftLeft);
define_token_parser!(shift_right, ">>", TokenKind::ShiftRight);
define_token_parser!(lte, "<=", TokenKind::Lte);
define_token_parser!(gte, ">=", TokenKind::Gte);
define_token_parser!(eq_eq, "==", TokenKind::EqEq);
define_token_parser!(ne_eq, "!=", TokenKind::NeEq);
define_token_parser!(and, "&&", TokenKind::And);
define_token_parser!(or, "||", TokenKind::Or);
define_token_parser!(lt, "<", TokenKind::Lt);
define_token_parser!(gt, ">", TokenKind::Gt);
define_token_parser!(bang, "!", TokenKind::Not);
define_token_parser!(tilde, "~", TokenKind::Tilde);
define_token_parser!(ampersand, "&", TokenKind::Ampersand);
define_token_parser!(pipe, "|", TokenKind::Pipe);
define_token_parser!(plus, "+", TokenKind::Plus);
define_token_parser!(minus, "-", TokenKind::Minus);
define_token_parser!(asterisk, "*", TokenKind::Asterisk);
define_token_parser!(percent, "%", TokenKind::Percent);
define_token_parser!(question, "?", TokenKind::Question);
define_token_parser!(colon, ":", TokenKind::Colon);
define_token_parser!(dot, ".", TokenKind::Dot);
define_token_parser!(comma, ",", TokenKind::Comma);
define_token_parser!(l_paren, "(", TokenKind::LParen);
define_token_parser!(r_paren, ")", TokenKind::RParen);
define_token_parser!(l_bracket, "[", TokenKind::LBracket);
define_token_parser!(r_bracket, "]", TokenKind::RBracket);
define_token_parser!(l_brace, "{", TokenKind::LBrace);
define_token_parser!(r_brace, "}", TokenKind::RBrace);

fn slash(input: Span) -> IResult<Span, Token> {
    map(terminated(tag("/"), not(one_of("*/"))), |span: Span| Token {
        range: span.into(),
        kind: TokenKind::Slash,
    })
    .parse(input)
}

fn compound_operators(input: Span) -> IResult<Span, Token> {
    alt((shift_left, shift_right, lte, gte, eq_eq, ne_eq, and, or)).parse(input)
}

fn operators(input: Span) -> IResult<Span, Token> {
    alt((
        lt, gt, bang, tilde, ampersand, pipe, plus, minus, asterisk, slash, percent, question, colon,
    ))
    .parse(input)
}

fn punctuations(input: Span) -> IResult<Span, Token> {
    alt((dot, comma, l_paren, r_paren, l_bracket, r_bracket, l_brace, r_brace)).parse(input)
}

fn number_literal(input: Span) -> IResult<Span, Token> {
    let (span, start) = position(input)?;
    let (span, text) = recognize((
        digit1,
        opt(pair(char('.'), digit1)),
        opt((one_of("eE"), opt(one_of("+-")), digit1)),
    ))
    .parse(span)?;
    let (span, suffix) = opt(one_of("fFdD")).parse(span)?;
    let (span, end) = position(span)?;

    let fragment = *text.fragment();
    let kind = match suffix {
        Some('f') | Some('F') => fragment.parse::<f32>().ok().map(TokenKind::FloatLiteral),
        Some(_) => fragment.parse::<f64>().ok().map(TokenKind::DoubleLiteral),
        None if fragment.contains(['.', 'e', 'E']) => {
            fragment.parse::<f64>().ok().map(TokenKind::DoubleLiteral)
        }
        None => fragment.parse::<i32>().ok().map(TokenKind::IntLiteral),
    };

    match kind {
        Some(kind) => Ok((
            span,
            Token {
                range: Range {
                    start: start.into(),
                    end: end.into(),
                },
                kind,
            },
        )),
        None => Err(nom::Err::Failure(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Digit,
        ))),
    }
}

fn unicode(input: Span) -> IResult<Span, char> {
    map_opt(
        map_res(
            preceded(
                char('u'),
                delimited(
                    char('{'),
                    take_while_m_n(1, 6, |c: char| c.is_ascii_hexdigit()),
                    char('}'),
                ),
            ),
            |span: Span| u32::from_str_radix(span.fragment(), 16),
        ),
        char::from_u32,
    )
    .parse(input)
}

fn escape(input: Span) -> IResult<Span, char> {
    alt((
        value('\\', char('\\')),
        value('\'', char('\'')),
        value('"', char('"')),
        value('\r', char('r')),
        value('\n', char('n')),
        value('\t', char('t')),
        unicode,
    ))
    .parse(input)
}

fn string_body<'a>(input: Span<'a>, stop: &'static str) -> IResult<Span<'a>, String> {
    fold_many0(
        alt((none_of(stop), preceded(char('\\'), escape))),
        String::new,
        |mut acc: String, c| {
            acc.push(c);
            acc
        },
    )
    .parse(input)
}

fn single_quoted(input: Span) -> IResult<Span, String> {
    string_body(input, "'\\")
}

fn double_quoted(input: Span) -> IResult<Span, String> {
    string_body(input, "\"\\")
}

fn string_literal(input: Span) -> IResult<Span, Token> {
    let (span, start) = position(input)?;
    let (span, s) = alt((
        delimited(char('\''), single_quoted, char('\'')),
        delimited(char('"'), double_quoted, char('"')),
    ))
    .parse(span)?;
    let (span, end) = position(span)?;

    Ok((
        span,
        Token {
            range: Range {
                start: start.into(),
                end: end.into(),
            },
            kind: TokenKind::StringLiteral(s),
        },
    ))
}

fn identifier(input: Span) -> IResult<Span, Span> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ))
    .parse(input)
}

fn ident(input: Span) -> IResult<Span, Token> {
    map(identifier, |span: Span| {
        let kind = match *span.fragment() {
            "true" => TokenKind::BoolLiteral(true),
            "false" => TokenKind::BoolLiteral(false),
            "null" => TokenKind::Null,
            "new" => TokenKind::New,
            "typeof" => TokenKind::TypeOf,
            "is" => TokenKind::Is,
            "as" => TokenKind::As,
            name => TokenKind::Ident(SmolStr::new(name)),
        };

        Token {
            range: span.into(),
            kind,
        }
    })
    .parse(input)
}

fn alias(input: Span) -> IResult<Span, Token> {
    map(recognize(preceded(char('$'), identifier)), |span: Span| {
        Token {
            range: span.into(),
            kind: TokenKind::Alias(SmolStr::new(span.fragment())),
        }
    })
    .parse(input)
}

fn token(input: Span) -> IResult<Span, Token> {
    alt((
        compound_operators,
        punctuations,
        operators,
        number_literal,
        string_literal,
        alias,
        ident,
    ))
    .parse(input)
}

fn tokens(input: Span) -> IResult<Span, Vec<Token>> {
    preceded(trivia, many0(terminated(token, trivia))).parse(input)
}

#[cfg(test)]
mod tests {
    use crate::range::Position;

    use super::*;
    use rstest::rstest;

    fn kinds(input: &str) -> Result<Vec<TokenKind>, LexerError> {
        Lexer::new(Options::default())
            .tokenize(input)
            .map(|tokens| tokens.into_iter().map(|t| t.kind).collect())
    }

    #[rstest]
    #[case::member_chain("vec3List[3].z", vec![
        TokenKind::Ident("vec3List".into()),
        TokenKind::LBracket,
        TokenKind::IntLiteral(3),
        TokenKind::RBracket,
        TokenKind::Dot,
        TokenKind::Ident("z".into()),
        TokenKind::Eof,
    ])]
    #[case::numeric_suffixes("5 + 4f - 2.5 * 1d / 1.5f", vec![
        TokenKind::IntLiteral(5),
        TokenKind::Plus,
        TokenKind::FloatLiteral(4.0),
        TokenKind::Minus,
        TokenKind::DoubleLiteral(2.5),
        TokenKind::Asterisk,
        TokenKind::DoubleLiteral(1.0),
        TokenKind::Slash,
        TokenKind::FloatLiteral(1.5),
        TokenKind::Eof,
    ])]
    #[case::exponent("1e3", vec![TokenKind::DoubleLiteral(1000.0), TokenKind::Eof])]
    #[case::shifts_and_bitwise("1 << 2 >> 3 | 4 & ~5", vec![
        TokenKind::IntLiteral(1),
        TokenKind::ShiftLeft,
        TokenKind::IntLiteral(2),
        TokenKind::ShiftRight,
        TokenKind::IntLiteral(3),
        TokenKind::Pipe,
        TokenKind::IntLiteral(4),
        TokenKind::Ampersand,
        TokenKind::Tilde,
        TokenKind::IntLiteral(5),
        TokenKind::Eof,
    ])]
    #[case::comparisons("a <= b >= c < d > e == f != g", vec![
        TokenKind::Ident("a".into()),
        TokenKind::Lte,
        TokenKind::Ident("b".into()),
        TokenKind::Gte,
        TokenKind::Ident("c".into()),
        TokenKind::Lt,
        TokenKind::Ident("d".into()),
        TokenKind::Gt,
        TokenKind::Ident("e".into()),
        TokenKind::EqEq,
        TokenKind::Ident("f".into()),
        TokenKind::NeEq,
        TokenKind::Ident("g".into()),
        TokenKind::Eof,
    ])]
    #[case::logical_ternary("!a && b || c ? 1 : 2", vec![
        TokenKind::Not,
        TokenKind::Ident("a".into()),
        TokenKind::And,
        TokenKind::Ident("b".into()),
        TokenKind::Or,
        TokenKind::Ident("c".into()),
        TokenKind::Question,
        TokenKind::IntLiteral(1),
        TokenKind::Colon,
        TokenKind::IntLiteral(2),
        TokenKind::Eof,
    ])]
    #[case::keywords("new typeof is as null true false", vec![
        TokenKind::New,
        TokenKind::TypeOf,
        TokenKind::Is,
        TokenKind::As,
        TokenKind::Null,
        TokenKind::BoolLiteral(true),
        TokenKind::BoolLiteral(false),
        TokenKind::Eof,
    ])]
    #[case::keyword_prefix_is_ident("newValue isOpen", vec![
        TokenKind::Ident("newValue".into()),
        TokenKind::Ident("isOpen".into()),
        TokenKind::Eof,
    ])]
    #[case::alias("$alias + rgb(1, 0, 0)", vec![
        TokenKind::Alias("$alias".into()),
        TokenKind::Plus,
        TokenKind::Ident("rgb".into()),
        TokenKind::LParen,
        TokenKind::IntLiteral(1),
        TokenKind::Comma,
        TokenKind::IntLiteral(0),
        TokenKind::Comma,
        TokenKind::IntLiteral(0),
        TokenKind::RParen,
        TokenKind::Eof,
    ])]
    #[case::braces("{ value }", vec![
        TokenKind::LBrace,
        TokenKind::Ident("value".into()),
        TokenKind::RBrace,
        TokenKind::Eof,
    ])]
    #[case::single_quoted("'string1' + \"string2\"", vec![
        TokenKind::StringLiteral("string1".to_string()),
        TokenKind::Plus,
        TokenKind::StringLiteral("string2".to_string()),
        TokenKind::Eof,
    ])]
    #[case::empty_string("''", vec![TokenKind::StringLiteral(String::new()), TokenKind::Eof])]
    #[case::escapes(r"'it\'s\n\u{0061}'", vec![TokenKind::StringLiteral("it's\na".to_string()), TokenKind::Eof])]
    #[case::comments("1 // trailing\n + /* inner */ 2", vec![
        TokenKind::IntLiteral(1),
        TokenKind::Plus,
        TokenKind::IntLiteral(2),
        TokenKind::Eof,
    ])]
    #[case::generic_type("List<Vector3>", vec![
        TokenKind::Ident("List".into()),
        TokenKind::Lt,
        TokenKind::Ident("Vector3".into()),
        TokenKind::Gt,
        TokenKind::Eof,
    ])]
    #[case::only_whitespace("   ", vec![TokenKind::Eof])]
    fn test_tokenize(#[case] input: &str, #[case] expected: Vec<TokenKind>) {
        assert_eq!(kinds(input), Ok(expected));
    }

    #[test]
    fn test_token_ranges() {
        let tokens = Lexer::new(Options::default()).tokenize("a + bc").unwrap();
        assert_eq!(
            tokens[0].range,
            Range::new(Position::new(1, 1, 0), Position::new(1, 2, 1))
        );
        assert_eq!(
            tokens[2].range,
            Range::new(Position::new(1, 5, 4), Position::new(1, 7, 6))
        );
        assert_eq!(tokens[3].kind, TokenKind::Eof);
        assert_eq!(tokens[3].range.start.offset, 6);
    }

    #[rstest]
    #[case::single_quote("'abc")]
    #[case::double_quote("value == \"abc")]
    fn test_unterminated_string(#[case] input: &str) {
        assert!(matches!(kinds(input), Err(LexerError::UnterminatedString(_))));
    }

    #[rstest]
    #[case::hash("value # 1", "#")]
    #[case::at("@value", "@")]
    fn test_unexpected_token(#[case] input: &str, #[case] expected: &str) {
        match kinds(input) {
            Err(LexerError::UnexpectedToken(token)) => {
                assert_eq!(token.kind, TokenKind::Invalid(expected.into()))
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_unterminated_block_comment() {
        assert_eq!(kinds("1 /* open"), Err(LexerError::UnexpectedEOFDetected));
    }

    #[test]
    fn test_int_overflow_is_rejected() {
        assert!(kinds("99999999999").is_err());
    }

    #[test]
    fn test_ignore_errors() {
        let tokens = Lexer::new(Options { ignore_errors: true })
            .tokenize("a @")
            .unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[1].kind, TokenKind::Eof);
    }
}
