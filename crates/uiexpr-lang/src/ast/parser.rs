use crate::lexer::token::{Token, TokenKind};
use crate::range::Range;
use crate::Shared;
use smallvec::SmallVec;
use std::iter::Peekable;

use super::IdentName;
use super::error::ParseError;
use super::node::{
    Args, BinaryOp, Expr, Ident, Literal, Node, TypeCheckMode, TypeRef, TypeSegment, UnaryOp,
};

const PRIMITIVE_TYPE_NAMES: &[&str] = &["bool", "int", "float", "double", "string", "object"];

/// Type knowledge the parser needs to tell generic arguments from comparisons
/// and casts from parenthesized expressions.
pub trait TypeHints {
    /// Whether `type_ref` names a type visible to the expression.
    fn is_type(&self, type_ref: &TypeRef) -> bool;
    /// Whether the dotted path names a generic type. The last segment carries
    /// the candidate type-argument count.
    fn is_generic_type(&self, path: &[(IdentName, usize)]) -> bool;
}

/// Hints used when no catalog is available: only primitive casts are
/// recognized and every well-formed `<…>` list is taken as type arguments.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHints;

impl TypeHints for NoHints {
    fn is_type(&self, type_ref: &TypeRef) -> bool {
        match type_ref {
            TypeRef::Named(segments) => {
                segments.len() == 1
                    && segments[0].args.is_empty()
                    && PRIMITIVE_TYPE_NAMES.contains(&segments[0].ident.name.as_str())
            }
            TypeRef::Array(element) => self.is_type(element),
        }
    }

    fn is_generic_type(&self, _path: &[(IdentName, usize)]) -> bool {
        true
    }
}

pub struct Parser<'a> {
    tokens: Peekable<core::slice::Iter<'a, Shared<Token>>>,
    hints: &'a dyn TypeHints,
    /// The first half of a `>>` token has closed a type-argument list.
    pending_gt: bool,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: core::slice::Iter<'a, Shared<Token>>, hints: &'a dyn TypeHints) -> Self {
        Self {
            tokens: tokens.peekable(),
            hints,
            pending_gt: false,
        }
    }

    pub fn parse(&mut self) -> Result<Shared<Node>, ParseError> {
        let braced = match self.peek_token() {
            Some(token) if token.kind == TokenKind::LBrace => {
                self.tokens.next();
                true
            }
            Some(token) if token.is_eof() => return Err(ParseError::UnexpectedEOFDetected),
            Some(_) => false,
            None => return Err(ParseError::UnexpectedEOFDetected),
        };

        let node = self.parse_expr()?;

        if braced {
            match self.tokens.next() {
                Some(token) if token.kind == TokenKind::RBrace => {}
                Some(token) => return Err(ParseError::ExpectedClosingBrace((**token).clone())),
                None => return Err(ParseError::UnexpectedEOFDetected),
            }
        }

        match self.tokens.next() {
            Some(token) if token.is_eof() => Ok(node),
            Some(token) => Err(ParseError::UnexpectedToken((**token).clone())),
            None => Ok(node),
        }
    }

    fn parse_expr(&mut self) -> Result<Shared<Node>, ParseError> {
        let condition = self.parse_binary_op(1)?;

        if !self.peek_is(|kind| matches!(kind, TokenKind::Question)) {
            return Ok(condition);
        }

        self.tokens.next();
        let when_true = self.parse_expr()?;
        self.expect(|kind| matches!(kind, TokenKind::Colon))?;
        let when_false = self.parse_expr()?;
        let range = condition.range.merge(&when_false.range);

        Ok(Node::new(
            range,
            Expr::Ternary(condition, when_true, when_false),
        ))
    }

    #[inline(always)]
    fn binary_op_precedence(kind: &TokenKind) -> u8 {
        match kind {
            TokenKind::Or => 1,
            TokenKind::And => 2,
            TokenKind::Pipe => 3,
            TokenKind::Ampersand => 4,
            TokenKind::EqEq | TokenKind::NeEq => 5,
            TokenKind::Gt
            | TokenKind::Gte
            | TokenKind::Lt
            | TokenKind::Lte
            | TokenKind::Is
            | TokenKind::As => 6,
            TokenKind::ShiftLeft | TokenKind::ShiftRight => 7,
            TokenKind::Plus | TokenKind::Minus => 8,
            TokenKind::Asterisk | TokenKind::Slash | TokenKind::Percent => 9,
            _ => 0,
        }
    }

    #[inline(always)]
    fn binary_op(kind: &TokenKind) -> Option<BinaryOp> {
        match kind {
            TokenKind::Or => Some(BinaryOp::Or),
            TokenKind::And => Some(BinaryOp::And),
            TokenKind::Pipe => Some(BinaryOp::BitOr),
            TokenKind::Ampersand => Some(BinaryOp::BitAnd),
            TokenKind::EqEq => Some(BinaryOp::Eq),
            TokenKind::NeEq => Some(BinaryOp::Ne),
            TokenKind::Gt => Some(BinaryOp::Gt),
            TokenKind::Gte => Some(BinaryOp::Gte),
            TokenKind::Lt => Some(BinaryOp::Lt),
            TokenKind::Lte => Some(BinaryOp::Lte),
            TokenKind::ShiftLeft => Some(BinaryOp::ShiftLeft),
            TokenKind::ShiftRight => Some(BinaryOp::ShiftRight),
            TokenKind::Plus => Some(BinaryOp::Add),
            TokenKind::Minus => Some(BinaryOp::Sub),
            TokenKind::Asterisk => Some(BinaryOp::Mul),
            TokenKind::Slash => Some(BinaryOp::Div),
            TokenKind::Percent => Some(BinaryOp::Mod),
            _ => None,
        }
    }

    fn parse_binary_op(&mut self, min_prec: u8) -> Result<Shared<Node>, ParseError> {
        let mut lhs = self.parse_unary()?;

        while let Some(peeked) = self.peek_token() {
            let kind = &peeked.kind;
            let prec = Self::binary_op_precedence(kind);

            if prec == 0 || prec < min_prec {
                break;
            }

            let operator_token = Shared::clone(self.next_or_eof()?);

            lhs = match &operator_token.kind {
                TokenKind::Is | TokenKind::As => {
                    let mode = if operator_token.kind == TokenKind::Is {
                        TypeCheckMode::Is
                    } else {
                        TypeCheckMode::As
                    };
                    let type_ref = self.parse_type_ref()?;
                    let range = lhs.range.merge(&type_ref.range());
                    Node::new(range, Expr::TypeCheck(lhs, type_ref, mode))
                }
                kind => {
                    let op = Self::binary_op(kind)
                        .ok_or_else(|| ParseError::UnexpectedToken((*operator_token).clone()))?;
                    let rhs = self.parse_binary_op(prec + 1)?;
                    let range = lhs.range.merge(&rhs.range);
                    Node::new(range, Expr::Binary(op, lhs, rhs))
                }
            };
        }

        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Shared<Node>, ParseError> {
        let op = match self.peek_token().map(|token| &token.kind) {
            Some(TokenKind::Not) => Some(UnaryOp::Not),
            Some(TokenKind::Minus) => Some(UnaryOp::Minus),
            Some(TokenKind::Tilde) => Some(UnaryOp::BitwiseNot),
            Some(TokenKind::LParen) => {
                if let Some(cast) = self.try_parse_cast()? {
                    return Ok(cast);
                }
                None
            }
            _ => None,
        };

        match op {
            Some(op) => {
                let op_token = Shared::clone(self.next_or_eof()?);
                let operand = self.parse_unary()?;
                let range = op_token.range.merge(&operand.range);
                Ok(Node::new(range, Expr::Unary(op, operand)))
            }
            None => {
                let primary = self.parse_primary_expr()?;
                self.parse_postfix(primary)
            }
        }
    }

    /// `(T)operand` where `T` is a known type and an operand follows the
    /// closing parenthesis.
    fn try_parse_cast(&mut self) -> Result<Option<Shared<Node>>, ParseError> {
        let saved = self.save();
        let lparen = Shared::clone(self.next_or_eof()?);

        let type_ref = match self.parse_type_ref() {
            Ok(type_ref) if !self.pending_gt => type_ref,
            _ => {
                self.restore(saved);
                return Ok(None);
            }
        };

        let is_cast = self.peek_is(|kind| matches!(kind, TokenKind::RParen)) && {
            let mut lookahead = self.tokens.clone();
            lookahead.next();
            lookahead
                .peek()
                .map(|token| token.kind.starts_operand())
                .unwrap_or(false)
        } && self.hints.is_type(&type_ref);

        if !is_cast {
            self.restore(saved);
            return Ok(None);
        }

        self.tokens.next();
        let operand = self.parse_unary()?;
        let range = lparen.range.merge(&operand.range);

        Ok(Some(Node::new(range, Expr::Cast(type_ref, operand))))
    }

    fn parse_primary_expr(&mut self) -> Result<Shared<Node>, ParseError> {
        let token = Shared::clone(self.next_or_eof()?);

        match &token.kind {
            TokenKind::BoolLiteral(b) => Ok(Self::literal(&token, Literal::Bool(*b))),
            TokenKind::IntLiteral(n) => Ok(Self::literal(&token, Literal::Int(*n))),
            TokenKind::FloatLiteral(n) => Ok(Self::literal(&token, Literal::Float(*n))),
            TokenKind::DoubleLiteral(n) => Ok(Self::literal(&token, Literal::Double(*n))),
            TokenKind::StringLiteral(s) => Ok(Self::literal(&token, Literal::String(s.clone()))),
            TokenKind::Null => Ok(Self::literal(&token, Literal::Null)),
            TokenKind::Ident(name) => {
                let ident = Ident::new_with_range(name, token.range);
                let type_args = self.try_parse_type_args(&[(name.clone(), 0)]);
                Ok(Node::new(token.range, Expr::Ident(ident, type_args)))
            }
            TokenKind::Alias(name) => Ok(Node::new(
                token.range,
                Expr::Ident(Ident::new_with_range(name, token.range), Vec::new()),
            )),
            TokenKind::LParen => self.parse_paren(token),
            TokenKind::New => self.parse_new(token),
            TokenKind::TypeOf => self.parse_typeof(token),
            TokenKind::Eof => Err(ParseError::UnexpectedEOFDetected),
            _ => Err(ParseError::UnexpectedToken((*token).clone())),
        }
    }

    fn literal(token: &Token, literal: Literal) -> Shared<Node> {
        Node::new(token.range, Expr::Literal(literal))
    }

    fn parse_paren(&mut self, lparen_token: Shared<Token>) -> Result<Shared<Node>, ParseError> {
        let expr_node = self.parse_expr()?;
        let rparen = self.next_or_eof()?;

        if rparen.kind != TokenKind::RParen {
            return Err(ParseError::ExpectedClosingParen((**rparen).clone()));
        }

        let range = lparen_token.range.merge(&rparen.range);
        Ok(Node::new(range, Expr::Paren(expr_node)))
    }

    fn parse_new(&mut self, new_token: Shared<Token>) -> Result<Shared<Node>, ParseError> {
        let type_ref = self.parse_type_ref()?;
        self.expect(|kind| matches!(kind, TokenKind::LParen))?;
        let (args, end) = self.parse_args()?;

        Ok(Node::new(
            new_token.range.merge(&end),
            Expr::New(type_ref, args),
        ))
    }

    fn parse_typeof(&mut self, typeof_token: Shared<Token>) -> Result<Shared<Node>, ParseError> {
        self.expect(|kind| matches!(kind, TokenKind::LParen))?;
        let type_ref = self.parse_type_ref()?;
        let rparen = self.next_or_eof()?;

        if rparen.kind != TokenKind::RParen {
            return Err(ParseError::ExpectedClosingParen((**rparen).clone()));
        }

        Ok(Node::new(
            typeof_token.range.merge(&rparen.range),
            Expr::TypeOf(type_ref),
        ))
    }

    /// Arguments after an opening parenthesis, up to and including `)`.
    fn parse_args(&mut self) -> Result<(Args, Range), ParseError> {
        let mut args = SmallVec::new();

        if let Some(token) = self.peek_token() {
            if token.kind == TokenKind::RParen {
                let range = token.range;
                self.tokens.next();
                return Ok((args, range));
            }
        }

        loop {
            args.push(self.parse_expr()?);

            let token = self.next_or_eof()?;
            match token.kind {
                TokenKind::Comma => continue,
                TokenKind::RParen => return Ok((args, token.range)),
                _ => return Err(ParseError::ExpectedClosingParen((**token).clone())),
            }
        }
    }

    fn parse_postfix(&mut self, mut node: Shared<Node>) -> Result<Shared<Node>, ParseError> {
        loop {
            match self.peek_token().map(|token| &token.kind) {
                Some(TokenKind::Dot) => {
                    self.tokens.next();
                    let token = Shared::clone(self.next_or_eof()?);
                    let name = match &token.kind {
                        TokenKind::Ident(name) => name.clone(),
                        TokenKind::Eof => return Err(ParseError::UnexpectedEOFDetected),
                        _ => return Err(ParseError::UnexpectedToken((*token).clone())),
                    };

                    let type_args = match node.dotted_path() {
                        Some(mut path) => {
                            path.push((name.clone(), 0));
                            self.try_parse_type_args(&path)
                        }
                        None => Vec::new(),
                    };
                    let range = node.range.merge(&token.range);
                    node = Node::new(
                        range,
                        Expr::Member(node, Ident::new_with_range(&name, token.range), type_args),
                    );
                }
                Some(TokenKind::LBracket) => {
                    self.tokens.next();
                    let index = self.parse_expr()?;
                    let rbracket = self.next_or_eof()?;

                    if rbracket.kind != TokenKind::RBracket {
                        return Err(ParseError::ExpectedClosingBracket((**rbracket).clone()));
                    }

                    let range = node.range.merge(&rbracket.range);
                    node = Node::new(range, Expr::Index(node, index));
                }
                Some(TokenKind::LParen) => {
                    self.tokens.next();
                    let (args, end) = self.parse_args()?;
                    let range = node.range.merge(&end);
                    node = Node::new(range, Expr::Call(node, args));
                }
                _ => return Ok(node),
            }
        }
    }

    /// Speculatively reads `<T, …>` after a chain segment. The list is kept
    /// only when it is well formed, is not followed by an operand, and the
    /// hints confirm the path names a generic type.
    fn try_parse_type_args(&mut self, path: &[(IdentName, usize)]) -> Vec<TypeRef> {
        if !self.peek_is(|kind| matches!(kind, TokenKind::Lt)) {
            return Vec::new();
        }

        let saved = self.save();

        match self.parse_type_args() {
            Ok(args) if !self.pending_gt && !self.followed_by_operand() => {
                let mut path = path.to_vec();
                if let Some(last) = path.last_mut() {
                    last.1 = args.len();
                }

                if self.hints.is_generic_type(&path) {
                    return args;
                }
                self.restore(saved);
                Vec::new()
            }
            _ => {
                self.restore(saved);
                Vec::new()
            }
        }
    }

    fn followed_by_operand(&mut self) -> bool {
        self.tokens
            .peek()
            .map(|token| token.kind.starts_operand() && token.kind != TokenKind::LParen)
            .unwrap_or(false)
    }

    fn parse_type_args(&mut self) -> Result<Vec<TypeRef>, ParseError> {
        self.expect(|kind| matches!(kind, TokenKind::Lt))?;
        let mut args = Vec::new();

        loop {
            args.push(self.parse_type_ref()?);

            if self.peek_is(|kind| matches!(kind, TokenKind::Comma)) && !self.pending_gt {
                self.tokens.next();
                continue;
            }

            self.expect_gt()?;
            return Ok(args);
        }
    }

    fn parse_type_ref(&mut self) -> Result<TypeRef, ParseError> {
        let mut segments = Vec::new();

        loop {
            let token = Shared::clone(self.next_or_eof()?);
            let ident = match &token.kind {
                TokenKind::Ident(name) => Ident::new_with_range(name, token.range),
                TokenKind::Eof => return Err(ParseError::UnexpectedEOFDetected),
                _ => return Err(ParseError::ExpectedTypeName((*token).clone())),
            };

            let args = if !self.pending_gt && self.peek_is(|kind| matches!(kind, TokenKind::Lt)) {
                self.parse_type_args()?
            } else {
                Vec::new()
            };

            segments.push(TypeSegment { ident, args });

            if !self.pending_gt && self.peek_is(|kind| matches!(kind, TokenKind::Dot)) {
                self.tokens.next();
                continue;
            }
            break;
        }

        let mut type_ref = TypeRef::Named(segments);

        while !self.pending_gt && self.peek_is(|kind| matches!(kind, TokenKind::LBracket)) {
            let mut lookahead = self.tokens.clone();
            lookahead.next();
            if !matches!(lookahead.peek().map(|token| &token.kind), Some(TokenKind::RBracket)) {
                break;
            }
            self.tokens.next();
            self.tokens.next();
            type_ref = TypeRef::Array(Box::new(type_ref));
        }

        Ok(type_ref)
    }

    fn expect_gt(&mut self) -> Result<(), ParseError> {
        if self.pending_gt {
            self.pending_gt = false;
            self.tokens.next();
            return Ok(());
        }

        let token = match self.peek_token() {
            Some(token) => token,
            None => return Err(ParseError::UnexpectedEOFDetected),
        };

        match token.kind {
            TokenKind::Gt => {
                self.tokens.next();
                Ok(())
            }
            TokenKind::ShiftRight => {
                self.pending_gt = true;
                Ok(())
            }
            TokenKind::Eof => Err(ParseError::UnexpectedEOFDetected),
            _ => Err(ParseError::UnexpectedToken((**token).clone())),
        }
    }

    #[inline(always)]
    fn save(&self) -> (Peekable<core::slice::Iter<'a, Shared<Token>>>, bool) {
        (self.tokens.clone(), self.pending_gt)
    }

    #[inline(always)]
    fn restore(&mut self, saved: (Peekable<core::slice::Iter<'a, Shared<Token>>>, bool)) {
        self.tokens = saved.0;
        self.pending_gt = saved.1;
    }

    #[inline(always)]
    fn peek_is(&mut self, expected_kinds: fn(&TokenKind) -> bool) -> bool {
        self.tokens
            .peek()
            .map(|token| expected_kinds(&token.kind))
            .unwrap_or(false)
    }

    #[inline(always)]
    fn peek_token(&mut self) -> Option<&'a Shared<Token>> {
        self.tokens.peek().copied()
    }

    fn next_or_eof(&mut self) -> Result<&'a Shared<Token>, ParseError> {
        self.tokens.next().ok_or(ParseError::UnexpectedEOFDetected)
    }

    fn expect(&mut self, expected_kinds: fn(&TokenKind) -> bool) -> Result<(), ParseError> {
        match self.peek_token() {
            Some(token) if expected_kinds(&token.kind) => {
                self.tokens.next();
                Ok(())
            }
            Some(token) if token.is_eof() => Err(ParseError::UnexpectedEOFDetected),
            Some(token) => Err(ParseError::UnexpectedToken((**token).clone())),
            None => Err(ParseError::UnexpectedEOFDetected),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::{Lexer, Options};
    use rstest::rstest;

    fn parse_with(code: &str, hints: &dyn TypeHints) -> Result<Shared<Node>, ParseError> {
        let tokens = Lexer::new(Options::default())
            .tokenize(code)
            .unwrap()
            .into_iter()
            .map(Shared::new)
            .collect::<Vec<_>>();
        Parser::new(tokens.iter(), hints).parse()
    }

    fn parse(code: &str) -> Result<Shared<Node>, ParseError> {
        parse_with(code, &NoHints)
    }

    /// Renders the tree in a compact prefix form for assertions.
    fn sexp(node: &Node) -> String {
        match &*node.expr {
            Expr::Literal(Literal::Bool(b)) => b.to_string(),
            Expr::Literal(Literal::Int(n)) => n.to_string(),
            Expr::Literal(Literal::Float(n)) => format!("{}f", n),
            Expr::Literal(Literal::Double(n)) => format!("{}d", n),
            Expr::Literal(Literal::String(s)) => format!("'{}'", s),
            Expr::Literal(Literal::Null) => "null".to_string(),
            Expr::Ident(ident, args) if args.is_empty() => ident.name.to_string(),
            Expr::Ident(ident, args) => format!("{}<{}>", ident.name, args.len()),
            Expr::Member(target, ident, args) if args.is_empty() => {
                format!("{}.{}", sexp(target), ident.name)
            }
            Expr::Member(target, ident, args) => {
                format!("{}.{}<{}>", sexp(target), ident.name, args.len())
            }
            Expr::Index(target, index) => format!("{}[{}]", sexp(target), sexp(index)),
            Expr::Call(callee, args) => format!(
                "{}({})",
                sexp(callee),
                args.iter().map(|arg| sexp(arg)).collect::<Vec<_>>().join(", ")
            ),
            Expr::Unary(op, operand) => format!("({}{})", op, sexp(operand)),
            Expr::Binary(op, left, right) => format!("({} {} {})", sexp(left), op, sexp(right)),
            Expr::Ternary(c, t, f) => format!("({} ? {} : {})", sexp(c), sexp(t), sexp(f)),
            Expr::New(type_ref, args) => format!(
                "new {}({})",
                type_ref,
                args.iter().map(|arg| sexp(arg)).collect::<Vec<_>>().join(", ")
            ),
            Expr::Cast(type_ref, operand) => format!("(cast {} {})", type_ref, sexp(operand)),
            Expr::TypeCheck(operand, type_ref, TypeCheckMode::Is) => {
                format!("({} is {})", sexp(operand), type_ref)
            }
            Expr::TypeCheck(operand, type_ref, TypeCheckMode::As) => {
                format!("({} as {})", sexp(operand), type_ref)
            }
            Expr::TypeOf(type_ref) => format!("typeof({})", type_ref),
            Expr::Paren(inner) => sexp(inner),
        }
    }

    #[rstest]
    #[case::precedence_mul("5 + 4 * 7", "(5 + (4 * 7))")]
    #[case::paren("(124 + 4) * 7", "((124 + 4) * 7)")]
    #[case::left_assoc("10 - 4 - 3", "((10 - 4) - 3)")]
    #[case::shift_below_add("1 + 2 << 3", "((1 + 2) << 3)")]
    #[case::bitwise("1 | 2 & 3", "(1 | (2 & 3))")]
    #[case::logical("a || b && c", "(a || (b && c))")]
    #[case::equality_over_logical("a == 1 && b != 2", "((a == 1) && (b != 2))")]
    #[case::relational("a < b == c >= d", "((a < b) == (c >= d))")]
    #[case::ternary("1 > 2 ? 5 : 6", "((1 > 2) ? 5 : 6)")]
    #[case::nested_ternary("a ? b : c ? d : e", "(a ? b : (c ? d : e))")]
    #[case::unary("!a && -b", "((!a) && (-b))")]
    #[case::bitwise_not("~5 + 1", "((~5) + 1)")]
    #[case::member_chain("vec3List[3].z", "vec3List[3].z")]
    #[case::nested_index("thing.vec3Array[thing.vec3Dic]", "thing.vec3Array[thing.vec3Dic]")]
    #[case::braces("{ value.Length }", "value.Length")]
    #[case::alias("$alias * 2", "($alias * 2)")]
    #[case::call("rgb(1, 0, 0.5f)", "rgb(1, 0, 0.5f)")]
    #[case::typeof_int("typeof(int)", "typeof(int)")]
    #[case::typeof_array("typeof(int[])", "typeof(int[])")]
    #[case::typeof_generic("typeof(List<Dictionary<string, int>>)", "typeof(List<Dictionary<string, int>>)")]
    #[case::new("new ThingWithOptionals(8, new Vector3(1f, 2f, 3f))", "new ThingWithOptionals(8, new Vector3(1f, 2f, 3f))")]
    #[case::new_empty("new Vector3()", "new Vector3()")]
    #[case::cast("(int)5.5f + 1", "((cast int 5.5f) + 1)")]
    #[case::cast_member("(float)thing.value", "(cast float thing.value)")]
    #[case::not_cast_minus("(value) - 1", "(value - 1)")]
    #[case::paren_ident("(value)", "value")]
    #[case::is("obj is string", "(obj is string)")]
    #[case::as_generic("obj as List<int>", "(obj as List<int>)")]
    #[case::is_with_logic("a is int && b", "((a is int) && b)")]
    #[case::generic_member("TypeChainEnd<Vector3>.Value", "TypeChainEnd<1>.Value")]
    #[case::nested_generic("SubType1<int>.NestedSubType1<int>.NestedIntValue", "SubType1<1>.NestedSubType1<1>.NestedIntValue")]
    #[case::generic_two_args("SubType1<string, UnityEngine.Vector3>.StringValue", "SubType1<2>.StringValue")]
    #[case::comparison_not_generic("a < b > c", "((a < b) > c)")]
    #[case::comparison_chain("a < b && c > d", "((a < b) && (c > d))")]
    #[case::strings("'string1' + 'string2'", "('string1' + 'string2')")]
    #[case::null_equality("value == null", "(value == null)")]
    fn test_parse(#[case] code: &str, #[case] expected: &str) {
        assert_eq!(sexp(&parse(code).unwrap()), expected);
    }

    #[rstest]
    #[case::empty("", ParseError::UnexpectedEOFDetected)]
    #[case::trailing_operator("1 +", ParseError::UnexpectedEOFDetected)]
    #[case::missing_colon("a ? b", ParseError::UnexpectedEOFDetected)]
    fn test_parse_eof(#[case] code: &str, #[case] expected: ParseError) {
        assert_eq!(parse(code), Err(expected));
    }

    #[rstest]
    #[case::unclosed_paren("(1 + 2")]
    #[case::unclosed_call("rgb(1, 2")]
    fn test_expected_closing_paren(#[case] code: &str) {
        assert!(matches!(parse(code), Err(ParseError::ExpectedClosingParen(_))));
    }

    #[test]
    fn test_expected_closing_bracket() {
        assert!(matches!(
            parse("list[1"),
            Err(ParseError::ExpectedClosingBracket(_))
        ));
    }

    #[test]
    fn test_expected_closing_brace() {
        assert!(matches!(
            parse("{ value"),
            Err(ParseError::ExpectedClosingBrace(_))
        ));
    }

    #[test]
    fn test_unexpected_trailing_token() {
        assert!(matches!(parse("1 2"), Err(ParseError::UnexpectedToken(_))));
    }

    #[test]
    fn test_expected_type_name() {
        assert!(matches!(
            parse("typeof(5)"),
            Err(ParseError::ExpectedTypeName(_))
        ));
    }

    struct GenericLess;

    impl TypeHints for GenericLess {
        fn is_type(&self, _type_ref: &TypeRef) -> bool {
            false
        }

        fn is_generic_type(&self, _path: &[(IdentName, usize)]) -> bool {
            false
        }
    }

    #[test]
    fn test_hints_reject_generic_and_cast() {
        let node = parse_with("(a)!b", &GenericLess);
        assert!(node.is_err());

        let node = parse_with("Foo<int>.Bar", &GenericLess);
        assert!(node.is_err());
    }

    #[test]
    fn test_ranges_cover_chain() {
        let node = parse("abc.def").unwrap();
        assert_eq!(node.range.start.offset, 0);
        assert_eq!(node.range.end.offset, 7);
    }
}
