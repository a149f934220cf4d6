use super::ast::{BinaryOp, Expr, Part, Stmt, UnaryOp};
use super::lexer::{Token, TokenKind, lex};
use crate::error::ScriptError;
use crate::interpolate::{self, Segment};

/// Deepest operand nesting accepted, counting brackets, prefix operators
/// and interpolations inside double-quoted strings.
pub(crate) const MAX_EXPRESSION_DEPTH: usize = 64;

pub(crate) fn parse(source: &str) -> Result<Vec<Stmt>, ScriptError> {
    parse_nested(source, 0)
}

fn parse_nested(source: &str, depth: usize) -> Result<Vec<Stmt>, ScriptError> {
    let tokens = lex(source)?;
    let mut parser = Parser {
        source,
        tokens,
        position: 0,
        depth,
    };
    parser.program()
}

struct Parser<'src> {
    source: &'src str,
    tokens: Vec<Token>,
    position: usize,
    depth: usize,
}

impl<'src> Parser<'src> {
    fn program(&mut self) -> Result<Vec<Stmt>, ScriptError> {
        let mut stmts = Vec::new();
        loop {
            while self.eat(TokenKind::Semi) {}
            if self.at(TokenKind::Eof) {
                break;
            }
            stmts.push(self.statement()?);
            if !self.at(TokenKind::Eof) && !self.at(TokenKind::Semi) {
                return Err(self.error("unexpected trailing input"));
            }
        }
        Ok(stmts)
    }

    fn statement(&mut self) -> Result<Stmt, ScriptError> {
        if self.at(TokenKind::Ident) && self.peek_kind(1) == TokenKind::Equal {
            let name = self.text(self.current()).to_string();
            self.position += 2;
            let value = self.expression()?;
            return Ok(Stmt::Assign { name, value });
        }
        Ok(Stmt::Expr(self.expression()?))
    }

    fn expression(&mut self) -> Result<Expr, ScriptError> {
        self.binary_level(0)
    }

    /// Left-associative binary operators, loosest first.
    fn binary_level(&mut self, level: usize) -> Result<Expr, ScriptError> {
        const LEVELS: &[&[(TokenKind, BinaryOp)]] = &[
            &[(TokenKind::OrOr, BinaryOp::Or)],
            &[(TokenKind::AndAnd, BinaryOp::And)],
            &[(TokenKind::EqEq, BinaryOp::Eq), (TokenKind::NotEq, BinaryOp::Ne)],
            &[
                (TokenKind::Less, BinaryOp::Lt),
                (TokenKind::LessEq, BinaryOp::Le),
                (TokenKind::Greater, BinaryOp::Gt),
                (TokenKind::GreaterEq, BinaryOp::Ge),
            ],
            &[(TokenKind::Plus, BinaryOp::Add), (TokenKind::Minus, BinaryOp::Sub)],
            &[
                (TokenKind::Star, BinaryOp::Mul),
                (TokenKind::Slash, BinaryOp::Div),
                (TokenKind::Percent, BinaryOp::Rem),
            ],
        ];

        let Some(operators) = LEVELS.get(level) else {
            return self.unary();
        };
        let mut left = self.binary_level(level + 1)?;
        while let Some(&(_, op)) = operators
            .iter()
            .find(|(kind, _)| *kind == self.current().kind)
        {
            self.position += 1;
            let right = self.binary_level(level + 1)?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, ScriptError> {
        if self.depth >= MAX_EXPRESSION_DEPTH {
            return Err(self.error("expression nests too deeply"));
        }
        self.depth += 1;
        let expr = self.prefixed();
        self.depth -= 1;
        expr
    }

    fn prefixed(&mut self) -> Result<Expr, ScriptError> {
        let op = if self.eat(TokenKind::Bang) {
            UnaryOp::Not
        } else if self.eat(TokenKind::Minus) {
            UnaryOp::Neg
        } else {
            return self.postfix();
        };
        let operand = self.unary()?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn postfix(&mut self) -> Result<Expr, ScriptError> {
        let mut expr = self.primary()?;
        loop {
            if self.eat(TokenKind::Dot) {
                let name = self.expect(TokenKind::Ident, "expected a method name")?;
                let method = self.text(name).to_string();
                let args = if self.eat(TokenKind::LParen) {
                    self.list(TokenKind::RParen)?
                } else {
                    Vec::new()
                };
                expr = Expr::Call {
                    receiver: Box::new(expr),
                    method,
                    args,
                };
            } else if self.eat(TokenKind::LBracket) {
                let index = self.expression()?;
                self.expect(TokenKind::RBracket, "expected `]`")?;
                expr = Expr::Index {
                    target: Box::new(expr),
                    index: Box::new(index),
                };
            } else {
                return Ok(expr);
            }
        }
    }

    fn primary(&mut self) -> Result<Expr, ScriptError> {
        let token = self.current();
        let text = self.text(token);
        let expr = match token.kind {
            TokenKind::Nil => Expr::Nil,
            TokenKind::True => Expr::Bool(true),
            TokenKind::False => Expr::Bool(false),
            TokenKind::IntLiteral => {
                let digits = text.replace('_', "");
                let value = digits
                    .parse::<i64>()
                    .map_err(|_| self.error("integer literal out of range"))?;
                Expr::Int(value)
            }
            TokenKind::FloatLiteral => {
                let digits = text.replace('_', "");
                let value = digits
                    .parse::<f64>()
                    .map_err(|_| self.error("invalid float literal"))?;
                Expr::Float(value)
            }
            TokenKind::SingleString => Expr::Str(unescape_single(text)),
            TokenKind::DoubleString => self.double_string(text)?,
            TokenKind::Symbol => Expr::Str(text.to_string()),
            TokenKind::Ident => Expr::Var(text.to_string()),
            TokenKind::LParen => {
                self.position += 1;
                let expr = self.expression()?;
                self.expect(TokenKind::RParen, "expected `)`")?;
                return Ok(expr);
            }
            TokenKind::LBracket => {
                self.position += 1;
                return Ok(Expr::Array(self.list(TokenKind::RBracket)?));
            }
            TokenKind::LBrace => {
                self.position += 1;
                return self.hash();
            }
            TokenKind::Eof => return Err(self.error("unexpected end of input")),
            _ => return Err(self.error("unexpected token")),
        };
        self.position += 1;
        Ok(expr)
    }

    fn double_string(&self, text: &str) -> Result<Expr, ScriptError> {
        let mut parts = Vec::new();
        for segment in interpolate::split(text) {
            match segment {
                Segment::Text(literal) => parts.push(Part::Text(literal)),
                Segment::Code(code) => {
                    parts.push(Part::Code(parse_nested(code, self.depth + 1)?))
                }
            }
        }
        if parts.is_empty() {
            return Ok(Expr::Str(String::new()));
        }
        if let [Part::Text(literal)] = parts.as_slice() {
            return Ok(Expr::Str(literal.clone()));
        }
        Ok(Expr::Interpolated(parts))
    }

    /// Comma-separated expressions up to `close`; a trailing comma is allowed.
    fn list(&mut self, close: TokenKind) -> Result<Vec<Expr>, ScriptError> {
        let mut items = Vec::new();
        while !self.eat(close) {
            items.push(self.expression()?);
            if !self.eat(TokenKind::Comma) {
                self.expect(close, "expected `,` or a closing bracket")?;
                break;
            }
        }
        Ok(items)
    }

    fn hash(&mut self) -> Result<Expr, ScriptError> {
        let mut entries = Vec::new();
        while !self.eat(TokenKind::RBrace) {
            let token = self.current();
            let is_label = matches!(
                token.kind,
                TokenKind::Ident | TokenKind::SingleString | TokenKind::DoubleString
            ) && self.peek_kind(1) == TokenKind::Colon;

            let key = if is_label {
                self.position += 2;
                match token.kind {
                    TokenKind::SingleString => Expr::Str(unescape_single(self.text(token))),
                    _ => Expr::Str(self.text(token).to_string()),
                }
            } else {
                let key = self.expression()?;
                self.expect(TokenKind::FatArrow, "expected `=>` after hash key")?;
                key
            };
            let value = self.expression()?;
            entries.push((key, value));

            if !self.eat(TokenKind::Comma) {
                self.expect(TokenKind::RBrace, "expected `,` or `}`")?;
                break;
            }
        }
        Ok(Expr::Hash(entries))
    }

    fn current(&self) -> Token {
        self.tokens[self.position.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self, offset: usize) -> TokenKind {
        self.tokens
            .get(self.position + offset)
            .map_or(TokenKind::Eof, |token| token.kind)
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.current().kind == kind
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) && kind != TokenKind::Eof {
            self.position += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, message: &str) -> Result<Token, ScriptError> {
        let token = self.current();
        if self.eat(kind) {
            Ok(token)
        } else {
            Err(self.error(message))
        }
    }

    fn text(&self, token: Token) -> &'src str {
        &self.source[token.text_start..token.text_end]
    }

    fn error(&self, message: &str) -> ScriptError {
        ScriptError::Syntax {
            position: self.current().text_start,
            message: message.to_string(),
        }
    }
}

/// Single-quoted strings only unescape `\'` and `\\`.
fn unescape_single(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(&next) = chars.peek().filter(|next| matches!(next, '\'' | '\\')) {
                out.push(next);
                chars.next();
                continue;
            }
        }
        out.push(ch);
    }
    out
}
