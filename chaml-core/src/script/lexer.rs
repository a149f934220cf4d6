//! Lexer for embedded script code.

use crate::error::ScriptError;
use crate::scan;

/// Kind of a token produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenKind {
    // Special
    Eof,

    // Identifiers and literals
    Ident,
    IntLiteral,
    FloatLiteral,
    SingleString, // 'text', no interpolation
    DoubleString, // "text #{code}"
    Symbol,       // :name

    // Punctuation
    LParen,   // (
    RParen,   // )
    LBrace,   // {
    RBrace,   // }
    LBracket, // [
    RBracket, // ]
    Comma,    // ,
    Semi,     // ; or a newline outside brackets
    Colon,    // :
    Dot,      // .

    // Operators
    Equal,     // =
    FatArrow,  // =>
    EqEq,      // ==
    NotEq,     // !=
    Less,      // <
    LessEq,    // <=
    Greater,   // >
    GreaterEq, // >=
    Plus,      // +
    Minus,     // -
    Star,      // *
    Slash,     // /
    Percent,   // %
    Bang,      // !
    AndAnd,    // &&
    OrOr,      // ||

    // Keywords
    True,
    False,
    Nil,
}

/// A token and the byte range of its text.
///
/// For strings and symbols the range covers the contents only, without
/// quotes or the leading colon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub text_start: usize,
    pub text_end: usize,
}

pub(crate) fn lex(source: &str) -> Result<Vec<Token>, ScriptError> {
    let mut lexer = Lexer {
        source,
        chars: source.as_bytes(),
        len: source.len(),
        index: 0,
        depth: 0,
    };
    lexer.run()
}

struct Lexer<'src> {
    source: &'src str,
    chars: &'src [u8],
    len: usize,
    index: usize,
    depth: usize,
}

impl<'src> Lexer<'src> {
    fn run(&mut self) -> Result<Vec<Token>, ScriptError> {
        let mut tokens = Vec::new();

        while let Some(ch) = self.peek_char() {
            if ch == b'\n' && self.depth == 0 {
                let start = self.index;
                self.consume_char();
                tokens.push(self.token(TokenKind::Semi, start));
                continue;
            }
            if is_whitespace(ch) {
                self.consume_char();
                continue;
            }

            let start = self.index;
            let token = match ch {
                b'(' | b'{' | b'[' => {
                    self.consume_char();
                    self.depth += 1;
                    let kind = match ch {
                        b'(' => TokenKind::LParen,
                        b'{' => TokenKind::LBrace,
                        _ => TokenKind::LBracket,
                    };
                    self.token(kind, start)
                }
                b')' | b'}' | b']' => {
                    self.consume_char();
                    self.depth = self.depth.saturating_sub(1);
                    let kind = match ch {
                        b')' => TokenKind::RParen,
                        b'}' => TokenKind::RBrace,
                        _ => TokenKind::RBracket,
                    };
                    self.token(kind, start)
                }
                b',' => self.single(TokenKind::Comma, start),
                b';' => self.single(TokenKind::Semi, start),
                b'.' => self.single(TokenKind::Dot, start),
                b'+' => self.single(TokenKind::Plus, start),
                b'-' => self.single(TokenKind::Minus, start),
                b'*' => self.single(TokenKind::Star, start),
                b'/' => self.single(TokenKind::Slash, start),
                b'%' => self.single(TokenKind::Percent, start),
                b':' => {
                    let after_ident = start > 0 && is_ident_continue(self.chars[start - 1]);
                    match self.peek_next() {
                        Some(next) if is_ident_start(next) && !after_ident => {
                            self.consume_char();
                            self.lex_word(start + 1, TokenKind::Symbol)
                        }
                        _ => self.single(TokenKind::Colon, start),
                    }
                }
                b'=' => match self.peek_next() {
                    Some(b'=') => self.double(TokenKind::EqEq, start),
                    Some(b'>') => self.double(TokenKind::FatArrow, start),
                    _ => self.single(TokenKind::Equal, start),
                },
                b'!' => match self.peek_next() {
                    Some(b'=') => self.double(TokenKind::NotEq, start),
                    _ => self.single(TokenKind::Bang, start),
                },
                b'<' => match self.peek_next() {
                    Some(b'=') => self.double(TokenKind::LessEq, start),
                    _ => self.single(TokenKind::Less, start),
                },
                b'>' => match self.peek_next() {
                    Some(b'=') => self.double(TokenKind::GreaterEq, start),
                    _ => self.single(TokenKind::Greater, start),
                },
                b'&' if self.peek_next() == Some(b'&') => self.double(TokenKind::AndAnd, start),
                b'|' if self.peek_next() == Some(b'|') => self.double(TokenKind::OrOr, start),
                b'\'' | b'"' => self.lex_string(ch, start)?,
                b'0'..=b'9' => self.lex_number(start),
                _ if is_ident_start(ch) => self.lex_ident_or_keyword(start),
                _ => return Err(self.unexpected_char(start)),
            };
            tokens.push(token);
        }

        tokens.push(self.token(TokenKind::Eof, self.len));
        Ok(tokens)
    }

    fn token(&self, kind: TokenKind, start: usize) -> Token {
        Token {
            kind,
            text_start: start,
            text_end: self.index,
        }
    }

    fn single(&mut self, kind: TokenKind, start: usize) -> Token {
        self.consume_char();
        self.token(kind, start)
    }

    fn double(&mut self, kind: TokenKind, start: usize) -> Token {
        self.consume_char();
        self.consume_char();
        self.token(kind, start)
    }

    fn unexpected_char(&self, start: usize) -> ScriptError {
        let ch = self.source[start..].chars().next().unwrap_or('?');
        ScriptError::Syntax {
            position: start,
            message: format!("unexpected character `{ch}`"),
        }
    }

    fn lex_string(&mut self, quote: u8, start: usize) -> Result<Token, ScriptError> {
        // Consume the opening quote
        self.consume_char();

        let content_start = self.index;
        while let Some(ch) = self.peek_char() {
            match ch {
                _ if ch == quote => {
                    let content_end = self.index;
                    self.consume_char();
                    let kind = if quote == b'"' {
                        TokenKind::DoubleString
                    } else {
                        TokenKind::SingleString
                    };
                    return Ok(Token {
                        kind,
                        text_start: content_start,
                        text_end: content_end,
                    });
                }
                b'\\' => {
                    self.consume_char();
                    self.consume_char();
                }
                b'#' if quote == b'"' && self.peek_next() == Some(b'{') => {
                    self.index = scan::balanced_end(self.chars, self.index + 1);
                }
                _ => self.consume_char(),
            }
        }

        Err(ScriptError::Syntax {
            position: start,
            message: "unterminated string literal".to_string(),
        })
    }

    fn lex_number(&mut self, start: usize) -> Token {
        // integer or float: digits [ '.' digits ]?
        self.skip_digits();

        let mut is_float = false;
        if self.peek_char() == Some(b'.') && self.peek_next().is_some_and(|ch| ch.is_ascii_digit()) {
            is_float = true;
            self.consume_char(); // '.'
            self.skip_digits();
        }

        let kind = if is_float {
            TokenKind::FloatLiteral
        } else {
            TokenKind::IntLiteral
        };
        self.token(kind, start)
    }

    fn skip_digits(&mut self) {
        while let Some(b'0'..=b'9' | b'_') = self.peek_char() {
            self.consume_char();
        }
    }

    fn lex_ident_or_keyword(&mut self, start: usize) -> Token {
        let token = self.lex_word(start, TokenKind::Ident);
        let kind = match &self.source[token.text_start..token.text_end] {
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "nil" => TokenKind::Nil,
            _ => TokenKind::Ident,
        };
        Token { kind, ..token }
    }

    /// Reads `[@$]?ident[?!]?` starting at the current byte.
    fn lex_word(&mut self, text_start: usize, kind: TokenKind) -> Token {
        while let Some(b'@' | b'$') = self.peek_char() {
            self.consume_char();
        }
        while let Some(ch) = self.peek_char() {
            if is_ident_continue(ch) {
                self.consume_char();
            } else {
                break;
            }
        }
        if let Some(b'?' | b'!') = self.peek_char() {
            if self.peek_next() != Some(b'=') {
                self.consume_char();
            }
        }
        Token {
            kind,
            text_start,
            text_end: self.index,
        }
    }

    fn peek_char(&self) -> Option<u8> {
        self.chars.get(self.index).copied()
    }

    fn peek_next(&self) -> Option<u8> {
        self.chars.get(self.index + 1).copied()
    }

    fn consume_char(&mut self) {
        if self.index < self.len {
            self.index += 1;
        }
    }
}

fn is_whitespace(ch: u8) -> bool {
    matches!(ch, b' ' | b'\t' | b'\n' | b'\r')
}

fn is_ident_start(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || matches!(ch, b'_' | b'@' | b'$')
}

fn is_ident_continue(ch: u8) -> bool {
    ch.is_ascii_alphanumeric() || ch == b'_'
}
