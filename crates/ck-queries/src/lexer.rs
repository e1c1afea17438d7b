//! Tokenizer for predicate text
//!
//! String literals may use single or double quotes; both produce the same
//! token, which is how quote style gets normalized before parsing.

use std::fmt;
use std::iter::Peekable;
use std::str::CharIndices;

/// A lexical token
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String),
    /// Magnitude of an integer literal; a leading `-` is a separate token
    Int(u64),
    Float(f64),
    Str(String),
    True,
    False,
    Null,
    Arrow,
    Dot,
    Comma,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Bang,
    AndAnd,
    OrOr,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(name) => write!(f, "identifier '{}'", name),
            Token::Int(i) => write!(f, "number {}", i),
            Token::Float(x) => write!(f, "number {}", x),
            Token::Str(s) => write!(f, "string \"{}\"", s),
            Token::True => f.write_str("'true'"),
            Token::False => f.write_str("'false'"),
            Token::Null => f.write_str("'null'"),
            Token::Arrow => f.write_str("'=>'"),
            Token::Dot => f.write_str("'.'"),
            Token::Comma => f.write_str("','"),
            Token::LParen => f.write_str("'('"),
            Token::RParen => f.write_str("')'"),
            Token::LBracket => f.write_str("'['"),
            Token::RBracket => f.write_str("']'"),
            Token::Bang => f.write_str("'!'"),
            Token::AndAnd => f.write_str("'&&'"),
            Token::OrOr => f.write_str("'||'"),
            Token::EqEq => f.write_str("'=='"),
            Token::NotEq => f.write_str("'!='"),
            Token::Lt => f.write_str("'<'"),
            Token::Le => f.write_str("'<='"),
            Token::Gt => f.write_str("'>'"),
            Token::Ge => f.write_str("'>='"),
            Token::Plus => f.write_str("'+'"),
            Token::Minus => f.write_str("'-'"),
            Token::Star => f.write_str("'*'"),
            Token::Slash => f.write_str("'/'"),
            Token::Percent => f.write_str("'%'"),
            Token::Eof => f.write_str("end of input"),
        }
    }
}

/// Error raised while tokenizing or parsing predicate text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    /// Byte offset into the input
    pub position: usize,
    pub message: String,
}

impl SyntaxError {
    pub fn new(position: usize, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at position {}", self.message, self.position)
    }
}

impl std::error::Error for SyntaxError {}

/// Tokenizer over predicate text
pub struct Lexer<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
        }
    }

    /// Tokenize the whole input; the last token is always `Eof`
    pub fn tokenize(mut self) -> Result<Vec<(usize, Token)>, SyntaxError> {
        let mut tokens = Vec::new();
        loop {
            let (position, token) = self.next_token()?;
            let done = token == Token::Eof;
            tokens.push((position, token));
            if done {
                return Ok(tokens);
            }
        }
    }

    fn next_token(&mut self) -> Result<(usize, Token), SyntaxError> {
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_whitespace() {
                self.chars.next();
            } else {
                break;
            }
        }

        let Some((start, c)) = self.chars.next() else {
            return Ok((self.input.len(), Token::Eof));
        };

        let token = match c {
            '(' => Token::LParen,
            ')' => Token::RParen,
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            ',' => Token::Comma,
            '.' => Token::Dot,
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '%' => Token::Percent,
            '!' => {
                if self.eat('=') {
                    Token::NotEq
                } else {
                    Token::Bang
                }
            }
            '=' => {
                if self.eat('=') {
                    Token::EqEq
                } else if self.eat('>') {
                    Token::Arrow
                } else {
                    return Err(SyntaxError::new(start, "expected '==' or '=>' after '='"));
                }
            }
            '<' => {
                if self.eat('=') {
                    Token::Le
                } else {
                    Token::Lt
                }
            }
            '>' => {
                if self.eat('=') {
                    Token::Ge
                } else {
                    Token::Gt
                }
            }
            '&' => {
                if self.eat('&') {
                    Token::AndAnd
                } else {
                    return Err(SyntaxError::new(start, "expected '&&'"));
                }
            }
            '|' => {
                if self.eat('|') {
                    Token::OrOr
                } else {
                    return Err(SyntaxError::new(start, "expected '||'"));
                }
            }
            '"' | '\'' => self.string(start, c)?,
            c if c.is_ascii_digit() => self.number(start)?,
            c if c.is_alphabetic() || c == '_' => self.word(start),
            other => {
                return Err(SyntaxError::new(
                    start,
                    format!("unexpected character '{}'", other),
                ))
            }
        };

        Ok((start, token))
    }

    fn eat(&mut self, expected: char) -> bool {
        match self.chars.peek() {
            Some(&(_, c)) if c == expected => {
                self.chars.next();
                true
            }
            _ => false,
        }
    }

    fn string(&mut self, start: usize, quote: char) -> Result<Token, SyntaxError> {
        let mut value = String::new();
        while let Some((position, c)) = self.chars.next() {
            match c {
                '\\' => match self.chars.next() {
                    Some((_, 'n')) => value.push('\n'),
                    Some((_, 't')) => value.push('\t'),
                    Some((_, 'r')) => value.push('\r'),
                    Some((_, escaped @ ('\\' | '"' | '\''))) => value.push(escaped),
                    Some((_, other)) => {
                        return Err(SyntaxError::new(
                            position,
                            format!("unknown escape sequence '\\{}'", other),
                        ))
                    }
                    None => break,
                },
                c if c == quote => return Ok(Token::Str(value)),
                c => value.push(c),
            }
        }
        Err(SyntaxError::new(start, "unterminated string literal"))
    }

    fn number(&mut self, start: usize) -> Result<Token, SyntaxError> {
        let mut end = start + 1;
        let mut is_float = false;
        while let Some(&(position, c)) = self.chars.peek() {
            if c.is_ascii_digit() {
                self.chars.next();
                end = position + 1;
            } else if c == '.' && !is_float && self.digit_follows(position) {
                is_float = true;
                self.chars.next();
                end = position + 1;
            } else {
                break;
            }
        }

        let text = &self.input[start..end];
        if is_float {
            text.parse::<f64>()
                .map(Token::Float)
                .map_err(|_| SyntaxError::new(start, format!("invalid number '{}'", text)))
        } else {
            text.parse::<u64>()
                .map(Token::Int)
                .map_err(|_| SyntaxError::new(start, format!("integer '{}' is too large", text)))
        }
    }

    /// A '.' only continues a number when a digit follows it; otherwise it is
    /// member access on the literal.
    fn digit_follows(&self, dot_position: usize) -> bool {
        self.input[dot_position + 1..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_digit())
    }

    fn word(&mut self, start: usize) -> Token {
        let mut end = start + self.input[start..].chars().next().map_or(1, char::len_utf8);
        while let Some(&(position, c)) = self.chars.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.chars.next();
                end = position + c.len_utf8();
            } else {
                break;
            }
        }

        match &self.input[start..end] {
            "true" | "True" => Token::True,
            "false" | "False" => Token::False,
            "null" | "Null" => Token::Null,
            "AndAlso" | "and" => Token::AndAnd,
            "OrElse" | "or" => Token::OrOr,
            "not" => Token::Bang,
            ident => Token::Ident(ident.to_string()),
        }
    }
}
