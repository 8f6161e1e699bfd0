//! Tokenizer for where-clause predicates

use geosift_core::error::{GeosiftError, Result};
use std::collections::HashMap;
use std::fmt;

/// Token types in a where clause
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    // Literals
    Number,
    String,

    // Identifiers
    Identifier,

    // Keywords
    And,
    Or,
    Not,
    In,
    Between,
    Is,
    Null,
    Like,
    ILike,
    True,
    False,
    Date,
    Timestamp,

    // Operators
    Equal,              // =, ==
    NotEqual,           // !=, <>
    LessThan,           // <
    LessThanOrEqual,    // <=
    GreaterThan,        // >
    GreaterThanOrEqual, // >=

    // Punctuation
    LeftParen,
    RightParen,
    Comma,

    Eof,
}

/// A token with its type, text and byte offset
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub token_type: TokenType,
    pub value: String,
    pub position: usize,
}

impl Token {
    pub fn new(token_type: TokenType, value: impl Into<String>, position: usize) -> Self {
        Self { token_type, value: value.into(), position }
    }

    pub fn is_comparison(&self) -> bool {
        use TokenType::*;
        matches!(
            self.token_type,
            Equal | NotEqual | LessThan | LessThanOrEqual | GreaterThan | GreaterThanOrEqual
        )
    }

    /// Text used when reporting this token in an error
    pub fn describe(&self) -> String {
        match self.token_type {
            TokenType::Eof => "end of input".to_string(),
            TokenType::String => format!("'{}'", self.value),
            _ => self.value.clone(),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self.token_type, self.value)
    }
}

/// Where-clause lexer
pub struct Lexer {
    keywords: HashMap<&'static str, TokenType>,
}

impl Default for Lexer {
    fn default() -> Self {
        Self::new()
    }
}

impl Lexer {
    pub fn new() -> Self {
        let mut keywords = HashMap::new();
        keywords.insert("AND", TokenType::And);
        keywords.insert("OR", TokenType::Or);
        keywords.insert("NOT", TokenType::Not);
        keywords.insert("IN", TokenType::In);
        keywords.insert("BETWEEN", TokenType::Between);
        keywords.insert("IS", TokenType::Is);
        keywords.insert("NULL", TokenType::Null);
        keywords.insert("LIKE", TokenType::Like);
        keywords.insert("ILIKE", TokenType::ILike);
        keywords.insert("TRUE", TokenType::True);
        keywords.insert("FALSE", TokenType::False);
        keywords.insert("DATE", TokenType::Date);
        keywords.insert("TIMESTAMP", TokenType::Timestamp);
        Self { keywords }
    }

    /// Split `input` into tokens, ending with an `Eof` token
    pub fn tokenize(&self, input: &str) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        let mut chars = input.char_indices().peekable();

        while let Some(&(pos, c)) = chars.peek() {
            match c {
                c if c.is_whitespace() => {
                    chars.next();
                }
                '(' => {
                    chars.next();
                    tokens.push(Token::new(TokenType::LeftParen, "(", pos));
                }
                ')' => {
                    chars.next();
                    tokens.push(Token::new(TokenType::RightParen, ")", pos));
                }
                ',' => {
                    chars.next();
                    tokens.push(Token::new(TokenType::Comma, ",", pos));
                }
                '=' => {
                    chars.next();
                    if matches!(chars.peek(), Some((_, '='))) {
                        chars.next();
                        tokens.push(Token::new(TokenType::Equal, "==", pos));
                    } else {
                        tokens.push(Token::new(TokenType::Equal, "=", pos));
                    }
                }
                '!' => {
                    chars.next();
                    if matches!(chars.peek(), Some((_, '='))) {
                        chars.next();
                        tokens.push(Token::new(TokenType::NotEqual, "!=", pos));
                    } else {
                        return Err(syntax_error(pos, "!", "expected '=' after '!'"));
                    }
                }
                '<' => {
                    chars.next();
                    match chars.peek() {
                        Some((_, '=')) => {
                            chars.next();
                            tokens.push(Token::new(TokenType::LessThanOrEqual, "<=", pos));
                        }
                        Some((_, '>')) => {
                            chars.next();
                            tokens.push(Token::new(TokenType::NotEqual, "<>", pos));
                        }
                        _ => tokens.push(Token::new(TokenType::LessThan, "<", pos)),
                    }
                }
                '>' => {
                    chars.next();
                    if matches!(chars.peek(), Some((_, '='))) {
                        chars.next();
                        tokens.push(Token::new(TokenType::GreaterThanOrEqual, ">=", pos));
                    } else {
                        tokens.push(Token::new(TokenType::GreaterThan, ">", pos));
                    }
                }
                '\'' => {
                    chars.next();
                    let value = read_quoted(&mut chars, '\'')
                        .ok_or_else(|| syntax_error(pos, &input[pos..], "unterminated string"))?;
                    tokens.push(Token::new(TokenType::String, value, pos));
                }
                '"' => {
                    chars.next();
                    let value = read_quoted(&mut chars, '"').ok_or_else(|| {
                        syntax_error(pos, &input[pos..], "unterminated quoted identifier")
                    })?;
                    tokens.push(Token::new(TokenType::Identifier, value, pos));
                }
                c if c.is_ascii_digit() || c == '.' || c == '-' || c == '+' => {
                    let end = scan_number(input, pos);
                    let text = &input[pos..end];
                    if text.parse::<f64>().is_err() {
                        let shown = if text.is_empty() { &input[pos..pos + c.len_utf8()] } else { text };
                        return Err(syntax_error(pos, shown, "malformed number"));
                    }
                    while matches!(chars.peek(), Some(&(i, _)) if i < end) {
                        chars.next();
                    }
                    tokens.push(Token::new(TokenType::Number, text, pos));
                }
                c if c.is_alphabetic() || c == '_' => {
                    let mut end = pos;
                    while let Some(&(i, ch)) = chars.peek() {
                        if ch.is_alphanumeric() || ch == '_' || ch == '.' {
                            end = i + ch.len_utf8();
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    let word = &input[pos..end];
                    let token_type = self
                        .keywords
                        .get(word.to_uppercase().as_str())
                        .copied()
                        .unwrap_or(TokenType::Identifier);
                    tokens.push(Token::new(token_type, word, pos));
                }
                other => {
                    return Err(syntax_error(pos, &other.to_string(), "unexpected character"));
                }
            }
        }

        tokens.push(Token::new(TokenType::Eof, "", input.len()));
        Ok(tokens)
    }
}

/// Body of a quoted run; a doubled quote is an escaped quote.
fn read_quoted<I>(chars: &mut std::iter::Peekable<I>, quote: char) -> Option<String>
where
    I: Iterator<Item = (usize, char)>,
{
    let mut value = String::new();
    while let Some((_, c)) = chars.next() {
        if c == quote {
            if matches!(chars.peek(), Some(&(_, next)) if next == quote) {
                chars.next();
                value.push(quote);
            } else {
                return Some(value);
            }
        } else {
            value.push(c);
        }
    }
    None
}

/// End offset of a numeric literal starting at `start`
fn scan_number(input: &str, start: usize) -> usize {
    let bytes = input.as_bytes();
    let mut end = start;
    if end < bytes.len() && (bytes[end] == b'-' || bytes[end] == b'+') {
        end += 1;
    }
    while end < bytes.len() && (bytes[end].is_ascii_digit() || bytes[end] == b'.') {
        end += 1;
    }
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp = end + 1;
        if exp < bytes.len() && (bytes[exp] == b'-' || bytes[exp] == b'+') {
            exp += 1;
        }
        if exp < bytes.len() && bytes[exp].is_ascii_digit() {
            while exp < bytes.len() && bytes[exp].is_ascii_digit() {
                exp += 1;
            }
            end = exp;
        }
    }
    end
}

pub(crate) fn syntax_error(position: usize, token: &str, reason: &str) -> GeosiftError {
    GeosiftError::QuerySyntax {
        position,
        token: token.chars().take(32).collect(),
        reason: reason.to_string(),
    }
}
