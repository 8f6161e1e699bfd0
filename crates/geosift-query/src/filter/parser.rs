//! Recursive-descent parser for where clauses
//!
//! ```text
//! expr      := and_expr (OR and_expr)*
//! and_expr  := unary (AND unary)*
//! unary     := NOT unary | '(' expr ')' | predicate
//! predicate := operand ( cmp operand
//!                      | [NOT] IN '(' literal (',' literal)* ')'
//!                      | [NOT] BETWEEN literal AND literal
//!                      | IS [NOT] NULL
//!                      | [NOT] (LIKE | ILIKE) string )
//! operand   := field | literal
//! ```

use super::ast::{CompareOp, FilterNode, Literal};
use super::eval::compare;
use super::lexer::{syntax_error, Token, TokenType};
use super::pattern;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use geosift_core::error::{GeosiftError, Result};

enum Operand {
    Field(String),
    Value(Literal),
}

/// Deepest nesting of parentheses and `NOT` a clause may use
pub const MAX_DEPTH: usize = 64;

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    /// An `Eof` token is appended when `tokens` does not already end with one
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().map(|t| t.token_type) != Some(TokenType::Eof) {
            let end = tokens.last().map(|t| t.position + t.value.len()).unwrap_or(0);
            tokens.push(Token::new(TokenType::Eof, "", end));
        }
        Self { tokens, pos: 0, depth: 0 }
    }

    pub fn parse(mut self) -> Result<FilterNode> {
        let node = self.expr()?;
        let trailing = self.peek();
        if trailing.token_type != TokenType::Eof {
            return Err(self.error_at(trailing, "unexpected token after expression"));
        }
        Ok(node)
    }

    fn peek(&self) -> &Token {
        // The Eof token is never consumed, so the index stays in range
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_type(&self) -> TokenType {
        self.peek().token_type
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.token_type != TokenType::Eof {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, token_type: TokenType) -> bool {
        if self.peek_type() == token_type {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token_type: TokenType, what: &str) -> Result<Token> {
        if self.peek_type() == token_type {
            Ok(self.advance())
        } else {
            Err(self.error_at(self.peek(), &format!("expected {}", what)))
        }
    }

    fn error_at(&self, token: &Token, reason: &str) -> GeosiftError {
        syntax_error(token.position, &token.describe(), reason)
    }

    fn expr(&mut self) -> Result<FilterNode> {
        let mut nodes = vec![self.and_expr()?];
        while self.eat(TokenType::Or) {
            nodes.push(self.and_expr()?);
        }
        Ok(if nodes.len() == 1 { nodes.remove(0) } else { FilterNode::Or(nodes) })
    }

    fn and_expr(&mut self) -> Result<FilterNode> {
        let mut nodes = vec![self.unary()?];
        while self.eat(TokenType::And) {
            nodes.push(self.unary()?);
        }
        Ok(if nodes.len() == 1 { nodes.remove(0) } else { FilterNode::And(nodes) })
    }

    fn unary(&mut self) -> Result<FilterNode> {
        if matches!(self.peek_type(), TokenType::Not | TokenType::LeftParen) {
            if self.depth == MAX_DEPTH {
                let reason = format!("nesting deeper than {} levels", MAX_DEPTH);
                return Err(self.error_at(self.peek(), &reason));
            }
            self.depth += 1;
            let node = self.nested();
            self.depth -= 1;
            return node;
        }
        self.predicate()
    }

    fn nested(&mut self) -> Result<FilterNode> {
        if self.eat(TokenType::Not) {
            return Ok(FilterNode::Not(Box::new(self.unary()?)));
        }
        self.expect(TokenType::LeftParen, "'('")?;
        let node = self.expr()?;
        self.expect(TokenType::RightParen, "')'")?;
        Ok(node)
    }

    fn predicate(&mut self) -> Result<FilterNode> {
        let start = self.peek().clone();
        let left = self.operand()?;

        if self.peek().is_comparison() {
            let op = comparison_op(self.advance().token_type);
            let right_token = self.peek().clone();
            let right = self.operand()?;
            return match (left, right) {
                (Operand::Field(field), Operand::Value(value)) => {
                    Ok(FilterNode::Comparison { field, op, value })
                }
                (Operand::Value(value), Operand::Field(field)) => {
                    Ok(FilterNode::Comparison { field, op: op.flipped(), value })
                }
                (Operand::Value(a), Operand::Value(b)) => {
                    let truth = match &a {
                        Literal::Null => None,
                        _ => compare(&literal_json(&a), op, &b),
                    };
                    Ok(FilterNode::Constant(truth == Some(true)))
                }
                (Operand::Field(_), Operand::Field(_)) => Err(self.error_at(
                    &right_token,
                    "comparisons between two fields are not supported",
                )),
            };
        }

        let Operand::Field(field) = left else {
            return Err(self.error_at(&start, "expected a field name"));
        };

        let negated = self.eat(TokenType::Not);
        let token = self.peek().clone();
        let node = match token.token_type {
            TokenType::In => {
                self.advance();
                self.expect(TokenType::LeftParen, "'(' after IN")?;
                let mut values = vec![self.literal()?];
                while self.eat(TokenType::Comma) {
                    values.push(self.literal()?);
                }
                self.expect(TokenType::RightParen, "')' closing IN list")?;
                FilterNode::SetMembership { field, values }
            }
            TokenType::Between => {
                self.advance();
                let low = self.literal()?;
                self.expect(TokenType::And, "AND in BETWEEN")?;
                let high = self.literal()?;
                FilterNode::Range { field, low, high }
            }
            TokenType::Like | TokenType::ILike => {
                self.advance();
                let pattern_token = self.expect(TokenType::String, "a quoted pattern")?;
                let pattern = pattern::compile(
                    &pattern_token.value,
                    token.token_type == TokenType::ILike,
                    pattern_token.position,
                )?;
                FilterNode::Pattern { field, pattern }
            }
            TokenType::Is if !negated => {
                self.advance();
                let is_null = !self.eat(TokenType::Not);
                self.expect(TokenType::Null, "NULL")?;
                FilterNode::NullTest { field, is_null }
            }
            _ => {
                return Err(self.error_at(
                    &token,
                    "expected a comparison operator, IN, BETWEEN, LIKE or IS",
                ))
            }
        };

        Ok(if negated { FilterNode::Not(Box::new(node)) } else { node })
    }

    fn operand(&mut self) -> Result<Operand> {
        match self.peek_type() {
            TokenType::Identifier => Ok(Operand::Field(self.advance().value)),
            _ => self.literal().map(Operand::Value),
        }
    }

    fn literal(&mut self) -> Result<Literal> {
        let token = self.advance();
        match token.token_type {
            TokenType::Number => token
                .value
                .parse::<f64>()
                .map(Literal::Number)
                .map_err(|_| self.error_at(&token, "malformed number")),
            TokenType::String => Ok(Literal::String(token.value)),
            TokenType::True => Ok(Literal::Bool(true)),
            TokenType::False => Ok(Literal::Bool(false)),
            TokenType::Null => Ok(Literal::Null),
            TokenType::Date | TokenType::Timestamp => {
                let text = self.expect(TokenType::String, "a quoted date")?;
                parse_date(&text.value)
                    .map(Literal::Date)
                    .ok_or_else(|| self.error_at(&text, "unrecognised date"))
            }
            _ => Err(self.error_at(&token, "expected a value")),
        }
    }
}

fn comparison_op(token_type: TokenType) -> CompareOp {
    match token_type {
        TokenType::NotEqual => CompareOp::NotEq,
        TokenType::LessThan => CompareOp::Lt,
        TokenType::LessThanOrEqual => CompareOp::LtEq,
        TokenType::GreaterThan => CompareOp::Gt,
        TokenType::GreaterThanOrEqual => CompareOp::GtEq,
        _ => CompareOp::Eq,
    }
}

fn literal_json(literal: &Literal) -> serde_json::Value {
    match literal {
        Literal::Null => serde_json::Value::Null,
        Literal::Bool(b) => serde_json::Value::Bool(*b),
        Literal::Number(n) => serde_json::json!(n),
        Literal::String(s) => serde_json::Value::String(s.clone()),
        Literal::Date(ms) => serde_json::json!(ms),
    }
}

/// Milliseconds since the epoch for `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS`
/// (a `T` separator works too) or RFC 3339 text. Naive times are UTC.
pub fn parse_date(text: &str) -> Option<i64> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.timestamp_millis());
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt.and_utc().timestamp_millis());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp_millis())
}
