//! Calculator tool.
//!
//! Evaluates arithmetic over a closed grammar: numbers, `+ - * /`,
//! parentheses, unary minus. Expressions are parsed by a recursive-descent
//! parser; user input is never executed as code.

use crate::server::{McpServerResult, Tool, ToolContext};
use crate::types::{ToolDefinition, ToolResult};
use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

/// Errors produced while evaluating an expression.
#[derive(Debug, Error, PartialEq)]
pub enum CalcError {
    /// Character outside the grammar.
    #[error("Unexpected character '{0}'")]
    UnexpectedChar(char),

    /// Expression ended mid-production.
    #[error("Unexpected end of expression")]
    UnexpectedEnd,

    /// Token that no production accepts at this position.
    #[error("Unexpected token at position {0}")]
    UnexpectedToken(usize),

    /// Division by zero.
    #[error("Division by zero")]
    DivisionByZero,

    /// Malformed numeric literal.
    #[error("Invalid number '{0}'")]
    InvalidNumber(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Number(f64),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>, CalcError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' | '\n' => {
                chars.next();
            }
            '+' => {
                chars.next();
                tokens.push(Token::Plus);
            }
            '-' | '−' => {
                chars.next();
                tokens.push(Token::Minus);
            }
            '*' | '×' => {
                chars.next();
                tokens.push(Token::Star);
            }
            '/' | '÷' => {
                chars.next();
                tokens.push(Token::Slash);
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '0'..='9' | '.' => {
                let mut literal = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        literal.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value: f64 = literal
                    .parse()
                    .map_err(|_| CalcError::InvalidNumber(literal.clone()))?;
                tokens.push(Token::Number(value));
            }
            other => return Err(CalcError::UnexpectedChar(other)),
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.peek();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    // expression := term (('+' | '-') term)*
    fn expression(&mut self) -> Result<f64, CalcError> {
        let mut value = self.term()?;
        while let Some(op) = self.peek() {
            match op {
                Token::Plus => {
                    self.advance();
                    value += self.term()?;
                }
                Token::Minus => {
                    self.advance();
                    value -= self.term()?;
                }
                _ => break,
            }
        }
        Ok(value)
    }

    // term := factor (('*' | '/') factor)*
    fn term(&mut self) -> Result<f64, CalcError> {
        let mut value = self.factor()?;
        while let Some(op) = self.peek() {
            match op {
                Token::Star => {
                    self.advance();
                    value *= self.factor()?;
                }
                Token::Slash => {
                    self.advance();
                    let divisor = self.factor()?;
                    if divisor == 0.0 {
                        return Err(CalcError::DivisionByZero);
                    }
                    value /= divisor;
                }
                _ => break,
            }
        }
        Ok(value)
    }

    // factor := number | '-' factor | '(' expression ')'
    fn factor(&mut self) -> Result<f64, CalcError> {
        match self.advance() {
            Some(Token::Number(value)) => Ok(value),
            Some(Token::Minus) => Ok(-self.factor()?),
            Some(Token::LParen) => {
                let value = self.expression()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(value),
                    Some(_) => Err(CalcError::UnexpectedToken(self.pos - 1)),
                    None => Err(CalcError::UnexpectedEnd),
                }
            }
            Some(_) => Err(CalcError::UnexpectedToken(self.pos - 1)),
            None => Err(CalcError::UnexpectedEnd),
        }
    }
}

/// Evaluate an arithmetic expression.
pub fn evaluate(input: &str) -> Result<f64, CalcError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser { tokens, pos: 0 };
    let value = parser.expression()?;
    if parser.pos != parser.tokens.len() {
        return Err(CalcError::UnexpectedToken(parser.pos));
    }
    Ok(value)
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

#[derive(Debug, Deserialize)]
struct CalculateParams {
    expression: String,
}

/// Tool evaluating arithmetic expressions.
pub struct CalculateTool;

#[async_trait]
impl Tool for CalculateTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "calculate",
            "Evaluate an arithmetic expression (numbers, + - * /, parentheses)",
        )
        .with_schema(serde_json::json!({
            "type": "object",
            "properties": {
                "expression": {
                    "type": "string",
                    "description": "Expression to evaluate, e.g. '(2 + 3) * 4'"
                }
            },
            "required": ["expression"]
        }))
        .with_output_schema(serde_json::json!({
            "type": "object",
            "properties": {
                "value": {"type": "number"}
            }
        }))
    }

    async fn execute(
        &self,
        args: serde_json::Value,
        _context: &ToolContext,
    ) -> McpServerResult<ToolResult> {
        let params: CalculateParams = serde_json::from_value(args)
            .map_err(|e| crate::server::McpServerError::InvalidParams(e.to_string()))?;

        match evaluate(&params.expression) {
            Ok(value) => Ok(ToolResult::text(format_number(value))),
            Err(e) => Ok(ToolResult::error(format!(
                "Failed to evaluate expression: {e}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence() {
        assert_eq!(evaluate("2 + 3 * 4").unwrap(), 14.0);
        assert_eq!(evaluate("20 - 6 / 2").unwrap(), 17.0);
    }

    #[test]
    fn test_parentheses() {
        assert_eq!(evaluate("(2 + 3) * 4").unwrap(), 20.0);
        assert_eq!(evaluate("((1))").unwrap(), 1.0);
    }

    #[test]
    fn test_unary_minus() {
        assert_eq!(evaluate("-5 + 3").unwrap(), -2.0);
        assert_eq!(evaluate("2 * -3").unwrap(), -6.0);
        assert_eq!(evaluate("--4").unwrap(), 4.0);
    }

    #[test]
    fn test_decimals() {
        assert_eq!(evaluate("10 / 4").unwrap(), 2.5);
        assert_eq!(evaluate("0.5 * 8").unwrap(), 4.0);
    }

    #[test]
    fn test_unicode_operators() {
        assert_eq!(evaluate("6 × 7").unwrap(), 42.0);
        assert_eq!(evaluate("9 ÷ 3").unwrap(), 3.0);
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(evaluate("1 / 0"), Err(CalcError::DivisionByZero));
        assert_eq!(evaluate("1 / (2 - 2)"), Err(CalcError::DivisionByZero));
    }

    #[test]
    fn test_rejects_non_grammar_input() {
        assert_eq!(evaluate("2 + abc"), Err(CalcError::UnexpectedChar('a')));
        assert!(matches!(
            evaluate("system('rm')"),
            Err(CalcError::UnexpectedChar(_))
        ));
        assert_eq!(evaluate(""), Err(CalcError::UnexpectedEnd));
        assert_eq!(evaluate("2 +"), Err(CalcError::UnexpectedEnd));
        assert!(matches!(evaluate("2 3"), Err(CalcError::UnexpectedToken(_))));
        assert!(matches!(evaluate("(2"), Err(CalcError::UnexpectedEnd)));
        assert!(matches!(
            evaluate("1.2.3"),
            Err(CalcError::InvalidNumber(_))
        ));
    }

    #[tokio::test]
    async fn test_tool_execution() {
        let tool = CalculateTool;
        let result = tool
            .execute(
                serde_json::json!({"expression": "(2 + 3) * 4"}),
                &ToolContext::new("u1"),
            )
            .await
            .unwrap();
        assert_eq!(result.first_text(), Some("20"));

        let error = tool
            .execute(
                serde_json::json!({"expression": "1 / 0"}),
                &ToolContext::new("u1"),
            )
            .await
            .unwrap();
        assert!(error.is_error);
    }
}
