//! Parameter expression parsing for QASM2.

use super::Parser;
use crate::ast::{BinOp, Expression};
use crate::error::{QasmError, QasmResult};
use crate::lexer::Token;

/// Builtin math functions of QASM2 parameter expressions.
const MATH_FNS: &[&str] = &["sin", "cos", "tan", "exp", "ln", "sqrt"];

impl Parser {
    /// Parse an expression.
    pub(super) fn parse_expression(&mut self) -> QasmResult<Expression> {
        self.parse_binary_expr(0)
    }

    /// Parse binary expression with precedence climbing.
    fn parse_binary_expr(&mut self, min_prec: u8) -> QasmResult<Expression> {
        let mut left = self.parse_unary_expr()?;

        while let Some(op) = self.peek_binary_op() {
            let prec = op_precedence(op);
            if prec < min_prec {
                break;
            }
            self.advance(); // consume operator

            // Power is right-associative, the rest left.
            let next_min = if op == BinOp::Pow { prec } else { prec + 1 };
            let right = self.parse_binary_expr(next_min)?;
            left = Expression::BinOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    /// Parse unary expression.
    fn parse_unary_expr(&mut self) -> QasmResult<Expression> {
        if self.consume(&Token::Minus) {
            let expr = self.parse_unary_expr()?;
            return Ok(Expression::Neg(Box::new(expr)));
        }
        self.parse_primary_expr()
    }

    /// Parse primary expression.
    fn parse_primary_expr(&mut self) -> QasmResult<Expression> {
        let line = self.line();
        let token = self.peek().cloned().ok_or_else(|| QasmError::UnexpectedEof {
            line,
            context: "expression".into(),
        })?;

        match token {
            Token::IntLiteral(v) => {
                self.advance();
                let value = i64::try_from(v).map_err(|_| QasmError::UnexpectedToken {
                    line,
                    expected: "integer parameter".into(),
                    found: v.to_string(),
                })?;
                Ok(Expression::Int(value))
            }
            Token::FloatLiteral(v) => {
                self.advance();
                Ok(Expression::Float(v))
            }
            Token::Pi => {
                self.advance();
                Ok(Expression::Pi)
            }
            Token::Identifier(name) => {
                self.advance();
                if MATH_FNS.contains(&name.as_str()) {
                    self.expect(Token::LParen)?;
                    let arg = self.parse_expression()?;
                    self.expect(Token::RParen)?;
                    Ok(Expression::FnCall {
                        name,
                        arg: Box::new(arg),
                    })
                } else {
                    Ok(Expression::Identifier(name))
                }
            }
            Token::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(Token::RParen)?;
                Ok(Expression::Paren(Box::new(expr)))
            }
            _ => Err(QasmError::UnexpectedToken {
                line,
                expected: "expression".into(),
                found: token.to_string(),
            }),
        }
    }

    /// Peek at binary operator.
    fn peek_binary_op(&self) -> Option<BinOp> {
        match self.peek()? {
            Token::Plus => Some(BinOp::Add),
            Token::Minus => Some(BinOp::Sub),
            Token::Star => Some(BinOp::Mul),
            Token::Slash => Some(BinOp::Div),
            Token::Caret => Some(BinOp::Pow),
            _ => None,
        }
    }

    /// Parse a comma-separated expression list up to a closing paren.
    pub(super) fn parse_expression_list(&mut self) -> QasmResult<Vec<Expression>> {
        if self.check(&Token::RParen) {
            return Ok(vec![]);
        }
        let mut exprs = vec![self.parse_expression()?];
        while self.consume(&Token::Comma) {
            exprs.push(self.parse_expression()?);
        }
        Ok(exprs)
    }
}

/// Get operator precedence.
fn op_precedence(op: BinOp) -> u8 {
    match op {
        BinOp::Add | BinOp::Sub => 1,
        BinOp::Mul | BinOp::Div => 2,
        BinOp::Pow => 3,
    }
}
