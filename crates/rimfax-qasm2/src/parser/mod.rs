//! Parser for `OpenQASM` 2.

mod expression;
mod lowering;
mod statement;

pub(crate) use lowering::assemble;

use crate::ast::{Program, Statement};
use crate::error::{QasmError, QasmResult};
use crate::lexer::{SpannedToken, Token, tokenize};

/// Parse a QASM2 source string into an AST Program.
pub fn parse_program(source: &str) -> QasmResult<Program> {
    let mut parser = Parser::new(source)?;
    parser.parse_program()
}

/// Parse an include fragment: a bare statement list with no header.
pub(crate) fn parse_fragment(source: &str) -> QasmResult<Vec<Statement>> {
    let mut parser = Parser::new(source)?;
    parser.parse_statements()
}

/// Parser state.
pub(super) struct Parser {
    pub(super) tokens: Vec<SpannedToken>,
    /// Source line of each token, computed from the token spans.
    lines: Vec<usize>,
    pub(super) pos: usize,
}

impl Parser {
    /// Create a new parser from source.
    fn new(source: &str) -> QasmResult<Self> {
        let token_results = tokenize(source);
        let mut tokens = Vec::new();

        for result in token_results {
            match result {
                Ok(t) => tokens.push(t),
                Err((span, msg)) => {
                    return Err(QasmError::LexerError {
                        position: span.start,
                        message: msg,
                    });
                }
            }
        }

        let mut lines = Vec::with_capacity(tokens.len());
        let mut line = 1;
        let mut cursor = 0;
        for t in &tokens {
            line += source[cursor..t.span.start].matches('\n').count();
            cursor = t.span.start;
            lines.push(line);
        }

        Ok(Self {
            tokens,
            lines,
            pos: 0,
        })
    }

    /// Source line of the current token; past the end, the last token's
    /// line.
    pub(super) fn line(&self) -> usize {
        self.lines
            .get(self.pos)
            .or_else(|| self.lines.last())
            .copied()
            .unwrap_or(1)
    }

    /// Check if we've reached the end.
    pub(super) fn is_eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// Peek at the current token.
    pub(super) fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|t| &t.token)
    }

    /// Advance and return the current token.
    pub(super) fn advance(&mut self) -> Option<Token> {
        if self.is_eof() {
            return None;
        }
        let token = self.tokens[self.pos].token.clone();
        self.pos += 1;
        Some(token)
    }

    /// Expect a specific token.
    #[allow(clippy::needless_pass_by_value)]
    pub(super) fn expect(&mut self, expected: Token) -> QasmResult<()> {
        let line = self.line();
        let found = self.advance().ok_or_else(|| QasmError::UnexpectedEof {
            line,
            context: format!("expected {expected}"),
        })?;

        if std::mem::discriminant(&found) != std::mem::discriminant(&expected) {
            return Err(QasmError::UnexpectedToken {
                line,
                expected: expected.to_string(),
                found: found.to_string(),
            });
        }
        Ok(())
    }

    /// Check if current token matches.
    pub(super) fn check(&self, token: &Token) -> bool {
        self.peek()
            .is_some_and(|t| std::mem::discriminant(t) == std::mem::discriminant(token))
    }

    /// Consume token if it matches.
    pub(super) fn consume(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Parse the entire program.
    fn parse_program(&mut self) -> QasmResult<Program> {
        self.expect(Token::OpenQasm)?;
        let version = self.parse_version()?;
        self.expect(Token::Semicolon)?;

        let statements = self.parse_statements()?;

        Ok(Program {
            version,
            statements,
        })
    }

    /// Parse statements until end of input.
    fn parse_statements(&mut self) -> QasmResult<Vec<Statement>> {
        let mut statements = Vec::new();
        while !self.is_eof() {
            statements.push(self.parse_statement()?);
        }
        Ok(statements)
    }

    /// Parse and validate the version number. Only major version 2 is
    /// accepted. `Display` for `f64` drops a zero fraction, so the text
    /// form is rebuilt from the value rather than trusted.
    fn parse_version(&mut self) -> QasmResult<String> {
        let line = self.line();
        match self.advance() {
            Some(Token::FloatLiteral(v)) if (2.0..3.0).contains(&v) => {
                let mut text = format!("{v}");
                if !text.contains('.') {
                    text.push_str(".0");
                }
                Ok(text)
            }
            Some(Token::IntLiteral(2)) => Ok("2.0".to_string()),
            Some(Token::FloatLiteral(v)) => Err(QasmError::InvalidVersion(format!("{v}"))),
            Some(other) => Err(QasmError::InvalidVersion(other.to_string())),
            None => Err(QasmError::UnexpectedEof {
                line,
                context: "version number".into(),
            }),
        }
    }

    /// Parse an identifier.
    pub(super) fn parse_identifier(&mut self) -> QasmResult<String> {
        let line = self.line();
        match self.advance() {
            Some(Token::Identifier(s)) => Ok(s),
            Some(other) => Err(QasmError::UnexpectedToken {
                line,
                expected: "identifier".into(),
                found: other.to_string(),
            }),
            None => Err(QasmError::UnexpectedEof {
                line,
                context: "identifier".into(),
            }),
        }
    }

    /// Parse an integer literal.
    pub(super) fn parse_int_literal(&mut self) -> QasmResult<u64> {
        let line = self.line();
        match self.advance() {
            Some(Token::IntLiteral(v)) => Ok(v),
            Some(other) => Err(QasmError::UnexpectedToken {
                line,
                expected: "integer".into(),
                found: other.to_string(),
            }),
            None => Err(QasmError::UnexpectedEof {
                line,
                context: "integer".into(),
            }),
        }
    }
}
