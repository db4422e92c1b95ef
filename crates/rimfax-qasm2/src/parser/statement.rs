//! Statement parsing for QASM2.

use super::Parser;
use crate::ast::{GateCall, GateStatement, RegRef, Statement};
use crate::error::{QasmError, QasmResult};
use crate::lexer::Token;

impl Parser {
    /// Parse a statement.
    pub(super) fn parse_statement(&mut self) -> QasmResult<Statement> {
        let line = self.line();
        let token = self.peek().cloned().ok_or_else(|| QasmError::UnexpectedEof {
            line,
            context: "statement".into(),
        })?;

        match token {
            Token::Include => self.parse_include(),
            Token::Qreg => self.parse_qreg_decl(),
            Token::Creg => self.parse_creg_decl(),
            Token::Gate => self.parse_gate_decl(),
            Token::Measure => self.parse_measure(),
            Token::Barrier => self.parse_barrier(),
            Token::Identifier(_) => {
                let call = self.parse_gate_call()?;
                Ok(Statement::Gate(call))
            }
            _ => Err(QasmError::UnexpectedToken {
                line,
                expected: "statement".into(),
                found: token.to_string(),
            }),
        }
    }

    /// Parse include statement.
    fn parse_include(&mut self) -> QasmResult<Statement> {
        self.expect(Token::Include)?;
        let line = self.line();
        let path = match self.advance() {
            Some(Token::StringLiteral(s)) => s,
            Some(other) => {
                return Err(QasmError::UnexpectedToken {
                    line,
                    expected: "string literal".into(),
                    found: other.to_string(),
                });
            }
            None => {
                return Err(QasmError::UnexpectedEof {
                    line,
                    context: "include path".into(),
                });
            }
        };
        self.expect(Token::Semicolon)?;
        Ok(Statement::Include(path))
    }

    /// Parse quantum register declaration.
    fn parse_qreg_decl(&mut self) -> QasmResult<Statement> {
        self.expect(Token::Qreg)?;
        let (name, size) = self.parse_sized_register()?;
        Ok(Statement::QregDecl { name, size })
    }

    /// Parse classical register declaration.
    fn parse_creg_decl(&mut self) -> QasmResult<Statement> {
        self.expect(Token::Creg)?;
        let (name, size) = self.parse_sized_register()?;
        Ok(Statement::CregDecl { name, size })
    }

    /// Parse `name[n];`, the shared tail of qreg and creg declarations.
    fn parse_sized_register(&mut self) -> QasmResult<(String, usize)> {
        let name = self.parse_identifier()?;
        self.expect(Token::LBracket)?;
        let line = self.line();
        let size = self.parse_int_literal()?;
        self.expect(Token::RBracket)?;
        self.expect(Token::Semicolon)?;
        let size = usize::try_from(size).map_err(|_| QasmError::UnexpectedToken {
            line,
            expected: "register size".into(),
            found: size.to_string(),
        })?;
        Ok((name, size))
    }

    /// Parse a gate macro declaration.
    ///
    /// The parameter list is optional and may be empty: `gate g q0 {...}`,
    /// `gate g () q0 {...}`, and `gate g (p0) q0 {...}` are all valid.
    fn parse_gate_decl(&mut self) -> QasmResult<Statement> {
        self.expect(Token::Gate)?;
        let name = self.parse_identifier()?;

        let params = if self.consume(&Token::LParen) {
            let params = if self.check(&Token::RParen) {
                vec![]
            } else {
                self.parse_identifier_list()?
            };
            self.expect(Token::RParen)?;
            params
        } else {
            vec![]
        };

        let qudits = self.parse_identifier_list()?;

        self.expect(Token::LBrace)?;
        let mut body = Vec::new();
        while !self.check(&Token::RBrace) {
            let line = self.line();
            let token = self.peek().cloned().ok_or_else(|| QasmError::UnexpectedEof {
                line,
                context: "gate body".into(),
            })?;
            match token {
                // Barriers inside bodies are scheduling hints with no
                // circuit counterpart.
                Token::Barrier => {
                    self.parse_barrier()?;
                }
                Token::Measure => {
                    let (qudit, clbit) = self.parse_measure_parts()?;
                    body.push(GateStatement::Measure { qudit, clbit });
                }
                Token::Identifier(_) => body.push(GateStatement::Call(self.parse_gate_call()?)),
                _ => {
                    return Err(QasmError::UnexpectedToken {
                        line,
                        expected: "gate call".into(),
                        found: token.to_string(),
                    });
                }
            }
        }
        self.expect(Token::RBrace)?;

        Ok(Statement::GateDecl {
            name,
            params,
            qudits,
            body,
        })
    }

    /// Parse measure statement: `measure qarg -> carg;`
    fn parse_measure(&mut self) -> QasmResult<Statement> {
        let (qudit, clbit) = self.parse_measure_parts()?;
        Ok(Statement::Measure { qudit, clbit })
    }

    fn parse_measure_parts(&mut self) -> QasmResult<(RegRef, RegRef)> {
        self.expect(Token::Measure)?;
        let qudit = self.parse_reg_ref()?;
        self.expect(Token::Arrow)?;
        let clbit = self.parse_reg_ref()?;
        self.expect(Token::Semicolon)?;
        Ok((qudit, clbit))
    }

    /// Parse barrier statement.
    fn parse_barrier(&mut self) -> QasmResult<Statement> {
        self.expect(Token::Barrier)?;
        let args = self.parse_reg_ref_list()?;
        self.expect(Token::Semicolon)?;
        Ok(Statement::Barrier { args })
    }

    /// Parse a gate call: `name(params) args;`
    fn parse_gate_call(&mut self) -> QasmResult<GateCall> {
        let line = self.line();
        let name = match self.advance() {
            Some(Token::Identifier(s)) => s,
            Some(other) => {
                return Err(QasmError::UnexpectedToken {
                    line,
                    expected: "gate name".into(),
                    found: other.to_string(),
                });
            }
            None => {
                return Err(QasmError::UnexpectedEof {
                    line,
                    context: "gate name".into(),
                });
            }
        };

        let params = if self.consume(&Token::LParen) {
            let params = self.parse_expression_list()?;
            self.expect(Token::RParen)?;
            params
        } else {
            vec![]
        };

        let args = self.parse_reg_ref_list()?;
        self.expect(Token::Semicolon)?;

        Ok(GateCall { name, params, args })
    }

    /// Parse a register reference: `name` or `name[i]`.
    fn parse_reg_ref(&mut self) -> QasmResult<RegRef> {
        let register = self.parse_identifier()?;
        let index = if self.consume(&Token::LBracket) {
            let line = self.line();
            let index = self.parse_int_literal()?;
            self.expect(Token::RBracket)?;
            Some(usize::try_from(index).map_err(|_| QasmError::UnexpectedToken {
                line,
                expected: "register index".into(),
                found: index.to_string(),
            })?)
        } else {
            None
        };
        Ok(RegRef { register, index })
    }

    /// Parse a comma-separated register reference list.
    fn parse_reg_ref_list(&mut self) -> QasmResult<Vec<RegRef>> {
        let mut refs = vec![self.parse_reg_ref()?];
        while self.consume(&Token::Comma) {
            refs.push(self.parse_reg_ref()?);
        }
        Ok(refs)
    }

    /// Parse a comma-separated identifier list.
    fn parse_identifier_list(&mut self) -> QasmResult<Vec<String>> {
        let mut ids = vec![self.parse_identifier()?];
        while self.consume(&Token::Comma) {
            ids.push(self.parse_identifier()?);
        }
        Ok(ids)
    }
}
