//! Abstract Syntax Tree for `OpenQASM` 2.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{QasmError, QasmResult};

/// A complete QASM2 program.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    /// QASM version (e.g., "2.0").
    pub version: String,
    /// Statements in the program, in source order.
    pub statements: Vec<Statement>,
}

/// A statement in a QASM2 program.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Statement {
    /// Include statement: `include "path";`
    Include(String),

    /// Quantum register declaration: `qreg name[n];`
    QregDecl { name: String, size: usize },

    /// Classical register declaration: `creg name[n];`
    CregDecl { name: String, size: usize },

    /// Gate macro declaration.
    GateDecl {
        name: String,
        params: Vec<String>,
        qudits: Vec<String>,
        body: Vec<GateStatement>,
    },

    /// Gate application.
    Gate(GateCall),

    /// Measurement: `measure q -> c;`
    Measure { qudit: RegRef, clbit: RegRef },

    /// Barrier: `barrier q;` (scheduling hint, no circuit effect)
    Barrier { args: Vec<RegRef> },
}

/// A statement allowed inside a gate macro body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum GateStatement {
    /// Gate application over formal qudits.
    Call(GateCall),
    /// Measurement of a formal qudit into a classical register.
    Measure { qudit: RegRef, clbit: RegRef },
}

/// A gate call: name, parameter expressions, qudit arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateCall {
    pub name: String,
    pub params: Vec<Expression>,
    pub args: Vec<RegRef>,
}

/// Reference to a register or one of its elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegRef {
    pub register: String,
    /// `None` addresses the whole register (broadcast form).
    pub index: Option<usize>,
}

impl RegRef {
    /// Reference to a single element.
    pub fn indexed(register: impl Into<String>, index: usize) -> Self {
        Self {
            register: register.into(),
            index: Some(index),
        }
    }

    /// Reference to an entire register.
    pub fn whole(register: impl Into<String>) -> Self {
        Self {
            register: register.into(),
            index: None,
        }
    }
}

/// A real parameter expression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Expression {
    /// Integer literal.
    Int(i64),
    /// Float literal.
    Float(f64),
    /// Pi constant.
    Pi,
    /// Formal parameter of the enclosing gate declaration.
    Identifier(String),
    /// Negation.
    Neg(Box<Expression>),
    /// Binary operation.
    BinOp {
        left: Box<Expression>,
        op: BinOp,
        right: Box<Expression>,
    },
    /// Builtin math function call: `sin`, `cos`, `tan`, `exp`, `ln`, `sqrt`.
    FnCall { name: String, arg: Box<Expression> },
    /// Parenthesized expression.
    Paren(Box<Expression>),
}

impl Expression {
    /// Evaluate against an environment binding formal parameter names.
    ///
    /// Free identifiers and unknown functions are errors; QASM2 parameter
    /// expressions are pure arithmetic over literals, pi, and formals.
    #[allow(clippy::cast_precision_loss)]
    pub fn eval(&self, env: &FxHashMap<String, f64>) -> QasmResult<f64> {
        match self {
            Expression::Int(v) => Ok(*v as f64),
            Expression::Float(v) => Ok(*v),
            Expression::Pi => Ok(std::f64::consts::PI),
            Expression::Identifier(name) => env
                .get(name)
                .copied()
                .ok_or_else(|| QasmError::UndefinedIdentifier(name.clone())),
            Expression::Neg(e) => Ok(-e.eval(env)?),
            Expression::BinOp { left, op, right } => {
                let l = left.eval(env)?;
                let r = right.eval(env)?;
                Ok(match op {
                    BinOp::Add => l + r,
                    BinOp::Sub => l - r,
                    BinOp::Mul => l * r,
                    BinOp::Div => l / r,
                    BinOp::Pow => l.powf(r),
                })
            }
            Expression::FnCall { name, arg } => {
                let v = arg.eval(env)?;
                Ok(match name.as_str() {
                    "sin" => v.sin(),
                    "cos" => v.cos(),
                    "tan" => v.tan(),
                    "exp" => v.exp(),
                    "ln" => v.ln(),
                    "sqrt" => v.sqrt(),
                    _ => return Err(QasmError::UnknownFunction(name.clone())),
                })
            }
            Expression::Paren(e) => e.eval(env),
        }
    }
}

/// Binary operators of QASM2 parameter expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}
