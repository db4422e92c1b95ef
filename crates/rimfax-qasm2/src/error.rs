//! Error types for the QASM2 front-end.

use thiserror::Error;

/// Errors that can occur while decoding or encoding QASM2.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QasmError {
    /// Lexer error (invalid token).
    #[error("Lexer error at position {position}: {message}")]
    LexerError { position: usize, message: String },

    /// Unexpected token.
    #[error("Unexpected token at line {line}: expected {expected}, found {found}")]
    UnexpectedToken {
        line: usize,
        expected: String,
        found: String,
    },

    /// Unexpected end of input.
    #[error("Unexpected end of input at line {line}: {context}")]
    UnexpectedEof { line: usize, context: String },

    /// Header version other than 2.x.
    #[error("Invalid OPENQASM version: {0}")]
    InvalidVersion(String),

    /// Identifier with no visible declaration.
    #[error("Undefined identifier: {0}")]
    UndefinedIdentifier(String),

    /// Register or gate name declared twice.
    #[error("Duplicate declaration: {0}")]
    DuplicateDeclaration(String),

    /// Gate name with no builtin or declared macro.
    #[error("Unknown gate: {0}")]
    UnknownGate(String),

    /// Unknown math function in a parameter expression.
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    /// Wrong number of qudit arguments.
    #[error("Gate '{gate}' expects {expected} qudits, got {got}")]
    WrongQuditCount {
        gate: String,
        expected: usize,
        got: usize,
    },

    /// Wrong number of parameters.
    #[error("Gate '{gate}' expects {expected} parameters, got {got}")]
    WrongParameterCount {
        gate: String,
        expected: usize,
        got: usize,
    },

    /// Index out of bounds.
    #[error("Index {index} out of bounds for register '{register}' of size {size}")]
    IndexOutOfBounds {
        register: String,
        index: usize,
        size: usize,
    },

    /// Full-register arguments of differing sizes in one statement.
    #[error("Register broadcast mismatch in '{gate}': sizes {expected} and {got}")]
    BroadcastMismatch {
        gate: String,
        expected: usize,
        got: usize,
    },

    /// Qudit argument repeated within one gate call.
    #[error("Duplicate qudit argument in '{gate}' call")]
    DuplicateQuditArgument { gate: String },

    /// Formal qudit indexed inside a gate body.
    #[error("Formal qudit '{0}' cannot be indexed")]
    IndexedFormalQudit(String),

    /// Macro whose body refers back to itself.
    #[error("Recursive gate declaration: {0}")]
    RecursiveMacro(String),

    /// Macro expansion nested deeper than the supported limit.
    #[error("Gate expansion exceeds maximum depth {0}")]
    MacroDepthExceeded(usize),

    /// Include file could not be resolved or read.
    #[error("Cannot include '{path}': {message}")]
    IncludeError { path: String, message: String },

    /// IR error during circuit construction.
    #[error("Circuit error: {0}")]
    Circuit(#[from] rimfax_ir::IrError),
}

/// Result type for QASM2 operations.
pub type QasmResult<T> = Result<T, QasmError>;
