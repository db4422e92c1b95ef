//! Error types for the IR crate.

use thiserror::Error;

/// Errors that can occur in IR operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IrError {
    /// Qudit index outside the circuit.
    #[error("Qudit index {qudit} out of range for circuit with {num_qudits} qudits")]
    QuditOutOfRange {
        /// The offending index.
        qudit: usize,
        /// Number of qudits in the circuit.
        num_qudits: usize,
    },

    /// The same qudit appears twice in one location.
    #[error("Duplicate qudit index {qudit} in location")]
    DuplicateQudit {
        /// The duplicate index.
        qudit: usize,
    },

    /// A location with no qudits.
    #[error("Operation location must address at least one qudit")]
    EmptyLocation,

    /// Gate addresses a different number of qudits than its location.
    #[error("Gate '{gate}' acts on {expected} qudits, location has {got}")]
    LocationSizeMismatch {
        /// Name of the gate.
        gate: String,
        /// Qudit count the gate requires.
        expected: usize,
        /// Qudit count the location supplies.
        got: usize,
    },

    /// Gate received the wrong number of parameters.
    #[error("Gate '{gate}' takes {expected} parameters, got {got}")]
    ParameterCountMismatch {
        /// Name of the gate.
        gate: String,
        /// Parameter count the gate requires.
        expected: usize,
        /// Parameter count supplied.
        got: usize,
    },

    /// Flat parameter vector has the wrong length for a circuit.
    #[error("Circuit takes {expected} flat parameters, got {got}")]
    FlatParameterMismatch {
        /// Parameter count the circuit requires.
        expected: usize,
        /// Parameter count supplied.
        got: usize,
    },
}

/// Result type for IR operations.
pub type IrResult<T> = Result<T, IrError>;
