//! `OpenQASM` 2 front-end for the rimfax circuit IR.
//!
//! [`decode`] turns QASM2 source into a scheduled [`Circuit`]: the lexer
//! and recursive-descent parser build an AST, gate declarations become
//! macros in a registry, and gate calls lower to operations with greedy
//! earliest-cycle scheduling. [`encode`] serializes a circuit back to
//! QASM2 text.
//!
//! ```
//! let circuit = rimfax_qasm2::decode(r#"
//!     OPENQASM 2.0;
//!     include "qelib1.inc";
//!     qreg q[2];
//!     h q[0];
//!     cx q[0], q[1];
//! "#).unwrap();
//! assert_eq!(circuit.num_qudits(), 2);
//! ```

pub mod ast;
pub mod emitter;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod registry;

use rimfax_ir::Circuit;

pub use error::{QasmError, QasmResult};
pub use registry::{FileResolver, IncludeResolver, MapResolver};

/// Decode QASM2 source into a circuit, reading includes from the
/// filesystem.
pub fn decode(source: &str) -> QasmResult<Circuit> {
    decode_with_resolver(source, &FileResolver::new())
}

/// Decode QASM2 source into a circuit with a custom include resolver.
pub fn decode_with_resolver(
    source: &str,
    resolver: &dyn IncludeResolver,
) -> QasmResult<Circuit> {
    let program = parser::parse_program(source)?;
    parser::assemble(&program, resolver)
}

/// Encode a circuit as QASM2 source text.
pub fn encode(circuit: &Circuit) -> QasmResult<String> {
    emitter::emit(circuit)
}
