//! QASM2 emitter for serializing circuits.

use std::collections::BTreeMap;

use rimfax_ir::{Circuit, Gate, Operation, PrimitiveGate};

use crate::error::QasmResult;

/// Emit a circuit as QASM 2.0 source code.
///
/// The output uses a single `q` register covering the circuit's qudits,
/// classical registers re-derived from measurement placeholders, and a
/// `qelib1.inc` include so the gate names resolve everywhere. Composite
/// gates are flattened into their constituent operations.
pub fn emit(circuit: &Circuit) -> QasmResult<String> {
    let mut emitter = Emitter::new();
    emitter.emit_circuit(circuit)
}

struct Emitter {
    output: String,
}

impl Emitter {
    fn new() -> Self {
        Self {
            output: String::new(),
        }
    }

    fn emit_circuit(&mut self, circuit: &Circuit) -> QasmResult<String> {
        self.writeln("OPENQASM 2.0;");
        self.writeln("include \"qelib1.inc\";");

        let num_qudits = circuit.num_qudits();
        if num_qudits > 0 {
            self.writeln(&format!("qreg q[{num_qudits}];"));
        }
        for (name, size) in collect_cregs(circuit) {
            self.writeln(&format!("creg {name}[{size}];"));
        }

        for (_, op) in circuit.iter() {
            self.emit_operation(op, None)?;
        }

        Ok(self.output.clone())
    }

    /// Emit one operation. `mapping` translates the operation's qudit
    /// indices into global ones when flattening a composite gate.
    fn emit_operation(&mut self, op: &Operation, mapping: Option<&[usize]>) -> QasmResult<()> {
        let resolve = |qudit: usize| mapping.map_or(qudit, |m| m[qudit]);

        match op.gate() {
            Gate::Primitive(gate) => {
                let name = primitive_name(*gate);
                let qudits = op
                    .location()
                    .iter()
                    .map(|&q| format!("q[{}]", resolve(q)))
                    .collect::<Vec<_>>()
                    .join(", ");
                if op.params().is_empty() {
                    self.writeln(&format!("{name} {qudits};"));
                } else {
                    let params = op
                        .params()
                        .iter()
                        .map(|&v| emit_param(v))
                        .collect::<Vec<_>>()
                        .join(", ");
                    self.writeln(&format!("{name}({params}) {qudits};"));
                }
            }

            Gate::Circuit(cg) => {
                // Rebind the inner circuit to the operation's current
                // parameters, then flatten with a composed qudit mapping.
                let inner = cg.circuit().with_flat_params(op.params())?;
                let child_mapping: Vec<usize> =
                    op.location().iter().map(|&q| resolve(q)).collect();
                for (_, inner_op) in inner.iter() {
                    self.emit_operation(inner_op, Some(&child_mapping))?;
                }
            }

            Gate::Measurement(placeholder) => {
                for (&qudit, (creg, bit)) in &placeholder.measurements {
                    self.writeln(&format!("measure q[{}] -> {creg}[{bit}];", resolve(qudit)));
                }
            }
        }

        Ok(())
    }

    fn writeln(&mut self, line: &str) {
        self.output.push_str(line);
        self.output.push('\n');
    }
}

/// Classical registers referenced by measurement placeholders, widest
/// declaration winning on a name collision. Composite gates are walked
/// since flattening surfaces their measurements too.
fn collect_cregs(circuit: &Circuit) -> BTreeMap<String, usize> {
    let mut cregs = BTreeMap::new();
    collect_cregs_into(circuit, &mut cregs);
    cregs
}

fn collect_cregs_into(circuit: &Circuit, cregs: &mut BTreeMap<String, usize>) {
    for (_, op) in circuit.iter() {
        match op.gate() {
            Gate::Measurement(placeholder) => {
                let (name, size) = &placeholder.creg;
                let entry = cregs.entry(name.clone()).or_insert(0);
                *entry = (*entry).max(*size);
            }
            Gate::Circuit(cg) => collect_cregs_into(cg.circuit(), cregs),
            Gate::Primitive(_) => {}
        }
    }
}

fn primitive_name(gate: PrimitiveGate) -> &'static str {
    gate.qasm_name()
}

/// Format a parameter value, preferring exact pi fractions.
fn emit_param(v: f64) -> String {
    let pi = std::f64::consts::PI;
    if (v - pi).abs() < 1e-12 {
        "pi".into()
    } else if (v + pi).abs() < 1e-12 {
        "-pi".into()
    } else if (v - pi / 2.0).abs() < 1e-12 {
        "pi/2".into()
    } else if (v + pi / 2.0).abs() < 1e-12 {
        "-pi/2".into()
    } else if (v - pi / 4.0).abs() < 1e-12 {
        "pi/4".into()
    } else if (v + pi / 4.0).abs() < 1e-12 {
        "-pi/4".into()
    } else {
        // Display for f64 is the shortest exact round-trip form.
        format!("{v}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rimfax_ir::{Location, Operation};

    fn op1(gate: PrimitiveGate, qudit: usize, params: Vec<f64>) -> Operation {
        Operation::new(gate.into(), Location::new(vec![qudit]).unwrap(), params).unwrap()
    }

    #[test]
    fn test_emit_bell_state() {
        let mut circuit = Circuit::new(2);
        circuit.append(op1(PrimitiveGate::H, 0, vec![])).unwrap();
        circuit
            .append(
                Operation::new(
                    PrimitiveGate::CX.into(),
                    Location::new(vec![0, 1]).unwrap(),
                    vec![],
                )
                .unwrap(),
            )
            .unwrap();

        let qasm = emit(&circuit).unwrap();
        assert!(qasm.contains("OPENQASM 2.0;"));
        assert!(qasm.contains("include \"qelib1.inc\";"));
        assert!(qasm.contains("qreg q[2];"));
        assert!(qasm.contains("h q[0];"));
        assert!(qasm.contains("cx q[0], q[1];"));
    }

    #[test]
    fn test_emit_pi_fraction() {
        let mut circuit = Circuit::new(1);
        circuit
            .append(op1(PrimitiveGate::Rx, 0, vec![std::f64::consts::PI / 2.0]))
            .unwrap();

        let qasm = emit(&circuit).unwrap();
        assert!(qasm.contains("rx(pi/2) q[0];"));
    }

    #[test]
    fn test_emit_measurement_declares_creg() {
        use rimfax_ir::{Gate, MeasurementPlaceholder};
        use std::collections::BTreeMap;

        let mut circuit = Circuit::new(1);
        let placeholder = MeasurementPlaceholder::new(
            ("c".to_string(), 1),
            BTreeMap::from([(0, ("c".to_string(), 0))]),
        );
        circuit
            .append(
                Operation::new(
                    Gate::Measurement(placeholder),
                    Location::new(vec![0]).unwrap(),
                    vec![],
                )
                .unwrap(),
            )
            .unwrap();

        let qasm = emit(&circuit).unwrap();
        assert!(qasm.contains("creg c[1];"));
        assert!(qasm.contains("measure q[0] -> c[0];"));
    }
}
