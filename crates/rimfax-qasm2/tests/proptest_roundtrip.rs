//! Property-based tests for QASM2 roundtrip conversion.
//!
//! Tests that circuit -> QASM2 -> circuit preserves structure and semantics.

use proptest::prelude::*;
use rimfax_ir::{Circuit, Location, Operation, PrimitiveGate};
use rimfax_qasm2::{decode, encode};

/// Gate operations that can be applied to a circuit.
#[derive(Debug, Clone)]
enum GateOp {
    H(usize),
    X(usize),
    Rx(usize, f64),
    Rz(usize, f64),
    CX(usize, usize),
}

impl GateOp {
    fn apply(self, circuit: &mut Circuit) {
        let (gate, qudits, params): (PrimitiveGate, Vec<usize>, Vec<f64>) = match self {
            GateOp::H(q) => (PrimitiveGate::H, vec![q], vec![]),
            GateOp::X(q) => (PrimitiveGate::X, vec![q], vec![]),
            GateOp::Rx(q, theta) => (PrimitiveGate::Rx, vec![q], vec![theta]),
            GateOp::Rz(q, theta) => (PrimitiveGate::Rz, vec![q], vec![theta]),
            GateOp::CX(c, t) => (PrimitiveGate::CX, vec![c, t], vec![]),
        };
        let op = Operation::new(gate.into(), Location::new(qudits).unwrap(), params).unwrap();
        circuit.append(op).unwrap();
    }
}

/// Generate a random gate operation for a circuit of the given width.
fn arb_gate_op(num_qudits: usize) -> impl Strategy<Value = GateOp> {
    let angle = -6.0..6.0_f64;
    if num_qudits < 2 {
        prop_oneof![
            (0..num_qudits).prop_map(GateOp::H),
            (0..num_qudits).prop_map(GateOp::X),
            (0..num_qudits, angle.clone()).prop_map(|(q, t)| GateOp::Rx(q, t)),
            (0..num_qudits, angle).prop_map(|(q, t)| GateOp::Rz(q, t)),
        ]
        .boxed()
    } else {
        prop_oneof![
            (0..num_qudits).prop_map(GateOp::H),
            (0..num_qudits).prop_map(GateOp::X),
            (0..num_qudits, angle.clone()).prop_map(|(q, t)| GateOp::Rx(q, t)),
            (0..num_qudits, angle).prop_map(|(q, t)| GateOp::Rz(q, t)),
            (0..num_qudits, 0..num_qudits)
                .prop_filter("control and target must differ", |(c, t)| c != t)
                .prop_map(|(c, t)| GateOp::CX(c, t)),
        ]
        .boxed()
    }
}

/// Generate a random circuit: 1-4 qudits, 1-10 gates.
fn arb_circuit() -> impl Strategy<Value = Circuit> {
    (1_usize..=4).prop_flat_map(|num_qudits| {
        prop::collection::vec(arb_gate_op(num_qudits), 1..=10).prop_map(move |ops| {
            let mut circuit = Circuit::new(num_qudits);
            for op in ops {
                op.apply(&mut circuit);
            }
            circuit
        })
    })
}

proptest! {
    /// circuit -> QASM2 -> circuit preserves structure.
    #[test]
    fn test_roundtrip_preserves_structure(circuit in arb_circuit()) {
        let qasm = encode(&circuit).expect("encode failed");
        let decoded = decode(&qasm).expect("decode failed");

        prop_assert_eq!(decoded.num_qudits(), circuit.num_qudits());
        prop_assert_eq!(decoded.num_operations(), circuit.num_operations());
        prop_assert_eq!(decoded.num_cycles(), circuit.num_cycles());
    }

    /// circuit -> QASM2 -> circuit preserves the unitary.
    #[test]
    fn test_roundtrip_preserves_unitary(circuit in arb_circuit()) {
        let qasm = encode(&circuit).expect("encode failed");
        let decoded = decode(&qasm).expect("decode failed");

        let original = circuit.unitary().expect("unitary failed");
        let recovered = decoded.unitary().expect("unitary failed");
        prop_assert!(original.distance_from(&recovered) < 1e-7);
    }

    /// Encoding an empty circuit still yields a decodable program.
    #[test]
    fn test_empty_circuit_roundtrip(num_qudits in 1_usize..=8) {
        let circuit = Circuit::new(num_qudits);

        let qasm = encode(&circuit).expect("encode failed");
        let decoded = decode(&qasm).expect("decode failed");

        prop_assert_eq!(decoded.num_qudits(), num_qudits);
        prop_assert_eq!(decoded.num_operations(), 0);
    }

    /// Encoding is deterministic.
    #[test]
    fn test_encoding_is_deterministic(circuit in arb_circuit()) {
        let qasm1 = encode(&circuit).expect("first encode failed");
        let qasm2 = encode(&circuit).expect("second encode failed");

        prop_assert_eq!(qasm1, qasm2);
    }
}
