//! Cycle-structured circuit over a fixed qudit population.
//!
//! Operations live in an arena in append order; a grid indexed by
//! `(cycle, qudit)` records which operation occupies each slot. Appending
//! schedules greedily: an operation lands in the earliest cycle where every
//! qudit it touches is free, and never earlier than any operation already
//! touching those qudits.

use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};
use crate::operation::Operation;
use crate::unitary::UnitaryMatrix;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Circuit {
    num_qudits: usize,
    /// Operation arena in append order.
    ops: Vec<Operation>,
    /// `grid[cycle][qudit]` holds the arena index of the occupying operation.
    grid: Vec<Vec<Option<usize>>>,
    /// Next free cycle per qudit.
    frontier: Vec<usize>,
}

impl Circuit {
    /// An empty circuit over `num_qudits` qudits.
    pub fn new(num_qudits: usize) -> Self {
        Self {
            num_qudits,
            ops: Vec::new(),
            grid: Vec::new(),
            frontier: vec![0; num_qudits],
        }
    }

    /// Number of qudits the circuit is defined over.
    #[inline]
    pub fn num_qudits(&self) -> usize {
        self.num_qudits
    }

    /// Number of cycles currently occupied.
    #[inline]
    pub fn num_cycles(&self) -> usize {
        self.grid.len()
    }

    /// Number of operations appended so far.
    #[inline]
    pub fn num_operations(&self) -> usize {
        self.ops.len()
    }

    /// True when no operation has been appended.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Dimension of the circuit's state space.
    #[inline]
    pub fn dim(&self) -> usize {
        1 << self.num_qudits
    }

    /// Append an operation, scheduling it into the earliest cycle where all
    /// of its qudits are free. Returns the cycle it landed in.
    pub fn append(&mut self, op: Operation) -> IrResult<usize> {
        for &qudit in op.location() {
            if qudit >= self.num_qudits {
                return Err(IrError::QuditOutOfRange {
                    qudit,
                    num_qudits: self.num_qudits,
                });
            }
        }
        let cycle = op
            .location()
            .iter()
            .map(|&q| self.frontier[q])
            .max()
            .unwrap_or(0);
        while self.grid.len() <= cycle {
            self.grid.push(vec![None; self.num_qudits]);
        }
        let id = self.ops.len();
        for &qudit in op.location() {
            self.grid[cycle][qudit] = Some(id);
            self.frontier[qudit] = cycle + 1;
        }
        self.ops.push(op);
        Ok(cycle)
    }

    /// The operation occupying `(cycle, qudit)`, if any.
    pub fn get(&self, cycle: usize, qudit: usize) -> Option<&Operation> {
        let id = (*self.grid.get(cycle)?.get(qudit)?)?;
        Some(&self.ops[id])
    }

    /// Operations in grid order: cycles ascending, qudits ascending within a
    /// cycle, each operation reported once at its lowest qudit. Yields the
    /// cycle alongside each operation.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Operation)> + '_ {
        self.grid.iter().enumerate().flat_map(move |(cycle, row)| {
            row.iter().enumerate().filter_map(move |(qudit, slot)| {
                let id = (*slot)?;
                let op = &self.ops[id];
                (op.location().min_index() == qudit).then_some((cycle, op))
            })
        })
    }

    fn ids_in_grid_order(&self) -> Vec<usize> {
        let mut ids = Vec::with_capacity(self.ops.len());
        for row in &self.grid {
            for (qudit, slot) in row.iter().enumerate() {
                if let Some(id) = *slot {
                    if self.ops[id].location().min_index() == qudit {
                        ids.push(id);
                    }
                }
            }
        }
        ids
    }

    /// Total flat parameter count, summed in grid order.
    pub fn num_params(&self) -> usize {
        self.ops.iter().map(|op| op.gate().num_params()).sum()
    }

    /// Concatenation of every operation's parameters in grid order.
    pub fn flat_params(&self) -> Vec<f64> {
        let mut params = Vec::with_capacity(self.num_params());
        for id in self.ids_in_grid_order() {
            params.extend_from_slice(self.ops[id].params());
        }
        params
    }

    /// A copy of this circuit with its parameters replaced by `params`,
    /// redistributed in grid order. The vector length must match
    /// [`num_params`](Self::num_params) exactly.
    pub fn with_flat_params(&self, params: &[f64]) -> IrResult<Circuit> {
        let expected = self.num_params();
        if params.len() != expected {
            return Err(IrError::FlatParameterMismatch {
                expected,
                got: params.len(),
            });
        }
        let mut out = self.clone();
        let mut offset = 0;
        for id in out.ids_in_grid_order() {
            let take = out.ops[id].gate().num_params();
            out.ops[id].set_params(params[offset..offset + take].to_vec())?;
            offset += take;
        }
        Ok(out)
    }

    /// Compose the circuit's unitary: cycle 0 is applied first, so the result
    /// is the product of embedded operation unitaries in reverse grid order.
    /// Measurement placeholders contribute the identity.
    pub fn unitary(&self) -> IrResult<UnitaryMatrix> {
        let mut total = UnitaryMatrix::identity(self.dim());
        for (_, op) in self.iter() {
            let embedded = op.unitary()?.embed(op.location(), self.num_qudits);
            total = embedded.dot(&total);
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::PrimitiveGate;
    use crate::location::Location;
    use std::f64::consts::FRAC_1_SQRT_2;

    fn cx(a: usize, b: usize) -> Operation {
        Operation::new(
            PrimitiveGate::CX.into(),
            Location::new(vec![a, b]).unwrap(),
            vec![],
        )
        .unwrap()
    }

    #[test]
    fn test_greedy_scheduling_chains_dependencies() {
        let mut circuit = Circuit::new(3);
        assert_eq!(circuit.append(cx(2, 1)).unwrap(), 0);
        assert_eq!(circuit.append(cx(0, 2)).unwrap(), 1);
        assert_eq!(circuit.append(cx(1, 0)).unwrap(), 2);
        assert_eq!(circuit.append(cx(2, 0)).unwrap(), 3);
        assert_eq!(circuit.num_cycles(), 4);
        assert_eq!(circuit.num_operations(), 4);

        assert_eq!(circuit.get(0, 2).unwrap().location().as_slice(), &[2, 1]);
        assert_eq!(circuit.get(1, 0).unwrap().location().as_slice(), &[0, 2]);
        assert_eq!(circuit.get(2, 1).unwrap().location().as_slice(), &[1, 0]);
        assert_eq!(circuit.get(3, 2).unwrap().location().as_slice(), &[2, 0]);
    }

    #[test]
    fn test_disjoint_operations_share_a_cycle() {
        let mut circuit = Circuit::new(4);
        assert_eq!(circuit.append(cx(0, 1)).unwrap(), 0);
        assert_eq!(circuit.append(cx(2, 3)).unwrap(), 0);
        assert_eq!(circuit.num_cycles(), 1);
    }

    #[test]
    fn test_out_of_range_qudit_rejected() {
        let mut circuit = Circuit::new(2);
        let err = circuit.append(cx(1, 2)).unwrap_err();
        assert!(matches!(
            err,
            IrError::QuditOutOfRange { qudit: 2, num_qudits: 2 }
        ));
    }

    #[test]
    fn test_iter_reports_each_operation_once() {
        let mut circuit = Circuit::new(3);
        circuit.append(cx(2, 0)).unwrap();
        circuit.append(cx(1, 2)).unwrap();
        let cycles: Vec<usize> = circuit.iter().map(|(c, _)| c).collect();
        assert_eq!(cycles, vec![0, 1]);
    }

    #[test]
    fn test_flat_params_grid_order() {
        let mut circuit = Circuit::new(2);
        circuit
            .append(
                Operation::new(
                    PrimitiveGate::Rz.into(),
                    Location::new(vec![1]).unwrap(),
                    vec![0.5],
                )
                .unwrap(),
            )
            .unwrap();
        circuit
            .append(
                Operation::new(
                    PrimitiveGate::Rx.into(),
                    Location::new(vec![0]).unwrap(),
                    vec![0.25],
                )
                .unwrap(),
            )
            .unwrap();
        // Both land in cycle 0; qudit order puts the rx first.
        assert_eq!(circuit.flat_params(), vec![0.25, 0.5]);
    }

    #[test]
    fn test_with_flat_params_length_checked() {
        let mut circuit = Circuit::new(1);
        circuit
            .append(
                Operation::new(
                    PrimitiveGate::Ry.into(),
                    Location::new(vec![0]).unwrap(),
                    vec![0.1],
                )
                .unwrap(),
            )
            .unwrap();
        let err = circuit.with_flat_params(&[0.1, 0.2]).unwrap_err();
        assert!(matches!(
            err,
            IrError::FlatParameterMismatch { expected: 1, got: 2 }
        ));
        let rebound = circuit.with_flat_params(&[0.9]).unwrap();
        assert_eq!(rebound.flat_params(), vec![0.9]);
    }

    #[test]
    fn test_serde_roundtrip() {
        let mut circuit = Circuit::new(3);
        circuit.append(cx(2, 0)).unwrap();
        circuit
            .append(
                Operation::new(
                    PrimitiveGate::Rz.into(),
                    Location::new(vec![1]).unwrap(),
                    vec![0.3],
                )
                .unwrap(),
            )
            .unwrap();

        let json = serde_json::to_string(&circuit).unwrap();
        let back: Circuit = serde_json::from_str(&json).unwrap();
        assert_eq!(back, circuit);
    }

    #[test]
    fn test_bell_circuit_unitary() {
        let mut circuit = Circuit::new(2);
        circuit
            .append(
                Operation::new(
                    PrimitiveGate::H.into(),
                    Location::new(vec![0]).unwrap(),
                    vec![],
                )
                .unwrap(),
            )
            .unwrap();
        circuit.append(cx(0, 1)).unwrap();
        let u = circuit.unitary().unwrap();
        let m = u.matrix();
        // First column is the Bell state (|00> + |11>) / sqrt(2).
        assert!((m[[0, 0]].re - FRAC_1_SQRT_2).abs() < 1e-12);
        assert!(m[[1, 0]].norm() < 1e-12);
        assert!(m[[2, 0]].norm() < 1e-12);
        assert!((m[[3, 0]].re - FRAC_1_SQRT_2).abs() < 1e-12);
    }
}
