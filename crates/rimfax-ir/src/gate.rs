//! Gate capability model: primitive gates, composite gates, and measurement
//! placeholders.

use ndarray::{Array2, array};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::f64::consts::FRAC_1_SQRT_2;

use crate::circuit::Circuit;
use crate::error::{IrError, IrResult};
use crate::location::Location;
use crate::unitary::UnitaryMatrix;

fn c(re: f64, im: f64) -> Complex64 {
    Complex64::new(re, im)
}

fn cis(theta: f64) -> Complex64 {
    Complex64::from_polar(1.0, theta)
}

/// Build the controlled version of a single-qudit matrix, control first.
fn controlled(u: &Array2<Complex64>) -> Array2<Complex64> {
    let mut m = Array2::eye(4);
    for i in 0..2 {
        for j in 0..2 {
            m[[2 + i, 2 + j]] = u[[i, j]];
        }
    }
    m
}

fn u3_matrix(theta: f64, phi: f64, lambda: f64) -> Array2<Complex64> {
    let cos = (theta / 2.0).cos();
    let sin = (theta / 2.0).sin();
    array![
        [c(cos, 0.0), -cis(lambda) * sin],
        [cis(phi) * sin, cis(phi + lambda) * cos],
    ]
}

fn u2_matrix(phi: f64, lambda: f64) -> Array2<Complex64> {
    array![
        [c(FRAC_1_SQRT_2, 0.0), -cis(lambda) * FRAC_1_SQRT_2],
        [
            cis(phi) * FRAC_1_SQRT_2,
            cis(phi + lambda) * FRAC_1_SQRT_2
        ],
    ]
}

fn u1_matrix(lambda: f64) -> Array2<Complex64> {
    array![[c(1.0, 0.0), c(0.0, 0.0)], [c(0.0, 0.0), cis(lambda)]]
}

fn rx_matrix(theta: f64) -> Array2<Complex64> {
    let cos = (theta / 2.0).cos();
    let sin = (theta / 2.0).sin();
    array![[c(cos, 0.0), c(0.0, -sin)], [c(0.0, -sin), c(cos, 0.0)]]
}

fn ry_matrix(theta: f64) -> Array2<Complex64> {
    let cos = (theta / 2.0).cos();
    let sin = (theta / 2.0).sin();
    array![[c(cos, 0.0), c(-sin, 0.0)], [c(sin, 0.0), c(cos, 0.0)]]
}

fn rz_matrix(theta: f64) -> Array2<Complex64> {
    array![
        [cis(-theta / 2.0), c(0.0, 0.0)],
        [c(0.0, 0.0), cis(theta / 2.0)],
    ]
}

fn x_matrix() -> Array2<Complex64> {
    array![[c(0.0, 0.0), c(1.0, 0.0)], [c(1.0, 0.0), c(0.0, 0.0)]]
}

fn y_matrix() -> Array2<Complex64> {
    array![[c(0.0, 0.0), c(0.0, -1.0)], [c(0.0, 1.0), c(0.0, 0.0)]]
}

fn z_matrix() -> Array2<Complex64> {
    array![[c(1.0, 0.0), c(0.0, 0.0)], [c(0.0, 0.0), c(-1.0, 0.0)]]
}

fn h_matrix() -> Array2<Complex64> {
    array![
        [c(FRAC_1_SQRT_2, 0.0), c(FRAC_1_SQRT_2, 0.0)],
        [c(FRAC_1_SQRT_2, 0.0), c(-FRAC_1_SQRT_2, 0.0)],
    ]
}

/// Built-in gates with closed-form unitaries.
///
/// The catalogue covers the QASM2 built-ins (`U`, `CX`) and the qelib1
/// standard library. Parameters are supplied at the operation level, so the
/// variants themselves are stateless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrimitiveGate {
    /// Identity.
    Id,
    /// Pauli-X.
    X,
    /// Pauli-Y.
    Y,
    /// Pauli-Z.
    Z,
    /// Hadamard.
    H,
    /// S (sqrt(Z)).
    S,
    /// S-dagger.
    Sdg,
    /// T (fourth root of Z).
    T,
    /// T-dagger.
    Tdg,
    /// Rotation around X: rx(θ).
    Rx,
    /// Rotation around Y: ry(θ).
    Ry,
    /// Rotation around Z: rz(θ).
    Rz,
    /// Phase gate: u1(λ) = diag(1, e^{iλ}).
    U1,
    /// u2(φ, λ) = U(π/2, φ, λ).
    U2,
    /// Universal single-qudit gate: u3(θ, φ, λ).
    U3,
    /// Controlled-X, control first.
    CX,
    /// Controlled-Y.
    CY,
    /// Controlled-Z.
    CZ,
    /// Controlled-Hadamard.
    CH,
    /// SWAP.
    Swap,
    /// Controlled rx.
    CRx,
    /// Controlled ry.
    CRy,
    /// Controlled rz.
    CRz,
    /// Controlled u1.
    CU1,
    /// Controlled u3.
    CU3,
    /// Toffoli (CCX), controls first.
    CCX,
    /// Fredkin (CSWAP), control first.
    CSwap,
}

impl PrimitiveGate {
    /// The QASM name of this gate.
    #[inline]
    pub fn qasm_name(self) -> &'static str {
        match self {
            PrimitiveGate::Id => "id",
            PrimitiveGate::X => "x",
            PrimitiveGate::Y => "y",
            PrimitiveGate::Z => "z",
            PrimitiveGate::H => "h",
            PrimitiveGate::S => "s",
            PrimitiveGate::Sdg => "sdg",
            PrimitiveGate::T => "t",
            PrimitiveGate::Tdg => "tdg",
            PrimitiveGate::Rx => "rx",
            PrimitiveGate::Ry => "ry",
            PrimitiveGate::Rz => "rz",
            PrimitiveGate::U1 => "u1",
            PrimitiveGate::U2 => "u2",
            PrimitiveGate::U3 => "u3",
            PrimitiveGate::CX => "cx",
            PrimitiveGate::CY => "cy",
            PrimitiveGate::CZ => "cz",
            PrimitiveGate::CH => "ch",
            PrimitiveGate::Swap => "swap",
            PrimitiveGate::CRx => "crx",
            PrimitiveGate::CRy => "cry",
            PrimitiveGate::CRz => "crz",
            PrimitiveGate::CU1 => "cu1",
            PrimitiveGate::CU3 => "cu3",
            PrimitiveGate::CCX => "ccx",
            PrimitiveGate::CSwap => "cswap",
        }
    }

    /// Number of qudits this gate acts on.
    #[inline]
    pub fn num_qudits(self) -> usize {
        match self {
            PrimitiveGate::Id
            | PrimitiveGate::X
            | PrimitiveGate::Y
            | PrimitiveGate::Z
            | PrimitiveGate::H
            | PrimitiveGate::S
            | PrimitiveGate::Sdg
            | PrimitiveGate::T
            | PrimitiveGate::Tdg
            | PrimitiveGate::Rx
            | PrimitiveGate::Ry
            | PrimitiveGate::Rz
            | PrimitiveGate::U1
            | PrimitiveGate::U2
            | PrimitiveGate::U3 => 1,

            PrimitiveGate::CX
            | PrimitiveGate::CY
            | PrimitiveGate::CZ
            | PrimitiveGate::CH
            | PrimitiveGate::Swap
            | PrimitiveGate::CRx
            | PrimitiveGate::CRy
            | PrimitiveGate::CRz
            | PrimitiveGate::CU1
            | PrimitiveGate::CU3 => 2,

            PrimitiveGate::CCX | PrimitiveGate::CSwap => 3,
        }
    }

    /// Number of real parameters this gate takes.
    #[inline]
    pub fn num_params(self) -> usize {
        match self {
            PrimitiveGate::U3 | PrimitiveGate::CU3 => 3,
            PrimitiveGate::U2 => 2,
            PrimitiveGate::Rx
            | PrimitiveGate::Ry
            | PrimitiveGate::Rz
            | PrimitiveGate::U1
            | PrimitiveGate::CRx
            | PrimitiveGate::CRy
            | PrimitiveGate::CRz
            | PrimitiveGate::CU1 => 1,
            _ => 0,
        }
    }

    /// The closed-form unitary of this gate for the given parameters.
    pub fn unitary(self, params: &[f64]) -> IrResult<UnitaryMatrix> {
        if params.len() != self.num_params() {
            return Err(IrError::ParameterCountMismatch {
                gate: self.qasm_name().to_string(),
                expected: self.num_params(),
                got: params.len(),
            });
        }
        let m = match self {
            PrimitiveGate::Id => Array2::eye(2),
            PrimitiveGate::X => x_matrix(),
            PrimitiveGate::Y => y_matrix(),
            PrimitiveGate::Z => z_matrix(),
            PrimitiveGate::H => h_matrix(),
            PrimitiveGate::S => u1_matrix(std::f64::consts::FRAC_PI_2),
            PrimitiveGate::Sdg => u1_matrix(-std::f64::consts::FRAC_PI_2),
            PrimitiveGate::T => u1_matrix(std::f64::consts::FRAC_PI_4),
            PrimitiveGate::Tdg => u1_matrix(-std::f64::consts::FRAC_PI_4),
            PrimitiveGate::Rx => rx_matrix(params[0]),
            PrimitiveGate::Ry => ry_matrix(params[0]),
            PrimitiveGate::Rz => rz_matrix(params[0]),
            PrimitiveGate::U1 => u1_matrix(params[0]),
            PrimitiveGate::U2 => u2_matrix(params[0], params[1]),
            PrimitiveGate::U3 => u3_matrix(params[0], params[1], params[2]),
            PrimitiveGate::CX => controlled(&x_matrix()),
            PrimitiveGate::CY => controlled(&y_matrix()),
            PrimitiveGate::CZ => controlled(&z_matrix()),
            PrimitiveGate::CH => controlled(&h_matrix()),
            PrimitiveGate::CRx => controlled(&rx_matrix(params[0])),
            PrimitiveGate::CRy => controlled(&ry_matrix(params[0])),
            PrimitiveGate::CRz => controlled(&rz_matrix(params[0])),
            PrimitiveGate::CU1 => controlled(&u1_matrix(params[0])),
            PrimitiveGate::CU3 => controlled(&u3_matrix(params[0], params[1], params[2])),
            PrimitiveGate::Swap => {
                let mut m = Array2::zeros((4, 4));
                m[[0, 0]] = c(1.0, 0.0);
                m[[1, 2]] = c(1.0, 0.0);
                m[[2, 1]] = c(1.0, 0.0);
                m[[3, 3]] = c(1.0, 0.0);
                m
            }
            PrimitiveGate::CCX => {
                let mut m = Array2::eye(8);
                m[[6, 6]] = c(0.0, 0.0);
                m[[7, 7]] = c(0.0, 0.0);
                m[[6, 7]] = c(1.0, 0.0);
                m[[7, 6]] = c(1.0, 0.0);
                m
            }
            PrimitiveGate::CSwap => {
                let mut m = Array2::eye(8);
                m[[5, 5]] = c(0.0, 0.0);
                m[[6, 6]] = c(0.0, 0.0);
                m[[5, 6]] = c(1.0, 0.0);
                m[[6, 5]] = c(1.0, 0.0);
                m
            }
        };
        Ok(UnitaryMatrix::new(m))
    }

    /// Analytic gradient with respect to each parameter, where supported.
    ///
    /// Returns one matrix per parameter (the entry-wise derivative of the
    /// unitary), or `None` for gates without an implemented gradient.
    pub fn gradient(self, params: &[f64]) -> Option<Vec<Array2<Complex64>>> {
        if params.len() != self.num_params() {
            return None;
        }
        match self {
            PrimitiveGate::Rx => {
                let dcos = -(params[0] / 2.0).sin() / 2.0;
                let dsin = (params[0] / 2.0).cos() / 2.0;
                Some(vec![array![
                    [c(dcos, 0.0), c(0.0, -dsin)],
                    [c(0.0, -dsin), c(dcos, 0.0)],
                ]])
            }
            PrimitiveGate::Ry => {
                let dcos = -(params[0] / 2.0).sin() / 2.0;
                let dsin = (params[0] / 2.0).cos() / 2.0;
                Some(vec![array![
                    [c(dcos, 0.0), c(-dsin, 0.0)],
                    [c(dsin, 0.0), c(dcos, 0.0)],
                ]])
            }
            PrimitiveGate::Rz => Some(vec![array![
                [c(0.0, -0.5) * cis(-params[0] / 2.0), c(0.0, 0.0)],
                [c(0.0, 0.0), c(0.0, 0.5) * cis(params[0] / 2.0)],
            ]]),
            PrimitiveGate::U1 => Some(vec![array![
                [c(0.0, 0.0), c(0.0, 0.0)],
                [c(0.0, 0.0), c(0.0, 1.0) * cis(params[0])],
            ]]),
            _ => None,
        }
    }
}

/// A composite gate: a reusable sub-circuit bound to the qudit permutation
/// supplied at its call site.
///
/// The inner circuit is numbered over local qudits `0..k-1` in formal
/// declaration order; `location[t]` records which caller qudit the t-th
/// formal was bound to. The gate's flat parameter vector is the inner
/// circuit's flattening (cycle order, then ascending qudit order).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitGate {
    circuit: Circuit,
    location: Location,
}

impl CircuitGate {
    /// Wrap an inner circuit and its call-site permutation.
    pub fn new(circuit: Circuit, location: Location) -> IrResult<Self> {
        if circuit.num_qudits() != location.len() {
            return Err(IrError::LocationSizeMismatch {
                gate: "circuitgate".to_string(),
                expected: circuit.num_qudits(),
                got: location.len(),
            });
        }
        Ok(Self { circuit, location })
    }

    /// The inner circuit, in local qudit numbering.
    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }

    /// The formal-to-actual qudit permutation applied at the call site.
    pub fn location(&self) -> &Location {
        &self.location
    }
}

/// One combined measurement event, possibly spanning several qudits.
///
/// Records the classical register it writes to and, per addressed qudit
/// index, the (register, bit offset) destination. Carries no unitary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasurementPlaceholder {
    /// Target classical register: name and declared size.
    pub creg: (String, usize),
    /// Addressed qudit index -> (classical register name, bit offset).
    pub measurements: BTreeMap<usize, (String, usize)>,
}

impl MeasurementPlaceholder {
    /// Create a measurement placeholder.
    pub fn new(creg: (String, usize), measurements: BTreeMap<usize, (String, usize)>) -> Self {
        Self { creg, measurements }
    }

    /// Number of qudits measured.
    pub fn num_qudits(&self) -> usize {
        self.measurements.len()
    }
}

/// A gate: the closed set of things an operation can apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Gate {
    /// A built-in gate with a closed-form unitary.
    Primitive(PrimitiveGate),
    /// A composite gate wrapping an inner circuit.
    Circuit(Box<CircuitGate>),
    /// A measurement placeholder.
    Measurement(MeasurementPlaceholder),
}

impl Gate {
    /// Display name of the gate.
    pub fn name(&self) -> &str {
        match self {
            Gate::Primitive(g) => g.qasm_name(),
            Gate::Circuit(_) => "circuitgate",
            Gate::Measurement(_) => "measure",
        }
    }

    /// Number of qudits the gate acts on.
    pub fn num_qudits(&self) -> usize {
        match self {
            Gate::Primitive(g) => g.num_qudits(),
            Gate::Circuit(g) => g.circuit().num_qudits(),
            Gate::Measurement(m) => m.num_qudits(),
        }
    }

    /// Number of flat real parameters the gate takes.
    pub fn num_params(&self) -> usize {
        match self {
            Gate::Primitive(g) => g.num_params(),
            Gate::Circuit(g) => g.circuit().num_params(),
            Gate::Measurement(_) => 0,
        }
    }

    /// The unitary for the given flat parameter vector.
    ///
    /// For composite gates the flat parameters are redistributed over the
    /// inner circuit before composing. Measurement placeholders transform
    /// nothing and contribute the identity.
    pub fn unitary(&self, params: &[f64]) -> IrResult<UnitaryMatrix> {
        match self {
            Gate::Primitive(g) => g.unitary(params),
            Gate::Circuit(g) => g.circuit().with_flat_params(params)?.unitary(),
            Gate::Measurement(m) => Ok(UnitaryMatrix::identity(1 << m.num_qudits())),
        }
    }

    /// Analytic gradient per parameter, where the gate supports one.
    pub fn gradient(&self, params: &[f64]) -> Option<Vec<Array2<Complex64>>> {
        match self {
            Gate::Primitive(g) => g.gradient(params),
            Gate::Circuit(_) | Gate::Measurement(_) => None,
        }
    }

    /// True for measurement placeholders.
    pub fn is_measurement(&self) -> bool {
        matches!(self, Gate::Measurement(_))
    }
}

impl From<PrimitiveGate> for Gate {
    fn from(gate: PrimitiveGate) -> Self {
        Gate::Primitive(gate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_catalogue_arity() {
        assert_eq!(PrimitiveGate::H.num_qudits(), 1);
        assert_eq!(PrimitiveGate::CX.num_qudits(), 2);
        assert_eq!(PrimitiveGate::CCX.num_qudits(), 3);
        assert_eq!(PrimitiveGate::U3.num_params(), 3);
        assert_eq!(PrimitiveGate::U2.num_params(), 2);
        assert_eq!(PrimitiveGate::Rz.num_params(), 1);
        assert_eq!(PrimitiveGate::Swap.num_params(), 0);
    }

    #[test]
    fn test_wrong_parameter_count() {
        let err = PrimitiveGate::Rx.unitary(&[]).unwrap_err();
        assert!(matches!(
            err,
            IrError::ParameterCountMismatch { expected: 1, got: 0, .. }
        ));
    }

    #[test]
    fn test_cx_matrix() {
        let u = PrimitiveGate::CX.unitary(&[]).unwrap();
        let m = u.matrix();
        // Control is the most significant digit: |10> -> |11>.
        assert_eq!(m[[0, 0]], c(1.0, 0.0));
        assert_eq!(m[[1, 1]], c(1.0, 0.0));
        assert_eq!(m[[3, 2]], c(1.0, 0.0));
        assert_eq!(m[[2, 3]], c(1.0, 0.0));
        assert_eq!(m[[2, 2]], c(0.0, 0.0));
    }

    #[test]
    fn test_u2_is_u3_at_half_pi() {
        let u2 = PrimitiveGate::U2.unitary(&[0.3, 1.1]).unwrap();
        let u3 = PrimitiveGate::U3.unitary(&[PI / 2.0, 0.3, 1.1]).unwrap();
        assert!(u2.distance_from(&u3) < 1e-12);
    }

    #[test]
    fn test_rotation_unitarity() {
        for gate in [PrimitiveGate::Rx, PrimitiveGate::Ry, PrimitiveGate::Rz] {
            let u = gate.unitary(&[0.77]).unwrap();
            let m = u.matrix();
            // Columns orthonormal.
            let n0 = m[[0, 0]].norm_sqr() + m[[1, 0]].norm_sqr();
            let n1 = m[[0, 1]].norm_sqr() + m[[1, 1]].norm_sqr();
            assert!((n0 - 1.0).abs() < 1e-12);
            assert!((n1 - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_ry_gradient_matches_finite_difference() {
        let theta = 0.9;
        let eps = 1e-6;
        let grad = PrimitiveGate::Ry.gradient(&[theta]).unwrap();
        let up = PrimitiveGate::Ry.unitary(&[theta + eps]).unwrap();
        let down = PrimitiveGate::Ry.unitary(&[theta - eps]).unwrap();
        for i in 0..2 {
            for j in 0..2 {
                let numeric = (up.matrix()[[i, j]] - down.matrix()[[i, j]]) / (2.0 * eps);
                assert!((numeric - grad[0][[i, j]]).norm() < 1e-6);
            }
        }
    }

    #[test]
    fn test_gradient_unsupported() {
        assert!(PrimitiveGate::H.gradient(&[]).is_none());
        assert!(PrimitiveGate::U2.gradient(&[0.1, 0.2]).is_none());
    }

    #[test]
    fn test_measurement_unitary_is_identity() {
        let gate = Gate::Measurement(MeasurementPlaceholder::new(
            ("c".to_string(), 1),
            BTreeMap::from([(0, ("c".to_string(), 0))]),
        ));
        assert_eq!(gate.num_qudits(), 1);
        assert_eq!(gate.num_params(), 0);
        let u = gate.unitary(&[]).unwrap();
        assert!(u.distance_from(&UnitaryMatrix::identity(2)) < 1e-12);
    }
}
