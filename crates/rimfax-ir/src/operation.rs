//! A gate bound to concrete qudits and concrete parameter values.

use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};
use crate::gate::Gate;
use crate::location::Location;
use crate::unitary::UnitaryMatrix;

/// One scheduled instance of a gate in a circuit.
///
/// `location[t]` is the circuit qudit bound to the gate's t-th local qudit,
/// and `params` is the gate's flat real parameter vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    gate: Gate,
    location: Location,
    params: Vec<f64>,
}

impl Operation {
    /// Bind a gate to a location and parameter vector.
    ///
    /// Fails when the location size does not match the gate's qudit count or
    /// the parameter count does not match the gate's arity.
    pub fn new(gate: Gate, location: Location, params: Vec<f64>) -> IrResult<Self> {
        if location.len() != gate.num_qudits() {
            return Err(IrError::LocationSizeMismatch {
                gate: gate.name().to_string(),
                expected: gate.num_qudits(),
                got: location.len(),
            });
        }
        if params.len() != gate.num_params() {
            return Err(IrError::ParameterCountMismatch {
                gate: gate.name().to_string(),
                expected: gate.num_params(),
                got: params.len(),
            });
        }
        Ok(Self { gate, location, params })
    }

    /// The bound gate.
    pub fn gate(&self) -> &Gate {
        &self.gate
    }

    /// The circuit qudits this operation touches.
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// The flat parameter vector.
    pub fn params(&self) -> &[f64] {
        &self.params
    }

    /// Replace the parameter vector, keeping the count fixed.
    pub(crate) fn set_params(&mut self, params: Vec<f64>) -> IrResult<()> {
        if params.len() != self.gate.num_params() {
            return Err(IrError::ParameterCountMismatch {
                gate: self.gate.name().to_string(),
                expected: self.gate.num_params(),
                got: params.len(),
            });
        }
        self.params = params;
        Ok(())
    }

    /// The unitary this operation applies on its own qudits.
    pub fn unitary(&self) -> IrResult<UnitaryMatrix> {
        self.gate.unitary(&self.params)
    }
}
