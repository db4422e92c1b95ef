//! Circuit intermediate representation for the rimfax toolkit.
//!
//! The IR models a circuit as a grid of cycles over a fixed qudit
//! population. Each [`Operation`] binds a [`Gate`] to a [`Location`] and a
//! flat real parameter vector; appending an operation schedules it greedily
//! into the earliest cycle where its qudits are free. Circuits compose into
//! dense [`UnitaryMatrix`] values for numerical comparison.

pub mod circuit;
pub mod error;
pub mod gate;
pub mod location;
pub mod operation;
pub mod unitary;

pub use circuit::Circuit;
pub use error::{IrError, IrResult};
pub use gate::{CircuitGate, Gate, MeasurementPlaceholder, PrimitiveGate};
pub use location::Location;
pub use operation::Operation;
pub use unitary::UnitaryMatrix;
