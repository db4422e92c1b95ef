//! Lowering from the QASM2 AST to a scheduled circuit.
//!
//! Statements are processed in source order: register declarations extend
//! the qudit population, gate declarations register macros, and gate calls
//! produce operations. Includes are resolved inline and processed as if
//! their statements appeared at the include site.

use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeMap;

use rimfax_ir::{Circuit, CircuitGate, Gate, Location, MeasurementPlaceholder, Operation, PrimitiveGate};

use super::parse_fragment;
use crate::ast::{GateCall, GateStatement, Program, RegRef, Statement};
use crate::error::{QasmError, QasmResult};
use crate::registry::{IncludeResolver, MacroDef, MacroRegistry, builtin_gate};

/// Deepest allowed nesting of macro bodies calling other macros. Mutually
/// recursive declarations bottom out here.
const MAX_MACRO_DEPTH: usize = 64;

/// Assemble a parsed program into a circuit.
pub(crate) fn assemble(program: &Program, resolver: &dyn IncludeResolver) -> QasmResult<Circuit> {
    let mut assembler = Assembler::new(resolver);
    assembler.run(&program.statements)?;
    assembler.finish()
}

struct Qreg {
    name: String,
    size: usize,
    /// Global index of this register's first qudit.
    offset: usize,
}

struct Assembler<'r> {
    resolver: &'r dyn IncludeResolver,
    registry: MacroRegistry,
    qregs: Vec<Qreg>,
    qreg_lookup: FxHashMap<String, usize>,
    cregs: FxHashMap<String, usize>,
    /// Operations in statement order, over global qudit indices.
    pending: Vec<Operation>,
    num_qudits: usize,
    include_stack: Vec<String>,
    included: FxHashSet<String>,
}

impl<'r> Assembler<'r> {
    fn new(resolver: &'r dyn IncludeResolver) -> Self {
        Self {
            resolver,
            registry: MacroRegistry::new(),
            qregs: Vec::new(),
            qreg_lookup: FxHashMap::default(),
            cregs: FxHashMap::default(),
            pending: Vec::new(),
            num_qudits: 0,
            include_stack: Vec::new(),
            included: FxHashSet::default(),
        }
    }

    fn run(&mut self, statements: &[Statement]) -> QasmResult<()> {
        for statement in statements {
            self.process(statement)?;
        }
        Ok(())
    }

    /// Schedule every pending operation into a fresh circuit.
    fn finish(self) -> QasmResult<Circuit> {
        let mut circuit = Circuit::new(self.num_qudits);
        for op in self.pending {
            circuit.append(op)?;
        }
        tracing::debug!(
            num_qudits = circuit.num_qudits(),
            num_operations = circuit.num_operations(),
            num_cycles = circuit.num_cycles(),
            "assembled circuit"
        );
        Ok(circuit)
    }

    fn process(&mut self, statement: &Statement) -> QasmResult<()> {
        match statement {
            Statement::Include(path) => self.process_include(path),
            Statement::QregDecl { name, size } => {
                self.check_register_name(name)?;
                self.qreg_lookup.insert(name.clone(), self.qregs.len());
                self.qregs.push(Qreg {
                    name: name.clone(),
                    size: *size,
                    offset: self.num_qudits,
                });
                self.num_qudits += size;
                Ok(())
            }
            Statement::CregDecl { name, size } => {
                self.check_register_name(name)?;
                self.cregs.insert(name.clone(), *size);
                Ok(())
            }
            Statement::GateDecl {
                name,
                params,
                qudits,
                body,
            } => self.registry.register(MacroDef {
                name: name.clone(),
                params: params.clone(),
                qudits: qudits.clone(),
                body: body.clone(),
            }),
            Statement::Gate(call) => self.process_call(call),
            Statement::Measure { qudit, clbit } => self.process_measure(qudit, clbit),
            // Barriers constrain a scheduler we don't have.
            Statement::Barrier { .. } => Ok(()),
        }
    }

    fn check_register_name(&self, name: &str) -> QasmResult<()> {
        if self.qreg_lookup.contains_key(name) || self.cregs.contains_key(name) {
            return Err(QasmError::DuplicateDeclaration(name.to_string()));
        }
        Ok(())
    }

    /// Resolve an include inline. The standard library is baked into the
    /// builtin catalogue, so its include is a no-op.
    fn process_include(&mut self, path: &str) -> QasmResult<()> {
        if path == "qelib1.inc" || self.included.contains(path) {
            return Ok(());
        }
        if self.include_stack.iter().any(|p| p == path) {
            return Err(QasmError::IncludeError {
                path: path.to_string(),
                message: "include cycle".to_string(),
            });
        }
        let source = self.resolver.resolve(path)?;
        let statements = parse_fragment(&source)?;
        tracing::debug!(path, statements = statements.len(), "resolved include");

        self.include_stack.push(path.to_string());
        let result = self.run(&statements);
        self.include_stack.pop();
        self.included.insert(path.to_string());
        result
    }

    /// Lower a top-level gate call, broadcasting full-register arguments.
    fn process_call(&mut self, call: &GateCall) -> QasmResult<()> {
        let env = FxHashMap::default();
        let params: Vec<f64> = call
            .params
            .iter()
            .map(|e| e.eval(&env))
            .collect::<QasmResult<_>>()?;

        let resolved = self.resolve_gate(&call.name)?;
        check_arity(&call.name, &resolved, params.len(), call.args.len())?;

        let mut ops = Vec::new();
        for qudits in self.broadcast_args(&call.name, &call.args)? {
            let location = self.location_for(&call.name, &qudits)?;
            let op = match &resolved {
                ResolvedGate::Primitive(gate) => {
                    Operation::new(Gate::Primitive(*gate), location, params.clone())?
                }
                ResolvedGate::Macro(def) => {
                    let sub = self.expand_macro(def, &params)?;
                    let op_params = sub.flat_params();
                    let gate = Gate::Circuit(Box::new(CircuitGate::new(sub, location.clone())?));
                    Operation::new(gate, location, op_params)?
                }
            };
            ops.push(op);
        }
        self.pending.extend(ops);
        Ok(())
    }

    /// Build the sub-circuit a macro stands for, with its formal parameters
    /// bound to concrete values and its formal qudits numbered `0..k-1` in
    /// declaration order. Nested macro calls become circuit gates.
    ///
    /// Bodies are walked with an explicit frame stack, one frame per macro
    /// being expanded. Stacks deeper than `MAX_MACRO_DEPTH` are rejected,
    /// which bottoms out mutually recursive declarations.
    fn expand_macro<'a>(&'a self, def: &'a MacroDef, params: &[f64]) -> QasmResult<Circuit> {
        let mut stack = vec![Frame::new(def, params, None)];
        while let Some(frame) = stack.last_mut() {
            if frame.cursor < frame.def.body.len() {
                let body = frame.def.body.as_slice();
                let statement = &body[frame.cursor];
                frame.cursor += 1;
                if let Some((inner, call_params, site)) =
                    self.expand_body_statement(frame, statement)?
                {
                    if stack.len() >= MAX_MACRO_DEPTH {
                        return Err(QasmError::MacroDepthExceeded(MAX_MACRO_DEPTH));
                    }
                    stack.push(Frame::new(inner, &call_params, Some(site)));
                }
                continue;
            }

            let Some(done) = stack.pop() else { break };
            match (stack.last_mut(), done.site) {
                (Some(parent), Some(site)) => {
                    let op_params = done.sub.flat_params();
                    let gate = Gate::Circuit(Box::new(CircuitGate::new(done.sub, site.clone())?));
                    parent.sub.append(Operation::new(gate, site, op_params)?)?;
                }
                _ => return Ok(done.sub),
            }
        }
        // The root frame's pop above is the only exit.
        unreachable!()
    }

    /// Lower one body statement into the frame's sub-circuit. A call to
    /// another macro is not lowered here; its definition, evaluated
    /// parameters, and call site are handed back so the caller can push a
    /// frame for it.
    fn expand_body_statement<'a>(
        &'a self,
        frame: &mut Frame<'a>,
        statement: &GateStatement,
    ) -> QasmResult<Option<(&'a MacroDef, Vec<f64>, Location)>> {
        match statement {
            GateStatement::Call(call) => {
                let call_params: Vec<f64> = call
                    .params
                    .iter()
                    .map(|e| e.eval(&frame.env))
                    .collect::<QasmResult<_>>()?;

                let resolved = self.resolve_gate(&call.name)?;
                check_arity(&call.name, &resolved, call_params.len(), call.args.len())?;

                let mut qudits = Vec::with_capacity(call.args.len());
                for arg in &call.args {
                    qudits.push(formal_qudit(&frame.locals, arg)?);
                }
                let location = self.location_for(&call.name, &qudits)?;

                match resolved {
                    ResolvedGate::Primitive(gate) => {
                        frame
                            .sub
                            .append(Operation::new(Gate::Primitive(gate), location, call_params)?)?;
                        Ok(None)
                    }
                    ResolvedGate::Macro(inner) => Ok(Some((inner, call_params, location))),
                }
            }
            GateStatement::Measure { qudit, clbit } => {
                let local = formal_qudit(&frame.locals, qudit)?;
                let creg_size = *self
                    .cregs
                    .get(&clbit.register)
                    .ok_or_else(|| QasmError::UndefinedIdentifier(clbit.register.clone()))?;
                let bit = match clbit.index {
                    Some(index) => {
                        if index >= creg_size {
                            return Err(QasmError::IndexOutOfBounds {
                                register: clbit.register.clone(),
                                index,
                                size: creg_size,
                            });
                        }
                        index
                    }
                    None => {
                        if creg_size != 1 {
                            return Err(QasmError::BroadcastMismatch {
                                gate: "measure".to_string(),
                                expected: 1,
                                got: creg_size,
                            });
                        }
                        0
                    }
                };

                let mut measurements = BTreeMap::new();
                measurements.insert(local, (clbit.register.clone(), bit));
                let location = Location::new(vec![local])?;
                let placeholder =
                    MeasurementPlaceholder::new((clbit.register.clone(), creg_size), measurements);
                frame
                    .sub
                    .append(Operation::new(Gate::Measurement(placeholder), location, vec![])?)?;
                Ok(None)
            }
        }
    }

    /// Lower a measure statement into one combined measurement placeholder.
    fn process_measure(&mut self, qudit: &RegRef, clbit: &RegRef) -> QasmResult<()> {
        let creg_size = *self
            .cregs
            .get(&clbit.register)
            .ok_or_else(|| QasmError::UndefinedIdentifier(clbit.register.clone()))?;

        let qudits = self.expand_qudit_ref(qudit)?;
        let clbits: Vec<usize> = match clbit.index {
            Some(index) => {
                if index >= creg_size {
                    return Err(QasmError::IndexOutOfBounds {
                        register: clbit.register.clone(),
                        index,
                        size: creg_size,
                    });
                }
                vec![index]
            }
            None => (0..creg_size).collect(),
        };

        if qudits.len() != clbits.len() {
            return Err(QasmError::BroadcastMismatch {
                gate: "measure".to_string(),
                expected: qudits.len(),
                got: clbits.len(),
            });
        }

        let mut measurements = BTreeMap::new();
        for (global, bit) in qudits.iter().zip(&clbits) {
            measurements.insert(*global, (clbit.register.clone(), *bit));
        }
        let location = Location::new(measurements.keys().copied().collect::<Vec<_>>())?;
        let placeholder =
            MeasurementPlaceholder::new((clbit.register.clone(), creg_size), measurements);
        self.pending
            .push(Operation::new(Gate::Measurement(placeholder), location, vec![])?);
        Ok(())
    }

    fn resolve_gate(&self, name: &str) -> QasmResult<ResolvedGate<'_>> {
        if let Some(gate) = builtin_gate(name) {
            return Ok(ResolvedGate::Primitive(gate));
        }
        self.registry
            .get(name)
            .map(ResolvedGate::Macro)
            .ok_or_else(|| QasmError::UnknownGate(name.to_string()))
    }

    /// Expand one register reference into global qudit indices.
    fn expand_qudit_ref(&self, arg: &RegRef) -> QasmResult<Vec<usize>> {
        let qreg = self
            .qreg_lookup
            .get(&arg.register)
            .map(|&i| &self.qregs[i])
            .ok_or_else(|| QasmError::UndefinedIdentifier(arg.register.clone()))?;
        match arg.index {
            Some(index) => {
                if index >= qreg.size {
                    return Err(QasmError::IndexOutOfBounds {
                        register: qreg.name.clone(),
                        index,
                        size: qreg.size,
                    });
                }
                Ok(vec![qreg.offset + index])
            }
            None => Ok((qreg.offset..qreg.offset + qreg.size).collect()),
        }
    }

    /// Expand gate call arguments into concrete qudit tuples.
    ///
    /// Full-register arguments broadcast index-wise: all of them must share
    /// one size N, and the call becomes N operations with indexed arguments
    /// repeated in each.
    fn broadcast_args(&self, gate: &str, args: &[RegRef]) -> QasmResult<Vec<Vec<usize>>> {
        let expanded: Vec<Vec<usize>> = args
            .iter()
            .map(|arg| self.expand_qudit_ref(arg))
            .collect::<QasmResult<_>>()?;

        let mut width: Option<usize> = None;
        for (arg, indices) in args.iter().zip(&expanded) {
            if arg.index.is_none() {
                match width {
                    None => width = Some(indices.len()),
                    Some(w) if w != indices.len() => {
                        return Err(QasmError::BroadcastMismatch {
                            gate: gate.to_string(),
                            expected: w,
                            got: indices.len(),
                        });
                    }
                    Some(_) => {}
                }
            }
        }
        let width = width.unwrap_or(1);

        let mut tuples = Vec::with_capacity(width);
        for i in 0..width {
            let tuple = args
                .iter()
                .zip(&expanded)
                .map(|(arg, indices)| {
                    if arg.index.is_none() {
                        indices[i]
                    } else {
                        indices[0]
                    }
                })
                .collect();
            tuples.push(tuple);
        }
        Ok(tuples)
    }

    fn location_for(&self, gate: &str, qudits: &[usize]) -> QasmResult<Location> {
        for (i, a) in qudits.iter().enumerate() {
            if qudits[..i].contains(a) {
                return Err(QasmError::DuplicateQuditArgument {
                    gate: gate.to_string(),
                });
            }
        }
        Ok(Location::new(qudits.to_vec())?)
    }
}

/// One macro body mid-expansion.
struct Frame<'a> {
    def: &'a MacroDef,
    /// Formal parameter bindings for expression evaluation in this body.
    env: FxHashMap<String, f64>,
    /// Formal qudit names to indices `0..k-1` in declaration order.
    locals: FxHashMap<String, usize>,
    sub: Circuit,
    /// Next body statement to lower.
    cursor: usize,
    /// Where the finished sub-circuit lands in the parent frame. `None`
    /// marks the root frame.
    site: Option<Location>,
}

impl<'a> Frame<'a> {
    fn new(def: &'a MacroDef, params: &[f64], site: Option<Location>) -> Self {
        let mut env = FxHashMap::default();
        for (formal, value) in def.params.iter().zip(params) {
            env.insert(formal.clone(), *value);
        }
        let mut locals = FxHashMap::default();
        for (index, formal) in def.qudits.iter().enumerate() {
            locals.insert(formal.clone(), index);
        }
        Self {
            def,
            env,
            locals,
            sub: Circuit::new(def.qudits.len()),
            cursor: 0,
            site,
        }
    }
}

/// Resolve a qudit argument inside a macro body. Only the declaration's
/// formal names are in scope, and they cannot be indexed.
fn formal_qudit(locals: &FxHashMap<String, usize>, arg: &RegRef) -> QasmResult<usize> {
    if arg.index.is_some() {
        return Err(QasmError::IndexedFormalQudit(arg.register.clone()));
    }
    locals
        .get(&arg.register)
        .copied()
        .ok_or_else(|| QasmError::UndefinedIdentifier(arg.register.clone()))
}

enum ResolvedGate<'a> {
    Primitive(PrimitiveGate),
    Macro(&'a MacroDef),
}

fn check_arity(
    gate: &str,
    resolved: &ResolvedGate<'_>,
    num_params: usize,
    num_args: usize,
) -> QasmResult<()> {
    let (expected_params, expected_qudits) = match resolved {
        ResolvedGate::Primitive(g) => (g.num_params(), g.num_qudits()),
        ResolvedGate::Macro(def) => (def.params.len(), def.qudits.len()),
    };
    if num_params != expected_params {
        return Err(QasmError::WrongParameterCount {
            gate: gate.to_string(),
            expected: expected_params,
            got: num_params,
        });
    }
    if num_args != expected_qudits {
        return Err(QasmError::WrongQuditCount {
            gate: gate.to_string(),
            expected: expected_qudits,
            got: num_args,
        });
    }
    Ok(())
}
