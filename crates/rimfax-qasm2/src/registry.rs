//! Gate name resolution: the builtin catalogue, declared macros, and
//! include resolution.

use rustc_hash::FxHashMap;
use std::path::PathBuf;

use rimfax_ir::PrimitiveGate;

use crate::ast::GateStatement;
use crate::error::{QasmError, QasmResult};

/// Look up a builtin gate by its QASM name.
///
/// The catalogue covers the bare QASM2 builtins (`U`, `CX`) and the qelib1
/// standard library, which is available without an include; a source that
/// does `include "qelib1.inc"` simply confirms what is already there.
pub fn builtin_gate(name: &str) -> Option<PrimitiveGate> {
    Some(match name {
        "U" | "u" | "u3" => PrimitiveGate::U3,
        "u2" => PrimitiveGate::U2,
        "u1" => PrimitiveGate::U1,
        "CX" | "cx" => PrimitiveGate::CX,
        "id" => PrimitiveGate::Id,
        "x" => PrimitiveGate::X,
        "y" => PrimitiveGate::Y,
        "z" => PrimitiveGate::Z,
        "h" => PrimitiveGate::H,
        "s" => PrimitiveGate::S,
        "sdg" => PrimitiveGate::Sdg,
        "t" => PrimitiveGate::T,
        "tdg" => PrimitiveGate::Tdg,
        "rx" => PrimitiveGate::Rx,
        "ry" => PrimitiveGate::Ry,
        "rz" => PrimitiveGate::Rz,
        "cy" => PrimitiveGate::CY,
        "cz" => PrimitiveGate::CZ,
        "ch" => PrimitiveGate::CH,
        "swap" => PrimitiveGate::Swap,
        "crx" => PrimitiveGate::CRx,
        "cry" => PrimitiveGate::CRy,
        "crz" => PrimitiveGate::CRz,
        "cu1" => PrimitiveGate::CU1,
        "cu3" => PrimitiveGate::CU3,
        "ccx" => PrimitiveGate::CCX,
        "cswap" => PrimitiveGate::CSwap,
        _ => return None,
    })
}

/// A declared gate macro: formal parameters, formal qudits, and a body of
/// statements over those formals.
#[derive(Debug, Clone)]
pub struct MacroDef {
    pub name: String,
    pub params: Vec<String>,
    pub qudits: Vec<String>,
    pub body: Vec<GateStatement>,
}

/// Registry of gate macros declared during one decode.
#[derive(Debug, Default)]
pub struct MacroRegistry {
    macros: FxHashMap<String, MacroDef>,
}

impl MacroRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a macro declaration.
    ///
    /// Rejects names that shadow a builtin or an earlier declaration, and
    /// bodies that call the macro being declared.
    pub fn register(&mut self, def: MacroDef) -> QasmResult<()> {
        if builtin_gate(&def.name).is_some() || self.macros.contains_key(&def.name) {
            return Err(QasmError::DuplicateDeclaration(def.name));
        }
        let self_reference = def.body.iter().any(|stmt| {
            matches!(stmt, GateStatement::Call(call) if call.name == def.name)
        });
        if self_reference {
            return Err(QasmError::RecursiveMacro(def.name));
        }
        tracing::debug!(name = %def.name, params = def.params.len(), qudits = def.qudits.len(), "registered gate macro");
        self.macros.insert(def.name.clone(), def);
        Ok(())
    }

    /// Look up a declared macro.
    pub fn get(&self, name: &str) -> Option<&MacroDef> {
        self.macros.get(name)
    }
}

/// Source lookup for `include` statements.
pub trait IncludeResolver {
    /// Return the source text behind an include path.
    fn resolve(&self, path: &str) -> QasmResult<String>;
}

/// Resolver that reads include paths from the filesystem, relative to an
/// optional base directory.
#[derive(Debug, Default)]
pub struct FileResolver {
    base: Option<PathBuf>,
}

impl FileResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve paths relative to `base` instead of the working directory.
    pub fn with_base(base: impl Into<PathBuf>) -> Self {
        Self {
            base: Some(base.into()),
        }
    }
}

impl IncludeResolver for FileResolver {
    fn resolve(&self, path: &str) -> QasmResult<String> {
        let full = match &self.base {
            Some(base) => base.join(path),
            None => PathBuf::from(path),
        };
        std::fs::read_to_string(&full).map_err(|e| QasmError::IncludeError {
            path: path.to_string(),
            message: e.to_string(),
        })
    }
}

/// In-memory resolver, mainly for tests.
#[derive(Debug, Default)]
pub struct MapResolver {
    files: FxHashMap<String, String>,
}

impl MapResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an include path with its source text.
    pub fn insert(&mut self, path: impl Into<String>, source: impl Into<String>) {
        self.files.insert(path.into(), source.into());
    }
}

impl IncludeResolver for MapResolver {
    fn resolve(&self, path: &str) -> QasmResult<String> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| QasmError::IncludeError {
                path: path.to_string(),
                message: "no such include".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup() {
        assert_eq!(builtin_gate("U"), Some(PrimitiveGate::U3));
        assert_eq!(builtin_gate("CX"), Some(PrimitiveGate::CX));
        assert_eq!(builtin_gate("cx"), Some(PrimitiveGate::CX));
        assert_eq!(builtin_gate("ccx"), Some(PrimitiveGate::CCX));
        assert!(builtin_gate("gate_x").is_none());
    }

    #[test]
    fn test_duplicate_registration() {
        let mut registry = MacroRegistry::new();
        let def = MacroDef {
            name: "gate_x".to_string(),
            params: vec![],
            qudits: vec!["q0".to_string()],
            body: vec![],
        };
        registry.register(def.clone()).unwrap();
        assert!(matches!(
            registry.register(def),
            Err(QasmError::DuplicateDeclaration(_))
        ));
    }

    #[test]
    fn test_builtin_shadowing_rejected() {
        let mut registry = MacroRegistry::new();
        let def = MacroDef {
            name: "h".to_string(),
            params: vec![],
            qudits: vec!["q0".to_string()],
            body: vec![],
        };
        assert!(matches!(
            registry.register(def),
            Err(QasmError::DuplicateDeclaration(_))
        ));
    }

    #[test]
    fn test_self_reference_rejected() {
        use crate::ast::{GateCall, RegRef};

        let mut registry = MacroRegistry::new();
        let def = MacroDef {
            name: "loop_x".to_string(),
            params: vec![],
            qudits: vec!["q0".to_string()],
            body: vec![GateStatement::Call(GateCall {
                name: "loop_x".to_string(),
                params: vec![],
                args: vec![RegRef::whole("q0")],
            })],
        };
        assert!(matches!(
            registry.register(def),
            Err(QasmError::RecursiveMacro(_))
        ));
    }

    #[test]
    fn test_map_resolver() {
        let mut resolver = MapResolver::new();
        resolver.insert("test.inc", "gate test(p) q { u1(p) q; }");
        assert!(resolver.resolve("test.inc").is_ok());
        assert!(matches!(
            resolver.resolve("other.inc"),
            Err(QasmError::IncludeError { .. })
        ));
    }
}
