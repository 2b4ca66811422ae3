//! Program Port - front-end contract
//!
//! The symbolic engine never parses bytecode. It asks a [`ProgramModel`] for
//! method bodies and for the library/phantom status of callees.
//!
//! # Architecture
//! ```text
//! ┌──────────────────────┐
//! │ Engine / Traverser   │
//! └──────────┬───────────┘
//!            │ depends on
//!            ▼
//! ┌──────────────────────┐
//! │ ProgramModel (trait) │ ◄── body(method), is_library(method)
//! └──────────┬───────────┘
//!            │ implemented by
//!            ▼
//! ┌──────────────────────┐
//! │ - Program (in-memory,│
//! │   JSON via serde)    │
//! │ - bytecode front-ends│
//! └──────────────────────┘
//! ```

use std::path::Path;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::shared::models::{MethodBody, MethodRef};

/// Front-end abstraction over the analyzed program
pub trait ProgramModel {
    /// Body of a concrete method, `None` for abstract/native/unknown methods
    fn body(&self, method: &MethodRef) -> Option<Arc<MethodBody>>;

    /// Whether the method belongs to a library or phantom class
    ///
    /// Library methods are never entered; calls to them are mocked.
    fn is_library(&self, method: &MethodRef) -> bool;
}

/// In-memory program
#[derive(Debug, Clone, Default)]
pub struct Program {
    methods: FxHashMap<MethodRef, Arc<MethodBody>>,
    library_classes: FxHashSet<String>,
}

/// Serialized program
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgramDocument {
    #[serde(default)]
    pub methods: Vec<MethodBody>,
    #[serde(default)]
    pub library_classes: Vec<String>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_method(mut self, body: MethodBody) -> Self {
        self.add_method(body);
        self
    }

    pub fn add_method(&mut self, body: MethodBody) {
        self.methods.insert(body.method.clone(), Arc::new(body));
    }

    /// Mark every method of `class` as library code
    pub fn add_library_class(&mut self, class: &str) {
        self.library_classes.insert(class.to_string());
    }

    pub fn methods(&self) -> impl Iterator<Item = &MethodRef> {
        self.methods.keys()
    }

    pub fn from_document(document: ProgramDocument) -> Self {
        let mut program = Self::new();
        for body in document.methods {
            program.add_method(body);
        }
        for class in document.library_classes {
            program.add_library_class(&class);
        }
        program
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let document: ProgramDocument = serde_json::from_str(json)?;
        Ok(Self::from_document(document))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Find a method by `Class.name` (first match when overloaded)
    pub fn find_method(&self, qualified_name: &str) -> Option<MethodRef> {
        let mut candidates: Vec<&MethodRef> = self
            .methods
            .keys()
            .filter(|m| m.qualified_name() == qualified_name)
            .collect();
        candidates.sort();
        candidates.first().map(|m| (*m).clone())
    }
}

impl ProgramModel for Program {
    fn body(&self, method: &MethodRef) -> Option<Arc<MethodBody>> {
        self.methods.get(method).cloned()
    }

    fn is_library(&self, method: &MethodRef) -> bool {
        self.library_classes.contains(method.class())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::{Instruction, Type};

    fn body(class: &str, name: &str) -> MethodBody {
        MethodBody::new(
            MethodRef::new(class, name, vec![], Type::Void),
            vec![],
            vec![Instruction::ReturnVoid],
        )
        .unwrap()
    }

    #[test]
    fn test_lookup_and_library_status() {
        let mut program = Program::new().with_method(body("app.Main", "run"));
        program.add_library_class("java.util.List");

        let run = MethodRef::new("app.Main", "run", vec![], Type::Void);
        let size = MethodRef::new("java.util.List", "size", vec![], Type::Int);

        assert!(program.body(&run).is_some());
        assert!(program.body(&size).is_none());
        assert!(!program.is_library(&run));
        assert!(program.is_library(&size));
        assert_eq!(program.find_method("app.Main.run"), Some(run));
    }

    #[test]
    fn test_from_json() {
        let json = r#"{
            "methods": [{
                "method": {"class": "A", "name": "f"},
                "instructions": [{"op": "return_void"}]
            }],
            "library_classes": ["lib.X"]
        }"#;
        let program = Program::from_json(json).unwrap();
        let f = MethodRef::new("A", "f", vec![], Type::Void);
        assert!(program.body(&f).is_some());
        assert!(program.is_library(&MethodRef::new("lib.X", "g", vec![], Type::Void)));
    }
}
