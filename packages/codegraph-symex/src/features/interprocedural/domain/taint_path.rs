//! Taint paths
//!
//! A taint path is the ordered list of program points a confirmation query
//! must visit, ending at the sink. Each entry names the instruction, its
//! method and the role the front-end assigned to it. `return` entries may carry
//! the call site that returns into, which is what lets execution leave a
//! method whose caller was never entered.
//!
//! ```text
//! [
//!   {"kind": "entry_point", "method": {...}, "instr": 0},
//!   {"kind": "return", "method": {...}, "instr": 7,
//!    "call_site": 3, "call_method": {...}},
//!   {"kind": "sink", "method": {...}, "instr": 5}
//! ]
//! ```

use std::path::Path as FsPath;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SymexError};
use crate::shared::models::{InstrId, MethodRef};

/// Role of a taint-path entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaintPathKind {
    Assign,
    EntryPoint,
    InCall,
    InOutCall,
    OutCall,
    Read,
    Return,
    Sink,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaintPathEntry {
    pub kind: TaintPathKind,
    pub method: MethodRef,
    pub instr: InstrId,
    /// Call site returned into (`return` entries only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_site: Option<InstrId>,
    /// Method owning `call_site`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_method: Option<MethodRef>,
}

impl TaintPathEntry {
    pub fn new(kind: TaintPathKind, method: MethodRef, instr: InstrId) -> Self {
        Self {
            kind,
            method,
            instr,
            call_site: None,
            call_method: None,
        }
    }

    pub fn sink(method: MethodRef, instr: InstrId) -> Self {
        Self::new(TaintPathKind::Sink, method, instr)
    }

    /// `return` entry that resumes at `call_site` in `call_method`
    pub fn returning(
        method: MethodRef,
        instr: InstrId,
        call_site: InstrId,
        call_method: MethodRef,
    ) -> Self {
        Self {
            call_site: Some(call_site),
            call_method: Some(call_method),
            ..Self::new(TaintPathKind::Return, method, instr)
        }
    }

    /// Call-site metadata of a `return` entry
    pub fn return_site(&self) -> Option<(InstrId, &MethodRef)> {
        if self.kind != TaintPathKind::Return {
            return None;
        }
        match (&self.call_site, &self.call_method) {
            (Some(site), Some(method)) => Some((*site, method)),
            _ => None,
        }
    }
}

/// Non-empty ordered taint path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<TaintPathEntry>", into = "Vec<TaintPathEntry>")]
pub struct TaintPath {
    entries: Vec<TaintPathEntry>,
}

impl TaintPath {
    pub fn new(entries: Vec<TaintPathEntry>) -> Result<Self> {
        if entries.is_empty() {
            return Err(SymexError::resolution("taint path is empty"));
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[TaintPathEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn first(&self) -> &TaintPathEntry {
        &self.entries[0]
    }

    /// Final entry; reaching it proves the path
    pub fn sink(&self) -> &TaintPathEntry {
        &self.entries[self.entries.len() - 1]
    }

    /// Whether `(method, instr)` is the sink
    pub fn is_sink(&self, method: &MethodRef, instr: InstrId) -> bool {
        let sink = self.sink();
        sink.instr == instr && &sink.method == method
    }

    /// Instructions of `method` named by the path, in path order
    pub fn key_instructions(&self, method: &MethodRef) -> Vec<InstrId> {
        self.entries
            .iter()
            .filter(|e| &e.method == method)
            .map(|e| e.instr)
            .collect()
    }

    pub fn has_keys(&self, method: &MethodRef) -> bool {
        self.entries.iter().any(|e| &e.method == method)
    }

    /// Entry naming `(method, instr)`; the latest one wins on repeats
    pub fn entry_at(&self, method: &MethodRef, instr: InstrId) -> Option<&TaintPathEntry> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.instr == instr && &e.method == method)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<FsPath>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}

impl TryFrom<Vec<TaintPathEntry>> for TaintPath {
    type Error = String;

    fn try_from(entries: Vec<TaintPathEntry>) -> std::result::Result<Self, Self::Error> {
        TaintPath::new(entries).map_err(|e| e.to_string())
    }
}

impl From<TaintPath> for Vec<TaintPathEntry> {
    fn from(path: TaintPath) -> Self {
        path.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::Type;

    fn method(name: &str) -> MethodRef {
        MethodRef::new("app.Main", name, vec![], Type::Void)
    }

    #[test]
    fn test_keys_grouped_by_method_in_order() {
        let path = TaintPath::new(vec![
            TaintPathEntry::new(TaintPathKind::EntryPoint, method("a"), InstrId(0)),
            TaintPathEntry::new(TaintPathKind::InCall, method("b"), InstrId(4)),
            TaintPathEntry::new(TaintPathKind::Assign, method("a"), InstrId(2)),
            TaintPathEntry::sink(method("a"), InstrId(6)),
        ])
        .unwrap();

        assert_eq!(
            path.key_instructions(&method("a")),
            vec![InstrId(0), InstrId(2), InstrId(6)]
        );
        assert_eq!(path.key_instructions(&method("b")), vec![InstrId(4)]);
        assert!(!path.has_keys(&method("c")));
        assert!(path.is_sink(&method("a"), InstrId(6)));
        assert!(!path.is_sink(&method("b"), InstrId(6)));
    }

    #[test]
    fn test_return_site_requires_both_fields() {
        let full = TaintPathEntry::returning(method("b"), InstrId(3), InstrId(1), method("a"));
        assert_eq!(full.return_site(), Some((InstrId(1), &method("a"))));

        let mut partial = full.clone();
        partial.call_method = None;
        assert_eq!(partial.return_site(), None);

        let not_return = TaintPathEntry::sink(method("b"), InstrId(3));
        assert_eq!(not_return.return_site(), None);
    }

    #[test]
    fn test_json_shape() {
        let json = r#"[
            {"kind": "entry_point", "method": {"class": "A", "name": "f"}, "instr": 0},
            {"kind": "return", "method": {"class": "A", "name": "f"}, "instr": 2,
             "call_site": 5, "call_method": {"class": "A", "name": "g"}},
            {"kind": "sink", "method": {"class": "A", "name": "g"}, "instr": 7}
        ]"#;
        let path = TaintPath::from_json(json).unwrap();
        assert_eq!(path.len(), 3);
        assert_eq!(path.sink().instr, InstrId(7));
        let (site, caller) = path.entries()[1].return_site().unwrap();
        assert_eq!(site, InstrId(5));
        assert_eq!(caller.name(), "g");

        let back = serde_json::to_string(&path).unwrap();
        assert_eq!(TaintPath::from_json(&back).unwrap(), path);
    }

    #[test]
    fn test_empty_path_is_rejected() {
        assert!(TaintPath::from_json("[]").is_err());
        assert!(TaintPath::new(vec![]).is_err());
    }
}
