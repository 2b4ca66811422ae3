//! Method bodies with their unexceptional control-flow successors

use serde::{Deserialize, Serialize};

use super::instruction::{InstrId, Instruction, Local};
use super::types::MethodRef;
use crate::errors::{Result, SymexError};

/// Instruction list of one method plus its control-flow edges
///
/// Vertex order is instruction order, so the entry vertex comes first.
/// Successor lists keep fall-through first, then branch targets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodBody {
    pub method: MethodRef,
    pub locals: Vec<Local>,
    pub instructions: Vec<Instruction>,
    successors: Vec<Vec<InstrId>>,
}

/// Serialized form, successors optional
#[derive(Debug, Clone, Deserialize)]
struct RawMethodBody {
    method: MethodRef,
    #[serde(default)]
    locals: Vec<Local>,
    instructions: Vec<Instruction>,
    #[serde(default)]
    successors: Option<Vec<Vec<InstrId>>>,
}

impl<'de> Deserialize<'de> for MethodBody {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawMethodBody::deserialize(deserializer)?;
        let body = match raw.successors {
            Some(successors) => {
                MethodBody::with_successors(raw.method, raw.locals, raw.instructions, successors)
            }
            None => MethodBody::new(raw.method, raw.locals, raw.instructions),
        };
        body.map_err(serde::de::Error::custom)
    }
}

impl MethodBody {
    /// Build a body, deriving successors from the instructions
    pub fn new(
        method: MethodRef,
        locals: Vec<Local>,
        instructions: Vec<Instruction>,
    ) -> Result<Self> {
        let successors = derive_successors(&instructions);
        Self::with_successors(method, locals, instructions, successors)
    }

    /// Build a body with successors supplied by the front-end
    pub fn with_successors(
        method: MethodRef,
        locals: Vec<Local>,
        instructions: Vec<Instruction>,
        successors: Vec<Vec<InstrId>>,
    ) -> Result<Self> {
        if instructions.is_empty() {
            return Err(SymexError::graph(format!("{} has an empty body", method)));
        }
        if successors.len() != instructions.len() {
            return Err(SymexError::graph(format!(
                "{}: {} successor lists for {} instructions",
                method,
                successors.len(),
                instructions.len()
            )));
        }
        let len = instructions.len();
        if let Some(bad) = successors.iter().flatten().find(|id| id.index() >= len) {
            return Err(SymexError::graph(format!(
                "{}: edge to {} out of bounds",
                method, bad
            )));
        }

        Ok(Self {
            method,
            locals,
            instructions,
            successors,
        })
    }

    pub fn entry(&self) -> InstrId {
        InstrId(0)
    }

    /// All vertices, entry first
    pub fn vertices(&self) -> impl Iterator<Item = InstrId> + '_ {
        (0..self.instructions.len() as u32).map(InstrId)
    }

    pub fn instruction(&self, id: InstrId) -> Option<&Instruction> {
        self.instructions.get(id.index())
    }

    pub fn successors(&self, id: InstrId) -> &[InstrId] {
        self.successors
            .get(id.index())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

fn derive_successors(instructions: &[Instruction]) -> Vec<Vec<InstrId>> {
    let len = instructions.len() as u32;
    instructions
        .iter()
        .enumerate()
        .map(|(idx, instr)| {
            let next = idx as u32 + 1;
            let mut succs = Vec::new();
            let mut push = |id: InstrId| {
                if !succs.contains(&id) {
                    succs.push(id);
                }
            };
            match instr {
                Instruction::Return { .. } | Instruction::ReturnVoid | Instruction::Throw { .. } => {}
                Instruction::Goto { target } => push(*target),
                Instruction::If { target, .. } => {
                    if next < len {
                        push(InstrId(next));
                    }
                    push(*target);
                }
                Instruction::Switch { table, default, .. } => {
                    for target in table.targets() {
                        push(*target);
                    }
                    push(*default);
                }
                _ => {
                    if next < len {
                        push(InstrId(next));
                    }
                }
            }
            succs
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::{BinaryOp, Immediate, Rvalue, SwitchTable, Type};

    fn method() -> MethodRef {
        MethodRef::new("T", "m", vec![], Type::Void)
    }

    #[test]
    fn test_derived_successors() {
        let body = MethodBody::new(
            method(),
            vec![],
            vec![
                Instruction::If {
                    condition: Rvalue::Binary {
                        op: BinaryOp::Eq,
                        lhs: Immediate::int(1),
                        rhs: Immediate::int(1),
                        ty: Type::Boolean,
                    },
                    target: InstrId(3),
                },
                Instruction::Goto { target: InstrId(0) },
                Instruction::Switch {
                    key: Immediate::int(0),
                    table: SwitchTable::Lookup {
                        values: vec![1, 2],
                        targets: vec![InstrId(3), InstrId(3)],
                    },
                    default: InstrId(0),
                },
                Instruction::ReturnVoid,
            ],
        )
        .unwrap();

        assert_eq!(body.successors(InstrId(0)), &[InstrId(1), InstrId(3)]);
        assert_eq!(body.successors(InstrId(1)), &[InstrId(0)]);
        assert_eq!(body.successors(InstrId(2)), &[InstrId(3), InstrId(0)]);
        assert!(body.successors(InstrId(3)).is_empty());
        assert_eq!(body.vertices().count(), 4);
    }

    #[test]
    fn test_rejects_out_of_bounds_edges() {
        let result = MethodBody::with_successors(
            method(),
            vec![],
            vec![Instruction::Nop],
            vec![vec![InstrId(7)]],
        );
        assert!(result.is_err());
        assert!(MethodBody::new(method(), vec![], vec![]).is_err());
    }

    #[test]
    fn test_deserialize_without_successors() {
        let json = r#"{
            "method": {"class": "T", "name": "m", "params": [], "ret": "void"},
            "instructions": [{"op": "nop"}, {"op": "return_void"}]
        }"#;
        let body: MethodBody = serde_json::from_str(json).unwrap();
        assert_eq!(body.successors(InstrId(0)), &[InstrId(1)]);
    }
}
