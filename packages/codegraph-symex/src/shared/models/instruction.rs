//! Three-address instruction IR
//!
//! The front-end lowers each method to a flat list of [`Instruction`]s. Operands
//! are immediates (locals or constants); compound expressions only appear on
//! the right-hand side of an assignment or as a branch condition.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::types::{FieldRef, MethodRef, Type};

/// Index of an instruction inside its method body
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct InstrId(pub u32);

impl InstrId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for InstrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Method-local variable
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Local {
    pub name: String,
    pub ty: Type,
}

impl Local {
    pub fn new(name: &str, ty: Type) -> Self {
        Self {
            name: name.to_string(),
            ty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Constant {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Null,
    String(String),
    /// Class literal (`Foo.class`)
    Class(String),
}

impl Constant {
    pub fn ty(&self) -> Type {
        match self {
            Constant::Int(_) => Type::Int,
            Constant::Long(_) => Type::Long,
            Constant::Float(_) => Type::Float,
            Constant::Double(_) => Type::Double,
            Constant::Null => Type::Null,
            Constant::String(_) => Type::string(),
            Constant::Class(_) => Type::class("java.lang.Class"),
        }
    }
}

/// Local or constant operand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Immediate {
    Local(Local),
    Constant(Constant),
}

impl Immediate {
    pub fn local(name: &str, ty: Type) -> Self {
        Immediate::Local(Local::new(name, ty))
    }

    pub fn int(value: i32) -> Self {
        Immediate::Constant(Constant::Int(value))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    Ushr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// Three-way compare of longs
    Cmp,
    /// Three-way compare of floats, NaN compares less
    Cmpl,
    /// Three-way compare of floats, NaN compares greater
    Cmpg,
}

impl BinaryOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvokeKind {
    Virtual,
    Special,
    Interface,
    Static,
    Dynamic,
}

impl InvokeKind {
    /// Whether the receiver is passed as the first argument
    pub fn has_receiver(self) -> bool {
        matches!(
            self,
            InvokeKind::Virtual | InvokeKind::Special | InvokeKind::Interface
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvokeExpr {
    pub kind: InvokeKind,
    pub method: MethodRef,
    #[serde(default)]
    pub base: Option<Local>,
    #[serde(default)]
    pub args: Vec<Immediate>,
}

/// Right-hand side of an assignment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rvalue {
    Use {
        value: Immediate,
    },
    Binary {
        op: BinaryOp,
        lhs: Immediate,
        rhs: Immediate,
        /// Result type
        ty: Type,
    },
    Neg {
        value: Immediate,
    },
    Cast {
        value: Immediate,
        to: Type,
    },
    InstanceOf {
        value: Immediate,
        check: Type,
    },
    New {
        ty: Type,
    },
    NewArray {
        element: Type,
        size: Immediate,
    },
    Length {
        array: Immediate,
    },
    InstanceField {
        base: Local,
        field: FieldRef,
    },
    StaticField {
        field: FieldRef,
    },
    ArrayElement {
        base: Local,
        index: Immediate,
        ty: Type,
    },
    Invoke {
        invoke: InvokeExpr,
    },
}

/// Assignable location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Place {
    Local { local: Local },
    InstanceField { base: Local, field: FieldRef },
    StaticField { field: FieldRef },
    ArrayElement { base: Local, index: Immediate },
}

/// What an identity instruction binds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentitySource {
    This,
    Parameter(usize),
    CaughtException,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SwitchTable {
    /// Dense cases `low..=high`, `targets[i]` for key `low + i`
    Table {
        low: i32,
        high: i32,
        targets: Vec<InstrId>,
    },
    /// Sparse cases, `targets[i]` for key `values[i]`
    Lookup {
        values: Vec<i32>,
        targets: Vec<InstrId>,
    },
}

impl SwitchTable {
    pub fn targets(&self) -> &[InstrId] {
        match self {
            SwitchTable::Table { targets, .. } | SwitchTable::Lookup { targets, .. } => targets,
        }
    }
}

/// Instruction kinds, matched exhaustively by the transfer function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Instruction {
    Assign {
        place: Place,
        value: Rvalue,
    },
    Identity {
        local: Local,
        source: IdentitySource,
    },
    If {
        condition: Rvalue,
        target: InstrId,
    },
    Switch {
        key: Immediate,
        table: SwitchTable,
        default: InstrId,
    },
    Invoke {
        invoke: InvokeExpr,
    },
    Return {
        value: Immediate,
    },
    ReturnVoid,
    Throw {
        value: Immediate,
    },
    Goto {
        target: InstrId,
    },
    Nop,
    Monitor {
        enter: bool,
        value: Immediate,
    },
}

impl Instruction {
    /// Whether control never falls through to the next instruction
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            Instruction::Return { .. }
                | Instruction::ReturnVoid
                | Instruction::Throw { .. }
                | Instruction::Goto { .. }
                | Instruction::Switch { .. }
        )
    }

    /// Invoke expression if this instruction performs a call
    pub fn invoke(&self) -> Option<&InvokeExpr> {
        match self {
            Instruction::Invoke { invoke }
            | Instruction::Assign {
                value: Rvalue::Invoke { invoke },
                ..
            } => Some(invoke),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instruction_json_shape() {
        let instr = Instruction::If {
            condition: Rvalue::Binary {
                op: BinaryOp::Gt,
                lhs: Immediate::local("x", Type::Int),
                rhs: Immediate::int(0),
                ty: Type::Boolean,
            },
            target: InstrId(4),
        };
        let json = serde_json::to_value(&instr).unwrap();
        assert_eq!(json["op"], "if");
        assert_eq!(json["target"], 4);
        assert_eq!(json["condition"]["kind"], "binary");

        let back: Instruction = serde_json::from_value(json).unwrap();
        assert_eq!(back, instr);
    }

    #[test]
    fn test_invoke_lookup() {
        let invoke = InvokeExpr {
            kind: InvokeKind::Static,
            method: MethodRef::new("A", "f", vec![], Type::Int),
            base: None,
            args: vec![],
        };
        let assign = Instruction::Assign {
            place: Place::Local {
                local: Local::new("r", Type::Int),
            },
            value: Rvalue::Invoke {
                invoke: invoke.clone(),
            },
        };
        assert_eq!(assign.invoke(), Some(&invoke));
        assert_eq!(Instruction::Nop.invoke(), None);
        assert!(InvokeKind::Interface.has_receiver());
        assert!(!InvokeKind::Dynamic.has_receiver());
    }
}
