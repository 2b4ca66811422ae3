//! Shared models: the instruction-level program representation

pub mod instruction;
pub mod method;
pub mod types;

pub use instruction::{
    BinaryOp, Constant, IdentitySource, Immediate, InstrId, Instruction, InvokeExpr, InvokeKind,
    Local, Place, Rvalue, SwitchTable,
};
pub use method::MethodBody;
pub use types::{FieldRef, MethodRef, MethodSignature, Type};
