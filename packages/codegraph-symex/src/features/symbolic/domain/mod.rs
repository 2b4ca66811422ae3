//! Symbolic domain models

pub mod memory;
pub mod state;
pub mod value;

pub use memory::{ChunkDescriptor, Memory, MemoryUpdate};
pub use state::{SymbolicState, SymbolicStateUpdate, FIRST_ADDRESS};
pub use value::{
    address_sort, null_address, sort_of, LocalId, PrimitiveValue, ReferenceKind, ReferenceValue,
    SymbolicValue, ADDRESS_WIDTH, NULL_ADDRESS,
};
