//! Symbolic Execution Domain
//!
//! Values, memory and the symbolic virtual machine that builds them.
//!
//! ## Architecture
//!
//! ```text
//! symbolic
//! ├── domain/               # Persistent data
//! │   ├── value             # SymbolicValue, LocalId, sort mapping
//! │   ├── memory            # Locals + per-field heap arrays
//! │   └── state             # Path condition + memory + address counter
//! └── infrastructure/
//!     ├── context           # Per-analysis fresh names + type registry
//!     ├── type_registry     # Reference type tags
//!     ├── conversions       # Sort alignment and casts
//!     ├── operators         # Binary/unary operator dispatch
//!     └── svm               # Symbolic virtual machine
//! ```
//!
//! ## Usage
//!
//! ```text
//! let mut context = SymbolicContext::new();
//! let state = SymbolicState::new();
//! let mut svm = SymbolicVirtualMachine::new(&mut context, &state);
//!
//! let x = svm.create_const(&Type::Int);
//! let sum = svm.binary(BinaryOp::Add, &x, &SymbolicValue::int(1), &Type::Int)?;
//! let updates = svm.collect_updates();
//! let state = state.apply_all(&updates);
//! ```

pub mod domain;
pub mod infrastructure;

pub use domain::{
    ChunkDescriptor, LocalId, Memory, MemoryUpdate, SymbolicState, SymbolicStateUpdate,
    SymbolicValue,
};
pub use infrastructure::{SymbolicContext, SymbolicVirtualMachine, TypeRegistry};
