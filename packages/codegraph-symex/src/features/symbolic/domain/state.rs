//! Symbolic state: path condition, memory and the allocation counter

use imbl::Vector;

use super::memory::{Memory, MemoryUpdate};
use crate::features::smt::Expr;

/// First address handed to `new` objects; 0 is `null`
pub const FIRST_ADDRESS: u32 = 1;

#[derive(Debug, Clone, PartialEq)]
pub enum SymbolicStateUpdate {
    /// Conjoin a boolean constraint to the path condition
    Constraint(Expr),

    Memory(MemoryUpdate),

    /// Addresses below `next_address` are taken
    Allocate { next_address: u32 },
}

#[derive(Debug, Clone)]
pub struct SymbolicState {
    constraints: Vector<Expr>,
    memory: Memory,
    next_address: u32,
}

impl Default for SymbolicState {
    fn default() -> Self {
        Self {
            constraints: Vector::new(),
            memory: Memory::new(),
            next_address: FIRST_ADDRESS,
        }
    }
}

impl SymbolicState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(constraints: Vector<Expr>, memory: Memory, next_address: u32) -> Self {
        Self {
            constraints,
            memory,
            next_address: next_address.max(FIRST_ADDRESS),
        }
    }

    pub fn constraints(&self) -> &Vector<Expr> {
        &self.constraints
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Next unused object address
    pub fn next_address(&self) -> u32 {
        self.next_address
    }

    /// Conjunction of all constraints
    pub fn path_condition(&self) -> Expr {
        Expr::and_all(self.constraints.iter().cloned())
    }

    pub fn with_memory(&self, memory: Memory) -> Self {
        Self {
            constraints: self.constraints.clone(),
            memory,
            next_address: self.next_address,
        }
    }

    pub fn update(&self, update: &SymbolicStateUpdate) -> Self {
        match update {
            SymbolicStateUpdate::Constraint(constraint) => {
                let mut constraints = self.constraints.clone();
                constraints.push_back(constraint.clone());
                Self {
                    constraints,
                    memory: self.memory.clone(),
                    next_address: self.next_address,
                }
            }
            SymbolicStateUpdate::Memory(update) => self.with_memory(self.memory.update(update)),
            SymbolicStateUpdate::Allocate { next_address } => Self {
                constraints: self.constraints.clone(),
                memory: self.memory.clone(),
                next_address: self.next_address.max(*next_address),
            },
        }
    }

    pub fn apply_all<'a>(&self, updates: impl IntoIterator<Item = &'a SymbolicStateUpdate>) -> Self {
        updates
            .into_iter()
            .fold(self.clone(), |state, update| state.update(update))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::smt::Sort;

    #[test]
    fn test_default_state() {
        let state = SymbolicState::new();
        assert!(state.constraints().is_empty());
        assert_eq!(state.next_address(), FIRST_ADDRESS);
        assert!(state.path_condition().is_true());
    }

    #[test]
    fn test_constraints_accumulate_in_order() {
        let x = Expr::var("x", Sort::BitVec(32));
        let c1 = x.bv_sgt(&Expr::bv(0, 32));
        let c2 = x.bv_slt(&Expr::bv(9, 32));
        let state = SymbolicState::new().apply_all(&[
            SymbolicStateUpdate::Constraint(c1.clone()),
            SymbolicStateUpdate::Constraint(c2.clone()),
        ]);
        let constraints: Vec<&Expr> = state.constraints().iter().collect();
        assert_eq!(constraints, vec![&c1, &c2]);
        assert_eq!(state.path_condition(), c1.and(&c2));
    }

    #[test]
    fn test_allocation_counter_is_monotone() {
        let state = SymbolicState::new()
            .update(&SymbolicStateUpdate::Allocate { next_address: 5 })
            .update(&SymbolicStateUpdate::Allocate { next_address: 3 });
        assert_eq!(state.next_address(), 5);
    }
}
