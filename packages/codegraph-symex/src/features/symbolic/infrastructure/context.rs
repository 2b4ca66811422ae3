//! Per-analysis symbolic context
//!
//! Owns everything that must stay consistent across all states of one
//! analysis: the type registry and the fresh-name counters. One context is
//! created per `Engine::analyze` call and threaded through every SVM.

use super::type_registry::TypeRegistry;

#[derive(Debug, Default)]
pub struct SymbolicContext {
    types: TypeRegistry,
    locals: u64,
    unbounded: u64,
}

impl SymbolicContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    pub fn types_mut(&mut self) -> &mut TypeRegistry {
        &mut self.types
    }

    /// `local_<n>`, for fresh values of locals, fields and mocked results
    pub fn fresh_local_name(&mut self) -> String {
        let name = format!("local_{}", self.locals);
        self.locals += 1;
        name
    }

    /// `unbounded_<n>`, for string and class literals
    pub fn fresh_unbounded_name(&mut self) -> String {
        let name = format!("unbounded_{}", self.unbounded);
        self.unbounded += 1;
        name
    }

    /// Number of fresh constants minted so far
    pub fn fresh_count(&self) -> u64 {
        self.locals + self.unbounded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_names_never_repeat() {
        let mut context = SymbolicContext::new();
        assert_eq!(context.fresh_local_name(), "local_0");
        assert_eq!(context.fresh_local_name(), "local_1");
        assert_eq!(context.fresh_unbounded_name(), "unbounded_0");
        assert_eq!(context.fresh_count(), 3);
    }

    #[test]
    fn test_contexts_are_independent() {
        let mut first = SymbolicContext::new();
        let mut second = SymbolicContext::new();
        first.fresh_local_name();
        assert_eq!(second.fresh_local_name(), "local_0");
    }
}
