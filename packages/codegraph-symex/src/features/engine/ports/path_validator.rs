//! Path validation port
//!
//! Callers holding only a taint path (no explicit entry method) validate it
//! through this trait. The analysis is rooted at the method of the first
//! taint-path entry.

use crate::features::engine::application::Engine;
use crate::features::interprocedural::TaintPath;
use crate::shared::ports::ProgramModel;

pub trait PathValidator {
    /// Whether `taint_path` may be reachable
    fn validate_path(&mut self, program: &dyn ProgramModel, taint_path: &TaintPath) -> bool;
}

impl PathValidator for Engine {
    fn validate_path(&mut self, program: &dyn ProgramModel, taint_path: &TaintPath) -> bool {
        let method = taint_path.first().method.clone();
        self.analyze(program, &method, taint_path).reachable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::features::interprocedural::TaintPathEntry;
    use crate::shared::models::{InstrId, Instruction, MethodBody, MethodRef, Type};
    use crate::shared::ports::Program;

    #[test]
    fn test_rooted_at_first_entry() {
        let method = MethodRef::new("A", "run", vec![], Type::Void);
        let program = Program::new().with_method(
            MethodBody::new(
                method.clone(),
                vec![],
                vec![Instruction::Nop, Instruction::ReturnVoid],
            )
            .unwrap(),
        );
        let taint_path = TaintPath::new(vec![TaintPathEntry::sink(method, InstrId(1))]).unwrap();
        let mut engine = Engine::new(EngineConfig::default()).unwrap();
        assert!(engine.validate_path(&program, &taint_path));
    }
}
