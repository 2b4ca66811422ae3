//! Execution-state merger
//!
//! Two states reaching the same node are joined into one. Every location
//! whose values differ becomes `ite(pc_previous, previous, incoming)`; the
//! path condition becomes `pc_previous OR pc_incoming`. Values only one side
//! knows are paired with a fresh value of the declared type, so the merge never
//! constrains a side beyond its own path condition.
//!
//! ```text
//! locals:   union of ids, ite per differing id
//! fields:   union of chunks, ite per differing array
//! path:     common prefix + convergence node
//! stack:    previous state's
//! counts:   pointwise max
//! ```

use std::collections::BTreeSet;

use imbl::{OrdMap, Vector};
use tracing::debug;

use crate::errors::Result;
use crate::features::execution::domain::ExecutionState;
use crate::features::interprocedural::Path;
use crate::features::smt::Expr;
use crate::features::symbolic::infrastructure::ite_expr;
use crate::features::symbolic::{
    ChunkDescriptor, LocalId, Memory, SymbolicContext, SymbolicState, SymbolicValue,
    SymbolicVirtualMachine,
};
use crate::shared::models::MethodRef;

pub struct ExecutionStateMerger<'c> {
    context: &'c mut SymbolicContext,
}

impl<'c> ExecutionStateMerger<'c> {
    pub fn new(context: &'c mut SymbolicContext) -> Self {
        Self { context }
    }

    /// Join `previous` (already stored at the node) with `incoming`
    pub fn merge(
        &mut self,
        previous: &ExecutionState,
        incoming: &ExecutionState,
    ) -> Result<ExecutionState> {
        let path = Path::merge(previous.path(), incoming.path())?;

        let lhs = previous.symbolic_state();
        let rhs = incoming.symbolic_state();
        let pc_lhs = lhs.path_condition();
        let pc_rhs = rhs.path_condition();

        let mut svm = SymbolicVirtualMachine::new(self.context, rhs);
        let locals = merge_locals(&mut svm, &pc_lhs, lhs.memory(), rhs.memory())?;
        let fields = merge_fields(&pc_lhs, lhs.memory(), rhs.memory())?;
        let fresh = svm.collect_updates();

        let symbolic = SymbolicState::from_parts(
            Vector::unit(pc_lhs.or(&pc_rhs)),
            Memory::from_parts(locals, fields),
            lhs.next_address().max(rhs.next_address()),
        )
        .apply_all(&fresh);

        let times_merged = previous.times_merged() + incoming.times_merged() + 1;
        debug!(
            "Merged states at {} ({} merges, path length {})",
            path.last(),
            times_merged,
            path.len()
        );
        Ok(ExecutionState::from_parts(
            path,
            previous.stack().clone(),
            symbolic,
            times_merged,
            max_counts(previous.call_counts(), incoming.call_counts()),
        ))
    }
}

fn merge_locals(
    svm: &mut SymbolicVirtualMachine<'_>,
    condition: &Expr,
    lhs: &Memory,
    rhs: &Memory,
) -> Result<OrdMap<LocalId, SymbolicValue>> {
    let ids: BTreeSet<&LocalId> = lhs.locals().keys().chain(rhs.locals().keys()).collect();
    let mut merged = OrdMap::new();
    for id in ids {
        let value = match (lhs.local(id), rhs.local(id)) {
            (Some(l), Some(r)) if l == r => l.clone(),
            (l, r) => {
                let l = l.cloned().unwrap_or_else(|| svm.create_const(&id.ty));
                let r = r.cloned().unwrap_or_else(|| svm.create_const(&id.ty));
                svm.ite(condition, &l, &r)?
            }
        };
        merged.insert(id.clone(), value);
    }
    Ok(merged)
}

fn merge_fields(
    condition: &Expr,
    lhs: &Memory,
    rhs: &Memory,
) -> Result<OrdMap<ChunkDescriptor, Expr>> {
    let chunks: BTreeSet<&ChunkDescriptor> =
        lhs.fields().keys().chain(rhs.fields().keys()).collect();
    let mut merged = OrdMap::new();
    for chunk in chunks {
        let l = lhs.field_array(chunk);
        let r = rhs.field_array(chunk);
        let array = if l == r { l } else { ite_expr(condition, &l, &r)? };
        merged.insert(chunk.clone(), array);
    }
    Ok(merged)
}

fn max_counts(
    lhs: &OrdMap<MethodRef, u32>,
    rhs: &OrdMap<MethodRef, u32>,
) -> OrdMap<MethodRef, u32> {
    rhs.iter().fold(lhs.clone(), |counts, (method, &count)| {
        let current = counts.get(method).copied().unwrap_or(0);
        counts.update(method.clone(), current.max(count))
    })
}
