//! Symbolic memory: locals plus one heap array per field
//!
//! Both maps are persistent, so cloning a [`Memory`] is O(1) and every update
//! returns a new version that shares structure with the old one.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use imbl::OrdMap;

use super::value::{address_sort, sort_of, LocalId, SymbolicValue};
use crate::features::smt::{Expr, Sort};
use crate::shared::models::{FieldRef, MethodRef, Type};

/// One field across all objects: address → field value
///
/// Identity is (declaring class, field name); the type only picks the
/// element sort.
#[derive(Debug, Clone)]
pub struct ChunkDescriptor {
    pub class: Arc<str>,
    pub field: Arc<str>,
    pub ty: Type,
}

impl ChunkDescriptor {
    pub fn new(field: &FieldRef) -> Self {
        Self {
            class: Arc::from(field.class.as_str()),
            field: Arc::from(field.name.as_str()),
            ty: field.ty.clone(),
        }
    }

    /// Name of the array constant holding the initial heap for this field
    ///
    /// The class name is length-prefixed so distinct (class, field) pairs
    /// never share a name.
    pub fn id(&self) -> String {
        format!("{}:{}.{}", self.class.len(), self.class, self.field)
    }

    pub fn sort(&self) -> Sort {
        Sort::array(address_sort(), sort_of(&self.ty))
    }

    /// Array before any store: a free constant shared by every state
    pub fn default_array(&self) -> Expr {
        Expr::var(&self.id(), self.sort())
    }
}

impl PartialEq for ChunkDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.class == other.class && self.field == other.field
    }
}

impl Eq for ChunkDescriptor {}

impl Hash for ChunkDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.class.hash(state);
        self.field.hash(state);
    }
}

impl PartialOrd for ChunkDescriptor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ChunkDescriptor {
    fn cmp(&self, other: &Self) -> Ordering {
        (&self.class, &self.field).cmp(&(&other.class, &other.field))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MemoryUpdate {
    /// Bind or rebind a local
    Local { id: LocalId, value: SymbolicValue },

    /// `array[index] = value` on a field array
    ArrayStore {
        chunk: ChunkDescriptor,
        index: Expr,
        value: Expr,
    },

    /// Replace a whole field array
    ArraySet { chunk: ChunkDescriptor, array: Expr },
}

#[derive(Debug, Clone, Default)]
pub struct Memory {
    locals: OrdMap<LocalId, SymbolicValue>,
    fields: OrdMap<ChunkDescriptor, Expr>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(
        locals: OrdMap<LocalId, SymbolicValue>,
        fields: OrdMap<ChunkDescriptor, Expr>,
    ) -> Self {
        Self { locals, fields }
    }

    pub fn locals(&self) -> &OrdMap<LocalId, SymbolicValue> {
        &self.locals
    }

    pub fn fields(&self) -> &OrdMap<ChunkDescriptor, Expr> {
        &self.fields
    }

    pub fn local(&self, id: &LocalId) -> Option<&SymbolicValue> {
        self.locals.get(id)
    }

    /// Current array of a field, the default array when never written
    pub fn field_array(&self, chunk: &ChunkDescriptor) -> Expr {
        self.fields
            .get(chunk)
            .cloned()
            .unwrap_or_else(|| chunk.default_array())
    }

    pub fn update(&self, update: &MemoryUpdate) -> Self {
        match update {
            MemoryUpdate::Local { id, value } => Self {
                locals: self.locals.update(id.clone(), value.clone()),
                fields: self.fields.clone(),
            },
            MemoryUpdate::ArrayStore {
                chunk,
                index,
                value,
            } => {
                let array = self.field_array(chunk).store(index, value);
                Self {
                    locals: self.locals.clone(),
                    fields: self.fields.update(chunk.clone(), array),
                }
            }
            MemoryUpdate::ArraySet { chunk, array } => Self {
                locals: self.locals.clone(),
                fields: self.fields.update(chunk.clone(), array.clone()),
            },
        }
    }

    /// Drop every local owned by `method`
    pub fn without_locals_of(&self, method: &MethodRef) -> Self {
        let locals = self
            .locals
            .iter()
            .filter(|(id, _)| &id.method != method)
            .map(|(id, value)| (id.clone(), value.clone()))
            .collect();
        Self {
            locals,
            fields: self.fields.clone(),
        }
    }

    /// Bind several locals at once
    pub fn with_locals(&self, bindings: impl IntoIterator<Item = (LocalId, SymbolicValue)>) -> Self {
        let mut locals = self.locals.clone();
        for (id, value) in bindings {
            locals.insert(id, value);
        }
        Self {
            locals,
            fields: self.fields.clone(),
        }
    }
}
