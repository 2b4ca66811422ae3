//! Reference type tags
//!
//! Every reference type gets a stable integer id (from 1, in first-use order).
//! The dynamic type of an address is `addrToTypeId[addr]`, a free array shared
//! by all states of one analysis. There is no subtype enumeration: a value of
//! static type `T` is constrained to tag `id(T)` exactly, or to be `null`.

use rustc_hash::FxHashMap;

use crate::features::smt::{Expr, Sort};
use crate::features::symbolic::domain::{address_sort, null_address, ADDRESS_WIDTH};
use crate::shared::models::Type;

/// Name of the address → type id array
pub const TYPE_TAG_ARRAY: &str = "addrToTypeId";

/// Width of type ids
const TYPE_ID_WIDTH: u32 = 32;

#[derive(Debug, Clone)]
pub struct TypeRegistry {
    ids: FxHashMap<Type, u32>,
    next_id: u32,
    tags: Expr,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self {
            ids: FxHashMap::default(),
            next_id: 1,
            tags: Expr::var(
                TYPE_TAG_ARRAY,
                Sort::array(address_sort(), Sort::BitVec(TYPE_ID_WIDTH)),
            ),
        }
    }

    /// Id of `ty`, assigned on first use
    pub fn type_id(&mut self, ty: &Type) -> u32 {
        if let Some(id) = self.ids.get(ty) {
            return *id;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.ids.insert(ty.clone(), id);
        id
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Symbolic type id of `addr`
    pub fn type_tag(&self, addr: &Expr) -> Expr {
        self.tags.select(addr)
    }

    /// `addr` is a non-null object of exactly `ty`
    pub fn type_constraint(&mut self, addr: &Expr, ty: &Type) -> Expr {
        let id = Expr::bv(self.type_id(ty) as i64, TYPE_ID_WIDTH);
        self.type_tag(addr)
            .equals(&id)
            .and(&self.is_not_null_constraint(addr))
    }

    /// `addr` has type `ty` or is `null`
    pub fn type_or_null_constraint(&mut self, addr: &Expr, ty: &Type) -> Expr {
        self.type_constraint(addr, ty)
            .or(&self.is_null_constraint(addr))
    }

    pub fn is_null_constraint(&self, addr: &Expr) -> Expr {
        debug_assert_eq!(addr.sort().bv_width(), Some(ADDRESS_WIDTH));
        addr.equals(&null_address())
    }

    pub fn is_not_null_constraint(&self, addr: &Expr) -> Expr {
        self.is_null_constraint(addr).not()
    }
}
