//! Sorts of the solver-facing expression language

use std::fmt;

/// IEEE-754 format (exponent bits, significand bits including the hidden bit)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FloatSort {
    pub exponent: u32,
    pub significand: u32,
}

impl FloatSort {
    pub const F32: FloatSort = FloatSort {
        exponent: 8,
        significand: 24,
    };
    pub const F64: FloatSort = FloatSort {
        exponent: 11,
        significand: 53,
    };

    /// Total bit width
    pub fn width(self) -> u32 {
        self.exponent + self.significand
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Sort {
    Bool,
    BitVec(u32),
    Float(FloatSort),
    Array(Box<Sort>, Box<Sort>),
}

impl Sort {
    pub fn array(index: Sort, element: Sort) -> Self {
        Sort::Array(Box::new(index), Box::new(element))
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Sort::Bool)
    }

    pub fn is_bv(&self) -> bool {
        matches!(self, Sort::BitVec(_))
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Sort::Float(_))
    }

    pub fn bv_width(&self) -> Option<u32> {
        match self {
            Sort::BitVec(w) => Some(*w),
            _ => None,
        }
    }

    pub fn float_sort(&self) -> Option<FloatSort> {
        match self {
            Sort::Float(fs) => Some(*fs),
            _ => None,
        }
    }

    /// Element sort of an array sort
    pub fn element(&self) -> Option<&Sort> {
        match self {
            Sort::Array(_, element) => Some(element),
            _ => None,
        }
    }
}

/// SMT-LIB v2 spelling
impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sort::Bool => write!(f, "Bool"),
            Sort::BitVec(w) => write!(f, "(_ BitVec {})", w),
            Sort::Float(fs) => write!(f, "(_ FloatingPoint {} {})", fs.exponent, fs.significand),
            Sort::Array(index, element) => write!(f, "(Array {} {})", index, element),
        }
    }
}
