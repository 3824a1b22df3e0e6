//! Type descriptors.
//!
//! A type is referred to everywhere by its [`TypeHash`]. The structure behind
//! a hash lives in a [`TypeEntry`], owned by the module's type registry.

use std::fmt;

use crate::TypeHash;

/// Largest integer width the IR accepts.
pub const MAX_INT_BITS: u32 = (1 << 23) - 1;

/// The structure of a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// No value.
    Void,
    /// Fixed-width two's-complement integer.
    Int { bits: u32 },
    /// Pointer to a value of the pointee type.
    Pointer { pointee: TypeHash },
    /// Fixed-length array, used for global string storage.
    Array { element: TypeHash, len: u64 },
}

impl TypeKind {
    /// Check if this is `void`.
    #[inline]
    pub fn is_void(&self) -> bool {
        matches!(self, TypeKind::Void)
    }

    /// Check if this is an integer type.
    #[inline]
    pub fn is_int(&self) -> bool {
        matches!(self, TypeKind::Int { .. })
    }

    /// Check if this is a pointer type.
    #[inline]
    pub fn is_pointer(&self) -> bool {
        matches!(self, TypeKind::Pointer { .. })
    }

    /// Width in bits, for integer types.
    #[inline]
    pub fn int_bits(&self) -> Option<u32> {
        match self {
            TypeKind::Int { bits } => Some(*bits),
            _ => None,
        }
    }

    /// Whether values of this type can be passed, returned and held in SSA
    /// locals.
    #[inline]
    pub fn is_first_class(&self) -> bool {
        matches!(self, TypeKind::Int { .. } | TypeKind::Pointer { .. })
    }
}

/// A registered type: its hash, structure and canonical spelling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeEntry {
    /// Structural identity.
    pub hash: TypeHash,
    /// Structure.
    pub kind: TypeKind,
    /// Canonical textual spelling, e.g. `i8*`.
    pub name: String,
}

impl TypeEntry {
    /// Create a type entry. The hash is derived from `name`.
    pub fn new(kind: TypeKind, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            hash: TypeHash::from_name(&name),
            kind,
            name,
        }
    }
}

impl fmt::Display for TypeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
