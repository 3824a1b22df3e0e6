//! Typed value handles.

use crate::{ConstantId, GlobalId, LocalId, TypeHash};

/// What a [`Value`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// An integer literal in the module constant pool.
    Constant(ConstantId),
    /// The address of a global string constant.
    Global(GlobalId),
    /// A function parameter or instruction result.
    Local(LocalId),
}

/// A typed handle to a constant or an instruction result.
///
/// Values are immutable once produced and cheap to copy. The type travels
/// with the handle so operand checks never need a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Value {
    kind: ValueKind,
    ty: TypeHash,
}

impl Value {
    /// Handle to a pooled integer constant.
    #[inline]
    pub const fn constant(id: ConstantId, ty: TypeHash) -> Self {
        Self {
            kind: ValueKind::Constant(id),
            ty,
        }
    }

    /// Handle to a global string's address.
    #[inline]
    pub const fn global(id: GlobalId, ty: TypeHash) -> Self {
        Self {
            kind: ValueKind::Global(id),
            ty,
        }
    }

    /// Handle to a function-local SSA value.
    #[inline]
    pub const fn local(id: LocalId, ty: TypeHash) -> Self {
        Self {
            kind: ValueKind::Local(id),
            ty,
        }
    }

    /// What this value refers to.
    #[inline]
    pub const fn kind(&self) -> ValueKind {
        self.kind
    }

    /// The value's type.
    #[inline]
    pub const fn ty(&self) -> TypeHash {
        self.ty
    }

    /// The local id, if this is a parameter or instruction result.
    #[inline]
    pub const fn as_local(&self) -> Option<LocalId> {
        match self.kind {
            ValueKind::Local(id) => Some(id),
            _ => None,
        }
    }
}
