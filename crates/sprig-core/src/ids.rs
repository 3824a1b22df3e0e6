//! Index identifiers for module-owned IR entities.
//!
//! Every entity a module owns is addressed by a small copyable index.
//! Indices are only meaningful within the module (or, for blocks and locals,
//! the function) that produced them.

use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            /// Create an identifier from a raw index.
            #[inline]
            pub const fn new(index: u32) -> Self {
                Self(index)
            }

            /// Get the underlying index.
            #[inline]
            pub const fn index(self) -> u32 {
                self.0
            }

            /// The index as a `usize`, for slice access.
            #[inline]
            pub const fn as_usize(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }

        impl From<u32> for $name {
            fn from(index: u32) -> Self {
                Self::new(index)
            }
        }

        impl From<$name> for u32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(
    /// A function defined in a module.
    FunctionId,
    "fn_"
);

define_id!(
    /// A basic block, indexed within its owning function.
    BlockId,
    "bb_"
);

define_id!(
    /// An external (declared, not defined) routine.
    ExternId,
    "extern_"
);

define_id!(
    /// A global string constant.
    GlobalId,
    "global_"
);

define_id!(
    /// An entry in the module's integer constant pool.
    ConstantId,
    "const_"
);

define_id!(
    /// A function-local SSA value (parameter or instruction result).
    LocalId,
    "local_"
);

/// A block together with the function that owns it.
///
/// This is what the builder hands out and what the emitter's insertion
/// cursor points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockRef {
    /// The owning function.
    pub function: FunctionId,
    /// The block within that function.
    pub block: BlockId,
}

impl BlockRef {
    /// Create a block reference.
    #[inline]
    pub const fn new(function: FunctionId, block: BlockId) -> Self {
        Self { function, block }
    }
}

impl fmt::Display for BlockRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.function, self.block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_creation() {
        let id = FunctionId::new(42);
        assert_eq!(id.index(), 42);
        assert_eq!(id.as_usize(), 42);
    }

    #[test]
    fn id_display() {
        assert_eq!(format!("{}", BlockId::new(3)), "bb_3");
        assert_eq!(format!("{}", LocalId::new(0)), "local_0");
        assert_eq!(
            format!("{}", BlockRef::new(FunctionId::new(1), BlockId::new(2))),
            "fn_1/bb_2"
        );
    }

    #[test]
    fn id_conversions() {
        let id: ExternId = 7.into();
        let raw: u32 = id.into();
        assert_eq!(raw, 7);
    }
}
