//! Module-level entities other than functions: global strings, external
//! declarations and integer constants.

use bitflags::bitflags;

use crate::{Linkage, Signature, TypeHash};

bitflags! {
    /// Attributes of a global variable.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct GlobalFlags: u8 {
        /// The global is immutable.
        const CONSTANT = 1 << 0;
        /// The address of the global is not significant.
        const UNNAMED_ADDR = 1 << 1;
    }
}

/// A NUL-terminated global string constant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalString {
    pub name: String,
    /// Contents including the trailing NUL byte.
    pub bytes: Vec<u8>,
    /// The `[N x i8]` storage type.
    pub ty: TypeHash,
    pub linkage: Linkage,
    pub flags: GlobalFlags,
}

impl GlobalString {
    /// Contents without the trailing NUL.
    pub fn text(&self) -> &[u8] {
        self.bytes.strip_suffix(&[0]).unwrap_or(&self.bytes)
    }
}

/// A routine declared in the module but resolved by the host at run time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalDecl {
    pub name: String,
    pub signature: Signature,
}

impl ExternalDecl {
    /// Signature identity, used for idempotent re-declaration.
    pub fn hash(&self) -> TypeHash {
        self.signature.hash()
    }
}

/// A pooled integer literal, already truncated to its type's width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntConstant {
    pub ty: TypeHash,
    pub bits: u32,
    /// Zero-extended bit pattern.
    pub value: u64,
}

impl IntConstant {
    /// The value interpreted as signed.
    pub fn as_signed(&self) -> i64 {
        crate::generic_value::sign_extend(self.value, self.bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives;

    #[test]
    fn global_text_strips_nul() {
        let g = GlobalString {
            name: "s".into(),
            bytes: b"hi\0".to_vec(),
            ty: primitives::I8,
            linkage: Linkage::Private,
            flags: GlobalFlags::CONSTANT | GlobalFlags::UNNAMED_ADDR,
        };
        assert_eq!(g.text(), b"hi");
        assert!(g.flags.contains(GlobalFlags::CONSTANT));
    }

    #[test]
    fn constant_sign() {
        let c = IntConstant {
            ty: primitives::I8,
            bits: 8,
            value: 0xff,
        };
        assert_eq!(c.as_signed(), -1);
    }
}
