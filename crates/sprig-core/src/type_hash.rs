//! Deterministic hash-based type identity.
//!
//! [`TypeHash`] is a 64-bit hash of a type's canonical spelling (`i32`, `i8*`,
//! `[18 x i8]`). Because the spelling is derived from the structure of the
//! type, two requests for the same structure always produce the same hash:
//! type identity is structural.
//!
//! # Examples
//!
//! ```
//! use sprig_core::{TypeHash, primitives};
//!
//! let a = TypeHash::from_name("i32");
//! let b = TypeHash::from_name("i32");
//! assert_eq!(a, b);
//! assert_eq!(a, primitives::I32);
//!
//! // Signature hashes include parameter order and variadic-ness.
//! let fixed = TypeHash::from_signature(primitives::I32, &[primitives::I8_PTR], false);
//! let vararg = TypeHash::from_signature(primitives::I32, &[primitives::I8_PTR], true);
//! assert_ne!(fixed, vararg);
//! ```

use std::fmt;
use xxhash_rust::const_xxh64::xxh64 as const_xxh64;

/// Domain-specific mixing constants for hash computation.
pub mod hash_constants {
    /// Separator constant used when folding components together.
    pub const SEP: u64 = 0x4bc94d6bd06053ad;

    /// Domain marker for type hashes.
    pub const TYPE: u64 = 0x2fac10b63a6cc57c;

    /// Domain marker for function signature hashes.
    pub const SIGNATURE: u64 = 0x5ea77ffbcdf5f302;

    /// Mixed into a signature hash when the signature is variadic.
    pub const VARIADIC: u64 = 0x7d3c8b4a92e15f6d;

    /// Parameter position mixing constants.
    /// Each parameter position gets a unique constant so parameter order matters.
    pub const PARAM_MARKERS: [u64; 16] = [
        0x9e3779b97f4a7c15,
        0xbf58476d1ce4e5b9,
        0x94d049bb133111eb,
        0xd6e8feb86659fd93,
        0xe7037ed1a0b428db,
        0xc6a4a7935bd1e995,
        0x8648dbbc94d49b8d,
        0xa2b48b2c69e0d657,
        0x7c3e9f2a5b8d1403,
        0x5d8c7b4a3e9f2106,
        0x3f1e9d8c7b5a4203,
        0x1a2b3c4d5e6f7089,
        0x9f8e7d6c5b4a3210,
        0x2468ace013579bdf,
        0xfdb97531eca86420,
        0x123456789abcdef0,
    ];
}

/// A deterministic 64-bit hash identifying a type or a function signature.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TypeHash(pub u64);

impl TypeHash {
    /// Empty/invalid hash constant.
    pub const EMPTY: TypeHash = TypeHash(0);

    /// Create a type hash from a canonical type spelling.
    ///
    /// This is a `const fn` so well-known primitives can be computed at
    /// compile time (see [`primitives`]).
    #[inline]
    pub const fn from_name(name: &str) -> Self {
        TypeHash(hash_constants::TYPE ^ const_xxh64(name.as_bytes(), 0))
    }

    /// Create a signature hash from return type, parameter types and
    /// variadic-ness.
    pub fn from_signature(ret: TypeHash, params: &[TypeHash], variadic: bool) -> Self {
        let mut hash = hash_constants::SIGNATURE ^ ret.0;
        for (i, param) in params.iter().enumerate() {
            let marker = hash_constants::PARAM_MARKERS
                .get(i)
                .copied()
                .unwrap_or_else(|| hash_constants::PARAM_MARKERS[0].wrapping_add(i as u64));
            // wrapping_mul keeps the fold order-sensitive, unlike XOR
            hash = hash
                .wrapping_mul(hash_constants::SEP)
                .wrapping_add(marker ^ param.0);
        }
        if variadic {
            hash ^= hash_constants::VARIADIC;
        }
        TypeHash(hash)
    }

    /// Check if this is the empty hash.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHash({:#018x})", self.0)
    }
}

impl fmt::Display for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

/// Well-known hashes for the primitive types the pipeline uses.
pub mod primitives {
    use super::TypeHash;

    /// `void`
    pub const VOID: TypeHash = TypeHash::from_name("void");

    /// `i1`
    pub const I1: TypeHash = TypeHash::from_name("i1");

    /// `i8`
    pub const I8: TypeHash = TypeHash::from_name("i8");

    /// `i16`
    pub const I16: TypeHash = TypeHash::from_name("i16");

    /// `i32`
    pub const I32: TypeHash = TypeHash::from_name("i32");

    /// `i64`
    pub const I64: TypeHash = TypeHash::from_name("i64");

    /// `i8*`, the C string pointer type.
    pub const I8_PTR: TypeHash = TypeHash::from_name("i8*");
}
