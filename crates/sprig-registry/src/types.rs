//! TypeRegistry - canonical type storage.
//!
//! Every type used in a module is registered here under its [`TypeHash`].
//! Because hashes are derived from the canonical spelling, asking for the
//! same structure twice returns the same handle.
//!
//! # Example
//!
//! ```
//! use sprig_registry::TypeRegistry;
//! use sprig_core::primitives;
//!
//! let mut types = TypeRegistry::with_primitives();
//! let i32_ty = types.int(32).unwrap();
//! assert_eq!(i32_ty, primitives::I32);
//!
//! let i8_ptr = types.pointer_to(primitives::I8).unwrap();
//! assert_eq!(types.name(i8_ptr), "i8*");
//! ```

use rustc_hash::FxHashMap;

use sprig_core::{
    MAX_INT_BITS, RegistrationError, Signature, TypeEntry, TypeHash, TypeKind, primitives,
};

/// Canonical type storage for one module.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: FxHashMap<TypeHash, TypeEntry>,
}

impl TypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with `void`, the common integer widths and `i8*`
    /// pre-registered.
    pub fn with_primitives() -> Self {
        let mut registry = Self::new();
        registry.register_all_primitives();
        registry
    }

    /// Register `void`, `i1`, `i8`, `i16`, `i32`, `i64` and `i8*`.
    pub fn register_all_primitives(&mut self) {
        self.void();
        for bits in [1, 8, 16, 32, 64] {
            self.intern(TypeKind::Int { bits }, format!("i{bits}"));
        }
        self.intern(
            TypeKind::Pointer {
                pointee: primitives::I8,
            },
            "i8*".to_string(),
        );
    }

    // ==========================================================================
    // Type construction
    // ==========================================================================

    /// The `void` type.
    pub fn void(&mut self) -> TypeHash {
        self.intern(TypeKind::Void, "void".to_string())
    }

    /// An integer type of the given width.
    pub fn int(&mut self, bits: u32) -> Result<TypeHash, RegistrationError> {
        if bits == 0 || bits > MAX_INT_BITS {
            return Err(RegistrationError::InvalidType(format!(
                "integer width {bits} is outside 1..={MAX_INT_BITS}"
            )));
        }
        Ok(self.intern(TypeKind::Int { bits }, format!("i{bits}")))
    }

    /// A pointer to `pointee`.
    pub fn pointer_to(&mut self, pointee: TypeHash) -> Result<TypeHash, RegistrationError> {
        let entry = self.require(pointee)?;
        if entry.kind.is_void() {
            return Err(RegistrationError::InvalidType(
                "pointer to void is not allowed; use i8*".to_string(),
            ));
        }
        let name = format!("{}*", entry.name);
        Ok(self.intern(TypeKind::Pointer { pointee }, name))
    }

    /// A fixed-length array of `element`.
    pub fn array_of(&mut self, element: TypeHash, len: u64) -> Result<TypeHash, RegistrationError> {
        let entry = self.require(element)?;
        if !entry.kind.is_first_class() {
            return Err(RegistrationError::InvalidType(format!(
                "array element type {} is not a first-class type",
                entry.name
            )));
        }
        let name = format!("[{} x {}]", len, entry.name);
        Ok(self.intern(TypeKind::Array { element, len }, name))
    }

    fn intern(&mut self, kind: TypeKind, name: String) -> TypeHash {
        let entry = TypeEntry::new(kind, name);
        let hash = entry.hash;
        self.types.entry(hash).or_insert(entry);
        hash
    }

    fn require(&self, hash: TypeHash) -> Result<&TypeEntry, RegistrationError> {
        self.types
            .get(&hash)
            .ok_or_else(|| RegistrationError::UnknownType(hash.to_string()))
    }

    // ==========================================================================
    // Lookup
    // ==========================================================================

    /// Get a type entry by hash.
    pub fn get(&self, hash: TypeHash) -> Option<&TypeEntry> {
        self.types.get(&hash)
    }

    /// Get a type's structure by hash.
    pub fn kind(&self, hash: TypeHash) -> Option<TypeKind> {
        self.types.get(&hash).map(|e| e.kind)
    }

    /// Check if a type is registered.
    pub fn contains(&self, hash: TypeHash) -> bool {
        self.types.contains_key(&hash)
    }

    /// Canonical spelling, or `<unknown>` for unregistered hashes.
    pub fn name(&self, hash: TypeHash) -> &str {
        self.types
            .get(&hash)
            .map(|e| e.name.as_str())
            .unwrap_or("<unknown>")
    }

    /// Width of an integer type.
    pub fn int_bits(&self, hash: TypeHash) -> Option<u32> {
        self.kind(hash).and_then(|k| k.int_bits())
    }

    /// Ensure a registered type can be used as a parameter or SSA value.
    pub fn require_first_class(&self, hash: TypeHash) -> Result<(), RegistrationError> {
        let entry = self.require(hash)?;
        if entry.kind.is_first_class() {
            Ok(())
        } else {
            Err(RegistrationError::InvalidType(format!(
                "{} cannot be used as a value type",
                entry.name
            )))
        }
    }

    /// Ensure a registered type can be returned from a function.
    pub fn require_return_type(&self, hash: TypeHash) -> Result<(), RegistrationError> {
        let entry = self.require(hash)?;
        if entry.kind.is_void() || entry.kind.is_first_class() {
            Ok(())
        } else {
            Err(RegistrationError::InvalidType(format!(
                "{} cannot be used as a return type",
                entry.name
            )))
        }
    }

    /// Render a signature as a function type, e.g. `i32 (i8*, ...)`.
    pub fn signature_string(&self, sig: &Signature) -> String {
        format!("{} ({})", self.name(sig.ret), self.param_list(sig))
    }

    /// Render a signature's parameter list, e.g. `i8*, ...`.
    pub fn param_list(&self, sig: &Signature) -> String {
        let mut parts: Vec<&str> = sig.params.iter().map(|p| self.name(*p)).collect();
        if sig.variadic {
            parts.push("...");
        }
        parts.join(", ")
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Check if no types are registered.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
