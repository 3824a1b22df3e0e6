//! Integer constant pool.
//!
//! Integer literals are stored once per module and shared by every
//! instruction that uses them.

use rustc_hash::FxHashMap;

use sprig_core::{ConstantId, IntConstant};

/// Module-level constant pool with deduplication.
#[derive(Debug, Clone, Default)]
pub struct ConstantPool {
    constants: Vec<IntConstant>,
    index: FxHashMap<IntConstant, ConstantId>,
}

impl ConstantPool {
    /// Create a new empty constant pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or get an existing constant.
    ///
    /// Identical type + bit pattern returns the same id.
    pub fn add(&mut self, constant: IntConstant) -> ConstantId {
        if let Some(&id) = self.index.get(&constant) {
            return id;
        }

        let id = ConstantId::new(self.constants.len() as u32);
        self.constants.push(constant);
        self.index.insert(constant, id);
        id
    }

    /// Get a constant by id.
    pub fn get(&self, id: ConstantId) -> Option<&IntConstant> {
        self.constants.get(id.as_usize())
    }

    /// All constants, in insertion order.
    pub fn constants(&self) -> &[IntConstant] {
        &self.constants
    }

    /// Number of constants.
    pub fn len(&self) -> usize {
        self.constants.len()
    }

    /// Check if the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sprig_core::primitives;

    fn i32c(value: u64) -> IntConstant {
        IntConstant {
            ty: primitives::I32,
            bits: 32,
            value,
        }
    }

    #[test]
    fn new_pool_is_empty() {
        let pool = ConstantPool::new();
        assert!(pool.is_empty());
        assert_eq!(pool.len(), 0);
    }

    #[test]
    fn deduplication() {
        let mut pool = ConstantPool::new();
        let a = pool.add(i32c(100));
        let b = pool.add(i32c(200));
        let c = pool.add(i32c(100));
        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn same_bits_different_type() {
        let mut pool = ConstantPool::new();
        let a = pool.add(i32c(1));
        let b = pool.add(IntConstant {
            ty: primitives::I8,
            bits: 8,
            value: 1,
        });
        assert_ne!(a, b);
    }

    #[test]
    fn get_out_of_bounds() {
        let pool = ConstantPool::new();
        assert_eq!(pool.get(ConstantId::new(0)), None);
    }
}
