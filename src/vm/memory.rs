//! Interpreter memory.
//!
//! Global strings are laid out back to back in one byte arena starting at
//! [`GLOBAL_BASE`]. Address `0` is never mapped, so it can serve as null.

use sprig_core::{GlobalId, GlobalString};
use sprig_modules::MemoryView;

/// Address of the first global byte.
pub const GLOBAL_BASE: u64 = 0x1000;

/// Flat byte arena holding the module's globals.
#[derive(Debug, Clone, Default)]
pub struct Memory {
    bytes: Vec<u8>,
    addresses: Vec<u64>,
}

impl Memory {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Lay out `globals` in order, each at the next free address.
    pub fn layout(globals: &[GlobalString]) -> Self {
        let mut memory = Self::new();
        for global in globals {
            memory
                .addresses
                .push(GLOBAL_BASE + memory.bytes.len() as u64);
            memory.bytes.extend_from_slice(&global.bytes);
        }
        memory
    }

    /// Address of a global's first byte.
    pub fn address_of(&self, id: GlobalId) -> Option<u64> {
        self.addresses.get(id.as_usize()).copied()
    }

    /// Read-only view for host routines.
    pub fn view(&self) -> MemoryView<'_> {
        MemoryView::new(GLOBAL_BASE, &self.bytes)
    }

    /// Bytes in use.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Check if nothing is mapped.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
