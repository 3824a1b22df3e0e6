//! Type registry, constant pool and module builder for sprig.
//!
//! - [`TypeRegistry`]: canonical, structurally-identified types
//! - [`ConstantPool`]: deduplicated integer literals
//! - [`Module`]: functions, blocks, global strings and external declarations
//!   under one symbol namespace

mod constants;
mod module;
mod types;

pub use constants::ConstantPool;
pub use module::{Module, Symbol};
pub use types::TypeRegistry;
