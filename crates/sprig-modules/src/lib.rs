//! Host symbol library for the sprig interpreter.
//!
//! External declarations in a module are resolved by name against a
//! [`HostSymbols`] table when the execution engine is finalized.
//!
//! - **host** - [`HostFn`], [`HostCall`], [`MemoryView`] and the [`HostSymbols`] table
//! - **stdio** - `printf`, `puts` and `putchar`
//!
//! # Usage
//!
//! ```
//! use sprig_core::GenericValue;
//! use sprig_modules::HostSymbols;
//!
//! let mut symbols = HostSymbols::standard();
//! symbols.insert("answer", |_call| Ok(GenericValue::i32(42)));
//! assert!(symbols.contains("printf"));
//! assert!(symbols.contains("answer"));
//! ```

mod format;
pub mod host;
pub mod stdio;

pub use host::{HostCall, HostFn, HostSymbols, MemoryView};
