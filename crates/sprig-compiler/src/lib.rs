//! sprig compiler: building, checking and printing IR.
//!
//! ## Modules
//!
//! - [`emit`]: the [`InstructionEmitter`] cursor that appends typed instructions
//! - [`verify`]: structural checks producing a [`Diagnostic`](sprig_core::Diagnostic)
//! - [`print`]: the [`AsmWriter`] textual form and [`write_to_file`]

pub mod emit;
pub mod print;
pub mod verify;

pub use emit::InstructionEmitter;
pub use print::{AsmWriter, write_to_file};
pub use verify::{verify_function, verify_module};
