//! sprig core data model.
//!
//! This crate defines the IR every other sprig crate works on:
//!
//! - [`TypeHash`] / [`TypeKind`] / [`TypeEntry`]: structural type identity
//! - [`Value`]: typed handles to constants and instruction results
//! - [`Instruction`], [`BasicBlock`], [`Function`]: the code itself
//! - [`GlobalString`], [`ExternalDecl`], [`IntConstant`]: module-level entities
//! - [`GenericValue`]: run-time values returned by the interpreter
//! - [`Diagnostic`]: structured verifier output
//! - [`error`]: the error hierarchy for every pipeline stage

pub mod diagnostics;
pub mod error;
pub mod function;
pub mod generic_value;
pub mod global;
pub mod ids;
pub mod instruction;
pub mod type_hash;
pub mod types;
pub mod value;

pub use diagnostics::{Diagnostic, DiagnosticMessage, VerifyCheck};
pub use error::{
    EmitError, EngineError, HostError, RegistrationError, SerializeError, SprigError, VerifyError,
};
pub use function::{BasicBlock, Function, Linkage, LocalDef, LocalValue, Signature};
pub use generic_value::GenericValue;
pub use global::{ExternalDecl, GlobalFlags, GlobalString, IntConstant};
pub use ids::{BlockId, BlockRef, ConstantId, ExternId, FunctionId, GlobalId, LocalId};
pub use instruction::{BinaryOp, Instruction};
pub use type_hash::{TypeHash, primitives};
pub use types::{MAX_INT_BITS, TypeEntry, TypeKind};
pub use value::{Value, ValueKind};
