//! sprig: build a typed SSA module in memory, verify it, write it out as
//! text and run it in an interpreter.
//!
//! The workspace crates cover the front half of the pipeline:
//!
//! - [`sprig_core`]: the IR data model and error types
//! - [`sprig_registry`]: types, constants and the [`Module`](sprig_registry::Module) builder
//! - [`sprig_compiler`]: the instruction emitter, verifier and textual writer
//! - [`sprig_modules`]: host routines such as `printf`
//!
//! This crate adds the execution engine ([`vm`]) and the driver
//! ([`pipeline`]) that ties the stages together.

pub mod config;
pub mod pipeline;
pub mod programs;
pub mod vm;

pub use config::PipelineConfig;
pub use pipeline::{Pipeline, PipelineError, RunReport};
pub use vm::{EngineBuilder, EngineKind, EngineState, ExecutionEngine};

pub use sprig_compiler::{AsmWriter, InstructionEmitter, verify_function, verify_module};
pub use sprig_core::{Diagnostic, GenericValue, SprigError};
pub use sprig_registry::Module;
