//! Unified error types for sprig.
//!
//! Each pipeline stage has its own error type; [`SprigError`] wraps them all
//! for callers that drive the whole pipeline.
//!
//! ## Error Hierarchy
//!
//! ```text
//! SprigError (top-level wrapper)
//! ├── RegistrationError - module construction (symbols, blocks, types, constants)
//! ├── EmitError         - instruction emission misuse
//! ├── VerifyError       - verifier gate failure
//! ├── SerializeError    - writing the textual IR artifact
//! └── EngineError       - building, finalizing and running the interpreter
//! ```
//!
//! Nothing here is recoverable mid-pipeline: every error halts the
//! remaining stages.

use std::path::PathBuf;

use thiserror::Error;

use crate::{BlockRef, Diagnostic, FunctionId};

// ============================================================================
// Registration Errors
// ============================================================================

/// Errors raised while populating a module.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// A symbol with this name already exists in the module.
    #[error("duplicate symbol: @{name} is already defined")]
    DuplicateSymbol { name: String },

    /// A block or value with this name already exists in the function.
    #[error("duplicate label '{label}' in function @{function}")]
    DuplicateLabel { function: String, label: String },

    /// An external was re-declared with a different signature.
    #[error("signature conflict for @{name}: declared as {existing}, requested {requested}")]
    SignatureConflict {
        name: String,
        existing: String,
        requested: String,
    },

    /// A global constant with this name already exists.
    #[error("duplicate global name: @{name}")]
    DuplicateGlobal { name: String },

    /// The requested type is not valid in this position.
    #[error("invalid type: {0}")]
    InvalidType(String),

    /// A name that must be non-empty was empty, or otherwise unusable.
    #[error("invalid name: {0}")]
    InvalidName(String),

    /// The function id does not belong to this module.
    #[error("unknown function: {0}")]
    UnknownFunction(FunctionId),

    /// A type hash was used that the module's registry never produced.
    #[error("unregistered type: {0}")]
    UnknownType(String),
}

// ============================================================================
// Emission Errors
// ============================================================================

/// Errors raised by the instruction emitter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmitError {
    /// The call's fixed arguments don't match the callee's parameter count.
    #[error("arity mismatch calling @{callee}: expected {expected} argument(s), got {actual}")]
    ArityMismatch {
        callee: String,
        expected: String,
        actual: usize,
    },

    /// An operand has the wrong type.
    #[error("type mismatch in {context}: expected {expected}, got {actual}")]
    TypeMismatch {
        context: String,
        expected: String,
        actual: String,
    },

    /// The block already ends in a terminator.
    #[error("block '{label}' ({block}) is already terminated")]
    BlockAlreadyTerminated { block: BlockRef, label: String },

    /// No insertion point has been set.
    #[error("no insertion point set")]
    NoInsertionPoint,

    /// A branch target belongs to a different function.
    #[error("branch target {target} is not in the current function")]
    ForeignBlock { target: BlockRef },

    /// The cursor or an operand refers to something the module doesn't have.
    #[error(transparent)]
    Registration(#[from] RegistrationError),
}

// ============================================================================
// Verification Errors
// ============================================================================

/// The verifier gate rejected the module.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    /// Verification failed; the diagnostic carries the messages.
    #[error("verification failed:\n{0}")]
    VerificationFailed(Diagnostic),
}

impl VerifyError {
    /// The diagnostic that caused the failure.
    pub fn diagnostic(&self) -> &Diagnostic {
        match self {
            VerifyError::VerificationFailed(d) => d,
        }
    }
}

// ============================================================================
// Serialization Errors
// ============================================================================

/// Errors writing the textual IR artifact.
#[derive(Debug, Error)]
pub enum SerializeError {
    /// The file could not be created or written.
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ============================================================================
// Host Errors
// ============================================================================

/// Errors raised by host routines called from interpreted code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// A pointer argument does not point into interpreter memory.
    #[error("invalid memory access at address {address:#x}")]
    InvalidPointer { address: u64 },

    /// A string argument has no NUL terminator before the end of memory.
    #[error("unterminated string at address {address:#x}")]
    UnterminatedString { address: u64 },

    /// An argument the routine needs was not passed.
    #[error("missing argument {index}")]
    MissingArgument { index: usize },

    /// An argument has the wrong shape for the routine.
    #[error("argument {index}: expected {expected}, got {actual}")]
    BadArgument {
        index: usize,
        expected: String,
        actual: String,
    },

    /// A format string could not be applied.
    #[error("format error: {0}")]
    Format(String),

    /// Writing program output failed.
    #[error("output error: {0}")]
    Output(String),
}

// ============================================================================
// Engine Errors
// ============================================================================

/// Errors building, finalizing or running the execution engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The engine could not be constructed for this module.
    #[error("failed to build execution engine: {message}")]
    Build { message: String },

    /// An external declaration has no host implementation.
    #[error("unresolved external symbol: @{name}")]
    UnresolvedSymbol { name: String },

    /// Execution trapped.
    #[error("runtime trap in @{function}: {message}")]
    RuntimeTrap { function: String, message: String },

    /// The arguments passed to `run_function` don't fit the signature.
    #[error("invalid arguments for @{function}: {message}")]
    InvalidArguments { function: String, message: String },

    /// The requested function does not exist in the engine's module.
    #[error("no function named @{name}")]
    UnknownFunction { name: String },

    /// The operation is not allowed in the engine's current state.
    #[error("cannot {operation} while engine is {state}")]
    InvalidState {
        operation: &'static str,
        state: String,
    },
}

// ============================================================================
// Top-level Error
// ============================================================================

/// Any sprig pipeline error.
#[derive(Debug, Error)]
pub enum SprigError {
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error(transparent)]
    Emit(#[from] EmitError),

    #[error(transparent)]
    Verify(#[from] VerifyError),

    #[error(transparent)]
    Serialize(#[from] SerializeError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BlockId, DiagnosticMessage, VerifyCheck};

    #[test]
    fn registration_messages() {
        let err = RegistrationError::DuplicateSymbol {
            name: "main".into(),
        };
        assert_eq!(err.to_string(), "duplicate symbol: @main is already defined");

        let err = RegistrationError::SignatureConflict {
            name: "printf".into(),
            existing: "i32 (i8*, ...)".into(),
            requested: "void (i8*, ...)".into(),
        };
        assert!(err.to_string().contains("i32 (i8*, ...)"));
    }

    #[test]
    fn emit_wraps_registration() {
        let err: EmitError = RegistrationError::UnknownFunction(FunctionId::new(9)).into();
        assert_eq!(err.to_string(), "unknown function: fn_9");
    }

    #[test]
    fn block_terminated_message() {
        let err = EmitError::BlockAlreadyTerminated {
            block: BlockRef::new(FunctionId::new(0), BlockId::new(0)),
            label: "entry".into(),
        };
        assert_eq!(err.to_string(), "block 'entry' (fn_0/bb_0) is already terminated");
    }

    #[test]
    fn verify_error_carries_diagnostic() {
        let diag = Diagnostic::failed(vec![DiagnosticMessage::new(
            VerifyCheck::EntryPoint,
            "missing",
        )]);
        let err = VerifyError::VerificationFailed(diag.clone());
        assert_eq!(err.diagnostic(), &diag);
        assert!(err.to_string().starts_with("verification failed:"));
    }

    #[test]
    fn serialize_error_has_source() {
        use std::error::Error as _;
        let err = SerializeError::Io {
            path: PathBuf::from("/nope/test.ll"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such directory"),
        };
        assert!(err.to_string().contains("/nope/test.ll"));
        assert!(err.source().is_some());
    }

    #[test]
    fn top_level_conversion() {
        let err: SprigError = EngineError::UnresolvedSymbol {
            name: "printf".into(),
        }
        .into();
        assert!(matches!(err, SprigError::Engine(_)));
        assert_eq!(err.to_string(), "unresolved external symbol: @printf");
    }
}
