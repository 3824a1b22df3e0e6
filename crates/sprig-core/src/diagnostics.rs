//! Structured verifier output.
//!
//! A [`Diagnostic`] is the verifier's verdict on a function or module: a
//! pass/fail flag plus an ordered list of messages. It never refers back into
//! the module, so it can be kept, printed or returned after the module has
//! moved on.
//!
//! # Examples
//!
//! ```
//! use sprig_core::{Diagnostic, DiagnosticMessage, VerifyCheck};
//!
//! let ok = Diagnostic::passed();
//! assert!(ok.is_passed());
//!
//! let failed = Diagnostic::failed(vec![
//!     DiagnosticMessage::new(VerifyCheck::Terminators, "block does not end in a terminator")
//!         .in_function("main")
//!         .in_block("entrypoint"),
//! ]);
//! assert!(!failed.is_passed());
//! assert_eq!(
//!     failed.to_string(),
//!     "error[terminators] @main/entrypoint: block does not end in a terminator\n"
//! );
//! ```

use std::fmt;

use crate::VerifyError;

/// The verifier checks, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VerifyCheck {
    /// Every block ends in exactly one terminator.
    Terminators,
    /// Operand and result types match each instruction's signature.
    OperandTypes,
    /// Call targets exist and call sites agree with their signatures.
    CallSites,
    /// Every value is defined before it is used.
    Dominance,
    /// The designated entry function exists with the entry signature.
    EntryPoint,
}

impl VerifyCheck {
    /// Short name used in printed diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            VerifyCheck::Terminators => "terminators",
            VerifyCheck::OperandTypes => "operand-types",
            VerifyCheck::CallSites => "call-sites",
            VerifyCheck::Dominance => "dominance",
            VerifyCheck::EntryPoint => "entry-point",
        }
    }
}

impl fmt::Display for VerifyCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One verifier finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticMessage {
    /// The check that produced this message.
    pub check: VerifyCheck,
    /// Function the finding is in, if any.
    pub function: Option<String>,
    /// Block the finding is in, if any.
    pub block: Option<String>,
    /// Human-readable description.
    pub message: String,
}

impl DiagnosticMessage {
    /// Create a message not tied to a function.
    pub fn new(check: VerifyCheck, message: impl Into<String>) -> Self {
        Self {
            check,
            function: None,
            block: None,
            message: message.into(),
        }
    }

    /// Attach the function name.
    pub fn in_function(mut self, name: impl Into<String>) -> Self {
        self.function = Some(name.into());
        self
    }

    /// Attach the block label.
    pub fn in_block(mut self, label: impl Into<String>) -> Self {
        self.block = Some(label.into());
        self
    }
}

impl fmt::Display for DiagnosticMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error[{}]", self.check)?;
        match (&self.function, &self.block) {
            (Some(func), Some(block)) => write!(f, " @{}/{}", func, block)?,
            (Some(func), None) => write!(f, " @{}", func)?,
            (None, Some(block)) => write!(f, " {}", block)?,
            (None, None) => {}
        }
        write!(f, ": {}", self.message)
    }
}

/// Pass/fail outcome of verification plus its messages.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Diagnostic {
    failed: bool,
    messages: Vec<DiagnosticMessage>,
}

impl Diagnostic {
    /// A passing diagnostic with no messages.
    pub fn passed() -> Self {
        Self::default()
    }

    /// A failing diagnostic. An empty message list still counts as failed.
    pub fn failed(messages: Vec<DiagnosticMessage>) -> Self {
        Self {
            failed: true,
            messages,
        }
    }

    /// Whether verification passed.
    pub fn is_passed(&self) -> bool {
        !self.failed
    }

    /// Messages, in the order they were found.
    pub fn messages(&self) -> &[DiagnosticMessage] {
        &self.messages
    }

    /// The check that failed, if any.
    pub fn failed_check(&self) -> Option<VerifyCheck> {
        if self.failed {
            self.messages.first().map(|m| m.check)
        } else {
            None
        }
    }

    /// Convert into a `Result`, turning failure into
    /// [`VerifyError::VerificationFailed`].
    pub fn into_result(self) -> Result<(), VerifyError> {
        if self.failed {
            Err(VerifyError::VerificationFailed(self))
        } else {
            Ok(())
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.failed && self.messages.is_empty() {
            return writeln!(f, "error: verification failed");
        }
        for message in &self.messages {
            writeln!(f, "{}", message)?;
        }
        Ok(())
    }
}
