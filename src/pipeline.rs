//! Construct, verify, serialize and run.
//!
//! Each stage completes before the next starts, and the first failure stops
//! the rest. The textual IR is rendered (and optionally dumped) before the
//! verification gate; it is written out only after the gate passes. The
//! module moves into the execution engine only after that.

use std::io::Write;

use thiserror::Error;
use tracing::{info, warn};

use sprig_compiler::{AsmWriter, verify_module, write_to_file};
use sprig_core::{
    Diagnostic, DiagnosticMessage, EngineError, GenericValue, SerializeError, SprigError,
    VerifyCheck, VerifyError,
};
use sprig_registry::Module;

use crate::config::PipelineConfig;
use crate::vm::EngineBuilder;

/// A pipeline failure, tagged with the stage it came from.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Building the module failed.
    #[error("construction failed: {0}")]
    Construction(SprigError),

    /// The verifier rejected the module.
    #[error(transparent)]
    Verification(#[from] VerifyError),

    /// The textual IR could not be written.
    #[error(transparent)]
    Io(#[from] SerializeError),

    /// The engine could not be built, finalized or run.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl PipelineError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            PipelineError::Construction(_) => 1,
            PipelineError::Verification(_) => 2,
            PipelineError::Io(_) => 3,
            PipelineError::Engine(_) => 4,
        }
    }
}

impl From<SprigError> for PipelineError {
    fn from(err: SprigError) -> Self {
        match err {
            SprigError::Verify(e) => PipelineError::Verification(e),
            SprigError::Serialize(e) => PipelineError::Io(e),
            SprigError::Engine(e) => PipelineError::Engine(e),
            other => PipelineError::Construction(other),
        }
    }
}

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// The verifier's verdict.
    pub diagnostic: Diagnostic,
    /// The textual IR that was written.
    pub ir: String,
    /// The entry function's return value.
    pub result: GenericValue,
}

/// Drives a module through every stage.
pub struct Pipeline {
    config: PipelineConfig,
    output: Option<Box<dyn Write>>,
}

impl Pipeline {
    /// Create a pipeline. Program output goes to stdout unless
    /// [`output`](Self::output) is set.
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            output: None,
        }
    }

    /// Send program output to `writer`.
    pub fn output(mut self, writer: impl Write + 'static) -> Self {
        self.output = Some(Box::new(writer));
        self
    }

    /// The pipeline's configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Build a module with `build` and run it.
    pub fn run_program<F>(self, build: F) -> Result<RunReport, PipelineError>
    where
        F: FnOnce(&PipelineConfig) -> Result<Module, SprigError>,
    {
        let module = build(&self.config).map_err(PipelineError::from)?;
        self.run(module)
    }

    /// Verify, serialize and execute `module`.
    ///
    /// The configured entry point becomes the module's entry if it has none;
    /// a module designating a different one fails verification.
    pub fn run(self, mut module: Module) -> Result<RunReport, PipelineError> {
        let Pipeline { config, output } = self;

        let ir = AsmWriter::render(&module);
        if config.dump_module {
            eprint!("{ir}");
        }

        bind_entry_point(&mut module, &config.entry_point)?;
        let diagnostic = verify_module(&module);
        diagnostic.clone().into_result()?;

        write_to_file(&ir, &config.output_path)?;

        let mut builder = EngineBuilder::new(module).kind(config.engine_kind);
        if let Some(writer) = output {
            builder = builder.output(writer);
        }
        let mut engine = builder.create()?;
        engine.finalize()?;
        let result = engine.run_function(&config.entry_point, &[])?;

        info!(entry = %config.entry_point, %result, "pipeline finished");
        Ok(RunReport {
            diagnostic,
            ir,
            result,
        })
    }
}

/// Make `entry` the module's entry point, or fail if it already names
/// another function.
fn bind_entry_point(module: &mut Module, entry: &str) -> Result<(), VerifyError> {
    match module.entry_point() {
        None => {
            module.set_entry_point(entry);
            Ok(())
        }
        Some(name) if name == entry => Ok(()),
        Some(name) => {
            warn!(designated = name, configured = entry, "entry point mismatch");
            let message = DiagnosticMessage::new(
                VerifyCheck::EntryPoint,
                format!("module designates @{name} as its entry point, but @{entry} is run"),
            );
            Diagnostic::failed(vec![message]).into_result()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sprig_core::{EmitError, RegistrationError};

    #[test]
    fn entry_point_is_bound_from_config() {
        let mut module = Module::new("test");
        bind_entry_point(&mut module, "main").unwrap();
        assert_eq!(module.entry_point(), Some("main"));
        bind_entry_point(&mut module, "main").unwrap();

        let err = bind_entry_point(&mut module, "start").unwrap_err();
        assert_eq!(err.diagnostic().failed_check(), Some(VerifyCheck::EntryPoint));
        assert_eq!(module.entry_point(), Some("main"));
    }

    #[test]
    fn exit_codes_are_distinct() {
        let construction: PipelineError = SprigError::from(RegistrationError::DuplicateSymbol {
            name: "main".into(),
        })
        .into();
        let verification = PipelineError::Verification(VerifyError::VerificationFailed(
            Diagnostic::failed(vec![]),
        ));
        let engine = PipelineError::Engine(EngineError::UnresolvedSymbol {
            name: "printf".into(),
        });
        assert_eq!(construction.exit_code(), 1);
        assert_eq!(verification.exit_code(), 2);
        assert_eq!(engine.exit_code(), 4);
    }

    #[test]
    fn stage_errors_keep_their_stage() {
        let err: PipelineError = SprigError::from(EngineError::Build {
            message: "x".into(),
        })
        .into();
        assert!(matches!(err, PipelineError::Engine(_)));

        let err: PipelineError = SprigError::from(EmitError::NoInsertionPoint).into();
        assert!(matches!(err, PipelineError::Construction(_)));
        assert_eq!(err.to_string(), "construction failed: no insertion point set");
    }
}
