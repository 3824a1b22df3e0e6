//! Pipeline configuration.

use std::path::{Path, PathBuf};

use crate::vm::EngineKind;

/// Settings for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Module identifier, also used as the source file name.
    pub module_name: String,
    /// Function the run starts at.
    pub entry_point: String,
    /// Where the textual IR is written.
    pub output_path: PathBuf,
    /// Execution strategy.
    pub engine_kind: EngineKind,
    /// Print the textual IR to stderr before writing it.
    pub dump_module: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            module_name: "test".to_string(),
            entry_point: "main".to_string(),
            output_path: PathBuf::from("test.ll"),
            engine_kind: EngineKind::Interpreter,
            dump_module: true,
        }
    }
}

impl PipelineConfig {
    /// Create a config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_module_name(mut self, name: impl Into<String>) -> Self {
        self.module_name = name.into();
        self
    }

    pub fn with_entry_point(mut self, name: impl Into<String>) -> Self {
        self.entry_point = name.into();
        self
    }

    pub fn with_output_path(mut self, path: impl AsRef<Path>) -> Self {
        self.output_path = path.as_ref().to_path_buf();
        self
    }

    pub fn with_engine_kind(mut self, kind: EngineKind) -> Self {
        self.engine_kind = kind;
        self
    }

    pub fn with_dump_module(mut self, dump: bool) -> Self {
        self.dump_module = dump;
        self
    }
}
