//! Interpreter execution engine.
//!
//! An [`ExecutionEngine`] takes ownership of a module and runs its functions
//! directly, without generating native code. Its lifecycle:
//!
//! ```text
//! EngineBuilder --create--> Built --finalize--> Finalized --run_function--> Executed
//!                                   \                      \
//!                                    `--> Failed             `--> Failed
//! ```
//!
//! `finalize` lays globals out in memory and binds every external
//! declaration to a host routine; a run is only possible after that.
//!
//! # Example
//!
//! ```
//! use sprig::vm::EngineBuilder;
//! use sprig_compiler::InstructionEmitter;
//! use sprig_core::{GenericValue, Linkage, primitives};
//! use sprig_registry::Module;
//!
//! let mut module = Module::new("calc");
//! let f = module
//!     .create_function("answer", primitives::I32, vec![], Linkage::External)
//!     .unwrap();
//! let entry = module.create_block(f, "entry").unwrap();
//! let a = module.const_i32(40);
//! let b = module.const_i32(2);
//! let mut emitter = InstructionEmitter::new(&mut module);
//! emitter.position_at_end(entry).unwrap();
//! let sum = emitter.add(a, b, "sum").unwrap();
//! emitter.ret(sum).unwrap();
//!
//! let mut engine = EngineBuilder::new(module).create().unwrap();
//! engine.finalize().unwrap();
//! assert_eq!(engine.run_function("answer", &[]).unwrap(), GenericValue::i32(42));
//! ```

mod interpreter;
pub mod memory;
pub mod substrate;

use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

use tracing::{info, warn};

use sprig_core::{EngineError, GenericValue, HostError, TypeKind};
use sprig_modules::{HostCall, HostFn, HostSymbols};
use sprig_registry::Module;

pub use interpreter::{StackFrame, Trap, VMState, binary_op};
pub use memory::{GLOBAL_BASE, Memory};
pub use substrate::{Substrate, ensure_initialized};

/// Widest integer the interpreter executes.
pub const MAX_EXEC_INT_BITS: u32 = 64;

/// How the engine executes code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineKind {
    /// Execute IR directly.
    #[default]
    Interpreter,
    /// Compile to native code first. Not available.
    Jit,
}

/// Where an engine is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Built,
    Finalized,
    Executed,
    Failed,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EngineState::Built => "built",
            EngineState::Finalized => "finalized",
            EngineState::Executed => "executed",
            EngineState::Failed => "failed",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Configures and creates an [`ExecutionEngine`]. Consumes the module.
pub struct EngineBuilder {
    module: Module,
    kind: EngineKind,
    output: Option<Box<dyn Write>>,
}

impl EngineBuilder {
    /// Start building an engine for `module`.
    pub fn new(module: Module) -> Self {
        Self {
            module,
            kind: EngineKind::default(),
            output: None,
        }
    }

    /// Select the execution strategy.
    pub fn kind(mut self, kind: EngineKind) -> Self {
        self.kind = kind;
        self
    }

    /// Send program output to `writer` instead of stdout.
    pub fn output(mut self, writer: impl Write + 'static) -> Self {
        self.output = Some(Box::new(writer));
        self
    }

    /// Create the engine.
    pub fn create(self) -> Result<ExecutionEngine, EngineError> {
        ensure_initialized();

        if self.kind == EngineKind::Jit {
            warn!(module = self.module.name(), "JIT engine requested");
            return Err(EngineError::Build {
                message: "native code generation is not available; use the interpreter"
                    .to_string(),
            });
        }
        check_executable(&self.module)?;

        info!(module = self.module.name(), "execution engine built");
        Ok(ExecutionEngine {
            module: self.module,
            state: EngineState::Built,
            host_symbols: HostSymbols::new(),
            bindings: Vec::new(),
            memory: Memory::new(),
            output: self.output.unwrap_or_else(|| Box::new(io::stdout())),
        })
    }
}

impl fmt::Debug for EngineBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineBuilder")
            .field("module", &self.module.name())
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Reject modules the interpreter cannot run.
fn check_executable(module: &Module) -> Result<(), EngineError> {
    let build = |message: String| EngineError::Build { message };
    let types = module.types();

    let too_wide = |ty| {
        matches!(types.kind(ty), Some(TypeKind::Int { bits }) if bits > MAX_EXEC_INT_BITS)
    };

    for decl in module.externals() {
        let sig = &decl.signature;
        if let Some(ty) = std::iter::once(&sig.ret).chain(&sig.params).find(|t| too_wide(**t)) {
            return Err(build(format!(
                "@{}: {} values are not supported by the interpreter",
                decl.name,
                types.name(*ty)
            )));
        }
    }

    for func in module.functions() {
        let sig = func.signature();
        let wide = std::iter::once(sig.ret)
            .chain(func.locals().iter().map(|l| l.ty))
            .find(|t| too_wide(*t));
        if let Some(ty) = wide {
            return Err(build(format!(
                "@{}: {} values are not supported by the interpreter",
                func.name(),
                types.name(ty)
            )));
        }
        if func.blocks().is_empty() {
            return Err(build(format!("@{} has no body", func.name())));
        }
        if let Some(block) = func.blocks().iter().find(|b| !b.is_terminated()) {
            return Err(build(format!(
                "@{}: block '{}' does not end in a terminator",
                func.name(),
                block.label()
            )));
        }
    }

    if let Some(c) = module.constants().constants().iter().find(|c| c.bits > MAX_EXEC_INT_BITS) {
        return Err(build(format!(
            "{} constants are not supported by the interpreter",
            types.name(c.ty)
        )));
    }
    Ok(())
}

// ============================================================================
// Engine
// ============================================================================

/// Runs the functions of a module it owns.
pub struct ExecutionEngine {
    module: Module,
    state: EngineState,
    host_symbols: HostSymbols,
    bindings: Vec<HostFn>,
    memory: Memory,
    output: Box<dyn Write>,
}

impl ExecutionEngine {
    /// Current lifecycle state.
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Name of the module being executed.
    pub fn module_name(&self) -> &str {
        self.module.name()
    }

    /// Map an external symbol to a host routine. Mapped symbols take
    /// precedence over the process-wide standard routines.
    pub fn add_host_symbol<F>(&mut self, name: impl Into<String>, f: F) -> Result<(), EngineError>
    where
        F: Fn(&mut HostCall<'_>) -> Result<GenericValue, HostError> + Send + Sync + 'static,
    {
        self.expect_state("add_host_symbol", &[EngineState::Built])?;
        self.host_symbols.insert_fn(name, Arc::new(f));
        Ok(())
    }

    /// Lay out globals and bind every external declaration.
    ///
    /// An external with no host routine fails with
    /// [`EngineError::UnresolvedSymbol`] and leaves the engine failed.
    pub fn finalize(&mut self) -> Result<(), EngineError> {
        self.expect_state("finalize", &[EngineState::Built])?;

        let standard = ensure_initialized().host_symbols();
        let mut bindings = Vec::with_capacity(self.module.externals().len());
        for decl in self.module.externals() {
            let host = self
                .host_symbols
                .get(&decl.name)
                .or_else(|| standard.get(&decl.name));
            match host {
                Some(f) => bindings.push(f),
                None => {
                    warn!(symbol = %decl.name, "unresolved external symbol");
                    self.state = EngineState::Failed;
                    return Err(EngineError::UnresolvedSymbol {
                        name: decl.name.clone(),
                    });
                }
            }
        }

        self.bindings = bindings;
        self.memory = Memory::layout(self.module.globals());
        self.state = EngineState::Finalized;
        info!(
            module = self.module.name(),
            externals = self.bindings.len(),
            global_bytes = self.memory.len(),
            "execution engine finalized"
        );
        Ok(())
    }

    /// Run `name` with `args` and return its result.
    ///
    /// A trap leaves the engine failed.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run_function(
        &mut self,
        name: &str,
        args: &[GenericValue],
    ) -> Result<GenericValue, EngineError> {
        self.expect_state(
            "run_function",
            &[EngineState::Finalized, EngineState::Executed],
        )?;

        let id = self
            .module
            .function_by_name(name)
            .ok_or_else(|| EngineError::UnknownFunction {
                name: name.to_string(),
            })?;
        let function = self
            .module
            .function(id)
            .ok_or_else(|| EngineError::UnknownFunction {
                name: name.to_string(),
            })?;
        self.check_arguments(name, &function.signature().params, args)?;

        info!(function = name, args = args.len(), "running function");
        let result = {
            let mut interpreter = interpreter::Interpreter::new(
                &self.module,
                &self.memory,
                &self.bindings,
                &mut *self.output,
            );
            interpreter.execute(function, args)
        };
        if let Err(e) = self.output.flush() {
            warn!(error = %e, "failed to flush program output");
        }

        match result {
            Ok(value) => {
                self.state = EngineState::Executed;
                info!(function = name, result = %value, "function returned");
                Ok(value)
            }
            Err(Trap(message)) => {
                self.state = EngineState::Failed;
                warn!(function = name, %message, "runtime trap");
                Err(EngineError::RuntimeTrap {
                    function: name.to_string(),
                    message,
                })
            }
        }
    }

    fn check_arguments(
        &self,
        name: &str,
        params: &[sprig_core::TypeHash],
        args: &[GenericValue],
    ) -> Result<(), EngineError> {
        let invalid = |message: String| EngineError::InvalidArguments {
            function: name.to_string(),
            message,
        };
        if params.len() != args.len() {
            return Err(invalid(format!(
                "expected {} argument(s), got {}",
                params.len(),
                args.len()
            )));
        }
        let types = self.module.types();
        for (index, (param, arg)) in params.iter().zip(args).enumerate() {
            let matches = match (types.kind(*param), arg) {
                (Some(TypeKind::Int { bits }), GenericValue::Int { bits: b, .. }) => bits == *b,
                (Some(TypeKind::Pointer { .. }), GenericValue::Pointer(_)) => true,
                _ => false,
            };
            if !matches {
                return Err(invalid(format!(
                    "argument {index}: expected {}, got {}",
                    types.name(*param),
                    arg.type_name()
                )));
            }
        }
        Ok(())
    }

    fn expect_state(
        &self,
        operation: &'static str,
        allowed: &[EngineState],
    ) -> Result<(), EngineError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(EngineError::InvalidState {
                operation,
                state: self.state.to_string(),
            })
        }
    }
}

impl fmt::Debug for ExecutionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionEngine")
            .field("module", &self.module.name())
            .field("state", &self.state)
            .field("bindings", &self.bindings.len())
            .finish_non_exhaustive()
    }
}
