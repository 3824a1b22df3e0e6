//! Structural verifier.
//!
//! Checks run in a fixed order and stop at the first category that finds
//! anything:
//!
//! 1. [`VerifyCheck::Terminators`]: every block ends in exactly one terminator
//! 2. [`VerifyCheck::OperandTypes`]: operands exist and have the types their
//!    instruction requires
//! 3. [`VerifyCheck::CallSites`]: callees are declared and every call agrees
//!    with the callee's signature
//! 4. [`VerifyCheck::Dominance`]: values are defined before use and every
//!    block is reachable
//! 5. [`VerifyCheck::EntryPoint`]: the designated entry function exists and
//!    has type `void ()`
//!
//! Verification only reads the module.

mod cfg;

use tracing::{info, warn};

use sprig_core::{
    BlockId, Diagnostic, DiagnosticMessage, Function, FunctionId, Instruction, LocalDef,
    TypeHash, Value, ValueKind, VerifyCheck, primitives,
};
use sprig_registry::Module;

use cfg::BlockGraph;

/// Verify one function. The entry point check runs only if `function` is
/// the module's designated entry.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn verify_function(module: &Module, function: FunctionId) -> Diagnostic {
    let Some(func) = module.function(function) else {
        return Diagnostic::failed(vec![DiagnosticMessage::new(
            VerifyCheck::EntryPoint,
            format!("{function} does not exist in module '{}'", module.name()),
        )]);
    };
    let checker = FunctionVerifier::new(module, func);
    let is_entry = module.entry_point() == Some(func.name());

    let diagnostic = run_checks(|check, out| match check {
        VerifyCheck::EntryPoint if is_entry => check_entry_point(module, out),
        VerifyCheck::EntryPoint => {}
        other => checker.run(other, out),
    });
    log_outcome(func.name(), &diagnostic);
    diagnostic
}

/// Verify every function in the module, then the entry point.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn verify_module(module: &Module) -> Diagnostic {
    let checkers: Vec<_> = module
        .functions()
        .iter()
        .map(|f| FunctionVerifier::new(module, f))
        .collect();

    let diagnostic = run_checks(|check, out| match check {
        VerifyCheck::EntryPoint => check_entry_point(module, out),
        other => {
            for checker in &checkers {
                checker.run(other, out);
            }
        }
    });
    log_outcome(module.name(), &diagnostic);
    diagnostic
}

const CHECK_ORDER: [VerifyCheck; 5] = [
    VerifyCheck::Terminators,
    VerifyCheck::OperandTypes,
    VerifyCheck::CallSites,
    VerifyCheck::Dominance,
    VerifyCheck::EntryPoint,
];

fn run_checks(mut run: impl FnMut(VerifyCheck, &mut Vec<DiagnosticMessage>)) -> Diagnostic {
    for check in CHECK_ORDER {
        let mut messages = Vec::new();
        run(check, &mut messages);
        if !messages.is_empty() {
            return Diagnostic::failed(messages);
        }
    }
    Diagnostic::passed()
}

fn log_outcome(subject: &str, diagnostic: &Diagnostic) {
    match diagnostic.failed_check() {
        None => info!(subject, "verification passed"),
        Some(check) => warn!(
            subject,
            %check,
            messages = diagnostic.messages().len(),
            "verification failed"
        ),
    }
}

fn check_entry_point(module: &Module, out: &mut Vec<DiagnosticMessage>) {
    let Some(name) = module.entry_point() else {
        return;
    };
    let Some(id) = module.function_by_name(name) else {
        out.push(DiagnosticMessage::new(
            VerifyCheck::EntryPoint,
            format!("entry function @{name} is not defined in module '{}'", module.name()),
        ));
        return;
    };
    let Some(func) = module.function(id) else {
        return;
    };
    let sig = func.signature();
    if sig.ret != primitives::VOID || !sig.params.is_empty() || sig.variadic {
        out.push(
            DiagnosticMessage::new(
                VerifyCheck::EntryPoint,
                format!(
                    "entry function must have type void (), found {}",
                    module.types().signature_string(sig)
                ),
            )
            .in_function(name),
        );
    }
}

/// Per-function checks.
struct FunctionVerifier<'a> {
    module: &'a Module,
    func: &'a Function,
}

impl<'a> FunctionVerifier<'a> {
    fn new(module: &'a Module, func: &'a Function) -> Self {
        Self { module, func }
    }

    fn run(&self, check: VerifyCheck, out: &mut Vec<DiagnosticMessage>) {
        match check {
            VerifyCheck::Terminators => self.check_terminators(out),
            VerifyCheck::OperandTypes => self.check_operand_types(out),
            VerifyCheck::CallSites => self.check_call_sites(out),
            VerifyCheck::Dominance => self.check_dominance(out),
            VerifyCheck::EntryPoint => {}
        }
    }

    fn message(&self, check: VerifyCheck, block: Option<&str>, text: String) -> DiagnosticMessage {
        let msg = DiagnosticMessage::new(check, text).in_function(self.func.name());
        match block {
            Some(label) => msg.in_block(label),
            None => msg,
        }
    }

    fn type_name(&self, ty: TypeHash) -> &str {
        self.module.types().name(ty)
    }

    // ==========================================================================
    // (a) Terminators
    // ==========================================================================

    fn check_terminators(&self, out: &mut Vec<DiagnosticMessage>) {
        if self.func.blocks().is_empty() {
            out.push(self.message(
                VerifyCheck::Terminators,
                None,
                "function has no basic blocks".to_string(),
            ));
            return;
        }
        for block in self.func.blocks() {
            let label = Some(block.label());
            let insts = block.instructions();
            if !block.is_terminated() {
                out.push(self.message(
                    VerifyCheck::Terminators,
                    label,
                    "block does not end in a terminator".to_string(),
                ));
            }
            let early = insts
                .iter()
                .take(insts.len().saturating_sub(1))
                .position(|i| i.is_terminator());
            if let Some(index) = early {
                out.push(self.message(
                    VerifyCheck::Terminators,
                    label,
                    format!("terminator at position {index} is not the last instruction"),
                ));
            }
        }
    }

    // ==========================================================================
    // (b) Operand types
    // ==========================================================================

    /// The type a value really has, or `None` if it refers to nothing.
    fn resolve(&self, value: &Value) -> Option<TypeHash> {
        match value.kind() {
            ValueKind::Constant(id) => self.module.constant(id).map(|c| c.ty),
            ValueKind::Global(id) => self.module.global(id).map(|_| primitives::I8_PTR),
            ValueKind::Local(id) => self.func.local(id).map(|l| l.ty),
        }
    }

    fn check_operand_types(&self, out: &mut Vec<DiagnosticMessage>) {
        let ret = self.func.signature().ret;
        for block in self.func.blocks() {
            let label = Some(block.label());
            for inst in block.instructions() {
                for operand in inst.operands() {
                    match self.resolve(&operand) {
                        None => out.push(self.message(
                            VerifyCheck::OperandTypes,
                            label,
                            format!("'{}' uses an undefined value", inst.opcode_name()),
                        )),
                        Some(actual) if actual != operand.ty() => out.push(self.message(
                            VerifyCheck::OperandTypes,
                            label,
                            format!(
                                "'{}' operand is typed {} but the value is {}",
                                inst.opcode_name(),
                                self.type_name(operand.ty()),
                                self.type_name(actual)
                            ),
                        )),
                        Some(_) => {}
                    }
                }

                match inst {
                    Instruction::Binary {
                        op,
                        result,
                        lhs,
                        rhs,
                    } => {
                        if self.module.types().int_bits(lhs.ty()).is_none() {
                            out.push(self.message(
                                VerifyCheck::OperandTypes,
                                label,
                                format!(
                                    "'{op}' requires integer operands, got {}",
                                    self.type_name(lhs.ty())
                                ),
                            ));
                        } else if lhs.ty() != rhs.ty() {
                            out.push(self.message(
                                VerifyCheck::OperandTypes,
                                label,
                                format!(
                                    "'{op}' operand types differ: {} and {}",
                                    self.type_name(lhs.ty()),
                                    self.type_name(rhs.ty())
                                ),
                            ));
                        }
                        let result_ty = self.func.local(*result).map(|l| l.ty);
                        if result_ty != Some(lhs.ty()) {
                            out.push(self.message(
                                VerifyCheck::OperandTypes,
                                label,
                                format!("'{op}' result type does not match its operands"),
                            ));
                        }
                    }
                    Instruction::Ret { value } => {
                        let actual = value.map(|v| v.ty()).unwrap_or(primitives::VOID);
                        if actual != ret {
                            out.push(self.message(
                                VerifyCheck::OperandTypes,
                                label,
                                format!(
                                    "'ret' returns {} from a function returning {}",
                                    self.type_name(actual),
                                    self.type_name(ret)
                                ),
                            ));
                        }
                    }
                    Instruction::Br { target } => {
                        if self.func.block(*target).is_none() {
                            out.push(self.message(
                                VerifyCheck::OperandTypes,
                                label,
                                format!("'br' targets nonexistent block {target}"),
                            ));
                        }
                    }
                    Instruction::Call { .. } => {}
                }
            }
        }
    }

    // ==========================================================================
    // (c) Call sites
    // ==========================================================================

    fn check_call_sites(&self, out: &mut Vec<DiagnosticMessage>) {
        for block in self.func.blocks() {
            let label = Some(block.label());
            for inst in block.instructions() {
                let Instruction::Call {
                    callee,
                    args,
                    result,
                } = inst
                else {
                    continue;
                };
                let Some(decl) = self.module.external(*callee) else {
                    out.push(self.message(
                        VerifyCheck::CallSites,
                        label,
                        format!("call to undeclared external {callee}"),
                    ));
                    continue;
                };
                let sig = &decl.signature;
                let fixed = sig.params.len();
                if args.len() < fixed || (!sig.variadic && args.len() > fixed) {
                    out.push(self.message(
                        VerifyCheck::CallSites,
                        label,
                        format!(
                            "call to @{} passes {} argument(s) to {}",
                            decl.name,
                            args.len(),
                            self.module.types().signature_string(sig)
                        ),
                    ));
                }
                for (index, (arg, param)) in args.iter().zip(&sig.params).enumerate() {
                    if arg.ty() != *param {
                        out.push(self.message(
                            VerifyCheck::CallSites,
                            label,
                            format!(
                                "argument {index} of call to @{} is {}, expected {}",
                                decl.name,
                                self.type_name(arg.ty()),
                                self.type_name(*param)
                            ),
                        ));
                    }
                }
                let result_ty = result.and_then(|r| self.func.local(r)).map(|l| l.ty);
                let expected = (sig.ret != primitives::VOID).then_some(sig.ret);
                if result_ty != expected {
                    out.push(self.message(
                        VerifyCheck::CallSites,
                        label,
                        format!(
                            "call to @{} result does not match return type {}",
                            decl.name,
                            self.type_name(sig.ret)
                        ),
                    ));
                }
            }
        }
    }

    // ==========================================================================
    // (d) Dominance
    // ==========================================================================

    fn check_dominance(&self, out: &mut Vec<DiagnosticMessage>) {
        let graph = BlockGraph::new(self.func);
        for (block_index, block) in self.func.blocks().iter().enumerate() {
            let block_id = BlockId::new(block_index as u32);
            let label = Some(block.label());
            if !graph.is_reachable(block_id) {
                out.push(self.message(
                    VerifyCheck::Dominance,
                    label,
                    "block is unreachable from the entry block".to_string(),
                ));
                continue;
            }
            for (inst_index, inst) in block.instructions().iter().enumerate() {
                for operand in inst.operands() {
                    let Some(local) = operand.as_local() else {
                        continue;
                    };
                    let Some(def) = self.func.local(local).map(|l| l.def) else {
                        continue;
                    };
                    let defined_before = match def {
                        LocalDef::Param(_) => true,
                        LocalDef::Instruction { block, index } if block == block_id => {
                            (index as usize) < inst_index
                        }
                        LocalDef::Instruction { block, .. } => {
                            graph.strictly_dominates(block, block_id)
                        }
                    };
                    if !defined_before {
                        out.push(self.message(
                            VerifyCheck::Dominance,
                            label,
                            format!(
                                "'{}' uses {local} before it is defined",
                                inst.opcode_name()
                            ),
                        ));
                    }
                }
            }
        }
    }
}
