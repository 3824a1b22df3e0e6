//! Instruction emitter.
//!
//! The [`InstructionEmitter`] appends instructions to the block under its
//! cursor, checking operand types as it goes so that misuse is reported at
//! the call site rather than by the verifier.
//!
//! # Example
//!
//! ```
//! use sprig_compiler::InstructionEmitter;
//! use sprig_core::{Linkage, primitives};
//! use sprig_registry::Module;
//!
//! let mut module = Module::new("test");
//! let main = module
//!     .create_function("main", primitives::I32, vec![], Linkage::External)
//!     .unwrap();
//! let entry = module.create_block(main, "entry").unwrap();
//! let zero = module.const_i32(0);
//! let n = module.const_i32(1337);
//!
//! let mut emitter = InstructionEmitter::new(&mut module);
//! emitter.position_at_end(entry).unwrap();
//! let sum = emitter.add(zero, n, "result").unwrap();
//! emitter.ret(sum).unwrap();
//! ```

mod naming;

use tracing::debug;

use sprig_core::{
    BinaryOp, BlockRef, EmitError, ExternId, Function, Instruction, LocalDef, RegistrationError,
    TypeHash, Value, primitives,
};
use sprig_registry::Module;

/// Appends instructions to one block at a time.
///
/// Borrows the module mutably for its lifetime; each emitter has a single
/// insertion cursor.
pub struct InstructionEmitter<'m> {
    module: &'m mut Module,
    cursor: Option<BlockRef>,
}

impl<'m> InstructionEmitter<'m> {
    /// Create an emitter with no insertion point.
    pub fn new(module: &'m mut Module) -> Self {
        Self {
            module,
            cursor: None,
        }
    }

    /// Read access to the module being built.
    pub fn module(&self) -> &Module {
        self.module
    }

    // ==========================================================================
    // Cursor
    // ==========================================================================

    /// Move the cursor to the end of `block`.
    pub fn position_at_end(&mut self, block: BlockRef) -> Result<(), EmitError> {
        let function = self
            .module
            .function(block.function)
            .ok_or(RegistrationError::UnknownFunction(block.function))?;
        if function.block(block.block).is_none() {
            return Err(EmitError::ForeignBlock { target: block });
        }
        self.cursor = Some(block);
        Ok(())
    }

    /// Clear the insertion point.
    pub fn clear_position(&mut self) {
        self.cursor = None;
    }

    /// The current insertion point.
    pub fn insertion_point(&self) -> Option<BlockRef> {
        self.cursor
    }

    // ==========================================================================
    // Arithmetic
    // ==========================================================================

    /// Emit an integer binary operation. Both operands must share one
    /// integer type, which is also the result type.
    pub fn binary(
        &mut self,
        op: BinaryOp,
        lhs: Value,
        rhs: Value,
        name: &str,
    ) -> Result<Value, EmitError> {
        let types = self.module.types();
        if types.int_bits(lhs.ty()).is_none() {
            return Err(EmitError::TypeMismatch {
                context: format!("'{op}' left operand"),
                expected: "integer type".to_string(),
                actual: types.name(lhs.ty()).to_string(),
            });
        }
        if lhs.ty() != rhs.ty() {
            return Err(EmitError::TypeMismatch {
                context: format!("'{op}' right operand"),
                expected: types.name(lhs.ty()).to_string(),
                actual: types.name(rhs.ty()).to_string(),
            });
        }

        let ty = lhs.ty();
        let value = self.append_with_result(ty, name, |result| Instruction::Binary {
            op,
            result,
            lhs,
            rhs,
        })?;
        Ok(value)
    }

    /// Emit `add`.
    pub fn add(&mut self, lhs: Value, rhs: Value, name: &str) -> Result<Value, EmitError> {
        self.binary(BinaryOp::Add, lhs, rhs, name)
    }

    /// Emit `sub`.
    pub fn sub(&mut self, lhs: Value, rhs: Value, name: &str) -> Result<Value, EmitError> {
        self.binary(BinaryOp::Sub, lhs, rhs, name)
    }

    /// Emit `mul`.
    pub fn mul(&mut self, lhs: Value, rhs: Value, name: &str) -> Result<Value, EmitError> {
        self.binary(BinaryOp::Mul, lhs, rhs, name)
    }

    /// Emit `sdiv`.
    pub fn sdiv(&mut self, lhs: Value, rhs: Value, name: &str) -> Result<Value, EmitError> {
        self.binary(BinaryOp::SDiv, lhs, rhs, name)
    }

    /// Emit `udiv`.
    pub fn udiv(&mut self, lhs: Value, rhs: Value, name: &str) -> Result<Value, EmitError> {
        self.binary(BinaryOp::UDiv, lhs, rhs, name)
    }

    /// Emit `srem`.
    pub fn srem(&mut self, lhs: Value, rhs: Value, name: &str) -> Result<Value, EmitError> {
        self.binary(BinaryOp::SRem, lhs, rhs, name)
    }

    /// Emit `urem`.
    pub fn urem(&mut self, lhs: Value, rhs: Value, name: &str) -> Result<Value, EmitError> {
        self.binary(BinaryOp::URem, lhs, rhs, name)
    }

    /// Emit `and`.
    pub fn and(&mut self, lhs: Value, rhs: Value, name: &str) -> Result<Value, EmitError> {
        self.binary(BinaryOp::And, lhs, rhs, name)
    }

    /// Emit `or`.
    pub fn or(&mut self, lhs: Value, rhs: Value, name: &str) -> Result<Value, EmitError> {
        self.binary(BinaryOp::Or, lhs, rhs, name)
    }

    /// Emit `xor`.
    pub fn xor(&mut self, lhs: Value, rhs: Value, name: &str) -> Result<Value, EmitError> {
        self.binary(BinaryOp::Xor, lhs, rhs, name)
    }

    /// Emit `shl`.
    pub fn shl(&mut self, lhs: Value, rhs: Value, name: &str) -> Result<Value, EmitError> {
        self.binary(BinaryOp::Shl, lhs, rhs, name)
    }

    /// Emit `lshr`.
    pub fn lshr(&mut self, lhs: Value, rhs: Value, name: &str) -> Result<Value, EmitError> {
        self.binary(BinaryOp::LShr, lhs, rhs, name)
    }

    /// Emit `ashr`.
    pub fn ashr(&mut self, lhs: Value, rhs: Value, name: &str) -> Result<Value, EmitError> {
        self.binary(BinaryOp::AShr, lhs, rhs, name)
    }

    // ==========================================================================
    // Calls
    // ==========================================================================

    /// Emit a call to an external declaration.
    ///
    /// Fixed arguments must match the declared parameter types exactly;
    /// variadic extras are passed as they are. Returns `None` for void
    /// callees.
    pub fn call(
        &mut self,
        callee: ExternId,
        args: &[Value],
        name: &str,
    ) -> Result<Option<Value>, EmitError> {
        let decl = self.module.external(callee).ok_or_else(|| {
            RegistrationError::InvalidName(format!("{callee} is not declared in this module"))
        })?;
        let sig = &decl.signature;
        let fixed = sig.params.len();

        if args.len() < fixed || (!sig.variadic && args.len() > fixed) {
            return Err(EmitError::ArityMismatch {
                callee: decl.name.clone(),
                expected: if sig.variadic {
                    format!("at least {fixed}")
                } else {
                    fixed.to_string()
                },
                actual: args.len(),
            });
        }

        let types = self.module.types();
        for (index, (arg, param)) in args.iter().zip(&sig.params).enumerate() {
            if arg.ty() != *param {
                return Err(EmitError::TypeMismatch {
                    context: format!("argument {index} of call to @{}", decl.name),
                    expected: types.name(*param).to_string(),
                    actual: types.name(arg.ty()).to_string(),
                });
            }
        }

        let ret = sig.ret;
        let args = args.to_vec();
        if ret == primitives::VOID {
            self.append(Instruction::Call {
                callee,
                args,
                result: None,
            })?;
            Ok(None)
        } else {
            let value = self.append_with_result(ret, name, |result| Instruction::Call {
                callee,
                args,
                result: Some(result),
            })?;
            Ok(Some(value))
        }
    }

    // ==========================================================================
    // Terminators
    // ==========================================================================

    /// Emit `ret void`.
    pub fn ret_void(&mut self) -> Result<(), EmitError> {
        self.check_return_type(primitives::VOID)?;
        self.append(Instruction::Ret { value: None })
    }

    /// Emit `ret <value>`.
    pub fn ret(&mut self, value: Value) -> Result<(), EmitError> {
        self.check_return_type(value.ty())?;
        self.append(Instruction::Ret { value: Some(value) })
    }

    /// Emit an unconditional branch to another block of the same function.
    pub fn br(&mut self, target: BlockRef) -> Result<(), EmitError> {
        let cursor = self.cursor.ok_or(EmitError::NoInsertionPoint)?;
        let in_function = self
            .module
            .function(cursor.function)
            .is_some_and(|f| f.block(target.block).is_some());
        if target.function != cursor.function || !in_function {
            return Err(EmitError::ForeignBlock { target });
        }
        self.append(Instruction::Br {
            target: target.block,
        })
    }

    // ==========================================================================
    // Internals
    // ==========================================================================

    fn check_return_type(&self, actual: TypeHash) -> Result<(), EmitError> {
        let cursor = self.cursor.ok_or(EmitError::NoInsertionPoint)?;
        let function = self.current_function(cursor)?;
        let expected = function.signature().ret;
        if expected != actual {
            let types = self.module.types();
            return Err(EmitError::TypeMismatch {
                context: format!("return from @{}", function.name()),
                expected: types.name(expected).to_string(),
                actual: types.name(actual).to_string(),
            });
        }
        Ok(())
    }

    fn current_function(&self, cursor: BlockRef) -> Result<&Function, EmitError> {
        self.module
            .function(cursor.function)
            .ok_or(EmitError::Registration(RegistrationError::UnknownFunction(
                cursor.function,
            )))
    }

    /// Resolve the cursor to an open block, returning the function it lives in.
    fn open_block(&mut self) -> Result<(BlockRef, &mut Function), EmitError> {
        let cursor = self.cursor.ok_or(EmitError::NoInsertionPoint)?;
        let function = self
            .module
            .function_mut(cursor.function)
            .ok_or(RegistrationError::UnknownFunction(cursor.function))?;
        let block = function
            .block(cursor.block)
            .ok_or(EmitError::ForeignBlock { target: cursor })?;
        if block.is_terminated() {
            return Err(EmitError::BlockAlreadyTerminated {
                block: cursor,
                label: block.label().to_string(),
            });
        }
        Ok((cursor, function))
    }

    fn append(&mut self, inst: Instruction) -> Result<(), EmitError> {
        let (cursor, function) = self.open_block()?;
        debug!(
            function = function.name(),
            block = %cursor,
            opcode = inst.opcode_name(),
            "emit"
        );
        if let Some(block) = function.block_mut(cursor.block) {
            block.push(inst);
        }
        Ok(())
    }

    fn append_with_result(
        &mut self,
        ty: TypeHash,
        name: &str,
        make: impl FnOnce(sprig_core::LocalId) -> Instruction,
    ) -> Result<Value, EmitError> {
        let (cursor, function) = self.open_block()?;
        let index = function
            .block(cursor.block)
            .map(|b| b.len() as u32)
            .unwrap_or_default();
        let local_name = naming::unique_name(function, name);
        let result = function.add_local(
            local_name,
            ty,
            LocalDef::Instruction {
                block: cursor.block,
                index,
            },
        );
        let inst = make(result);
        debug!(
            function = function.name(),
            block = %cursor,
            opcode = inst.opcode_name(),
            %result,
            "emit"
        );
        if let Some(block) = function.block_mut(cursor.block) {
            block.push(inst);
        }
        Ok(Value::local(result, ty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sprig_core::{FunctionId, Linkage, ValueKind};

    fn setup() -> (Module, FunctionId, BlockRef) {
        let mut m = Module::new("test");
        let f = m
            .create_function("main", primitives::VOID, vec![], Linkage::External)
            .unwrap();
        let entry = m.create_block(f, "entrypoint").unwrap();
        (m, f, entry)
    }

    #[test]
    fn add_produces_typed_local() {
        let (mut m, f, entry) = setup();
        let a = m.const_i32(0);
        let b = m.const_i32(1337);
        let mut e = InstructionEmitter::new(&mut m);
        e.position_at_end(entry).unwrap();
        let v = e.add(a, b, "result").unwrap();
        assert_eq!(v.ty(), primitives::I32);
        assert!(matches!(v.kind(), ValueKind::Local(_)));

        let func = m.function(f).unwrap();
        assert_eq!(func.blocks()[0].len(), 1);
        let local = func.local(v.as_local().unwrap()).unwrap();
        assert_eq!(local.name.as_deref(), Some("result"));
    }

    #[test]
    fn names_are_uniquified() {
        let (mut m, f, entry) = setup();
        let a = m.const_i32(1);
        let mut e = InstructionEmitter::new(&mut m);
        e.position_at_end(entry).unwrap();
        let x = e.add(a, a, "x").unwrap();
        let y = e.add(x, a, "x").unwrap();
        let z = e.add(y, a, "").unwrap();
        let func = m.function(f).unwrap();
        assert_eq!(func.local(y.as_local().unwrap()).unwrap().name.as_deref(), Some("x1"));
        assert_eq!(func.local(z.as_local().unwrap()).unwrap().name, None);
    }

    #[test]
    fn mixed_operand_types() {
        let (mut m, _, entry) = setup();
        let a = m.const_i32(1);
        let b = m.const_int(primitives::I8, 1).unwrap();
        let mut e = InstructionEmitter::new(&mut m);
        e.position_at_end(entry).unwrap();
        let err = e.mul(a, b, "").unwrap_err();
        assert_eq!(
            err,
            EmitError::TypeMismatch {
                context: "'mul' right operand".into(),
                expected: "i32".into(),
                actual: "i8".into(),
            }
        );
    }

    #[test]
    fn pointer_arithmetic_rejected() {
        let (mut m, _, entry) = setup();
        let s = m.global_string("x", "s").unwrap();
        let mut e = InstructionEmitter::new(&mut m);
        e.position_at_end(entry).unwrap();
        assert!(matches!(
            e.add(s, s, ""),
            Err(EmitError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn no_insertion_point() {
        let (mut m, _, _) = setup();
        let a = m.const_i32(1);
        let mut e = InstructionEmitter::new(&mut m);
        assert_eq!(e.add(a, a, ""), Err(EmitError::NoInsertionPoint));
        assert_eq!(e.ret_void(), Err(EmitError::NoInsertionPoint));
    }

    #[test]
    fn append_after_terminator() {
        let (mut m, f, entry) = setup();
        let a = m.const_i32(1);
        let mut e = InstructionEmitter::new(&mut m);
        e.position_at_end(entry).unwrap();
        e.ret_void().unwrap();
        let err = e.add(a, a, "late").unwrap_err();
        assert_eq!(
            err,
            EmitError::BlockAlreadyTerminated {
                block: entry,
                label: "entrypoint".into(),
            }
        );
        assert!(matches!(
            e.ret_void(),
            Err(EmitError::BlockAlreadyTerminated { .. })
        ));

        let func = m.function(f).unwrap();
        assert_eq!(func.blocks()[0].instructions(), &[Instruction::Ret { value: None }]);
        assert!(!func.has_local_named("late"));
    }

    #[test]
    fn call_checks_fixed_arguments() {
        let (mut m, _, entry) = setup();
        let printf = m
            .declare_external("printf", primitives::I32, vec![primitives::I8_PTR], true)
            .unwrap();
        let n = m.const_i32(7);
        let fmt = m.global_string("%d", "fmt").unwrap();
        let mut e = InstructionEmitter::new(&mut m);
        e.position_at_end(entry).unwrap();

        assert_eq!(
            e.call(printf, &[], ""),
            Err(EmitError::ArityMismatch {
                callee: "printf".into(),
                expected: "at least 1".into(),
                actual: 0,
            })
        );
        assert_eq!(
            e.call(printf, &[n], ""),
            Err(EmitError::TypeMismatch {
                context: "argument 0 of call to @printf".into(),
                expected: "i8*".into(),
                actual: "i32".into(),
            })
        );
        let r = e.call(printf, &[fmt, n, n], "").unwrap();
        assert_eq!(r.map(|v| v.ty()), Some(primitives::I32));
    }

    #[test]
    fn call_non_variadic_too_many() {
        let (mut m, _, entry) = setup();
        let putchar = m
            .declare_external("putchar", primitives::I32, vec![primitives::I32], false)
            .unwrap();
        let n = m.const_i32(65);
        let mut e = InstructionEmitter::new(&mut m);
        e.position_at_end(entry).unwrap();
        assert_eq!(
            e.call(putchar, &[n, n], ""),
            Err(EmitError::ArityMismatch {
                callee: "putchar".into(),
                expected: "1".into(),
                actual: 2,
            })
        );
    }

    #[test]
    fn void_call_has_no_result() {
        let (mut m, f, entry) = setup();
        let hook = m
            .declare_external("hook", primitives::VOID, vec![], false)
            .unwrap();
        let mut e = InstructionEmitter::new(&mut m);
        e.position_at_end(entry).unwrap();
        assert_eq!(e.call(hook, &[], "ignored"), Ok(None));
        assert!(!m.function(f).unwrap().has_local_named("ignored"));
    }

    #[test]
    fn return_type_checked() {
        let (mut m, _, entry) = setup();
        let n = m.const_i32(0);
        let mut e = InstructionEmitter::new(&mut m);
        e.position_at_end(entry).unwrap();
        assert_eq!(
            e.ret(n),
            Err(EmitError::TypeMismatch {
                context: "return from @main".into(),
                expected: "void".into(),
                actual: "i32".into(),
            })
        );
    }

    #[test]
    fn branch_between_blocks() {
        let (mut m, f, entry) = setup();
        let exit = m.create_block(f, "exit").unwrap();
        let other = m
            .create_function("other", primitives::VOID, vec![], Linkage::Internal)
            .unwrap();
        let foreign = m.create_block(other, "entry").unwrap();

        let mut e = InstructionEmitter::new(&mut m);
        e.position_at_end(entry).unwrap();
        assert_eq!(
            e.br(foreign),
            Err(EmitError::ForeignBlock { target: foreign })
        );
        e.br(exit).unwrap();
        e.position_at_end(exit).unwrap();
        e.ret_void().unwrap();
        e.clear_position();
        assert_eq!(e.insertion_point(), None);

        let func = m.function(f).unwrap();
        assert!(func.blocks().iter().all(|b| b.is_terminated()));
    }
}
