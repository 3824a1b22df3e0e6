//! Instruction-by-instruction execution of one function.

use std::io::Write;

use tracing::trace;

use sprig_core::generic_value::{sign_extend, truncate};
use sprig_core::{
    BinaryOp, BlockId, ExternId, Function, GenericValue, Instruction, LocalId, Value, ValueKind,
};
use sprig_modules::{HostCall, HostFn};
use sprig_registry::Module;

use crate::vm::memory::Memory;

/// Why execution stopped early. Carries the message for
/// [`EngineError::RuntimeTrap`](sprig_core::EngineError::RuntimeTrap).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trap(pub String);

impl Trap {
    fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VMState {
    Running,
    Finished,
}

/// Locals and position of the running function.
#[derive(Debug, Clone)]
pub struct StackFrame {
    locals: Vec<GenericValue>,
    block: BlockId,
    ip: usize,
}

impl StackFrame {
    pub fn new(local_count: usize, entry: BlockId) -> Self {
        Self {
            locals: vec![GenericValue::Void; local_count],
            block: entry,
            ip: 0,
        }
    }

    pub fn get_local(&self, id: LocalId) -> Result<GenericValue, Trap> {
        self.locals
            .get(id.as_usize())
            .copied()
            .ok_or_else(|| Trap::new(format!("read of undefined value {id}")))
    }

    pub fn set_local(&mut self, id: LocalId, value: GenericValue) -> Result<(), Trap> {
        let slot = self
            .locals
            .get_mut(id.as_usize())
            .ok_or_else(|| Trap::new(format!("write to undefined value {id}")))?;
        *slot = value;
        Ok(())
    }
}

/// Runs functions of a finalized module.
pub struct Interpreter<'e> {
    module: &'e Module,
    memory: &'e Memory,
    bindings: &'e [HostFn],
    output: &'e mut dyn Write,
    state: VMState,
    return_value: GenericValue,
}

impl<'e> Interpreter<'e> {
    /// `bindings` holds one routine per external declaration, by index.
    pub fn new(
        module: &'e Module,
        memory: &'e Memory,
        bindings: &'e [HostFn],
        output: &'e mut dyn Write,
    ) -> Self {
        Self {
            module,
            memory,
            bindings,
            output,
            state: VMState::Finished,
            return_value: GenericValue::Void,
        }
    }

    /// Execute `function` to completion. Arguments must already match the
    /// parameter types.
    pub fn execute(
        &mut self,
        function: &Function,
        args: &[GenericValue],
    ) -> Result<GenericValue, Trap> {
        let entry = function
            .entry_block()
            .ok_or_else(|| Trap::new("function has no body"))?;
        let mut frame = StackFrame::new(function.locals().len(), entry);
        for (index, arg) in args.iter().enumerate() {
            frame.set_local(LocalId::new(index as u32), *arg)?;
        }

        self.state = VMState::Running;
        self.return_value = GenericValue::Void;
        while self.state == VMState::Running {
            self.execute_instruction(function, &mut frame)?;
        }
        Ok(self.return_value)
    }

    fn execute_instruction(
        &mut self,
        function: &Function,
        frame: &mut StackFrame,
    ) -> Result<(), Trap> {
        let block = function
            .block(frame.block)
            .ok_or_else(|| Trap::new(format!("jump to nonexistent block {}", frame.block)))?;
        let inst = block.instructions().get(frame.ip).ok_or_else(|| {
            Trap::new(format!("fell off the end of block '{}'", block.label()))
        })?;
        trace!(block = block.label(), ip = frame.ip, opcode = inst.opcode_name(), "step");
        frame.ip += 1;

        match inst {
            Instruction::Binary {
                op,
                result,
                lhs,
                rhs,
            } => {
                let (bits, a) = self.int_operand(frame, lhs)?;
                let (_, b) = self.int_operand(frame, rhs)?;
                let value = binary_op(*op, bits, a, b)?;
                frame.set_local(*result, GenericValue::int(bits, value))?;
            }
            Instruction::Call {
                callee,
                args,
                result,
            } => {
                let values = args
                    .iter()
                    .map(|arg| self.eval(frame, arg))
                    .collect::<Result<Vec<_>, _>>()?;
                let value = self.call_host(*callee, &values)?;
                if let Some(result) = result {
                    frame.set_local(*result, value)?;
                }
            }
            Instruction::Ret { value } => {
                self.return_value = match value {
                    Some(v) => self.eval(frame, v)?,
                    None => GenericValue::Void,
                };
                self.state = VMState::Finished;
            }
            Instruction::Br { target } => {
                frame.block = *target;
                frame.ip = 0;
            }
        }
        Ok(())
    }

    fn eval(&self, frame: &StackFrame, value: &Value) -> Result<GenericValue, Trap> {
        match value.kind() {
            ValueKind::Constant(id) => self
                .module
                .constant(id)
                .map(|c| GenericValue::int(c.bits, c.value))
                .ok_or_else(|| Trap::new(format!("undefined constant {id}"))),
            ValueKind::Global(id) => self
                .memory
                .address_of(id)
                .map(GenericValue::Pointer)
                .ok_or_else(|| Trap::new(format!("unmapped global {id}"))),
            ValueKind::Local(id) => frame.get_local(id),
        }
    }

    fn int_operand(&self, frame: &StackFrame, value: &Value) -> Result<(u32, u64), Trap> {
        match self.eval(frame, value)? {
            GenericValue::Int { bits, value } => Ok((bits, value)),
            other => Err(Trap::new(format!(
                "expected an integer operand, found {}",
                other.type_name()
            ))),
        }
    }

    fn call_host(&mut self, callee: ExternId, args: &[GenericValue]) -> Result<GenericValue, Trap> {
        let decl = self
            .module
            .external(callee)
            .ok_or_else(|| Trap::new(format!("call to undeclared external {callee}")))?;
        let host = self
            .bindings
            .get(callee.as_usize())
            .ok_or_else(|| Trap::new(format!("@{} is not bound", decl.name)))?;

        let returned = {
            let mut call = HostCall::new(&decl.name, args, self.memory.view(), &mut *self.output);
            host(&mut call).map_err(|e| Trap::new(format!("@{}: {e}", decl.name)))?
        };

        let ret = decl.signature.ret;
        let types = self.module.types();
        match (types.int_bits(ret), returned) {
            (Some(bits), GenericValue::Int { value, .. }) => Ok(GenericValue::int(bits, value)),
            (None, GenericValue::Void) if types.kind(ret).is_some_and(|k| k.is_void()) => {
                Ok(GenericValue::Void)
            }
            (None, GenericValue::Pointer(p)) if types.kind(ret).is_some_and(|k| k.is_pointer()) => {
                Ok(GenericValue::Pointer(p))
            }
            (_, other) => Err(Trap::new(format!(
                "@{} returned {}, declared to return {}",
                decl.name,
                other.type_name(),
                types.name(ret)
            ))),
        }
    }
}

/// Apply an integer operation at width `bits`. Operands are zero-extended
/// bit patterns; so is the result.
pub fn binary_op(op: BinaryOp, bits: u32, a: u64, b: u64) -> Result<u64, Trap> {
    let signed_min = 1u64 << (bits - 1);
    let is_minus_one = truncate(b, bits) == truncate(u64::MAX, bits);
    let value = match op {
        BinaryOp::Add => a.wrapping_add(b),
        BinaryOp::Sub => a.wrapping_sub(b),
        BinaryOp::Mul => a.wrapping_mul(b),
        BinaryOp::UDiv | BinaryOp::URem | BinaryOp::SDiv | BinaryOp::SRem if b == 0 => {
            return Err(Trap::new("integer division by zero"));
        }
        BinaryOp::SDiv | BinaryOp::SRem if a == signed_min && is_minus_one => {
            return Err(Trap::new(format!(
                "signed overflow in '{op}' on i{bits}"
            )));
        }
        BinaryOp::UDiv => a / b,
        BinaryOp::URem => a % b,
        BinaryOp::SDiv => sign_extend(a, bits).wrapping_div(sign_extend(b, bits)) as u64,
        BinaryOp::SRem => sign_extend(a, bits).wrapping_rem(sign_extend(b, bits)) as u64,
        BinaryOp::And => a & b,
        BinaryOp::Or => a | b,
        BinaryOp::Xor => a ^ b,
        BinaryOp::Shl | BinaryOp::LShr | BinaryOp::AShr if b >= u64::from(bits) => {
            return Err(Trap::new(format!(
                "shift amount {b} is not less than the width of i{bits}"
            )));
        }
        BinaryOp::Shl => a << b,
        BinaryOp::LShr => a >> b,
        BinaryOp::AShr => (sign_extend(a, bits) >> b) as u64,
    };
    Ok(truncate(value, bits))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapping_arithmetic() {
        assert_eq!(binary_op(BinaryOp::Add, 32, 0, 1337), Ok(1337));
        assert_eq!(binary_op(BinaryOp::Add, 8, 0xff, 1), Ok(0));
        assert_eq!(binary_op(BinaryOp::Sub, 32, 0, 1), Ok(0xffff_ffff));
        assert_eq!(binary_op(BinaryOp::Mul, 64, u64::MAX, 2), Ok(u64::MAX - 1));
    }

    #[test]
    fn signed_division() {
        let minus_seven = truncate(-7i64 as u64, 32);
        assert_eq!(
            binary_op(BinaryOp::SDiv, 32, minus_seven, 2),
            Ok(truncate(-3i64 as u64, 32))
        );
        assert_eq!(
            binary_op(BinaryOp::SRem, 32, minus_seven, 2),
            Ok(truncate(-1i64 as u64, 32))
        );
        assert_eq!(binary_op(BinaryOp::UDiv, 32, minus_seven, 2), Ok(0x7fff_fffc));
    }

    #[test]
    fn division_traps() {
        assert!(binary_op(BinaryOp::UDiv, 32, 1, 0).is_err());
        assert!(binary_op(BinaryOp::SRem, 32, 1, 0).is_err());
        assert!(binary_op(BinaryOp::SDiv, 8, 0x80, 0xff).is_err());
        assert!(binary_op(BinaryOp::SDiv, 64, 1 << 63, u64::MAX).is_err());
        assert_eq!(binary_op(BinaryOp::SDiv, 8, 0x80, 1), Ok(0x80));
    }

    #[test]
    fn shifts() {
        assert_eq!(binary_op(BinaryOp::Shl, 8, 0x81, 1), Ok(0x02));
        assert_eq!(binary_op(BinaryOp::LShr, 8, 0x80, 7), Ok(0x01));
        assert_eq!(binary_op(BinaryOp::AShr, 8, 0x80, 7), Ok(0xff));
        assert!(binary_op(BinaryOp::Shl, 32, 1, 32).is_err());
    }

    #[test]
    fn bitwise() {
        assert_eq!(binary_op(BinaryOp::And, 32, 0b1100, 0b1010), Ok(0b1000));
        assert_eq!(binary_op(BinaryOp::Or, 32, 0b1100, 0b1010), Ok(0b1110));
        assert_eq!(binary_op(BinaryOp::Xor, 1, 1, 1), Ok(0));
    }

    #[test]
    fn frame_locals() {
        let mut frame = StackFrame::new(2, BlockId::new(0));
        frame.set_local(LocalId::new(1), GenericValue::i32(4)).unwrap();
        assert_eq!(frame.get_local(LocalId::new(1)), Ok(GenericValue::i32(4)));
        assert!(frame.get_local(LocalId::new(2)).is_err());
    }
}
