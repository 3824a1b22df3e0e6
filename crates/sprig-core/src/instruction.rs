//! Instructions.

use std::fmt;

use crate::{BlockId, ExternId, LocalId, Value};

/// Integer binary operations. All wrap at the operand width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    /// Signed division. Division by zero traps at run time.
    SDiv,
    /// Unsigned division. Division by zero traps at run time.
    UDiv,
    SRem,
    URem,
    And,
    Or,
    Xor,
    Shl,
    /// Logical shift right.
    LShr,
    /// Arithmetic shift right.
    AShr,
}

impl BinaryOp {
    /// Every binary operation, in opcode order.
    pub const ALL: [BinaryOp; 13] = [
        BinaryOp::Add,
        BinaryOp::Sub,
        BinaryOp::Mul,
        BinaryOp::SDiv,
        BinaryOp::UDiv,
        BinaryOp::SRem,
        BinaryOp::URem,
        BinaryOp::And,
        BinaryOp::Or,
        BinaryOp::Xor,
        BinaryOp::Shl,
        BinaryOp::LShr,
        BinaryOp::AShr,
    ];

    /// The mnemonic used in textual IR.
    pub fn mnemonic(self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::SDiv => "sdiv",
            BinaryOp::UDiv => "udiv",
            BinaryOp::SRem => "srem",
            BinaryOp::URem => "urem",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Xor => "xor",
            BinaryOp::Shl => "shl",
            BinaryOp::LShr => "lshr",
            BinaryOp::AShr => "ashr",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// A single IR instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// `result = op lhs, rhs`
    Binary {
        op: BinaryOp,
        result: LocalId,
        lhs: Value,
        rhs: Value,
    },
    /// Call to an external routine. `result` is `None` for void callees.
    Call {
        callee: ExternId,
        args: Vec<Value>,
        result: Option<LocalId>,
    },
    /// Return, with a value unless the function returns void.
    Ret { value: Option<Value> },
    /// Unconditional branch.
    Br { target: BlockId },
}

impl Instruction {
    /// Whether this instruction ends a basic block.
    #[inline]
    pub fn is_terminator(&self) -> bool {
        matches!(self, Instruction::Ret { .. } | Instruction::Br { .. })
    }

    /// The local this instruction defines, if any.
    #[inline]
    pub fn result(&self) -> Option<LocalId> {
        match self {
            Instruction::Binary { result, .. } => Some(*result),
            Instruction::Call { result, .. } => *result,
            Instruction::Ret { .. } | Instruction::Br { .. } => None,
        }
    }

    /// Operand values, in order.
    pub fn operands(&self) -> Vec<Value> {
        match self {
            Instruction::Binary { lhs, rhs, .. } => vec![*lhs, *rhs],
            Instruction::Call { args, .. } => args.clone(),
            Instruction::Ret { value } => value.iter().copied().collect(),
            Instruction::Br { .. } => Vec::new(),
        }
    }

    /// Successor blocks of a terminator.
    pub fn successors(&self) -> Vec<BlockId> {
        match self {
            Instruction::Br { target } => vec![*target],
            _ => Vec::new(),
        }
    }

    /// Short opcode name, for diagnostics and logging.
    pub fn opcode_name(&self) -> &'static str {
        match self {
            Instruction::Binary { op, .. } => op.mnemonic(),
            Instruction::Call { .. } => "call",
            Instruction::Ret { .. } => "ret",
            Instruction::Br { .. } => "br",
        }
    }
}
