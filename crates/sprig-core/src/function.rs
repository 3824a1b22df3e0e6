//! Functions and basic blocks.

use crate::{BlockId, Instruction, LocalId, TypeHash, Value};

/// Symbol visibility of a function or global.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Linkage {
    /// Visible outside the module.
    #[default]
    External,
    /// Module-local, but keeps its name in the symbol table.
    Internal,
    /// Module-local and never referenced by name from outside.
    Private,
}

impl Linkage {
    /// The textual IR keyword, including a trailing space, or empty for
    /// external linkage.
    pub fn keyword(self) -> &'static str {
        match self {
            Linkage::External => "",
            Linkage::Internal => "internal ",
            Linkage::Private => "private ",
        }
    }
}

/// A function signature: return type, fixed parameter types, variadic tail.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    pub ret: TypeHash,
    pub params: Vec<TypeHash>,
    pub variadic: bool,
}

impl Signature {
    /// Create a signature.
    pub fn new(ret: TypeHash, params: impl Into<Vec<TypeHash>>, variadic: bool) -> Self {
        Self {
            ret,
            params: params.into(),
            variadic,
        }
    }

    /// Hash identifying this signature.
    pub fn hash(&self) -> TypeHash {
        TypeHash::from_signature(self.ret, &self.params, self.variadic)
    }
}

/// Where a local value is defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocalDef {
    /// The n-th function parameter.
    Param(u32),
    /// The instruction at `index` in `block`.
    Instruction { block: BlockId, index: u32 },
}

/// A function-local SSA value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalValue {
    /// Source name, if any. Unnamed values are numbered when printed.
    pub name: Option<String>,
    pub ty: TypeHash,
    pub def: LocalDef,
}

/// A straight-line instruction sequence ending in one terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicBlock {
    label: String,
    instructions: Vec<Instruction>,
}

impl BasicBlock {
    /// Create an empty block.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            instructions: Vec::new(),
        }
    }

    /// The block label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Instructions in program order.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// The last instruction, if it is a terminator.
    pub fn terminator(&self) -> Option<&Instruction> {
        self.instructions.last().filter(|inst| inst.is_terminator())
    }

    /// Whether the block already ends in a terminator.
    pub fn is_terminated(&self) -> bool {
        self.terminator().is_some()
    }

    /// Append an instruction, returning its index.
    ///
    /// No checks are performed here; the emitter refuses to append after a
    /// terminator and the verifier rejects malformed blocks.
    pub fn push(&mut self, inst: Instruction) -> u32 {
        self.instructions.push(inst);
        (self.instructions.len() - 1) as u32
    }

    /// Number of instructions.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Check if the block has no instructions.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

/// A named, typed callable unit owning an ordered list of basic blocks.
///
/// The first block is the entry block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    name: String,
    signature: Signature,
    linkage: Linkage,
    blocks: Vec<BasicBlock>,
    locals: Vec<LocalValue>,
}

impl Function {
    /// Create a function with no blocks. One unnamed local is created per
    /// parameter.
    pub fn new(name: impl Into<String>, signature: Signature, linkage: Linkage) -> Self {
        let locals = signature
            .params
            .iter()
            .enumerate()
            .map(|(i, ty)| LocalValue {
                name: None,
                ty: *ty,
                def: LocalDef::Param(i as u32),
            })
            .collect();
        Self {
            name: name.into(),
            signature,
            linkage,
            blocks: Vec::new(),
            locals,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn linkage(&self) -> Linkage {
        self.linkage
    }

    /// Blocks in creation order.
    pub fn blocks(&self) -> &[BasicBlock] {
        &self.blocks
    }

    /// Look up a block.
    pub fn block(&self, id: BlockId) -> Option<&BasicBlock> {
        self.blocks.get(id.as_usize())
    }

    /// Look up a block mutably.
    pub fn block_mut(&mut self, id: BlockId) -> Option<&mut BasicBlock> {
        self.blocks.get_mut(id.as_usize())
    }

    /// Find a block by label.
    pub fn block_by_label(&self, label: &str) -> Option<BlockId> {
        self.blocks
            .iter()
            .position(|b| b.label == label)
            .map(|i| BlockId::new(i as u32))
    }

    /// The entry block, if any block has been created.
    pub fn entry_block(&self) -> Option<BlockId> {
        (!self.blocks.is_empty()).then(|| BlockId::new(0))
    }

    /// Append a new, empty block.
    pub fn add_block(&mut self, label: impl Into<String>) -> BlockId {
        self.blocks.push(BasicBlock::new(label));
        BlockId::new((self.blocks.len() - 1) as u32)
    }

    /// All local values, parameters first.
    pub fn locals(&self) -> &[LocalValue] {
        &self.locals
    }

    /// Look up a local value.
    pub fn local(&self, id: LocalId) -> Option<&LocalValue> {
        self.locals.get(id.as_usize())
    }

    /// Register a new local value.
    pub fn add_local(&mut self, name: Option<String>, ty: TypeHash, def: LocalDef) -> LocalId {
        self.locals.push(LocalValue { name, ty, def });
        LocalId::new((self.locals.len() - 1) as u32)
    }

    /// Check if a local with this name exists.
    pub fn has_local_named(&self, name: &str) -> bool {
        self.locals.iter().any(|l| l.name.as_deref() == Some(name))
    }

    /// The value of the n-th parameter.
    pub fn param(&self, index: usize) -> Option<Value> {
        self.signature
            .params
            .get(index)
            .map(|ty| Value::local(LocalId::new(index as u32), *ty))
    }
}
