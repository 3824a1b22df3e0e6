//! Module - the translation unit being built.
//!
//! A [`Module`] owns everything constructed for one program: its types,
//! pooled constants, global strings, external declarations and functions.
//! All names share one symbol namespace, so a function, an external and a
//! global can never collide.
//!
//! # Example
//!
//! ```
//! use sprig_core::{Linkage, primitives};
//! use sprig_registry::Module;
//!
//! let mut module = Module::new("test");
//! let printf = module
//!     .declare_external("printf", primitives::I32, vec![primitives::I8_PTR], true)
//!     .unwrap();
//! let main = module
//!     .create_function("main", primitives::VOID, vec![], Linkage::External)
//!     .unwrap();
//! let entry = module.create_block(main, "entrypoint").unwrap();
//!
//! assert_eq!(module.external_by_name("printf"), Some(printf));
//! assert_eq!(module.function(main).unwrap().entry_block(), Some(entry.block));
//! ```

use rustc_hash::FxHashMap;
use tracing::debug;

use sprig_core::generic_value::truncate;
use sprig_core::{
    BlockRef, ConstantId, ExternId, ExternalDecl, Function, FunctionId, GlobalFlags, GlobalId,
    GlobalString, IntConstant, Linkage, RegistrationError, Signature, TypeHash, Value,
    primitives,
};

use crate::{ConstantPool, TypeRegistry};

/// What a module-level name refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbol {
    Function(FunctionId),
    External(ExternId),
    Global(GlobalId),
}

impl Symbol {
    /// Human-readable kind, used in logs.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Symbol::Function(_) => "function",
            Symbol::External(_) => "external",
            Symbol::Global(_) => "global",
        }
    }
}

/// A translation unit under construction.
#[derive(Debug, Clone)]
pub struct Module {
    name: String,
    types: TypeRegistry,
    constants: ConstantPool,
    functions: Vec<Function>,
    externals: Vec<ExternalDecl>,
    globals: Vec<GlobalString>,
    symbols: FxHashMap<String, Symbol>,
    entry_point: Option<String>,
}

impl Module {
    /// Create a fresh, empty module with the primitive types registered.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        debug!(module = %name, "creating module");
        Self {
            name,
            types: TypeRegistry::with_primitives(),
            constants: ConstantPool::new(),
            functions: Vec::new(),
            externals: Vec::new(),
            globals: Vec::new(),
            symbols: FxHashMap::default(),
            entry_point: None,
        }
    }

    /// Module identifier.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The module's type registry.
    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    /// Mutable access to the type registry, for building new types.
    pub fn types_mut(&mut self) -> &mut TypeRegistry {
        &mut self.types
    }

    /// The module's constant pool.
    pub fn constants(&self) -> &ConstantPool {
        &self.constants
    }

    // ==========================================================================
    // Constants
    // ==========================================================================

    /// Create an integer constant of type `ty`.
    ///
    /// `value` is truncated to the type's width. Identical constants share
    /// one pool entry.
    pub fn const_int(&mut self, ty: TypeHash, value: i64) -> Result<Value, RegistrationError> {
        let bits = self.types.int_bits(ty).ok_or_else(|| {
            RegistrationError::InvalidType(format!(
                "integer constant of non-integer type {}",
                self.types.name(ty)
            ))
        })?;
        let constant = IntConstant {
            ty,
            bits,
            value: truncate(value as u64, bits),
        };
        let id = self.constants.add(constant);
        Ok(Value::constant(id, ty))
    }

    /// Shorthand for an `i32` constant.
    pub fn const_i32(&mut self, value: i32) -> Value {
        let id = self.constants.add(IntConstant {
            ty: primitives::I32,
            bits: 32,
            value: value as u32 as u64,
        });
        Value::constant(id, primitives::I32)
    }

    /// Get a pooled constant.
    pub fn constant(&self, id: ConstantId) -> Option<&IntConstant> {
        self.constants.get(id)
    }

    /// Register a private, NUL-terminated global string named `name`.
    ///
    /// Returns an `i8*` value pointing at the first byte.
    pub fn global_string(
        &mut self,
        text: impl AsRef<[u8]>,
        name: &str,
    ) -> Result<Value, RegistrationError> {
        if name.is_empty() {
            return Err(RegistrationError::InvalidName(
                "global string name must not be empty".to_string(),
            ));
        }
        if self.symbols.contains_key(name) {
            return Err(RegistrationError::DuplicateGlobal {
                name: name.to_string(),
            });
        }

        let mut bytes = text.as_ref().to_vec();
        bytes.push(0);
        let ty = self.types.array_of(primitives::I8, bytes.len() as u64)?;

        let id = GlobalId::new(self.globals.len() as u32);
        debug!(global = name, len = bytes.len(), "registering global string");
        self.globals.push(GlobalString {
            name: name.to_string(),
            bytes,
            ty,
            linkage: Linkage::Private,
            flags: GlobalFlags::CONSTANT | GlobalFlags::UNNAMED_ADDR,
        });
        self.symbols.insert(name.to_string(), Symbol::Global(id));
        Ok(Value::global(id, primitives::I8_PTR))
    }

    // ==========================================================================
    // Functions and blocks
    // ==========================================================================

    /// Create a function definition.
    pub fn create_function(
        &mut self,
        name: &str,
        ret: TypeHash,
        params: impl Into<Vec<TypeHash>>,
        linkage: Linkage,
    ) -> Result<FunctionId, RegistrationError> {
        self.check_new_symbol(name)?;
        let params = params.into();
        self.check_signature_types(ret, &params)?;

        let id = FunctionId::new(self.functions.len() as u32);
        let signature = Signature::new(ret, params, false);
        debug!(
            function = name,
            signature = %self.types.signature_string(&signature),
            "creating function"
        );
        self.functions.push(Function::new(name, signature, linkage));
        self.symbols.insert(name.to_string(), Symbol::Function(id));
        Ok(id)
    }

    /// The value of a function parameter.
    pub fn param(&self, function: FunctionId, index: usize) -> Option<Value> {
        self.function(function)?.param(index)
    }

    /// Append a block to a function. The first block becomes the entry.
    ///
    /// Labels share one namespace with the function's value names.
    pub fn create_block(
        &mut self,
        function: FunctionId,
        label: &str,
    ) -> Result<BlockRef, RegistrationError> {
        if label.is_empty() {
            return Err(RegistrationError::InvalidName(
                "block label must not be empty".to_string(),
            ));
        }
        let func = self
            .functions
            .get_mut(function.as_usize())
            .ok_or(RegistrationError::UnknownFunction(function))?;
        if func.block_by_label(label).is_some() || func.has_local_named(label) {
            return Err(RegistrationError::DuplicateLabel {
                function: func.name().to_string(),
                label: label.to_string(),
            });
        }
        let block = func.add_block(label);
        debug!(function = func.name(), label, "creating block");
        Ok(BlockRef::new(function, block))
    }

    /// Get a function by id.
    pub fn function(&self, id: FunctionId) -> Option<&Function> {
        self.functions.get(id.as_usize())
    }

    /// Get a mutable function by id.
    pub fn function_mut(&mut self, id: FunctionId) -> Option<&mut Function> {
        self.functions.get_mut(id.as_usize())
    }

    /// All function definitions, in creation order.
    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    /// Iterate function ids with their definitions.
    pub fn function_ids(&self) -> impl Iterator<Item = (FunctionId, &Function)> {
        self.functions
            .iter()
            .enumerate()
            .map(|(i, f)| (FunctionId::new(i as u32), f))
    }

    /// Look up a function definition by name.
    pub fn function_by_name(&self, name: &str) -> Option<FunctionId> {
        match self.symbols.get(name) {
            Some(Symbol::Function(id)) => Some(*id),
            _ => None,
        }
    }

    // ==========================================================================
    // External declarations
    // ==========================================================================

    /// Declare a routine resolved by the host at run time.
    ///
    /// Re-declaring the same name with an identical signature returns the
    /// existing declaration.
    pub fn declare_external(
        &mut self,
        name: &str,
        ret: TypeHash,
        params: impl Into<Vec<TypeHash>>,
        variadic: bool,
    ) -> Result<ExternId, RegistrationError> {
        let signature = Signature::new(ret, params, variadic);

        if let Some(symbol) = self.symbols.get(name) {
            return match *symbol {
                Symbol::External(id) => {
                    let existing = &self.externals[id.as_usize()];
                    if existing.hash() == signature.hash() {
                        Ok(id)
                    } else {
                        Err(RegistrationError::SignatureConflict {
                            name: name.to_string(),
                            existing: self.types.signature_string(&existing.signature),
                            requested: self.types.signature_string(&signature),
                        })
                    }
                }
                _ => Err(RegistrationError::DuplicateSymbol {
                    name: name.to_string(),
                }),
            };
        }

        self.check_new_symbol(name)?;
        self.check_signature_types(signature.ret, &signature.params)?;

        let id = ExternId::new(self.externals.len() as u32);
        debug!(
            external = name,
            signature = %self.types.signature_string(&signature),
            "declaring external"
        );
        self.externals.push(ExternalDecl {
            name: name.to_string(),
            signature,
        });
        self.symbols.insert(name.to_string(), Symbol::External(id));
        Ok(id)
    }

    /// Get an external declaration by id.
    pub fn external(&self, id: ExternId) -> Option<&ExternalDecl> {
        self.externals.get(id.as_usize())
    }

    /// All external declarations, in declaration order.
    pub fn externals(&self) -> &[ExternalDecl] {
        &self.externals
    }

    /// Look up an external declaration by name.
    pub fn external_by_name(&self, name: &str) -> Option<ExternId> {
        match self.symbols.get(name) {
            Some(Symbol::External(id)) => Some(*id),
            _ => None,
        }
    }

    // ==========================================================================
    // Globals
    // ==========================================================================

    /// Get a global string by id.
    pub fn global(&self, id: GlobalId) -> Option<&GlobalString> {
        self.globals.get(id.as_usize())
    }

    /// All global strings, in creation order.
    pub fn globals(&self) -> &[GlobalString] {
        &self.globals
    }

    /// Look up a global string by name.
    pub fn global_by_name(&self, name: &str) -> Option<GlobalId> {
        match self.symbols.get(name) {
            Some(Symbol::Global(id)) => Some(*id),
            _ => None,
        }
    }

    /// What a name refers to, if anything.
    pub fn symbol(&self, name: &str) -> Option<Symbol> {
        self.symbols.get(name).copied()
    }

    // ==========================================================================
    // Entry point
    // ==========================================================================

    /// Designate the program's entry function by name.
    ///
    /// The name is checked by the verifier, not here.
    pub fn set_entry_point(&mut self, name: impl Into<String>) {
        self.entry_point = Some(name.into());
    }

    /// The designated entry function name.
    pub fn entry_point(&self) -> Option<&str> {
        self.entry_point.as_deref()
    }

    // ==========================================================================
    // Validation helpers
    // ==========================================================================

    fn check_new_symbol(&self, name: &str) -> Result<(), RegistrationError> {
        if name.is_empty() {
            return Err(RegistrationError::InvalidName(
                "symbol name must not be empty".to_string(),
            ));
        }
        if let Some(existing) = self.symbols.get(name) {
            debug!(name, kind = existing.kind_name(), "symbol already defined");
            return Err(RegistrationError::DuplicateSymbol {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    fn check_signature_types(
        &self,
        ret: TypeHash,
        params: &[TypeHash],
    ) -> Result<(), RegistrationError> {
        self.types.require_return_type(ret)?;
        for param in params {
            self.types.require_first_class(*param)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_function_name() {
        let mut m = Module::new("test");
        m.create_function("main", primitives::VOID, vec![], Linkage::External)
            .unwrap();
        let err = m
            .create_function("main", primitives::I32, vec![], Linkage::Internal)
            .unwrap_err();
        assert_eq!(
            err,
            RegistrationError::DuplicateSymbol {
                name: "main".into()
            }
        );
        assert_eq!(m.functions().len(), 1);
    }

    #[test]
    fn duplicate_block_label() {
        let mut m = Module::new("test");
        let f = m
            .create_function("main", primitives::VOID, vec![], Linkage::External)
            .unwrap();
        let entry = m.create_block(f, "entrypoint").unwrap();
        let err = m.create_block(f, "entrypoint").unwrap_err();
        assert!(matches!(err, RegistrationError::DuplicateLabel { ref label, .. } if label == "entrypoint"));
        assert_eq!(m.function(f).unwrap().entry_block(), Some(entry.block));
        assert_eq!(m.function(f).unwrap().blocks().len(), 1);
    }

    #[test]
    fn label_clashing_with_value_name() {
        let mut m = Module::new("test");
        let f = m
            .create_function("f", primitives::VOID, vec![primitives::I32], Linkage::External)
            .unwrap();
        m.create_block(f, "entry").unwrap();
        let func = m.function_mut(f).unwrap();
        func.add_local(
            Some("x".to_string()),
            primitives::I32,
            sprig_core::LocalDef::Param(0),
        );
        assert_eq!(
            m.create_block(f, "x"),
            Err(RegistrationError::DuplicateLabel {
                function: "f".into(),
                label: "x".into(),
            })
        );
    }

    #[test]
    fn empty_label_rejected() {
        let mut m = Module::new("test");
        let f = m
            .create_function("main", primitives::VOID, vec![], Linkage::External)
            .unwrap();
        assert!(matches!(
            m.create_block(f, ""),
            Err(RegistrationError::InvalidName(_))
        ));
    }

    #[test]
    fn block_in_unknown_function() {
        let mut m = Module::new("test");
        assert_eq!(
            m.create_block(FunctionId::new(3), "entry"),
            Err(RegistrationError::UnknownFunction(FunctionId::new(3)))
        );
    }

    #[test]
    fn external_idempotent() {
        let mut m = Module::new("test");
        let a = m
            .declare_external("printf", primitives::I32, vec![primitives::I8_PTR], true)
            .unwrap();
        let b = m
            .declare_external("printf", primitives::I32, vec![primitives::I8_PTR], true)
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(m.externals().len(), 1);
    }

    #[test]
    fn external_signature_conflict() {
        let mut m = Module::new("test");
        let a = m
            .declare_external("printf", primitives::I32, vec![primitives::I8_PTR], true)
            .unwrap();
        let err = m
            .declare_external("printf", primitives::VOID, vec![primitives::I8_PTR], true)
            .unwrap_err();
        assert_eq!(
            err,
            RegistrationError::SignatureConflict {
                name: "printf".into(),
                existing: "i32 (i8*, ...)".into(),
                requested: "void (i8*, ...)".into(),
            }
        );
        assert_eq!(m.external_by_name("printf"), Some(a));
        assert_eq!(m.external(a).unwrap().signature.ret, primitives::I32);
    }

    #[test]
    fn variadic_flag_is_part_of_signature() {
        let mut m = Module::new("test");
        m.declare_external("printf", primitives::I32, vec![primitives::I8_PTR], true)
            .unwrap();
        assert!(matches!(
            m.declare_external("printf", primitives::I32, vec![primitives::I8_PTR], false),
            Err(RegistrationError::SignatureConflict { .. })
        ));
    }

    #[test]
    fn external_cannot_shadow_function() {
        let mut m = Module::new("test");
        m.create_function("main", primitives::VOID, vec![], Linkage::External)
            .unwrap();
        assert!(matches!(
            m.declare_external("main", primitives::VOID, vec![], false),
            Err(RegistrationError::DuplicateSymbol { .. })
        ));
    }

    #[test]
    fn global_string_layout() {
        let mut m = Module::new("test");
        let v = m.global_string("Hello World: %d!\n", "fmtStr").unwrap();
        assert_eq!(v.ty(), primitives::I8_PTR);

        let id = m.global_by_name("fmtStr").unwrap();
        let g = m.global(id).unwrap();
        assert_eq!(g.bytes.len(), 18);
        assert_eq!(g.bytes.last(), Some(&0));
        assert_eq!(m.types().name(g.ty), "[18 x i8]");
        assert_eq!(g.linkage, Linkage::Private);
        assert!(g.flags.contains(GlobalFlags::CONSTANT | GlobalFlags::UNNAMED_ADDR));
    }

    #[test]
    fn duplicate_global_name() {
        let mut m = Module::new("test");
        m.global_string("a", "s").unwrap();
        assert_eq!(
            m.global_string("b", "s"),
            Err(RegistrationError::DuplicateGlobal { name: "s".into() })
        );
        assert_eq!(m.globals().len(), 1);
        assert_eq!(m.globals()[0].text(), b"a");
    }

    #[test]
    fn constants_are_truncated_and_pooled() {
        let mut m = Module::new("test");
        let a = m.const_int(primitives::I8, 300).unwrap();
        let b = m.const_int(primitives::I8, 44).unwrap();
        assert_eq!(a, b);

        let neg = m.const_int(primitives::I32, -1).unwrap();
        let sugar = m.const_i32(-1);
        assert_eq!(neg, sugar);
        match neg.kind() {
            sprig_core::ValueKind::Constant(id) => {
                let c = m.constant(id).unwrap();
                assert_eq!(c.value, 0xffff_ffff);
                assert_eq!(c.as_signed(), -1);
            }
            other => panic!("expected constant, got {other:?}"),
        }
    }

    #[test]
    fn constant_of_non_integer_type() {
        let mut m = Module::new("test");
        assert!(matches!(
            m.const_int(primitives::I8_PTR, 0),
            Err(RegistrationError::InvalidType(_))
        ));
    }

    #[test]
    fn function_params() {
        let mut m = Module::new("test");
        let f = m
            .create_function(
                "add2",
                primitives::I32,
                vec![primitives::I32, primitives::I32],
                Linkage::Internal,
            )
            .unwrap();
        assert_eq!(m.param(f, 1).map(|v| v.ty()), Some(primitives::I32));
        assert_eq!(m.param(f, 2), None);
    }

    #[test]
    fn void_param_rejected() {
        let mut m = Module::new("test");
        assert!(matches!(
            m.create_function("f", primitives::VOID, vec![primitives::VOID], Linkage::External),
            Err(RegistrationError::InvalidType(_))
        ));
        assert_eq!(m.symbol("f"), None);
    }

    #[test]
    fn entry_point_designation() {
        let mut m = Module::new("test");
        assert_eq!(m.entry_point(), None);
        m.set_entry_point("main");
        assert_eq!(m.entry_point(), Some("main"));
    }
}
