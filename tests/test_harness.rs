// tests/test_harness.rs
//! Shared helpers for sprig integration tests.
#![allow(dead_code)]

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use sprig::{InstructionEmitter, Module};
use sprig_core::{BlockRef, ExternId, FunctionId, Linkage, primitives};

/// In-memory program output that stays readable after the engine takes
/// its writer.
#[derive(Clone, Default)]
pub struct SharedOutput(Rc<RefCell<Vec<u8>>>);

impl SharedOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, as UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for SharedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A module with `void main()`, an empty `entrypoint` block and `printf`
/// declared.
pub struct Skeleton {
    pub module: Module,
    pub main: FunctionId,
    pub entry: BlockRef,
    pub printf: ExternId,
}

impl Skeleton {
    pub fn new() -> Self {
        let mut module = Module::new("test");
        let main = module
            .create_function("main", primitives::VOID, vec![], Linkage::External)
            .expect("create main");
        module.set_entry_point("main");
        let entry = module.create_block(main, "entrypoint").expect("create block");
        let printf = module
            .declare_external("printf", primitives::I32, vec![primitives::I8_PTR], true)
            .expect("declare printf");
        Self {
            module,
            main,
            entry,
            printf,
        }
    }

    /// An emitter positioned at the end of the entry block.
    pub fn emitter(&mut self) -> InstructionEmitter<'_> {
        let mut emitter = InstructionEmitter::new(&mut self.module);
        emitter.position_at_end(self.entry).expect("position");
        emitter
    }
}
