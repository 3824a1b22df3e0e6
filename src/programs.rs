//! Sample programs built through the module and emitter APIs.

use tracing::debug;

use sprig_compiler::InstructionEmitter;
use sprig_core::{Linkage, SprigError, primitives};
use sprig_registry::Module;

use crate::config::PipelineConfig;

/// Declare the C `printf`: `i32 (i8*, ...)`.
fn declare_printf(module: &mut Module) -> Result<sprig_core::ExternId, SprigError> {
    Ok(module.declare_external("printf", primitives::I32, vec![primitives::I8_PTR], true)?)
}

/// `void main()` that computes `0 + 1337` and prints it with
/// `"Hello World: %d!\n"`.
pub fn hello_world(config: &PipelineConfig) -> Result<Module, SprigError> {
    let mut module = Module::new(&config.module_name);
    let main = module.create_function(
        &config.entry_point,
        primitives::VOID,
        vec![],
        Linkage::External,
    )?;
    module.set_entry_point(&config.entry_point);
    let entry = module.create_block(main, "entrypoint")?;
    let printf = declare_printf(&mut module)?;
    let format = module.global_string("Hello World: %d!\n", "fmtStr")?;
    let zero = module.const_i32(0);
    let value = module.const_i32(1337);

    let mut emitter = InstructionEmitter::new(&mut module);
    emitter.position_at_end(entry)?;
    let result = emitter.add(zero, value, "result")?;
    emitter.call(printf, &[format, result], "")?;
    emitter.ret_void()?;

    debug!(module = %config.module_name, "built hello_world");
    Ok(module)
}

/// `void main()` that prints the literal `"Hello World!"`.
pub fn greeting(config: &PipelineConfig) -> Result<Module, SprigError> {
    let mut module = Module::new(&config.module_name);
    let main = module.create_function(
        &config.entry_point,
        primitives::VOID,
        vec![],
        Linkage::External,
    )?;
    module.set_entry_point(&config.entry_point);
    let entry = module.create_block(main, "entrypoint")?;
    let printf = declare_printf(&mut module)?;
    let text = module.global_string("Hello World!", "greeting")?;

    let mut emitter = InstructionEmitter::new(&mut module);
    emitter.position_at_end(entry)?;
    emitter.call(printf, &[text], "")?;
    emitter.ret_void()?;

    debug!(module = %config.module_name, "built greeting");
    Ok(module)
}
