//! Textual IR writer.
//!
//! [`AsmWriter`] renders a module as LLVM-style assembly with typed
//! pointers. Rendering is pure; [`write_to_file`] persists the text.
//!
//! Layout: module header, then global strings, then defined functions, then
//! external declarations, each group in creation order.

use std::fmt::{self, Write as _};
use std::fs::File;
use std::io::Write as _;
use std::path::Path;

use tracing::info;

use sprig_core::{
    Function, GlobalFlags, GlobalString, Instruction, LocalDef, SerializeError, TypeHash, Value,
    ValueKind,
};
use sprig_registry::Module;

/// Renders a module as text.
pub struct AsmWriter<'a> {
    module: &'a Module,
}

impl<'a> AsmWriter<'a> {
    /// Create a writer over `module`.
    pub fn new(module: &'a Module) -> Self {
        Self { module }
    }

    /// Render `module` to a string.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn render(module: &Module) -> String {
        AsmWriter::new(module).to_string()
    }

    fn write_global(&self, f: &mut fmt::Formatter<'_>, global: &GlobalString) -> fmt::Result {
        write!(f, "@{} = {}", ident(&global.name), global.linkage.keyword())?;
        if global.flags.contains(GlobalFlags::UNNAMED_ADDR) {
            f.write_str("unnamed_addr ")?;
        }
        let kind = if global.flags.contains(GlobalFlags::CONSTANT) {
            "constant"
        } else {
            "global"
        };
        writeln!(
            f,
            "{kind} {} c\"{}\", align 1",
            self.type_name(global.ty),
            escape_bytes(&global.bytes)
        )
    }

    fn write_function(&self, f: &mut fmt::Formatter<'_>, func: &Function) -> fmt::Result {
        let slots = SlotTracker::new(func);
        let sig = func.signature();

        write!(
            f,
            "define {}{} @{}(",
            func.linkage().keyword(),
            self.type_name(sig.ret),
            ident(func.name())
        )?;
        for (index, ty) in sig.params.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{} {}", self.type_name(*ty), slots.name(index))?;
        }
        f.write_str(") {\n")?;

        for (index, block) in func.blocks().iter().enumerate() {
            if index > 0 {
                f.write_str("\n")?;
            }
            writeln!(f, "{}:", ident(block.label()))?;
            for inst in block.instructions() {
                f.write_str("  ")?;
                self.write_instruction(f, func, &slots, inst)?;
                f.write_str("\n")?;
            }
        }
        f.write_str("}\n")
    }

    fn write_instruction(
        &self,
        f: &mut fmt::Formatter<'_>,
        func: &Function,
        slots: &SlotTracker,
        inst: &Instruction,
    ) -> fmt::Result {
        match inst {
            Instruction::Binary {
                op,
                result,
                lhs,
                rhs,
            } => write!(
                f,
                "{} = {op} {} {}, {}",
                slots.name(result.as_usize()),
                self.type_name(lhs.ty()),
                self.operand(slots, lhs),
                self.operand(slots, rhs)
            ),
            Instruction::Call {
                callee,
                args,
                result,
            } => {
                if let Some(result) = result {
                    write!(f, "{} = ", slots.name(result.as_usize()))?;
                }
                let (callee_ty, callee_name) = match self.module.external(*callee) {
                    Some(decl) if decl.signature.variadic => (
                        self.module.types().signature_string(&decl.signature),
                        ident(&decl.name),
                    ),
                    Some(decl) => (
                        self.type_name(decl.signature.ret).to_string(),
                        ident(&decl.name),
                    ),
                    None => ("void".to_string(), format!("<{callee}>")),
                };
                write!(f, "call {callee_ty} @{callee_name}(")?;
                for (index, arg) in args.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    self.write_typed(f, slots, arg)?;
                }
                f.write_str(")")
            }
            Instruction::Ret { value: None } => f.write_str("ret void"),
            Instruction::Ret { value: Some(v) } => {
                f.write_str("ret ")?;
                self.write_typed(f, slots, v)
            }
            Instruction::Br { target } => {
                let label = func
                    .block(*target)
                    .map(|b| ident(b.label()))
                    .unwrap_or_else(|| target.to_string());
                write!(f, "br label %{label}")
            }
        }
    }

    fn write_typed(&self, f: &mut fmt::Formatter<'_>, slots: &SlotTracker, v: &Value) -> fmt::Result {
        write!(f, "{} {}", self.type_name(v.ty()), self.operand(slots, v))
    }

    /// An operand without its type prefix.
    fn operand(&self, slots: &SlotTracker, v: &Value) -> String {
        match v.kind() {
            ValueKind::Constant(id) => match self.module.constant(id) {
                Some(c) if c.bits == 1 => {
                    let text = if c.value & 1 == 1 { "true" } else { "false" };
                    text.to_string()
                }
                Some(c) => c.as_signed().to_string(),
                None => format!("<{id}>"),
            },
            ValueKind::Global(id) => match self.module.global(id) {
                Some(g) => {
                    let arr = self.type_name(g.ty);
                    format!(
                        "getelementptr inbounds ({arr}, {arr}* @{}, i32 0, i32 0)",
                        ident(&g.name)
                    )
                }
                None => format!("<{id}>"),
            },
            ValueKind::Local(id) => slots.name(id.as_usize()),
        }
    }

    fn type_name(&self, ty: TypeHash) -> &str {
        self.module.types().name(ty)
    }
}

impl fmt::Display for AsmWriter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.module.name();
        writeln!(f, "; ModuleID = '{name}'")?;
        writeln!(f, "source_filename = \"{}\"", escape_bytes(name.as_bytes()))?;

        if !self.module.globals().is_empty() {
            f.write_str("\n")?;
            for global in self.module.globals() {
                self.write_global(f, global)?;
            }
        }

        for func in self.module.functions() {
            f.write_str("\n")?;
            self.write_function(f, func)?;
        }

        for decl in self.module.externals() {
            let sig = &decl.signature;
            writeln!(
                f,
                "\ndeclare {} @{}({})",
                self.type_name(sig.ret),
                ident(&decl.name),
                self.module.types().param_list(sig)
            )?;
        }
        Ok(())
    }
}

/// Printed names of a function's locals: `%name` for named values,
/// `%N` for the rest, numbered in definition order.
struct SlotTracker {
    names: Vec<String>,
}

impl SlotTracker {
    fn new(func: &Function) -> Self {
        let locals = func.locals();
        let mut names = vec![String::new(); locals.len()];
        let mut next = 0u32;
        let mut assign = |index: usize, names: &mut Vec<String>| {
            if let Some(slot) = names.get_mut(index) {
                *slot = match &locals[index].name {
                    Some(name) => format!("%{}", ident(name)),
                    None => {
                        let n = next;
                        next += 1;
                        format!("%{n}")
                    }
                };
            }
        };

        for (index, local) in locals.iter().enumerate() {
            if matches!(local.def, LocalDef::Param(_)) {
                assign(index, &mut names);
            }
        }
        for block in func.blocks() {
            for inst in block.instructions() {
                if let Some(result) = inst.result() {
                    assign(result.as_usize(), &mut names);
                }
            }
        }
        Self { names }
    }

    fn name(&self, index: usize) -> String {
        self.names
            .get(index)
            .filter(|n| !n.is_empty())
            .cloned()
            .unwrap_or_else(|| format!("%<undef.{index}>"))
    }
}

/// Quote a symbol name if it isn't a bare identifier.
fn ident(name: &str) -> String {
    let bare = !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'$' | b'.' | b'_'))
        && !name.as_bytes()[0].is_ascii_digit();
    if bare {
        name.to_string()
    } else {
        format!("\"{}\"", escape_bytes(name.as_bytes()))
    }
}

/// Escape bytes for a quoted string: printable ASCII is kept, `"`, `\` and
/// everything else become `\XX`.
fn escape_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &b in bytes {
        if (0x20..0x7f).contains(&b) && b != b'"' && b != b'\\' {
            out.push(b as char);
        } else {
            let _ = write!(out, "\\{b:02X}");
        }
    }
    out
}

/// Write rendered text to `path`, creating or truncating it.
///
/// The file is closed on every path, including failure.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn write_to_file(text: &str, path: impl AsRef<Path>) -> Result<(), SerializeError> {
    let path = path.as_ref();
    let io_err = |source| SerializeError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut file = File::create(path).map_err(io_err)?;
    file.write_all(text.as_bytes()).map_err(io_err)?;
    file.flush().map_err(io_err)?;
    info!(path = %path.display(), bytes = text.len(), "wrote textual IR");
    Ok(())
}
