//! Host function storage and call context.
//!
//! Interpreted code reaches the host through external declarations. Each
//! name is bound to a [`HostFn`], which receives a [`HostCall`] giving it the
//! call's arguments, read access to interpreter memory and the engine's
//! output stream.

use std::fmt;
use std::io::Write;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use sprig_core::{GenericValue, HostError};

/// A host routine callable from interpreted code.
pub type HostFn = Arc<dyn Fn(&mut HostCall<'_>) -> Result<GenericValue, HostError> + Send + Sync>;

/// Read-only window onto interpreter memory.
///
/// Addresses are absolute; `base` is the address of `bytes[0]`.
#[derive(Debug, Clone, Copy)]
pub struct MemoryView<'a> {
    base: u64,
    bytes: &'a [u8],
}

impl<'a> MemoryView<'a> {
    /// Create a view over `bytes` starting at address `base`.
    pub fn new(base: u64, bytes: &'a [u8]) -> Self {
        Self { base, bytes }
    }

    /// A view with nothing mapped.
    pub fn empty() -> Self {
        Self { base: 0, bytes: &[] }
    }

    fn offset(&self, address: u64) -> Result<usize, HostError> {
        if address == 0 || address < self.base {
            return Err(HostError::InvalidPointer { address });
        }
        let offset = (address - self.base) as usize;
        if offset >= self.bytes.len() {
            return Err(HostError::InvalidPointer { address });
        }
        Ok(offset)
    }

    /// Read one byte.
    pub fn read_byte(&self, address: u64) -> Result<u8, HostError> {
        let offset = self.offset(address)?;
        Ok(self.bytes[offset])
    }

    /// Read a NUL-terminated string, without the terminator.
    pub fn read_c_string(&self, address: u64) -> Result<&'a [u8], HostError> {
        let start = self.offset(address)?;
        let rest = &self.bytes[start..];
        let len = rest
            .iter()
            .position(|b| *b == 0)
            .ok_or(HostError::UnterminatedString { address })?;
        Ok(&rest[..len])
    }
}

/// Context for one host call.
pub struct HostCall<'a> {
    name: &'a str,
    args: &'a [GenericValue],
    memory: MemoryView<'a>,
    output: &'a mut dyn Write,
}

impl<'a> HostCall<'a> {
    /// Create a call context.
    ///
    /// # Arguments
    ///
    /// * `name` - The external symbol being called
    /// * `args` - Evaluated arguments, fixed then variadic
    /// * `memory` - Interpreter memory, for pointer arguments
    /// * `output` - Where program output goes
    pub fn new(
        name: &'a str,
        args: &'a [GenericValue],
        memory: MemoryView<'a>,
        output: &'a mut dyn Write,
    ) -> Self {
        Self {
            name,
            args,
            memory,
            output,
        }
    }

    /// The symbol being called.
    pub fn name(&self) -> &str {
        self.name
    }

    /// Number of arguments passed.
    pub fn arg_count(&self) -> usize {
        self.args.len()
    }

    /// All arguments.
    pub fn args(&self) -> &[GenericValue] {
        self.args
    }

    /// Get an argument.
    pub fn arg(&self, index: usize) -> Result<GenericValue, HostError> {
        self.args
            .get(index)
            .copied()
            .ok_or(HostError::MissingArgument { index })
    }

    /// Get an integer argument as `(bits, zero-extended value)`.
    pub fn arg_int(&self, index: usize) -> Result<(u32, u64), HostError> {
        match self.arg(index)? {
            GenericValue::Int { bits, value } => Ok((bits, value)),
            other => Err(bad_argument(index, "integer", &other)),
        }
    }

    /// Get a pointer argument.
    pub fn arg_pointer(&self, index: usize) -> Result<u64, HostError> {
        match self.arg(index)? {
            GenericValue::Pointer(address) => Ok(address),
            other => Err(bad_argument(index, "pointer", &other)),
        }
    }

    /// Read a NUL-terminated string from interpreter memory.
    pub fn read_c_string(&self, address: u64) -> Result<&'a [u8], HostError> {
        self.memory.read_c_string(address)
    }

    /// Interpreter memory.
    pub fn memory(&self) -> MemoryView<'a> {
        self.memory
    }

    /// The output stream.
    pub fn output(&mut self) -> &mut (dyn Write + 'a) {
        &mut *self.output
    }

    /// Write bytes to the output stream.
    pub fn write(&mut self, bytes: &[u8]) -> Result<(), HostError> {
        self.output
            .write_all(bytes)
            .map_err(|e| HostError::Output(e.to_string()))
    }
}

impl fmt::Debug for HostCall<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostCall")
            .field("name", &self.name)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

pub(crate) fn bad_argument(index: usize, expected: &str, actual: &GenericValue) -> HostError {
    HostError::BadArgument {
        index,
        expected: expected.to_string(),
        actual: actual.type_name(),
    }
}

/// Name-to-routine table the engine resolves external declarations against.
#[derive(Clone, Default)]
pub struct HostSymbols {
    symbols: FxHashMap<String, HostFn>,
}

impl HostSymbols {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table holding the C-style standard I/O routines.
    pub fn standard() -> Self {
        let mut symbols = Self::new();
        crate::stdio::register(&mut symbols);
        symbols
    }

    /// Bind `name`, replacing any earlier binding.
    pub fn insert<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&mut HostCall<'_>) -> Result<GenericValue, HostError> + Send + Sync + 'static,
    {
        self.symbols.insert(name.into(), Arc::new(f));
    }

    /// Bind `name` to an existing routine.
    pub fn insert_fn(&mut self, name: impl Into<String>, f: HostFn) {
        self.symbols.insert(name.into(), f);
    }

    /// Look up a routine.
    pub fn get(&self, name: &str) -> Option<HostFn> {
        self.symbols.get(name).cloned()
    }

    /// Check if a name is bound.
    pub fn contains(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }

    /// Bound names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.symbols.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of bound names.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Check if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl fmt::Debug for HostSymbols {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostSymbols")
            .field("names", &self.names())
            .finish()
    }
}
