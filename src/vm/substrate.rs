//! Process-wide execution substrate.
//!
//! The standard host symbol table is built once per process, the first time
//! any engine is created, and shared by every engine after that.

use lazy_static::lazy_static;
use tracing::info;

use sprig_modules::HostSymbols;

/// State shared by every execution engine in the process.
#[derive(Debug)]
pub struct Substrate {
    host_symbols: HostSymbols,
}

impl Substrate {
    fn initialize() -> Self {
        let host_symbols = HostSymbols::standard();
        info!(symbols = ?host_symbols.names(), "execution substrate initialized");
        Self { host_symbols }
    }

    /// The process's standard host routines.
    pub fn host_symbols(&self) -> &HostSymbols {
        &self.host_symbols
    }
}

lazy_static! {
    static ref SUBSTRATE: Substrate = Substrate::initialize();
}

/// Initialize the substrate if this is the first call in the process.
/// Later calls return the same instance.
pub fn ensure_initialized() -> &'static Substrate {
    lazy_static::initialize(&SUBSTRATE);
    &SUBSTRATE
}
