//! C standard I/O routines.
//!
//! - `printf(i8*, ...) -> i32`
//! - `puts(i8*) -> i32`
//! - `putchar(i32) -> i32`
//!
//! Each returns what its C counterpart returns on success.

use tracing::trace;

use sprig_core::{GenericValue, HostError};

use crate::HostSymbols;
use crate::format::format_args;
use crate::host::HostCall;

/// Register the routines in `symbols`.
pub fn register(symbols: &mut HostSymbols) {
    symbols.insert("printf", printf);
    symbols.insert("puts", puts);
    symbols.insert("putchar", putchar);
}

/// Write formatted output. Returns the number of bytes written.
pub fn printf(call: &mut HostCall<'_>) -> Result<GenericValue, HostError> {
    let format = call.read_c_string(call.arg_pointer(0)?)?;
    let text = format_args(call, format, 1)?;
    trace!(bytes = text.len(), "printf");
    call.write(&text)?;
    Ok(GenericValue::i32(text.len() as i32))
}

/// Write a string and a newline.
pub fn puts(call: &mut HostCall<'_>) -> Result<GenericValue, HostError> {
    let text = call.read_c_string(call.arg_pointer(0)?)?;
    call.write(text)?;
    call.write(b"\n")?;
    Ok(GenericValue::i32(1))
}

/// Write one byte. Returns the byte written.
pub fn putchar(call: &mut HostCall<'_>) -> Result<GenericValue, HostError> {
    let (_, value) = call.arg_int(0)?;
    let byte = value as u8;
    call.write(&[byte])?;
    Ok(GenericValue::i32(i32::from(byte)))
}
