//! C-style format strings.
//!
//! Formatting works on bytes: literal runs, `%s` data and `%c` are copied
//! to the output unchanged. Each numeric conversion is rendered on its own
//! by `sprintf::vsprintf`.

use sprintf::{Printf, vsprintf};

use sprig_core::generic_value::{sign_extend, truncate};
use sprig_core::{GenericValue, HostError};

use crate::host::{HostCall, bad_argument};

/// One `%...` directive with its length modifiers removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Directive {
    /// Flags, width and precision, e.g. `-08.3`.
    pub(crate) spec: String,
    /// The conversion byte, e.g. `b'd'`.
    pub(crate) conversion: u8,
}

impl Directive {
    fn left_aligned(&self) -> bool {
        self.spec.contains('-')
    }

    fn width_and_precision(&self) -> (usize, Option<usize>) {
        let rest = self.spec.trim_start_matches(['-', '+', ' ', '#', '0']);
        let (width, precision) = match rest.split_once('.') {
            Some((w, p)) => (w, Some(p.parse().unwrap_or(0))),
            None => (rest, None),
        };
        (width.parse().unwrap_or(0), precision)
    }
}

/// Parse the directive whose `%` sits just before `start`. Returns the
/// directive and the index after it.
pub(crate) fn parse_directive(format: &[u8], start: usize) -> Result<(Directive, usize), HostError> {
    let mut spec = String::new();
    let mut i = start;
    loop {
        let Some(&b) = format.get(i) else {
            return Err(HostError::Format(
                "format string ends inside a conversion".to_string(),
            ));
        };
        i += 1;
        match b {
            b'*' => {
                return Err(HostError::Format(
                    "'*' width and precision are not supported".to_string(),
                ));
            }
            b'-' | b'+' | b' ' | b'#' | b'0'..=b'9' | b'.' => spec.push(char::from(b)),
            b'h' | b'l' | b'L' | b'q' | b'j' | b'z' | b't' => {}
            conversion => return Ok((Directive { spec, conversion }, i)),
        }
    }
}

fn render_number(spec: &str, conversion: u8, value: &dyn Printf) -> Result<Vec<u8>, HostError> {
    let format = format!("%{spec}{}", char::from(conversion));
    vsprintf(&format, &[value])
        .map(String::into_bytes)
        .map_err(|e| HostError::Format(format!("{e:?}")))
}

fn push_padded(out: &mut Vec<u8>, bytes: &[u8], width: usize, left: bool) {
    let pad = width.saturating_sub(bytes.len());
    if !left {
        out.resize(out.len() + pad, b' ');
    }
    out.extend_from_slice(bytes);
    if left {
        out.resize(out.len() + pad, b' ');
    }
}

/// Format `format` with the call's arguments starting at `first_arg`.
///
/// Integer conversions use the argument's own width; extra arguments are
/// ignored.
pub(crate) fn format_args(
    call: &HostCall<'_>,
    format: &[u8],
    first_arg: usize,
) -> Result<Vec<u8>, HostError> {
    let mut out = Vec::with_capacity(format.len());
    let mut index = first_arg;
    let mut i = 0;

    while i < format.len() {
        let Some(offset) = format[i..].iter().position(|b| *b == b'%') else {
            out.extend_from_slice(&format[i..]);
            break;
        };
        out.extend_from_slice(&format[i..i + offset]);
        let (directive, next) = parse_directive(format, i + offset + 1)?;
        i = next;

        if directive.conversion == b'%' {
            out.push(b'%');
            continue;
        }
        let value = call.arg(index)?;
        let (width, precision) = directive.width_and_precision();
        match (directive.conversion, value) {
            (b'd' | b'i', GenericValue::Int { bits, value }) => {
                let v = sign_extend(value, bits);
                out.extend(render_number(&directive.spec, b'd', &v)?);
            }
            (c @ (b'u' | b'o' | b'x' | b'X'), GenericValue::Int { bits, value }) => {
                let v = truncate(value, bits);
                out.extend(render_number(&directive.spec, c, &v)?);
            }
            (b'c', GenericValue::Int { value, .. }) => {
                push_padded(&mut out, &[value as u8], width, directive.left_aligned());
            }
            (b's', GenericValue::Pointer(address)) => {
                let bytes = call.read_c_string(address)?;
                let bytes = match precision {
                    Some(p) if p < bytes.len() => &bytes[..p],
                    _ => bytes,
                };
                push_padded(&mut out, bytes, width, directive.left_aligned());
            }
            (b's', other) => return Err(bad_argument(index, "pointer", &other)),
            (b'd' | b'i' | b'u' | b'o' | b'x' | b'X' | b'c', other) => {
                return Err(bad_argument(index, "integer", &other));
            }
            (conversion, _) => {
                return Err(HostError::Format(format!(
                    "unsupported conversion '%{}'",
                    char::from(conversion)
                )));
            }
        }
        index += 1;
    }
    Ok(out)
}
