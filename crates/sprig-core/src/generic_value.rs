//! Run-time values exchanged with the interpreter.

use std::fmt;

/// Mask `value` to its low `bits` bits. Widths of 64 and above are returned
/// unchanged.
#[inline]
pub fn truncate(value: u64, bits: u32) -> u64 {
    if bits >= 64 {
        value
    } else {
        value & ((1u64 << bits) - 1)
    }
}

/// Sign-extend the low `bits` bits of `value` to 64 bits.
#[inline]
pub fn sign_extend(value: u64, bits: u32) -> i64 {
    if bits == 0 || bits >= 64 {
        value as i64
    } else {
        let shift = 64 - bits;
        ((value << shift) as i64) >> shift
    }
}

/// A tagged union holding the result of any supported primitive type, or
/// nothing for void.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GenericValue {
    /// No value (void return).
    #[default]
    Void,
    /// An integer of the given width, stored zero-extended.
    Int { bits: u32, value: u64 },
    /// A byte address in interpreter memory. `0` is null.
    Pointer(u64),
}

impl GenericValue {
    /// Build an integer value, truncating to the width.
    #[inline]
    pub fn int(bits: u32, value: u64) -> Self {
        GenericValue::Int {
            bits,
            value: truncate(value, bits),
        }
    }

    /// Build an `i32` from a Rust integer.
    #[inline]
    pub fn i32(value: i32) -> Self {
        Self::int(32, value as u32 as u64)
    }

    /// Whether this is the void value.
    #[inline]
    pub fn is_void(&self) -> bool {
        matches!(self, GenericValue::Void)
    }

    /// Signed interpretation of an integer value.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            GenericValue::Int { bits, value } => Some(sign_extend(*value, *bits)),
            _ => None,
        }
    }

    /// Unsigned interpretation of an integer value, or the address of a
    /// pointer.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            GenericValue::Int { value, .. } => Some(*value),
            GenericValue::Pointer(addr) => Some(*addr),
            GenericValue::Void => None,
        }
    }

    /// The address, if this is a pointer.
    pub fn as_pointer(&self) -> Option<u64> {
        match self {
            GenericValue::Pointer(addr) => Some(*addr),
            _ => None,
        }
    }

    /// Name of the value's shape, for error messages.
    pub fn type_name(&self) -> String {
        match self {
            GenericValue::Void => "void".to_string(),
            GenericValue::Int { bits, .. } => format!("i{bits}"),
            GenericValue::Pointer(_) => "pointer".to_string(),
        }
    }
}

impl fmt::Display for GenericValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenericValue::Void => write!(f, "void"),
            GenericValue::Int { bits, value } => write!(f, "i{} {}", bits, sign_extend(*value, *bits)),
            GenericValue::Pointer(addr) => write!(f, "ptr {:#x}", addr),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_widths() {
        assert_eq!(truncate(0x1ff, 8), 0xff);
        assert_eq!(truncate(u64::MAX, 1), 1);
        assert_eq!(truncate(u64::MAX, 64), u64::MAX);
    }

    #[test]
    fn sign_extension() {
        assert_eq!(sign_extend(0xff, 8), -1);
        assert_eq!(sign_extend(0x7f, 8), 127);
        assert_eq!(sign_extend(0xffff_ffff, 32), -1);
        assert_eq!(sign_extend(5, 64), 5);
    }

    #[test]
    fn int_values_wrap() {
        let v = GenericValue::int(8, 300);
        assert_eq!(v.as_u64(), Some(44));
        assert_eq!(GenericValue::i32(-1).as_i64(), Some(-1));
        assert_eq!(GenericValue::i32(-1).as_u64(), Some(0xffff_ffff));
    }

    #[test]
    fn void_and_pointer() {
        assert!(GenericValue::Void.is_void());
        assert_eq!(GenericValue::Pointer(0x1000).as_pointer(), Some(0x1000));
        assert_eq!(GenericValue::Void.as_i64(), None);
        assert_eq!(GenericValue::default(), GenericValue::Void);
    }

    #[test]
    fn display() {
        assert_eq!(GenericValue::i32(-5).to_string(), "i32 -5");
        assert_eq!(GenericValue::Pointer(16).to_string(), "ptr 0x10");
        assert_eq!(GenericValue::Void.to_string(), "void");
    }
}
