//! Element types and the static tables keyed on them.
use crate::format::Format;
use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum DataType {
    Bool,
    U8,
    U16,
    U32,
    U64,
    I4,
    I8,
    I16,
    I32,
    I64,
    F16,
    BF16,
    #[default]
    F32,
    F64,
    Complex64,
    Complex128,
    /// Sentinel for invalid entries.
    Undefined,
}

/// Numeric families used by the rise matcher: a type may only be replaced
/// by a wider member of its own family.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum NumericFamily {
    Bool,
    Unsigned,
    Signed,
    Float,
    Complex,
}

/// Innermost tile width when nothing more specific applies.
pub const C0_DEFAULT: i64 = 16;
/// Tile width of the `_C04` layouts.
pub const C0_C04: i64 = 4;

/// Tile width per data type, in declaration order of [`DataType`]. Types
/// past the end of the table use [`C0_DEFAULT`].
const C0_TABLE: [i64; 14] = [
    32, // Bool
    32, // U8
    16, // U16
    16, // U32
    16, // U64
    64, // I4
    32, // I8
    16, // I16
    16, // I32
    16, // I64
    16, // F16
    16, // BF16
    16, // F32
    16, // F64
];

/// Tile width for `dt` laid out as `format`.
pub fn c0_for(dt: DataType, format: Format) -> i64 {
    if format.is_c04() {
        return C0_C04;
    }
    C0_TABLE.get(dt as usize).copied().unwrap_or(C0_DEFAULT)
}

impl DataType {
    pub fn is_unsigned(&self) -> bool {
        matches!(self, DataType::U8 | DataType::U16 | DataType::U32 | DataType::U64)
    }

    pub fn is_signed(&self) -> bool {
        matches!(self, DataType::I4 | DataType::I8 | DataType::I16 | DataType::I32 | DataType::I64)
    }

    pub fn is_float(&self) -> bool {
        matches!(self, DataType::F16 | DataType::BF16 | DataType::F32 | DataType::F64)
    }

    pub fn is_complex(&self) -> bool {
        matches!(self, DataType::Complex64 | DataType::Complex128)
    }

    pub fn is_integer(&self) -> bool {
        self.is_signed() || self.is_unsigned()
    }

    pub fn is_defined(&self) -> bool {
        *self != DataType::Undefined
    }

    pub fn family(&self) -> Option<NumericFamily> {
        match self {
            DataType::Bool => Some(NumericFamily::Bool),
            dt if dt.is_unsigned() => Some(NumericFamily::Unsigned),
            dt if dt.is_signed() => Some(NumericFamily::Signed),
            dt if dt.is_float() => Some(NumericFamily::Float),
            dt if dt.is_complex() => Some(NumericFamily::Complex),
            _ => None,
        }
    }

    pub fn bit_width(&self) -> usize {
        match self {
            DataType::I4 => 4,
            DataType::Bool | DataType::U8 | DataType::I8 => 8,
            DataType::U16 | DataType::I16 | DataType::F16 | DataType::BF16 => 16,
            DataType::U32 | DataType::I32 | DataType::F32 => 32,
            DataType::U64 | DataType::I64 | DataType::F64 | DataType::Complex64 => 64,
            DataType::Complex128 => 128,
            DataType::Undefined => 0,
        }
    }

    /// Storage size in bytes, sub-byte types rounding up.
    #[inline]
    pub fn size_of(&self) -> usize {
        self.bit_width().div_ceil(8)
    }

    /// Conversion priority. Within a family a greater value means a wider
    /// type that holds every value of the narrower ones. Floats live in
    /// the 10s, bool and the integers share the 20s, complex the 30s.
    pub fn priority(&self) -> Option<i64> {
        let p = match self {
            DataType::F16 => 10,
            DataType::BF16 => 11,
            DataType::F32 => 12,
            DataType::F64 => 13,
            DataType::Bool => 20,
            DataType::I4 => 21,
            DataType::U8 => 22,
            DataType::I8 => 23,
            DataType::U16 => 24,
            DataType::I16 => 25,
            DataType::U32 => 26,
            DataType::I32 => 27,
            DataType::U64 => 28,
            DataType::I64 => 29,
            DataType::Complex64 => 30,
            DataType::Complex128 => 31,
            DataType::Undefined => return None,
        };
        Some(p)
    }

    pub fn name(&self) -> &'static str {
        match self {
            DataType::Bool => "bool",
            DataType::U8 => "u8",
            DataType::U16 => "u16",
            DataType::U32 => "u32",
            DataType::U64 => "u64",
            DataType::I4 => "i4",
            DataType::I8 => "i8",
            DataType::I16 => "i16",
            DataType::I32 => "i32",
            DataType::I64 => "i64",
            DataType::F16 => "f16",
            DataType::BF16 => "bf16",
            DataType::F32 => "f32",
            DataType::F64 => "f64",
            DataType::Complex64 => "complex64",
            DataType::Complex128 => "complex128",
            DataType::Undefined => "undefined",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.write_str(self.name())
    }
}

const PARSEABLE: [DataType; 16] = [
    DataType::Bool,
    DataType::U8,
    DataType::U16,
    DataType::U32,
    DataType::U64,
    DataType::I4,
    DataType::I8,
    DataType::I16,
    DataType::I32,
    DataType::I64,
    DataType::F16,
    DataType::BF16,
    DataType::F32,
    DataType::F64,
    DataType::Complex64,
    DataType::Complex128,
];

impl std::str::FromStr for DataType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PARSEABLE
            .iter()
            .find(|dt| dt.name().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| anyhow::anyhow!("Unknown type {}", s))
    }
}
