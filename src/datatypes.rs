use num_traits::{FromPrimitive, PrimInt, ToPrimitive};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str;
use strum_macros::{Display, EnumString};

/// Supported variable-width types.
#[derive(Clone, Copy, Debug, Deserialize, Display, EnumString, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DataType {
    Utf8,
    LargeUtf8,
    Binary,
    LargeBinary,
}

impl DataType {
    /// Returns the byte width of one offset entry.
    pub fn offset_width(self) -> usize {
        match self {
            Self::Utf8 | Self::Binary => 4,
            Self::LargeUtf8 | Self::LargeBinary => 8,
        }
    }
}

impl From<DataType> for arrow::datatypes::DataType {
    fn from(dt: DataType) -> Self {
        match dt {
            DataType::Utf8 => Self::Utf8,
            DataType::LargeUtf8 => Self::LargeUtf8,
            DataType::Binary => Self::Binary,
            DataType::LargeBinary => Self::LargeBinary,
        }
    }
}

/// Describes a column: its name, type and whether it may hold nulls.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Field {
    name: String,
    data_type: DataType,
    #[serde(default = "default_nullable")]
    nullable: bool,
}

fn default_nullable() -> bool {
    true
}

impl Field {
    pub fn new(name: &str, data_type: DataType, nullable: bool) -> Self {
        Self {
            name: name.to_string(),
            data_type,
            nullable,
        }
    }

    /// Creates a nullable field.
    pub fn nullable(name: &str, data_type: DataType) -> Self {
        Self::new(name, data_type, true)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }
}

/// Integer type used for the entries of an offset table.
///
/// Offsets are stored little-endian regardless of the host byte order.
pub trait OffsetSize:
    PrimInt + FromPrimitive + ToPrimitive + fmt::Debug + Default + Send + Sync + 'static
{
    /// The number of bytes of one encoded offset.
    const WIDTH: usize;

    /// Whether this is the 64-bit ("large") offset type.
    const IS_LARGE: bool;

    fn read_le(bytes: &[u8]) -> Self;

    fn write_le(self, out: &mut [u8]);
}

impl OffsetSize for i32 {
    const WIDTH: usize = 4;
    const IS_LARGE: bool = false;

    #[inline]
    fn read_le(bytes: &[u8]) -> Self {
        let mut buf = [0_u8; 4];
        buf.copy_from_slice(&bytes[..4]);
        Self::from_le_bytes(buf)
    }

    #[inline]
    fn write_le(self, out: &mut [u8]) {
        out[..4].copy_from_slice(&self.to_le_bytes());
    }
}

impl OffsetSize for i64 {
    const WIDTH: usize = 8;
    const IS_LARGE: bool = true;

    #[inline]
    fn read_le(bytes: &[u8]) -> Self {
        let mut buf = [0_u8; 8];
        buf.copy_from_slice(&bytes[..8]);
        Self::from_le_bytes(buf)
    }

    #[inline]
    fn write_le(self, out: &mut [u8]) {
        out[..8].copy_from_slice(&self.to_le_bytes());
    }
}

/// Converts an offset into a byte position.
///
/// Offsets are written only by their owning vector and never exceed the
/// value buffer, so the conversion does not fail.
#[inline]
pub(crate) fn offset_to_usize<O: OffsetSize>(offset: O) -> usize {
    offset.to_usize().unwrap_or_default()
}

/// Converts a byte position into an offset, if it fits.
#[inline]
pub(crate) fn usize_to_offset<O: OffsetSize>(pos: usize) -> Option<O> {
    O::from_usize(pos)
}

/// Element type of a variable-width vector.
pub trait VarWidthType: 'static {
    /// A short name used in debug output.
    const NAME: &'static str;

    /// Returns the data type of a vector of this element type.
    fn data_type(large: bool) -> DataType;

    /// Checks the content of one non-null value.
    ///
    /// # Errors
    ///
    /// Returns a description of the violation if `value` is not a legal
    /// scalar of this type.
    fn validate_scalar(value: &[u8]) -> Result<(), String>;
}

/// UTF-8 text.
#[derive(Debug)]
pub struct Utf8Type;

impl VarWidthType for Utf8Type {
    const NAME: &'static str = "String";

    fn data_type(large: bool) -> DataType {
        if large {
            DataType::LargeUtf8
        } else {
            DataType::Utf8
        }
    }

    fn validate_scalar(value: &[u8]) -> Result<(), String> {
        str::from_utf8(value)
            .map(|_| ())
            .map_err(|e| format!("non-UTF-8 data: {}", e))
    }
}

/// Opaque byte strings.
#[derive(Debug)]
pub struct BinaryType;

impl VarWidthType for BinaryType {
    const NAME: &'static str = "Binary";

    fn data_type(large: bool) -> DataType {
        if large {
            DataType::LargeBinary
        } else {
            DataType::Binary
        }
    }

    fn validate_scalar(_value: &[u8]) -> Result<(), String> {
        Ok(())
    }
}

/// Reads offset `i` of a little-endian offset array.
#[inline]
pub(crate) fn read_offset<O: OffsetSize>(bytes: &[u8], i: usize) -> O {
    let start = i * O::WIDTH;
    O::read_le(&bytes[start..start + O::WIDTH])
}
