use super::BinaryVector;
use crate::error::{Error, Result};
use crate::memory::RootAllocator;
use std::convert::TryFrom;
use std::sync::Arc;

impl TryFrom<&[Option<&[u8]>]> for BinaryVector {
    type Error = Error;

    fn try_from(slice: &[Option<&[u8]>]) -> Result<Self> {
        let mut vector = Self::new("", Arc::new(RootAllocator::unlimited()));
        let bytes = slice.iter().flatten().map(|v| v.len()).sum();
        vector.allocate_new_with(bytes, slice.len())?;
        for value in slice {
            vector.push(*value)?;
        }
        Ok(vector)
    }
}

impl TryFrom<&[&[u8]]> for BinaryVector {
    type Error = Error;

    fn try_from(slice: &[&[u8]]) -> Result<Self> {
        let values: Vec<Option<&[u8]>> = slice.iter().copied().map(Some).collect();
        Self::try_from(values.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use crate::array::{BinaryVector, Vector};
    use std::convert::TryInto;

    #[test]
    fn vector_from_byte_slices() {
        let values: Vec<&[u8]> = vec![&b"\x00\x01"[..], b"", b"\xff"];
        let v: BinaryVector = values.as_slice().try_into().unwrap();
        assert_eq!(3, v.len());
        assert_eq!(Some(&b"\xff"[..]), v.get(2).unwrap());
        assert_eq!(&[0, 0, 0, 0, 2, 0, 0, 0, 2, 0, 0, 0, 3, 0, 0, 0], v.buffers().offsets);
        v.validate_scalars().unwrap();
    }

    #[test]
    fn vector_from_optional_byte_slices() {
        let values: Vec<Option<&[u8]>> = vec![Some(&b"ab"[..]), None, Some(&b"c"[..])];
        let v: BinaryVector = values.as_slice().try_into().unwrap();
        assert_eq!(values, v.iter().collect::<Vec<_>>());
        assert_eq!(b"abc", v.buffers().values);
        assert_eq!(1, v.null_count());
    }
}
