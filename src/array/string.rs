use super::{GenericVarWidthVector, StringVector};
use crate::datatypes::{OffsetSize, Utf8Type};
use crate::error::{Error, Result};
use crate::memory::RootAllocator;
use std::convert::TryFrom;
use std::str;
use std::sync::Arc;

impl<O: OffsetSize> GenericVarWidthVector<Utf8Type, O> {
    /// Returns slot `index` as a string, or `None` if it is null.
    ///
    /// # Errors
    ///
    /// Returns an error if `index` is out of bound or the slot does not hold
    /// UTF-8 text.
    pub fn get_str(&self, index: usize) -> Result<Option<&str>> {
        match self.get(index)? {
            Some(bytes) => str::from_utf8(bytes)
                .map(Some)
                .map_err(|source| Error::Utf8 { index, source }),
            None => Ok(None),
        }
    }

    /// Sets slot `index` to `value`, growing the buffers first if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffers cannot grow.
    pub fn set_safe_str(&mut self, index: usize, value: &str) -> Result<()> {
        self.set_safe(index, value.as_bytes())
    }

    /// Appends a string, or a null if `value` is `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffers cannot grow.
    pub fn push_str(&mut self, value: Option<&str>) -> Result<()> {
        self.push(value.map(str::as_bytes))
    }

    /// Iterates over the slots as strings. Slots that are not UTF-8 text
    /// yield an error.
    pub fn iter_str(&self) -> impl Iterator<Item = Result<Option<&str>>> + '_ {
        self.iter().enumerate().map(|(index, value)| match value {
            Some(bytes) => str::from_utf8(bytes)
                .map(Some)
                .map_err(|source| Error::Utf8 { index, source }),
            None => Ok(None),
        })
    }
}

impl TryFrom<&[Option<&str>]> for StringVector {
    type Error = Error;

    fn try_from(slice: &[Option<&str>]) -> Result<Self> {
        let mut vector = Self::new("", Arc::new(RootAllocator::unlimited()));
        let bytes = slice.iter().flatten().map(|s| s.len()).sum();
        vector.allocate_new_with(bytes, slice.len())?;
        for s in slice {
            vector.push_str(*s)?;
        }
        Ok(vector)
    }
}

impl TryFrom<&[&str]> for StringVector {
    type Error = Error;

    fn try_from(slice: &[&str]) -> Result<Self> {
        let values: Vec<Option<&str>> = slice.iter().copied().map(Some).collect();
        Self::try_from(values.as_slice())
    }
}
