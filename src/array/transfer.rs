//! Moving and copying slots between vectors of the same type.

use super::offset::OffsetBuffer;
use super::state::SlotState;
use super::values::ValueBuffer;
use super::GenericVarWidthVector;
use crate::bitmap::Bitmap;
use crate::config::VectorConfig;
use crate::datatypes::{Field, OffsetSize, VarWidthType};
use crate::error::{Error, Result};
use crate::memory::{same_allocator, AllocationError, Allocator, AllocatorRef, BufferMut};
use crate::util::bit_util;
use log::debug;

impl<T: VarWidthType, O: OffsetSize> GenericVarWidthVector<T, O> {
    /// Moves every buffer of this vector to `dest` without copying any byte.
    ///
    /// `dest` releases what it held before and takes over every slot; this
    /// vector is left empty, so reading any of its former slots fails with
    /// [`Error::IndexOutOfBounds`]. When the two vectors use different
    /// allocators, the accounting of the buffers moves to the allocator of
    /// `dest`.
    ///
    /// # Errors
    ///
    /// Returns an error if the allocator of `dest` cannot take over the
    /// buffers while still holding the former buffers of `dest`. Neither
    /// vector changes in that case.
    pub fn transfer_to(&mut self, dest: &mut Self) -> Result<()> {
        let cross = !same_allocator(&self.allocator, &dest.allocator);
        if cross {
            adopt_all(dest.allocator.as_ref(), &self.raw_buffers())?;
        }
        dest.clear();
        if cross {
            for buffer in &self.raw_buffers() {
                self.allocator.disown(buffer);
            }
        }
        dest.validity = Bitmap::from(self.validity.take());
        dest.offsets = OffsetBuffer::from(self.offsets.take());
        dest.values = ValueBuffer::from(self.values.take());
        dest.state = self.state;
        self.state = SlotState::new();
        debug!(
            "transferred {} slots from {} to {}",
            dest.state.value_count,
            self.field.name(),
            dest.field.name()
        );
        Ok(())
    }

    fn raw_buffers(&self) -> [&BufferMut; 3] {
        [
            self.validity.buffer(),
            self.offsets.buffer(),
            self.values.buffer(),
        ]
    }

    /// Copies `length` slots starting at `start` into fresh buffers owned by
    /// `dest`. The offsets of `dest` start at zero, and only the value bytes
    /// of the copied slots are copied.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] if the range exceeds the value count, or
    /// an allocation error if the fresh buffers cannot be allocated while
    /// `dest` still holds its former ones. `dest` is unchanged in both cases.
    pub fn split_and_transfer_to(
        &self,
        start: usize,
        length: usize,
        dest: &mut Self,
    ) -> Result<()> {
        let value_count = self.state.value_count;
        let end = start
            .checked_add(length)
            .filter(|end| *end <= value_count)
            .ok_or(Error::OutOfRange {
                start,
                length,
                value_count,
            })?;
        if length == 0 {
            dest.clear();
            return Ok(());
        }

        let base = self.offsets.get(start);
        let first = self.offsets.start_offset(start);
        let bytes = self.offsets.start_offset(end) - first;
        let mut fresh = Self::build(
            dest.field.clone(),
            dest.allocator.clone(),
            &VectorConfig::default(),
        );
        fresh.reserve(length, bytes)?;

        for i in 0..=length {
            fresh.offsets.set_offset(i, self.offsets.get(start + i) - base);
        }
        fresh.values.write(0, self.values.read(first, bytes));
        bit_util::copy_bits(
            self.validity.as_slice(value_count),
            start,
            fresh.validity.buffer_mut().as_mut_slice(),
            length,
        );

        dest.clear();
        dest.validity = Bitmap::from(fresh.validity.take());
        dest.offsets = OffsetBuffer::from(fresh.offsets.take());
        dest.values = ValueBuffer::from(fresh.values.take());
        dest.state = SlotState {
            value_count: length,
            last_set: Some(length - 1),
        };
        debug!(
            "copied slots {}..{} ({} bytes) from {} to {}",
            start,
            end,
            bytes,
            self.field.name(),
            dest.field.name()
        );
        Ok(())
    }

    /// Copies slot `from_index` of `source` into slot `to_index`.
    ///
    /// # Errors
    ///
    /// Returns an error if `from_index` is out of bound in `source`.
    ///
    /// # Panics
    ///
    /// Panics if the buffers of this vector cannot hold the value.
    pub fn copy_from(&mut self, from_index: usize, to_index: usize, source: &Self) -> Result<()> {
        match source.get(from_index)? {
            Some(value) => self.set(to_index, value),
            None => self.set_null(to_index),
        }
        Ok(())
    }

    /// Copies slot `from_index` of `source` into slot `to_index`, growing the
    /// buffers of this vector as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if `from_index` is out of bound in `source` or the
    /// buffers cannot grow.
    pub fn copy_from_safe(
        &mut self,
        from_index: usize,
        to_index: usize,
        source: &Self,
    ) -> Result<()> {
        self.set_option_safe(to_index, source.get(from_index)?)
    }

    /// Pairs this vector with `to` for repeated transfers.
    pub fn make_transfer_pair(&mut self, to: Self) -> TransferPair<'_, T, O> {
        TransferPair { from: self, to }
    }

    /// Pairs this vector with a new, empty vector named `name` of the same
    /// type, allocating from `allocator`.
    pub fn transfer_pair(
        &mut self,
        name: &str,
        allocator: AllocatorRef,
    ) -> TransferPair<'_, T, O> {
        let field = Field::new(name, self.field.data_type(), self.field.is_nullable());
        let to = Self::build(field, allocator, &VectorConfig::default());
        self.make_transfer_pair(to)
    }
}

fn adopt_all(
    allocator: &dyn Allocator,
    buffers: &[&BufferMut],
) -> std::result::Result<(), AllocationError> {
    for (i, buffer) in buffers.iter().enumerate() {
        if let Err(e) = allocator.adopt(buffer) {
            for adopted in &buffers[..i] {
                allocator.disown(adopted);
            }
            return Err(e);
        }
    }
    Ok(())
}

/// A source vector and a target vector of the same type.
pub struct TransferPair<'a, T: VarWidthType, O: OffsetSize> {
    from: &'a mut GenericVarWidthVector<T, O>,
    to: GenericVarWidthVector<T, O>,
}

impl<'a, T: VarWidthType, O: OffsetSize> TransferPair<'a, T, O> {
    /// Moves every slot of the source to the target.
    ///
    /// # Errors
    ///
    /// Returns an error if the target's allocator cannot take over the
    /// buffers.
    pub fn transfer(&mut self) -> Result<()> {
        self.from.transfer_to(&mut self.to)
    }

    /// Copies `length` slots of the source starting at `start` to the target.
    ///
    /// # Errors
    ///
    /// Returns an error if the range is out of bound or the target cannot
    /// allocate.
    pub fn split_and_transfer(&mut self, start: usize, length: usize) -> Result<()> {
        self.from.split_and_transfer_to(start, length, &mut self.to)
    }

    /// Copies slot `from_index` of the source to slot `to_index` of the
    /// target.
    ///
    /// # Errors
    ///
    /// Returns an error if `from_index` is out of bound or the target cannot
    /// grow.
    pub fn copy_value_safe(&mut self, from_index: usize, to_index: usize) -> Result<()> {
        self.to.copy_from_safe(from_index, to_index, self.from)
    }

    pub fn from(&self) -> &GenericVarWidthVector<T, O> {
        self.from
    }

    pub fn to(&self) -> &GenericVarWidthVector<T, O> {
        &self.to
    }

    pub fn into_to(self) -> GenericVarWidthVector<T, O> {
        self.to
    }
}
