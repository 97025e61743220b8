use crate::datatypes::{offset_to_usize, read_offset, OffsetSize};
use crate::memory::{AllocationError, Allocator, BufferMut};
use std::marker::PhantomData;
use std::mem;

static ZERO_OFFSET: [u8; 8] = [0; 8];

/// Little-endian offsets delimiting the values of a variable-width vector.
///
/// Entry `i` is the start of slot `i` in the value buffer and entry `i + 1`
/// its end. The owning vector decides how many entries are committed; this
/// type only guarantees that every entry up to the slot capacity is readable.
#[derive(Debug, Default)]
pub struct OffsetBuffer<O: OffsetSize> {
    buffer: BufferMut,
    _marker: PhantomData<O>,
}

impl<O: OffsetSize> OffsetBuffer<O> {
    pub fn new() -> Self {
        Self {
            buffer: BufferMut::empty(),
            _marker: PhantomData,
        }
    }

    /// Returns the number of slots whose end offset fits in the buffer.
    pub fn slot_capacity(&self) -> usize {
        (self.buffer.capacity() / O::WIDTH).saturating_sub(1)
    }

    /// Returns the number of allocated bytes.
    pub fn byte_capacity(&self) -> usize {
        self.buffer.capacity()
    }

    #[inline]
    pub fn get(&self, i: usize) -> O {
        if self.buffer.is_empty() && i == 0 {
            return O::zero();
        }
        read_offset(self.buffer.as_slice(), i)
    }

    #[inline]
    pub fn start_offset(&self, i: usize) -> usize {
        offset_to_usize(self.get(i))
    }

    #[inline]
    pub fn end_offset(&self, i: usize) -> usize {
        offset_to_usize(self.get(i + 1))
    }

    #[inline]
    pub fn length(&self, i: usize) -> usize {
        self.end_offset(i) - self.start_offset(i)
    }

    #[inline]
    pub fn set_offset(&mut self, i: usize, value: O) {
        let start = i * O::WIDTH;
        value.write_le(&mut self.buffer.as_mut_slice()[start..start + O::WIDTH]);
    }

    /// Makes room for the end offsets of `slots` slots. Entries past
    /// `committed` are set to the offset at `committed`, so they describe
    /// zero-length slots.
    ///
    /// # Errors
    ///
    /// Returns an error if the allocator cannot provide the memory; the
    /// table is unchanged in that case.
    pub fn reserve(
        &mut self,
        allocator: &dyn Allocator,
        slots: usize,
        committed: usize,
    ) -> Result<(), AllocationError> {
        if slots <= self.slot_capacity() && !self.buffer.is_empty() {
            return Ok(());
        }
        let bytes = slots
            .checked_add(1)
            .and_then(|n| n.checked_mul(O::WIDTH))
            .ok_or(AllocationError::TooLarge)?;
        if self.buffer.is_empty() {
            self.buffer = allocator.allocate(bytes)?;
        } else {
            allocator.reallocate(&mut self.buffer, bytes)?;
        }
        let last = self.get(committed);
        for i in committed + 1..=self.slot_capacity() {
            self.set_offset(i, last);
        }
        Ok(())
    }

    /// Adds `delta` to the entries `from..=to`.
    pub(crate) fn shift(&mut self, from: usize, to: usize, delta: isize) {
        for i in from..=to {
            let pos = self.start_offset(i) as isize + delta;
            let value = O::from_isize(pos).unwrap_or_else(O::zero);
            self.set_offset(i, value);
        }
    }

    /// Returns the encoded entries `0..=count`.
    pub fn as_slice(&self, count: usize) -> &[u8] {
        if self.buffer.is_empty() {
            &ZERO_OFFSET[..O::WIDTH]
        } else {
            &self.buffer.as_slice()[..(count + 1) * O::WIDTH]
        }
    }

    /// Zeroes every entry without releasing memory.
    pub(crate) fn clear_offsets(&mut self) {
        self.buffer.zero();
    }

    pub(crate) fn buffer(&self) -> &BufferMut {
        &self.buffer
    }

    pub(crate) fn take(&mut self) -> BufferMut {
        mem::take(&mut self.buffer)
    }

    pub(crate) fn release(&mut self, allocator: &dyn Allocator) {
        let buffer = self.take();
        if !buffer.is_empty() {
            allocator.release(buffer);
        }
    }
}

impl<O: OffsetSize> From<BufferMut> for OffsetBuffer<O> {
    fn from(buffer: BufferMut) -> Self {
        Self {
            buffer,
            _marker: PhantomData,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::OffsetBuffer;
    use crate::memory::{Allocator, RootAllocator};

    #[test]
    fn empty_table_has_zero_start() {
        let offsets = OffsetBuffer::<i32>::new();
        assert_eq!(0, offsets.slot_capacity());
        assert_eq!(0, offsets.start_offset(0));
        assert_eq!(&[0, 0, 0, 0], offsets.as_slice(0));
    }

    #[test]
    fn reserve_fills_with_last_offset() {
        let allocator = RootAllocator::unlimited();
        let mut offsets = OffsetBuffer::<i32>::new();
        offsets.reserve(&allocator, 3, 0).unwrap();
        assert_eq!(15, offsets.slot_capacity());
        offsets.set_offset(1, 5);
        offsets.set_offset(2, 9);
        offsets.reserve(&allocator, 40, 2).unwrap();
        assert_eq!(47, offsets.slot_capacity());
        assert_eq!(5, offsets.length(0));
        assert_eq!(4, offsets.length(1));
        assert!((2..47).all(|i| offsets.length(i) == 0 && offsets.start_offset(i) == 9));
        offsets.release(&allocator);
        assert_eq!(0, allocator.allocated_bytes());
    }

    #[test]
    fn shift_moves_offsets() {
        let allocator = RootAllocator::unlimited();
        let mut offsets = OffsetBuffer::<i64>::new();
        offsets.reserve(&allocator, 3, 0).unwrap();
        offsets.set_offset(1, 2);
        offsets.set_offset(2, 4);
        offsets.set_offset(3, 6);
        offsets.shift(2, 3, -1);
        assert_eq!(1, offsets.length(1));
        assert_eq!(5, offsets.end_offset(2));
        assert_eq!(&[0, 0, 0, 0, 0, 0, 0, 0], &offsets.as_slice(3)[..8]);
        offsets.release(&allocator);
    }
}
