use crate::memory::{AllocationError, Allocator, BufferMut};
use std::cmp;
use std::mem;
use std::ops::Range;

/// Flat storage for the concatenated contents of a variable-width vector.
#[derive(Debug, Default)]
pub struct ValueBuffer {
    buffer: BufferMut,
}

impl ValueBuffer {
    pub fn new() -> Self {
        Self {
            buffer: BufferMut::empty(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    #[inline]
    pub fn write(&mut self, offset: usize, bytes: &[u8]) {
        self.buffer.as_mut_slice()[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    #[inline]
    pub fn read(&self, offset: usize, length: usize) -> &[u8] {
        if length == 0 {
            return &[];
        }
        &self.buffer.as_slice()[offset..offset + length]
    }

    /// Moves the bytes in `src` so that they start at `dest`.
    pub(crate) fn copy_within(&mut self, src: Range<usize>, dest: usize) {
        self.buffer.as_mut_slice().copy_within(src, dest);
    }

    /// Makes room for at least `needed` bytes, at least doubling the current
    /// capacity when it has to grow.
    ///
    /// # Errors
    ///
    /// Returns an error if the allocator cannot provide the memory; the
    /// buffer is unchanged in that case.
    pub fn reserve(
        &mut self,
        allocator: &dyn Allocator,
        needed: usize,
    ) -> Result<(), AllocationError> {
        if needed <= self.buffer.capacity() {
            return Ok(());
        }
        if self.buffer.is_empty() {
            self.buffer = allocator.allocate(needed)?;
            return Ok(());
        }
        let target = cmp::max(needed, self.buffer.capacity().saturating_mul(2));
        allocator.reallocate(&mut self.buffer, target)
    }

    /// Returns the first `len` bytes.
    pub fn as_slice(&self, len: usize) -> &[u8] {
        &self.buffer.as_slice()[..len]
    }

    pub(crate) fn clear_values(&mut self) {
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

impl From<BufferMut> for ValueBuffer {
    fn from(buffer: BufferMut) -> Self {
        Self { buffer }
    }
}
