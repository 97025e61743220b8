use crate::memory::{AllocationError, Allocator, BufferMut};
use crate::util::bit_util;
use std::mem;

/// Bit-packed validity flags. Bit `i` lives in byte `i / 8` at position
/// `i % 8`; a set bit means the slot holds a value.
#[derive(Debug, Default)]
pub struct Bitmap {
    pub(crate) bits: BufferMut,
}

impl Bitmap {
    pub fn new() -> Self {
        Self {
            bits: BufferMut::empty(),
        }
    }

    /// Returns the number of bits this bitmap can hold without growing.
    pub fn bit_capacity(&self) -> usize {
        self.bits.capacity() * 8
    }

    /// Returns the number of allocated bytes.
    pub fn len(&self) -> usize {
        self.bits.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn is_set(&self, i: usize) -> bool {
        assert!(i < self.bit_capacity(), "bit index out of bound");
        bit_util::get_bit(self.bits.as_slice(), i)
    }

    pub fn is_null(&self, i: usize) -> bool {
        !self.is_set(i)
    }

    pub fn set_valid(&mut self, i: usize) {
        bit_util::set_bit(self.bits.as_mut_slice(), i);
    }

    pub fn set_null(&mut self, i: usize) {
        bit_util::unset_bit(self.bits.as_mut_slice(), i);
    }

    pub fn set_validity(&mut self, i: usize, valid: bool) {
        if valid {
            self.set_valid(i);
        } else {
            self.set_null(i);
        }
    }

    /// Returns the number of unset bits among the first `len` bits.
    pub fn null_count(&self, len: usize) -> usize {
        len - bit_util::count_set_bits(self.bits.as_slice(), len)
    }

    /// Makes room for at least `num_bits` bits. New bits are unset.
    ///
    /// # Errors
    ///
    /// Returns an error if the allocator cannot provide the memory; the
    /// bitmap is unchanged in that case.
    pub fn reserve(
        &mut self,
        allocator: &dyn Allocator,
        num_bits: usize,
    ) -> Result<(), AllocationError> {
        let num_bytes = bit_util::bytes_for_bits(num_bits);
        if num_bytes <= self.bits.capacity() {
            return Ok(());
        }
        if self.bits.is_empty() {
            self.bits = allocator.allocate(num_bytes)?;
            Ok(())
        } else {
            allocator.reallocate(&mut self.bits, num_bytes)
        }
    }

    /// Returns the bytes covering the first `num_bits` bits.
    pub fn as_slice(&self, num_bits: usize) -> &[u8] {
        &self.bits.as_slice()[..bit_util::bytes_for_bits(num_bits)]
    }

    /// Unsets every bit.
    pub fn clear_bits(&mut self) {
        self.bits.zero();
    }

    pub(crate) fn buffer(&self) -> &BufferMut {
        &self.bits
    }

    pub(crate) fn buffer_mut(&mut self) -> &mut BufferMut {
        &mut self.bits
    }

    /// Takes the underlying buffer out, leaving this bitmap empty.
    pub(crate) fn take(&mut self) -> BufferMut {
        mem::take(&mut self.bits)
    }

    pub(crate) fn release(&mut self, allocator: &dyn Allocator) {
        let bits = self.take();
        if !bits.is_empty() {
            allocator.release(bits);
        }
    }
}

impl From<BufferMut> for Bitmap {
    fn from(bits: BufferMut) -> Self {
        Self { bits }
    }
}
