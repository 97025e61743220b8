use super::offset::OffsetBuffer;
use super::state::SlotState;
use super::values::ValueBuffer;
use crate::bitmap::Bitmap;
use crate::config::VectorConfig;
use crate::datatypes::{usize_to_offset, Field, OffsetSize, VarWidthType};
use crate::error::{Error, InvalidScalar, Result, ValidationError};
use crate::memory::AllocatorRef;
use itertools::Itertools;
use log::{debug, trace};
use std::any::Any;
use std::cmp;
use std::fmt;
use std::marker::PhantomData;
use std::ops::Range;

/// A column of variable-length values, each of which may be null.
///
/// The column is laid out in three buffers: a validity bitmap, an offset
/// table of `value_count + 1` little-endian entries, and the concatenated
/// value bytes. The layout is the Arrow columnar format for variable-width
/// binary and UTF-8 arrays.
///
/// Writes come in two flavors. The `*_safe` methods grow the buffers as
/// needed and report allocation failures. The plain ones assume the buffers
/// are already large enough and panic otherwise.
///
/// Slots may be written in any order. Skipped slots are filled with nulls,
/// and rewriting a slot moves the bytes of the slots after it.
pub struct GenericVarWidthVector<T: VarWidthType, O: OffsetSize> {
    pub(crate) field: Field,
    pub(crate) allocator: AllocatorRef,
    pub(crate) validity: Bitmap,
    pub(crate) offsets: OffsetBuffer<O>,
    pub(crate) values: ValueBuffer,
    pub(crate) state: SlotState,
    initial_slots: usize,
    initial_value_bytes: usize,
    _marker: PhantomData<T>,
}

impl<T: VarWidthType, O: OffsetSize> GenericVarWidthVector<T, O> {
    /// Creates an empty, nullable vector. No memory is allocated until the
    /// first write.
    pub fn new(name: &str, allocator: AllocatorRef) -> Self {
        Self::build(
            Field::nullable(name, T::data_type(O::IS_LARGE)),
            allocator,
            &VectorConfig::default(),
        )
    }

    /// Creates an empty vector for `field`.
    ///
    /// # Errors
    ///
    /// Returns an error if the data type of `field` differs from the type of
    /// this vector.
    pub fn with_field(field: Field, allocator: AllocatorRef) -> Result<Self> {
        Self::with_config(field, allocator, &VectorConfig::default())
    }

    /// Creates an empty vector for `field` whose first allocation follows
    /// `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the data type of `field` differs from the type of
    /// this vector.
    pub fn with_config(
        field: Field,
        allocator: AllocatorRef,
        config: &VectorConfig,
    ) -> Result<Self> {
        let expected = T::data_type(O::IS_LARGE);
        if field.data_type() != expected {
            return Err(Error::TypeMismatch {
                expected,
                found: field.data_type(),
            });
        }
        Ok(Self::build(field, allocator, config))
    }

    pub(super) fn build(field: Field, allocator: AllocatorRef, config: &VectorConfig) -> Self {
        Self {
            field,
            allocator,
            validity: Bitmap::new(),
            offsets: OffsetBuffer::new(),
            values: ValueBuffer::new(),
            state: SlotState::new(),
            initial_slots: config.initial_slot_capacity,
            initial_value_bytes: config.initial_value_bytes(config.initial_slot_capacity),
            _marker: PhantomData,
        }
    }

    pub fn field(&self) -> &Field {
        &self.field
    }

    pub fn allocator(&self) -> &AllocatorRef {
        &self.allocator
    }

    pub fn value_count(&self) -> usize {
        self.state.value_count
    }

    /// Returns the highest slot written so far.
    pub fn last_set(&self) -> Option<usize> {
        self.state.last_set
    }

    /// Overrides the highest written slot. The slots after `last_set` stay
    /// defined but become null and zero-length, ready to be rewritten in
    /// order.
    ///
    /// # Errors
    ///
    /// Returns an error if `last_set` is not less than the value count.
    pub fn set_last_set(&mut self, last_set: Option<usize>) -> Result<()> {
        let value_count = self.state.value_count;
        if let Some(index) = last_set {
            self.check_index(index)?;
        }
        let next = last_set.map_or(0, |i| i + 1);
        if next < value_count {
            trace!("emptying slots {}..{}", next, value_count);
            let end = self.offsets.get(next);
            for i in next..value_count {
                self.validity.set_null(i);
                self.offsets.set_offset(i + 1, end);
            }
        }
        self.state.last_set = last_set;
        Ok(())
    }

    /// Returns the number of slots the buffers can hold without growing.
    pub fn value_capacity(&self) -> usize {
        cmp::min(self.validity.bit_capacity(), self.offsets.slot_capacity())
    }

    /// Returns the number of value bytes the buffers can hold without growing.
    pub fn byte_capacity(&self) -> usize {
        self.values.capacity()
    }

    /// Returns the number of bytes the committed slots take in the three
    /// buffers.
    pub fn buffer_size(&self) -> usize {
        if self.state.value_count == 0 {
            return 0;
        }
        let buffers = self.buffers();
        buffers.validity.len() + buffers.offsets.len() + buffers.values.len()
    }

    /// Sets the sizes of the first allocation to `slots` slots and the
    /// configured average value width.
    pub fn set_initial_capacity(&mut self, slots: usize) {
        let per_slot = self
            .initial_value_bytes
            .checked_div(self.initial_slots)
            .unwrap_or(crate::config::AVERAGE_VALUE_WIDTH);
        self.initial_slots = slots;
        self.initial_value_bytes = slots.saturating_mul(per_slot);
    }

    /// Sets the sizes of the first allocation to `slots` slots of `density`
    /// bytes on average.
    pub fn set_initial_capacity_with_density(&mut self, slots: usize, density: f64) {
        self.initial_slots = slots;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let bytes = (slots as f64 * density.max(0.0)).ceil() as usize;
        self.initial_value_bytes = bytes;
    }

    /// Allocates the buffers with the initial capacities, releasing any memory
    /// held before.
    ///
    /// # Errors
    ///
    /// Returns an error if the allocator cannot provide the memory.
    pub fn allocate_new(&mut self) -> Result<()> {
        self.allocate_new_with(self.initial_value_bytes, self.initial_slots)
    }

    /// Allocates room for `slots` slots and `total_bytes` value bytes,
    /// releasing any memory held before.
    ///
    /// # Errors
    ///
    /// Returns an error if the allocator cannot provide the memory. The vector
    /// is left empty in that case.
    pub fn allocate_new_with(&mut self, total_bytes: usize, slots: usize) -> Result<()> {
        self.clear();
        if let Err(e) = self.reserve(slots, total_bytes) {
            self.clear();
            return Err(e);
        }
        Ok(())
    }

    /// Grows the buffers to hold at least `slots` slots and `value_bytes`
    /// value bytes. Committed slots are kept as they are.
    ///
    /// # Errors
    ///
    /// Returns an error if the allocator cannot provide the memory. Buffers
    /// grown before the failure keep their new capacity.
    pub fn reserve(&mut self, slots: usize, value_bytes: usize) -> Result<()> {
        self.values.reserve(self.allocator.as_ref(), value_bytes)?;
        self.reserve_slots(slots)
    }

    fn reserve_slots(&mut self, slots: usize) -> Result<()> {
        let allocator = self.allocator.as_ref();
        self.offsets.reserve(allocator, slots, self.state.value_count)?;
        self.validity.reserve(allocator, slots)?;
        Ok(())
    }

    /// Makes sure slot `index` can take a value of `len` bytes.
    fn handle_safe(&mut self, index: usize, len: usize) -> Result<()> {
        let total = self.total_bytes();
        let needed = if index < self.state.value_count {
            total - self.offsets.length(index) + len
        } else {
            total.checked_add(len).ok_or(Error::OffsetOverflow(usize::max_value()))?
        };
        if usize_to_offset::<O>(needed).is_none() {
            return Err(Error::OffsetOverflow(needed));
        }

        let needed = if self.values.capacity() == 0 {
            cmp::max(needed, self.initial_value_bytes)
        } else {
            needed
        };
        if needed > self.values.capacity() {
            debug!("growing value buffer to hold {} bytes", needed);
            self.values.reserve(self.allocator.as_ref(), needed)?;
        }

        let capacity = self.value_capacity();
        if index >= capacity {
            let slots = if capacity == 0 {
                cmp::max(index + 1, self.initial_slots)
            } else {
                cmp::max(index + 1, capacity.saturating_mul(2))
            };
            debug!("growing slot capacity from {} to {}", capacity, slots);
            self.reserve_slots(slots)?;
        }
        Ok(())
    }

    /// Returns the number of committed value bytes.
    #[inline]
    fn total_bytes(&self) -> usize {
        self.offsets.start_offset(self.state.value_count)
    }

    /// Fills `range` with null, zero-length slots.
    fn fill(&mut self, range: Range<usize>) {
        if range.is_empty() {
            return;
        }
        trace!("filling slots {:?} with nulls", range);
        for i in range {
            self.validity.set_null(i);
            let start = self.offsets.get(i);
            self.offsets.set_offset(i + 1, start);
        }
    }

    /// Writes the bytes of slot `index`, moving the bytes of later slots when
    /// a committed slot changes length.
    fn write_value(&mut self, index: usize, value: &[u8], rewrite: bool) {
        let start = self.offsets.start_offset(index);
        let new_end = start + value.len();
        if rewrite {
            let old_end = self.offsets.end_offset(index);
            if new_end != old_end {
                let total = self.total_bytes();
                self.values.copy_within(old_end..total, new_end);
                #[allow(clippy::cast_possible_wrap)]
                let delta = new_end as isize - old_end as isize;
                self.offsets.shift(index + 1, self.state.value_count, delta);
            }
        } else {
            let end = usize_to_offset::<O>(new_end).expect("offset overflow");
            self.offsets.set_offset(index + 1, end);
        }
        self.values.write(start, value);
    }

    /// Sets slot `index` to `value`.
    ///
    /// # Panics
    ///
    /// Panics if the buffers cannot hold the slot or the bytes; use
    /// [`set_safe`](Self::set_safe) to grow them.
    pub fn set(&mut self, index: usize, value: &[u8]) {
        let transition = self.state.set(index);
        self.fill(transition.fill.clone());
        self.write_value(index, value, transition.rewrite);
        self.validity.set_valid(index);
        self.state = transition.next;
    }

    /// Sets slot `index` to `value`, growing the buffers first if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffers cannot grow or the total value length
    /// overflows the offset type. The vector is unchanged in that case.
    pub fn set_safe(&mut self, index: usize, value: &[u8]) -> Result<()> {
        self.handle_safe(index, value.len())?;
        self.set(index, value);
        Ok(())
    }

    /// Sets slot `index` to null.
    ///
    /// # Panics
    ///
    /// Panics if the buffers cannot hold the slot.
    pub fn set_null(&mut self, index: usize) {
        let transition = self.state.set(index);
        self.fill(transition.fill.clone());
        self.write_value(index, &[], transition.rewrite);
        self.validity.set_null(index);
        self.state = transition.next;
    }

    /// Sets slot `index` to null, growing the buffers first if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffers cannot grow.
    pub fn set_null_safe(&mut self, index: usize) -> Result<()> {
        self.handle_safe(index, 0)?;
        self.set_null(index);
        Ok(())
    }

    /// Sets slot `index` to `value`, or to null if `value` is `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffers cannot grow.
    pub fn set_option_safe(&mut self, index: usize, value: Option<&[u8]>) -> Result<()> {
        match value {
            Some(v) => self.set_safe(index, v),
            None => self.set_null_safe(index),
        }
    }

    /// Appends a value after the last slot.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffers cannot grow.
    pub fn push(&mut self, value: Option<&[u8]>) -> Result<()> {
        self.set_option_safe(self.state.value_count, value)
    }

    /// Defines exactly `count` slots. New slots are null; slots at or past
    /// `count` are dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffers cannot grow. The vector is unchanged in
    /// that case.
    pub fn set_value_count(&mut self, count: usize) -> Result<()> {
        let capacity = self.value_capacity();
        if count > capacity {
            let slots = cmp::max(count, capacity.saturating_mul(2));
            self.reserve_slots(slots)?;
        }
        let transition = self.state.set_value_count(count);
        self.fill(transition.fill);
        self.state = transition.next;
        Ok(())
    }

    /// Fills every slot before `index` that has not been written with nulls.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffers cannot grow.
    pub fn fill_empties(&mut self, index: usize) -> Result<()> {
        if index > 0 {
            self.handle_safe(index - 1, 0)?;
        }
        let transition = self.state.fill_empties(index);
        self.fill(transition.fill);
        self.state = transition.next;
        Ok(())
    }

    /// Returns slot `index`, or `None` if it is null.
    ///
    /// # Errors
    ///
    /// Returns an error if `index` is not less than the value count.
    pub fn get(&self, index: usize) -> Result<Option<&[u8]>> {
        self.check_index(index)?;
        if self.validity.is_null(index) {
            return Ok(None);
        }
        Ok(Some(self.value_unchecked(index)))
    }

    /// Returns a copy of slot `index`, or `None` if it is null.
    ///
    /// # Errors
    ///
    /// Returns an error if `index` is not less than the value count.
    pub fn get_owned(&self, index: usize) -> Result<Option<Vec<u8>>> {
        Ok(self.get(index)?.map(<[u8]>::to_vec))
    }

    /// Replaces the contents of `buf` with the bytes of slot `index` and
    /// returns whether the slot holds a value. `buf` is left empty for a null
    /// slot.
    ///
    /// # Errors
    ///
    /// Returns an error if `index` is not less than the value count. `buf` is
    /// unchanged in that case.
    pub fn read_into(&self, index: usize, buf: &mut Vec<u8>) -> Result<bool> {
        self.check_index(index)?;
        buf.clear();
        if self.validity.is_null(index) {
            return Ok(false);
        }
        buf.extend_from_slice(self.value_unchecked(index));
        Ok(true)
    }

    /// Returns the position of the first byte of slot `index` in the value
    /// buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if `index` is not less than the value count.
    pub fn start_offset(&self, index: usize) -> Result<usize> {
        self.check_index(index)?;
        Ok(self.offsets.start_offset(index))
    }

    /// Returns the position one past the last byte of slot `index` in the
    /// value buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if `index` is not less than the value count.
    pub fn end_offset(&self, index: usize) -> Result<usize> {
        self.check_index(index)?;
        Ok(self.offsets.end_offset(index))
    }

    /// Returns the bytes of slot `index` without checking its validity.
    pub(crate) fn value_unchecked(&self, index: usize) -> &[u8] {
        let start = self.offsets.start_offset(index);
        self.values.read(start, self.offsets.end_offset(index) - start)
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index < self.state.value_count {
            Ok(())
        } else {
            Err(Error::IndexOutOfBounds {
                index,
                value_count: self.state.value_count,
            })
        }
    }

    /// Returns whether slot `index` is null.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not less than the value count.
    pub fn is_null(&self, index: usize) -> bool {
        assert!(index < self.state.value_count, "index out of bound");
        self.validity.is_null(index)
    }

    /// Returns whether slot `index` holds a value.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not less than the value count.
    pub fn is_set(&self, index: usize) -> bool {
        !self.is_null(index)
    }

    /// Returns the byte length of slot `index`; null slots have length zero.
    ///
    /// # Errors
    ///
    /// Returns an error if `index` is not less than the value count.
    pub fn value_length(&self, index: usize) -> Result<usize> {
        self.check_index(index)?;
        Ok(self.offsets.length(index))
    }

    /// Returns whether slot `index` is null or holds zero bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if `index` is not less than the value count.
    pub fn is_empty_at(&self, index: usize) -> Result<bool> {
        Ok(self.value_length(index)? == 0)
    }

    pub fn null_count(&self) -> usize {
        self.validity.null_count(self.state.value_count)
    }

    pub fn iter(&self) -> Iter<'_, T, O> {
        Iter {
            vector: self,
            index: 0,
        }
    }

    /// Returns the committed bytes of the three buffers in their wire order.
    pub fn buffers(&self) -> Buffers<'_> {
        let count = self.state.value_count;
        Buffers {
            validity: self.validity.as_slice(count),
            offsets: self.offsets.as_slice(count),
            values: self.values.as_slice(self.total_bytes()),
        }
    }

    /// Checks the structure of the buffers: the offset table starts at zero,
    /// never decreases, stays within the value buffer, and gives null slots
    /// zero length.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first violation found.
    pub fn validate(&self) -> Result<()> {
        let count = self.state.value_count;
        if self.offsets.start_offset(0) != 0 {
            return Err(Error::InvalidLayout("first offset is not zero".to_string()));
        }
        if let Some((i, _)) = (0..=count)
            .map(|i| self.offsets.get(i))
            .tuple_windows()
            .enumerate()
            .find(|(_, (a, b))| b < a)
        {
            return Err(Error::InvalidLayout(format!("offsets decrease at index {}", i)));
        }
        let total = self.total_bytes();
        if total > self.values.capacity() {
            return Err(Error::InvalidLayout(format!(
                "last offset {} exceeds value buffer capacity {}",
                total,
                self.values.capacity()
            )));
        }
        if let Some(i) =
            (0..count).find(|&i| self.validity.is_null(i) && self.offsets.length(i) != 0)
        {
            return Err(Error::InvalidLayout(format!(
                "null slot {} has non-zero length",
                i
            )));
        }
        Ok(())
    }

    /// Checks every non-null value against the scalar rule of the element
    /// type, reporting every offending slot.
    ///
    /// # Errors
    ///
    /// Returns the list of offending slots if there is at least one.
    pub fn validate_scalars(&self) -> std::result::Result<(), ValidationError> {
        let failures: Vec<InvalidScalar> = self
            .iter()
            .enumerate()
            .filter_map(|(index, value)| {
                let reason = T::validate_scalar(value?).err()?;
                Some(InvalidScalar { index, reason })
            })
            .collect();
        if failures.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { failures })
        }
    }

    /// Zeroes the buffers and forgets every slot, keeping the memory.
    pub fn reset(&mut self) {
        self.validity.clear_bits();
        self.offsets.clear_offsets();
        self.values.clear_values();
        self.state = SlotState::new();
    }

    /// Returns every buffer to the allocator and forgets every slot.
    pub fn clear(&mut self) {
        let allocator = self.allocator.as_ref();
        self.validity.release(allocator);
        self.offsets.release(allocator);
        self.values.release(allocator);
        self.state = SlotState::new();
    }
}

impl<T: VarWidthType, O: OffsetSize> Drop for GenericVarWidthVector<T, O> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T: VarWidthType, O: OffsetSize> super::Vector for GenericVarWidthVector<T, O> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn field(&self) -> &Field {
        &self.field
    }

    fn len(&self) -> usize {
        self.state.value_count
    }

    fn null_count(&self) -> usize {
        GenericVarWidthVector::null_count(self)
    }

    fn validate(&self) -> Result<()> {
        GenericVarWidthVector::validate(self)
    }

    fn validate_scalars(&self) -> std::result::Result<(), ValidationError> {
        GenericVarWidthVector::validate_scalars(self)
    }
}

impl<T: VarWidthType, O: OffsetSize> fmt::Debug for GenericVarWidthVector<T, O> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}Vector", T::NAME)?;
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: VarWidthType, O: OffsetSize> PartialEq for GenericVarWidthVector<T, O> {
    fn eq(&self, other: &Self) -> bool {
        self.state.value_count == other.state.value_count && self.iter().eq(other.iter())
    }
}

impl<'a, T: VarWidthType, O: OffsetSize> IntoIterator for &'a GenericVarWidthVector<T, O> {
    type Item = <Iter<'a, T, O> as Iterator>::Item;
    type IntoIter = Iter<'a, T, O>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// The committed bytes of a vector, in wire order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Buffers<'a> {
    pub validity: &'a [u8],
    pub offsets: &'a [u8],
    pub values: &'a [u8],
}

pub struct Iter<'a, T: VarWidthType, O: OffsetSize> {
    vector: &'a GenericVarWidthVector<T, O>,
    index: usize,
}

impl<'a, T: VarWidthType, O: OffsetSize> Iterator for Iter<'a, T, O> {
    type Item = Option<&'a [u8]>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.vector.state.value_count {
            return None;
        }
        let i = self.index;
        self.index += 1;
        if self.vector.validity.is_null(i) {
            Some(None)
        } else {
            Some(Some(self.vector.value_unchecked(i)))
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.vector.state.value_count - self.index;
        (remaining, Some(remaining))
    }
}

impl<'a, T: VarWidthType, O: OffsetSize> ExactSizeIterator for Iter<'a, T, O> {}
