use crate::util::bit_util;
use log::debug;
use std::alloc::{alloc_zeroed, dealloc, realloc, Layout};
use std::fmt;
use std::ptr;
use std::slice;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;

const ALIGNMENT: usize = 64;

/// A contiguous, mutable, and growable memory region aligned at a 64-byte
/// boundary.
///
/// The whole capacity is addressable and zero-initialized when allocated or
/// grown. Buffers are obtained from an [`Allocator`] and should be handed back
/// to it with [`Allocator::release`] so that its accounting stays correct;
/// dropping a buffer frees the memory but bypasses the accounting.
pub struct BufferMut {
    data: *mut u8,
    capacity: usize,
}

impl BufferMut {
    /// Creates a buffer that owns no memory.
    pub const fn empty() -> Self {
        Self {
            data: ptr::null_mut(),
            capacity: 0,
        }
    }

    fn with_capacity_zeroed(capacity: usize) -> Result<Self, AllocationError> {
        let capacity = checked_capacity(capacity)?;
        if capacity == 0 {
            return Ok(Self::empty());
        }
        let layout = layout(capacity)?;
        let data = unsafe { alloc_zeroed(layout) };
        if data.is_null() {
            return Err(AllocationError::Other);
        }
        Ok(Self { data, capacity })
    }

    /// Grows the buffer to hold at least `new_capacity` bytes. The existing
    /// bytes are kept and the new bytes are zeroed. On failure the buffer is
    /// left as it was.
    fn grow_zeroed(&mut self, new_capacity: usize) -> Result<(), AllocationError> {
        let new_capacity = checked_capacity(new_capacity)?;
        if new_capacity <= self.capacity {
            return Ok(());
        }
        if self.data.is_null() {
            *self = Self::with_capacity_zeroed(new_capacity)?;
            return Ok(());
        }
        layout(new_capacity)?;
        let data = unsafe { realloc(self.data, layout(self.capacity)?, new_capacity) };
        if data.is_null() {
            return Err(AllocationError::Other);
        }
        unsafe {
            ptr::write_bytes(data.add(self.capacity), 0, new_capacity - self.capacity);
        }
        self.data = data;
        self.capacity = new_capacity;
        Ok(())
    }

    /// Returns the total capacity of this buffer.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns whether this buffer owns no memory.
    pub fn is_empty(&self) -> bool {
        self.capacity == 0
    }

    /// Returns the whole capacity of this buffer as a slice.
    pub fn as_slice(&self) -> &[u8] {
        if self.data.is_null() {
            &[]
        } else {
            unsafe { slice::from_raw_parts(self.data, self.capacity) }
        }
    }

    /// Returns the whole capacity of this buffer as a mutable slice.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        if self.data.is_null() {
            &mut []
        } else {
            unsafe { slice::from_raw_parts_mut(self.data, self.capacity) }
        }
    }

    /// Returns the raw pointer to the beginning of this buffer.
    pub fn raw_data(&self) -> *const u8 {
        self.data
    }

    /// Fills the whole buffer with zeros.
    pub fn zero(&mut self) {
        for b in self.as_mut_slice() {
            *b = 0;
        }
    }
}

impl Default for BufferMut {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for BufferMut {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("BufferMut")
            .field("ptr", &self.data)
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl Drop for BufferMut {
    fn drop(&mut self) {
        if !self.data.is_null() {
            unsafe {
                dealloc(
                    self.data,
                    Layout::from_size_align_unchecked(self.capacity, ALIGNMENT),
                );
            }
        }
    }
}

unsafe impl Send for BufferMut {}
unsafe impl Sync for BufferMut {}

fn checked_capacity(capacity: usize) -> Result<usize, AllocationError> {
    if capacity > usize::max_value() - 63 {
        return Err(AllocationError::TooLarge);
    }
    Ok(bit_util::round_upto_multiple_of_64(capacity))
}

fn layout(capacity: usize) -> Result<Layout, AllocationError> {
    Layout::from_size_align(capacity, ALIGNMENT).map_err(|_| AllocationError::TooLarge)
}

#[derive(Debug, Error, PartialEq)]
pub enum AllocationError {
    #[error("cannot allocate memory larger than usize::max_value() - 63 bytes")]
    TooLarge,
    #[error("allocation of {requested} bytes exceeds limit {limit} ({allocated} bytes in use)")]
    LimitExceeded {
        requested: usize,
        allocated: usize,
        limit: usize,
    },
    #[error("allocation failed")]
    Other,
}

/// The source of every buffer a vector owns.
pub trait Allocator: fmt::Debug + Send + Sync {
    /// Allocates a zeroed buffer of at least `size` bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the allocation limit would be exceeded or the
    /// system allocator fails.
    fn allocate(&self, size: usize) -> Result<BufferMut, AllocationError>;

    /// Grows `buffer` to at least `new_size` bytes, keeping its contents.
    /// `buffer` is unchanged when an error is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the allocation limit would be exceeded or the
    /// system allocator fails.
    fn reallocate(&self, buffer: &mut BufferMut, new_size: usize) -> Result<(), AllocationError>;

    /// Returns `buffer` to this allocator.
    fn release(&self, buffer: BufferMut);

    /// Starts accounting for a buffer that was allocated by another allocator.
    ///
    /// # Errors
    ///
    /// Returns an error if the limit of this allocator would be exceeded.
    fn adopt(&self, buffer: &BufferMut) -> Result<(), AllocationError>;

    /// Stops accounting for a buffer handed over to another allocator.
    fn disown(&self, buffer: &BufferMut);

    /// Returns the number of bytes currently accounted to this allocator.
    fn allocated_bytes(&self) -> usize;

    /// Returns the maximum number of bytes this allocator hands out.
    fn limit(&self) -> usize;
}

pub type AllocatorRef = Arc<dyn Allocator>;

/// Returns whether `a` and `b` refer to the same allocator instance.
pub(crate) fn same_allocator(a: &AllocatorRef, b: &AllocatorRef) -> bool {
    Arc::as_ptr(a) as *const u8 == Arc::as_ptr(b) as *const u8
}

/// An allocator backed by the global allocator that enforces an upper bound
/// on the number of outstanding bytes.
#[derive(Debug)]
pub struct RootAllocator {
    limit: usize,
    allocated: AtomicUsize,
}

impl RootAllocator {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            allocated: AtomicUsize::new(0),
        }
    }

    pub fn unlimited() -> Self {
        Self::new(usize::max_value())
    }

    fn reserve(&self, bytes: usize) -> Result<(), AllocationError> {
        let limit = self.limit;
        self.allocated
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |allocated| {
                allocated.checked_add(bytes).filter(|total| *total <= limit)
            })
            .map(|_| ())
            .map_err(|allocated| AllocationError::LimitExceeded {
                requested: bytes,
                allocated,
                limit,
            })
    }

    fn unreserve(&self, bytes: usize) {
        self.allocated.fetch_sub(bytes, Ordering::SeqCst);
    }
}

impl Default for RootAllocator {
    fn default() -> Self {
        Self::unlimited()
    }
}

impl Allocator for RootAllocator {
    fn allocate(&self, size: usize) -> Result<BufferMut, AllocationError> {
        let capacity = checked_capacity(size)?;
        self.reserve(capacity)?;
        match BufferMut::with_capacity_zeroed(capacity) {
            Ok(buffer) => {
                debug!("allocated {} bytes", capacity);
                Ok(buffer)
            }
            Err(e) => {
                self.unreserve(capacity);
                Err(e)
            }
        }
    }

    fn reallocate(&self, buffer: &mut BufferMut, new_size: usize) -> Result<(), AllocationError> {
        let new_capacity = checked_capacity(new_size)?;
        let old_capacity = buffer.capacity();
        if new_capacity <= old_capacity {
            return Ok(());
        }
        self.reserve(new_capacity - old_capacity)?;
        if let Err(e) = buffer.grow_zeroed(new_capacity) {
            self.unreserve(new_capacity - old_capacity);
            return Err(e);
        }
        debug!("reallocated {} -> {} bytes", old_capacity, new_capacity);
        Ok(())
    }

    fn release(&self, buffer: BufferMut) {
        self.unreserve(buffer.capacity());
    }

    fn adopt(&self, buffer: &BufferMut) -> Result<(), AllocationError> {
        self.reserve(buffer.capacity())
    }

    fn disown(&self, buffer: &BufferMut) {
        self.unreserve(buffer.capacity());
    }

    fn allocated_bytes(&self) -> usize {
        self.allocated.load(Ordering::SeqCst)
    }

    fn limit(&self) -> usize {
        self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::{AllocationError, Allocator, BufferMut, RootAllocator};

    #[test]
    fn buffer_mut_empty() {
        let buf = BufferMut::empty();
        assert_eq!(0, buf.capacity());
        assert!(buf.is_empty());
        assert!(buf.as_slice().is_empty());
    }

    #[test]
    fn allocate_rounds_up_and_zeroes() {
        let allocator = RootAllocator::unlimited();
        let buf = allocator.allocate(63).unwrap();
        assert_eq!(64, buf.capacity());
        assert!(buf.as_slice().iter().all(|b| *b == 0));
        assert_eq!(64, allocator.allocated_bytes());
        allocator.release(buf);
        assert_eq!(0, allocator.allocated_bytes());
    }

    #[test]
    fn reallocate_keeps_contents() {
        let allocator = RootAllocator::unlimited();
        let mut buf = allocator.allocate(1).unwrap();
        buf.as_mut_slice()[..5].copy_from_slice(b"hello");

        allocator.reallocate(&mut buf, 10).unwrap();
        assert_eq!(64, buf.capacity());

        allocator.reallocate(&mut buf, 100).unwrap();
        assert_eq!(128, buf.capacity());
        assert_eq!(b"hello", &buf.as_slice()[..5]);
        assert!(buf.as_slice()[64..].iter().all(|b| *b == 0));
        assert_eq!(128, allocator.allocated_bytes());
        allocator.release(buf);
    }

    #[test]
    fn limit_exceeded() {
        let allocator = RootAllocator::new(128);
        let mut buf = allocator.allocate(100).unwrap();
        buf.as_mut_slice()[0] = 7;
        let err = allocator.reallocate(&mut buf, 200).unwrap_err();
        assert_eq!(
            AllocationError::LimitExceeded {
                requested: 128,
                allocated: 128,
                limit: 128
            },
            err
        );
        assert_eq!(128, buf.capacity());
        assert_eq!(7, buf.as_slice()[0]);
        assert!(allocator.allocate(1).is_err());
        allocator.release(buf);
        assert!(allocator.allocate(1).is_ok());
    }

    #[test]
    fn too_large() {
        let allocator = RootAllocator::unlimited();
        assert_eq!(
            AllocationError::TooLarge,
            allocator.allocate(usize::max_value()).unwrap_err()
        );
    }

    #[test]
    fn adopt_and_disown() {
        let a = RootAllocator::unlimited();
        let b = RootAllocator::new(64);
        let buf = a.allocate(64).unwrap();
        b.adopt(&buf).unwrap();
        a.disown(&buf);
        assert_eq!(0, a.allocated_bytes());
        assert_eq!(64, b.allocated_bytes());
        assert!(b.adopt(&buf).is_err());
        b.release(buf);
        assert_eq!(0, b.allocated_bytes());
    }
}
