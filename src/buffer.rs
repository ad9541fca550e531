//! Growable byte buffer backed by a single allocation.
//!
//! Only uses the allocator's public surface (`try_allocate`, `resize`,
//! `free`), so growth goes through in-place resize when the neighbouring
//! free block allows it and relocates otherwise.

use crate::allocator::MemoryAllocator;
use crate::block::Handle;
use crate::error::{AllocError, AllocResult};

/// Capacity reserved by the first growth of a buffer.
pub const DEFAULT_MIN_CAPACITY: u32 = 1 << 24;

#[derive(Debug, PartialEq, Eq)]
pub struct ByteBuffer {
    handle: Option<Handle>,
    capacity: u32,
    len: u32,
    min_capacity: u32,
}

impl ByteBuffer {
    pub const fn new() -> Self {
        Self::with_min_capacity(DEFAULT_MIN_CAPACITY)
    }

    /// Buffer whose first reservation is at least `min_capacity` bytes.
    pub const fn with_min_capacity(min_capacity: u32) -> Self {
        Self {
            handle: None,
            capacity: 0,
            len: 0,
            min_capacity,
        }
    }

    #[inline]
    pub fn handle(&self) -> Option<Handle> {
        self.handle
    }

    #[inline]
    pub fn len(&self) -> u32 {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    #[inline]
    pub fn free_space(&self) -> u32 {
        self.capacity - self.len
    }

    /// Set the capacity to `new_capacity` bytes (at least one), truncating
    /// the contents if it shrinks.
    pub fn resize(
        &mut self,
        alloc: &mut MemoryAllocator,
        new_capacity: u32,
    ) -> AllocResult<()> {
        // The allocator never hands out fewer than one byte.
        let new_capacity = new_capacity.max(1);
        match self.handle {
            None => {
                let capacity = new_capacity.max(self.min_capacity);
                self.handle = Some(alloc.try_allocate(capacity)?);
                self.capacity = capacity;
            }
            Some(handle) => {
                self.handle = Some(alloc.resize(handle, new_capacity)?);
                self.capacity = new_capacity;
                self.len = self.len.min(new_capacity);
            }
        }
        Ok(())
    }

    pub fn expand(&mut self, alloc: &mut MemoryAllocator, additional: u32) -> AllocResult<()> {
        let capacity = self
            .capacity
            .checked_add(additional)
            .ok_or(AllocError::TooLarge(self.capacity as usize + additional as usize))?;
        self.resize(alloc, capacity)
    }

    /// Make room for `bytes` more bytes. Grows by at least the current
    /// capacity, so repeated appends double the buffer.
    pub fn ensure_free_space(
        &mut self,
        alloc: &mut MemoryAllocator,
        bytes: u32,
    ) -> AllocResult<()> {
        let free = self.free_space();
        if free >= bytes {
            return Ok(());
        }
        self.expand(alloc, (bytes - free).max(self.capacity))
    }

    pub fn extend_from_slice(
        &mut self,
        alloc: &mut MemoryAllocator,
        data: &[u8],
    ) -> AllocResult<()> {
        let n = u32::try_from(data.len()).map_err(|_| AllocError::TooLarge(data.len()))?;
        if n == 0 {
            return Ok(());
        }
        self.ensure_free_space(alloc, n)?;

        let handle = self.handle.ok_or(AllocError::TooLarge(data.len()))?;
        let start = self.len as usize;
        let bytes = alloc
            .bytes_mut(handle)
            .ok_or(AllocError::UnknownAllocation(handle))?;
        bytes[start..start + data.len()].copy_from_slice(data);
        self.len += n;
        Ok(())
    }

    /// The written bytes. Empty if nothing was ever reserved.
    pub fn as_slice<'a>(&self, alloc: &'a MemoryAllocator) -> &'a [u8] {
        self.handle
            .and_then(|handle| alloc.bytes(handle))
            .map(|bytes| &bytes[..self.len as usize])
            .unwrap_or(&[])
    }

    /// Return the allocation to `alloc`.
    pub fn release(self, alloc: &mut MemoryAllocator) {
        if let Some(handle) = self.handle {
            alloc.free(handle);
        }
    }
}

impl Default for ByteBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_resize_uses_min_capacity() {
        let mut alloc = MemoryAllocator::with_default_bucket_size(1 << 16);
        let mut buf = ByteBuffer::with_min_capacity(1024);
        buf.resize(&mut alloc, 10).unwrap();
        assert_eq!(buf.capacity(), 1024);
        assert_eq!(alloc.current_allocated(), 1024);
    }

    #[test]
    fn test_ensure_free_space_doubles() {
        let mut alloc = MemoryAllocator::with_default_bucket_size(1 << 16);
        let mut buf = ByteBuffer::with_min_capacity(256);
        buf.ensure_free_space(&mut alloc, 100).unwrap();
        assert_eq!(buf.capacity(), 256);

        buf.extend_from_slice(&mut alloc, &[1; 200]).unwrap();
        buf.ensure_free_space(&mut alloc, 100).unwrap();
        assert_eq!(buf.capacity(), 512);
        assert_eq!(buf.free_space(), 312);
    }

    #[test]
    fn test_contents_survive_relocation() {
        let mut alloc = MemoryAllocator::with_default_bucket_size(1 << 16);
        let mut buf = ByteBuffer::with_min_capacity(64);
        buf.extend_from_slice(&mut alloc, b"hello ").unwrap();
        let first = buf.handle().unwrap();

        // Pin the neighbouring bytes so growth has to move.
        let blocker = alloc.allocate(16);
        let data: Vec<u8> = (0..100u8).collect();
        buf.extend_from_slice(&mut alloc, &data).unwrap();

        assert_ne!(buf.handle().unwrap(), first);
        let slice = buf.as_slice(&alloc);
        assert_eq!(&slice[..6], b"hello ");
        assert_eq!(&slice[6..], data.as_slice());

        alloc.free(blocker);
        buf.release(&mut alloc);
        assert_eq!(alloc.current_allocated(), 0);
    }

    #[test]
    fn test_shrink_truncates() {
        let mut alloc = MemoryAllocator::with_default_bucket_size(4096);
        let mut buf = ByteBuffer::with_min_capacity(8);
        buf.extend_from_slice(&mut alloc, b"abcdefgh").unwrap();
        buf.resize(&mut alloc, 3).unwrap();
        assert_eq!(buf.as_slice(&alloc), b"abc");
    }

    #[test]
    fn test_resize_to_zero_keeps_one_byte() {
        let mut alloc = MemoryAllocator::with_default_bucket_size(4096);
        let mut buf = ByteBuffer::with_min_capacity(8);
        buf.extend_from_slice(&mut alloc, b"abcd").unwrap();
        buf.resize(&mut alloc, 0).unwrap();

        let handle = buf.handle().unwrap();
        assert_eq!(buf.capacity(), 1);
        assert_eq!(alloc.size_of(handle), Some(buf.capacity()));
        assert_eq!(buf.free_space(), 0);
        assert_eq!(buf.as_slice(&alloc), b"a");

        buf.extend_from_slice(&mut alloc, b"z").unwrap();
        assert_eq!(buf.capacity(), 2);
        assert_eq!(buf.as_slice(&alloc), b"az");
        assert_eq!(alloc.current_allocated(), buf.capacity() as u64);
    }

    #[test]
    fn test_first_reservation_of_zero_bytes() {
        let mut alloc = MemoryAllocator::with_default_bucket_size(4096);
        let mut buf = ByteBuffer::with_min_capacity(0);
        buf.resize(&mut alloc, 0).unwrap();
        assert_eq!(buf.capacity(), 1);
        assert_eq!(alloc.size_of(buf.handle().unwrap()), Some(1));
    }

    #[test]
    fn test_empty_buffer() {
        let alloc = MemoryAllocator::with_default_bucket_size(4096);
        let buf = ByteBuffer::new();
        assert!(buf.is_empty());
        assert!(buf.as_slice(&alloc).is_empty());
    }
}
