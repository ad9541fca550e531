//! Value types shared by buckets and the allocator.
//!
//! `MemoryBlock` describes free space inside a bucket (offsets are relative
//! to the bucket base). `Allocation` describes a byte range by absolute
//! address. `Handle` is the identity callers hold for a live allocation.

use core::fmt;
use core::ptr::NonNull;

/// A free byte range inside a bucket.
///
/// A length of 0 marks a tombstone: the block was fully consumed and is
/// waiting to be dropped by the next `cleanup`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemoryBlock {
    pub start: u32,
    pub length: u32,
}

impl MemoryBlock {
    pub const fn new(start: u32, length: u32) -> Self {
        Self { start, length }
    }

    /// One past the last byte of the block.
    #[inline]
    pub const fn end(&self) -> u32 {
        self.start + self.length
    }

    #[inline]
    pub const fn is_tombstone(&self) -> bool {
        self.length == 0
    }
}

/// A contiguous byte range identified by its absolute address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Allocation {
    pub pointer: NonNull<u8>,
    pub size: u32,
}

impl Allocation {
    pub const fn new(pointer: NonNull<u8>, size: u32) -> Self {
        Self { pointer, size }
    }

    /// Whether `ptr` falls inside `[pointer, pointer + size)`.
    pub fn contains(&self, ptr: *const u8) -> bool {
        let base = self.pointer.as_ptr() as usize;
        let addr = ptr as usize;
        addr >= base && addr - base < self.size as usize
    }
}

/// Opaque identity of a live allocation: owning bucket index plus offset.
///
/// Handles are only meaningful for the allocator that produced them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle {
    bucket: u32,
    offset: u32,
}

impl Handle {
    pub(crate) const fn new(bucket: u32, offset: u32) -> Self {
        Self { bucket, offset }
    }

    #[inline]
    pub const fn bucket(&self) -> u32 {
        self.bucket
    }

    #[inline]
    pub const fn offset(&self) -> u32 {
        self.offset
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bucket {} +0x{:x}", self.bucket, self.offset)
    }
}
