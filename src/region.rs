//! Backing memory for a bucket, reserved from the system allocator.
//!
//! Regions are zero-filled on reservation so every byte handed out through
//! the safe accessors is initialized. Large `calloc`-style requests are
//! served by fresh mappings, so pages are only touched when used.

use crate::block::Allocation;
use crate::error::{AllocError, AllocResult};
use core::alloc::{GlobalAlloc, Layout};
use core::ptr::NonNull;
use std::alloc::System;

/// Base alignment of every region.
pub const REGION_ALIGN: usize = 16;

/// An owned, contiguous byte range obtained from `System`.
pub(crate) struct Region {
    base: NonNull<u8>,
    size: u32,
}

// SAFETY: a region exclusively owns its block, and every access to the
// bytes goes through a borrow of the region (or its owning bucket).
unsafe impl Send for Region {}

impl Region {
    /// Reserve `size` bytes.
    pub fn reserve(size: u32) -> AllocResult<Self> {
        // `GlobalAlloc` forbids zero-sized layouts.
        if size == 0 {
            return Err(AllocError::ZeroSizedBucket);
        }
        let layout = Self::layout(size).ok_or(AllocError::Exhausted { size })?;
        let ptr = unsafe { System.alloc_zeroed(layout) };
        let base = NonNull::new(ptr).ok_or(AllocError::Exhausted { size })?;
        Ok(Self { base, size })
    }

    pub fn layout(size: u32) -> Option<Layout> {
        Layout::from_size_align(size as usize, REGION_ALIGN).ok()
    }

    #[inline]
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn as_allocation(&self) -> Allocation {
        Allocation::new(self.base, self.size)
    }

    /// Offset of `ptr` from the base, if it lies inside the region.
    pub fn offset_of(&self, ptr: *const u8) -> Option<u32> {
        if self.as_allocation().contains(ptr) {
            Some((ptr as usize - self.base.as_ptr() as usize) as u32)
        } else {
            None
        }
    }

    /// Pointer to `offset` bytes past the base.
    #[inline]
    pub fn at(&self, offset: u32) -> NonNull<u8> {
        debug_assert!(offset <= self.size);
        unsafe { self.base.add(offset as usize) }
    }

    /// # Safety
    ///
    /// `[offset, offset + len)` must lie inside the region and must not be
    /// aliased by a live mutable borrow.
    pub unsafe fn slice(&self, offset: u32, len: u32) -> &[u8] {
        unsafe { core::slice::from_raw_parts(self.at(offset).as_ptr(), len as usize) }
    }

    /// # Safety
    ///
    /// `[offset, offset + len)` must lie inside the region and must not be
    /// aliased by any other borrow.
    pub unsafe fn slice_mut(&mut self, offset: u32, len: u32) -> &mut [u8] {
        unsafe { core::slice::from_raw_parts_mut(self.at(offset).as_ptr(), len as usize) }
    }
}

impl Drop for Region {
    fn drop(&mut self) {
        if let Some(layout) = Self::layout(self.size) {
            unsafe { System.dealloc(self.base.as_ptr(), layout) };
        }
    }
}

impl core::fmt::Debug for Region {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Region")
            .field("base", &self.base)
            .field("size", &self.size)
            .finish()
    }
}
