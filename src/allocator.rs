//! Top-level allocator: owns the buckets, routes requests, keeps statistics.
//!
//! Buckets are append-only. A request goes to the bucket with the most
//! headroom among those that can certainly hold it; when none can, a new
//! bucket of `max(default_bucket_size, size)` bytes is reserved from the
//! system allocator. Buckets are released only when the allocator drops.
//!
//! `MemoryAllocator` is `Send` but not `Sync`: it can move between threads,
//! yet every operation needs `&mut self`, and nothing inside it locks.

use crate::block::{Allocation, Handle};
use crate::bucket::Bucket;
use crate::config::AllocatorConfig;
use crate::error::{AllocError, AllocResult};
use crate::region::{REGION_ALIGN, Region};
use crate::stats::AllocatorStats;
use core::alloc::Layout;
use core::ptr::{self, NonNull};
use log::{debug, trace};

cfg_if::cfg_if! {
    if #[cfg(feature = "debug")] {
        #[cold]
        pub(crate) fn report(err: &AllocError) {
            log::warn!("{err}");
        }
    } else {
        #[inline(always)]
        pub(crate) fn report(_err: &AllocError) {}
    }
}

/// Zero-byte requests still occupy one byte so every live allocation has a
/// distinct offset.
#[inline]
fn effective_size(size: u32) -> u32 {
    size.max(1)
}

#[derive(Debug)]
pub struct MemoryAllocator {
    config: AllocatorConfig,
    buckets: Vec<Bucket>,
    stats: AllocatorStats,
}

impl MemoryAllocator {
    pub fn new() -> Self {
        Self::with_config(AllocatorConfig::default())
    }

    pub fn with_config(config: AllocatorConfig) -> Self {
        debug!(
            "memory allocator created, default bucket size {} bytes",
            config.default_bucket_size
        );
        Self {
            config,
            buckets: Vec::new(),
            stats: AllocatorStats::default(),
        }
    }

    pub fn with_default_bucket_size(size: u32) -> Self {
        Self::with_config(AllocatorConfig::new().with_default_bucket_size(size))
    }

    #[inline]
    pub fn config(&self) -> &AllocatorConfig {
        &self.config
    }

    #[inline]
    pub fn stats(&self) -> AllocatorStats {
        self.stats
    }

    #[inline]
    pub fn current_allocated(&self) -> u64 {
        self.stats.current_allocated
    }

    #[inline]
    pub fn total_allocated(&self) -> u64 {
        self.stats.total_allocated
    }

    #[inline]
    pub fn allocated_since_last_cleanup(&self) -> u64 {
        self.stats.allocated_since_last_cleanup
    }

    #[inline]
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    /// Number of live allocations across all buckets.
    pub fn live_allocations(&self) -> usize {
        self.buckets.iter().map(Bucket::live_count).sum()
    }

    // =========================================================================
    // Bucket routing
    // =========================================================================

    /// Bucket with the largest `min_free_block_size` that still fits `size`.
    fn find_preferred_bucket(&self, size: u32) -> Option<usize> {
        let mut preferred: Option<(usize, u32)> = None;
        for (i, bucket) in self.buckets.iter().enumerate() {
            if !bucket.can_fit(size) {
                continue;
            }
            let headroom = bucket.min_free_block_size();
            if preferred.is_none_or(|(_, best)| headroom > best) {
                preferred = Some((i, headroom));
            }
        }
        preferred.map(|(i, _)| i)
    }

    /// Reserve a bucket able to hold `request` bytes and return its index.
    #[cold]
    fn gen_bucket(&mut self, request: u32) -> AllocResult<usize> {
        let size = self.config.bucket_size_for(request);
        let bucket = Bucket::new(size)?;
        self.buckets.push(bucket);
        debug!(
            "reserved bucket {} ({} bytes) for a {} byte request",
            self.buckets.len() - 1,
            size,
            request
        );
        Ok(self.buckets.len() - 1)
    }

    fn bucket(&self, handle: Handle) -> AllocResult<&Bucket> {
        self.buckets
            .get(handle.bucket() as usize)
            .ok_or(AllocError::UnknownAllocation(handle))
    }

    /// Bucket owning `handle` and the recorded size of the allocation.
    fn live(&self, handle: Handle) -> AllocResult<(&Bucket, u32)> {
        let bucket = self.bucket(handle)?;
        let size = bucket
            .size_of(handle.offset())
            .ok_or(AllocError::UnknownAllocation(handle))?;
        Ok((bucket, size))
    }

    // =========================================================================
    // Allocate / free / resize
    // =========================================================================

    /// Allocate `size` bytes, reporting exhaustion of the system allocator
    /// as an error.
    pub fn try_allocate(&mut self, size: u32) -> AllocResult<Handle> {
        let size = effective_size(size);
        let index = match self.find_preferred_bucket(size) {
            Some(index) => index,
            None => self.gen_bucket(size)?,
        };

        let (offset, _) = self.buckets[index]
            .allocate(size)
            .ok_or(AllocError::Exhausted { size })?;

        self.stats.record_alloc(size);
        let handle = Handle::new(index as u32, offset);
        trace!("allocate({size}) -> {handle}");
        Ok(handle)
    }

    /// Allocate `size` bytes. Running the system out of memory is fatal.
    pub fn allocate(&mut self, size: u32) -> Handle {
        match self.try_allocate(size) {
            Ok(handle) => handle,
            Err(err) => {
                log::error!("{err}");
                let bytes = self.config.bucket_size_for(effective_size(size));
                let layout =
                    Region::layout(bytes).unwrap_or(Layout::new::<[u8; REGION_ALIGN]>());
                std::alloc::handle_alloc_error(layout)
            }
        }
    }

    /// Free `handle`, returning the number of bytes released.
    pub fn try_free(&mut self, handle: Handle) -> AllocResult<u32> {
        let (_, size) = self.live(handle)?;
        self.stats.record_free(size);
        self.buckets[handle.bucket() as usize]
            .free(handle.offset())
            .ok_or(AllocError::UnknownAllocation(handle))?;
        trace!("free({handle}) released {size} bytes");
        Ok(size)
    }

    /// Free `handle`. Unknown or already-freed handles are ignored; with the
    /// `debug` feature they are reported through `log`.
    pub fn free(&mut self, handle: Handle) {
        if let Err(err) = self.try_free(handle) {
            report(&err);
        }
    }

    /// Resize the allocation behind `handle` to `new_size` bytes.
    ///
    /// Grows or shrinks in place when the bucket allows it and returns the
    /// same handle. Otherwise moves the contents to a new allocation, frees
    /// the old one and returns the new handle. The first
    /// `min(old, new_size)` bytes are preserved either way.
    pub fn resize(&mut self, handle: Handle, new_size: u32) -> AllocResult<Handle> {
        let new_size = effective_size(new_size);
        let (bucket, old_size) = self.live(handle)?;
        let src = bucket.backing().at(handle.offset());

        if self.buckets[handle.bucket() as usize].try_resize(handle.offset(), new_size) {
            self.stats.record_resize(old_size, new_size);
            trace!("resize({handle}, {new_size}) in place from {old_size}");
            return Ok(handle);
        }

        let moved = self.try_allocate(new_size)?;
        let dst = self.as_ptr(moved).ok_or(AllocError::UnknownAllocation(moved))?;
        let len = old_size.min(new_size) as usize;
        // Both ranges are live at this point, so they cannot overlap.
        unsafe { ptr::copy_nonoverlapping(src.as_ptr(), dst.as_ptr(), len) };
        self.try_free(handle)?;

        trace!("resize({handle}, {new_size}) moved to {moved}");
        Ok(moved)
    }

    /// Coalesce free space in every bucket and reset
    /// `allocated_since_last_cleanup`. No bucket is released.
    pub fn cleanup(&mut self) {
        for bucket in &mut self.buckets {
            bucket.cleanup();
        }
        debug!(
            "cleanup over {} buckets ({} allocated since last cleanup)",
            self.buckets.len(),
            crate::stats::ByteSize(self.stats.allocated_since_last_cleanup)
        );
        self.stats.reset_since_cleanup();
    }

    // =========================================================================
    // Access
    // =========================================================================

    /// Recorded size of a live allocation.
    pub fn size_of(&self, handle: Handle) -> Option<u32> {
        self.live(handle).ok().map(|(_, size)| size)
    }

    /// Absolute address range of a live allocation.
    pub fn allocation(&self, handle: Handle) -> Option<Allocation> {
        let (bucket, size) = self.live(handle).ok()?;
        Some(Allocation::new(bucket.backing().at(handle.offset()), size))
    }

    pub fn as_ptr(&self, handle: Handle) -> Option<NonNull<u8>> {
        self.allocation(handle).map(|a| a.pointer)
    }

    pub fn bytes(&self, handle: Handle) -> Option<&[u8]> {
        let (bucket, size) = self.live(handle).ok()?;
        // Live ranges never overlap, and `&self` rules out a concurrent
        // `bytes_mut`.
        Some(unsafe { bucket.backing().slice(handle.offset(), size) })
    }

    pub fn bytes_mut(&mut self, handle: Handle) -> Option<&mut [u8]> {
        let (_, size) = self.live(handle).ok()?;
        let bucket = &mut self.buckets[handle.bucket() as usize];
        Some(unsafe { bucket.backing_mut().slice_mut(handle.offset(), size) })
    }

    /// Map a raw address back to the live allocation that starts there,
    /// locating the bucket by address-range containment.
    pub fn handle_of(&self, ptr: *const u8) -> AllocResult<Handle> {
        let addr = ptr as usize;
        for (index, bucket) in self.buckets.iter().enumerate() {
            let Some(offset) = bucket.backing().offset_of(ptr) else {
                continue;
            };
            let handle = Handle::new(index as u32, offset);
            return match bucket.size_of(offset) {
                Some(_) => Ok(handle),
                None => Err(AllocError::UnknownAllocation(handle)),
            };
        }
        Err(AllocError::UnownedPointer(addr))
    }
}

impl Default for MemoryAllocator {
    fn default() -> Self {
        Self::new()
    }
}
