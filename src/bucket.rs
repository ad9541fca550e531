//! Bucket: one large region subdivided into live allocations and free blocks.
//!
//! Free space is an unordered list of `MemoryBlock`s searched best-fit.
//! Freed ranges are appended without looking for neighbours; adjacent
//! blocks are only merged by an explicit `cleanup` pass. Live allocations
//! are keyed by their offset from the bucket base.
//!
//! ```text
//!   0                                                          size
//!   ┌────────┬──────┬───────────┬──────┬─────────────────────────┐
//!   │ live A │ free │  live B   │ free │          free           │
//!   └────────┴──────┴───────────┴──────┴─────────────────────────┘
//!             ▲ freed, not yet merged ─┴─ with its right neighbour
//! ```

use crate::block::{Allocation, MemoryBlock};
use crate::error::AllocResult;
use crate::region::Region;
use std::collections::HashMap;

pub struct Bucket {
    region: Region,
    free_blocks: Vec<MemoryBlock>,
    /// Live allocations: offset -> size.
    allocations: HashMap<u32, u32>,
    /// Smallest non-tombstone free block (0 if there is none).
    min_free_block_size: u32,
    /// Largest non-tombstone free block (0 if there is none).
    max_free_block_size: u32,
}

impl Bucket {
    /// Reserve a new bucket of `size` bytes, seeded with a single free block
    /// spanning the whole region. Zero-sized buckets are rejected.
    pub fn new(size: u32) -> AllocResult<Self> {
        let region = Region::reserve(size)?;
        Ok(Self {
            region,
            free_blocks: vec![MemoryBlock::new(0, size)],
            allocations: HashMap::new(),
            min_free_block_size: size,
            max_free_block_size: size,
        })
    }

    #[inline]
    pub fn size(&self) -> u32 {
        self.region.size()
    }

    #[inline]
    pub fn min_free_block_size(&self) -> u32 {
        self.min_free_block_size
    }

    #[inline]
    pub fn max_free_block_size(&self) -> u32 {
        self.max_free_block_size
    }

    /// Free blocks in list order, tombstones included.
    pub fn free_blocks(&self) -> &[MemoryBlock] {
        &self.free_blocks
    }

    /// Number of live allocations.
    pub fn live_count(&self) -> usize {
        self.allocations.len()
    }

    /// Live allocations as `(offset, size)` pairs, in no particular order.
    pub fn live_allocations(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.allocations.iter().map(|(&offset, &size)| (offset, size))
    }

    /// Recorded size of the live allocation at `offset`.
    pub fn size_of(&self, offset: u32) -> Option<u32> {
        self.allocations.get(&offset).copied()
    }

    /// The whole region, as an absolute range.
    pub fn region(&self) -> Allocation {
        self.region.as_allocation()
    }

    pub(crate) fn backing(&self) -> &Region {
        &self.region
    }

    pub(crate) fn backing_mut(&mut self) -> &mut Region {
        &mut self.region
    }

    /// Whether a request of `size` bytes is guaranteed to fit: every free
    /// block is at least that large.
    #[inline]
    pub fn can_fit(&self, size: u32) -> bool {
        self.max_free_block_size > 0 && self.min_free_block_size >= size
    }

    /// Index of the smallest block with `length >= size`; first one wins ties.
    fn find_best_block(&self, size: u32) -> Option<usize> {
        let mut best: Option<(usize, u32)> = None;
        for (i, block) in self.free_blocks.iter().enumerate() {
            if block.length < size || block.is_tombstone() {
                continue;
            }
            if best.is_none_or(|(_, len)| block.length < len) {
                best = Some((i, block.length));
            }
        }
        best.map(|(i, _)| i)
    }

    /// Carve `size` bytes from the front of block `id`.
    fn trim_block(&mut self, id: usize, size: u32) {
        let block = &mut self.free_blocks[id];
        if block.length == size {
            block.length = 0;
            return;
        }
        block.start += size;
        block.length -= size;
    }

    fn recalculate(&mut self) {
        let mut min = u32::MAX;
        let mut max = 0;
        for block in self.free_blocks.iter().filter(|b| !b.is_tombstone()) {
            min = min.min(block.length);
            max = max.max(block.length);
        }
        self.min_free_block_size = if max == 0 { 0 } else { min };
        self.max_free_block_size = max;
    }

    /// Fold a newly appended block into the cached aggregates.
    fn note_new_block(&mut self, length: u32) {
        if length == 0 {
            return;
        }
        if self.max_free_block_size == 0 {
            self.min_free_block_size = length;
            self.max_free_block_size = length;
            return;
        }
        self.min_free_block_size = self.min_free_block_size.min(length);
        self.max_free_block_size = self.max_free_block_size.max(length);
    }

    /// Best-fit allocate `size` bytes, returning the offset and the absolute
    /// range. Returns `None` when no free block is large enough. `size` must
    /// be non-zero.
    pub fn allocate(&mut self, size: u32) -> Option<(u32, Allocation)> {
        debug_assert!(size > 0);
        let id = self.find_best_block(size)?;
        let offset = self.free_blocks[id].start;

        self.trim_block(id, size);
        self.recalculate();

        self.allocations.insert(offset, size);
        Some((offset, Allocation::new(self.region.at(offset), size)))
    }

    /// Release the allocation at `offset`, returning its size.
    ///
    /// The range is appended as a new free block; merging with neighbours
    /// waits for `cleanup`.
    pub fn free(&mut self, offset: u32) -> Option<u32> {
        let size = self.allocations.remove(&offset)?;
        self.free_blocks.push(MemoryBlock::new(offset, size));
        self.note_new_block(size);
        Some(size)
    }

    /// Resize the allocation at `offset` without moving it.
    ///
    /// Shrinking always succeeds. Growing succeeds only when a free block
    /// starts exactly at the allocation's end and covers the extra bytes.
    /// Returns `false` for an unknown offset or when growth is not possible.
    pub fn try_resize(&mut self, offset: u32, new_size: u32) -> bool {
        let Some(&old_size) = self.allocations.get(&offset) else {
            return false;
        };

        if new_size == old_size {
            return true;
        }

        if new_size < old_size {
            self.allocations.insert(offset, new_size);
            let tail = old_size - new_size;
            self.free_blocks.push(MemoryBlock::new(offset + new_size, tail));
            self.note_new_block(tail);
            return true;
        }

        let end = offset + old_size;
        let extra = new_size - old_size;
        let Some(id) = self
            .free_blocks
            .iter()
            .position(|b| b.start == end && b.length >= extra && !b.is_tombstone())
        else {
            return false;
        };

        self.trim_block(id, extra);
        self.recalculate();
        self.allocations.insert(offset, new_size);
        true
    }

    /// Coalesce adjacent free blocks and drop tombstones.
    pub fn cleanup(&mut self) {
        self.free_blocks
            .sort_unstable_by_key(|b| (b.is_tombstone(), b.start));

        while self.free_blocks.last().is_some_and(MemoryBlock::is_tombstone) {
            self.free_blocks.pop();
        }

        let mut i = 0;
        while i + 1 < self.free_blocks.len() {
            let next = self.free_blocks[i + 1];
            if next.start != self.free_blocks[i].end() {
                i += 1;
                continue;
            }
            self.free_blocks[i].length += next.length;
            self.free_blocks.remove(i + 1);
        }

        self.recalculate();
    }
}

impl core::fmt::Debug for Bucket {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Bucket")
            .field("region", &self.region)
            .field("free_blocks", &self.free_blocks.len())
            .field("allocations", &self.allocations.len())
            .field("min_free_block_size", &self.min_free_block_size)
            .field("max_free_block_size", &self.max_free_block_size)
            .finish()
    }
}
