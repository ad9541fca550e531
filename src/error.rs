//! Error taxonomy for allocator operations.
//!
//! Failing to grow an allocation in place is not an error: `Bucket::try_resize`
//! reports it as `false` and `MemoryAllocator::resize` relocates instead.

use crate::block::Handle;
use thiserror::Error;

pub type AllocResult<T> = Result<T, AllocError>;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    /// The handle names no bucket, or no live allocation inside it.
    #[error("cannot find allocation {0}: bucket not found or already freed")]
    UnknownAllocation(Handle),

    /// A raw address is not contained in any bucket.
    #[error("address 0x{0:x} is not owned by any bucket")]
    UnownedPointer(usize),

    /// A request does not fit the 32-bit size of a bucket.
    #[error("request of {0} bytes exceeds the largest possible bucket")]
    TooLarge(usize),

    /// Buckets must hold at least one byte.
    #[error("cannot reserve a zero-sized bucket")]
    ZeroSizedBucket,

    /// The system allocator refused to reserve a new bucket.
    #[error("system allocator could not reserve a {size} byte bucket")]
    Exhausted { size: u32 },
}
