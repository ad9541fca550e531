//! bucketalloc: a best-fit heap allocator over large pre-reserved buckets.
//!
//! Requests are served from a growable set of buckets, each one large region
//! reserved once from the system allocator:
//! - Buckets: best-fit search over an unordered free-block list, in-place
//!   grow/shrink, and deferred coalescing (`cleanup`)
//! - Allocator: routes requests to the bucket with the most headroom,
//!   reserves new buckets on demand, keeps byte statistics
//! - Handles: callers hold a `Handle` (bucket + offset) instead of a raw
//!   address; liveness is checked on every access
//!
//! The allocator takes no locks. `MemoryAllocator` is `Send` and every
//! operation needs `&mut`; the shared instance in `global` sits behind a
//! mutex.
//!
//! # Usage
//!
//! ```
//! use bucketalloc::MemoryAllocator;
//!
//! let mut alloc = MemoryAllocator::with_default_bucket_size(1 << 20);
//! let h = alloc.allocate(128);
//! alloc.bytes_mut(h).unwrap()[0] = 7;
//! let h = alloc.resize(h, 4096).unwrap();
//! assert_eq!(alloc.bytes(h).unwrap()[0], 7);
//! alloc.free(h);
//! alloc.cleanup();
//! ```

pub mod allocator;
pub mod block;
pub mod bucket;
pub mod buffer;
pub mod config;
pub mod error;
#[cfg(feature = "ffi")]
pub mod ffi;
pub mod global;
mod region;
pub mod stats;

/// Bucket size used when none is configured (256 MiB).
pub const DEFAULT_BUCKET_SIZE: u32 = 1 << 28;

pub use allocator::MemoryAllocator;
pub use block::{Allocation, Handle, MemoryBlock};
pub use bucket::Bucket;
pub use buffer::ByteBuffer;
pub use config::AllocatorConfig;
pub use error::{AllocError, AllocResult};
pub use global::with_instance;
pub use region::REGION_ALIGN;
pub use stats::{AllocatorStats, ByteSize};
