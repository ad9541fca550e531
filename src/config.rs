//! Allocator configuration.

use crate::DEFAULT_BUCKET_SIZE;

/// Tunables applied when an allocator is created.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AllocatorConfig {
    /// Size of every new bucket, unless a single request needs more.
    pub default_bucket_size: u32,
}

impl AllocatorConfig {
    pub const fn new() -> Self {
        Self {
            default_bucket_size: DEFAULT_BUCKET_SIZE,
        }
    }

    /// Set the default bucket size. Zero means "size each bucket to the
    /// request that created it".
    pub const fn with_default_bucket_size(mut self, size: u32) -> Self {
        self.default_bucket_size = size;
        self
    }

    /// Bytes to reserve for a bucket that must satisfy `request` bytes.
    #[inline]
    pub const fn bucket_size_for(&self, request: u32) -> u32 {
        if request > self.default_bucket_size {
            request
        } else {
            self.default_bucket_size
        }
    }
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_size_for() {
        let config = AllocatorConfig::new().with_default_bucket_size(4096);
        assert_eq!(config.bucket_size_for(1), 4096);
        assert_eq!(config.bucket_size_for(4096), 4096);
        assert_eq!(config.bucket_size_for(10_000), 10_000);
        assert_eq!(AllocatorConfig::default().default_bucket_size, 1 << 28);
    }
}
