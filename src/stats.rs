//! Byte accounting kept by `MemoryAllocator`.
//!
//! - `current_allocated`: bytes in live allocations right now.
//! - `total_allocated`: bytes ever handed out; never decreases.
//! - `allocated_since_last_cleanup`: like `total_allocated`, but reset to 0
//!   by every `cleanup`.

use core::fmt;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AllocatorStats {
    pub current_allocated: u64,
    pub total_allocated: u64,
    pub allocated_since_last_cleanup: u64,
}

impl AllocatorStats {
    pub(crate) fn record_alloc(&mut self, size: u32) {
        let size = size as u64;
        self.current_allocated += size;
        self.total_allocated += size;
        self.allocated_since_last_cleanup += size;
    }

    pub(crate) fn record_free(&mut self, size: u32) {
        self.current_allocated = self.current_allocated.saturating_sub(size as u64);
    }

    /// In-place resize from `old` to `new` bytes.
    pub(crate) fn record_resize(&mut self, old: u32, new: u32) {
        if new >= old {
            self.record_alloc(new - old);
        } else {
            self.record_free(old - new);
        }
    }

    pub(crate) fn reset_since_cleanup(&mut self) {
        self.allocated_since_last_cleanup = 0;
    }
}

impl fmt::Display for AllocatorStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "current: {}, total: {}, since cleanup: {}",
            ByteSize(self.current_allocated),
            ByteSize(self.total_allocated),
            ByteSize(self.allocated_since_last_cleanup),
        )
    }
}

/// Human-readable byte count (1024-based, one decimal above 1 KiB).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ByteSize(pub u64);

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const KB: f64 = 1024.0;
        const MB: f64 = KB * 1024.0;
        const GB: f64 = MB * 1024.0;
        const TB: f64 = GB * 1024.0;

        let bytes = self.0 as f64;
        if bytes < KB {
            write!(f, "{}b", self.0)
        } else if bytes < MB {
            write!(f, "{:.1}kb", bytes / KB)
        } else if bytes < GB {
            write!(f, "{:.1}mb", bytes / MB)
        } else if bytes < TB {
            write!(f, "{:.1}gb", bytes / GB)
        } else {
            write!(f, "{:.1}tb", bytes / TB)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_size_units() {
        assert_eq!(ByteSize(0).to_string(), "0b");
        assert_eq!(ByteSize(1023).to_string(), "1023b");
        assert_eq!(ByteSize(1536).to_string(), "1.5kb");
        assert_eq!(ByteSize(3 << 20).to_string(), "3.0mb");
        assert_eq!(ByteSize(1 << 30).to_string(), "1.0gb");
        assert_eq!(ByteSize(5 << 40).to_string(), "5.0tb");
    }

    #[test]
    fn test_resize_accounting() {
        let mut stats = AllocatorStats::default();
        stats.record_alloc(100);
        stats.record_resize(100, 250);
        assert_eq!(stats.current_allocated, 250);
        assert_eq!(stats.total_allocated, 250);

        stats.record_resize(250, 50);
        assert_eq!(stats.current_allocated, 50);
        assert_eq!(stats.total_allocated, 250);
        assert_eq!(stats.allocated_since_last_cleanup, 250);
    }

    #[test]
    fn test_display() {
        let stats = AllocatorStats {
            current_allocated: 200,
            total_allocated: 2048,
            allocated_since_last_cleanup: 0,
        };
        assert_eq!(
            stats.to_string(),
            "current: 200b, total: 2.0kb, since cleanup: 0b"
        );
    }
}
