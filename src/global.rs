//! Process-wide instance, for callers that cannot thread an allocator
//! through (the C ABI in particular).
//!
//! The instance is created with the default configuration on first use and
//! shared by every thread of the process. The allocator itself takes no
//! locks; calls are serialized by the mutex around the slot. There is no way
//! to replace or re-create the instance. Code that can own a
//! `MemoryAllocator` and pass `&mut` to its consumers should do that instead.

use crate::allocator::MemoryAllocator;
use std::sync::{Mutex, MutexGuard};

static INSTANCE: Mutex<Option<MemoryAllocator>> = Mutex::new(None);

/// Serializes tests that observe the shared instance's counters.
#[cfg(test)]
pub(crate) static TEST_LOCK: Mutex<()> = Mutex::new(());

fn slot() -> MutexGuard<'static, Option<MemoryAllocator>> {
    INSTANCE.lock().unwrap_or_else(|poisoned| {
        // A panic inside `f` cannot leave a bucket half-updated: every
        // mutation completes before control returns to the caller.
        log::error!("allocator instance lock poisoned, recovering");
        poisoned.into_inner()
    })
}

/// Run `f` with exclusive access to the instance, creating it if needed.
///
/// Blocks while another thread holds the instance. Calling `with_instance`
/// again from inside `f` deadlocks.
pub fn with_instance<R>(f: impl FnOnce(&mut MemoryAllocator) -> R) -> R {
    let mut slot = slot();
    let alloc = slot.get_or_insert_with(MemoryAllocator::new);
    f(alloc)
}

/// Whether the instance has been created yet.
pub fn is_initialized() -> bool {
    slot().is_some()
}

#[cfg(test)]
pub(crate) fn test_guard() -> MutexGuard<'static, ()> {
    TEST_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_instance_is_created_once() {
        let _guard = test_guard();
        let (buckets, current, total) =
            with_instance(|a| (a.bucket_count(), a.current_allocated(), a.total_allocated()));
        assert!(is_initialized());

        let h = with_instance(|a| a.allocate(64));
        with_instance(|a| {
            assert_eq!(a.bucket_count(), buckets.max(1));
            assert_eq!(a.size_of(h), Some(64));
            a.free(h);
            assert_eq!(a.current_allocated(), current);
            assert_eq!(a.total_allocated(), total + 64);
        });
    }

    #[test]
    fn test_instance_is_shared_across_threads() {
        let _guard = test_guard();
        let current = with_instance(|a| a.current_allocated());

        let h = thread::spawn(|| {
            with_instance(|a| {
                let h = a.allocate(48);
                a.bytes_mut(h).unwrap().fill(0xC3);
                h
            })
        })
        .join()
        .unwrap();

        with_instance(|a| {
            assert_eq!(a.size_of(h), Some(48));
            assert!(a.bytes(h).unwrap().iter().all(|&b| b == 0xC3));
            assert_eq!(a.current_allocated(), current + 48);
        });

        thread::spawn(move || with_instance(|a| a.try_free(h)))
            .join()
            .unwrap()
            .unwrap();
        with_instance(|a| {
            assert_eq!(a.size_of(h), None);
            assert_eq!(a.current_allocated(), current);
        });
    }
}
