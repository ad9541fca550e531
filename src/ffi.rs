//! C-ABI exports for hosts that link the allocator as a native library.
//!
//! Gated behind `features = ["ffi"]`. Every call goes through the
//! per-process instance in `global`, and raw pointers are mapped back to
//! handles by bucket address-range containment.

use crate::allocator::report;
use crate::global::with_instance;
use core::ptr;

/// Allocate `bytes` bytes. Aborts if the system is out of memory.
#[unsafe(no_mangle)]
pub extern "C" fn bucketalloc_allocate(bytes: u32) -> *mut u8 {
    with_instance(|alloc| {
        let handle = alloc.allocate(bytes);
        alloc.as_ptr(handle).map_or(ptr::null_mut(), |p| p.as_ptr())
    })
}

/// Free a pointer returned by `bucketalloc_allocate`/`bucketalloc_resize`.
/// Unknown pointers are ignored.
#[unsafe(no_mangle)]
pub extern "C" fn bucketalloc_free(ptr: *mut u8) {
    with_instance(|alloc| match alloc.handle_of(ptr) {
        Ok(handle) => alloc.free(handle),
        Err(err) => report(&err),
    })
}

/// Resize `ptr` to `new_size` bytes, returning the possibly moved pointer.
/// A null `ptr` allocates; an unknown `ptr` returns null.
///
/// # Safety
///
/// `ptr` must be null or a pointer previously returned by this library and
/// not yet freed; no other reference to its contents may be live.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn bucketalloc_resize(ptr: *mut u8, new_size: u32) -> *mut u8 {
    if ptr.is_null() {
        return bucketalloc_allocate(new_size);
    }
    with_instance(|alloc| {
        let moved = alloc.handle_of(ptr).and_then(|h| alloc.resize(h, new_size));
        match moved {
            Ok(handle) => alloc.as_ptr(handle).map_or(ptr::null_mut(), |p| p.as_ptr()),
            Err(err) => {
                log::warn!("cannot resize allocation: {err}");
                ptr::null_mut()
            }
        }
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn bucketalloc_cleanup() {
    with_instance(|alloc| alloc.cleanup())
}

#[unsafe(no_mangle)]
pub extern "C" fn bucketalloc_current_allocated_bytes() -> u64 {
    with_instance(|alloc| alloc.current_allocated())
}

#[unsafe(no_mangle)]
pub extern "C" fn bucketalloc_total_allocated_bytes() -> u64 {
    with_instance(|alloc| alloc.total_allocated())
}

#[unsafe(no_mangle)]
pub extern "C" fn bucketalloc_allocated_bytes_since_last_cleanup() -> u64 {
    with_instance(|alloc| alloc.allocated_since_last_cleanup())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::global::test_guard;

    #[test]
    fn test_c_round_trip() {
        let _guard = test_guard();
        // Coalesce what earlier tests freed so the resize can grow in place.
        bucketalloc_cleanup();
        let current = bucketalloc_current_allocated_bytes();
        let total = bucketalloc_total_allocated_bytes();

        let p = bucketalloc_allocate(16);
        assert!(!p.is_null());
        unsafe { ptr::write_bytes(p, 0x5A, 16) };

        let q = unsafe { bucketalloc_resize(p, 64) };
        assert!(!q.is_null());
        let head = unsafe { core::slice::from_raw_parts(q, 16) };
        assert!(head.iter().all(|&b| b == 0x5A));
        assert_eq!(bucketalloc_current_allocated_bytes(), current + 64);

        bucketalloc_free(q);
        assert_eq!(bucketalloc_current_allocated_bytes(), current);
        assert_eq!(bucketalloc_total_allocated_bytes(), total + 64);

        bucketalloc_cleanup();
        assert_eq!(bucketalloc_allocated_bytes_since_last_cleanup(), 0);
    }

    #[test]
    fn test_unknown_pointer() {
        let _guard = test_guard();
        let current = bucketalloc_current_allocated_bytes();
        let mut local = 0u8;
        bucketalloc_free(&mut local);
        assert!(unsafe { bucketalloc_resize(&mut local, 8) }.is_null());
        assert_eq!(bucketalloc_current_allocated_bytes(), current);
    }

    #[test]
    fn test_pointer_freed_on_another_thread() {
        let _guard = test_guard();
        let current = bucketalloc_current_allocated_bytes();

        let addr = std::thread::spawn(|| bucketalloc_allocate(32) as usize)
            .join()
            .unwrap();
        assert_eq!(bucketalloc_current_allocated_bytes(), current + 32);

        bucketalloc_free(addr as *mut u8);
        assert_eq!(bucketalloc_current_allocated_bytes(), current);
    }
}
