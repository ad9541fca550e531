//! Shared workloads for the allocator benchmarks.

/// Deterministic request sizes in `[16, 4096)` (xorshift32).
pub fn request_sizes(count: usize, seed: u32) -> Vec<u32> {
    let mut state = seed.max(1);
    (0..count)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            16 + state % 4080
        })
        .collect()
}
