//! Adaptive chunk sizing
//!
//! The read granularity grows with the payload so that small transfers get
//! fine-grained progress and large ones avoid per-chunk overhead.

/// One kibibyte
pub const KIB: u64 = 1024;
/// One mebibyte
pub const MIB: u64 = 1024 * KIB;
/// One gibibyte
pub const GIB: u64 = 1024 * MIB;

/// Chunk size used when the total is unknown or at most 10 MiB
pub const SMALL_CHUNK: usize = 512 * KIB as usize;

/// Size tiers as `(inclusive upper bound, chunk size)`
const TIERS: &[(u64, usize)] = &[
    (10 * MIB, SMALL_CHUNK),
    (100 * MIB, MIB as usize),
    (GIB, 2 * MIB as usize),
];

/// Chunk size for anything above the last tier
const LARGEST_CHUNK: usize = 4 * MIB as usize;

/// Choose the chunk size for a transfer.
///
/// A positive `override_size` always wins. Otherwise the size is picked from
/// the total payload size:
///
/// | total size | chunk size |
/// |---|---|
/// | unknown or <= 10 MiB | 512 KiB |
/// | <= 100 MiB | 1 MiB |
/// | <= 1 GiB | 2 MiB |
/// | > 1 GiB | 4 MiB |
pub fn choose_chunk_size(total_size: Option<u64>, override_size: Option<usize>) -> usize {
    if let Some(size) = override_size.filter(|&s| s > 0) {
        return size;
    }

    let total = match total_size {
        Some(total) if total > 0 => total,
        _ => return SMALL_CHUNK,
    };

    TIERS
        .iter()
        .find(|(limit, _)| total <= *limit)
        .map(|(_, chunk)| *chunk)
        .unwrap_or(LARGEST_CHUNK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_size_uses_small_chunk() {
        assert_eq!(choose_chunk_size(None, None), 512 * 1024);
        assert_eq!(choose_chunk_size(Some(0), None), 512 * 1024);
    }

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(choose_chunk_size(Some(1), None), 512 * 1024);
        assert_eq!(choose_chunk_size(Some(10 * MIB), None), 512 * 1024);
        assert_eq!(choose_chunk_size(Some(10 * MIB + 1), None), 1024 * 1024);
        assert_eq!(choose_chunk_size(Some(100 * MIB), None), 1024 * 1024);
        assert_eq!(choose_chunk_size(Some(100 * MIB + 1), None), 2 * 1024 * 1024);
        assert_eq!(choose_chunk_size(Some(GIB), None), 2 * 1024 * 1024);
        assert_eq!(choose_chunk_size(Some(GIB + 1), None), 4 * 1024 * 1024);
        assert_eq!(choose_chunk_size(Some(u64::MAX), None), 4 * 1024 * 1024);
    }

    #[test]
    fn test_override_always_wins() {
        for total in [None, Some(0), Some(5 * MIB), Some(500 * MIB), Some(50 * GIB)] {
            assert_eq!(choose_chunk_size(total, Some(4096)), 4096);
            assert_eq!(choose_chunk_size(total, Some(8 * MIB as usize)), 8 * MIB as usize);
        }
    }

    #[test]
    fn test_zero_override_is_ignored() {
        assert_eq!(choose_chunk_size(Some(200 * MIB), Some(0)), 2 * 1024 * 1024);
    }
}
