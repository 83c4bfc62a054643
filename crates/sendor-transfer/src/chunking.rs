//! Chunk-boundary math for [`crate::ActionSpec::ParallelSftpPut`].

const MIN_CHUNKS: u64 = 1;
const MAX_CHUNKS: u64 = 99;

/// How many chunks a file of `size` bytes should be split into, given the
/// target's preferred `chunk_size`. Clamped to `[1, 99]` — below that a
/// transfer isn't worth parallelizing, above it per-chunk overhead (SSH
/// channel setup, remote `sha1sum` verification) dominates.
pub fn num_chunks(size: u64, chunk_size: u64) -> u64 {
    if chunk_size == 0 {
        return MIN_CHUNKS;
    }
    (size / chunk_size).clamp(MIN_CHUNKS, MAX_CHUNKS)
}

/// Byte-range `(offset, length)` pairs partitioning `size` bytes into
/// `num_chunks` contiguous, non-overlapping ranges whose lengths differ by
/// at most one byte — boundaries fall at `floor(i * size / num_chunks)`.
pub fn chunk_ranges(size: u64, num_chunks: u64) -> Vec<(u64, u64)> {
    (0..num_chunks)
        .map(|i| {
            let offset = (i * size) / num_chunks;
            let end = ((i + 1) * size) / num_chunks;
            (offset, end - offset)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn num_chunks_clamps_to_minimum() {
        assert_eq!(num_chunks(10, 1024 * 1024), MIN_CHUNKS);
    }

    #[test]
    fn num_chunks_clamps_to_maximum() {
        assert_eq!(num_chunks(1_000_000_000, 1), MAX_CHUNKS);
    }

    #[test]
    fn ranges_cover_entire_file_with_no_gaps() {
        let ranges = chunk_ranges(110, 4);
        assert_eq!(ranges, vec![(0, 27), (27, 28), (55, 27), (82, 28)]);
        let total: u64 = ranges.iter().map(|(_, len)| len).sum();
        assert_eq!(total, 110);
    }

    #[test]
    fn single_chunk_covers_whole_file() {
        assert_eq!(chunk_ranges(500, 1), vec![(0, 500)]);
    }
}
