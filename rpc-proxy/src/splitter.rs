use std::num::NonZeroU64;

/// Inclusive range of block numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRange {
    pub from: u64,
    pub to: u64,
}

/// Splits `[from, to]` into consecutive ranges of at most `max_range` blocks.
///
/// Returns an empty plan if `to < from`.
pub fn split(from: u64, to: u64, max_range: NonZeroU64) -> Vec<BlockRange> {
    let max_range = max_range.get();
    let mut plan = Vec::new();

    if to < from {
        return plan;
    }

    let mut start = from;
    loop {
        let end = start.saturating_add(max_range - 1).min(to);
        plan.push(BlockRange { from: start, to: end });

        if end == to {
            break;
        }
        start = end + 1;
    }

    plan
}
