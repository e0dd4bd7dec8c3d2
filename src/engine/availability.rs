use crate::model::{Minutes, Span};

/// How far the generator advances between candidate start times inside a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotStep {
    /// Back-to-back packing: the next candidate starts where the previous ends.
    ServiceDuration,
    /// A fixed grid independent of the service duration.
    Fixed(Minutes),
}

impl SlotStep {
    pub fn minutes(&self, duration: Minutes) -> Minutes {
        match self {
            SlotStep::ServiceDuration => duration,
            SlotStep::Fixed(m) => *m,
        }
    }
}

/// Sort blocks by start and merge the ones that overlap or touch.
pub fn normalize_blocks(blocks: &[Span]) -> Vec<Span> {
    let mut sorted = blocks.to_vec();
    sorted.sort_by_key(|s| (s.start, s.end));
    merge_overlapping(&sorted)
}

pub fn merge_overlapping(sorted: &[Span]) -> Vec<Span> {
    let mut merged: Vec<Span> = Vec::new();
    for &span in sorted {
        if let Some(last) = merged.last_mut()
            && span.start <= last.end {
                last.end = last.end.max(span.end);
                continue;
            }
        merged.push(span);
    }
    merged
}

/// Whether `candidate` overlaps any span in `busy` (sorted by start).
fn hits_busy(busy: &[Span], candidate: &Span) -> bool {
    let right_bound = busy.partition_point(|b| b.start < candidate.end);
    busy[..right_bound].iter().any(|b| b.end > candidate.start)
}

/// Candidate slots of exactly `duration` minutes.
///
/// Each block is walked from its start in `step` increments; a candidate
/// `[s, s + duration)` is emitted when it ends inside the block and overlaps
/// no busy span. With `normalize` the blocks are sorted and merged first, so
/// the output is strictly ascending. Without it blocks are walked in input
/// order and overlapping blocks can yield the same start more than once.
pub fn generate_slots(
    blocks: &[Span],
    duration: Minutes,
    busy: &[Span],
    step: SlotStep,
    normalize: bool,
) -> Vec<Span> {
    let step = step.minutes(duration);
    if duration <= 0 || step <= 0 {
        return Vec::new();
    }

    let blocks = if normalize {
        normalize_blocks(blocks)
    } else {
        blocks.to_vec()
    };
    let mut busy = busy.to_vec();
    busy.sort_by_key(|s| s.start);

    let mut slots = Vec::new();
    for block in &blocks {
        let mut start = block.start;
        while start + duration <= block.end {
            let candidate = Span::new(start, start + duration);
            if !hits_busy(&busy, &candidate) {
                slots.push(candidate);
            }
            start += step;
        }
    }
    slots
}

/// Whether `slot` lies entirely inside one of the (merged) blocks.
pub fn within_blocks(blocks: &[Span], slot: &Span) -> bool {
    normalize_blocks(blocks)
        .iter()
        .any(|block| block.contains_span(slot))
}
