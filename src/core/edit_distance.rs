// File: src/core/edit_distance.rs

/// Levenshtein alignment cost split by operation, relative to the reference:
/// a deletion is a reference symbol missing from the hypothesis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EditOps {
    pub deletions: usize,
    pub insertions: usize,
    pub substitutions: usize,
}

impl EditOps {
    pub fn distance(&self) -> usize {
        self.deletions + self.insertions + self.substitutions
    }

    fn swapped(self) -> Self {
        Self {
            deletions: self.insertions,
            insertions: self.deletions,
            substitutions: self.substitutions,
        }
    }

    fn plus(self, deletions: usize, insertions: usize, substitutions: usize) -> Self {
        Self {
            deletions: self.deletions + deletions,
            insertions: self.insertions + insertions,
            substitutions: self.substitutions + substitutions,
        }
    }
}

/// Unit-cost Levenshtein alignment of `hypothesis` against `reference`.
/// Complexity: O(|ref| * |hyp|) time, O(min(|ref|, |hyp|)) space.
pub fn edit_ops<T: PartialEq>(hypothesis: &[T], reference: &[T]) -> EditOps {
    // The row runs over the shorter sequence; swapping the roles of the two
    // sequences swaps insertions and deletions.
    if hypothesis.len() > reference.len() {
        align(reference, hypothesis).swapped()
    } else {
        align(hypothesis, reference)
    }
}

pub fn edit_distance<T: PartialEq>(hypothesis: &[T], reference: &[T]) -> usize {
    edit_ops(hypothesis, reference).distance()
}

/// Rolling-row DP with `short` along the row. Rows index into `long`.
fn align<T: PartialEq>(short: &[T], long: &[T]) -> EditOps {
    // prev[j]: cost of aligning long[..i] with short[..j]
    let mut prev: Vec<EditOps> = (0..=short.len())
        .map(|j| EditOps { insertions: j, ..EditOps::default() })
        .collect();
    let mut curr = vec![EditOps::default(); short.len() + 1];

    for (i, l) in long.iter().enumerate() {
        curr[0] = EditOps { deletions: i + 1, ..EditOps::default() };
        for (j, s) in short.iter().enumerate() {
            let diagonal = if l == s {
                prev[j]
            } else {
                prev[j].plus(0, 0, 1)
            };
            let deletion = prev[j + 1].plus(1, 0, 0);
            let insertion = curr[j].plus(0, 1, 0);

            let mut best = diagonal;
            if deletion.distance() < best.distance() {
                best = deletion;
            }
            if insertion.distance() < best.distance() {
                best = insertion;
            }
            curr[j + 1] = best;
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[short.len()]
}

/// Running error-rate statistics over many hypothesis/reference pairs.
///
/// The same type serves as the run-long aggregate and as the per-sample
/// display meter; only the caller decides when to [`reset`](Self::reset).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditDistanceMeter {
    ops: EditOps,
    reference_len: usize,
}

impl EditDistanceMeter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<T: PartialEq>(&mut self, hypothesis: &[T], reference: &[T]) {
        let ops = edit_ops(hypothesis, reference);
        self.ops = self
            .ops
            .plus(ops.deletions, ops.insertions, ops.substitutions);
        self.reference_len += reference.len();
    }

    /// Error rate in percent. An empty reference total yields 0.0.
    pub fn value(&self) -> f64 {
        if self.reference_len == 0 {
            return 0.0;
        }
        100.0 * self.ops.distance() as f64 / self.reference_len as f64
    }

    pub fn counts(&self) -> EditOps {
        self.ops
    }

    pub fn distance(&self) -> usize {
        self.ops.distance()
    }

    pub fn reference_len(&self) -> usize {
        self.reference_len
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
