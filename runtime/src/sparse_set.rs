//! Provides a sparse set of program offsets, used to mark instructions as
//! visited while walking the control flow of a program. Clearing is constant
//! time, so a single set can be reused across walks.

pub struct SparseSet {
    dense: Vec<usize>,
    sparse: Vec<usize>,
}

impl SparseSet {
    /// Initializes a new set able to hold every value below `max_len`.
    #[must_use]
    pub fn new(max_len: usize) -> Self {
        Self {
            dense: Vec::with_capacity(max_len),
            sparse: vec![0; max_len],
        }
    }

    /// Inserts a value, returning `true` if it was not already a member.
    /// Values at or beyond the capacity grow the set.
    pub fn insert(&mut self, val: usize) -> bool {
        if self.contains(val) {
            return false;
        }

        if val >= self.sparse.len() {
            self.sparse.resize(val + 1, 0);
        }

        self.sparse[val] = self.dense.len();
        self.dense.push(val);
        true
    }

    /// Returns `true` if the set contains a value.
    pub fn contains(&self, val: usize) -> bool {
        self.sparse
            .get(val)
            .and_then(|&dense_idx| self.dense.get(dense_idx))
            .map(|&member| member == val)
            .unwrap_or(false)
    }

    /// Resets the set to hold values below `max_len`, discarding all members.
    pub fn reset(&mut self, max_len: usize) {
        self.dense.clear();
        if self.sparse.len() < max_len {
            self.sparse.resize(max_len, 0);
        }
    }
}

impl std::fmt::Debug for SparseSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.dense.iter()).finish()
    }
}
