//! Redis-semantics list of log lines

use std::collections::VecDeque;

/// Ordered list of lines with Redis LPUSH/LTRIM/LRANGE index rules.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LogList {
    items: VecDeque<String>,
}

impl LogList {
    pub fn new() -> Self {
        LogList {
            items: VecDeque::new(),
        }
    }

    #[cfg(debug_assertions)]
    fn verify_invariants(&self) {
        debug_assert_eq!(
            self.is_empty(),
            self.len() == 0,
            "Invariant violated: is_empty() must equal len() == 0"
        );
    }

    #[cfg(not(debug_assertions))]
    #[inline(always)]
    fn verify_invariants(&self) {}

    /// LPUSH - prepend, returning the new length
    pub fn lpush(&mut self, value: String) -> usize {
        #[cfg(debug_assertions)]
        let pre_len = self.items.len();

        self.items.push_front(value);

        #[cfg(debug_assertions)]
        debug_assert_eq!(
            self.items.len(),
            pre_len + 1,
            "Postcondition violated: len must increase by 1 after lpush"
        );

        self.verify_invariants();
        self.items.len()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Normalize a Redis `[start, stop]` pair to an in-bounds half-open range.
    /// Returns `None` when the range selects nothing.
    fn normalize(&self, start: isize, stop: isize) -> Option<(usize, usize)> {
        let len = self.items.len() as isize;
        let s = if start < 0 {
            (len + start).max(0)
        } else {
            start.min(len)
        };
        let e = if stop < 0 {
            (len + stop).max(-1)
        } else {
            stop.min(len - 1)
        };

        if s > e || s >= len {
            return None;
        }
        Some((s as usize, (e + 1) as usize))
    }

    /// LRANGE - entries in `[start, stop]`, head first
    pub fn range(&self, start: isize, stop: isize) -> Vec<String> {
        match self.normalize(start, stop) {
            Some((s, e)) => self.items.range(s..e).cloned().collect(),
            None => Vec::new(),
        }
    }

    /// LTRIM - keep only `[start, stop]`; an empty range clears the list
    pub fn trim(&mut self, start: isize, stop: isize) {
        match self.normalize(start, stop) {
            Some((s, e)) => {
                self.items.truncate(e);
                self.items.drain(..s);

                debug_assert_eq!(
                    self.items.len(),
                    e - s,
                    "Postcondition violated: length must equal trimmed range size"
                );
            }
            None => self.items.clear(),
        }

        self.verify_invariants();
    }
}
