use smallvec::SmallVec;
use tracing::trace;

use crate::att::{Handle, HandleRange};

/// First-fit allocator of contiguous attribute handle ranges.
///
/// Free space is kept as a list of ranges that is sorted, disjoint, and
/// maximally merged: no two free ranges are adjacent.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HandleAllocator {
    free: SmallVec<[HandleRange; 4]>,
}

impl HandleAllocator {
    /// Creates an allocator managing the handles in `space`.
    #[inline]
    pub fn new(space: HandleRange) -> Self {
        let mut free = SmallVec::new();
        free.push(space);
        Self { free }
    }

    /// Allocates `n` contiguous handles from the first free range that is
    /// large enough. Returns [`None`] if no such range exists or `n == 0`.
    pub fn allocate(&mut self, n: usize) -> Option<HandleRange> {
        let i = self.free.iter().position(|r| r.len() >= n)?;
        let (got, rest) = self.free[i].split(n)?;
        match rest {
            Some(rest) => self.free[i] = rest,
            None => {
                self.free.remove(i);
            }
        }
        trace!("Allocated handles {got:?}");
        Some(got)
    }

    /// Returns a previously allocated range to the free list, merging it with
    /// its neighbors.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if any part of `r` is already free.
    pub fn release(&mut self, r: HandleRange) {
        // Index of the first free range that starts after r
        let i = self.free.partition_point(|f| f.start() < r.start());
        debug_assert!(
            (i == 0 || self.free[i - 1].end() < r.start())
                && (i == self.free.len() || r.end() < self.free[i].start()),
            "double release of {r:?}"
        );
        let left = i > 0 && self.free[i - 1].precedes(r);
        let right = i < self.free.len() && r.precedes(self.free[i]);
        match (left, right) {
            (false, false) => self.free.insert(i, r),
            (true, false) => self.free[i - 1] = self.free[i - 1].join(r),
            (false, true) => self.free[i] = r.join(self.free[i]),
            (true, true) => {
                let next = self.free.remove(i);
                self.free[i - 1] = self.free[i - 1].join(next);
            }
        }
        trace!("Released handles {r:?}");
    }

    /// Returns whether handle `h` is currently free.
    #[must_use]
    pub fn is_free(&self, h: Handle) -> bool {
        let i = self.free.partition_point(|f| f.end() < h);
        self.free.get(i).map_or(false, |f| f.start() <= h)
    }

    /// Returns the free ranges in ascending order.
    #[inline]
    #[must_use]
    pub fn free(&self) -> &[HandleRange] {
        &self.free
    }

    /// Returns the total number of free handles.
    #[inline]
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.free.iter().map(|r| r.len()).sum()
    }
}

impl Default for HandleAllocator {
    #[inline]
    fn default() -> Self {
        Self::new(HandleRange::ALL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(start: u16, end: u16) -> HandleRange {
        HandleRange::from_raw(start, end).unwrap()
    }

    /// Verifies that the free list is sorted, disjoint, and merged.
    fn check(a: &HandleAllocator) {
        for w in a.free().windows(2) {
            assert!(w[0].end() < w[1].start(), "unsorted {:?}", a.free());
            assert!(!w[0].precedes(w[1]), "unmerged {:?}", a.free());
        }
    }

    /// Splits the space into allocations of the given sizes.
    fn alloc_all(a: &mut HandleAllocator, sizes: &[usize]) -> Vec<HandleRange> {
        sizes.iter().map(|&n| a.allocate(n).unwrap()).collect()
    }

    #[test]
    fn first_fit() {
        let mut a = HandleAllocator::new(r(1, 20));
        assert_eq!(a.allocate(5), Some(r(1, 5)));
        assert_eq!(a.allocate(5), Some(r(6, 10)));
        a.release(r(1, 5));
        // First range large enough, not the best fit
        assert_eq!(a.allocate(3), Some(r(1, 3)));
        assert_eq!(a.free(), &[r(4, 5), r(11, 20)]);
        assert_eq!(a.allocate(6), Some(r(11, 16)));
        assert_eq!(a.allocate(5), None);
        assert_eq!(a.allocate(0), None);
        assert_eq!(a.allocate(4), Some(r(17, 20)));
        assert_eq!(a.free(), &[r(4, 5)]);
        check(&a);
    }

    #[test]
    fn exhaustion() {
        let mut a = HandleAllocator::default();
        assert_eq!(a.allocate(0x10000), None);
        assert_eq!(a.allocate(0xFFFF), Some(HandleRange::ALL));
        assert!(a.free().is_empty());
        assert_eq!(a.allocate(1), None);
        assert!(!a.is_free(Handle::MIN));
        a.release(HandleRange::ALL);
        assert_eq!(a, HandleAllocator::default());
    }

    #[test]
    fn release_merge_cases() {
        // (released ranges, range to release, expected free list)
        #[allow(clippy::type_complexity)]
        let cases: &[(&[(u16, u16)], (u16, u16), &[(u16, u16)])] = &[
            // No neighbors
            (&[(1, 2), (8, 10)], (4, 5), &[(1, 2), (4, 5), (8, 10)]),
            // Left neighbor only
            (&[(1, 3), (8, 10)], (4, 5), &[(1, 5), (8, 10)]),
            // Right neighbor only
            (&[(1, 2), (6, 10)], (4, 5), &[(1, 2), (4, 10)]),
            // Both neighbors
            (&[(1, 3), (6, 10)], (4, 5), &[(1, 10)]),
            // First and last positions
            (&[(5, 10)], (1, 4), &[(1, 10)]),
            (&[(1, 5)], (6, 10), &[(1, 10)]),
            (&[(5, 6)], (1, 2), &[(1, 2), (5, 6)]),
            (&[(1, 2)], (9, 10), &[(1, 2), (9, 10)]),
            (&[], (4, 5), &[(4, 5)]),
        ];
        for &(free, rel, want) in cases {
            let mut a = HandleAllocator::new(r(1, 10));
            a.allocate(10).unwrap();
            for &(s, e) in free {
                a.release(r(s, e));
            }
            a.release(r(rel.0, rel.1));
            let want: Vec<_> = want.iter().map(|&(s, e)| r(s, e)).collect();
            assert_eq!(a.free(), want.as_slice(), "release {rel:?} into {free:?}");
            check(&a);
        }
    }

    #[test]
    fn release_any_order_restores_space() {
        let sizes = [3, 1, 4, 1, 5, 9, 2, 6];
        let orders: [&[usize]; 4] = [
            &[0, 1, 2, 3, 4, 5, 6, 7],
            &[7, 6, 5, 4, 3, 2, 1, 0],
            &[1, 3, 5, 7, 0, 2, 4, 6],
            &[4, 0, 7, 2, 6, 1, 5, 3],
        ];
        for order in orders {
            let mut a = HandleAllocator::new(r(1, 100));
            let got = alloc_all(&mut a, &sizes);
            for &i in order {
                a.release(got[i]);
                check(&a);
            }
            assert_eq!(a.free(), &[r(1, 100)], "order {order:?}");
        }
    }

    #[test]
    fn no_double_allocation() {
        let mut a = HandleAllocator::new(r(1, 64));
        let mut live: Vec<HandleRange> = Vec::new();
        // Deterministic pseudo-random mix of allocations and releases
        let mut x = 0x2545_F491_u32;
        for _ in 0..500 {
            x ^= x << 13;
            x ^= x >> 17;
            x ^= x << 5;
            if x % 3 == 0 && !live.is_empty() {
                let got = live.swap_remove(x as usize % live.len());
                a.release(got);
            } else if let Some(got) = a.allocate(x as usize % 7 + 1) {
                for l in &live {
                    assert!(got.end() < l.start() || l.end() < got.start(), "{got:?} overlaps {l:?}");
                }
                live.push(got);
            }
            check(&a);
            let used: usize = live.iter().map(|r| r.len()).sum();
            assert_eq!(a.free_count() + used, 64);
        }
        for got in live.drain(..) {
            a.release(got);
        }
        assert_eq!(a.free(), &[r(1, 64)]);
    }

    #[test]
    fn is_free() {
        let mut a = HandleAllocator::new(r(1, 10));
        a.allocate(4).unwrap();
        assert!(!a.is_free(Handle::new(4).unwrap()));
        assert!(a.is_free(Handle::new(5).unwrap()));
        assert!(a.is_free(Handle::new(10).unwrap()));
        assert!(!a.is_free(Handle::new(11).unwrap()));
    }
}
