//! bits.rs
//! Dense bit matrix: every group (row) is a fixed-width bit set.
//! Row-major `u64` words; rows never share a word.

const WORD_BITS: usize = 64;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct BitGroupVector {
    group_size: usize,
    words_per_group: usize,
    groups: usize,
    words: Vec<u64>,
}

impl BitGroupVector {
    pub fn new(groups: usize, group_size: usize, value: bool) -> Self {
        let words_per_group = group_size.div_ceil(WORD_BITS);
        let mut bits = Self {
            group_size,
            words_per_group,
            groups,
            words: vec![if value { u64::MAX } else { 0 }; groups * words_per_group],
        };
        if value {
            bits.clear_tails();
        }
        bits
    }

    /// Number of groups (rows).
    pub fn len(&self) -> usize { self.groups }
    pub fn is_empty(&self) -> bool { self.groups == 0 }
    pub fn group_size(&self) -> usize { self.group_size }

    #[inline(always)]
    fn group_words(&self, group: usize) -> &[u64] {
        let start = group * self.words_per_group;
        &self.words[start..start + self.words_per_group]
    }

    #[inline(always)]
    fn locate(&self, group: usize, bit: usize) -> (usize, u64) {
        debug_assert!(group < self.groups, "group {} out of range", group);
        debug_assert!(bit < self.group_size, "bit {} out of range", bit);
        (group * self.words_per_group + bit / WORD_BITS, 1u64 << (bit % WORD_BITS))
    }

    #[inline(always)]
    pub fn get(&self, group: usize, bit: usize) -> bool {
        let (word, mask) = self.locate(group, bit);
        self.words[word] & mask != 0
    }

    #[inline(always)]
    pub fn set(&mut self, group: usize, bit: usize) {
        let (word, mask) = self.locate(group, bit);
        self.words[word] |= mask;
    }

    #[inline(always)]
    pub fn reset(&mut self, group: usize, bit: usize) {
        let (word, mask) = self.locate(group, bit);
        self.words[word] &= !mask;
    }

    /// `self[dst] |= self[src]`
    pub fn or_groups(&mut self, dst: usize, src: usize) {
        if dst == src {
            return;
        }
        let n = self.words_per_group;
        for k in 0..n {
            let w = self.words[src * n + k];
            self.words[dst * n + k] |= w;
        }
    }

    /// `self[dst] |= other[src]`. Both matrices must share the group size.
    pub fn or_group_from(&mut self, dst: usize, other: &BitGroupVector, src: usize) {
        debug_assert_eq!(self.group_size, other.group_size);
        let n = self.words_per_group;
        let src_words = other.group_words(src);
        for (d, s) in self.words[dst * n..(dst + 1) * n].iter_mut().zip(src_words) {
            *d |= *s;
        }
    }

    /// Bitwise AND of the entire matrix with `other`, in place.
    pub fn and_all(&mut self, other: &BitGroupVector) {
        debug_assert_eq!(self.groups, other.groups);
        debug_assert_eq!(self.group_size, other.group_size);
        for (d, s) in self.words.iter_mut().zip(&other.words) {
            *d &= *s;
        }
    }

    pub fn group_is_empty(&self, group: usize) -> bool {
        self.group_words(group).iter().all(|&w| w == 0)
    }

    pub fn count_ones(&self, group: usize) -> usize {
        self.group_words(group).iter().map(|w| w.count_ones() as usize).sum()
    }

    /// True if `self[a]` and `other[b]` have any set bit in common.
    pub fn has_common_set_bits(&self, a: usize, other: &BitGroupVector, b: usize) -> bool {
        self.group_words(a)
            .iter()
            .zip(other.group_words(b))
            .any(|(x, y)| x & y != 0)
    }

    /// True if every bit set in `self[a]` is also set in `other[b]`.
    pub fn is_subset_of(&self, a: usize, other: &BitGroupVector, b: usize) -> bool {
        self.group_words(a)
            .iter()
            .zip(other.group_words(b))
            .all(|(x, y)| x & !y == 0)
    }

    /// Indices of the set bits of one group, ascending.
    pub fn iter_ones(&self, group: usize) -> OnesIter<'_> {
        OnesIter { words: self.group_words(group), word_idx: 0, current: 0 }
    }

    fn clear_tails(&mut self) {
        let tail = self.group_size % WORD_BITS;
        if tail == 0 || self.words_per_group == 0 {
            return;
        }
        let mask = (1u64 << tail) - 1;
        for g in 0..self.groups {
            let last = (g + 1) * self.words_per_group - 1;
            self.words[last] &= mask;
        }
    }
}

pub struct OnesIter<'a> {
    words: &'a [u64],
    word_idx: usize,
    current: u64,
}

impl Iterator for OnesIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        // `current` holds the not yet reported bits of word `word_idx - 1`.
        loop {
            if self.current != 0 {
                let bit = self.current.trailing_zeros() as usize;
                self.current &= self.current - 1;
                return Some((self.word_idx - 1) * WORD_BITS + bit);
            }
            if self.word_idx >= self.words.len() {
                return None;
            }
            self.current = self.words[self.word_idx];
            self.word_idx += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_set_get_reset() {
        let mut bits = BitGroupVector::new(3, 70, false);
        bits.set(1, 0);
        bits.set(1, 69);
        assert!(bits.get(1, 0));
        assert!(bits.get(1, 69));
        assert!(!bits.get(0, 69));
        assert!(!bits.get(2, 0));
        bits.reset(1, 69);
        assert!(!bits.get(1, 69));
        assert_eq!(bits.count_ones(1), 1);
    }

    #[rstest]
    #[case(1)]
    #[case(63)]
    #[case(64)]
    #[case(65)]
    #[case(130)]
    fn test_filled_groups_have_clean_tails(#[case] size: usize) {
        let bits = BitGroupVector::new(2, size, true);
        assert_eq!(bits.count_ones(0), size);
        assert_eq!(bits.iter_ones(1).count(), size);
        assert_eq!(bits.iter_ones(1).last(), Some(size - 1));
    }

    #[test]
    fn test_or_within_and_across() {
        let mut a = BitGroupVector::new(2, 100, false);
        a.set(0, 3);
        a.set(0, 97);
        a.set(1, 5);
        a.or_groups(1, 0);
        assert_eq!(a.iter_ones(1).collect::<Vec<_>>(), vec![3, 5, 97]);

        let mut b = BitGroupVector::new(1, 100, false);
        b.or_group_from(0, &a, 1);
        assert_eq!(b.iter_ones(0).collect::<Vec<_>>(), vec![3, 5, 97]);
    }

    #[test]
    fn test_and_all_clamps_every_group() {
        let mut required = BitGroupVector::new(2, 10, true);
        let mut available = BitGroupVector::new(2, 10, false);
        available.set(0, 2);
        available.set(1, 9);
        required.and_all(&available);
        assert_eq!(required.iter_ones(0).collect::<Vec<_>>(), vec![2]);
        assert_eq!(required.iter_ones(1).collect::<Vec<_>>(), vec![9]);
        assert!(required.is_subset_of(0, &available, 0));
    }

    #[test]
    fn test_common_bits_and_empty_groups() {
        let mut a = BitGroupVector::new(2, 8, false);
        let mut b = BitGroupVector::new(2, 8, false);
        a.set(0, 1);
        b.set(0, 2);
        assert!(!a.has_common_set_bits(0, &b, 0));
        b.set(0, 1);
        assert!(a.has_common_set_bits(0, &b, 0));
        assert!(a.group_is_empty(1));
    }

    #[test]
    fn test_zero_width_groups() {
        let bits = BitGroupVector::new(4, 0, true);
        assert_eq!(bits.len(), 4);
        assert!(bits.group_is_empty(3));
        assert_eq!(bits.iter_ones(0).next(), None);
    }
}
