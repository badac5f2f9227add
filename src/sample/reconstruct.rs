//! Lossless reconstruction of a partially consumed input
//!
//! Sampling pulls a prefix off the front of the caller's iterator. For
//! one-shot sequences those items would otherwise be gone, so the buffered
//! prefix is lazily chained back in front of the untouched remainder. The
//! caller sees the original sequence once, in order, with nothing eagerly
//! materialized beyond what sampling already buffered. This is a correctness
//! requirement, not an optimization: it must hold for infinite sources too.

/// The sampled prefix followed by the unconsumed tail of the original input.
#[derive(Debug)]
pub struct Reassembled<I, T> {
    prefix: std::vec::IntoIter<T>,
    tail: I,
}

impl<I, T> Reassembled<I, T>
where
    I: Iterator<Item = T>,
{
    pub fn new(prefix: Vec<T>, tail: I) -> Self {
        Self {
            prefix: prefix.into_iter(),
            tail,
        }
    }
}

impl<I, T> Iterator for Reassembled<I, T>
where
    I: Iterator<Item = T>,
{
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.prefix.next().or_else(|| self.tail.next())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let (prefix_lo, prefix_hi) = self.prefix.size_hint();
        let (tail_lo, tail_hi) = self.tail.size_hint();
        let hi = match (prefix_hi, tail_hi) {
            (Some(a), Some(b)) => a.checked_add(b),
            _ => None,
        };
        (prefix_lo.saturating_add(tail_lo), hi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_then_tail_in_original_order() {
        let mut source = (0..10).collect::<Vec<i32>>().into_iter();
        let prefix: Vec<i32> = source.by_ref().take(4).collect();

        let reassembled = Reassembled::new(prefix, source);
        let items: Vec<i32> = reassembled.collect();
        assert_eq!(items, (0..10).collect::<Vec<i32>>());
    }

    #[test]
    fn empty_prefix_passes_tail_through() {
        let reassembled = Reassembled::new(Vec::new(), 5..8);
        assert_eq!(reassembled.collect::<Vec<i32>>(), vec![5, 6, 7]);
    }

    #[test]
    fn fully_consumed_source_yields_only_prefix() {
        let source = Vec::<u8>::new().into_iter();
        let reassembled = Reassembled::new(vec![1, 2, 3], source);
        assert_eq!(reassembled.collect::<Vec<u8>>(), vec![1, 2, 3]);
    }

    #[test]
    fn stays_lazy_over_infinite_tail() {
        let reassembled = Reassembled::new(vec![0u64, 1], 2u64..);
        let first_five: Vec<u64> = reassembled.take(5).collect();
        assert_eq!(first_five, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn size_hint_combines_both_halves() {
        let reassembled = Reassembled::new(vec![1, 2], 3..6);
        assert_eq!(reassembled.size_hint(), (5, Some(5)));
    }
}
