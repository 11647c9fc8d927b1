//! Divides the input into contiguous, balanced splits, one per mapper.

use std::ops::Range;

/// Computes `num_mappers` contiguous ranges covering `0..len`.
///
/// Sizes differ by at most one; the first `len % num_mappers` splits carry the
/// extra record. A mapper count of zero is treated as one. Splits past the end
/// of a short input are empty.
pub fn split_ranges(len: usize, num_mappers: usize) -> Vec<Range<usize>> {
    let num_mappers = num_mappers.max(1);
    let base = len / num_mappers;
    let extra = len % num_mappers;

    let mut start = 0;
    (0..num_mappers)
        .map(|index| {
            let size = base + usize::from(index < extra);
            let range = start..start + size;
            start += size;
            range
        })
        .collect()
}

/// Borrows `input` as `num_mappers` slices laid out by [`split_ranges`].
pub fn split<I>(input: &[I], num_mappers: usize) -> Vec<&[I]> {
    split_ranges(input.len(), num_mappers)
        .into_iter()
        .map(|range| &input[range])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_cover_input_in_order() {
        let input: Vec<u32> = (0..23).collect();
        for m in 1..=30 {
            let splits = split(&input, m);
            assert_eq!(splits.len(), m);
            let joined: Vec<u32> = splits.concat();
            assert_eq!(joined, input, "m = {m}");
        }
    }

    #[test]
    fn split_sizes_differ_by_at_most_one() {
        for len in 0..40 {
            for m in 1..12 {
                let sizes: Vec<usize> = split_ranges(len, m).iter().map(|r| r.len()).collect();
                let min = sizes.iter().min().copied().unwrap_or(0);
                let max = sizes.iter().max().copied().unwrap_or(0);
                assert!(max - min <= 1, "len {len}, m {m}: {sizes:?}");
                assert_eq!(sizes.iter().sum::<usize>(), len);
            }
        }
    }

    #[test]
    fn larger_splits_come_first() {
        assert_eq!(split_ranges(7, 3), vec![0..3, 3..5, 5..7]);
    }

    #[test]
    fn zero_mappers_means_one_split() {
        assert_eq!(split_ranges(5, 0), vec![0..5]);
    }

    #[test]
    fn empty_input_yields_empty_splits() {
        let splits = split_ranges(0, 3);
        assert_eq!(splits.len(), 3);
        assert!(splits.iter().all(|r| r.is_empty()));
    }
}
