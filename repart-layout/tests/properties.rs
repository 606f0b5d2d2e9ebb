// Copyright (c) The repart Authors
// SPDX-License-Identifier: Apache-2.0

use proptest::prelude::*;
use repart_layout::{Dense1D, Layout, Sparse1D};
use repart_types::{Index, Range, Space};

fn sorted_disjoint_ranges(max_size: i64) -> impl Strategy<Value = Vec<(i64, i64)>> {
    proptest::collection::vec(0i64..max_size, 0..12).prop_map(move |mut cuts| {
        cuts.sort_unstable();
        cuts.dedup();
        cuts.chunks(2)
            .filter(|c| c.len() == 2 && c[0] < c[1])
            .map(|c| (c[0], c[1]))
            .collect::<Vec<_>>()
    })
}

proptest! {
    /// `calculate_mapping` always produces a local length equal to the sum
    /// of the input slices' lengths, and every offset it assigns for a
    /// locally-owned index is within `[0, local_length)`.
    #[test]
    fn sparse_local_length_matches_input_and_offsets_stay_in_bounds(
        slices in sorted_disjoint_ranges(200),
        external in 0u64..4,
    ) {
        let expected_len: u64 = slices.iter().map(|(f, t)| (t - f) as u64).sum();
        let mut s = Sparse1D::calculate_mapping(&slices, external).unwrap();
        prop_assert_eq!(s.local_length(), expected_len);

        for &(from, to) in &slices {
            for g in from..to {
                let off = s.offset(g).unwrap();
                prop_assert!(off < s.local_length());
            }
        }
    }

    /// A dense layout's offset is always the raw index itself, and is
    /// always within `count` when `count` covers the queried index.
    #[test]
    fn dense_offset_is_identity_within_count(count in 0u64..500, query in 0i64..500) {
        let d = Dense1D::new(count);
        if (query as u64) < count {
            prop_assert_eq!(d.offset(0, query).unwrap(), query as u64);
        }
    }

    /// Packing a range out of a buffer and unpacking it into a
    /// same-shaped buffer through two independent dense layouts is the
    /// identity, for any contiguous sub-range of the space.
    #[test]
    fn pack_unpack_round_trip_is_identity(n in 1u64..64, from in 0i64..64, to in 0i64..64) {
        prop_assume!(from < to && (to as u64) <= n);
        let space = Space::new_1d(n).unwrap();
        let range = Range::new(space, Index::new_1d(from), Index::new_1d(to)).unwrap();

        let mut src_layout = Layout::Dense1D(Dense1D::new(n));
        let mut dst_layout = Layout::Dense1D(Dense1D::new(n));
        let src_buf: Vec<u8> = (0..n).map(|i| (i % 251) as u8).collect();
        let mut wire = vec![0u8; (to - from) as usize];
        let mut start = range.from;
        let packed = src_layout.pack(1, &range, &mut start, &src_buf, &mut wire).unwrap();
        prop_assert_eq!(packed, (to - from) as usize);

        let mut dst_buf = vec![0u8; n as usize];
        let mut start2 = range.from;
        dst_layout.unpack(1, &range, &mut start2, &wire, &mut dst_buf).unwrap();
        for i in from..to {
            prop_assert_eq!(dst_buf[i as usize], src_buf[i as usize]);
        }
    }
}
