//! Single-rank pipeline scenarios: every block hosted by one process, so
//! all traffic takes the same-process path of the exchange.

mod util;

use grid_recolor::prelude::*;
use util::*;

fn single_rank<V, F>(grid: BlockGrid, shape: [usize; 3], layers: usize, f: F) -> Domain<V, NoComm>
where
    V: Copy + PartialEq,
    F: Fn(usize, [i64; 3]) -> Option<V>,
{
    let blocks = grid.block_count();
    Domain::from_global(grid, shape, layers, NoComm, 0, vec![0; blocks], f).unwrap()
}

#[test]
fn two_plus_shaped_clusters_in_one_block() {
    let plus_a: &[[i64; 3]] = &[[1, 0, 0], [0, 1, 0], [1, 1, 0], [2, 1, 0], [1, 2, 0]];
    let plus_b: &[[i64; 3]] = &[[3, 2, 4], [2, 3, 4], [3, 3, 4], [4, 3, 4], [3, 4, 4]];
    let mut domain = single_rank(BlockGrid::new([1, 1, 1]), [5; 3], 1, |_, g| {
        (plus_a.contains(&g) || plus_b.contains(&g)).then_some(1u8)
    });
    recolor(&mut domain).unwrap();
    let labels = collect_labels(&[&domain]);
    assert_eq!(labels.len(), 10);
    assert_eq!(distinct_labels(&labels), 2);
    let a = labels[&(0, plus_a[0])];
    let b = labels[&(0, plus_b[0])];
    assert_ne!(a, b);
    assert_eq!(labels.values().filter(|&&l| l == a).count(), 5);
    assert_eq!(labels.values().filter(|&&l| l == b).count(), 5);
}

#[test]
fn component_spanning_two_blocks() {
    let grid = BlockGrid::with_periodicity([2, 1, 1], [false; 3]);
    assert_eq!(round_count(grid.block_count()), 1);
    let mut domain = single_rank(grid, [4; 3], 1, |_, g| (g[1] == 0).then_some(1u8));
    recolor(&mut domain).unwrap();
    let labels = collect_labels(&[&domain]);
    assert_eq!(labels.len(), 2 * 4 * 4 * 4 / 4);
    assert_eq!(distinct_labels(&labels), 1);
    assert_eq!(labels[&(0, [3, 0, 0])], labels[&(0, [4, 0, 0])]);
}

#[test]
fn component_touching_all_eight_blocks() {
    let grid = BlockGrid::with_periodicity([2, 2, 2], [false; 3]);
    assert_eq!(round_count(grid.block_count()), 3);
    // a 2x2x2 cube around the shared corner of all eight 4^3 blocks
    let mut domain = single_rank(grid, [4; 3], 1, |_, g| {
        g.iter().all(|&c| (3..=4).contains(&c)).then_some(1u8)
    });
    recolor(&mut domain).unwrap();
    let labels = collect_labels(&[&domain]);
    assert_eq!(labels.len(), 8);
    assert_eq!(distinct_labels(&labels), 1);
}

#[test]
fn component_spanning_three_blocks_exercises_the_fold() {
    let grid = BlockGrid::with_periodicity([3, 1, 1], [false; 3]);
    assert_eq!(round_count(grid.block_count()), 3); // fold-in + core + fold-out
    let mut domain = single_rank(grid, [3; 3], 1, |_, g| {
        (g[1] == 1 && g[2] == 1).then_some(1u8)
    });
    recolor(&mut domain).unwrap();
    let labels = collect_labels(&[&domain]);
    assert_eq!(labels.len(), 9);
    assert_eq!(distinct_labels(&labels), 1);
    assert_eq!(labels[&(0, [0, 1, 1])], labels[&(0, [8, 1, 1])]);
}

#[test]
fn separate_components_stay_separate_across_blocks() {
    let grid = BlockGrid::with_periodicity([2, 1, 1], [false; 3]);
    // same value on both sides of the face, but with an inactive gap column
    let mut domain = single_rank(grid, [3; 3], 1, |_, g| {
        (g[0] == 1 || g[0] == 4).then_some(1u8)
    });
    recolor(&mut domain).unwrap();
    let labels = collect_labels(&[&domain]);
    assert_eq!(distinct_labels(&labels), 2);
    // adjacent across the face but different values: also separate
    let mut domain = single_rank(
        BlockGrid::with_periodicity([2, 1, 1], [false; 3]),
        [3; 3],
        1,
        |_, g| if g[0] < 3 { Some(1u8) } else { Some(2u8) },
    );
    recolor(&mut domain).unwrap();
    let labels = collect_labels(&[&domain]);
    assert_eq!(distinct_labels(&labels), 2);
}

#[test]
fn periodic_wrap_connects_first_and_last_block() {
    let grid = BlockGrid::with_periodicity([2, 1, 1], [true, false, false]);
    let mut domain = single_rank(grid, [3; 3], 1, |_, g| {
        (g[1] == 1 && g[2] == 1 && (g[0] == 0 || g[0] == 5)).then_some(1u8)
    });
    recolor(&mut domain).unwrap();
    let labels = collect_labels(&[&domain]);
    assert_eq!(labels.len(), 2);
    assert_eq!(distinct_labels(&labels), 1);
}

#[test]
fn self_wrap_does_not_connect_within_a_single_block() {
    // one block, periodic topology: the wrap lands on the block itself and
    // is not a real neighbor, so opposite domain edges stay separate
    let grid = BlockGrid::new([1, 1, 1]);
    let mut domain = single_rank(grid, [4; 3], 1, |_, g| {
        (g[1] == 0 && g[2] == 0 && (g[0] == 0 || g[0] == 3)).then_some(1u8)
    });
    recolor(&mut domain).unwrap();
    let labels = collect_labels(&[&domain]);
    assert_eq!(distinct_labels(&labels), 2);
}

#[test]
fn cross_layer_bridge_merges_across_blocks() {
    let grid = BlockGrid::with_periodicity([2, 1, 1], [false; 3]);
    // layer 0 populates the left block up to the face, layer 1 continues on
    // the right block; the component exists only through the layer bridge
    let mut domain = single_rank(grid, [3; 3], 2, |layer, g| {
        if g[1] != 1 || g[2] != 1 {
            return None;
        }
        match layer {
            0 => (g[0] <= 2).then_some(5u8),
            _ => (g[0] >= 3).then_some(5u8),
        }
    });
    recolor(&mut domain).unwrap();
    let labels = collect_labels(&[&domain]);
    assert_eq!(labels.len(), 6);
    assert_eq!(distinct_labels(&labels), 1);
    assert_eq!(labels[&(0, [2, 1, 1])], labels[&(1, [3, 1, 1])]);
}

#[test]
fn rerun_on_resolved_field_changes_no_label() {
    // one interior-only component per block: nothing touches a boundary
    let grid = BlockGrid::with_periodicity([2, 2, 1], [false; 3]);
    let mut domain = single_rank(grid.clone(), [3; 3], 1, |_, g| {
        (g[0] % 3 == 1 && g[1] % 3 == 1 && g[2] == 1).then_some(1u64)
    });
    recolor(&mut domain).unwrap();
    let first = collect_labels(&[&domain]);
    assert_eq!(distinct_labels(&first), 4);

    // feed the resolved labels back in as the value field
    let mut second_domain = single_rank(grid, [3; 3], 1, |layer, g| {
        first.get(&(layer, g)).copied()
    });
    recolor(&mut second_domain).unwrap();
    let second = collect_labels(&[&second_domain]);
    assert_eq!(first, second);
}

#[test]
fn identical_runs_are_deterministic() {
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};
    let mut rng = SmallRng::seed_from_u64(0x5eed);
    let extent = 6 * 6 * 3;
    let cells: Vec<Option<u8>> = (0..extent)
        .map(|_| match rng.gen_range(0..3u8) {
            0 => None,
            v => Some(v),
        })
        .collect();
    let f = move |g: [i64; 3]| cells[(g[0] + 6 * (g[1] + 6 * g[2])) as usize];

    let grid = BlockGrid::with_periodicity([2, 2, 1], [false; 3]);
    let run = |f: &dyn Fn([i64; 3]) -> Option<u8>| {
        let mut domain = single_rank(grid.clone(), [3; 3], 1, |_, g| f(g));
        recolor(&mut domain).unwrap();
        collect_labels(&[&domain])
    };
    assert_eq!(run(&f), run(&f));
}

#[test]
fn handcrafted_field_matches_the_reference_labeler() {
    let grid = BlockGrid::with_periodicity([2, 2, 1], [false; 3]);
    let f = |_: usize, g: [i64; 3]| -> Option<u8> {
        // interleaved slabs of two values with gaps
        match (g[0] + 2 * g[1] + g[2]) % 4 {
            0 => Some(1),
            1 => Some(2),
            _ => None,
        }
    };
    let mut domain = single_rank(grid.clone(), [3; 3], 1, f);
    recolor(&mut domain).unwrap();
    let labels = collect_labels(&[&domain]);
    let classes = reference_classes(&grid, [3; 3], 1, f);
    assert_matches_reference(&labels, &classes);
}

#[test]
fn non_cubic_blocks_are_rejected_for_fallback() {
    let grid = BlockGrid::new([2, 1, 1]);
    let mut domain: Domain<u8, NoComm> =
        Domain::new(grid, [4, 4, 2], 1, NoComm, 0, vec![0, 0]).unwrap();
    assert!(matches!(
        recolor(&mut domain),
        Err(RecolorError::NonCubicBlock { .. })
    ));
}

#[test]
fn round_count_stays_within_the_bound() {
    for blocks in 1..=64 {
        let bound = (blocks as f64).log2().ceil() as usize + 2;
        assert!(round_count(blocks) <= bound);
    }
}
