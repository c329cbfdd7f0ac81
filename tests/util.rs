//! Shared helpers for the integration suites: a serial reference labeler
//! and collectors that reassemble per-block label fields into one global
//! view.
#![allow(dead_code)]

use grid_recolor::prelude::*;
use std::collections::HashMap;

/// A (layer, global cell) key into the assembled label view.
pub type Site = (usize, [i64; 3]);

/// Assembles every interior cell label of the given domains into one map
/// keyed by global coordinates. Inactive cells are omitted.
pub fn collect_labels<V, C>(domains: &[&Domain<V, C>]) -> HashMap<Site, u64>
where
    V: Copy + PartialEq,
    C: Communicator,
{
    let mut out = HashMap::new();
    for domain in domains {
        let shape = domain.shape();
        for data in domain.local_blocks() {
            let coords = domain.grid().coords(data.id());
            for layer in 0..domain.layer_count() {
                let field = data.labels(layer);
                for z in 0..shape[2] as isize {
                    for y in 0..shape[1] as isize {
                        for x in 0..shape[0] as isize {
                            if let Some(label) = field.get([x, y, z]) {
                                let g = [
                                    coords[0] as i64 * shape[0] as i64 + x as i64,
                                    coords[1] as i64 * shape[1] as i64 + y as i64,
                                    coords[2] as i64 * shape[2] as i64 + z as i64,
                                ];
                                out.insert((layer, g), label.get());
                            }
                        }
                    }
                }
            }
        }
    }
    out
}

/// Serial reference labeling over the whole (virtual) grid.
///
/// Two active sites connect when their cells are 26-adjacent (wrapping only
/// along periodic axes with more than one block), their input values are
/// equal, and their blocks either coincide or share a face — the same
/// adjacency the distributed pipeline observes through its border walks.
/// Returns each active site's class representative.
pub fn reference_classes<F>(
    grid: &BlockGrid,
    shape: [usize; 3],
    layers: usize,
    global: F,
) -> HashMap<Site, usize>
where
    F: Fn(usize, [i64; 3]) -> Option<u8>,
{
    let dims = grid.dims();
    let periodic = grid.periodic();
    let extent: Vec<i64> = (0..3).map(|a| (dims[a] * shape[a]) as i64).collect();

    // enumerate active sites
    let mut sites: Vec<Site> = Vec::new();
    for layer in 0..layers {
        for z in 0..extent[2] {
            for y in 0..extent[1] {
                for x in 0..extent[0] {
                    if global(layer, [x, y, z]).is_some() {
                        sites.push((layer, [x, y, z]));
                    }
                }
            }
        }
    }
    let index: HashMap<Site, usize> = sites.iter().copied().zip(0..).collect();
    let mut parent: Vec<usize> = (0..sites.len()).collect();
    fn find(parent: &mut Vec<usize>, i: usize) -> usize {
        let mut root = i;
        while parent[root] != root {
            root = parent[root];
        }
        let mut cur = i;
        while cur != root {
            let next = parent[cur];
            parent[cur] = root;
            cur = next;
        }
        root
    }

    let block_of = |g: [i64; 3]| -> [i64; 3] {
        [
            g[0] / shape[0] as i64,
            g[1] / shape[1] as i64,
            g[2] / shape[2] as i64,
        ]
    };

    for &(layer, p) in &sites {
        let value = global(layer, p).expect("site is active");
        for dz in -1..=1i64 {
            for dy in -1..=1i64 {
                for dx in -1..=1i64 {
                    if dx == 0 && dy == 0 && dz == 0 {
                        continue;
                    }
                    let mut q = [p[0] + dx, p[1] + dy, p[2] + dz];
                    let mut ok = true;
                    for a in 0..3 {
                        if (0..extent[a]).contains(&q[a]) {
                            continue;
                        }
                        if periodic[a] && dims[a] > 1 {
                            q[a] = q[a].rem_euclid(extent[a]);
                        } else {
                            ok = false;
                            break;
                        }
                    }
                    if !ok {
                        continue;
                    }
                    // border walks only see face-sharing blocks
                    let (bp, bq) = (block_of(p), block_of(q));
                    if (0..3).filter(|&a| bp[a] != bq[a]).count() > 1 {
                        continue;
                    }
                    for ln in 0..layers {
                        if global(ln, q) != Some(value) {
                            continue;
                        }
                        let (i, j) = (index[&(layer, p)], index[&(ln, q)]);
                        let (ri, rj) = (find(&mut parent, i), find(&mut parent, j));
                        if ri != rj {
                            parent[ri.max(rj)] = ri.min(rj);
                        }
                    }
                }
            }
        }
    }

    sites
        .iter()
        .map(|&s| {
            let i = index[&s];
            (s, find(&mut parent, i))
        })
        .collect()
}

/// Asserts that the algorithm's labels induce exactly the reference
/// partition: same active sites, labels equal within a class, distinct
/// across classes.
pub fn assert_matches_reference(labels: &HashMap<Site, u64>, classes: &HashMap<Site, usize>) {
    assert_eq!(
        labels.len(),
        classes.len(),
        "active site sets differ between algorithm and reference"
    );
    let mut class_to_label: HashMap<usize, u64> = HashMap::new();
    let mut label_to_class: HashMap<u64, usize> = HashMap::new();
    for (site, &label) in labels {
        let class = *classes
            .get(site)
            .unwrap_or_else(|| panic!("site {site:?} labeled but inactive in reference"));
        if let Some(&l) = class_to_label.get(&class) {
            assert_eq!(l, label, "class split at {site:?}");
        } else {
            class_to_label.insert(class, label);
        }
        if let Some(&c) = label_to_class.get(&label) {
            assert_eq!(c, class, "classes merged at {site:?}");
        } else {
            label_to_class.insert(label, class);
        }
    }
}

/// Number of distinct labels in an assembled view.
pub fn distinct_labels(labels: &HashMap<Site, u64>) -> usize {
    let set: std::collections::HashSet<u64> = labels.values().copied().collect();
    set.len()
}
