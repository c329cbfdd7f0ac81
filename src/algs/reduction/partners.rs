//! Pairing schedule for the binary-tree CAG reduction.
//!
//! Blocks are leaves of a binary hypercube over the greatest power of two
//! `P <= N`. Core rounds pair block `b` at doubling distances `d = 1, 2,
//! ... < P` with `b + d` or `b - d` depending on the parity of `b / d`.
//! When `N > P`, the `N - P` blocks beyond the core ("outliers") get one
//! preliminary round folding them onto `b - P`, and a mirrored trailing
//! round ships their resolution back out. A block without a partner in some
//! round simply sits the round out.

/// Greatest power of two `<= n`. `n` must be positive.
pub fn greatest_power_of_two(n: usize) -> usize {
    debug_assert!(n > 0);
    let mut p = 1;
    while p << 1 <= n {
        p <<= 1;
    }
    p
}

/// Number of reduction rounds for `blocks` blocks.
pub fn round_count(blocks: usize) -> usize {
    let p = greatest_power_of_two(blocks);
    let fold = if blocks > p { 2 } else { 0 };
    fold + p.trailing_zeros() as usize
}

fn fold_partner(block: usize, blocks: usize, p: usize) -> Option<usize> {
    if block >= p {
        Some(block - p)
    } else if block < blocks - p {
        Some(block + p)
    } else {
        None
    }
}

/// The per-round partner of `block`, `None` meaning "sit this round out".
pub fn partner_schedule(block: usize, blocks: usize) -> Vec<Option<usize>> {
    let p = greatest_power_of_two(blocks);
    let fold = blocks > p;
    let mut partners = Vec::with_capacity(round_count(blocks));
    if fold {
        partners.push(fold_partner(block, blocks, p));
    }
    let mut d = 1;
    while d < p {
        if block < p {
            let skip = if (block / d) % 2 == 1 {
                -(d as isize)
            } else {
                d as isize
            };
            partners.push(Some((block as isize + skip) as usize));
        } else {
            partners.push(None);
        }
        d <<= 1;
    }
    if fold {
        partners.push(fold_partner(block, blocks, p));
    }
    partners
}
