//! The reduction tree: per-round serialization, exchange, and contraction.
//!
//! Each round a block serializes its live CAG for its partner, the ranks
//! exchange the batched messages, and every participating block merges the
//! received graph into its own and contracts: edges whose target is present
//! are unioned away (lower root wins), edges leaving the merged set keep
//! their component alive, and every node whose root has no edge left is
//! provably resolved: its root is recorded in the owning pointer table and
//! the node leaves the graph. After the last round every CAG must be empty.

pub mod exchange;
pub mod partners;

use hashbrown::HashSet;

use crate::algs::cag::{Cag, PointerTable};
use crate::algs::wire;
use crate::recolor_error::RecolorError;

/// Per-block reduction state, the part of the per-call context that lives
/// across rounds.
#[derive(Debug)]
pub(crate) struct BlockCtx {
    pub block: usize,
    pub partners: Vec<Option<usize>>,
    pub cag: Cag,
    /// Resolutions for this block's own label range.
    pub local_table: PointerTable,
    /// Resolutions held in custody for a folded-in outlier's range.
    pub remote_table: PointerTable,
    pub out_msg: Vec<i64>,
    pub in_msg: Vec<i64>,
}

impl BlockCtx {
    /// True when this block is an outlier folded onto the power-of-two core.
    fn is_outlier(&self, p: usize) -> bool {
        self.block >= p
    }

    /// True when this block absorbs an outlier on the preliminary round.
    fn absorbs_outlier(&self, blocks: usize, p: usize) -> bool {
        self.block < blocks - p
    }
}

/// Serializes this round's outgoing message into `ctx.out_msg`.
pub(crate) fn serialize_round(
    ctx: &mut BlockCtx,
    round: usize,
    rounds: usize,
    blocks: usize,
    p: usize,
) {
    let fold = blocks > p;
    let partner = ctx.partners[round];
    ctx.out_msg.clear();
    if fold && round == rounds - 1 && ctx.absorbs_outlier(blocks, p) {
        // Trailing fold round: nothing left to contract for the outlier;
        // ship its resolved pointer table home instead of a graph.
        let partner = partner.expect("inlier always has a trailing partner");
        wire::encode_table_message(&mut ctx.out_msg, partner, &ctx.remote_table);
    } else if let Some(partner) = partner {
        wire::encode_cag_message(&mut ctx.out_msg, partner, &ctx.cag);
    } else {
        ctx.out_msg.push(wire::NO_PARTNER);
    }
}

/// Ingests `ctx.in_msg` and contracts the merged graph.
pub(crate) fn contract_round(
    ctx: &mut BlockCtx,
    round: usize,
    rounds: usize,
    blocks: usize,
    p: usize,
) -> Result<(), RecolorError> {
    if ctx.partners[round].is_none() {
        return Ok(());
    }
    let fold = blocks > p;

    if fold && round == rounds - 1 && ctx.is_outlier(p) {
        // Fold-back: a plain (id, root) table, applied directly.
        for (id, root) in wire::decode_pair_message(&ctx.in_msg)? {
            ctx.local_table.set_root(id, root);
        }
        return Ok(());
    }

    if fold && round == 0 && ctx.is_outlier(p) {
        // The outlier handed its graph (and custody of its ids) to the
        // inlier; whatever arrived in exchange is stale.
        ctx.cag.clear();
    } else {
        let take_custody = fold && round == 0 && ctx.absorbs_outlier(blocks, p);
        for node in wire::decode_cag_message(&ctx.in_msg)? {
            if take_custody {
                if node.root != node.id {
                    return Err(RecolorError::Protocol {
                        block: ctx.block,
                        detail: format!(
                            "outlier node {} arrived pre-resolved to {}",
                            node.id, node.root
                        ),
                    });
                }
                ctx.remote_table.set_root(node.id, node.root);
            }
            ctx.cag.insert(node);
        }
    }

    // Contract every deducible edge; note the roots that still reach out of
    // the merged set.
    let ids = ctx.cag.ids_sorted();
    let mut has_outgoing = HashSet::new();
    for &id in &ids {
        let Some(node) = ctx.cag.node_mut(id) else {
            continue;
        };
        let mut edges = std::mem::take(&mut node.edges);
        for slot in edges.iter_mut() {
            let Some(to) = *slot else { continue };
            if ctx.cag.contains(to) {
                ctx.cag.union(id, to);
                *slot = None;
            } else {
                has_outgoing.insert(id);
            }
        }
        if let Some(node) = ctx.cag.node_mut(id) {
            node.edges = edges;
        }
    }

    let unresolved_roots: HashSet<_> = has_outgoing
        .iter()
        .map(|&id| ctx.cag.find(id))
        .collect();
    for &id in &ids {
        ctx.cag.find(id);
    }

    // Drop fully resolved components in deterministic order, recording each
    // id's root in whichever table owns it.
    let mut resolved: Vec<_> = ids
        .iter()
        .filter_map(|&id| {
            let root = ctx.cag.node(id)?.root;
            (!unresolved_roots.contains(&root)).then_some((root, id))
        })
        .collect();
    resolved.sort_unstable();
    let dropped = resolved.len();
    for (root, id) in resolved {
        if ctx.local_table.contains(id) {
            ctx.local_table.set_root(id, root);
        } else if ctx.remote_table.contains(id) {
            ctx.remote_table.set_root(id, root);
        }
        ctx.cag.remove(id);
    }
    log::trace!(
        "block {}: round {round}: {} nodes live, {dropped} resolved",
        ctx.block,
        ctx.cag.len(),
    );
    Ok(())
}
