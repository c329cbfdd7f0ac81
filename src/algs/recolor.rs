//! The recolor driver: the staged pipeline over one process's blocks.
//!
//! Stage order matches the lock-step protocol: every local block finishes a
//! stage before the next one starts, and the exchange steps are the only
//! cross-process synchronization points. All per-call state lives in a
//! plain per-block vector, so concurrent calls in one process can coexist.

use hashbrown::HashMap;
use itertools::iproduct;

use crate::algs::cag::{build_cag, PointerTable};
use crate::algs::reduction::exchange::exchange_round;
use crate::algs::reduction::partners::{greatest_power_of_two, partner_schedule, round_count};
use crate::algs::reduction::{contract_round, serialize_round, BlockCtx};
use crate::algs::two_pass::two_pass_label;
use crate::algs::communicator::Communicator;
use crate::domain::Domain;
use crate::recolor_error::RecolorError;

/// Assigns every connected component of active cells a globally unique,
/// globally consistent label, in place, across all blocks of the domain.
///
/// Must be called collectively: every rank hosting blocks of the same
/// [`crate::topology::BlockGrid`] runs this at the same time.
///
/// # Errors
/// [`RecolorError::NonCubicBlock`] for block shapes the distributed path
/// does not handle (callers fall back to their iterative recolorer);
/// [`RecolorError::Comm`] on transport failures; [`RecolorError::Protocol`]
/// when the reduction bookkeeping is violated — not recoverable.
pub fn recolor<V, C>(domain: &mut Domain<V, C>) -> Result<(), RecolorError>
where
    V: Copy + PartialEq,
    C: Communicator,
{
    let shape = domain.shape();
    if shape[0] != shape[1] || shape[1] != shape[2] {
        return Err(RecolorError::NonCubicBlock { size: shape });
    }
    let blocks = domain.grid().block_count();
    let layers = domain.layer_count();
    let volume = (shape[0] * shape[1] * shape[2]) as u64;
    log::debug!(
        "recolor: {blocks} blocks, {layers} layer(s), rank {} hosting {}",
        domain.my_rank,
        domain.blocks.len()
    );

    // Local two-pass labeling, each block minting from its own range.
    let mut canonical_per_block = Vec::with_capacity(domain.blocks.len());
    for data in domain.blocks.iter_mut() {
        let offset = data.id as u64 * volume * layers as u64;
        let canonical = two_pass_label(&data.values, &mut data.labels, offset)?;
        log::debug!("block {}: {} local components", data.id, canonical.len());
        canonical_per_block.push(canonical);
    }

    // Neighbors' provisional labels into the halos.
    domain.exchange_label_halos()?;

    // Cross-block adjacency graphs and the reduction schedule.
    let mut ctxs: Vec<BlockCtx> = Vec::with_capacity(domain.blocks.len());
    for (data, canonical) in domain.blocks.iter().zip(&canonical_per_block) {
        let (cag, local_table) =
            build_cag(domain.grid(), data.id, &data.values, &data.labels, canonical);
        log::debug!("block {}: {} border components", data.id, cag.len());
        ctxs.push(BlockCtx {
            block: data.id,
            partners: partner_schedule(data.id, blocks),
            cag,
            local_table,
            remote_table: PointerTable::new(),
            out_msg: Vec::new(),
            in_msg: Vec::new(),
        });
    }
    let slot_of_block: HashMap<usize, usize> = ctxs
        .iter()
        .enumerate()
        .map(|(slot, ctx)| (ctx.block, slot))
        .collect();

    // The reduction tree.
    let p = greatest_power_of_two(blocks);
    let rounds = round_count(blocks);
    for round in 0..rounds {
        for ctx in ctxs.iter_mut() {
            serialize_round(ctx, round, rounds, blocks, p);
        }
        exchange_round(
            &domain.comm,
            domain.my_rank,
            &domain.rank_of_block,
            round,
            &mut ctxs,
            &slot_of_block,
        )?;
        for ctx in ctxs.iter_mut() {
            contract_round(ctx, round, rounds, blocks, p)?;
        }
    }

    for ctx in &ctxs {
        if !ctx.cag.is_empty() {
            return Err(RecolorError::Protocol {
                block: ctx.block,
                detail: format!("{} unresolved CAG nodes after the final round", ctx.cag.len()),
            });
        }
    }

    // Rewrite: provisional labels become their resolved roots.
    for (data, ctx) in domain.blocks.iter_mut().zip(&ctxs) {
        for field in data.labels.iter_mut() {
            for (z, y, x) in iproduct!(
                0..shape[2] as isize,
                0..shape[1] as isize,
                0..shape[0] as isize
            ) {
                let at = [x, y, z];
                if let Some(provisional) = field.get(at) {
                    let root = ctx.local_table.root_of(provisional).ok_or_else(|| {
                        RecolorError::Protocol {
                            block: ctx.block,
                            detail: format!("label {provisional} missing from the pointer table"),
                        }
                    })?;
                    field.set(at, Some(root));
                }
            }
        }
    }
    Ok(())
}
