//! Rank-lead message exchange for one reduction round.
//!
//! Every process gathers the outgoing messages of all blocks it hosts,
//! resolves the destination *process* for each through the block → rank
//! table, and batches per-destination messages into a single buffer, each
//! message self-delimited by its leading target-block id and a trailing
//! `-2`. Same-process traffic is delivered straight into the receiving
//! block's slot without touching the communicator. Remote traffic goes
//! through a two-phase exchange (size headers first, then the payload)
//! with all receives posted before any wait, and every handle drained
//! before returning.

use hashbrown::HashMap;
use std::collections::BTreeMap;

use crate::algs::communicator::{Communicator, Wait, REDUCE_DATA_TAG, REDUCE_SIZE_TAG};
use crate::algs::wire::{
    self, bytes_to_words, cast_slice, cast_slice_mut, words_to_bytes, WireCount,
};
use crate::recolor_error::RecolorError;

use super::BlockCtx;

/// Exchanges the current round's serialized messages between all blocks.
pub(crate) fn exchange_round<C: Communicator>(
    comm: &C,
    my_rank: usize,
    rank_of_block: &[usize],
    round: usize,
    ctxs: &mut [BlockCtx],
    slot_of_block: &HashMap<usize, usize>,
) -> Result<(), RecolorError> {
    // Batch outgoing messages per destination rank, in ascending block
    // order so the stream layout is deterministic.
    let mut queues: BTreeMap<usize, Vec<i64>> = BTreeMap::new();
    for ctx in ctxs.iter() {
        let msg = &ctx.out_msg;
        if msg.first().copied() == Some(wire::NO_PARTNER) {
            continue;
        }
        let dest_block = msg[0] as usize;
        let dest_rank = *rank_of_block
            .get(dest_block)
            .ok_or_else(|| RecolorError::Protocol {
                block: ctx.block,
                detail: format!("message for unknown block {dest_block}"),
            })?;
        let queue = queues.entry(dest_rank).or_default();
        queue.extend_from_slice(msg);
        queue.push(wire::MESSAGE_END);
    }

    // Same-process messages never touch the communicator.
    if let Some(local) = queues.remove(&my_rank) {
        demux(&local, ctxs, slot_of_block)?;
    }

    let peers: Vec<usize> = queues.keys().copied().collect();
    if peers.is_empty() {
        return Ok(());
    }

    // Phase 1: word counts. The partner schedule is symmetric, so the set
    // of ranks we send to equals the set we will hear from.
    let size_tag = REDUCE_SIZE_TAG.offset(round as u16).as_u16();
    let mut size_recvs = Vec::with_capacity(peers.len());
    for &peer in &peers {
        let mut cnt = WireCount::new(0);
        let h = comm.irecv(peer, size_tag, cast_slice_mut(std::slice::from_mut(&mut cnt)));
        size_recvs.push((peer, h));
    }
    let mut size_sends = Vec::with_capacity(peers.len());
    let counts: Vec<WireCount> = peers.iter().map(|p| WireCount::new(queues[p].len())).collect();
    for (&peer, cnt) in peers.iter().zip(&counts) {
        size_sends.push(comm.isend(peer, size_tag, cast_slice(std::slice::from_ref(cnt))));
    }

    let mut incoming_words: HashMap<usize, usize> = HashMap::new();
    let mut maybe_err = None;
    for (peer, h) in size_recvs {
        match h.wait() {
            Some(data) if data.len() == std::mem::size_of::<WireCount>() => {
                let mut cnt = WireCount::new(0);
                cast_slice_mut(std::slice::from_mut(&mut cnt)).copy_from_slice(&data);
                incoming_words.insert(peer, cnt.get());
            }
            Some(data) => {
                maybe_err.get_or_insert(RecolorError::comm(
                    peer,
                    format!(
                        "expected {} bytes for size header, got {}",
                        std::mem::size_of::<WireCount>(),
                        data.len()
                    ),
                ));
            }
            None => {
                maybe_err
                    .get_or_insert(RecolorError::comm(peer, "failed to receive size header"));
            }
        }
    }
    for send in size_sends {
        let _ = send.wait();
    }
    if let Some(err) = maybe_err {
        return Err(err);
    }

    // Phase 2: payloads.
    let data_tag = REDUCE_DATA_TAG.offset(round as u16).as_u16();
    let mut data_recvs = Vec::with_capacity(peers.len());
    for &peer in &peers {
        let words = incoming_words[&peer];
        let mut buf = vec![0u8; words * std::mem::size_of::<i64>()];
        let h = comm.irecv(peer, data_tag, &mut buf);
        data_recvs.push((peer, h, buf.len()));
    }
    let payloads: Vec<Vec<u8>> = peers.iter().map(|p| words_to_bytes(&queues[p])).collect();
    let mut data_sends = Vec::with_capacity(peers.len());
    for (&peer, bytes) in peers.iter().zip(&payloads) {
        data_sends.push(comm.isend(peer, data_tag, bytes));
    }

    let mut maybe_err = None;
    for (peer, h, expect) in data_recvs {
        match h.wait() {
            Some(data) if data.len() == expect => {
                if maybe_err.is_none() {
                    match bytes_to_words(&data) {
                        Ok(words) => {
                            if let Err(e) = demux(&words, ctxs, slot_of_block) {
                                maybe_err = Some(e);
                            }
                        }
                        Err(e) => maybe_err = Some(e),
                    }
                }
            }
            Some(data) => {
                maybe_err.get_or_insert(RecolorError::comm(
                    peer,
                    format!("expected {expect} payload bytes, got {}", data.len()),
                ));
            }
            None => {
                maybe_err.get_or_insert(RecolorError::comm(peer, "failed to receive payload"));
            }
        }
    }
    for send in data_sends {
        let _ = send.wait();
    }
    maybe_err.map_or(Ok(()), Err)
}

/// Splits a batched stream back into per-block receive slots.
fn demux(
    words: &[i64],
    ctxs: &mut [BlockCtx],
    slot_of_block: &HashMap<usize, usize>,
) -> Result<(), RecolorError> {
    let mut i = 0;
    while i < words.len() {
        let dest = words[i];
        if dest < 0 {
            return Err(RecolorError::TruncatedMessage { at: i });
        }
        i += 1;
        let start = i;
        while i < words.len() && words[i] != wire::MESSAGE_END {
            i += 1;
        }
        if i == words.len() {
            return Err(RecolorError::TruncatedMessage { at: i });
        }
        let slot = *slot_of_block
            .get(&(dest as usize))
            .ok_or(RecolorError::Protocol {
                block: dest as usize,
                detail: "received message for a block this rank does not host".into(),
            })?;
        ctxs[slot].in_msg.clear();
        ctxs[slot].in_msg.extend_from_slice(&words[start..i]);
        i += 1; // message separator
    }
    Ok(())
}
