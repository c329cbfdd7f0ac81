//! Fixed, little-endian wire types and the compressed-CAG message codec.
//!
//! A reduction message is a flat sequence of signed words:
//!
//! ```text
//! partner_block_id,
//!   node_id, node_root, edge, edge, ..., -1,     (per live node)
//!   ...
//! ```
//!
//! A fold-back message (pointer-table ship-out on the trailing round) is a
//! flat `(id, root)` pair list with no terminators; the two are told apart
//! by protocol phase, not by the bytes. When a rank batches messages for
//! several blocks into one send, each message is suffixed with `-2`.
//!
//! All multi-byte integers are **little-endian** on the wire; values are
//! stored pre-LE and decoded with `from_le`.

use bytemuck::{Pod, Zeroable};
use std::mem::size_of;

use crate::recolor_error::RecolorError;
use crate::topology::Label;

use super::cag::{Cag, CagNode, PointerTable};

/// Terminates a node's edge list.
pub const EDGE_LIST_END: i64 = -1;
/// Separates batched messages inside one rank-to-rank send.
pub const MESSAGE_END: i64 = -2;
/// Leading word of a round with no partner.
pub const NO_PARTNER: i64 = -1;

pub fn cast_slice<T: Pod>(v: &[T]) -> &[u8] {
    bytemuck::cast_slice(v)
}

pub fn cast_slice_mut<T: Pod>(v: &mut [T]) -> &mut [u8] {
    bytemuck::cast_slice_mut(v)
}

/// Word count header exchanged ahead of each payload.
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct WireCount {
    pub n_le: u32,
}

impl WireCount {
    pub fn new(n: usize) -> Self {
        Self {
            n_le: (n as u32).to_le(),
        }
    }
    pub fn get(&self) -> usize {
        u32::from_le(self.n_le) as usize
    }
}

/// One signed payload word.
#[repr(transparent)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct WireWord {
    pub w_le: i64,
}

impl WireWord {
    pub fn new(w: i64) -> Self {
        Self { w_le: w.to_le() }
    }
    pub fn get(&self) -> i64 {
        i64::from_le(self.w_le)
    }
}

/// Converts a word vector into its wire bytes.
pub fn words_to_bytes(words: &[i64]) -> Vec<u8> {
    let wire: Vec<WireWord> = words.iter().map(|&w| WireWord::new(w)).collect();
    cast_slice(&wire).to_vec()
}

/// Decodes wire bytes back into words. Copies, so the input may carry any
/// alignment.
pub fn bytes_to_words(bytes: &[u8]) -> Result<Vec<i64>, RecolorError> {
    if bytes.len() % size_of::<WireWord>() != 0 {
        return Err(RecolorError::TruncatedMessage { at: bytes.len() });
    }
    let wire: Vec<WireWord> = bytemuck::pod_collect_to_vec(bytes);
    Ok(wire.iter().map(WireWord::get).collect())
}

/// Serializes the live CAG for `partner`, nodes in ascending id order.
pub fn encode_cag_message(out: &mut Vec<i64>, partner: usize, cag: &Cag) {
    out.push(partner as i64);
    for id in cag.ids_sorted() {
        let Some(node) = cag.node(id) else {
            continue;
        };
        out.push(node.id.to_wire());
        out.push(node.root.to_wire());
        for edge in node.edges.iter().flatten() {
            out.push(edge.to_wire());
        }
        out.push(EDGE_LIST_END);
    }
}

/// Serializes a pointer table for `partner` as a flat pair list.
pub fn encode_table_message(out: &mut Vec<i64>, partner: usize, table: &PointerTable) {
    out.push(partner as i64);
    for (id, root) in table.iter_sorted() {
        out.push(id.to_wire());
        out.push(root.to_wire());
    }
}

/// Decodes a received CAG body (the leading partner word has already been
/// consumed by the exchange demultiplexer).
pub fn decode_cag_message(words: &[i64]) -> Result<Vec<CagNode>, RecolorError> {
    let mut nodes = Vec::new();
    let mut i = 0;
    while i < words.len() {
        if words.len() - i < 2 {
            return Err(RecolorError::TruncatedMessage { at: i });
        }
        let id = Label::from_wire(words[i])?;
        let root = Label::from_wire(words[i + 1])?;
        i += 2;
        let mut edges = Vec::new();
        loop {
            let Some(&w) = words.get(i) else {
                return Err(RecolorError::TruncatedMessage { at: i });
            };
            i += 1;
            if w == EDGE_LIST_END {
                break;
            }
            edges.push(Label::from_wire(w)?);
        }
        let mut node = CagNode::new(id, edges);
        node.root = root;
        nodes.push(node);
    }
    Ok(nodes)
}

/// Decodes a received pointer-table body into `(id, root)` pairs.
pub fn decode_pair_message(words: &[i64]) -> Result<Vec<(Label, Label)>, RecolorError> {
    if words.len() % 2 != 0 {
        return Err(RecolorError::TruncatedMessage { at: words.len() });
    }
    words
        .chunks_exact(2)
        .map(|pair| Ok((Label::from_wire(pair[0])?, Label::from_wire(pair[1])?)))
        .collect()
}

// Compile-time layout checks.
const _: () = {
    assert!(size_of::<WireCount>() == 4);
    assert!(size_of::<WireWord>() == 8);
};
