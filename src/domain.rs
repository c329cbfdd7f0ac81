//! `Domain`: one process's view of the decomposed grid.
//!
//! A domain owns the blocks assigned to its rank — per-layer input value
//! fields (halos included, read-only during recoloring) and the mutable
//! label fields the pipeline writes. It also carries the topology, the
//! block → rank table, and the communicator, which together form the
//! collaborator surface the recolor driver runs against: neighbor queries,
//! halo exchange, and the rank-lead message path.

use hashbrown::HashMap;
use std::collections::BTreeMap;

use crate::algs::communicator::{Communicator, Wait, HALO_TAG};
use crate::data::halo::{fill_halo_plane, plane_len, read_border_plane, write_halo_plane};
use crate::data::CellField;
use crate::recolor_error::RecolorError;
use crate::topology::{BlockGrid, Face, Label};

/// One block's cell data.
#[derive(Clone, Debug)]
pub struct BlockData<V> {
    pub(crate) id: usize,
    /// Per-layer input values; `None` marks inactive cells.
    pub(crate) values: Vec<CellField<Option<V>>>,
    /// Per-layer labels, written by the pipeline.
    pub(crate) labels: Vec<CellField<Option<Label>>>,
}

impl<V: Copy> BlockData<V> {
    fn new(id: usize, shape: [usize; 3], layers: usize) -> Self {
        Self {
            id,
            values: vec![CellField::new(shape, None); layers],
            labels: vec![CellField::new(shape, None); layers],
        }
    }

    /// Block id within the grid-of-blocks.
    pub fn id(&self) -> usize {
        self.id
    }

    /// The label field of `layer`.
    pub fn labels(&self, layer: usize) -> &CellField<Option<Label>> {
        &self.labels[layer]
    }

    /// The input value field of `layer`.
    pub fn values(&self, layer: usize) -> &CellField<Option<V>> {
        &self.values[layer]
    }
}

/// One process's blocks plus the topology and transport they share.
pub struct Domain<V, C: Communicator> {
    pub(crate) grid: BlockGrid,
    pub(crate) shape: [usize; 3],
    pub(crate) layers: usize,
    pub(crate) comm: C,
    pub(crate) my_rank: usize,
    pub(crate) rank_of_block: Vec<usize>,
    /// Local blocks in ascending id order.
    pub(crate) blocks: Vec<BlockData<V>>,
}

impl<V, C> Domain<V, C>
where
    V: Copy + PartialEq,
    C: Communicator,
{
    /// An empty domain: all local value fields start inactive.
    pub fn new(
        grid: BlockGrid,
        shape: [usize; 3],
        layers: usize,
        comm: C,
        my_rank: usize,
        rank_of_block: Vec<usize>,
    ) -> Result<Self, RecolorError> {
        if shape.iter().any(|&n| n == 0) {
            return Err(RecolorError::EmptyBlock { size: shape });
        }
        if layers == 0 {
            return Err(RecolorError::EmptyLayers);
        }
        if rank_of_block.len() != grid.block_count() {
            return Err(RecolorError::BlockCountMismatch {
                expected: grid.block_count(),
                actual: rank_of_block.len(),
            });
        }
        let blocks = (0..grid.block_count())
            .filter(|&b| rank_of_block[b] == my_rank)
            .map(|b| BlockData::new(b, shape, layers))
            .collect();
        Ok(Self {
            grid,
            shape,
            layers,
            comm,
            my_rank,
            rank_of_block,
            blocks,
        })
    }

    /// A domain whose local value fields — interiors *and* halos — are
    /// sampled from a global field function over global cell coordinates.
    /// Halo coordinates wrap along periodic axes and read as inactive
    /// beyond non-periodic domain edges.
    pub fn from_global<F>(
        grid: BlockGrid,
        shape: [usize; 3],
        layers: usize,
        comm: C,
        my_rank: usize,
        rank_of_block: Vec<usize>,
        global: F,
    ) -> Result<Self, RecolorError>
    where
        F: Fn(usize, [i64; 3]) -> Option<V>,
    {
        let mut domain = Self::new(grid, shape, layers, comm, my_rank, rank_of_block)?;
        let extent: Vec<i64> = (0..3)
            .map(|a| (domain.grid.dims()[a] * shape[a]) as i64)
            .collect();
        let periodic = domain.grid.periodic();
        for data in domain.blocks.iter_mut() {
            let coords = domain.grid.coords(data.id);
            let base: Vec<i64> = (0..3).map(|a| (coords[a] * shape[a]) as i64).collect();
            for layer in 0..layers {
                for z in -1..=shape[2] as isize {
                    for y in -1..=shape[1] as isize {
                        for x in -1..=shape[0] as isize {
                            let local = [x, y, z];
                            let mut g = [0i64; 3];
                            let mut outside = false;
                            for a in 0..3 {
                                let pos = base[a] + local[a] as i64;
                                g[a] = if (0..extent[a]).contains(&pos) {
                                    pos
                                } else if periodic[a] {
                                    pos.rem_euclid(extent[a])
                                } else {
                                    outside = true;
                                    break;
                                };
                            }
                            let v = if outside { None } else { global(layer, g) };
                            data.values[layer].set(local, v);
                        }
                    }
                }
            }
        }
        Ok(domain)
    }

    pub fn grid(&self) -> &BlockGrid {
        &self.grid
    }

    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    pub fn layer_count(&self) -> usize {
        self.layers
    }

    pub fn my_rank(&self) -> usize {
        self.my_rank
    }

    /// The local blocks, in ascending id order.
    pub fn local_blocks(&self) -> &[BlockData<V>] {
        &self.blocks
    }

    /// A local block by id.
    pub fn block(&self, id: usize) -> Result<&BlockData<V>, RecolorError> {
        self.blocks
            .iter()
            .find(|b| b.id == id)
            .ok_or(RecolorError::UnknownBlock { block: id })
    }

    /// Sets one input value cell (interior or halo) of a local block.
    pub fn set_value(
        &mut self,
        block: usize,
        layer: usize,
        at: [isize; 3],
        v: Option<V>,
    ) -> Result<(), RecolorError> {
        if layer >= self.layers {
            return Err(RecolorError::UnknownLayer {
                layer,
                layers: self.layers,
            });
        }
        let data = self
            .blocks
            .iter_mut()
            .find(|b| b.id == block)
            .ok_or(RecolorError::UnknownBlock { block })?;
        data.values[layer].try_set(at, v)
    }

    /// Refreshes every local block's label halo from its neighbors:
    /// straight copies between colocated blocks, batched plane messages per
    /// peer rank otherwise, sentinel fill where no neighbor exists.
    pub(crate) fn exchange_label_halos(&mut self) -> Result<(), RecolorError> {
        for layer in 0..self.layers {
            self.exchange_label_halos_layer(layer)?;
        }
        Ok(())
    }

    fn exchange_label_halos_layer(&mut self, layer: usize) -> Result<(), RecolorError> {
        let tag = HALO_TAG.offset(layer as u16).as_u16();

        // Plan: local plane copies, outgoing per-peer batches, and the
        // per-peer receive manifests. All three walk blocks in ascending id
        // and faces in `Face::ALL` order, so every rank derives the same
        // stream layout without headers.
        let mut local_writes: Vec<(usize, Face, Vec<u64>)> = Vec::new();
        let mut outgoing: BTreeMap<usize, Vec<u64>> = BTreeMap::new();
        for (slot, data) in self.blocks.iter().enumerate() {
            for face in Face::ALL {
                match self.grid.neighbor(data.id, face) {
                    None => local_writes.push((slot, face, Vec::new())),
                    Some(n) if self.rank_of_block[n] == self.my_rank => {
                        let src = self
                            .blocks
                            .iter()
                            .find(|b| b.id == n)
                            .expect("rank table says the neighbor is local");
                        let mut plane = Vec::new();
                        read_border_plane(&src.labels[layer], face.opposite(), &mut plane);
                        local_writes.push((slot, face, plane));
                    }
                    Some(n) => {
                        // the neighbor's rank needs our border plane at this face
                        let peer = self.rank_of_block[n];
                        let queue = outgoing.entry(peer).or_default();
                        read_border_plane(&data.labels[layer], face, queue);
                    }
                }
            }
        }

        // Receive manifest: peer rank -> [(local slot, face)] in the
        // sender's emission order (its blocks ascending, faces in order).
        let mut expected: BTreeMap<usize, Vec<(usize, Face)>> = BTreeMap::new();
        let slot_of_block: HashMap<usize, usize> = self
            .blocks
            .iter()
            .enumerate()
            .map(|(slot, b)| (b.id, slot))
            .collect();
        for remote in 0..self.grid.block_count() {
            let peer = self.rank_of_block[remote];
            if peer == self.my_rank {
                continue;
            }
            for face in Face::ALL {
                let Some(m) = self.grid.neighbor(remote, face) else {
                    continue;
                };
                let Some(&slot) = slot_of_block.get(&m) else {
                    continue;
                };
                // the remote sends its `face` border; it lands in our halo
                // just outside the opposite face
                expected.entry(peer).or_default().push((slot, face.opposite()));
            }
        }

        // Post all receives, then all sends.
        let mut recvs = Vec::new();
        for (&peer, planes) in &expected {
            let words: usize = planes
                .iter()
                .map(|&(_, face)| plane_len(self.shape, face))
                .sum();
            let mut buf = vec![0u8; words * std::mem::size_of::<u64>()];
            let h = self.comm.irecv(peer, tag, &mut buf);
            recvs.push((peer, h, buf.len()));
        }
        let payloads: Vec<(usize, Vec<u8>)> = outgoing
            .iter()
            .map(|(&peer, words)| (peer, bytemuck::cast_slice(words).to_vec()))
            .collect();
        let mut sends = Vec::new();
        for (peer, bytes) in &payloads {
            sends.push(self.comm.isend(*peer, tag, bytes));
        }

        // Local traffic and boundary fill while the wire is busy.
        for (slot, face, plane) in local_writes {
            let field = &mut self.blocks[slot].labels[layer];
            if plane.is_empty() {
                fill_halo_plane(field, face);
            } else {
                write_halo_plane(field, face, &plane)?;
            }
        }

        // Drain receives and scatter the planes.
        let mut maybe_err = None;
        for (peer, h, expect_len) in recvs {
            match h.wait() {
                Some(data) if data.len() == expect_len => {
                    if maybe_err.is_some() {
                        continue;
                    }
                    let words: Vec<u64> = bytemuck::pod_collect_to_vec(&data);
                    let mut offset = 0;
                    for &(slot, face) in &expected[&peer] {
                        let len = plane_len(self.shape, face);
                        let plane = &words[offset..offset + len];
                        offset += len;
                        if let Err(e) =
                            write_halo_plane(&mut self.blocks[slot].labels[layer], face, plane)
                        {
                            maybe_err = Some(e);
                            break;
                        }
                    }
                }
                Some(data) => {
                    maybe_err.get_or_insert(RecolorError::comm(
                        peer,
                        format!("expected {expect_len} halo bytes, got {}", data.len()),
                    ));
                }
                None => {
                    maybe_err
                        .get_or_insert(RecolorError::comm(peer, "failed to receive halo planes"));
                }
            }
        }
        for send in sends {
            let _ = send.wait();
        }
        maybe_err.map_or(Ok(()), Err)
    }
}
