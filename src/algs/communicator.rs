//! Thin façade over intra-process or inter-process (MPI) message passing.
//!
//! Messages are contiguous byte slices. All handles are waitable but
//! non-blocking: the exchange code calls `.wait()` before it trusts that a
//! buffer is ready. The receive buffer passed to `irecv` only communicates
//! the expected length; received data is returned by `wait()`.

use bytes::Bytes;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::JoinHandle;

/// Non-blocking communication interface.
pub trait Communicator: Send + Sync + 'static {
    /// Handle returned by `isend`.
    type SendHandle: Wait;
    /// Handle returned by `irecv`.
    type RecvHandle: Wait;

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Self::SendHandle;
    fn irecv(&self, peer: usize, tag: u16, buf: &mut [u8]) -> Self::RecvHandle;
}

/// Anything that can be waited on.
pub trait Wait {
    /// Wait for completion and return the received data (if any).
    fn wait(self) -> Option<Vec<u8>>;
}

/// Typed message tag. Stage bases are spaced far enough apart that per-round
/// and per-layer offsets never collide.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CommTag(u16);

impl CommTag {
    pub const fn new(v: u16) -> Self {
        Self(v)
    }
    pub const fn as_u16(self) -> u16 {
        self.0
    }
    pub const fn offset(self, k: u16) -> Self {
        Self(self.0 + k)
    }
}

/// Label-halo planes, offset by layer.
pub(crate) const HALO_TAG: CommTag = CommTag::new(0x10);
/// Reduction size headers, offset by round.
pub(crate) const REDUCE_SIZE_TAG: CommTag = CommTag::new(0x40);
/// Reduction payloads, offset by round.
pub(crate) const REDUCE_DATA_TAG: CommTag = CommTag::new(0x80);

/// Compile-time no-op comm for single-rank runs and pure serial unit tests.
#[derive(Clone, Debug, Default)]
pub struct NoComm;

impl Wait for () {
    fn wait(self) -> Option<Vec<u8>> {
        None
    }
}

impl Communicator for NoComm {
    type SendHandle = ();
    type RecvHandle = ();

    fn isend(&self, _peer: usize, _tag: u16, _buf: &[u8]) {}
    fn irecv(&self, _peer: usize, _tag: u16, _buf: &mut [u8]) {}
}

// --- ThreadComm: several simulated ranks inside one process ---

type Key = (usize, usize, u16); // (src, dst, tag)

static MAILBOX: Lazy<DashMap<Key, Bytes>> = Lazy::new(DashMap::new);

pub struct LocalHandle {
    buf: Arc<Mutex<Option<Vec<u8>>>>,
    handle: Option<JoinHandle<()>>,
}

impl Wait for LocalHandle {
    fn wait(mut self) -> Option<Vec<u8>> {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        let mut guard = self.buf.lock();
        guard.take()
    }
}

/// In-process communicator: one instance per simulated rank, all sharing a
/// process-wide mailbox. Tests that use it must be serialized, since the
/// mailbox is global.
#[derive(Clone, Debug)]
pub struct ThreadComm {
    rank: usize,
}

impl ThreadComm {
    pub fn new(rank: usize) -> Self {
        Self { rank }
    }

    pub fn rank(&self) -> usize {
        self.rank
    }
}

impl Communicator for ThreadComm {
    type SendHandle = ();
    type RecvHandle = LocalHandle;

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) {
        MAILBOX.insert((self.rank, peer, tag), Bytes::from(buf.to_vec()));
    }

    fn irecv(&self, peer: usize, tag: u16, buf: &mut [u8]) -> LocalHandle {
        let key = (peer, self.rank, tag);
        let buf_arc = Arc::new(Mutex::new(None));
        let buf_clone = Arc::clone(&buf_arc);
        let want = buf.len();
        let handle = std::thread::spawn(move || {
            loop {
                if let Some((_, bytes)) = MAILBOX.remove(&key) {
                    let n = want.min(bytes.len());
                    *buf_clone.lock() = Some(bytes[..n].to_vec());
                    break;
                }
                std::thread::yield_now();
            }
        });
        LocalHandle {
            buf: buf_arc,
            handle: Some(handle),
        }
    }
}

// --- MPI backend (feature = "mpi-support") ---
#[cfg(feature = "mpi-support")]
mod mpi_backend {
    use super::{Communicator, Wait};
    use mpi::point_to_point::Destination;
    use mpi::request::StaticScope;
    use mpi::topology::Communicator as MpiTopology;
    use mpi::traits::*;

    pub struct MpiComm {
        universe: mpi::environment::Universe,
        rank: usize,
    }

    impl MpiComm {
        /// Initializes MPI; there must be exactly one `MpiComm` per process.
        pub fn new() -> Option<Self> {
            let universe = mpi::initialize()?;
            let rank = universe.world().rank() as usize;
            Some(Self { universe, rank })
        }

        pub fn rank(&self) -> usize {
            self.rank
        }

        pub fn size(&self) -> usize {
            self.universe.world().size() as usize
        }
    }

    type StaticRequest = mpi::request::Request<'static, [u8], StaticScope>;

    pub struct MpiHandle {
        req: Option<StaticRequest>,
        // Staging buffer leaked for the 'static request; reclaimed in wait().
        buf: *mut [u8],
        deliver: bool,
    }

    // The raw buffer is owned exclusively by this handle.
    unsafe impl Send for MpiHandle {}

    impl Wait for MpiHandle {
        fn wait(mut self) -> Option<Vec<u8>> {
            if let Some(req) = self.req.take() {
                req.wait();
            }
            let boxed = unsafe { Box::from_raw(self.buf) };
            self.deliver.then(|| boxed.to_vec())
        }
    }

    impl Communicator for MpiComm {
        type SendHandle = MpiHandle;
        type RecvHandle = MpiHandle;

        fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> MpiHandle {
            let staged: &'static mut [u8] = Box::leak(buf.to_vec().into_boxed_slice());
            let ptr = staged as *mut [u8];
            let req = self
                .universe
                .world()
                .process_at_rank(peer as i32)
                .immediate_send_with_tag(StaticScope, &*staged, tag as i32);
            MpiHandle {
                req: Some(req),
                buf: ptr,
                deliver: false,
            }
        }

        fn irecv(&self, peer: usize, tag: u16, buf: &mut [u8]) -> MpiHandle {
            let staged: &'static mut [u8] = Box::leak(vec![0u8; buf.len()].into_boxed_slice());
            let ptr = staged as *mut [u8];
            let req = self
                .universe
                .world()
                .process_at_rank(peer as i32)
                .immediate_receive_into_with_tag(StaticScope, staged, tag as i32);
            MpiHandle {
                req: Some(req),
                buf: ptr,
                deliver: true,
            }
        }
    }
}

#[cfg(feature = "mpi-support")]
pub use mpi_backend::MpiComm;
