//! Test utilities for Halo development.
//!
//! [`run_cluster`] runs one closure per process on its own thread over an
//! in-memory [`LocalCluster`]; [`Walker`] is a small entity for object
//! field tests; [`fixtures`] builds common domains and partitions.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use halo_comm::{ChannelTransport, LocalCluster};
use halo_core::codec::{write_u32_le, write_u64_le};
use halo_core::{CodecError, Entity, EntityId, Reader, Wire};
use std::sync::Once;
use std::thread;

/// Run `f` once per process of an `n`-process in-memory cluster, each on
/// its own thread, and collect the results in pid order.
///
/// A panic on any process is re-raised on the caller once every thread
/// has finished.
pub fn run_cluster<R, F>(n: usize, f: F) -> Vec<R>
where
    R: Send,
    F: Fn(ChannelTransport) -> R + Sync,
{
    let endpoints = LocalCluster::new(n).into_endpoints();
    let f = &f;
    thread::scope(|s| {
        let handles: Vec<_> = endpoints
            .into_iter()
            .map(|transport| s.spawn(move || f(transport)))
            .collect();
        handles
            .into_iter()
            .map(|h| match h.join() {
                Ok(r) => r,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    })
}

/// Install a test-writer `tracing` subscriber once per test binary.
///
/// Honours `RUST_LOG`; silent by default.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// A minimal mobile agent.
#[derive(Clone, Debug, PartialEq)]
pub struct Walker {
    pub id: EntityId,
    pub energy: f64,
    pub steps: u32,
}

impl Walker {
    pub fn new(id: EntityId, energy: f64) -> Self {
        Self { id, energy, steps: 0 }
    }
}

impl Wire for Walker {
    fn encode(&self, w: &mut Vec<u8>) {
        write_u64_le(w, self.id.0);
        self.energy.encode(w);
        write_u32_le(w, self.steps);
    }

    fn decode(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            id: EntityId(r.read_u64_le()?),
            energy: f64::decode(r)?,
            steps: r.read_u32_le()?,
        })
    }
}

impl Entity for Walker {
    fn id(&self) -> EntityId {
        self.id
    }
}
