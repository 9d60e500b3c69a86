//! Heat diffusion with drifting heat sources on a 4-process torus.
//!
//! Demonstrates: cluster config → one `Node` per thread → grid and object
//! fields → compute on owned cells → `step` → remote query → metrics.
//!
//! Run with `RUST_LOG=halo_engine=debug` to see per-tick sync timings.

use halo_bench::{diffuse, heat_cluster, seed_walkers};
use halo_comm::LocalCluster;
use halo_core::{GridPoint, Pid};
use halo_engine::{Node, SyncError};
use halo_test_utils::Walker;
use std::thread;
use tracing::info;
use tracing_subscriber::EnvFilter;

const SIDE: u32 = 64;
const PROCESSES: u32 = 4;
const TICKS: u64 = 50;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cluster = heat_cluster(SIDE, PROCESSES)?;
    let endpoints = LocalCluster::new(PROCESSES as usize).into_endpoints();

    let totals = thread::scope(|s| {
        let handles: Vec<_> = endpoints
            .into_iter()
            .map(|transport| {
                let cluster = &cluster;
                s.spawn(move || -> Result<f64, SyncError> {
                    let mut node = Node::from_cluster(cluster, transport)?;
                    let heat = node.add_grid_field("heat", 0.0f64);
                    let sources = node.add_object_field::<GridPoint, Walker>("sources", 4)?;
                    let pid = node.pid();
                    let owned = node.layout().owned();

                    seed_walkers(node.field_mut(sources)?, owned, pid, 8, |id| Walker::new(id, 5.0), |p| p)?;
                    node.step()?;

                    let mut total = 0.0;
                    for _ in 0..TICKS {
                        // Each source deposits its energy, then drifts one cell east.
                        let placed: Vec<_> = node
                            .field(sources)?
                            .owned_entities()
                            .map(|(loc, w)| (w.id, loc, w.energy))
                            .collect();
                        for &(_, loc, energy) in &placed {
                            let field = node.field_mut(heat)?;
                            let v = field.get(loc)?;
                            field.set(loc, v + energy)?;
                        }
                        let field = node.field_mut(sources)?;
                        for &(id, loc, _) in &placed {
                            field.move_entity(id, loc.shift(1, 0))?;
                        }

                        total = diffuse(node.field_mut(heat)?, 0.2)?;
                        let report = node.step()?;
                        if report.tick.0 % 10 == 0 {
                            info!(
                                pid = %pid,
                                tick = report.tick.0,
                                heat = total,
                                sources = node.field(sources)?.owned_entities().count(),
                                bytes_sent = report.metrics.bytes_sent,
                                entities_sent = report.metrics.entities_sent,
                                "progress"
                            );
                        }
                    }

                    if pid == Pid(0) {
                        let far = GridPoint::new(SIDE as i32 - 8, SIDE as i32 - 8);
                        let v = node.get_value(heat, far)?;
                        info!(point = %far, value = v, "remote read");
                    }
                    node.step()?;
                    Ok(total)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| match h.join() {
                Ok(r) => r,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect::<Result<Vec<f64>, SyncError>>()
    })?;

    let heat: f64 = totals.iter().sum();
    info!(heat, expected = PROCESSES as f64 * 8.0 * 5.0 * TICKS as f64, "done");
    Ok(())
}
