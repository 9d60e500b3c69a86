//! One process of a distributed simulation.
//!
//! [`Node`] owns the fields registered on this process and the mailbox
//! connecting it to its peers. [`step()`](Node::step) is the scheduler's
//! per-tick entry point: it returns only once migrations have been
//! exchanged, halos refreshed and every process has reached the barrier.
//!
//! # Lock-step protocol
//!
//! Each round, every process in the same order:
//!
//! 1. sends each neighbour one `Migration` message bundling every field's
//!    outbox for it, then receives and applies one from each neighbour.
//!    Entities bound for a non-neighbour follow: a routing step through
//!    `P0` tells every receiver who will write to it, then one direct
//!    `Migration` message goes to each such destination;
//! 2. copies toroidal self-wraps locally, sends each neighbour one `Halo`
//!    message holding every field's outgoing links, then receives and
//!    merges one from each neighbour (receipt also acknowledges the
//!    migrations it was sent);
//! 3. joins the group barrier.
//!
//! Migrations come first, so a migrated entity already appears in its new
//! neighbours' halos at the end of the same round. Every blocking wait
//! answers remote point queries, so queries never deadlock against a
//! round in progress.

use crate::config::{ClusterConfig, NodeConfig};
use crate::error::SyncError;
use crate::field::{FieldHandle, HaloField, SyncField};
use crate::metrics::{SyncMetrics, SyncReport};
use crate::query::{encode_request, open_response, FieldServer};
use crate::storage::FieldStorage;
use halo_comm::{Mailbox, Message, MessageKind, Transport, TransportError};
use halo_core::{
    AccessError, Aoi, CodecError, ConfigError, Entity, EntityId, FieldId, GridPoint, Pid, Reader, TickId,
};
use halo_space::{neighbors, HaloLayout, Partition};
use halo_storage::{CellValue, GridStorage, Location, ObjectStorage};
use smallvec::SmallVec;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// A simulation process: its fields, its halo layout and its mailbox.
///
/// Fields must be registered in the same order on every process; a
/// field's id is its registration index and is what peers use to address
/// it.
///
/// # Example
///
/// ```ignore
/// let mut node = Node::new(NodeConfig::default(), partition, transport)?;
/// let heat = node.add_grid_field("heat", 0.0f64);
/// for _ in 0..ticks {
///     let field = node.field_mut(heat)?;
///     // ... update owned cells, reading neighbours from the halo ...
///     node.step()?;
/// }
/// ```
pub struct Node<T: Transport> {
    config: NodeConfig,
    partition: Arc<dyn Partition>,
    layout: Arc<HaloLayout>,
    mailbox: Mailbox<T>,
    fields: Vec<Box<dyn SyncField>>,
    tick: TickId,
    last_metrics: SyncMetrics,
    /// Some pair of processes is not adjacent, so far moves need routing.
    routed: bool,
}

// Fails to compile if any field stops being Send.
const _: () = {
    #[allow(dead_code)]
    fn assert_send<T: Send>() {}
    #[allow(dead_code)]
    fn check() {
        assert_send::<Node<halo_comm::ChannelTransport>>();
    }
};

fn micros(since: Instant) -> u64 {
    since.elapsed().as_micros() as u64
}

/// Whether any process lacks some other process as a neighbour. Identical
/// on every process, so all of them agree on running the routing step.
fn needs_routing(partition: &dyn Partition, aoi: Aoi) -> Result<bool, ConfigError> {
    let n = partition.num_partitions();
    for p in 0..n as u32 {
        if neighbors(partition, Pid(p), aoi)?.len() + 1 < n {
            return Ok(true);
        }
    }
    Ok(false)
}

impl<T: Transport> Node<T> {
    /// Join the group over `transport` with `partition` as the initial
    /// decomposition.
    ///
    /// Fails if the group size differs from the partition count, the
    /// transport's pid is out of range, or the AOI is too large for the
    /// partition.
    pub fn new(config: NodeConfig, partition: Arc<dyn Partition>, transport: T) -> Result<Self, ConfigError> {
        config.validate()?;
        if transport.num_partitions() != partition.num_partitions() {
            return Err(ConfigError::GroupSizeMismatch {
                partitions: partition.num_partitions(),
                group: transport.num_partitions(),
            });
        }
        let layout = Arc::new(HaloLayout::new(partition.as_ref(), transport.pid(), config.aoi)?);
        let routed = needs_routing(partition.as_ref(), config.aoi)?;
        info!(
            pid = %layout.pid(),
            partitions = partition.num_partitions(),
            owned = %layout.owned(),
            halo = %layout.halo(),
            neighbors = ?layout.neighbors(),
            "node ready"
        );
        let mailbox = Mailbox::new(transport, config.exchange_timeout);
        Ok(Self {
            config,
            partition,
            layout,
            mailbox,
            fields: Vec::new(),
            tick: TickId(0),
            last_metrics: SyncMetrics::default(),
            routed,
        })
    }

    /// Build the cluster's partition and join it.
    pub fn from_cluster(cluster: &ClusterConfig, transport: T) -> Result<Self, ConfigError> {
        let partition = cluster.build_partition()?;
        Self::new(cluster.node.clone(), partition, transport)
    }

    // ── Accessors ───────────────────────────────────────────────

    /// This process.
    pub fn pid(&self) -> Pid {
        self.layout.pid()
    }

    /// Processes in the group.
    pub fn num_partitions(&self) -> usize {
        self.partition.num_partitions()
    }

    /// The next tick [`step`](Self::step) will complete.
    pub fn tick(&self) -> TickId {
        self.tick
    }

    /// Settings in force.
    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Current halo geometry.
    pub fn layout(&self) -> &HaloLayout {
        &self.layout
    }

    /// Current decomposition.
    pub fn partition(&self) -> &Arc<dyn Partition> {
        &self.partition
    }

    /// Metrics of the last completed round.
    pub fn last_metrics(&self) -> &SyncMetrics {
        &self.last_metrics
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        self.mailbox.transport()
    }

    /// Registered fields.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    // ── Fields ──────────────────────────────────────────────────

    /// Register a dense grid field whose untouched cells read as
    /// `default`.
    pub fn add_grid_field<V: CellValue>(&mut self, name: &str, default: V) -> FieldHandle<GridStorage<V>> {
        let storage = GridStorage::new(self.layout.halo(), default);
        self.register(name, storage)
    }

    /// Register an object field. `bucket` is the side, in cells, of the
    /// spatial index buckets.
    pub fn add_object_field<L: Location, E: Entity>(
        &mut self,
        name: &str,
        bucket: u32,
    ) -> Result<FieldHandle<ObjectStorage<L, E>>, ConfigError> {
        if bucket == 0 {
            return Err(ConfigError::InvalidField {
                reason: format!("field '{name}': bucket size must be positive"),
            });
        }
        let storage = ObjectStorage::new(self.layout.halo(), bucket);
        Ok(self.register(name, storage))
    }

    fn register<S: FieldStorage>(&mut self, name: &str, storage: S) -> FieldHandle<S> {
        let id = FieldId(self.fields.len() as u32);
        let field = HaloField::new(
            id,
            name.to_owned(),
            Arc::clone(&self.layout),
            Arc::clone(&self.partition),
            storage,
        );
        self.fields.push(Box::new(field));
        debug!(pid = %self.pid(), field = %id, name, "field registered");
        FieldHandle::new(id)
    }

    /// The field behind `handle`.
    pub fn field<S: FieldStorage>(&self, handle: FieldHandle<S>) -> Result<&HaloField<S>, SyncError> {
        self.fields
            .get(handle.id().0 as usize)
            .and_then(|f| f.as_any().downcast_ref::<HaloField<S>>())
            .ok_or(SyncError::UnknownField { id: handle.id() })
    }

    /// Mutable access to the field behind `handle`.
    pub fn field_mut<S: FieldStorage>(&mut self, handle: FieldHandle<S>) -> Result<&mut HaloField<S>, SyncError> {
        self.fields
            .get_mut(handle.id().0 as usize)
            .and_then(|f| f.as_any_mut().downcast_mut::<HaloField<S>>())
            .ok_or(SyncError::UnknownField { id: handle.id() })
    }

    // ── Sync ────────────────────────────────────────────────────

    /// Complete the current tick.
    ///
    /// Collective: every process must call this the same number of times.
    /// On error the tick is abandoned; halo contents are unspecified and
    /// the run should stop.
    pub fn step(&mut self) -> Result<SyncReport, SyncError> {
        let tick = self.tick;
        let metrics = self.round(tick)?;
        self.tick = tick.next();
        Ok(self.report(tick, metrics))
    }

    fn report(&mut self, tick: TickId, metrics: SyncMetrics) -> SyncReport {
        debug!(
            pid = %self.pid(),
            tick = tick.0,
            total_us = metrics.total_us,
            migration_us = metrics.migration_us,
            exchange_us = metrics.exchange_us,
            barrier_us = metrics.barrier_us,
            bytes_sent = metrics.bytes_sent,
            bytes_received = metrics.bytes_received,
            entities_sent = metrics.entities_sent,
            entities_received = metrics.entities_received,
            "tick complete"
        );
        self.last_metrics = metrics.clone();
        SyncReport {
            tick,
            neighbors: self.layout.neighbors().len(),
            metrics,
        }
    }

    fn round(&mut self, tick: TickId) -> Result<SyncMetrics, SyncError> {
        let result = self.run_round(tick);
        if let Err(e) = &result {
            error!(pid = %self.pid(), tick = tick.0, error = ?e, "sync round aborted");
        }
        result
    }

    fn run_round(&mut self, tick: TickId) -> Result<SyncMetrics, SyncError> {
        let start = Instant::now();
        let mut metrics = SyncMetrics::default();

        let t = Instant::now();
        let (sent, received) = self.exchange_migrations(tick)?;
        metrics.entities_sent = sent as u64;
        metrics.entities_received = received as u64;
        metrics.migration_us = micros(t);

        let t = Instant::now();
        metrics.halo_entries = self.exchange_halos(tick)? as u64;
        metrics.exchange_us = micros(t);

        let t = Instant::now();
        let server = FieldServer::new(&self.fields);
        self.mailbox
            .barrier(tick, &server)
            .map_err(|source| self.transport_error(tick, source))?;
        metrics.barrier_us = micros(t);
        for field in &mut self.fields {
            field.release_all();
        }

        let stats = self.mailbox.take_stats();
        metrics.bytes_sent = stats.bytes_sent;
        metrics.bytes_received = stats.bytes_received;
        metrics.queries_served = stats.queries_served;
        metrics.total_us = micros(start);
        Ok(metrics)
    }

    fn transport_error(&self, tick: TickId, source: TransportError) -> SyncError {
        SyncError::Transport {
            pid: self.pid(),
            tick,
            source,
        }
    }

    fn codec_error(&self, tick: TickId, peer: Pid, source: CodecError) -> SyncError {
        SyncError::Codec {
            pid: self.pid(),
            tick,
            peer,
            source,
        }
    }

    fn exchange_migrations(&mut self, tick: TickId) -> Result<(usize, usize), SyncError> {
        let neighbors: SmallVec<[Pid; 8]> = SmallVec::from_slice(self.layout.neighbors());
        let mut sent = 0;
        for &peer in &neighbors {
            let mut body = Vec::new();
            for field in &mut self.fields {
                sent += field.drain_outbox(peer, &mut body);
            }
            self.mailbox
                .send(peer, &Message::new(MessageKind::Migration, tick, body))
                .map_err(|source| self.transport_error(tick, source))?;
        }

        let mut seen: Vec<HashMap<EntityId, Pid>> = self.fields.iter().map(|_| HashMap::new()).collect();
        let mut received = 0;
        for &peer in &neighbors {
            let server = FieldServer::new(&self.fields);
            let msg = self
                .mailbox
                .receive_from(peer, MessageKind::Migration, tick, &server)
                .map_err(|source| self.transport_error(tick, source))?;
            let mut r = Reader::new(&msg.body);
            for (field, seen) in self.fields.iter_mut().zip(seen.iter_mut()) {
                received += field.apply_migrations(peer, tick, &mut r, seen)?;
            }
            r.finish().map_err(|source| self.codec_error(tick, peer, source))?;
        }

        let (far_sent, far_received) = self.route_migrations(tick, &mut seen)?;
        Ok((sent + far_sent, received + far_received))
    }

    /// Deliver migrations whose destination is not a neighbour.
    fn route_migrations(
        &mut self,
        tick: TickId,
        seen: &mut [HashMap<EntityId, Pid>],
    ) -> Result<(usize, usize), SyncError> {
        if !self.routed {
            return Ok((0, 0));
        }
        let mut queued = BTreeSet::new();
        for field in &self.fields {
            field.queued_peers(&mut queued);
        }
        let targets: Vec<Pid> = queued.into_iter().collect();
        let server = FieldServer::new(&self.fields);
        let sources = self
            .mailbox
            .route(tick, &targets, &server)
            .map_err(|source| self.transport_error(tick, source))?;

        let mut sent = 0;
        for &peer in &targets {
            let mut body = Vec::new();
            for field in &mut self.fields {
                sent += field.drain_outbox(peer, &mut body);
            }
            self.mailbox
                .send(peer, &Message::new(MessageKind::Migration, tick, body))
                .map_err(|source| self.transport_error(tick, source))?;
        }

        let mut received = 0;
        for &peer in &sources {
            let server = FieldServer::new(&self.fields);
            let msg = self
                .mailbox
                .receive_from(peer, MessageKind::Migration, tick, &server)
                .map_err(|source| self.transport_error(tick, source))?;
            let mut r = Reader::new(&msg.body);
            for (field, seen) in self.fields.iter_mut().zip(seen.iter_mut()) {
                received += field.apply_migrations(peer, tick, &mut r, seen)?;
            }
            r.finish().map_err(|source| self.codec_error(tick, peer, source))?;
        }
        if !targets.is_empty() || !sources.is_empty() {
            debug!(pid = %self.pid(), tick = tick.0, targets = ?targets, sources = ?sources, "routed migrations");
        }
        Ok((sent, received))
    }

    fn exchange_halos(&mut self, tick: TickId) -> Result<usize, SyncError> {
        let pid = self.pid();
        let neighbors: SmallVec<[Pid; 8]> = SmallVec::from_slice(self.layout.neighbors());
        let mut entries = 0;

        for field in &mut self.fields {
            entries += field
                .wrap_self()
                .map_err(|source| SyncError::Codec {
                    pid,
                    tick,
                    peer: pid,
                    source,
                })?;
        }

        for &peer in &neighbors {
            let mut body = Vec::new();
            for field in &self.fields {
                field.pack_halo(peer, &mut body);
            }
            self.mailbox
                .send(peer, &Message::new(MessageKind::Halo, tick, body))
                .map_err(|source| self.transport_error(tick, source))?;
        }

        for &peer in &neighbors {
            let server = FieldServer::new(&self.fields);
            let msg = self
                .mailbox
                .receive_from(peer, MessageKind::Halo, tick, &server)
                .map_err(|source| self.transport_error(tick, source))?;
            let mut r = Reader::new(&msg.body);
            for field in &mut self.fields {
                entries += field
                    .unpack_halo(peer, &mut r)
                    .map_err(|source| SyncError::Codec {
                        pid,
                        tick,
                        peer,
                        source,
                    })?;
                field.release(peer);
            }
            r.finish().map_err(|source| self.codec_error(tick, peer, source))?;
        }
        Ok(entries)
    }

    // ── Point queries ───────────────────────────────────────────

    /// Value of a grid field anywhere in the domain.
    ///
    /// Served locally inside owned ∪ halo. Elsewhere this is one blocking
    /// round trip to the owner, which answers from whatever state it is in
    /// when the request arrives. Meant for diagnostics, not agent logic.
    pub fn get_value<V: CellValue>(
        &mut self,
        handle: FieldHandle<GridStorage<V>>,
        point: GridPoint,
    ) -> Result<V, SyncError> {
        let local = self.field(handle)?.get(point);
        match local {
            Ok(v) => Ok(v),
            Err(AccessError::OutsideHalo { owner, .. }) => {
                let body = self.remote_query(owner, handle.id(), point)?;
                let tick = self.tick;
                let mut r = open_response(self.pid(), tick, owner, &body)?;
                let value = V::decode(&mut r).map_err(|source| self.codec_error(tick, owner, source))?;
                r.finish().map_err(|source| self.codec_error(tick, owner, source))?;
                Ok(value)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Entities in the cell at a domain point, owned and replicas, with
    /// domain locations.
    ///
    /// Same local and remote paths as [`get_value`](Self::get_value).
    pub fn objects_at<L: Location, E: Entity>(
        &mut self,
        handle: FieldHandle<ObjectStorage<L, E>>,
        point: GridPoint,
    ) -> Result<Vec<(L, E)>, SyncError> {
        let local: Result<Vec<(L, E)>, AccessError> = self
            .field(handle)?
            .objects_at(point)
            .map(|found| found.into_iter().map(|(loc, e)| (loc, e.clone())).collect());
        match local {
            Ok(found) => Ok(found),
            Err(AccessError::OutsideHalo { owner, .. }) => {
                let body = self.remote_query(owner, handle.id(), point)?;
                let tick = self.tick;
                let mut r = open_response(self.pid(), tick, owner, &body)?;
                let decode = |r: &mut Reader<'_>| -> Result<Vec<(L, E)>, CodecError> {
                    let count = r.read_u32_le()? as usize;
                    let mut out = Vec::with_capacity(count.min(1024));
                    for _ in 0..count {
                        out.push((L::decode(r)?, E::decode(r)?));
                    }
                    r.finish()?;
                    Ok(out)
                };
                decode(&mut r).map_err(|source| self.codec_error(tick, owner, source))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn remote_query(&mut self, owner: Pid, field: FieldId, point: GridPoint) -> Result<Vec<u8>, SyncError> {
        let tick = self.tick;
        let request = Message::new(MessageKind::QueryRequest, tick, encode_request(field, point));
        self.mailbox
            .send(owner, &request)
            .map_err(|source| self.transport_error(tick, source))?;
        let server = FieldServer::new(&self.fields);
        let response = self
            .mailbox
            .receive_from(owner, MessageKind::QueryResponse, tick, &server)
            .map_err(|source| self.transport_error(tick, source))?;
        debug!(pid = %self.pid(), owner = %owner, field = %field, point = %point, "remote query answered");
        Ok(response.body)
    }

    /// Answer queries already queued, without blocking. Returns how many
    /// were served.
    ///
    /// Processes that spend long stretches outside [`step`](Self::step)
    /// should call this periodically so peers' queries are not delayed.
    pub fn serve_queries(&mut self) -> Result<usize, SyncError> {
        let tick = self.tick;
        let server = FieldServer::new(&self.fields);
        self.mailbox
            .serve_pending(&server)
            .map_err(|source| self.transport_error(tick, source))
    }

    // ── Re-partitioning ─────────────────────────────────────────

    /// Switch every process to a new decomposition.
    ///
    /// Collective: all processes call this with equivalent partitions.
    /// Authoritative data moves to its new owner, every field is rebuilt
    /// for the new layout, and a full sync round (at the current tick,
    /// which does not advance) restores the halos.
    pub fn repartition(&mut self, partition: Arc<dyn Partition>) -> Result<SyncReport, SyncError> {
        let pending: usize = self.fields.iter().map(|f| f.pending()).sum();
        if pending > 0 {
            return Err(SyncError::PendingMigrations { count: pending });
        }
        if partition.num_partitions() != self.num_partitions() {
            return Err(SyncError::Config(ConfigError::GroupSizeMismatch {
                partitions: partition.num_partitions(),
                group: self.num_partitions(),
            }));
        }
        let pid = self.pid();
        let tick = self.tick;
        let layout = Arc::new(HaloLayout::new(partition.as_ref(), pid, self.config.aoi)?);
        let routed = needs_routing(partition.as_ref(), self.config.aoi)?;
        let old_regions = self.partition.regions();
        let new_regions = partition.regions();
        let old_owned = self.layout.owned();
        let new_owned = layout.owned();

        for (q, region) in new_regions.iter().enumerate() {
            let peer = Pid(q as u32);
            let Some(handover) = old_owned.intersect(region).filter(|_| peer != pid) else {
                continue;
            };
            let mut body = Vec::new();
            for field in &self.fields {
                field.pack_owned(handover, &mut body);
            }
            self.mailbox
                .send(peer, &Message::new(MessageKind::Repartition, tick, body))
                .map_err(|source| self.transport_error(tick, source))?;
        }

        for field in &mut self.fields {
            field.on_partition_change(Arc::clone(&layout), Arc::clone(&partition));
        }
        self.layout = layout;
        self.partition = partition;
        self.routed = routed;

        for (q, region) in old_regions.iter().enumerate() {
            let peer = Pid(q as u32);
            let Some(handover) = region.intersect(&new_owned).filter(|_| peer != pid) else {
                continue;
            };
            let server = FieldServer::new(&self.fields);
            let msg = self
                .mailbox
                .receive_from(peer, MessageKind::Repartition, tick, &server)
                .map_err(|source| self.transport_error(tick, source))?;
            let mut r = Reader::new(&msg.body);
            for field in &mut self.fields {
                field
                    .adopt(handover, &mut r)
                    .map_err(|source| SyncError::Codec {
                        pid,
                        tick,
                        peer,
                        source,
                    })?;
            }
            r.finish().map_err(|source| self.codec_error(tick, peer, source))?;
        }

        info!(
            pid = %pid,
            tick = tick.0,
            owned = %self.layout.owned(),
            halo = %self.layout.halo(),
            neighbors = ?self.layout.neighbors(),
            "repartitioned"
        );
        let metrics = self.round(tick)?;
        Ok(self.report(tick, metrics))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use halo_comm::{LocalCluster, SingleProcess};
    use halo_core::{Aoi, Boundary, GlobalDomain, Position};
    use halo_space::GridPartition;
    use halo_test_utils::Walker;

    fn torus(w: u32, h: u32) -> GlobalDomain {
        GlobalDomain::new(w, h, Boundary::Toroidal).unwrap()
    }

    fn solo(domain: GlobalDomain) -> Node<SingleProcess> {
        let partition: Arc<dyn Partition> = Arc::new(GridPartition::new(domain, 1, 1).unwrap());
        Node::new(NodeConfig::default(), partition, SingleProcess).unwrap()
    }

    // ── Construction ────────────────────────────────────────────

    #[test]
    fn group_size_must_match_partition() {
        let partition: Arc<dyn Partition> = Arc::new(GridPartition::new(torus(10, 10), 2, 1).unwrap());
        let err = Node::new(NodeConfig::default(), partition, SingleProcess).err();
        assert_eq!(
            err,
            Some(ConfigError::GroupSizeMismatch {
                partitions: 2,
                group: 1,
            })
        );
    }

    #[test]
    fn oversized_aoi_fails_at_startup() {
        let mut endpoints = LocalCluster::new(2).into_endpoints();
        let transport = endpoints.remove(0);
        let partition: Arc<dyn Partition> = Arc::new(GridPartition::new(torus(10, 10), 2, 1).unwrap());
        let config = NodeConfig {
            aoi: Aoi::uniform(3),
            ..NodeConfig::default()
        };
        assert!(matches!(
            Node::new(config, partition, transport),
            Err(ConfigError::AoiTooLarge { axis: "x", .. })
        ));
    }

    #[test]
    fn handles_are_typed() {
        let mut node = solo(torus(8, 8));
        let heat = node.add_grid_field("heat", 0.0f64);
        let count = node.add_grid_field("count", 0i32);
        assert_eq!(node.field_count(), 2);
        assert_eq!(node.field(heat).unwrap().name(), "heat");
        assert_eq!(node.field(count).unwrap().id(), FieldId(1));
        let wrong: FieldHandle<GridStorage<i32>> = FieldHandle::new(heat.id());
        assert_eq!(
            node.field(wrong).err(),
            Some(SyncError::UnknownField { id: FieldId(0) })
        );
    }

    #[test]
    fn zero_bucket_rejected() {
        let mut node = solo(torus(8, 8));
        assert!(matches!(
            node.add_object_field::<Position, Walker>("walkers", 0),
            Err(ConfigError::InvalidField { .. })
        ));
    }

    // ── Single process ──────────────────────────────────────────

    #[test]
    fn step_advances_tick_and_wraps_halo() {
        let mut node = solo(torus(8, 8));
        let heat = node.add_grid_field("heat", 0.0f64);
        node.field_mut(heat).unwrap().set(GridPoint::new(0, 0), 2.5).unwrap();
        let report = node.step().unwrap();
        assert_eq!(report.tick, TickId(0));
        assert_eq!(report.neighbors, 0);
        assert_eq!(node.tick(), TickId(1));
        assert!(report.metrics.halo_entries > 0);

        // The far corner of the halo mirrors the origin.
        let field = node.field(heat).unwrap();
        assert_eq!(field.storage().get(GridPoint::new(8, 8)), Some(2.5));
        assert_eq!(node.get_value(heat, GridPoint::new(-8, 0)).unwrap(), 2.5);
    }

    #[test]
    fn self_wrap_replicates_entities() {
        let mut node = solo(torus(8, 8));
        let walkers = node.add_object_field::<Position, Walker>("walkers", 2).unwrap();
        let w = Walker::new(EntityId(1), 1.0);
        node.field_mut(walkers)
            .unwrap()
            .add(w, Position::new(0.5, 0.5))
            .unwrap();
        node.step().unwrap();

        let field = node.field(walkers).unwrap();
        assert_eq!(field.owned_entities().count(), 1);
        // One copy per wrapped side: right, bottom and the corner.
        assert_eq!(field.halo_entities().count(), 3);
        assert!(field.halo_entities().all(|(loc, _)| loc == Position::new(0.5, 0.5)));
    }

    #[test]
    fn repartition_refused_with_pending_migrations() {
        let mut endpoints = LocalCluster::new(2).into_endpoints();
        let transport = endpoints.remove(0);
        let partition: Arc<dyn Partition> = Arc::new(GridPartition::new(torus(10, 10), 2, 1).unwrap());
        let mut node = Node::new(NodeConfig::default(), Arc::clone(&partition), transport).unwrap();
        let walkers = node.add_object_field::<Position, Walker>("walkers", 2).unwrap();
        let field = node.field_mut(walkers).unwrap();
        field.add(Walker::new(EntityId(1), 0.0), Position::new(4.5, 4.5)).unwrap();
        field.move_entity(EntityId(1), Position::new(5.5, 4.5)).unwrap();

        assert_eq!(
            node.repartition(partition).err(),
            Some(SyncError::PendingMigrations { count: 1 })
        );
    }
}
