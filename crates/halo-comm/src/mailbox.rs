//! Demultiplexing, timeouts and query service on top of a transport.

use crate::error::TransportError;
use crate::message::{Message, MessageKind};
use crate::transport::Transport;
use halo_core::codec::{write_u32_le, Reader};
use halo_core::{CodecError, Pid, TickId};
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};
use tracing::trace;

/// Answers remote point queries.
///
/// Called from inside every blocking wait, so it sees the field state of
/// whatever phase the process is blocked in. It must not block.
pub trait QueryServer {
    /// Produce the response body for a request body from `from`.
    fn answer(&self, from: Pid, body: &[u8]) -> Vec<u8>;
}

impl<F> QueryServer for F
where
    F: Fn(Pid, &[u8]) -> Vec<u8>,
{
    fn answer(&self, from: Pid, body: &[u8]) -> Vec<u8> {
        self(from, body)
    }
}

/// Traffic counters, reset by [`Mailbox::take_stats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MailboxStats {
    /// Encoded bytes handed to the transport.
    pub bytes_sent: u64,
    /// Encoded bytes taken from the transport.
    pub bytes_received: u64,
    /// Messages sent.
    pub messages_sent: u64,
    /// Messages received.
    pub messages_received: u64,
    /// Remote queries answered.
    pub queries_served: u64,
}

/// Typed messaging for one process.
///
/// Messages that arrive while waiting for something else are stashed per
/// `(source, kind)` in arrival order, so FIFO per sender is preserved for
/// every kind independently. Query requests are answered the moment they
/// arrive and never stashed.
pub struct Mailbox<T: Transport> {
    transport: T,
    timeout: Option<Duration>,
    stash: HashMap<(Pid, MessageKind), VecDeque<Message>>,
    stats: MailboxStats,
}

impl<T: Transport> Mailbox<T> {
    /// Wrap `transport`; every blocking wait gives up after `timeout`.
    pub fn new(transport: T, timeout: Option<Duration>) -> Self {
        Self {
            transport,
            timeout,
            stash: HashMap::new(),
            stats: MailboxStats::default(),
        }
    }

    /// This process's pid.
    pub fn pid(&self) -> Pid {
        self.transport.pid()
    }

    /// Group size.
    pub fn num_partitions(&self) -> usize {
        self.transport.num_partitions()
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Per-wait timeout.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Change the per-wait timeout.
    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    /// Counters since the last [`take_stats`](Self::take_stats).
    pub fn stats(&self) -> MailboxStats {
        self.stats
    }

    /// Return and reset the counters.
    pub fn take_stats(&mut self) -> MailboxStats {
        std::mem::take(&mut self.stats)
    }

    /// Messages received but not yet consumed.
    pub fn stashed(&self) -> usize {
        self.stash.values().map(VecDeque::len).sum()
    }

    /// Encode and send `msg` to `to`.
    pub fn send(&mut self, to: Pid, msg: &Message) -> Result<(), TransportError> {
        let payload = msg.encode();
        let len = payload.len() as u64;
        trace!(
            pid = %self.pid(),
            to = %to,
            kind = ?msg.kind,
            tick = msg.tick.0,
            bytes = len,
            "send"
        );
        self.transport.send_to(to, payload)?;
        self.stats.bytes_sent += len;
        self.stats.messages_sent += 1;
        Ok(())
    }

    /// Block until the next `kind` message from `from` arrives.
    ///
    /// The message must belong to `tick`; anything else is a protocol
    /// violation. Queries arriving meanwhile are answered through
    /// `server`.
    pub fn receive_from(
        &mut self,
        from: Pid,
        kind: MessageKind,
        tick: TickId,
        server: &dyn QueryServer,
    ) -> Result<Message, TransportError> {
        if let Some(msg) = self.stash.get_mut(&(from, kind)).and_then(VecDeque::pop_front) {
            return check_tick(from, msg, tick);
        }
        let start = Instant::now();
        loop {
            let remaining = match self.timeout {
                None => None,
                Some(limit) => {
                    let elapsed = start.elapsed();
                    if elapsed >= limit {
                        return Err(TransportError::Timeout {
                            peer: from,
                            kind,
                            waited: elapsed,
                        });
                    }
                    Some(limit - elapsed)
                }
            };
            let Some((src, bytes)) = self.transport.recv(remaining)? else {
                return Err(TransportError::Timeout {
                    peer: from,
                    kind,
                    waited: start.elapsed(),
                });
            };
            let Some(msg) = self.accept(src, &bytes, server)? else {
                continue;
            };
            if src == from && msg.kind == kind {
                return check_tick(from, msg, tick);
            }
            self.stash.entry((src, msg.kind)).or_default().push_back(msg);
        }
    }

    /// Drain everything already queued without blocking, answering
    /// queries and stashing the rest. Returns the number of queries served.
    pub fn serve_pending(&mut self, server: &dyn QueryServer) -> Result<usize, TransportError> {
        let before = self.stats.queries_served;
        while let Some((src, bytes)) = self.transport.try_recv()? {
            if let Some(msg) = self.accept(src, &bytes, server)? {
                self.stash.entry((src, msg.kind)).or_default().push_back(msg);
            }
        }
        Ok((self.stats.queries_served - before) as usize)
    }

    /// Collective barrier over the whole group.
    ///
    /// Every process reports to `P0`, which releases everyone once all
    /// have arrived. Queries are still answered while waiting.
    pub fn barrier(&mut self, tick: TickId, server: &dyn QueryServer) -> Result<(), TransportError> {
        let n = self.num_partitions() as u32;
        if n <= 1 {
            return Ok(());
        }
        let signal = Message::new(MessageKind::Barrier, tick, Vec::new());
        if self.pid() == Pid(0) {
            for p in 1..n {
                self.receive_from(Pid(p), MessageKind::Barrier, tick, server)?;
            }
            for p in 1..n {
                self.send(Pid(p), &signal)?;
            }
        } else {
            self.send(Pid(0), &signal)?;
            self.receive_from(Pid(0), MessageKind::Barrier, tick, server)?;
        }
        Ok(())
    }

    /// Collective routing step for direct messages outside the
    /// neighbourhood.
    ///
    /// Every process passes the peers it is about to send one direct
    /// message to and gets back, ascending, the peers that will send one
    /// to it. Routed through `P0` like [`barrier`](Self::barrier).
    pub fn route(
        &mut self,
        tick: TickId,
        targets: &[Pid],
        server: &dyn QueryServer,
    ) -> Result<Vec<Pid>, TransportError> {
        let n = self.num_partitions();
        for &t in targets {
            if t.index() >= n {
                return Err(TransportError::UnknownPeer { pid: t, count: n });
            }
            if t == self.pid() {
                return Err(TransportError::SelfSend { pid: t });
            }
        }
        if n <= 1 {
            return Ok(Vec::new());
        }
        if self.pid() != Pid(0) {
            self.send(Pid(0), &Message::new(MessageKind::Route, tick, encode_pids(targets)))?;
            let reply = self.receive_from(Pid(0), MessageKind::Route, tick, server)?;
            return decode_pids(&reply.body).map_err(|source| TransportError::Malformed { from: Pid(0), source });
        }

        let mut sources: Vec<Vec<Pid>> = vec![Vec::new(); n];
        for &t in targets {
            sources[t.index()].push(Pid(0));
        }
        for p in 1..n as u32 {
            let from = Pid(p);
            let msg = self.receive_from(from, MessageKind::Route, tick, server)?;
            let wanted = decode_pids(&msg.body).map_err(|source| TransportError::Malformed { from, source })?;
            for t in wanted {
                if t.index() >= n || t == from {
                    return Err(TransportError::Malformed {
                        from,
                        source: CodecError::Invalid {
                            detail: format!("route target {t} from {from}"),
                        },
                    });
                }
                sources[t.index()].push(from);
            }
        }
        for p in 1..n {
            self.send(Pid(p as u32), &Message::new(MessageKind::Route, tick, encode_pids(&sources[p])))?;
        }
        Ok(std::mem::take(&mut sources[0]))
    }

    /// Decode an incoming payload. Queries are answered here and yield
    /// `None`.
    fn accept(
        &mut self,
        src: Pid,
        bytes: &[u8],
        server: &dyn QueryServer,
    ) -> Result<Option<Message>, TransportError> {
        let msg = Message::decode(bytes).map_err(|source| TransportError::Malformed { from: src, source })?;
        self.stats.bytes_received += bytes.len() as u64;
        self.stats.messages_received += 1;
        trace!(
            pid = %self.pid(),
            from = %src,
            kind = ?msg.kind,
            tick = msg.tick.0,
            bytes = bytes.len(),
            "recv"
        );
        if msg.kind != MessageKind::QueryRequest {
            return Ok(Some(msg));
        }
        let answer = server.answer(src, &msg.body);
        self.send(src, &Message::new(MessageKind::QueryResponse, msg.tick, answer))?;
        self.stats.queries_served += 1;
        Ok(None)
    }
}

fn encode_pids(pids: &[Pid]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + 4 * pids.len());
    write_u32_le(&mut out, pids.len() as u32);
    for p in pids {
        write_u32_le(&mut out, p.0);
    }
    out
}

fn decode_pids(body: &[u8]) -> Result<Vec<Pid>, CodecError> {
    let mut r = Reader::new(body);
    let count = r.read_u32_le()? as usize;
    let mut out = Vec::with_capacity(count.min(r.remaining() / 4));
    for _ in 0..count {
        out.push(Pid(r.read_u32_le()?));
    }
    r.finish()?;
    Ok(out)
}

fn check_tick(from: Pid, msg: Message, tick: TickId) -> Result<Message, TransportError> {
    if msg.tick == tick {
        Ok(msg)
    } else {
        Err(TransportError::OutOfOrder {
            from,
            kind: msg.kind,
            expected: tick,
            got: msg.tick,
        })
    }
}
