//! Point-to-point messaging between Halo processes.
//!
//! The synchroniser needs very little from its transport: send a byte
//! payload to a pid, receive the next payload with its source, and know
//! its own pid and the group size. Delivery must be FIFO and exactly-once
//! per ordered pair. [`Transport`] captures that contract.
//!
//! On top of it, [`Mailbox`] demultiplexes typed [`Message`]s by source
//! and kind, enforces per-wait timeouts, and answers remote point queries
//! while blocked so two processes can never deadlock on each other's
//! queries.
//!
//! [`ChannelTransport`] runs a whole cluster inside one OS process, one
//! thread per partition, over crossbeam channels. [`SingleProcess`] is
//! the degenerate group of one.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod channel;
pub mod error;
pub mod mailbox;
pub mod message;
pub mod single;
pub mod transport;

pub use channel::{ChannelTransport, LocalCluster};
pub use error::TransportError;
pub use mailbox::{Mailbox, MailboxStats, QueryServer};
pub use message::{Message, MessageKind};
pub use single::SingleProcess;
pub use transport::Transport;
