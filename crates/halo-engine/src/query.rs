//! Remote point queries.
//!
//! Request body: field id (`u32`) then the domain point. Response body: a
//! status byte, then either the field's encoding of the point or a
//! length-prefixed UTF-8 reason.

use crate::error::SyncError;
use crate::field::SyncField;
use halo_comm::QueryServer;
use halo_core::codec::{write_length_prefixed_bytes, write_u32_le, write_u8};
use halo_core::{CodecError, FieldId, GridPoint, Pid, Reader, TickId, Wire};
use tracing::debug;

const STATUS_OK: u8 = 0;
const STATUS_ERR: u8 = 1;

pub(crate) fn encode_request(field: FieldId, point: GridPoint) -> Vec<u8> {
    let mut out = Vec::with_capacity(12);
    write_u32_le(&mut out, field.0);
    point.encode(&mut out);
    out
}

/// Serves queries against a node's fields while it is blocked.
pub(crate) struct FieldServer<'a> {
    fields: &'a [Box<dyn SyncField>],
}

impl<'a> FieldServer<'a> {
    pub(crate) fn new(fields: &'a [Box<dyn SyncField>]) -> Self {
        Self { fields }
    }

    fn resolve(&self, body: &[u8], out: &mut Vec<u8>) -> Result<(), String> {
        let mut r = Reader::new(body);
        let id = r.read_u32_le().map_err(|e| e.to_string())?;
        let point = GridPoint::decode(&mut r).map_err(|e| e.to_string())?;
        r.finish().map_err(|e| e.to_string())?;
        let field = self
            .fields
            .get(id as usize)
            .ok_or_else(|| format!("field {id} is not registered"))?;
        field.answer(point, out).map_err(|e| e.to_string())
    }
}

impl QueryServer for FieldServer<'_> {
    fn answer(&self, from: Pid, body: &[u8]) -> Vec<u8> {
        let mut out = vec![STATUS_OK];
        match self.resolve(body, &mut out) {
            Ok(()) => out,
            Err(reason) => {
                debug!(from = %from, reason = %reason, "query refused");
                let mut out = Vec::with_capacity(reason.len() + 5);
                write_u8(&mut out, STATUS_ERR);
                write_length_prefixed_bytes(&mut out, reason.as_bytes());
                out
            }
        }
    }
}

/// Split a response into its payload, or the remote failure.
pub(crate) fn open_response(pid: Pid, tick: TickId, peer: Pid, body: &[u8]) -> Result<Reader<'_>, SyncError> {
    let codec = |source| SyncError::Codec {
        pid,
        tick,
        peer,
        source,
    };
    let mut r = Reader::new(body);
    match r.read_u8().map_err(codec)? {
        STATUS_OK => Ok(r),
        STATUS_ERR => {
            let reason = r.read_length_prefixed_bytes().map_err(codec)?;
            Err(SyncError::RemoteQuery {
                peer,
                reason: String::from_utf8_lossy(reason).into_owned(),
            })
        }
        tag => Err(codec(CodecError::InvalidTag { tag })),
    }
}
