//! Binary encode/decode for halo packs, migrations and control messages.
//!
//! All integers are little-endian. Byte arrays are length-prefixed with a
//! `u32` length. The format is intentionally simple: no compression, no
//! alignment padding, no self-describing schema. Because every writer is a
//! pure function of its input, encoding unchanged data twice yields
//! byte-identical output.

use crate::error::CodecError;
use crate::geom::{GridPoint, Position};

// ── Primitive writers ───────────────────────────────────────────

/// Write a single byte.
pub fn write_u8(w: &mut Vec<u8>, v: u8) {
    w.push(v);
}

/// Write a little-endian u32.
pub fn write_u32_le(w: &mut Vec<u8>, v: u32) {
    w.extend_from_slice(&v.to_le_bytes());
}

/// Write a little-endian u64.
pub fn write_u64_le(w: &mut Vec<u8>, v: u64) {
    w.extend_from_slice(&v.to_le_bytes());
}

/// Write a little-endian i32.
pub fn write_i32_le(w: &mut Vec<u8>, v: i32) {
    w.extend_from_slice(&v.to_le_bytes());
}

/// Write a little-endian i64.
pub fn write_i64_le(w: &mut Vec<u8>, v: i64) {
    w.extend_from_slice(&v.to_le_bytes());
}

/// Write a little-endian f32.
pub fn write_f32_le(w: &mut Vec<u8>, v: f32) {
    w.extend_from_slice(&v.to_le_bytes());
}

/// Write a little-endian f64.
pub fn write_f64_le(w: &mut Vec<u8>, v: f64) {
    w.extend_from_slice(&v.to_le_bytes());
}

/// Write a length-prefixed byte array (u32 length + bytes).
pub fn write_length_prefixed_bytes(w: &mut Vec<u8>, b: &[u8]) {
    write_u32_le(w, b.len() as u32);
    w.extend_from_slice(b);
}

/// Reserve a `u32` slot and return its offset, for counts known only
/// after the payload has been written. Fill with [`patch_u32_le`].
pub fn reserve_u32(w: &mut Vec<u8>) -> usize {
    let at = w.len();
    w.extend_from_slice(&[0u8; 4]);
    at
}

/// Overwrite a slot previously returned by [`reserve_u32`].
pub fn patch_u32_le(w: &mut [u8], at: usize, v: u32) {
    w[at..at + 4].copy_from_slice(&v.to_le_bytes());
}

// ── Reader ──────────────────────────────────────────────────────

/// Bounds-checked cursor over an encoded buffer.
#[derive(Debug)]
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    /// Start reading at the beginning of `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Fail with `TrailingBytes` unless the whole buffer was consumed.
    pub fn finish(&self) -> Result<(), CodecError> {
        match self.remaining() {
            0 => Ok(()),
            count => Err(CodecError::TrailingBytes { count }),
        }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        if self.remaining() < n {
            return Err(CodecError::Truncated {
                needed: n,
                available: self.remaining(),
            });
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// Read a single byte.
    pub fn read_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    /// Read a little-endian u32.
    pub fn read_u32_le(&mut self) -> Result<u32, CodecError> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    /// Read a little-endian u64.
    pub fn read_u64_le(&mut self) -> Result<u64, CodecError> {
        Ok(u64::from_le_bytes(self.array()?))
    }

    /// Read a little-endian i32.
    pub fn read_i32_le(&mut self) -> Result<i32, CodecError> {
        Ok(i32::from_le_bytes(self.array()?))
    }

    /// Read a little-endian i64.
    pub fn read_i64_le(&mut self) -> Result<i64, CodecError> {
        Ok(i64::from_le_bytes(self.array()?))
    }

    /// Read a little-endian f32.
    pub fn read_f32_le(&mut self) -> Result<f32, CodecError> {
        Ok(f32::from_le_bytes(self.array()?))
    }

    /// Read a little-endian f64.
    pub fn read_f64_le(&mut self) -> Result<f64, CodecError> {
        Ok(f64::from_le_bytes(self.array()?))
    }

    /// Read a length-prefixed byte array without copying.
    pub fn read_length_prefixed_bytes(&mut self) -> Result<&'a [u8], CodecError> {
        let len = self.read_u32_le()? as usize;
        self.take(len)
    }
}

// ── Wire trait ──────────────────────────────────────────────────

/// Values that can travel between partitions.
///
/// Implementations must be deterministic: equal values encode to equal
/// bytes.
pub trait Wire: Sized {
    /// Append the encoding of `self` to `w`.
    fn encode(&self, w: &mut Vec<u8>);

    /// Decode one value from `r`.
    fn decode(r: &mut Reader<'_>) -> Result<Self, CodecError>;
}

macro_rules! wire_primitive {
    ($ty:ty, $write:ident, $read:ident) => {
        impl Wire for $ty {
            fn encode(&self, w: &mut Vec<u8>) {
                $write(w, *self);
            }

            fn decode(r: &mut Reader<'_>) -> Result<Self, CodecError> {
                r.$read()
            }
        }
    };
}

wire_primitive!(u8, write_u8, read_u8);
wire_primitive!(u32, write_u32_le, read_u32_le);
wire_primitive!(u64, write_u64_le, read_u64_le);
wire_primitive!(i32, write_i32_le, read_i32_le);
wire_primitive!(i64, write_i64_le, read_i64_le);
wire_primitive!(f32, write_f32_le, read_f32_le);
wire_primitive!(f64, write_f64_le, read_f64_le);

impl Wire for bool {
    fn encode(&self, w: &mut Vec<u8>) {
        write_u8(w, u8::from(*self));
    }

    fn decode(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        match r.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            tag => Err(CodecError::InvalidTag { tag }),
        }
    }
}

impl Wire for GridPoint {
    fn encode(&self, w: &mut Vec<u8>) {
        write_i32_le(w, self.x);
        write_i32_le(w, self.y);
    }

    fn decode(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(GridPoint::new(r.read_i32_le()?, r.read_i32_le()?))
    }
}

impl Wire for Position {
    fn encode(&self, w: &mut Vec<u8>) {
        write_f64_le(w, self.x);
        write_f64_le(w, self.y);
    }

    fn decode(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(Position::new(r.read_f64_le()?, r.read_f64_le()?))
    }
}

impl<T: Wire> Wire for Option<T> {
    fn encode(&self, w: &mut Vec<u8>) {
        match self {
            Some(v) => {
                write_u8(w, 1);
                v.encode(w);
            }
            None => write_u8(w, 0),
        }
    }

    fn decode(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        match r.read_u8()? {
            0 => Ok(None),
            1 => Ok(Some(T::decode(r)?)),
            tag => Err(CodecError::InvalidTag { tag }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitives_decode_in_write_order() {
        let mut buf = Vec::new();
        write_u8(&mut buf, 3);
        write_u32_le(&mut buf, 0xDEAD_BEEF);
        write_i32_le(&mut buf, -42);
        write_f64_le(&mut buf, 7.0);
        write_length_prefixed_bytes(&mut buf, b"halo");

        let mut r = Reader::new(&buf);
        assert_eq!(r.read_u8().unwrap(), 3);
        assert_eq!(r.read_u32_le().unwrap(), 0xDEAD_BEEF);
        assert_eq!(r.read_i32_le().unwrap(), -42);
        assert_eq!(r.read_f64_le().unwrap(), 7.0);
        assert_eq!(r.read_length_prefixed_bytes().unwrap(), b"halo");
        r.finish().unwrap();
    }

    #[test]
    fn truncated_input_reports_shortfall() {
        let buf = [1u8, 2, 3];
        let mut r = Reader::new(&buf);
        assert_eq!(
            r.read_u32_le(),
            Err(CodecError::Truncated {
                needed: 4,
                available: 3
            })
        );
    }

    #[test]
    fn trailing_bytes_are_reported() {
        let buf = [0u8; 5];
        let mut r = Reader::new(&buf);
        r.read_u32_le().unwrap();
        assert_eq!(r.finish(), Err(CodecError::TrailingBytes { count: 1 }));
    }

    #[test]
    fn patched_count_lands_in_reserved_slot() {
        let mut buf = Vec::new();
        let at = reserve_u32(&mut buf);
        write_u8(&mut buf, 9);
        patch_u32_le(&mut buf, at, 17);
        let mut r = Reader::new(&buf);
        assert_eq!(r.read_u32_le().unwrap(), 17);
        assert_eq!(r.read_u8().unwrap(), 9);
    }

    #[test]
    fn invalid_option_tag_is_rejected() {
        let buf = [7u8];
        let mut r = Reader::new(&buf);
        assert_eq!(
            Option::<u32>::decode(&mut r),
            Err(CodecError::InvalidTag { tag: 7 })
        );
    }

    #[test]
    fn grid_point_encoding_is_stable() {
        let mut a = Vec::new();
        let mut b = Vec::new();
        GridPoint::new(-4, 9).encode(&mut a);
        GridPoint::new(-4, 9).encode(&mut b);
        assert_eq!(a, b);
        assert_eq!(GridPoint::decode(&mut Reader::new(&a)).unwrap(), GridPoint::new(-4, 9));
    }
}
