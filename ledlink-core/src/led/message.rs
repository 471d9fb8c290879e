//! Wire encoding of delta records.
//!
//! ## Wire format
//!
//! A message is a bare concatenation of 5-byte records, one per changed
//! pixel, in scan order:
//!
//! ```text
//! index:  u16 big-endian (2)
//! red:    u8             (1)
//! green:  u8             (1)
//! blue:   u8             (1)
//! ```
//!
//! There is no header, count or terminator. The receiver infers the record
//! count as `len / 5`, so `len % 5 == 0` always holds.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::LedError;
use crate::led::delta::DeltaRecord;

/// Size of one encoded record in bytes.
pub const RECORD_SIZE: usize = 5;

impl DeltaRecord {
    /// Serialize to the 5-byte wire form.
    pub fn to_bytes(self) -> [u8; RECORD_SIZE] {
        let [hi, lo] = self.index.to_be_bytes();
        [hi, lo, self.red, self.green, self.blue]
    }

    /// Deserialize one record from exactly five bytes.
    pub fn from_bytes(b: [u8; RECORD_SIZE]) -> Self {
        Self::new(u16::from_be_bytes([b[0], b[1]]), b[2], b[3], b[4])
    }

    pub(crate) fn put(self, dst: &mut impl BufMut) {
        dst.put_u16(self.index);
        dst.put_u8(self.red);
        dst.put_u8(self.green);
        dst.put_u8(self.blue);
    }

    pub(crate) fn get(src: &mut impl Buf) -> Self {
        let index = src.get_u16();
        Self::new(index, src.get_u8(), src.get_u8(), src.get_u8())
    }
}

// ── EncodedMessage ───────────────────────────────────────────────

/// An immutable, validated delta message ready for transmission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodedMessage {
    data: Bytes,
}

impl EncodedMessage {
    /// Encode `records` into exactly `records.len() * 5` bytes.
    pub fn encode(records: &[DeltaRecord]) -> Self {
        let mut buf = BytesMut::with_capacity(records.len() * RECORD_SIZE);
        for r in records {
            r.put(&mut buf);
        }
        Self { data: buf.freeze() }
    }

    /// Validate raw bytes received off the wire.
    pub fn from_bytes(data: Bytes) -> Result<Self, LedError> {
        check_len(data.len())?;
        Ok(Self { data })
    }

    pub(crate) fn builder() -> MessageBuilder {
        MessageBuilder {
            buf: BytesMut::new(),
        }
    }

    /// Walk the 5-byte chunks and recover the ordered records.
    pub fn decode(&self) -> Vec<DeltaRecord> {
        self.records().collect()
    }

    /// Lazily iterate the records.
    pub fn records(&self) -> impl Iterator<Item = DeltaRecord> + '_ {
        self.data.chunks_exact(RECORD_SIZE).map(|c| {
            let mut c = c;
            DeltaRecord::get(&mut c)
        })
    }

    pub fn record_count(&self) -> usize {
        self.data.len() / RECORD_SIZE
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Cheap clone of the payload for handing to a transport.
    pub fn to_bytes(&self) -> Bytes {
        self.data.clone()
    }

    pub fn into_bytes(self) -> Bytes {
        self.data
    }
}

/// Decode a raw payload, rejecting lengths that are not a whole number of records.
pub fn decode_records(data: &[u8]) -> Result<Vec<DeltaRecord>, LedError> {
    check_len(data.len())?;
    let mut src = data;
    let mut out = Vec::with_capacity(data.len() / RECORD_SIZE);
    while src.has_remaining() {
        out.push(DeltaRecord::get(&mut src));
    }
    Ok(out)
}

fn check_len(len: usize) -> Result<(), LedError> {
    if len % RECORD_SIZE != 0 {
        return Err(LedError::TruncatedMessage {
            len,
            record_size: RECORD_SIZE,
        });
    }
    Ok(())
}

// ── MessageBuilder ───────────────────────────────────────────────

/// Incremental encoder used by the single-pass diff.
pub(crate) struct MessageBuilder {
    buf: BytesMut,
}

impl MessageBuilder {
    pub(crate) fn push(&mut self, record: DeltaRecord) {
        record.put(&mut self.buf);
    }

    pub(crate) fn finish(self) -> EncodedMessage {
        EncodedMessage {
            data: self.buf.freeze(),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
