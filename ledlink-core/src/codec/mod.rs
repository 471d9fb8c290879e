//! `tokio_util` codec for streams of 5-byte delta records.
//!
//! The wire has no message framing, so a byte stream decodes into a flat
//! sequence of records. Encoding an [`EncodedMessage`] writes its bytes
//! unchanged.

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::LedError;
use crate::led::delta::DeltaRecord;
use crate::led::message::{EncodedMessage, RECORD_SIZE};

#[derive(Debug, Clone, Copy, Default)]
pub struct DeltaCodec;

impl Decoder for DeltaCodec {
    type Item = DeltaRecord;
    type Error = LedError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < RECORD_SIZE {
            src.reserve(RECORD_SIZE - src.len());
            return Ok(None);
        }
        let mut record = src.split_to(RECORD_SIZE);
        Ok(Some(DeltaRecord::get(&mut record)))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(record) => Ok(Some(record)),
            None if src.is_empty() => Ok(None),
            None => {
                let len = src.remaining();
                src.clear();
                Err(LedError::TruncatedMessage {
                    len,
                    record_size: RECORD_SIZE,
                })
            }
        }
    }
}

impl Encoder<EncodedMessage> for DeltaCodec {
    type Error = LedError;

    fn encode(&mut self, item: EncodedMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.extend_from_slice(item.as_bytes());
        Ok(())
    }
}

impl Encoder<DeltaRecord> for DeltaCodec {
    type Error = LedError;

    fn encode(&mut self, item: DeltaRecord, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(RECORD_SIZE);
        item.put(dst);
        Ok(())
    }
}
