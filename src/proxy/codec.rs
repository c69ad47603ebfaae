//! Newline framing for relayed messages
//!
//! Frames are yielded with their trailing delimiter so the relay forwards the
//! exact bytes it read. Lines are unbounded unless a maximum is configured.

use bytes::{BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::debug;

use crate::error::{Error, ProtocolError};
use crate::proxy::message::DELIMITER;

#[derive(Debug, Clone, Default)]
pub struct MessageCodec {
    // Upper bound for one message, delimiter included
    max_len: Option<usize>,
    // Bytes already scanned for a delimiter in the current buffer
    next_index: usize,
}

impl MessageCodec {
    pub fn new(max_len: Option<usize>) -> Self {
        Self {
            max_len: max_len.map(|max| max.max(1)),
            next_index: 0,
        }
    }

    pub fn max_len(&self) -> Option<usize> {
        self.max_len
    }
}

impl Decoder for MessageCodec {
    type Item = Bytes;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>, Error> {
        let scan_end = self.max_len.map_or(src.len(), |max| src.len().min(max));
        let found = src[self.next_index.min(scan_end)..scan_end]
            .iter()
            .position(|b| *b == DELIMITER);

        match found {
            Some(offset) => {
                let end = self.next_index + offset + 1;
                self.next_index = 0;
                Ok(Some(src.split_to(end).freeze()))
            }
            None => match self.max_len {
                Some(max) if src.len() >= max => Err(ProtocolError::TooLong { max }.into()),
                _ => {
                    self.next_index = src.len();
                    Ok(None)
                }
            },
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>, Error> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }

        // A peer closing mid-line ends the session; the fragment is never relayed.
        if !src.is_empty() {
            debug!(bytes = src.len(), "discarding partial message at end of stream");
            src.clear();
        }
        self.next_index = 0;
        Ok(None)
    }
}

impl Encoder<Bytes> for MessageCodec {
    type Error = Error;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Error> {
        dst.reserve(item.len());
        dst.put(item);
        Ok(())
    }
}
