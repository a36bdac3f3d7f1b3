//! Implementation of line-delimiting codec for Tokio.

use std::io;

use bytes::BytesMut;
use encoding::label::encoding_from_whatwg_label;
use encoding::{DecoderTrap, EncoderTrap, EncodingRef};
use tokio_util::codec::{Decoder, Encoder};

use crate::error;

/// A line-based codec parameterized by an encoding.
///
/// Decoded lines have their terminator removed; a bare `\n` is accepted as a
/// terminator alongside `\r\n`.
pub struct LineCodec {
    encoding: EncodingRef,
    next_index: usize,
}

impl LineCodec {
    /// Creates a new instance of `LineCodec` from the specified encoding
    /// label.
    pub fn new(label: &str) -> error::Result<LineCodec> {
        encoding_from_whatwg_label(label)
            .map(|encoding| LineCodec {
                encoding,
                next_index: 0,
            })
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    &format!("Attempted to use unknown codec {}.", label)[..],
                )
                .into()
            })
    }

    /// The name of the codec's encoding.
    pub fn name(&self) -> &str {
        self.encoding.name()
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = error::ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> error::Result<Option<String>> {
        let offset = match src[self.next_index..].iter().position(|b| *b == b'\n') {
            Some(offset) => offset,
            None => {
                // None of the buffered bytes are newlines; start the next
                // search where this one ended.
                self.next_index = src.len();
                return Ok(None);
            }
        };

        let mut line = src.split_to(self.next_index + offset + 1);
        self.next_index = 0;

        // Drop the terminator before decoding.
        let mut end = line.len() - 1;
        if end > 0 && line[end - 1] == b'\r' {
            end -= 1;
        }
        line.truncate(end);

        match self.encoding.decode(line.as_ref(), DecoderTrap::Replace) {
            Ok(data) => Ok(Some(data)),
            Err(data) => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                &format!("Failed to decode {} as {}.", data, self.encoding.name())[..],
            )
            .into()),
        }
    }
}

impl Encoder<String> for LineCodec {
    type Error = error::ProtocolError;

    fn encode(&mut self, msg: String, dst: &mut BytesMut) -> error::Result<()> {
        let data: error::Result<Vec<u8>> = self
            .encoding
            .encode(&msg, EncoderTrap::Replace)
            .map_err(|data| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    &format!("Failed to encode {} as {}.", data, self.encoding.name())[..],
                )
                .into()
            });

        dst.extend(&data?);

        Ok(())
    }
}
