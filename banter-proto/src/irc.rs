//! Implementation of IRC codec for Tokio.
use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::error;
use crate::line::LineCodec;
use crate::message::{Message, MAX_LINE_BYTES};

/// An IRC codec built around an inner line codec.
///
/// Inbound lines of any length are parsed; outbound lines are clamped to the
/// 512-byte protocol limit (including `\r\n`), cutting user-supplied text at
/// a character boundary. Callers for whom truncation is unacceptable must
/// split their text beforehand.
pub struct IrcCodec {
    inner: LineCodec,
}

impl IrcCodec {
    /// Creates a new instance of `IrcCodec` wrapping a `LineCodec` with the
    /// specific encoding.
    pub fn new(label: &str) -> error::Result<IrcCodec> {
        LineCodec::new(label).map(|inner| IrcCodec { inner })
    }

    fn clamp(line: String) -> String {
        if line.len() <= MAX_LINE_BYTES {
            return line;
        }
        let mut cut = MAX_LINE_BYTES - 2;
        while !line.is_char_boundary(cut) {
            cut -= 1;
        }
        let mut clamped = line;
        clamped.truncate(cut);
        clamped.push_str("\r\n");
        clamped
    }
}

impl Decoder for IrcCodec {
    type Item = Message;
    type Error = error::ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> error::Result<Option<Message>> {
        self.inner.decode(src).and_then(|res| {
            res.map_or(Ok(None), |line| {
                line.parse::<Message>()
                    .map(Some)
                    .map_err(|cause| error::ProtocolError::InvalidMessage { string: line, cause })
            })
        })
    }
}

impl Encoder<Message> for IrcCodec {
    type Error = error::ProtocolError;

    fn encode(&mut self, msg: Message, dst: &mut BytesMut) -> error::Result<()> {
        self.inner.encode(IrcCodec::clamp(msg.to_string()), dst)
    }
}
