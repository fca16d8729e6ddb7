//! A [`tokio_util::codec`] `Decoder`/`Encoder` pair that frames whole
//! [`Message`]s directly, layering [`crate::message::Message::parse`]/
//! `to_wire` on top of [`LineCodec`].

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::Result;
use crate::line::LineCodec;
use crate::message::Message;

/// Wraps a [`LineCodec`] to decode/encode [`Message`] directly.
pub struct MessageCodec {
    lines: LineCodec,
}

impl MessageCodec {
    /// Builds a codec using the named character encoding.
    pub fn new(label: &str) -> Result<MessageCodec> {
        Ok(MessageCodec {
            lines: LineCodec::new(label)?,
        })
    }
}

impl Default for MessageCodec {
    fn default() -> Self {
        MessageCodec {
            lines: LineCodec::default(),
        }
    }
}

impl Decoder for MessageCodec {
    type Item = Message;
    type Error = crate::error::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Message>> {
        match self.lines.decode(src)? {
            Some(line) => {
                if line.trim().is_empty() {
                    // Servers occasionally send bare keepalive newlines; skip
                    // silently rather than surfacing a parse error for them.
                    Ok(None)
                } else {
                    Message::parse(&line).map(Some)
                }
            }
            None => Ok(None),
        }
    }
}

impl Encoder<Message> for MessageCodec {
    type Error = crate::error::Error;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<()> {
        let wire = item.to_wire()?;
        self.lines.encode(wire, dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_a_full_message() {
        let mut codec = MessageCodec::default();
        let mut buf = BytesMut::from("PING :abc\r\n");
        let msg = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(msg.kind.raw_command(), "PING");
    }

    #[test]
    fn blank_keepalive_line_decodes_to_nothing() {
        let mut codec = MessageCodec::default();
        let mut buf = BytesMut::from("\r\n");
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn encodes_a_message_to_wire_bytes() {
        let mut codec = MessageCodec::default();
        let msg = Message::parse("PRIVMSG #c :hi\r\n").unwrap();
        let mut buf = BytesMut::new();
        codec.encode(msg, &mut buf).unwrap();
        assert_eq!(&buf[..], b"PRIVMSG #c :hi\r\n");
    }
}
