//! Line-delimiting codec for Tokio, parameterized by a character encoding.

use bytes::BytesMut;
use encoding_rs::Encoding;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{Error, Result};

/// Splits a byte stream on `\n` and decodes each line with a configurable
/// encoding, replacing malformed sequences rather than failing the
/// connection over them (servers occasionally send latin1 or otherwise
/// non-UTF-8 bytes in topics and realnames).
pub struct LineCodec {
    encoding: &'static Encoding,
    next_index: usize,
}

impl LineCodec {
    /// Builds a codec for the named encoding (a WHATWG label, e.g. `"utf-8"`
    /// or `"windows-1252"`).
    pub fn new(label: &str) -> Result<LineCodec> {
        Encoding::for_label(label.as_bytes())
            .map(|encoding| LineCodec {
                encoding,
                next_index: 0,
            })
            .ok_or_else(|| Error::UnknownEncoding(label.to_owned()))
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        LineCodec {
            encoding: encoding_rs::UTF_8,
            next_index: 0,
        }
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>> {
        let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') else {
            self.next_index = src.len();
            return Ok(None);
        };
        let line = src.split_to(self.next_index + offset + 1);
        self.next_index = 0;
        let (text, _, _had_errors) = self.encoding.decode(&line);
        Ok(Some(text.into_owned()))
    }
}

impl Encoder<String> for LineCodec {
    type Error = Error;

    fn encode(&mut self, msg: String, dst: &mut BytesMut) -> Result<()> {
        let (bytes, _, _had_errors) = self.encoding.encode(&msg);
        dst.extend_from_slice(&bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_one_line_at_a_time() {
        let mut codec = LineCodec::default();
        let mut buf = BytesMut::from("PING :a\r\nPING :b\r\n");
        assert_eq!(codec.decode(&mut buf).unwrap(), Some("PING :a\r\n".to_owned()));
        assert_eq!(codec.decode(&mut buf).unwrap(), Some("PING :b\r\n".to_owned()));
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
    }

    #[test]
    fn buffers_partial_lines_across_calls() {
        let mut codec = LineCodec::default();
        let mut buf = BytesMut::from("PING :par");
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        buf.extend_from_slice(b"tial\r\n");
        assert_eq!(codec.decode(&mut buf).unwrap(), Some("PING :partial\r\n".to_owned()));
    }

    #[test]
    fn unknown_label_is_rejected() {
        assert!(LineCodec::new("not-a-real-encoding").is_err());
    }

    #[test]
    fn encodes_to_utf8_bytes() {
        let mut codec = LineCodec::default();
        let mut buf = BytesMut::new();
        codec.encode("PRIVMSG #c :hi\r\n".to_owned(), &mut buf).unwrap();
        assert_eq!(&buf[..], b"PRIVMSG #c :hi\r\n");
    }
}
