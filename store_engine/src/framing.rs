//! Length-prefixed JSON frames on stdio.
//!
//! Frame format: `[length: u32 little-endian][content: length bytes of UTF-8 JSON]`.
//!
//! Browsers write the prefix in the host's native order. Every platform we
//! ship for is little-endian, so the order is pinned here instead of
//! following whatever machine the host happens to be built on.

use std::io::{self, Read, Write};

use bytes::{Buf, BufMut, BytesMut};
use serde::Serialize;
use serde_json::Value;
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

use crate::errors::FramingError;

/// Largest content length accepted in either direction.
pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

const PREFIX_LEN: usize = 4;
const READ_CHUNK: usize = 8 * 1024;

#[derive(Debug, Default)]
pub struct FrameCodec;

impl FrameCodec {
    /// Total bytes (prefix included) the frame at the head of `src` needs.
    fn expected_len(src: &BytesMut) -> usize {
        if src.len() < PREFIX_LEN {
            return PREFIX_LEN;
        }
        PREFIX_LEN + u32::from_le_bytes([src[0], src[1], src[2], src[3]]) as usize
    }
}

impl Decoder for FrameCodec {
    type Item = BytesMut;
    type Error = FramingError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < PREFIX_LEN {
            return Ok(None);
        }

        let length = u32::from_le_bytes([src[0], src[1], src[2], src[3]]) as usize;
        if length > MAX_FRAME_LEN {
            return Err(FramingError::FrameTooLarge(length));
        }

        if src.len() < PREFIX_LEN + length {
            src.reserve(PREFIX_LEN + length - src.len());
            return Ok(None);
        }

        src.advance(PREFIX_LEN);
        Ok(Some(src.split_to(length)))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None if src.is_empty() => Ok(None),
            None => Err(FramingError::Truncated {
                expected: Self::expected_len(src),
                received: src.len(),
            }),
        }
    }
}

impl Encoder<Vec<u8>> for FrameCodec {
    type Error = FramingError;

    fn encode(&mut self, item: Vec<u8>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if item.len() > MAX_FRAME_LEN {
            return Err(FramingError::FrameTooLarge(item.len()));
        }
        dst.reserve(PREFIX_LEN + item.len());
        dst.put_u32_le(item.len() as u32);
        dst.extend_from_slice(&item);
        Ok(())
    }
}

/// Blocking frame reader over stdin (or anything else that is `Read`).
pub struct FrameReader<R> {
    inner: R,
    codec: FrameCodec,
    buffer: BytesMut,
}

impl<R: Read> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            codec: FrameCodec,
            buffer: BytesMut::with_capacity(READ_CHUNK),
        }
    }

    /// Reads the next frame and parses its content as JSON.
    ///
    /// Returns `Ok(None)` when the input ends before the first byte of a
    /// length prefix. Ending anywhere later is [`FramingError::Truncated`].
    pub fn read_frame(&mut self) -> Result<Option<Value>, FramingError> {
        let Some(content) = self.next_content()? else {
            return Ok(None);
        };
        trace!(content_len = content.len(), "Frame received");

        let text = std::str::from_utf8(&content)?;
        let value = serde_json::from_str(text).map_err(FramingError::InvalidJson)?;
        Ok(Some(value))
    }

    fn next_content(&mut self) -> Result<Option<BytesMut>, FramingError> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            if let Some(content) = self.codec.decode(&mut self.buffer)? {
                return Ok(Some(content));
            }

            let n = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            if n == 0 {
                return self.codec.decode_eof(&mut self.buffer);
            }
            self.buffer.extend_from_slice(&chunk[..n]);
        }
    }
}

/// Blocking frame writer over stdout. Each frame goes out in a single write
/// followed by a flush.
pub struct FrameWriter<W> {
    inner: W,
    codec: FrameCodec,
}

impl<W: Write> FrameWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            codec: FrameCodec,
        }
    }

    pub fn write_frame<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), FramingError> {
        let content = serde_json::to_vec(value).map_err(FramingError::Encode)?;
        let content_len = content.len();

        let mut frame = BytesMut::new();
        self.codec.encode(content, &mut frame)?;
        self.inner.write_all(&frame)?;
        self.inner.flush()?;

        trace!(content_len, "Frame sent");
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Cursor;

    fn frame_bytes(content: &[u8]) -> Vec<u8> {
        let mut bytes = (content.len() as u32).to_le_bytes().to_vec();
        bytes.extend_from_slice(content);
        bytes
    }

    /// Hands out at most one byte per read call.
    struct Trickle(Cursor<Vec<u8>>);

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let len = buf.len().min(1);
            self.0.read(&mut buf[..len])
        }
    }

    #[test]
    fn test_written_frames_read_back_equal() {
        let values = [
            json!({"op": "list", "args": {}}),
            json!({}),
            json!([]),
            json!(""),
            json!([1, 2.5, -3, true, null, "ünïcode ✓"]),
            json!({"nested": {"deep": [{"x": null}]}}),
        ];

        let mut writer = FrameWriter::new(Vec::new());
        for value in &values {
            writer.write_frame(value).unwrap();
        }

        let mut reader = FrameReader::new(Cursor::new(writer.into_inner()));
        for value in &values {
            assert_eq!(reader.read_frame().unwrap().as_ref(), Some(value));
        }
        assert!(reader.read_frame().unwrap().is_none());
    }

    #[test]
    fn test_prefix_is_little_endian_content_length() {
        let mut writer = FrameWriter::new(Vec::new());
        writer.write_frame(&json!({"result": "success"})).unwrap();
        let bytes = writer.into_inner();

        assert_eq!(&bytes[..4], &[20, 0, 0, 0]);
        assert_eq!(&bytes[4..], br#"{"result":"success"}"#);
    }

    #[test]
    fn test_empty_input_is_end_of_input() {
        let mut reader = FrameReader::new(Cursor::new(Vec::new()));
        assert!(reader.read_frame().unwrap().is_none());
    }

    #[test]
    fn test_partial_reads_are_reassembled() {
        let bytes = frame_bytes(br#"{"op":"save","args":{"name":"a"}}"#);
        let mut reader = FrameReader::new(Trickle(Cursor::new(bytes)));

        let value = reader.read_frame().unwrap().unwrap();
        assert_eq!(value["args"]["name"], "a");
    }

    #[test]
    fn test_short_prefix_is_truncated() {
        let mut reader = FrameReader::new(Cursor::new(vec![5, 0]));
        match reader.read_frame() {
            Err(FramingError::Truncated { expected, received }) => {
                assert_eq!(expected, 4);
                assert_eq!(received, 2);
            }
            other => panic!("expected truncation, got {:?}", other),
        }
    }

    #[test]
    fn test_short_content_is_truncated() {
        let mut bytes = 10u32.to_le_bytes().to_vec();
        bytes.extend_from_slice(b"{}");
        let mut reader = FrameReader::new(Cursor::new(bytes));

        match reader.read_frame() {
            Err(FramingError::Truncated { expected, received }) => {
                assert_eq!(expected, 14);
                assert_eq!(received, 6);
            }
            other => panic!("expected truncation, got {:?}", other),
        }
    }

    #[test]
    fn test_oversized_length_is_rejected() {
        let bytes = u32::MAX.to_le_bytes().to_vec();
        let mut reader = FrameReader::new(Cursor::new(bytes));
        assert!(matches!(
            reader.read_frame(),
            Err(FramingError::FrameTooLarge(len)) if len == u32::MAX as usize
        ));
    }

    #[test]
    fn test_invalid_utf8_content() {
        let bytes = frame_bytes(&[b'"', 0xff, 0xfe, b'"']);
        let mut reader = FrameReader::new(Cursor::new(bytes));
        assert!(matches!(reader.read_frame(), Err(FramingError::InvalidUtf8(_))));
    }

    #[test]
    fn test_invalid_json_content() {
        let bytes = frame_bytes(b"{\"op\":");
        let mut reader = FrameReader::new(Cursor::new(bytes));
        assert!(matches!(reader.read_frame(), Err(FramingError::InvalidJson(_))));
    }

    #[test]
    fn test_codec_waits_for_complete_frame() {
        let mut codec = FrameCodec;
        let mut src = BytesMut::from(&frame_bytes(b"[1,2]")[..7]);

        assert!(codec.decode(&mut src).unwrap().is_none());
        src.extend_from_slice(b"2]");
        assert_eq!(&codec.decode(&mut src).unwrap().unwrap()[..], b"[1,2]");
        assert!(src.is_empty());
    }
}
