// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 pipetd contributors

//! Length-prefix framing codec for the robot command channel.
//!
//! TCP is a stream protocol without message boundaries. The device's
//! wire format delimits messages with a fixed-width ASCII-decimal
//! length header:
//!
//! ```text
//! +---------------------+-------------------+
//! | Length (10B ASCII)  | Payload           |
//! +---------------------+-------------------+
//! ```
//!
//! The header is the payload length in decimal, left-justified and
//! padded with spaces to exactly [`FRAME_HEADER_SIZE`] bytes
//! (`"42        "` for a 42-byte payload). The payload is UTF-8 JSON.
//!
//! The decoder honors the declared length strictly: it reads exactly
//! `FRAME_HEADER_SIZE` header bytes, parses the length, then reads
//! exactly that many payload bytes, buffering partial reads in between.
//! Message boundaries therefore survive arbitrary TCP segmentation.
//!
//! # Example
//!
//! ```
//! use pipetd::protocol::frame::FrameCodec;
//!
//! let frame = FrameCodec::encode(b"{\"type\":\"ping\"}").unwrap();
//! assert_eq!(&frame[..10], b"15        ");
//! assert_eq!(&frame[10..], b"{\"type\":\"ping\"}");
//! ```

use std::io::{self, Read};

/// Frame header size (ASCII-decimal length field).
pub const FRAME_HEADER_SIZE: usize = 10;

/// Default maximum message size (64 KB - commands are small JSON documents).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 64 * 1024;

/// Length-prefix frame codec for the command channel.
///
/// Maintains partial read state so a frame split across several TCP
/// segments is reassembled correctly. One codec instance belongs to one
/// connection.
#[derive(Debug)]
pub struct FrameCodec {
    /// Current read state
    state: ReadState,

    /// Buffer for accumulating bytes
    buffer: Vec<u8>,

    /// Maximum allowed message size (anti-OOM protection)
    max_size: usize,

    /// Statistics: frames decoded
    frames_decoded: u64,

    /// Statistics: frames rejected (oversize or bad header)
    frames_rejected: u64,
}

/// Internal state for incremental reading.
#[derive(Debug, Clone, Copy)]
enum ReadState {
    /// Reading the 10-byte ASCII length header
    ReadingHeader { bytes_read: usize },

    /// Reading the message body
    ReadingBody {
        expected_len: usize,
        bytes_read: usize,
    },
}

impl Default for ReadState {
    fn default() -> Self {
        ReadState::ReadingHeader { bytes_read: 0 }
    }
}

impl FrameCodec {
    /// Create a new frame codec with the given max message size.
    pub fn new(max_size: usize) -> Self {
        Self {
            state: ReadState::default(),
            buffer: vec![0u8; FRAME_HEADER_SIZE],
            max_size,
            frames_decoded: 0,
            frames_rejected: 0,
        }
    }

    /// Create a codec with the default max size.
    pub fn with_default_max() -> Self {
        Self::new(DEFAULT_MAX_MESSAGE_SIZE)
    }

    /// Get maximum allowed message size.
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Get number of frames successfully decoded.
    pub fn frames_decoded(&self) -> u64 {
        self.frames_decoded
    }

    /// Get number of frames rejected.
    pub fn frames_rejected(&self) -> u64 {
        self.frames_rejected
    }

    /// Reset the codec state (e.g. after a connection reset).
    pub fn reset(&mut self) {
        self.state = ReadState::default();
        self.buffer.resize(FRAME_HEADER_SIZE, 0);
    }

    /// Encode a message into a framed buffer.
    ///
    /// Returns `[length: 10B ASCII, space-padded][payload]`. Fails if
    /// the decimal length does not fit in the header width - the header
    /// never truncates silently.
    pub fn encode(payload: &[u8]) -> io::Result<Vec<u8>> {
        let mut frame = Vec::with_capacity(FRAME_HEADER_SIZE + payload.len());
        Self::encode_into(payload, &mut frame)?;
        Ok(frame)
    }

    /// Encode a message, appending the framed bytes to an existing buffer.
    pub fn encode_into(payload: &[u8], buf: &mut Vec<u8>) -> io::Result<()> {
        let digits = payload.len().to_string();
        if digits.len() > FRAME_HEADER_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "payload length {} does not fit in {}-byte header",
                    payload.len(),
                    FRAME_HEADER_SIZE
                ),
            ));
        }

        buf.extend_from_slice(digits.as_bytes());
        buf.resize(buf.len() + FRAME_HEADER_SIZE - digits.len(), b' ');
        buf.extend_from_slice(payload);
        Ok(())
    }

    /// Try to decode a complete message from the reader.
    ///
    /// Returns:
    /// - `Ok(Some(data))` - A complete message was decoded
    /// - `Ok(None)` - Need more data (WouldBlock)
    /// - `Err(e)` - I/O error or protocol error
    ///
    /// Designed for non-blocking I/O: call repeatedly when the socket
    /// becomes readable until it returns `Ok(None)`.
    pub fn decode<R: Read + ?Sized>(&mut self, reader: &mut R) -> io::Result<Option<Vec<u8>>> {
        loop {
            match self.state {
                ReadState::ReadingHeader { bytes_read } => {
                    match reader.read(&mut self.buffer[bytes_read..FRAME_HEADER_SIZE]) {
                        Ok(0) => {
                            if bytes_read == 0 {
                                // Clean EOF at message boundary
                                return Err(io::Error::new(
                                    io::ErrorKind::UnexpectedEof,
                                    "connection closed",
                                ));
                            } else {
                                return Err(io::Error::new(
                                    io::ErrorKind::UnexpectedEof,
                                    "incomplete frame header",
                                ));
                            }
                        }
                        Ok(n) => {
                            let total = bytes_read + n;
                            if total < FRAME_HEADER_SIZE {
                                self.state = ReadState::ReadingHeader { bytes_read: total };
                                continue;
                            }

                            // Header complete - parse the ASCII length
                            let len = match parse_length_header(&self.buffer[..FRAME_HEADER_SIZE]) {
                                Some(len) => len,
                                None => {
                                    self.frames_rejected += 1;
                                    self.state = ReadState::default();
                                    return Err(io::Error::new(
                                        io::ErrorKind::InvalidData,
                                        "invalid frame header",
                                    ));
                                }
                            };

                            if len > self.max_size {
                                self.frames_rejected += 1;
                                self.state = ReadState::default();
                                return Err(io::Error::new(
                                    io::ErrorKind::InvalidData,
                                    format!("frame too large: {} bytes (max {})", len, self.max_size),
                                ));
                            }

                            if len == 0 {
                                // Empty message - valid but unusual
                                self.frames_decoded += 1;
                                self.state = ReadState::default();
                                return Ok(Some(Vec::new()));
                            }

                            self.buffer.resize(len, 0);
                            self.state = ReadState::ReadingBody {
                                expected_len: len,
                                bytes_read: 0,
                            };
                        }
                        Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                            self.state = ReadState::ReadingHeader { bytes_read };
                            return Ok(None);
                        }
                        Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                            continue;
                        }
                        Err(e) => return Err(e),
                    }
                }

                ReadState::ReadingBody {
                    expected_len,
                    bytes_read,
                } => {
                    match reader.read(&mut self.buffer[bytes_read..expected_len]) {
                        Ok(0) => {
                            return Err(io::Error::new(
                                io::ErrorKind::UnexpectedEof,
                                "incomplete frame body",
                            ));
                        }
                        Ok(n) => {
                            let total = bytes_read + n;
                            if total < expected_len {
                                self.state = ReadState::ReadingBody {
                                    expected_len,
                                    bytes_read: total,
                                };
                                continue;
                            }

                            let message = self.buffer[..expected_len].to_vec();
                            self.frames_decoded += 1;

                            // Reset for next message
                            self.buffer.resize(FRAME_HEADER_SIZE, 0);
                            self.state = ReadState::default();

                            return Ok(Some(message));
                        }
                        Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                            self.state = ReadState::ReadingBody {
                                expected_len,
                                bytes_read,
                            };
                            return Ok(None);
                        }
                        Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                            continue;
                        }
                        Err(e) => return Err(e),
                    }
                }
            }
        }
    }

    /// Check if the codec is in the middle of reading a message.
    pub fn is_partial(&self) -> bool {
        match self.state {
            ReadState::ReadingHeader { bytes_read } => bytes_read > 0,
            ReadState::ReadingBody { .. } => true,
        }
    }
}

/// Parse the fixed-width length header: ASCII digits, space-padded.
///
/// Returns `None` for anything that is not `<digits><spaces>` filling
/// the full header width.
fn parse_length_header(header: &[u8]) -> Option<usize> {
    let mut len: usize = 0;
    let mut digits = 0;

    for (i, &b) in header.iter().enumerate() {
        match b {
            b'0'..=b'9' => {
                // Padding must follow the digits, never precede them
                if digits != i {
                    return None;
                }
                len = len.checked_mul(10)?.checked_add((b - b'0') as usize)?;
                digits += 1;
            }
            b' ' => {}
            _ => return None,
        }
    }

    if digits == 0 {
        return None;
    }
    Some(len)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_encode_simple() {
        let frame = FrameCodec::encode(b"hello").unwrap();

        assert_eq!(frame.len(), 10 + 5);
        assert_eq!(&frame[..10], b"5         ");
        assert_eq!(&frame[10..], b"hello");
    }

    #[test]
    fn test_encode_empty() {
        let frame = FrameCodec::encode(b"").unwrap();
        assert_eq!(frame.len(), 10);
        assert_eq!(&frame[..], b"0         ");
    }

    #[test]
    fn test_encode_into_appends() {
        let mut buf = Vec::new();
        FrameCodec::encode_into(b"hello", &mut buf).unwrap();
        FrameCodec::encode_into(b"world!", &mut buf).unwrap();

        assert_eq!(buf.len(), (10 + 5) + (10 + 6));
        assert_eq!(&buf[..10], b"5         ");
        assert_eq!(&buf[15..25], b"6         ");
    }

    #[test]
    fn test_decode_simple() {
        let mut codec = FrameCodec::new(1024);
        let frame = FrameCodec::encode(b"hello, world!").unwrap();
        let mut cursor = Cursor::new(frame);

        let result = codec.decode(&mut cursor).unwrap();
        assert_eq!(result, Some(b"hello, world!".to_vec()));
        assert_eq!(codec.frames_decoded(), 1);
    }

    #[test]
    fn test_decode_multiple() {
        let mut codec = FrameCodec::new(1024);
        let mut buf = Vec::new();
        FrameCodec::encode_into(b"first", &mut buf).unwrap();
        FrameCodec::encode_into(b"second", &mut buf).unwrap();
        FrameCodec::encode_into(b"third", &mut buf).unwrap();

        let mut cursor = Cursor::new(buf);

        assert_eq!(codec.decode(&mut cursor).unwrap(), Some(b"first".to_vec()));
        assert_eq!(codec.decode(&mut cursor).unwrap(), Some(b"second".to_vec()));
        assert_eq!(codec.decode(&mut cursor).unwrap(), Some(b"third".to_vec()));
        assert_eq!(codec.frames_decoded(), 3);
    }

    #[test]
    fn test_decode_split_reads() {
        // A reader that yields one byte at a time still produces intact frames
        struct OneByte<'a>(&'a [u8], usize);
        impl Read for OneByte<'_> {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                if self.1 >= self.0.len() {
                    return Ok(0);
                }
                buf[0] = self.0[self.1];
                self.1 += 1;
                Ok(1)
            }
        }

        let frame = FrameCodec::encode(b"{\"type\":\"ping\"}").unwrap();
        let mut reader = OneByte(&frame, 0);
        let mut codec = FrameCodec::new(1024);

        let result = codec.decode(&mut reader).unwrap();
        assert_eq!(result, Some(b"{\"type\":\"ping\"}".to_vec()));
    }

    #[test]
    fn test_decode_resumes_after_would_block() {
        let frame = FrameCodec::encode(b"abcdef").unwrap();

        // First attempt sees only part of the header
        struct Partial<'a>(&'a [u8], usize, usize);
        impl Read for Partial<'_> {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                if self.1 >= self.2 {
                    return Err(io::Error::new(io::ErrorKind::WouldBlock, "no data"));
                }
                let n = (self.2 - self.1).min(buf.len());
                buf[..n].copy_from_slice(&self.0[self.1..self.1 + n]);
                self.1 += n;
                Ok(n)
            }
        }

        let mut codec = FrameCodec::new(1024);

        let mut reader = Partial(&frame, 0, 4);
        assert_eq!(codec.decode(&mut reader).unwrap(), None);
        assert!(codec.is_partial());

        // Rest of the bytes arrive
        let offset = reader.1;
        let mut reader = Partial(&frame, offset, frame.len());
        let result = codec.decode(&mut reader).unwrap();
        assert_eq!(result, Some(b"abcdef".to_vec()));
        assert!(!codec.is_partial());
    }

    #[test]
    fn test_decode_invalid_header() {
        let mut codec = FrameCodec::new(1024);
        let mut cursor = Cursor::new(b"garbage###hello".to_vec());

        let result = codec.decode(&mut cursor);
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::InvalidData);
        assert_eq!(codec.frames_rejected(), 1);

        // Codec is reset, not stuck mid-frame
        assert!(!codec.is_partial());
    }

    #[test]
    fn test_decode_too_large() {
        let mut codec = FrameCodec::new(10);
        let frame = FrameCodec::encode(b"this message exceeds the limit").unwrap();
        let mut cursor = Cursor::new(frame);

        let result = codec.decode(&mut cursor);
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::InvalidData);
        assert_eq!(codec.frames_rejected(), 1);
    }

    #[test]
    fn test_decode_eof_mid_body() {
        let mut codec = FrameCodec::new(1024);
        let frame = FrameCodec::encode(b"hello, world!").unwrap();

        // Header plus a truncated body
        let mut cursor = Cursor::new(frame[..14].to_vec());
        let result = codec.decode(&mut cursor);
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_parse_length_header() {
        assert_eq!(parse_length_header(b"42        "), Some(42));
        assert_eq!(parse_length_header(b"0         "), Some(0));
        assert_eq!(parse_length_header(b"1234567890"), Some(1234567890));

        // Padding before digits is not the device's format
        assert_eq!(parse_length_header(b"        42"), None);
        assert_eq!(parse_length_header(b"4 2       "), None);
        assert_eq!(parse_length_header(b"          "), None);
        assert_eq!(parse_length_header(b"12a       "), None);
        assert_eq!(parse_length_header(b"-5        "), None);
    }

    #[test]
    fn test_encode_pads_header_to_full_width() {
        let frame = FrameCodec::encode(&vec![0u8; 4096]).unwrap();
        assert_eq!(&frame[..10], b"4096      ");

        let frame = FrameCodec::encode(&vec![0u8; 1_000_000]).unwrap();
        assert_eq!(&frame[..10], b"1000000   ");
    }

    #[test]
    fn test_roundtrip_various_sizes() {
        for &size in &[1usize, 9, 10, 11, 99, 100, 1000, 65535] {
            let mut codec = FrameCodec::new(1024 * 1024);
            let payload: Vec<u8> = (0..size).map(|i| (i % 256) as u8).collect();
            let frame = FrameCodec::encode(&payload).unwrap();
            let mut cursor = Cursor::new(frame);

            let result = codec.decode(&mut cursor).unwrap().unwrap();
            assert_eq!(result, payload, "content mismatch for size {}", size);
        }
    }

    #[test]
    fn test_codec_reset() {
        let mut codec = FrameCodec::new(1024);
        let frame = FrameCodec::encode(b"hello").unwrap();

        let mut cursor = Cursor::new(frame[..12].to_vec());
        let _ = codec.decode(&mut cursor);

        codec.reset();
        assert!(!codec.is_partial());
    }
}
