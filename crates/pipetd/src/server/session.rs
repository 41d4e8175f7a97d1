// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 pipetd contributors

//! Per-slot session state.
//!
//! A session owns its connection exclusively: the `TcpStream`, the
//! codec's partial-read state, and the partially-flushed write queue
//! all live and die with the slot. Returning a slot to empty drops the
//! stream and closes the socket.

use std::io::{self, Write};
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use mio::net::TcpStream;

use crate::protocol::FrameCodec;

/// One active client session, owned by a slot in the session table.
#[derive(Debug)]
pub struct Session {
    /// Connection handle (exclusively owned)
    stream: TcpStream,

    /// Remote address
    peer_addr: SocketAddr,

    /// Frame codec with partial-read state
    codec: FrameCodec,

    /// Outbound bytes not yet written (framed)
    send_queue: Vec<u8>,

    /// Offset into `send_queue` for partial writes
    send_offset: usize,

    /// Last liveness refresh (connect or ping)
    last_activity: Instant,

    /// Readiness flags from the current tick's poll events
    readable: bool,
    writable: bool,
}

impl Session {
    /// Create a session for a freshly accepted connection.
    pub fn new(stream: TcpStream, peer_addr: SocketAddr, max_message_size: usize) -> Self {
        Self {
            stream,
            peer_addr,
            codec: FrameCodec::new(max_message_size),
            send_queue: Vec::new(),
            send_offset: 0,
            last_activity: Instant::now(),
            readable: false,
            writable: false,
        }
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    pub fn stream_mut(&mut self) -> &mut TcpStream {
        &mut self.stream
    }

    /// Decode one complete frame, if available.
    pub fn read_frame(&mut self) -> io::Result<Option<Vec<u8>>> {
        self.codec.decode(&mut self.stream)
    }

    /// Refresh the liveness timestamp.
    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    /// Time since the last liveness refresh.
    pub fn idle_for(&self) -> Duration {
        self.last_activity.elapsed()
    }

    /// Whether the session has exceeded the keep-alive window.
    pub fn is_expired(&self, keep_alive: Duration) -> bool {
        self.idle_for() > keep_alive
    }

    /// Mark readiness from a poll event.
    pub fn mark_ready(&mut self, readable: bool, writable: bool) {
        self.readable |= readable;
        self.writable |= writable;
    }

    /// Consume the readable flag for this tick.
    pub fn take_readable(&mut self) -> bool {
        std::mem::take(&mut self.readable)
    }

    /// Consume the writable flag for this tick.
    pub fn take_writable(&mut self) -> bool {
        std::mem::take(&mut self.writable)
    }

    /// Frame a payload and append it to the write queue.
    pub fn queue_frame(&mut self, payload: &[u8]) -> io::Result<()> {
        FrameCodec::encode_into(payload, &mut self.send_queue)
    }

    /// Whether queued bytes are waiting to be flushed.
    pub fn has_pending_writes(&self) -> bool {
        self.send_offset < self.send_queue.len()
    }

    /// Write as much of the queue as the socket accepts.
    ///
    /// Returns `Ok(true)` once the queue is fully flushed, `Ok(false)`
    /// if the socket would block with bytes still pending.
    pub fn try_flush(&mut self) -> io::Result<bool> {
        while self.send_offset < self.send_queue.len() {
            match self.stream.write(&self.send_queue[self.send_offset..]) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "connection closed during write",
                    ));
                }
                Ok(n) => {
                    self.send_offset += n;
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    return Ok(false);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                    continue;
                }
                Err(e) => return Err(e),
            }
        }

        // Fully flushed - reclaim the buffer
        self.send_queue.clear();
        self.send_offset = 0;
        Ok(true)
    }
}
