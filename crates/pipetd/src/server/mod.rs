// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 pipetd contributors

//! TCP session manager and command dispatch loop.
//!
//! The server owns a fixed table of session slots and drives everything
//! from a single thread: one `mio::Poll` instance watches the listener
//! and every live connection, and each tick services the listener once
//! and then every slot once, in slot-index order. No session can starve
//! another for longer than one tick, and the actuator trait never sees
//! overlapping calls.
//!
//! ```text
//!          +-----------------------------------------------+
//!          |                  RobotServer                  |
//!          |                                               |
//!  tick -> |  poll --> accept phase --> slot 0..N sweep    |
//!          |             (first fit)    decode / dispatch  |
//!          |                            flush / keep-alive |
//!          +-----------------------+-----------------------+
//!                                  |
//!                             dyn Robot
//! ```

pub mod session;

use std::io::{self, Write};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use mio::net::{TcpListener, TcpStream};
use mio::{Events, Interest, Poll, Token};

use crate::config::ServerConfig;
use crate::motion::Bounds;
use crate::protocol::{Command, FrameCodec, Response, ResponseStatus};
use crate::robot::Robot;

use session::Session;

/// Poll token for the listening socket. Slot `i` maps to `Token(i + 1)`.
const LISTENER: Token = Token(0);

const EVENT_CAPACITY: usize = 128;

// ============================================================================
// Errors
// ============================================================================

/// Server lifecycle errors.
#[derive(Debug)]
pub enum ServerError {
    /// Rejected configuration
    Config(String),
    /// Failed to bind the listening socket
    Bind(String),
    /// Poll or socket failure that stops the loop
    Io(String),
}

impl std::fmt::Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(s) => write!(f, "Configuration error: {}", s),
            Self::Bind(s) => write!(f, "Bind error: {}", s),
            Self::Io(s) => write!(f, "I/O error: {}", s),
        }
    }
}

impl std::error::Error for ServerError {}

// ============================================================================
// Shutdown handle
// ============================================================================

/// Clonable handle that stops a running server from another thread
/// (signal handlers, tests).
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    running: Arc<AtomicBool>,
}

impl ShutdownHandle {
    /// Request the run loop to exit at the end of its current tick.
    pub fn shutdown(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }
}

// ============================================================================
// Server
// ============================================================================

/// The motion-control endpoint: listener, slot table, and dispatcher.
pub struct RobotServer {
    config: ServerConfig,
    robot: Box<dyn Robot + Send>,
    poll: Poll,
    events: Events,
    listener: TcpListener,
    local_addr: SocketAddr,
    /// Fixed-size session table; `None` is a free slot
    slots: Vec<Option<Session>>,
    /// Active safety envelope (starts from config, adjustable at runtime)
    bounds: Bounds,
    running: Arc<AtomicBool>,
}

impl std::fmt::Debug for RobotServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RobotServer")
            .field("local_addr", &self.local_addr)
            .finish_non_exhaustive()
    }
}

impl RobotServer {
    /// Validate the configuration and bind the listening socket.
    ///
    /// The socket is bound here, not in [`run`](Self::run), so callers
    /// can read [`local_addr`](Self::local_addr) before the loop starts
    /// (port 0 in the config picks an ephemeral port).
    pub fn new(config: ServerConfig, robot: Box<dyn Robot + Send>) -> Result<Self, ServerError> {
        config
            .validate()
            .map_err(|e| ServerError::Config(e.to_string()))?;

        let addr = SocketAddr::new(config.bind_address, config.port);
        let mut listener =
            TcpListener::bind(addr).map_err(|e| ServerError::Bind(format!("{}: {}", addr, e)))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| ServerError::Io(e.to_string()))?;

        let poll = Poll::new().map_err(|e| ServerError::Io(e.to_string()))?;
        poll.registry()
            .register(&mut listener, LISTENER, Interest::READABLE)
            .map_err(|e| ServerError::Io(e.to_string()))?;

        let slots = (0..config.max_clients).map(|_| None).collect();
        let bounds = config.bounds;

        Ok(Self {
            config,
            robot,
            poll,
            events: Events::with_capacity(EVENT_CAPACITY),
            listener,
            local_addr,
            slots,
            bounds,
            running: Arc::new(AtomicBool::new(true)),
        })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Handle for stopping the loop from another thread.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            running: Arc::clone(&self.running),
        }
    }

    /// Number of occupied session slots.
    pub fn active_sessions(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    /// Replace the safety envelope. Takes effect for the next move;
    /// commands already dispatched are unaffected.
    pub fn set_bounds(&mut self, bounds: Bounds) -> Result<(), ServerError> {
        bounds.validate().map_err(ServerError::Config)?;
        log::info!("[SERVER] safety bounds updated: {:?}", bounds);
        self.bounds = bounds;
        Ok(())
    }

    /// Drive the server until the shutdown handle fires.
    ///
    /// Runs on the calling thread. Each tick blocks in `poll` for at
    /// most the configured poll interval, so shutdown and keep-alive
    /// expiry are observed even when no traffic arrives.
    pub fn run(&mut self) -> Result<(), ServerError> {
        log::info!(
            "[SERVER] listening on {} ({} slots, keep-alive {}s)",
            self.local_addr,
            self.slots.len(),
            self.config.keep_alive_secs
        );

        while self.running.load(Ordering::Relaxed) {
            self.tick()?;
        }

        for index in 0..self.slots.len() {
            self.close_slot(index, "server shutdown");
        }
        log::info!("[SERVER] stopped");
        Ok(())
    }

    /// One scheduler tick: poll, accept phase, then the slot sweep.
    fn tick(&mut self) -> Result<(), ServerError> {
        if let Err(e) = self
            .poll
            .poll(&mut self.events, Some(self.config.poll_interval()))
        {
            if e.kind() == io::ErrorKind::Interrupted {
                return Ok(());
            }
            return Err(ServerError::Io(e.to_string()));
        }

        let mut listener_ready = false;
        for event in self.events.iter() {
            match event.token() {
                LISTENER => listener_ready = true,
                Token(n) => {
                    // Stale events for a freed slot are dropped here
                    if let Some(Some(session)) = self.slots.get_mut(n - 1) {
                        session.mark_ready(event.is_readable(), event.is_writable());
                    }
                }
            }
        }

        if listener_ready {
            self.accept_pending();
        }
        self.service_slots();
        Ok(())
    }

    /// Drain the listener backlog, placing each connection first-fit.
    fn accept_pending(&mut self) {
        loop {
            match self.listener.accept() {
                Ok((stream, peer)) => self.place_client(stream, peer),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    log::error!("[SERVER] accept failed: {}", e);
                    break;
                }
            }
        }
    }

    /// Seat a new connection in the lowest free slot, or refuse it.
    fn place_client(&mut self, mut stream: TcpStream, peer: SocketAddr) {
        let free = self.slots.iter().position(Option::is_none);
        match free {
            Some(index) => {
                // Command/response traffic is small and latency-bound
                let _ = stream.set_nodelay(true);
                if let Err(e) = self.poll.registry().register(
                    &mut stream,
                    Token(index + 1),
                    Interest::READABLE | Interest::WRITABLE,
                ) {
                    log::error!("[SERVER] failed to register client {}: {}", peer, e);
                    return;
                }

                let mut session = Session::new(stream, peer, self.config.max_message_size);
                let greeting = Response::success(format!("Connection established: slot {}", index));
                if session.queue_frame(&greeting.to_bytes()).is_ok() {
                    let _ = session.try_flush();
                }

                log::info!("[SERVER] client connected from {} (slot {})", peer, index);
                self.slots[index] = Some(session);
            }
            None => {
                // Table full: tell the client why before closing, so it
                // can distinguish refusal from a crash
                log::warn!(
                    "[SERVER] refusing connection from {}: all {} slots in use",
                    peer,
                    self.slots.len()
                );
                let refusal = Response {
                    status: ResponseStatus::Error,
                    message: "Max clients reached. Connection refused.".to_string(),
                };
                if let Ok(frame) = FrameCodec::encode(&refusal.to_bytes()) {
                    let _ = stream.write(&frame);
                }
                let _ = stream.shutdown(std::net::Shutdown::Both);
            }
        }
    }

    /// Service every occupied slot once, in index order.
    fn service_slots(&mut self) {
        let keep_alive = self.config.keep_alive();

        for index in 0..self.slots.len() {
            let mut close_reason: Option<String> = None;

            if let Some(session) = self.slots[index].as_mut() {
                if session.take_writable() && session.has_pending_writes() {
                    if let Err(e) = session.try_flush() {
                        close_reason = Some(format!("write failed: {}", e));
                    }
                }

                if close_reason.is_none() && session.take_readable() {
                    loop {
                        match session.read_frame() {
                            Ok(Some(payload)) => {
                                let response = match Command::parse(&payload) {
                                    Ok(Command::Ping) => {
                                        // Liveness refresh happens only here
                                        session.touch();
                                        Response::success("pong")
                                    }
                                    Ok(command) => {
                                        match execute(self.robot.as_mut(), &self.bounds, command) {
                                            Ok(message) => Response::success(message),
                                            Err(e) => {
                                                log::warn!(
                                                    "[SERVER] slot {}: command rejected: {}",
                                                    index,
                                                    e
                                                );
                                                Response::error(&e)
                                            }
                                        }
                                    }
                                    Err(e) => {
                                        log::warn!(
                                            "[SERVER] slot {}: unparsable command: {}",
                                            index,
                                            e
                                        );
                                        Response::error(&e)
                                    }
                                };

                                if session.queue_frame(&response.to_bytes()).is_err() {
                                    close_reason = Some("response framing failed".to_string());
                                    break;
                                }
                                if let Err(e) = session.try_flush() {
                                    close_reason = Some(format!("write failed: {}", e));
                                    break;
                                }
                            }
                            Ok(None) => break,
                            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                                // Bad frame header or oversize payload:
                                // the codec has reset, the session stays
                                log::warn!("[SERVER] slot {}: {}", index, e);
                                let response = Response {
                                    status: ResponseStatus::Error,
                                    message: format!("invalid frame: {}", e),
                                };
                                if session.queue_frame(&response.to_bytes()).is_err()
                                    || session.try_flush().is_err()
                                {
                                    close_reason = Some("write failed".to_string());
                                    break;
                                }
                            }
                            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                                close_reason = Some("closed by peer".to_string());
                                break;
                            }
                            Err(e) => {
                                close_reason = Some(format!("read error: {}", e));
                                break;
                            }
                        }
                    }
                }

                if close_reason.is_none() && session.is_expired(keep_alive) {
                    close_reason = Some(format!(
                        "keep-alive timeout ({}s without ping)",
                        keep_alive.as_secs()
                    ));
                }
            }

            if let Some(reason) = close_reason {
                self.close_slot(index, &reason);
            }
        }
    }

    /// Return a slot to empty; logs exactly once per session.
    fn close_slot(&mut self, index: usize, reason: &str) {
        if let Some(mut session) = self.slots[index].take() {
            let _ = self.poll.registry().deregister(session.stream_mut());
            log::info!(
                "[SERVER] session closed (slot {}, peer {}): {}",
                index,
                session.peer_addr(),
                reason
            );
        }
    }
}

// ============================================================================
// Dispatch
// ============================================================================

/// Execute a validated command against the actuator.
///
/// The safety gate lives here: a move's target is resolved to absolute
/// coordinates first, checked against the envelope, and only then
/// handed to the robot. A rejected move leaves the actuator untouched.
fn execute(
    robot: &mut dyn Robot,
    bounds: &Bounds,
    command: Command,
) -> Result<String, crate::protocol::CommandError> {
    use crate::protocol::CommandError;

    match command {
        Command::Move { system, a, b, z } => {
            let target = system.resolve(a, b, z, robot.current_position());
            if !bounds.is_safe(&target) {
                return Err(CommandError::OutOfBounds(target));
            }
            robot.move_to(target);
            Ok(format!("Moved to position {}", target))
        }
        Command::PipetControl { level } => {
            robot.set_pipet_level(level);
            Ok(format!("Pipet level set to {}", level))
        }
        Command::Ping => Ok("pong".to_string()),
        Command::PositionRequest => {
            Ok(format!("Current position: {}", robot.current_position()))
        }
        Command::Home => {
            robot.home();
            Ok(format!("Homed. Current position: {}", robot.current_position()))
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
