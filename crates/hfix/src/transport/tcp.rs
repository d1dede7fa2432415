// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Readiness-based TCP transport (portable baseline).
//!
//! Non-blocking sockets tuned through socket2 and polled through mio.
//! Nagle is disabled by default: FIX messages are small and latency beats
//! batching on the session path.

use std::io::{self, Read, Write};
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use mio::net::{TcpListener as MioListener, TcpStream as MioStream};
use mio::{Events, Interest, Poll, Token};
use socket2::{Domain, Protocol, Socket, Type};

use crate::error::{Error, Result};

use super::{RecvOutcome, Transport};

const STREAM_TOKEN: Token = Token(0);

/// TCP transport tuning.
#[derive(Debug, Clone)]
pub struct TcpConfig {
    /// Disable Nagle's algorithm.
    pub nodelay: bool,
    /// Connect timeout.
    pub connect_timeout: Duration,
    /// SO_RCVBUF, when set.
    pub recv_buffer: Option<usize>,
    /// SO_SNDBUF, when set.
    pub send_buffer: Option<usize>,
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self {
            nodelay: true,
            connect_timeout: Duration::from_secs(5),
            recv_buffer: None,
            send_buffer: None,
        }
    }
}

/// Non-blocking TCP stream with a private poll instance.
pub struct TcpTransport {
    stream: MioStream,
    poll: Poll,
    events: Events,
    open: bool,
}

impl TcpTransport {
    /// Connect to `addr`, honoring the configured timeout.
    pub fn connect(addr: SocketAddr, config: &TcpConfig) -> Result<Self> {
        let domain = Domain::for_address(addr);
        let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;
        socket.set_nonblocking(true)?;
        socket.set_nodelay(config.nodelay)?;
        if let Some(bytes) = config.recv_buffer {
            socket.set_recv_buffer_size(bytes)?;
        }
        if let Some(bytes) = config.send_buffer {
            socket.set_send_buffer_size(bytes)?;
        }

        // Non-blocking connect: in-progress is the expected path.
        match socket.connect(&addr.into()) {
            Ok(()) => {}
            Err(err) if err.raw_os_error() == Some(libc::EINPROGRESS) => {}
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => {}
            Err(err) => return Err(err.into()),
        }

        let mut stream = MioStream::from_std(socket.into());
        let poll = Poll::new()?;
        poll.registry().register(
            &mut stream,
            STREAM_TOKEN,
            Interest::READABLE.add(Interest::WRITABLE),
        )?;

        let mut transport = Self {
            stream,
            poll,
            events: Events::with_capacity(8),
            open: true,
        };
        transport.finish_connect(config.connect_timeout)?;
        log::debug!("[TcpTransport] connected to {addr}");
        Ok(transport)
    }

    /// Wrap an accepted stream.
    fn from_accepted(mut stream: MioStream, config: &TcpConfig) -> Result<Self> {
        if config.nodelay {
            stream.set_nodelay(true)?;
        }
        let poll = Poll::new()?;
        poll.registry().register(
            &mut stream,
            STREAM_TOKEN,
            Interest::READABLE.add(Interest::WRITABLE),
        )?;
        Ok(Self {
            stream,
            poll,
            events: Events::with_capacity(8),
            open: true,
        })
    }

    /// Wait for writability, then surface any connect error.
    fn finish_connect(&mut self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                self.open = false;
                return Err(Error::Timeout);
            }
            self.poll.poll(&mut self.events, Some(remaining))?;
            for event in self.events.iter() {
                if event.token() == STREAM_TOKEN && event.is_writable() {
                    if let Some(err) = self.stream.take_error()? {
                        self.open = false;
                        return Err(err.into());
                    }
                    // peer_addr failing with NotConnected means the
                    // handshake is still in flight.
                    match self.stream.peer_addr() {
                        Ok(_) => return Ok(()),
                        Err(err) if err.kind() == io::ErrorKind::NotConnected => {}
                        Err(err) => {
                            self.open = false;
                            return Err(err.into());
                        }
                    }
                }
            }
        }
    }

    /// Peer address, when connected.
    pub fn peer_addr(&self) -> Result<SocketAddr> {
        Ok(self.stream.peer_addr()?)
    }
}

impl Transport for TcpTransport {
    fn send(&mut self, bytes: &[u8]) -> Result<usize> {
        if !self.open {
            return Err(Error::EndOfStream);
        }
        match self.stream.write(bytes) {
            Ok(n) => Ok(n),
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => Err(Error::WouldBlock),
            Err(err) if err.kind() == io::ErrorKind::Interrupted => Err(Error::WouldBlock),
            Err(err) => {
                self.open = false;
                Err(err.into())
            }
        }
    }

    fn recv(&mut self, buf: &mut [u8]) -> Result<RecvOutcome> {
        if !self.open {
            return Err(Error::EndOfStream);
        }
        match self.stream.read(buf) {
            Ok(0) => {
                self.open = false;
                Ok(RecvOutcome::Closed)
            }
            Ok(n) => Ok(RecvOutcome::Data(n)),
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => Ok(RecvOutcome::WouldBlock),
            Err(err) if err.kind() == io::ErrorKind::Interrupted => Ok(RecvOutcome::WouldBlock),
            Err(err) => {
                self.open = false;
                Err(err.into())
            }
        }
    }

    fn wait_readable(&mut self, timeout_ms: u64) -> Result<bool> {
        if !self.open {
            return Err(Error::EndOfStream);
        }
        self.poll
            .poll(&mut self.events, Some(Duration::from_millis(timeout_ms)))?;
        for event in self.events.iter() {
            if event.token() == STREAM_TOKEN && (event.is_readable() || event.is_read_closed()) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn close(&mut self) -> Result<()> {
        if self.open {
            self.open = false;
            let _ = self.stream.shutdown(std::net::Shutdown::Both);
            log::debug!("[TcpTransport] closed");
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

/// Accepting side of the transport.
pub struct TcpListener {
    listener: MioListener,
    poll: Poll,
    events: Events,
}

impl TcpListener {
    /// Bind a listener on `addr`.
    pub fn bind(addr: SocketAddr) -> Result<Self> {
        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
        socket.set_reuse_address(true)?;
        socket.set_nonblocking(true)?;
        socket.bind(&addr.into())?;
        socket.listen(128)?;

        let mut listener = MioListener::from_std(socket.into());
        let poll = Poll::new()?;
        poll.registry()
            .register(&mut listener, STREAM_TOKEN, Interest::READABLE)?;
        Ok(Self {
            listener,
            poll,
            events: Events::with_capacity(8),
        })
    }

    /// Bound local address.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept one connection, waiting up to `timeout`.
    pub fn accept(&mut self, timeout: Duration, config: &TcpConfig) -> Result<TcpTransport> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    log::debug!("[TcpListener] accepted {peer}");
                    return TcpTransport::from_accepted(stream, config);
                }
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return Err(Error::Timeout);
                    }
                    self.poll.poll(&mut self.events, Some(remaining))?;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}
