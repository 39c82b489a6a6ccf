//! Per-peer connection state.
//!
//! Grounded on the reference server's `Conn` struct and its
//! `conn_handle_read`/`conn_handle_write` pair: each connection owns a raw,
//! growable input and output byte buffer instead of a ring buffer, because
//! Rust's `Vec<u8>` already gives us amortized growth without the manual
//! bookkeeping the C version needs.

use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::os::unix::io::{AsRawFd, RawFd};

use log::trace;

use crate::dispatch;
use crate::keyspace::Keyspace;
use crate::wire::{self, ParseOutcome};

/// Read once per readiness notification; matches the reference server's
/// single `read(2)` per `EPOLLIN`/`POLLIN` event.
const READ_CHUNK: usize = 64 * 1024;

pub struct Connection {
    stream: TcpStream,
    fd: RawFd,
    incoming: Vec<u8>,
    outgoing: Vec<u8>,
    outgoing_sent: usize,
    pub want_read: bool,
    pub want_write: bool,
    pub want_close: bool,
}

impl Connection {
    pub fn new(stream: TcpStream) -> io::Result<Self> {
        stream.set_nonblocking(true)?;
        let fd = stream.as_raw_fd();
        Ok(Self {
            stream,
            fd,
            incoming: Vec::new(),
            outgoing: Vec::new(),
            outgoing_sent: 0,
            want_read: true,
            want_write: false,
            want_close: false,
        })
    }

    pub fn fd(&self) -> RawFd {
        self.fd
    }

    /// Drain the socket into `incoming`, then process as many whole
    /// requests as are buffered.
    pub fn handle_readable(&mut self, keyspace: &mut Keyspace) {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            match self.stream.read(&mut chunk) {
                Ok(0) => {
                    self.want_close = true;
                    break;
                }
                Ok(n) => {
                    self.incoming.extend_from_slice(&chunk[..n]);
                    if n < chunk.len() {
                        break;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    trace!("read error on fd {}: {e}", self.fd);
                    self.want_close = true;
                    break;
                }
            }
        }
        self.drain_requests(keyspace);
    }

    fn drain_requests(&mut self, keyspace: &mut Keyspace) {
        loop {
            match wire::try_parse_request(&self.incoming) {
                ParseOutcome::Incomplete => break,
                ParseOutcome::Invalid(consumed) => {
                    self.incoming.drain(..consumed);
                    self.want_close = true;
                    break;
                }
                ParseOutcome::Request(req, consumed) => {
                    self.incoming.drain(..consumed);
                    let response = dispatch::dispatch(keyspace, &req);
                    wire::encode_response(&response, &mut self.outgoing);
                }
            }
        }
        self.update_interest();
    }

    /// Reads pause while there is unflushed output: `want_read` and
    /// `want_write` are kept complementary so a slow peer's reader doesn't
    /// keep piling more responses onto an outgoing buffer the kernel hasn't
    /// drained yet.
    fn update_interest(&mut self) {
        let pending_write = self.outgoing_sent < self.outgoing.len();
        self.want_write = pending_write;
        self.want_read = !pending_write;
    }

    /// Flush as much of `outgoing` as the socket will currently accept.
    pub fn handle_writable(&mut self) {
        while self.outgoing_sent < self.outgoing.len() {
            match self.stream.write(&self.outgoing[self.outgoing_sent..]) {
                Ok(0) => {
                    self.want_close = true;
                    return;
                }
                Ok(n) => self.outgoing_sent += n,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    trace!("write error on fd {}: {e}", self.fd);
                    self.want_close = true;
                    return;
                }
            }
        }
        if self.outgoing_sent == self.outgoing.len() {
            self.outgoing.clear();
            self.outgoing_sent = 0;
        }
        self.update_interest();
    }
}
