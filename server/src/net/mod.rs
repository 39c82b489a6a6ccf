//! The single-threaded, readiness-driven connection engine.
//!
//! Grounded on the reference server's `main` event loop in
//! `examples/original_source/Redis/server.c`: one `poll(2)` call per
//! iteration over the listening socket plus every live peer, with accept,
//! read and write handled inline rather than handed off to worker threads
//! or an async runtime. `std::net`'s non-blocking sockets already surface
//! `WouldBlock` the way the reference code checks `errno == EAGAIN`, so the
//! only FFI needed here is the `poll(2)` call itself -- `std` has no
//! readiness multiplexer of its own.

pub mod connection;

use std::net::{TcpListener, TcpStream};
use std::os::unix::io::{AsRawFd, RawFd};

use log::{debug, info, warn};

use crate::config::ServerConfig;
use crate::error::{Error, SkyResult};
use crate::keyspace::Keyspace;
use connection::Connection;

/// Dense peer table size; also the hard cap on simultaneous connections.
pub const MAX_CONNS: usize = 1024;

const POLLIN: libc::c_short = libc::POLLIN;
const POLLOUT: libc::c_short = libc::POLLOUT;

pub struct Engine {
    listener: TcpListener,
    max_conns: usize,
    conns: Vec<Option<Connection>>,
    live: usize,
    keyspace: Keyspace,
}

impl Engine {
    /// The address actually bound, useful when `cfg.port == 0` asked the OS
    /// to pick an ephemeral port (as tests do).
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    pub fn bind(cfg: &ServerConfig) -> SkyResult<Self> {
        let listener = TcpListener::bind((cfg.host.as_str(), cfg.port)).map_err(Error::Bind)?;
        listener.set_nonblocking(true).map_err(Error::Bind)?;
        info!("listening on {}:{}", cfg.host, cfg.port);
        Ok(Self {
            listener,
            max_conns: cfg.max_conns,
            conns: Vec::new(),
            live: 0,
            keyspace: Keyspace::new(),
        })
    }

    pub fn run(&mut self) -> SkyResult<()> {
        let mut pollfds: Vec<libc::pollfd> = Vec::new();
        loop {
            self.build_pollfds(&mut pollfds);
            let n = unsafe {
                libc::poll(
                    pollfds.as_mut_ptr(),
                    pollfds.len() as libc::nfds_t,
                    -1,
                )
            };
            if n < 0 {
                let err = std::io::Error::last_os_error();
                if err.kind() == std::io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(Error::Io(err));
            }

            // index 0 is always the listening socket
            if pollfds[0].revents & POLLIN != 0 {
                self.accept_loop();
            }

            for pfd in pollfds.iter().skip(1) {
                if pfd.revents == 0 {
                    continue;
                }
                self.service_fd(pfd.fd as RawFd, pfd.revents);
            }

            self.reap_closed();
        }
    }

    fn build_pollfds(&self, pollfds: &mut Vec<libc::pollfd>) {
        pollfds.clear();
        pollfds.push(libc::pollfd {
            fd: self.listener.as_raw_fd(),
            events: POLLIN,
            revents: 0,
        });
        for conn in self.conns.iter().flatten() {
            let mut events = 0;
            if conn.want_read {
                events |= POLLIN;
            }
            if conn.want_write {
                events |= POLLOUT;
            }
            pollfds.push(libc::pollfd {
                fd: conn.fd(),
                events,
                revents: 0,
            });
        }
    }

    fn accept_loop(&mut self) {
        loop {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    if self.live >= self.max_conns {
                        debug!("rejecting {addr}: at max-conns ({})", self.max_conns);
                        continue;
                    }
                    if let Err(e) = self.register(stream) {
                        warn!("failed to register new connection from {addr}: {e}");
                        continue;
                    }
                    debug!("accepted connection from {addr}");
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!("accept() failed: {e}");
                    break;
                }
            }
        }
    }

    fn register(&mut self, stream: TcpStream) -> SkyResult<()> {
        let conn = Connection::new(stream)?;
        let fd = conn.fd() as usize;
        if fd >= self.conns.len() {
            self.conns.resize_with(fd + 1, || None);
        }
        self.conns[fd] = Some(conn);
        self.live += 1;
        Ok(())
    }

    fn service_fd(&mut self, fd: RawFd, revents: libc::c_short) {
        let idx = fd as usize;
        let Some(conn) = self.conns.get_mut(idx).and_then(|c| c.as_mut()) else {
            return;
        };
        if revents & (libc::POLLHUP | libc::POLLERR) != 0 {
            conn.want_close = true;
            return;
        }
        if revents & POLLIN != 0 {
            conn.handle_readable(&mut self.keyspace);
        }
        if !conn.want_close && revents & POLLOUT != 0 {
            conn.handle_writable();
        }
    }

    fn reap_closed(&mut self) {
        for slot in self.conns.iter_mut() {
            let should_drop = matches!(slot, Some(c) if c.want_close);
            if should_drop {
                *slot = None;
                self.live -= 1;
            }
        }
    }
}
