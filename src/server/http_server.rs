//! HTTP server implementation.

use std::io::{self, ErrorKind};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, error, info, trace, warn};
use mio::net::{TcpListener, TcpStream};
use mio::{Events, Interest, Poll, Registry, Token, Waker};
use socket2::{Domain, Protocol, Socket, Type};

use crate::registry::ResponseRegistry;
use crate::server::config::ServerConfig;
use crate::server::connection::{self, Outcome};
use crate::server::error::{CloseReason, Error};
use crate::server::pool::SlotPool;
use crate::server::slot::SlotKey;

const LISTENER: Token = Token(usize::MAX);
const WAKER: Token = Token(usize::MAX - 1);

/// A single-threaded HTTP server driven by readiness events.
pub struct HttpServer {
    /// The server configuration.
    config: ServerConfig,
    poll: Poll,
    events: Events,
    listener: TcpListener,
    connections: Connections,
    shutdown: Arc<AtomicBool>,
    waker: Arc<Waker>,
}

/// Everything the event handlers mutate, kept apart from the poll and its events.
struct Connections {
    pool: SlotPool<TcpStream>,
    responses: ResponseRegistry,
}

/// Stops a running [`HttpServer`] from another thread.
#[derive(Clone)]
pub struct ShutdownHandle {
    shutdown: Arc<AtomicBool>,
    waker: Arc<Waker>,
}

impl ShutdownHandle {
    /// Ask the server to stop. `run` returns after the current batch of events.
    pub fn shutdown(&self) -> io::Result<()> {
        self.shutdown.store(true, Ordering::Release);
        self.waker.wake()
    }
}

impl HttpServer {
    /// Bind the listener and set up the poll.
    ///
    /// Nothing is accepted until [`HttpServer::run`] is called, but the socket is
    /// already listening, so connections queue up in the backlog.
    pub fn bind(config: ServerConfig, responses: ResponseRegistry) -> Result<Self, Error> {
        config.validate()?;

        let mut listener = Self::setup_listener(config.addr, config.backlog)?;
        let poll = Poll::new()?;
        poll.registry().register(&mut listener, LISTENER, Interest::READABLE)?;
        let waker = Arc::new(Waker::new(poll.registry(), WAKER)?);

        info!(
            "Server listening on http://{addr} with {count} responses",
            addr = listener.local_addr()?,
            count = responses.len()
        );

        Ok(Self {
            events: Events::with_capacity(config.max_events),
            connections: Connections {
                pool: SlotPool::new(config.max_connections, config.buffer_capacity),
                responses,
            },
            config,
            poll,
            listener,
            shutdown: Arc::new(AtomicBool::new(false)),
            waker,
        })
    }

    /// Create a non-blocking listener with `SO_REUSEADDR` and an explicit backlog.
    fn setup_listener(addr: SocketAddr, backlog: i32) -> io::Result<TcpListener> {
        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
        socket.set_reuse_address(true)?;
        socket.set_nonblocking(true)?;
        socket.bind(&addr.into())?;
        socket.listen(backlog)?;
        Ok(TcpListener::from_std(socket.into()))
    }

    /// The address the listener is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Number of connections currently holding a slot.
    pub fn active_connections(&self) -> usize {
        self.connections.pool.len()
    }

    /// A handle that stops [`HttpServer::run`].
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            shutdown: self.shutdown.clone(),
            waker: self.waker.clone(),
        }
    }

    /// Run the event loop until shut down.
    ///
    /// Only a failing poll ends the loop with an error. Connection-level problems
    /// close the affected connection and nothing else.
    pub fn run(&mut self) -> Result<(), Error> {
        while !self.shutdown.load(Ordering::Acquire) {
            if let Err(e) = self.poll.poll(&mut self.events, None) {
                if e.kind() == ErrorKind::Interrupted {
                    continue;
                }
                return Err(e.into());
            }

            for event in self.events.iter() {
                match event.token() {
                    LISTENER => self.connections.accept_all(&self.listener, self.poll.registry()),
                    WAKER => trace!("Woken up"),
                    token => self.connections.on_event(token, self.poll.registry()),
                }
            }
        }

        info!(
            "Shutting down server, closing {count} connections",
            count = self.connections.pool.len()
        );
        self.connections.close_all(self.poll.registry());
        info!("Server shutdown complete");
        Ok(())
    }
}

impl Connections {
    /// Accept until the listener would block.
    fn accept_all(&mut self, listener: &TcpListener, registry: &Registry) {
        loop {
            match listener.accept() {
                Ok((stream, peer)) => self.admit(stream, peer, registry),
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e)
                    if matches!(
                        e.kind(),
                        ErrorKind::Interrupted | ErrorKind::ConnectionAborted | ErrorKind::ConnectionReset
                    ) =>
                {
                    debug!("Transient accept error: {e}");
                }
                Err(e) => {
                    error!("Error accepting connection: {e}");
                    break;
                }
            }
        }
    }

    /// Give a freshly accepted connection a slot and register it, or close it.
    fn admit(&mut self, stream: TcpStream, peer: SocketAddr, registry: &Registry) {
        let key = match self.pool.allocate(stream) {
            Ok(key) => key,
            Err(stream) => {
                warn!(
                    "Connection limit of {max} reached, rejecting connection from {peer}",
                    max = self.pool.capacity()
                );
                drop(stream);
                return;
            }
        };

        let registered = match self.pool.get_mut(key).and_then(|slot| slot.stream_mut()) {
            Some(stream) => registry.register(stream, key.token(), Interest::READABLE | Interest::WRITABLE),
            None => return,
        };

        match registered {
            Ok(()) => debug!("Accepted connection from {peer} into slot {index}", index = key.index()),
            Err(e) => {
                error!("Error registering connection from {peer}: {e}");
                self.pool.release(key);
            }
        }
    }

    fn on_event(&mut self, token: Token, registry: &Registry) {
        let key = SlotKey::from_token(token);
        let Some(slot) = self.pool.get_mut(key) else {
            trace!("Ignoring event for stale token {token:?}");
            return;
        };

        match connection::on_readable(slot, &self.responses) {
            Outcome::Open => {}
            Outcome::Close(reason) => self.close(key, reason, registry),
        }
    }

    /// Release the slot, then deregister and close its socket.
    fn close(&mut self, key: SlotKey, reason: CloseReason, registry: &Registry) {
        let Some(mut stream) = self.pool.release(key) else {
            return;
        };

        if let Err(e) = registry.deregister(&mut stream) {
            debug!("Error deregistering slot {index}: {e}", index = key.index());
        }

        match reason {
            CloseReason::PeerClosed => debug!("Slot {index}: {reason}", index = key.index()),
            CloseReason::BufferExhausted => warn!("Closing slot {index}: {reason}", index = key.index()),
            CloseReason::Io(ref e) => error!("Closing slot {index}: {e}", index = key.index()),
        }
    }

    fn close_all(&mut self, registry: &Registry) {
        for key in self.pool.keys() {
            if let Some(mut stream) = self.pool.release(key) {
                let _ = registry.deregister(&mut stream);
            }
        }
    }
}
