use std::{
    io::ErrorKind,
    net::{SocketAddr, TcpStream, ToSocketAddrs},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use log::{debug, warn};

use crate::Result;

const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Non-blocking listener that gives up accepting once `shutdown` is set.
pub struct Listener {
    listener: std::net::TcpListener,
    shutdown: Arc<AtomicBool>,
}

impl Listener {
    pub fn bind(addr: impl ToSocketAddrs, shutdown: Arc<AtomicBool>) -> Result<Listener> {
        let listener = std::net::TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;
        Ok(Self { listener, shutdown })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Waits for the next connection, or returns `None` after shutdown.
    ///
    /// Accepted streams are switched back to blocking mode.
    pub fn accept(&self) -> Result<Option<(TcpStream, SocketAddr)>> {
        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                debug!("listener observed shutdown, no longer accepting");
                return Ok(None);
            }
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    stream.set_nonblocking(false)?;
                    return Ok(Some((stream, addr)));
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    std::thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e)
                    if matches!(
                        e.kind(),
                        ErrorKind::ConnectionAborted | ErrorKind::Interrupted
                    ) =>
                {
                    warn!("transient accept failure: {e}");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_then_stops_on_shutdown() {
        let shutdown = Arc::new(AtomicBool::new(false));
        let listener = Listener::bind("127.0.0.1:0", Arc::clone(&shutdown)).unwrap();
        let addr = listener.local_addr().unwrap();

        let _client = TcpStream::connect(addr).unwrap();
        let (_stream, peer) = listener.accept().unwrap().unwrap();
        assert!(peer.ip().is_loopback());

        shutdown.store(true, Ordering::SeqCst);
        assert!(listener.accept().unwrap().is_none());
    }
}
