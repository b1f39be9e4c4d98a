use std::{
    io::{BufReader, Write},
    net::{Shutdown, SocketAddr, TcpStream},
    sync::Arc,
    time::Duration,
};

use log::{debug, warn};

use super::{
    http::{Request, Response, Status},
    router,
};
use crate::{stress::StressTestController, Error, Result};

const READ_TIMEOUT: Duration = Duration::from_secs(30);

enum ConnectionState {
    Reading,
    Writing(Response),
    Close,
    Closed,
}

/// One accepted client, driven from request to response to close on a worker thread.
pub struct Connection {
    stream: TcpStream,
    addr: SocketAddr,
    controller: Arc<StressTestController>,
    state: ConnectionState,
}

impl Connection {
    pub fn new(
        stream: TcpStream,
        addr: SocketAddr,
        controller: Arc<StressTestController>,
    ) -> Connection {
        Connection {
            stream,
            addr,
            controller,
            state: ConnectionState::Reading,
        }
    }

    pub fn serve(mut self) -> Result<()> {
        loop {
            let state = std::mem::replace(&mut self.state, ConnectionState::Closed);
            self.state = match state {
                ConnectionState::Reading => {
                    debug!("reading request from {}", self.addr);
                    self.stream.set_read_timeout(Some(READ_TIMEOUT))?;
                    match Request::read_from(BufReader::new(&self.stream)) {
                        Ok(request) => {
                            debug!("{} {} from {}", request.method, request.target, self.addr);
                            ConnectionState::Writing(router::route(&self.controller, &request))
                        }
                        Err(Error::MalformedRequest(reason)) => {
                            warn!("rejecting request from {}: {reason}", self.addr);
                            ConnectionState::Writing(Response::new(Status::BadRequest, reason))
                        }
                        Err(e) => return Err(e),
                    }
                }
                ConnectionState::Writing(response) => {
                    debug!("writing {} to {}", response.status.code(), self.addr);
                    self.stream.write_all(&response.to_bytes())?;
                    self.stream.flush()?;
                    ConnectionState::Close
                }
                ConnectionState::Close => {
                    //  the peer may already be gone, which is fine
                    let _ = self.stream.shutdown(Shutdown::Write);
                    ConnectionState::Closed
                }
                ConnectionState::Closed => {
                    debug!("connection with {} closed", self.addr);
                    return Ok(());
                }
            };
        }
    }
}
