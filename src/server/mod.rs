use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use log::{info, warn};

use crate::{config::ServerConfig, stress::StressTestController, Result};

pub mod connection;
pub mod http;
pub mod listener;
pub mod router;
pub mod worker_pool;

use connection::Connection;
use listener::Listener;
use worker_pool::WorkerPool;

/// Flips the flag the accept loop polls.
#[derive(Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandle {
    pub fn trigger(&self) {
        info!("shutdown requested");
        self.flag.store(true, Ordering::SeqCst);
    }
}

/// Accepts connections and hands each one to the worker pool.
///
/// Every connection is served against the same controller.
pub struct StressServer {
    listener: Listener,
    pool: WorkerPool,
    controller: Arc<StressTestController>,
    shutdown: Arc<AtomicBool>,
}

impl StressServer {
    pub fn bind(config: &ServerConfig) -> Result<Self> {
        let controller = Arc::new(StressTestController::new(config.delays()));
        Self::with_controller(config, controller)
    }

    pub fn with_controller(
        config: &ServerConfig,
        controller: Arc<StressTestController>,
    ) -> Result<Self> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let listener = Listener::bind(config.bind.as_str(), Arc::clone(&shutdown))?;
        Ok(Self {
            listener,
            pool: WorkerPool::new(config.workers),
            controller,
            shutdown,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn controller(&self) -> Arc<StressTestController> {
        Arc::clone(&self.controller)
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            flag: Arc::clone(&self.shutdown),
        }
    }

    /// Serves until shutdown is triggered, then drains the pool.
    pub fn run(mut self) -> Result<()> {
        info!(
            "serving on {} with {} workers",
            self.local_addr()?,
            self.pool.size()
        );
        while let Some((stream, addr)) = self.listener.accept()? {
            let connection = Connection::new(stream, addr, Arc::clone(&self.controller));
            self.pool.execute(move || {
                if let Err(e) = connection.serve() {
                    warn!("connection with {addr} failed: {e}");
                }
            })?;
        }
        self.pool.shutdown();
        info!("server stopped");
        Ok(())
    }
}
