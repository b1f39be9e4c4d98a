use std::time::Duration;

use clap::Parser;

use crate::stress::ControllerDelays;

#[derive(Parser, Debug, Clone)]
#[clap(name = "stress_server", about = "Serves the /v1 to /v4 stress endpoints")]
pub struct ServerConfig {
    /// Address to listen on.
    #[clap(long, env = "STRESS_BIND", default_value = "127.0.0.1:8080")]
    pub bind: String,

    /// Number of worker threads handling connections.
    #[clap(long, env = "STRESS_WORKERS", default_value_t = 200)]
    pub workers: usize,

    /// Delay v3 adds between filling and reading the shared list.
    #[clap(long, default_value_t = 50)]
    pub v3_delay_ms: u64,

    /// Delay v4 adds between filling and reading its local list.
    #[clap(long, default_value_t = 500)]
    pub v4_delay_ms: u64,
}

impl ServerConfig {
    pub fn delays(&self) -> ControllerDelays {
        ControllerDelays {
            v3: Duration::from_millis(self.v3_delay_ms),
            v4: Duration::from_millis(self.v4_delay_ms),
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[clap(
    name = "request_spammer",
    about = "Fires bursts of concurrent requests at the stress server"
)]
pub struct SpammerConfig {
    /// Host the stress server runs on.
    #[clap(long, env = "SPAMMER_HOST", default_value = "localhost")]
    pub host: String,

    #[clap(long, env = "SPAMMER_PORT", default_value_t = 8080)]
    pub port: u16,

    /// How long to wait for one burst before giving up on its stragglers.
    #[clap(long, default_value_t = 60)]
    pub timeout_secs: u64,
}

impl SpammerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
