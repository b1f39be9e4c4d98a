use clap::Parser;
use env_logger::Env;
use log::info;
use singleton_race::{config::ServerConfig, server::StressServer};

fn main() -> singleton_race::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let config = ServerConfig::parse();
    let server = StressServer::bind(&config)?;
    let shutdown = server.shutdown_handle();
    ctrlc::set_handler(move || shutdown.trigger())?;
    info!("Listening on http://{}", server.local_addr()?);
    server.run()
}
