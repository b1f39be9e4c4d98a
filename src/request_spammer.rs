use std::io;

use clap::Parser;
use env_logger::Env;
use singleton_race::{config::SpammerConfig, spammer::RequestSpammer};

fn main() -> singleton_race::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let spammer = RequestSpammer::new(SpammerConfig::parse())?;
    spammer.run(io::stdin().lock(), io::stdout().lock())
}
