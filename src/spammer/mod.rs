use std::io::{BufRead, Write};

use log::info;
use tokio::runtime::Runtime;

use crate::{config::SpammerConfig, Result};

pub mod client;
pub mod prompt;
pub mod round;

use prompt::{Command, Prompt};
use round::run_round;

/// Interactive load generator: prompt, fire a burst, print, repeat.
pub struct RequestSpammer {
    config: SpammerConfig,
    runtime: Runtime,
}

impl RequestSpammer {
    pub fn new(config: SpammerConfig) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        Ok(Self { config, runtime })
    }

    pub fn run<R: BufRead, W: Write>(&self, input: R, output: W) -> Result<()> {
        let mut prompt = Prompt::new(input, output);
        while let Command::Spam { version, requests } = prompt.next_command()? {
            info!(
                "sending {requests} requests to {}:{}{}",
                self.config.host,
                self.config.port,
                version.path()
            );
            let summary = self.runtime.block_on(run_round(
                &self.config.host,
                self.config.port,
                version,
                requests,
                self.config.timeout(),
                prompt.output(),
            ))?;
            writeln!(prompt.output(), "{summary}")?;
        }
        writeln!(prompt.output(), "DONE")?;
        prompt.output().flush()?;
        Ok(())
    }
}
