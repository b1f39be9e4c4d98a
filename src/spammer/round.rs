use std::{fmt::Display, io::Write, sync::Arc, time::Duration};

use futures::stream::{FuturesUnordered, StreamExt};
use log::{error, warn};
use tokio::{
    task::JoinHandle,
    time::{timeout_at, Instant},
};

use super::client::{self, HttpResponse};
use crate::{
    stress::{is_well_formed, Version},
    Result,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoundSummary {
    pub sent: usize,
    pub received: usize,
    /// Bodies that are exactly ten copies of one letter.
    pub well_formed: usize,
    pub anomalous: usize,
    pub failed: usize,
    /// Still running when the deadline passed, and aborted.
    pub timed_out: usize,
}

impl RoundSummary {
    fn record(&mut self, response: &HttpResponse) {
        self.received += 1;
        if response.status == 200 && is_well_formed(&response.body) {
            self.well_formed += 1;
        } else {
            self.anomalous += 1;
        }
    }
}

impl Display for RoundSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "sent {}, received {} ({} well-formed, {} anomalous), {} failed, {} timed out",
            self.sent, self.received, self.well_formed, self.anomalous, self.failed, self.timed_out
        )
    }
}

/// Fires `requests` concurrent `GET`s at one version's endpoint.
///
/// Every body is written to `output` as soon as its request finishes.
/// Requests still outstanding after `timeout` are aborted and counted as
/// timed out rather than failed.
pub async fn run_round(
    host: &str,
    port: u16,
    version: Version,
    requests: usize,
    timeout: Duration,
    output: &mut impl Write,
) -> Result<RoundSummary> {
    let host: Arc<str> = Arc::from(host);
    let mut pending: FuturesUnordered<JoinHandle<Result<HttpResponse>>> = (0..requests)
        .map(|_| {
            let host = Arc::clone(&host);
            tokio::spawn(async move { client::get(&host, port, version.path()).await })
        })
        .collect();

    let mut summary = RoundSummary {
        sent: requests,
        ..RoundSummary::default()
    };
    let deadline = Instant::now() + timeout;
    loop {
        let next = timeout_at(deadline, pending.next()).await;
        match next {
            Ok(Some(Ok(Ok(response)))) => {
                if response.status != 200 {
                    warn!("{version} answered with status {}", response.status);
                }
                if let Err(e) = writeln!(output, "{}", response.body) {
                    abort_all(&pending);
                    return Err(e.into());
                }
                summary.record(&response);
            }
            Ok(Some(Ok(Err(e)))) => {
                error!("request to {version} failed: {e}");
                summary.failed += 1;
            }
            Ok(Some(Err(e))) => {
                error!("request task for {version} did not finish: {e}");
                summary.failed += 1;
            }
            Ok(None) => break,
            Err(_) => {
                warn!(
                    "giving up on {} outstanding {version} requests after {:?}",
                    pending.len(),
                    timeout
                );
                summary.timed_out = abort_all(&pending);
                break;
            }
        }
    }
    output.flush()?;
    Ok(summary)
}

/// Aborts every task still in `pending`, returning how many there were.
fn abort_all(pending: &FuturesUnordered<JoinHandle<Result<HttpResponse>>>) -> usize {
    for handle in pending.iter() {
        handle.abort();
    }
    pending.len()
}
