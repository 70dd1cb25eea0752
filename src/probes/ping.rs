// Reachability via the system `ping` binary. Replies are parsed from its text output.

use super::{PingOutcome, ReachabilityProbe, run_command};
use async_trait::async_trait;
use regex::Regex;
use std::net::IpAddr;
use std::sync::LazyLock;
use std::time::Duration;

static REPLY_TIME: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"time\s*[=<]\s*([\d.]+)\s*ms").ok());

/// Round-trip times of every reply line, in output order.
pub fn parse_ping_output(output: &str) -> Vec<f64> {
    let Some(re) = REPLY_TIME.as_ref() else {
        return Vec::new();
    };
    output
        .lines()
        .filter_map(|line| re.captures(line))
        .filter_map(|caps| caps.get(1)?.as_str().parse::<f64>().ok())
        .collect()
}

/// Command-line dialect of the host's `ping`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PingFlavor {
    Linux,
    MacOs,
    Windows,
}

impl PingFlavor {
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            PingFlavor::Windows
        } else if cfg!(target_os = "macos") {
            PingFlavor::MacOs
        } else {
            PingFlavor::Linux
        }
    }

    /// Gap between requests. Linux is told `-i 0.2`; the others send once a second.
    pub fn interval(self) -> Duration {
        match self {
            PingFlavor::Linux => Duration::from_millis(200),
            PingFlavor::MacOs | PingFlavor::Windows => Duration::from_secs(1),
        }
    }

    /// Longest a run of `count` requests can take when every reply waits out `timeout`.
    pub fn deadline(self, count: u32, timeout: Duration) -> Duration {
        let wait = match self {
            PingFlavor::Linux => Duration::from_secs(ceil_secs(timeout)),
            PingFlavor::MacOs | PingFlavor::Windows => timeout,
        };
        (self.interval() + wait) * count.max(1)
    }
}

fn ceil_secs(d: Duration) -> u64 {
    d.as_secs_f64().ceil().max(1.0) as u64
}

fn whole_secs(d: Duration) -> String {
    ceil_secs(d).to_string()
}

/// Arguments for one `ping` run of `count` requests, each waiting at most `timeout`. Where the
/// tool supports it, the run also carries its own overall deadline so it exits with partial output.
pub fn ping_args(flavor: PingFlavor, address: IpAddr, count: u32, timeout: Duration) -> Vec<String> {
    let addr = address.to_string();
    let count = count.max(1);
    let deadline = flavor.deadline(count, timeout);
    match flavor {
        PingFlavor::Windows => vec![
            "-n".into(),
            count.to_string(),
            "-w".into(),
            timeout.as_millis().to_string(),
            addr,
        ],
        PingFlavor::MacOs => vec![
            "-c".into(),
            count.to_string(),
            "-W".into(),
            timeout.as_millis().to_string(),
            "-t".into(),
            whole_secs(deadline),
            addr,
        ],
        // Linux -W takes whole seconds, -w is the deadline for the whole run.
        PingFlavor::Linux => vec![
            "-c".into(),
            count.to_string(),
            "-i".into(),
            "0.2".into(),
            "-W".into(),
            whole_secs(timeout),
            "-w".into(),
            whole_secs(deadline),
            addr,
        ],
    }
}

/// Time allowed for the child process: its own deadline plus slack to flush output and exit.
pub fn command_budget(flavor: PingFlavor, count: u32, timeout: Duration) -> Duration {
    let deadline = flavor.deadline(count, timeout);
    Duration::from_secs(ceil_secs(deadline) + 1)
}

pub struct SystemPing;

#[async_trait]
impl ReachabilityProbe for SystemPing {
    async fn probe(&self, address: IpAddr, count: u32, timeout: Duration) -> PingOutcome {
        let flavor = PingFlavor::current();
        let args = ping_args(flavor, address, count, timeout);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        match run_command("ping", &args, command_budget(flavor, count, timeout)).await {
            Ok(out) => {
                let mut samples = parse_ping_output(&out);
                samples.truncate(count as usize);
                PingOutcome::from_samples(samples)
            }
            Err(e) => {
                tracing::trace!(error = %e, %address, "ping failed");
                PingOutcome::default()
            }
        }
    }
}
