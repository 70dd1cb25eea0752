// Typed errors for discovery runs and the probe layer. Repositories and config use anyhow.

use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("no local IPv4 subnet detected")]
    NoSubnet,
    #[error("a discovery scan is already running")]
    AlreadyRunning,
    #[error("store: {0}")]
    Store(#[from] anyhow::Error),
}

/// Failures inside a probe implementation. Probe traits never surface these; they are
/// logged and turned into unreachable / `None` results.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("{program}: {message}")]
    Command {
        program: &'static str,
        message: String,
    },
    #[error("parse: {0}")]
    Parse(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
#[error("unknown {kind} value: {value:?}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}
