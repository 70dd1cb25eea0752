use super::PortProbe;
use async_trait::async_trait;
use futures_util::future::join_all;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::net::TcpStream;

/// TCP connect scan; each port gets its own timeout and all ports of one host run together.
pub struct TcpConnectProbe {
    timeout: Duration,
}

impl TcpConnectProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl PortProbe for TcpConnectProbe {
    async fn open_ports(&self, ip: IpAddr, ports: &[u16]) -> Vec<u16> {
        let checks = ports.iter().map(|&port| async move {
            let addr = SocketAddr::new(ip, port);
            match tokio::time::timeout(self.timeout, TcpStream::connect(addr)).await {
                Ok(Ok(_)) => Some(port),
                _ => None,
            }
        });
        let mut open: Vec<u16> = join_all(checks).await.into_iter().flatten().collect();
        open.sort_unstable();
        open.dedup();
        open
    }
}
