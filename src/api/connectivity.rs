use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use url::Url;

use crate::error::{AppError, Result};

/// Answers "is the backend reachable right now".
#[async_trait]
pub trait Connectivity: Send + Sync {
    async fn is_online(&self) -> bool;
}

/// Probes reachability with a TCP handshake against the API host.
pub struct TcpProbe {
    host: String,
    port: u16,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let url = Url::parse(base_url)?;
        let host = url
            .host_str()
            .ok_or_else(|| AppError::Config(format!("API URL has no host: {base_url}")))?
            .to_string();
        let port = url
            .port_or_known_default()
            .ok_or_else(|| AppError::Config(format!("API URL has no port: {base_url}")))?;

        Ok(Self {
            host,
            port,
            timeout,
        })
    }
}

#[async_trait]
impl Connectivity for TcpProbe {
    async fn is_online(&self) -> bool {
        let connect = TcpStream::connect((self.host.as_str(), self.port));
        match tokio::time::timeout(self.timeout, connect).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                tracing::debug!("Connectivity probe to {}:{} failed: {}", self.host, self.port, e);
                false
            }
            Err(_) => {
                tracing::debug!("Connectivity probe to {}:{} timed out", self.host, self.port);
                false
            }
        }
    }
}

/// Connectivity pinned to a value, e.g. for `--offline`.
pub struct FixedConnectivity {
    online: AtomicBool,
}

impl FixedConnectivity {
    pub fn new(online: bool) -> Self {
        Self {
            online: AtomicBool::new(online),
        }
    }

    #[allow(dead_code)]
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

#[async_trait]
impl Connectivity for FixedConnectivity {
    async fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn probe_uses_scheme_default_port() {
        let probe = TcpProbe::new("https://tv-shows.infinum.academy", Duration::from_secs(1)).unwrap();
        assert_eq!(probe.host, "tv-shows.infinum.academy");
        assert_eq!(probe.port, 443);
    }

    #[test]
    fn probe_rejects_url_without_host() {
        assert!(TcpProbe::new("file:///tmp/x", Duration::from_secs(1)).is_err());
    }

    #[tokio::test]
    async fn probe_reports_listening_port_online() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let probe = TcpProbe::new(&format!("http://127.0.0.1:{port}"), Duration::from_secs(1)).unwrap();
        assert!(probe.is_online().await);
    }

    #[tokio::test]
    async fn probe_reports_closed_port_offline() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let probe = TcpProbe::new(&format!("http://127.0.0.1:{port}"), Duration::from_millis(500)).unwrap();
        assert!(!probe.is_online().await);
    }

    #[tokio::test]
    async fn fixed_connectivity_can_be_toggled() {
        let connectivity = FixedConnectivity::new(false);
        assert!(!connectivity.is_online().await);
        connectivity.set_online(true);
        assert!(connectivity.is_online().await);
    }
}
