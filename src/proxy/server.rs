//! Accept loop handing every client connection to its own relay session

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn, Instrument};

use crate::metrics::MetricsSink;
use crate::proxy::session::{BackendDialer, RelaySession, TcpDialer};
use crate::{Error, Result};

/// Pause after a failed accept so persistent errors (e.g. EMFILE) don't spin the loop.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Listener bound to the relay address, forwarding to a single backend
#[derive(Debug)]
pub struct ProxyListener {
    listener: TcpListener,
    dialer: Arc<TcpDialer>,
    max_message_len: Option<usize>,
    accept_limit: Option<usize>,
}

impl ProxyListener {
    /// Bind the relay address. Failure here is fatal and never retried.
    pub async fn bind(listen_address: &str, forward_address: &str) -> Result<Self> {
        let listener = TcpListener::bind(listen_address)
            .await
            .map_err(|e| Error::bind(listen_address, e))?;

        Ok(Self {
            listener,
            dialer: Arc::new(TcpDialer::new(forward_address)),
            max_message_len: None,
            accept_limit: None,
        })
    }

    /// Reject lines longer than `max_message_len`; `None` (the default) means unbounded.
    pub fn with_max_message_len(mut self, max_message_len: Option<usize>) -> Self {
        self.max_message_len = max_message_len;
        self
    }

    /// Stop accepting after `limit` connections; sessions already spawned keep running.
    pub fn with_accept_limit(mut self, limit: Option<usize>) -> Self {
        self.accept_limit = limit;
        self
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener.local_addr().map_err(Error::Io)
    }

    /// Accept connections until the accept limit, if any, is reached.
    pub async fn run(self, metrics: Arc<dyn MetricsSink>) -> Result<()> {
        info!(
            listen = %self.local_addr()?,
            forward = self.dialer.address(),
            "Relay listening"
        );

        let session = RelaySession::new(metrics, self.max_message_len);
        let mut accepted = 0usize;

        while self.accept_limit.map_or(true, |limit| accepted < limit) {
            let (stream, peer) = match self.listener.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    accept_failed(e).await;
                    continue;
                }
            };
            accepted += 1;

            if let Err(e) = stream.set_nodelay(true) {
                warn!(%peer, "Failed to set TCP_NODELAY: {}", e);
            }

            let session = session.clone();
            let dialer = Arc::clone(&self.dialer);
            let span = tracing::info_span!(
                "session",
                id = %uuid::Uuid::new_v4(),
                %peer
            );
            tokio::spawn(
                async move {
                    debug!("New connection");
                    match session.run(stream, dialer.as_ref()).await {
                        Ok(end) => debug!(?end, "Session closed"),
                        Err(e) => warn!("Session ended: {}", e),
                    }
                }
                .instrument(span),
            );
        }

        debug!(accepted, "Accept limit reached");
        Ok(())
    }
}

async fn accept_failed(e: std::io::Error) {
    error!("Error accepting connection: {}", e);
    tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
}

/// Bind `listen_address` and relay every accepted connection to `forward_address`.
pub async fn execute(
    listen_address: &str,
    forward_address: &str,
    metrics: Arc<dyn MetricsSink>,
) -> Result<()> {
    ProxyListener::bind(listen_address, forward_address)
        .await?
        .run(metrics)
        .await
}
