//! One client connection paired with one backend connection
//!
//! The session relays in strict lockstep: one message from the client, then
//! one message from the backend, then the next client message. Nothing is
//! pipelined and every line is classified and counted before it is forwarded.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::{debug, trace};

use crate::metrics::MetricsSink;
use crate::proxy::codec::MessageCodec;
use crate::proxy::message::{classify, MessageType};
use crate::{Error, Result};

/// Opens the backend leg of a session
#[async_trait]
pub trait BackendDialer: Send + Sync {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send;

    async fn dial(&self) -> std::io::Result<Self::Stream>;

    /// Address used in logs and errors.
    fn address(&self) -> &str;
}

/// Dials a fresh TCP connection to a fixed backend for every session
#[derive(Debug, Clone)]
pub struct TcpDialer {
    address: String,
}

impl TcpDialer {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }
}

#[async_trait]
impl BackendDialer for TcpDialer {
    type Stream = TcpStream;

    async fn dial(&self) -> std::io::Result<TcpStream> {
        let stream = TcpStream::connect(&self.address).await?;
        stream.set_nodelay(true)?;
        Ok(stream)
    }

    fn address(&self) -> &str {
        &self.address
    }
}

/// How a session ended when no error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    ClientClosed,
    BackendClosed,
}

/// Relay state shared by the listener with each spawned session
#[derive(Clone)]
pub struct RelaySession {
    metrics: Arc<dyn MetricsSink>,
    max_message_len: Option<usize>,
}

impl RelaySession {
    /// `max_message_len` of `None` relays lines of any length.
    pub fn new(metrics: Arc<dyn MetricsSink>, max_message_len: Option<usize>) -> Self {
        Self {
            metrics,
            max_message_len,
        }
    }

    /// Dial the backend and relay until either side closes or misbehaves.
    ///
    /// Both connections are dropped when this returns, whatever the outcome.
    pub async fn run<C, D>(&self, client: C, dialer: &D) -> Result<SessionEnd>
    where
        C: AsyncRead + AsyncWrite + Unpin + Send,
        D: BackendDialer + ?Sized,
    {
        let backend = dialer
            .dial()
            .await
            .map_err(|e| Error::backend_unreachable(dialer.address(), e))?;
        debug!(backend = dialer.address(), "backend connected");

        let mut client = Framed::new(client, MessageCodec::new(self.max_message_len));
        let mut backend = Framed::new(backend, MessageCodec::new(self.max_message_len));

        loop {
            let Some(request) = client.next().await.transpose()? else {
                return Ok(SessionEnd::ClientClosed);
            };
            let tag = self.record(&request)?;
            trace!(%tag, bytes = request.len(), "client -> backend");
            backend.send(request).await?;

            let Some(response) = backend.next().await.transpose()? else {
                return Ok(SessionEnd::BackendClosed);
            };
            let tag = self.record(&response)?;
            trace!(%tag, bytes = response.len(), "backend -> client");
            client.send(response).await?;
        }
    }

    fn record(&self, msg: &Bytes) -> Result<MessageType> {
        let tag = classify(msg)?;
        self.metrics.increment(tag);
        Ok(tag)
    }
}
