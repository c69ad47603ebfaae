use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};

use crate::api;
use crate::config::Config;
use crate::metrics::{MessageMetrics, MetricsSink};
use crate::proxy::ProxyListener;
use crate::{Error, Result};

/// Relay listener, metrics exporter and snapshot-dump handler run together
pub struct RelayServer {
    config: Config,
    metrics: Arc<dyn MetricsSink>,
}

impl RelayServer {
    pub fn new(config: Config) -> Self {
        Self::with_metrics(config, Arc::new(MessageMetrics::new()))
    }

    pub fn with_metrics(config: Config, metrics: Arc<dyn MetricsSink>) -> Self {
        Self { config, metrics }
    }

    pub fn metrics(&self) -> Arc<dyn MetricsSink> {
        Arc::clone(&self.metrics)
    }

    /// Run until Ctrl+C or until the relay or exporter stops.
    ///
    /// Both sockets are bound before anything is spawned, so a bind failure
    /// is returned here and no session ever starts.
    pub async fn run(self) -> Result<()> {
        info!("Starting msg-relay");

        let relay = ProxyListener::bind(&self.config.listen_addr, &self.config.forward_addr)
            .await?
            .with_max_message_len(self.config.max_message_len)
            .with_accept_limit(self.config.accept_limit);

        let metrics_listener = TcpListener::bind(&self.config.metrics_addr)
            .await
            .map_err(|e| Error::bind(&self.config.metrics_addr, e))?;
        info!("Metrics listening on: {}", self.config.metrics_addr);

        let relay_handle = {
            let metrics = Arc::clone(&self.metrics);
            tokio::spawn(async move {
                if let Err(e) = relay.run(metrics).await {
                    error!("Relay error: {}", e);
                }
            })
        };

        let web_handle = {
            let app = api::create_router(Arc::clone(&self.metrics));
            tokio::spawn(async move {
                if let Err(e) = axum::serve(metrics_listener, app).await {
                    error!("Metrics server error: {}", e);
                }
            })
        };

        #[cfg(unix)]
        let dump_handle = tokio::spawn(dump_on_signal(Arc::clone(&self.metrics)));

        let shutdown_handle = tokio::spawn(async {
            if let Err(e) = signal::ctrl_c().await {
                error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Received shutdown signal");
        });

        tokio::select! {
            _ = relay_handle => {
                info!("Relay shut down");
            }
            _ = web_handle => {
                info!("Metrics server shut down");
            }
            _ = shutdown_handle => {
                info!("Shutting down gracefully");
            }
        }

        #[cfg(unix)]
        dump_handle.abort();

        Ok(())
    }
}

/// Render the current counters as the JSON line logged on SIGUSR1.
pub fn snapshot_json(metrics: &dyn MetricsSink) -> Result<String> {
    Ok(serde_json::to_string(&metrics.snapshot().report())?)
}

/// Log a metrics snapshot every time the process receives SIGUSR1.
#[cfg(unix)]
async fn dump_on_signal(metrics: Arc<dyn MetricsSink>) {
    use tokio::signal::unix::SignalKind;

    let mut usr1 = match signal::unix::signal(SignalKind::user_defined1()) {
        Ok(stream) => stream,
        Err(e) => {
            error!("Failed to install SIGUSR1 handler: {}", e);
            return;
        }
    };

    while usr1.recv().await.is_some() {
        match snapshot_json(metrics.as_ref()) {
            Ok(json) => info!(target: "msg_relay::metrics", "{}", json),
            Err(e) => error!("Failed to serialize metrics snapshot: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::MessageType;

    #[test]
    fn test_server_creation() {
        let server = RelayServer::new(Config::default());
        assert_eq!(server.metrics().snapshot().total(), 0);
    }

    #[test]
    fn test_snapshot_json() {
        let metrics = MessageMetrics::new();
        metrics.increment(MessageType::Ack);
        metrics.increment(MessageType::Req);

        assert_eq!(
            snapshot_json(&metrics).unwrap(),
            r#"{"msg_ack":1,"msg_nak":0,"msg_req":1,"msg_total":2}"#
        );
    }

    #[tokio::test]
    async fn test_run_fails_when_relay_address_taken() {
        let held = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = Config {
            listen_addr: held.local_addr().unwrap().to_string(),
            metrics_addr: "127.0.0.1:0".to_string(),
            ..Config::default()
        };

        let result = RelayServer::new(config).run().await;
        assert!(matches!(result, Err(Error::Bind { .. })));
    }

    #[tokio::test]
    async fn test_run_fails_when_metrics_address_taken() {
        let held = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let metrics_addr = held.local_addr().unwrap().to_string();
        let config = Config {
            listen_addr: "127.0.0.1:0".to_string(),
            metrics_addr: metrics_addr.clone(),
            ..Config::default()
        };

        let result = RelayServer::new(config).run().await;
        assert!(matches!(result, Err(Error::Bind { ref address, .. }) if *address == metrics_addr));
    }
}
