pub mod api;
pub mod config;
pub mod error;
pub mod metrics;
pub mod proxy;
pub mod server;

pub use error::{Error, ProtocolError, Result};
pub use metrics::{MessageMetrics, MetricsSink, MetricsSnapshot};
pub use proxy::{classify, MessageType, ProxyListener, RelaySession};
pub use server::RelayServer;
