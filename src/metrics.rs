//! Message counters shared by every relay session
//!
//! Counters are atomic and lock-free; sessions record into them on the hot
//! path and the HTTP exporter or the signal handler read them through
//! [`MetricsSink::snapshot`].

use indexmap::IndexMap;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::proxy::MessageType;

/// Relaxed is enough for monotonic counters.
const METRIC_ORDERING: Ordering = Ordering::Relaxed;

/// Name of the counter family in the Prometheus exposition.
pub const COUNTER_NAME: &str = "msg_counter";

/// Destination for per-type message counts
#[cfg_attr(test, mockall::automock)]
pub trait MetricsSink: Send + Sync {
    /// Count one relayed message of the given type.
    fn increment(&self, tag: MessageType);

    /// Read all counters at once.
    fn snapshot(&self) -> MetricsSnapshot;
}

/// Lock-free counter registry, one slot per message type
#[derive(Debug, Default)]
pub struct MessageMetrics {
    counters: [AtomicU64; MessageType::ALL.len()],
}

impl MessageMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, tag: MessageType) -> u64 {
        self.counters[tag.index()].load(METRIC_ORDERING)
    }
}

impl MetricsSink for MessageMetrics {
    fn increment(&self, tag: MessageType) {
        self.counters[tag.index()].fetch_add(1, METRIC_ORDERING);
    }

    fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot::from_counts(MessageType::ALL.iter().map(|t| (*t, self.count(*t))))
    }
}

/// Point-in-time view of the counters
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    counts: IndexMap<MessageType, u64>,
    total: u64,
}

impl MetricsSnapshot {
    /// Build a snapshot; the total is derived from the same values.
    pub fn from_counts<I>(counts: I) -> Self
    where
        I: IntoIterator<Item = (MessageType, u64)>,
    {
        let counts: IndexMap<MessageType, u64> = counts.into_iter().collect();
        let total = counts.values().sum();
        Self { counts, total }
    }

    pub fn get(&self, tag: MessageType) -> u64 {
        self.counts.get(&tag).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn counts(&self) -> &IndexMap<MessageType, u64> {
        &self.counts
    }

    pub fn report(&self) -> MetricsReport {
        MetricsReport {
            msg_ack: self.get(MessageType::Ack),
            msg_nak: self.get(MessageType::Nak),
            msg_req: self.get(MessageType::Req),
            msg_total: self.total,
        }
    }

    /// Format the counters in Prometheus text exposition format.
    ///
    /// ```text
    /// # HELP msg_counter Total number of messages
    /// # TYPE msg_counter counter
    /// msg_counter{type="ACK"} 3
    /// ```
    pub fn to_prometheus(&self) -> String {
        let mut output = String::with_capacity(256);
        output.push_str(&format!("# HELP {} Total number of messages\n", COUNTER_NAME));
        output.push_str(&format!("# TYPE {} counter\n", COUNTER_NAME));
        for (tag, value) in &self.counts {
            output.push_str(&format!("{}{{type=\"{}\"}} {}\n", COUNTER_NAME, tag, value));
        }
        output
    }
}

/// Flat JSON form of a snapshot, as dumped on SIGUSR1 and served at `/metrics.json`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsReport {
    pub msg_ack: u64,
    pub msg_nak: u64,
    pub msg_req: u64,
    pub msg_total: u64,
}
