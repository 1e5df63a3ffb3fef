use crate::Result;

/// One-way outward announcement channel. No acknowledgement is expected.
pub trait Broadcast {
    fn broadcast(&mut self, channel: &str, payload: &serde_json::Value) -> Result<()>;
}

/// Sink that announces through the log only.
#[derive(Debug, Default, Clone)]
pub struct TracingBroadcast {
    sent: u64,
}

impl TracingBroadcast {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> u64 {
        self.sent
    }
}

impl Broadcast for TracingBroadcast {
    fn broadcast(&mut self, channel: &str, payload: &serde_json::Value) -> Result<()> {
        self.sent += 1;
        tracing::info!(target: "matrix_host::broadcast", channel, %payload, "broadcast");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_announcements() {
        let mut sink = TracingBroadcast::new();
        sink.broadcast("plugin", &serde_json::json!("rainbow")).unwrap();
        sink.broadcast("plugin", &serde_json::json!("walker")).unwrap();
        assert_eq!(sink.sent(), 2);
    }
}
