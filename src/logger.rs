use tokio::sync::mpsc;
use tracing::info;

/// Buffered line capacity. Sends block once this many lines are queued,
/// which acts as natural backpressure on an overloaded logger.
const LOG_CAPACITY: usize = 100;

/// Handle for queueing session log lines.
#[derive(Clone, Debug)]
pub struct LogSink {
    tx: mpsc::Sender<String>,
}

impl LogSink {
    pub fn new() -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(LOG_CAPACITY);
        (Self { tx }, rx)
    }

    /// Queue one line, waiting for channel capacity if necessary.
    pub async fn line(&self, message: String) {
        let _ = self.tx.send(message).await;
    }
}

/// Forward queued lines to the tracing subscriber until every sender is
/// gone.
pub async fn drain(mut rx: mpsc::Receiver<String>) {
    while let Some(line) = rx.recv().await {
        info!("{line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lines_arrive_in_send_order() {
        let (sink, mut rx) = LogSink::new();
        sink.line("first".to_string()).await;
        sink.line("second".to_string()).await;
        assert_eq!(rx.recv().await.unwrap(), "first");
        assert_eq!(rx.recv().await.unwrap(), "second");
    }
}
