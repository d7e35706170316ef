use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::Level;

use crate::notify::store::STORE_TARGET;
use crate::utils::sink::{LogEvent, LogSink};

/// Log sink feeding the notification center.
///
/// Records may be produced on any thread, so they are only queued here and
/// consumed by the center on its own tick.
pub struct CenterSink {
    tx: UnboundedSender<LogEvent>,
}

impl CenterSink {
    pub fn channel() -> (Self, UnboundedReceiver<LogEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl LogSink for CenterSink {
    fn emit(&self, event: &LogEvent) {
        // debug/trace would echo the center's own publishing
        if event.level > Level::INFO || event.target == STORE_TARGET {
            return;
        }
        let _ = self.tx.send(event.clone());
    }
}
