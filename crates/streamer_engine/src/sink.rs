use streamer_core::Event;
use tokio::sync::mpsc;

/// Ordered destination for job events. Implementations must deliver events in
/// the order `emit` is called; there is exactly one consumer per job.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: Event);
}

pub struct ChannelEventSink {
    tx: mpsc::UnboundedSender<Event>,
}

impl ChannelEventSink {
    pub fn new(tx: mpsc::UnboundedSender<Event>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, event: Event) {
        // A closed receiver means the client went away; the job notices through
        // its cancellation token, so the event is simply dropped here.
        let _ = self.tx.send(event);
    }
}
