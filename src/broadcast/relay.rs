use tokio::sync::broadcast;

use crate::broadcast::message::ListenerEvent;

/// Best-effort fan-out of live events to all subscribed listeners.
///
/// No queuing beyond the channel capacity and no retry: a lagging receiver
/// drops events, a disconnected one is simply gone. Order is preserved per
/// sender.
#[derive(Clone)]
pub struct Relay {
    sender: broadcast::Sender<ListenerEvent>,
}

impl Relay {
    pub fn new(capacity: usize) -> Self {
        let (sender, mut recv) = broadcast::channel(capacity);
        // resident subscriber keeps the channel alive with zero listeners
        tokio::spawn(async move { while recv.recv().await.is_ok() {} });
        Relay { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ListenerEvent> {
        self.sender.subscribe()
    }

    pub fn dispatch(&self, event: ListenerEvent) {
        let _ = self.sender.send(event);
    }
}
