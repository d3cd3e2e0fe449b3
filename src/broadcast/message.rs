use bytes::Bytes;

/// Events fanned out to every connected listener.
#[derive(Clone, Debug)]
pub enum ListenerEvent {
    Started { title: String },
    Audio(Bytes),
    Stopped,
}
