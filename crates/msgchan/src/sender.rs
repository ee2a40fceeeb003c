use crate::error::{ChannelError, SendError};
use crate::events::EventSet;
use crate::region::SharedRegion;
use crate::send_stream::SendStream;

struct SenderInner {
    region: SharedRegion,
    events: EventSet,
}

/// The write side of a named message channel.
///
/// A `Sender` is created or opened by the same name a [`crate::Receiver`]
/// uses; the two derive the same shared region and event names from it.
/// Only one `send_message` call may be in flight on a given `Sender` at a
/// time — the type does not guard against concurrent misuse, matching the
/// single-writer model the protocol assumes.
pub struct Sender {
    inner: Option<SenderInner>,
}

impl Sender {
    /// Creates the channel's shared region and events if this is the first
    /// peer to reach them, or opens the existing ones otherwise.
    pub fn create_or_open(channel_name: &str) -> Result<Self, ChannelError> {
        if channel_name.is_empty() {
            return Err(ChannelError::InvalidArgument("channel name must not be empty".into()));
        }
        let region = SharedRegion::create_or_open(channel_name)?;
        let events = EventSet::create_or_open(channel_name)?;
        Ok(Self { inner: Some(SenderInner { region, events }) })
    }

    /// Sends one message, streamed to the receiver chunk by chunk as `f`
    /// writes to the stream it's given. Blocks until the receiver has
    /// acknowledged the complete message.
    ///
    /// If `f` returns `Err`, the channel still completes its handshake with
    /// the receiver (marking the message aborted, so the receiver's own
    /// `receive_message` call returns `Ok(None)`) before this returns
    /// `Err(SendError::Callback(e))`.
    pub fn send_message<T, E: std::fmt::Debug + std::fmt::Display>(
        &mut self,
        f: impl FnOnce(&mut SendStream<'_>) -> Result<T, E>,
    ) -> Result<T, SendError<E>> {
        let inner = self.inner.as_ref().ok_or(ChannelError::UsedAfterRelease)?;
        inner.events.message_sending.signal()?;
        let mut stream = SendStream::new(&inner.region, &inner.events);

        match f(&mut stream) {
            Ok(value) => {
                stream.finish(false)?;
                Ok(value)
            }
            Err(e) => {
                stream.finish(true)?;
                Err(SendError::Callback(e))
            }
        }
    }

    /// Releases the underlying shared memory and events. Idempotent.
    pub fn dispose(&mut self) {
        self.inner.take();
    }
}

impl Drop for Sender {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rejects_empty_channel_name() {
        let err = Sender::create_or_open("");
        assert!(matches!(err, Err(ChannelError::InvalidArgument(_))));
    }
}
