use std::sync::Arc;

use crate::error::{ChannelError, ReceiveError};
use crate::events::{EventSet, LocalEvent};
use crate::receive_stream::ReceiveStream;
use crate::region::SharedRegion;

struct ReceiverInner {
    region: SharedRegion,
    events: EventSet,
    disposing: Arc<LocalEvent>,
}

/// A handle that can cancel a [`Receiver`]'s idle wait from another thread,
/// without needing `&mut Receiver` itself. Obtained via
/// [`Receiver::canceller`] before the blocking `receive_message` call.
#[derive(Clone)]
pub struct ReceiverCanceller(Arc<LocalEvent>);

impl ReceiverCanceller {
    /// Cancels the receiver's current or next idle wait for a message to
    /// begin. Has no effect on a message already in progress.
    pub fn cancel(&self) {
        self.0.signal();
    }
}

/// The read side of a named message channel.
///
/// A `Receiver` is created or opened by the same name a [`crate::Sender`]
/// uses; the two derive the same shared region and event names from it.
/// Only one `receive_message` call may be in flight on a given `Receiver`
/// at a time — the type does not guard against concurrent misuse, matching
/// the single-reader model the protocol assumes.
pub struct Receiver {
    inner: Option<ReceiverInner>,
}

impl Receiver {
    /// Creates the channel's shared region and events if this is the first
    /// peer to reach them, or opens the existing ones otherwise.
    pub fn create_or_open(channel_name: &str) -> Result<Self, ChannelError> {
        if channel_name.is_empty() {
            return Err(ChannelError::InvalidArgument("channel name must not be empty".into()));
        }
        let region = SharedRegion::create_or_open(channel_name)?;
        let events = EventSet::create_or_open(channel_name)?;
        let disposing = Arc::new(LocalEvent::new());
        Ok(Self { inner: Some(ReceiverInner { region, events, disposing }) })
    }

    /// Returns a cloneable, `Send` handle that can cancel this receiver's
    /// idle wait from another thread while `receive_message` blocks here.
    pub fn canceller(&self) -> Option<ReceiverCanceller> {
        self.inner.as_ref().map(|inner| ReceiverCanceller(inner.disposing.clone()))
    }

    /// Waits for one complete message and hands it to `f` as it arrives.
    ///
    /// Returns `Ok(None)` if the receiver was disposed while idling for a
    /// message to begin — the cancellation case. If `f` returns `Err`,
    /// `MessageRead` is never signalled — per spec.md §4.3/§7
    /// (`ReceiverAborted`), the channel is left unusable and both peers
    /// must be torn down; the sender's blocked call will not unblock on its
    /// own. `MessageRead` is signalled exactly once, here, after `f`
    /// returns successfully and any chunks it left unread have been
    /// drained — never by the stream itself while `f` is still running, so
    /// a callback that reads the whole message and then fails still leaves
    /// the sender blocked.
    pub fn receive_message<T, E: std::fmt::Debug + std::fmt::Display>(
        &mut self,
        f: impl FnOnce(&mut ReceiveStream<'_>) -> Result<T, E>,
    ) -> Result<Option<T>, ReceiveError<E>> {
        let inner = self.inner.as_ref().ok_or(ChannelError::UsedAfterRelease)?;

        if !ReceiveStream::await_message_start(&inner.events, &inner.disposing) {
            return Ok(None);
        }

        let mut stream = ReceiveStream::new(&inner.region, &inner.events);
        let value = match f(&mut stream) {
            Ok(value) => value,
            Err(e) => return Err(ReceiveError::Callback(e)),
        };

        stream.drain_to_completion()?;
        inner.events.message_read.signal()?;

        if stream.aborted { Ok(None) } else { Ok(Some(value)) }
    }

    /// Signals any in-progress idle wait to cancel and releases the
    /// underlying shared memory and events. Idempotent.
    pub fn dispose(&mut self) {
        if let Some(inner) = self.inner.as_ref() {
            inner.disposing.signal();
        }
        self.inner.take();
    }
}

impl Drop for Receiver {
    fn drop(&mut self) {
        self.dispose();
    }
}
