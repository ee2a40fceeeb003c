use std::sync::{Condvar, Mutex};
use std::time::Duration;

use raw_sync::Timeout;
use raw_sync::events::{Event, EventImpl, EventState};
use shared_memory::{Shmem, ShmemConf, ShmemError};

use crate::error::ChannelError;

/// How long a cancellable wait polls between checking the local disposed
/// flag. Short enough that `Receiver::dispose` while idle feels immediate,
/// long enough to not spin.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// A named, cross-process auto-reset event backed by its own small shared
/// memory segment. A single `wait` consumes exactly one `signal`.
pub(crate) struct NamedEvent {
    _shmem: Shmem,
    event: Box<dyn EventImpl>,
}

unsafe impl Send for NamedEvent {}
unsafe impl Sync for NamedEvent {}

impl NamedEvent {
    pub fn create_or_open(channel_name: &str, suffix: &str) -> Result<Self, ChannelError> {
        let os_id = format!("{channel_name}_{suffix}");
        let size = Event::size_of(None);

        let (shmem, created) = match ShmemConf::new().size(size).os_id(&os_id).create() {
            Ok(shmem) => (shmem, true),
            Err(ShmemError::MappingIdExists) => (ShmemConf::new().os_id(&os_id).open()?, false),
            Err(e) => return Err(e.into()),
        };

        let (event, _bytes_used) = unsafe {
            Event::new(shmem.as_ptr(), created).map_err(|e| ChannelError::Event(e.to_string()))?
        };

        Ok(Self { _shmem: shmem, event })
    }

    pub fn signal(&self) -> Result<(), ChannelError> {
        self.event.set(EventState::Signaled).map_err(|e| ChannelError::Event(e.to_string()))
    }

    pub fn wait(&self) -> Result<(), ChannelError> {
        self.event.wait(Timeout::Infinite).map_err(|e| ChannelError::Event(e.to_string()))
    }

    /// Waits up to `POLL_INTERVAL`, returning whether the event fired.
    /// Used only for the one cancellable wait in the protocol: a receiver
    /// idling for a message that hasn't started yet.
    fn poll_once(&self) -> bool {
        self.event.wait(Timeout::Val(POLL_INTERVAL)).is_ok()
    }
}

/// The four named events a channel's peers rendezvous on.
pub(crate) struct EventSet {
    pub message_sending: NamedEvent,
    pub message_read: NamedEvent,
    pub bytes_written: NamedEvent,
    pub bytes_read: NamedEvent,
}

impl EventSet {
    pub fn create_or_open(channel_name: &str) -> Result<Self, ChannelError> {
        Ok(Self {
            message_sending: NamedEvent::create_or_open(channel_name, "MessageSending")?,
            message_read: NamedEvent::create_or_open(channel_name, "MessageRead")?,
            bytes_written: NamedEvent::create_or_open(channel_name, "BytesWritten")?,
            bytes_read: NamedEvent::create_or_open(channel_name, "BytesRead")?,
        })
    }
}

/// An in-process-only wakeable flag. Used for the receiver's local
/// `Disposing` signal, which has no cross-process visibility and needs none.
pub(crate) struct LocalEvent {
    signalled: Mutex<bool>,
    condvar: Condvar,
}

impl LocalEvent {
    pub fn new() -> Self {
        Self { signalled: Mutex::new(false), condvar: Condvar::new() }
    }

    pub fn signal(&self) {
        let mut signalled = self.signalled.lock().unwrap_or_else(|e| e.into_inner());
        *signalled = true;
        self.condvar.notify_all();
    }

    pub fn is_signalled(&self) -> bool {
        *self.signalled.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Blocks until `event` fires or `disposing` is signalled, whichever first.
/// Returns `true` if the event fired, `false` if cancelled by disposal.
pub(crate) fn wait_cancellable(event: &NamedEvent, disposing: &LocalEvent) -> bool {
    loop {
        if event.poll_once() {
            return true;
        }
        if disposing.is_signalled() {
            return false;
        }
    }
}
