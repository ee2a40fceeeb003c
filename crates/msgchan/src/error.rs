use std::io::ErrorKind;

use thiserror::Error;

/// Failures at the channel/protocol level, distinct from a user callback's
/// own error type.
#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("invalid channel argument: {0}")]
    InvalidArgument(String),
    #[error("operation not supported on this stream")]
    OperationNotSupported,
    #[error("channel used after being disposed")]
    UsedAfterRelease,
    #[error("peer aborted the message before it was completed")]
    PeerAborted,
    #[error("receiver aborted the message before it was completed")]
    ReceiverAborted,
    #[error("chunk framing mismatch: {0}")]
    FramingMismatch(String),
    #[error("shared memory error")]
    Shmem(#[from] shared_memory::ShmemError),
    #[error("named event error: {0}")]
    Event(String),
}

impl From<ChannelError> for std::io::Error {
    fn from(err: ChannelError) -> Self {
        let kind = match &err {
            ChannelError::OperationNotSupported => ErrorKind::Unsupported,
            ChannelError::UsedAfterRelease => ErrorKind::BrokenPipe,
            ChannelError::PeerAborted | ChannelError::ReceiverAborted => {
                ErrorKind::ConnectionAborted
            }
            ChannelError::FramingMismatch(_) => ErrorKind::InvalidData,
            ChannelError::InvalidArgument(_) => ErrorKind::InvalidInput,
            ChannelError::Shmem(_) | ChannelError::Event(_) => ErrorKind::Other,
        };
        std::io::Error::new(kind, err)
    }
}

/// Error returned from [`crate::Sender::send_message`]: either a channel-level
/// failure, or the user callback's own error `E` passed through unchanged.
#[derive(Error, Debug)]
pub enum SendError<E: std::fmt::Debug + std::fmt::Display> {
    #[error(transparent)]
    Channel(#[from] ChannelError),
    #[error("send callback failed: {0}")]
    Callback(E),
}

/// Error returned from [`crate::Receiver::receive_message`]: either a
/// channel-level failure, or the user callback's own error `E` passed through
/// unchanged.
#[derive(Error, Debug)]
pub enum ReceiveError<E: std::fmt::Debug + std::fmt::Display> {
    #[error(transparent)]
    Channel(#[from] ChannelError),
    #[error("receive callback failed: {0}")]
    Callback(E),
}
