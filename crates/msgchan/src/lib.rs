//! A one-way, in-order, byte-stream message channel between two cooperating
//! processes on one host, carried over a small shared-memory region and
//! synchronized by named cross-process events.
//!
//! One process opens a [`Sender`], the other a [`Receiver`], both under the
//! same channel name; [`Sender::send_message`] and
//! [`Receiver::receive_message`] hand a [`std::io::Write`] /
//! [`std::io::Read`] stream to a caller-supplied callback, chunking
//! arbitrarily large messages through a single shared window transparently.

mod error;
mod events;
mod receive_stream;
mod receiver;
mod region;
mod send_stream;
mod sender;

pub use error::{ChannelError, ReceiveError, SendError};
pub use receive_stream::ReceiveStream;
pub use receiver::Receiver;
pub use send_stream::SendStream;
pub use sender::Sender;
