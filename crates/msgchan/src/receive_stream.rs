use std::io::{self, Read, Seek, SeekFrom};

use crate::error::ChannelError;
use crate::events::{EventSet, LocalEvent, wait_cancellable};
use crate::region::SharedRegion;

/// Read side of one in-flight message, handed to the receiver's callback.
///
/// Reads drain the current chunk and transparently pull the next one from
/// the sender as needed; `read` returns `Ok(0)` once the final chunk has
/// been fully drained, exactly as any other EOF-terminated reader.
pub struct ReceiveStream<'a> {
    region: &'a SharedRegion,
    events: &'a EventSet,
    scratch: Vec<u8>,
    cursor: usize,
    final_chunk_seen: bool,
    pub(crate) aborted: bool,
}

impl<'a> ReceiveStream<'a> {
    /// Constructs a stream for a message whose `MessageSending` signal has
    /// already been consumed by the caller.
    pub(crate) fn new(region: &'a SharedRegion, events: &'a EventSet) -> Self {
        Self {
            region,
            events,
            scratch: Vec::new(),
            cursor: 0,
            final_chunk_seen: false,
            aborted: false,
        }
    }

    fn remaining(&self) -> usize {
        self.scratch.len() - self.cursor
    }

    /// Pulls the next chunk from the sender, blocking until `BytesWritten`
    /// fires. Not cancellable: once a message has started, the receiver
    /// commits to draining it.
    fn fetch_next_chunk(&mut self) -> Result<(), ChannelError> {
        self.events.bytes_written.wait()?;

        // Load order matters: `message_completed` carries the Release store
        // that publishes `bytes_written`/`aborted` too (see region.rs).
        let completed = self.region.message_completed();
        let aborted = self.region.aborted();
        let len = self.region.bytes_written() as usize;

        self.scratch.clear();
        self.scratch.resize(len, 0);
        self.region.read_window(len, &mut self.scratch);
        self.cursor = 0;

        if aborted {
            self.aborted = true;
        }

        if completed {
            self.final_chunk_seen = true;
        } else {
            self.events.bytes_read.signal()?;
        }

        Ok(())
    }

    /// Drains and acknowledges any chunks the callback left unread, so the
    /// sender's blocked `write` calls unblock even when the callback returns
    /// early. Does **not** signal `MessageRead` itself — per spec.md §4.3,
    /// that only happens once, in `Receiver::receive_message`, after the
    /// callback has returned successfully and the stream has been fully
    /// drained, regardless of whether the callback read to completion on
    /// its own. Only meaningful after a successful callback; callers must
    /// not invoke this after a failed callback (see
    /// `Receiver::receive_message`).
    pub(crate) fn drain_to_completion(&mut self) -> Result<(), ChannelError> {
        while !self.final_chunk_seen {
            self.fetch_next_chunk()?;
        }
        Ok(())
    }

    /// Blocks for the start of a new message, or returns `false` if
    /// cancelled by the receiver's local disposal signal before one began.
    pub(crate) fn await_message_start(
        events: &EventSet,
        disposing: &LocalEvent,
    ) -> bool {
        wait_cancellable(&events.message_sending, disposing)
    }
}

impl Read for ReceiveStream<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        if self.remaining() == 0 {
            if self.final_chunk_seen {
                return Ok(0);
            }
            self.fetch_next_chunk().map_err(io::Error::from)?;
        }

        let n = buf.len().min(self.remaining());
        buf[..n].copy_from_slice(&self.scratch[self.cursor..self.cursor + n]);
        self.cursor += n;
        Ok(n)
    }
}

impl Seek for ReceiveStream<'_> {
    fn seek(&mut self, _pos: SeekFrom) -> io::Result<u64> {
        Err(ChannelError::OperationNotSupported.into())
    }
}
